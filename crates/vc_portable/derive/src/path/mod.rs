//! Paths into `vc_portable` used by the generated code.

use proc_macro2::TokenStream;
use quote::quote;

// -----------------------------------------------------------------------------
// Crate Path

/// Get the correct access path to the `vc_portable` crate.
///
/// 1. For crates that depend on `vc_portable`, `::vc_portable` is returned.
/// 2. For crates that depend on `vc_codec`, `::vc_codec::portable` is returned.
/// 3. For crates that depend on `vc`, `::vc::portable` is returned.
/// 4. Otherwise `::vc_portable` is returned, which may be incorrect.
///
/// Reads the builder's `Cargo.toml`, so call it once per derive.
pub(crate) fn vc_portable() -> syn::Path {
    vc_macro_utils::Manifest::shared(|manifest| manifest.get_crate_path("vc_portable"))
}

// -----------------------------------------------------------------------------
// Internal API

#[inline(always)]
pub(crate) fn macro_exports_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::__macro_exports
    }
}

#[inline(always)]
pub(crate) fn portable_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::Portable
    }
}

#[inline(always)]
pub(crate) fn portable_type_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::PortableType
    }
}

#[inline(always)]
pub(crate) fn portable_info_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::PortableInfo
    }
}

#[inline(always)]
pub(crate) fn info_cell_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::InfoCell
    }
}

#[inline(always)]
pub(crate) fn declared_field_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::DeclaredField
    }
}

#[inline(always)]
pub(crate) fn field_flags_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::FieldFlags
    }
}

#[inline(always)]
pub(crate) fn field_type_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::FieldType
    }
}

#[inline(always)]
pub(crate) fn field_shape_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::codec::FieldShape
    }
}

#[inline(always)]
pub(crate) fn value_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::Value
    }
}

#[inline(always)]
pub(crate) fn value_error_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::ValueError
    }
}

#[inline(always)]
pub(crate) fn remainder_value_(vc_portable_path: &syn::Path) -> TokenStream {
    quote! {
        #vc_portable_path::RemainderValue
    }
}
