use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::PortableDerive;

// -----------------------------------------------------------------------------
// Modules

mod auto_register;
mod trait_field_type;
mod trait_portable;
mod trait_portable_type;

// -----------------------------------------------------------------------------
// Internal API

use auto_register::get_auto_register_impl;
use trait_field_type::impl_trait_field_type;
use trait_portable::impl_trait_portable;
use trait_portable_type::impl_trait_portable_type;

/// All impls of `#[derive(Portable)]`, wrapped in an anonymous const.
pub(crate) fn impl_portable(derive: &PortableDerive) -> TokenStream {
    let portable_type = impl_trait_portable_type(derive);
    let portable = impl_trait_portable(derive);
    let field_type = impl_trait_field_type(derive);
    let auto_register = get_auto_register_impl(derive);

    quote! {
        const _: () = {
            #portable_type
            #portable
            #field_type
            #auto_register
        };
    }
}
