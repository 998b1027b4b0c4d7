use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::{FieldRole, PortableDerive};

/// Generates `Portable`: positional field access, base and remainder hooks.
pub(crate) fn impl_trait_portable(derive: &PortableDerive) -> TokenStream {
    let vc_portable_path = derive.vc_portable_path();
    let portable_ = crate::path::portable_(vc_portable_path);
    let portable_type_ = crate::path::portable_type_(vc_portable_path);
    let portable_info_ = crate::path::portable_info_(vc_portable_path);
    let field_type_ = crate::path::field_type_(vc_portable_path);
    let value_ = crate::path::value_(vc_portable_path);
    let value_error_ = crate::path::value_error_(vc_portable_path);

    let ident = derive.ident;

    let get_arms = derive.data_fields().map(|field| {
        let member = field.ident;
        let position = field.position;
        quote! {
            #position => ::core::option::Option::Some(#field_type_::to_value(&self.#member)),
        }
    });

    let set_arms = derive.data_fields().map(|field| {
        let member = field.ident;
        let position = field.position;
        let ty = field.ty;
        quote! {
            #position => {
                self.#member = <#ty as #field_type_>::from_value(value)?;
                ::core::result::Result::Ok(())
            }
        }
    });

    let base = derive.field_with(FieldRole::Base).map(|field| {
        let member = field.ident;
        quote! {
            fn base(&self) -> ::core::option::Option<&dyn #portable_> {
                ::core::option::Option::Some(&self.#member)
            }

            fn base_mut(&mut self) -> ::core::option::Option<&mut dyn #portable_> {
                ::core::option::Option::Some(&mut self.#member)
            }
        }
    });

    let remainder = derive.field_with(FieldRole::Remainder).map(|field| {
        let member = field.ident;
        let remainder_value_ = crate::path::remainder_value_(vc_portable_path);
        quote! {
            fn remainder(&self) -> ::core::option::Option<&#remainder_value_> {
                ::core::option::Option::as_ref(&self.#member)
            }

            fn set_remainder(
                &mut self,
                remainder: ::core::option::Option<#remainder_value_>,
            ) -> bool {
                self.#member = remainder;
                true
            }
        }
    });

    quote! {
        impl #portable_ for #ident {
            #[inline]
            fn portable_info(&self) -> &'static #portable_info_ {
                <Self as #portable_type_>::type_info()
            }

            fn field_value(&self, position: usize) -> ::core::option::Option<#value_<'_>> {
                match position {
                    #(#get_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            #[allow(unreachable_code, unused_variables)]
            fn set_field_value(
                &mut self,
                position: usize,
                value: #value_<'static>,
            ) -> ::core::result::Result<(), #value_error_> {
                match position {
                    #(#set_arms)*
                    _ => ::core::result::Result::Err(#value_error_::NoSuchField(position)),
                }
            }

            #base

            #remainder

            #[inline]
            fn as_any(&self) -> &dyn ::core::any::Any {
                self
            }

            #[inline]
            fn as_any_mut(&mut self) -> &mut dyn ::core::any::Any {
                self
            }

            #[inline]
            fn into_any(
                self: ::std::boxed::Box<Self>,
            ) -> ::std::boxed::Box<dyn ::core::any::Any> {
                self
            }
        }
    }
}
