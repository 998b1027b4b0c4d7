use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::PortableDerive;

/// Generates `FieldType`, so the type can be held by other portable types.
/// It always goes through the object codec.
pub(crate) fn impl_trait_field_type(derive: &PortableDerive) -> TokenStream {
    let vc_portable_path = derive.vc_portable_path();
    let field_type_ = crate::path::field_type_(vc_portable_path);
    let field_shape_ = crate::path::field_shape_(vc_portable_path);
    let value_ = crate::path::value_(vc_portable_path);
    let value_error_ = crate::path::value_error_(vc_portable_path);
    let macro_exports_ = crate::path::macro_exports_(vc_portable_path);

    let ident = derive.ident;

    quote! {
        impl #field_type_ for #ident {
            #[inline]
            fn shape() -> #field_shape_ {
                #field_shape_::Object
            }

            #[inline]
            fn to_value(&self) -> #value_<'_> {
                #macro_exports_::object_to_value(self)
            }

            fn from_value(
                value: #value_<'static>,
            ) -> ::core::result::Result<Self, #value_error_> {
                #macro_exports_::object_from_value::<Self>(value)
            }
        }
    }
}
