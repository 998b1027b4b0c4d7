use proc_macro2::TokenStream;
use quote::quote;

use crate::derive_data::{FieldRole, PortableDerive, PortableField};

fn declared_field(derive: &PortableDerive, field: &PortableField) -> TokenStream {
    let vc_portable_path = derive.vc_portable_path();
    let declared_field_ = crate::path::declared_field_(vc_portable_path);
    let field_flags_ = crate::path::field_flags_(vc_portable_path);

    let name = field.name();
    let position = field.position;
    let ty = field.ty;

    let flag = match field.attrs.role {
        FieldRole::Data => {
            let rename = field.attrs.name.as_ref().map(|lit| quote!(.with_rename(#lit)));
            let since = field.attrs.since.map(|since| quote!(.with_since(#since)));
            let prefer = field.attrs.prefer.as_ref().map(|p| quote!(.with_preferred::<#p>()));
            return quote! {
                #declared_field_::new::<#ty>(#name, #position) #rename #since #prefer
            };
        }
        FieldRole::Ignore => quote!(IGNORE),
        FieldRole::Transient => quote!(TRANSIENT),
        FieldRole::Synthetic => quote!(SYNTHETIC),
        FieldRole::Remainder => quote!(REMAINDER),
        FieldRole::Base => quote!(BASE),
    };

    quote! {
        #declared_field_::opaque(#name, #position, ::core::any::type_name::<#ty>())
            .with_flags(#field_flags_::#flag)
    }
}

/// Generates `PortableType`, building the static `PortableInfo`.
pub(crate) fn impl_trait_portable_type(derive: &PortableDerive) -> TokenStream {
    let vc_portable_path = derive.vc_portable_path();
    let portable_type_ = crate::path::portable_type_(vc_portable_path);
    let portable_info_ = crate::path::portable_info_(vc_portable_path);
    let info_cell_ = crate::path::info_cell_(vc_portable_path);

    let ident = derive.ident;
    let attrs = &derive.attrs;

    let type_name = match &attrs.name {
        Some(lit) => quote!(#lit),
        None => {
            let name = ident.to_string();
            quote!(#name)
        }
    };
    let type_path = match &attrs.type_path {
        Some(lit) => quote!(#lit),
        None => {
            let name = ident.to_string();
            quote!(::core::concat!(::core::module_path!(), "::", #name))
        }
    };

    let fields = derive.fields.iter().map(|field| declared_field(derive, field));

    let version = attrs.version.map(|v| quote!(.with_version(#v)));
    let base = derive.field_with(FieldRole::Base).map(|field| {
        let ty = field.ty;
        quote!(.with_base::<#ty>())
    });
    let default = attrs.default.map(|_| quote!(.with_default::<Self>()));
    let custom = attrs.custom.map(|_| quote!(.with_custom_codec::<Self>()));

    quote! {
        impl #portable_type_ for #ident {
            fn type_info() -> &'static #portable_info_ {
                static CELL: #info_cell_ = #info_cell_::new();
                CELL.get_or_init(|| {
                    #portable_info_::new::<Self>(
                        #type_path,
                        #type_name,
                        ::std::vec![#(#fields),*],
                    )
                    #version
                    #base
                    #default
                    #custom
                })
            }
        }
    }
}
