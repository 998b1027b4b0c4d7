use crate::derive_data::PortableDerive;

/// Generate `auto_register` implementation
#[cfg(feature = "auto_register")]
pub(crate) fn get_auto_register_impl(derive: &PortableDerive) -> proc_macro2::TokenStream {
    use quote::quote_spanned;

    let attrs = &derive.attrs;
    let (Some(span), Some(id)) = (attrs.auto_register, attrs.user_type.as_ref()) else {
        return crate::utils::empty();
    };

    let macro_exports_ = crate::path::macro_exports_(derive.vc_portable_path());
    let portable_type_ = crate::path::portable_type_(derive.vc_portable_path());
    let ident = derive.ident;

    quote_spanned! { span =>
        #macro_exports_::inventory::submit! {
            #macro_exports_::AutoRegistration {
                id: #id,
                info: <#ident as #portable_type_>::type_info,
            }
        }
    }
}

/// Generate `auto_register` implementation
#[cfg(not(feature = "auto_register"))]
pub(crate) fn get_auto_register_impl(_: &PortableDerive) -> proc_macro2::TokenStream {
    crate::utils::empty()
}
