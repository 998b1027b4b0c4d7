use proc_macro2::Span;
use syn::{Attribute, Expr, LitInt, LitStr, meta::ParseNestedMeta, spanned::Spanned};

use crate::PORTABLE_ATTRIBUTE_NAME;

/// Parsed `#[portable(...)]` attributes of a type.
#[derive(Default)]
pub(crate) struct TypeAttributes {
    pub name: Option<LitStr>,
    pub type_path: Option<LitStr>,
    pub version: Option<u32>,
    pub default: Option<Span>,
    pub custom: Option<Span>,
    pub user_type: Option<Expr>,
    pub auto_register: Option<Span>,
}

fn duplicate(meta: &ParseNestedMeta) -> syn::Error {
    meta.error("duplicate attribute")
}

impl TypeAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in attrs {
            if attr.path().is_ident(PORTABLE_ATTRIBUTE_NAME) {
                attr.parse_nested_meta(|meta| this.parse_meta(meta))?;
            }
        }
        if let Some(span) = this.auto_register
            && this.user_type.is_none()
        {
            return Err(syn::Error::new(
                span,
                "`auto_register` requires `user_type = ..`",
            ));
        }
        Ok(this)
    }

    fn parse_meta(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        let path = &meta.path;
        if path.is_ident("name") {
            if self.name.is_some() {
                return Err(duplicate(&meta));
            }
            self.name = Some(meta.value()?.parse()?);
        } else if path.is_ident("type_path") {
            if self.type_path.is_some() {
                return Err(duplicate(&meta));
            }
            self.type_path = Some(meta.value()?.parse()?);
        } else if path.is_ident("version") {
            if self.version.is_some() {
                return Err(duplicate(&meta));
            }
            let lit: LitInt = meta.value()?.parse()?;
            self.version = Some(lit.base10_parse()?);
        } else if path.is_ident("default") {
            self.default = Some(path.span());
        } else if path.is_ident("custom") {
            self.custom = Some(path.span());
        } else if path.is_ident("user_type") {
            if self.user_type.is_some() {
                return Err(duplicate(&meta));
            }
            self.user_type = Some(meta.value()?.parse()?);
        } else if path.is_ident("auto_register") {
            self.auto_register = Some(path.span());
        } else {
            return Err(meta.error(
                "unknown type attribute, expected one of `name`, `type_path`, `version`, \
                 `default`, `custom`, `user_type`, `auto_register`",
            ));
        }
        Ok(())
    }
}
