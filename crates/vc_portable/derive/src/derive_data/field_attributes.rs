use proc_macro2::Span;
use syn::{Attribute, LitInt, LitStr, Type, meta::ParseNestedMeta, spanned::Spanned};

use crate::PORTABLE_ATTRIBUTE_NAME;

/// How a field takes part in the schema.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum FieldRole {
    /// Encoded through its `FieldType`.
    #[default]
    Data,
    Ignore,
    Transient,
    Synthetic,
    Remainder,
    Base,
}

impl FieldRole {
    fn keyword(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Ignore => "skip",
            Self::Transient => "transient",
            Self::Synthetic => "synthetic",
            Self::Remainder => "remainder",
            Self::Base => "base",
        }
    }
}

/// Parsed `#[portable(...)]` attributes of a field.
#[derive(Default)]
pub(crate) struct FieldAttributes {
    pub role: FieldRole,
    role_span: Option<Span>,
    pub name: Option<LitStr>,
    pub since: Option<u32>,
    pub prefer: Option<Type>,
}

impl FieldAttributes {
    pub fn parse_attrs(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut this = Self::default();
        for attr in attrs {
            if attr.path().is_ident(PORTABLE_ATTRIBUTE_NAME) {
                attr.parse_nested_meta(|meta| this.parse_meta(meta))?;
            }
        }

        if this.role != FieldRole::Data
            && let Some(span) = this.role_span
        {
            let extra = this
                .name
                .as_ref()
                .map(|lit| lit.span())
                .or(this.since.and(Some(span)))
                .or(this.prefer.as_ref().map(|ty| ty.span()));
            if let Some(extra) = extra {
                return Err(syn::Error::new(
                    extra,
                    format!(
                        "`name`, `since` and `prefer` have no effect on a `{}` field",
                        this.role.keyword()
                    ),
                ));
            }
        }
        Ok(this)
    }

    fn set_role(&mut self, meta: &ParseNestedMeta, role: FieldRole) -> syn::Result<()> {
        if self.role != FieldRole::Data {
            return Err(meta.error(format!(
                "field is already marked `{}`",
                self.role.keyword()
            )));
        }
        self.role = role;
        self.role_span = Some(meta.path.span());
        Ok(())
    }

    fn parse_meta(&mut self, meta: ParseNestedMeta) -> syn::Result<()> {
        let path = &meta.path;
        if path.is_ident("skip") || path.is_ident("ignore") {
            self.set_role(&meta, FieldRole::Ignore)
        } else if path.is_ident("transient") {
            self.set_role(&meta, FieldRole::Transient)
        } else if path.is_ident("remainder") {
            self.set_role(&meta, FieldRole::Remainder)
        } else if path.is_ident("base") {
            self.set_role(&meta, FieldRole::Base)
        } else if path.is_ident("name") {
            if self.name.is_some() {
                return Err(meta.error("duplicate attribute"));
            }
            self.name = Some(meta.value()?.parse()?);
            Ok(())
        } else if path.is_ident("since") {
            if self.since.is_some() {
                return Err(meta.error("duplicate attribute"));
            }
            let lit: LitInt = meta.value()?.parse()?;
            self.since = Some(lit.base10_parse()?);
            Ok(())
        } else if path.is_ident("prefer") {
            if self.prefer.is_some() {
                return Err(meta.error("duplicate attribute"));
            }
            self.prefer = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error(
                "unknown field attribute, expected one of `skip`, `transient`, `name`, \
                 `since`, `prefer`, `remainder`, `base`",
            ))
        }
    }

    /// Marks a field the compiler requires but the schema never sees.
    pub fn mark_synthetic(&mut self) {
        if self.role == FieldRole::Data {
            self.role = FieldRole::Synthetic;
        }
    }
}
