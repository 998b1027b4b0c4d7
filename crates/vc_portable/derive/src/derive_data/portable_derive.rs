use syn::ext::IdentExt;
use syn::{Data, DeriveInput, Fields, Ident, Type, spanned::Spanned};

use crate::derive_data::{FieldAttributes, FieldRole, TypeAttributes};

/// A field of the derived struct.
pub(crate) struct PortableField<'a> {
    pub ident: &'a Ident,
    pub ty: &'a Type,
    /// Declaration position among all fields.
    pub position: usize,
    pub attrs: FieldAttributes,
}

impl PortableField<'_> {
    /// Declared name without the `r#` prefix.
    pub fn name(&self) -> String {
        self.ident.unraw().to_string()
    }
}

/// Everything the derive needs from the input.
pub(crate) struct PortableDerive<'a> {
    pub ident: &'a Ident,
    pub attrs: TypeAttributes,
    /// Empty for types with a custom codec.
    pub fields: Vec<PortableField<'a>>,
    pub vc_portable_path: syn::Path,
}

impl<'a> PortableDerive<'a> {
    pub fn from_input(ast: &'a DeriveInput) -> syn::Result<Self> {
        let attrs = TypeAttributes::parse_attrs(&ast.attrs)?;

        if !ast.generics.params.is_empty() {
            return Err(syn::Error::new(
                ast.generics.span(),
                "`Portable` cannot be derived for generic types",
            ));
        }

        let fields = if attrs.custom.is_some() {
            Vec::new()
        } else {
            Self::parse_fields(ast)?
        };

        let remainders = fields.iter().filter(|f| f.attrs.role == FieldRole::Remainder);
        if let Some(second) = remainders.clone().nth(1) {
            return Err(syn::Error::new(
                second.ident.span(),
                "only one field can be marked `remainder`",
            ));
        }
        let bases = fields.iter().filter(|f| f.attrs.role == FieldRole::Base);
        if let Some(second) = bases.clone().nth(1) {
            return Err(syn::Error::new(
                second.ident.span(),
                "only one field can be marked `base`",
            ));
        }

        Ok(Self {
            ident: &ast.ident,
            attrs,
            fields,
            vc_portable_path: crate::path::vc_portable(),
        })
    }

    fn parse_fields(ast: &'a DeriveInput) -> syn::Result<Vec<PortableField<'a>>> {
        let named = match &ast.data {
            Data::Struct(data) => match &data.fields {
                Fields::Named(named) => &named.named,
                Fields::Unit => return Ok(Vec::new()),
                Fields::Unnamed(_) => {
                    return Err(syn::Error::new(
                        ast.ident.span(),
                        "`Portable` needs named fields; use `#[portable(custom)]` for tuple structs",
                    ));
                }
            },
            Data::Enum(data) => {
                return Err(syn::Error::new(
                    data.enum_token.span(),
                    "`Portable` enums need `#[portable(custom)]`",
                ));
            }
            Data::Union(data) => {
                return Err(syn::Error::new(
                    data.union_token.span(),
                    "`Portable` cannot be derived for unions",
                ));
            }
        };

        named
            .iter()
            .enumerate()
            .map(|(position, field)| {
                let mut attrs = FieldAttributes::parse_attrs(&field.attrs)?;
                if crate::utils::is_phantom(&field.ty) {
                    attrs.mark_synthetic();
                }
                Ok(PortableField {
                    // Named fields always carry an ident.
                    ident: field.ident.as_ref().ok_or_else(|| {
                        syn::Error::new(field.span(), "expected a named field")
                    })?,
                    ty: &field.ty,
                    position,
                    attrs,
                })
            })
            .collect()
    }

    #[inline]
    pub fn vc_portable_path(&self) -> &syn::Path {
        &self.vc_portable_path
    }

    /// Fields encoded through their `FieldType`.
    pub fn data_fields(&self) -> impl Iterator<Item = &PortableField<'a>> {
        self.fields
            .iter()
            .filter(|field| field.attrs.role == FieldRole::Data)
    }

    pub fn field_with(&self, role: FieldRole) -> Option<&PortableField<'a>> {
        self.fields.iter().find(|field| field.attrs.role == role)
    }
}
