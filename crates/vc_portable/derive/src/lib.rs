//! Provides `#[derive(Portable)]` for [`vc_portable`].
//!
//! [`vc_portable`]: https://docs.rs/vc_portable
#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(clippy::std_instead_of_core, reason = "proc-macro lib")]
#![allow(clippy::std_instead_of_alloc, reason = "proc-macro lib")]

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

static PORTABLE_ATTRIBUTE_NAME: &str = "portable";

// -----------------------------------------------------------------------------
// Modules

mod derive_data;
mod impls;
mod path;
mod utils;

// -----------------------------------------------------------------------------
// Macros

/// # Portable Derivation
///
/// `#[derive(Portable)]` implements `PortableType`, `Portable` and
/// `FieldType` for a struct with named fields. Generic types are not
/// supported.
///
/// ## Type attributes
///
/// ```rust, ignore
/// #[derive(Portable, Default)]
/// #[portable(default, name = "Person", version = 2, user_type = 1001, auto_register)]
/// struct Person { /* ... */ }
/// ```
///
/// - `default`: instantiate through `Default` on read. Without it (or
///   `custom`) reading the type fails.
/// - `name = "..."`: external type name, defaults to the identifier.
/// - `type_path = "..."`: full path, defaults to `module_path!()::Ident`.
/// - `version = N`: explicit type version instead of the highest `since`.
/// - `custom`: the type implements `CustomCodec` and encodes itself. Fields
///   are not inspected, so enums are accepted too.
/// - `user_type = N, auto_register`: submit the type for
///   `UserTypeTable::auto_register` (feature `auto_register`).
///
/// ## Field attributes
///
/// - `skip` / `transient`: never encoded.
/// - `name = "..."`: external field name, used for ordering.
/// - `since = N`: first version carrying the field (default 0).
/// - `prefer = Type`: select the codec from `Type` instead of the declared
///   type. The field type must still accept the decoded value.
/// - `remainder`: an `Option<RemainderValue>` receiving unknown bytes.
/// - `base`: an embedded ancestor, itself `Portable`, written first as a
///   nested record.
///
/// `PhantomData` fields are skipped automatically.
#[proc_macro_derive(Portable, attributes(portable))]
pub fn derive_portable(input: TokenStream) -> TokenStream {
    let ast = parse_macro_input!(input as DeriveInput);

    match derive_data::PortableDerive::from_input(&ast) {
        Ok(derive) => impls::impl_portable(&derive).into(),
        Err(err) => err.into_compile_error().into(),
    }
}
