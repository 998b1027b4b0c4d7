use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use toml_edit::{Document, Item, Table};

/// The caller's `Cargo.toml`, used to spell paths to sibling crates in
/// generated code.
///
/// ```rust
/// # use vc_macro_utils::Manifest;
/// let path: syn::Path = Manifest::shared(|m| m.get_crate_path("vc_portable"));
/// ```
///
/// # Resolution rules
///
/// For a requested crate such as `vc_portable`:
///
/// 1. If it is listed in `dependencies`, return `::vc_portable`.
/// 2. If the caller depends on the facade crate `vc_codec`, return
///    `::vc_codec::portable`.
/// 3. If the caller depends on the facade under the alias `vc`, return
///    `::vc::portable`.
/// 4. Repeat steps 1-3 with `dev-dependencies`.
/// 5. Otherwise fall back to `::vc_portable`.
///
/// A crate that derives its own traits in unit tests needs
/// `extern crate self as vc_portable;` at its root so the fallback resolves.
#[derive(Debug)]
pub struct Manifest {
    pub manifest: Document<Box<str>>,
    pub modified_time: Option<SystemTime>,
}

const FACADE_NAME: &str = "vc_codec";
const FACADE_ALIAS: &str = "vc";
const MEMBER_PREFIX: &str = "vc_";

impl Manifest {
    fn manifest_path() -> Option<PathBuf> {
        let mut path = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR")?);
        path.push("Cargo.toml");
        path.exists().then_some(path)
    }

    fn modified_time(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
    }

    fn parse_manifest(text: &str, origin: &Path) -> Document<Box<str>> {
        Document::parse(Box::<str>::from(text))
            .unwrap_or_else(|e| panic!("failed to parse cargo manifest {}: {e}", origin.display()))
    }

    fn read_manifest(path: &Path) -> Document<Box<str>> {
        let text = std::fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("unable to read cargo manifest {}: {e}", path.display()));
        Self::parse_manifest(&text, path)
    }

    fn absolute(name: &str) -> syn::Path {
        syn::parse_str(&format!("::{name}"))
            .unwrap_or_else(|e| panic!("`{name}` is not a valid crate name: {e}"))
    }

    fn find_in_deps(deps: &Table, name: &str) -> Option<syn::Path> {
        if deps.contains_key(name) {
            return Some(Self::absolute(name));
        }
        let module = name.strip_prefix(MEMBER_PREFIX)?;
        [FACADE_NAME, FACADE_ALIAS]
            .into_iter()
            .find(|facade| deps.contains_key(facade))
            .map(|facade| {
                let mut path = Self::absolute(facade);
                let segment = syn::parse_str::<syn::PathSegment>(module)
                    .unwrap_or_else(|e| panic!("`{module}` is not a valid path segment: {e}"));
                path.segments.push(segment);
                path
            })
    }

    /// Returns the path generated code should use to reach crate `name`.
    ///
    /// See the type documentation for the resolution order.
    pub fn get_crate_path(&self, name: &str) -> syn::Path {
        ["dependencies", "dev-dependencies"]
            .into_iter()
            .filter_map(|key| match self.manifest.get(key) {
                Some(Item::Table(deps)) => Self::find_in_deps(deps, name),
                _ => None,
            })
            .next()
            .unwrap_or_else(|| Self::absolute(name))
    }

    /// Runs `func` against the caller's manifest.
    ///
    /// Parsed manifests are cached per path and re-read when the file's
    /// modification time changes.
    pub fn shared<R>(func: impl FnOnce(&Self) -> R) -> R {
        static MANIFESTS: RwLock<BTreeMap<PathBuf, Manifest>> = RwLock::new(BTreeMap::new());

        let Some(path) = Self::manifest_path() else {
            let empty = Manifest {
                manifest: Self::parse_manifest("", Path::new("Cargo.toml")),
                modified_time: None,
            };
            return func(&empty);
        };
        let modified_time = Self::modified_time(&path);

        let manifests = MANIFESTS.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(manifest) = manifests.get(&path)
            && manifest.modified_time == modified_time
        {
            return func(manifest);
        }
        drop(manifests);

        let manifest = Manifest {
            manifest: Self::read_manifest(&path),
            modified_time,
        };
        let result = func(&manifest);

        MANIFESTS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, manifest);

        result
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::Manifest;

    fn resolve(toml: &str, name: &str) -> String {
        let manifest = Manifest {
            manifest: Manifest::parse_manifest(toml, Path::new("Cargo.toml")),
            modified_time: None,
        };
        let path = manifest.get_crate_path(name);
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        format!("::{}", segments.join("::"))
    }

    #[test]
    fn direct_dependency() {
        let toml = "[dependencies]\nvc_portable = { path = \"../vc_portable\" }\n";
        assert_eq!(resolve(toml, "vc_portable"), "::vc_portable");
    }

    #[test]
    fn through_facade() {
        let toml = "[dependencies]\nvc_codec = \"0.0.1\"\n";
        assert_eq!(resolve(toml, "vc_portable"), "::vc_codec::portable");

        let toml = "[dev-dependencies]\nvc = { package = \"vc_codec\", version = \"0.0.1\" }\n";
        assert_eq!(resolve(toml, "vc_stream"), "::vc::stream");
    }

    #[test]
    fn fallback() {
        assert_eq!(resolve("[package]\nname = \"app\"\n", "vc_portable"), "::vc_portable");
    }
}
