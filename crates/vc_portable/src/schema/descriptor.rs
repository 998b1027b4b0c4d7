use serde::Serialize;

/// Serializable view of a [`TypeSchema`](crate::TypeSchema).
///
/// Intended for diagnostics and for diffing schemas between releases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaDescriptor {
    pub type_path: &'static str,
    pub type_name: &'static str,
    pub user_type_id: i32,
    pub detected_version: u32,
    pub active_version: u32,
    pub custom: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remainder: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<Box<SchemaDescriptor>>,
    pub versions: Vec<VersionDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDescriptor {
    pub version: u32,
    pub fields: Vec<FieldDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub index: u32,
    pub since: u32,
    pub value_type: &'static str,
}
