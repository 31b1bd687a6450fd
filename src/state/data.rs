/// Shared data structures for the instance state
///
/// These structs represent the data model that flows between
/// the stores and the transport layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One sidecar metadata record (`<file name>.ameta`)
///
/// Every field is optional: a freshly created sidecar is the empty
/// object `{}` and fields appear only once the user sets them.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct MetaRecord {
    /// Display name, overrides the file stem when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Thumbnail reference (typically a data URL pasted by the user)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,

    /// Free-form values keyed by annotation column id.
    /// Keys whose column definition was removed stay in place; they are
    /// simply no longer projected.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,

    /// Keys this version does not understand survive a load/save cycle
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An annotation column definition: stable id plus editable label.
/// The id keys sidecar values; the label is display-only.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AnnotationColumn {
    pub id: String,
    pub label: String,
}

/// One row of the scan table served to the transport layer
#[derive(Serialize, Debug, Clone)]
pub struct FileEntry {
    /// Display name (sidecar `name` or the file stem)
    pub name: String,
    /// Relative path with forward slashes; this is the file's identity
    pub path: String,
    /// Thumbnail reference, if one has been set
    pub thumbnail: Option<String>,
    /// Positional category values derived from the folder path
    pub categories: Vec<String>,
    /// Annotation values in column order, "" when unset
    pub annotations: Vec<String>,
}

/// The full scan payload: rows plus the column vocabulary
/// needed to render them
#[derive(Serialize, Debug, Clone)]
pub struct ScanResult {
    pub files: Vec<FileEntry>,
    pub category_columns: Vec<String>,
    pub annotation_columns: Vec<AnnotationColumn>,
}
