//! The remote node model.
//!
//! A [`DriveNode`] is an immutable snapshot of a remote file or folder,
//! built from the raw JSON records the Drive API returns. The node's kind
//! is never stored separately; it is derived from the MIME type, with the
//! reserved folder marker type making a node a folder.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{mime_types, DriveError, DriveResult};

/// Metadata fields requested for every node.
pub const NODE_FIELDS: &str = "id, name, mimeType, modifiedTime, capabilities";

/// Whether a node is a regular file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    File,
    Folder,
}

/// A remote file or folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveNode {
    /// Opaque server-assigned identifier.
    pub id: String,
    /// Display name (not guaranteed unique).
    pub name: String,
    /// MIME type. Folders carry the reserved folder marker type.
    pub mime_type: String,
    /// Last modification timestamp, as reported by the service.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,
    /// Permission/capability flags, passed through untouched.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub capabilities: Map<String, Value>,
}

impl DriveNode {
    /// Build a node from a single raw record.
    ///
    /// The record must carry string `id`, `name` and `mimeType` fields;
    /// anything else is a construction error, never a partial node.
    pub fn from_record(record: &Map<String, Value>) -> DriveResult<Self> {
        let field = |key: &str| -> DriveResult<String> {
            record
                .get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| {
                    DriveError::node(format!("record is missing a valid '{}' field", key))
                })
        };

        Ok(Self {
            id: field("id")?,
            name: field("name")?,
            mime_type: field("mimeType")?,
            modified_time: record
                .get("modifiedTime")
                .and_then(Value::as_str)
                .map(str::to_string),
            capabilities: record
                .get("capabilities")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        })
    }

    /// Build nodes from raw API data.
    ///
    /// A single JSON object yields a one-element vector, an array of
    /// objects yields one node per element, and any other shape is a
    /// type error.
    pub fn construct(data: &Value) -> DriveResult<Vec<Self>> {
        match data {
            Value::Object(record) => Ok(vec![Self::from_record(record)?]),
            Value::Array(records) => records
                .iter()
                .map(|item| {
                    item.as_object()
                        .ok_or_else(|| {
                            DriveError::node("array element is not a JSON object")
                        })
                        .and_then(Self::from_record)
                })
                .collect(),
            other => Err(DriveError::node(format!(
                "expected a JSON object or array of objects, got {}",
                json_type_name(other)
            ))),
        }
    }

    /// Kind derived from the MIME type.
    pub fn kind(&self) -> NodeKind {
        if self.mime_type == mime_types::FOLDER {
            NodeKind::Folder
        } else {
            NodeKind::File
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == NodeKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind() == NodeKind::File
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, name: &str, mime: &str) -> Value {
        json!({
            "id": id,
            "name": name,
            "mimeType": mime,
            "modifiedTime": "2024-03-01T10:20:30.000000Z",
            "capabilities": { "canDownload": true },
        })
    }

    // ── construct ──

    #[test]
    fn construct_single_object() {
        let nodes = DriveNode::construct(&record("f1", "notes.txt", "text/plain")).unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "f1");
        assert_eq!(nodes[0].name, "notes.txt");
        assert_eq!(
            nodes[0].modified_time.as_deref(),
            Some("2024-03-01T10:20:30.000000Z")
        );
        assert_eq!(
            nodes[0].capabilities.get("canDownload"),
            Some(&Value::Bool(true))
        );
    }

    #[test]
    fn construct_array() {
        let data = json!([
            record("a", "one", "text/plain"),
            record("b", "two", super::mime_types::FOLDER),
        ]);
        let nodes = DriveNode::construct(&data).unwrap();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_file());
        assert!(nodes[1].is_dir());
    }

    #[test]
    fn construct_rejects_other_shapes() {
        for bad in [json!("a string"), json!(42), json!(true), Value::Null] {
            let err = DriveNode::construct(&bad).unwrap_err();
            assert_eq!(err.kind, crate::types::DriveErrorKind::InvalidNode);
        }
    }

    #[test]
    fn construct_rejects_array_of_non_objects() {
        let err = DriveNode::construct(&json!(["x", "y"])).unwrap_err();
        assert_eq!(err.kind, crate::types::DriveErrorKind::InvalidNode);
    }

    #[test]
    fn from_record_requires_mime_type() {
        let mut rec = record("f1", "notes.txt", "text/plain");
        rec.as_object_mut().unwrap().remove("mimeType");
        let err = DriveNode::construct(&rec).unwrap_err();
        assert!(err.message.contains("mimeType"));
    }

    #[test]
    fn from_record_rejects_non_string_mime_type() {
        let mut rec = record("f1", "notes.txt", "text/plain");
        rec.as_object_mut().unwrap().insert("mimeType".into(), json!(7));
        assert!(DriveNode::construct(&rec).is_err());
    }

    #[test]
    fn construct_single_matches_array_element() {
        let rec = record("f1", "report.pdf", "application/pdf");
        let from_object = DriveNode::construct(&rec).unwrap().remove(0);
        let from_array = DriveNode::construct(&json!([rec])).unwrap().remove(0);
        assert_eq!(from_object, from_array);
    }

    #[test]
    fn construct_roundtrip_preserves_fields() {
        let original = record("f1", "report.pdf", "application/pdf");
        let node = DriveNode::construct(&original).unwrap().remove(0);
        let reparsed: DriveNode =
            serde_json::from_value(serde_json::to_value(&node).unwrap()).unwrap();
        assert_eq!(node, reparsed);
    }

    // ── kind derivation ──

    #[test]
    fn folder_marker_makes_a_folder() {
        let node = DriveNode::construct(&record("d1", "docs", super::mime_types::FOLDER))
            .unwrap()
            .remove(0);
        assert_eq!(node.kind(), NodeKind::Folder);
        assert!(node.is_dir());
        assert!(!node.is_file());
    }

    #[test]
    fn any_other_mime_type_is_a_file() {
        for mime in ["text/plain", "application/octet-stream", "image/png", ""] {
            let node = DriveNode::construct(&record("f", "x", mime)).unwrap().remove(0);
            assert_eq!(node.is_file(), !node.is_dir());
            assert!(node.is_file());
        }
    }

    #[test]
    fn missing_modified_time_and_capabilities_are_tolerated() {
        let data = json!({ "id": "f1", "name": "bare", "mimeType": "text/plain" });
        let node = DriveNode::construct(&data).unwrap().remove(0);
        assert!(node.modified_time.is_none());
        assert!(node.capabilities.is_empty());
    }
}
