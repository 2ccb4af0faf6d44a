//! Drive search query builder.
//!
//! Builds `q` expressions for the files listing endpoint. Every value is
//! escaped before being embedded, and clauses are joined with ` and `.

use crate::types::mime_types;

/// Builder for Drive search queries.
///
/// # Example
/// ```
/// use gdrive_mirror::query::QueryBuilder;
///
/// let q = QueryBuilder::new()
///     .name_eq("report.pdf")
///     .in_parent("folder123")
///     .build();
/// assert_eq!(q, "name='report.pdf' and 'folder123' in parents");
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    clauses: Vec<String>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Escape single quotes in a query value.
    fn escape(value: &str) -> String {
        value.replace('\'', "\\'")
    }

    /// Exact name match.
    pub fn name_eq(mut self, name: &str) -> Self {
        self.clauses.push(format!("name='{}'", Self::escape(name)));
        self
    }

    /// Exact id match.
    pub fn id_eq(mut self, id: &str) -> Self {
        self.clauses.push(format!("id='{}'", Self::escape(id)));
        self
    }

    /// Exact MIME type match.
    pub fn mime_type_eq(mut self, mime_type: &str) -> Self {
        self.clauses
            .push(format!("mimeType='{}'", Self::escape(mime_type)));
        self
    }

    /// Restrict to folders.
    pub fn folders_only(self) -> Self {
        self.mime_type_eq(mime_types::FOLDER)
    }

    /// Direct children of the given parent id.
    pub fn in_parent(mut self, parent_id: &str) -> Self {
        self.clauses
            .push(format!("'{}' in parents", Self::escape(parent_id)));
        self
    }

    /// Append a raw clause verbatim.
    pub fn raw(mut self, clause: &str) -> Self {
        self.clauses.push(clause.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Join all clauses into the final query string.
    pub fn build(self) -> String {
        self.clauses.join(" and ")
    }
}
