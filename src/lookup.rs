//! Node lookup and folder listing.

use log::debug;

use crate::nodes::{DriveNode, NODE_FIELDS};
use crate::query::QueryBuilder;
use crate::session::RemoteSession;
use crate::types::{mime_types, DriveError, DriveResult};

/// Maximum number of children fetched per listing. Listings are a single
/// page; folders with more children than this are truncated.
pub const LIST_LIMIT: u32 = 1000;

/// Find a single node by name, optionally narrowed by id, MIME type, and
/// parent folder.
///
/// Returns `Ok(None)` when nothing matches; absence is not an error. When
/// several nodes match, an arbitrary one is returned.
pub async fn find<S: RemoteSession + ?Sized>(
    session: &S,
    name: &str,
    id: Option<&str>,
    mime_type: Option<&str>,
    parent: Option<&DriveNode>,
) -> DriveResult<Option<DriveNode>> {
    let mut query = QueryBuilder::new().name_eq(name);
    if let Some(id) = id {
        query = query.id_eq(id);
    }
    if let Some(mime) = mime_type {
        query = query.mime_type_eq(mime);
    }
    if let Some(parent) = parent {
        if !parent.is_dir() {
            return Err(DriveError::invalid(format!(
                "'{}' is not a folder and cannot be searched as a parent",
                parent.name
            )));
        }
        query = query.in_parent(&parent.id);
    }

    let q = query.build();
    debug!("find: q={}", q);
    let records = session.list_files(&q, NODE_FIELDS, 1).await?;

    match records.first() {
        Some(record) => Ok(Some(DriveNode::from_record(record)?)),
        None => Ok(None),
    }
}

/// Find a folder by name. Same contract as [`find`], restricted to folders.
pub async fn find_folder<S: RemoteSession + ?Sized>(
    session: &S,
    name: &str,
    id: Option<&str>,
    parent: Option<&DriveNode>,
) -> DriveResult<Option<DriveNode>> {
    find(session, name, id, Some(mime_types::FOLDER), parent).await
}

/// List the direct children of a folder, sorted by name ascending.
pub async fn list_children<S: RemoteSession + ?Sized>(
    session: &S,
    parent: &DriveNode,
) -> DriveResult<Vec<DriveNode>> {
    if !parent.is_dir() {
        return Err(DriveError::invalid(format!(
            "'{}' is not a folder and has no children",
            parent.name
        )));
    }

    let q = QueryBuilder::new().in_parent(&parent.id).build();
    debug!("list_children: q={}", q);
    let records = session.list_files(&q, NODE_FIELDS, LIST_LIMIT).await?;

    let mut children = records
        .iter()
        .map(DriveNode::from_record)
        .collect::<DriveResult<Vec<_>>>()?;
    children.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(children)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::testing::FakeSession;
    use crate::types::{mime_types, DriveErrorKind};

    fn folder(id: &str, name: &str) -> DriveNode {
        DriveNode::from_record(&FakeSession::record(id, name, mime_types::FOLDER)).unwrap()
    }

    fn file(id: &str, name: &str) -> DriveNode {
        DriveNode::from_record(&FakeSession::record(id, name, "text/plain")).unwrap()
    }

    // ── find ──

    #[tokio::test]
    async fn find_returns_none_on_no_match() {
        let fake = FakeSession::new();
        let result = find(&fake, "missing.txt", None, None, None).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn find_returns_first_match() {
        let fake = FakeSession::new();
        fake.set_default_listing(vec![FakeSession::record("f1", "notes.txt", "text/plain")]);

        let node = find(&fake, "notes.txt", None, None, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(node.id, "f1");
        assert!(node.is_file());
    }

    #[tokio::test]
    async fn find_builds_exact_query() {
        let fake = FakeSession::new();
        let parent = folder("p1", "docs");
        find(
            &fake,
            "report.pdf",
            Some("abc"),
            Some("application/pdf"),
            Some(&parent),
        )
        .await
        .unwrap();

        let queries = fake.queries.lock().unwrap();
        assert_eq!(
            queries[0],
            "name='report.pdf' and id='abc' and \
             mimeType='application/pdf' and 'p1' in parents"
        );
    }

    #[tokio::test]
    async fn find_rejects_file_as_parent() {
        let fake = FakeSession::new();
        let not_a_folder = file("f1", "notes.txt");
        let err = find(&fake, "x", None, None, Some(&not_a_folder))
            .await
            .unwrap_err();
        assert_eq!(err.kind, DriveErrorKind::InvalidParameter);
    }

    // ── find_folder ──

    #[tokio::test]
    async fn find_folder_restricts_to_folder_marker() {
        let fake = FakeSession::new();
        find_folder(&fake, "docs", None, None).await.unwrap();

        let queries = fake.queries.lock().unwrap();
        assert_eq!(
            queries[0],
            "name='docs' and mimeType='application/vnd.google-apps.folder'"
        );
    }

    #[tokio::test]
    async fn find_folder_matches_find_with_folder_filter() {
        let fake = FakeSession::new();
        let parent = folder("p1", "docs");
        find_folder(&fake, "sub", Some("abc"), Some(&parent))
            .await
            .unwrap();
        find(
            &fake,
            "sub",
            Some("abc"),
            Some(mime_types::FOLDER),
            Some(&parent),
        )
        .await
        .unwrap();

        let queries = fake.queries.lock().unwrap();
        assert_eq!(queries[0], queries[1]);
    }

    #[tokio::test]
    async fn find_folder_returns_folder_node() {
        let fake = FakeSession::new();
        fake.set_default_listing(vec![FakeSession::record(
            "d1",
            "docs",
            mime_types::FOLDER,
        )]);

        let node = find_folder(&fake, "docs", None, None).await.unwrap().unwrap();
        assert!(node.is_dir());
    }

    // ── list_children ──

    #[tokio::test]
    async fn list_children_queries_parent_membership() {
        let fake = FakeSession::new();
        let parent = folder("p1", "docs");
        list_children(&fake, &parent).await.unwrap();

        let queries = fake.queries.lock().unwrap();
        assert_eq!(queries[0], "'p1' in parents");
    }

    #[tokio::test]
    async fn list_children_sorted_by_name() {
        let fake = FakeSession::new();
        fake.add_listing(
            "p1",
            vec![
                FakeSession::record("c1", "zebra.txt", "text/plain"),
                FakeSession::record("c2", "apple.txt", "text/plain"),
                FakeSession::record("c3", "mango", mime_types::FOLDER),
            ],
        );

        let parent = folder("p1", "docs");
        let children = list_children(&fake, &parent).await.unwrap();
        let names: Vec<&str> = children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["apple.txt", "mango", "zebra.txt"]);
    }

    #[tokio::test]
    async fn list_children_empty_folder() {
        let fake = FakeSession::new();
        fake.add_listing("p1", vec![]);
        let parent = folder("p1", "empty");
        assert!(list_children(&fake, &parent).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_children_rejects_file() {
        let fake = FakeSession::new();
        let not_a_folder = file("f1", "notes.txt");
        let err = list_children(&fake, &not_a_folder).await.unwrap_err();
        assert_eq!(err.kind, DriveErrorKind::InvalidParameter);
    }

    #[tokio::test]
    async fn list_children_surfaces_malformed_records() {
        let fake = FakeSession::new();
        let mut bad = FakeSession::record("c1", "x", "text/plain");
        bad.remove("mimeType");
        fake.add_listing("p1", vec![bad]);

        let parent = folder("p1", "docs");
        let err = list_children(&fake, &parent).await.unwrap_err();
        assert_eq!(err.kind, DriveErrorKind::InvalidNode);
    }
}
