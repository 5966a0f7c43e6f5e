use parking_lot::RwLock;

use collab_errors::CollabResult;
use collab_types::ChangeEntry;

use crate::{ChangeLogStore, Order};

/// In-memory change log for tests: a `Vec` preserves insertion order for
/// the tie-break, and filtering/sorting happens on read rather than being
/// indexed, which is fine at test scale.
#[derive(Default)]
pub struct InMemoryChangeLog {
    entries: RwLock<Vec<ChangeEntry>>,
}

impl InMemoryChangeLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeLogStore for InMemoryChangeLog {
    fn append(&self, entry: ChangeEntry) -> CollabResult<()> {
        self.entries.write().push(entry);
        Ok(())
    }

    fn list_by_document(&self, document_id: &str, order: Order) -> CollabResult<Vec<ChangeEntry>> {
        let mut matching: Vec<ChangeEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.document_id == document_id)
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.timestamp);
        if order == Order::Descending {
            matching.reverse();
        }
        Ok(matching)
    }

    fn list_unversioned(&self, document_id: &str) -> CollabResult<Vec<ChangeEntry>> {
        let mut matching: Vec<ChangeEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.document_id == document_id && e.version_id.is_none())
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.timestamp);
        Ok(matching)
    }

    fn list_by_version(&self, version_id: &str) -> CollabResult<Vec<ChangeEntry>> {
        let mut matching: Vec<ChangeEntry> = self
            .entries
            .read()
            .iter()
            .filter(|e| e.version_id.as_deref() == Some(version_id))
            .cloned()
            .collect();
        matching.sort_by_key(|e| e.timestamp);
        Ok(matching)
    }

    fn link_unversioned_to_version(&self, document_id: &str, version_id: &str) -> CollabResult<()> {
        let mut entries = self.entries.write();
        for entry in entries
            .iter_mut()
            .filter(|e| e.document_id == document_id && e.version_id.is_none())
        {
            entry.version_id = Some(version_id.to_string());
        }
        Ok(())
    }

    fn unlink_from_versions(&self, document_id: &str, version_ids: &[String]) -> CollabResult<()> {
        let mut entries = self.entries.write();
        for entry in entries.iter_mut().filter(|e| e.document_id == document_id) {
            if let Some(vid) = &entry.version_id {
                if version_ids.iter().any(|v| v == vid) {
                    entry.version_id = None;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use collab_types::ChangeType;

    use super::*;

    fn entry(doc: &str, version_id: Option<&str>) -> ChangeEntry {
        ChangeEntry {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: doc.to_string(),
            user_id: "u1".to_string(),
            change_type: ChangeType::Insert,
            content: Some("x".to_string()),
            position: 0,
            timestamp: Utc::now(),
            version_id: version_id.map(|s| s.to_string()),
        }
    }

    #[test]
    fn unversioned_changes_link_to_a_new_version() {
        let log = InMemoryChangeLog::new();
        log.append(entry("d1", None)).unwrap();
        log.append(entry("d1", None)).unwrap();
        assert_eq!(log.list_unversioned("d1").unwrap().len(), 2);

        log.link_unversioned_to_version("d1", "v1").unwrap();
        assert_eq!(log.list_unversioned("d1").unwrap().len(), 0);
        assert_eq!(log.list_by_version("v1").unwrap().len(), 2);
    }

    #[test]
    fn unlink_clears_version_id() {
        let log = InMemoryChangeLog::new();
        log.append(entry("d1", Some("v1"))).unwrap();
        log.unlink_from_versions("d1", &["v1".to_string()]).unwrap();
        assert_eq!(log.list_by_version("v1").unwrap().len(), 0);
        assert_eq!(log.list_unversioned("d1").unwrap().len(), 1);
    }
}
