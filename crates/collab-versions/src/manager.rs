use std::sync::Arc;

use chrono::Utc;
use collab_changelog::ChangeLogStore;
use collab_errors::{CollabError, CollabResult};
use collab_session::SessionManager;
use collab_store::DocumentStore;
use collab_types::{ChangeEntry, ChangeType, Version};

use crate::contribution::ContributionStore;
use crate::diff::{diff_lines, DocumentDiff};
use crate::store::VersionStore;

/// Composes the version store, change log, document store, contribution
/// tracking, and the session reset hook into the operations spec §4.5
/// names: `createInitial`, `create`, `revert`, `list`, `diff`.
pub struct VersionManager {
    versions: Arc<dyn VersionStore>,
    contributions: Arc<dyn ContributionStore>,
    change_log: Arc<dyn ChangeLogStore>,
    document_store: Arc<dyn DocumentStore>,
    sessions: Arc<SessionManager>,
}

impl VersionManager {
    pub fn new(
        versions: Arc<dyn VersionStore>,
        contributions: Arc<dyn ContributionStore>,
        change_log: Arc<dyn ChangeLogStore>,
        document_store: Arc<dyn DocumentStore>,
        sessions: Arc<SessionManager>,
    ) -> Self {
        Self {
            versions,
            contributions,
            change_log,
            document_store,
            sessions,
        }
    }

    /// Version 0, created alongside the document itself.
    pub fn create_initial(&self, document_id: &str, content: &str, user_id: &str) -> CollabResult<Version> {
        let version = Version {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            version_number: 0,
            content: content.to_string(),
            created_by: user_id.to_string(),
            created_at: Utc::now(),
            change_description: None,
        };
        self.versions.create(version.clone())?;
        Ok(version)
    }

    /// Appends the next version number. Rejects with `NoChanges` if the
    /// normalized new content equals the latest stored content and there
    /// are no unversioned changes to fold in (spec §4.5).
    pub fn create(
        &self,
        document_id: &str,
        content: &str,
        user_id: &str,
        description: Option<String>,
    ) -> CollabResult<Version> {
        let latest = self.versions.latest(document_id)?;
        let unversioned = self.change_log.list_unversioned(document_id)?;

        if let Some(latest) = &latest {
            if normalize(&latest.content) == normalize(content) && unversioned.is_empty() {
                return Err(CollabError::NoChanges(document_id.to_string()));
            }
        }

        let next_number = latest.map(|v| v.version_number + 1).unwrap_or(0);
        let version = Version {
            id: uuid::Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            version_number: next_number,
            content: content.to_string(),
            created_by: user_id.to_string(),
            created_at: Utc::now(),
            change_description: description,
        };
        self.versions.create(version.clone())?;
        self.change_log
            .link_unversioned_to_version(document_id, &version.id)?;

        self.record_contributions(&unversioned, version.created_at)?;

        log::info!(
            "created version {next_number} for document {document_id}, folding in {} changes",
            unversioned.len()
        );
        Ok(version)
    }

    fn record_contributions(&self, changes: &[ChangeEntry], at: chrono::DateTime<Utc>) -> CollabResult<()> {
        for change in changes {
            let (added, deleted) = match change.change_type {
                ChangeType::Insert => (change.content.as_deref().map(char_len).unwrap_or(0), 0),
                ChangeType::Delete => (0, change.content.as_deref().map(char_len).unwrap_or(0)),
                ChangeType::Update => (0, 0),
            };
            self.contributions
                .record(&change.document_id, &change.user_id, added as u64, deleted as u64, at)?;
        }
        Ok(())
    }

    /// Does NOT delete or overwrite existing versions. Updates the
    /// document store content to the target version's content, resets the
    /// in-memory session for the document, and creates a new version with
    /// the restored content (spec §4.5).
    pub fn revert(&self, document_id: &str, target_version_number: u64, user_id: &str) -> CollabResult<Version> {
        let target = self
            .versions
            .get(document_id, target_version_number)?
            .ok_or_else(|| {
                CollabError::DocumentNotFound(format!(
                    "version {target_version_number} of document {document_id}"
                ))
            })?;

        self.document_store.update_content(document_id, &target.content)?;
        self.sessions.reset(document_id);

        self.create(
            document_id,
            &target.content,
            user_id,
            Some(format!("Restored from version {target_version_number}")),
        )
    }

    pub fn list(&self, document_id: &str) -> CollabResult<Vec<Version>> {
        self.versions.list(document_id)
    }

    /// `from_version` defaults to the version immediately preceding
    /// `to_version`; if `to_version` is 0, the diff is against an empty
    /// document.
    pub fn diff(
        &self,
        document_id: &str,
        to_version: u64,
        from_version: Option<u64>,
    ) -> CollabResult<DocumentDiff> {
        let to = self
            .versions
            .get(document_id, to_version)?
            .ok_or_else(|| {
                CollabError::DocumentNotFound(format!("version {to_version} of document {document_id}"))
            })?;

        let from_content = match from_version.or(to_version.checked_sub(1)) {
            Some(n) => self.versions.get(document_id, n)?.map(|v| v.content).unwrap_or_default(),
            None => String::new(),
        };

        let mut diff = diff_lines(&from_content, &to.content);
        self.attribute(document_id, &to.id, &to.created_by, &mut diff)?;
        Ok(diff)
    }

    /// Resolves attribution for ADDED/REMOVED segments by scanning the
    /// change-log entries linked to the target version and matching on
    /// content: exact equality preferred, substring containment as a
    /// fallback, the version's creator as the last resort (spec §4.5).
    fn attribute(
        &self,
        _document_id: &str,
        version_id: &str,
        fallback_user_id: &str,
        diff: &mut DocumentDiff,
    ) -> CollabResult<()> {
        let entries = self.change_log.list_by_version(version_id)?;

        for segment in &mut diff.segments {
            if segment.segment_type == crate::diff::SegmentType::Unchanged {
                continue;
            }
            let trimmed = segment.content.trim_end_matches('\n');

            let exact = entries
                .iter()
                .find(|e| e.content.as_deref().map(|c| c.trim_end_matches('\n')) == Some(trimmed));
            let matched = exact.or_else(|| {
                entries.iter().find(|e| {
                    e.content
                        .as_deref()
                        .is_some_and(|c| !c.is_empty() && (trimmed.contains(c) || c.contains(trimmed)))
                })
            });

            segment.attributed_user_id = Some(
                matched
                    .map(|e| e.user_id.clone())
                    .unwrap_or_else(|| fallback_user_id.to_string()),
            );
        }
        Ok(())
    }
}

fn normalize(content: &str) -> String {
    content.trim_end_matches('\n').to_string()
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
