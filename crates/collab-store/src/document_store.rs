use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use collab_errors::{CollabError, CollabResult};
use collab_types::{Document, DocumentStatus};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};

/// The document store collaborator the core consumes (spec §6): document
/// CRUD, content updates, and the `canEdit` authorization predicate. REST
/// surface, import/export, and admin listings are out of scope (spec §1) —
/// this trait exposes only what C3/C4/C5 actually call.
pub trait DocumentStore: Send + Sync {
    fn get_by_id(&self, id: &str) -> CollabResult<Option<Document>>;
    fn create(&self, document: Document) -> CollabResult<()>;
    fn update_content(&self, id: &str, content: &str) -> CollabResult<()>;
    fn can_user_edit(&self, document_id: &str, user_id: &str) -> CollabResult<bool>;
    fn add_collaborator(&self, document_id: &str, user_id: &str) -> CollabResult<()>;
    fn remove_collaborator(&self, document_id: &str, user_id: &str) -> CollabResult<()>;
}

/// SQLite-backed implementation against the spec §6 relational layout.
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn row_to_document(
        conn: &Connection,
        id: &str,
        title: String,
        content: String,
        owner_id: String,
        status: String,
        created_at: chrono::DateTime<Utc>,
        updated_at: chrono::DateTime<Utc>,
    ) -> rusqlite::Result<Document> {
        let mut stmt = conn.prepare(
            "SELECT collaborator_id FROM document_collaborators WHERE document_id = ?1",
        )?;
        let collaborator_ids = stmt
            .query_map(params![id], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<_>>()?;

        Ok(Document {
            id: id.to_string(),
            title,
            content,
            owner_id,
            collaborator_ids,
            status: if status == "DELETED" {
                DocumentStatus::Deleted
            } else {
                DocumentStatus::Active
            },
            created_at,
            updated_at,
        })
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn get_by_id(&self, id: &str) -> CollabResult<Option<Document>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT title, content, owner_id, status, created_at, updated_at \
                 FROM documents WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((title, content, owner_id, status, created_at, updated_at)) = row else {
            return Ok(None);
        };
        let created_at = created_at.parse().map_err(|e| {
            CollabError::Internal(format!("corrupt created_at for document {id}: {e}"))
        })?;
        let updated_at = updated_at.parse().map_err(|e| {
            CollabError::Internal(format!("corrupt updated_at for document {id}: {e}"))
        })?;
        let doc = Self::row_to_document(
            &conn, id, title, content, owner_id, status, created_at, updated_at,
        )?;
        Ok(Some(doc))
    }

    fn create(&self, document: Document) -> CollabResult<()> {
        let conn = self.conn.lock();
        let status = match document.status {
            DocumentStatus::Active => "ACTIVE",
            DocumentStatus::Deleted => "DELETED",
        };
        conn.execute(
            "INSERT INTO documents (id, title, content, owner_id, status, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                document.id,
                document.title,
                document.content,
                document.owner_id,
                status,
                document.created_at.to_rfc3339(),
                document.updated_at.to_rfc3339(),
            ],
        )?;
        for collaborator in &document.collaborator_ids {
            conn.execute(
                "INSERT OR IGNORE INTO document_collaborators (document_id, collaborator_id) \
                 VALUES (?1, ?2)",
                params![document.id, collaborator],
            )?;
        }
        Ok(())
    }

    fn update_content(&self, id: &str, content: &str) -> CollabResult<()> {
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE documents SET content = ?1, updated_at = ?2 WHERE id = ?3",
            params![content, Utc::now().to_rfc3339(), id],
        )?;
        if updated == 0 {
            return Err(CollabError::DocumentNotFound(id.to_string()));
        }
        Ok(())
    }

    fn can_user_edit(&self, document_id: &str, user_id: &str) -> CollabResult<bool> {
        match self.get_by_id(document_id)? {
            Some(doc) => Ok(doc.can_user_edit(user_id)),
            None => Ok(false),
        }
    }

    fn add_collaborator(&self, document_id: &str, user_id: &str) -> CollabResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR IGNORE INTO document_collaborators (document_id, collaborator_id) \
             VALUES (?1, ?2)",
            params![document_id, user_id],
        )?;
        Ok(())
    }

    fn remove_collaborator(&self, document_id: &str, user_id: &str) -> CollabResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "DELETE FROM document_collaborators WHERE document_id = ?1 AND collaborator_id = ?2",
            params![document_id, user_id],
        )?;
        Ok(())
    }
}

/// In-memory implementation used by unit and integration tests so the
/// session/room/version test suites don't need a SQLite file.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<String, Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, document: Document) {
        self.documents.write().insert(document.id.clone(), document);
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn get_by_id(&self, id: &str) -> CollabResult<Option<Document>> {
        Ok(self.documents.read().get(id).cloned())
    }

    fn create(&self, document: Document) -> CollabResult<()> {
        self.documents.write().insert(document.id.clone(), document);
        Ok(())
    }

    fn update_content(&self, id: &str, content: &str) -> CollabResult<()> {
        let mut docs = self.documents.write();
        let doc = docs
            .get_mut(id)
            .ok_or_else(|| CollabError::DocumentNotFound(id.to_string()))?;
        doc.content = content.to_string();
        doc.updated_at = Utc::now();
        Ok(())
    }

    fn can_user_edit(&self, document_id: &str, user_id: &str) -> CollabResult<bool> {
        Ok(self
            .documents
            .read()
            .get(document_id)
            .map(|d| d.can_user_edit(user_id))
            .unwrap_or(false))
    }

    fn add_collaborator(&self, document_id: &str, user_id: &str) -> CollabResult<()> {
        let mut docs = self.documents.write();
        let doc = docs
            .get_mut(document_id)
            .ok_or_else(|| CollabError::DocumentNotFound(document_id.to_string()))?;
        doc.collaborator_ids.insert(user_id.to_string());
        Ok(())
    }

    fn remove_collaborator(&self, document_id: &str, user_id: &str) -> CollabResult<()> {
        let mut docs = self.documents.write();
        let doc = docs
            .get_mut(document_id)
            .ok_or_else(|| CollabError::DocumentNotFound(document_id.to_string()))?;
        doc.collaborator_ids.remove(user_id);
        Ok(())
    }
}
