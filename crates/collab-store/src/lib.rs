//! Document and user store collaborators (spec §6): account storage,
//! credential verification, and the REST CRUD surface stay out of scope
//! (spec §1) — this crate exposes only the narrow interfaces C3/C4/C5
//! actually call, backed by SQLite for a runnable binary and by in-memory
//! maps for tests.

pub mod connection;
pub mod document_store;
pub mod schema;
pub mod user_store;

pub use connection::{open, open_in_memory};
pub use document_store::{DocumentStore, InMemoryDocumentStore, SqliteDocumentStore};
pub use user_store::{InMemoryUserStore, SqliteUserStore, UserStore, UserSummary};
