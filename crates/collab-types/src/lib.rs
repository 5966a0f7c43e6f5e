//! Shared data model for the collaborative editing core: operations,
//! documents, change entries, versions, contributions, and cursors.

pub mod change;
pub mod contribution;
pub mod cursor;
pub mod document;
pub mod operation;
pub mod version;

pub use change::{ChangeEntry, ChangeType};
pub use contribution::UserContribution;
pub use cursor::{cursor_color, Cursor};
pub use document::{Document, DocumentStatus};
pub use operation::{Operation, OperationKind, OrderKey};
pub use version::Version;
