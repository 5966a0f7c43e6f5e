use chrono::{DateTime, Utc};

pub(crate) struct Member {
    pub(crate) user_name: String,
    pub(crate) joined_at: DateTime<Utc>,
}

/// A snapshot of one member's presence, returned by [`crate::RoomManager::list`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MemberInfo {
    pub user_id: String,
    pub user_name: String,
    pub joined_at: DateTime<Utc>,
}
