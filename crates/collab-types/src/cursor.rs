use serde::{Deserialize, Serialize};

/// A cursor relay event. Cursor updates are unordered with respect to
/// operations; clients clamp stale positions to the current document
/// length themselves (§5).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cursor {
    pub user_id: String,
    pub document_id: String,
    pub position: Option<usize>,
    pub user_name: String,
    pub color: String,
}

/// Deterministic cursor color for a user id, so the same user renders with
/// the same color on every client without a shared color-assignment
/// round trip. A small fixed palette keeps colors visually distinct.
pub fn cursor_color(user_id: &str) -> String {
    const PALETTE: &[&str] = &[
        "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
        "#bcf60c", "#fabebe", "#008080", "#e6beff",
    ];
    let hash = user_id.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
    PALETTE[(hash as usize) % PALETTE.len()].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_is_deterministic() {
        assert_eq!(cursor_color("alice"), cursor_color("alice"));
    }

    #[test]
    fn different_users_can_differ() {
        assert_ne!(cursor_color("alice"), cursor_color("bob"));
    }
}
