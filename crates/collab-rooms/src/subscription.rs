/// The four subscription destinations spec §6 exposes per document:
/// presence-bearing root, operations, cursors (presence-exempt), and the
/// explicit user list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionPath {
    Root(String),
    Operations(String),
    Cursors(String),
    Users(String),
}

impl SubscriptionPath {
    pub fn document_id(&self) -> &str {
        match self {
            SubscriptionPath::Root(d)
            | SubscriptionPath::Operations(d)
            | SubscriptionPath::Cursors(d)
            | SubscriptionPath::Users(d) => d,
        }
    }

    /// Parses `/<documentId>[/operations|/cursors|/users]`.
    pub fn parse(path: &str) -> Option<Self> {
        let trimmed = path.strip_prefix('/')?;
        let mut segments = trimmed.splitn(2, '/');
        let document_id = segments.next()?.to_string();
        if document_id.is_empty() {
            return None;
        }
        match segments.next() {
            None => Some(SubscriptionPath::Root(document_id)),
            Some("operations") => Some(SubscriptionPath::Operations(document_id)),
            Some("cursors") => Some(SubscriptionPath::Cursors(document_id)),
            Some("users") => Some(SubscriptionPath::Users(document_id)),
            Some(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_four_destinations() {
        assert_eq!(
            SubscriptionPath::parse("/doc1"),
            Some(SubscriptionPath::Root("doc1".to_string()))
        );
        assert_eq!(
            SubscriptionPath::parse("/doc1/operations"),
            Some(SubscriptionPath::Operations("doc1".to_string()))
        );
        assert_eq!(
            SubscriptionPath::parse("/doc1/cursors"),
            Some(SubscriptionPath::Cursors("doc1".to_string()))
        );
        assert_eq!(
            SubscriptionPath::parse("/doc1/users"),
            Some(SubscriptionPath::Users("doc1".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_paths() {
        assert_eq!(SubscriptionPath::parse("doc1"), None);
        assert_eq!(SubscriptionPath::parse("/"), None);
        assert_eq!(SubscriptionPath::parse("/doc1/bogus"), None);
    }
}
