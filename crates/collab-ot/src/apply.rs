use collab_types::{Operation, OperationKind};

/// Applies `op` to `content`, producing the new document content.
///
/// All inputs are clamped defensively rather than rejected: a negative
/// position is impossible to express in `usize` (the encoding choice —
/// Unicode scalar offsets — already rules it out), a position past
/// end-of-document clamps to end-of-document, and a length exceeding the
/// remaining content clamps to that remainder. These clamps exist because
/// a transformed operation may carry a position that is legal only against
/// a base state slightly different from what this call actually holds
/// (spec §4.1).
pub fn apply(content: &str, op: &Operation) -> String {
    match &op.kind {
        OperationKind::Insert {
            content: insert,
            position,
        } => {
            if insert.is_empty() {
                return content.to_string();
            }
            let chars: Vec<char> = content.chars().collect();
            let pos = (*position).min(chars.len());
            let mut result = String::with_capacity(content.len() + insert.len());
            result.extend(chars[..pos].iter());
            result.push_str(insert);
            result.extend(chars[pos..].iter());
            result
        }
        OperationKind::Delete { length, position } => {
            if *length == 0 {
                return content.to_string();
            }
            let chars: Vec<char> = content.chars().collect();
            if *position >= chars.len() {
                return content.to_string();
            }
            let end = position.saturating_add(*length).min(chars.len());
            let mut result = String::with_capacity(content.len());
            result.extend(chars[..*position].iter());
            result.extend(chars[end..].iter());
            result
        }
        OperationKind::Retain { .. } => content.to_string(),
    }
}
