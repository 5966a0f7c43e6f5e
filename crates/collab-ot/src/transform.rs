use collab_types::{Operation, OperationKind};

/// Returns the form `a` must take to be applied **after** `b` has already
/// been applied to the same base state, so that both users' intentions are
/// preserved (spec §4.1).
///
/// Identity holds whenever either operand is a `RETAIN` (a no-op carries no
/// information to transform against) or the two operations target different
/// documents.
pub fn transform(a: &Operation, b: &Operation) -> Operation {
    if a.kind.is_retain() || b.kind.is_retain() || a.document_id != b.document_id {
        return a.clone();
    }

    let mut result = a.clone();
    result.kind = match (&a.kind, &b.kind) {
        (
            OperationKind::Insert {
                content: c1,
                position: pos1,
            },
            OperationKind::Insert {
                content: c2,
                position: pos2,
            },
        ) => transform_insert_insert(c1, *pos1, a, c2, *pos2, b),

        (
            OperationKind::Insert {
                content: c1,
                position: pos1,
            },
            OperationKind::Delete {
                length: len2,
                position: pos2,
            },
        ) => transform_insert_delete(c1, *pos1, a, *pos2, *len2, b),

        (
            OperationKind::Delete {
                length: len1,
                position: pos1,
            },
            OperationKind::Insert {
                content: c2,
                position: pos2,
            },
        ) => transform_delete_insert(*len1, *pos1, *pos2, c2),

        (
            OperationKind::Delete {
                length: len1,
                position: pos1,
            },
            OperationKind::Delete {
                length: len2,
                position: pos2,
            },
        ) => transform_delete_delete(*len1, *pos1, *pos2, *len2),

        // Unreachable: both RETAIN branches were already handled above.
        (OperationKind::Retain { .. }, _) | (_, OperationKind::Retain { .. }) => unreachable!(),
    };
    result
}

fn earlier(a: &Operation, b: &Operation) -> bool {
    a.order_key().is_earlier_than(&b.order_key())
}

fn transform_insert_insert(
    c1: &str,
    pos1: usize,
    a: &Operation,
    c2: &str,
    pos2: usize,
    b: &Operation,
) -> OperationKind {
    let len2 = c2.chars().count();
    let new_position = if pos1 < pos2 {
        pos1
    } else if pos1 > pos2 {
        pos1 + len2
    } else if earlier(a, b) {
        pos1
    } else {
        pos1 + len2
    };
    OperationKind::Insert {
        content: c1.to_string(),
        position: new_position,
    }
}

fn transform_insert_delete(
    c1: &str,
    pos1: usize,
    a: &Operation,
    pos2: usize,
    len2: usize,
    b: &Operation,
) -> OperationKind {
    let new_position = if pos1 < pos2 {
        pos1
    } else if pos1 > pos2 + len2 {
        pos1 - len2
    } else if pos1 == pos2 {
        if earlier(a, b) {
            pos1
        } else {
            pos2
        }
    } else {
        // a falls inside the deleted range.
        pos2
    };
    OperationKind::Insert {
        content: c1.to_string(),
        position: new_position,
    }
}

/// DELETE vs INSERT. `b`'s insertion lands somewhere relative to `a`'s
/// range; when it lands inside that range the result cannot represent both
/// the pre- and post-insertion remainders as one op, so (per spec) the
/// after-portion (the part of the range at-or-past the insertion point) is
/// preferred when non-empty, then the before-portion, then a zero-length
/// DELETE. This is a documented heuristic, not a lossless split — see
/// DESIGN.md.
fn transform_delete_insert(len1: usize, pos1: usize, pos2: usize, c2: &str) -> OperationKind {
    let clen2 = c2.chars().count();
    if pos1 + len1 <= pos2 {
        return OperationKind::Delete {
            length: len1,
            position: pos1,
        };
    }
    if pos1 >= pos2 + clen2 {
        return OperationKind::Delete {
            length: len1,
            position: pos1 + clen2,
        };
    }

    let before_len = pos2.saturating_sub(pos1).min(len1);
    let after_len = (pos1 + len1).saturating_sub(pos2);

    if after_len > 0 {
        OperationKind::Delete {
            length: after_len,
            position: pos2 + clen2,
        }
    } else if before_len > 0 {
        OperationKind::Delete {
            length: before_len,
            position: pos1,
        }
    } else {
        OperationKind::Delete {
            length: 0,
            position: pos2 + clen2,
        }
    }
}

fn transform_delete_delete(len1: usize, pos1: usize, pos2: usize, len2: usize) -> OperationKind {
    if pos1 + len1 <= pos2 {
        return OperationKind::Delete {
            length: len1,
            position: pos1,
        };
    }
    if pos1 >= pos2 + len2 {
        return OperationKind::Delete {
            length: len1,
            position: pos1 - len2,
        };
    }

    let overlap_start = pos1.max(pos2);
    let overlap_end = (pos1 + len1).min(pos2 + len2);
    let overlap = overlap_end.saturating_sub(overlap_start);
    let new_length = len1.saturating_sub(overlap);
    let new_position = if pos1 < pos2 { pos1 } else { pos2 };

    OperationKind::Delete {
        length: new_length,
        position: new_position,
    }
}

/// Folds [`transform`] over `history` in order, skipping any entry whose
/// `operation_id` equals `op.operation_id` (an operation is never
/// transformed against itself).
pub fn transform_against(op: &Operation, history: &[Operation]) -> Operation {
    let mut current = op.clone();
    for entry in history {
        if entry.operation_id.is_some() && entry.operation_id == op.operation_id {
            continue;
        }
        current = transform(&current, entry);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;
    use collab_types::Operation;

    fn insert_op(id: u64, user: &str, pos: usize, content: &str) -> Operation {
        let mut op = Operation::new(
            OperationKind::Insert {
                content: content.to_string(),
                position: pos,
            },
            user,
            "d1",
            0,
        );
        op.operation_id = Some(id);
        op
    }

    fn delete_op(id: u64, user: &str, pos: usize, len: usize) -> Operation {
        let mut op = Operation::new(
            OperationKind::Delete {
                length: len,
                position: pos,
            },
            user,
            "d1",
            0,
        );
        op.operation_id = Some(id);
        op
    }

    #[test]
    fn retain_operand_is_identity() {
        let a = insert_op(1, "u1", 0, "A");
        let retain = Operation::new(OperationKind::Retain { length: 3 }, "u2", "d1", 0);
        assert_eq!(transform(&a, &retain), a);
    }

    #[test]
    fn different_documents_is_identity() {
        let a = insert_op(1, "u1", 0, "A");
        let mut b = insert_op(2, "u2", 0, "B");
        b.document_id = "other".to_string();
        assert_eq!(transform(&a, &b), a);
    }

    #[test]
    fn same_position_insert_tie_break_lower_id_wins() {
        let a = insert_op(1, "u1", 0, "A");
        let b = insert_op(2, "u2", 0, "B");
        // a (earlier id) stays put; b, transformed against a, shifts right.
        assert!(matches!(
            transform(&a, &b).kind,
            OperationKind::Insert { position: 0, .. }
        ));
        assert!(matches!(
            transform(&b, &a).kind,
            OperationKind::Insert { position: 1, .. }
        ));
    }

    #[test]
    fn insert_past_delete_shifts_left() {
        let ins = insert_op(2, "u2", 10, "X");
        let del = delete_op(1, "u1", 0, 5);
        let transformed = transform(&ins, &del);
        assert!(matches!(
            transformed.kind,
            OperationKind::Insert { position: 5, .. }
        ));
    }

    #[test]
    fn insert_inside_deleted_range_collapses_to_delete_start() {
        let ins = insert_op(2, "u2", 2, "X");
        let del = delete_op(1, "u1", 0, 5);
        let transformed = transform(&ins, &del);
        assert!(matches!(
            transformed.kind,
            OperationKind::Insert { position: 0, .. }
        ));
    }

    #[test]
    fn delete_delete_overlap_shrinks_and_never_becomes_retain() {
        let a = delete_op(1, "u1", 0, 5); // [0,5)
        let b = delete_op(2, "u2", 3, 5); // [3,8), applied first
        let transformed = transform(&a, &b);
        match transformed.kind {
            OperationKind::Delete { length, position } => {
                assert_eq!(length, 3); // overlap is [3,5) => 2 chars removed
                assert_eq!(position, 0);
            }
            other => panic!("expected Delete, got {other:?}"),
        }
    }

    #[test]
    fn fully_overlapped_delete_becomes_zero_length_delete_not_retain() {
        let a = delete_op(1, "u1", 2, 2); // [2,4)
        let b = delete_op(2, "u2", 0, 10); // [0,10) fully covers a
        let transformed = transform(&a, &b);
        assert!(transformed.kind.is_delete());
        assert!(matches!(
            transformed.kind,
            OperationKind::Delete { length: 0, .. }
        ));
    }

    #[test]
    fn transform_against_skips_self() {
        let op = insert_op(3, "u1", 0, "Z");
        let history = vec![insert_op(3, "u1", 0, "Z")];
        assert_eq!(transform_against(&op, &history), op);
    }

    #[test]
    fn transform_against_folds_in_order() {
        let op = insert_op(3, "u3", 0, "C");
        let history = vec![insert_op(1, "u1", 0, "A"), insert_op(2, "u2", 0, "B")];
        let transformed = transform_against(&op, &history);
        // Both earlier inserts at position 0 push this one two slots right.
        assert!(matches!(
            transformed.kind,
            OperationKind::Insert { position: 2, .. }
        ));
    }
}
