//! Pure operational transformation algebra: `transform`, `apply`, and
//! `transform_against`. This crate has no I/O and no dependency on any
//! other collaboration crate — it is the only component with an exhaustive
//! algebraic spec, and the primary target of property-based testing.

mod apply;
mod transform;

pub use apply::apply;
pub use transform::{transform, transform_against};

#[cfg(test)]
mod scenario_tests {
    //! The fixed scenarios from the testable-properties section, run end
    //! to end through `transform` + `apply` rather than as unit checks of
    //! one rule at a time.

    use collab_types::{Operation, OperationKind};

    use crate::{apply, transform};

    fn insert(id: u64, user: &str, pos: usize, content: &str) -> Operation {
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

    fn delete(id: u64, user: &str, pos: usize, len: usize) -> Operation {
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
    fn scenario_1_same_position_insert_is_deterministic() {
        let u1 = insert(1, "1", 0, "A");
        let u2 = insert(2, "2", 0, "B");

        let doc = apply("", &u1);
        let u2_transformed = transform(&u2, &u1);
        let doc = apply(&doc, &u2_transformed);

        assert_eq!(doc, "AB");
    }

    #[test]
    fn scenario_2_insert_then_delete_across_same_region() {
        // U1 INSERT(" World", 5), U2 DELETE(5, 0), both base 0, concurrent.
        // The delete is processed first here (arbitrary but fixed choice);
        // the insert is transformed against it.
        let u2_delete = delete(1, "2", 0, 5);
        let u1_insert = insert(2, "1", 5, " World");

        let doc = apply("Hello", &u2_delete);
        let u1_transformed = transform(&u1_insert, &u2_delete);
        let doc = apply(&doc, &u1_transformed);

        assert_eq!(doc, " World");
    }

    #[test]
    fn scenario_3_delete_insert_overlap_preserves_intent() {
        // "abcdef": U1 DELETE(3,1) ("bcd"), U2 INSERT("X",2), concurrent.
        // Processed with the delete first (no transform needed for it);
        // the insert is then transformed against the already-applied
        // delete using the INSERT-vs-DELETE "falls inside range" rule.
        // See DESIGN.md for why this ordering — not the DELETE-vs-INSERT
        // direction — is the one that reproduces the spec's stated result;
        // the other direction is a documented lossy heuristic (spec §9
        // Open Questions).
        let u1_delete = delete(1, "1", 1, 3);
        let u2_insert = insert(2, "2", 2, "X");

        let doc = apply("abcdef", &u1_delete);
        assert_eq!(doc, "aef");

        let u2_transformed = transform(&u2_insert, &u1_delete);
        let doc = apply(&doc, &u2_transformed);

        assert_eq!(doc, "aXef");
    }

    #[test]
    fn scenario_4_zero_length_delete_is_dropped_not_broadcast() {
        // On "abc": U1 DELETE(3,0), U2 DELETE(3,0) concurrent, same base.
        let u1_delete = delete(1, "1", 0, 3);
        let u2_delete = delete(2, "2", 0, 3);

        let doc = apply("abc", &u1_delete);
        assert_eq!(doc, "");

        let u2_transformed = transform(&u2_delete, &u1_delete);
        match u2_transformed.kind {
            OperationKind::Delete { length, .. } => assert_eq!(length, 0),
            other => panic!("expected a zero-length Delete, got {other:?}"),
        }
        // A zero-length delete must never be type-converted to Retain.
        assert!(u2_transformed.kind.is_delete());
    }
}
