//! Intervention list computation.
//!
//! An intervention list is every register row whose identifier does not appear in the tracked
//! table. The computation is a hash-set filter: O(n + m), register order preserved, duplicate
//! register rows kept, and register rows without an identifier always included since they can
//! never match.

use crate::identifier::IdentifierKey;
use crate::table::Table;
use crate::SyncResult;
use std::collections::HashSet;

/// Computes the intervention list when both tables name the identifier column the same way.
///
/// # Errors
///
/// Returns [`crate::SyncError::MissingIdentifierColumn`] if either table lacks `id_field`.
pub fn compute_intervention(
    register: &Table,
    tracked: &Table,
    id_field: &str,
) -> SyncResult<Table> {
    compute_intervention_keyed(register, id_field, tracked, id_field)
}

/// Computes the intervention list for tables whose identifier columns are named differently.
///
/// # Errors
///
/// Returns [`crate::SyncError::MissingIdentifierColumn`] if `register` lacks `register_id` or
/// `tracked` lacks `tracked_id`. The tracked check applies even when `tracked` has no rows.
pub fn compute_intervention_keyed(
    register: &Table,
    register_id: &str,
    tracked: &Table,
    tracked_id: &str,
) -> SyncResult<Table> {
    let register_idx = register.require_column(register_id)?;
    let tracked_idx = tracked.require_column(tracked_id)?;

    let tracked_keys = tracked_keys(tracked, tracked_idx);

    let interventions = register.filter_rows(|row| {
        match row.get(register_idx).and_then(IdentifierKey::from_scalar) {
            Some(key) => !tracked_keys.contains(&key),
            None => true,
        }
    });

    tracing::debug!(
        register = register.name(),
        register_rows = register.len(),
        tracked_keys = tracked_keys.len(),
        interventions = interventions.len(),
        "computed intervention list"
    );

    Ok(interventions)
}

fn tracked_keys(tracked: &Table, idx: usize) -> HashSet<IdentifierKey> {
    tracked
        .rows()
        .iter()
        .filter_map(|row| row.get(idx).and_then(IdentifierKey::from_scalar))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Scalar;
    use crate::SyncError;

    const ID: &str = "NHS number";

    fn register(rows: &[(&str, &str)]) -> Table {
        Table::from_rows(
            "Diabetes",
            [ID, "Name"],
            rows.iter().map(|(id, name)| vec![*id, *name]),
        )
        .expect("register")
    }

    fn tracked(ids: &[&str]) -> Table {
        Table::from_rows("tracked", [ID], ids.iter().map(|id| vec![*id])).expect("tracked")
    }

    fn ids(table: &Table) -> Vec<String> {
        table
            .rows()
            .iter()
            .map(|r| r.cells()[0].to_string())
            .collect()
    }

    #[test]
    fn keeps_untracked_rows() {
        let out = compute_intervention(
            &register(&[("111", "A"), ("222", "B")]),
            &tracked(&["111"]),
            ID,
        )
        .expect("compute");

        assert_eq!(out.columns(), &[ID.to_string(), "Name".to_string()]);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out.rows()[0].cells(),
            &[Scalar::text("222"), Scalar::text("B")]
        );
    }

    #[test]
    fn duplicate_register_rows_each_appear_in_order() {
        let out = compute_intervention(
            &register(&[("333", "first"), ("111", "x"), ("333", "second")]),
            &tracked(&["111"]),
            ID,
        )
        .expect("compute");

        let names: Vec<String> = out.rows().iter().map(|r| r.cells()[1].to_string()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn duplicate_tracked_ids_collapse() {
        let out = compute_intervention(
            &register(&[("111", "A"), ("222", "B")]),
            &tracked(&["111", "111", "111"]),
            ID,
        )
        .expect("compute");
        assert_eq!(ids(&out), vec!["222"]);
    }

    #[test]
    fn empty_tracked_returns_register_unchanged() {
        let reg = register(&[("111", "A"), ("", "no id"), ("222", "B")]);
        let out = compute_intervention(&reg, &tracked(&[]), ID).expect("compute");
        assert_eq!(out, reg);
    }

    #[test]
    fn fully_tracked_register_yields_empty_list() {
        let out = compute_intervention(
            &register(&[("111", "A"), ("222", "B")]),
            &tracked(&["222", "111", "999"]),
            ID,
        )
        .expect("compute");
        assert!(out.is_empty());
        assert_eq!(out.columns().len(), 2);
    }

    #[test]
    fn rows_without_identifier_are_always_included() {
        let out = compute_intervention(
            &register(&[("", "blank"), ("   ", "spaces"), ("111", "A")]),
            &tracked(&["111", ""]),
            ID,
        )
        .expect("compute");
        let names: Vec<String> = out.rows().iter().map(|r| r.cells()[1].to_string()).collect();
        assert_eq!(names, vec!["blank", "spaces"]);
    }

    #[test]
    fn matches_formatted_text_against_numeric_tracked_ids() {
        let reg = register(&[("943 476 5919", "A"), ("943 476 5920", "B")]);
        let tracked =
            Table::from_rows("tracked", [ID], [vec![Scalar::Number(9434765919.0)]]).expect("t");

        let out = compute_intervention(&reg, &tracked, ID).expect("compute");
        assert_eq!(ids(&out), vec!["943 476 5920"]);
    }

    #[test]
    fn differently_named_identifier_columns() {
        let reg = register(&[("111", "A"), ("222", "B")]);
        let tracked = Table::from_rows("tracked", ["Patient", "NHS"], [vec!["A", "111"]])
            .expect("tracked");

        let out = compute_intervention_keyed(&reg, ID, &tracked, "NHS").expect("compute");
        assert_eq!(ids(&out), vec!["222"]);
    }

    #[test]
    fn missing_register_column_fails_fast() {
        let reg = Table::from_rows("Diabetes", ["Name"], [vec!["A"]]).expect("register");
        let err = compute_intervention(&reg, &tracked(&["1"]), ID).expect_err("missing column");
        match err {
            SyncError::MissingIdentifierColumn { table, column } => {
                assert_eq!(table, "Diabetes");
                assert_eq!(column, ID);
            }
            other => panic!("expected MissingIdentifierColumn, got {other:?}"),
        }
    }

    #[test]
    fn missing_tracked_column_fails_even_without_rows() {
        let empty = Table::new("tracked", vec!["Name".into()]).expect("tracked");
        let err = compute_intervention(&register(&[("111", "A")]), &empty, ID)
            .expect_err("missing column");
        assert!(matches!(err, SyncError::MissingIdentifierColumn { .. }));
    }

    #[test]
    fn output_is_an_ordered_subsequence_and_sound_and_complete() {
        let reg = register(&[
            ("5", "e"),
            ("1", "a"),
            ("4", "d"),
            ("2", "b"),
            ("", "blank"),
            ("3", "c"),
            ("1", "a2"),
        ]);
        let tracked_ids = ["1", "3"];
        let out = compute_intervention(&reg, &tracked(&tracked_ids), ID).expect("compute");

        // subsequence in register order
        let mut cursor = reg.rows().iter();
        for row in out.rows() {
            assert!(cursor.any(|r| r == row), "row out of order: {row:?}");
        }

        // soundness and completeness
        for row in reg.rows() {
            let id = row.cells()[0].to_string();
            let tracked = tracked_ids.contains(&id.as_str());
            let present = out.rows().contains(row);
            assert_eq!(present, !tracked, "row {row:?}");
        }
    }

    #[test]
    fn computation_is_idempotent() {
        let reg = register(&[("111", "A"), ("222", "B"), ("333", "C")]);
        let tr = tracked(&["222"]);
        let first = compute_intervention(&reg, &tr, ID).expect("first");
        let second = compute_intervention(&reg, &tr, ID).expect("second");
        assert_eq!(first, second);
    }
}
