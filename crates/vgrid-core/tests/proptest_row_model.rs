//! Property-based tests for the row model.
//!
//! 1. Row ids and cell values survive a JSON round-trip with their variant.
//! 2. Rows survive a JSON round-trip, reserved fields included.
//! 3. Key extraction falls back to the row id for missing or null keys.

use std::collections::BTreeMap;

use proptest::prelude::*;
use vgrid_core::{CellValue, Row, RowId, RowKey};

// ── Helpers ─────────────────────────────────────────────────────────────

fn row_id_strategy() -> impl Strategy<Value = RowId> {
    prop_oneof![
        any::<i64>().prop_map(RowId::Num),
        "[a-z0-9]{0,8}".prop_map(RowId::Str),
    ]
}

fn cell_strategy() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        Just(CellValue::Null),
        any::<bool>().prop_map(CellValue::Bool),
        (-1e9f64..1e9).prop_map(CellValue::Number),
        "[ -~]{0,12}".prop_map(CellValue::Text),
    ]
}

fn row_strategy() -> impl Strategy<Value = Row> {
    (
        row_id_strategy(),
        prop::collection::vec(row_id_strategy(), 0..4),
        any::<bool>(),
        prop::collection::btree_map("c_[a-z]{1,6}", cell_strategy(), 0..6),
    )
        .prop_map(|(id, chain, root, values)| {
            let mut row = Row::new(id).with_parents(chain);
            if root {
                row = row.group_root("team");
            }
            row.values = values;
            row
        })
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Scalars
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn row_id_keeps_its_variant(id in row_id_strategy()) {
        let json = serde_json::to_string(&id).unwrap();
        let back: RowId = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, id);
    }

    #[test]
    fn cell_value_keeps_its_variant(value in cell_strategy()) {
        let json = serde_json::to_string(&value).unwrap();
        let back: CellValue = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, value);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Rows
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn row_survives_json(row in row_strategy()) {
        let json = serde_json::to_string(&row).unwrap();
        let back: Row = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, row);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Key extraction
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn missing_or_null_key_falls_back_to_id(id in row_id_strategy(), null in any::<bool>()) {
        let mut row = Row::new(id.clone());
        if null {
            row.values = BTreeMap::from([("sku".to_owned(), CellValue::Null)]);
        }
        prop_assert_eq!(RowKey::Column("sku".into()).key_of(&row), id.clone());
        prop_assert_eq!(RowKey::Id.key_of(&row), id);
    }

    #[test]
    fn integral_numbers_key_as_numbers(id in row_id_strategy(), n in -1_000_000i64..1_000_000) {
        let row = Row::new(id).with("sku", n);
        prop_assert_eq!(RowKey::Column("sku".into()).key_of(&row), RowId::Num(n));
    }
}
