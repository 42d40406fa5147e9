//! xl_core - UI-agnostic document model for the xl spreadsheet engine.
//!
//! A [`Document`] owns named [`Sheet`]s of lazily typed [`Cell`]s. Formula
//! cells are compiled by `xl_engine` and bound to the cells they read through
//! [`Link`]s; every read walks those links under an [`EvalContext`], which
//! turns circular references into `#CYCLE!` instead of unbounded recursion.

pub mod cell;
pub mod context;
pub mod document;
pub mod error;
pub mod link;
pub mod sheet;

pub use cell::{Cell, CellError, ValueType};
pub use context::{CellId, EvalContext};
pub use document::{DEFAULT_SHEET, Document};
pub use error::{Result, XlError};
pub use link::{Binding, Link, LinkRegistry, RangeLink};
pub use sheet::{CellHandle, Sheet};

#[cfg(test)]
mod tests {
    use super::*;
    use xl_engine::{Decimal, EvalError, RefError, Value};

    fn num(n: i64) -> Value {
        Value::Decimal(Decimal::from(n))
    }

    fn shown(doc: &Document, cell: &str) -> String {
        doc.display_value(None, cell).unwrap()
    }

    #[test]
    fn test_missing_reference_is_a_reference_error() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "1").unwrap();
        doc.set_cell(None, "B1", "=SUM(A1,A2)").unwrap();
        assert_eq!(shown(&doc, "B1"), "#REF!");
        let sheet = doc.current_sheet().clone();
        let handle = sheet.cell(&"B1".parse().unwrap()).unwrap();
        assert!(matches!(
            handle.borrow().error(),
            Some(CellError::Reference(RefError::NoSuchCell(_)))
        ));
    }

    #[test]
    fn test_cycle_is_reported_not_followed() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "=B1").unwrap();
        doc.set_cell(None, "B1", "=A1").unwrap();
        assert_eq!(shown(&doc, "A1"), "#CYCLE!");
        assert_eq!(shown(&doc, "B1"), "#CYCLE!");
        assert!(matches!(
            doc.value(None, "A1"),
            Err(XlError::Eval(EvalError::Cycle { .. }))
        ));
    }

    #[test]
    fn test_self_reference_is_a_cycle() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "=A1+1").unwrap();
        assert_eq!(shown(&doc, "A1"), "#CYCLE!");
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "2").unwrap();
        doc.set_cell(None, "B1", "=A1*3").unwrap();
        doc.set_cell(None, "C1", "=A1+B1+B1").unwrap();
        assert_eq!(doc.value(None, "C1").unwrap(), num(14));
    }

    #[test]
    fn test_cross_sheet_references() {
        let mut doc = Document::new("Main");
        doc.add_sheet("Rates").unwrap();
        doc.add_sheet("My Data").unwrap();
        doc.set_cell(Some("Rates"), "A1", "0.5").unwrap();
        doc.set_cell(Some("My Data"), "B2", "10").unwrap();
        doc.set_cell(None, "A1", "='My Data'!B2*Rates!A1").unwrap();
        assert_eq!(shown(&doc, "A1"), "5");
    }

    #[test]
    fn test_unqualified_reference_stays_on_its_own_sheet() {
        let mut doc = Document::new("Main");
        doc.add_sheet("Other").unwrap();
        doc.set_cell(None, "B1", "1").unwrap();
        doc.set_cell(Some("Other"), "B1", "100").unwrap();
        doc.set_cell(Some("Other"), "A1", "=B1+1").unwrap();
        doc.set_cell(None, "A1", "=Other!A1").unwrap();
        assert_eq!(shown(&doc, "A1"), "101");
    }

    #[test]
    fn test_missing_sheet_binds_once_added() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "=Later!A1+1").unwrap();
        assert_eq!(shown(&doc, "A1"), "#REF!");
        doc.add_sheet("Later").unwrap();
        doc.set_cell(Some("Later"), "A1", "41").unwrap();
        assert_eq!(shown(&doc, "A1"), "42");
    }

    #[test]
    fn test_ranges_skip_empty_cells() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "1").unwrap();
        doc.set_cell(None, "A3", "5").unwrap();
        doc.set_cell(None, "B2", "x").unwrap();
        doc.set_cell(None, "C1", "=SUM(A1:A4)").unwrap();
        doc.set_cell(None, "C2", "=COUNT(A1:B3)").unwrap();
        assert_eq!(doc.value(None, "C1").unwrap(), num(6));
        assert_eq!(shown(&doc, "C2"), "2");
        doc.set_cell(None, "A2", "4").unwrap();
        assert_eq!(doc.value(None, "C1").unwrap(), num(10));
    }

    #[test]
    fn test_reversed_range_corners() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "1").unwrap();
        doc.set_cell(None, "B2", "2").unwrap();
        doc.set_cell(None, "C1", "=SUM(B2:A1)").unwrap();
        assert_eq!(doc.value(None, "C1").unwrap(), num(3));
    }

    #[test]
    fn test_multi_sheet_range_is_a_reference_error() {
        let mut doc = Document::new("One");
        doc.add_sheet("Two").unwrap();
        doc.set_cell(None, "A1", "1").unwrap();
        doc.set_cell(Some("Two"), "A2", "2").unwrap();
        doc.set_cell(None, "B1", "=SUM(One!A1:Two!A2)").unwrap();
        doc.set_cell(None, "B2", "=SUM(A1:Two!A2)").unwrap();
        assert_eq!(shown(&doc, "B1"), "#REF!");
        assert_eq!(shown(&doc, "B2"), "#REF!");
    }

    #[test]
    fn test_range_containing_itself_is_a_cycle() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "1").unwrap();
        doc.set_cell(None, "A2", "=SUM(A1:A3)").unwrap();
        assert_eq!(shown(&doc, "A2"), "#CYCLE!");
    }

    #[test]
    fn test_erased_cell_reads_as_zero_in_formulas() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "7").unwrap();
        doc.set_cell(None, "B1", "=A1+1").unwrap();
        assert_eq!(shown(&doc, "B1"), "8");
        doc.erase_cell(None, "A1").unwrap();
        assert_eq!(shown(&doc, "B1"), "1");
    }

    #[test]
    fn test_errors_propagate_through_references() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "=1/0").unwrap();
        doc.set_cell(None, "B1", "=A1+1").unwrap();
        doc.set_cell(None, "C1", "=NOPE(1)").unwrap();
        doc.set_cell(None, "D1", "=\"a\"+1").unwrap();
        assert_eq!(shown(&doc, "B1"), "#DIV/0!");
        assert_eq!(shown(&doc, "C1"), "#NAME?");
        assert_eq!(shown(&doc, "D1"), "#VALUE!");
    }

    #[test]
    fn test_text_and_bool_results() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "world").unwrap();
        doc.set_cell(None, "A2", "=CONCAT(\"hello \", A1)").unwrap();
        doc.set_cell(None, "A3", "=IF(LEN(A1)>3, TRUE, FALSE)").unwrap();
        assert_eq!(shown(&doc, "A2"), "hello world");
        assert!(doc.bool_value(None, "A3").unwrap());
    }

    #[test]
    fn test_shared_references_are_evaluated_once_per_pass() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "1").unwrap();
        for row in 2..=40 {
            let formula = format!("=A{0}+A{0}", row - 1);
            doc.set_cell(None, &format!("A{}", row), &formula).unwrap();
        }
        assert_eq!(
            doc.value(None, "A40").unwrap(),
            Value::Decimal(Decimal::from(1_u64 << 39))
        );

        let rows = doc.recalculate();
        assert_eq!(rows.len(), 40);
        assert_eq!(rows[39].1, "549755813888");
    }

    #[test]
    fn test_edits_between_reads_are_seen() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "2").unwrap();
        doc.set_cell(None, "B1", "=A1+A1").unwrap();
        assert_eq!(doc.value(None, "B1").unwrap(), num(4));
        doc.set_cell(None, "A1", "5").unwrap();
        assert_eq!(doc.value(None, "B1").unwrap(), num(10));
        assert_eq!(doc.recalculate()[1].1, "10");
    }

    #[test]
    fn test_long_and_deep_formulas_in_cells() {
        let mut doc = Document::default();
        doc.set_cell(None, "A1", "5").unwrap();
        doc.set_cell(None, "B1", &format!("=A1{}", "+1".repeat(50_000))).unwrap();
        assert_eq!(doc.value(None, "B1").unwrap(), num(50_005));

        let deep = format!("={}1{}", "(".repeat(500), ")".repeat(500));
        doc.set_cell(None, "C1", &deep).unwrap();
        assert_eq!(shown(&doc, "C1"), "#ERROR!");
    }
}
