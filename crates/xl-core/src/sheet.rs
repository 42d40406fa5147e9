//! A named sheet of cells.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use xl_engine::CellRef;

use crate::cell::Cell;

/// Shared handle to a cell. Formulas elsewhere in the document hold clones
/// of it through their links.
pub type CellHandle = Rc<RefCell<Cell>>;

/// Sparse cell storage, ordered row-major.
pub struct Sheet {
    title: String,
    cells: RefCell<BTreeMap<CellRef, CellHandle>>,
}

impl Sheet {
    pub fn new(title: impl Into<String>) -> Self {
        Sheet {
            title: title.into(),
            cells: RefCell::new(BTreeMap::new()),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn cell(&self, cell_ref: &CellRef) -> Option<CellHandle> {
        self.cells.borrow().get(cell_ref).cloned()
    }

    /// Store raw text in a cell, creating it if needed. An existing cell is
    /// updated in place so links to it stay valid.
    pub fn set(&self, cell_ref: CellRef, raw: &str) -> CellHandle {
        let mut cells = self.cells.borrow_mut();
        let handle = cells
            .entry(cell_ref)
            .or_insert_with(|| Rc::new(RefCell::new(Cell::new_empty())));
        handle.borrow_mut().set_value_untyped(raw);
        handle.clone()
    }

    /// Reset a cell to empty. Returns false if the cell was never populated.
    pub fn erase(&self, cell_ref: &CellRef) -> bool {
        match self.cells.borrow().get(cell_ref) {
            Some(handle) => {
                handle.borrow_mut().erase_value();
                true
            }
            None => false,
        }
    }

    /// Snapshot of every populated cell, row-major.
    pub fn cells(&self) -> Vec<(CellRef, CellHandle)> {
        self.cells
            .borrow()
            .iter()
            .map(|(r, c)| (*r, c.clone()))
            .collect()
    }

    /// Populated cells inside the rectangle spanned by two corners, row-major.
    pub fn range(&self, a: CellRef, b: CellRef) -> Vec<(CellRef, CellHandle)> {
        let top_left = CellRef::new(a.col.min(b.col), a.row.min(b.row));
        let bottom_right = CellRef::new(a.col.max(b.col), a.row.max(b.row));
        self.cells
            .borrow()
            .range(top_left..=bottom_right)
            .filter(|(r, _)| (top_left.col..=bottom_right.col).contains(&r.col))
            .map(|(r, c)| (*r, c.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(s: &str) -> CellRef {
        CellRef::parse(s).unwrap()
    }

    #[test]
    fn test_set_updates_in_place() {
        let sheet = Sheet::new("S");
        let first = sheet.set(r("A1"), "1");
        let second = sheet.set(r("A1"), "2");
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.borrow().raw_value(), "2");
        assert_eq!(sheet.len(), 1);
    }

    #[test]
    fn test_erase() {
        let sheet = Sheet::new("S");
        assert!(!sheet.erase(&r("A1")));
        sheet.set(r("A1"), "x");
        assert!(sheet.erase(&r("A1")));
        assert_eq!(sheet.cell(&r("A1")).unwrap().borrow().raw_value(), "");
    }

    #[test]
    fn test_range_skips_cells_outside_the_columns() {
        let sheet = Sheet::new("S");
        for name in ["A1", "B1", "C1", "A2", "C2", "B3", "D9"] {
            sheet.set(r(name), "1");
        }
        let names: Vec<String> = sheet
            .range(r("B3"), r("A1"))
            .into_iter()
            .map(|(c, _)| c.to_string())
            .collect();
        assert_eq!(names, vec!["A1", "B1", "A2", "B3"]);
    }
}
