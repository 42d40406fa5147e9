use std::rc::Rc;

use xl_engine::{CellRef, RefError};

use super::Document;
use crate::cell::ValueType;
use crate::context::CellId;
use crate::error::{Result, XlError};
use crate::sheet::Sheet;

impl Document {
    /// Append a sheet. Titles are unique, ignoring case.
    pub fn add_sheet(&mut self, title: &str) -> Result<Rc<Sheet>> {
        let title = title.trim();
        if title.is_empty() {
            return Err(XlError::EmptySheetTitle);
        }
        if self.sheet(title).is_some() {
            return Err(XlError::DuplicateSheet(title.to_string()));
        }
        let sheet = Rc::new(Sheet::new(title));
        self.sheets.push(sheet.clone());
        // Formulas that failed on this sheet's name can bind now.
        self.invalidate_formulas();
        Ok(sheet)
    }

    /// Make the next sheet current, wrapping to the first after the last.
    pub fn next_sheet(&mut self) -> &Rc<Sheet> {
        self.current = (self.current + 1) % self.sheets.len();
        self.current_sheet()
    }

    /// Store raw text in a cell. `sheet` of None means the current sheet.
    pub fn set_cell(&mut self, sheet: Option<&str>, cell: &str, raw: &str) -> Result<CellId> {
        let (sheet, cell_ref) = self.locate(sheet, cell)?;
        let created = sheet.cell(&cell_ref).is_none();
        sheet.set(cell_ref, raw);
        log::debug!("set {}!{} to {:?}", sheet.title(), cell_ref, raw);
        if created {
            // References to this coordinate failed to bind until now.
            self.invalidate_formulas();
        }
        Ok(CellId::new(sheet.title(), cell_ref))
    }

    /// Reset a cell to empty.
    pub fn erase_cell(&mut self, sheet: Option<&str>, cell: &str) -> Result<()> {
        let (sheet, cell_ref) = self.locate(sheet, cell)?;
        sheet.erase(&cell_ref);
        Ok(())
    }

    pub(crate) fn locate(&self, sheet: Option<&str>, cell: &str) -> Result<(Rc<Sheet>, CellRef)> {
        let sheet = self.resolve_sheet(sheet)?.clone();
        let cell_ref = CellRef::parse(cell).ok_or_else(|| RefError::InvalidCell(cell.to_string()))?;
        Ok((sheet, cell_ref))
    }

    /// Send every formula cell back to the untyped state so it is compiled
    /// and bound again on its next read.
    pub(crate) fn invalidate_formulas(&mut self) {
        for sheet in &self.sheets {
            for (_, handle) in sheet.cells() {
                let mut cell = handle.borrow_mut();
                if cell.value_type() == ValueType::Formula {
                    let raw = cell.raw_value().to_string();
                    cell.set_value_untyped(raw);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_sheet_rejects_duplicates_and_blank_titles() {
        let mut doc = Document::new("Main");
        doc.add_sheet("Data").unwrap();
        assert_eq!(
            doc.add_sheet("data").err(),
            Some(XlError::DuplicateSheet("data".to_string()))
        );
        assert_eq!(doc.add_sheet("  ").err(), Some(XlError::EmptySheetTitle));
        assert_eq!(doc.sheets().len(), 2);
    }

    #[test]
    fn test_next_sheet_wraps() {
        let mut doc = Document::new("One");
        doc.add_sheet("Two").unwrap();
        assert_eq!(doc.current_sheet().title(), "One");
        assert_eq!(doc.next_sheet().title(), "Two");
        assert_eq!(doc.next_sheet().title(), "One");
    }

    #[test]
    fn test_set_cell_targets() {
        let mut doc = Document::new("One");
        doc.add_sheet("Two").unwrap();
        let id = doc.set_cell(Some("two"), "b2", "5").unwrap();
        assert_eq!(id.to_string(), "Two!B2");
        let id = doc.set_cell(None, "A1", "x").unwrap();
        assert_eq!(id.to_string(), "One!A1");
    }

    #[test]
    fn test_set_cell_rejects_bad_addresses() {
        let mut doc = Document::default();
        assert_eq!(
            doc.set_cell(None, "A0", "1").err(),
            Some(XlError::Reference(RefError::InvalidCell("A0".to_string())))
        );
        assert_eq!(
            doc.set_cell(Some("Nope"), "A1", "1").err(),
            Some(XlError::Reference(RefError::NoSuchSheet("Nope".to_string())))
        );
    }
}
