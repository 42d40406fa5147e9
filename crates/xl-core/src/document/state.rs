use std::rc::Rc;

use xl_engine::{Builtins, CellRef, Functions, RefError};

use crate::context::{CellId, EvalContext};
use crate::link::{Link, LinkRegistry, RangeLink};
use crate::sheet::Sheet;

/// Title given to the first sheet when none is supplied.
pub const DEFAULT_SHEET: &str = "Sheet1";

/// UI-agnostic document state: an ordered list of sheets, one of them current.
pub struct Document {
    pub(crate) sheets: Vec<Rc<Sheet>>,
    pub(crate) current: usize,
    pub(crate) functions: Box<dyn Functions>,
    /// Show the raw text of formulas that fail to parse or bind instead of
    /// `#ERROR!` / `#REF!`.
    pub display_raw_errors: bool,
}

impl Document {
    /// Create a document with a single sheet.
    pub fn new(default_sheet: &str) -> Self {
        Self::with_functions(default_sheet, Box::new(Builtins))
    }

    /// Create a document whose formulas use a custom operator/function set.
    pub fn with_functions(default_sheet: &str, functions: Box<dyn Functions>) -> Self {
        let title = if default_sheet.trim().is_empty() {
            DEFAULT_SHEET
        } else {
            default_sheet
        };
        Document {
            sheets: vec![Rc::new(Sheet::new(title))],
            current: 0,
            functions,
            display_raw_errors: false,
        }
    }

    pub fn sheets(&self) -> &[Rc<Sheet>] {
        &self.sheets
    }

    /// Look a sheet up by title, ignoring case.
    pub fn sheet(&self, title: &str) -> Option<&Rc<Sheet>> {
        self.sheets
            .iter()
            .find(|s| s.title().eq_ignore_ascii_case(title))
    }

    pub fn current_sheet(&self) -> &Rc<Sheet> {
        &self.sheets[self.current]
    }

    /// A fresh evaluation context bound to this document.
    pub fn context(&self) -> EvalContext<'_> {
        EvalContext::with_functions(self, self.functions.as_ref())
    }

    /// The named sheet, or the current one for None.
    pub(crate) fn resolve_sheet(&self, title: Option<&str>) -> Result<&Rc<Sheet>, RefError> {
        match title {
            Some(title) => self
                .sheet(title)
                .ok_or_else(|| RefError::NoSuchSheet(title.to_string())),
            None => Ok(self.current_sheet()),
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DEFAULT_SHEET)
    }
}

fn parse_cell(cell: &str) -> Result<CellRef, RefError> {
    cell.parse()
}

impl LinkRegistry for Document {
    fn make_link(&self, cell: &str, sheet: Option<&str>) -> Result<Link, RefError> {
        let sheet = self.resolve_sheet(sheet)?;
        let cell_ref = parse_cell(cell)?;
        let id = CellId::new(sheet.title(), cell_ref);
        let handle = sheet
            .cell(&cell_ref)
            .ok_or_else(|| RefError::NoSuchCell(id.to_string()))?;
        Ok(Link::new(id, handle))
    }

    fn make_range(
        &self,
        from: &str,
        to: &str,
        sheet: Option<&str>,
    ) -> Result<RangeLink, RefError> {
        let sheet = self.resolve_sheet(sheet)?;
        Ok(RangeLink::new(sheet.clone(), parse_cell(from)?, parse_cell(to)?))
    }
}
