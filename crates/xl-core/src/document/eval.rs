use xl_engine::formula::dependencies;
use xl_engine::{CellRef, Decimal, EvalError, Value, VarBin};

use super::Document;
use crate::cell::Cell;
use crate::context::{CellId, EvalContext};
use crate::error::Result;
use crate::sheet::Sheet;

impl Document {
    /// The text stored in a cell. Absent cells read as empty.
    pub fn raw_value(&self, sheet: Option<&str>, cell: &str) -> Result<String> {
        let (sheet, cell_ref) = self.locate(sheet, cell)?;
        Ok(sheet
            .cell(&cell_ref)
            .map(|handle| handle.borrow().raw_value().to_string())
            .unwrap_or_default())
    }

    pub fn value(&self, sheet: Option<&str>, cell: &str) -> Result<Value> {
        self.read(sheet, cell, |cell, ctx| cell.value(ctx))
    }

    pub fn decimal_value(&self, sheet: Option<&str>, cell: &str) -> Result<Decimal> {
        self.read(sheet, cell, |cell, ctx| cell.decimal_value(ctx))
    }

    pub fn bool_value(&self, sheet: Option<&str>, cell: &str) -> Result<bool> {
        self.read(sheet, cell, |cell, ctx| cell.bool_value(ctx))
    }

    /// Text to show for a cell. Evaluation failures show as an error marker;
    /// only a bad address is an error.
    pub fn display_value(&self, sheet: Option<&str>, cell: &str) -> Result<String> {
        let (sheet, cell_ref) = self.locate(sheet, cell)?;
        let mut ctx = self.context();
        Ok(self.display(&mut ctx, &sheet, cell_ref))
    }

    /// References read by the formula in a cell, in source order. Empty for
    /// cells that do not hold a formula.
    pub fn references(&self, sheet: Option<&str>, cell: &str) -> Result<VarBin> {
        let raw = self.raw_value(sheet, cell)?;
        if raw.len() > 1 && raw.starts_with('=') {
            Ok(dependencies(&raw)?)
        } else {
            Ok(VarBin::default())
        }
    }

    /// Evaluate every populated cell, sheet by sheet in row-major order, and
    /// return the displayed text of each.
    pub fn recalculate(&self) -> Vec<(CellId, String)> {
        let mut ctx = self.context();
        ctx.reset();
        let mut out = Vec::new();
        for sheet in &self.sheets {
            for (cell_ref, _) in sheet.cells() {
                let text = self.display(&mut ctx, sheet, cell_ref);
                out.push((CellId::new(sheet.title(), cell_ref), text));
            }
        }
        log::debug!("recalculated {} cells", out.len());
        out
    }

    /// Evaluate formula (or literal) text against the document without
    /// storing it. Unqualified references resolve against the current sheet.
    pub fn evaluate_formula(&self, source: &str) -> Result<Value> {
        let mut ctx = self.context();
        let mut cell = Cell::new_untyped(source);
        Ok(cell.value(&mut ctx)?)
    }

    fn read<T>(
        &self,
        sheet: Option<&str>,
        cell: &str,
        f: impl FnOnce(&mut Cell, &mut EvalContext<'_>) -> std::result::Result<T, EvalError>,
    ) -> Result<T> {
        let (sheet, cell_ref) = self.locate(sheet, cell)?;
        let mut ctx = self.context();
        Ok(with_cell(&mut ctx, &sheet, cell_ref, f)?)
    }

    fn display(&self, ctx: &mut EvalContext<'_>, sheet: &Sheet, cell_ref: CellRef) -> String {
        let shown = with_cell(ctx, sheet, cell_ref, |cell, ctx| {
            let text = cell.string_value(ctx);
            if self.display_raw_errors && cell.error().is_some() {
                Ok(cell.raw_value().to_string())
            } else {
                Ok(text)
            }
        });
        shown.unwrap_or_else(|e| e.indicator().to_string())
    }
}

/// Run `f` on a cell with the cell marked as being evaluated. Absent cells
/// are read as a fresh empty cell.
fn with_cell<T>(
    ctx: &mut EvalContext<'_>,
    sheet: &Sheet,
    cell_ref: CellRef,
    f: impl FnOnce(&mut Cell, &mut EvalContext<'_>) -> std::result::Result<T, EvalError>,
) -> std::result::Result<T, EvalError> {
    let Some(handle) = sheet.cell(&cell_ref) else {
        return f(&mut Cell::new_empty(), ctx);
    };
    let id = CellId::new(sheet.title(), cell_ref);
    ctx.visit(&id, |ctx| {
        let mut cell = handle.try_borrow_mut().map_err(|_| EvalError::Cycle {
            cell: id.to_string(),
        })?;
        f(&mut *cell, ctx)
    })
}
