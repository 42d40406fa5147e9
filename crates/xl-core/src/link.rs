//! Links from a formula to the cells it reads.

use std::fmt;
use std::rc::Rc;

use xl_engine::{CellRef, EvalError, RefError, Value};

use crate::context::{CellId, EvalContext};
use crate::sheet::{CellHandle, Sheet};

/// Resolves references written in formulas to live links.
pub trait LinkRegistry {
    /// Link to a single cell. `sheet` of None means the registry's default sheet.
    fn make_link(&self, cell: &str, sheet: Option<&str>) -> Result<Link, RefError>;

    /// Link to the rectangle spanned by two corners on one sheet.
    fn make_range(
        &self,
        from: &str,
        to: &str,
        sheet: Option<&str>,
    ) -> Result<RangeLink, RefError>;
}

/// Handle to one cell, read lazily.
#[derive(Clone)]
pub struct Link {
    id: CellId,
    cell: CellHandle,
}

impl Link {
    pub fn new(id: CellId, cell: CellHandle) -> Self {
        Link { id, cell }
    }

    pub fn id(&self) -> &CellId {
        &self.id
    }

    /// Current value of the target cell, evaluated under `ctx` at most once
    /// per pass.
    pub fn value(&self, ctx: &mut EvalContext<'_>) -> Result<Value, EvalError> {
        ctx.evaluate(&self.id, |ctx| {
            let mut cell = self.cell.try_borrow_mut().map_err(|_| EvalError::Cycle {
                cell: self.id.to_string(),
            })?;
            cell.value(ctx)
        })
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Link").field(&self.id.to_string()).finish()
    }
}

/// A rectangle of cells on one sheet. The populated cells are looked up
/// again on every walk, starting from the top-left corner.
#[derive(Clone)]
pub struct RangeLink {
    sheet: Rc<Sheet>,
    from: CellRef,
    to: CellRef,
}

impl RangeLink {
    pub fn new(sheet: Rc<Sheet>, from: CellRef, to: CellRef) -> Self {
        RangeLink { sheet, from, to }
    }

    pub fn links(&self) -> impl Iterator<Item = Link> + use<> {
        let title = self.sheet.title().to_string();
        self.sheet
            .range(self.from, self.to)
            .into_iter()
            .map(move |(cell_ref, cell)| Link::new(CellId::new(title.clone(), cell_ref), cell))
    }

    /// Values of the populated cells, row-major.
    pub fn values(&self, ctx: &mut EvalContext<'_>) -> Result<Vec<Value>, EvalError> {
        self.links().map(|link| link.value(ctx)).collect()
    }
}

impl fmt::Debug for RangeLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RangeLink({}!{}:{})", self.sheet.title(), self.from, self.to)
    }
}

/// A reference of a compiled formula, bound to the document.
#[derive(Clone, Debug)]
pub enum Binding {
    Cell(Link),
    Range(RangeLink),
}

impl Binding {
    pub fn resolve(&self, ctx: &mut EvalContext<'_>) -> Result<Value, EvalError> {
        match self {
            Binding::Cell(link) => link.value(ctx),
            Binding::Range(range) => range.values(ctx).map(Value::Range),
        }
    }
}
