//! Per-pass evaluation state.
//!
//! An [`EvalContext`] remembers which cells are on the current evaluation
//! chain. Links evaluate their target only through [`EvalContext::visit`], so
//! a formula that reaches itself again fails with [`EvalError::Cycle`] instead
//! of recursing forever.
//!
//! Values worked out through [`EvalContext::evaluate`] are kept for the rest
//! of the pass, so a cell shared by many formulas is evaluated once. The
//! document cannot change while a context borrows it.

use std::collections::{HashMap, HashSet};
use std::fmt;

use xl_engine::{Builtins, CellRef, EvalError, Functions, Value};

use crate::link::LinkRegistry;

/// Identity of a cell within a document.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct CellId {
    pub sheet: String,
    pub cell: CellRef,
}

impl CellId {
    pub fn new(sheet: impl Into<String>, cell: CellRef) -> Self {
        CellId {
            sheet: sheet.into(),
            cell,
        }
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.cell)
    }
}

pub struct EvalContext<'a> {
    registry: &'a dyn LinkRegistry,
    functions: &'a dyn Functions,
    visited: HashSet<CellId>,
    chain: Vec<CellId>,
    memo: HashMap<CellId, Result<Value, EvalError>>,
}

impl<'a> EvalContext<'a> {
    /// A context using the built-in operators and functions.
    pub fn new(registry: &'a dyn LinkRegistry) -> Self {
        Self::with_functions(registry, &Builtins)
    }

    pub fn with_functions(registry: &'a dyn LinkRegistry, functions: &'a dyn Functions) -> Self {
        EvalContext {
            registry,
            functions,
            visited: HashSet::new(),
            chain: Vec::new(),
            memo: HashMap::new(),
        }
    }

    pub fn registry(&self) -> &'a dyn LinkRegistry {
        self.registry
    }

    pub fn functions(&self) -> &'a dyn Functions {
        self.functions
    }

    /// Forget every visited cell and every remembered value. Call between
    /// independent passes.
    pub fn reset(&mut self) {
        self.visited.clear();
        self.chain.clear();
        self.memo.clear();
    }

    /// Outcome of `id` if it was already evaluated in this pass.
    pub fn cached(&self, id: &CellId) -> Option<Result<Value, EvalError>> {
        self.memo.get(id).cloned()
    }

    pub fn mark_visited(&mut self, id: CellId) {
        self.visited.insert(id);
    }

    pub fn is_visited(&self, id: &CellId) -> bool {
        self.visited.contains(id)
    }

    /// Sheet of the cell currently being evaluated, if any. Unqualified
    /// references in that cell's formula resolve against it.
    pub fn current_sheet(&self) -> Option<&str> {
        self.chain.last().map(|id| id.sheet.as_str())
    }

    /// Run `f` with `id` marked as being evaluated.
    ///
    /// Fails without calling `f` when `id` is already marked.
    pub fn visit<T>(
        &mut self,
        id: &CellId,
        f: impl FnOnce(&mut Self) -> Result<T, EvalError>,
    ) -> Result<T, EvalError> {
        if !self.visited.insert(id.clone()) {
            log::warn!("circular reference detected at {}", id);
            return Err(EvalError::Cycle {
                cell: id.to_string(),
            });
        }
        self.chain.push(id.clone());
        let result = f(self);
        self.chain.pop();
        self.visited.remove(id);
        result
    }

    /// [`visit`](Self::visit) `id` unless its value is already known in
    /// this pass. Cycle failures depend on the path that reached the cell
    /// and are not remembered.
    pub fn evaluate(
        &mut self,
        id: &CellId,
        f: impl FnOnce(&mut Self) -> Result<Value, EvalError>,
    ) -> Result<Value, EvalError> {
        if let Some(result) = self.cached(id) {
            return result;
        }
        let result = self.visit(id, f);
        if !matches!(result, Err(EvalError::Cycle { .. })) {
            self.memo.insert(id.clone(), result.clone());
        }
        result
    }
}
