//! Document state and logic (UI-agnostic).

mod eval;
mod ops;
mod state;

pub use state::{DEFAULT_SHEET, Document};
