//! xl_engine - the xl spreadsheet formula language.
//!
//! Formula text goes through [`formula::tokenize`], [`formula::parse`] and
//! [`formula::compile`]. Compilation yields a [`Program`] and a [`VarBin`]
//! listing the references the formula reads; the caller resolves those
//! references to [`Value`]s and runs the program over them with a
//! [`Functions`] implementation such as [`Builtins`].

pub mod builtins;
pub mod cell_ref;
pub mod error;
pub mod formula;
pub mod value;

pub use builtins::{Builtins, Functions};
pub use cell_ref::CellRef;
pub use error::{EvalError, ParseError, RefError};
pub use formula::{Program, VarBin};
pub use value::Value;

pub use bigdecimal::BigDecimal as Decimal;
