//! A1-style cell coordinates.
//!
//! Columns are letters in bijective base 26 (`A`..`Z`, `AA`..), rows are
//! 1-based numbers. Internally both are zero-based.
//!
//! ```
//! use xl_engine::CellRef;
//!
//! let c: CellRef = "c12".parse().unwrap();
//! assert_eq!((c.col, c.row), (2, 11));
//! assert_eq!(c.to_string(), "C12");
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RefError;

/// Zero-based coordinate of a cell. Ordered row-major.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

fn coordinate_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z]+)([1-9][0-9]*)$").expect("coordinate regex must compile")
    })
}

impl CellRef {
    pub fn new(col: usize, row: usize) -> CellRef {
        CellRef { row, col }
    }

    /// `A1`-style text to a coordinate, ignoring letter case. None when the
    /// text is malformed or does not fit in `usize`.
    pub fn parse(text: &str) -> Option<CellRef> {
        let caps = coordinate_re().captures(text)?;
        let col = caps[1].bytes().try_fold(0usize, |acc, b| {
            let digit = usize::from(b.to_ascii_uppercase() - b'A') + 1;
            acc.checked_mul(26)?.checked_add(digit)
        })?;
        let row: usize = caps[2].parse().ok()?;
        Some(CellRef::new(col - 1, row - 1))
    }

    /// Column letters for a zero-based column index.
    pub fn col_to_letters(col: usize) -> String {
        let mut letters = Vec::new();
        let mut rest = Some(col);
        while let Some(n) = rest {
            letters.push(b'A' + (n % 26) as u8);
            rest = (n / 26).checked_sub(1);
        }
        letters.iter().rev().map(|&b| char::from(b)).collect()
    }
}

impl FromStr for CellRef {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CellRef::parse(s).ok_or_else(|| RefError::InvalidCell(s.to_string()))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&CellRef::col_to_letters(self.col))?;
        write!(f, "{}", self.row + 1)
    }
}
