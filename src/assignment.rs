//! `[Sheet!]A1=raw` cell assignments given on the command line.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::CliError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub sheet: Option<String>,
    pub cell: String,
    pub raw: String,
}

fn assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?s)^(?:(?<sheet>[A-Za-z0-9_]+|'(?:[^']|'')*')!)?(?<cell>[A-Za-z]+[1-9][0-9]*)=(?<raw>.*)$",
        )
        .expect("assignment regex must compile")
    })
}

impl Assignment {
    pub fn parse(arg: &str) -> Result<Self, CliError> {
        let caps = assignment_re()
            .captures(arg)
            .ok_or_else(|| CliError::InvalidAssignment(arg.to_string()))?;
        let sheet = caps.name("sheet").map(|m| {
            let name = m.as_str();
            match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
                Some(quoted) => quoted.replace("''", "'"),
                None => name.to_string(),
            }
        });
        Ok(Assignment {
            sheet,
            cell: caps["cell"].to_string(),
            raw: caps["raw"].to_string(),
        })
    }
}
