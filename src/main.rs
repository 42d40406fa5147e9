//! xl - evaluate spreadsheet cells and formulas from the command line

mod assignment;
mod config;
mod error;

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use xl_core::{Document, XlError};

use assignment::Assignment;
use config::Config;
use error::CliError;

fn print_usage() {
    eprintln!("Usage: xl [OPTIONS] [ASSIGNMENT]...");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  [ASSIGNMENT]              Cell assignment such as A1=42, B1==A1*2 or Data!A1=x");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -s, --sheet <TITLE>       Add a sheet (can be repeated)");
    eprintln!("  -e, --eval <FORMULA>      Evaluate a formula and print its value (can be repeated)");
    eprintln!("  --config <FILE>           Read settings from FILE");
    eprintln!("  --no-config               Ignore the user config file");
    eprintln!("  --raw-errors              Show broken formulas as typed");
    eprintln!("  --list-functions          List the built-in functions");
    eprintln!("  -h, --help                Print help");
    eprintln!();
    eprintln!("Without --eval every populated cell is printed as Sheet!A1<TAB>value.");
}

#[derive(Debug, Default, PartialEq, Eq)]
struct Options {
    config_file: Option<PathBuf>,
    no_config: bool,
    raw_errors: bool,
    list_functions: bool,
    sheets: Vec<String>,
    formulas: Vec<String>,
    assignments: Vec<Assignment>,
}

/// Parse the arguments after the program name. None means help was requested.
fn parse_args(args: &[String]) -> Result<Option<Options>, CliError> {
    let mut opts = Options::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => return Ok(None),
            "-s" | "--sheet" => {
                i += 1;
                let title = args.get(i).ok_or(CliError::MissingValue("--sheet"))?;
                opts.sheets.push(title.clone());
            }
            "-e" | "--eval" => {
                i += 1;
                let formula = args.get(i).ok_or(CliError::MissingValue("--eval"))?;
                opts.formulas.push(formula.clone());
            }
            "--config" => {
                i += 1;
                let path = args.get(i).ok_or(CliError::MissingValue("--config"))?;
                opts.config_file = Some(PathBuf::from(path));
            }
            "--no-config" => opts.no_config = true,
            "--raw-errors" => opts.raw_errors = true,
            "--list-functions" => opts.list_functions = true,
            arg if arg.starts_with('-') => return Err(CliError::UnknownOption(arg.to_string())),
            arg => opts.assignments.push(Assignment::parse(arg)?),
        }
        i += 1;
    }
    if opts.no_config && opts.config_file.is_some() {
        return Err(CliError::ConflictingConfig);
    }
    Ok(Some(opts))
}

fn load_config(opts: &Options) -> anyhow::Result<Config> {
    if opts.no_config {
        return Ok(Config::default());
    }
    match &opts.config_file {
        Some(path) => Config::from_file(path),
        None => Config::load_default(),
    }
}

fn build_document(config: &Config, opts: &Options) -> anyhow::Result<Document> {
    let mut doc = Document::new(&config.default_sheet);
    doc.display_raw_errors = config.display_raw_errors || opts.raw_errors;
    for title in config.sheets.iter().chain(&opts.sheets) {
        doc.add_sheet(title)
            .with_context(|| format!("Cannot add sheet {:?}", title))?;
    }
    for a in &opts.assignments {
        doc.set_cell(a.sheet.as_deref(), &a.cell, &a.raw)
            .with_context(|| format!("Cannot assign {}", a.cell))?;
    }
    Ok(doc)
}

fn list_functions() {
    for f in xl_engine::builtins::FUNCTIONS {
        println!("{}\t{}", f.name, f.description);
    }
}

fn run(opts: Options) -> anyhow::Result<()> {
    if opts.list_functions {
        list_functions();
        return Ok(());
    }
    let config = load_config(&opts)?;
    log::debug!("using config {:?}", config);
    let doc = build_document(&config, &opts)?;

    if opts.formulas.is_empty() {
        for (id, text) in doc.recalculate() {
            println!("{}\t{}", id, text);
        }
        return Ok(());
    }
    for formula in &opts.formulas {
        match doc.evaluate_formula(formula) {
            Ok(value) => println!("{}", value),
            Err(XlError::Eval(e)) => {
                log::info!("{:?} failed: {}", formula, e);
                println!("{}", e.indicator());
            }
            Err(e) => return Err(e).with_context(|| format!("Cannot evaluate {:?}", formula)),
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().skip(1).collect();

    let opts = match parse_args(&args) {
        Ok(Some(opts)) => opts,
        Ok(None) => {
            print_usage();
            return;
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    if let Err(e) = run(opts) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let opts = parse_args(&args(&["-s", "Data", "--eval", "=A1", "A1=3", "--no-config"]))
            .unwrap()
            .unwrap();
        assert_eq!(opts.sheets, ["Data"]);
        assert_eq!(opts.formulas, ["=A1"]);
        assert_eq!(opts.assignments.len(), 1);
        assert!(opts.no_config);
    }

    #[test]
    fn test_parse_args_errors() {
        assert_eq!(parse_args(&args(&["-e"])), Err(CliError::MissingValue("--eval")));
        assert_eq!(
            parse_args(&args(&["--bogus"])),
            Err(CliError::UnknownOption("--bogus".to_string()))
        );
        assert_eq!(
            parse_args(&args(&["--config", "x.toml", "--no-config"])),
            Err(CliError::ConflictingConfig)
        );
        assert_eq!(parse_args(&args(&["--help"])), Ok(None));
    }

    #[test]
    fn test_build_document_from_config() {
        let config = Config {
            default_sheet: "Main".to_string(),
            sheets: vec!["Data".to_string()],
            display_raw_errors: false,
        };
        let opts = parse_args(&args(&["Data!A1=2", "A1==Data!A1*5"])).unwrap().unwrap();
        let doc = build_document(&config, &opts).unwrap();
        assert_eq!(doc.display_value(Some("Main"), "A1").unwrap(), "10");
    }

    #[test]
    fn test_assignment_to_unknown_sheet_fails() {
        let opts = parse_args(&args(&["Nope!A1=2"])).unwrap().unwrap();
        assert!(build_document(&Config::default(), &opts).is_err());
    }
}
