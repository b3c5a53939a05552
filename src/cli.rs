//! CLI argument parsing for callsig

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format for match results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned columns (default)
    #[default]
    Text,
    /// JSON document with matches and summary
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "callsig")]
#[command(version)]
#[command(about = "Match decompiled call sites against YAML call signatures", long_about = None)]
pub struct Cli {
    /// Program dump (JSON) exported from the decompiler
    #[arg(value_name = "PROGRAM", required_unless_present = "list")]
    pub program: Option<PathBuf>,

    /// Directory searched recursively for signature files
    #[arg(short = 's', long = "signatures", value_name = "DIR")]
    pub signatures: Option<PathBuf>,

    /// Configuration file (defaults to ./callsig.toml when present)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long = "format", value_enum)]
    pub format: Option<OutputFormat>,

    /// Print the loaded signatures and exit
    #[arg(long = "list")]
    pub list: bool,

    /// Order matches by call address instead of scan order
    #[arg(long = "sort")]
    pub sort: bool,

    /// Exit with an error if any signature file fails to load
    #[arg(long = "fail-on-load-error")]
    pub fail_on_load_error: bool,

    /// Also scan library functions
    #[arg(long = "include-library")]
    pub include_library: bool,

    /// Also scan thunk functions
    #[arg(long = "include-thunks")]
    pub include_thunks: bool,

    /// Enable trace-level logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_program() {
        let cli = Cli::parse_from(["callsig", "dump.json"]);
        assert_eq!(cli.program, Some(PathBuf::from("dump.json")));
        assert!(cli.signatures.is_none());
        assert!(cli.format.is_none());
        assert!(!cli.list);
    }

    #[test]
    fn test_cli_requires_program_unless_list() {
        assert!(Cli::try_parse_from(["callsig"]).is_err());

        let cli = Cli::parse_from(["callsig", "--list", "-s", "sigs"]);
        assert!(cli.list);
        assert!(cli.program.is_none());
        assert_eq!(cli.signatures, Some(PathBuf::from("sigs")));
    }

    #[test]
    fn test_cli_format() {
        let cli = Cli::parse_from(["callsig", "--format", "csv", "dump.json"]);
        assert_eq!(cli.format, Some(OutputFormat::Csv));

        assert!(Cli::try_parse_from(["callsig", "--format", "xml", "dump.json"]).is_err());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "callsig",
            "--sort",
            "--fail-on-load-error",
            "--include-library",
            "--debug",
            "-c",
            "my.toml",
            "dump.json",
        ]);
        assert!(cli.sort);
        assert!(cli.fail_on_load_error);
        assert!(cli.include_library);
        assert!(!cli.include_thunks);
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("my.toml")));
    }
}
