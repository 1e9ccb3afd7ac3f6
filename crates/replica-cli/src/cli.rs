//! # CLI Structure and Argument Parsing
//!
//! The `replica` command follows a command-subcommand pattern:
//!
//! - **Global options**: `--verbose`, `--debug`, `--quiet`, `--config`
//! - **`clone`**: fetch a page, generate a clone and write the document
//! - **`analyze`** / **`prompt`** / **`repair`**: run a single pipeline stage
//!   offline against a local file
//!
//! ```bash
//! replica clone example.com -o clone.html
//! replica analyze page.html --base-url https://example.com/ | jq .fingerprint.design
//! replica prompt page.html --base-url https://example.com/
//! replica repair draft.txt > fixed.html
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Main CLI structure for the `replica` command
#[derive(Parser, Clone, Debug)]
#[command(name = "replica")]
#[command(version)]
#[command(about = "replica - Clone a web page's visual design into a standalone document", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    /// Suppress informational messages (only show errors)
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Enable debug logging including pipeline internals
    #[arg(long, global = true)]
    pub debug: bool,

    /// Disable all ANSI colors in output (also respects `NO_COLOR` env)
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Configuration file (defaults to `REPLICA_CONFIG` or the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Clone a live page: fetch, fingerprint, generate and repair
    Clone {
        /// Page to clone (scheme optional)
        url: String,

        /// Write the document here instead of stdout
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Extra job option as key=value (repeatable); values parse as JSON when possible
        #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
        options: Vec<(String, serde_json::Value)>,

        /// Generation time bound in seconds (overrides config)
        #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Print status events as JSON lines on stderr
        #[arg(long)]
        json_events: bool,
    },

    /// Print the page analysis of a local HTML file as JSON
    Analyze {
        /// HTML file, or `-` for stdin
        file: PathBuf,

        /// URL the page was served from, used to resolve relative references
        #[arg(long, value_name = "URL")]
        base_url: String,

        /// Print the fingerprint only
        #[arg(long)]
        fingerprint_only: bool,
    },

    /// Print the budgeted generation prompt for a local HTML file
    Prompt {
        /// HTML file, or `-` for stdin
        file: PathBuf,

        /// URL the page was served from
        #[arg(long, value_name = "URL")]
        base_url: String,

        /// Print the whole payload as JSON instead of the prompt text
        #[arg(long)]
        json: bool,
    },

    /// Repair generated text into a well-formed document
    Repair {
        /// Text file, or `-` for stdin
        file: PathBuf,
    },
}

/// Parse a `key=value` job option.
pub fn parse_option(raw: &str) -> Result<(String, serde_json::Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("option key is empty in '{raw}'"));
    }
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_option_values() {
        assert_eq!(parse_option("device=mobile").unwrap(), ("device".into(), json!("mobile")));
        assert_eq!(parse_option("width=390").unwrap(), ("width".into(), json!(390)));
        assert_eq!(parse_option("dark=true").unwrap(), ("dark".into(), json!(true)));
        assert_eq!(parse_option("q=a=b").unwrap(), ("q".into(), json!("a=b")));
        assert!(parse_option("novalue").is_err());
        assert!(parse_option("=x").is_err());
    }

    #[test]
    fn test_clone_arguments() {
        let cli = Cli::try_parse_from([
            "replica",
            "clone",
            "example.com",
            "-o",
            "out.html",
            "--option",
            "width=390",
            "--timeout",
            "5",
        ])
        .unwrap();

        match cli.command {
            Commands::Clone {
                url,
                output,
                options,
                timeout,
                json_events,
            } => {
                assert_eq!(url, "example.com");
                assert_eq!(output, Some(PathBuf::from("out.html")));
                assert_eq!(options, vec![("width".to_string(), json!(390))]);
                assert_eq!(timeout, Some(5));
                assert!(!json_events);
            },
            other => unreachable!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(Cli::try_parse_from(["replica", "clone", "example.com", "--timeout", "0"]).is_err());
    }
}
