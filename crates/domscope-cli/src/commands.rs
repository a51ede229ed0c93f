//! CLI command definitions using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use domscope::MatchMethod;

/// Domscope: inspect element trees and command targets for markup files
#[derive(Parser, Debug)]
#[command(name = "domscope")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Engine configuration file (YAML)
    #[arg(long, global = true, env = "DOMSCOPE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the element tree with occurrence indices and command targets
    Inspect(InspectArgs),

    /// Run a find against a markup file
    Find(FindArgs),

    /// Show the effective engine configuration
    Config(ConfigArgs),
}

/// Output format
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FormatArg {
    /// Human-readable text
    #[default]
    Text,
    /// JSON
    Json,
}

/// Arguments for the inspect command
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Markup file to read
    pub file: PathBuf,

    /// Reject markup with more than one root element at parse time
    #[arg(long)]
    pub strict: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Match method argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MethodArg {
    /// Whole value
    #[default]
    Literal,
    /// Suffix
    EndsWith,
    /// Substring
    Contains,
    /// Regular expression
    Regex,
}

impl From<MethodArg> for MatchMethod {
    fn from(arg: MethodArg) -> Self {
        match arg {
            MethodArg::Literal => Self::Literal,
            MethodArg::EndsWith => Self::EndsWith,
            MethodArg::Contains => Self::Contains,
            MethodArg::Regex => Self::Regex,
        }
    }
}

/// Arguments for the find command
#[derive(Parser, Debug)]
pub struct FindArgs {
    /// Markup file to read
    pub file: PathBuf,

    /// Id or name to match
    #[arg(long)]
    pub id: Option<String>,

    /// How --id and --attr values are compared
    #[arg(short, long, value_enum, default_value = "literal")]
    pub method: MethodArg,

    /// Tag name
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Exact inner text (trimmed, case-insensitive)
    #[arg(long)]
    pub text: Option<String>,

    /// Skip this many matches
    #[arg(short, long, default_value = "0")]
    pub index: usize,

    /// Attribute predicate as name=value (repeatable)
    #[arg(short, long = "attr")]
    pub attributes: Vec<String>,

    /// Print every match instead of the first
    #[arg(long)]
    pub all: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: FormatArg,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Print the built-in defaults instead of the effective configuration
    #[arg(long)]
    pub defaults: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse_tests {
        use super::*;

        #[test]
        fn test_global_flags() {
            let cli = Cli::parse_from(["domscope", "-vv", "config"]);
            assert_eq!(cli.verbose, 2);
            assert!(!cli.quiet);
            assert!(matches!(cli.command, Commands::Config(_)));
        }

        #[test]
        fn test_find_args() {
            let cli = Cli::parse_from([
                "domscope",
                "find",
                "page.html",
                "--id",
                "grid",
                "--method",
                "ends-with",
                "--attr",
                "type=text",
                "--attr",
                "class=wide",
                "-i",
                "2",
                "--all",
            ]);
            let Commands::Find(args) = cli.command else {
                panic!("expected find");
            };
            assert_eq!(args.id.as_deref(), Some("grid"));
            assert_eq!(MatchMethod::from(args.method), MatchMethod::EndsWith);
            assert_eq!(args.attributes, vec!["type=text", "class=wide"]);
            assert_eq!(args.index, 2);
            assert!(args.all);
        }

        #[test]
        fn test_inspect_defaults() {
            let cli = Cli::parse_from(["domscope", "inspect", "page.html"]);
            let Commands::Inspect(args) = cli.command else {
                panic!("expected inspect");
            };
            assert!(!args.strict);
            assert_eq!(args.format, FormatArg::Text);
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["domscope"]).is_err());
        }
    }
}
