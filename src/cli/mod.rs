//! CLI module for CaseCrafter
//!
//! Provides command-line interface parsing and handling for the casecrafter binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CaseCrafter - requirements in, traceable test suites out
///
/// Uploads business requirement documents, follows their processing,
/// generates test suites and exports them.
#[derive(Parser, Debug)]
#[command(
    name = "casecrafter",
    version,
    about = "CaseCrafter - turn requirement documents into traceable test suites",
    after_help = "EXAMPLES:\n    \
                  casecrafter login qa@example.com\n    \
                  casecrafter projects list\n    \
                  casecrafter documents upload 3 ./brd.pdf --wait\n    \
                  casecrafter generate 12 --project 3\n    \
                  casecrafter export 7 --format excel --output ./exports"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "casecrafter.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session
    Login {
        email: String,

        /// Password (prompted when omitted)
        #[arg(long, env = "CASECRAFTER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and sign in
    Register {
        email: String,

        /// Display name
        #[arg(long)]
        name: Option<String>,

        /// Password (prompted when omitted)
        #[arg(long, env = "CASECRAFTER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Manage projects
    #[command(subcommand)]
    Projects(ProjectCommands),

    /// Manage documents
    #[command(subcommand)]
    Documents(DocumentCommands),

    /// Generate test cases for a processed document
    Generate {
        document: i64,

        /// Project owning the document (limits cache invalidation to it)
        #[arg(long)]
        project: Option<i64>,
    },

    /// List the test suites of a project
    Suites {
        project: i64,

        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },

    /// Show the traceability matrix of a project
    Matrix {
        project: i64,

        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },

    /// Download a test suite export
    Export {
        suite: i64,

        /// excel, json or pdf
        #[arg(short, long, default_value = "excel")]
        format: String,

        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// File name used when the server does not suggest one
        #[arg(long)]
        name: Option<String>,
    },

    /// Browse and apply test-case templates
    #[command(subcommand)]
    Templates(TemplateCommands),

    /// Show usage analytics
    Analytics {
        /// 7d, 30d, 90d or 1y
        #[arg(short, long, default_value = "30d")]
        range: String,

        /// Limit to one project
        #[arg(long)]
        project: Option<i64>,
    },

    /// Drop cached data for a project and fetch it again
    Refresh { project: i64 },
}

/// Project subcommands
#[derive(Subcommand, Debug)]
pub enum ProjectCommands {
    /// List all projects
    List,

    /// Create a project
    Create {
        name: String,

        #[arg(short, long)]
        description: Option<String>,
    },

    /// Show one project with its documents
    Show { id: i64 },

    /// Delete a project
    Delete {
        id: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Document subcommands
#[derive(Subcommand, Debug)]
pub enum DocumentCommands {
    /// List the documents of a project
    List {
        project: i64,

        /// Bypass the cache
        #[arg(long)]
        refresh: bool,
    },

    /// Upload a PDF, DOCX or TXT file
    Upload {
        project: i64,
        path: PathBuf,

        /// Follow processing until it finishes
        #[arg(short, long)]
        wait: bool,
    },

    /// Show processing status
    Status {
        document: i64,

        /// Keep polling until processing finishes
        #[arg(short, long)]
        watch: bool,
    },

    /// Delete a document
    Delete {
        document: i64,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Template subcommands
#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List templates
    List {
        #[arg(long)]
        category: Option<String>,
    },

    /// Most used templates
    Popular {
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// Search templates by text
    Search {
        query: String,

        #[arg(long)]
        category: Option<String>,
    },

    /// Apply a template to a project
    Apply { template: i64, project: i64 },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_with_wait() {
        let cli = Cli::try_parse_from(["casecrafter", "documents", "upload", "3", "brd.pdf", "--wait"])
            .unwrap();
        match cli.command {
            Commands::Documents(DocumentCommands::Upload { project, path, wait }) => {
                assert_eq!(project, 3);
                assert_eq!(path, PathBuf::from("brd.pdf"));
                assert!(wait);
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert_eq!(cli.config, PathBuf::from("casecrafter.toml"));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["casecrafter", "suites", "4", "--refresh", "--verbose", "--no-color"])
            .unwrap();
        assert!(cli.verbose);
        assert!(cli.no_color);
        assert!(matches!(cli.command, Commands::Suites { project: 4, refresh: true }));
    }

    #[test]
    fn test_export_defaults() {
        let cli = Cli::try_parse_from(["casecrafter", "export", "9"]).unwrap();
        match cli.command {
            Commands::Export { suite, format, output, name } => {
                assert_eq!(suite, 9);
                assert_eq!(format, "excel");
                assert_eq!(output, PathBuf::from("."));
                assert!(name.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_missing_subcommand_is_an_error() {
        assert!(Cli::try_parse_from(["casecrafter"]).is_err());
    }
}
