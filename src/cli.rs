//! Command-line interface implementation for medikit.
//! Provides argument parsing and help text formatting using clap.

use std::path::PathBuf;

use clap::{error::ErrorKind, CommandFactory, Parser, Subcommand};

use crate::commands::Action;
use crate::constants::CONFIG_FILE;

/// Command-line arguments structure for medikit.
#[derive(Parser, Debug)]
#[command(author, version, about = "medikit: automated project management", long_about = None)]
pub struct Args {
    /// Path to the project description file
    #[arg(short, long, global = true, default_value = CONFIG_FILE, value_name = "FILE")]
    pub config: PathBuf,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project in TARGET, asking for the missing metadata
    Init {
        /// Directory of the new project
        #[arg(value_name = "TARGET")]
        target: PathBuf,

        /// Package name (a valid python identifier)
        #[arg(long)]
        name: Option<String>,

        /// One line description of the package
        #[arg(long)]
        description: Option<String>,

        /// License of the package
        #[arg(long)]
        license: Option<String>,

        /// Feature to enable on top of the defaults (repeatable)
        #[arg(short = 'f', long = "feature", value_name = "FEATURE")]
        features: Vec<String>,
    },

    /// Regenerate the project files from the Projectfile
    Update {
        /// Rewrite the requirements files even if they already exist
        #[arg(long)]
        override_requirements: bool,
    },

    /// Run a step by step pipeline (release...)
    Pipeline {
        /// Name of the pipeline, the available ones are listed when omitted
        #[arg(value_name = "PIPELINE")]
        pipeline: Option<String>,

        #[arg(value_enum, value_name = "ACTION")]
        action: Option<Action>,

        /// Restart a pipeline that was already started
        #[arg(short, long)]
        force: bool,
    },
}

/// Parses command line arguments and returns the Args structure.
///
/// # Exits
/// * With status code 1, after printing the help, if the subcommand is missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if matches!(
                e.kind(),
                ErrorKind::MissingSubcommand | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
            ) {
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}
