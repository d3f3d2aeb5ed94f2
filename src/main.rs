//! medikit's entry point: parses the command line and dispatches to the command handlers.

use medikit::{
    cli::{get_args, Args, Commands},
    commands::{
        handle_init, handle_pipeline, handle_update, InitOptions, PipelineOptions, UpdateOptions,
    },
    error::{default_error_handler, Result},
    logger::init_logger,
};

fn main() {
    let args = get_args();
    init_logger(args.verbose);

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Commands::Init { target, name, description, license, features } => {
            handle_init(target, InitOptions { name, description, license, features })
        }
        Commands::Update { override_requirements } => {
            handle_update(&args.config, UpdateOptions { override_requirements })
        }
        Commands::Pipeline { pipeline, action, force } => {
            handle_pipeline(&args.config, PipelineOptions { pipeline, action, force })
        }
    }
}
