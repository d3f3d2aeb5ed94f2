//! Logging setup for the command line tool.

/// Initializes `env_logger`, at debug level when `verbose` is set and info level
/// otherwise. `RUST_LOG` still overrides the level per module.
pub fn init_logger(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(if verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .format_timestamp(None)
        .parse_default_env()
        .init();
}
