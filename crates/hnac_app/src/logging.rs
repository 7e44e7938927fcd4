//! Logger initialization for the `hnac` binary.
//!
//! Writes to the terminal, to the configured log file, or both.

use std::fs::OpenOptions;
use std::path::Path;
use std::str::FromStr;

use hnac_core::{LogDestination, LoggingSettings};
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

/// Initialize the global logger from the `logging` section of the settings.
///
/// An unknown level falls back to `info`; an unwritable log file falls back to
/// terminal-only output.
pub fn initialize(settings: &LoggingSettings) {
    let level = parse_level(&settings.level);
    let config = build_config();

    let terminal = || -> Box<dyn SharedLogger> {
        TermLogger::new(level, config.clone(), TerminalMode::Mixed, ColorChoice::Auto)
    };

    let loggers: Vec<Box<dyn SharedLogger>> = match settings.destination {
        LogDestination::Terminal => vec![terminal()],
        LogDestination::File => match create_file_logger(level, config.clone(), &settings.file) {
            Some(file_logger) => vec![file_logger],
            None => vec![terminal()],
        },
        LogDestination::Both => {
            let mut loggers = vec![terminal()];
            if let Some(file_logger) = create_file_logger(level, config.clone(), &settings.file) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);

    if level_is_unknown(&settings.level) {
        log::warn!("Unknown log level {:?}, using info", settings.level);
    }
}

fn parse_level(level: &str) -> LevelFilter {
    LevelFilter::from_str(level.trim()).unwrap_or(LevelFilter::Info)
}

fn level_is_unknown(level: &str) -> bool {
    LevelFilter::from_str(level.trim()).is_err()
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    path: &Path,
) -> Option<Box<dyn SharedLogger>> {
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not open log file at {:?}: {}", path, err);
            None
        }
    }
}
