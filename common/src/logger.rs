use std::{fs, path::Path};

use anyhow::{Context, Result};
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub fn default_logs_datetime_format() -> String {
    "[%Y-%m-%d] (%H:%M:%S%.3f)".to_owned()
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Off => LevelFilter::Off,
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

pub struct LoggerConfig<'a> {
    pub level: LogLevel,
    pub file_level: LogLevel,
    pub dir_path: &'a str,
    pub filename_log: &'a str,
    pub disable_file_logging: bool,
    pub disable_file_log_date_based: bool,
    pub disable_colors: bool,
    // Keep stdout free for machine readable output
    pub console_on_stderr: bool,
    pub logs_datetime_format: String,
}

// Install the global logger: colored console output plus an optional log file.
// Must be called only once per process.
pub fn init_logger(config: LoggerConfig<'_>) -> Result<()> {
    let colors = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Magenta)
        .trace(Color::Cyan);

    let datetime_format = config.logs_datetime_format.clone();
    let disable_colors = config.disable_colors;
    let console_log = fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = chrono::Local::now().format(&datetime_format);
            if disable_colors {
                out.finish(format_args!(
                    "{} {} > {}",
                    now,
                    record.level(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "{} {} > {}",
                    now,
                    colors.color(record.level()),
                    message
                ))
            }
        })
        .level(config.level.into());
    let console_log = if config.console_on_stderr {
        console_log.chain(std::io::stderr())
    } else {
        console_log.chain(std::io::stdout())
    };

    let mut base = fern::Dispatch::new().chain(console_log);

    if !config.disable_file_logging {
        let dir = Path::new(config.dir_path);
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create logs directory '{}'", dir.display()))?;

        let datetime_format = config.logs_datetime_format.clone();
        let file_log = fern::Dispatch::new()
            .format(move |out, message, record| {
                out.finish(format_args!(
                    "{} [{}] [{}] {}",
                    chrono::Local::now().format(&datetime_format),
                    record.level(),
                    record.target(),
                    message
                ))
            })
            .level(config.file_level.into());

        // Date based files are named YYYY-MM-DD.<filename>
        let file_log = if config.disable_file_log_date_based {
            let path = dir.join(config.filename_log);
            file_log.chain(
                fern::log_file(&path)
                    .with_context(|| format!("Failed to open log file '{}'", path.display()))?,
            )
        } else {
            let prefix = format!("{}/", dir.display());
            let pattern = format!("%Y-%m-%d.{}", config.filename_log);
            file_log.chain(fern::DateBased::new(prefix, pattern))
        };

        base = base.chain(file_log);
    }

    base.apply().context("Logger was already initialized")?;
    log_panics::init();

    Ok(())
}
