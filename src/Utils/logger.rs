// Copyright (c)  by Gleb E. Zaslavkiy
//MIT License
use crate::symbolic::series_errors::{SeriesError, SeriesResult};
use chrono::Local;
use csv::Writer;
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, SharedLogger, TermLogger, TerminalMode, WriteLogger,
};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// `debug|info|warn|error|off|none`, case insensitive
pub fn parse_loglevel(loglevel: &str) -> SeriesResult<LevelFilter> {
    match loglevel.trim().to_lowercase().as_str() {
        "debug" => Ok(LevelFilter::Debug),
        "info" => Ok(LevelFilter::Info),
        "warn" => Ok(LevelFilter::Warn),
        "error" => Ok(LevelFilter::Error),
        "off" | "none" => Ok(LevelFilter::Off),
        other => Err(SeriesError::Configuration(format!(
            "unknown log level '{}', expected debug, info, warn, error, off or none",
            other
        ))),
    }
}

/// Terminal logger at the given level, mirrored to `log_<date_time>.txt` when `log_to_file`.
/// A second initialisation in the same process is ignored.
pub fn init_logger(loglevel: &str, log_to_file: bool) -> SeriesResult<()> {
    let level = parse_loglevel(loglevel)?;
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if log_to_file && level != LevelFilter::Off {
        let date_and_time = Local::now().format("%Y-%m-%d_%H-%M-%S");
        let name = format!("log_{}.txt", date_and_time);
        let file = File::create(&name)
            .map_err(|e| SeriesError::Configuration(format!("cannot create {}: {}", name, e)))?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }
    if CombinedLogger::init(loggers).is_ok() {
        log::info!("logging started with level {}", level);
    }
    Ok(())
}

/// tab-separated trace report
pub fn save_trace_to_file(headers: &[&str], rows: &[Vec<String>], filename: &Path) -> io::Result<()> {
    let mut file = File::create(filename)?;
    writeln!(file, "{}", headers.join("\t"))?;
    for row in rows {
        writeln!(file, "{}", row.join("\t"))?;
    }
    Ok(())
}

pub fn save_trace_to_csv(headers: &[&str], rows: &[Vec<String>], filename: &Path) -> io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = Writer::from_writer(file);
    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
