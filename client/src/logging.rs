use crate::config::LoggingConfig;
use anyhow::Result;
use log::LevelFilter;

/// Map `-v` occurrences on top of the configured level.
pub fn effective_level(config: &LoggingConfig, verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => config.level.parse().unwrap_or(LevelFilter::Warn),
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

pub fn setup_logging(config: &LoggingConfig, verbosity: u8) -> Result<()> {
    let level = effective_level(config, verbosity);

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}][{}] {}",
                chrono::Local::now().format("%Y-%m-%d][%H:%M:%S"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(level)
        // Keep HTTP internals quiet unless tracing
        .level_for("hyper", LevelFilter::Warn.min(level))
        .level_for("reqwest", LevelFilter::Warn.min(level))
        .chain(std::io::stderr());

    if let Some(ref path) = config.output {
        dispatch = dispatch.chain(fern::log_file(path)?);
    }

    dispatch.apply()?;
    Ok(())
}
