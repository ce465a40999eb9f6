use std::{error::Error, fmt, path::PathBuf};

use log4rs::{
    append::{
        console::ConsoleAppender,
        rolling_file::{
            policy::compound::{
                roll::fixed_window::FixedWindowRoller,
                trigger::size::SizeTrigger,
                CompoundPolicy,
            },
            RollingFileAppender,
        },
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::{Filter, Response},
    Handle,
};

use log::*;

const PATTERN: &str = "[{d(%H:%M:%S)} {l}]: {m}\n";

/// Where and how verbosely [`init_logger`] records log events.
#[derive(Clone, Debug)]
pub struct LogSettings {
    /// The most verbose level that is recorded
    pub level: LevelFilter,
    /// Optional log file, rolled over once it grows past `file_size_limit`
    pub file: Option<PathBuf>,
    /// Size in bytes at which the log file is archived
    pub file_size_limit: u64,
    /// Number of archived log files that are kept around
    pub archive_count: u32,
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            #[cfg(debug_assertions)]
            level: LevelFilter::Debug,
            #[cfg(not(debug_assertions))]
            level: LevelFilter::Info,
            file: None,
            file_size_limit: 10_000_000,
            archive_count: 5,
        }
    }
}

/// Configures log4rs to print events to the console, and to a rolling log file if one is given.
///
/// Messages are in the form `[HH:MM:SS Level]: message`. Debug and trace events are only accepted
/// from modules whose path starts with `crate_filter`, so the per-element compilation chatter of
/// the pipeline does not drown in the output of other crates. The returned handle can replace the
/// settings later with [`apply_settings`].
pub fn init_logger(crate_filter: &str, settings: &LogSettings) -> Result<Handle, Box<dyn Error>> {
    Ok(log4rs::init_config(build_config(crate_filter, settings)?)?)
}

/// Replaces the settings of a logger created by [`init_logger`].
pub fn apply_settings(
    handle: &Handle,
    crate_filter: &str,
    settings: &LogSettings,
) -> Result<(), Box<dyn Error>> {
    handle.set_config(build_config(crate_filter, settings)?);
    Ok(())
}

fn build_config(crate_filter: &str, settings: &LogSettings) -> Result<Config, Box<dyn Error>> {
    let console = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let mut config = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(CrateFilter::new(crate_filter)))
            .build("console", Box::new(console)),
    );
    let mut root = Root::builder().appender("console");

    if let Some(path) = &settings.file {
        let archive_pattern = format!("{}.{{}}.gz", path.display());
        let roller = FixedWindowRoller::builder().build(&archive_pattern, settings.archive_count)?;
        let logfile = RollingFileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(
                path,
                Box::new(CompoundPolicy::new(
                    Box::new(SizeTrigger::new(settings.file_size_limit)),
                    Box::new(roller),
                )),
            )?;
        config = config.appender(
            Appender::builder()
                .filter(Box::new(CrateFilter::new(crate_filter)))
                .build("logfile", Box::new(logfile)),
        );
        root = root.appender("logfile");
    }

    Ok(config.build(root.build(settings.level))?)
}

// Only allow debug logging from our crate
struct CrateFilter {
    filter: String,
}

impl CrateFilter {
    pub fn new(filter: &str) -> Self {
        CrateFilter {
            filter: filter.to_owned(),
        }
    }
}

impl Filter for CrateFilter {
    fn filter(&self, record: &Record) -> Response {
        if record.level() != Level::Debug && record.level() != Level::Trace {
            return Response::Accept;
        }

        match record.module_path() {
            Some(path) =>
                if path.starts_with(&self.filter) {
                    Response::Accept
                } else {
                    Response::Reject
                },
            None => Response::Reject,
        }
    }
}

impl fmt::Debug for CrateFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_struct("CrateFilter")
            .field("filter", &self.filter)
            .finish()
    }
}
