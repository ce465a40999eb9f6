use crate::{builder::Bounds, PlaneBuilder2D};
use log::*;
use noisepipe_util::{logging::LogSettings, threadpool::DistributionStrategy};
use serde::{Deserialize, Serialize};
use std::{
    fs::{File, OpenOptions},
    io::{self, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    str::FromStr,
};

/// How plane rows are handed out to worker threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Neighbouring rows go to different workers
    Interleaved,
    /// Every worker receives one block of consecutive rows
    Contiguous,
}

impl From<Distribution> for DistributionStrategy {
    fn from(x: Distribution) -> Self {
        match x {
            Distribution::Interleaved => DistributionStrategy::Interleaved,
            Distribution::Contiguous => DistributionStrategy::Contiguous,
        }
    }
}

/// Settings of a plane render, stored as JSON.
///
/// Missing fields take their default values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Columns of the output plane, defaults to 256.
    pub width: usize,
    /// Rows of the output plane, defaults to 256.
    pub height: usize,
    /// The sampled rectangle, defaults to `[-1, 1]` on both axes.
    pub bounds: Bounds,
    /// Whether the plane tiles seamlessly, defaults to false.
    pub seamless: bool,
    /// Number of worker threads, defaults to the number of available cores.
    pub thread_count: usize,
    /// How rows are split between workers, defaults to interleaved.
    pub distribution: Distribution,
    /// One of `off`, `error`, `warn`, `info`, `debug` or `trace`, defaults to `info`.
    pub log_level: String,
    /// Optional file log events are also written to.
    pub log_file: Option<PathBuf>,
}

impl RenderConfig {
    /// A plane builder with the size, bounds and threading of this config.
    pub fn builder(&self) -> PlaneBuilder2D {
        let mut builder = PlaneBuilder2D::new(self.width, self.height);
        builder
            .set_bounds(self.bounds)
            .set_seamless(self.seamless)
            .set_thread_count(self.thread_count)
            .set_distribution(self.distribution.into());
        builder
    }

    /// The logger settings of this config. Unknown levels fall back to `info`.
    pub fn log_settings(&self) -> LogSettings {
        let level = LevelFilter::from_str(&self.log_level).unwrap_or_else(|_| {
            warn!("Unknown log level {:?}, using info", self.log_level);
            LevelFilter::Info
        });

        LogSettings {
            level,
            file: self.log_file.clone(),
            ..LogSettings::default()
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            width: 256,
            height: 256,
            bounds: Bounds::default(),
            seamless: false,
            thread_count: std::thread::available_parallelism()
                .map(|count| count.get())
                .unwrap_or(1),
            distribution: Distribution::Interleaved,
            log_level: "info".to_owned(),
            log_file: None,
        }
    }
}

/// Attempts to parse the render configuration at the given path. The config should be in JSON
/// format.
///
/// A missing file is created with the default configuration. A file that is not valid JSON is
/// replaced by the default configuration.
pub fn load_config(path: &Path) -> io::Result<RenderConfig> {
    if path.exists() {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut json = String::new();
        file.read_to_string(&mut json)?;

        match serde_json::from_str(&json) {
            Ok(config) => Ok(config),
            Err(e) => {
                error!("Invalid config JSON: {}", e);
                use_default(&mut file)
            }
        }
    } else {
        info!("Config file not found, creating file");
        use_default(&mut File::create(path)?)
    }
}

fn use_default(file: &mut File) -> io::Result<RenderConfig> {
    info!("Using default configurations");

    let default = RenderConfig::default();

    file.seek(SeekFrom::Start(0))?;

    let json = serde_json::to_string_pretty(&default)?;
    let bytes = json.as_bytes();
    file.write_all(bytes)?;

    // Drop whatever was left of a longer invalid file
    file.set_len(bytes.len() as u64)?;

    Ok(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");

        let config = load_config(&path).unwrap();
        assert_eq!(config, RenderConfig::default());

        let written: RenderConfig =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, config);
    }

    #[test]
    fn invalid_json_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        fs::write(&path, "{ this is not json at all, but it is rather long ...").unwrap();

        assert_eq!(load_config(&path).unwrap(), RenderConfig::default());
        let json = fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<RenderConfig>(&json).is_ok());
    }

    #[test]
    fn partial_files_use_defaults_for_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("render.json");
        fs::write(
            &path,
            r#"{ "width": 64, "seamless": true, "distribution": "contiguous" }"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.width, 64);
        assert_eq!(config.height, 256);
        assert!(config.seamless);
        assert_eq!(config.distribution, Distribution::Contiguous);

        let builder = config.builder();
        assert_eq!(builder.width(), 64);
        assert!(builder.is_seamless());
    }

    #[test]
    fn log_levels() {
        let mut config = RenderConfig::default();
        config.log_level = "debug".to_owned();
        assert_eq!(config.log_settings().level, LevelFilter::Debug);

        config.log_level = "chatty".to_owned();
        assert_eq!(config.log_settings().level, LevelFilter::Info);
    }
}
