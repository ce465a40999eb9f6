use byteorder::{LittleEndian, WriteBytesExt};
use clap::Parser;
use log::{error, info};
use noisepipe::{
    config::load_config,
    io::{read_pipeline, ModuleRegistry},
};
use noisepipe_util::logging::{self, LogSettings};
use std::{
    error::Error,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::PathBuf,
};

/// Renders a stored noise pipeline into a plane of little-endian f32 samples.
#[derive(Parser, Debug)]
#[command(name = "noisepipe")]
#[command(version, about, long_about = None)]
struct Args {
    /// Pipeline stream to render.
    pipeline: PathBuf,

    /// File the samples are written to, row by row.
    output: PathBuf,

    /// Render configuration, created with defaults when missing.
    #[arg(default_value = "./noisepipe.json")]
    config: PathBuf,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let handle = logging::init_logger("noisepipe", &LogSettings::default())?;

    let config = match load_config(&args.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load config: {}", e);
            return Ok(());
        }
    };
    logging::apply_settings(&handle, "noisepipe", &config.log_settings())?;

    let mut reader = BufReader::new(File::open(&args.pipeline)?);
    let (graph, root) = read_pipeline(&mut reader, &ModuleRegistry::with_defaults())?;
    graph.validate(root)?;
    info!(
        "Loaded pipeline {} with {} modules",
        args.pipeline.display(),
        graph.len()
    );

    let plane = config.builder().build(&graph, root)?;

    let mut writer = BufWriter::new(File::create(&args.output)?);
    for value in &plane {
        writer.write_f32::<LittleEndian>(*value as f32)?;
    }
    writer.flush()?;

    info!(
        "Wrote {}x{} samples to {}",
        config.width,
        config.height,
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn argument_definitions_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn config_path_is_optional() {
        let args = Args::try_parse_from(["noisepipe", "plane.np", "plane.bin"]).unwrap();
        assert_eq!(args.pipeline, PathBuf::from("plane.np"));
        assert_eq!(args.output, PathBuf::from("plane.bin"));
        assert_eq!(args.config, PathBuf::from("./noisepipe.json"));

        let args =
            Args::try_parse_from(["noisepipe", "plane.np", "plane.bin", "render.json"]).unwrap();
        assert_eq!(args.config, PathBuf::from("render.json"));
    }

    #[test]
    fn missing_or_extra_arguments_are_rejected() {
        assert!(Args::try_parse_from(["noisepipe", "plane.np"]).is_err());
        assert!(Args::try_parse_from(["noisepipe", "a", "b", "c", "d"]).is_err());
    }
}
