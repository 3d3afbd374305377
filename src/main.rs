/// Tempest viewer executable
/// Usage: tempest-viewer [CONFIG] [--headless FRAMES] [--seed SEED]
use anyhow::{bail, Context, Result};
use tempest_viewer::{Viewer, ViewerConfig};

struct Args {
    config: Option<String>,
    headless: Option<u32>,
    seed: u64,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        headless: None,
        seed: 0x7e57,
    };

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--headless" => {
                let frames = iter.next().context("--headless needs a frame count")?;
                args.headless = Some(frames.parse().context("invalid frame count")?);
            }
            "--seed" => {
                let seed = iter.next().context("--seed needs a value")?;
                args.seed = seed.parse().context("invalid seed")?;
            }
            flag if flag.starts_with("--") => bail!("unknown option {}", flag),
            path => args.config = Some(path.to_string()),
        }
    }
    Ok(args)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => ViewerConfig::load(path)?,
        None => {
            log::info!("No config file given, using defaults");
            ViewerConfig::default()
        }
    };

    let viewer = Viewer::new(config);
    match args.headless {
        Some(frames) => {
            let summary = viewer.run_headless(frames, args.seed)?;
            log::info!(
                "Headless run finished: {} frames, {} thunder strikes",
                summary.frames,
                summary.thunder_strikes
            );
            Ok(())
        }
        None => viewer.run(),
    }
}
