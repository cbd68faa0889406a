mod config;
mod dataset;
mod dewarper;
mod global_types;
mod save;

use std::path::Path;

use anyhow::Context;

use crate::config::Params;
use crate::dataset::{DefaultSource, FrameSource};
use crate::dewarper::Dewarper;
use crate::global_types::{OutputFrame, RawFrame};

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_nanos()
        .init();

    let mut args = std::env::args().skip(1);
    let params_path = args.next().unwrap_or_else(|| "configs/params.json".to_string());
    let frames_dir = args.next().unwrap_or_else(|| "frames".to_string());
    let out_dir = args.next().unwrap_or_else(|| "out".to_string());

    let params = match Params::load(&params_path) {
        Ok(params) => params,
        Err(e) => {
            log::warn!("failed to load {params_path}: {e:#}, using defaults");
            Params::default()
        }
    };
    log::info!(
        "configuration: lens={}, projection={}, input={}x{}, output={}x{}",
        params.lens_type,
        params.projection,
        params.input_width,
        params.input_height,
        params.output_width,
        params.output_height,
    );

    let dewarper = Dewarper::new();
    dewarper
        .configure(params.to_config())
        .context("invalid dewarper configuration")?;
    let config = dewarper.config().context("dewarper not configured")?;

    let dataset = DefaultSource::new(&frames_dir)?;
    std::fs::create_dir_all(&out_dir)?;

    let mut out = OutputFrame::default();
    let mut processed = 0usize;
    for (timestamp, path) in dataset.frames() {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) => {
                log::warn!("skipping {path}: {e}");
                continue;
            }
        };
        let raw = RawFrame::new(config.input_width, config.input_height, &data);
        if let Err(e) = dewarper.rectify(&raw, &mut out) {
            log::warn!("dewarping failed for {path}: {e}");
            continue;
        }
        save::write_ppm(&out, &Path::new(&out_dir).join(format!("{timestamp}.ppm")))?;
        processed += 1;
    }

    log::info!("processed {processed} of {} frames", dataset.frames().len());
    Ok(())
}
