//! Dewarping engine.
//!
//! [`Dewarper`] owns exactly one current configuration/lookup-table pair.
//! `configure` builds the replacement table off to the side and publishes it
//! with a single handle swap, so a `rectify` call running on another thread
//! sees the fully-old or fully-new pair, never a mix.

mod lookup;
mod remap;

pub use lookup::{LookupTable, OUT_OF_BOUNDS};

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::config::{ConfigError, DewarpConfig};
use crate::global_types::{nv12_len, OutputFrame, RawFrame};

#[derive(Debug, Error, PartialEq)]
pub enum DewarpError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("no configuration has been installed yet")]
    NotReady,
    #[error(
        "raw frame {got_width}x{got_height} ({got_len} bytes) does not match \
         the configured input {want_width}x{want_height}"
    )]
    FrameMismatch {
        got_width: usize,
        got_height: usize,
        got_len: usize,
        want_width: usize,
        want_height: usize,
    },
}

/// Configuration and the table derived from it, kept in one allocation so a
/// frame is always processed against a matching pair.
#[derive(Debug)]
struct DewarpState {
    config: DewarpConfig,
    table: LookupTable,
}

#[derive(Debug, Default)]
pub struct Dewarper {
    state: RwLock<Option<Arc<DewarpState>>>,
    rgb_scratch: Mutex<Vec<u8>>,
}

impl Dewarper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates and installs a new configuration, synchronously rebuilding
    /// the lookup table. On failure the previously installed configuration
    /// stays in effect.
    pub fn configure(&self, config: DewarpConfig) -> Result<(), DewarpError> {
        config.validate()?;
        let table = LookupTable::build(&config);
        log::info!(
            "dewarper configured: {}x{} -> {}x{}, projection {:?}",
            config.input_width,
            config.input_height,
            config.output_width,
            config.output_height,
            config.projection,
        );
        *self.state.write() = Some(Arc::new(DewarpState { config, table }));
        Ok(())
    }

    /// The currently installed configuration, if any.
    pub fn config(&self) -> Option<DewarpConfig> {
        self.state.read().as_ref().map(|state| state.config.clone())
    }

    /// Produces one rectified frame. The output buffer is resized to the
    /// configured output dimensions if it does not already match, so
    /// steady-state calls reuse both it and the internal RGB scratch.
    pub fn rectify(&self, raw: &RawFrame, out: &mut OutputFrame) -> Result<(), DewarpError> {
        let state = self.state.read().clone().ok_or(DewarpError::NotReady)?;
        let config = &state.config;

        if raw.width != config.input_width
            || raw.height != config.input_height
            || raw.data.len() != nv12_len(raw.width, raw.height)
        {
            return Err(DewarpError::FrameMismatch {
                got_width: raw.width,
                got_height: raw.height,
                got_len: raw.data.len(),
                want_width: config.input_width,
                want_height: config.input_height,
            });
        }

        let (luma, chroma) = raw.planes();
        let mut rgb = self.rgb_scratch.lock();
        remap::nv12_to_rgb(luma, chroma, raw.width, raw.height, &mut rgb);

        out.reset(config.output_width, config.output_height);
        remap::remap_bilinear(&rgb, raw.width, raw.height, &state.table, &mut out.data);
        Ok(())
    }
}
