//! Dewarping job description.
//!
//! A [`DewarpConfig`] is an immutable snapshot of one dewarping job. The host
//! persists its parameters as free-text key/value pairs; [`Params`] mirrors
//! that document and is converted into a validated config before any table
//! is built.

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("input dimensions must be positive and even, got {width}x{height}")]
    BadInputSize { width: usize, height: usize },
    #[error("output dimensions must be positive, got {width}x{height}")]
    BadOutputSize { width: usize, height: usize },
    #[error("optical center ({x}, {y}) lies outside [0,1]x[0,1]")]
    BadCenter { x: f64, y: f64 },
    #[error("input field of view {0} deg is outside (0, 360]")]
    BadInputFov(f64),
    #[error("rectilinear field of view {0} deg is outside (0, 180)")]
    BadRectilinearFov(f64),
    #[error("focal length {0} must be positive")]
    BadFocalLength(f64),
    #[error("output scale {0} must be positive")]
    BadScale(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LensType {
    #[default]
    Fisheye,
    DualFisheye,
    Panoramic,
}

impl LensType {
    /// Maps a persisted token to a lens type. Unrecognized tokens mean a
    /// plain fisheye lens.
    pub fn parse(token: &str) -> Self {
        match token {
            "dual_fisheye" => LensType::DualFisheye,
            "panoramic" => LensType::Panoramic,
            _ => LensType::Fisheye,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectionType {
    #[default]
    Equirectangular,
    Rectilinear,
    Cylindrical,
    FisheyeUndistort,
}

impl ProjectionType {
    /// Maps a persisted token to a projection. Unrecognized tokens fall back
    /// to the fisheye undistortion map.
    pub fn parse(token: &str) -> Self {
        match token {
            "equirectangular" => ProjectionType::Equirectangular,
            "rectilinear" => ProjectionType::Rectilinear,
            "cylindrical" => ProjectionType::Cylindrical,
            _ => ProjectionType::FisheyeUndistort,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DewarpConfig {
    pub lens_type: LensType,
    pub projection: ProjectionType,
    // size
    pub input_width: usize,
    pub input_height: usize,
    pub output_width: usize,
    pub output_height: usize,
    /// Half-angle subtended by the fisheye image radius, degrees.
    pub input_fov: f64,
    /// Optical center as a fraction of the input frame.
    pub center_x: f64,
    pub center_y: f64,
    /// Viewing-direction offset applied before projection, degrees.
    pub pan_angle: f64,
    pub tilt_angle: f64,
    /// Output field of view for the rectilinear projection, degrees.
    pub rectilinear_fov: f64,
    // fisheye undistortion
    pub focal_length: f64,
    pub scale: f64,
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
}

impl Default for DewarpConfig {
    fn default() -> Self {
        Self {
            lens_type: LensType::Fisheye,
            projection: ProjectionType::Equirectangular,
            input_width: 0,
            input_height: 0,
            output_width: 1920,
            output_height: 1080,
            input_fov: 180.0,
            center_x: 0.5,
            center_y: 0.5,
            pan_angle: 0.0,
            tilt_angle: 0.0,
            rectilinear_fov: 90.0,
            focal_length: 0.0,
            scale: 0.4,
            k1: -0.25,
            k2: 0.05,
            k3: 0.0,
            k4: 0.0,
        }
    }
}

impl DewarpConfig {
    /// Structural validation. The undistortion intrinsics are only checked
    /// when that projection is selected.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 4:2:0 chroma subsampling needs even input dimensions
        if self.input_width == 0
            || self.input_height == 0
            || self.input_width % 2 != 0
            || self.input_height % 2 != 0
        {
            return Err(ConfigError::BadInputSize {
                width: self.input_width,
                height: self.input_height,
            });
        }
        if self.output_width == 0 || self.output_height == 0 {
            return Err(ConfigError::BadOutputSize {
                width: self.output_width,
                height: self.output_height,
            });
        }
        if !(0.0..=1.0).contains(&self.center_x) || !(0.0..=1.0).contains(&self.center_y) {
            return Err(ConfigError::BadCenter {
                x: self.center_x,
                y: self.center_y,
            });
        }
        if !(self.input_fov > 0.0 && self.input_fov <= 360.0) {
            return Err(ConfigError::BadInputFov(self.input_fov));
        }
        // tan(fov/2) blows up at 180 deg
        if !(self.rectilinear_fov > 0.0 && self.rectilinear_fov < 180.0) {
            return Err(ConfigError::BadRectilinearFov(self.rectilinear_fov));
        }
        if self.projection == ProjectionType::FisheyeUndistort {
            if self.focal_length <= 0.0 {
                return Err(ConfigError::BadFocalLength(self.focal_length));
            }
            if self.scale <= 0.0 {
                return Err(ConfigError::BadScale(self.scale));
            }
        }
        Ok(())
    }
}

/// Parameter document as the host persists it. Field names match the
/// parameter store keys; every field has a default so a partial document
/// still loads.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    pub lens_type: String,
    pub projection: String,
    pub input_width: usize,
    pub input_height: usize,
    pub output_width: usize,
    pub output_height: usize,
    pub input_fov: f64,
    pub center_x: f64,
    pub center_y: f64,
    pub pan_angle: f64,
    pub tilt_angle: f64,
    pub rectilinear_fov: f64,
    /// Nominal focal length in pixels; 0 derives input_width / 2.
    pub focal_length: f64,
    pub scale: f64,
    pub k1: f64,
    pub k2: f64,
    pub k3: f64,
    pub k4: f64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            lens_type: "fisheye".to_string(),
            projection: "equirectangular".to_string(),
            input_width: 0,
            input_height: 0,
            output_width: 1920,
            output_height: 1080,
            input_fov: 180.0,
            center_x: 0.5,
            center_y: 0.5,
            pan_angle: 0.0,
            tilt_angle: 0.0,
            rectilinear_fov: 90.0,
            focal_length: 0.0,
            scale: 0.4,
            k1: -0.25,
            k2: 0.05,
            k3: 0.0,
            k4: 0.0,
        }
    }
}

impl Params {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn to_config(&self) -> DewarpConfig {
        let focal_length = if self.focal_length > 0.0 {
            self.focal_length
        } else {
            self.input_width as f64 / 2.0
        };
        DewarpConfig {
            lens_type: LensType::parse(&self.lens_type),
            projection: ProjectionType::parse(&self.projection),
            input_width: self.input_width,
            input_height: self.input_height,
            output_width: self.output_width,
            output_height: self.output_height,
            input_fov: self.input_fov,
            center_x: self.center_x,
            center_y: self.center_y,
            pan_angle: self.pan_angle,
            tilt_angle: self.tilt_angle,
            rectilinear_fov: self.rectilinear_fov,
            focal_length,
            scale: self.scale,
            k1: self.k1,
            k2: self.k2,
            k3: self.k3,
            k4: self.k4,
        }
    }
}
