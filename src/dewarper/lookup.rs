//! Lookup-table builder.
//!
//! For every output pixel the table stores the fractional input coordinate to
//! sample, computed once per configuration change. Three of the projections
//! (equirectangular, rectilinear, cylindrical) cast a 3-D viewing ray per
//! output pixel and project it through the equidistant fisheye model
//! `r = theta / (fov/2) * radius`; the fourth inverts a polynomial fisheye
//! distortion without going through ray space.

use std::f64::consts::{FRAC_PI_2, PI};

use nalgebra::{Rotation3, Vector3};
use ndarray::Array2;

use crate::config::{DewarpConfig, ProjectionType};

/// Reserved coordinate marking an output pixel with no visible source.
pub const OUT_OF_BOUNDS: f32 = -1.0;

/// Dense per-pixel sampling coordinates, shape `(output_height, output_width)`.
#[derive(Debug)]
pub struct LookupTable {
    pub map_x: Array2<f32>,
    pub map_y: Array2<f32>,
}

impl LookupTable {
    pub fn build(config: &DewarpConfig) -> Self {
        let geometry = Geometry::new(config);
        let (out_width, out_height) = (config.output_width, config.output_height);
        let mut map_x = Array2::from_elem((out_height, out_width), OUT_OF_BOUNDS);
        let mut map_y = Array2::from_elem((out_height, out_width), OUT_OF_BOUNDS);

        for y in 0..out_height {
            for x in 0..out_width {
                let sample = match config.projection {
                    ProjectionType::Equirectangular => Some(equirectangular(&geometry, x, y)),
                    ProjectionType::Rectilinear => rectilinear(&geometry, x, y),
                    ProjectionType::Cylindrical => cylindrical(&geometry, x, y),
                    ProjectionType::FisheyeUndistort => Some(fisheye_undistort(&geometry, x, y)),
                };
                if let Some((sample_x, sample_y)) = sample {
                    map_x[[y, x]] = sample_x as f32;
                    map_y[[y, x]] = sample_y as f32;
                }
            }
        }

        Self { map_x, map_y }
    }

    /// `(width, height)` of the output grid.
    pub fn output_size(&self) -> (usize, usize) {
        let (rows, cols) = self.map_x.dim();
        (cols, rows)
    }
}

/// Quantities shared by every projection, derived once per build.
#[derive(Debug, Clone)]
struct Geometry {
    out_width: f64,
    out_height: f64,
    /// Optical center in input-pixel units.
    center_x: f64,
    center_y: f64,
    /// Pixel radius of the full fisheye field of view.
    radius: f64,
    /// Half the input field of view, radians.
    half_fov: f64,
    pan: f64,
    tilt: f64,
    /// Pan around the vertical axis, then tilt around the horizontal axis.
    view_rotation: Rotation3<f64>,
    /// Synthetic focal length of the rectilinear output camera.
    rect_focal: f64,
    // fisheye undistortion intrinsics
    focal_in: f64,
    focal_out: f64,
    k1: f64,
    k2: f64,
    k3: f64,
    k4: f64,
}

impl Geometry {
    fn new(config: &DewarpConfig) -> Self {
        let pan = config.pan_angle.to_radians();
        let tilt = config.tilt_angle.to_radians();
        let half_fov = config.input_fov.to_radians() / 2.0;
        let rect_fov = config.rectilinear_fov.to_radians();
        Self {
            out_width: config.output_width as f64,
            out_height: config.output_height as f64,
            center_x: config.center_x * config.input_width as f64,
            center_y: config.center_y * config.input_height as f64,
            radius: config.input_width.min(config.input_height) as f64 / 2.0,
            half_fov,
            pan,
            tilt,
            view_rotation: Rotation3::from_axis_angle(&Vector3::x_axis(), tilt)
                * Rotation3::from_axis_angle(&Vector3::y_axis(), pan),
            rect_focal: config.output_width as f64 / (2.0 * (rect_fov / 2.0).tan()),
            focal_in: config.focal_length,
            focal_out: config.focal_length * config.scale,
            k1: config.k1,
            k2: config.k2,
            k3: config.k3,
            k4: config.k4,
        }
    }

    /// Equidistant projection of a unit viewing ray into the fisheye image:
    /// the image radius is proportional to the polar angle off the optical
    /// axis.
    fn project_ray(&self, ray: &Vector3<f64>) -> (f64, f64) {
        let theta = polar_angle(ray);
        let phi = ray.y.atan2(ray.x);
        let r = theta / self.half_fov * self.radius;
        (
            self.center_x + r * phi.cos(),
            self.center_y + r * phi.sin(),
        )
    }

    /// Same projection with the field-of-view cull applied by the
    /// rectilinear and cylindrical modes.
    fn project_ray_culled(&self, ray: &Vector3<f64>) -> Option<(f64, f64)> {
        if polar_angle(ray) > self.half_fov {
            return None;
        }
        Some(self.project_ray(ray))
    }
}

/// Angle between a unit ray and the optical axis.
#[inline]
fn polar_angle(ray: &Vector3<f64>) -> f64 {
    ray.z.clamp(-1.0, 1.0).acos()
}

/// Output x spans longitude `-pi..pi`, output y latitude `-pi/2..pi/2`.
/// Longitude wraps, so every output pixel maps to a sample coordinate.
fn equirectangular(geometry: &Geometry, x: usize, y: usize) -> (f64, f64) {
    let norm_x = 2.0 * x as f64 / geometry.out_width - 1.0;
    let norm_y = 2.0 * y as f64 / geometry.out_height - 1.0;

    let longitude = norm_x * PI + geometry.pan;
    let latitude = norm_y * FRAC_PI_2 + geometry.tilt;

    // unit by construction
    let ray = Vector3::new(
        latitude.cos() * longitude.sin(),
        latitude.sin(),
        latitude.cos() * longitude.cos(),
    );
    geometry.project_ray(&ray)
}

/// Perspective output camera: pixel offsets over a synthetic focal length,
/// rotated by pan then tilt. Rays outside the captured field of view are
/// culled, which leaves a black border in the rectified image.
fn rectilinear(geometry: &Geometry, x: usize, y: usize) -> Option<(f64, f64)> {
    let norm_x = (x as f64 - geometry.out_width / 2.0) / geometry.rect_focal;
    let norm_y = (y as f64 - geometry.out_height / 2.0) / geometry.rect_focal;

    let ray = geometry.view_rotation * Vector3::new(norm_x, norm_y, 1.0);
    geometry.project_ray_culled(&ray.normalize())
}

/// Horizontal angle wraps like equirectangular, vertical is tangent-linear
/// on the cylinder surface. Same field-of-view cull as rectilinear.
fn cylindrical(geometry: &Geometry, x: usize, y: usize) -> Option<(f64, f64)> {
    let norm_x = 2.0 * x as f64 / geometry.out_width - 1.0;
    let norm_y = 2.0 * y as f64 / geometry.out_height - 1.0;

    let longitude = norm_x * PI + geometry.pan;
    let vertical = norm_y * geometry.half_fov + geometry.tilt;

    let ray = Vector3::new(longitude.sin(), vertical.tan(), longitude.cos());
    geometry.project_ray_culled(&ray.normalize())
}

/// Inverse of the forward equidistant fisheye distortion
/// `theta_d = theta * (1 + k1 theta^2 + k2 theta^4 + k3 theta^6 + k4 theta^8)`.
/// The output camera shares the input optical center and uses
/// `focal_out = focal_in * scale`. No cull: coordinates may land outside the
/// input frame and are border-handled at sampling time.
fn fisheye_undistort(geometry: &Geometry, x: usize, y: usize) -> (f64, f64) {
    let norm_x = (x as f64 - geometry.center_x) / geometry.focal_out;
    let norm_y = (y as f64 - geometry.center_y) / geometry.focal_out;

    // equidistant model: angle equals normalized radius
    let theta = (norm_x * norm_x + norm_y * norm_y).sqrt();
    let theta2 = theta * theta;
    let theta4 = theta2 * theta2;
    let theta6 = theta4 * theta2;
    let theta8 = theta6 * theta2;
    let theta_d = theta
        * (1.0 + geometry.k1 * theta2 + geometry.k2 * theta4 + geometry.k3 * theta6
            + geometry.k4 * theta8);

    // guard the optical axis where theta_d / theta is 0/0
    let distort_scale = if theta > 1e-8 { theta_d / theta } else { 1.0 };
    (
        geometry.focal_in * norm_x * distort_scale + geometry.center_x,
        geometry.focal_in * norm_y * distort_scale + geometry.center_y,
    )
}
