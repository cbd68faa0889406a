//! Frame rectifier kernels: NV12 to packed RGB, then a bilinear sampling
//! pass through the lookup table. Both run once per incoming frame, so they
//! iterate flat row slices in parallel and never allocate per pixel.

use rayon::prelude::*;

use super::lookup::LookupTable;

/// Fill color for output pixels with no visible source.
const BORDER: [u8; 3] = [0, 0, 0];

/// BT.601 studio-swing NV12 to packed RGB at full input resolution.
/// `rgb` is a reused scratch buffer; it is resized to `width * height * 3`.
pub fn nv12_to_rgb(luma: &[u8], chroma: &[u8], width: usize, height: usize, rgb: &mut Vec<u8>) {
    rgb.resize(width * height * 3, 0);

    rgb.par_chunks_mut(width * 3).enumerate().for_each(|(y, row)| {
        let luma_row = &luma[y * width..(y + 1) * width];
        // one interleaved U/V row covers two luma rows
        let chroma_row = &chroma[(y / 2) * width..(y / 2) * width + width];
        for x in 0..width {
            let c = luma_row[x] as f32 - 16.0;
            let d = chroma_row[x & !1] as f32 - 128.0;
            let e = chroma_row[x | 1] as f32 - 128.0;

            let r = 1.164 * c + 1.596 * e;
            let g = 1.164 * c - 0.392 * d - 0.813 * e;
            let b = 1.164 * c + 2.017 * d;

            let pixel = &mut row[x * 3..x * 3 + 3];
            pixel[0] = r.round().clamp(0.0, 255.0) as u8;
            pixel[1] = g.round().clamp(0.0, 255.0) as u8;
            pixel[2] = b.round().clamp(0.0, 255.0) as u8;
        }
    });
}

/// Samples the packed RGB input at every table coordinate with bilinear
/// interpolation. Sentinel entries fail the extent check like any other
/// out-of-range coordinate and come out as the border color.
pub fn remap_bilinear(
    rgb: &[u8],
    in_width: usize,
    in_height: usize,
    table: &LookupTable,
    out: &mut [u8],
) {
    let (out_width, _) = table.output_size();
    let max_x = (in_width - 1) as f64;
    let max_y = (in_height - 1) as f64;

    out.par_chunks_mut(out_width * 3).enumerate().for_each(|(y, row)| {
        for x in 0..out_width {
            let sample_x = table.map_x[[y, x]] as f64;
            let sample_y = table.map_y[[y, x]] as f64;
            let pixel = &mut row[x * 3..x * 3 + 3];

            if !(0.0..=max_x).contains(&sample_x) || !(0.0..=max_y).contains(&sample_y) {
                pixel.copy_from_slice(&BORDER);
                continue;
            }

            let x0 = sample_x.floor() as usize;
            let y0 = sample_y.floor() as usize;
            let x1 = (x0 + 1).min(in_width - 1);
            let y1 = (y0 + 1).min(in_height - 1);
            let weight_x = sample_x - x0 as f64;
            let weight_y = sample_y - y0 as f64;

            for channel in 0..3 {
                let v00 = rgb[(y0 * in_width + x0) * 3 + channel] as f64;
                let v01 = rgb[(y0 * in_width + x1) * 3 + channel] as f64;
                let v10 = rgb[(y1 * in_width + x0) * 3 + channel] as f64;
                let v11 = rgb[(y1 * in_width + x1) * 3 + channel] as f64;
                let top = v00 * (1.0 - weight_x) + v01 * weight_x;
                let bottom = v10 * (1.0 - weight_x) + v11 * weight_x;
                pixel[channel] = (top * (1.0 - weight_y) + bottom * weight_y).round() as u8;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DewarpConfig, ProjectionType};
    use crate::dewarper::lookup::OUT_OF_BOUNDS;
    use ndarray::Array2;

    fn table_from_fn(
        out_width: usize,
        out_height: usize,
        f: impl Fn(usize, usize) -> (f32, f32),
    ) -> LookupTable {
        let mut map_x = Array2::zeros((out_height, out_width));
        let mut map_y = Array2::zeros((out_height, out_width));
        for y in 0..out_height {
            for x in 0..out_width {
                let (sample_x, sample_y) = f(x, y);
                map_x[[y, x]] = sample_x;
                map_y[[y, x]] = sample_y;
            }
        }
        LookupTable { map_x, map_y }
    }

    #[test]
    fn nv12_black_and_white_levels() {
        // studio black (16) and white (235), neutral chroma
        let mut nv12 = vec![16u8; 4 * 2 * 3 / 2];
        nv12[1] = 235;
        for value in &mut nv12[8..] {
            *value = 128;
        }
        let (luma, chroma) = nv12.split_at(4 * 2);
        let mut rgb = Vec::new();
        nv12_to_rgb(luma, chroma, 4, 2, &mut rgb);
        assert_eq!(&rgb[0..3], &[0, 0, 0]);
        assert_eq!(&rgb[3..6], &[255, 255, 255]);
    }

    #[test]
    fn nv12_red_chroma() {
        // Y=81, U=90, V=240 is the BT.601 primary red
        let mut nv12 = vec![81u8; 2 * 2 * 3 / 2];
        nv12[4] = 90;
        nv12[5] = 240;
        let (luma, chroma) = nv12.split_at(2 * 2);
        let mut rgb = Vec::new();
        nv12_to_rgb(luma, chroma, 2, 2, &mut rgb);
        let [r, g, b] = [rgb[0] as i32, rgb[1] as i32, rgb[2] as i32];
        assert!((r - 255).abs() <= 2, "r = {r}");
        assert!(g <= 2, "g = {g}");
        assert!(b <= 2, "b = {b}");
    }

    #[test]
    fn identity_table_copies_input() {
        let rgb: Vec<u8> = (0..4 * 4 * 3).map(|v| v as u8).collect();
        let table = table_from_fn(4, 4, |x, y| (x as f32, y as f32));
        let mut out = vec![0u8; 4 * 4 * 3];
        remap_bilinear(&rgb, 4, 4, &table, &mut out);
        assert_eq!(out, rgb);
    }

    #[test]
    fn fractional_coordinate_interpolates() {
        // left pixel 0, right pixel 100; sampling halfway gives 50
        let mut rgb = vec![0u8; 2 * 1 * 3];
        rgb[3..6].copy_from_slice(&[100, 100, 100]);
        let table = table_from_fn(1, 1, |_, _| (0.5, 0.0));
        let mut out = vec![0u8; 3];
        remap_bilinear(&rgb, 2, 1, &table, &mut out);
        assert_eq!(out, vec![50, 50, 50]);
    }

    #[test]
    fn sentinel_and_out_of_extent_become_border() {
        let rgb = vec![200u8; 4 * 4 * 3];
        let table = table_from_fn(3, 1, |x, _| match x {
            0 => (OUT_OF_BOUNDS, OUT_OF_BOUNDS),
            1 => (10.0, 1.0), // past the right edge
            _ => (1.0, 1.0),
        });
        let mut out = vec![1u8; 3 * 3];
        remap_bilinear(&rgb, 4, 4, &table, &mut out);
        assert_eq!(&out[0..3], &[0, 0, 0]);
        assert_eq!(&out[3..6], &[0, 0, 0]);
        assert_eq!(&out[6..9], &[200, 200, 200]);
    }

    #[test]
    fn built_table_round_trips_a_uniform_frame() {
        // a uniform input stays uniform wherever the table lands in-frame
        let config = DewarpConfig {
            projection: ProjectionType::Equirectangular,
            input_width: 16,
            input_height: 16,
            output_width: 8,
            output_height: 8,
            ..Default::default()
        };
        let table = LookupTable::build(&config);
        let rgb = vec![77u8; 16 * 16 * 3];
        let mut out = vec![0u8; 8 * 8 * 3];
        remap_bilinear(&rgb, 16, 16, &table, &mut out);
        for pixel in out.chunks(3) {
            assert!(pixel == [77u8; 3].as_slice() || pixel == BORDER.as_slice());
        }
    }
}
