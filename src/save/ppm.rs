use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::global_types::OutputFrame;

/// Writes a rectified frame as a binary PPM image.
pub fn write_ppm(frame: &OutputFrame, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    write!(writer, "P6\n{} {}\n255\n", frame.width, frame.height)?;
    writer.write_all(&frame.data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_header_and_pixel_data() {
        let mut frame = OutputFrame::new(2, 2);
        frame.data.copy_from_slice(&[10; 12]);
        let path = std::env::temp_dir().join("dewarp-rs-snapshot-test.ppm");
        write_ppm(&frame, &path).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"P6\n2 2\n255\n"));
        assert_eq!(bytes.len(), b"P6\n2 2\n255\n".len() + 12);
    }
}
