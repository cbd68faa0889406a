use std::path::Path;

use anyhow::Context;

use super::FrameSource;

/// Directory of raw NV12 frame files listed by an `index.csv` of
/// `timestamp,filename` records.
#[derive(Debug, Default)]
pub struct RawDirDataset {
    pub frames: Vec<(i64, String)>,
}

impl RawDirDataset {
    const INDEX_FILE: &'static str = "index.csv";

    pub fn new(dir: &str) -> anyhow::Result<Self> {
        let dir = Path::new(dir);
        let index_path = dir.join(Self::INDEX_FILE);
        let mut reader = csv::Reader::from_path(&index_path)
            .with_context(|| format!("reading {}", index_path.display()))?;

        let mut frames = Vec::new();
        for record in reader.records() {
            let record = record?;
            let timestamp = record
                .get(0)
                .context("missing timestamp column")?
                .trim()
                .parse::<i64>()
                .context("bad timestamp")?;
            let name = record.get(1).context("missing filename column")?.trim();
            frames.push((timestamp, dir.join(name).to_string_lossy().into_owned()));
        }
        Ok(Self { frames })
    }
}

impl FrameSource for RawDirDataset {
    fn frames(&self) -> &[(i64, String)] {
        &self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_index_and_resolves_paths() {
        let dir = std::env::temp_dir().join("dewarp-rs-dataset-test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("index.csv"),
            "timestamp,filename\n100,frame0.nv12\n200,frame1.nv12\n",
        )
        .unwrap();

        let dataset = RawDirDataset::new(dir.to_str().unwrap()).unwrap();
        assert_eq!(dataset.frames().len(), 2);
        assert_eq!(dataset.frames()[0].0, 100);
        assert!(dataset.frames()[1].1.ends_with("frame1.nv12"));
    }

    #[test]
    fn missing_index_is_an_error() {
        let dir = std::env::temp_dir().join("dewarp-rs-dataset-missing");
        let _ = std::fs::remove_dir_all(&dir);
        assert!(RawDirDataset::new(dir.to_str().unwrap()).is_err());
    }
}
