//! Offline frame sources.
//!
//! Stands in for a live capture pipeline: frames are raw NV12 files listed
//! by an index in capture order.
mod raw_dir;

pub use raw_dir::RawDirDataset;

pub type DefaultSource = RawDirDataset;

pub trait FrameSource {
    /// Timestamps and frame file paths, in capture order.
    fn frames(&self) -> &[(i64, String)];
}
