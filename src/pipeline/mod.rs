//! The page pipeline: fragments in, aligned artifacts out.
//!
//! Data flows through the submodules in a fixed order:
//!
//! ```text
//! normalized fragments
//!     → detect          (typesetting direction, when set to auto)
//!     → reading_order   (lines or columns, flattened to reading order)
//!     → postprocess     (Japanese spacing, paragraph merging, cleanup)
//!     → assemble        (Markdown transcript)
//!     → pdf             (page images + invisible text layer)
//! ```
//!
//! The orchestration that drives pages through this pipeline concurrently
//! lives in [`crate::convert`].

pub mod assemble;
pub mod detect;
pub mod pdf;
pub mod postprocess;
pub mod reading_order;
