//! Core library for unpacking texture atlases back into individual frames.
//!
//! - Descriptor: XML property-list reader (`plist`) and the frame table / metadata decoder
//! - Sequences: frames grouped by the prefix before the first `/` of their name
//! - Reconstruction: crop, undo the packer's 90° rotation, re-pad trimmed frames
//! - Pipeline: `unpack_descriptor` drives one descriptor end to end and reports per-frame failures
//!
//! Quick example:
//! ```ignore
//! use std::path::Path;
//! use tex_unpacker_core::{TracingReporter, UnpackConfig, unpack_descriptor};
//! # fn main() -> anyhow::Result<()> {
//! let cfg = UnpackConfig::builder().compact(false).build();
//! let out = unpack_descriptor(Path::new("hero.plist"), Path::new("out"), &cfg, &TracingReporter)?;
//! println!("frames: {}", out.report.written.len());
//! # Ok(()) }
//! ```

pub mod config;
pub mod descriptor;
pub mod error;
pub mod export;
pub mod grid;
pub mod model;
pub mod pipeline;
pub mod plist;
pub mod reconstruct;
pub mod scalar;
pub mod sequence;

pub use config::*;
pub use descriptor::*;
pub use error::*;
pub use export::*;
pub use grid::*;
pub use model::*;
pub use pipeline::*;
pub use reconstruct::*;
pub use sequence::*;

/// Convenience prelude for common types and functions.
/// Importing `tex_unpacker_core::prelude::*` brings the primary APIs into scope.
pub mod prelude {
    pub use crate::config::{PaddingMode, UnpackConfig, UnpackConfigBuilder};
    pub use crate::model::{AtlasDescriptor, Point, Rect, Sequence, Size, TexelFrame};
    pub use crate::pipeline::{Reporter, TracingReporter, UnpackOutput, UnpackReport};
    pub use crate::{
        group_sequences, reconstruct_frame, split_grid, to_sprite_sheet, to_template_context,
        unpack_descriptor, unpack_frames,
    };
}
