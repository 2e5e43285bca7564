//! # OVF
//!
//! Writer and reader for Open Vector Format (.ovf) job files, the per-layer
//! toolpath container used by laser powder bed fusion and marking machines,
//! plus a mesh slicer that produces the layers.
//!
//! The writer streams a job to disk in a single forward pass. Look-up tables
//! are written after the data they index, and fixed 8-byte placeholders are
//! backpatched with their offsets, so readers can seek straight to any work
//! plane or vector block.
//!
//! ## Modules
//!
//! - [`util`] - Error handling
//! - [`codec`] - Length-delimited record encoding
//! - [`model`] - Job, WorkPlane, VectorBlock and LUT records
//! - [`container`] - Container format, [`JobWriter`] / [`WorkPlaneWriter`], [`OvfReader`]
//! - [`slicer`] - Mesh slicing into layer contours
//! - [`convert`] - Layers to OVF
//! - [`config`] - JSON job configuration
//!
//! ## Example
//!
//! ```no_run
//! use ovf::prelude::*;
//!
//! # fn main() -> ovf::Result<()> {
//! let mut job = JobWriter::create("square.ovf", &Job::named("square"))?;
//! {
//!     let mut plane = job.append_work_plane(&WorkPlane::at_height(0.05))?;
//!     plane.append_vector_block(&VectorBlock::line_sequence(&[
//!         (0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0),
//!     ]))?;
//!     plane.finish()?;
//! }
//! job.finish()?;
//!
//! let reader = OvfReader::open("square.ovf")?;
//! assert_eq!(reader.num_work_planes()?, 1);
//! # Ok(())
//! # }
//! ```

pub mod util;
pub mod codec;
pub mod model;
pub mod container;
pub mod slicer;
pub mod convert;
pub mod config;

// Re-export commonly used types
pub use util::{Error, Result};
pub use container::{JobWriter, OvfReader, WorkPlaneWriter};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::model::*;
    pub use crate::container::{JobWriter, OvfReader, WorkPlaneWriter};
    pub use crate::slicer::{Contour, MeshSlicer, Point2D, SlicedLayer, Slicer, TriangleMesh};
    pub use crate::convert::{convert, write_layers, ConvertOptions};
    pub use crate::config::JobConfig;
}
