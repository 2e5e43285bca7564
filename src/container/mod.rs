//! OVF container format.
//!
//! ## File Structure
//!
//! ```text
//! +----------------------------+
//! | Magic: "OVF!"              |  4 bytes
//! +----------------------------+
//! | Job LUT offset             |  8 bytes (u64 LE, backpatched)
//! +----------------------------+
//! | Work plane 0               |
//! |   WorkPlane LUT offset     |  8 bytes (u64 LE, backpatched)
//! |   VectorBlock records ...  |
//! |   WorkPlane shell record   |
//! |   WorkPlane LUT record     |
//! +----------------------------+
//! | Work plane 1 ...           |
//! +----------------------------+
//! | Job shell record           |
//! +----------------------------+
//! | Job LUT record             |
//! +----------------------------+
//! ```
//!
//! Job LUT entries point at each work plane's 8-byte placeholder; WorkPlane
//! LUT entries point directly at vector block records.

mod format;
mod reader;
pub mod writer;

pub use format::*;
pub use reader::*;
pub use writer::{JobWriter, WorkPlaneWriter};
