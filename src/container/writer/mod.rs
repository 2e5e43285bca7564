//! OVF writer.
//!
//! A [`JobWriter`] owns the file; each [`WorkPlaneWriter`] borrows it while
//! its work plane is open. Data only moves forward, apart from rewriting the
//! 8-byte placeholders once the LUT they point to has been written.

mod job;
mod shell;
mod stream;
mod work_plane;

pub use job::JobWriter;
pub use shell::{job_shell, work_plane_shell};
pub use work_plane::WorkPlaneWriter;

#[cfg(test)]
mod tests;
