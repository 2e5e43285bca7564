//! Work-plane writer scope.

use tracing::{debug, error, trace};

use super::job::JobWriter;
use super::shell::work_plane_shell;
use crate::container::format::UNPATCHED_OFFSET;
use crate::model::{VectorBlock, WorkPlane, WorkPlaneLut};
use crate::util::{Error, Result};

/// Writer for one work plane, created by [`JobWriter::append_work_plane`].
///
/// Holds the parent exclusively for its whole life. Finalizes on `Drop`
/// unless [`finalize`](Self::finalize) or [`finish`](Self::finish) ran
/// first; finalization happens at most once.
pub struct WorkPlaneWriter<'a> {
    job: &'a mut JobWriter,
    shell: WorkPlane,
    lut: WorkPlaneLut,
    lut_offset_pos: u64,
    finalized: bool,
}

impl<'a> WorkPlaneWriter<'a> {
    pub(super) fn begin(job: &'a mut JobWriter, plane: &WorkPlane) -> Result<Self> {
        let mut shell = work_plane_shell(plane);
        shell.work_plane_number = job.job_shell.num_work_planes;

        let stream = job.stream_mut()?;
        let lut_offset_pos = stream.pos();
        if let Err(e) = stream.write_offset(UNPATCHED_OFFSET) {
            job.record_failure(&e);
            return Err(e);
        }
        job.job_lut.work_plane_positions.push(lut_offset_pos);
        job.open_work_plane = Some(lut_offset_pos);

        debug!(
            work_plane = shell.work_plane_number,
            z = shell.z_pos_in_mm,
            offset = lut_offset_pos,
            "opened work plane"
        );

        Ok(Self {
            job,
            shell,
            lut: WorkPlaneLut::default(),
            lut_offset_pos,
            finalized: false,
        })
    }

    /// Append one vector block record.
    pub fn append_vector_block(&mut self, block: &VectorBlock) -> Result<()> {
        if self.finalized {
            return Err(Error::UseAfterFinalize("WorkPlaneWriter"));
        }
        self.job.check_failed()?;
        let stream = self.job.stream_mut()?;
        let pos = stream.pos();
        let len = match stream.write_record(block) {
            Ok(len) => len,
            Err(e) => {
                self.job.record_failure(&e);
                return Err(e);
            }
        };
        self.lut.vector_blocks_positions.push(pos);
        self.shell.num_blocks += 1;

        trace!(work_plane = self.shell.work_plane_number, offset = pos, len, "wrote vector block");
        Ok(())
    }

    /// Write the shell and LUT, backpatch the placeholder, and count this
    /// work plane in the parent job.
    ///
    /// Idempotent. The scope is closed on the parent as soon as this starts;
    /// a failure part-way is recorded on the parent, whose later appends and
    /// finalize report it as [`Error::WriterFailed`].
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }
        self.finalized = true;
        self.job.open_work_plane = None;

        let lut_offset = match self.write_trailer() {
            Ok(offset) => offset,
            Err(e) => {
                self.job.record_failure(&e);
                return Err(e);
            }
        };
        self.job.job_shell.num_work_planes += 1;

        debug!(
            work_plane = self.shell.work_plane_number,
            blocks = self.shell.num_blocks,
            lut_offset,
            "finalized work plane"
        );
        Ok(())
    }

    /// Shell, LUT and placeholder patch; returns the LUT offset.
    fn write_trailer(&mut self) -> Result<u64> {
        self.job.check_failed()?;
        let stream = self.job.stream_mut()?;
        self.lut.work_plane_shell_position = stream.pos();
        stream.write_record(&self.shell)?;

        let lut_offset = stream.pos();
        stream.write_record(&self.lut)?;

        stream.backpatch(self.lut_offset_pos, lut_offset)?;
        Ok(lut_offset)
    }

    /// Finalize, surfacing any error.
    pub fn finish(mut self) -> Result<()> {
        self.finalize()
    }

    /// Sequence index assigned to this work plane.
    pub fn work_plane_number(&self) -> u32 {
        self.shell.work_plane_number
    }

    /// Number of vector blocks appended so far.
    pub fn num_blocks(&self) -> u32 {
        self.shell.num_blocks
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

impl Drop for WorkPlaneWriter<'_> {
    fn drop(&mut self) {
        if !self.finalized {
            if let Err(e) = self.finalize() {
                error!(
                    work_plane = self.shell.work_plane_number,
                    "failed to finalize work plane: {e}"
                );
            }
        }
    }
}
