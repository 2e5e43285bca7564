//! Job-level writer scope.
//!
//! Owns the output stream. The header is written on [`JobWriter::create`];
//! the job shell, Job LUT and header backpatch happen on finalize, which also
//! runs from `Drop` if the caller never finalized explicitly.

use std::path::{Path, PathBuf};

use tracing::{debug, error};

use super::shell::job_shell;
use super::stream::OStream;
use super::work_plane::WorkPlaneWriter;
use crate::container::format::{OVF_MAGIC, UNPATCHED_OFFSET};
use crate::model::{Job, JobLut, WorkPlane};
use crate::util::{Error, Result};

/// Writer for one OVF file.
pub struct JobWriter {
    path: PathBuf,
    /// `None` once the file has been closed.
    stream: Option<OStream>,
    pub(super) job_shell: Job,
    pub(super) job_lut: JobLut,
    job_lut_offset_pos: u64,
    /// Placeholder position of a work plane scope that has started but not
    /// finished. Set only while a `WorkPlaneWriter` is alive (or was leaked).
    pub(super) open_work_plane: Option<u64>,
    /// First write failure, from this scope or a work plane. Once set, every
    /// later append or finalize reports it.
    failure: Option<String>,
    finalized: bool,
}

impl JobWriter {
    /// Create the file at `path` and write the header.
    ///
    /// Work planes inside `job` are ignored; use [`JobWriter::write_job`] to
    /// stream a fully populated job.
    pub fn create(path: impl AsRef<Path>, job: &Job) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut stream = OStream::create(&path)?;

        stream.write_bytes(OVF_MAGIC)?;
        let job_lut_offset_pos = stream.pos();
        stream.write_offset(UNPATCHED_OFFSET)?;

        debug!(path = %path.display(), job = job.name(), "opened OVF job");

        Ok(Self {
            path,
            stream: Some(stream),
            job_shell: job_shell(job),
            job_lut: JobLut::default(),
            job_lut_offset_pos,
            open_work_plane: None,
            failure: None,
            finalized: false,
        })
    }

    /// Write a complete in-memory job, including all work planes and blocks.
    pub fn write_job(path: impl AsRef<Path>, job: &Job) -> Result<()> {
        let mut writer = Self::create(path, job)?;
        for plane in &job.work_planes {
            let mut wp = writer.append_work_plane(plane)?;
            for block in &plane.vector_blocks {
                wp.append_vector_block(block)?;
            }
            wp.finish()?;
        }
        writer.finish()
    }

    /// Start a new work plane scope.
    ///
    /// The returned writer borrows `self` mutably, so only one work plane can
    /// be open at a time. Its `work_plane_number` is the number of work
    /// planes finalized so far; vector blocks in `plane` are ignored.
    pub fn append_work_plane(&mut self, plane: &WorkPlane) -> Result<WorkPlaneWriter<'_>> {
        self.check_failed()?;
        if self.finalized {
            return Err(Error::UseAfterFinalize("JobWriter"));
        }
        if let Some(pos) = self.open_work_plane {
            return Err(Error::ExclusivityViolation(format!(
                "work plane started at offset {pos} was never finalized"
            )));
        }
        WorkPlaneWriter::begin(self, plane)
    }

    /// Write the job shell and Job LUT, patch the header and close the file.
    ///
    /// Idempotent: calls after the first successful one do nothing. After a
    /// failed write, here or in a work plane, every call returns
    /// [`Error::WriterFailed`].
    pub fn finalize(&mut self) -> Result<()> {
        self.check_failed()?;
        if self.finalized {
            return Ok(());
        }
        if let Some(pos) = self.open_work_plane {
            return Err(Error::ExclusivityViolation(format!(
                "cannot finalize job while work plane at offset {pos} is open"
            )));
        }
        self.finalized = true;
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        let job_lut_offset = match self.write_trailer(&mut stream) {
            Ok(offset) => offset,
            Err(e) => {
                self.record_failure(&e);
                return Err(e);
            }
        };

        debug!(
            path = %self.path.display(),
            work_planes = self.job_shell.num_work_planes,
            job_lut_offset,
            "finalized OVF job"
        );
        Ok(())
    }

    /// Job shell, Job LUT and header patch; returns the Job LUT offset.
    fn write_trailer(&mut self, stream: &mut OStream) -> Result<u64> {
        self.job_lut.job_shell_position = stream.pos();
        stream.write_record(&self.job_shell)?;

        let job_lut_offset = stream.pos();
        stream.write_record(&self.job_lut)?;

        stream.seek(self.job_lut_offset_pos)?;
        stream.write_offset(job_lut_offset)?;
        stream.flush()?;
        Ok(job_lut_offset)
    }

    /// Finalize and close, surfacing any error.
    pub fn finish(mut self) -> Result<()> {
        self.finalize()
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current write cursor, or `None` once closed.
    pub fn position(&self) -> Option<u64> {
        self.stream.as_ref().map(OStream::pos)
    }

    /// Number of work planes finalized so far.
    pub fn num_work_planes(&self) -> u32 {
        self.job_shell.num_work_planes
    }

    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    /// Keep the first write failure; later ones are consequences of it.
    pub(super) fn record_failure(&mut self, e: &Error) {
        if self.failure.is_none() {
            self.failure = Some(e.to_string());
        }
    }

    pub(super) fn check_failed(&self) -> Result<()> {
        match &self.failure {
            Some(msg) => Err(Error::WriterFailed(msg.clone())),
            None => Ok(()),
        }
    }

    pub(super) fn stream_mut(&mut self) -> Result<&mut OStream> {
        self.stream.as_mut().ok_or(Error::UseAfterFinalize("JobWriter"))
    }
}

impl Drop for JobWriter {
    fn drop(&mut self) {
        // a recorded failure was already returned to the caller
        if !self.finalized && self.failure.is_none() {
            if let Err(e) = self.finalize() {
                error!(path = %self.path.display(), "failed to finalize OVF job: {e}");
            }
        }
    }
}
