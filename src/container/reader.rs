//! OVF file reader.
//!
//! Random access through the LUTs: header → Job LUT → work plane placeholder
//! → WorkPlane LUT → vector block. Nothing is read until asked for.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use memmap2::Mmap;
use parking_lot::Mutex;

use super::format::*;
use crate::codec::{read_delimited, wire::decode_varint, wire::MAX_VARINT_LEN, Record};
use crate::model::{Job, JobLut, VectorBlock, WorkPlane, WorkPlaneLut};
use crate::util::{Error, Result};

/// Reader for a finalized OVF file.
/// Supports both memory-mapped and buffered I/O modes.
pub struct OvfReader {
    inner: Source,
    size: u64,
}

enum Source {
    /// Memory-mapped file (preferred for large files)
    Mmap(Mmap),
    /// Buffered file access (fallback)
    File(Mutex<File>),
}

impl OvfReader {
    /// Open a file for reading, memory-mapped when the `mmap` feature is on.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_opts(path, cfg!(feature = "mmap"))
    }

    /// Open a file with optional memory mapping.
    pub fn open_opts(path: impl AsRef<Path>, use_mmap: bool) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::FileNotFound(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })?;

        let size = file.metadata()?.len();
        if size < HEADER_SIZE as u64 {
            return Err(Error::ShortRead(size));
        }

        let inner = if use_mmap {
            // Safety: the file is opened read-only; concurrent truncation by
            // another process is outside what this reader guards against.
            let mmap = unsafe { Mmap::map(&file) }.map_err(|e| Error::MmapFailed(e.to_string()))?;
            Source::Mmap(mmap)
        } else {
            Source::File(Mutex::new(file))
        };

        let reader = Self { inner, size };
        let mut magic = [0u8; 4];
        reader.read_into(0, &mut magic)?;
        if &magic != OVF_MAGIC {
            return Err(Error::InvalidMagic);
        }
        Ok(reader)
    }

    /// Total file size.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Read bytes into an existing buffer.
    pub fn read_into(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let end = pos.checked_add(buf.len() as u64).ok_or(Error::ShortRead(pos))?;
        if end > self.size {
            return Err(Error::ShortRead(end));
        }

        match &self.inner {
            Source::Mmap(mmap) => {
                buf.copy_from_slice(&mmap[pos as usize..end as usize]);
                Ok(())
            }
            Source::File(file) => {
                let mut f = file.lock();
                f.seek(SeekFrom::Start(pos))?;
                f.read_exact(buf)?;
                Ok(())
            }
        }
    }

    /// Read an 8-byte little-endian offset at `pos`.
    pub fn read_offset(&self, pos: u64) -> Result<u64> {
        let mut buf = [0u8; OFFSET_SIZE];
        self.read_into(pos, &mut buf)?;
        Ok(decode_offset(buf))
    }

    /// Decode the length-delimited record starting at `pos`.
    pub fn read_record<R: Record>(&self, pos: u64) -> Result<R> {
        if pos >= self.size {
            return Err(Error::ShortRead(pos));
        }
        match &self.inner {
            Source::Mmap(mmap) => read_delimited(&mmap[..], pos),
            Source::File(_) => {
                let mut prefix = [0u8; MAX_VARINT_LEN];
                let avail = (self.size - pos).min(MAX_VARINT_LEN as u64) as usize;
                self.read_into(pos, &mut prefix[..avail])?;

                let mut consumed = 0;
                let len = decode_varint(&prefix[..avail], &mut consumed)?;
                let start = pos + consumed as u64;
                if len > self.size - start {
                    return Err(Error::ShortRead(start));
                }
                let mut body = vec![0u8; len as usize];
                self.read_into(start, &mut body)?;
                R::from_bytes(&body)
            }
        }
    }

    /// Offset of the Job LUT, from the header.
    pub fn job_lut_offset(&self) -> Result<u64> {
        let offset = self.read_offset(JOB_LUT_OFFSET_POS)?;
        if offset == UNPATCHED_OFFSET {
            return Err(Error::corrupt("job LUT offset was never written (job not finalized)"));
        }
        Ok(offset)
    }

    pub fn job_lut(&self) -> Result<JobLut> {
        self.read_record(self.job_lut_offset()?)
    }

    /// Job record without work planes.
    pub fn job_shell(&self) -> Result<Job> {
        let lut = self.job_lut()?;
        self.read_record(lut.job_shell_position)
    }

    pub fn num_work_planes(&self) -> Result<usize> {
        Ok(self.job_lut()?.work_plane_positions.len())
    }

    /// LUT of work plane `index`, found through its placeholder.
    pub fn work_plane_lut(&self, index: usize) -> Result<WorkPlaneLut> {
        let lut = self.job_lut()?;
        self.work_plane_lut_in(&lut, index)
    }

    /// Work plane `index` without its vector blocks.
    pub fn work_plane_shell(&self, index: usize) -> Result<WorkPlane> {
        let lut = self.work_plane_lut(index)?;
        self.read_record(lut.work_plane_shell_position)
    }

    /// Vector block `block` of work plane `plane`.
    pub fn vector_block(&self, plane: usize, block: usize) -> Result<VectorBlock> {
        let lut = self.work_plane_lut(plane)?;
        let pos = lut
            .vector_blocks_positions
            .get(block)
            .copied()
            .ok_or(Error::VectorBlockOutOfBounds {
                index: block,
                count: lut.vector_blocks_positions.len(),
            })?;
        self.read_record(pos)
    }

    /// Work plane `index` with all of its vector blocks.
    pub fn work_plane(&self, index: usize) -> Result<WorkPlane> {
        let lut = self.work_plane_lut(index)?;
        self.assemble_work_plane(&lut)
    }

    /// Reassemble the whole job in memory.
    pub fn read_job(&self) -> Result<Job> {
        let job_lut = self.job_lut()?;
        let mut job: Job = self.read_record(job_lut.job_shell_position)?;
        job.work_planes = (0..job_lut.work_plane_positions.len())
            .map(|i| {
                let lut = self.work_plane_lut_in(&job_lut, i)?;
                self.assemble_work_plane(&lut)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(job)
    }

    fn work_plane_lut_in(&self, job_lut: &JobLut, index: usize) -> Result<WorkPlaneLut> {
        let placeholder = job_lut
            .work_plane_positions
            .get(index)
            .copied()
            .ok_or(Error::WorkPlaneOutOfBounds {
                index,
                count: job_lut.work_plane_positions.len(),
            })?;
        let lut_offset = self.read_offset(placeholder)?;
        if lut_offset == UNPATCHED_OFFSET {
            return Err(Error::corrupt(format!("work plane {index} LUT offset was never written")));
        }
        self.read_record(lut_offset)
    }

    fn assemble_work_plane(&self, lut: &WorkPlaneLut) -> Result<WorkPlane> {
        let mut plane: WorkPlane = self.read_record(lut.work_plane_shell_position)?;
        plane.vector_blocks = lut
            .vector_blocks_positions
            .iter()
            .map(|&pos| self.read_record(pos))
            .collect::<Result<Vec<_>>>()?;
        Ok(plane)
    }
}
