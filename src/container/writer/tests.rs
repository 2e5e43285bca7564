use super::*;
use crate::codec::{encode_delimited, read_delimited};
use crate::container::format::{decode_offset, HEADER_SIZE, OVF_MAGIC};
use crate::model::{Job, JobLut, VectorBlock, WorkPlane, WorkPlaneLut};
use crate::util::{Error, Result};
use tempfile::NamedTempFile;

fn square() -> VectorBlock {
    VectorBlock::line_sequence(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0), (0.0, 0.0)])
}

fn header_offset(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[4..12]);
    decode_offset(raw)
}

fn job_lut_of(bytes: &[u8]) -> Result<JobLut> {
    read_delimited(bytes, header_offset(bytes))
}

#[test]
fn test_write_empty_job() -> Result<()> {
    let temp = NamedTempFile::new()?;
    let path = temp.path();

    let writer = JobWriter::create(path, &Job::named("empty"))?;
    writer.finish()?;

    let bytes = std::fs::read(path)?;
    assert_eq!(&bytes[0..4], OVF_MAGIC);

    let lut = job_lut_of(&bytes)?;
    assert!(lut.work_plane_positions.is_empty());
    // job shell comes right after the header
    assert_eq!(lut.job_shell_position, HEADER_SIZE as u64);

    let shell: Job = read_delimited(&bytes, lut.job_shell_position)?;
    assert_eq!(shell.name(), "empty");
    assert_eq!(shell.num_work_planes, 0);
    Ok(())
}

#[test]
fn test_work_plane_block_layout() -> Result<()> {
    let temp = NamedTempFile::new()?;
    let path = temp.path();

    let mut writer = JobWriter::create(path, &Job::named("layout"))?;
    let mut wp = writer.append_work_plane(&WorkPlane::at_height(0.05))?;
    wp.append_vector_block(&square())?;
    wp.finish()?;
    writer.finish()?;

    let bytes = std::fs::read(path)?;
    let job_lut = job_lut_of(&bytes)?;
    assert_eq!(job_lut.work_plane_positions, vec![HEADER_SIZE as u64]);

    // placeholder holds the WorkPlane LUT offset
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[12..20]);
    let wp_lut: WorkPlaneLut = read_delimited(&bytes, decode_offset(raw))?;

    // first vector block follows the placeholder directly
    assert_eq!(wp_lut.vector_blocks_positions, vec![20]);
    let block: VectorBlock = read_delimited(&bytes, 20)?;
    assert_eq!(block, square());

    let shell: WorkPlane = read_delimited(&bytes, wp_lut.work_plane_shell_position)?;
    assert_eq!(shell.num_blocks, 1);
    assert_eq!(shell.z_pos_in_mm, 0.05);
    Ok(())
}

#[test]
fn test_shell_ignores_caller_children_and_numbering() -> Result<()> {
    let temp = NamedTempFile::new()?;
    let path = temp.path();

    let mut job = Job::named("numbering");
    job.num_work_planes = 42;
    job.work_planes.push(WorkPlane::at_height(9.0));

    let mut plane = WorkPlane::at_height(0.1);
    plane.work_plane_number = 17;
    plane.num_blocks = 5;
    plane.vector_blocks.push(square());

    {
        let mut writer = JobWriter::create(path, &job)?;
        for _ in 0..3 {
            let wp = writer.append_work_plane(&plane)?;
            wp.finish()?;
        }
        assert_eq!(writer.num_work_planes(), 3);
        writer.finish()?;
    }

    let bytes = std::fs::read(path)?;
    let lut = job_lut_of(&bytes)?;
    let shell: Job = read_delimited(&bytes, lut.job_shell_position)?;
    assert_eq!(shell.num_work_planes, 3);
    assert!(shell.work_planes.is_empty());

    for (i, &placeholder) in lut.work_plane_positions.iter().enumerate() {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[placeholder as usize..placeholder as usize + 8]);
        let wp_lut: WorkPlaneLut = read_delimited(&bytes, decode_offset(raw))?;
        assert!(wp_lut.vector_blocks_positions.is_empty());
        let wp: WorkPlane = read_delimited(&bytes, wp_lut.work_plane_shell_position)?;
        assert_eq!(wp.work_plane_number, i as u32);
        assert_eq!(wp.num_blocks, 0);
        assert!(wp.vector_blocks.is_empty());
    }
    Ok(())
}

#[test]
fn test_drop_finalizes_both_scopes() -> Result<()> {
    let temp = NamedTempFile::new()?;
    let path = temp.path();

    {
        let mut writer = JobWriter::create(path, &Job::named("drop"))?;
        let mut wp = writer.append_work_plane(&WorkPlane::at_height(1.0))?;
        wp.append_vector_block(&square())?;
    }

    let bytes = std::fs::read(path)?;
    let lut = job_lut_of(&bytes)?;
    assert_eq!(lut.work_plane_positions.len(), 1);
    Ok(())
}

#[test]
fn test_finalize_twice_matches_once() -> Result<()> {
    let once = NamedTempFile::new()?;
    let twice = NamedTempFile::new()?;

    for (path, repeat) in [(once.path(), 1), (twice.path(), 2)] {
        let mut writer = JobWriter::create(path, &Job::named("idempotent"))?;
        {
            let mut wp = writer.append_work_plane(&WorkPlane::at_height(0.2))?;
            wp.append_vector_block(&square())?;
            for _ in 0..repeat {
                wp.finalize()?;
            }
            assert!(wp.is_finalized());
        }
        for _ in 0..repeat {
            writer.finalize()?;
        }
        assert!(writer.is_finalized());
        assert_eq!(writer.position(), None);
    }

    assert_eq!(std::fs::read(once.path())?, std::fs::read(twice.path())?);
    Ok(())
}

#[test]
fn test_append_after_finalize_fails_without_writing() -> Result<()> {
    let reference = NamedTempFile::new()?;
    let checked = NamedTempFile::new()?;

    for (path, append_late) in [(reference.path(), false), (checked.path(), true)] {
        let mut writer = JobWriter::create(path, &Job::named("closed"))?;
        {
            let mut wp = writer.append_work_plane(&WorkPlane::at_height(0.3))?;
            wp.append_vector_block(&square())?;
            wp.finalize()?;
            if append_late {
                let err = wp.append_vector_block(&square()).unwrap_err();
                assert!(matches!(err, Error::UseAfterFinalize("WorkPlaneWriter")));
                assert_eq!(wp.num_blocks(), 1);
            }
        }
        writer.finalize()?;
        if append_late {
            let err = writer.append_work_plane(&WorkPlane::default()).err();
            assert!(matches!(err, Some(Error::UseAfterFinalize("JobWriter"))));
        }
    }

    assert_eq!(std::fs::read(reference.path())?, std::fs::read(checked.path())?);
    Ok(())
}

#[test]
fn test_leaked_work_plane_blocks_new_scopes() -> Result<()> {
    let temp = NamedTempFile::new()?;
    let mut writer = JobWriter::create(temp.path(), &Job::named("leak"))?;

    let wp = writer.append_work_plane(&WorkPlane::default())?;
    std::mem::forget(wp);

    let err = writer.append_work_plane(&WorkPlane::default()).err();
    assert!(matches!(err, Some(Error::ExclusivityViolation(_))));
    assert!(matches!(writer.finalize(), Err(Error::ExclusivityViolation(_))));
    assert!(!writer.is_finalized());
    Ok(())
}

#[test]
fn test_create_in_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("out.ovf");
    let err = JobWriter::create(&path, &Job::default()).err();
    match err {
        Some(Error::SinkOpen { path: p, .. }) => assert_eq!(p, path),
        other => panic!("expected SinkOpen, got {other:?}"),
    }
}

#[test]
fn test_cursor_only_moves_forward() -> Result<()> {
    let temp = NamedTempFile::new()?;
    let mut writer = JobWriter::create(temp.path(), &Job::named("cursor"))?;
    assert_eq!(writer.position(), Some(HEADER_SIZE as u64));

    let mut last = HEADER_SIZE as u64;
    for z in [0.1f32, 0.2, 0.3] {
        {
            let mut wp = writer.append_work_plane(&WorkPlane::at_height(z))?;
            wp.append_vector_block(&square())?;
            wp.append_vector_block(&square())?;
        }
        let pos = writer.position().unwrap();
        assert!(pos > last);
        assert_eq!(pos, std::fs::metadata(temp.path())?.len());
        last = pos;
    }
    writer.finish()?;
    Ok(())
}

fn append_square_and_drop(mut wp: WorkPlaneWriter<'_>) -> Result<()> {
    wp.append_vector_block(&square())
}

#[test]
fn test_moved_work_plane_finalizes_once() -> Result<()> {
    let temp = NamedTempFile::new()?;
    let path = temp.path();

    {
        let mut writer = JobWriter::create(path, &Job::named("moved"))?;
        {
            let mut wp = writer.append_work_plane(&WorkPlane::at_height(0.5))?;
            wp.append_vector_block(&square())?;
            let moved = wp;
            let mut held = vec![moved];
            append_square_and_drop(held.pop().unwrap())?;
            assert!(held.is_empty());
        }
        assert_eq!(writer.num_work_planes(), 1);
        writer.finish()?;
    }

    let bytes = std::fs::read(path)?;
    let job_lut = job_lut_of(&bytes)?;
    assert_eq!(job_lut.work_plane_positions, vec![HEADER_SIZE as u64]);

    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[12..20]);
    let lut_offset = decode_offset(raw);
    let wp_lut: WorkPlaneLut = read_delimited(&bytes, lut_offset)?;
    assert_eq!(wp_lut.vector_blocks_positions.len(), 2);

    // blocks, one shell, one LUT, then straight into the job shell
    let shell: WorkPlane = read_delimited(&bytes, wp_lut.work_plane_shell_position)?;
    assert_eq!(shell.num_blocks, 2);
    let shell_len = encode_delimited(&shell).len() as u64;
    assert_eq!(wp_lut.work_plane_shell_position + shell_len, lut_offset);
    let lut_len = encode_delimited(&wp_lut).len() as u64;
    assert_eq!(lut_offset + lut_len, job_lut.job_shell_position);
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn test_failed_work_plane_is_reported_by_job() -> Result<()> {
    let mut writer = JobWriter::create("/dev/full", &Job::named("full"))?;
    let mut wp = writer.append_work_plane(&WorkPlane::at_height(0.1))?;
    // buffered, so the disk is not touched yet
    wp.append_vector_block(&square())?;
    assert!(matches!(wp.finish(), Err(Error::Io(_))));

    let err = writer.append_work_plane(&WorkPlane::default()).err();
    assert!(matches!(err, Some(Error::WriterFailed(_))));
    match writer.finalize() {
        Err(Error::WriterFailed(msg)) => assert!(msg.contains("I/O error"), "{msg}"),
        other => panic!("expected WriterFailed, got {other:?}"),
    }
    assert!(matches!(writer.finish(), Err(Error::WriterFailed(_))));
    Ok(())
}

#[cfg(target_os = "linux")]
#[test]
fn test_failed_finalize_is_not_retried_as_success() -> Result<()> {
    let mut writer = JobWriter::create("/dev/full", &Job::named("full"))?;
    assert!(matches!(writer.finalize(), Err(Error::Io(_))));
    assert!(writer.is_finalized());
    assert!(matches!(writer.finalize(), Err(Error::WriterFailed(_))));
    assert!(matches!(writer.finish(), Err(Error::WriterFailed(_))));
    Ok(())
}
