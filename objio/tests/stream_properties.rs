//! Behavioural properties shared by buffered and raw streams
//!
//! These tests cover:
//! - Mode tokens and the readable/writable split
//! - Write round trips across buffer sizes and worker counts
//! - Seek then read at every offset
//! - Reads at and past end of object
//! - Close idempotence and use after close

use std::io::{Read, Seek, SeekFrom, Write};

use anyhow::Result;
use objio::objio_system::ObjectKind;
use objio::{BufferConfig, ObjectIoError, OpenMode, OpenOptions, open};
use objio_platform::MemorySystem;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

fn config(buffer_size: usize, max_buffers: usize, workers: usize) -> BufferConfig {
    BufferConfig::new(buffer_size)
        .unwrap()
        .with_max_buffers(max_buffers)
        .with_max_workers(workers)
        .unwrap()
}

#[test]
fn test_readable_xor_writable() -> Result<()> {
    init_logging();
    let system = MemorySystem::new();
    system.put_object("existing", ObjectKind::Block, b"abc".to_vec());

    for token in ["r", "rb", "w", "wb", "a", "ab", "x", "xb"] {
        let mode: OpenMode = token.parse()?;
        assert!(mode.is_readable() ^ mode.is_writable(), "mode {}", token);

        for buffered in [true, false] {
            let path = if token.starts_with('r') {
                "existing".to_string()
            } else {
                format!("{}-{}", token, buffered)
            };
            let mut stream = OpenOptions::new().mode(token).buffered(buffered).open(system.clone(), &path)?;
            assert!(stream.readable() ^ stream.writable());
            assert_eq!(stream.readable(), token.starts_with('r'));
            assert!(stream.seekable());
            stream.close()?;
        }
    }
    Ok(())
}

#[test]
fn test_write_round_trip_any_buffering() -> Result<()> {
    init_logging();
    let data = pattern(10_000);
    let chunk_sizes = [1usize, 333, 4096];

    for (buffer_size, workers) in [(1, 1), (7, 2), (512, 4), (4096, 1), (20_000, 3)] {
        for max_buffers in [0, 1, 3] {
            let system = MemorySystem::new();
            let options = OpenOptions::new().mode("w").config(config(buffer_size, max_buffers, workers));
            let mut stream = options.open(system.clone(), "out")?;

            let mut written = 0;
            for step in chunk_sizes.iter().cycle() {
                if written == data.len() {
                    break;
                }
                let end = (written + step).min(data.len());
                stream.write_all(&data[written..end])?;
                written = end;
            }
            stream.close()?;

            let stored = system.get_object("out").expect("object committed");
            assert_eq!(stored.len(), data.len(), "bs {} mb {}", buffer_size, max_buffers);
            assert_eq!(&stored[..], &data[..]);
        }
    }
    Ok(())
}

#[test]
fn test_random_write_round_trip() -> Result<()> {
    let data = pattern(3000);
    for buffer_size in [16, 100, 1024] {
        let system = MemorySystem::new().with_max_flush_size(64);
        let mut stream = OpenOptions::new()
            .mode("w")
            .kind(ObjectKind::Page)
            .config(config(buffer_size, 2, 3))
            .open(system.clone(), "page")?;
        // Second half first, then the first half
        stream.seek(SeekFrom::Start(1500))?;
        stream.write_all(&data[1500..])?;
        stream.seek(SeekFrom::Start(0))?;
        stream.write_all(&data[..1500])?;
        stream.close()?;

        assert_eq!(&system.get_object("page").unwrap()[..], &data[..]);
        assert!(system.update_calls("page").iter().all(|&(_, len)| len <= 64));
    }
    Ok(())
}

#[test]
fn test_seek_then_read_matches_slice() -> Result<()> {
    init_logging();
    let data = pattern(997);
    let system = MemorySystem::new();
    system.put_object("obj", ObjectKind::Block, data.clone());

    for buffered in [true, false] {
        let mut stream = OpenOptions::new()
            .config(config(64, 3, 2))
            .buffered(buffered)
            .open(system.clone(), "obj")?;
        for p in (0..data.len()).step_by(37).chain([data.len() - 1]) {
            for n in [1usize, 63, 64, 200] {
                assert_eq!(stream.seek(SeekFrom::Start(p as u64))?, p as u64);
                let got = stream.read_bytes(Some(n))?;
                let end = (p + n).min(data.len());
                assert_eq!(&got[..], &data[p..end], "buffered {} p {} n {}", buffered, p, n);
                assert_eq!(stream.tell()?, end as u64);
            }
        }
    }
    Ok(())
}

#[test]
fn test_backwards_seeks() -> Result<()> {
    let data = pattern(640);
    let system = MemorySystem::new();
    system.put_object("obj", ObjectKind::Block, data.clone());
    let mut stream = OpenOptions::new().config(config(64, 2, 2)).open(system, "obj")?;

    let mut buf = [0u8; 10];
    for p in [600u64, 5, 300, 64, 63, 0] {
        stream.seek(SeekFrom::Start(p))?;
        stream.read_exact(&mut buf)?;
        assert_eq!(&buf[..], &data[p as usize..p as usize + 10]);
    }
    assert_eq!(stream.seek(SeekFrom::Current(-10))?, 0);
    assert!(stream.seek(SeekFrom::Current(-1)).is_err());
    assert_eq!(stream.tell()?, 0);
    Ok(())
}

#[test]
fn test_reads_past_end_truncate() -> Result<()> {
    let data = pattern(100);
    let system = MemorySystem::new();
    system.put_object("obj", ObjectKind::Block, data.clone());

    for buffered in [true, false] {
        let mut stream = OpenOptions::new()
            .config(config(32, 0, 2))
            .buffered(buffered)
            .open(system.clone(), "obj")?;
        stream.seek(SeekFrom::Start(90))?;
        assert_eq!(&stream.read_bytes(Some(50))?[..], &data[90..]);
        assert!(stream.read_bytes(Some(50))?.is_empty());
        assert!(stream.read_all()?.is_empty());

        stream.seek(SeekFrom::Start(500))?;
        let mut buf = [0u8; 8];
        assert_eq!(stream.read(&mut buf)?, 0);
    }
    Ok(())
}

#[test]
fn test_empty_object() -> Result<()> {
    let system = MemorySystem::new();
    system.put_object("empty", ObjectKind::Block, Vec::new());
    let mut stream = open(system.clone(), "empty", "r")?;
    assert!(stream.read_all()?.is_empty());
    assert!(system.read_calls("empty").is_empty());
    Ok(())
}

#[test]
fn test_close_is_idempotent() -> Result<()> {
    let system = MemorySystem::new();
    for buffered in [true, false] {
        let mut stream = OpenOptions::new().mode("w").buffered(buffered).open(system.clone(), "k")?;
        stream.write_bytes(b"payload")?;
        stream.close()?;
        let calls = system.calls_for("k").len();
        stream.close()?;
        assert_eq!(system.calls_for("k").len(), calls);
        assert!(stream.closed());

        assert!(matches!(stream.write_bytes(b"x"), Err(ObjectIoError::StreamClosed)));
        assert!(matches!(stream.seek_to(SeekFrom::Start(0)), Err(ObjectIoError::StreamClosed)));
        // Queries stay valid
        assert_eq!(stream.tell()?, 7);
        assert_eq!(stream.name(), "k");
        assert!(stream.writable());
    }

    let mut reader = open(system.clone(), "k", "r")?;
    reader.close()?;
    assert!(matches!(reader.read_bytes(Some(1)), Err(ObjectIoError::StreamClosed)));
    Ok(())
}

#[test]
fn test_wrong_direction_is_unsupported() -> Result<()> {
    let system = MemorySystem::new();
    system.put_object("k", ObjectKind::Block, b"abc".to_vec());

    let mut reader = open(system.clone(), "k", "r")?;
    assert!(matches!(reader.write_bytes(b"x"), Err(ObjectIoError::UnsupportedOperation(_))));

    let mut writer = open(system, "k", "w")?;
    assert!(matches!(writer.read_all(), Err(ObjectIoError::UnsupportedOperation(_))));
    Ok(())
}

#[test]
fn test_metadata_memoized() -> Result<()> {
    let system = MemorySystem::new();
    system.put_object("obj", ObjectKind::Block, pattern(300));
    let mut stream = OpenOptions::new().config(config(50, 2, 2)).open(system.clone(), "obj")?;
    for _ in 0..10 {
        assert_eq!(stream.size()?, 300);
        stream.read_bytes(Some(30))?;
    }
    assert_eq!(stream.metadata()?.kind, ObjectKind::Block);
    assert_eq!(system.head_count("obj"), 1);
    Ok(())
}

#[test]
fn test_display() -> Result<()> {
    let system = MemorySystem::new();
    system.put_object("dir/obj", ObjectKind::Block, b"x".to_vec());
    let stream = open(system.clone(), "dir/obj", "rb")?;
    assert_eq!(stream.to_string(), "<BufferedObjectStream name='dir/obj' mode='rb'>");
    let raw = OpenOptions::new().buffered(false).open(system, "dir/obj")?;
    assert_eq!(raw.to_string(), "<RawObjectStream name='dir/obj' mode='r'>");
    Ok(())
}
