//! `std::io` trait implementations for the object streams.

use super::{BufferedObjectStream, ObjectStream, RawObjectStream};
use crate::domain::ObjectSystem;
use std::io::{self, Read, Seek, SeekFrom, Write};

impl<S: ObjectSystem> Read for BufferedObjectStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}

impl<S: ObjectSystem> Write for BufferedObjectStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.writable() {
            self.flush_buffer()?;
        }
        Ok(())
    }
}

impl<S: ObjectSystem> Seek for BufferedObjectStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_to(pos)?)
    }
}

impl<S: ObjectSystem> Read for RawObjectStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}

impl<S: ObjectSystem> Write for RawObjectStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_bytes(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.writable() {
            self.flush_image()?;
        }
        Ok(())
    }
}

impl<S: ObjectSystem> Seek for RawObjectStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_to(pos)?)
    }
}

impl<S: ObjectSystem> Read for ObjectStream<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Raw(stream) => stream.read(buf),
            Self::Buffered(stream) => stream.read(buf),
        }
    }
}

impl<S: ObjectSystem> Write for ObjectStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::Raw(stream) => stream.write(buf),
            Self::Buffered(stream) => stream.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::Raw(stream) => stream.flush(),
            Self::Buffered(stream) => stream.flush(),
        }
    }
}

impl<S: ObjectSystem> Seek for ObjectStream<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::Raw(stream) => stream.seek(pos),
            Self::Buffered(stream) => stream.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::OpenOptions;
    use crate::domain::{BufferConfig, ObjectKind};
    use objio_platform::MemorySystem;
    use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

    #[test]
    fn test_io_traits_round_trip() {
        let system = MemorySystem::new();
        let config = BufferConfig::new(3).unwrap();
        let mut writer = OpenOptions::new().mode("wb").config(config).open(system.clone(), "t").unwrap();
        writer.write_all(b"abcdefgh").unwrap();
        writer.flush().unwrap();
        writer.close().unwrap();

        let mut reader = OpenOptions::new().mode("rb").config(config).open(system, "t").unwrap();
        reader.seek(SeekFrom::Start(2)).unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "cdefgh");
    }

    #[test]
    fn test_error_kinds_through_io() {
        let system = MemorySystem::new();
        system.put_object("r", ObjectKind::Block, b"data".to_vec());
        let mut reader = OpenOptions::new().open(system, "r").unwrap();
        assert_eq!(reader.write(b"x").unwrap_err().kind(), ErrorKind::Unsupported);
        assert_eq!(reader.seek(SeekFrom::Current(-9)).unwrap_err().kind(), ErrorKind::InvalidInput);
        reader.close().unwrap();
        let mut buf = [0u8; 1];
        assert_eq!(reader.read(&mut buf).unwrap_err().kind(), ErrorKind::BrokenPipe);
    }
}
