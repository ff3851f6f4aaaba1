
//! Where the bytes of a file come from, and how little endian values are read from them.
//! Chunks are read by absolute position so that any number of threads
//! can share one `ByteSource`. Headers are parsed sequentially through a `SourceCursor`.

pub use std::io::Read;

use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
#[cfg(not(any(unix, windows)))]
use std::sync::Mutex;
use lebe::prelude::*;

use crate::error::{Error, IoResult, Result, UnitResult};
#[cfg(not(any(unix, windows)))]
use crate::error::IoError;


/// Random access to the bytes of a file.
pub trait ByteSource: Send + Sync {

    /// Read up to `buffer.len()` bytes starting at `offset`.
    /// Zero bytes are read only at the end of the source.
    fn read_at(&self, buffer: &mut [u8], offset: u64) -> IoResult<usize>;

    /// The number of bytes, if known.
    fn size(&self) -> Option<u64>;

    /// Shown in diagnostics.
    fn file_name(&self) -> &str;

    /// Read exactly `buffer.len()` bytes starting at `offset`.
    fn read_exact_at(&self, buffer: &mut [u8], offset: u64) -> IoResult<()> {
        let mut filled = 0;

        while filled < buffer.len() {
            match self.read_at(&mut buffer[filled ..], offset + filled as u64) {
                Ok(0) => return Err(ErrorKind::UnexpectedEof.into()),
                Ok(count) => filled += count,
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error),
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for dyn ByteSource {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_tuple("ByteSource").field(&self.file_name()).finish()
    }
}


/// A file on disk. Reads are positional and do not share a cursor,
/// so concurrent chunk reads do not wait for each other.
#[derive(Debug)]
pub struct FileSource {
    handle: File,
    size: u64,
    name: String,

    /// Platforms without positional reads seek the shared handle instead.
    #[cfg(not(any(unix, windows)))]
    seek_lock: Mutex<()>,
}

impl FileSource {

    /// Open the file for reading.
    pub fn open(path: impl AsRef<Path>) -> IoResult<Self> {
        let path = path.as_ref();
        let handle = File::open(path)?;
        let size = handle.metadata()?.len();
        let name = path.display().to_string();

        Ok(FileSource {
            handle, size, name,
            #[cfg(not(any(unix, windows)))]
            seek_lock: Mutex::new(()),
        })
    }
}

impl ByteSource for FileSource {

    #[cfg(unix)]
    fn read_at(&self, buffer: &mut [u8], offset: u64) -> IoResult<usize> {
        std::os::unix::fs::FileExt::read_at(&self.handle, buffer, offset)
    }

    #[cfg(windows)]
    fn read_at(&self, buffer: &mut [u8], offset: u64) -> IoResult<usize> {
        std::os::windows::fs::FileExt::seek_read(&self.handle, buffer, offset)
    }

    #[cfg(not(any(unix, windows)))]
    fn read_at(&self, buffer: &mut [u8], offset: u64) -> IoResult<usize> {
        use std::io::{Seek, SeekFrom};

        let _guard = self.seek_lock.lock()
            .map_err(|_| IoError::new(ErrorKind::Other, "file handle poisoned"))?;

        let mut handle = &self.handle;
        handle.seek(SeekFrom::Start(offset))?;
        handle.read(buffer)
    }

    fn size(&self) -> Option<u64> { Some(self.size) }
    fn file_name(&self) -> &str { &self.name }
}


/// A file that is already in memory.
#[derive(Debug, Clone)]
pub struct MemorySource {
    bytes: Vec<u8>,
    name: String,
}

impl MemorySource {

    /// The name only appears in diagnostics.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        MemorySource { bytes, name: name.into() }
    }
}

impl ByteSource for MemorySource {
    fn read_at(&self, buffer: &mut [u8], offset: u64) -> IoResult<usize> {
        let remaining = usize::try_from(offset).ok()
            .and_then(|offset| self.bytes.get(offset ..))
            .unwrap_or_default();

        let count = remaining.len().min(buffer.len());
        buffer[.. count].copy_from_slice(&remaining[.. count]);
        Ok(count)
    }

    fn size(&self) -> Option<u64> { Some(self.bytes.len() as u64) }
    fn file_name(&self) -> &str { &self.name }
}


/// Reads a `ByteSource` front to back.
#[derive(Debug)]
pub struct SourceCursor<'s, S: ?Sized> {
    source: &'s S,
    position: u64,
}

impl<'s, S: ?Sized + ByteSource> SourceCursor<'s, S> {

    /// Start at the first byte.
    pub fn new(source: &'s S) -> Self {
        SourceCursor { source, position: 0 }
    }

    /// The number of bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<S: ?Sized + ByteSource> Read for SourceCursor<'_, S> {
    fn read(&mut self, buffer: &mut [u8]) -> IoResult<usize> {
        let count = self.source.read_at(buffer, self.position)?;
        self.position += count as u64;
        Ok(count)
    }
}


/// A reader that can look at the next byte before deciding to consume it.
/// Attribute and header lists end with a null byte, which is detected this way.
#[derive(Debug)]
pub struct PeekRead<R> {
    inner: R,
    peeked: Option<u8>,
}

impl<R: Read> PeekRead<R> {

    /// Nothing is read until the first call.
    pub fn new(inner: R) -> Self {
        PeekRead { inner, peeked: None }
    }

    /// Consume the next byte if it equals `value`. Fails at the end of the input.
    pub fn skip_if_eq(&mut self, value: u8) -> IoResult<bool> {
        let next = match self.peeked {
            Some(byte) => byte,
            None => {
                let byte = u8::read_from_little_endian(&mut self.inner)?;
                self.peeked = Some(byte);
                byte
            }
        };

        let matches = next == value;
        if matches { self.peeked = None; }
        Ok(matches)
    }
}

impl<R: Read> Read for PeekRead<R> {
    fn read(&mut self, buffer: &mut [u8]) -> IoResult<usize> {
        match (self.peeked, buffer.split_first_mut()) {
            (Some(byte), Some((first, rest))) => {
                *first = byte;
                self.peeked = None;
                Ok(1 + self.inner.read(rest)?)
            },

            _ => self.inner.read(buffer),
        }
    }
}


/// A primitive stored in little endian.
pub trait Data: Sized + Default + Copy {

    /// The number of bytes in the file.
    const BYTE_SIZE: usize = std::mem::size_of::<Self>();

    /// Read one value.
    fn read(read: &mut impl Read) -> Result<Self>;

    /// Fill the slice with values.
    fn read_slice(read: &mut impl Read, slice: &mut [Self]) -> UnitResult;

    /// Read `count` values that were announced by the file itself.
    /// A count above `limit` is invalid. Memory grows by at most
    /// `batch` values at a time, so a broken count fails at the end of
    /// the input instead of allocating everything up front.
    fn read_vec(read: &mut impl Read, count: usize, batch: usize, limit: Option<usize>, purpose: &'static str) -> Result<Vec<Self>> {
        if limit.map_or(false, |limit| count > limit) {
            return Err(Error::invalid(purpose));
        }

        let batch = batch.max(1);
        let mut values = Vec::with_capacity(count.min(batch));

        while values.len() < count {
            let start = values.len();
            let end = count.min(start + batch);

            values.resize(end, Self::default());
            Self::read_slice(read, &mut values[start .. end])?;
        }

        Ok(values)
    }
}

macro_rules! little_endian_data {
    ($($primitive: ty),*) => { $(
        impl Data for $primitive {
            fn read(read: &mut impl Read) -> Result<Self> {
                Ok(read.read_from_little_endian()?)
            }

            fn read_slice(read: &mut impl Read, slice: &mut [Self]) -> UnitResult {
                Ok(read.read_from_little_endian_into(slice)?)
            }
        }
    )* };
}

little_endian_data!(u8, u16, i32, u32, u64, f32, f64);


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn peeking(){
        let mut read = PeekRead::new([ 5_u8, 0, 7, 8 ].as_slice());

        assert!(!read.skip_if_eq(0).unwrap());
        assert!(!read.skip_if_eq(0).unwrap());
        assert_eq!(u8::read(&mut read).unwrap(), 5);

        assert!(read.skip_if_eq(0).unwrap());
        assert!(!read.skip_if_eq(0).unwrap());

        let mut rest = [0_u8; 2];
        u8::read_slice(&mut read, &mut rest).unwrap();
        assert_eq!(rest, [ 7, 8 ]);

        assert!(read.skip_if_eq(0).is_err());
    }

    #[test]
    fn memory_source(){
        let source = MemorySource::new("memory", (0_u8 .. 10).collect());

        let mut buffer = [0_u8; 4];
        source.read_exact_at(&mut buffer, 3).unwrap();
        assert_eq!(buffer, [ 3, 4, 5, 6 ]);

        assert_eq!(source.read_at(&mut buffer, 8).unwrap(), 2);
        assert_eq!(source.read_at(&mut buffer, 80).unwrap(), 0);
        assert!(source.read_exact_at(&mut buffer, 8).is_err());
    }

    #[test]
    fn file_reads_do_not_share_a_position(){
        let path = std::env::temp_dir().join(format!("exr-input-source-{}.bin", std::process::id()));
        std::fs::write(&path, (0 ..= 255_u8).collect::<Vec<u8>>()).unwrap();

        let source = FileSource::open(&path).unwrap();
        assert_eq!(source.size(), Some(256));

        std::thread::scope(|scope| {
            for thread in 0 .. 8_u8 {
                let source = &source;
                scope.spawn(move || {
                    for round in 0 .. 64_u8 {
                        let offset = thread.wrapping_mul(31).wrapping_add(round) % 250;
                        let mut buffer = [0_u8; 6];
                        source.read_exact_at(&mut buffer, u64::from(offset)).unwrap();
                        assert_eq!(buffer[0], offset);
                        assert_eq!(buffer[5], offset + 5);
                    }
                });
            }
        });

        let mut tail = [0_u8; 4];
        assert!(source.read_exact_at(&mut tail, 254).is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn cursor(){
        let source = MemorySource::new("memory", vec![ 1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0 ]);
        let mut cursor = SourceCursor::new(&source);

        assert_eq!(u32::read(&mut cursor).unwrap(), 1);
        assert_eq!(cursor.position(), 4);

        assert!(u32::read_vec(&mut cursor, 2, 1, Some(1), "count").is_err());
        assert_eq!(u32::read_vec(&mut cursor, 2, 1, None, "count").unwrap(), [ 2, 3 ]);
        assert!(u32::read_vec(&mut cursor, 1, 16, None, "count").is_err());
    }
}
