
//! The part of a file before the pixel chunks:
//! magic number, version flags, headers and offset tables.
//! Also the arithmetic of levels and blocks that the offset tables depend on.

pub mod attribute;
pub mod header;

use std::io::BufReader;
use smallvec::SmallVec;

use crate::error::*;
use crate::io::*;
use crate::math::{RoundingMode, Vec2};
use self::attribute::{Compression, LevelMode, TileDescription};
use self::header::Header;


/// Every exr file starts with these bytes.
pub const MAGIC_NUMBER: [u8; 4] = [ 0x76, 0x2f, 0x31, 0x01 ];

/// Offset tables grow by at most this many entries at a time.
const OFFSET_TABLE_BATCH: usize = u16::MAX as usize;


/// Headers and offset tables of all parts of a file.
#[derive(Debug)]
pub struct MetaData {

    /// The version word that follows the magic number.
    pub version: Version,

    /// The headers of all parts, in file order.
    pub headers: Headers,

    /// For each part, the absolute file position of every chunk.
    /// Positions are not validated here.
    pub offset_tables: SmallVec<[Vec<u64>; 3]>,
}

/// The headers of a file.
pub type Headers = SmallVec<[Header; 3]>;


/// The format version and feature flags of a file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Version {

    /// Either 1 or 2.
    pub number: u8,

    /// A single part file whose header lacks a `type` attribute and contains tiles.
    pub single_part_tiled: bool,

    /// Names may have up to 255 bytes instead of 31.
    pub long_names: bool,

    /// Some part contains deep data.
    pub deep: bool,

    /// The headers are terminated by an empty header,
    /// and every header carries a `chunkCount`.
    pub multipart: bool,
}


/// Read the magic number and return whether it matches.
pub fn is_exr(read: &mut impl Read) -> Result<bool> {
    let mut bytes = [0_u8; 4];
    u8::read_slice(read, &mut bytes)?;
    Ok(bytes == MAGIC_NUMBER)
}

/// Consume the null byte that ends a list of headers or attributes, if it is next.
pub(crate) fn end_of_sequence(read: &mut PeekRead<impl Read>) -> Result<bool> {
    Ok(read.skip_if_eq(0)?)
}

pub(crate) fn missing_attribute(name: &str) -> Error {
    Error::invalid(format!("missing or invalid {} attribute", name))
}


impl MetaData {

    /// Parse everything up to the first chunk.
    /// Single attributes may be broken, but the offset table
    /// of every part must be computable.
    pub fn read_from_source(source: &dyn ByteSource) -> Result<Self> {
        let mut read = PeekRead::new(BufReader::new(SourceCursor::new(source)));

        if !is_exr(&mut read)? {
            return Err(Error::invalid("file identifier missing"));
        }

        let version = Version::read(&mut read)?;
        let headers = Header::read_all(&mut read, &version)?;

        // eight bytes per offset, so the file cannot hold more than this
        let offsets_in_file = source.size()
            .map(|size| u64_to_usize(size / u64::BYTE_SIZE as u64, "file size"))
            .transpose()?;

        let mut offset_tables = SmallVec::with_capacity(headers.len());
        for (index, header) in headers.iter().enumerate() {
            let count = header.chunk_count(&version)
                .map_err(|error| error.with_context(format_args!("part {}", index)))?;

            offset_tables.push(u64::read_vec(&mut read, count, OFFSET_TABLE_BATCH, offsets_in_file, "offset table size")?);
        }

        Ok(MetaData { version, headers, offset_tables })
    }
}


impl Version {

    /// Read and check the version word.
    pub fn read(read: &mut impl Read) -> Result<Self> {
        use bit_field::BitField;

        let word = u32::read(read)?;

        let version = Version {
            number: word.get_bits(0 .. 8) as u8,
            single_part_tiled: word.get_bit(9),
            long_names: word.get_bit(10),
            deep: word.get_bit(11),
            multipart: word.get_bit(12),
        };

        if version.number != 1 && version.number != 2 {
            return Err(Error::unsupported(format!("file format version {}", version.number)));
        }

        if word.get_bits(13 .. 32) != 0 {
            return Err(Error::unsupported("unknown file feature flags"));
        }

        if version.single_part_tiled && (version.deep || version.multipart) {
            return Err(Error::invalid("file format flags"));
        }

        Ok(version)
    }

    /// Whether the file may contain more than one part.
    pub fn is_multipart(&self) -> bool {
        self.multipart
    }
}


/// How many blocks of the given size cover the length.
pub fn block_count(length: usize, block_size: usize) -> usize {
    RoundingMode::Up.divide(length, block_size)
}

/// The length of the block starting at the position.
/// Only the last block may be shorter than the block size.
pub fn block_size(length: usize, block_size: usize, position: usize) -> Result<usize> {
    if position >= length {
        return Err(Error::invalid("block position"));
    }

    Ok(block_size.min(length - position))
}

/// How many levels a resolution has, counting the full resolution.
pub fn level_count(round: RoundingMode, resolution: usize) -> usize {
    round.log2(resolution) + 1
}

/// The resolution of a level. Never smaller than one.
pub fn level_size(round: RoundingMode, resolution: usize, level: usize) -> Result<usize> {
    if level >= usize::BITS as usize {
        return Err(Error::invalid("level index"));
    }

    Ok(round.divide(resolution, 1 << level).max(1))
}

/// The levels of a mip map, in offset table order.
pub fn mip_levels(round: RoundingMode, resolution: Vec2<usize>) -> impl Iterator<Item = Vec2<usize>> {
    let count = level_count(round, resolution.width().max(resolution.height()));
    (0 .. count).map(|level| Vec2(level, level))
}

/// The levels of a rip map, in offset table order.
/// The horizontal level changes fastest.
pub fn rip_levels(round: RoundingMode, resolution: Vec2<usize>) -> impl Iterator<Item = Vec2<usize>> {
    let columns = level_count(round, resolution.width());
    let rows = level_count(round, resolution.height());

    (0 .. rows).flat_map(move |y| (0 .. columns).map(move |x| Vec2(x, y)))
}

/// The number of chunks of a part without a `chunkCount` attribute.
pub fn computed_chunk_count(compression: Compression, size: Vec2<usize>, tiles: Option<TileDescription>) -> Result<usize> {
    let tiles = match tiles {
        None => return Ok(block_count(size.height(), compression.scan_lines_per_block())),
        Some(tiles) => tiles,
    };

    let round = tiles.rounding_mode;
    let tiles_in_level = |level: Vec2<usize>| -> Result<usize> {
        let width = level_size(round, size.width(), level.x())?;
        let height = level_size(round, size.height(), level.y())?;
        Ok(block_count(width, tiles.tile_size.width()) * block_count(height, tiles.tile_size.height()))
    };

    match tiles.level_mode {
        LevelMode::Singular => tiles_in_level(Vec2(0, 0)),
        LevelMode::MipMap => mip_levels(round, size).map(tiles_in_level).sum(),
        LevelMode::RipMap => rip_levels(round, size).map(tiles_in_level).sum(),
    }
}


#[cfg(test)]
mod test {
    use super::*;

    fn version(word: u32) -> Result<Version> {
        Version::read(&mut word.to_le_bytes().as_slice())
    }

    #[test]
    fn version_flags(){
        let tiled = version(2 | (1 << 9)).unwrap();
        assert!(tiled.single_part_tiled);
        assert!(!tiled.is_multipart());

        let multipart = version(2 | (1 << 12) | (1 << 10)).unwrap();
        assert!(multipart.is_multipart());
        assert!(multipart.long_names);

        assert!(matches!(version(2 | (1 << 13)), Err(Error::NotSupported(_))));
        assert!(matches!(version(3), Err(Error::NotSupported(_))));
        assert!(matches!(version(2 | (1 << 9) | (1 << 12)), Err(Error::Invalid(_))));
    }

    #[test]
    fn magic_number(){
        assert!(is_exr(&mut MAGIC_NUMBER.as_slice()).unwrap());
        assert!(!is_exr(&mut b"\x89PNG".as_slice()).unwrap());
        assert!(is_exr(&mut [ 0x76_u8 ].as_slice()).is_err());
    }

    #[test]
    fn levels(){
        assert_eq!(level_count(RoundingMode::Down, 1), 1);
        assert_eq!(level_count(RoundingMode::Down, 256), 9);
        assert_eq!(level_count(RoundingMode::Down, 255), 8);
        assert_eq!(level_count(RoundingMode::Up, 255), 9);

        assert_eq!(level_size(RoundingMode::Down, 255, 1).unwrap(), 127);
        assert_eq!(level_size(RoundingMode::Up, 255, 1).unwrap(), 128);
        assert_eq!(level_size(RoundingMode::Up, 255, 20).unwrap(), 1);
        assert!(level_size(RoundingMode::Up, 255, 200).is_err());
    }

    #[test]
    fn level_order(){
        let mip: Vec<_> = mip_levels(RoundingMode::Down, Vec2(8, 2)).collect();
        assert_eq!(mip, [ Vec2(0, 0), Vec2(1, 1), Vec2(2, 2), Vec2(3, 3) ]);

        let rip: Vec<_> = rip_levels(RoundingMode::Down, Vec2(4, 2)).collect();
        assert_eq!(rip, [ Vec2(0, 0), Vec2(1, 0), Vec2(2, 0), Vec2(0, 1), Vec2(1, 1), Vec2(2, 1) ]);
    }

    #[test]
    fn chunk_counts(){
        assert_eq!(computed_chunk_count(Compression::ZIP16, Vec2(7, 40), None).unwrap(), 3);
        assert_eq!(computed_chunk_count(Compression::RLE, Vec2(7, 40), None).unwrap(), 40);

        let tiles = TileDescription {
            tile_size: Vec2(4, 4),
            level_mode: LevelMode::MipMap,
            rounding_mode: RoundingMode::Down
        };

        // 8x8, 4x4, 2x2 and 1x1
        assert_eq!(computed_chunk_count(Compression::Uncompressed, Vec2(8, 8), Some(tiles)).unwrap(), 4 + 1 + 1 + 1);

        // three rows of 8x4, 4x4, 2x4 and 1x4
        let rip = TileDescription { level_mode: LevelMode::RipMap, ..tiles };
        assert_eq!(computed_chunk_count(Compression::Uncompressed, Vec2(8, 4), Some(rip)).unwrap(), (2 + 1 + 1 + 1) * 3);
    }

    #[test]
    fn blocks(){
        assert_eq!(block_count(10, 4), 3);
        assert_eq!(block_size(10, 4, 8).unwrap(), 2);
        assert_eq!(block_size(10, 4, 4).unwrap(), 4);
        assert!(block_size(10, 4, 12).is_err());
    }
}
