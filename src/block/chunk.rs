
//! Read the compressed bytes of a single chunk at its offset,
//! verifying the chunk prefix against the expected location.

use crate::io::*;
use crate::math::*;
use crate::error::*;
use crate::block::{ChunkInfo, ChunkKind, ChunkLayout};


/// A tile of a tiled part, as stored in its chunk prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoordinates {

    /// Column and row in the tile grid of the level.
    pub tile_index: Vec2<usize>,

    /// The level in x and y direction. Equal for mip maps.
    pub level_index: Vec2<usize>,
}

impl TileCoordinates {

    /// Read tile x, tile y, level x and level y from a tile chunk prefix.
    pub fn read(read: &mut impl Read) -> Result<Self> {
        let [ tile_x, tile_y, level_x, level_y ] = [
            i32::read(read)?, i32::read(read)?,
            i32::read(read)?, i32::read(read)?,
        ];

        // a level index of 32 would need a resolution above the i32 range
        if level_x >= 32 || level_y >= 32 {
            return Err(Error::invalid("tile level index"));
        }

        Ok(TileCoordinates {
            tile_index: Vec2(tile_x, tile_y).to_usize("tile index")?,
            level_index: Vec2(level_x, level_y).to_usize("tile level index")?,
        })
    }
}


/// The largest prefix of a chunk: part number, four tile coordinates and the byte count.
const MAX_PREFIX_SIZE: usize = 6 * i32::BYTE_SIZE;

/// Find the offset of a chunk in the offset table of its part.
/// Zero offsets and offsets past the end of the source mark chunks that were never written.
pub fn chunk_offset(source: &dyn ByteSource, offset_table: &[u64], info: &ChunkInfo) -> Result<u64> {
    let offset = offset_table.get(info.index).copied()
        .ok_or_else(|| Error::invalid("missing chunk (chunk index out of offset table)"))?;

    let outside_of_file = source.size().map_or(false, |size| offset >= size);
    if offset == 0 || outside_of_file {
        return Err(Error::invalid(format!("missing chunk (offset {})", offset)));
    }

    Ok(offset)
}

/// Read and decompress the chunk described by `info`.
/// Returns the little endian samples of the chunk, ordered by line, then by channel, then by pixel.
pub fn read_chunk(
    source: &dyn ByteSource, offset_table: &[u64], layout: &ChunkLayout,
    multipart: Option<usize>, info: &ChunkInfo
) -> Result<Vec<u8>>
{
    let offset = chunk_offset(source, offset_table, info)?;

    let prefix_size = {
        let part_number = if multipart.is_some() { 1 } else { 0 };
        let coordinates = match info.kind { ChunkKind::ScanLines { .. } => 1, ChunkKind::Tile(_) => 4 };
        (part_number + coordinates + 1) * i32::BYTE_SIZE
    };

    let mut prefix = [0_u8; MAX_PREFIX_SIZE];
    let prefix = &mut prefix[.. prefix_size];
    source.read_exact_at(prefix, offset)?;

    let mut read: &[u8] = prefix;

    if let Some(expected_part) = multipart {
        let part = i32_to_usize(i32::read(&mut read)?, "chunk part number")?;
        if part != expected_part {
            return Err(Error::invalid("chunk part number"));
        }
    }

    match info.kind {
        ChunkKind::ScanLines { y } => {
            if i32::read(&mut read)? != y {
                return Err(Error::invalid("scan line block y coordinate"));
            }
        },

        ChunkKind::Tile(expected) => {
            if TileCoordinates::read(&mut read)? != expected {
                return Err(Error::invalid("tile coordinates"));
            }
        },
    }

    let expected_byte_size = layout.uncompressed_byte_size(info.pixels);
    let compressed_size = i32_to_usize(i32::read(&mut read)?, "chunk data size")?;

    // compressors store the raw data when compression would not make it smaller
    if compressed_size > expected_byte_size {
        return Err(Error::invalid("chunk data size"));
    }

    let data_offset = offset + prefix_size as u64;
    if let Some(size) = source.size() {
        if data_offset + compressed_size as u64 > size {
            return Err(Error::invalid("chunk data exceeds file size"));
        }
    }

    let mut compressed = vec![0_u8; compressed_size];
    source.read_exact_at(&mut compressed, data_offset)?;

    layout.compression.decompress(&layout.channels, compressed, info.pixels.size, expected_byte_size)
}
