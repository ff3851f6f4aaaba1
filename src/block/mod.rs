
//! Locate the chunks of a part.
//! Computes which chunk in the offset table contains a given scan line or tile,
//! and which pixels that chunk covers.

pub mod chunk;

use crate::meta::attribute::{BlockType, ChannelList, IntegerBounds, LevelMode, TileDescription};
use crate::meta::header::Header;
use crate::meta::{block_size, block_count, level_count, level_size, mip_levels, rip_levels};
use crate::compression::Compression;
use crate::error::*;
use crate::math::*;
use self::chunk::TileCoordinates;


/// The structure of a part that determines how its pixels are split into chunks.
/// Computed once from the header of a part.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkLayout {

    /// Scan lines or tiles, flat or deep.
    pub block_type: BlockType,

    /// The pixel rectangle of the full resolution level.
    pub data_window: IntegerBounds,

    /// How each chunk is compressed.
    pub compression: Compression,

    /// The tiling, if this part is tiled.
    pub tiles: Option<TileDescription>,

    /// The channels in file order.
    pub channels: ChannelList,

    /// The number of resolution levels in x and y direction.
    pub level_count: Vec2<usize>,
}

/// Whether a chunk contains scan lines or a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {

    /// A block of scan lines.
    ScanLines {

        /// The absolute coordinate of the first line of the block.
        y: i32
    },

    /// A tile in one of the resolution levels.
    Tile(TileCoordinates),
}

/// The location and contents of a single chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkInfo {

    /// The index of this chunk in the offset table of its part.
    pub index: usize,

    /// Scan lines or tile, and the coordinates stored in the chunk prefix.
    pub kind: ChunkKind,

    /// The absolute pixel rectangle covered by this chunk.
    /// For tiles of smaller levels, this is relative to the level, starting at the data window origin.
    pub pixels: IntegerBounds,
}


impl ChunkLayout {

    /// Query the structural attributes of a header.
    pub fn from_header(header: &Header) -> Result<Self> {
        let block_type = header.block_type()?;
        let data_window = header.data_window()?;
        let tiles = header.tiles()?;

        Ok(ChunkLayout {
            block_type, data_window, tiles,
            level_count: level_counts(tiles, data_window.size),
            compression: header.compression()?,
            channels: header.channels()?.clone(),
        })
    }

    /// The number of scan lines in each chunk, or the tile height for tiled parts.
    pub fn scan_lines_per_chunk(&self) -> usize {
        match self.tiles {
            Some(tiles) => tiles.tile_size.height(),
            None => self.compression.scan_lines_per_block(),
        }
    }

    /// Whether the specified level index exists in this part.
    fn validate_level(&self, level: Vec2<usize>) -> UnitResult {
        let mode = self.tiles.map_or(LevelMode::Singular, |tiles| tiles.level_mode);
        let in_range = level.x() < self.level_count.x() && level.y() < self.level_count.y();
        let is_diagonal = level.x() == level.y();

        let valid = match mode {
            LevelMode::Singular | LevelMode::MipMap => in_range && is_diagonal,
            LevelMode::RipMap => in_range,
        };

        if valid { Ok(()) } else { Err(Error::invalid("level index")) }
    }

    /// The resolution of the specified level.
    pub fn level_size(&self, level: Vec2<usize>) -> Result<Vec2<usize>> {
        self.validate_level(level)?;

        let round = self.tiles.map_or(RoundingMode::Down, |tiles| tiles.rounding_mode);
        let size = self.data_window.size;

        Ok(Vec2(
            level_size(round, size.width(), level.x())?,
            level_size(round, size.height(), level.y())?,
        ))
    }

    /// The number of tiles in x and y direction in the specified level.
    pub fn tile_count(&self, level: Vec2<usize>) -> Result<Vec2<usize>> {
        let tiles = self.tiles.ok_or_else(|| Error::invalid("tile in scan line part"))?;
        let level_size = self.level_size(level)?;

        Ok(Vec2(
            block_count(level_size.width(), tiles.tile_size.width()),
            block_count(level_size.height(), tiles.tile_size.height()),
        ))
    }

    /// The number of bytes that the specified pixels occupy when decompressed.
    pub fn uncompressed_byte_size(&self, pixels: IntegerBounds) -> usize {
        pixels.size.area() * self.channels.bytes_per_pixel
    }

    /// Find the chunk that contains the scan line with the absolute coordinate `y`.
    pub fn scan_line_chunk(&self, y: i32) -> Result<ChunkInfo> {
        if self.tiles.is_some() {
            return Err(Error::invalid("scan line in tiled part"));
        }

        let window = self.data_window;
        if y < window.position.y() || y >= window.end().y() {
            return Err(Error::invalid("scan line outside of data window"));
        }

        let lines_per_chunk = self.scan_lines_per_chunk();
        let index = (y - window.position.y()) as usize / lines_per_chunk;
        let first_line = index * lines_per_chunk;
        let line_count = block_size(window.size.height(), lines_per_chunk, first_line)?;
        let chunk_y = window.position.y() + usize_to_i32(first_line, "scan line")?;

        Ok(ChunkInfo {
            index,
            kind: ChunkKind::ScanLines { y: chunk_y },
            pixels: IntegerBounds::new(
                Vec2(window.position.x(), chunk_y),
                Vec2(window.size.width(), line_count)
            ),
        })
    }

    /// Find the chunk of the specified tile.
    pub fn tile_chunk(&self, coordinates: TileCoordinates) -> Result<ChunkInfo> {
        let tiles = self.tiles.ok_or_else(|| Error::invalid("tile in scan line part"))?;
        let TileCoordinates { tile_index, level_index } = coordinates;

        let tile_count = self.tile_count(level_index)?;
        if tile_index.x() >= tile_count.x() || tile_index.y() >= tile_count.y() {
            return Err(Error::invalid("tile index"));
        }

        // all tiles of the preceding levels come first in the offset table
        let round = tiles.rounding_mode;
        let preceding_levels: Vec<Vec2<usize>> = match tiles.level_mode {
            LevelMode::Singular => Vec::new(),
            LevelMode::MipMap => mip_levels(round, self.data_window.size).take_while(|&level| level != level_index).collect(),
            LevelMode::RipMap => rip_levels(round, self.data_window.size).take_while(|&level| level != level_index).collect(),
        };

        let mut index = 0;
        for level in preceding_levels {
            index += self.tile_count(level)?.area();
        }

        index += tile_index.y() * tile_count.x() + tile_index.x();

        let level_size = self.level_size(level_index)?;
        let position = tile_index * tiles.tile_size;
        let size = Vec2(
            block_size(level_size.width(), tiles.tile_size.width(), position.x())?,
            block_size(level_size.height(), tiles.tile_size.height(), position.y())?,
        );

        let position = self.data_window.position + position.to_i32("tile position")?;

        Ok(ChunkInfo {
            index,
            kind: ChunkKind::Tile(coordinates),
            pixels: IntegerBounds::new(position, size),
        })
    }
}

/// The number of levels in x and y direction.
fn level_counts(tiles: Option<TileDescription>, size: Vec2<usize>) -> Vec2<usize> {
    match tiles {
        Some(TileDescription { level_mode: LevelMode::MipMap, rounding_mode, .. }) => {
            let count = level_count(rounding_mode, size.width().max(size.height()));
            Vec2(count, count)
        },

        Some(TileDescription { level_mode: LevelMode::RipMap, rounding_mode, .. }) => Vec2(
            level_count(rounding_mode, size.width()),
            level_count(rounding_mode, size.height())
        ),

        _ => Vec2(1, 1),
    }
}
