
//! Decode rectangular regions of one part into caller buffers,
//! chunk by chunk, substituting the missing color for chunks that cannot be decoded.

use std::ops::Range;
use crate::block::chunk::TileCoordinates;
use crate::input::fill::{fill_missing, FillTarget};
use crate::input::part::PartInfo;
use crate::input::pipeline::DecodePipeline;
use crate::io::ByteSource;
use crate::meta::attribute::{IntegerBounds, LevelMode};
use crate::error::*;
use crate::math::*;


/// Everything needed to decode the pixels of one part.
/// Does not depend on any cursor state, so it can be used from many threads at once.
#[derive(Clone, Copy)]
pub struct PartReader<'f> {

    /// Where the chunks are read from.
    pub source: &'f dyn ByteSource,

    /// The parsed header of the part.
    pub part: &'f PartInfo,

    /// Index of the part in the file.
    pub part_index: usize,

    /// The chunk offsets of the part.
    pub offset_table: &'f [u64],

    /// Whether chunks are prefixed with the part number.
    pub multipart: bool,

    /// The color substituted for chunks that cannot be decoded. Empty if disabled.
    pub missing_color: &'f [f32],
}

impl std::fmt::Debug for PartReader<'_> {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.debug_struct("PartReader")
            .field("file", &self.source.file_name())
            .field("part_index", &self.part_index)
            .field("multipart", &self.multipart)
            .finish()
    }
}


impl<'f> PartReader<'f> {

    fn file_name(&self) -> &str {
        self.source.file_name()
    }

    fn part_number(&self) -> Option<usize> {
        if self.multipart { Some(self.part_index) } else { None }
    }

    fn validate_channels(&self, channels: &Range<usize>) -> UnitResult {
        let count = self.part.spec.channel_count();

        if channels.start >= channels.end || channels.end > count {
            return Err(Error::usage(format!(
                "channel range {}..{} is not inside the {} channels of the part",
                channels.start, channels.end, count
            )));
        }

        Ok(())
    }

    /// Substitute the missing color for a chunk that failed to decode.
    /// Returns the original error if no missing color is configured.
    fn fill_or_fail(
        &self, error: Error, channels: Range<usize>, target: FillTarget, destination: &mut [u8]
    ) -> UnitResult
    {
        if fill_missing(self.missing_color, &self.part.spec, channels, target, destination) {
            tracing::warn!(
                file = self.file_name(), part = self.part_index,
                x = target.pixels.position.x(), y = target.pixels.position.y(),
                width = target.pixels.size.width(), height = target.pixels.size.height(),
                %error, "substituted missing color for undecodable chunk"
            );

            Ok(())
        }
        else {
            let position = target.pixels.position;
            Err(error.with_context(format_args!("chunk at pixel {}, {}", position.x(), position.y())))
        }
    }

    /// Decode the scan lines `lines` of the requested channels.
    /// The destination contains one line after another, each line containing
    /// interleaved pixels of only the requested channels.
    pub fn read_scan_lines(&self, lines: Range<i32>, channels: Range<usize>, destination: &mut [u8]) -> UnitResult {
        let spec = &self.part.spec;
        let layout = &self.part.layout;

        if layout.tiles.is_some() {
            return Err(Error::usage("cannot read scan lines from a tiled part"));
        }

        self.validate_channels(&channels)?;

        let window_end = self.part.data_window.end().y();
        if lines.start >= lines.end || lines.start < spec.y || lines.end > window_end {
            return Err(Error::usage(format!(
                "scan lines {}..{} are not inside the data window lines {}..{}",
                lines.start, lines.end, spec.y, window_end
            )));
        }

        let pixel_bytes = spec.pixel_bytes(channels.clone());
        let line_bytes = spec.width * pixel_bytes;
        let line_count = (lines.end - lines.start) as usize;

        if destination.len() < line_count * line_bytes {
            return Err(Error::usage(format!(
                "destination buffer has {} bytes, but {} scan lines require {}",
                destination.len(), line_count, line_count * line_bytes
            )));
        }

        let mut pipeline: Option<DecodePipeline<'_>> = None;
        let mut scratch = Vec::new();
        let mut y = lines.start;

        while y < lines.end {
            let chunk = layout.scan_line_chunk(y)?;
            let chunk_start = chunk.pixels.position.y();
            let chunk_end = chunk.pixels.end().y();
            let copy_end = chunk_end.min(lines.end);

            let rows = (copy_end - y) as usize;
            let first_byte = (y - lines.start) as usize * line_bytes;
            let target = &mut destination[first_byte .. first_byte + rows * line_bytes];

            let pipeline = pipeline.get_or_insert_with(|| {
                let mut first = DecodePipeline::initialize(self.part, chunk);
                first.bind_channels(channels.clone(), pixel_bytes, line_bytes);
                first
            });

            pipeline.update(chunk);

            let result = if chunk_start == y && chunk_end == copy_end {
                pipeline.run(self.source, self.offset_table, self.part_number(), target)
            }
            else {
                // only some lines of this chunk are requested
                scratch.resize(chunk.pixels.size.height() * line_bytes, 0);

                pipeline.run(self.source, self.offset_table, self.part_number(), &mut scratch).map(|()| {
                    let skipped = (y - chunk_start) as usize * line_bytes;
                    target.copy_from_slice(&scratch[skipped .. skipped + target.len()]);
                })
            };

            if let Err(error) = result {
                let pixels = IntegerBounds::new(Vec2(spec.x, y), Vec2(spec.width, rows));
                let fill = FillTarget { pixels, pixel_stride: pixel_bytes, line_stride: line_bytes };
                self.fill_or_fail(error, channels.clone(), fill, target)?;
            }

            y = copy_end;
        }

        Ok(())
    }

    /// Decode all tiles that intersect the region of the specified mip level.
    ///
    /// The region must start on a tile boundary and is clipped to the level.
    /// The destination is laid out as whole tiles: it has room for the lines of all
    /// tile rows, each line has room for the width of all tiles in x direction,
    /// and the tile at grid position `(tx, ty)`
    /// starts at line `ty * tile_height` and pixel `tx * tile_width`.
    ///
    /// Each tile that fails to decode is replaced by the missing color independently,
    /// and decoding continues with the next tile. The first error is returned
    /// if any tile could neither be decoded nor filled.
    pub fn read_tiles(
        &self, level: usize, xs: Range<i32>, ys: Range<i32>,
        channels: Range<usize>, destination: &mut [u8]
    ) -> UnitResult
    {
        let spec = &self.part.spec;
        let layout = &self.part.layout;

        let tiles = layout.tiles.ok_or_else(|| Error::usage("cannot read tiles from a scan line part"))?;
        self.validate_channels(&channels)?;

        let tile_size = tiles.tile_size;
        let pixel_bytes = spec.pixel_bytes(channels.clone());
        let origin = self.part.data_window.position;

        let level_size = match self.part.mip_level_size(level) {
            Ok(size) => size,

            Err(error) => {
                let tiles_x = ((xs.end - xs.start).max(0) as usize).div_ceil(tile_size.width());
                let rows = (ys.end - ys.start).max(0) as usize;
                let width = (xs.end - xs.start).max(0) as usize;

                let fill = FillTarget {
                    pixels: IntegerBounds::new(Vec2(xs.start, ys.start), Vec2(width, rows)),
                    pixel_stride: pixel_bytes,
                    line_stride: tiles_x * tile_size.width() * pixel_bytes,
                };

                return self.fill_or_fail(error, channels, fill, destination);
            }
        };

        let level_end = origin + level_size.to_i32("level size")?;
        let xs = xs.start .. xs.end.min(level_end.x());
        let ys = ys.start .. ys.end.min(level_end.y());

        let valid_start = |start: i32, origin: i32, tile: usize| {
            start >= origin && (start - origin) as usize % tile == 0
        };

        if xs.start >= xs.end || ys.start >= ys.end
            || !valid_start(xs.start, origin.x(), tile_size.width())
            || !valid_start(ys.start, origin.y(), tile_size.height())
        {
            return Err(Error::usage(format!(
                "tile region x {}..{}, y {}..{} does not start at a tile of level {}",
                xs.start, xs.end, ys.start, ys.end, level
            )));
        }

        let region_size = Vec2((xs.end - xs.start) as usize, (ys.end - ys.start) as usize);
        let tile_counts = Vec2(
            region_size.width().div_ceil(tile_size.width()),
            region_size.height().div_ceil(tile_size.height()),
        );

        let first_tile = Vec2(
            (xs.start - origin.x()) as usize / tile_size.width(),
            (ys.start - origin.y()) as usize / tile_size.height(),
        );

        let line_bytes = tile_counts.width() * tile_size.width() * pixel_bytes;
        let required_bytes = tile_counts.height() * tile_size.height() * line_bytes;

        if destination.len() < required_bytes {
            return Err(Error::usage(format!(
                "destination buffer has {} bytes, but the tiles require {}",
                destination.len(), required_bytes
            )));
        }

        let level_index = match self.part.level_mode {
            LevelMode::Singular => Vec2(0, 0),
            LevelMode::MipMap | LevelMode::RipMap => Vec2(level, level),
        };

        let mut pipeline: Option<DecodePipeline<'_>> = None;
        let mut first_error = None;

        for tile_y in 0 .. tile_counts.height() {
            for tile_x in 0 .. tile_counts.width() {
                let tile_index = first_tile + Vec2(tile_x, tile_y);
                let tile_start = tile_y * tile_size.height() * line_bytes + tile_x * tile_size.width() * pixel_bytes;
                let target = &mut destination[tile_start ..];

                let result = match layout.tile_chunk(TileCoordinates { tile_index, level_index }) {
                    Err(error) => Err(error),
                    Ok(chunk) => {
                        let pipeline = pipeline.get_or_insert_with(|| {
                            let mut first = DecodePipeline::initialize(self.part, chunk);
                            first.bind_channels(channels.clone(), pixel_bytes, line_bytes);
                            first
                        });

                        pipeline.update(chunk);
                        pipeline.run(self.source, self.offset_table, self.part_number(), target)
                    }
                };

                if let Err(error) = result {
                    let position = Vec2(
                        xs.start + usize_to_i32(tile_x * tile_size.width(), "tile position")?,
                        ys.start + usize_to_i32(tile_y * tile_size.height(), "tile position")?,
                    );

                    let size = Vec2(
                        tile_size.width().min((xs.end - position.x()) as usize),
                        tile_size.height().min((ys.end - position.y()) as usize),
                    );

                    let fill = FillTarget {
                        pixels: IntegerBounds::new(position, size),
                        pixel_stride: pixel_bytes, line_stride: line_bytes,
                    };

                    if let Err(error) = self.fill_or_fail(error, channels.clone(), fill, target) {
                        first_error.get_or_insert(error);
                    }
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(error) => Err(error),
        }
    }

    /// Decode all channels of the single tile whose top left pixel is at `(x, y)`.
    /// The destination has a line stride of one tile width.
    pub fn read_tile(&self, level: usize, x: i32, y: i32, destination: &mut [u8]) -> UnitResult {
        let tiles = self.part.layout.tiles.ok_or_else(|| Error::usage("cannot read tiles from a scan line part"))?;
        let size = tiles.tile_size.to_i32("tile size")?;

        self.read_tiles(
            level, x .. x.saturating_add(size.width()), y .. y.saturating_add(size.height()),
            0 .. self.part.spec.channel_count(), destination
        )
    }
}
