
//! Decode a single chunk and scatter its samples into a caller buffer.
//! The decompressed chunk stores each line as one run of samples per channel,
//! while the caller wants interleaved pixels with arbitrary strides.

use std::ops::Range;
use smallvec::SmallVec;
use crate::block::ChunkInfo;
use crate::block::chunk::read_chunk;
use crate::input::part::PartInfo;
use crate::io::ByteSource;
use crate::error::*;


/// Where the samples of one file channel go in the destination pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ChannelBinding {

    /// The byte offset of this channel inside one decompressed pixel of the file.
    file_offset: usize,

    /// The size of a single sample in bytes.
    sample_size: usize,

    /// The byte offset of this channel inside one destination pixel.
    destination_offset: usize,
}

/// A reusable decoding context for the chunks of one part.
/// Initialized with the first chunk, then updated for each following chunk,
/// so that channel bindings are computed only once per read.
#[derive(Debug, Clone)]
pub struct DecodePipeline<'p> {
    part: &'p PartInfo,
    chunk: ChunkInfo,
    bindings: SmallVec<[ChannelBinding; 5]>,
    pixel_stride: usize,
    line_stride: usize,
}

impl<'p> DecodePipeline<'p> {

    /// Prepare decoding the specified chunk. No channels are bound yet.
    pub fn initialize(part: &'p PartInfo, chunk: ChunkInfo) -> Self {
        DecodePipeline {
            part, chunk,
            bindings: SmallVec::new(),
            pixel_stride: 0, line_stride: 0,
        }
    }

    /// Decode another chunk of the same part with the same channel bindings.
    pub fn update(&mut self, chunk: ChunkInfo) {
        self.chunk = chunk;
    }

    /// The chunk that will be decoded next.
    pub fn chunk(&self) -> &ChunkInfo {
        &self.chunk
    }

    /// Bind the presented channels in the range to consecutive bytes of each destination pixel.
    /// Channels are matched by their exact name. Only matched channels occupy space in the destination pixel.
    pub fn bind_channels(&mut self, channels: Range<usize>, pixel_stride: usize, line_stride: usize) {
        let file_channels = &self.part.layout.channels;
        let mut destination_offset = 0;

        self.bindings.clear();
        self.pixel_stride = pixel_stride;
        self.line_stride = line_stride;

        for name in &self.part.channel_names[channels] {
            let matching = file_channels.channels_with_byte_offset()
                .find(|(_, channel)| &channel.name == name);

            if let Some((file_offset, channel)) = matching {
                let sample_size = channel.sample_type.bytes_per_sample();
                self.bindings.push(ChannelBinding { file_offset, sample_size, destination_offset });
                destination_offset += sample_size;
            }
        }
    }

    /// The number of bytes the destination must have to receive the current chunk.
    pub fn required_bytes(&self) -> usize {
        let size = self.chunk.pixels.size;
        if size.area() == 0 || self.bindings.is_empty() {
            return 0;
        }

        let pixel_bytes: usize = self.bindings.iter().map(|binding| binding.sample_size).sum();
        (size.height() - 1) * self.line_stride + (size.width() - 1) * self.pixel_stride + pixel_bytes
    }

    /// Read and decompress the chunk, then write its bound channels to the destination.
    /// The first pixel of the chunk goes to the start of the destination.
    /// Samples are converted from little endian to native byte order.
    pub fn run(
        &self, source: &dyn ByteSource, offset_table: &[u64],
        multipart: Option<usize>, destination: &mut [u8]
    ) -> UnitResult
    {
        let required = self.required_bytes();
        if destination.len() < required {
            return Err(Error::usage(format!(
                "destination buffer has {} bytes, but {} are required", destination.len(), required
            )));
        }

        let layout = &self.part.layout;
        let data = read_chunk(source, offset_table, layout, multipart, &self.chunk)?;

        let width = self.chunk.pixels.size.width();
        let file_line_bytes = width * layout.channels.bytes_per_pixel;
        if file_line_bytes == 0 {
            return Ok(());
        }

        for (line_index, line) in data.chunks_exact(file_line_bytes).enumerate() {
            let line_start = line_index * self.line_stride;

            for binding in &self.bindings {
                let samples_start = binding.file_offset * width;
                let samples = &line[samples_start .. samples_start + binding.sample_size * width];

                let mut target = line_start + binding.destination_offset;
                for sample in samples.chunks_exact(binding.sample_size) {
                    write_native(sample, &mut destination[target .. target + binding.sample_size]);
                    target += self.pixel_stride;
                }
            }
        }

        Ok(())
    }
}

/// Copy a single little endian sample, converting it to native byte order.
fn write_native(little_endian: &[u8], target: &mut [u8]) {
    target.copy_from_slice(little_endian);

    if cfg!(target_endian = "big") {
        target.reverse();
    }
}
