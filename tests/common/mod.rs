//! Builds small OpenEXR files in memory, with predictable sample values.

#![allow(dead_code)]

use exr_input::prelude::f16;

pub const UINT: i32 = 0;
pub const HALF: i32 = 1;
pub const FLOAT: i32 = 2;

pub const NO_COMPRESSION: u8 = 0;
pub const RLE: u8 = 1;
pub const ZIPS: u8 = 2;
pub const ZIP: u8 = 3;
pub const PIZ: u8 = 4;
pub const PXR24: u8 = 5;

/// The value of every sample in a generated file.
/// Small multiples of one half, so that half floats and integers represent them exactly.
pub fn sample(channel: &str, x: i32, y: i32, level: usize) -> f32 {
    let channel = channel.bytes().map(i32::from).sum::<i32>();
    (x * 3 + y * 7 + channel * 13 + level as i32 * 29).rem_euclid(251) as f32 * 0.5
}


#[derive(Debug, Clone)]
pub struct Channel {
    pub name: String,
    pub pixel_type: i32,
    pub sampling: (i32, i32),
}

impl Channel {
    pub fn new(name: &str, pixel_type: i32) -> Self {
        Channel { name: name.to_string(), pixel_type, sampling: (1, 1) }
    }

    pub fn byte_size(&self) -> usize {
        if self.pixel_type == HALF { 2 } else { 4 }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Tiles {
    pub size: (usize, usize),
    pub mip_map: bool,
    pub round_up: bool,
}

#[derive(Debug, Clone)]
pub struct Part {
    pub name: Option<String>,
    pub channels: Vec<Channel>,
    pub origin: (i32, i32),
    pub size: (usize, usize),

    /// Origin and size. Equal to the data window if absent.
    pub display: Option<((i32, i32), (usize, usize))>,

    pub compression: u8,
    pub tiles: Option<Tiles>,
    pub deep: bool,

    /// Name, type name and value bytes.
    pub attributes: Vec<(String, String, Vec<u8>)>,

    /// Chunks that are not written, leaving a zero offset in the offset table.
    pub missing_chunks: Vec<usize>,

    /// Chunks whose compressed bytes are replaced by garbage.
    pub broken_chunks: Vec<usize>,
}

impl Part {
    pub fn scan_lines(channels: &[(&str, i32)], origin: (i32, i32), size: (usize, usize)) -> Self {
        Part {
            name: None,
            channels: channels.iter().map(|&(name, pixel_type)| Channel::new(name, pixel_type)).collect(),
            origin, size, display: None,
            compression: NO_COMPRESSION,
            tiles: None, deep: false,
            attributes: Vec::new(),
            missing_chunks: Vec::new(),
            broken_chunks: Vec::new(),
        }
    }

    pub fn tiled(channels: &[(&str, i32)], origin: (i32, i32), size: (usize, usize), tiles: Tiles) -> Self {
        Part { tiles: Some(tiles), ..Part::scan_lines(channels, origin, size) }
    }

    pub fn lines_per_chunk(&self) -> usize {
        match self.compression {
            ZIP | PXR24 => 16,
            PIZ => 32,
            _ => 1,
        }
    }

    /// The size of each resolution level.
    pub fn levels(&self) -> Vec<(usize, usize)> {
        match self.tiles {
            Some(Tiles { mip_map: true, round_up, .. }) => {
                let mut levels = vec![ self.size ];
                let halve = |size: usize| (if round_up { (size + 1) / 2 } else { size / 2 }).max(1);

                while levels.last().map_or(false, |&(width, height)| width > 1 || height > 1) {
                    let (width, height) = levels[levels.len() - 1];
                    levels.push((halve(width), halve(height)));
                }

                levels
            },

            _ => vec![ self.size ],
        }
    }

    fn sorted_channels(&self) -> Vec<Channel> {
        let mut channels = self.channels.clone();
        channels.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
        channels
    }

    /// The chunk prefix coordinates and the raw pixel rectangle of every chunk, in offset table order.
    fn chunks(&self) -> Vec<(Vec<i32>, (i32, i32), (usize, usize), usize)> {
        let mut chunks = Vec::new();

        match self.tiles {
            None => {
                let lines = self.lines_per_chunk();
                for first in (0 .. self.size.1).step_by(lines) {
                    let y = self.origin.1 + first as i32;
                    let height = lines.min(self.size.1 - first);
                    chunks.push((vec![ y ], (self.origin.0, y), (self.size.0, height), 0));
                }
            },

            Some(tiles) => {
                for (level, (width, height)) in self.levels().into_iter().enumerate() {
                    let (tile_width, tile_height) = tiles.size;

                    for tile_y in 0 .. (height + tile_height - 1) / tile_height {
                        for tile_x in 0 .. (width + tile_width - 1) / tile_width {
                            let position = (
                                self.origin.0 + (tile_x * tile_width) as i32,
                                self.origin.1 + (tile_y * tile_height) as i32,
                            );

                            let size = (
                                tile_width.min(width - tile_x * tile_width),
                                tile_height.min(height - tile_y * tile_height),
                            );

                            let coordinates = vec![ tile_x as i32, tile_y as i32, level as i32, level as i32 ];
                            chunks.push((coordinates, position, size, level));
                        }
                    }
                }
            },
        }

        chunks
    }

    /// How many chunks are stored compressed rather than raw.
    pub fn compressed_chunk_count(&self) -> usize {
        self.chunks().into_iter()
            .filter(|&(_, position, size, level)| {
                let raw = self.raw_chunk(position, size, level);
                compress(&self.sorted_channels(), self.compression, size, raw.clone()) != raw
            })
            .count()
    }

    fn chunk_count(&self) -> usize {
        if self.deep {
            self.size.1
        }
        else {
            self.chunks().len()
        }
    }

    /// Little endian samples, ordered by line, then by channel, then by pixel.
    fn raw_chunk(&self, position: (i32, i32), size: (usize, usize), level: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        let channels = self.sorted_channels();

        for y in position.1 .. position.1 + size.1 as i32 {
            for channel in &channels {
                for x in position.0 .. position.0 + size.0 as i32 {
                    let value = sample(&channel.name, x, y, level);

                    match channel.pixel_type {
                        HALF => bytes.extend_from_slice(&f16::from_f32(value).to_le_bytes()),
                        FLOAT => bytes.extend_from_slice(&value.to_le_bytes()),
                        _ => bytes.extend_from_slice(&((value * 2.0) as u32).to_le_bytes()),
                    }
                }
            }
        }

        bytes
    }

    fn header(&self, multipart: bool) -> Vec<u8> {
        let mut header = Vec::new();

        let mut channel_list = Vec::new();
        for channel in self.sorted_channels() {
            channel_list.extend_from_slice(channel.name.as_bytes());
            channel_list.push(0);
            channel_list.extend_from_slice(&channel.pixel_type.to_le_bytes());
            channel_list.extend_from_slice(&[ 0, 0, 0, 0 ]);
            channel_list.extend_from_slice(&channel.sampling.0.to_le_bytes());
            channel_list.extend_from_slice(&channel.sampling.1.to_le_bytes());
        }
        channel_list.push(0);

        let (display_origin, display_size) = self.display.unwrap_or((self.origin, self.size));

        write_attribute(&mut header, "channels", "chlist", &channel_list);
        write_attribute(&mut header, "compression", "compression", &[ self.compression ]);
        write_attribute(&mut header, "dataWindow", "box2i", &box2i(self.origin, self.size));
        write_attribute(&mut header, "displayWindow", "box2i", &box2i(display_origin, display_size));
        write_attribute(&mut header, "lineOrder", "lineOrder", &[ 0 ]);
        write_attribute(&mut header, "pixelAspectRatio", "float", &1.0_f32.to_le_bytes());
        write_attribute(&mut header, "screenWindowCenter", "v2f", &[ 0; 8 ]);
        write_attribute(&mut header, "screenWindowWidth", "float", &1.0_f32.to_le_bytes());

        if let Some(tiles) = self.tiles {
            let mut description = Vec::new();
            description.extend_from_slice(&(tiles.size.0 as u32).to_le_bytes());
            description.extend_from_slice(&(tiles.size.1 as u32).to_le_bytes());
            description.push(u8::from(tiles.mip_map) + 16 * u8::from(tiles.round_up));
            write_attribute(&mut header, "tiles", "tiledesc", &description);
        }

        if let Some(name) = &self.name {
            write_attribute(&mut header, "name", "string", name.as_bytes());
        }

        if multipart || self.deep {
            let kind = match (self.deep, self.tiles.is_some()) {
                (true, true) => "deeptile",
                (true, false) => "deepscanline",
                (false, true) => "tiledimage",
                (false, false) => "scanlineimage",
            };

            write_attribute(&mut header, "type", "string", kind.as_bytes());
            write_attribute(&mut header, "chunkCount", "int", &(self.chunk_count() as i32).to_le_bytes());
        }

        for (name, kind, value) in &self.attributes {
            write_attribute(&mut header, name, kind, value);
        }

        header.push(0);
        header
    }
}

pub fn write_attribute(bytes: &mut Vec<u8>, name: &str, kind: &str, value: &[u8]) {
    bytes.extend_from_slice(name.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(kind.as_bytes());
    bytes.push(0);
    bytes.extend_from_slice(&(value.len() as i32).to_le_bytes());
    bytes.extend_from_slice(value);
}

pub fn box2i(origin: (i32, i32), size: (usize, usize)) -> Vec<u8> {
    [ origin.0, origin.1, origin.0 + size.0 as i32 - 1, origin.1 + size.1 as i32 - 1 ]
        .iter().flat_map(|value| value.to_le_bytes()).collect()
}

/// Undo the interleaving and the byte deltas that the decoder applies after decompression.
fn predict(raw: &[u8]) -> Vec<u8> {
    let mut separated: Vec<u8> = raw.iter().step_by(2).copied().collect();
    separated.extend(raw.iter().skip(1).step_by(2).copied());

    let mut deltas = separated.clone();
    for index in 1 .. separated.len() {
        deltas[index] = separated[index].wrapping_sub(separated[index - 1]).wrapping_add(128);
    }

    deltas
}

fn run_length_encode(bytes: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::new();
    let mut start = 0;

    let run_length = |start: usize| bytes[start ..].iter().take(128).take_while(|&&byte| byte == bytes[start]).count();

    while start < bytes.len() {
        let run = run_length(start);

        if run >= 3 {
            encoded.push((run - 1) as u8);
            encoded.push(bytes[start]);
            start += run;
        }
        else {
            let mut end = start;
            while end < bytes.len() && end - start < 127 && run_length(end) < 3 {
                end += 1;
            }

            encoded.push((-((end - start) as i32)) as i8 as u8);
            encoded.extend_from_slice(&bytes[start .. end]);
            start = end;
        }
    }

    encoded
}

/// The samples of each channel, as 16-bit values, one channel after another.
fn split_channels(channels: &[Channel], size: (usize, usize), raw: &[u8]) -> Vec<u16> {
    let mut planes = vec![ Vec::new(); channels.len() ];
    let mut values = raw.chunks_exact(2).map(|bytes| u16::from_le_bytes([ bytes[0], bytes[1] ]));

    for _ in 0 .. size.1 {
        for (plane, channel) in planes.iter_mut().zip(channels) {
            plane.extend(values.by_ref().take(size.0 * channel.byte_size() / 2));
        }
    }

    planes.concat()
}

fn wavelet_pair(a: u16, b: u16) -> (u16, u16) {
    let (a, b) = (a as i16 as i32, b as i16 as i32);
    (((a + b) >> 1) as i16 as u16, (a - b) as i16 as u16)
}

/// Forward transform of one plane, for values below 2^14.
fn wavelet_encode(values: &mut [u16], start: usize, count: (usize, usize), step: (usize, usize)) {
    let smaller = count.0.min(count.1);
    let (mut level, mut block) = (1, 2);

    while block <= smaller {
        let (near_x, near_y) = (step.0 * level, step.1 * level);
        let (far_x, far_y) = (step.0 * block, step.1 * block);

        let mut row = start;
        while row <= start + step.1 * (count.1 - block) {
            let mut px = row;

            while px <= row + step.0 * (count.0 - block) {
                let (p01, p10) = (px + near_x, px + near_y);
                let p11 = p10 + near_x;

                let (i00, i01) = wavelet_pair(values[px], values[p01]);
                let (i10, i11) = wavelet_pair(values[p10], values[p11]);
                (values[px], values[p10]) = wavelet_pair(i00, i10);
                (values[p01], values[p11]) = wavelet_pair(i01, i11);

                px += far_x;
            }

            if count.0 & level != 0 {
                let p10 = px + near_y;
                (values[px], values[p10]) = wavelet_pair(values[px], values[p10]);
            }

            row += far_y;
        }

        if count.1 & level != 0 {
            let mut px = row;

            while px <= row + step.0 * (count.0 - block) {
                let p01 = px + near_x;
                (values[px], values[p01]) = wavelet_pair(values[px], values[p01]);
                px += far_x;
            }
        }

        level = block;
        block *= 2;
    }
}

#[derive(Default)]
struct BitWriter {
    bytes: Vec<u8>,
    bits: u8,
    bit_count: u32,
    total: usize,
}

impl BitWriter {
    fn write(&mut self, value: u64, count: u32) {
        for bit in (0 .. count).rev() {
            self.bits = (self.bits << 1) | ((value >> bit) & 1) as u8;
            self.bit_count += 1;
            self.total += 1;

            if self.bit_count == 8 {
                self.bytes.push(self.bits);
                self.bits = 0;
                self.bit_count = 0;
            }
        }
    }

    fn finish(mut self) -> (Vec<u8>, usize) {
        if self.bit_count > 0 {
            self.bytes.push(self.bits << (8 - self.bit_count));
        }

        (self.bytes, self.total)
    }
}

/// Huffman code lengths from a tree built over the frequencies.
fn code_lengths(frequencies: &[u64]) -> Vec<u64> {
    use std::cmp::Reverse;
    use std::collections::BinaryHeap;

    let mut parents = Vec::new();
    let mut leaves = vec![ None; frequencies.len() ];
    let mut heap = BinaryHeap::new();

    for (symbol, &frequency) in frequencies.iter().enumerate() {
        if frequency > 0 {
            leaves[symbol] = Some(parents.len());
            heap.push(Reverse((frequency, parents.len())));
            parents.push(None);
        }
    }

    while heap.len() > 1 {
        let Reverse((first_frequency, first)) = heap.pop().unwrap();
        let Reverse((second_frequency, second)) = heap.pop().unwrap();

        let node = parents.len();
        parents.push(None);
        parents[first] = Some(node);
        parents[second] = Some(node);
        heap.push(Reverse((first_frequency + second_frequency, node)));
    }

    leaves.iter().map(|leaf| match *leaf {
        None => 0,
        Some(mut node) => {
            let mut depth = 0;
            while let Some(parent) = parents[node] {
                node = parent;
                depth += 1;
            }
            depth
        }
    }).collect()
}

/// Codes in the canonical order that the decoder reconstructs from the lengths.
fn canonical_codes(lengths: &[u64]) -> Vec<u64> {
    let mut next = [0_u64; 59];
    for &length in lengths { next[length as usize] += 1; }

    let mut code = 0;
    for length in (1 ..= 58).rev() {
        let following = (code + next[length]) >> 1;
        next[length] = code;
        code = following;
    }

    lengths.iter().map(|&length| {
        if length == 0 { return 0; }
        let code = next[length as usize];
        next[length as usize] += 1;
        code
    }).collect()
}

fn huffman_encode(values: &[u16]) -> Vec<u8> {
    // runs of equal values become the value, then the run symbol with a repeat count
    let mut symbols = Vec::new();
    let mut index = 0;

    while index < values.len() {
        let run = values[index ..].iter().take(256).take_while(|&&value| value == values[index]).count();
        symbols.push((u32::from(values[index]), None));

        if run > 2 {
            symbols.push((u32::MAX, Some((run - 1) as u64)));
            index += run;
        }
        else {
            index += 1;
        }
    }

    let min_symbol = *values.iter().min().unwrap() as usize;
    let run_symbol = *values.iter().max().unwrap() as usize + 1;

    let mut frequencies = vec![ 0_u64; run_symbol + 1 ];
    frequencies[run_symbol] = 1;

    for symbol in &mut symbols {
        if symbol.0 == u32::MAX { symbol.0 = run_symbol as u32; }
        frequencies[symbol.0 as usize] += 1;
    }

    let lengths = code_lengths(&frequencies);
    let codes = canonical_codes(&lengths);

    let mut table = BitWriter::default();
    let mut symbol = min_symbol;

    while symbol <= run_symbol {
        let zeros = lengths[symbol ..= run_symbol].iter().take(261).take_while(|&&length| length == 0).count();

        if zeros >= 6 {
            table.write(63, 6);
            table.write(zeros as u64 - 6, 8);
            symbol += zeros;
        }
        else if zeros >= 2 {
            table.write(59 + zeros as u64 - 2, 6);
            symbol += zeros;
        }
        else {
            table.write(lengths[symbol], 6);
            symbol += 1;
        }
    }

    let mut data = BitWriter::default();
    for (symbol, repeat) in symbols {
        data.write(codes[symbol as usize], lengths[symbol as usize] as u32);
        if let Some(repeat) = repeat { data.write(repeat, 8); }
    }

    let (table, _) = table.finish();
    let (data, bit_count) = data.finish();

    let mut bytes = Vec::new();
    for word in [ min_symbol, run_symbol, table.len(), bit_count, 0 ] {
        bytes.extend_from_slice(&(word as u32).to_le_bytes());
    }

    bytes.extend_from_slice(&table);
    bytes.extend_from_slice(&data);
    bytes
}

fn piz_compress(channels: &[Channel], size: (usize, usize), raw: &[u8]) -> Vec<u8> {
    let mut values = split_channels(channels, size, raw);

    let mut bitmap = vec![ 0_u8; 8192 ];
    for &value in &values { bitmap[value as usize >> 3] |= 1 << (value & 7); }
    bitmap[0] &= !1;

    let mut dense = vec![ 0_u16; 1 << 16 ];
    let mut count = 0_usize;
    for value in 0 .. 1 << 16 {
        if value == 0 || bitmap[value >> 3] & (1 << (value & 7)) != 0 {
            dense[value] = count as u16;
            count += 1;
        }
    }

    assert!(count <= 1 << 14, "test samples should use the 14 bit wavelet");
    for value in &mut values { *value = dense[*value as usize]; }

    let mut start = 0;
    for channel in channels {
        let per_sample = channel.byte_size() / 2;
        for offset in 0 .. per_sample {
            wavelet_encode(&mut values, start + offset, size, (per_sample, size.0 * per_sample));
        }

        start += size.0 * size.1 * per_sample;
    }

    let mut bytes = Vec::new();
    match (bitmap.iter().position(|&byte| byte != 0), bitmap.iter().rposition(|&byte| byte != 0)) {
        (Some(min), Some(max)) => {
            bytes.extend_from_slice(&(min as u16).to_le_bytes());
            bytes.extend_from_slice(&(max as u16).to_le_bytes());
            bytes.extend_from_slice(&bitmap[min ..= max]);
        },

        _ => {
            bytes.extend_from_slice(&8191_u16.to_le_bytes());
            bytes.extend_from_slice(&0_u16.to_le_bytes());
        },
    }

    let huffman = huffman_encode(&values);
    bytes.extend_from_slice(&(huffman.len() as i32).to_le_bytes());
    bytes.extend_from_slice(&huffman);
    bytes
}

/// Differences per line, split into byte planes, most significant plane first.
/// Floats keep their upper 24 bits, which is exact for the test samples.
fn pxr24_compress(channels: &[Channel], size: (usize, usize), raw: &[u8]) -> Vec<u8> {
    let mut planes = Vec::new();
    let mut samples = raw;

    for _ in 0 .. size.1 {
        for channel in channels {
            let stored = match channel.pixel_type { HALF => 2, FLOAT => 3, _ => 4 };
            let mut line = vec![ 0_u8; stored * size.0 ];
            let mut previous = 0_u32;

            for x in 0 .. size.0 {
                let (sample, rest) = samples.split_at(channel.byte_size());
                samples = rest;

                let value = match channel.pixel_type {
                    HALF => u32::from(u16::from_le_bytes([ sample[0], sample[1] ])),
                    FLOAT => u32::from_le_bytes([ sample[0], sample[1], sample[2], sample[3] ]) >> 8,
                    _ => u32::from_le_bytes([ sample[0], sample[1], sample[2], sample[3] ]),
                };

                let difference = value.wrapping_sub(previous);
                previous = value;

                for plane in 0 .. stored {
                    line[plane * size.0 + x] = (difference >> (8 * (stored - 1 - plane))) as u8;
                }
            }

            planes.extend_from_slice(&line);
        }
    }

    miniz_oxide::deflate::compress_to_vec_zlib(&planes, 6)
}

fn compress(channels: &[Channel], compression: u8, size: (usize, usize), raw: Vec<u8>) -> Vec<u8> {
    let compressed = match compression {
        RLE => run_length_encode(&predict(&raw)),
        ZIP | ZIPS => miniz_oxide::deflate::compress_to_vec_zlib(&predict(&raw), 6),
        PIZ => piz_compress(channels, size, &raw),
        PXR24 => pxr24_compress(channels, size, &raw),
        _ => return raw,
    };

    // the decoder treats chunks of the raw size as uncompressed
    if compressed.len() >= raw.len() { raw } else { compressed }
}


/// Encode a complete file.
pub fn write_file(parts: &[Part]) -> Vec<u8> {
    let multipart = parts.len() > 1;

    let mut flags = 2_u32;
    if !multipart && parts[0].tiles.is_some() && !parts[0].deep { flags |= 1 << 9; }
    if parts.iter().any(|part| part.deep) { flags |= 1 << 11; }
    if multipart { flags |= 1 << 12; }

    let mut file = vec![ 0x76, 0x2f, 0x31, 0x01 ];
    file.extend_from_slice(&flags.to_le_bytes());

    for part in parts {
        file.extend_from_slice(&part.header(multipart));
    }

    if multipart {
        file.push(0);
    }

    let table_size: usize = parts.iter().map(|part| part.chunk_count() * 8).sum();
    let mut offset_tables = Vec::with_capacity(table_size);
    let mut chunks = Vec::new();
    let mut offset = (file.len() + table_size) as u64;

    for (part_index, part) in parts.iter().enumerate() {
        if part.deep {
            offset_tables.extend(std::iter::repeat(0_u8).take(part.chunk_count() * 8));
            continue;
        }

        for (chunk_index, (coordinates, position, size, level)) in part.chunks().into_iter().enumerate() {
            if part.missing_chunks.contains(&chunk_index) {
                offset_tables.extend_from_slice(&0_u64.to_le_bytes());
                continue;
            }

            let raw = part.raw_chunk(position, size, level);
            let mut data = compress(&part.sorted_channels(), part.compression, size, raw);

            if part.broken_chunks.contains(&chunk_index) {
                // shorter than the raw size, so it is never mistaken for raw samples
                data.iter_mut().for_each(|byte| *byte = 0xFF);
                data.pop();
            }

            let mut chunk = Vec::new();
            if multipart { chunk.extend_from_slice(&(part_index as i32).to_le_bytes()); }
            for coordinate in coordinates { chunk.extend_from_slice(&coordinate.to_le_bytes()); }
            chunk.extend_from_slice(&(data.len() as i32).to_le_bytes());
            chunk.extend_from_slice(&data);

            offset_tables.extend_from_slice(&offset.to_le_bytes());
            offset += chunk.len() as u64;
            chunks.extend_from_slice(&chunk);
        }
    }

    file.extend_from_slice(&offset_tables);
    file.extend_from_slice(&chunks);
    file
}


/// Decode a native endian sample of the destination buffer.
pub fn sample_at(bytes: &[u8], index: usize, pixel_type: i32) -> f32 {
    match pixel_type {
        HALF => f16::from_ne_bytes([ bytes[index], bytes[index + 1] ]).to_f32(),
        FLOAT => f32::from_ne_bytes(bytes[index .. index + 4].try_into().unwrap()),
        _ => u32::from_ne_bytes(bytes[index .. index + 4].try_into().unwrap()) as f32 * 0.5,
    }
}


/// The number of bytes of one pixel with the specified channels.
pub fn pixel_bytes(channels: &[(&str, i32)]) -> usize {
    channels.iter().map(|&(_, pixel_type)| if pixel_type == HALF { 2 } else { 4 }).sum()
}

/// Compare the pixels of a destination buffer to the generated samples.
/// `channels` are the channels in the destination, in presentation order.
pub fn assert_pixels(
    bytes: &[u8], channels: &[(&str, i32)], origin: (i32, i32), size: (usize, usize),
    line_stride: usize, level: usize
) {
    let pixel_stride = pixel_bytes(channels);

    for line in 0 .. size.1 {
        for pixel in 0 .. size.0 {
            let mut index = line * line_stride + pixel * pixel_stride;
            let (x, y) = (origin.0 + pixel as i32, origin.1 + line as i32);

            for &(name, pixel_type) in channels {
                assert_eq!(
                    sample_at(bytes, index, pixel_type), sample(name, x, y, level),
                    "channel {} at pixel ({}, {}) of level {}", name, x, y, level
                );

                index += if pixel_type == HALF { 2 } else { 4 };
            }
        }
    }
}

/// Open the encoded parts from memory.
pub fn open(parts: &[Part], options: exr_input::prelude::OpenOptions) -> exr_input::prelude::ExrInput {
    let bytes = write_file(parts);
    let source = std::sync::Arc::new(exr_input::prelude::MemorySource::new("generated.exr", bytes));

    let mut input = exr_input::prelude::ExrInput::new();
    input.open("generated.exr", &options.source(source)).expect("generated file cannot be opened");
    input
}
