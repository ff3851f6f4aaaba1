//! Wavelet and huffman coding of 16-bit values.
//! Every sample is split into 16-bit values, which are mapped
//! to a dense range, wavelet transformed per channel, then huffman coded.

mod huffman;
mod wavelet;

use std::borrow::Cow;
use crate::io::Data;
use crate::math::Vec2;
use crate::meta::attribute::ChannelList;

const U16_RANGE: usize = 1 << 16;
const BITMAP_SIZE: usize = U16_RANGE / 8;

/// Where the values of one channel start in the decoded buffer.
struct ChannelPlane {
    start: usize,
    values_per_sample: usize,
}

pub fn decompress(
    channels: &ChannelList, data: &[u8], size: Vec2<usize>, expected_size: usize,
) -> Result<Vec<u8>, Cow<'static, str>>
{
    let mut remaining = data;

    let min_non_zero = usize::from(u16::read(&mut remaining).map_err(|_| "bitmap bounds")?);
    let max_non_zero = usize::from(u16::read(&mut remaining).map_err(|_| "bitmap bounds")?);

    if max_non_zero >= BITMAP_SIZE {
        return Err("bitmap bounds".into());
    }

    let mut bitmap = vec![ 0_u8; BITMAP_SIZE ];
    if min_non_zero <= max_non_zero {
        u8::read_slice(&mut remaining, &mut bitmap[min_non_zero ..= max_non_zero])
            .map_err(|_| "bitmap ends early")?;
    }

    let (lookup_table, max_value) = reverse_lookup_table(&bitmap);

    let length = i32::read(&mut remaining).map_err(|_| "missing huffman length")?;
    let length = usize::try_from(length).map_err(|_| "negative huffman length")?;
    let huffman = remaining.get(.. length).ok_or("huffman length exceeds the chunk")?;

    let mut values = huffman::decompress(huffman, expected_size / 2)?;

    let mut planes = Vec::with_capacity(channels.list.len());
    let mut start = 0;

    for channel in &channels.list {
        let values_per_sample = channel.sample_type.bytes_per_sample() / 2;
        planes.push(ChannelPlane { start, values_per_sample });

        for offset in 0 .. values_per_sample {
            wavelet::decode(
                &mut values, start + offset, (size.0, size.1),
                (values_per_sample, size.0 * values_per_sample), max_value
            )?;
        }

        start += size.area() * values_per_sample;
    }

    if start != values.len() {
        return Err("channel sizes do not match the chunk size".into());
    }

    for value in &mut values {
        *value = lookup_table[usize::from(*value)];
    }

    // the channels are stored one after another, but lines are expected to alternate channels
    let mut bytes = Vec::with_capacity(expected_size);
    for y in 0 .. size.1 {
        for plane in &planes {
            let line_length = size.0 * plane.values_per_sample;
            let line_start = plane.start + y * line_length;

            for value in &values[line_start .. line_start + line_length] {
                bytes.extend_from_slice(&value.to_le_bytes());
            }
        }
    }

    Ok(bytes)
}

/// Maps the dense values back to the original values.
/// The zero value is always present. Returns the largest dense value.
fn reverse_lookup_table(bitmap: &[u8]) -> (Vec<u16>, u16) {
    let mut table = vec![ 0_u16; U16_RANGE ];
    let mut count = 0;

    for value in 0 .. U16_RANGE {
        if value == 0 || (bitmap[value >> 3] & (1 << (value & 7))) != 0 {
            table[count] = value as u16;
            count += 1;
        }
    }

    (table, (count - 1) as u16)
}
