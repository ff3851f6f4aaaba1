//! Zlib streams of per line sample differences, split into byte planes.
//! 32-bit floats keep only their upper 24 bits.

use std::borrow::Cow;
use zune_inflate::{DeflateDecoder, DeflateOptions};
use crate::math::Vec2;
use crate::meta::attribute::{ChannelList, SampleType};

/// How many bytes of each sample are stored.
fn stored_bytes(sample_type: SampleType) -> usize {
    match sample_type {
        SampleType::F16 => 2,
        SampleType::F32 => 3,
        SampleType::U32 => 4,
    }
}

pub fn decompress(
    channels: &ChannelList, data: &[u8], size: Vec2<usize>, expected_size: usize,
) -> Result<Vec<u8>, Cow<'static, str>>
{
    let line_size: usize = channels.list.iter()
        .map(|channel| stored_bytes(channel.sample_type) * size.0)
        .sum();

    let raw_size = line_size * size.1;

    let options = DeflateOptions::default()
        .set_limit(raw_size)
        .set_size_hint(raw_size);

    let raw = DeflateDecoder::new_with_options(data, options)
        .decode_zlib()
        .map_err(|error| format!("zlib stream: {:?}", error))?;

    if raw.len() != raw_size {
        return Err("byte planes do not match the chunk size".into());
    }

    let mut bytes = Vec::with_capacity(expected_size);
    let mut planes = raw.as_slice();

    for _ in 0 .. size.1 {
        for channel in &channels.list {
            let plane_count = stored_bytes(channel.sample_type);
            let (line, rest) = planes.split_at(plane_count * size.0);
            planes = rest;

            let mut pixel = 0_u32;

            for x in 0 .. size.0 {
                // the most significant byte is in the first plane
                let difference = (0 .. plane_count)
                    .fold(0_u32, |value, plane| (value << 8) | u32::from(line[plane * size.0 + x]));

                match channel.sample_type {
                    SampleType::F16 => {
                        pixel = pixel.wrapping_add(difference);
                        bytes.extend_from_slice(&(pixel as u16).to_le_bytes());
                    },

                    SampleType::F32 => {
                        pixel = pixel.wrapping_add(difference << 8);
                        bytes.extend_from_slice(&pixel.to_le_bytes());
                    },

                    SampleType::U32 => {
                        pixel = pixel.wrapping_add(difference);
                        bytes.extend_from_slice(&pixel.to_le_bytes());
                    },
                }
            }
        }
    }

    Ok(bytes)
}
