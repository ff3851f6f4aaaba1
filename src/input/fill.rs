
//! Substitute a placeholder color for pixels that could not be decoded.

use std::ops::Range;
use half::f16;
use crate::meta::attribute::{IntegerBounds, SampleType};
use crate::spec::ImageSpec;


/// Where to write the placeholder pixels in a destination buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTarget {

    /// The absolute pixel coordinates to fill.
    /// The first pixel is written to the start of the buffer.
    pub pixels: IntegerBounds,

    /// The number of bytes from one pixel to the next.
    pub pixel_stride: usize,

    /// The number of bytes from one line to the next.
    pub line_stride: usize,
}

/// Fill the requested channels of all pixels with the missing color.
///
/// A negative first component enables a diagonal stripe pattern:
/// its absolute value is used, but every pixel with `(x - y) & 8 != 0` is set to zero.
/// Missing trailing components repeat the last component.
/// Only half and float channels are written, other channels are skipped.
///
/// Returns false if no missing color is configured or the buffer is too small,
/// in which case nothing is written.
pub fn fill_missing(
    missing_color: &[f32], spec: &ImageSpec, channels: Range<usize>,
    target: FillTarget, destination: &mut [u8]
) -> bool
{
    if missing_color.is_empty() {
        return false;
    }

    let FillTarget { pixels, pixel_stride, line_stride } = target;
    if pixels.size.area() == 0 {
        return true;
    }

    let required_bytes = (pixels.size.height() - 1) * line_stride
        + (pixels.size.width() - 1) * pixel_stride
        + spec.pixel_bytes(channels.clone());

    if required_bytes > destination.len() {
        return false;
    }

    let mut color = missing_color.to_vec();
    let stripes = color[0] < 0.0;
    color[0] = color[0].abs();

    if color.len() < channels.end {
        let last = color[color.len() - 1];
        color.resize(channels.end, last);
    }

    let start = pixels.position;
    let end = pixels.end();

    for (line_index, y) in (start.y() .. end.y()).enumerate() {
        for (pixel_index, x) in (start.x() .. end.x()).enumerate() {
            let mut byte_index = line_index * line_stride + pixel_index * pixel_stride;

            for channel in channels.clone() {
                let value = if stripes && (x.wrapping_sub(y) & 8) != 0 { 0.0 } else { color[channel] };
                let sample_type = spec.channel_format(channel);
                let sample_bytes = sample_type.bytes_per_sample();
                let sample = &mut destination[byte_index .. byte_index + sample_bytes];

                match sample_type {
                    SampleType::F32 => sample.copy_from_slice(&value.to_ne_bytes()),
                    SampleType::F16 => sample.copy_from_slice(&f16::from_f32(value).to_ne_bytes()),
                    SampleType::U32 => {},
                }

                byte_index += sample_bytes;
            }
        }
    }

    true
}
