//! Inverse of the two dimensional Haar wavelet that `PIZ` applies to each channel.

/// Undo the wavelet of one plane of `count` values, stored at
/// `start + x * step.0 + y * step.1` in `buffer`.
/// Planes whose values all fit into 14 bits use a lossless signed variant.
pub fn decode(
    buffer: &mut [u16], start: usize, count: (usize, usize),
    step: (usize, usize), max_value: u16,
) -> Result<(), &'static str>
{
    let (count_x, count_y) = count;
    let (step_x, step_y) = step;

    let smaller = count_x.min(count_y);
    if smaller == 0 { return Ok(()); }

    let last = start + (count_x - 1) * step_x + (count_y - 1) * step_y;
    if last >= buffer.len() { return Err("wavelet plane exceeds the buffer"); }

    let pair: fn(u16, u16) -> (u16, u16) =
        if max_value < (1 << 14) { decode_14bit } else { decode_16bit };

    let mut level = 1;
    while level * 2 <= smaller { level *= 2; }

    let mut block = level;
    level /= 2;

    while level >= 1 {
        let (near_x, near_y) = (step_x * level, step_y * level);
        let (far_x, far_y) = (step_x * block, step_y * block);

        let mut row = start;
        let row_end = start + step_y * (count_y - block);

        while row <= row_end {
            let mut px = row;
            let column_end = row + step_x * (count_x - block);

            while px <= column_end {
                let p01 = px + near_x;
                let p10 = px + near_y;
                let p11 = p10 + near_x;

                let (i00, i10) = pair(buffer[px], buffer[p10]);
                let (i01, i11) = pair(buffer[p01], buffer[p11]);
                (buffer[px], buffer[p01]) = pair(i00, i01);
                (buffer[p10], buffer[p11]) = pair(i10, i11);

                px += far_x;
            }

            // odd column
            if count_x & level != 0 {
                let p10 = px + near_y;
                let (i00, i10) = pair(buffer[px], buffer[p10]);
                buffer[px] = i00;
                buffer[p10] = i10;
            }

            row += far_y;
        }

        // odd row
        if count_y & level != 0 {
            let mut px = row;
            let column_end = row + step_x * (count_x - block);

            while px <= column_end {
                let p01 = px + near_x;
                let (i00, i01) = pair(buffer[px], buffer[p01]);
                buffer[px] = i00;
                buffer[p01] = i01;

                px += far_x;
            }
        }

        block = level;
        level /= 2;
    }

    Ok(())
}

/// Low and high band back to two signed values.
fn decode_14bit(low: u16, high: u16) -> (u16, u16) {
    let high = high as i16 as i32;
    let sum = low as i16 as i32 + (high & 1) + (high >> 1);

    (sum as i16 as u16, (sum - high) as i16 as u16)
}

const OFFSET: i32 = 1 << 15;
const MASK: i32 = (1 << 16) - 1;

/// Low and high band back to two values, modulo 2^16.
fn decode_16bit(low: u16, high: u16) -> (u16, u16) {
    let (low, high) = (low as i32, high as i32);
    let b = (low - (high >> 1)) & MASK;
    let a = (high + b - OFFSET) & MASK;

    (a as u16, b as u16)
}
