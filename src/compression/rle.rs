
//! Run length decoding. A signed count byte precedes every run:
//! negative counts introduce that many literal bytes,
//! other counts repeat the following byte `count + 1` times.

use std::borrow::Cow;

pub fn decompress(mut data: &[u8], expected_size: usize) -> Result<Vec<u8>, Cow<'static, str>> {
    let mut decoded = Vec::with_capacity(expected_size);

    while let Some((&count, rest)) = data.split_first() {
        let count = count as i8;

        if count < 0 {
            let length = count.unsigned_abs() as usize;
            if rest.len() < length {
                return Err("literal run exceeds data".into());
            }

            let (literal, rest) = rest.split_at(length);
            decoded.extend_from_slice(literal);
            data = rest;
        }
        else {
            let (&value, rest) = rest.split_first().ok_or("repeated run without value")?;
            decoded.resize(decoded.len() + count as usize + 1, value);
            data = rest;
        }

        if decoded.len() > expected_size {
            return Err("runs exceed chunk size".into());
        }
    }

    super::predictor::restore(&mut decoded);
    Ok(decoded)
}
