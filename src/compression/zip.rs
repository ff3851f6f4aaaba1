
//! Zlib streams of delta encoded bytes.

use std::borrow::Cow;
use zune_inflate::{DeflateDecoder, DeflateOptions};

pub fn decompress(data: &[u8], expected_size: usize) -> Result<Vec<u8>, Cow<'static, str>> {
    let options = DeflateOptions::default()
        .set_limit(expected_size)
        .set_size_hint(expected_size);

    let mut decoded = DeflateDecoder::new_with_options(data, options)
        .decode_zlib()
        .map_err(|error| format!("zlib stream: {:?}", error))?;

    super::predictor::restore(&mut decoded);
    Ok(decoded)
}
