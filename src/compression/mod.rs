
//! Compression methods of a part, and decoding of the chunks
//! that this crate knows how to decompress.

mod predictor;
mod zip;
mod rle;
mod piz;
mod pxr24;

use crate::error::{Error, Result};
use crate::math::Vec2;
use crate::meta::attribute::ChannelList;


/// The compression method of a part, as stored in its header.
/// `B44`, `B44A`, `DWAA` and `DWAB` chunks cannot be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Compression {

    /// Raw little endian samples.
    Uncompressed,

    /// Run length encoded byte differences, one line per chunk.
    RLE,

    /// Deflate, one line per chunk.
    ZIP1,

    /// Deflate, sixteen lines per chunk.
    ZIP16,

    /// Wavelet and huffman coding.
    PIZ,

    /// Deflate after truncating 32 bit floats to 24 bits.
    PXR24,

    /// Fixed rate 4x4 block compression of half floats.
    B44,

    /// `B44` with special handling of flat blocks.
    B44A,

    /// DCT based, 32 lines per chunk.
    DWAA,

    /// DCT based, 256 lines per chunk.
    DWAB,
}

impl Compression {

    /// Every method, in the order of the header byte that selects it.
    pub(crate) const ALL: [Compression; 10] = {
        use Compression::*;
        [ Uncompressed, RLE, ZIP1, ZIP16, PIZ, PXR24, B44, B44A, DWAA, DWAB ]
    };

    /// The name of the method in the image metadata.
    pub fn name(self) -> &'static str {
        match self {
            Compression::Uncompressed => "none",
            Compression::RLE => "rle",
            Compression::ZIP1 => "zips",
            Compression::ZIP16 => "zip",
            Compression::PIZ => "piz",
            Compression::PXR24 => "pxr24",
            Compression::B44 => "b44",
            Compression::B44A => "b44a",
            Compression::DWAA => "dwaa",
            Compression::DWAB => "dwab",
        }
    }

    /// How many lines of a scan line part share one chunk.
    pub fn scan_lines_per_block(self) -> usize {
        match self {
            Compression::Uncompressed | Compression::RLE | Compression::ZIP1 => 1,
            Compression::ZIP16 | Compression::PXR24 => 16,
            Compression::PIZ | Compression::B44 | Compression::B44A | Compression::DWAA => 32,
            Compression::DWAB => 256,
        }
    }

    /// Restore the raw bytes of one chunk. The result is ordered
    /// by line, then by channel, then by pixel, in little endian.
    ///
    /// Writers store a chunk raw whenever compressing it would not
    /// make it smaller, so data of exactly the expected size is returned as is.
    /// `size` is the pixel size of the chunk, which `PIZ` and `PXR24` need.
    pub fn decompress(
        self, channels: &ChannelList, data: Vec<u8>, size: Vec2<usize>, expected_size: usize
    ) -> Result<Vec<u8>>
    {
        if data.len() == expected_size {
            return Ok(data);
        }

        let decoded = match self {
            Compression::Uncompressed => return Err(Error::invalid("size of uncompressed chunk")),
            Compression::RLE => rle::decompress(&data, expected_size),
            Compression::ZIP1 | Compression::ZIP16 => zip::decompress(&data, expected_size),
            Compression::PIZ => piz::decompress(channels, &data, size, expected_size),
            Compression::PXR24 => pxr24::decompress(channels, &data, size, expected_size),

            unsupported => return Err(Error::unsupported(format!(
                "{} compression", unsupported.name()
            ))),
        };

        let decoded = decoded.map_err(|error| Error::invalid(format!(
            "{} compressed chunk ({})", self.name(), error
        )))?;

        if decoded.len() == expected_size { Ok(decoded) }
        else { Err(Error::invalid(format!("{} compressed chunk size", self.name()))) }
    }
}


#[cfg(test)]
mod test {
    use super::*;
    use smallvec::smallvec;
    use crate::meta::attribute::{ChannelDescription, SampleType};

    fn half_channel() -> ChannelList {
        ChannelList::new(smallvec![ ChannelDescription::new("Y", SampleType::F16) ])
    }

    #[test]
    fn raw_chunks_pass_through(){
        let channels = half_channel();
        let raw = vec![ 1, 2, 3, 4 ];

        assert_eq!(Compression::ZIP16.decompress(&channels, raw.clone(), Vec2(2, 1), 4).unwrap(), raw);
        assert_eq!(Compression::PIZ.decompress(&channels, raw.clone(), Vec2(2, 1), 4).unwrap(), raw);
        assert!(Compression::Uncompressed.decompress(&channels, raw, Vec2(2, 1), 5).is_err());
    }

    #[test]
    fn unsupported_methods(){
        let result = Compression::DWAA.decompress(&half_channel(), vec![ 1, 2, 3 ], Vec2(4, 1), 8);
        match result {
            Err(Error::NotSupported(message)) => assert!(message.contains("dwaa")),
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn broken_data_is_invalid(){
        for method in [ Compression::ZIP1, Compression::PIZ, Compression::PXR24 ] {
            let result = method.decompress(&half_channel(), vec![ 9, 9, 9 ], Vec2(4, 1), 8);

            match result {
                Err(Error::Invalid(message)) => assert!(message.contains(method.name())),
                other => panic!("unexpected result {:?}", other),
            }
        }
    }

    #[test]
    fn lines_per_block(){
        let lines: Vec<usize> = Compression::ALL.iter().map(|method| method.scan_lines_per_block()).collect();
        assert_eq!(lines, [ 1, 1, 1, 16, 32, 16, 32, 32, 32, 256 ]);
        assert_eq!(Compression::ZIP1.name(), "zips");
    }
}
