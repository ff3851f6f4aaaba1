
//! Typed values of header attributes.
//!
//! Values are parsed as soon as the header is read. A value that cannot be parsed
//! only invalidates its own attribute, so the remaining header stays usable.
//! Unknown type names are kept as opaque bytes.

use smallvec::SmallVec;
use crate::io::*;
use crate::meta::end_of_sequence;
use crate::error::*;
use crate::math::{RoundingMode, Vec2};

pub use crate::compression::Compression;


/// The parsed value of one attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {

    /// The channels of the part, `chlist`.
    ChannelList(ChannelList),

    /// The compression method of the part.
    Compression(Compression),

    /// The projection of an environment map, `envmap`.
    EnvironmentMap(EnvironmentMap),

    /// The order of the chunks in the file. Decoding does not depend on it.
    LineOrder(LineOrder),

    /// The tiling of the part, `tiledesc`.
    TileDescription(TileDescription),

    /// A thumbnail. Only its resolution is kept.
    Preview(Vec2<usize>),

    /// A `string`.
    Text(Text),

    /// A `stringvector`.
    TextVector(Vec<Text>),

    /// An `int`.
    I32(i32),

    /// A `float`.
    F32(f32),

    /// A `double`.
    F64(f64),

    /// Numerator and denominator.
    Rational(i32, u32),

    /// A `box2i`: minimum x, minimum y, maximum x, maximum y, as stored in the file.
    IntegerBounds([i32; 4]),

    /// A `box2f`: minimum x, minimum y, maximum x, maximum y.
    FloatBounds([f32; 4]),

    /// A `v2i`.
    IntVec2([i32; 2]),

    /// A `v2f`.
    FloatVec2([f32; 2]),

    /// A `v2d`.
    DoubleVec2([f64; 2]),

    /// A `v3i`.
    IntVec3([i32; 3]),

    /// A `v3f`.
    FloatVec3([f32; 3]),

    /// A `v3d`.
    DoubleVec3([f64; 3]),

    /// Red, green, blue and white point, two coordinates each.
    Chromaticities([f32; 8]),

    /// The seven numbers of a film key code, in file order.
    KeyCode([i32; 7]),

    /// Packed time and flags, followed by packed user data.
    TimeCode([u32; 2]),

    /// An `m33f`, row major.
    FloatMatrix3([f32; 9]),

    /// An `m33d`, row major.
    DoubleMatrix3([f64; 9]),

    /// An `m44f`, row major.
    FloatMatrix4([f32; 16]),

    /// An `m44d`, row major.
    DoubleMatrix4([f64; 16]),

    /// A `floatvector`.
    FloatVector(Vec<f32>),

    /// A value of a type this crate does not know.
    Opaque {

        /// The type name as found in the file.
        kind: Text,

        /// The little endian value.
        bytes: Vec<u8>,
    },
}


/// A string of bytes, as found in the file.
/// Names of channels and attributes are usually ascii.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Text(SmallVec<[u8; 24]>);

/// Whether a part contains scan lines or tiles, and whether its samples are deep.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum BlockType {

    /// `scanlineimage`
    ScanLine,

    /// `tiledimage`
    Tile,

    /// `deepscanline`
    DeepScanLine,

    /// `deeptile`
    DeepTile,
}

/// A rectangle of pixels. The size is never negative.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default, Hash)]
pub struct IntegerBounds {

    /// The smallest coordinate inside the rectangle.
    pub position: Vec2<i32>,

    /// The number of pixels in x and y direction.
    pub size: Vec2<usize>,
}

/// The channels of a part, in file order, which is alphabetical.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChannelList {

    /// The channels, in file order.
    pub list: SmallVec<[ChannelDescription; 5]>,

    /// The sum of the sample sizes of all channels.
    pub bytes_per_pixel: usize,
}

/// Name, sample type and sampling of one channel.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct ChannelDescription {

    /// The full name, including any layer prefix.
    pub name: Text,

    /// The type of each sample.
    pub sample_type: SampleType,

    /// The distance between two samples of this channel, in pixels.
    /// Anything but `(1, 1)` is a subsampled channel.
    pub sampling: Vec2<usize>,
}

/// The data type of the samples of a channel.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum SampleType {

    /// 32-bit unsigned integer.
    U32,

    /// 16-bit float.
    F16,

    /// 32-bit float.
    F32,
}

/// The projection of an environment map.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum EnvironmentMap {

    /// Latitude and longitude, like a world map.
    LatitudeLongitude,

    /// The six faces of a cube, stacked vertically.
    Cube,
}

/// The order in which the chunks were written.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum LineOrder {

    /// Top to bottom.
    Increasing,

    /// Bottom to top.
    Decreasing,

    /// Any order.
    Unspecified,
}

/// The tiling of a tiled part.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub struct TileDescription {

    /// The size of each tile, the same in every level.
    pub tile_size: Vec2<usize>,

    /// Which smaller versions of the image are stored.
    pub level_mode: LevelMode,

    /// How the size of smaller levels is rounded.
    pub rounding_mode: RoundingMode,
}

/// Which smaller versions of the image a tiled part contains.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum LevelMode {

    /// Only the full resolution.
    Singular,

    /// Levels that halve both dimensions at once.
    MipMap,

    /// Levels that halve each dimension independently.
    RipMap,
}


impl Text {

    /// Read bytes until a null byte. The null byte is consumed but not included.
    pub fn read_null_terminated(read: &mut impl Read, max_len: usize) -> Result<Self> {
        let mut bytes = SmallVec::new();

        loop {
            match u8::read(read)? {
                0 => break,
                byte if bytes.len() < max_len => bytes.push(byte),
                _ => return Err(Error::invalid("text too long")),
            }
        }

        Ok(Text(bytes))
    }

    fn read_sized(read: &mut impl Read, size: usize) -> Result<Self> {
        let bytes = u8::read_vec(read, size, 1024, None, "text attribute length")?;
        Ok(Text(SmallVec::from_vec(bytes)))
    }

    /// The raw bytes of this text.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether this text has exactly the bytes of the string.
    pub fn eq(&self, string: &str) -> bool {
        self.bytes() == string.as_bytes()
    }
}

impl PartialEq<str> for Text {
    fn eq(&self, other: &str) -> bool {
        Text::eq(self, other)
    }
}

impl From<&str> for Text {
    fn from(string: &str) -> Self {
        Text(SmallVec::from_slice(string.as_bytes()))
    }
}

impl std::fmt::Display for Text {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&String::from_utf8_lossy(self.bytes()))
    }
}

impl std::fmt::Debug for Text {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{:?}", String::from_utf8_lossy(self.bytes()))
    }
}


impl ChannelList {

    /// Channels must already be in file order.
    pub fn new(list: SmallVec<[ChannelDescription; 5]>) -> Self {
        let bytes_per_pixel = list.iter().map(|channel| channel.sample_type.bytes_per_sample()).sum();
        ChannelList { list, bytes_per_pixel }
    }

    /// Each channel, together with the byte offset of its samples inside one pixel.
    pub fn channels_with_byte_offset(&self) -> impl Iterator<Item = (usize, &ChannelDescription)> {
        self.list.iter().scan(0, |offset, channel| {
            let channel_offset = *offset;
            *offset += channel.sample_type.bytes_per_sample();
            Some((channel_offset, channel))
        })
    }

    fn read(read: &mut PeekRead<impl Read>) -> Result<Self> {
        let mut list = SmallVec::new();

        while !end_of_sequence(read)? {
            list.push(ChannelDescription::read(read)?);
        }

        Ok(ChannelList::new(list))
    }
}

impl ChannelDescription {

    /// A channel without subsampling.
    pub fn new(name: impl Into<Text>, sample_type: SampleType) -> Self {
        ChannelDescription { name: name.into(), sample_type, sampling: Vec2(1, 1) }
    }

    /// Does not reject subsampling.
    fn read(read: &mut impl Read) -> Result<Self> {
        let name = Text::read_null_terminated(read, 256)?;

        let sample_type = match i32::read(read)? {
            0 => SampleType::U32,
            1 => SampleType::F16,
            2 => SampleType::F32,
            _ => return Err(Error::invalid("channel sample type")),
        };

        // linear flag and three reserved bytes
        let mut flags = [0_u8; 4];
        u8::read_slice(read, &mut flags)?;

        if flags[0] > 1 {
            return Err(Error::invalid("channel linearity flag"));
        }

        let sampling = Vec2(
            i32_to_usize(i32::read(read)?, "channel x sampling")?,
            i32_to_usize(i32::read(read)?, "channel y sampling")?,
        );

        Ok(ChannelDescription { name, sample_type, sampling })
    }
}

impl SampleType {

    /// The number of bytes of one sample.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleType::F16 => 2,
            SampleType::F32 | SampleType::U32 => 4,
        }
    }
}

impl BlockType {

    /// Parse the value of the `type` attribute.
    pub fn parse(text: &Text) -> Result<Self> {
        match text.bytes() {
            b"scanlineimage" => Ok(BlockType::ScanLine),
            b"tiledimage" => Ok(BlockType::Tile),
            b"deepscanline" => Ok(BlockType::DeepScanLine),
            b"deeptile" => Ok(BlockType::DeepTile),
            _ => Err(Error::invalid("part type attribute value")),
        }
    }

    /// Whether the chunks are tiles.
    pub fn has_tiles(self) -> bool {
        matches!(self, BlockType::Tile | BlockType::DeepTile)
    }

    /// Whether pixels contain a variable number of samples.
    pub fn is_deep(self) -> bool {
        matches!(self, BlockType::DeepScanLine | BlockType::DeepTile)
    }
}

impl IntegerBounds {

    /// A rectangle with the specified smallest coordinate and size.
    pub fn new(position: impl Into<Vec2<i32>>, size: impl Into<Vec2<usize>>) -> Self {
        IntegerBounds { position: position.into(), size: size.into() }
    }

    /// The first coordinate after the rectangle, in both directions.
    /// Cannot overflow for bounds that were read from a file.
    pub fn end(self) -> Vec2<i32> {
        let end = |position: i32, size: usize| (i64::from(position) + size as i64) as i32;
        Vec2(end(self.position.x(), self.size.width()), end(self.position.y(), self.size.height()))
    }

    /// The largest coordinate inside the rectangle.
    pub fn max(self) -> Vec2<i32> {
        self.end() - Vec2(1, 1)
    }

    /// Convert inclusive corners, as stored in a `box2i`, to a rectangle.
    /// Fails if the maximum is below the minimum, or if a coordinate is not below
    /// half of the `i32` range, so that sizes cannot overflow.
    pub fn from_corners([ x_min, y_min, x_max, y_max ]: [i32; 4]) -> Result<Self> {
        let limit = i32::MAX / 2;
        let in_range = |value: i32| value > -limit && value < limit;

        if ![ x_min, y_min, x_max, y_max ].iter().all(|&value| in_range(value)) {
            return Err(Error::invalid("box coordinates exceed the integer limit"));
        }

        if x_max < x_min || y_max < y_min {
            return Err(Error::invalid(format!(
                "box maximum ({}, {}) is below its minimum ({}, {})", x_max, y_max, x_min, y_min
            )));
        }

        let size = Vec2(x_max - x_min + 1, y_max - y_min + 1).to_usize("box size")?;
        Ok(IntegerBounds { position: Vec2(x_min, y_min), size })
    }
}

impl TileDescription {

    /// The mode byte contains the level mode in the low and the rounding mode in the high four bits.
    fn read(read: &mut impl Read) -> Result<Self> {
        let [ width, height ] = read_array::<u32, 2>(read)?;
        let mode = u8::read(read)?;

        let level_mode = match mode & 0x0F {
            0 => LevelMode::Singular,
            1 => LevelMode::MipMap,
            2 => LevelMode::RipMap,
            _ => return Err(Error::invalid("tile level mode")),
        };

        let rounding_mode = match mode >> 4 {
            0 => RoundingMode::Down,
            1 => RoundingMode::Up,
            _ => return Err(Error::invalid("tile rounding mode")),
        };

        let max = (i32::MAX / 2) as u32;
        if width == 0 || height == 0 || width >= max || height >= max {
            return Err(Error::invalid("tile size"));
        }

        Ok(TileDescription { tile_size: Vec2(width as usize, height as usize), level_mode, rounding_mode })
    }
}

impl Compression {

    fn read(read: &mut impl Read) -> Result<Self> {
        let byte = u8::read(read)?;

        Compression::ALL.get(byte as usize).copied()
            .ok_or_else(|| Error::unsupported(format!("compression method {}", byte)))
    }
}


/// Read a fixed number of little endian values.
fn read_array<T: Data + Copy, const N: usize>(read: &mut impl Read) -> Result<[T; N]> {
    let mut values = [T::default(); N];
    T::read_slice(read, &mut values)?;
    Ok(values)
}

/// Read `size` bytes of strings, each prefixed with its length.
fn read_text_vector(read: &mut impl Read, size: usize) -> Result<Vec<Text>> {
    let mut texts = Vec::new();
    let mut remaining = size;

    while remaining > 0 {
        let length = i32_to_usize(i32::read(read)?, "text vector entry length")?;

        remaining = remaining.checked_sub(i32::BYTE_SIZE + length)
            .ok_or_else(|| Error::invalid("text vector byte size"))?;

        texts.push(Text::read_sized(read, length)?);
    }

    Ok(texts)
}


/// Read the name, type name and value of the next attribute.
/// The value is an error if only this attribute is broken, while the header can still be read.
pub fn read(read: &mut PeekRead<impl Read>, max_name_len: usize) -> Result<(Text, Text, Result<AttributeValue>)> {
    let name = Text::read_null_terminated(read, max_name_len)?;
    let kind = Text::read_null_terminated(read, max_name_len)?;
    let size = i32_to_usize(i32::read(read)?, "attribute size")?;

    let bytes = u8::read_vec(read, size, 128, None, "attribute size")?;
    let value = AttributeValue::parse(kind.clone(), bytes);

    Ok((name, kind, value))
}

impl AttributeValue {

    /// Interpret the bytes of an attribute value according to its type name.
    pub fn parse(kind: Text, bytes: Vec<u8>) -> Result<Self> {
        use self::AttributeValue::*;

        let size = bytes.len();
        let read = &mut bytes.as_slice();

        Ok(match kind.bytes() {
            b"int" => I32(i32::read(read)?),
            b"float" => F32(f32::read(read)?),
            b"double" => F64(f64::read(read)?),
            b"rational" => Rational(i32::read(read)?, u32::read(read)?),

            b"box2i" => IntegerBounds(read_array(read)?),
            b"box2f" => FloatBounds(read_array(read)?),

            b"v2i" => IntVec2(read_array(read)?),
            b"v2f" => FloatVec2(read_array(read)?),
            b"v2d" => DoubleVec2(read_array(read)?),
            b"v3i" => IntVec3(read_array(read)?),
            b"v3f" => FloatVec3(read_array(read)?),
            b"v3d" => DoubleVec3(read_array(read)?),

            b"m33f" => FloatMatrix3(read_array(read)?),
            b"m33d" => DoubleMatrix3(read_array(read)?),
            b"m44f" => FloatMatrix4(read_array(read)?),
            b"m44d" => DoubleMatrix4(read_array(read)?),

            b"chromaticities" => Chromaticities(read_array(read)?),
            b"keycode" => KeyCode(read_array(read)?),
            b"timecode" => TimeCode(read_array(read)?),

            b"string" => Text(self::Text::read_sized(read, size)?),
            b"stringvector" => TextVector(read_text_vector(read, size)?),

            b"floatvector" => {
                if size % f32::BYTE_SIZE != 0 {
                    return Err(Error::invalid("float vector byte size"));
                }

                FloatVector(f32::read_vec(read, size / f32::BYTE_SIZE, 1024, None, "float vector size")?)
            },

            b"chlist" => ChannelList(self::ChannelList::read(&mut PeekRead::new(bytes.as_slice()))?),
            b"compression" => Compression(self::Compression::read(read)?),
            b"tiledesc" => TileDescription(self::TileDescription::read(read)?),

            b"envmap" => EnvironmentMap(match u8::read(read)? {
                0 => self::EnvironmentMap::LatitudeLongitude,
                1 => self::EnvironmentMap::Cube,
                _ => return Err(Error::invalid("environment map value")),
            }),

            b"lineOrder" => LineOrder(match u8::read(read)? {
                0 => self::LineOrder::Increasing,
                1 => self::LineOrder::Decreasing,
                2 => self::LineOrder::Unspecified,
                _ => return Err(Error::invalid("line order value")),
            }),

            b"preview" => {
                let [ width, height ] = read_array::<u32, 2>(read)?;
                let pixel_bytes = u64::from(width) * u64::from(height) * 4;

                if pixel_bytes != read.len() as u64 {
                    return Err(Error::invalid("preview size"));
                }

                Preview(Vec2(width as usize, height as usize))
            },

            _ => Opaque { kind, bytes },
        })
    }
}
