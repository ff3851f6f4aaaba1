
//! Describes a decoded image to the host:
//! the geometry of one resolution level, the presented channels,
//! and the typed metadata attributes of the part.

use std::collections::HashMap;
use std::ops::Range;
use crate::meta::attribute::SampleType;


/// The geometry, channels and attributes of one subimage at one resolution level.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpec {

    /// Origin of the pixel data, the minimum of the data window.
    pub x: i32,

    /// Origin of the pixel data, the minimum of the data window.
    pub y: i32,

    /// Number of pixels in each scan line.
    pub width: usize,

    /// Number of scan lines.
    pub height: usize,

    /// Origin of the display window.
    pub full_x: i32,

    /// Origin of the display window.
    pub full_y: i32,

    /// Width of the display window.
    pub full_width: usize,

    /// Height of the display window.
    pub full_height: usize,

    /// Zero for scan line images.
    pub tile_width: usize,

    /// Zero for scan line images.
    pub tile_height: usize,

    /// The widest sample type of all channels.
    pub format: SampleType,

    /// The channel names, in presentation order.
    pub channel_names: Vec<String>,

    /// One sample type per channel, in presentation order.
    /// Empty if all channels have the type `format`.
    pub channel_formats: Vec<SampleType>,

    /// Index of the first alpha channel.
    pub alpha_channel: Option<usize>,

    /// Index of the first depth channel.
    pub z_channel: Option<usize>,

    /// Whether the pixels contain a variable number of samples.
    pub deep: bool,

    /// Metadata, with the names the host uses.
    pub attributes: Attributes,
}

impl ImageSpec {

    /// The number of channels of each pixel.
    pub fn channel_count(&self) -> usize {
        self.channel_names.len()
    }

    /// The sample type of the channel at the specified index.
    pub fn channel_format(&self, channel: usize) -> SampleType {
        self.channel_formats.get(channel).copied().unwrap_or(self.format)
    }

    /// The number of bytes of one pixel that contains only the specified channels.
    pub fn pixel_bytes(&self, channels: Range<usize>) -> usize {
        channels.map(|channel| self.channel_format(channel).bytes_per_sample()).sum()
    }

    /// The number of bytes of one scan line that contains only the specified channels.
    pub fn scan_line_bytes(&self, channels: Range<usize>) -> usize {
        self.width * self.pixel_bytes(channels)
    }

    /// A copy of this spec that contains only geometry and channels, but no attributes.
    pub fn dimensions(&self) -> ImageSpec {
        ImageSpec {
            x: self.x, y: self.y, width: self.width, height: self.height,
            full_x: self.full_x, full_y: self.full_y,
            full_width: self.full_width, full_height: self.full_height,
            tile_width: self.tile_width, tile_height: self.tile_height,
            format: self.format,
            channel_names: self.channel_names.clone(),
            channel_formats: self.channel_formats.clone(),
            alpha_channel: self.alpha_channel,
            z_channel: self.z_channel,
            deep: self.deep,
            attributes: Attributes::new(),
        }
    }
}


/// A typed metadata value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {

    /// A 32-bit integer.
    Int(i32),

    /// A 32-bit float.
    Float(f32),

    /// A 64-bit float.
    Double(f64),

    /// Text.
    String(String),

    /// A list of texts.
    StringArray(Vec<String>),

    /// Numerator and denominator.
    Rational(i32, i32),

    /// Minimum x, minimum y, maximum x, maximum y, all inclusive.
    IntBox2([i32; 4]),

    /// Minimum x, minimum y, maximum x, maximum y.
    FloatBox2([f32; 4]),

    /// Any number of floats, for example chromaticities.
    FloatArray(Vec<f32>),

    /// A 2D integer vector.
    IntVec2([i32; 2]),

    /// A 2D float vector.
    FloatVec2([f32; 2]),

    /// A 2D double vector.
    DoubleVec2([f64; 2]),

    /// A 3D integer vector.
    IntVec3([i32; 3]),

    /// A 3D float vector.
    FloatVec3([f32; 3]),

    /// A 3D double vector.
    DoubleVec3([f64; 3]),

    /// Row major.
    Matrix33([f32; 9]),

    /// Row major.
    Matrix33D([f64; 9]),

    /// Row major.
    Matrix44([f32; 16]),

    /// Row major.
    Matrix44D([f64; 16]),

    /// Film manufacturer code, film type, prefix, count, perforation offset,
    /// perforations per frame, perforations per count.
    KeyCode([i32; 7]),

    /// Packed time and flags, packed user data.
    TimeCode([u32; 2]),
}

impl ParamValue {

    /// Convert numbers to a float.
    pub fn to_f32(&self) -> Option<f32> {
        match *self {
            ParamValue::Float(value) => Some(value),
            ParamValue::Double(value) => Some(value as f32),
            ParamValue::Int(value) => Some(value as f32),
            ParamValue::Rational(numerator, denominator) if denominator != 0 =>
                Some(numerator as f32 / denominator as f32),

            _ => None,
        }
    }
}


/// Typed metadata, stored by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    map: HashMap<String, ParamValue>,
}

impl Attributes {

    /// No attributes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an attribute.
    pub fn set(&mut self, name: impl Into<String>, value: ParamValue) {
        self.map.insert(name.into(), value);
    }

    /// The attribute with this exact name.
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.map.get(name)
    }

    /// Whether an attribute with this exact name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.map.contains_key(name)
    }

    /// Remove and return an attribute.
    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.map.remove(name)
    }

    /// The attribute as text, if it is text.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            ParamValue::String(text) => Some(text),
            _ => None,
        }
    }

    /// The attribute as an integer, if it is an integer.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            ParamValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    /// The attribute converted to a float, if it is a number.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get(name)?.to_f32()
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether there are no attributes.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All attributes, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.map.iter().map(|(name, value)| (name.as_str(), value))
    }
}
