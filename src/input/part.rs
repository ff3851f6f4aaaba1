
//! Parse the header of a single part into the spec the host sees,
//! translating the attribute names of the file into the names of the host.

use std::sync::{Mutex, OnceLock, PoisonError};
use crate::block::ChunkLayout;
use crate::meta::MetaData;
use crate::meta::header::HeaderAttribute;
use crate::meta::attribute::*;
use crate::spec::{Attributes, ImageSpec, ParamValue};
use crate::input::channels::ChannelInventory;
use crate::error::*;
use crate::math::*;


/// Everything about one part that is needed to answer queries and decode pixels.
/// Immutable once parsed.
#[derive(Debug, Clone)]
pub struct PartInfo {

    /// The spec of the full resolution level, including all attributes.
    pub spec: ImageSpec,

    /// The exact names of the presented channels, used to match decoded channels.
    pub channel_names: Vec<Text>,

    /// How the pixels are split into chunks.
    pub layout: ChunkLayout,

    /// The data window of the full resolution level.
    pub data_window: IntegerBounds,

    /// The display window of the full resolution level.
    pub display_window: IntegerBounds,

    /// Single level, mip map or rip map.
    pub level_mode: LevelMode,

    /// How level sizes are rounded.
    pub rounding_mode: RoundingMode,

    /// Whether this part is a cube face environment map.
    pub cube_face: bool,

    /// The number of mip levels the host can request.
    pub level_count: usize,
}


impl PartInfo {

    /// Query the header of the part with the specified index.
    /// Fails if any structural attribute is missing or invalid.
    pub fn parse(meta: &MetaData, index: usize, file_name: &str) -> Result<Self> {
        let header = meta.headers.get(index)
            .ok_or_else(|| Error::usage(format!("subimage {} does not exist", index)))?;

        let data_window = header.data_window()?;
        let display_window = header.display_window()?;
        let block_type = header.block_type()?;

        let layout = ChunkLayout::from_header(header)?;

        let (tile_size, level_mode, rounding_mode, level_count) = match layout.tiles {
            Some(tiles) => (
                tiles.tile_size, tiles.level_mode, tiles.rounding_mode,
                layout.level_count.x().max(layout.level_count.y())
            ),

            None => (Vec2(0, 0), LevelMode::Singular, RoundingMode::Down, 1),
        };

        let channels = ChannelInventory::from_channels(header.channels()?)?;

        let mut attributes = Attributes::new();
        attributes.set("oiio:ColorSpace", ParamValue::String("Linear".into()));

        if level_mode != LevelMode::Singular {
            let rounding = match rounding_mode { RoundingMode::Down => 0, RoundingMode::Up => 1 };
            attributes.set("openexr:roundingmode", ParamValue::Int(rounding));
        }

        // an invalid environment map attribute does not make the part unreadable
        let environment_map = header.environment_map().ok().flatten();
        let cube_face = environment_map == Some(EnvironmentMap::Cube);

        match environment_map {
            Some(map) => {
                let texture_format = if cube_face { "CubeFace Environment" } else { "LatLong Environment" };
                attributes.set("textureformat", ParamValue::String(texture_format.into()));

                if map == EnvironmentMap::LatitudeLongitude {
                    attributes.set("oiio:updirection", ParamValue::String("y".into()));
                }

                attributes.set("oiio:sampleborder", ParamValue::Int(1));
            },

            None => if layout.tiles.is_some() && level_mode == LevelMode::MipMap {
                attributes.set("textureformat", ParamValue::String("Plain Texture".into()));
            },
        }

        attributes.set("compression", ParamValue::String(layout.compression.name().into()));

        for attribute in &header.attributes {
            translate_attribute(attribute, &mut attributes, file_name, index);
        }

        let x_resolution = attributes.get_f32("XResolution").unwrap_or(0.0);
        if x_resolution != 0.0 {
            let aspect = attributes.get_f32("PixelAspectRatio").unwrap_or(0.0);
            let aspect = if aspect != 0.0 { aspect } else { 1.0 };

            attributes.set("YResolution", ParamValue::Float(x_resolution * aspect));
            attributes.set("ResolutionUnit", ParamValue::String("in".into()));
        }

        if let Ok(Some(name)) = header.name() {
            if !name.bytes().is_empty() {
                attributes.set("oiio:subimagename", ParamValue::String(name.to_string()));
            }
        }

        let part_count = usize_to_i32(meta.headers.len(), "part count")?;
        attributes.set("oiio:subimages", ParamValue::Int(part_count));

        let spec = ImageSpec {
            x: data_window.position.x(),
            y: data_window.position.y(),
            width: data_window.size.width(),
            height: data_window.size.height(),
            full_x: display_window.position.x(),
            full_y: display_window.position.y(),
            full_width: display_window.size.width(),
            full_height: display_window.size.height(),
            tile_width: tile_size.width(),
            tile_height: tile_size.height(),
            format: channels.format,
            channel_names: channels.name_strings(),
            channel_formats: if channels.uniform { Vec::new() } else { channels.sample_types.clone() },
            alpha_channel: channels.alpha_channel,
            z_channel: channels.z_channel,
            deep: block_type.is_deep(),
            attributes,
        };

        Ok(PartInfo {
            spec, layout, data_window, display_window,
            level_mode, rounding_mode, cube_face, level_count,
            channel_names: channels.names,
        })
    }
}


/// What happens to an attribute of the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Translation {

    /// Exported with the name of the host.
    Rename(&'static str),

    /// Handled by the structural queries.
    Skip,

    /// Exported unchanged.
    Keep,
}

fn translate_name(name: &str) -> Translation {
    use Translation::*;

    match name {
        "cameraTransform" => Rename("worldtocamera"),
        "capDate" => Rename("DateTime"),
        "comments" => Rename("ImageDescription"),
        "owner" => Rename("Copyright"),
        "pixelAspectRatio" => Rename("PixelAspectRatio"),
        "xDensity" => Rename("XResolution"),
        "expTime" => Rename("ExposureTime"),
        "wrapmodes" => Rename("wrapmodes"),
        "aperture" => Rename("FNumber"),

        "version" => Rename("openexr:version"),
        "chunkCount" => Rename("openexr:chunkCount"),
        "maxSamplesPerPixel" => Rename("openexr:maxSamplesPerPixel"),
        "dwaCompressionLevel" => Rename("openexr:dwaCompressionLevel"),

        "channels" | "compression" | "dataWindow" | "displayWindow" | "envmap"
        | "tiledesc" | "tiles" | "lineOrder" | "type" => Skip,

        _ => Keep,
    }
}

/// Add a single attribute of the file to the host attributes, if it can be represented.
fn translate_attribute(attribute: &HeaderAttribute, attributes: &mut Attributes, file_name: &str, part: usize) {
    let file_attribute_name = attribute.name.to_string();

    let name = match translate_name(&file_attribute_name) {
        Translation::Skip => return,
        Translation::Rename(name) => name.to_string(),
        Translation::Keep => file_attribute_name,
    };

    let value = match &attribute.value {
        Ok(value) => value,
        Err(error) => {
            tracing::debug!(file = file_name, part, attribute = %name, %error, "skipping invalid attribute");
            return;
        }
    };

    use crate::meta::attribute::AttributeValue as Value;

    let converted = match value {
        Value::IntegerBounds(corners) => ParamValue::IntBox2(*corners),

        Value::FloatBounds(bounds) => ParamValue::FloatBox2(*bounds),
        Value::Chromaticities(coordinates) => ParamValue::FloatArray(coordinates.to_vec()),
        Value::FloatVector(values) => ParamValue::FloatArray(values.clone()),

        Value::F64(value) => ParamValue::Double(*value),
        Value::F32(value) => ParamValue::Float(*value),
        Value::I32(value) => ParamValue::Int(*value),

        Value::KeyCode(key_code) => {
            let name = if name == "keyCode" { "smpte:KeyCode".to_string() } else { name };
            attributes.set(name, ParamValue::KeyCode(*key_code));
            return;
        },

        Value::TimeCode(time_code) => {
            let name = if name == "timeCode" { "smpte:TimeCode".to_string() } else { name };
            attributes.set(name, ParamValue::TimeCode(*time_code));
            return;
        },

        Value::FloatMatrix3(matrix) => ParamValue::Matrix33(*matrix),
        Value::DoubleMatrix3(matrix) => ParamValue::Matrix33D(*matrix),
        Value::FloatMatrix4(matrix) => ParamValue::Matrix44(*matrix),
        Value::DoubleMatrix4(matrix) => ParamValue::Matrix44D(*matrix),

        Value::Rational(numerator, denominator) => match exact_rational(*numerator, *denominator) {
            Some((numerator, denominator)) => ParamValue::Rational(numerator, denominator),
            None => {
                tracing::debug!(
                    file = file_name, part, attribute = %name,
                    "cannot represent rational attribute {} / {} exactly, dropping it",
                    numerator, denominator
                );

                return;
            }
        },

        Value::Text(text) => ParamValue::String(text.to_string()),
        Value::TextVector(texts) => ParamValue::StringArray(texts.iter().map(Text::to_string).collect()),

        Value::IntVec2(vector) => ParamValue::IntVec2(*vector),
        Value::FloatVec2(vector) => ParamValue::FloatVec2(*vector),
        Value::DoubleVec2(vector) => ParamValue::DoubleVec2(*vector),
        Value::IntVec3(vector) => ParamValue::IntVec3(*vector),
        Value::FloatVec3(vector) => ParamValue::FloatVec3(*vector),
        Value::DoubleVec3(vector) => ParamValue::DoubleVec3(*vector),

        Value::Preview(_) | Value::EnvironmentMap(_) | Value::Compression(_)
        | Value::ChannelList(_) | Value::LineOrder(_)
        | Value::TileDescription(_) | Value::Opaque { .. } => return,
    };

    attributes.set(name, converted);
}

/// Represent a rational with an unsigned denominator as two signed integers.
/// Large denominators are reduced by the greatest common divisor,
/// and values that cannot be represented exactly are rejected.
pub fn exact_rational(numerator: i32, denominator: u32) -> Option<(i32, i32)> {
    if let Ok(denominator) = i32::try_from(denominator) {
        return Some((numerator, denominator));
    }

    let divisor = greatest_common_divisor(numerator.unsigned_abs() as u64, denominator as u64);
    if divisor <= 1 {
        return None;
    }

    let numerator = i32::try_from(numerator as i64 / divisor as i64).ok()?;
    let denominator = i32::try_from(denominator as u64 / divisor).ok()?;
    Some((numerator, denominator))
}

fn greatest_common_divisor(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let remainder = a % b;
        a = b;
        b = remainder;
    }

    a
}


/// A value that is computed on first access, at most once, even if accessed from multiple threads.
/// Used for the parts of a file, which are parsed only when they are needed.
#[derive(Debug)]
pub struct LazyPart<T = PartInfo> {
    value: OnceLock<T>,
}

impl<T> Default for LazyPart<T> {
    fn default() -> Self {
        LazyPart { value: OnceLock::new() }
    }
}

impl<T> LazyPart<T> {

    /// The value, if it has been computed already.
    pub fn get(&self) -> Option<&T> {
        self.value.get()
    }

    /// Return the value, computing it first if necessary.
    /// The lock guards only the check and the computation. Computed values are read without locking.
    /// A failed computation is not stored, so the next access will try again.
    pub fn get_or_parse(&self, lock: &Mutex<()>, parse: impl FnOnce() -> Result<T>) -> Result<&T> {
        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(value) = self.value.get() {
            return Ok(value);
        }

        let value = parse()?;
        Ok(self.value.get_or_init(|| value))
    }
}
