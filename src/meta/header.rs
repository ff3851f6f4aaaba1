
//! Contains the raw header of a single part.
//! Attributes are kept in the order they appear in the file,
//! and the structural attributes are looked up on demand.

use crate::meta::attribute::{self, *};
use crate::meta::{end_of_sequence, missing_attribute, computed_chunk_count, Headers, Version};
use crate::error::*;
use crate::io::*;
use smallvec::SmallVec;


/// Describes a single part in a file.
/// A file can have any number of parts.
/// The meta data contains one header per part.
#[derive(Debug)]
pub struct Header {

    /// All attributes of this part, in file order.
    /// An attribute whose value could not be parsed keeps the parse error.
    pub attributes: Vec<HeaderAttribute>,

    /// The block type implied by the version flags,
    /// used if the header does not contain a `type` attribute.
    implied_block_type: BlockType,
}

/// A single attribute of a header, as found in the file.
#[derive(Debug)]
pub struct HeaderAttribute {

    /// The name of this attribute, for example `dataWindow`.
    pub name: Text,

    /// The type name of this attribute, for example `box2i`.
    pub kind: Text,

    /// The parsed value, or the reason why the value could not be parsed.
    pub value: Result<AttributeValue>,
}


/// Attributes that describe the structure of a part.
pub mod standard_names {
    #![allow(missing_docs)]

    pub const NAME: &str = "name";
    pub const BLOCK_TYPE: &str = "type";
    pub const CHUNK_COUNT: &str = "chunkCount";
    pub const CHANNELS: &str = "channels";
    pub const COMPRESSION: &str = "compression";
    pub const DATA_WINDOW: &str = "dataWindow";
    pub const DISPLAY_WINDOW: &str = "displayWindow";
    pub const TILES: &str = "tiles";
    pub const ENVIRONMENT_MAP: &str = "envmap";
}


impl Header {

    /// Read the headers without validating them.
    pub fn read_all(read: &mut PeekRead<impl Read>, version: &Version) -> Result<Headers> {
        if !version.is_multipart() {
            Ok(smallvec![ Header::read(read, version)? ])
        }
        else {
            let mut headers = SmallVec::new();

            while !end_of_sequence(read)? {
                headers.push(Header::read(read, version)?);
            }

            if headers.is_empty() {
                return Err(Error::invalid("multipart file without headers"));
            }

            Ok(headers)
        }
    }

    /// Read the attributes of a single header.
    /// Fails only if the byte source is broken, not if single attribute values are invalid.
    pub fn read(read: &mut PeekRead<impl Read>, version: &Version) -> Result<Self> {
        let max_string_len = if version.long_names { 256 } else { 32 };
        let mut attributes = Vec::with_capacity(16);

        while !end_of_sequence(read)? {
            let (name, kind, value) = attribute::read(read, max_string_len)?;
            attributes.push(HeaderAttribute { name, kind, value });
        }

        let implied_block_type = {
            if version.single_part_tiled { BlockType::Tile }
            else if version.deep { BlockType::DeepScanLine }
            else { BlockType::ScanLine }
        };

        Ok(Header { attributes, implied_block_type })
    }

    /// The first attribute with the exact name, if any.
    pub fn attribute(&self, name: &str) -> Option<&HeaderAttribute> {
        self.attributes.iter().find(|attribute| attribute.name.eq(name))
    }

    /// The value of an attribute that must be present and valid.
    fn required(&self, name: &'static str) -> Result<&AttributeValue> {
        match self.attribute(name) {
            Some(HeaderAttribute { value: Ok(value), .. }) => Ok(value),
            Some(HeaderAttribute { value: Err(error), .. }) =>
                Err(Error::invalid(format!("{} attribute ({})", name, error))),

            None => Err(missing_attribute(name)),
        }
    }

    /// The value of an attribute that may be absent, but must be valid if present.
    fn optional(&self, name: &'static str) -> Result<Option<&AttributeValue>> {
        match self.attribute(name) {
            None => Ok(None),
            Some(_) => self.required(name).map(Some),
        }
    }

    /// The rectangle that contains all pixels of the full resolution level.
    pub fn data_window(&self) -> Result<IntegerBounds> {
        rectangle(self.required(standard_names::DATA_WINDOW)?, standard_names::DATA_WINDOW)
    }

    /// The rectangle that should be displayed.
    pub fn display_window(&self) -> Result<IntegerBounds> {
        rectangle(self.required(standard_names::DISPLAY_WINDOW)?, standard_names::DISPLAY_WINDOW)
    }

    /// Whether this part contains scan lines or tiles, and whether the samples are deep.
    pub fn block_type(&self) -> Result<BlockType> {
        match self.optional(standard_names::BLOCK_TYPE)? {
            None => Ok(self.implied_block_type),
            Some(AttributeValue::Text(text)) => BlockType::parse(text),
            Some(_) => Err(missing_attribute(standard_names::BLOCK_TYPE)),
        }
    }

    /// The tiling of this part, required for tiled parts and ignored otherwise.
    pub fn tiles(&self) -> Result<Option<TileDescription>> {
        if !self.block_type()?.has_tiles() {
            return Ok(None);
        }

        match self.required(standard_names::TILES)? {
            AttributeValue::TileDescription(tiles) => Ok(Some(*tiles)),
            _ => Err(missing_attribute(standard_names::TILES)),
        }
    }

    /// The channels of this part, in file order.
    pub fn channels(&self) -> Result<&ChannelList> {
        match self.required(standard_names::CHANNELS)? {
            AttributeValue::ChannelList(channels) => Ok(channels),
            _ => Err(missing_attribute(standard_names::CHANNELS)),
        }
    }

    /// How the chunks of this part are compressed.
    pub fn compression(&self) -> Result<Compression> {
        match self.required(standard_names::COMPRESSION)? {
            AttributeValue::Compression(compression) => Ok(*compression),
            _ => Err(missing_attribute(standard_names::COMPRESSION)),
        }
    }

    /// The projection of this environment map, if this part is one.
    pub fn environment_map(&self) -> Result<Option<EnvironmentMap>> {
        match self.optional(standard_names::ENVIRONMENT_MAP)? {
            None => Ok(None),
            Some(AttributeValue::EnvironmentMap(map)) => Ok(Some(*map)),
            Some(_) => Err(missing_attribute(standard_names::ENVIRONMENT_MAP)),
        }
    }

    /// The name of this part. Required in multipart files.
    pub fn name(&self) -> Result<Option<&Text>> {
        match self.optional(standard_names::NAME)? {
            None => Ok(None),
            Some(AttributeValue::Text(name)) => Ok(Some(name)),
            Some(_) => Err(missing_attribute(standard_names::NAME)),
        }
    }

    /// The number of entries in the offset table of this part.
    /// Uses the `chunkCount` attribute if present, and computes the count otherwise.
    pub fn chunk_count(&self, version: &Version) -> Result<usize> {
        match self.optional(standard_names::CHUNK_COUNT)? {
            Some(AttributeValue::I32(count)) => return i32_to_usize(*count, "chunk count"),
            Some(_) => return Err(missing_attribute(standard_names::CHUNK_COUNT)),
            None if version.is_multipart() => return Err(missing_attribute(standard_names::CHUNK_COUNT)),
            None => {},
        }

        let data_size = self.data_window()?.size;
        let compression = self.compression()?;
        computed_chunk_count(compression, data_size, self.tiles()?)
    }
}

/// The pixel rectangle of a window attribute. Inverted or oversized windows are invalid.
fn rectangle(value: &AttributeValue, name: &'static str) -> Result<IntegerBounds> {
    match value {
        AttributeValue::IntegerBounds(corners) => IntegerBounds::from_corners(*corners)
            .map_err(|error| Error::invalid(format!("{} attribute ({})", name, error))),

        _ => Err(missing_attribute(name)),
    }
}
