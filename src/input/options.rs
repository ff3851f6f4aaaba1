
//! Configuration hints that are accepted when opening a file.

use std::sync::Arc;
use crate::io::ByteSource;
use crate::error::*;


/// The color that replaces pixels of chunks that cannot be decoded.
/// A negative first component draws diagonal stripes instead of a flat color.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingColor {

    /// Numbers separated by commas, semicolons or whitespace, for example `"-1, 0, 0"`.
    Text(String),

    /// One number per channel. The last number is repeated for any further channels.
    Values(Vec<f32>),
}

impl MissingColor {

    /// The numeric components of the color.
    /// Fails if the text contains anything but numbers and separators.
    pub fn components(&self) -> Result<Vec<f32>> {
        match self {
            MissingColor::Values(values) => Ok(values.clone()),

            MissingColor::Text(text) => text
                .split(|character: char| character == ',' || character == ';' || character.is_whitespace())
                .filter(|token| !token.is_empty())
                .map(|token| token.parse::<f32>().map_err(|_| Error::usage(format!(
                    "missing color component `{}` is not a number", token
                ))))
                .collect(),
        }
    }
}

impl From<Vec<f32>> for MissingColor {
    fn from(values: Vec<f32>) -> Self { MissingColor::Values(values) }
}

impl From<&str> for MissingColor {
    fn from(text: &str) -> Self { MissingColor::Text(text.to_string()) }
}


/// Specify how to open a file.
///
/// ```
/// use exr_input::prelude::*;
/// let options = OpenOptions::new().missing_color("1, 0, 0");
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    pub(crate) source: Option<Arc<dyn ByteSource>>,
    pub(crate) missing_color: Option<MissingColor>,
}

impl OpenOptions {

    /// Open the file by its name, and fail on any chunk that cannot be decoded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the bytes from this source instead of opening the file by its name.
    /// The name is then only used in diagnostics.
    pub fn source(self, source: Arc<dyn ByteSource>) -> Self {
        OpenOptions { source: Some(source), ..self }
    }

    /// Replace undecodable chunks with this color instead of failing.
    pub fn missing_color(self, color: impl Into<MissingColor>) -> Self {
        OpenOptions { missing_color: Some(color.into()), ..self }
    }
}
