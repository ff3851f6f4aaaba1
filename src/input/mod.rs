
//! Open an exr file and decode any region of any part and mip level.
//!
//! Parts are parsed lazily, on first access, and are immutable afterwards.
//! All read methods take `&self` and do not use the cursor,
//! so one open `ExrInput` can be shared between threads.

pub mod channels;
pub mod part;
pub mod levels;
pub mod fill;
pub mod pipeline;
pub mod read;
pub mod options;

use std::ops::Range;
use std::path::Path;
use std::sync::{Arc, Mutex};
use crate::io::{ByteSource, FileSource, SourceCursor};
use crate::meta::{is_exr, MetaData, Version};
use crate::spec::ImageSpec;
use crate::error::*;
use self::part::{LazyPart, PartInfo};
use self::read::PartReader;
use self::options::{MissingColor, OpenOptions};


/// The file extensions of exr files.
pub const EXTENSIONS: [&str; 3] = [ "exr", "sxr", "mxr" ];

/// The name of the format, as used by the host.
pub fn format_name() -> &'static str {
    "openexr"
}

/// Whether this reader supports an optional feature of the host.
/// Known features are `arbitrary_metadata`, `exif`, `iptc` and `ioproxy`.
pub fn supports(feature: &str) -> bool {
    matches!(feature, "arbitrary_metadata" | "exif" | "iptc" | "ioproxy")
}


/// Decodes the parts, mip levels, scan lines and tiles of one exr file.
#[derive(Debug, Default)]
pub struct ExrInput {
    file: Option<OpenFile>,
    cursor: Option<Cursor>,
}

/// The state of an open file. Exists from `open` until `close`.
#[derive(Debug)]
struct OpenFile {
    source: Arc<dyn ByteSource>,
    meta: MetaData,
    parts: Vec<LazyPart>,

    /// Held only while a part is being parsed.
    parse_lock: Mutex<()>,

    missing_color: Vec<f32>,
}

/// The subimage and mip level that were most recently sought.
#[derive(Debug, Clone)]
struct Cursor {
    subimage: usize,
    miplevel: usize,
    spec: ImageSpec,
}


impl ExrInput {

    /// A reader without an open file.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the file at the path starts like an exr file with a supported version.
    /// Does not parse any headers.
    pub fn valid_file(path: impl AsRef<Path>) -> bool {
        FileSource::open(path).map_or(false, |source| Self::valid_source(&source))
    }

    /// Whether the bytes start like an exr file with a supported version.
    pub fn valid_source(source: &dyn ByteSource) -> bool {
        let mut read = SourceCursor::new(source);

        is_exr(&mut read).unwrap_or(false) && Version::read(&mut read).is_ok()
    }

    /// Open a file and seek to the first level of the first part.
    /// Returns the spec of that level.
    /// Closes any previously opened file. If opening fails, no file is open afterwards.
    pub fn open(&mut self, name: &str, options: &OpenOptions) -> Result<ImageSpec> {
        self.close();

        let result = Self::open_file(name, options).and_then(|file| {
            self.file = Some(file);
            self.seek_subimage(0, 0)?;
            self.current_spec().cloned().ok_or_else(|| Error::usage("no subimage sought"))
        });

        result.map_err(|error| {
            tracing::error!(file = name, %error, "cannot open file");
            self.close();
            error
        })
    }

    fn open_file(name: &str, options: &OpenOptions) -> Result<OpenFile> {
        let missing_color = options.missing_color.as_ref()
            .map(MissingColor::components).transpose()?
            .unwrap_or_default();

        let source: Arc<dyn ByteSource> = match &options.source {
            Some(source) => Arc::clone(source),
            None => Arc::new(FileSource::open(name).map_err(|error| Error::from(error).with_context(name))?),
        };

        let meta = MetaData::read_from_source(source.as_ref())
            .map_err(|error| error.with_context(source.file_name()))?;

        if meta.headers.is_empty() {
            return Err(Error::invalid("file contains no parts").with_context(source.file_name()));
        }

        Ok(OpenFile {
            parts: meta.headers.iter().map(|_| LazyPart::default()).collect(),
            parse_lock: Mutex::new(()),
            source, meta, missing_color,
        })
    }

    /// Release the file. Afterwards, all queries fail until another file is opened.
    pub fn close(&mut self) {
        self.file = None;
        self.cursor = None;
    }

    /// Whether a file is open.
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn file(&self) -> Result<&OpenFile> {
        self.file.as_ref().ok_or_else(|| Error::usage("called without an open file"))
    }

    /// The number of parts in the open file, or zero without an open file.
    pub fn subimage_count(&self) -> usize {
        self.file.as_ref().map_or(0, |file| file.parts.len())
    }

    /// The parsed header of a part. Parses the header on first access.
    fn part(&self, subimage: usize) -> Result<&PartInfo> {
        let file = self.file()?;
        let file_name = file.source.file_name();

        let lazy = file.parts.get(subimage).ok_or_else(|| Error::usage(format!(
            "subimage {} does not exist, the file has {} subimages", subimage, file.parts.len()
        )))?;

        lazy.get_or_parse(&file.parse_lock, || PartInfo::parse(&file.meta, subimage, file_name))
            .map_err(|error| {
                tracing::error!(file = file_name, part = subimage, %error, "cannot parse part header");
                error.in_part(file_name, subimage)
            })
    }

    /// The number of mip levels of a part. One for parts without levels.
    pub fn miplevel_count(&self, subimage: usize) -> Result<usize> {
        Ok(self.part(subimage)?.level_count)
    }

    /// The spec of a level of a part, including all attributes.
    pub fn spec(&self, subimage: usize, miplevel: usize) -> Result<ImageSpec> {
        let part = self.part(subimage)?;
        let mut spec = part.spec.clone();
        self.level_geometry(part, subimage, miplevel, &mut spec)?;
        Ok(spec)
    }

    /// The spec of a level of a part, without any attributes.
    pub fn spec_dimensions(&self, subimage: usize, miplevel: usize) -> Result<ImageSpec> {
        let part = self.part(subimage)?;
        let mut spec = part.spec.dimensions();
        self.level_geometry(part, subimage, miplevel, &mut spec)?;
        Ok(spec)
    }

    fn level_geometry(&self, part: &PartInfo, subimage: usize, miplevel: usize, spec: &mut ImageSpec) -> UnitResult {
        part.apply_mip_level(miplevel, spec).map_err(|error| self.report(error, subimage))
    }

    /// Move the cursor to a level of a part.
    /// If this fails, the cursor is not positioned anywhere.
    pub fn seek_subimage(&mut self, subimage: usize, miplevel: usize) -> UnitResult {
        self.cursor = None;

        let spec = self.spec(subimage, miplevel)?;
        self.cursor = Some(Cursor { subimage, miplevel, spec });
        Ok(())
    }

    /// The part of the cursor.
    pub fn current_subimage(&self) -> Option<usize> {
        self.cursor.as_ref().map(|cursor| cursor.subimage)
    }

    /// The mip level of the cursor.
    pub fn current_miplevel(&self) -> Option<usize> {
        self.cursor.as_ref().map(|cursor| cursor.miplevel)
    }

    /// The spec of the level of the cursor.
    pub fn current_spec(&self) -> Option<&ImageSpec> {
        self.cursor.as_ref().map(|cursor| &cursor.spec)
    }

    /// Add the file and part to an error that leaves a read method.
    fn report(&self, error: Error, subimage: usize) -> Error {
        let file_name = self.file.as_ref().map_or("", |file| file.source.file_name());
        tracing::error!(file = file_name, part = subimage, %error, "read failed");
        error.in_part(file_name, subimage)
    }

    /// Everything needed to decode pixels of a level of a flat part.
    fn reader(&self, subimage: usize, miplevel: usize) -> Result<PartReader<'_>> {
        let file = self.file()?;
        let part = self.part(subimage)?;

        if part.spec.deep {
            return Err(self.report(Error::unsupported("flat reads of deep data"), subimage));
        }

        part.validate_mip_level(miplevel).map_err(|error| self.report(error, subimage))?;

        let offset_table = file.meta.offset_tables.get(subimage)
            .ok_or_else(|| Error::invalid("missing offset table"))?;

        Ok(PartReader {
            source: file.source.as_ref(),
            part, part_index: subimage,
            offset_table,
            multipart: file.meta.version.is_multipart(),
            missing_color: &file.missing_color,
        })
    }

    /// Decode all channels of a single scan line.
    pub fn read_scanline(&self, subimage: usize, miplevel: usize, y: i32, destination: &mut [u8]) -> UnitResult {
        let channel_count = self.part(subimage)?.spec.channel_count();
        self.read_scanlines(subimage, miplevel, y .. y.saturating_add(1), 0 .. channel_count, destination)
    }

    /// Decode the channels `channels` of the scan lines `lines`.
    /// The destination receives the lines one after another, with interleaved samples
    /// of only the requested channels, in native byte order.
    pub fn read_scanlines(
        &self, subimage: usize, miplevel: usize, lines: Range<i32>,
        channels: Range<usize>, destination: &mut [u8]
    ) -> UnitResult
    {
        self.reader(subimage, miplevel)?
            .read_scan_lines(lines, channels, destination)
            .map_err(|error| self.report(error, subimage))
    }

    /// Decode all channels of the tile that starts at the pixel `(x, y)`.
    /// The destination must have room for a full tile.
    pub fn read_tile(&self, subimage: usize, miplevel: usize, x: i32, y: i32, destination: &mut [u8]) -> UnitResult {
        self.reader(subimage, miplevel)?
            .read_tile(miplevel, x, y, destination)
            .map_err(|error| self.report(error, subimage))
    }

    /// Decode the channels `channels` of all tiles in the region.
    /// See `PartReader::read_tiles` for the layout of the destination.
    pub fn read_tiles(
        &self, subimage: usize, miplevel: usize, xs: Range<i32>, ys: Range<i32>,
        channels: Range<usize>, destination: &mut [u8]
    ) -> UnitResult
    {
        self.reader(subimage, miplevel)?
            .read_tiles(miplevel, xs, ys, channels, destination)
            .map_err(|error| self.report(error, subimage))
    }

    /// Deep samples cannot be decoded yet.
    pub fn read_deep_scanlines(&self, subimage: usize, _miplevel: usize, _lines: Range<i32>, _channels: Range<usize>) -> UnitResult {
        self.part(subimage)?;
        Err(self.report(Error::unsupported("deep sample decoding is not implemented"), subimage))
    }

    /// Deep samples cannot be decoded yet.
    pub fn read_deep_tiles(
        &self, subimage: usize, _miplevel: usize, _xs: Range<i32>, _ys: Range<i32>, _channels: Range<usize>
    ) -> UnitResult
    {
        self.part(subimage)?;
        Err(self.report(Error::unsupported("deep sample decoding is not implemented"), subimage))
    }
}
