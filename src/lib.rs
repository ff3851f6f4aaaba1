
//! Random-access decoding of OpenEXR files for image hosts.
//!
//! Opens a file, presents each part as a subimage with mip levels,
//! and decodes arbitrary scan line and tile regions of any subimage
//! into caller buffers, from many threads at once.
//!
//! ```no_run
//! use exr_input::prelude::*;
//!
//! let mut input = ExrInput::new();
//! let spec = input.open("beach.exr", &OpenOptions::new().missing_color("-1"))?;
//!
//! let mut pixels = vec![ 0_u8; spec.height * spec.scan_line_bytes(0 .. spec.channel_count()) ];
//! let lines = spec.y .. spec.y + spec.height as i32;
//! input.read_scanlines(0, 0, lines, 0 .. spec.channel_count(), &mut pixels)?;
//! # Ok::<(), exr_input::error::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

#[macro_use]
extern crate smallvec;

pub mod io;
pub mod math;
pub mod error;
pub mod meta;
pub mod compression;
pub mod block;
pub mod spec;
pub mod input;


/// Re-exports of the types needed to open files and decode pixels.
pub mod prelude {

    // main exports
    pub use crate::input::{ExrInput, EXTENSIONS, format_name, supports};
    pub use crate::input::options::{OpenOptions, MissingColor};
    pub use crate::spec::{ImageSpec, Attributes, ParamValue};

    // byte sources
    pub use crate::io::{ByteSource, FileSource, MemorySource};

    // secondary data types
    pub use crate::meta::attribute::SampleType;
    pub use crate::error::{Error, Result, UnitResult};

    // re-export external stuff
    pub use half::f16;
}
