
//! Error type definitions.

use std::borrow::Cow;
use std::io::ErrorKind;
pub use std::io::Error as IoError;
pub use std::io::Result as IoResult;
use std::error;
use std::fmt;

/// A result that may contain a decoding error.
pub type Result<T> = std::result::Result<T, Error>;

/// A result that, if ok, contains nothing, and otherwise contains a decoding error.
pub type UnitResult = Result<()>;


/// An error that may happen while opening or decoding an exr file.
/// Distinguishes between malformed files, unsupported features,
/// wrong usage of the api, and io errors.
#[derive(Debug)]
pub enum Error {

    /// The contents of the file are not supported by
    /// this implementation, for example subsampled channels
    /// or deep samples.
    NotSupported(Cow<'static, str>),

    /// The contents of the file are broken,
    /// or a chunk that should be present cannot be found.
    Invalid(Cow<'static, str>),

    /// The caller requested something impossible, for example
    /// reading from a closed file or reading an empty region.
    Usage(Cow<'static, str>),

    /// The underlying byte stream could not be read successfully,
    /// probably due to file system related errors.
    Io(IoError),
}


impl Error {

    /// Create an error of the variant `Invalid`.
    pub(crate) fn invalid(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Invalid(message.into())
    }

    /// Create an error of the variant `NotSupported`.
    pub(crate) fn unsupported(message: impl Into<Cow<'static, str>>) -> Self {
        Error::NotSupported(message.into())
    }

    /// Create an error of the variant `Usage`.
    pub(crate) fn usage(message: impl Into<Cow<'static, str>>) -> Self {
        Error::Usage(message.into())
    }

    /// Prefix the message of this error with the file and part it occurred in.
    /// Io errors keep their kind and only change their message.
    pub(crate) fn in_part(self, file_name: &str, part: usize) -> Self {
        self.with_context(format!("{}, part {}", file_name, part))
    }

    /// Prefix the message of this error with some context.
    pub(crate) fn with_context(self, context: impl fmt::Display) -> Self {
        match self {
            Error::NotSupported(message) => Error::NotSupported(format!("{}: {}", context, message).into()),
            Error::Invalid(message) => Error::Invalid(format!("{}: {}", context, message).into()),
            Error::Usage(message) => Error::Usage(format!("{}: {}", context, message).into()),
            Error::Io(error) => Error::Io(IoError::new(error.kind(), format!("{}: {}", context, error))),
        }
    }
}

/// Enable using the `?` operator on `std::io::Result`.
impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        if error.kind() == ErrorKind::UnexpectedEof {
            Error::invalid("reference to missing bytes")
        }
        else {
            Error::Io(error)
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(formatter),
            Error::NotSupported(message) => write!(formatter, "not supported: {}", message),
            Error::Invalid(message) => write!(formatter, "invalid: {}", message),
            Error::Usage(message) => write!(formatter, "invalid request: {}", message),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

/// Return error on invalid range.
#[inline]
pub(crate) fn i32_to_usize(value: i32, error_message: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| {
        if value < 0 { Error::invalid(error_message) }
        else { Error::unsupported(error_message) }
    })
}

/// Return error on invalid range.
#[inline]
pub(crate) fn usize_to_i32(value: usize, error_message: &'static str) -> Result<i32> {
    i32::try_from(value).map_err(|_| Error::invalid(error_message))
}

/// Return error on invalid range.
#[inline]
pub(crate) fn u64_to_usize(value: u64, error_message: &'static str) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::unsupported(error_message))
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn end_of_file_is_invalid_data(){
        let error = Error::from(IoError::new(ErrorKind::UnexpectedEof, "eof"));
        assert!(matches!(error, Error::Invalid(_)));

        let error = Error::from(IoError::new(ErrorKind::PermissionDenied, "denied"));
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn context_is_prefixed(){
        let error = Error::invalid("missing chunk").in_part("beach.exr", 2);
        assert_eq!(error.to_string(), "invalid: beach.exr, part 2: missing chunk");
    }

    #[test]
    fn negative_sizes_are_invalid(){
        assert!(matches!(i32_to_usize(-3, "width"), Err(Error::Invalid(_))));
        assert_eq!(i32_to_usize(3, "width").unwrap(), 3);
        assert!(usize_to_i32(usize::MAX, "width").is_err());
    }
}
