//! Error types for text-map extraction, merging and projection.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the text-map pipeline.
///
/// Every variant is fatal: the pipeline never catches, retries or skips.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read or write a file.
    #[error("Failed to access file: {0}")]
    IoError(#[from] std::io::Error),

    /// The input is not valid JSON or does not fit the expected types.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// The text map is missing a required top-level field or has the wrong shape.
    #[error("Invalid text map: {0}")]
    InvalidTextMap(String),

    /// The declared `entry_count` disagrees with the number of entries.
    #[error("entry_count does not match actual number of entries: declared {declared}, found {actual}")]
    EntryCountMismatch { declared: usize, actual: usize },

    /// The translated values array and the entry list differ in length.
    #[error("translated array must match entries length; {entries} entries != {values} translated items")]
    ValueCountMismatch { entries: usize, values: usize },

    /// A translated value is not a JSON string (1-based position).
    #[error("translated value {index} must be a string")]
    NonStringValue { index: usize },

    /// Text holds a character that XML 1.0 cannot represent.
    #[error("text contains character U+{code:04X} at offset {offset}, which XML cannot store")]
    InvalidText { code: u32, offset: usize },

    /// An entry names a container kind outside the known set.
    #[error("Unsupported container type: {0}")]
    UnsupportedContainer(String),

    /// An address does not resolve against the target document.
    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    /// A chart shape is backed by a different part than the entry recorded.
    #[error("Chart part mismatch: entry expects '{expected}', shape is backed by '{actual}'")]
    ChartPartMismatch { expected: String, actual: String },

    /// An error raised while handling a specific entry (1-based position).
    #[error("entry {index}: {source}")]
    Entry {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    /// The file format is not supported or could not be detected.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// Invalid or corrupted package structure.
    #[error("Invalid or corrupted file: {0}")]
    CorruptedFile(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing or writing error (for PPTX).
    #[error("XML error: {0}")]
    XmlError(String),

    /// An extracted address failed to resolve back to the node it was built from.
    #[error("Address drift: {0}")]
    AddressDrift(String),
}

impl Error {
    /// Attach the 1-based entry position to an error.
    pub fn at_entry(self, index: usize) -> Self {
        Error::Entry {
            index,
            source: Box::new(self),
        }
    }

    /// Shorthand for a structural mismatch with a formatted message.
    pub fn mismatch(message: impl Into<String>) -> Self {
        Error::StructuralMismatch(message.into())
    }
}
