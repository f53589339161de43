//! Error types for description parsing and archive inspection.

use thiserror::Error;

/// Errors produced while tokenizing or parsing libconfig text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    /// A character that cannot start any token
    #[error("line {line}: unexpected character '{ch}'")]
    UnexpectedChar { line: usize, ch: char },

    /// String literal without closing quote
    #[error("line {line}: unterminated string")]
    UnterminatedString { line: usize },

    /// Block comment without closing `*/`
    #[error("line {line}: unterminated comment")]
    UnterminatedComment { line: usize },

    /// Unknown or malformed escape sequence in a string
    #[error("line {line}: invalid escape sequence '\\{escape}'")]
    InvalidEscape { line: usize, escape: String },

    /// Numeric literal that does not fit its type
    #[error("line {line}: invalid number '{text}'")]
    InvalidNumber { line: usize, text: String },

    /// Token that does not fit the grammar at this point
    #[error("line {line}: expected {expected}, found {found}")]
    UnexpectedToken {
        line: usize,
        expected: String,
        found: String,
    },

    /// Two members of the same group share a name
    #[error("line {line}: duplicate setting '{name}'")]
    DuplicateSetting { line: usize, name: String },

    /// Array elements of different scalar types
    #[error("line {line}: array elements must be scalars of the same type")]
    MixedArray { line: usize },

    /// `@include` directives are not resolved
    #[error("line {line}: @include is not supported")]
    IncludeUnsupported { line: usize },

    /// Aggregates nested deeper than the parser accepts
    #[error("line {line}: nesting deeper than {max} levels")]
    TooDeep { line: usize, max: usize },
}

impl ParseError {
    /// Line the error was detected on (1-indexed).
    pub fn line(&self) -> usize {
        match self {
            ParseError::UnexpectedChar { line, .. }
            | ParseError::UnterminatedString { line }
            | ParseError::UnterminatedComment { line }
            | ParseError::InvalidEscape { line, .. }
            | ParseError::InvalidNumber { line, .. }
            | ParseError::UnexpectedToken { line, .. }
            | ParseError::DuplicateSetting { line, .. }
            | ParseError::MixedArray { line }
            | ParseError::IncludeUnsupported { line }
            | ParseError::TooDeep { line, .. } => *line,
        }
    }
}

/// Errors interpreting a parsed configuration as an update description.
#[derive(Debug, Error)]
pub enum DescriptionError {
    /// libconfig syntax error
    #[error("sw-description: {0}")]
    Parse(#[from] ParseError),

    /// None of the candidate roots exist
    #[error("no description root found (tried: {})", tried.join(", "))]
    NoRoot { tried: Vec<String> },

    /// Required field absent
    #[error("missing required field '{field}' in {path}")]
    MissingField { path: String, field: String },

    /// Software set given without running mode, or the opposite
    #[error("software set and running mode must be given together")]
    IncompleteSelection,

    /// A `ref` value that cannot be resolved to a node path
    #[error("invalid reference '{reference}': {reason}")]
    BadReference { reference: String, reason: String },

    /// An entry of images/files/scripts/bootenv has the wrong shape
    #[error("{section}[{index}]: {message}")]
    InvalidEntry {
        section: String,
        index: usize,
        message: String,
    },

    /// Hardware-compatibility entry with an invalid `#RE:` pattern
    #[error("invalid hardware-compatibility pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Malformed board revision string
    #[error("invalid hardware revision '{0}', expected \"<board> <revision>\"")]
    InvalidRevision(String),
}

/// Errors reading a `.swu` cpio archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Header does not start with a newc/crc magic
    #[error("bad cpio magic at offset {offset}")]
    BadMagic { offset: u64 },

    /// Archive ends inside a header or member
    #[error("archive truncated at offset {offset}")]
    Truncated { offset: u64 },

    /// Non-hex characters in a header field
    #[error("invalid header field '{field}' at offset {offset}")]
    InvalidHeader { field: &'static str, offset: u64 },

    /// Member name lacks its terminating NUL or is not UTF-8
    #[error("invalid member name at offset {offset}")]
    InvalidName { offset: u64 },

    /// crc-format member whose byte sum does not match the header
    #[error("checksum mismatch for '{name}': header {expected:#010x}, computed {actual:#010x}")]
    ChecksumMismatch {
        name: String,
        expected: u32,
        actual: u32,
    },

    /// First member is not `sw-description`
    #[error("first archive member must be sw-description, found {found:?}")]
    MissingDescription { found: Option<String> },

    /// sw-description larger than any sane description
    #[error("sw-description is {size} bytes, the limit is {max}")]
    DescriptionTooLarge { size: u64, max: u64 },

    /// sw-description is not valid UTF-8
    #[error("sw-description is not valid UTF-8")]
    DescriptionEncoding,
}

/// Errors that can occur when inspecting an update image.
#[derive(Debug, Error)]
pub enum Error {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Archive structure error
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Description content error
    #[error(transparent)]
    Description(#[from] DescriptionError),
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Description(DescriptionError::Parse(e))
    }
}

/// Result type for image inspection.
pub type Result<T> = std::result::Result<T, Error>;
