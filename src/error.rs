use std::error::Error as StdError;
use std::fmt;
use std::result;

/// A type alias for `Result<T, csv_tokenizer::Error>`.
pub type Result<T> = result::Result<T, Error>;

/// An error that can occur when tokenizing CSV lines.
///
/// The tokenizer performs no internal recovery: every error is raised at the
/// call that detected it. A caller that wants to resume after a malformed
/// record can call `skip_current_line` (which restores any lines consumed
/// speculatively) and then `next_record`.
#[derive(Debug)]
pub struct Error(Box<ErrorKind>);

impl Error {
    /// A crate private constructor for `Error`.
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Error(Box::new(kind))
    }

    /// A crate private constructor for configuration errors.
    pub(crate) fn config(msg: &str) -> Error {
        Error::new(ErrorKind::Config(msg.to_string()))
    }

    /// Return the specific type of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwrap this error into its underlying type.
    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns true if this error was caused by a malformed quoted field.
    ///
    /// If this is true, the underlying `ErrorKind` is guaranteed to be one
    /// of `EndOfFileInQuotedField`, `UnexpectedCharacterAfterQuote` or
    /// `QuotedFieldLengthLimitExceeded`.
    pub fn is_quotation_error(&self) -> bool {
        match *self.0 {
            ErrorKind::EndOfFileInQuotedField
            | ErrorKind::UnexpectedCharacterAfterQuote { .. }
            | ErrorKind::QuotedFieldLengthLimitExceeded { .. } => true,
            _ => false,
        }
    }
}

/// The specific type of an error.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The builder was given an inconsistent configuration.
    Config(String),
    /// `next_record` was called before the current record was drained with
    /// `next_column`. The record has more columns than the caller consumed.
    UnexpectedTrailingColumn,
    /// `next_column` was called after the current record already ended. The
    /// record has fewer columns than the caller asked for.
    MissingColumn,
    /// The input was exhausted while a quoted field was still waiting for
    /// its closing quote on a following line.
    EndOfFileInQuotedField,
    /// Something other than a delimiter, a space or the end of the line
    /// followed the closing quote of a quoted field.
    UnexpectedCharacterAfterQuote {
        /// The offending character.
        unexpected: char,
        /// The configured quote character.
        quote: char,
    },
    /// A quoted field grew past the configured maximum length.
    QuotedFieldLengthLimitExceeded {
        /// The configured maximum length, in bytes.
        limit: usize,
    },
}

impl StdError for Error {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self.0 {
            ErrorKind::Config(ref msg) => {
                write!(f, "CSV configuration error: {}", msg)
            }
            ErrorKind::UnexpectedTrailingColumn => {
                write!(f, "CSV error: record has an unexpected trailing column")
            }
            ErrorKind::MissingColumn => {
                write!(f, "CSV error: record does not have an expected column")
            }
            ErrorKind::EndOfFileInQuotedField => {
                write!(f, "CSV error: end of input reached inside a quoted field")
            }
            ErrorKind::UnexpectedCharacterAfterQuote { unexpected, quote } => {
                write!(
                    f,
                    "CSV error: unexpected extra character {:?} after a field \
                     quoted by {:?}",
                    unexpected, quote
                )
            }
            ErrorKind::QuotedFieldLengthLimitExceeded { limit } => {
                write!(
                    f,
                    "CSV error: the length of a quoted field exceeds the \
                     limit ({})",
                    limit
                )
            }
        }
    }
}
