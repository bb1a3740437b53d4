use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    // Name construction.
    #[error("name: empty label")]
    ErrEmptyLabel,
    #[error("name: label exceeds 63 octets")]
    ErrLabelTooLong,
    #[error("name: encoded form exceeds 255 octets")]
    ErrNameTooLong,

    // Message decoding.
    #[error("message: unexpected end of input")]
    ErrShortBuffer,
    #[error("name: reserved label type")]
    ErrReservedLabelType,
    #[error("name: compression pointer out of range")]
    ErrInvalidPointer,
    #[error("name: too many compression pointers")]
    ErrTooManyPointers,
    #[error("record: rdata length mismatch")]
    ErrBadRDataLength,
    #[error("record: rdata exceeds 65535 octets")]
    ErrRDataTooLong,
    #[error("message: invalid utf-8 in character string")]
    ErrInvalidString,
    #[error("string: exceeds 255 octets")]
    ErrStringTooLong,
    #[error("question: unsupported type")]
    ErrUnsupportedQuestionType,

    // Message encoding.
    #[error("too many questions")]
    ErrTooManyQuestions,
    #[error("too many answers")]
    ErrTooManyAnswers,
    #[error("too many authorities")]
    ErrTooManyAuthorities,
    #[error("too many additionals")]
    ErrTooManyAdditionals,

    // Browser / advertiser preconditions.
    #[error("not started")]
    ErrNotStarted,
    #[error("transport: closed")]
    ErrTransportClosed,
    #[error("service: port is required")]
    ErrMissingPort,
    #[error("service: not registered")]
    ErrServiceNotFound,

    // Reserved for callers that wrap queries in a deadline; the codecs and
    // actors never produce it themselves.
    #[error("i/o timeout")]
    ErrTimeout,

    #[error("io error: {0}")]
    Io(#[from] IoError),
    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}
