use std::fmt;

/// Ambient failures: font loading and input parsing. The layout engine and
/// snapshot renderer themselves never error; they degrade per block.
#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    Json(serde_json::Error),
    FontParse(ttf_parser::FaceParsingError),
    FontNotFound(String),
    Input(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "io error: {e}"),
            Error::Json(e) => write!(f, "invalid json: {e}"),
            Error::FontParse(e) => write!(f, "could not parse font: {e}"),
            Error::FontNotFound(family) => write!(f, "font not found: {family}"),
            Error::Input(msg) => write!(f, "invalid input: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Json(e) => Some(e),
            Error::FontParse(e) => Some(e),
            Error::FontNotFound(_) | Error::Input(_) => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl From<ttf_parser::FaceParsingError> for Error {
    fn from(e: ttf_parser::FaceParsingError) -> Self {
        Error::FontParse(e)
    }
}
