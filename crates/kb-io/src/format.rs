use std::fmt;
use std::str::FromStr;

use crate::error::LoadError;

/// On-disk encoding of a matrix or vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FileFormat {
    /// Whitespace-delimited decimal text with a dimension header.
    #[default]
    Text,
    /// Native-endian u64 dimension header(s) followed by raw f64 values.
    Binary,
}

impl FileFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::Text => "text",
            FileFormat::Binary => "bin",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileFormat {
    type Err = LoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(FileFormat::Text),
            "bin" | "binary" => Ok(FileFormat::Binary),
            _ => Err(LoadError::UnknownFormat(s.to_string())),
        }
    }
}
