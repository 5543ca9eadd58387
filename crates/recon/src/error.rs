use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (duplicate channel, empty alias list, etc.).
    ConfigValidation(String),
    /// An expected input is absent (no file, no table).
    MissingSource { source: String, detail: String },
    /// None of the accepted identifier column aliases are present.
    SchemaMismatch { source: String, expected: Vec<String>, found: Vec<String> },
    /// Input references a channel the config does not declare.
    UnknownChannel(String),
    /// IO error (file read, etc.).
    Io(String),
}

impl ReconError {
    /// Missing and mismatched sources degrade to an empty contribution.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingSource { .. } | Self::SchemaMismatch { .. })
    }
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingSource { source, detail } => {
                write!(f, "source '{source}': missing input ({detail})")
            }
            Self::SchemaMismatch { source, expected, found } => write!(
                f,
                "source '{source}': no identifier column (expected one of [{}], found [{}])",
                expected.join(", "),
                found.join(", ")
            ),
            Self::UnknownChannel(key) => write!(f, "unknown channel: {key}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}
