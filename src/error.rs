use std::path::PathBuf;

/// Fatal conditions that abort a parse call. No partial document survives any of them.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The first paragraph is not a `day month-name year` line.
    #[error("couldn't match date in {line:?}")]
    Date { line: String },

    /// The text-extraction program could not be started at all.
    #[error("failed to launch converter {program}: {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },

    /// The text-extraction program ran but did not exit cleanly.
    #[error("could not convert {path:?} ({output})")]
    Conversion { path: PathBuf, output: String },

    #[error("failed to serialize document: {0}")]
    Xml(String),

    #[error("invalid run report {path:?}: {source}")]
    Report {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, ParseError>;

impl ParseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
