use std::path::PathBuf;

use thiserror::Error;

/// Ingestion and report-writing failures. Any of these ends the run.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: unsupported file type (expected .csv, .xlsx, .xls or .ods)", path.display())]
    UnsupportedExtension { path: PathBuf },
    #[error("{}: {message}", path.display())]
    Workbook { path: PathBuf, message: String },
    #[error("{file}: {source}")]
    Csv {
        file: String,
        #[source]
        source: csv::Error,
    },
    #[error("{file}: missing column '{column}'")]
    MissingColumn { file: String, column: String },
    #[error("{file} row {row}: {message}")]
    Malformed { file: String, row: usize, message: String },
    #[error("{file}: {message}")]
    Netlist { file: String, message: String },
    #[error("{file}: label sheets need side, layer and region")]
    Unlocated { file: String },
    #[error("no parser registered for {kind} inputs")]
    NoParser { kind: String },
    #[error("expected {expected}, parser produced {found}")]
    UnexpectedInput {
        expected: &'static str,
        found: &'static str,
    },
}

impl IoError {
    /// Malformed content, as opposed to a filesystem failure.
    pub fn is_parse(&self) -> bool {
        !matches!(
            self,
            Self::Read { .. }
                | Self::Write { .. }
                | Self::NoParser { .. }
                | Self::UnexpectedInput { .. }
        )
    }

    pub(crate) fn malformed(file: &str, row: usize, message: impl Into<String>) -> Self {
        Self::Malformed {
            file: file.to_string(),
            row,
            message: message.into(),
        }
    }
}
