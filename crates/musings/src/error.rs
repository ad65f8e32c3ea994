use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MusingsError {
    #[error("IO error while {context} {path}: {source}")]
    IoAt {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error in {path}: {message}")]
    TomlParse { path: PathBuf, message: String },

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Theme not found: {name}")]
    ThemeNotFound { name: String },

    #[error("Directory walk error in {path}: {message}")]
    WalkDir { path: PathBuf, message: String },

    #[error("Error loading post {path}: {source}")]
    Post {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, MusingsError>;

/// Attaches the failing operation and path to an [`std::io::Error`].
pub trait IoContext<T> {
    fn io_context(self, context: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, context: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| MusingsError::IoAt {
            context,
            path: path.to_path_buf(),
            source,
        })
    }
}
