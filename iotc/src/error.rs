use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SdkError {
    #[error("failed to load vendor library {path:?}: {source}")]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("vendor library not found in any of {searched:?}")]
    LibraryNotFound { searched: Vec<PathBuf> },
}
