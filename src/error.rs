use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("couldn't parse meta.yaml: {0}")]
    ParseFailure(String),

    #[error("missing meta.yaml key: {0}")]
    MissingField(String),

    #[error("couldn't find package in the index: {0}")]
    LookupFailed(String),

    #[error("couldn't get SHA from the index for {package} {version}")]
    ChecksumUnavailable { package: String, version: String },

    #[error("couldn't apply patch: {0}")]
    PatchRejected(String),

    #[error("fork synchronization failed: {0}")]
    ForkSyncFailed(String),

    #[error("remote push rejected: {0}")]
    PushRejected(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("hosting API error: {0}")]
    Api(String),

    #[error("re-render failed: {0}")]
    RenderFailed(String),
}

pub type Result<T> = std::result::Result<T, Error>;
