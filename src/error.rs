use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GauthError {
    /// Secret is not valid base32 or decodes to nothing
    #[error("invalid authenticator key: {0}")]
    InvalidSecret(String),

    #[error("malformed key URI: {0}")]
    MalformedUri(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("unsupported file extension for {}, expected .txt, .yml or .yaml", path.display())]
    UnsupportedFileExtension { path: PathBuf },

    #[error("cannot access key store {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Qr(#[from] QrError),

    #[error("{0}")]
    Usage(String),
}

/// Failures of the QR image collaborator. `NotFound` is reported
/// differently from the others.
#[derive(Error, Debug)]
pub enum QrError {
    #[error("image does not contain a QR code")]
    NotFound,

    #[error("could not decode QR code: {0}")]
    Decode(String),

    #[error("cannot read image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub(crate) fn malformed(reason: impl Into<String>) -> GauthError {
    GauthError::MalformedUri(reason.into())
}
