use std::path::Path;

use rqrr::PreparedImage;
use tracing::debug;

use crate::error::{GauthError, QrError};
use crate::key::TotpKey;
use crate::uri;

/// Text payload of the first QR code found in the image at `path`.
pub fn decode_file(path: &Path) -> Result<String, QrError> {
    let img = image::open(path)
        .map_err(|source| QrError::Image {
            path: path.to_path_buf(),
            source,
        })?
        .to_luma8();

    let mut img = PreparedImage::prepare(img);
    let grids = img.detect_grids();
    debug!(path = %path.display(), grids = grids.len(), "scanned image for QR codes");

    let grid = grids.first().ok_or(QrError::NotFound)?;
    let (_meta, payload) = grid.decode().map_err(|e| QrError::Decode(e.to_string()))?;

    Ok(payload)
}

pub fn key_from_image(path: &Path) -> Result<TotpKey, GauthError> {
    let payload = decode_file(path)?;
    uri::parse(&payload)
}
