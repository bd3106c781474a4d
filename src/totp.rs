//! RFC 6238 code derivation and window arithmetic.

use std::time::Duration;

use totp_rs::{Secret, TOTP};

use crate::error::GauthError;
use crate::key::{Algorithm, normalize_secret};

/// Code for the window containing `timestamp` (seconds since the epoch).
pub fn compute(
    secret: &str,
    period: u64,
    digits: usize,
    algorithm: Algorithm,
    timestamp: u64,
) -> Result<String, GauthError> {
    if period == 0 {
        return Err(GauthError::InvalidParameter(
            "period must be at least one second".to_string(),
        ));
    }

    let secret_bytes = decode_secret(secret)?;

    // unchecked: 80-bit secrets (GitHub and friends) are below the
    // 128-bit minimum the checked constructor enforces
    let totp = TOTP::new_unchecked(algorithm.into(), digits, 1, period, secret_bytes);

    Ok(totp.generate(timestamp))
}

pub fn decode_secret(secret: &str) -> Result<Vec<u8>, GauthError> {
    let bytes = Secret::Encoded(normalize_secret(secret))
        .to_bytes()
        .map_err(|_| GauthError::InvalidSecret("not a valid base32 string".to_string()))?;

    if bytes.is_empty() {
        return Err(GauthError::InvalidSecret(
            "secret decoded to an empty byte string".to_string(),
        ));
    }

    Ok(bytes)
}

/// Whole seconds until the window containing `timestamp` rolls over.
/// Exactly on a boundary this is the full `period`.
pub fn validity_remaining(period: u64, timestamp: u64) -> u64 {
    period - timestamp % period
}

/// Millisecond-precise counterpart of [`validity_remaining`].
pub fn until_rollover(period: u64, now: Duration) -> Duration {
    let period_ms = period.saturating_mul(1000).max(1);
    let now_ms = u64::try_from(now.as_millis()).unwrap_or(u64::MAX);
    Duration::from_millis(period_ms - now_ms % period_ms)
}
