use crate::error::GauthError;
use crate::{totp, uri};

pub const DEFAULT_NAME: &str = "Secret";
pub const DEFAULT_DIGITS: usize = 6;
pub const DEFAULT_PERIOD: u64 = 30;
pub const DIGITS_RANGE: std::ops::RangeInclusive<usize> = 6..=8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Algorithm {
    #[default]
    Sha1,
    Sha256,
    Sha512,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Sha1 => "SHA1",
            Algorithm::Sha256 => "SHA256",
            Algorithm::Sha512 => "SHA512",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "SHA1" => Some(Algorithm::Sha1),
            "SHA256" => Some(Algorithm::Sha256),
            "SHA512" => Some(Algorithm::Sha512),
            _ => None,
        }
    }
}

impl From<Algorithm> for totp_rs::Algorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Sha1 => totp_rs::Algorithm::SHA1,
            Algorithm::Sha256 => totp_rs::Algorithm::SHA256,
            Algorithm::Sha512 => totp_rs::Algorithm::SHA512,
        }
    }
}

/// A shared secret plus the metadata needed to display its codes.
///
/// Two keys are duplicates when their (normalised) secrets match, whatever
/// their labels say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TotpKey {
    pub secret: String,
    pub name: String,
    pub issuer: Option<String>,
    pub digits: usize,
    pub period: u64,
    pub algorithm: Algorithm,
}

impl TotpKey {
    /// Key with default label and format. Fails when `secret` is not base32.
    pub fn new(secret: &str) -> Result<Self, GauthError> {
        let secret = normalize_secret(secret);
        totp::decode_secret(&secret)?;

        Ok(TotpKey {
            secret,
            name: DEFAULT_NAME.to_string(),
            issuer: None,
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
            algorithm: Algorithm::default(),
        })
    }

    /// Accepts what a user types after `--key`: a bare base32 secret, or a
    /// whole `otpauth://` URI.
    pub fn from_input(raw: &str, digits: usize, period: u64) -> Result<Self, GauthError> {
        let raw = raw.trim();
        if raw.starts_with(uri::SCHEME_PREFIX) {
            return uri::parse(raw);
        }

        Ok(TotpKey::new(raw)?.with_format(digits, period))
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = if name.is_empty() {
            DEFAULT_NAME.to_string()
        } else {
            name.to_string()
        };
        self
    }

    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer.filter(|i| !i.is_empty());
        self
    }

    pub fn with_format(mut self, digits: usize, period: u64) -> Self {
        self.digits = digits;
        self.period = period;
        self
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn has_secret(&self, secret: &str) -> bool {
        self.secret == normalize_secret(secret)
    }

    pub fn code_at(&self, timestamp: u64) -> Result<String, GauthError> {
        totp::compute(
            &self.secret,
            self.period,
            self.digits,
            self.algorithm,
            timestamp,
        )
    }
}

/// Strips whitespace and `=` padding and upper-cases, so secrets copied
/// from different authenticators compare equal.
pub fn normalize_secret(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .collect::<String>()
        .to_uppercase()
}
