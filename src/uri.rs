//! `otpauth://totp/...` key URIs, the format used by QR payloads and by
//! every line of a store file.

use url::{Url, form_urlencoded};

use crate::error::{GauthError, malformed};
use crate::key::{Algorithm, DEFAULT_DIGITS, DEFAULT_PERIOD, DIGITS_RANGE, TotpKey};

pub const SCHEME: &str = "otpauth";
pub const SCHEME_PREFIX: &str = "otpauth://";

pub fn parse(uri: &str) -> Result<TotpKey, GauthError> {
    let url = Url::parse(uri.trim()).map_err(|e| malformed(format!("{e}")))?;

    if url.scheme() != SCHEME {
        return Err(malformed(format!("unsupported scheme '{}'", url.scheme())));
    }

    let kind = url.host_str().unwrap_or("").to_lowercase();
    if kind != "totp" {
        return Err(malformed(format!(
            "unsupported type '{kind}', only 'totp' is supported"
        )));
    }

    let mut secret: Option<String> = None;
    let mut issuer: Option<String> = None;
    let mut digits = DEFAULT_DIGITS;
    let mut period = DEFAULT_PERIOD;
    let mut algorithm = Algorithm::default();

    for (k, v) in url.query_pairs() {
        match k.as_ref() {
            "secret" => secret = Some(v.to_string()),
            "issuer" => issuer = Some(v.to_string()).filter(|i| !i.is_empty()),
            "digits" => {
                digits = v
                    .parse()
                    .map_err(|_| malformed(format!("invalid digits '{v}'")))?;
            }
            "period" => {
                period = v
                    .parse()
                    .map_err(|_| malformed(format!("invalid period '{v}'")))?;
            }
            "algorithm" => {
                algorithm = Algorithm::parse(&v)
                    .ok_or_else(|| malformed(format!("unsupported algorithm '{v}'")))?;
            }
            _ => {}
        }
    }

    let secret = secret.ok_or_else(|| malformed("missing 'secret' parameter"))?;
    if !DIGITS_RANGE.contains(&digits) {
        return Err(malformed(format!("unsupported digits '{digits}', expected 6-8")));
    }
    if period == 0 {
        return Err(malformed("period must be at least one second"));
    }

    let (label_issuer, name) = split_label(raw_label(uri.trim()), issuer.as_deref())?;
    let issuer = match (label_issuer, issuer) {
        (Some(from_label), Some(from_query)) if from_label != from_query => {
            return Err(malformed(format!(
                "issuer '{from_label}' in label disagrees with issuer parameter '{from_query}'"
            )));
        }
        (from_label, from_query) => from_query.or(from_label),
    };

    let key = TotpKey::new(&secret).map_err(|e| malformed(format!("{e}")))?;

    Ok(key
        .with_name(&name)
        .with_issuer(issuer)
        .with_format(digits, period)
        .with_algorithm(algorithm))
}

/// The label exactly as written in `uri`. `Url::path` resolves `.` and `..`
/// segments, which are valid names here.
fn raw_label(uri: &str) -> &str {
    let rest = uri.split_once("://").map_or("", |(_, rest)| rest);
    let before_query = rest.split(['?', '#']).next().unwrap_or("");
    before_query
        .split_once('/')
        .map_or("", |(_, label)| label.trim_start_matches('/'))
}

/// Splits `issuer:name` on the first literal colon. A label whose colon is
/// itself encoded is only split when the prefix matches the issuer
/// parameter.
fn split_label(raw: &str, issuer: Option<&str>) -> Result<(Option<String>, String), GauthError> {
    let decode = |s: &str| {
        urlencoding::decode(s)
            .map(|c| c.into_owned())
            .map_err(|e| malformed(format!("label is not UTF-8: {e}")))
    };

    if let Some((prefix, name)) = raw.split_once(':') {
        let prefix = decode(prefix)?;
        let prefix = Some(prefix).filter(|p| !p.is_empty());
        return Ok((prefix, decode(name)?));
    }

    let label = decode(raw)?;
    if let Some(issuer) = issuer {
        if let Some(name) = label.strip_prefix(&format!("{issuer}:")) {
            return Ok((None, name.to_string()));
        }
    }

    Ok((None, label))
}

/// Renders `key` as a key URI. `explicit_name` replaces the label in the
/// output only; the key itself is left alone.
pub fn serialize(key: &TotpKey, explicit_name: Option<&str>) -> String {
    let name = explicit_name.unwrap_or(&key.name);
    let label = match &key.issuer {
        Some(issuer) => format!(
            "{}:{}",
            urlencoding::encode(issuer),
            urlencoding::encode(name)
        ),
        None => urlencoding::encode(name).into_owned(),
    };

    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("secret", &key.secret);
    if let Some(issuer) = &key.issuer {
        query.append_pair("issuer", issuer);
    }
    if key.algorithm != Algorithm::default() {
        query.append_pair("algorithm", key.algorithm.as_str());
    }
    if key.digits != DEFAULT_DIGITS {
        query.append_pair("digits", &key.digits.to_string());
    }
    if key.period != DEFAULT_PERIOD {
        query.append_pair("period", &key.period.to_string());
    }

    format!("{SCHEME_PREFIX}totp/{label}?{}", query.finish())
}
