//! `Set-Cookie` serialization and cookie signing
//!
//! Attributes are written in a fixed order:
//! `Max-Age`, `Domain`, `Path`, `Expires`, `HttpOnly`, `Secure`,
//! `Partitioned`, `Priority`, `SameSite`.
//!
//! Signed values take the form `s:<value>.<signature>` where the signature is
//! the unpadded base64 HMAC-SHA256 of `<value>` under the request secret.

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeDelta, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::ResponseError;
use crate::http::encode::encode_component;

type HmacSha256 = Hmac<Sha256>;

/// `SameSite` attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// `Priority` attribute values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CookiePriority {
    Low,
    Medium,
    High,
}

impl CookiePriority {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Cookie attributes
///
/// Deserializable so default attributes can come from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CookieOptions {
    /// Defaults to `/`
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Lifetime in milliseconds
    pub max_age: Option<i64>,
    #[serde(skip)]
    pub expires: Option<DateTime<Utc>>,
    pub signed: bool,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
    pub partitioned: bool,
    pub priority: Option<CookiePriority>,
}

impl CookieOptions {
    /// Options that expire a cookie immediately
    pub fn cleared(&self) -> Self {
        Self {
            expires: Some(DateTime::UNIX_EPOCH),
            max_age: None,
            path: Some(self.path.clone().unwrap_or_else(|| "/".to_string())),
            ..self.clone()
        }
    }
}

/// Build a full `Set-Cookie` value as of `now`
///
/// `secret` is required when `options.signed` is set.
pub fn build_set_cookie(
    name: &str,
    value: &str,
    options: &CookieOptions,
    secret: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, ResponseError> {
    let value = if options.signed {
        let secret = secret.ok_or(ResponseError::SecretRequired)?;
        format!("s:{}", sign(value, secret))
    } else {
        value.to_string()
    };

    let max_age_secs = options.max_age.map(|ms| ms.div_euclid(1000));
    let expires = options.expires.or_else(|| {
        options
            .max_age
            .and_then(TimeDelta::try_milliseconds)
            .and_then(|delta| now.checked_add_signed(delta))
    });

    serialize(name, &value, options, max_age_secs, expires)
}

fn serialize(
    name: &str,
    value: &str,
    options: &CookieOptions,
    max_age_secs: Option<i64>,
    expires: Option<DateTime<Utc>>,
) -> Result<String, ResponseError> {
    if !is_token(name) {
        return Err(ResponseError::InvalidCookieName(name.to_string()));
    }

    let mut cookie = format!("{name}={}", encode_component(value));

    if let Some(max_age) = max_age_secs {
        cookie.push_str(&format!("; Max-Age={max_age}"));
    }
    if let Some(domain) = &options.domain {
        if !is_attribute_value(domain) {
            return Err(ResponseError::InvalidCookieOption("domain"));
        }
        cookie.push_str(&format!("; Domain={domain}"));
    }
    let path = options.path.as_deref().unwrap_or("/");
    if !is_attribute_value(path) {
        return Err(ResponseError::InvalidCookieOption("path"));
    }
    cookie.push_str(&format!("; Path={path}"));
    if let Some(expires) = expires {
        cookie.push_str(&format!("; Expires={}", http_date(expires)));
    }
    if options.http_only {
        cookie.push_str("; HttpOnly");
    }
    if options.secure {
        cookie.push_str("; Secure");
    }
    if options.partitioned {
        cookie.push_str("; Partitioned");
    }
    if let Some(priority) = options.priority {
        cookie.push_str(&format!("; Priority={}", priority.as_str()));
    }
    if let Some(same_site) = options.same_site {
        cookie.push_str(&format!("; SameSite={}", same_site.as_str()));
    }

    Ok(cookie)
}

/// `av-octet` without `;` or controls (RFC 6265 section 4.1.1)
fn is_attribute_value(value: &str) -> bool {
    !value.chars().any(|c| c == ';' || c.is_control())
}

/// Append the HMAC-SHA256 signature of `value` as `<value>.<signature>`
pub fn sign(value: &str, secret: &str) -> String {
    let mut mac = keyed_mac(secret);
    mac.update(value.as_bytes());
    let signature = STANDARD_NO_PAD.encode(mac.finalize().into_bytes());
    format!("{value}.{signature}")
}

/// Verify a value produced by [`sign`] and return the original value
///
/// Comparison is constant-time. A leading `s:` is accepted and stripped.
pub fn unsign(signed: &str, secret: &str) -> Option<String> {
    let signed = signed.strip_prefix("s:").unwrap_or(signed);
    let (value, signature) = signed.rsplit_once('.')?;
    let signature = STANDARD_NO_PAD.decode(signature).ok()?;

    let mut mac = keyed_mac(secret);
    mac.update(value.as_bytes());
    mac.verify_slice(&signature).ok()?;
    Some(value.to_string())
}

/// IMF-fixdate, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn keyed_mac(secret: &str) -> HmacSha256 {
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length")
}

fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}
