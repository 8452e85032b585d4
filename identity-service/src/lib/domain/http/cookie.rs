use std::fmt;

use http::HeaderValue;
use serde::Deserialize;
use serde::Serialize;

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        };
        f.write_str(value)
    }
}

/// Attributes applied to every cookie an authenticator service writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
    /// Persistent cookie lifetime in seconds. `None` yields a session cookie.
    pub max_age: Option<i64>,
}

impl CookieSettings {
    /// Secure defaults for a cookie called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            domain: None,
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Lax),
            max_age: None,
        }
    }

    pub fn with_max_age(mut self, max_age: Option<i64>) -> Self {
        self.max_age = max_age;
        self
    }

    /// Cookie carrying `value` with these attributes.
    pub fn cookie(&self, value: impl Into<String>) -> Cookie {
        Cookie {
            name: self.name.clone(),
            value: value.into(),
            max_age: self.max_age,
            path: self.path.clone(),
            domain: self.domain.clone(),
            secure: self.secure,
            http_only: self.http_only,
            same_site: self.same_site,
        }
    }

    /// Instruction removing the cookie from the client.
    pub fn discarding(&self) -> DiscardingCookie {
        DiscardingCookie {
            name: self.name.clone(),
            path: self.path.clone(),
            domain: self.domain.clone(),
            secure: self.secure,
        }
    }
}

/// A cookie to be set on the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub max_age: Option<i64>,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl fmt::Display for Cookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}; Path={}", self.name, self.value, self.path)?;
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if let Some(max_age) = self.max_age {
            write!(f, "; Max-Age={}", max_age)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        if self.http_only {
            f.write_str("; HttpOnly")?;
        }
        if let Some(same_site) = self.same_site {
            write!(f, "; SameSite={}", same_site)?;
        }
        Ok(())
    }
}

impl TryFrom<&Cookie> for HeaderValue {
    type Error = http::header::InvalidHeaderValue;

    fn try_from(cookie: &Cookie) -> Result<Self, Self::Error> {
        HeaderValue::from_str(&cookie.to_string())
    }
}

/// Expires a cookie on the client. Name, path and domain must match the
/// cookie being removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscardingCookie {
    pub name: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
}

impl fmt::Display for DiscardingCookie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}=; Path={}; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT",
            self.name, self.path
        )?;
        if let Some(domain) = &self.domain {
            write!(f, "; Domain={}", domain)?;
        }
        if self.secure {
            f.write_str("; Secure")?;
        }
        Ok(())
    }
}

impl TryFrom<&DiscardingCookie> for HeaderValue {
    type Error = http::header::InvalidHeaderValue;

    fn try_from(cookie: &DiscardingCookie) -> Result<Self, Self::Error> {
        HeaderValue::from_str(&cookie.to_string())
    }
}

/// Parse a `Cookie` request header into name/value pairs.
pub(crate) fn parse_cookie_header(header: &str) -> impl Iterator<Item = (&str, &str)> {
    header.split(';').filter_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        Some((name.trim(), value.trim()))
    })
}
