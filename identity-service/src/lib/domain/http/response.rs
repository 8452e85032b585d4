use http::header::InvalidHeaderValue;
use http::header::SET_COOKIE;
use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;

use super::cookie::Cookie;
use super::cookie::DiscardingCookie;

/// Headers an authenticator service wants on the outgoing response.
///
/// Services only add to it. The inbound adapter applies it to the framework
/// response once the handler has run.
#[derive(Debug, Clone, Default)]
pub struct AuthResponse {
    headers: HeaderMap,
}

impl AuthResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cookie(mut self, cookie: &Cookie) -> Result<Self, InvalidHeaderValue> {
        self.headers.append(SET_COOKIE, HeaderValue::try_from(cookie)?);
        Ok(self)
    }

    pub fn discarding_cookie(mut self, cookie: &DiscardingCookie) -> Result<Self, InvalidHeaderValue> {
        self.headers.append(SET_COOKIE, HeaderValue::try_from(cookie)?);
        Ok(self)
    }

    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, InvalidHeaderValue> {
        self.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(self)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of the last `Set-Cookie` written for `name`. Empty when the
    /// cookie is being discarded.
    pub fn cookie_value(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .filter_map(|header| header.split(';').next()?.split_once('='))
            .filter(|(n, _)| *n == name)
            .last()
            .map(|(_, v)| v.to_string())
    }

    /// Append all accumulated headers to `response`. `Set-Cookie` values are
    /// appended, any other header replaces what the handler set.
    pub fn apply_to<B>(&self, response: &mut http::Response<B>) {
        let target = response.headers_mut();
        for name in self.headers.keys() {
            if name != SET_COOKIE {
                target.remove(name);
            }
            for value in self.headers.get_all(name) {
                target.append(name.clone(), value.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::http::cookie::CookieSettings;

    #[test]
    fn test_cookie_value() {
        let settings = CookieSettings::named("id");
        let response = AuthResponse::new()
            .with_cookie(&settings.cookie("first"))
            .unwrap()
            .with_cookie(&CookieSettings::named("other").cookie("x"))
            .unwrap();

        assert_eq!(response.cookie_value("id"), Some("first".to_string()));

        let discarded = response.discarding_cookie(&settings.discarding()).unwrap();
        assert_eq!(discarded.cookie_value("id"), Some(String::new()));
    }

    #[test]
    fn test_apply_to() {
        let response = AuthResponse::new()
            .with_cookie(&CookieSettings::named("a").cookie("1"))
            .unwrap()
            .with_header(HeaderName::from_static("x-auth-token"), "token")
            .unwrap();

        let mut target = http::Response::builder()
            .header(SET_COOKIE, "existing=1")
            .header("x-auth-token", "stale")
            .body(())
            .unwrap();
        response.apply_to(&mut target);

        assert_eq!(target.headers().get_all(SET_COOKIE).iter().count(), 2);
        assert_eq!(target.headers().get("x-auth-token").unwrap(), "token");
    }
}
