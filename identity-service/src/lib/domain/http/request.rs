use std::net::IpAddr;

use http::header::InvalidHeaderValue;
use http::header::COOKIE;
use http::HeaderMap;
use http::HeaderName;
use http::HeaderValue;
use serde::Deserialize;
use serde_json::Value;

use super::cookie::parse_cookie_header;

/// Where a token-based authenticator looks for its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestPart {
    Headers,
    QueryString,
    FormUrlEncodedBody,
    JsonBody,
}

#[derive(Debug, Clone, Default)]
enum RequestBody {
    #[default]
    Empty,
    Form(Vec<(String, String)>),
    Json(Value),
}

/// Read view of an incoming request.
///
/// Holds everything the authenticator services inspect: headers, query
/// parameters, an optional already-read body and the peer address.
#[derive(Debug, Clone, Default)]
pub struct AuthRequest {
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: RequestBody,
    remote_addr: Option<IpAddr>,
}

impl AuthRequest {
    pub fn new(headers: HeaderMap) -> Self {
        Self {
            headers,
            ..Self::default()
        }
    }

    /// Build from request parts, reading headers and the query string.
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        let request = Self::new(parts.headers.clone());
        match parts.uri.query() {
            Some(query) => request.with_query(query),
            None => request,
        }
    }

    pub fn with_query(mut self, query: &str) -> Self {
        self.query = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();
        self
    }

    pub fn with_form_body(mut self, body: &[u8]) -> Self {
        self.body = RequestBody::Form(url::form_urlencoded::parse(body).into_owned().collect());
        self
    }

    pub fn with_json_body(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn with_remote_addr(mut self, remote_addr: IpAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }

    /// Add or replace a header.
    pub fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, InvalidHeaderValue> {
        self.headers.insert(name, HeaderValue::from_str(value)?);
        Ok(self)
    }

    /// Add or replace a cookie, leaving the other cookies untouched.
    pub fn with_cookie(mut self, name: &str, value: &str) -> Result<Self, InvalidHeaderValue> {
        let mut cookies: Vec<(String, String)> = self
            .headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(parse_cookie_header)
            .filter(|(n, _)| *n != name)
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        cookies.push((name.to_string(), value.to_string()));

        let header = cookies
            .iter()
            .map(|(n, v)| format!("{}={}", n, v))
            .collect::<Vec<_>>()
            .join("; ");
        self.headers.insert(COOKIE, HeaderValue::from_str(&header)?);
        Ok(self)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn remote_addr(&self) -> Option<IpAddr> {
        self.remote_addr
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|header| header.to_str().ok())
            .flat_map(parse_cookie_header)
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.to_string())
    }

    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value for `name` across `parts`, searched in order.
    pub fn extract_string(&self, name: &str, parts: &[RequestPart]) -> Option<String> {
        parts
            .iter()
            .find_map(|part| self.extract_from(name, *part))
            .filter(|value| !value.is_empty())
    }

    fn extract_from(&self, name: &str, part: RequestPart) -> Option<String> {
        let value = match (part, &self.body) {
            (RequestPart::Headers, _) => self.header(name).map(str::to_string),
            (RequestPart::QueryString, _) => self.query_param(name).map(str::to_string),
            (RequestPart::FormUrlEncodedBody, RequestBody::Form(fields)) => fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
            (RequestPart::JsonBody, RequestBody::Json(body)) => {
                body.get(name).and_then(Value::as_str).map(str::to_string)
            }
            _ => None,
        };
        value.filter(|v| !v.is_empty())
    }
}
