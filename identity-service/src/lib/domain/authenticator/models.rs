use chrono::DateTime;
use chrono::Duration;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::domain::login::LoginInfo;

/// Proof that a request belongs to an identity.
pub trait Authenticator: Clone + Send + Sync + 'static {
    fn login_info(&self) -> &LoginInfo;

    /// Whether the authenticator may still be used at `now`.
    fn is_valid(&self, now: DateTime<Utc>) -> bool;
}

/// Authenticator with an absolute expiry and an optional sliding idle timeout.
pub trait ExpirableAuthenticator: Authenticator {
    fn last_used_at(&self) -> DateTime<Utc>;

    fn expires_at(&self) -> DateTime<Utc>;

    fn idle_timeout(&self) -> Option<Duration>;

    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        self.idle_timeout()
            .is_some_and(|timeout| now > self.last_used_at() + timeout)
    }
}

/// Authenticator that can be persisted in an authenticator repository.
pub trait StorableAuthenticator: Authenticator + Serialize + DeserializeOwned + Unpin {
    fn id(&self) -> &str;
}

/// Authenticator state carried inside the server-side session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionAuthenticator {
    pub login_info: LoginInfo,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, with = "idle_timeout_seconds")]
    pub idle_timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Authenticator referenced by a cookie, either by id or by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieAuthenticator {
    pub id: String,
    pub login_info: LoginInfo,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, with = "idle_timeout_seconds")]
    pub idle_timeout: Option<Duration>,
    /// Lifetime of the client cookie in seconds, `None` for a session cookie.
    #[serde(default)]
    pub cookie_max_age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Authenticator transported as a signed JWT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwtAuthenticator {
    pub id: String,
    pub login_info: LoginInfo,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, with = "idle_timeout_seconds")]
    pub idle_timeout: Option<Duration>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_claims: Option<Map<String, Value>>,
}

/// Authenticator whose opaque id travels in a request header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerTokenAuthenticator {
    pub id: String,
    pub login_info: LoginInfo,
    pub last_used_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    #[serde(default, with = "idle_timeout_seconds")]
    pub idle_timeout: Option<Duration>,
}

/// Authenticator that is always valid and never transported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DummyAuthenticator {
    pub login_info: LoginInfo,
}

macro_rules! expirable_authenticator {
    ($($authenticator:ty),+) => {
        $(
            impl Authenticator for $authenticator {
                fn login_info(&self) -> &LoginInfo {
                    &self.login_info
                }

                fn is_valid(&self, now: DateTime<Utc>) -> bool {
                    !self.is_expired(now) && !self.is_timed_out(now)
                }
            }

            impl ExpirableAuthenticator for $authenticator {
                fn last_used_at(&self) -> DateTime<Utc> {
                    self.last_used_at
                }

                fn expires_at(&self) -> DateTime<Utc> {
                    self.expires_at
                }

                fn idle_timeout(&self) -> Option<Duration> {
                    self.idle_timeout
                }
            }
        )+
    };
}

expirable_authenticator!(
    SessionAuthenticator,
    CookieAuthenticator,
    JwtAuthenticator,
    BearerTokenAuthenticator
);

impl StorableAuthenticator for CookieAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }
}

impl StorableAuthenticator for JwtAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }
}

impl StorableAuthenticator for BearerTokenAuthenticator {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Authenticator for DummyAuthenticator {
    fn login_info(&self) -> &LoginInfo {
        &self.login_info
    }

    fn is_valid(&self, _now: DateTime<Utc>) -> bool {
        true
    }
}

/// Authenticator produced by whichever strategy is configured at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyAuthenticator {
    Session(SessionAuthenticator),
    Cookie(CookieAuthenticator),
    Jwt(JwtAuthenticator),
    BearerToken(BearerTokenAuthenticator),
    Dummy(DummyAuthenticator),
}

impl AnyAuthenticator {
    /// Strategy key of the service that issued this authenticator.
    pub fn strategy(&self) -> &'static str {
        match self {
            AnyAuthenticator::Session(_) => "session",
            AnyAuthenticator::Cookie(_) => "cookie",
            AnyAuthenticator::Jwt(_) => "jwt",
            AnyAuthenticator::BearerToken(_) => "bearer",
            AnyAuthenticator::Dummy(_) => "dummy",
        }
    }
}

impl Authenticator for AnyAuthenticator {
    fn login_info(&self) -> &LoginInfo {
        match self {
            AnyAuthenticator::Session(a) => a.login_info(),
            AnyAuthenticator::Cookie(a) => a.login_info(),
            AnyAuthenticator::Jwt(a) => a.login_info(),
            AnyAuthenticator::BearerToken(a) => a.login_info(),
            AnyAuthenticator::Dummy(a) => a.login_info(),
        }
    }

    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        match self {
            AnyAuthenticator::Session(a) => a.is_valid(now),
            AnyAuthenticator::Cookie(a) => a.is_valid(now),
            AnyAuthenticator::Jwt(a) => a.is_valid(now),
            AnyAuthenticator::BearerToken(a) => a.is_valid(now),
            AnyAuthenticator::Dummy(a) => a.is_valid(now),
        }
    }
}

/// Result of `touch`: whether the idle timeout was slid forward and the
/// authenticator therefore needs to be written back.
#[derive(Debug, Clone, PartialEq)]
pub enum Touched<A> {
    Touched(A),
    Untouched(A),
}

impl<A> Touched<A> {
    pub fn is_touched(&self) -> bool {
        matches!(self, Touched::Touched(_))
    }

    pub fn authenticator(&self) -> &A {
        match self {
            Touched::Touched(a) | Touched::Untouched(a) => a,
        }
    }

    pub fn into_inner(self) -> A {
        match self {
            Touched::Touched(a) | Touched::Untouched(a) => a,
        }
    }

    pub fn map<B>(self, f: impl FnOnce(A) -> B) -> Touched<B> {
        match self {
            Touched::Touched(a) => Touched::Touched(f(a)),
            Touched::Untouched(a) => Touched::Untouched(f(a)),
        }
    }
}

/// Serializes an optional idle timeout as whole seconds.
mod idle_timeout_seconds {
    use chrono::Duration;
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&duration.num_seconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<i64>::deserialize(deserializer)?.map(Duration::seconds))
    }
}
