use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use cookie::Cookie;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sessionid";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for SessionId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for SessionId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        Uuid::try_parse(s).map(Self).map_err(|_| ())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

/// Per-request session handle, carried in the GraphQL context.
///
/// `current` is whatever session the client presented via its cookie.
/// Mutations that bind a session record the id here, and the transport layer
/// turns that into a `Set-Cookie` on the way out.
#[derive(Clone)]
pub struct Session {
    current: Option<SessionId>,
    issued: Arc<Mutex<Option<SessionId>>>,
}

impl Session {
    /// A cookie value that doesn't parse is the same as no cookie at all.
    pub fn from_cookie(cookie: Option<&str>) -> Self {
        Self {
            current: cookie.and_then(|value| value.parse().ok()),
            issued: Arc::new(Mutex::new(None)),
        }
    }

    pub fn current(&self) -> Option<SessionId> {
        self.current
    }

    pub fn issue(&self, id: SessionId) {
        *self.issued.lock().unwrap() = Some(id);
    }

    pub fn issued(&self) -> Option<SessionId> {
        *self.issued.lock().unwrap()
    }
}

pub fn set_cookie(id: &SessionId, secure: bool) -> String {
    let mut cookie = Cookie::new(SESSION_COOKIE, id.to_string());
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(secure);
    cookie.to_string()
}
