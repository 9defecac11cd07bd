/// Session codes and share links for remote boards.
///
/// A session code is a short uppercase alphanumeric string naming one
/// remote board document (`sessions/{code}`). It travels in the `session`
/// query parameter of a share link; a URL without it means local mode.
use std::fmt;

use percent_encoding::{percent_decode_str, utf8_percent_encode, NON_ALPHANUMERIC};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::storage::StoreError;

pub const SESSION_CODE_LEN: usize = 6;
pub const SESSION_QUERY_PARAM: &str = "session";
const MAX_SESSION_CODE_LEN: usize = 32;
const CODE_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionCode(String);

impl SessionCode {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self(
            (0..SESSION_CODE_LEN)
                .map(|_| CODE_CHARS[rng.gen_range(0..CODE_CHARS.len())] as char)
                .collect(),
        )
    }

    /// Accept 1 to 32 ASCII alphanumerics, case preserved.
    pub fn parse(code: &str) -> Result<Self, StoreError> {
        let code = code.trim();
        let valid = !code.is_empty()
            && code.len() <= MAX_SESSION_CODE_LEN
            && code.chars().all(|c| c.is_ascii_alphanumeric());
        if valid {
            Ok(Self(code.to_string()))
        } else {
            Err(StoreError::InvalidSession(code.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Database path of the session's board document.
    pub fn document_path(&self) -> String {
        format!("sessions/{}", self.0)
    }

    /// `{base}?session={code}`; `base` is the page URL without a query.
    pub fn share_url(&self, base_url: &str) -> String {
        let base = base_url.split(['?', '#']).next().unwrap_or(base_url);
        format!(
            "{}?{}={}",
            base,
            SESSION_QUERY_PARAM,
            utf8_percent_encode(&self.0, NON_ALPHANUMERIC)
        )
    }
}

impl fmt::Display for SessionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionCode {
    type Error = StoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SessionCode> for String {
    fn from(code: SessionCode) -> Self {
        code.0
    }
}

/// Extract the session code from a page URL's query string.
/// Returns `None` when the parameter is absent, empty or invalid.
pub fn session_from_url(url: &str) -> Option<SessionCode> {
    let without_fragment = url.split('#').next().unwrap_or(url);
    let (_, query) = without_fragment.split_once('?')?;
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == SESSION_QUERY_PARAM)
        .and_then(|(_, value)| {
            let decoded = percent_decode_str(value).decode_utf8_lossy();
            match SessionCode::parse(&decoded) {
                Ok(code) => Some(code),
                Err(e) => {
                    log::warn!("[retro.session] Ignoring session parameter: {}", e);
                    None
                }
            }
        })
}

/// Which backend a board is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardMode {
    Local,
    Remote(SessionCode),
}

impl BoardMode {
    pub fn from_url(url: &str) -> Self {
        match session_from_url(url) {
            Some(code) => Self::Remote(code),
            None => Self::Local,
        }
    }

    pub fn session(&self) -> Option<&SessionCode> {
        match self {
            Self::Local => None,
            Self::Remote(code) => Some(code),
        }
    }
}
