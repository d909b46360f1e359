// ABOUTME: Validated application name, used for platform policy lookups.
// ABOUTME: App names follow RFC 1123 label requirements (DNS-compatible).

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppNameError {
    #[error("app name cannot be empty")]
    Empty,

    #[error("app name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("app name cannot start or end with a hyphen")]
    EdgeHyphen,

    #[error("invalid character in app name: '{0}'")]
    InvalidChar(char),
}

/// An application name as the platform knows it.
///
/// Apps name the routing domain (`<app>.example.net`), so the same
/// restrictions as a DNS label apply.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct AppName(String);

impl AppName {
    pub fn new(value: &str) -> Result<Self, AppNameError> {
        if value.is_empty() {
            return Err(AppNameError::Empty);
        }

        if value.len() > 63 {
            return Err(AppNameError::TooLong);
        }

        if value.starts_with('-') || value.ends_with('-') {
            return Err(AppNameError::EdgeHyphen);
        }

        for c in value.chars() {
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' {
                return Err(AppNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for AppName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        AppName::new(&value).map_err(serde::de::Error::custom)
    }
}
