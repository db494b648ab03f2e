//! Requested protocol and resource API versions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ResourceError, ResourceResult};

/// A `major.minor` version number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Same major version and at least the requested minor version.
    pub fn is_compatible_with(&self, requested: &Version) -> bool {
        self.major == requested.major && self.minor >= requested.minor
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for Version {
    type Err = ResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ResourceError::BadRequest(format!("'{}' is not a valid version", s));
        let s = s.trim();
        let (major, minor) = match s.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (s, "0"),
        };
        Ok(Version {
            major: major.parse().map_err(|_| bad())?,
            minor: minor.parse().map_err(|_| bad())?,
        })
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Versions a client asked for, as carried in `Accept-API-Version`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptApiVersion {
    pub protocol: Option<Version>,
    pub resource: Option<Version>,
}

impl AcceptApiVersion {
    /// Parse `protocol=2.0,resource=1.0`; either part may be omitted.
    pub fn parse(header: &str) -> ResourceResult<Self> {
        let mut accept = AcceptApiVersion::default();
        for part in header.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (key, value) = part.split_once('=').ok_or_else(|| {
                ResourceError::BadRequest(format!("malformed API version part '{}'", part))
            })?;
            match key.trim().to_ascii_lowercase().as_str() {
                "protocol" => accept.protocol = Some(value.parse()?),
                "resource" => accept.resource = Some(value.parse()?),
                other => {
                    return Err(ResourceError::BadRequest(format!(
                        "unknown API version key '{}'",
                        other
                    )))
                }
            }
        }
        Ok(accept)
    }
}

/// Protocol and resource versions accepted for the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiVersionFrame {
    pub protocol_name: String,
    pub protocol_version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<Version>,
}

impl ApiVersionFrame {
    /// Resolve a client's accepted versions against the server's protocol.
    ///
    /// Fails when the client insists on an incompatible protocol version.
    pub fn negotiate(
        protocol_name: impl Into<String>,
        server_protocol: Version,
        accept: AcceptApiVersion,
    ) -> ResourceResult<Self> {
        if let Some(requested) = accept.protocol {
            if !server_protocol.is_compatible_with(&requested) {
                return Err(ResourceError::BadRequest(format!(
                    "unsupported protocol version {} (server speaks {})",
                    requested, server_protocol
                )));
            }
        }
        Ok(Self {
            protocol_name: protocol_name.into(),
            protocol_version: accept.protocol.unwrap_or(server_protocol),
            resource_version: accept.resource,
        })
    }
}
