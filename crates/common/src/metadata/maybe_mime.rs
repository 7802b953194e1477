use std::fmt;
use std::str::FromStr;

use mime::Mime;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Optional MIME type of a file, `null` in JSON when unknown
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaybeMime(pub Option<Mime>);

impl MaybeMime {
    pub fn as_str(&self) -> Option<&str> {
        self.0.as_ref().map(|mime| mime.as_ref())
    }
}

impl From<Mime> for MaybeMime {
    fn from(mime: Mime) -> Self {
        Self(Some(mime))
    }
}

impl FromStr for MaybeMime {
    type Err = mime::FromStrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mime::from_str(s).map(Self::from)
    }
}

impl fmt::Display for MaybeMime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("application/octet-stream"))
    }
}

impl Serialize for MaybeMime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.0 {
            Some(mime) => serializer.serialize_str(mime.as_ref()),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for MaybeMime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => text.parse().map_err(serde::de::Error::custom),
            None => Ok(MaybeMime(None)),
        }
    }
}
