//! Catalog documents and their links
//!
//! A [`Document`] is a decoded JSON object together with the [`Location`] it
//! was fetched from. The crawler only looks at the `links` array; every other
//! field is carried through to the consumer untouched.

use crate::location::Location;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors decoding a fetched body into a [`Document`]
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("body is JSON but not an object")]
    NotAnObject,
}

/// Relation tag of a link
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum LinkRelation {
    Child,
    Item,
    /// Any other relation (`self`, `root`, `parent`, `license`, ...)
    Other(String),
}

impl LinkRelation {
    /// Returns true if the crawler follows links with this relation
    pub fn is_traversal_edge(&self) -> bool {
        matches!(self, Self::Child | Self::Item)
    }
}

impl From<String> for LinkRelation {
    fn from(rel: String) -> Self {
        match rel.as_str() {
            "child" => Self::Child,
            "item" => Self::Item,
            _ => Self::Other(rel),
        }
    }
}

/// A typed reference from one document to another
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Link {
    #[serde(rename = "rel", alias = "relation")]
    pub relation: LinkRelation,

    /// Absolute URL or path, or a reference relative to the owning document
    #[serde(rename = "href", alias = "target")]
    pub target: String,
}

/// A fetched and decoded catalog document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    location: Location,
    body: Map<String, Value>,
}

impl Document {
    /// Decodes a raw body fetched from `location`
    pub fn from_slice(location: Location, bytes: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(location, value)
    }

    /// Wraps an already decoded value; it must be a JSON object
    pub fn from_value(location: Location, value: Value) -> Result<Self, DecodeError> {
        match value {
            Value::Object(body) => Ok(Self { location, body }),
            _ => Err(DecodeError::NotAnObject),
        }
    }

    /// Where this document was fetched from
    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The full decoded payload
    pub fn body(&self) -> &Map<String, Value> {
        &self.body
    }

    pub fn into_body(self) -> Map<String, Value> {
        self.body
    }

    /// The `id` field, if it is a string
    pub fn id(&self) -> Option<&str> {
        self.body.get("id").and_then(Value::as_str)
    }

    /// Extracts the well-formed entries of the `links` array
    ///
    /// A missing or non-array `links` field yields no links. Entries without a
    /// string `rel` and `href` are skipped.
    pub fn links(&self) -> Vec<Link> {
        match self.body.get("links") {
            Some(Value::Array(entries)) => entries
                .iter()
                .filter_map(|entry| Link::deserialize(entry).ok())
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The `href` of the first entry in `links`, whatever its relation
    pub fn first_link_target(&self) -> Option<&str> {
        self.body
            .get("links")?
            .as_array()?
            .first()?
            .get("href")?
            .as_str()
    }
}
