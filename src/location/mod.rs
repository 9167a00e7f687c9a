//! Location handling module for Catalog-Walk
//!
//! A [`Location`] names a document to fetch. It is classified once, when it is
//! constructed, as either a remote HTTP(S) URL or a local filesystem path, so
//! the fetcher and the resolver never re-inspect the string.

mod resolve;

pub use resolve::{expand, resolve_target};

use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// A document address: either a network URL or a filesystem path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// Fetched over HTTP(S)
    Remote(Url),
    /// Read from the local filesystem
    Local(PathBuf),
}

impl Location {
    /// Classifies a location string by its shape
    ///
    /// # Classification Rules
    ///
    /// 1. An absolute `http`/`https` URL with a host is `Remote`
    /// 2. A `file://` URL is converted to its `Local` path
    /// 3. Anything else (relative or absolute paths, Windows drive paths,
    ///    other schemes) is treated as a `Local` path
    ///
    /// # Examples
    ///
    /// ```
    /// use catalog_walk::Location;
    ///
    /// assert!(Location::parse("https://example.com/catalog.json").is_remote());
    /// assert!(!Location::parse("data/catalog.json").is_remote());
    /// ```
    pub fn parse(s: &str) -> Self {
        match Url::parse(s) {
            Ok(url) if is_remote_url(&url) => Location::Remote(url),
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => Location::Local(path),
                Err(()) => Location::Local(PathBuf::from(s)),
            },
            _ => Location::Local(PathBuf::from(s)),
        }
    }

    /// Returns true if this location is fetched over the network
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }

    /// Returns the URL for remote locations
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            Location::Remote(url) => Some(url),
            Location::Local(_) => None,
        }
    }

    /// Returns the path for local locations
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            Location::Remote(_) => None,
            Location::Local(path) => Some(path),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Remote(url) => write!(f, "{}", url),
            Location::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<Url> for Location {
    fn from(url: Url) -> Self {
        if url.scheme() == "file" {
            if let Ok(path) = url.to_file_path() {
                return Location::Local(path);
            }
        }
        Location::Remote(url)
    }
}

impl From<PathBuf> for Location {
    fn from(path: PathBuf) -> Self {
        Location::Local(path)
    }
}

impl From<&Path> for Location {
    fn from(path: &Path) -> Self {
        Location::Local(path.to_path_buf())
    }
}

/// Returns true if `target` does not need a base to be resolved
///
/// Absolute references are full URLs (`http`, `https`, `file`) and absolute
/// filesystem paths.
pub fn is_absolute_reference(target: &str) -> bool {
    match Url::parse(target) {
        Ok(url) if is_remote_url(&url) || url.scheme() == "file" => true,
        _ => Path::new(target).is_absolute(),
    }
}

fn is_remote_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.has_host()
}
