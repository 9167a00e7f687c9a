use crate::document::Document;
use crate::location::{is_absolute_reference, Location};
use std::path::Path;

/// Resolves a link target against the location of the document that lists it
///
/// # Resolution Rules
///
/// 1. Absolute targets (full URLs, absolute paths) are used verbatim and
///    classified on their own
/// 2. Relative targets are joined onto the directory of `base`:
///    - remote parents use URL joining, which drops the last segment and
///      collapses `.` and `..`
///    - local parents use path joining onto `base.parent()`
///
/// The result keeps the kind of `base` unless the target is itself absolute.
///
/// # Returns
///
/// * `Some(Location)` - The resolved location
/// * `None` - The target cannot be joined onto a remote base
///
/// # Examples
///
/// ```
/// use catalog_walk::Location;
/// use catalog_walk::location::resolve_target;
///
/// let base = Location::parse("a/b/catalog.json");
/// assert_eq!(
///     resolve_target("item.json", &base),
///     Some(Location::parse("a/b/item.json"))
/// );
/// ```
pub fn resolve_target(target: &str, base: &Location) -> Option<Location> {
    if is_absolute_reference(target) {
        return Some(Location::parse(target));
    }

    match base {
        Location::Remote(url) => match url.join(target) {
            Ok(joined) => Some(Location::from(joined)),
            Err(e) => {
                tracing::debug!("Cannot resolve '{}' against {}: {}", target, url, e);
                None
            }
        },
        Location::Local(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new(""));
            Some(Location::Local(dir.join(target)))
        }
    }
}

/// Computes the locations to visit after `document`
///
/// Only `child` and `item` links are traversal edges; every other relation
/// (`self`, `root`, `parent`, ...) is ignored, as are link entries that lack
/// a string `rel` or `href`. Duplicates are kept.
pub fn expand(document: &Document, fetched_from: &Location) -> Vec<Location> {
    document
        .links()
        .into_iter()
        .filter(|link| link.relation.is_traversal_edge())
        .filter_map(|link| resolve_target(&link.target, fetched_from))
        .collect()
}
