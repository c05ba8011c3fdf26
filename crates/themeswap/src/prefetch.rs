#![forbid(unsafe_code)]

//! Prefetch links for every theme.
//!
//! One `rel=prefetch` link per theme key primes the cache so a later switch
//! only pays for parsing. Links are keyed by a deterministic id, which makes
//! the pass idempotent for a stable theme map. Links for keys that later
//! disappear from the map are left in place.

use themeswap_dom::{DocumentPort, LinkSpec};
use tracing::debug;

use crate::config::PREFETCH_ID_PREFIX;
use crate::error::Result;
use crate::resolver::InsertionResolver;
use crate::theme_map::ThemeMap;

/// Id of the prefetch link for `key`.
#[must_use]
pub fn prefetch_id(key: &str) -> String {
    format!("{PREFETCH_ID_PREFIX}{key}")
}

/// Ensure a prefetch link exists for every key of `themes`, in map order.
///
/// Each missing link is inserted with its own resolution, so a missing marker
/// comment warns once per created link. Returns how many links were created.
pub fn prefetch_themes<D: DocumentPort + ?Sized>(
    document: &D,
    resolver: &InsertionResolver,
    themes: &ThemeMap,
) -> Result<usize> {
    let mut created = 0;
    for (key, href) in themes.iter() {
        let id = prefetch_id(key);
        if document.element_by_id(&id).is_some() {
            continue;
        }
        let link = document.create_link(&LinkSpec::prefetch(id, href), None)?;
        resolver.insert(document, link)?;
        created += 1;
    }
    debug!(created, themes = themes.len(), "prefetch pass finished");
    Ok(created)
}
