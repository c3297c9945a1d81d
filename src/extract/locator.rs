//! Ordered candidate search
//!
//! Catalog markup drifts between page templates, so every field is looked up
//! through a list of locators. The first locator that matches wins, even when
//! a later one would match more elements.

use crate::session::{Element, PageSession, Scope};
use tracing::{debug, trace};

/// Winning candidate of a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Index into the candidate list
    pub candidate: usize,
    /// Every element the winning candidate matched, in document order
    pub elements: Vec<Element>,
}

/// Tries each candidate in order and returns the first non-empty match
///
/// Unparsable candidates count as non-matches.
pub fn resolve<S>(session: &S, scope: Scope, candidates: &[&str]) -> Option<Resolved>
where
    S: PageSession + ?Sized,
{
    for (index, locator) in candidates.iter().enumerate() {
        match session.query(scope, locator) {
            Ok(elements) if !elements.is_empty() => {
                trace!("Locator '{}' matched {} elements", locator, elements.len());
                return Some(Resolved {
                    candidate: index,
                    elements,
                });
            }
            Ok(_) => {}
            Err(e) => debug!("Skipping locator '{}': {}", locator, e),
        }
    }
    None
}

/// First element of the winning candidate
pub fn resolve_first<S>(session: &S, scope: Scope, candidates: &[&str]) -> Option<Element>
where
    S: PageSession + ?Sized,
{
    resolve(session, scope, candidates).and_then(|resolved| resolved.elements.first().copied())
}

/// All elements of the winning candidate, empty when nothing matches
pub fn resolve_all<S>(session: &S, scope: Scope, candidates: &[&str]) -> Vec<Element>
where
    S: PageSession + ?Sized,
{
    resolve(session, scope, candidates)
        .map(|resolved| resolved.elements)
        .unwrap_or_default()
}

pub fn any_matches<S>(session: &S, scope: Scope, candidates: &[&str]) -> bool
where
    S: PageSession + ?Sized,
{
    resolve(session, scope, candidates).is_some()
}

/// First candidate whose first element yields a value through `accept`
///
/// Used when a match alone is not enough, e.g. a price cell that must
/// contain a digit.
pub fn resolve_with<S, T, F>(session: &S, scope: Scope, candidates: &[&str], mut accept: F) -> Option<T>
where
    S: PageSession + ?Sized,
    F: FnMut(Element) -> Option<T>,
{
    for locator in candidates {
        match session.query(scope, locator) {
            Ok(elements) => {
                if let Some(value) = elements.first().copied().and_then(&mut accept) {
                    return Some(value);
                }
            }
            Err(e) => debug!("Skipping locator '{}': {}", locator, e),
        }
    }
    None
}
