//! Locator chains: the ordered root-to-leaf path used to re-resolve an
//! element whose live reference has gone stale.
//!
//! Handles produced by this crate carry their chain from find time, so the
//! normal recovery path never touches strings. [`LocatorChain::parse`] exists
//! for identity strings received from logs or other tooling; it recovers the
//! strategies it knows and silently skips the rest, trading completeness for
//! availability.

use fantoccini::Client;
use fantoccini::elements::Element;
use tracing::debug;

use crate::errors::{ProbeError, find_error};
use crate::locator::{self, LocatorDescriptor, LocatorStrategy};

/// Separator between fragments of an element identity.
pub(crate) const CHAIN_DELIMITER: &str = " -> ";

/// Closing marker each locator fragment carries in an identity string.
pub(crate) const FRAGMENT_CLOSE: &str = "]]";

/// Ordered sequence of locator descriptors, root to leaf.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocatorChain {
    descriptors: Vec<LocatorDescriptor>,
}

impl LocatorChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_descriptors(descriptors: Vec<LocatorDescriptor>) -> Self {
        LocatorChain { descriptors }
    }

    /// Parse an element identity string into a chain.
    ///
    /// Fragments are split on the chain delimiter and classified by scanning
    /// for a known strategy marker; the identity's closing brackets (which
    /// the final fragment still carries after the split) are stripped from
    /// each value before classification. Fragments matching no marker, such
    /// as the leading session tag, are skipped. Parsing is pure: the same
    /// identity always yields the same chain.
    pub fn parse(identity: &str) -> Self {
        let descriptors = identity
            .split(CHAIN_DELIMITER)
            .filter_map(|fragment| classify_fragment(fragment.trim()))
            .collect();
        LocatorChain { descriptors }
    }

    /// Copy of this chain with one more descriptor appended.
    pub fn extended(&self, descriptor: LocatorDescriptor) -> Self {
        let mut descriptors = self.descriptors.clone();
        descriptors.push(descriptor);
        LocatorChain { descriptors }
    }

    pub fn push(&mut self, descriptor: LocatorDescriptor) {
        self.descriptors.push(descriptor);
    }

    pub fn descriptors(&self) -> &[LocatorDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Re-resolve the chain against the live document: the first descriptor
    /// is looked up from the document root, each subsequent one from the
    /// previous result. Any step with no match fails the whole resolution;
    /// no partial element is ever returned.
    pub async fn resolve(&self, client: &Client) -> Result<Element, ProbeError> {
        let mut steps = self.descriptors.iter();
        let first = steps
            .next()
            .ok_or_else(|| ProbeError::NotFound("empty locator chain".to_string()))?;

        debug!(step = %first, "resolving chain from document root");
        let mut current = locator::find_from_document(client, first)
            .await
            .map_err(|err| find_error(err, first))?;

        for descriptor in steps {
            debug!(step = %descriptor, "resolving chain hop");
            current = locator::find_nested(&current, descriptor)
                .await
                .map_err(|err| find_error(err, descriptor))?;
        }

        Ok(current)
    }
}

fn classify_fragment(fragment: &str) -> Option<LocatorDescriptor> {
    for strategy in LocatorStrategy::BY_MARKER_LENGTH {
        let marker = format!("{}: ", strategy.marker());
        if let Some(pos) = fragment.find(&marker) {
            let raw = fragment[pos + marker.len()..].trim();
            let value = raw.strip_suffix(FRAGMENT_CLOSE).unwrap_or(raw).trim();
            if value.is_empty() {
                return None;
            }
            return Some(LocatorDescriptor::new(strategy, value));
        }
    }
    None
}

#[cfg(test)]
#[path = "chain_test.rs"]
mod chain_test;
