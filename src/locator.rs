//! Locator descriptors: an immutable "how to find an element" independent of
//! any live DOM handle, plus the lowering onto the native WebDriver locator
//! set and the shadow-search query form.

use fantoccini::Locator;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::ProbeError;

/// Element lookup strategies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocatorStrategy {
    Id,
    Name,
    ClassName,
    Css,
    TagName,
    XPath,
    LinkText,
    PartialLinkText,
}

impl LocatorStrategy {
    /// Strategies ordered longest-marker-first so fragment classification
    /// never matches "name:" inside "class name:" or "link text:" inside
    /// "partial link text:".
    pub(crate) const BY_MARKER_LENGTH: [LocatorStrategy; 8] = [
        LocatorStrategy::PartialLinkText,
        LocatorStrategy::Css,
        LocatorStrategy::ClassName,
        LocatorStrategy::LinkText,
        LocatorStrategy::TagName,
        LocatorStrategy::XPath,
        LocatorStrategy::Name,
        LocatorStrategy::Id,
    ];

    /// The human-readable marker used in element identities, matching the
    /// names drivers print for these strategies.
    pub fn marker(&self) -> &'static str {
        match self {
            LocatorStrategy::Id => "id",
            LocatorStrategy::Name => "name",
            LocatorStrategy::ClassName => "class name",
            LocatorStrategy::Css => "css selector",
            LocatorStrategy::TagName => "tag name",
            LocatorStrategy::XPath => "xpath",
            LocatorStrategy::LinkText => "link text",
            LocatorStrategy::PartialLinkText => "partial link text",
        }
    }
}

impl fmt::Display for LocatorStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// An immutable strategy + value pair describing how to find an element.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocatorDescriptor {
    strategy: LocatorStrategy,
    value: String,
}

impl LocatorDescriptor {
    pub fn new(strategy: LocatorStrategy, value: impl Into<String>) -> Self {
        LocatorDescriptor {
            strategy,
            value: value.into(),
        }
    }

    pub fn id(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Id, value)
    }

    pub fn name(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Name, value)
    }

    pub fn class_name(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::ClassName, value)
    }

    pub fn css(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::Css, value)
    }

    pub fn tag_name(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::TagName, value)
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::XPath, value)
    }

    pub fn link_text(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::LinkText, value)
    }

    pub fn partial_link_text(value: impl Into<String>) -> Self {
        Self::new(LocatorStrategy::PartialLinkText, value)
    }

    pub fn strategy(&self) -> LocatorStrategy {
        self.strategy
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Lower onto the native locator set. fantoccini only speaks
    /// css/id/xpath/link-text, so the remaining strategies are rewritten
    /// into equivalent CSS or XPath queries.
    pub(crate) fn to_query(&self) -> NativeQuery {
        match self.strategy {
            LocatorStrategy::Id => NativeQuery::Id(self.value.clone()),
            LocatorStrategy::Css => NativeQuery::Css(self.value.clone()),
            LocatorStrategy::XPath => NativeQuery::XPath(self.value.clone()),
            LocatorStrategy::LinkText => NativeQuery::LinkText(self.value.clone()),
            LocatorStrategy::Name => {
                NativeQuery::Css(format!("[name=\"{}\"]", escape_css_value(&self.value)))
            }
            // Word match on the class attribute; the quoted form survives
            // CSS-meaningful characters a bare .class selector would not.
            LocatorStrategy::ClassName => {
                NativeQuery::Css(format!("[class~=\"{}\"]", escape_css_value(&self.value)))
            }
            LocatorStrategy::TagName => NativeQuery::Css(self.value.clone()),
            LocatorStrategy::PartialLinkText => NativeQuery::XPath(format!(
                "//a[contains(normalize-space(.), \"{}\")]",
                self.value
            )),
        }
    }

    /// Query form for the shadow-search payload. XPath cannot be evaluated
    /// inside a shadow root, so it is rejected here rather than timing out
    /// in the poll loop.
    pub(crate) fn shadow_query(&self) -> Result<ShadowQuery, ProbeError> {
        let query = match self.strategy {
            LocatorStrategy::XPath => {
                return Err(ProbeError::UnsupportedLocator {
                    strategy: self.strategy.marker().to_string(),
                    context: "shadow root search".to_string(),
                });
            }
            LocatorStrategy::LinkText => ShadowQuery {
                mode: "link-text",
                value: self.value.clone(),
            },
            LocatorStrategy::PartialLinkText => ShadowQuery {
                mode: "partial-link-text",
                value: self.value.clone(),
            },
            LocatorStrategy::Id => ShadowQuery {
                mode: "css",
                value: format!("[id=\"{}\"]", escape_css_value(&self.value)),
            },
            LocatorStrategy::Name => ShadowQuery {
                mode: "css",
                value: format!("[name=\"{}\"]", escape_css_value(&self.value)),
            },
            LocatorStrategy::ClassName => ShadowQuery {
                mode: "css",
                value: format!("[class~=\"{}\"]", escape_css_value(&self.value)),
            },
            LocatorStrategy::TagName => ShadowQuery {
                mode: "css",
                value: self.value.clone(),
            },
            LocatorStrategy::Css => ShadowQuery {
                mode: "css",
                value: self.value.clone(),
            },
        };
        Ok(query)
    }
}

impl fmt::Display for LocatorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.strategy.marker(), self.value)
    }
}

/// A descriptor lowered onto fantoccini's locator set. Owns its selector
/// string so `Locator`'s borrowed form can be produced on demand.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum NativeQuery {
    Css(String),
    Id(String),
    XPath(String),
    LinkText(String),
}

impl NativeQuery {
    pub(crate) fn as_locator(&self) -> Locator<'_> {
        match self {
            NativeQuery::Css(s) => Locator::Css(s),
            NativeQuery::Id(s) => Locator::Id(s),
            NativeQuery::XPath(s) => Locator::XPath(s),
            NativeQuery::LinkText(s) => Locator::LinkText(s),
        }
    }
}

/// Query form consumed by the shadow-search script: a `querySelectorAll`
/// selector, or a link-text filter the script applies to anchors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct ShadowQuery {
    pub(crate) mode: &'static str,
    pub(crate) value: String,
}

fn escape_css_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

pub(crate) async fn find_from_document(
    client: &fantoccini::Client,
    descriptor: &LocatorDescriptor,
) -> Result<Element, CmdError> {
    let query = descriptor.to_query();
    client.find(query.as_locator()).await
}

pub(crate) async fn find_all_from_document(
    client: &fantoccini::Client,
    descriptor: &LocatorDescriptor,
) -> Result<Vec<Element>, CmdError> {
    let query = descriptor.to_query();
    client.find_all(query.as_locator()).await
}

pub(crate) async fn find_nested(
    parent: &Element,
    descriptor: &LocatorDescriptor,
) -> Result<Element, CmdError> {
    let query = descriptor.to_query();
    parent.find(query.as_locator()).await
}

pub(crate) async fn find_all_nested(
    parent: &Element,
    descriptor: &LocatorDescriptor,
) -> Result<Vec<Element>, CmdError> {
    let query = descriptor.to_query();
    parent.find_all(query.as_locator()).await
}

#[cfg(test)]
#[path = "locator_test.rs"]
mod locator_test;
