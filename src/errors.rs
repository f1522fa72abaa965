use fantoccini::error::CmdError;
use std::fmt;
use thiserror::Error;

/// Errors surfaced by the public API.
///
/// Driver failures are carried unwrapped in [`ProbeError::Driver`] so callers
/// always see the original WebDriver error, never a re-wrapped copy.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// No element matched the descriptor.
    #[error("no element found matching {0}")]
    NotFound(String),
    /// A locator strategy was used in a context that cannot support it.
    #[error("{strategy} locators are not supported in {context}")]
    UnsupportedLocator { strategy: String, context: String },
    /// An explicit wait ran out of budget.
    #[error("operation timed out: {0}")]
    Timeout(String),
    /// Every clear fallback ran and the field still holds a value.
    #[error("failed to clear element {0}: value still present after all fallbacks")]
    ClearFailed(String),
    /// The WebDriver session could not be established or has gone away.
    #[error("webdriver session error: {0}")]
    Session(String),
    /// A script payload argument or result could not be (de)serialized.
    #[error("script payload serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    /// Raw driver error, passed through untouched.
    #[error(transparent)]
    Driver(#[from] CmdError),
}

/// Coarse classification of a driver failure, used as the dispatch key for
/// the recovery table instead of matching on concrete error types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The element reference was invalidated by a page re-render.
    Stale,
    /// Nothing matched the locator.
    NotFound,
    /// The driver reported a timeout.
    Timeout,
    /// Anything else; never eligible for recovery.
    Other,
}

impl ErrorKind {
    /// Classify a driver error by its message.
    ///
    /// Geckodriver and chromedriver agree on the W3C error strings
    /// ("stale element reference", "no such element"), so substring
    /// matching is stable across both.
    pub fn classify(err: &CmdError) -> Self {
        Self::from_message(&err.to_string())
    }

    pub(crate) fn from_message(msg: &str) -> Self {
        let msg = msg.to_ascii_lowercase();
        if msg.contains("stale element") {
            ErrorKind::Stale
        } else if msg.contains("no such element") || msg.contains("unable to locate element") {
            ErrorKind::NotFound
        } else if msg.contains("timeout") || msg.contains("timed out") {
            ErrorKind::Timeout
        } else {
            ErrorKind::Other
        }
    }
}

/// Map a failed find to the public error: a no-match becomes `NotFound`
/// naming the target, everything else passes through as the driver error.
pub(crate) fn find_error(err: CmdError, target: impl fmt::Display) -> ProbeError {
    match ErrorKind::classify(&err) {
        ErrorKind::NotFound => ProbeError::NotFound(target.to_string()),
        _ => ProbeError::Driver(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_stale_messages() {
        assert_eq!(
            ErrorKind::from_message(
                "stale element reference: The element reference of <div> is stale"
            ),
            ErrorKind::Stale
        );
        assert_eq!(
            ErrorKind::from_message("Stale Element Reference"),
            ErrorKind::Stale
        );
    }

    #[test]
    fn classifies_not_found_messages() {
        assert_eq!(
            ErrorKind::from_message("no such element: Unable to locate element: #missing"),
            ErrorKind::NotFound
        );
        assert_eq!(
            ErrorKind::from_message("Unable to locate element: {\"method\":\"css\"}"),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn classifies_timeouts() {
        assert_eq!(
            ErrorKind::from_message("timeout: Timed out receiving message from renderer"),
            ErrorKind::Timeout
        );
    }

    #[test]
    fn unknown_messages_are_other() {
        assert_eq!(
            ErrorKind::from_message("invalid session id"),
            ErrorKind::Other
        );
        assert_eq!(ErrorKind::from_message(""), ErrorKind::Other);
    }

    #[test]
    fn unsupported_locator_display_names_the_combination() {
        let err = ProbeError::UnsupportedLocator {
            strategy: "xpath".to_string(),
            context: "shadow root search".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "xpath locators are not supported in shadow root search"
        );
    }
}
