//! Recursive, polling search across nested shadow roots.
//!
//! The native find-element command cannot see through a shadow boundary, so
//! matching happens inside an injected script that queries the current scope
//! and then descends depth-first into every open shadow root below it. The
//! script performs exactly one probe per invocation; the poll/sleep loop runs
//! here, so a slow search never blocks the page's own event loop.

use std::future::Future;
use std::time::{Duration, Instant};

use fantoccini::Client;
use fantoccini::elements::{Element, ElementRef};
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::config::WaitConfig;
use crate::errors::ProbeError;
use crate::locator::LocatorDescriptor;
use crate::session::ElementHandle;

/// Where a shadow search starts.
#[derive(Clone, Copy, Debug)]
pub enum SearchRoot<'a> {
    /// Search the whole document.
    Document,
    /// Search below (and inside the shadow root of) the given element.
    Element(&'a ElementHandle),
}

impl SearchRoot<'_> {
    pub(crate) fn script_arg(&self) -> Result<Value, ProbeError> {
        match self {
            SearchRoot::Document => Ok(Value::Null),
            SearchRoot::Element(handle) => Ok(serde_json::to_value(handle.element())?),
        }
    }
}

/// Parameters for one shadow search. Created per call and discarded after
/// the call returns; construction validates the descriptor so an XPath
/// search fails before any polling starts.
#[derive(Clone, Debug)]
pub struct ShadowSearchSpec {
    descriptor: LocatorDescriptor,
    max_wait: Duration,
    poll_interval: Duration,
}

impl ShadowSearchSpec {
    pub fn new(descriptor: LocatorDescriptor, config: &WaitConfig) -> Result<Self, ProbeError> {
        descriptor.shadow_query()?;
        Ok(ShadowSearchSpec {
            descriptor,
            max_wait: config.wait_duration(),
            poll_interval: config.poll_interval(),
        })
    }

    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn descriptor(&self) -> &LocatorDescriptor {
        &self.descriptor
    }

    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

/// One probe: query the scope, then depth-first into every open shadow root.
/// Scope-level matches are pushed before any shadow match, which is what
/// gives single-element search its document-first priority.
pub(crate) const SHADOW_SEARCH_SCRIPT: &str = r#"
    const scopeArg = arguments[0];
    const mode = arguments[1];
    const value = arguments[2];
    const start = scopeArg || document;
    const matches = [];
    const probe = (scope) => {
        if (mode === 'css') {
            for (const el of scope.querySelectorAll(value)) {
                matches.push(el);
            }
        } else {
            for (const anchor of scope.querySelectorAll('a')) {
                const text = (anchor.textContent || '').trim();
                if (mode === 'link-text' ? text === value : text.includes(value)) {
                    matches.push(anchor);
                }
            }
        }
    };
    const search = (scope) => {
        probe(scope);
        if (scope.shadowRoot) {
            search(scope.shadowRoot);
        }
        for (const node of scope.querySelectorAll('*')) {
            if (node.shadowRoot) {
                search(node.shadowRoot);
            }
        }
    };
    search(start);
    return matches;
"#;

/// Same descend logic without the match step; returns as soon as one
/// shadow-hosting node is seen. A host nested inside another shadow root is
/// always preceded by a host in the light DOM, so one level of scan suffices.
pub(crate) const SHADOW_PRESENCE_SCRIPT: &str = r#"
    const scopeArg = arguments[0];
    const start = scopeArg || document;
    if (start.shadowRoot) {
        return true;
    }
    for (const node of start.querySelectorAll('*')) {
        if (node.shadowRoot) {
            return true;
        }
    }
    return false;
"#;

/// Poll a probe until it yields something or the deadline passes.
/// Exhaustion is a normal empty result, never an error; the probe always
/// runs at least once even with a zero budget.
pub(crate) async fn poll_until_found<T, P, PFut>(
    max_wait: Duration,
    poll_interval: Duration,
    mut probe: P,
) -> Result<Vec<T>, ProbeError>
where
    P: FnMut() -> PFut,
    PFut: Future<Output = Result<Vec<T>, ProbeError>>,
{
    let deadline = Instant::now() + max_wait;
    loop {
        let found = probe().await?;
        if !found.is_empty() {
            return Ok(found);
        }
        if Instant::now() >= deadline {
            return Ok(Vec::new());
        }
        sleep(poll_interval).await;
    }
}

/// Poll the recursive probe until something matches or the budget runs out.
pub(crate) async fn find_all_with_polling(
    client: &Client,
    spec: &ShadowSearchSpec,
    root: &SearchRoot<'_>,
) -> Result<Vec<Element>, ProbeError> {
    let query = spec.descriptor().shadow_query()?;
    let root_arg = root.script_arg()?;

    let found = poll_until_found(spec.max_wait(), spec.poll_interval(), || {
        trace!(locator = %spec.descriptor(), "shadow probe");
        probe_once(client, &root_arg, query.mode, &query.value)
    })
    .await?;

    if found.is_empty() {
        debug!(locator = %spec.descriptor(), "shadow search exhausted its wait budget");
    } else {
        debug!(
            locator = %spec.descriptor(),
            count = found.len(),
            "shadow search matched"
        );
    }
    Ok(found)
}

async fn probe_once(
    client: &Client,
    root_arg: &Value,
    mode: &str,
    value: &str,
) -> Result<Vec<Element>, ProbeError> {
    let raw = client
        .execute(
            SHADOW_SEARCH_SCRIPT,
            vec![root_arg.clone(), json!(mode), json!(value)],
        )
        .await?;
    /// The W3C wire form of an element handle: a single-key object whose
    /// key is the WebDriver element identifier constant.
    #[derive(serde::Deserialize)]
    struct WebElementObject {
        #[serde(rename = "element-6066-11e4-a52e-4f735466cecf")]
        id: String,
    }

    let refs: Vec<WebElementObject> = serde_json::from_value(raw)?;
    Ok(refs
        .into_iter()
        .map(|obj| Element::from_element_id(client.clone(), ElementRef::from(obj.id)))
        .collect())
}

/// Does any open shadow root exist under the given root?
pub(crate) async fn roots_present(
    client: &Client,
    root: &SearchRoot<'_>,
) -> Result<bool, ProbeError> {
    let root_arg = root.script_arg()?;
    let raw = client
        .execute(SHADOW_PRESENCE_SCRIPT, vec![root_arg])
        .await?;
    Ok(raw.as_bool().unwrap_or(false))
}

#[cfg(test)]
#[path = "shadow_test.rs"]
mod shadow_test;
