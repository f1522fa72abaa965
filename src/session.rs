//! The element action facade: the single entry point test code uses for
//! find/click/type/clear/read, with the recovery engine attached to every
//! primitive and the shadow search engine behind explicit entry points.

use std::time::{Duration, Instant};

use fantoccini::elements::Element;
use fantoccini::{Client, ClientBuilder};
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use crate::chain::{CHAIN_DELIMITER, FRAGMENT_CLOSE, LocatorChain};
use crate::config::WaitConfig;
use crate::errors::{ErrorKind, ProbeError, find_error};
use crate::locator::{self, LocatorDescriptor};
use crate::recovery::Recoverer;
use crate::shadow::{self, SearchRoot, ShadowSearchSpec};

/// Leading fragment of every element identity; carries no locator marker so
/// identity parsing skips it.
const IDENTITY_ROOT: &str = "[[shadowprobe session]";

/// A live DOM element plus the information needed to find it again.
///
/// The wrapped driver reference is borrowed from the page and may expire at
/// any moment; never hold one across a navigation or a known re-render and
/// expect it to stay valid. The identity string records the find path in a
/// human-readable form, and the carried chain (when present) is what
/// recovery uses to re-resolve after a stale failure.
#[derive(Clone, Debug)]
pub struct ElementHandle {
    element: Element,
    identity: String,
    chain: Option<LocatorChain>,
}

impl ElementHandle {
    pub(crate) fn new(element: Element, identity: String, chain: Option<LocatorChain>) -> Self {
        ElementHandle {
            element,
            identity,
            chain,
        }
    }

    /// Human-readable find path, e.g.
    /// `[[shadowprobe session] -> tag name: div]] -> id: username]]`.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The locator chain carried from find time, when one exists.
    /// Shadow-found elements have none: a document-rooted chain cannot
    /// pierce a shadow boundary.
    pub fn chain(&self) -> Option<&LocatorChain> {
        self.chain.as_ref()
    }

    /// The raw driver element, for operations this crate does not wrap.
    /// Anything done through it bypasses recovery.
    pub fn element(&self) -> &Element {
        &self.element
    }
}

pub(crate) fn root_identity(descriptor: &LocatorDescriptor) -> String {
    format!("{IDENTITY_ROOT}{CHAIN_DELIMITER}{descriptor}{FRAGMENT_CLOSE}")
}

pub(crate) fn child_identity(parent: &str, descriptor: &LocatorDescriptor) -> String {
    format!("{parent}{CHAIN_DELIMITER}{descriptor}{FRAGMENT_CLOSE}")
}

/// One WebDriver session.
///
/// All actions are logically serial: the WebDriver channel is not safe for
/// parallel commands, so callers run one action at a time per session and
/// use separate sessions for concurrent tests.
pub struct Session {
    client: Client,
    recoverer: Recoverer,
    wait: WaitConfig,
}

impl Session {
    /// Connect to a WebDriver endpoint (e.g. `http://localhost:4444`).
    pub async fn connect(webdriver_url: &str) -> Result<Self, ProbeError> {
        Self::connect_with_capabilities(webdriver_url, serde_json::Map::new()).await
    }

    /// Connect with explicit capabilities (headless flags, browser options).
    pub async fn connect_with_capabilities(
        webdriver_url: &str,
        capabilities: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, ProbeError> {
        let endpoint = Url::parse(webdriver_url).map_err(|e| {
            ProbeError::Session(format!("invalid webdriver url {webdriver_url}: {e}"))
        })?;
        info!(%endpoint, "connecting to WebDriver");

        let client = ClientBuilder::rustls()
            .capabilities(capabilities)
            .connect(endpoint.as_str())
            .await
            .map_err(|e| ProbeError::Session(format!("failed to connect to {endpoint}: {e}")))?;

        Ok(Self::from_client(client))
    }

    /// Wrap an already-connected client; useful when the host framework
    /// owns the transport.
    pub fn from_client(client: Client) -> Self {
        let recoverer = Recoverer::new(client.clone());
        Session {
            client,
            recoverer,
            wait: WaitConfig::default(),
        }
    }

    pub fn with_wait_config(mut self, wait: WaitConfig) -> Self {
        self.wait = wait;
        self
    }

    pub fn wait_config(&self) -> &WaitConfig {
        &self.wait
    }

    /// The underlying driver client, for calls this facade does not cover.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Navigate and wait for the document to finish loading. Acting on a
    /// page that is still rendering is the most common source of stale
    /// references, so the ready poll is part of navigation.
    pub async fn goto(&self, url: &str) -> Result<(), ProbeError> {
        info!(url, "navigating");
        self.client.goto(url).await?;

        let deadline = Instant::now() + self.wait.wait_duration();
        let ready_script = "return document.readyState === 'complete';";
        loop {
            match self.client.execute(ready_script, vec![]).await {
                Ok(value) if value.as_bool().unwrap_or(false) => break,
                _ if Instant::now() >= deadline => {
                    debug!(url, "document never reported complete; continuing anyway");
                    break;
                }
                _ => sleep(Duration::from_millis(100)).await,
            }
        }
        Ok(())
    }

    /// Find one element from the document root. The returned handle carries
    /// its locator chain so later stale failures can be recovered.
    pub async fn find(&self, descriptor: &LocatorDescriptor) -> Result<ElementHandle, ProbeError> {
        debug!(locator = %descriptor, "find");
        let element = locator::find_from_document(&self.client, descriptor)
            .await
            .map_err(|err| find_error(err, descriptor))?;
        Ok(self.root_handle(element, descriptor))
    }

    /// Find every element matching the descriptor from the document root.
    /// No match is an empty vec, not an error.
    pub async fn find_all(
        &self,
        descriptor: &LocatorDescriptor,
    ) -> Result<Vec<ElementHandle>, ProbeError> {
        debug!(locator = %descriptor, "find all");
        let elements = locator::find_all_from_document(&self.client, descriptor).await?;
        Ok(elements
            .into_iter()
            .map(|element| self.root_handle(element, descriptor))
            .collect())
    }

    /// Poll for an element until the wait budget runs out. Timeouts are
    /// logged and swallowed rather than raised, so a flaky UI degrades a
    /// test instead of aborting it; anything other than "not found" still
    /// propagates.
    pub async fn wait_for(
        &self,
        descriptor: &LocatorDescriptor,
    ) -> Result<Option<ElementHandle>, ProbeError> {
        let deadline = Instant::now() + self.wait.wait_duration();
        loop {
            match locator::find_from_document(&self.client, descriptor).await {
                Ok(element) => return Ok(Some(self.root_handle(element, descriptor))),
                Err(err) if ErrorKind::classify(&err) == ErrorKind::NotFound => {
                    if Instant::now() >= deadline {
                        warn!(
                            locator = %descriptor,
                            waited_secs = self.wait.wait_secs,
                            "explicit wait timed out; returning nothing"
                        );
                        return Ok(None);
                    }
                    sleep(self.wait.poll_interval()).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    fn root_handle(&self, element: Element, descriptor: &LocatorDescriptor) -> ElementHandle {
        let chain = LocatorChain::from_descriptors(vec![descriptor.clone()]);
        ElementHandle::new(element, root_identity(descriptor), Some(chain))
    }

    fn child_handle(
        &self,
        parent: &ElementHandle,
        element: Element,
        descriptor: &LocatorDescriptor,
    ) -> ElementHandle {
        let chain = parent.chain().map(|c| c.extended(descriptor.clone()));
        ElementHandle::new(
            element,
            child_identity(parent.identity(), descriptor),
            chain,
        )
    }

    /// Click, recovering once from a stale reference.
    pub async fn click(&self, handle: &ElementHandle) -> Result<(), ProbeError> {
        self.recoverer.click(handle).await
    }

    /// Type into an element, recovering once from a stale reference.
    pub async fn send_keys(&self, handle: &ElementHandle, text: &str) -> Result<(), ProbeError> {
        self.recoverer.send_keys(handle, text).await
    }

    /// Clear an input, falling back through key-chord strategies until the
    /// value actually reads empty.
    pub async fn clear(&self, handle: &ElementHandle) -> Result<(), ProbeError> {
        self.recoverer.clear(handle).await
    }

    /// Visible text of the element.
    pub async fn text(&self, handle: &ElementHandle) -> Result<String, ProbeError> {
        self.recoverer.text(handle).await
    }

    /// Attribute value, `None` when the attribute is absent.
    pub async fn attr(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, ProbeError> {
        self.recoverer.attr(handle, name).await
    }

    /// Hover the pointer over the element.
    pub async fn move_to(&self, handle: &ElementHandle) -> Result<(), ProbeError> {
        self.recoverer.move_to(handle).await
    }

    /// Find one element nested under the handle. The child's identity and
    /// chain extend the parent's.
    pub async fn find_child(
        &self,
        handle: &ElementHandle,
        descriptor: &LocatorDescriptor,
    ) -> Result<ElementHandle, ProbeError> {
        let element = self.recoverer.find_child(handle, descriptor).await?;
        Ok(self.child_handle(handle, element, descriptor))
    }

    /// Find every matching element nested under the handle.
    pub async fn find_children(
        &self,
        handle: &ElementHandle,
        descriptor: &LocatorDescriptor,
    ) -> Result<Vec<ElementHandle>, ProbeError> {
        let elements = self.recoverer.find_children(handle, descriptor).await?;
        Ok(elements
            .into_iter()
            .map(|element| self.child_handle(handle, element, descriptor))
            .collect())
    }

    /// Search for one element that may live inside a shadow root, polling
    /// until found or the wait budget runs out. A match in the outer scope
    /// wins over one inside a shadow root; budget exhaustion is `None`.
    pub async fn find_in_shadow(
        &self,
        root: SearchRoot<'_>,
        descriptor: &LocatorDescriptor,
        max_wait: Option<Duration>,
    ) -> Result<Option<ElementHandle>, ProbeError> {
        let mut found = self.shadow_search(root, descriptor, max_wait).await?;
        if found.is_empty() {
            Ok(None)
        } else {
            Ok(Some(found.remove(0)))
        }
    }

    /// Search for every element matching the descriptor across the root
    /// scope and all nested shadow roots. Budget exhaustion is an empty vec.
    pub async fn find_all_in_shadow(
        &self,
        root: SearchRoot<'_>,
        descriptor: &LocatorDescriptor,
        max_wait: Option<Duration>,
    ) -> Result<Vec<ElementHandle>, ProbeError> {
        self.shadow_search(root, descriptor, max_wait).await
    }

    async fn shadow_search(
        &self,
        root: SearchRoot<'_>,
        descriptor: &LocatorDescriptor,
        max_wait: Option<Duration>,
    ) -> Result<Vec<ElementHandle>, ProbeError> {
        let mut spec = ShadowSearchSpec::new(descriptor.clone(), &self.wait)?;
        if let Some(max_wait) = max_wait {
            spec = spec.with_max_wait(max_wait);
        }
        let elements = shadow::find_all_with_polling(&self.client, &spec, &root).await?;
        Ok(elements
            .into_iter()
            .map(|element| {
                // No chain: recovery cannot re-resolve through a shadow
                // boundary, so a stale shadow element surfaces its original
                // error.
                ElementHandle::new(element, root_identity(descriptor), None)
            })
            .collect())
    }

    /// Does any open shadow root exist under the given root?
    pub async fn shadow_roots_present(&self, root: SearchRoot<'_>) -> Result<bool, ProbeError> {
        shadow::roots_present(&self.client, &root).await
    }

    /// End the session and close the browser window.
    pub async fn close(self) -> Result<(), ProbeError> {
        self.client.close().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;
