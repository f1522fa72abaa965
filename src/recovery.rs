//! Stale-element recovery: wraps every primitive action in a
//! classify-and-retry envelope. A failed action is classified by error kind
//! and looked up in the recovery table; when a recovery is registered, the
//! action is retried exactly once on a re-resolved element. Unmapped
//! failures propagate untouched, and a second failure is always fatal.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use fantoccini::Client;
use fantoccini::actions::{InputSource, KeyAction, KeyActions};
use fantoccini::elements::Element;
use tracing::{debug, warn};

use crate::chain::LocatorChain;
use crate::errors::{ErrorKind, ProbeError, find_error};
use crate::locator::{self, LocatorDescriptor};
use crate::session::ElementHandle;

// W3C WebDriver keyboard codepoints.
const KEY_CONTROL: char = '\u{e009}';
const KEY_DELETE: char = '\u{e017}';
const KEY_NULL: char = '\u{e000}';

/// Operation categories the recovery table is keyed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ActionKind {
    SendKeys,
    Click,
    Clear,
    GetText,
    GetAttribute,
    FindChild,
    FindChildren,
    Move,
}

impl ActionKind {
    pub const ALL: [ActionKind; 8] = [
        ActionKind::SendKeys,
        ActionKind::Click,
        ActionKind::Clear,
        ActionKind::GetText,
        ActionKind::GetAttribute,
        ActionKind::FindChild,
        ActionKind::FindChildren,
        ActionKind::Move,
    ];
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::SendKeys => "send-keys",
            ActionKind::Click => "click",
            ActionKind::Clear => "clear",
            ActionKind::GetText => "get-text",
            ActionKind::GetAttribute => "get-attribute",
            ActionKind::FindChild => "find-child",
            ActionKind::FindChildren => "find-children",
            ActionKind::Move => "move",
        };
        f.write_str(name)
    }
}

/// What to do when a mapped failure is observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryStrategy {
    /// Re-resolve the element from its locator chain and retry once.
    Reattach,
}

/// Static map from (error kind, action kind) to a recovery strategy.
/// Exactly one entry exists per supported pair; pairs without an entry
/// propagate the original error.
#[derive(Clone, Debug)]
pub struct RecoveryTable {
    entries: HashMap<(ErrorKind, ActionKind), RecoveryStrategy>,
}

impl RecoveryTable {
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        for action in ActionKind::ALL {
            entries.insert((ErrorKind::Stale, action), RecoveryStrategy::Reattach);
        }
        RecoveryTable { entries }
    }

    pub fn lookup(&self, kind: ErrorKind, action: ActionKind) -> Option<RecoveryStrategy> {
        self.entries.get(&(kind, action)).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for RecoveryTable {
    fn default() -> Self {
        Self::new()
    }
}

/// The classify-lookup-retry envelope, parameterized over the operation and
/// the recovery step. The first attempt runs with no replacement element;
/// when it fails and `recover` yields a fresh one, the operation runs once
/// more against it and that second outcome is final. A `None` from `recover`
/// propagates the first error untouched. There is no loop: recovery happens
/// at most once per call.
pub(crate) async fn retry_once<El, T, E, Op, OpFut, Classify, Re, ReFut>(
    mut op: Op,
    classify: Classify,
    recover: Re,
) -> Result<T, E>
where
    Op: FnMut(Option<El>) -> OpFut,
    OpFut: Future<Output = Result<T, E>>,
    Classify: FnOnce(&E) -> ErrorKind,
    Re: FnOnce(ErrorKind) -> ReFut,
    ReFut: Future<Output = Option<El>>,
{
    match op(None).await {
        Ok(value) => Ok(value),
        Err(err) => {
            let kind = classify(&err);
            match recover(kind).await {
                Some(fresh) => op(Some(fresh)).await,
                None => Err(err),
            }
        }
    }
}

/// Executes primitive actions with the recovery envelope attached.
pub(crate) struct Recoverer {
    client: Client,
    table: RecoveryTable,
}

impl Recoverer {
    pub(crate) fn new(client: Client) -> Self {
        Recoverer {
            client,
            table: RecoveryTable::new(),
        }
    }

    /// Rebuild a live element for the handle. Uses the chain carried from
    /// find time when present; otherwise falls back to parsing the handle's
    /// identity string. `None` means recovery is not possible and the
    /// caller must propagate the original error.
    async fn reattach(&self, handle: &ElementHandle) -> Option<Element> {
        let chain = match handle.chain() {
            Some(chain) => chain.clone(),
            None => LocatorChain::parse(handle.identity()),
        };
        if chain.is_empty() {
            warn!(
                identity = %handle.identity(),
                "no usable locator chain; cannot re-resolve"
            );
            return None;
        }
        match chain.resolve(&self.client).await {
            Ok(element) => {
                debug!(
                    identity = %handle.identity(),
                    hops = chain.len(),
                    "re-resolved stale element"
                );
                Some(element)
            }
            Err(err) => {
                warn!(
                    identity = %handle.identity(),
                    error = %err,
                    "re-resolution failed; surfacing the original error"
                );
                None
            }
        }
    }

    /// The single recovery gate: consult the table, then re-resolve.
    /// Returns the fresh element to retry against, or `None` when the
    /// original error must propagate.
    async fn recovered(
        &self,
        handle: &ElementHandle,
        kind: ErrorKind,
        action: ActionKind,
    ) -> Option<Element> {
        match self.table.lookup(kind, action)? {
            RecoveryStrategy::Reattach => {}
        }
        warn!(
            identity = %handle.identity(),
            action = %action,
            kind = ?kind,
            "action failed; attempting one recovery"
        );
        self.reattach(handle).await
    }

    pub(crate) async fn click(&self, handle: &ElementHandle) -> Result<(), ProbeError> {
        debug!(identity = %handle.identity(), action = %ActionKind::Click, "element action");
        retry_once(
            |fresh| {
                let element = fresh.unwrap_or_else(|| handle.element().clone());
                async move { element.click().await }
            },
            ErrorKind::classify,
            |kind| self.recovered(handle, kind, ActionKind::Click),
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn send_keys(
        &self,
        handle: &ElementHandle,
        text: &str,
    ) -> Result<(), ProbeError> {
        debug!(identity = %handle.identity(), action = %ActionKind::SendKeys, "element action");
        retry_once(
            |fresh| {
                let element = fresh.unwrap_or_else(|| handle.element().clone());
                async move { element.send_keys(text).await }
            },
            ErrorKind::classify,
            |kind| self.recovered(handle, kind, ActionKind::SendKeys),
        )
        .await?;
        Ok(())
    }

    pub(crate) async fn text(&self, handle: &ElementHandle) -> Result<String, ProbeError> {
        debug!(identity = %handle.identity(), action = %ActionKind::GetText, "element action");
        let text = retry_once(
            |fresh| {
                let element = fresh.unwrap_or_else(|| handle.element().clone());
                async move { element.text().await }
            },
            ErrorKind::classify,
            |kind| self.recovered(handle, kind, ActionKind::GetText),
        )
        .await?;
        Ok(text)
    }

    pub(crate) async fn attr(
        &self,
        handle: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, ProbeError> {
        debug!(
            identity = %handle.identity(),
            action = %ActionKind::GetAttribute,
            attribute = name,
            "element action"
        );
        let value = retry_once(
            |fresh| {
                let element = fresh.unwrap_or_else(|| handle.element().clone());
                async move { element.attr(name).await }
            },
            ErrorKind::classify,
            |kind| self.recovered(handle, kind, ActionKind::GetAttribute),
        )
        .await?;
        Ok(value)
    }

    pub(crate) async fn find_child(
        &self,
        handle: &ElementHandle,
        descriptor: &LocatorDescriptor,
    ) -> Result<Element, ProbeError> {
        debug!(
            identity = %handle.identity(),
            action = %ActionKind::FindChild,
            locator = %descriptor,
            "element action"
        );
        retry_once(
            |fresh| {
                let parent = fresh.unwrap_or_else(|| handle.element().clone());
                async move { locator::find_nested(&parent, descriptor).await }
            },
            ErrorKind::classify,
            |kind| self.recovered(handle, kind, ActionKind::FindChild),
        )
        .await
        .map_err(|err| find_error(err, descriptor))
    }

    pub(crate) async fn find_children(
        &self,
        handle: &ElementHandle,
        descriptor: &LocatorDescriptor,
    ) -> Result<Vec<Element>, ProbeError> {
        debug!(
            identity = %handle.identity(),
            action = %ActionKind::FindChildren,
            locator = %descriptor,
            "element action"
        );
        let children = retry_once(
            |fresh| {
                let parent = fresh.unwrap_or_else(|| handle.element().clone());
                async move { locator::find_all_nested(&parent, descriptor).await }
            },
            ErrorKind::classify,
            |kind| self.recovered(handle, kind, ActionKind::FindChildren),
        )
        .await?;
        Ok(children)
    }

    pub(crate) async fn move_to(&self, handle: &ElementHandle) -> Result<(), ProbeError> {
        debug!(identity = %handle.identity(), action = %ActionKind::Move, "element action");
        match self.dispatch_hover(handle.element()).await {
            Ok(()) => Ok(()),
            Err(ProbeError::Driver(err)) => {
                let kind = ErrorKind::classify(&err);
                match self.recovered(handle, kind, ActionKind::Move).await {
                    Some(fresh) => self.dispatch_hover(&fresh).await,
                    None => Err(err.into()),
                }
            }
            Err(other) => Err(other),
        }
    }

    async fn dispatch_hover(&self, element: &Element) -> Result<(), ProbeError> {
        let hover_script = r#"
            const el = arguments[0];
            el.scrollIntoView({ block: 'center', inline: 'nearest' });
            for (const type of ['mouseover', 'mouseenter', 'mousemove']) {
                el.dispatchEvent(new MouseEvent(type, {
                    bubbles: true,
                    cancelable: true,
                    view: window
                }));
            }
        "#;
        let arg = serde_json::to_value(element)?;
        self.client.execute(hover_script, vec![arg]).await?;
        Ok(())
    }

    pub(crate) async fn clear(&self, handle: &ElementHandle) -> Result<(), ProbeError> {
        debug!(identity = %handle.identity(), action = %ActionKind::Clear, "element action");
        match self.clear_with_fallback(handle.element(), handle.identity()).await {
            Ok(()) => Ok(()),
            Err(ProbeError::Driver(err)) => {
                let kind = ErrorKind::classify(&err);
                match self.recovered(handle, kind, ActionKind::Clear).await {
                    Some(fresh) => self.clear_with_fallback(&fresh, handle.identity()).await,
                    None => Err(err.into()),
                }
            }
            // ClearFailed means every tier ran against a live element; a
            // retry would repeat the same ladder, so it is final.
            Err(other) => Err(other),
        }
    }

    /// Three-tier clear. Each fallback runs only after re-reading the value
    /// and observing the previous tier left content behind.
    async fn clear_with_fallback(
        &self,
        element: &Element,
        identity: &str,
    ) -> Result<(), ProbeError> {
        element.clear().await?;
        if field_value(element).await?.is_none() {
            return Ok(());
        }

        debug!(identity, "native clear left a value; sending select-all chord to the element");
        element.send_keys(&select_all_delete_chord()).await?;
        if field_value(element).await?.is_none() {
            return Ok(());
        }

        debug!(identity, "element chord failed; focusing and sending driver-level key input");
        element.click().await?;
        self.perform_select_all_delete().await?;
        match field_value(element).await? {
            None => Ok(()),
            Some(_) => Err(ProbeError::ClearFailed(identity.to_string())),
        }
    }

    /// Driver-level select-all + delete, delivered as real key input rather
    /// than element send-keys.
    async fn perform_select_all_delete(&self) -> Result<(), fantoccini::error::CmdError> {
        let chord = KeyActions::new("keyboard".to_string())
            .then(KeyAction::Down { value: KEY_CONTROL })
            .then(KeyAction::Down { value: 'a' })
            .then(KeyAction::Up { value: 'a' })
            .then(KeyAction::Up { value: KEY_CONTROL })
            .then(KeyAction::Down { value: KEY_DELETE })
            .then(KeyAction::Up { value: KEY_DELETE });
        let mut driver = self.client.clone();
        driver.perform_actions(chord).await?;
        Ok(())
    }
}

/// The field's current value, normalized so an empty string reads as
/// "cleared".
async fn field_value(element: &Element) -> Result<Option<String>, fantoccini::error::CmdError> {
    let value = element.prop("value").await?;
    Ok(value.filter(|v| !v.is_empty()))
}

/// Select-all + delete as an element key chord; the trailing NULL releases
/// the modifier.
pub(crate) fn select_all_delete_chord() -> String {
    format!("{KEY_CONTROL}a{KEY_DELETE}{KEY_NULL}")
}

#[cfg(test)]
#[path = "recovery_test.rs"]
mod recovery_test;
