//! # shadowprobe
//!
//! Resilient element resolution for WebDriver-based browser automation.
//!
//! Modern web UIs re-render constantly, which makes raw element references
//! expire mid-test, and they increasingly hide content behind shadow DOM
//! boundaries the native find command cannot cross. This crate wraps a
//! [fantoccini](https://docs.rs/fantoccini) client with two remedies:
//!
//! - **Stale-reference recovery.** Every handle returned by [`Session`]
//!   carries the locator chain that found it. When an action fails because
//!   the reference went stale, the chain is re-resolved against the live
//!   document and the action retried once; any other failure (or a failed
//!   retry) surfaces the original error.
//! - **Shadow DOM search.** [`Session::find_in_shadow`] injects a script
//!   that queries the current scope and then descends depth-first into
//!   every open shadow root, polling from the Rust side until a match
//!   appears or the wait budget runs out.
//!
//! ## Example
//!
//! ```no_run
//! use shadowprobe::{LocatorDescriptor, SearchRoot, Session};
//!
//! # async fn run() -> Result<(), shadowprobe::ProbeError> {
//! let session = Session::connect("http://localhost:4444").await?;
//! session.goto("https://example.com/login").await?;
//!
//! let form = session.find(&LocatorDescriptor::id("login")).await?;
//! let field = session
//!     .find_child(&form, &LocatorDescriptor::name("username"))
//!     .await?;
//! // If the page re-renders between find and send_keys, the handle is
//! // re-resolved through its locator chain and the keys still land.
//! session.send_keys(&field, "ada").await?;
//!
//! // Content inside an open shadow root is invisible to find(); search
//! // for it explicitly.
//! if let Some(badge) = session
//!     .find_in_shadow(SearchRoot::Document, &LocatorDescriptor::css(".badge"), None)
//!     .await?
//! {
//!     println!("badge says: {}", session.text(&badge).await?);
//! }
//! session.close().await
//! # }
//! ```

mod chain;
mod config;
mod errors;
mod locator;
mod recovery;
mod session;
mod shadow;

pub use chain::LocatorChain;
pub use config::WaitConfig;
pub use errors::{ErrorKind, ProbeError};
pub use locator::{LocatorDescriptor, LocatorStrategy};
pub use recovery::{ActionKind, RecoveryStrategy, RecoveryTable};
pub use session::{ElementHandle, Session};
pub use shadow::{SearchRoot, ShadowSearchSpec};
