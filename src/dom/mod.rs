//! Externally-supplied document model.
//!
//! The runtime never owns the page: the embedder constructs a [`Document`],
//! mutates it as the environment changes (insertions, viewport, visibility),
//! and the runtime classifies, queries, and observes it. Element waiting is a
//! cancellable subscription with a bounded deadline; text updates are
//! suppressed when the content hash is unchanged.

mod core;
mod wait;

pub use core::{Document, Element, ErrorHook, Selector, SharedDocument};
pub use wait::{DEFAULT_WAIT_TIMEOUT_MS, ElementWait, WaitStatus};
