//! Listener bookkeeping for the bus.
//!
//! Every kind of callback the bus fans out to (observers, connect, error and
//! log-batch listeners) lives in its own [`ListenerRegistry`]. Registrations
//! hand back a [`Disposer`] that removes exactly that listener.

mod disposer;
mod registry;

pub use disposer::Disposer;
pub use registry::ListenerRegistry;
