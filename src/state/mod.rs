//! Bus lifecycle state machine.
//!
//! The bus moves between six statuses in response to commands and to the
//! results of its own remote calls. Transitions are computed by a pure
//! function so the table can be checked on its own; the bus applies the
//! returned effects.

mod machine;

pub use machine::{transition, BusEvent, BusStatus, Effect, Transition};
