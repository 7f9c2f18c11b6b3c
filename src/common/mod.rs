//! Helpers shared by the lifecycle controller, hook engine and message bus.

mod isolate;

pub use isolate::{Fault, isolate, isolate_sync, panic_message};
