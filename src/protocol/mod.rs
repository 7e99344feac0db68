//! Wire protocol for the switchboard boundary.
//!
//! Carries the UI/injector message contract and the host bridge
//! command/event framing. All messages are JSON with a type discriminator;
//! UI messages are fire-and-forget, host commands carry a correlation id
//! when a reply is required.

mod messages;

pub use messages::*;
