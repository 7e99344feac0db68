//! Core domain types shared across the switchboard.

mod persona;
mod settings;

pub use persona::*;
pub use settings::*;

/// Browser tab identifier, as issued by the host environment.
///
/// Signed because hosts use a sentinel (-1) for "no tab".
pub type TabId = i64;

/// Opaque persona identifier (UUID v4 string, immutable after creation).
pub type PersonaId = String;
