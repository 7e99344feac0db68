//! Page injector
//!
//! Per-document state machine that binds a tab to its persona and writes
//! the persona prompt into fresh conversations. Host-agnostic: the document
//! is driven through the [`DocumentSurface`] trait.

mod page;
mod surface;

pub use page::{InjectorPhase, MutationOutcome, PageInjector};
pub use surface::{DocumentSurface, MockDocument};
