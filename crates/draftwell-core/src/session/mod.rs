//! Editing session
//!
//! [`SessionController`] owns the open document and mediates every change to
//! it. The live buffer of that document lives in an [`EditSession`].

mod catalog;
mod controller;
mod error;
mod events;
mod state;

pub use controller::{SessionController, SessionOptions, DEFAULT_AUTOSAVE_DELAY};
pub use error::{SessionError, SessionResult};
pub use events::SessionEvent;
pub use state::{EditSession, ScrollRequest, SessionSnapshot};
