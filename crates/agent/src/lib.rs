//! Decision routing over the scoring core: exact enumeration for hand play,
//! rule candidates with advisory escalation for strategic phases.

mod action;
mod advisory;
mod config;
mod decision;
mod error;
mod router;
mod session;
mod trace;

pub use action::*;
pub use advisory::*;
pub use config::*;
pub use decision::*;
pub use error::*;
pub use router::*;
pub use session::*;
pub use trace::*;
