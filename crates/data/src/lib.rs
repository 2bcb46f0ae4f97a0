//! Loading and validation for brain configuration and game snapshots.

pub mod load;
pub mod schema;

pub use load::*;
pub use schema::*;
