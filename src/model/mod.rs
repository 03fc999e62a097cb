//! Datastore data model
//!
//! - [`Key`] / [`ListQuery`]: closed unions over every entity kind
//! - [`KVPair`] / [`Value`]: what the datastore reads and writes
//! - value records for each kind

pub mod key;
pub mod kvpair;
pub mod values;

pub use key::*;
pub use kvpair::*;
pub use values::*;
