//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.
//!
//! Each stored type comes as a `*Core` (everything but the ID, i.e. what gets
//! inserted) and a full type with its `_id` that derefs to the core.

pub mod candidate;
pub mod election;
pub mod location;
pub mod user;
pub mod vote;
