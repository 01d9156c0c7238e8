//! Types shared by the DB and API representations.

pub mod candidate;
pub mod election;
pub mod user;
