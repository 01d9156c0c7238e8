//! Data types, in their storage, API and shared forms.

pub mod api;
pub mod common;
pub mod db;
pub mod mongodb;
