mod desc;
mod query;
mod spec;

pub use desc::{ElectionDescription, ElectionDetail, LocationDescription};
pub use query::ElectionQuery;
pub use spec::ElectionSpec;
