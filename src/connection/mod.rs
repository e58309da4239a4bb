mod core;
mod dml;
mod query;
mod select;
mod tx;

pub use self::core::{Connection, LinkState};
pub use dml::{Table, WhereClause};
pub use query::LINK_LOST_MESSAGE;
