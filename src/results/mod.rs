mod query_result;
mod row;

pub use query_result::{QueryResult, Record, Rows};
pub use row::Row;
