pub use pool::{create_pool, DbPool};
pub use schema::ensure_schema;

mod pool;
mod schema;
