pub mod db;
pub mod models;
pub mod repositories;

#[cfg(test)]
pub(crate) mod test_util;

pub use sqlx;

pub use db::init_db;

/// Embedded migrations, exported so test harnesses in dependent crates can
/// apply the schema to their own pools.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
