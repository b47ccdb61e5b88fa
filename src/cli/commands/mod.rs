//! CLI command implementations

pub mod batches;
pub mod run;
pub mod sample;
pub mod summary;

use std::path::Path;

use crate::error::CliError;
use sales_pipeline::store::CanonicalStore;

/// Open an existing database for read commands
#[cfg(feature = "duckdb-backend")]
pub fn open_existing_store(database: &Path) -> Result<Box<dyn CanonicalStore>, CliError> {
    if !database.exists() {
        return Err(CliError::DatabaseNotFound(database.to_path_buf()));
    }
    let store = sales_pipeline::store::DuckDbStore::open(&database.to_string_lossy())?;
    store.init()?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "duckdb-backend"))]
pub fn open_existing_store(database: &Path) -> Result<Box<dyn CanonicalStore>, CliError> {
    Err(CliError::InvalidArgument(format!(
        "reading {} requires the duckdb-backend feature",
        database.display()
    )))
}
