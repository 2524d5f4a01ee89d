//! Database connection utilities.

use std::path::Path;

use switchy_database::Database;

use crate::DbError;

/// Opens (creating if necessary) the SQLite database at `path`.
///
/// The parent directory is created if it does not exist yet.
///
/// # Errors
///
/// Returns [`DbError`] if the directory cannot be created or the connection
/// fails.
pub fn connect(path: &Path) -> Result<Box<dyn Database>, DbError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| DbError::Conversion {
            message: format!("failed to create database directory {}: {e}", parent.display()),
        })?;
    }

    let db = switchy_database_connection::init_sqlite_rusqlite(Some(path)).map_err(|e| {
        DbError::Conversion {
            message: format!("failed to open database {}: {e}", path.display()),
        }
    })?;

    log::info!("Connected to SQLite database: {}", path.display());
    Ok(db)
}

/// Opens an in-memory SQLite database. Used by tests.
///
/// # Errors
///
/// Returns [`DbError`] if the connection fails.
pub fn connect_in_memory() -> Result<Box<dyn Database>, DbError> {
    let db = switchy_database_connection::init_sqlite_rusqlite(None).map_err(|e| {
        DbError::Conversion {
            message: format!("failed to open in-memory database: {e}"),
        }
    })?;

    Ok(db)
}
