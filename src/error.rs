//! Rich diagnostic error types for the book catalog.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! so both the HTTP layer and the binary can report what went wrong and how to
//! fix it. The HTTP layer maps these onto status codes in `server::ApiError`.

use miette::Diagnostic;
use thiserror::Error;

use crate::model::FieldError;

// ---------------------------------------------------------------------------
// Catalog errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum CatalogError {
    #[error("book not found: \"{id}\"")]
    #[diagnostic(
        code(bookshelf::catalog::not_found),
        help("No book with this ID exists in the catalog. List books with `GET /api/books`.")
    )]
    BookNotFound { id: String },

    #[error("book payload failed validation ({} field(s))", .errors.len())]
    #[diagnostic(
        code(bookshelf::catalog::validation),
        help("Both `title` and `description` must be non-empty strings.")
    )]
    Validation { errors: Vec<FieldError> },

    #[error("I/O error on {path}: {source}")]
    #[diagnostic(
        code(bookshelf::catalog::io),
        help(
            "Failed to read or write a catalog file. Check that the path exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error in {path}: {message}")]
    #[diagnostic(
        code(bookshelf::catalog::parse),
        help(
            "The file is not a valid JSON array. Fix it by hand or replace its \
             content with `[]`."
        )
    )]
    Parse { path: String, message: String },

    #[error("serialization error: {message}")]
    #[diagnostic(code(bookshelf::catalog::serde))]
    Serialize { message: String },

    #[error("malformed request body: {message}")]
    #[diagnostic(
        code(bookshelf::catalog::body),
        help("The request body must be a JSON object.")
    )]
    MalformedBody { message: String },

    #[error("catalog writer lock poisoned")]
    #[diagnostic(
        code(bookshelf::catalog::lock),
        help("A previous write panicked while holding the lock. Restart the server.")
    )]
    LockPoisoned,
}

/// Convenience alias for catalog operation results.
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(bookshelf::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {path}: {message}")]
    #[diagnostic(
        code(bookshelf::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("invalid port \"{value}\"")]
    #[diagnostic(
        code(bookshelf::config::port),
        help("PORT must be an integer between 0 and 65535.")
    )]
    InvalidPort { value: String },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
