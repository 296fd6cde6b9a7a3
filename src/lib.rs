// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # bookshelf
//!
//! A small HTTP API for a personal book catalog, backed by flat JSON files.
//!
//! ## Architecture
//!
//! - **Model** (`model`): the `Book` record, label constants, ID generation
//! - **Normalization** (`normalize`): payload coercion and validation
//! - **Images** (`image`): data-URI covers written to an image directory
//! - **Catalog** (`catalog`): full read-modify-write over `db.json` / `db_label.json`
//! - **Server** (`server`): axum router mapping catalog results onto HTTP
//!
//! ## Library usage
//!
//! ```no_run
//! use bookshelf::catalog::BookCatalog;
//! use bookshelf::image::ImageStore;
//!
//! let catalog = BookCatalog::open("db.json", "db_label.json", ImageStore::new("image")).unwrap();
//! for book in catalog.list(Some("dune")).unwrap() {
//!     println!("{} by {}", book.title, book.author);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod image;
pub mod model;
pub mod normalize;
pub mod server;
