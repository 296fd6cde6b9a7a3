//! Persistent book catalog backed by two flat JSON files.
//!
//! `db.json` holds the full array of books and `db_label.json` the list of
//! known labels. Nothing is cached: every call re-reads the files, and every
//! mutation rewrites the whole book array.
//!
//! Read-modify-write sequences are serialized behind a single writer lock so
//! two concurrent mutations cannot overwrite each other's changes.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{CatalogError, CatalogResult};
use crate::image::ImageStore;
use crate::model::{Book, generate_id};
use crate::normalize::{ImageFallback, book_from_data};

/// File-backed store for books and labels.
pub struct BookCatalog {
    books_path: PathBuf,
    labels_path: PathBuf,
    images: ImageStore,
    writer: Mutex<()>,
}

impl BookCatalog {
    /// Open the catalog, creating either file with `[]` if it doesn't exist.
    pub fn open(
        books_path: impl Into<PathBuf>,
        labels_path: impl Into<PathBuf>,
        images: ImageStore,
    ) -> CatalogResult<Self> {
        let catalog = Self {
            books_path: books_path.into(),
            labels_path: labels_path.into(),
            images,
            writer: Mutex::new(()),
        };
        ensure_array_file(&catalog.books_path)?;
        ensure_array_file(&catalog.labels_path)?;
        Ok(catalog)
    }

    pub fn books_path(&self) -> &Path {
        &self.books_path
    }

    pub fn labels_path(&self) -> &Path {
        &self.labels_path
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    /// All known labels.
    pub fn labels(&self) -> CatalogResult<Vec<String>> {
        read_array(&self.labels_path)
    }

    /// All books, or those whose title or description contains `search`
    /// (case-insensitive). An empty search term returns everything.
    pub fn list(&self, search: Option<&str>) -> CatalogResult<Vec<Book>> {
        let books: Vec<Book> = read_array(&self.books_path)?;
        let Some(term) = search.filter(|s| !s.is_empty()) else {
            return Ok(books);
        };
        let term = term.trim().to_lowercase();
        Ok(books
            .into_iter()
            .filter(|book| {
                [&book.title, &book.description]
                    .iter()
                    .any(|s| s.to_lowercase().contains(&term))
            })
            .collect())
    }

    /// Books carrying exactly `label`. No label returns the full list.
    pub fn list_by_label(&self, label: Option<&str>) -> CatalogResult<Vec<Book>> {
        let Some(label) = label.filter(|l| !l.is_empty()) else {
            return self.list(None);
        };
        let books: Vec<Book> = read_array(&self.books_path)?;
        Ok(books.into_iter().filter(|b| b.label == label).collect())
    }

    /// Look up a book by ID.
    pub fn get(&self, id: &str) -> CatalogResult<Book> {
        let books: Vec<Book> = read_array(&self.books_path)?;
        books
            .into_iter()
            .find(|b| b.id == id)
            .ok_or_else(|| CatalogError::BookNotFound { id: id.into() })
    }

    /// Validate a payload and append it as a new book with a fresh ID.
    pub fn create(&self, data: &Map<String, Value>) -> CatalogResult<Book> {
        let _guard = self.lock()?;
        let id = generate_id();
        let labels = self.labels()?;
        let book = book_from_data(data, &id, &labels, &self.images, ImageFallback::Placeholder)?;

        let mut books: Vec<Book> = read_array(&self.books_path)?;
        books.push(book.clone());
        write_array(&self.books_path, &books)?;

        tracing::info!(id = %book.id, title = %book.title, "book created");
        Ok(book)
    }

    /// Merge `patch` over the stored book, re-validate, and persist.
    ///
    /// When the patch carries no `image` key the stored image path is kept;
    /// an explicit non-data-URI image resets it to the placeholder.
    pub fn update(&self, id: &str, patch: &Map<String, Value>) -> CatalogResult<Book> {
        let _guard = self.lock()?;
        let mut books: Vec<Book> = read_array(&self.books_path)?;
        let index = books
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| CatalogError::BookNotFound { id: id.into() })?;

        let existing = &books[index];
        let mut merged = match serde_json::to_value(existing) {
            Ok(Value::Object(map)) => map,
            Ok(_) => Map::new(),
            Err(e) => {
                return Err(CatalogError::Serialize {
                    message: e.to_string(),
                });
            }
        };
        merged.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));

        let fallback = if patch.contains_key("image") {
            ImageFallback::Placeholder
        } else {
            ImageFallback::Keep(&existing.image)
        };
        let labels = self.labels()?;
        let updated = book_from_data(&merged, id, &labels, &self.images, fallback)?;

        books[index] = updated.clone();
        write_array(&self.books_path, &books)?;

        tracing::info!(id, "book updated");
        Ok(updated)
    }

    /// Remove a book by ID.
    pub fn delete(&self, id: &str) -> CatalogResult<()> {
        let _guard = self.lock()?;
        let mut books: Vec<Book> = read_array(&self.books_path)?;
        let index = books
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| CatalogError::BookNotFound { id: id.into() })?;
        books.remove(index);
        write_array(&self.books_path, &books)?;

        tracing::info!(id, "book deleted");
        Ok(())
    }

    fn lock(&self) -> CatalogResult<std::sync::MutexGuard<'_, ()>> {
        self.writer.lock().map_err(|_| CatalogError::LockPoisoned)
    }
}

fn ensure_array_file(path: &Path) -> CatalogResult<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    std::fs::write(path, "[]").map_err(|e| io_error(path, e))?;
    tracing::info!(path = %path.display(), "created empty database file");
    Ok(())
}

/// Read a JSON array from disk. An empty file reads as `[]`.
fn read_array<T: DeserializeOwned>(path: &Path) -> CatalogResult<Vec<T>> {
    let data = std::fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&data).map_err(|e| CatalogError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

fn write_array<T: Serialize>(path: &Path, items: &[T]) -> CatalogResult<()> {
    let json = serde_json::to_string(items).map_err(|e| CatalogError::Serialize {
        message: e.to_string(),
    })?;
    std::fs::write(path, json).map_err(|e| io_error(path, e))
}

fn io_error(path: &Path, source: std::io::Error) -> CatalogError {
    CatalogError::Io {
        path: path.display().to_string(),
        source,
    }
}
