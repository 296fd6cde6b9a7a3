//! Validation and normalization of incoming book payloads.
//!
//! Request bodies are loosely typed JSON objects. This module turns one into a
//! `Book`: strings are coerced and trimmed, unknown labels fall back to
//! [`FALLBACK_LABEL`], the rating defaults to zero and data-URI images are
//! written to the image store.

use serde_json::{Map, Number, Value};

use crate::error::{CatalogError, CatalogResult};
use crate::image::{DataUri, ImageStore};
use crate::model::{Book, FALLBACK_LABEL, FieldError, PLACEHOLDER_IMAGE};

const TITLE_MISSING: &str = "Book title is not specified";
const DESCRIPTION_MISSING: &str = "Book description is not specified";

/// Coerce a JSON value to a trimmed string. Falsy values become empty.
pub fn as_trimmed_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) if !is_zero(n) => n.to_string(),
        Some(Value::Bool(true)) => "true".to_string(),
        _ => String::new(),
    }
}

/// Keep `label` only if it names a known label.
pub fn as_label(value: Option<&Value>, labels: &[String]) -> String {
    match value {
        Some(Value::String(s)) if labels.iter().any(|l| l == s) => s.clone(),
        _ => FALLBACK_LABEL.to_string(),
    }
}

/// Pass a rating through, defaulting to zero when it is absent or falsy.
pub fn as_rating(value: Option<&Value>) -> Number {
    match value {
        Some(Value::Number(n)) => n.clone(),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(Number::from_f64))
                .unwrap_or_else(|| Number::from(0))
        }
        _ => Number::from(0),
    }
}

fn is_zero(n: &Number) -> bool {
    n.as_f64() == Some(0.0)
}

/// What to do with the `image` field when it is not a fresh data-URI.
#[derive(Debug, Clone, Copy)]
pub enum ImageFallback<'a> {
    /// Store the placeholder path.
    Placeholder,
    /// Keep a previously stored path.
    Keep(&'a str),
}

/// Build a `Book` from a loosely-typed payload.
///
/// Validation runs before any image is written, so a rejected payload never
/// leaves a file behind.
pub fn book_from_data(
    data: &Map<String, Value>,
    id: &str,
    labels: &[String],
    images: &ImageStore,
    fallback: ImageFallback<'_>,
) -> CatalogResult<Book> {
    let title = as_trimmed_string(data.get("title"));
    let author = as_trimmed_string(data.get("author"));
    let description = as_trimmed_string(data.get("description"));

    let mut errors = Vec::new();
    if title.is_empty() {
        errors.push(FieldError::new("title", TITLE_MISSING));
    }
    if description.is_empty() {
        errors.push(FieldError::new("description", DESCRIPTION_MISSING));
    }
    if !errors.is_empty() {
        return Err(CatalogError::Validation { errors });
    }

    let image = match data.get("image").and_then(Value::as_str).and_then(DataUri::parse) {
        Some(uri) => images.save(&uri, id),
        None => match fallback {
            ImageFallback::Placeholder => PLACEHOLDER_IMAGE.to_string(),
            ImageFallback::Keep(path) => path.to_string(),
        },
    };

    Ok(Book {
        id: id.to_string(),
        title,
        author,
        description,
        label: as_label(data.get("label"), labels),
        image,
        rating: as_rating(data.get("rating")),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn labels() -> Vec<String> {
        vec!["read".into(), "reading".into(), "wish".into()]
    }

    #[test]
    fn trims_and_coerces_strings() {
        assert_eq!(as_trimmed_string(Some(&json!("  Dune  "))), "Dune");
        assert_eq!(as_trimmed_string(Some(&json!(1984))), "1984");
        assert_eq!(as_trimmed_string(Some(&json!(0))), "");
        assert_eq!(as_trimmed_string(Some(&Value::Null)), "");
        assert_eq!(as_trimmed_string(None), "");
    }

    #[test]
    fn unknown_label_falls_back() {
        let labels = labels();
        assert_eq!(as_label(Some(&json!("read")), &labels), "read");
        assert_eq!(as_label(Some(&json!("favourite")), &labels), FALLBACK_LABEL);
        assert_eq!(as_label(None, &labels), FALLBACK_LABEL);
        assert_eq!(as_label(Some(&json!("read")), &[]), FALLBACK_LABEL);
    }

    #[test]
    fn rating_defaults_to_zero() {
        assert_eq!(as_rating(Some(&json!(4))), Number::from(4));
        assert_eq!(as_rating(Some(&json!("3"))), Number::from(3));
        assert_eq!(as_rating(Some(&json!(false))), Number::from(0));
        assert_eq!(as_rating(None), Number::from(0));
        assert_eq!(as_rating(Some(&json!(4.5))).as_f64(), Some(4.5));
    }

    #[test]
    fn missing_title_and_description_are_both_reported() {
        let dir = tempfile::TempDir::new().unwrap();
        let images = ImageStore::new(dir.path());
        let data = object(json!({"title": "  ", "description": ""}));

        let err = book_from_data(&data, "1", &labels(), &images, ImageFallback::Placeholder)
            .unwrap_err();
        match err {
            CatalogError::Validation { errors } => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(fields, vec!["title", "description"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn valid_payload_is_normalized() {
        let dir = tempfile::TempDir::new().unwrap();
        let images = ImageStore::new(dir.path());
        let data = object(json!({
            "title": " Dune ",
            "author": "Frank Herbert",
            "description": "Spice",
            "label": "reading",
            "image": "https://example.com/cover.jpg",
        }));

        let book =
            book_from_data(&data, "abc", &labels(), &images, ImageFallback::Placeholder).unwrap();
        assert_eq!(book.id, "abc");
        assert_eq!(book.title, "Dune");
        assert_eq!(book.label, "reading");
        assert_eq!(book.image, PLACEHOLDER_IMAGE);
        assert_eq!(book.rating, Number::from(0));
    }

    #[test]
    fn keep_fallback_preserves_previous_image() {
        let dir = tempfile::TempDir::new().unwrap();
        let images = ImageStore::new(dir.path());
        let data = object(json!({"title": "T", "description": "D", "image": "image/abc.png"}));

        let book = book_from_data(
            &data,
            "abc",
            &labels(),
            &images,
            ImageFallback::Keep("image/abc.png"),
        )
        .unwrap();
        assert_eq!(book.image, "image/abc.png");
    }

    #[test]
    fn rejected_payload_writes_no_image() {
        let dir = tempfile::TempDir::new().unwrap();
        let images = ImageStore::new(dir.path());
        let data = object(json!({"title": "", "description": "D", "image": "data:image/png;base64,AAAA"}));

        assert!(book_from_data(&data, "9", &labels(), &images, ImageFallback::Placeholder).is_err());
        assert!(!dir.path().join("9.png").exists());
    }
}
