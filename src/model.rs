//! Core data types for the book catalog.
//!
//! A `Book` is the persisted record; the on-disk collection is a flat JSON
//! array of these. Labels are plain strings kept in a separate file.

use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::normalize::as_rating;

/// Label assigned when the caller supplies one that is not in the label list.
pub const FALLBACK_LABEL: &str = "wish";

/// Image path stored when no data-URI image was uploaded.
pub const PLACEHOLDER_IMAGE: &str = "image/notimage.jpg";

/// Persistent record for one book in the catalog.
///
/// Reading is lenient: files written by hand or by older servers may omit
/// fields, use `null`, or store the rating as a string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Opaque identifier generated at creation; never changes afterwards.
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub author: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    /// One of the known labels, or [`FALLBACK_LABEL`].
    #[serde(default = "fallback_label", deserialize_with = "label_or_fallback")]
    pub label: String,
    /// Relative path of the cover image (`image/{id}.{ext}`) or the placeholder.
    #[serde(default = "placeholder_image", deserialize_with = "image_or_placeholder")]
    pub image: String,
    /// Kept as a JSON number so integer ratings round-trip without a `.0`.
    #[serde(default = "zero_rating", deserialize_with = "lenient_rating")]
    pub rating: serde_json::Number,
}

fn zero_rating() -> serde_json::Number {
    serde_json::Number::from(0)
}

fn fallback_label() -> String {
    FALLBACK_LABEL.to_string()
}

fn placeholder_image() -> String {
    PLACEHOLDER_IMAGE.to_string()
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}

fn label_or_fallback<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        _ => fallback_label(),
    })
}

fn image_or_placeholder<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => s,
        _ => placeholder_image(),
    })
}

fn lenient_rating<'de, D: Deserializer<'de>>(d: D) -> Result<serde_json::Number, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(as_rating(Some(&value)))
}

/// A single validation failure reported back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Generate a new book ID: six random digits followed by the low-order
/// digits of the current millisecond timestamp.
///
/// Uniqueness is not checked against the collection; collisions need the
/// same random draw within the same millisecond window.
pub fn generate_id() -> String {
    let random: u32 = rand::thread_rng().gen_range(0..1_000_000);
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
        .to_string();
    let tail = millis.get(7..).unwrap_or(&millis);
    format!("{random:06}{tail}")
}
