//! JSON extraction utilities for heterogeneous catalog API responses.
//!
//! Upstream payloads wrap their lists and fields in wildly varying
//! envelopes. These helpers navigate nested JSON with dot notation so the
//! normalizers can stay table-driven instead of branchy.
//!
//! # Examples
//!
//! ```rust
//! use mokuroku::net::json;
//! use serde_json::json;
//!
//! let payload = json!({
//!     "result": {
//!         "animes": [
//!             {"slug": "one-piece", "title": "One Piece"},
//!             {"slug": "naruto", "title": "Naruto"}
//!         ]
//!     }
//! });
//!
//! let list = json::extract_array(&payload, "result.animes");
//! assert_eq!(list.len(), 2);
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Extracts a value from nested JSON using dot notation.
///
/// Returns `None` if any part of the path does not exist. A present-but-null
/// value is returned as `Some(Value::Null)`; callers deciding between
/// candidate paths usually want [`extract_array`] instead.
///
/// # Examples
///
/// ```rust
/// use mokuroku::net::json;
/// use serde_json::json;
///
/// let payload = json!({"data": {"pagination": {"nextPage": 2}}});
/// let next = json::extract_path(&payload, "data.pagination.nextPage");
/// assert_eq!(next.unwrap().as_u64(), Some(2));
///
/// assert_eq!(json::extract_path(&payload, "data.missing"), None);
/// ```
pub fn extract_path(json: &Value, path: &str) -> Option<Value> {
    let mut current = json;

    for key in path.split('.') {
        current = current.get(key)?;
    }

    Some(current.clone())
}

/// Extracts and deserializes a value from a nested JSON path.
///
/// # Errors
///
/// * [`Error::Parse`](crate::Error::Parse) - If the path doesn't exist
/// * [`Error::Json`](crate::Error::Json) - If deserialization fails
///
/// # Examples
///
/// ```rust
/// use mokuroku::net::json;
/// use serde_json::json;
///
/// let payload = json!({"comic": {"title": "Virus Girlfriend", "rating": "8.2"}});
/// let title: String = json::extract_as(&payload, "comic.title").unwrap();
/// assert_eq!(title, "Virus Girlfriend");
/// ```
pub fn extract_as<T>(json: &Value, path: &str) -> crate::Result<T>
where
    T: DeserializeOwned,
{
    extract_path(json, path)
        .ok_or_else(|| crate::Error::parse(format!("Path not found: {path}")))
        .and_then(|v| serde_json::from_value(v).map_err(Into::into))
}

/// Extracts an array from a nested JSON path.
///
/// Returns an empty vector when the path is missing or not an array.
///
/// # Examples
///
/// ```rust
/// use mokuroku::net::json;
/// use serde_json::json;
///
/// let payload = json!({"data": {"comics": [{"title": "A"}, {"title": "B"}]}});
/// assert_eq!(json::extract_array(&payload, "data.comics").len(), 2);
/// assert_eq!(json::extract_array(&payload, "data.missing").len(), 0);
/// ```
pub fn extract_array(json: &Value, path: &str) -> Vec<Value> {
    extract_path(json, path)
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default()
}

/// Walks `paths` in order and returns the first one that holds an array,
/// even an empty one. Missing and non-array paths are skipped.
///
/// This is the envelope disambiguator: a response that says
/// `{"animes": []}` genuinely has zero items and must not fall through to a
/// stale alternative path.
pub fn first_array(json: &Value, paths: &[&str]) -> Vec<Value> {
    for path in paths {
        if let Some(value) = extract_path(json, path) {
            if let Some(array) = value.as_array() {
                return array.clone();
            }
        }
    }
    Vec::new()
}
