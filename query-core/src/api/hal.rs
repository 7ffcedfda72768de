//! Response envelope decoding.
//!
//! Collections arrive as
//! `{"_embedded": {"<resource>": [...]}, "_links": {"next": {"href": "..."}}}`.
//! A missing `_embedded` object is an empty page; a missing `next` link marks
//! the last page.

use crate::error::QueryError;
use crate::paging::{Page, PageCursor};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "_embedded", default)]
    embedded: Map<String, Value>,
    #[serde(rename = "_links", default)]
    links: Links,
}

#[derive(Debug, Default, Deserialize)]
struct Links {
    next: Option<Link>,
}

#[derive(Debug, Deserialize)]
struct Link {
    href: String,
}

/// Decodes a whole response body into `T`.
pub fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, QueryError> {
    Ok(serde_json::from_slice(body)?)
}

/// Decodes one page of `resource` items plus its continuation cursor.
pub fn decode_page<T: DeserializeOwned>(body: &[u8], resource: &str) -> Result<Page<T>, QueryError> {
    let mut envelope: Envelope = decode(body)?;

    let items = match envelope.embedded.remove(resource) {
        Some(Value::Array(values)) => values
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()?,
        Some(other) => {
            return Err(QueryError::Decode {
                reason: format!("'{}' is not an array: {}", resource, other),
            })
        }
        None => Vec::new(),
    };

    Ok(Page {
        items,
        next: envelope.links.next.map(|link| PageCursor::new(link.href)),
    })
}
