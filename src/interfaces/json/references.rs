use crate::error::{MarketError, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Response data remembered by name, so later commands can say `"$artist.id"`
/// instead of repeating generated identifiers.
#[derive(Debug, Default)]
pub struct ReferenceBook {
    entries: HashMap<String, Value>,
}

impl ReferenceBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember(&mut self, name: String, data: Value) {
        self.entries.insert(name, data);
    }

    /// Replaces every `"$name[.path]"` string in `body` with the value it
    /// points to. Path segments are object keys or array indices.
    pub fn resolve(&self, body: Value) -> Result<Value> {
        match body {
            Value::String(text) => match text.strip_prefix('$') {
                Some(path) => self.lookup(path),
                None => Ok(Value::String(text)),
            },
            Value::Array(items) => items
                .into_iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
            Value::Object(fields) => {
                let mut resolved = serde_json::Map::with_capacity(fields.len());
                for (key, value) in fields {
                    resolved.insert(key, self.resolve(value)?);
                }
                Ok(Value::Object(resolved))
            }
            other => Ok(other),
        }
    }

    fn lookup(&self, path: &str) -> Result<Value> {
        let mut segments = path.split('.');
        let name = segments.next().unwrap_or_default();
        let mut current = self
            .entries
            .get(name)
            .ok_or_else(|| MarketError::ValidationError(format!("Unknown reference '${}'", name)))?;

        for segment in segments {
            let next = match current {
                Value::Object(fields) => fields.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| {
                MarketError::ValidationError(format!("Reference '${}' has no '{}'", path, segment))
            })?;
        }
        Ok(current.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_nested_paths_resolve() {
        let mut book = ReferenceBook::new();
        book.remember(
            "order".into(),
            json!({"booking": {"id": "b-1"}, "order": {"order_id": "order_9"}, "items": [10, 20]}),
        );

        let resolved = book
            .resolve(json!({
                "booking_id": "$order.booking.id",
                "order_id": "$order.order.order_id",
                "second": "$order.items.1",
                "plain": "text"
            }))
            .unwrap();
        assert_eq!(
            resolved,
            json!({"booking_id": "b-1", "order_id": "order_9", "second": 20, "plain": "text"})
        );
    }

    #[test]
    fn test_unknown_reference_is_an_error() {
        let book = ReferenceBook::new();
        assert!(matches!(
            book.resolve(json!({"artist_id": "$artist.id"})),
            Err(MarketError::ValidationError(_))
        ));

        let mut book = ReferenceBook::new();
        book.remember("artist".into(), json!({"id": "a"}));
        assert!(book.resolve(json!("$artist.nope")).is_err());
    }
}
