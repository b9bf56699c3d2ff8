//! DynamoDB attribute conversions for [`Fortune`].
//!
//! Pure functions, testable without DynamoDB access.

use std::collections::HashMap;

use aws_sdk_dynamodb::types::AttributeValue;
use common::Fortune;

use super::StoreError;

/// Hash key attribute (type `N`).
pub const KEY_ATTRIBUTE: &str = "id";
/// Fortune text attribute (type `S`).
pub const NAME_ATTRIBUTE: &str = "name";

/// Build the primary-key map for `id`.
pub fn fortune_key(id: i64) -> HashMap<String, AttributeValue> {
    HashMap::from([(KEY_ATTRIBUTE.to_string(), AttributeValue::N(id.to_string()))])
}

/// Convert a [`Fortune`] to a full DynamoDB item.
pub fn fortune_to_item(fortune: &Fortune) -> HashMap<String, AttributeValue> {
    let mut item = fortune_key(fortune.id);
    item.insert(
        NAME_ATTRIBUTE.to_string(),
        AttributeValue::S(fortune.name.clone()),
    );
    item
}

/// Convert a DynamoDB item to a [`Fortune`].
///
/// `id` must be present and numeric. A missing `name` decodes as an empty
/// string; attributes beyond `id` and `name` are ignored.
pub fn item_to_fortune(item: &HashMap<String, AttributeValue>) -> Result<Fortune, StoreError> {
    let raw_id = item
        .get(KEY_ATTRIBUTE)
        .and_then(|v| v.as_n().ok())
        .ok_or_else(|| {
            StoreError::InvalidItem(format!("missing or non-numeric field: {KEY_ATTRIBUTE}"))
        })?;
    let id = raw_id
        .parse::<i64>()
        .map_err(|e| StoreError::InvalidItem(format!("id {raw_id:?} is not an integer: {e}")))?;

    let name = match item.get(NAME_ATTRIBUTE) {
        None => String::new(),
        Some(AttributeValue::S(s)) => s.clone(),
        Some(_) => {
            return Err(StoreError::InvalidItem(format!(
                "field {NAME_ATTRIBUTE} is not a string"
            )))
        }
    };

    Ok(Fortune { id, name })
}
