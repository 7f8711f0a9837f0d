//! Ordered `@regmap` attribute sets.

use serde_json::Value;

/// Ordered `(key, value)` pairs decoded from `@regmap` comments.
///
/// Order is the top-to-bottom order of the source lines. Keys are never
/// deduplicated: a key present at both type and variable level appears twice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttributeSet
{
    entries: Vec<(String, Value)>,
}

impl AttributeSet
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: Value)
    {
        self.entries.push((key.into(), value));
    }

    /// Append every pair of `other`, keeping its order.
    pub fn append(&mut self, other: AttributeSet)
    {
        self.entries.extend(other.entries);
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value>
    {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str>
    {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)>
    {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, Value)> for AttributeSet
{
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self
    {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests
{
    use serde_json::json;

    use super::*;

    #[test]
    fn append_keeps_duplicates_in_order()
    {
        let mut type_level = AttributeSet::new();
        type_level.push("brief", json!("from the type"));
        let mut variable_level = AttributeSet::new();
        variable_level.push("brief", json!("from the variable"));
        variable_level.push("address", json!(2048));

        type_level.append(variable_level);

        assert_eq!(type_level.keys().collect::<Vec<_>>(), ["brief", "brief", "address"]);
        assert_eq!(type_level.get("brief"), Some(&json!("from the type")));
    }
}
