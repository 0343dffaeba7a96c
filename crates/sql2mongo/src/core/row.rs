//! Row containers.

use super::value::SqlValue;

/// Field name MongoDB uses as the document identifier.
pub const ID_FIELD: &str = "_id";

/// Conventional relational primary key column renamed to [`ID_FIELD`].
pub const SOURCE_ID_COLUMN: &str = "id";

/// One record from the relational source: column name to value.
///
/// Lookups are by name and names are unique. Column order from the source
/// query is preserved only so documents come out with a stable field order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: Vec<(String, SqlValue)>,
}

impl Row {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty row with room for `n` columns.
    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: Vec::with_capacity(n),
        }
    }

    /// Set a column, replacing any existing value in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SqlValue>) -> Option<SqlValue> {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    /// Get a column value by exact name.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Remove a column, returning its value.
    pub fn remove(&mut self, name: &str) -> Option<SqlValue> {
        let pos = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(pos).1)
    }

    /// Whether the row has a column with exactly this name.
    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.iter().any(|(k, _)| k == name)
    }

    /// Rename column `from` to `to`, keeping its position.
    ///
    /// An existing `to` column is dropped. Returns false if `from` is absent.
    pub fn rename(&mut self, from: &str, to: &str) -> bool {
        if from == to {
            return self.contains_key(from);
        }
        if !self.contains_key(from) {
            return false;
        }
        self.remove(to);
        if let Some((name, _)) = self.fields.iter_mut().find(|(k, _)| k == from) {
            *name = to.to_string();
        }
        true
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Column names in source order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate over `(name, value)` pairs in source order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Mutable access to every value.
    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut SqlValue> {
        self.fields.iter_mut().map(|(_, v)| v)
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.insert(k, v);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, SqlValue);
    type IntoIter = std::vec::IntoIter<(String, SqlValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// A row that has been through the normalizer.
///
/// Only the normalizer constructs these, which keeps raw rows away from the
/// document writer.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRow(Row);

impl NormalizedRow {
    pub(crate) fn new(row: Row) -> Self {
        Self(row)
    }

    /// The document identifier, if present and not NULL.
    pub fn id(&self) -> Option<&SqlValue> {
        self.0.get(ID_FIELD).filter(|v| !v.is_null())
    }

    /// Get a field by name.
    pub fn get(&self, name: &str) -> Option<&SqlValue> {
        self.0.get(name)
    }

    /// Whether the row has a field with exactly this name.
    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.0.iter()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrow the underlying row.
    pub fn as_row(&self) -> &Row {
        &self.0
    }

    /// Unwrap into the underlying row.
    pub fn into_row(self) -> Row {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_replaces_in_place() {
        let mut row = Row::new();
        row.insert("a", 1i64);
        row.insert("b", 2i64);
        let old = row.insert("a", 3i64);
        assert_eq!(old, Some(SqlValue::Int(1)));
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&SqlValue::Int(3)));
    }

    #[test]
    fn test_rename_keeps_position() {
        let mut row: Row = [("name", SqlValue::from("x")), ("id", SqlValue::Int(1))]
            .into_iter()
            .collect();
        assert!(row.rename("id", "_id"));
        assert_eq!(row.keys().collect::<Vec<_>>(), vec!["name", "_id"]);
        assert!(!row.rename("id", "_id"));
    }

    #[test]
    fn test_rename_overwrites_target() {
        let mut row: Row = [("_id", SqlValue::Int(9)), ("id", SqlValue::Int(1))]
            .into_iter()
            .collect();
        assert!(row.rename("id", "_id"));
        assert_eq!(row.len(), 1);
        assert_eq!(row.get("_id"), Some(&SqlValue::Int(1)));
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let row: Row = [("ID", SqlValue::Int(1))].into_iter().collect();
        assert!(row.get("id").is_none());
        assert!(row.contains_key("ID"));
    }

    #[test]
    fn test_normalized_row_null_id_is_missing() {
        let row: Row = [("_id", SqlValue::Null)].into_iter().collect();
        assert!(NormalizedRow::new(row).id().is_none());
    }
}
