//! Row normalization.
//!
//! Turns a raw source row into the shape MongoDB expects: binary blobs
//! become text and the conventional `id` primary key becomes `_id`. The
//! transform is pure and infallible, so workers can run it independently.

use encoding_rs::Encoding;

use crate::core::row::{NormalizedRow, Row, ID_FIELD, SOURCE_ID_COLUMN};
use crate::core::value::SqlValue;

/// Normalization flags plus the source's text encoding.
#[derive(Debug, Clone, Copy)]
pub struct RowNormalizer {
    /// Reinterpret every blob value as text.
    pub convert_bytes_to_string: bool,
    /// Rename an `id` column to `_id`.
    pub convert_id_to_underscore_id: bool,
    encoding: &'static Encoding,
}

impl Default for RowNormalizer {
    fn default() -> Self {
        Self {
            convert_bytes_to_string: true,
            convert_id_to_underscore_id: true,
            encoding: encoding_rs::UTF_8,
        }
    }
}

impl RowNormalizer {
    /// Normalizer with both flags set explicitly, decoding blobs as UTF-8.
    pub fn new(convert_bytes_to_string: bool, convert_id_to_underscore_id: bool) -> Self {
        Self {
            convert_bytes_to_string,
            convert_id_to_underscore_id,
            ..Self::default()
        }
    }

    /// Decode blobs with `encoding` instead of UTF-8.
    pub fn with_encoding(mut self, encoding: &'static Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    /// Encoding used for blob-to-text conversion.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    /// Apply the enabled rules to one row.
    pub fn normalize(&self, mut row: Row) -> NormalizedRow {
        if self.convert_bytes_to_string {
            for value in row.values_mut() {
                if let SqlValue::Blob(bytes) = value {
                    let text = self.decode(bytes);
                    *value = SqlValue::Text(text);
                }
            }
        }

        if self.convert_id_to_underscore_id {
            // Exact, case-sensitive match; rows without `id` pass through.
            row.rename(SOURCE_ID_COLUMN, ID_FIELD);
        }

        NormalizedRow::new(row)
    }

    fn decode(&self, bytes: &[u8]) -> String {
        // Malformed sequences become U+FFFD rather than failing the row.
        let (text, _had_errors) = self.encoding.decode_without_bom_handling(bytes);
        text.into_owned()
    }
}

/// Normalize a row with UTF-8 blob decoding.
pub fn normalize(
    row: Row,
    convert_bytes_to_string: bool,
    convert_id_to_underscore_id: bool,
) -> NormalizedRow {
    RowNormalizer::new(convert_bytes_to_string, convert_id_to_underscore_id).normalize(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_values() -> Vec<SqlValue> {
        let ts = NaiveDate::from_ymd_opt(2023, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        vec![
            SqlValue::Null,
            SqlValue::Bool(false),
            SqlValue::Int(-4),
            SqlValue::Float(2.5),
            SqlValue::Text("plain".into()),
            SqlValue::Timestamp(ts),
        ]
    }

    #[test]
    fn test_id_renamed_to_underscore_id() {
        let row: Row = [("id", SqlValue::Int(42)), ("name", "a".into())]
            .into_iter()
            .collect();
        let out = normalize(row, true, true);
        assert_eq!(out.get("_id"), Some(&SqlValue::Int(42)));
        assert!(!out.contains_key("id"));
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_id_flag_off_keeps_id() {
        let row: Row = [("id", SqlValue::Int(42))].into_iter().collect();
        let out = normalize(row, true, false);
        assert!(out.contains_key("id"));
        assert!(!out.contains_key("_id"));
    }

    #[test]
    fn test_rows_without_id_ignore_id_flag() {
        let row: Row = [("ID", SqlValue::Int(1)), ("user_id", SqlValue::Int(2))]
            .into_iter()
            .collect();
        let with_flag = normalize(row.clone(), false, true);
        let without_flag = normalize(row.clone(), false, false);
        assert_eq!(with_flag, without_flag);
        assert_eq!(with_flag.as_row(), &row);
    }

    #[test]
    fn test_blob_becomes_text() {
        let row: Row = [("data", SqlValue::Blob(b"b".to_vec()))].into_iter().collect();
        let out = normalize(row, true, true);
        assert_eq!(out.get("data"), Some(&SqlValue::Text("b".into())));
    }

    #[test]
    fn test_blob_kept_when_flag_off() {
        let row: Row = [("data", SqlValue::Blob(vec![0, 159]))].into_iter().collect();
        let out = normalize(row, false, true);
        assert_eq!(out.get("data"), Some(&SqlValue::Blob(vec![0, 159])));
    }

    #[test]
    fn test_non_blob_values_untouched_by_byte_flag() {
        for value in sample_values() {
            let row: Row = [("v", value.clone())].into_iter().collect();
            assert_eq!(normalize(row.clone(), true, false).get("v"), Some(&value));
            assert_eq!(normalize(row, false, false).get("v"), Some(&value));
        }
    }

    #[test]
    fn test_invalid_utf8_is_replaced_not_rejected() {
        let row: Row = [("data", SqlValue::Blob(vec![b'o', b'k', 0xff]))]
            .into_iter()
            .collect();
        let out = normalize(row, true, true);
        assert_eq!(out.get("data"), Some(&SqlValue::Text("ok\u{fffd}".into())));
    }

    #[test]
    fn test_source_encoding_is_used() {
        let normalizer = RowNormalizer::default().with_encoding(encoding_rs::WINDOWS_1252);
        let row: Row = [("name", SqlValue::Blob(vec![0x63, 0x61, 0x66, 0xe9]))]
            .into_iter()
            .collect();
        let out = normalizer.normalize(row);
        assert_eq!(out.get("name"), Some(&SqlValue::Text("café".into())));
    }

    #[test]
    fn test_blob_id_is_converted_then_renamed() {
        let row: Row = [("id", SqlValue::Blob(b"k-1".to_vec()))].into_iter().collect();
        let out = normalize(row, true, true);
        assert_eq!(out.id(), Some(&SqlValue::Text("k-1".into())));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let row: Row = [("id", SqlValue::Int(1)), ("data", SqlValue::Blob(b"x".to_vec()))]
            .into_iter()
            .collect();
        let once = normalize(row, true, true);
        let twice = normalize(once.clone().into_row(), true, true);
        assert_eq!(once, twice);
    }
}
