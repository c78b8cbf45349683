//! The column-9 attribute model: an ordered, multi-valued map plus the
//! GFF3/GTF codecs that read and write it.

use indexmap::IndexMap;
use percent_encoding::{percent_decode_str, percent_encode, AsciiSet, CONTROLS};

use crate::dialect::{Dialect, Fmt};

/// Characters GFF3 reserves in column 9 and therefore requires `%HH`-encoded
/// on emission: tab, newline, `%`, `;`, `=`, `&`, and `,` (the last three
/// are structural in attribute syntax, so a *value* containing one must be
/// escaped to round-trip).
const GFF3_RESERVED: &AsciiSet = &CONTROLS
    .add(b'\t')
    .add(b'\n')
    .add(b'\r')
    .add(b'%')
    .add(b';')
    .add(b'=')
    .add(b'&')
    .add(b',');

/// An ordered multimap of attribute keys to one or more values, preserving
/// both the order keys were first seen in and the order of each key's
/// values.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Attributes(IndexMap<String, Vec<String>>);

impl Attributes {
    /// An empty attribute map.
    pub fn new() -> Self {
        Attributes(IndexMap::new())
    }

    /// Get all values for `key`, in insertion order.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    /// Get the first value for `key`, the common case for single-valued
    /// attributes such as `ID` or `gene_id`.
    pub fn get_first(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    /// Append `value` to `key`'s value list, creating the key (at the end
    /// of iteration order) if absent.
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// Replace `key`'s entire value list.
    pub fn set(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.0.insert(key.into(), values);
    }

    /// Remove `key` entirely, returning its values if present.
    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.0.shift_remove(key)
    }

    /// Whether the map has no keys.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(key, values)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Merge `other`'s values into `self`, key by key, appending values and
    /// preserving `self`'s existing order for shared keys while new keys
    /// from `other` are appended at the end. Used by the `merge` collision
    /// policy.
    pub fn merge_from(&mut self, other: &Attributes) {
        for (key, values) in other.iter() {
            let entry = self.0.entry(key.to_string()).or_default();
            for value in values {
                if !entry.contains(value) {
                    entry.push(value.clone());
                }
            }
        }
    }

    /// Parse column 9 under the given dialect. An entry lacking its
    /// key/value delimiter is dropped and recorded as a message in
    /// `warnings` rather than failing the whole record; every other entry on
    /// the line still parses.
    pub fn parse(col9: &str, dialect: &Dialect, line_no: usize, warnings: &mut Vec<String>) -> Attributes {
        match dialect.fmt {
            Fmt::Gff3 => parse_gff3(col9, line_no, warnings),
            Fmt::Gtf => parse_gtf(col9, line_no, warnings),
        }
    }

    /// Render column 9 under the given dialect.
    pub fn render(&self, dialect: &Dialect) -> String {
        match dialect.fmt {
            Fmt::Gff3 => render_gff3(self),
            Fmt::Gtf => render_gtf(self),
        }
    }
}

fn parse_gff3(col9: &str, line_no: usize, warnings: &mut Vec<String>) -> Attributes {
    let mut attrs = Attributes::new();
    let col9 = col9.trim();
    if col9.is_empty() || col9 == "." {
        return attrs;
    }
    for entry in col9.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some((key, raw_values)) = entry.split_once('=') else {
            let msg = format!("unparseable attribute entry on line {line_no}: {entry:?}");
            tracing::warn!("{msg}");
            warnings.push(msg);
            continue;
        };
        let key = decode_gff3(key.trim());
        for raw_value in raw_values.split(',') {
            attrs.push(key.clone(), decode_gff3(raw_value));
        }
    }
    attrs
}

fn render_gff3(attrs: &Attributes) -> String {
    attrs
        .iter()
        .map(|(key, values)| {
            let encoded_values = values
                .iter()
                .map(|v| encode_gff3(v))
                .collect::<Vec<_>>()
                .join(",");
            format!("{}={}", encode_gff3(key), encoded_values)
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn parse_gtf(col9: &str, line_no: usize, warnings: &mut Vec<String>) -> Attributes {
    let mut attrs = Attributes::new();
    let col9 = col9.trim();
    if col9.is_empty() || col9 == "." {
        return attrs;
    }
    for entry in col9.split(';') {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        let Some(sp) = entry.find(char::is_whitespace) else {
            let msg = format!("unparseable attribute entry on line {line_no}: {entry:?}");
            tracing::warn!("{msg}");
            warnings.push(msg);
            continue;
        };
        let key = entry[..sp].trim();
        let value = entry[sp..].trim();
        let value = value.strip_prefix('"').unwrap_or(value);
        let value = value.strip_suffix('"').unwrap_or(value);
        attrs.push(key.to_string(), decode_gtf(value));
    }
    attrs
}

fn render_gtf(attrs: &Attributes) -> String {
    attrs
        .iter()
        .flat_map(|(key, values)| {
            values
                .iter()
                .map(move |v| format!("{} \"{}\"", key, encode_gtf(v)))
        })
        .collect::<Vec<_>>()
        .join("; ")
        + ";"
}

/// Decode a GFF3 `%HH`-escaped token, including `%0A` embedded newlines.
fn decode_gff3(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// Encode a value for GFF3 emission, escaping reserved characters.
fn encode_gff3(value: &str) -> String {
    percent_encode(value.as_bytes(), GFF3_RESERVED).to_string()
}

/// GTF has no percent-encoding convention; escaped double quotes and
/// backslashes are the only structural characters a value can contain.
fn decode_gtf(raw: &str) -> String {
    raw.replace("\\\"", "\"")
}

fn encode_gtf(value: &str) -> String {
    value.replace('"', "\\\"")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_gff3_multi_valued_attribute() {
        let mut warnings = Vec::new();
        let attrs = Attributes::parse(
            "ID=exon1;Parent=mRNA1,mRNA2;Name=foo",
            &Dialect::gff3(),
            1,
            &mut warnings,
        );
        assert_eq!(attrs.get_first("ID"), Some("exon1"));
        assert_eq!(attrs.get("Parent"), Some(&["mRNA1".to_string(), "mRNA2".to_string()][..]));
        assert!(warnings.is_empty());
    }

    #[test]
    fn round_trips_gff3_percent_encoding() {
        let mut attrs = Attributes::new();
        attrs.push("Note", "contains a newline\nand a semicolon;here");
        let rendered = attrs.render(&Dialect::gff3());
        let reparsed = Attributes::parse(&rendered, &Dialect::gff3(), 1, &mut Vec::new());
        assert_eq!(attrs, reparsed);
    }

    #[test]
    fn parses_gtf_quoted_attribute() {
        let mut warnings = Vec::new();
        let attrs = Attributes::parse(
            r#"gene_id "G1"; transcript_id "T1"; exon_number "3";"#,
            &Dialect::gtf(),
            1,
            &mut warnings,
        );
        assert_eq!(attrs.get_first("gene_id"), Some("G1"));
        assert_eq!(attrs.get_first("exon_number"), Some("3"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn malformed_entry_is_warned_and_omitted_not_fatal() {
        let mut warnings = Vec::new();
        let attrs = Attributes::parse("not-a-key-value-pair", &Dialect::gff3(), 7, &mut warnings);
        assert!(attrs.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("line 7"));
    }

    #[test]
    fn malformed_entry_does_not_take_down_the_rest_of_the_line() {
        let mut warnings = Vec::new();
        let attrs = Attributes::parse("ID=gene1;not-a-key-value-pair;Name=foo", &Dialect::gff3(), 9, &mut warnings);
        assert_eq!(attrs.get_first("ID"), Some("gene1"));
        assert_eq!(attrs.get_first("Name"), Some("foo"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn merge_from_deduplicates_shared_values() {
        let mut a = Attributes::new();
        a.push("Parent", "gene1");
        let mut b = Attributes::new();
        b.push("Parent", "gene1");
        b.push("Parent", "gene2");
        a.merge_from(&b);
        assert_eq!(a.get("Parent"), Some(&["gene1".to_string(), "gene2".to_string()][..]));
    }
}
