//! The normalised in-memory feature record, its on-wire line form, and the
//! strand/frame field types.

use std::fmt;

use crate::attrs::Attributes;
use crate::common::bins::bin;
use crate::dialect::Dialect;
use crate::error::Error;

/// Strand of a feature: `+`, `-`, unknown (`?`), or unset (`.`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Strand {
    Plus,
    Minus,
    Unknown,
    Unset,
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strand::Plus => "+",
            Strand::Minus => "-",
            Strand::Unknown => "?",
            Strand::Unset => ".",
        })
    }
}

impl Strand {
    fn parse(s: &str) -> Strand {
        match s {
            "+" => Strand::Plus,
            "-" => Strand::Minus,
            "?" => Strand::Unknown,
            _ => Strand::Unset,
        }
    }
}

/// Reading frame of a feature: `0`, `1`, `2`, or unset (`.`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Frame {
    Zero,
    One,
    Two,
    Unset,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Frame::Zero => "0",
            Frame::One => "1",
            Frame::Two => "2",
            Frame::Unset => ".",
        })
    }
}

impl Frame {
    fn parse(s: &str) -> Frame {
        match s {
            "0" => Frame::Zero,
            "1" => Frame::One,
            "2" => Frame::Two,
            _ => Frame::Unset,
        }
    }
}

/// The classification of a raw input line, per the tokeniser's
/// blank/directive/comment/data ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum LineKind {
    /// Blank or whitespace-only; skipped entirely.
    Blank,
    /// A `##`-prefixed pragma, retained verbatim.
    Directive(String),
    /// A `#`-prefixed (non-`##`) comment; discarded.
    Comment,
    /// A candidate data line, split on TAB.
    Data(Vec<String>),
}

/// Classify one raw input line.
pub fn classify_line(line: &str) -> LineKind {
    if line.trim().is_empty() {
        return LineKind::Blank;
    }
    if let Some(rest) = line.strip_prefix("##") {
        return LineKind::Directive(format!("##{rest}"));
    }
    if line.starts_with('#') {
        return LineKind::Comment;
    }
    LineKind::Data(line.split('\t').map(str::to_string).collect())
}

/// The normalised, dialect-tagged annotation record.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Feature {
    pub id: String,
    pub seqid: String,
    pub source: String,
    pub featuretype: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub score: String,
    pub strand: Strand,
    pub frame: Frame,
    pub attributes: Attributes,
    pub extra: Vec<String>,
    pub bin: u32,
    pub dialect: Dialect,
}

/// Field names over which the `merge` collision policy requires
/// byte-equality, per `gffutils`' `_gffkeys[:-1]` (everything but
/// `attributes`).
pub const MERGE_COMPARISON_FIELDS: &[&str] = &[
    "id",
    "seqid",
    "source",
    "featuretype",
    "start",
    "end",
    "score",
    "strand",
    "frame",
    "bin",
];

impl Feature {
    /// Recompute `bin` from `start`/`end`. A feature with either endpoint
    /// unset bins as `0` (whole-sequence placeholder), matching the
    /// convention that an unanchored record cannot participate in region
    /// queries.
    pub fn recompute_bin(&mut self) {
        self.bin = match (self.start, self.end) {
            (Some(start), Some(end)) => bin(start, end),
            _ => 0,
        };
    }

    /// Parse one already-classified data line (9+ tab-separated fields)
    /// into a `Feature`. `id` is left empty; the id synthesiser fills it
    /// in after parsing, since id resolution may depend on attributes.
    ///
    /// Per `spec.md` §4.1: fewer than 9 fields and not uniformly
    /// blank/`.` is a malformed line. Exactly 9 blank/`.` fields yields a
    /// placeholder record with all defaults (a documented, explicitly
    /// supported edge case). An unparseable attribute entry is pushed onto
    /// `warnings` and omitted, not a reason to reject the record.
    pub fn from_fields(
        fields: &[String],
        dialect: &Dialect,
        line_no: usize,
        warnings: &mut Vec<String>,
    ) -> Result<Feature, Error> {
        if fields.len() < 9 {
            let uniformly_empty = fields.iter().all(|f| f.is_empty() || f == ".");
            if !(uniformly_empty && !fields.is_empty()) {
                return Err(Error::MalformedLine(line_no, fields.len()));
            }
        }

        let col = |i: usize| fields.get(i).map(String::as_str).unwrap_or(".");
        let empty_or_dot = |s: &str| s.is_empty() || s == ".";
        let dotted = |s: &str| if s.is_empty() { "." } else { s };

        let seqid = dotted(col(0)).to_string();
        let source = dotted(col(1)).to_string();
        let featuretype = dotted(col(2)).to_string();
        let start = if empty_or_dot(col(3)) {
            None
        } else {
            col(3).parse::<i64>().ok()
        };
        let end = if empty_or_dot(col(4)) {
            None
        } else {
            col(4).parse::<i64>().ok()
        };
        let score = dotted(col(5)).to_string();
        let strand = Strand::parse(col(6));
        let frame = Frame::parse(col(7));
        let attributes = if fields.len() > 8 {
            Attributes::parse(col(8), dialect, line_no, warnings)
        } else {
            Attributes::new()
        };
        let extra = fields.iter().skip(9).cloned().collect();

        let mut feature = Feature {
            id: String::new(),
            seqid,
            source,
            featuretype,
            start,
            end,
            score,
            strand,
            frame,
            attributes,
            extra,
            bin: 0,
            dialect: dialect.clone(),
        };
        feature.recompute_bin();
        Ok(feature)
    }

    /// Render the wire form of this feature: 9 tab-separated columns
    /// (attributes under this feature's own dialect) plus any `extra`
    /// trailing columns.
    pub fn to_line(&self) -> String {
        let cols = [
            self.seqid.as_str(),
            self.source.as_str(),
            self.featuretype.as_str(),
        ];
        let start = self.start.map_or(".".to_string(), |v| v.to_string());
        let end = self.end.map_or(".".to_string(), |v| v.to_string());
        let attrs = self.attributes.render(&self.dialect);

        let mut parts = vec![
            cols[0].to_string(),
            cols[1].to_string(),
            cols[2].to_string(),
            start,
            end,
            if self.score.is_empty() { ".".to_string() } else { self.score.clone() },
            self.strand.to_string(),
            self.frame.to_string(),
            if attrs.is_empty() { ".".to_string() } else { attrs },
        ];
        parts.extend(self.extra.iter().cloned());
        parts.join("\t")
    }

    /// Compare `self` against `other` over [`MERGE_COMPARISON_FIELDS`],
    /// returning the name of the first field that differs, or `None` if
    /// every compared field matches. Used by the `merge` collision
    /// policy's field-equality assertion.
    pub fn first_mismatched_field(&self, other: &Feature) -> Option<&'static str> {
        if self.id != other.id {
            return Some("id");
        }
        if self.seqid != other.seqid {
            return Some("seqid");
        }
        if self.source != other.source {
            return Some("source");
        }
        if self.featuretype != other.featuretype {
            return Some("featuretype");
        }
        if self.start != other.start {
            return Some("start");
        }
        if self.end != other.end {
            return Some("end");
        }
        if self.score != other.score {
            return Some("score");
        }
        if self.strand != other.strand {
            return Some("strand");
        }
        if self.frame != other.frame {
            return Some("frame");
        }
        if self.bin != other.bin {
            return Some("bin");
        }
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn classifies_lines() {
        assert_eq!(classify_line("   "), LineKind::Blank);
        assert_eq!(classify_line("##gff-version 3"), LineKind::Directive("##gff-version 3".to_string()));
        assert_eq!(classify_line("# a comment"), LineKind::Comment);
        assert!(matches!(classify_line("chr1\t.\tgene\t1\t100\t.\t+\t.\tID=g1"), LineKind::Data(_)));
    }

    #[test]
    fn parses_a_gff3_data_line() {
        let fields: Vec<String> = "chr1\t.\tgene\t100\t200\t.\t+\t.\tID=gene1;Name=foo"
            .split('\t')
            .map(str::to_string)
            .collect();
        let feature = Feature::from_fields(&fields, &Dialect::gff3(), 1, &mut Vec::new()).unwrap();
        assert_eq!(feature.seqid, "chr1");
        assert_eq!(feature.start, Some(100));
        assert_eq!(feature.end, Some(200));
        assert_eq!(feature.strand, Strand::Plus);
        assert_eq!(feature.attributes.get_first("Name"), Some("foo"));
        assert!(feature.bin > 0);
    }

    #[test]
    fn all_blank_nine_columns_yields_a_placeholder_record() {
        let fields: Vec<String> = vec![".".to_string(); 9];
        let feature = Feature::from_fields(&fields, &Dialect::gff3(), 1, &mut Vec::new()).unwrap();
        assert_eq!(feature.start, None);
        assert_eq!(feature.to_line(), ".\t.\t.\t.\t.\t.\t.\t.\t.");
    }

    #[test]
    fn short_line_that_is_not_uniformly_blank_is_malformed() {
        let fields: Vec<String> = vec!["chr1".to_string(), "x".to_string()];
        let err = Feature::from_fields(&fields, &Dialect::gff3(), 3, &mut Vec::new());
        assert!(matches!(err, Err(Error::MalformedLine(3, 2))));
    }

    #[test]
    fn round_trips_through_parse_and_render() {
        let line = "chr1\tmine\tmRNA\t10\t20\t.\t-\t.\tID=m1;Parent=g1";
        let fields: Vec<String> = line.split('\t').map(str::to_string).collect();
        let feature = Feature::from_fields(&fields, &Dialect::gff3(), 1, &mut Vec::new()).unwrap();
        assert_eq!(feature.to_line(), line);
    }

    #[test]
    fn unparseable_attribute_entry_is_warned_but_the_record_survives() {
        let line = "chr1\t.\tgene\t1\t100\t.\t+\t.\tID=g1;not-a-key-value-pair;Name=foo";
        let fields: Vec<String> = line.split('\t').map(str::to_string).collect();
        let mut warnings = Vec::new();
        let feature = Feature::from_fields(&fields, &Dialect::gff3(), 1, &mut warnings).unwrap();
        assert_eq!(feature.attributes.get_first("ID"), Some("g1"));
        assert_eq!(feature.attributes.get_first("Name"), Some("foo"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn first_mismatched_field_detects_start_divergence() {
        let line_a = "chr1\t.\tgene\t100\t200\t.\t+\t.\tID=g1";
        let line_b = "chr1\t.\tgene\t150\t200\t.\t+\t.\tID=g1";
        let a = Feature::from_fields(&line_a.split('\t').map(str::to_string).collect::<Vec<_>>(), &Dialect::gff3(), 1, &mut Vec::new()).unwrap();
        let b = Feature::from_fields(&line_b.split('\t').map(str::to_string).collect::<Vec<_>>(), &Dialect::gff3(), 2, &mut Vec::new()).unwrap();
        assert_eq!(a.first_mismatched_field(&b), Some("start"));
    }
}
