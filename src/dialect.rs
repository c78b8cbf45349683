//! Dialect detection: GFF3 vs GTF column-9 syntax.
//!
//! A [`Dialect`] is elected once (over a configurable prefix of data lines)
//! and then frozen and attached to every subsequently parsed record, per
//! `spec.md` §4.2.

/// The two annotation dialects this crate understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Fmt {
    /// GFF3: `key=v1,v2` entries separated by `;`.
    Gff3,
    /// GTF: `key "v"; key "v";` entries, quoted values, repeatable keys.
    Gtf,
}

/// The elected configuration controlling parse and emission of column 9.
///
/// Cheaply clonable; records carry a `Dialect` by value (it is small) rather
/// than a back-pointer into a shared table, since `Dialect` is immutable
/// once elected.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Dialect {
    /// GFF3 or GTF.
    pub fmt: Fmt,
    /// Separator between attribute entries in column 9 (`;`, optionally
    /// followed by a space on emission).
    pub field_separator: String,
    /// Separator between an attribute's key and its value(s) (`=` for
    /// GFF3, a single space for GTF).
    pub keyval_separator: String,
    /// Whether values are wrapped in double quotes on the wire (GTF: yes).
    pub quoted: bool,
    /// Whether a key repeats for each of its values (GTF) rather than
    /// packing them comma-separated into one entry (GFF3).
    pub repeated_keys: bool,
    /// Insertion order of attribute keys observed in the first parsed
    /// record, used to stabilise re-emission ordering.
    pub order: Vec<String>,
}

impl Dialect {
    /// The canonical GFF3 dialect descriptor.
    pub fn gff3() -> Self {
        Dialect {
            fmt: Fmt::Gff3,
            field_separator: ";".to_string(),
            keyval_separator: "=".to_string(),
            quoted: false,
            repeated_keys: false,
            order: Vec::new(),
        }
    }

    /// The canonical GTF dialect descriptor.
    pub fn gtf() -> Self {
        Dialect {
            fmt: Fmt::Gtf,
            field_separator: "; ".to_string(),
            keyval_separator: " ".to_string(),
            quoted: true,
            repeated_keys: true,
            order: Vec::new(),
        }
    }
}

/// Count how many `;`-separated entries of `col9` parse as valid GFF3
/// `key=value` pairs, and how many parse as valid GTF `key "value"` pairs.
///
/// Returns `(gff3_hits, gtf_hits, saw_quote)`.
fn score_entries(col9: &str) -> (usize, usize, bool) {
    let mut gff3_hits = 0;
    let mut gtf_hits = 0;
    let mut saw_quote = false;

    for raw_entry in col9.split(';') {
        let entry = raw_entry.trim();
        if entry.is_empty() {
            continue;
        }
        if entry.contains('=') {
            gff3_hits += 1;
        }
        // A GTF entry looks like `key "value"` or `key value`: a key token
        // followed by whitespace and a remainder. Quoted remainders are
        // strong evidence for GTF.
        if let Some(sp) = entry.find(char::is_whitespace) {
            let key = entry[..sp].trim();
            let rest = entry[sp..].trim();
            if !key.is_empty() && !rest.is_empty() {
                gtf_hits += 1;
                if rest.starts_with('"') {
                    saw_quote = true;
                }
            }
        }
    }

    (gff3_hits, gtf_hits, saw_quote)
}

/// Sniff the dialect of a set of candidate data-line column-9 strings.
///
/// Implements `spec.md` §4.2's scoring: number of successfully parsed
/// entries first, then presence of quotation, then `=` vs space delimiter;
/// ties break toward GFF3.
pub fn sniff<'a, I: IntoIterator<Item = &'a str>>(col9s: I) -> Dialect {
    let mut gff3_total = 0usize;
    let mut gtf_total = 0usize;
    let mut any_quote = false;

    for col9 in col9s {
        let (gff3_hits, gtf_hits, saw_quote) = score_entries(col9);
        gff3_total += gff3_hits;
        gtf_total += gtf_hits;
        any_quote = any_quote || saw_quote;
    }

    let elect_gtf = gtf_total > gff3_total || (gtf_total == gff3_total && any_quote);

    if elect_gtf {
        Dialect::gtf()
    } else {
        Dialect::gff3()
    }
}

/// Guess the dialect of a single column-9 string, for `force_dialect_check`
/// re-sniffing. Does not consider quotation ties; a single line rarely has
/// enough signal, so this is only used to flag *disagreement* with the
/// already-elected dialect, not to re-elect one.
pub fn sniff_one(col9: &str) -> Fmt {
    let (gff3_hits, gtf_hits, _) = score_entries(col9);
    if gtf_hits > gff3_hits {
        Fmt::Gtf
    } else {
        Fmt::Gff3
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sniffs_gff3() {
        let lines = ["ID=gene1;Name=foo", "ID=mRNA1;Parent=gene1"];
        let dialect = sniff(lines);
        assert_eq!(dialect.fmt, Fmt::Gff3);
    }

    #[test]
    fn sniffs_gtf() {
        let lines = [
            r#"gene_id "G1"; transcript_id "T1";"#,
            r#"gene_id "G1"; transcript_id "T1"; exon_number "1";"#,
        ];
        let dialect = sniff(lines);
        assert_eq!(dialect.fmt, Fmt::Gtf);
    }

    #[test]
    fn ties_break_toward_gff3() {
        // Neither '=' nor a clean key/value split: ties at zero both sides.
        let dialect = sniff(["."]);
        assert_eq!(dialect.fmt, Fmt::Gff3);
    }

    #[test]
    fn single_line_disagreement_is_detectable() {
        assert_eq!(sniff_one("ID=gene1"), Fmt::Gff3);
        assert_eq!(sniff_one(r#"gene_id "G1";"#), Fmt::Gtf);
    }
}
