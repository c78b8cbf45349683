//! The lazy, restartable-once feature iterator: the exposed boundary
//! between raw text and a stream of [`Feature`]s.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::dialect::{self, Dialect};
use crate::error::Error;
use crate::feature::{classify_line, Feature, LineKind};

/// Per-record attribute rewriter applied just before a `Feature` is
/// emitted.
pub type Transform = Box<dyn FnMut(Feature) -> Feature>;

/// Where a [`FeatureIterator`] reads its raw lines from.
enum Source {
    Lines(Box<dyn Iterator<Item = std::io::Result<String>>>),
    Features(std::vec::IntoIter<Feature>),
}

/// A lazy, restartable-once source of [`Feature`]s, plus the `directives`
/// and `warnings` side channels accumulated as it is driven.
///
/// "Restartable-once" means the dialect-sniffing prefix is buffered and
/// replayed rather than consumed: the sniffer reads ahead to elect a
/// dialect, and those same lines are the first the caller sees.
pub struct FeatureIterator {
    source: Source,
    dialect: Option<Dialect>,
    force_dialect_check: bool,
    buffered: VecDeque<Feature>,
    directives: Vec<String>,
    warnings: Vec<String>,
    transform: Option<Transform>,
    line_no: usize,
    exhausted: bool,
}

/// Configuration accepted by [`FeatureIterator::new`], mirroring the
/// `iterate(...)` contract.
pub struct IterateConfig {
    pub checklines: usize,
    pub force_dialect_check: bool,
    pub force_gff: bool,
    pub dialect: Option<Dialect>,
    pub transform: Option<Transform>,
}

impl Default for IterateConfig {
    fn default() -> Self {
        IterateConfig {
            checklines: 10,
            force_dialect_check: false,
            force_gff: false,
            dialect: None,
            transform: None,
        }
    }
}

impl FeatureIterator {
    /// Build an iterator over the lines of a file at `path`.
    pub fn from_path<P: AsRef<Path>>(path: P, config: IterateConfig) -> Result<FeatureIterator, Error> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let lines = Box::new(reader.lines()) as Box<dyn Iterator<Item = std::io::Result<String>>>;
        Ok(Self::new(Source::Lines(lines), config))
    }

    /// Build an iterator over literal text (one record per line), for
    /// `from_string`-style ingestion.
    pub fn from_string(text: &str, config: IterateConfig) -> FeatureIterator {
        let owned = text.to_string();
        let lines: Vec<std::io::Result<String>> = owned.lines().map(|l| Ok(l.to_string())).collect();
        Self::new(Source::Lines(Box::new(lines.into_iter())), config)
    }

    /// Build an iterator over an already-materialised sequence of
    /// features, bypassing dialect sniffing (each feature already carries
    /// its own dialect).
    pub fn from_features(features: Vec<Feature>, transform: Option<Transform>) -> FeatureIterator {
        FeatureIterator {
            source: Source::Features(features.into_iter()),
            dialect: None,
            force_dialect_check: false,
            buffered: VecDeque::new(),
            directives: Vec::new(),
            warnings: Vec::new(),
            transform,
            line_no: 0,
            exhausted: false,
        }
    }

    fn new(source: Source, config: IterateConfig) -> FeatureIterator {
        let dialect = if config.force_gff {
            Some(Dialect::gff3())
        } else {
            config.dialect
        };
        let mut iter = FeatureIterator {
            source,
            dialect,
            force_dialect_check: config.force_dialect_check,
            buffered: VecDeque::new(),
            directives: Vec::new(),
            warnings: Vec::new(),
            transform: config.transform,
            line_no: 0,
            exhausted: false,
        };
        if iter.dialect.is_none() {
            iter.sniff(config.checklines);
        }
        iter
    }

    /// Read up to `checklines` data lines ahead, sniff a dialect from
    /// them, parse them under that dialect, and push the results onto the
    /// replay buffer so they are not lost.
    fn sniff(&mut self, checklines: usize) {
        let mut raw_data_lines: Vec<(usize, Vec<String>)> = Vec::new();
        let mut col9s: Vec<String> = Vec::new();

        while raw_data_lines.len() < checklines {
            let Some(line) = self.next_raw_line() else {
                break;
            };
            match classify_line(&line) {
                LineKind::Blank | LineKind::Comment => {}
                LineKind::Directive(d) => self.directives.push(d),
                LineKind::Data(fields) => {
                    if let Some(col9) = fields.get(8) {
                        col9s.push(col9.clone());
                    }
                    raw_data_lines.push((self.line_no, fields));
                }
            }
        }

        let dialect = dialect::sniff(col9s.iter().map(String::as_str));
        for (line_no, fields) in raw_data_lines {
            match Feature::from_fields(&fields, &dialect, line_no, &mut self.warnings) {
                Ok(feature) => self.buffered.push_back(feature),
                Err(Error::MalformedLine(l, n)) => {
                    self.warnings.push(format!("malformed line {l}: expected at least 9 columns, got {n}"));
                    tracing::warn!("malformed line {l}: expected at least 9 columns, got {n}");
                }
                Err(other) => {
                    self.warnings.push(other.to_string());
                }
            }
        }
        self.dialect = Some(dialect);
    }

    fn next_raw_line(&mut self) -> Option<String> {
        match &mut self.source {
            Source::Lines(lines) => {
                let line = lines.next()?.ok()?;
                self.line_no += 1;
                Some(line)
            }
            Source::Features(_) => None,
        }
    }

    /// Directives (`##`-prefixed pragma lines) encountered so far, in
    /// order.
    pub fn directives(&self) -> &[String] {
        &self.directives
    }

    /// Warnings accumulated so far (non-fatal parse problems, dialect
    /// disagreements, etc.), in order.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn parse_one(&mut self, line_no: usize, fields: Vec<String>) -> Option<Result<Feature, Error>> {
        let dialect = self.dialect.clone().expect("dialect elected before parsing data lines");

        if self.force_dialect_check {
            if let Some(col9) = fields.get(8) {
                let guessed = dialect::sniff_one(col9);
                if guessed != dialect.fmt {
                    let msg = format!(
                        "line {line_no}: dialect disagreement, elected {:?} but line looks like {:?}",
                        dialect.fmt, guessed
                    );
                    self.warnings.push(msg.clone());
                    tracing::warn!("{msg}");
                }
            }
        }

        match Feature::from_fields(&fields, &dialect, line_no, &mut self.warnings) {
            Ok(feature) => Some(Ok(feature)),
            Err(Error::MalformedLine(l, n)) => {
                let msg = format!("malformed line {l}: expected at least 9 columns, got {n}");
                self.warnings.push(msg.clone());
                tracing::warn!("{msg}");
                None
            }
            Err(other) => Some(Err(other)),
        }
    }
}

impl Iterator for FeatureIterator {
    type Item = Result<Feature, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(feature) = self.buffered.pop_front() {
                let feature = match &mut self.transform {
                    Some(t) => t(feature),
                    None => feature,
                };
                return Some(Ok(feature));
            }
            if self.exhausted {
                return None;
            }

            match &mut self.source {
                Source::Features(features) => {
                    return match features.next() {
                        Some(feature) => {
                            let feature = match &mut self.transform {
                                Some(t) => t(feature),
                                None => feature,
                            };
                            Some(Ok(feature))
                        }
                        None => {
                            self.exhausted = true;
                            None
                        }
                    };
                }
                Source::Lines(_) => {
                    let Some(line) = self.next_raw_line() else {
                        self.exhausted = true;
                        continue;
                    };
                    let line_no = self.line_no;
                    match classify_line(&line) {
                        LineKind::Blank | LineKind::Comment => continue,
                        LineKind::Directive(d) => {
                            self.directives.push(d);
                            continue;
                        }
                        LineKind::Data(fields) => match self.parse_one(line_no, fields) {
                            Some(Ok(feature)) => {
                                let feature = match &mut self.transform {
                                    Some(t) => t(feature),
                                    None => feature,
                                };
                                return Some(Ok(feature));
                            }
                            Some(Err(e)) => return Some(Err(e)),
                            None => continue,
                        },
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn buffers_sniffed_lines_and_replays_them() {
        let text = "chr1\t.\tgene\t1\t100\t.\t+\t.\tID=gene1\nchr1\t.\tmRNA\t1\t100\t.\t+\t.\tID=m1;Parent=gene1\n";
        let iter = FeatureIterator::from_string(text, IterateConfig { checklines: 1, ..Default::default() });
        let features: Vec<Feature> = iter.map(Result::unwrap).collect();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id, "");
        assert_eq!(features[0].featuretype, "gene");
        assert_eq!(features[1].featuretype, "mRNA");
    }

    #[test]
    fn collects_directives() {
        let text = "##gff-version 3\nchr1\t.\tgene\t1\t100\t.\t+\t.\tID=gene1\n";
        let mut iter = FeatureIterator::from_string(text, IterateConfig::default());
        let _: Vec<_> = (&mut iter).collect();
        assert_eq!(iter.directives(), &["##gff-version 3".to_string()]);
    }

    #[tracing_test::traced_test]
    #[test]
    fn malformed_lines_become_warnings_not_errors() {
        let text = "chr1\tonly\ttwo\nchr1\t.\tgene\t1\t100\t.\t+\t.\tID=gene1\n";
        let mut iter = FeatureIterator::from_string(text, IterateConfig::default());
        let features: Vec<Feature> = (&mut iter).map(Result::unwrap).collect();
        assert_eq!(features.len(), 1);
        assert_eq!(iter.warnings().len(), 1);
    }

    #[test]
    fn empty_input_is_a_silent_no_op() {
        let iter = FeatureIterator::from_string("", IterateConfig::default());
        let features: Vec<Feature> = iter.map(Result::unwrap).collect();
        assert!(features.is_empty());
    }

    #[test]
    fn unparseable_attribute_entry_warns_but_keeps_the_record() {
        let text = "chr1\t.\tgene\t1\t100\t.\t+\t.\tID=g1;not-a-key-value-pair;Name=foo\n";
        let mut iter = FeatureIterator::from_string(text, IterateConfig::default());
        let features: Vec<Feature> = (&mut iter).map(Result::unwrap).collect();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0].attributes.get_first("ID"), Some("g1"));
        assert_eq!(features[0].attributes.get_first("Name"), Some("foo"));
        assert_eq!(iter.warnings().len(), 1);
    }
}
