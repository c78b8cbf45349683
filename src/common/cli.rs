//! Common CLI code.

/// Commonly used command line arguments.
#[derive(clap::Parser, Debug, Clone)]
pub struct Args {
    /// Verbosity of the program
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,
}

/// Output format for `query`/`write` sub commands.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    /// One JSON object per line.
    #[default]
    Jsonl,
    /// Render under the record's own dialect (GFF3 or GTF).
    Native,
}

/// Construct the `indicatif` style for progress bars over a known-length
/// operation (e.g. a list of input files).
pub fn indicatif_style() -> indicatif::ProgressStyle {
    let tpl = "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] \
    {human_pos}/{human_len} ({eta})";
    indicatif::ProgressStyle::with_template(tpl)
        .unwrap()
        .with_key(
            "eta",
            |state: &indicatif::ProgressState, w: &mut dyn std::fmt::Write| {
                write!(w, "{:.1}s", state.eta().as_secs_f64()).unwrap()
            },
        )
        .progress_chars("#>-")
}

/// Construct the `indicatif` style for a spinner over a streaming
/// operation whose total length isn't known up front (e.g. ingesting
/// records off a line-at-a-time reader) — `--verbose` ingestion progress
/// uses this rather than [`indicatif_style`], which needs a known length.
pub fn indicatif_spinner_style() -> indicatif::ProgressStyle {
    indicatif::ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {human_pos} features ingested")
        .unwrap()
}

/// `readlink -f`-style canonicalisation used before handing a path to
/// RocksDB (which otherwise stores the path as given in its manifest).
pub fn readlink_f<P: AsRef<std::path::Path>>(path: P) -> Result<std::path::PathBuf, anyhow::Error> {
    std::fs::canonicalize(&path)
        .map_err(|e| anyhow::anyhow!("failed to canonicalize {}: {}", path.as_ref().display(), e))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn smoke_test_indicatif_style() {
        let _style = indicatif_style();
    }
}
