//! Alignment statistics and the ortholog statistics ledger.
//!
//! All functions here are pure functions of an [`Alignment`], except
//! [`append_ortholog_stats`] which appends one row per alignment to a dated,
//! semicolon-delimited CSV file. The ledger has no header and is never
//! truncated, so runs on the same day accumulate into the same file.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::model::Alignment;
use crate::run_log::ReportResult;

/// Rounds `value` to `places` decimal places.
pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Mean ungapped sequence length, rounded to one decimal. 0 for an empty alignment.
pub fn average_length(alignment: &Alignment) -> f64 {
    if alignment.is_empty() {
        return 0.0;
    }
    let total: usize = alignment.sequences.iter().map(|s| s.ungapped_len()).sum();
    round_to(total as f64 / alignment.len() as f64, 1)
}

/// Shortest ungapped sequence length, or `None` for an empty alignment.
pub fn shortest_length(alignment: &Alignment) -> Option<usize> {
    alignment.sequences.iter().map(|s| s.ungapped_len()).min()
}

/// Longest ungapped sequence length, or `None` for an empty alignment.
pub fn longest_length(alignment: &Alignment) -> Option<usize> {
    alignment.sequences.iter().map(|s| s.ungapped_len()).max()
}

/// Percent missing data: the mean gap fraction over sequences, rounded to
/// three decimals and expressed as a percentage (12.3 means 12.3%).
///
/// Sequences of length 0 add nothing to the sum but still count as sequences.
pub fn missing_data(alignment: &Alignment) -> f64 {
    if alignment.is_empty() {
        return 0.0;
    }
    let fraction_sum: f64 = alignment
        .sequences
        .iter()
        .filter(|s| !s.is_empty())
        .map(|s| (s.len() - s.ungapped_len()) as f64 / s.len() as f64)
        .sum();
    let mean = fraction_sum / alignment.len() as f64;
    // round to three decimals, then scale: same value as round_to(mean, 3) * 100
    (mean * 1000.0).round() / 10.0
}

/// Number of alignment columns, read from the first sequence.
///
/// Only meaningful once the sequences are aligned; `None` for an empty alignment.
pub fn alignment_length(alignment: &Alignment) -> Option<usize> {
    alignment.sequences.first().map(|s| s.len())
}

/// One row of the ortholog statistics ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct OrthologStats {
    /// Base name of the alignment file
    pub filename: String,
    /// Number of sequences
    pub sequences: usize,
    /// Mean ungapped length
    pub average_length: f64,
    /// Shortest ungapped length
    pub shortest: Option<usize>,
    /// Longest ungapped length
    pub longest: Option<usize>,
    /// Percent missing data
    pub missing_data: f64,
    /// Alignment column count
    pub columns: Option<usize>,
}

impl OrthologStats {
    /// Computes the statistics row for one alignment.
    pub fn from_alignment(alignment: &Alignment) -> Self {
        if !alignment.is_aligned() {
            log::warn!(
                "Sequences in {} differ in length; using the first sequence as the column count",
                alignment.filename
            );
        }

        let filename = Path::new(&alignment.filename)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| alignment.filename.clone());

        Self {
            filename,
            sequences: alignment.len(),
            average_length: average_length(alignment),
            shortest: shortest_length(alignment),
            longest: longest_length(alignment),
            missing_data: missing_data(alignment),
            columns: alignment_length(alignment),
        }
    }

    /// The seven ledger fields. Absent values are written as empty fields.
    pub fn to_record(&self) -> [String; 7] {
        fn optional(value: Option<usize>) -> String {
            value.map(|v| v.to_string()).unwrap_or_default()
        }

        [
            self.filename.clone(),
            self.sequences.to_string(),
            format!("{:.1}", self.average_length),
            optional(self.shortest),
            optional(self.longest),
            format!("{:.1}", self.missing_data),
            optional(self.columns),
        ]
    }
}

/// Path of the ledger for `date` inside `dir`.
pub fn ortho_stats_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}_ppp_ortho_stats.csv", date.format("%Y-%m-%d")))
}

/// Appends one row per alignment to today's ledger in `dir` and returns its path.
pub fn append_ortholog_stats(dir: &Path, alignments: &[Alignment]) -> ReportResult<PathBuf> {
    append_ortholog_stats_on(dir, alignments, chrono::Local::now().date_naive())
}

/// Same as [`append_ortholog_stats`], for the ledger of an explicit date.
pub fn append_ortholog_stats_on(
    dir: &Path,
    alignments: &[Alignment],
    date: NaiveDate,
) -> ReportResult<PathBuf> {
    let path = ortho_stats_path(dir, date);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .from_writer(file);

    for alignment in alignments {
        writer.write_record(&OrthologStats::from_alignment(alignment).to_record())?;
    }
    writer.flush()?;

    log::debug!("Appended {} rows to {}", alignments.len(), path.display());
    Ok(path)
}
