//! Record of a single pruning run.
//!
//! The run log is created once the input alignment and tree are loaded. The
//! tree-processing stages then record what they trim, mask and recover; every
//! collection only grows. At the end of the run the log is rendered once into
//! a text report and a set of ledger rows, both appended to dated files in the
//! output directory:
//!
//! ```text
//! <dir>/<YYYY-MM-DD>_ppp_run.log
//! <dir>/<YYYY-MM-DD>_ppp_ortho_stats.csv
//! ```
//!
//! Rendering only reads the log, so a failed write can be retried elsewhere.
//! Appends are not locked: concurrent runs writing to the same directory on
//! the same day may interleave.

use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use crate::config::RunConfig;
use crate::model::Alignment;
use crate::stats::append_ortholog_stats_on;
use crate::tree::TreeNode;

/// Shown instead of the ortholog groups when none were recovered.
pub const NO_ORTHOLOGS: &str = "no orthologs were recovered";

/// Errors that can occur while writing the report or the ledger.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to write report: {0}")]
    IoError(#[from] io::Error),

    #[error("Failed to write ortholog statistics: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type for reporting operations.
pub type ReportResult<T> = Result<T, ReportError>;

/// Path of the text report for `date` inside `dir`.
pub fn run_log_path(dir: &Path, date: NaiveDate) -> PathBuf {
    dir.join(format!("{}_ppp_run.log", date.format("%Y-%m-%d")))
}

/// Statistics and recovered groups of one run.
///
/// `N` is the node type of the tree-processing stages. Nodes are stored as
/// snapshots: record a clone if the tree keeps changing afterwards.
#[derive(Debug)]
pub struct RunLog<'a, N: TreeNode> {
    version: String,
    msa: &'a Alignment,
    msa_file: PathBuf,
    tree_file: PathBuf,
    outgroup: Vec<String>,
    prune_paralogs: bool,
    sequence_count: usize,
    taxon_count: usize,
    collapsed_nodes: usize,
    trimmed_seqs: Vec<N>,
    long_branches: Vec<N>,
    masked: Vec<N>,
    orthologs: Vec<N>,
    paralogs: Vec<N>,
    msas_out: Vec<Alignment>,
    homology_tree: Option<N>,
    masked_tree: Option<N>,
}

impl<'a, N: TreeNode> RunLog<'a, N> {
    /// Starts the log of a run. Sequence and taxon counts are taken from
    /// `tree` now and never recomputed.
    pub fn new(version: impl Into<String>, msa: &'a Alignment, tree: &N, config: &RunConfig) -> Self {
        Self {
            version: version.into(),
            msa,
            msa_file: config.msa_file.clone(),
            tree_file: config.tree_file.clone(),
            outgroup: config.outgroup.clone(),
            prune_paralogs: config.prunes_paralogs(),
            sequence_count: tree.leaf_count(),
            taxon_count: tree.taxon_count(),
            collapsed_nodes: 0,
            trimmed_seqs: Vec::new(),
            long_branches: Vec::new(),
            masked: Vec::new(),
            orthologs: Vec::new(),
            paralogs: Vec::new(),
            msas_out: Vec::new(),
            homology_tree: None,
            masked_tree: None,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// The input alignment of this run.
    pub fn msa(&self) -> &Alignment {
        self.msa
    }

    pub fn msa_file(&self) -> &Path {
        &self.msa_file
    }

    pub fn tree_file(&self) -> &Path {
        &self.tree_file
    }

    pub fn outgroup(&self) -> &[String] {
        &self.outgroup
    }

    /// True if a paralogy pruning method was configured.
    pub fn prune_paralogs(&self) -> bool {
        self.prune_paralogs
    }

    /// Number of leaves in the input tree.
    pub fn sequence_count(&self) -> usize {
        self.sequence_count
    }

    /// Number of distinct taxa in the input tree.
    pub fn taxon_count(&self) -> usize {
        self.taxon_count
    }

    pub fn collapsed_nodes(&self) -> usize {
        self.collapsed_nodes
    }

    pub fn trimmed_seqs(&self) -> &[N] {
        &self.trimmed_seqs
    }

    pub fn long_branches(&self) -> &[N] {
        &self.long_branches
    }

    pub fn masked(&self) -> &[N] {
        &self.masked
    }

    pub fn orthologs(&self) -> &[N] {
        &self.orthologs
    }

    pub fn paralogs(&self) -> &[N] {
        &self.paralogs
    }

    pub fn msas_out(&self) -> &[Alignment] {
        &self.msas_out
    }

    pub fn homology_tree(&self) -> Option<&N> {
        self.homology_tree.as_ref()
    }

    pub fn masked_tree(&self) -> Option<&N> {
        self.masked_tree.as_ref()
    }

    /// Records a sequence removed for being too short.
    pub fn record_trimmed(&mut self, node: N) {
        self.trimmed_seqs.push(node);
    }

    /// Records a sequence removed for sitting on a long branch.
    pub fn record_long_branch(&mut self, node: N) {
        self.long_branches.push(node);
    }

    /// Records a sequence removed while masking a monophyletic group.
    pub fn record_masked(&mut self, node: N) {
        self.masked.push(node);
    }

    /// Records a recovered ortholog group.
    pub fn record_ortholog(&mut self, subtree: N) {
        self.orthologs.push(subtree);
    }

    /// Records a paralog, either a leaf or a subtree.
    pub fn record_paralog(&mut self, node: N) {
        self.paralogs.push(node);
    }

    /// Records an alignment written to the output.
    pub fn record_output(&mut self, alignment: Alignment) {
        self.msas_out.push(alignment);
    }

    /// Adds to the number of nodes collapsed into polytomies.
    pub fn add_collapsed_nodes(&mut self, count: usize) {
        self.collapsed_nodes += count;
    }

    /// Stores the tree as it was before any operation.
    pub fn set_homology_tree(&mut self, tree: N) {
        self.homology_tree = Some(tree);
    }

    /// Stores the tree after masking, before paralogy pruning.
    pub fn set_masked_tree(&mut self, tree: N) {
        self.masked_tree = Some(tree);
    }

    /// `outgroup: A` or `outgroups: A, B`; `None` without an outgroup.
    pub fn outgroup_summary(&self) -> Option<String> {
        match self.outgroup.as_slice() {
            [] => None,
            [single] => Some(format!("outgroup: {}", single)),
            many => Some(format!("outgroups: {}", many.join(", "))),
        }
    }

    /// Paralogous taxa, each listed once in order of first appearance.
    pub fn paralog_summary(&self) -> String {
        let mut seen = HashSet::new();
        let unique: Vec<&str> = self
            .paralogs
            .iter()
            .flat_map(|paralog| paralog.taxa())
            .filter(|taxon| seen.insert(*taxon))
            .collect();

        if unique.is_empty() {
            "paralogous OTUs:  none".to_string()
        } else {
            format!("paralogous OTUs: {}", unique.join(", "))
        }
    }

    /// Index, size and topology of every ortholog group, in recovery order.
    pub fn ortholog_summary(&self) -> String {
        if self.orthologs.is_empty() {
            return NO_ORTHOLOGS.to_string();
        }

        self.orthologs
            .iter()
            .enumerate()
            .map(|(index, subtree)| {
                format!(
                    "\northologous group #{}:\n  # of sequences:\t{}\n{}",
                    index + 1,
                    subtree.leaf_count(),
                    subtree.view()
                )
            })
            .collect()
    }

    /// One `wrote: <file>` line per output alignment, after a blank line.
    pub fn written_outputs_summary(&self) -> String {
        if self.msas_out.is_empty() {
            return String::new();
        }

        let mut summary = String::from("\n");
        for msa in &self.msas_out {
            summary.push_str(&format!("wrote: {}\n", msa));
        }
        summary
    }

    /// Builds the full text report without touching the filesystem.
    pub fn render_report(&self) -> String {
        let outgroups = self
            .outgroup_summary()
            .map(|line| format!("{}\n", line))
            .unwrap_or_default();
        let homology_tree = self
            .homology_tree
            .as_ref()
            .map_or_else(|| "none".to_string(), |tree| tree.view());
        let masked_tree = self
            .masked_tree
            .as_ref()
            .map_or_else(|| "none".to_string(), |tree| tree.view());

        format!(
            "\nMSA:\t\t\t\t\t{msa}\n\
             tree:\t\t\t\t\t{tree}\n\
             {outgroups}\
             # of sequences:\t\t\t\t{sequences}\n\
             # of OTUs:\t\t\t\t{taxa}\n\
             # of short sequences removed:\t\t{trimmed}\n\
             # of long branched sequences removed:\t{long_branches}\n\
             # of monophylies masked:\t\t{masked}\n\
             # of nodes collapsed into polytomies:\t{collapsed}\n\
             {paralogs}\n\
             \ninput tree:\n{homology_tree}\n\
             \ntree before paralogy pruning:\n{masked_tree}\n\
             {orthologs}\n\
             {outputs}",
            msa = self.msa_file.display(),
            tree = self.tree_file.display(),
            sequences = self.sequence_count,
            taxa = self.taxon_count,
            trimmed = self.trimmed_seqs.len(),
            long_branches = self.long_branches.len(),
            masked = self.masked.len(),
            collapsed = self.collapsed_nodes,
            paralogs = self.paralog_summary(),
            orthologs = self.ortholog_summary(),
            outputs = self.written_outputs_summary(),
        )
    }

    /// Appends the report to today's run log in `dir` and, for each
    /// recovered ortholog, the statistics of every output alignment to
    /// today's ledger. With `verbose` the report is also printed to stdout.
    ///
    /// Returns the path of the run log.
    pub fn report(&self, verbose: bool, dir: &Path) -> ReportResult<PathBuf> {
        self.report_on(verbose, dir, chrono::Local::now().date_naive())
    }

    /// Same as [`RunLog::report`], dated `date` instead of today.
    pub fn report_on(&self, verbose: bool, dir: &Path, date: NaiveDate) -> ReportResult<PathBuf> {
        self.report_to(dir, date, verbose.then(|| io::stdout().lock()))
    }

    /// Writes the report files for `date` and echoes the report to `echo`,
    /// if given.
    ///
    /// The ledger receives the rows of every output alignment once per
    /// recovered ortholog.
    pub fn report_to<W: Write>(
        &self,
        dir: &Path,
        date: NaiveDate,
        echo: Option<W>,
    ) -> ReportResult<PathBuf> {
        let report = self.render_report();

        let log_path = run_log_path(dir, date);
        let mut log_file = OpenOptions::new().create(true).append(true).open(&log_path)?;
        log_file.write_all(report.as_bytes())?;
        log::info!("Appended run report to {}", log_path.display());

        for _ in &self.orthologs {
            let stats_path = append_ortholog_stats_on(dir, &self.msas_out, date)?;
            log::debug!("Appended ortholog statistics to {}", stats_path.display());
        }

        if let Some(mut out) = echo {
            writeln!(out, "{}", report)?;
        }

        Ok(log_path)
    }

    /// Appends one ledger row per output alignment to today's ledger in `dir`.
    pub fn append_ortholog_stats(&self, dir: &Path) -> ReportResult<PathBuf> {
        append_ortholog_stats_on(dir, &self.msas_out, chrono::Local::now().date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PruningMethod;
    use crate::model::Sequence;
    use crate::tree::test_support::Node;

    fn input_tree() -> Node {
        Node::internal(vec![
            Node::internal(vec![Node::leaf("A|1"), Node::leaf("A|2")]),
            Node::internal(vec![Node::leaf("B|1"), Node::leaf("C|1")]),
            Node::leaf("D|1"),
        ])
    }

    fn config(outgroup: &[&str]) -> RunConfig {
        RunConfig {
            outgroup: outgroup.iter().map(|s| s.to_string()).collect(),
            prune: Some(PruningMethod::Mi),
            ..RunConfig::new("in/og1.fa", "in/og1.tre")
        }
    }

    #[test]
    fn test_counts_frozen_at_construction() {
        let msa = Alignment::new("in/og1.fa");
        let tree = input_tree();
        let mut log = RunLog::new("1.0.0", &msa, &tree, &config(&[]));

        assert_eq!(log.sequence_count(), 5);
        assert_eq!(log.taxon_count(), 4);
        assert!(log.prune_paralogs());
        assert_eq!(log.version(), "1.0.0");

        log.record_trimmed(Node::leaf("A|2"));
        log.record_long_branch(Node::leaf("D|1"));
        assert_eq!(log.sequence_count(), 5);
        assert_eq!(log.taxon_count(), 4);
        assert_eq!(log.trimmed_seqs().len(), 1);
        assert_eq!(log.long_branches().len(), 1);
    }

    #[test]
    fn test_outgroup_summary() {
        let msa = Alignment::new("in/og1.fa");
        let tree = input_tree();

        let log = RunLog::new("1.0.0", &msa, &tree, &config(&[]));
        assert_eq!(log.outgroup_summary(), None);

        let log = RunLog::new("1.0.0", &msa, &tree, &config(&["D"]));
        assert_eq!(log.outgroup_summary().as_deref(), Some("outgroup: D"));

        let log = RunLog::new("1.0.0", &msa, &tree, &config(&["A", "B", "C"]));
        assert_eq!(log.outgroup_summary().as_deref(), Some("outgroups: A, B, C"));
    }

    #[test]
    fn test_paralog_summary_deduplicates() {
        let msa = Alignment::new("in/og1.fa");
        let tree = input_tree();
        let mut log = RunLog::new("1.0.0", &msa, &tree, &config(&[]));
        assert_eq!(log.paralog_summary(), "paralogous OTUs:  none");

        log.record_paralog(Node::leaf("A|1"));
        log.record_paralog(Node::leaf("A|2"));
        log.record_paralog(Node::leaf("B|1"));
        assert_eq!(log.paralog_summary(), "paralogous OTUs: A, B");
    }

    #[test]
    fn test_paralog_summary_from_subtrees() {
        let msa = Alignment::new("in/og1.fa");
        let tree = input_tree();
        let mut log = RunLog::new("1.0.0", &msa, &tree, &config(&[]));

        log.record_paralog(Node::internal(vec![Node::leaf("C|1"), Node::leaf("A|1")]));
        log.record_paralog(Node::leaf("C|2"));
        assert_eq!(log.paralog_summary(), "paralogous OTUs: C, A");
    }

    #[test]
    fn test_ortholog_summary() {
        let msa = Alignment::new("in/og1.fa");
        let tree = input_tree();
        let mut log = RunLog::new("1.0.0", &msa, &tree, &config(&[]));
        assert_eq!(log.ortholog_summary(), NO_ORTHOLOGS);

        log.record_ortholog(Node::internal(vec![
            Node::leaf("A|1"),
            Node::leaf("B|1"),
            Node::leaf("C|1"),
        ]));
        assert_eq!(
            log.ortholog_summary(),
            "\northologous group #1:\n  # of sequences:\t3\n(A|1,B|1,C|1)"
        );

        log.record_ortholog(Node::internal(vec![Node::leaf("A|2"), Node::leaf("D|1")]));
        let summary = log.ortholog_summary();
        assert!(summary.contains("orthologous group #2:\n  # of sequences:\t2\n(A|2,D|1)"));
    }

    #[test]
    fn test_written_outputs_summary() {
        let msa = Alignment::new("in/og1.fa");
        let tree = input_tree();
        let mut log = RunLog::new("1.0.0", &msa, &tree, &config(&[]));
        assert_eq!(log.written_outputs_summary(), "");

        log.record_output(Alignment::new("out/og1_pruned_1.fa"));
        log.record_output(Alignment::new("out/og1_pruned_2.fa"));
        assert_eq!(
            log.written_outputs_summary(),
            "\nwrote: out/og1_pruned_1.fa\nwrote: out/og1_pruned_2.fa\n"
        );
    }

    #[test]
    fn test_render_report_layout() {
        let msa = Alignment::from_sequences(
            "in/og1.fa",
            vec![Sequence::new("A|1", "ACGT").unwrap()],
        );
        let tree = input_tree();
        let mut log = RunLog::new("1.0.0", &msa, &tree, &config(&["D"]));
        log.set_homology_tree(tree.clone());
        log.record_masked(Node::leaf("A|2"));
        log.add_collapsed_nodes(2);

        let report = log.render_report();
        assert!(report.starts_with("\nMSA:\t\t\t\t\tin/og1.fa\ntree:\t\t\t\t\tin/og1.tre\noutgroup: D\n"));
        assert!(report.contains("# of sequences:\t\t\t\t5\n"));
        assert!(report.contains("# of OTUs:\t\t\t\t4\n"));
        assert!(report.contains("# of short sequences removed:\t\t0\n"));
        assert!(report.contains("# of monophylies masked:\t\t1\n"));
        assert!(report.contains("# of nodes collapsed into polytomies:\t2\n"));
        assert!(report.contains("paralogous OTUs:  none\n"));
        assert!(report.contains("\ninput tree:\n((A|1,A|2),(B|1,C|1),D|1)\n"));
        assert!(report.contains("\ntree before paralogy pruning:\nnone\n"));
        assert!(report.contains(NO_ORTHOLOGS));
        assert_eq!(log.msa().len(), 1);
    }

    #[test]
    fn test_render_report_without_outgroup_has_no_outgroup_line() {
        let msa = Alignment::new("in/og1.fa");
        let tree = input_tree();
        let log = RunLog::new("1.0.0", &msa, &tree, &config(&[]));

        let report = log.render_report();
        assert!(!report.contains("outgroup"));
        assert!(report.contains("tree:\t\t\t\t\tin/og1.tre\n# of sequences:"));
    }

    #[test]
    fn test_run_log_path() {
        let date = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        assert_eq!(
            run_log_path(Path::new("out"), date),
            PathBuf::from("out/2024-12-31_ppp_run.log")
        );
    }
}
