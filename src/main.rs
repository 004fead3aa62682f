//! ppp-stats - Ortholog alignment statistics
//!
//! Computes the per-alignment statistics of the pruning run ledger for a set
//! of FASTA alignments and appends them to the dated ledger.
//!
//! ## Usage
//!
//! ```bash
//! ppp-stats -o out/ orthologs/*.fa
//! ppp-stats --validate -vv og1.fa og2.fa
//! ```
//!
//! Each row of `<dir>/<YYYY-MM-DD>_ppp_ortho_stats.csv` holds: file name;
//! sequences; average length; shortest; longest; % missing data; columns.

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};

use ppp_report::alphabet::SequenceType;
use ppp_report::fasta::parse_fasta_file;
use ppp_report::messages::{format_otus, Level, Messenger, TerminalMessenger};
use ppp_report::model::Alignment;
use ppp_report::stats::{append_ortholog_stats, OrthologStats};

/// Alphabet to validate against
#[derive(Debug, Clone, Copy, ValueEnum)]
enum AlphabetArg {
    /// Nucleotide IUPAC codes
    Nucleotide,
    /// Amino acid IUPAC codes
    AminoAcid,
    /// Detect from extension and content
    Auto,
}

impl From<AlphabetArg> for Option<SequenceType> {
    fn from(arg: AlphabetArg) -> Self {
        match arg {
            AlphabetArg::Nucleotide => Some(SequenceType::Nucleotide),
            AlphabetArg::AminoAcid => Some(SequenceType::AminoAcid),
            AlphabetArg::Auto => None,
        }
    }
}

/// ppp-stats - statistics for pruned ortholog alignments
///
/// Appends one semicolon-separated row per alignment to today's ledger in
/// the output directory and prints the same statistics to stdout.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// FASTA alignments to summarize
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Directory holding the dated statistics ledger
    #[arg(short = 'o', long = "output", default_value = ".")]
    output: PathBuf,

    /// Check residues against an IUPAC alphabet before computing statistics
    #[arg(long = "validate", value_enum, num_args = 0..=1, default_missing_value = "auto")]
    validate: Option<AlphabetArg>,

    /// Skip files that fail to load or validate instead of stopping
    #[arg(short = 'k', long = "keep-going")]
    keep_going: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(level)
        .format_timestamp(None) // Don't show timestamps
        .format_target(false) // Don't show module names
        .init();
}

/// Loads one alignment and, if requested, validates its residues.
fn load(path: &Path, validate: Option<AlphabetArg>) -> Result<Alignment> {
    let alignment = parse_fasta_file(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    if let Some(alphabet) = validate {
        alignment
            .validate(alphabet.into())
            .with_context(|| format!("Invalid residues in {}", path.display()))?;
    }

    log::debug!(
        "Loaded {} sequences from {} ({})",
        alignment.len(),
        path.display(),
        alignment.sequence_type()
    );
    Ok(alignment)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);
    let messenger = TerminalMessenger::new();

    if !args.output.is_dir() {
        anyhow::bail!("Output directory does not exist: {}", args.output.display());
    }

    let mut alignments = Vec::with_capacity(args.files.len());
    for path in &args.files {
        messenger.emit(Level::Progress, &format!("reading {}", path.display()))?;
        match load(path, args.validate) {
            Ok(alignment) => alignments.push(alignment),
            Err(e) if args.keep_going => {
                messenger.emit(Level::Warning, &format!("{:#}", e))?;
            }
            Err(e) => {
                messenger.emit(Level::Tip, "use -k/--keep-going to skip unreadable files")?;
                return Err(e);
            }
        }
    }

    if alignments.is_empty() {
        anyhow::bail!("No alignment could be read");
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for alignment in &alignments {
        if !alignment.is_aligned() {
            messenger.emit(
                Level::Warning,
                &format!("{} is not aligned; column count is the first sequence's length", alignment),
            )?;
        }
        let stats = OrthologStats::from_alignment(alignment);
        writeln!(handle, "{}", stats.to_record().join("\t"))?;

        let taxa: BTreeSet<&str> = alignment.taxa().collect();
        let taxa: Vec<&str> = taxa.into_iter().collect();
        writeln!(handle, "{}", format_otus(&taxa))?;
    }

    let ledger = append_ortholog_stats(&args.output, &alignments)?;
    eprintln!("Wrote {} rows to {}", alignments.len(), ledger.display());

    Ok(())
}
