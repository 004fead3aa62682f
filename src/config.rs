//! Run configuration.
//!
//! A finished set of run parameters, handed to the run log once argument
//! parsing is done. Nothing here is derived; the run log copies what it needs.

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use thiserror::Error;

/// How the tree is rooted before paralogy pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RootingMethod {
    /// Root at the midpoint of the longest path
    Midpoint,
    /// Root on the configured outgroup taxa
    Outgroup,
}

/// How monophyletic groups of one taxon are masked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MaskingMethod {
    /// Keep the longest sequence
    Longest,
    /// Keep the sequence with the shortest pairwise distance
    Pdist,
}

/// How paralogs are pruned from a masked tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PruningMethod {
    /// Largest subtree
    Ls,
    /// Maximum inclusion
    Mi,
    /// Monophyletic outgroup
    Mo,
    /// Rooted tree
    Rt,
    /// Only one-to-one orthologs
    #[value(name = "1to1")]
    OneToOne,
}

impl fmt::Display for RootingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RootingMethod::Midpoint => write!(f, "midpoint"),
            RootingMethod::Outgroup => write!(f, "outgroup"),
        }
    }
}

impl fmt::Display for MaskingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskingMethod::Longest => write!(f, "longest"),
            MaskingMethod::Pdist => write!(f, "pdist"),
        }
    }
}

impl fmt::Display for PruningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PruningMethod::Ls => write!(f, "LS"),
            PruningMethod::Mi => write!(f, "MI"),
            PruningMethod::Mo => write!(f, "MO"),
            PruningMethod::Rt => write!(f, "RT"),
            PruningMethod::OneToOne => write!(f, "1to1"),
        }
    }
}

/// Errors for parameter values no run can use.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Minimum support must be between 0 and 1 (got {0})")]
    InvalidSupport(f64),

    #[error("Long-branch trimming factor must be positive (got {0})")]
    InvalidTrimFactor(f64),
}

/// Parameters of a single run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Path to the input FASTA file
    pub msa_file: PathBuf,
    /// Path to the input Newick tree
    pub tree_file: PathBuf,
    /// Minimum number of taxa in an output ortholog
    pub min_taxa: usize,
    /// Minimum ungapped sequence length
    pub min_seq_len: usize,
    /// Branches with lower support are collapsed into polytomies
    pub min_support: Option<f64>,
    /// Branches longer than this factor times the mean are removed
    pub trim_lb: Option<f64>,
    /// Outgroup taxa, in the order given
    pub outgroup: Vec<String>,
    pub root: Option<RootingMethod>,
    pub mask: Option<MaskingMethod>,
    pub prune: Option<PruningMethod>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            msa_file: PathBuf::new(),
            tree_file: PathBuf::new(),
            min_taxa: 4,
            min_seq_len: 0,
            min_support: None,
            trim_lb: None,
            outgroup: Vec::new(),
            root: None,
            mask: None,
            prune: None,
        }
    }
}

impl RunConfig {
    /// Creates a configuration for one input alignment and its tree.
    pub fn new(msa_file: impl Into<PathBuf>, tree_file: impl Into<PathBuf>) -> Self {
        Self {
            msa_file: msa_file.into(),
            tree_file: tree_file.into(),
            ..Self::default()
        }
    }

    /// True if a paralogy pruning method was selected.
    pub fn prunes_paralogs(&self) -> bool {
        self.prune.is_some()
    }

    /// Checks the numeric thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(support) = self.min_support {
            if !(0.0..=1.0).contains(&support) {
                return Err(ConfigError::InvalidSupport(support));
            }
        }
        if let Some(factor) = self.trim_lb {
            if factor <= 0.0 || factor.is_nan() {
                return Err(ConfigError::InvalidTrimFactor(factor));
            }
        }
        Ok(())
    }
}
