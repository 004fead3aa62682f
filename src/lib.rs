//! # ppp-report - Pruning Run Data Model and Reports
//!
//! Sequences, alignments and run reporting for phylogenetic ortholog/paralog
//! pruning.
//!
//! ## Architecture
//!
//! - `model`: Sequences and alignments, taxon/identifier derivation
//! - `alphabet`: IUPAC alphabets and sequence type detection
//! - `fasta`: FASTA reading and writing
//! - `stats`: Alignment statistics and the ortholog statistics ledger
//! - `tree`: What the run log needs from the tree-processing stages
//! - `config`: Run parameters
//! - `run_log`: Accumulated run statistics and the text report
//! - `messages`: Warnings, errors and tips shown to the user

pub mod alphabet;
pub mod config;
pub mod fasta;
pub mod messages;
pub mod model;
pub mod run_log;
pub mod stats;
pub mod tree;
