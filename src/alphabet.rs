//! Residue alphabets.
//!
//! This module provides:
//! - The two IUPAC alphabets sequences are validated against
//! - Sequence type detection from residue content or file extension

use std::fmt;

/// Amino acid IUPAC codes, including ambiguity codes, stop and gap symbols.
pub const AMINO_ACIDS: &str = "ABCDEFGHIKLMNPQRSTUVWYZX*-.";

/// Nucleotide IUPAC codes, including ambiguity codes and gap symbols.
pub const NUCLEOTIDES: &str = "ATKMBVCNSWDGUYRH-.";

/// The gap character used in aligned sequences.
pub const GAP: char = '-';

/// Residues that mark data as nucleotide when detecting the sequence type.
const UNAMBIGUOUS_NUCLEOTIDES: &str = "ACGTUN";

/// Kind of residues a sequence is made of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceType {
    Nucleotide,
    AminoAcid,
}

impl SequenceType {
    /// The IUPAC alphabet for this sequence type (upper case).
    pub fn alphabet(self) -> &'static str {
        match self {
            SequenceType::Nucleotide => NUCLEOTIDES,
            SequenceType::AminoAcid => AMINO_ACIDS,
        }
    }

    /// Returns true if `residue` belongs to this alphabet. Case-insensitive.
    pub fn accepts(self, residue: char) -> bool {
        self.alphabet().contains(residue.to_ascii_uppercase())
    }

    /// Guesses the sequence type from residue content.
    ///
    /// Data made only of `A`, `C`, `G`, `T`, `U`, `N` and gaps is nucleotide;
    /// anything else is treated as amino acid. Empty or all-gap data defaults
    /// to nucleotide.
    pub fn detect(data: &str) -> Self {
        let is_nucleotide = data
            .chars()
            .filter(|&c| c != GAP && c != '.')
            .all(|c| UNAMBIGUOUS_NUCLEOTIDES.contains(c.to_ascii_uppercase()));

        if is_nucleotide {
            SequenceType::Nucleotide
        } else {
            SequenceType::AminoAcid
        }
    }

    /// Maps a FASTA file extension to a sequence type, when it implies one.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_lowercase().as_str() {
            "fna" | "ffn" | "frn" => Some(SequenceType::Nucleotide),
            "faa" => Some(SequenceType::AminoAcid),
            _ => None,
        }
    }
}

impl fmt::Display for SequenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SequenceType::Nucleotide => write!(f, "nucleotide"),
            SequenceType::AminoAcid => write!(f, "amino acid"),
        }
    }
}
