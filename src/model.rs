//! Sequence and alignment data model.
//!
//! This module contains the entities every pruning stage works on:
//! - `Sequence`: one record, with taxon and identifier derived from its description
//! - `Alignment`: the ordered sequences of one input or output file
//! - `NewSequence`: the ways a sequence can enter an alignment
//!
//! A description has the form `<taxon>|<identifier>` or `<taxon>@<identifier>`.
//! Only the first two fields matter, so `Homo_sapiens@ENSG01|extra` has the
//! taxon `Homo_sapiens` and the identifier `ENSG01`.

use std::fmt;
use std::path::Path;

use thiserror::Error;

use crate::alphabet::{SequenceType, GAP};
use crate::stats::round_to;

/// Characters separating the taxon from the identifier in a description.
pub const DELIMITERS: [char; 2] = ['|', '@'];

/// Errors raised when deriving or checking sequence fields.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SequenceError {
    #[error("Malformed description '{0}': expected '<taxon>|<identifier>' or '<taxon>@<identifier>'")]
    MalformedDescription(String),

    #[error("Non-IUPAC {alphabet} residue '{residue}' found in sequence {description}")]
    AlphabetViolation {
        description: String,
        residue: char,
        alphabet: SequenceType,
    },
}

/// Result type for sequence operations.
pub type SequenceResult<T> = Result<T, SequenceError>;

/// Splits a description into its taxon and identifier.
pub fn split_description(description: &str) -> SequenceResult<(&str, &str)> {
    let mut fields = description.split(DELIMITERS);
    match (fields.next(), fields.next()) {
        (Some(taxon), Some(identifier)) => Ok((taxon, identifier)),
        _ => Err(SequenceError::MalformedDescription(description.to_string())),
    }
}

/// Owned taxon and identifier; an empty description yields two empty fields.
fn derive_fields(description: &str) -> SequenceResult<(String, String)> {
    if description.is_empty() {
        return Ok((String::new(), String::new()));
    }
    let (taxon, identifier) = split_description(description)?;
    Ok((taxon.to_string(), identifier.to_string()))
}

/// Represents a single biological sequence.
///
/// Taxon and identifier are derived from the description whenever the
/// description is set through this type. A sequence with an empty description
/// is unlabelled: both derived fields are empty until a description is set.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
    description: String,
    data: String,
    taxon: String,
    identifier: String,
    is_alignment: bool,
}

impl Sequence {
    /// Creates a sequence, deriving its taxon and identifier.
    pub fn new(description: impl Into<String>, data: impl Into<String>) -> SequenceResult<Self> {
        let description = description.into();
        let data = data.into();
        let (taxon, identifier) = derive_fields(&description)?;
        let is_alignment = data.contains(GAP);
        Ok(Self {
            description,
            data,
            taxon,
            identifier,
            is_alignment,
        })
    }

    /// Creates an unlabelled sequence holding only residue data.
    pub fn unlabelled(data: impl Into<String>) -> Self {
        let data = data.into();
        Self {
            is_alignment: data.contains(GAP),
            data,
            ..Self::default()
        }
    }

    /// The raw header text.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The raw residue string.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// The operational taxonomic unit this sequence belongs to.
    pub fn taxon(&self) -> &str {
        &self.taxon
    }

    /// The identifier that follows the taxon in the description.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Replaces the description and re-derives both taxon and identifier.
    ///
    /// On error the sequence is left untouched.
    pub fn set_description(&mut self, description: impl Into<String>) -> SequenceResult<()> {
        let description = description.into();
        let (taxon, identifier) = derive_fields(&description)?;
        self.description = description;
        self.taxon = taxon;
        self.identifier = identifier;
        Ok(())
    }

    /// Replaces the residue data. The gap flag is derived again from the new data.
    pub fn set_data(&mut self, data: impl Into<String>) {
        self.data = data.into();
        self.is_alignment = self.data.contains(GAP);
    }

    /// True if the sequence is considered aligned (contains a gap unless overridden).
    pub fn is_alignment(&self) -> bool {
        self.is_alignment
    }

    /// Overrides the derived gap flag, e.g. after realigning.
    pub fn set_is_alignment(&mut self, value: bool) {
        self.is_alignment = value;
    }

    /// Returns the raw length of the sequence in characters, gaps included.
    pub fn len(&self) -> usize {
        self.data.chars().count()
    }

    /// Returns true if the sequence has no residue data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the residue data with every gap character removed.
    pub fn ungapped(&self) -> String {
        self.data.replace(GAP, "")
    }

    /// Length of the sequence without gaps.
    pub fn ungapped_len(&self) -> usize {
        self.len() - self.count(GAP)
    }

    /// Number of occurrences of `letter` in the raw data.
    pub fn count(&self, letter: char) -> usize {
        self.data.matches(letter).count()
    }

    /// GC content as a fraction of the raw length, rounded to two decimals.
    ///
    /// Residues other than `a`, `c`, `g` and `t` (any case) are reported as a
    /// warning but still count towards the length. An empty sequence has a
    /// GC content of 0.
    pub fn gc_content(&self) -> f64 {
        let lower = self.data.to_lowercase();
        if let Some(residue) = lower.chars().find(|c| !"acgt".contains(*c)) {
            log::warn!(
                "Expected a nucleotide base (a, c, g, t), but found '{}' in sequence {}",
                residue,
                self.description
            );
        }

        if lower.is_empty() {
            return 0.0;
        }

        let gc_count = lower.chars().filter(|&c| c == 'g' || c == 'c').count();
        round_to(gc_count as f64 / lower.chars().count() as f64, 2)
    }

    /// Checks every residue against the IUPAC alphabet of `sequence_type`.
    pub fn validate(&self, sequence_type: SequenceType) -> SequenceResult<()> {
        match self.data.chars().find(|&c| !sequence_type.accepts(c)) {
            Some(residue) => Err(SequenceError::AlphabetViolation {
                description: self.description.clone(),
                residue,
                alphabet: sequence_type,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

/// A sequence on its way into an alignment.
///
/// Each variant states which derived fields are computed when it is added.
#[derive(Debug, Clone)]
pub enum NewSequence {
    /// Stored as is.
    Existing(Sequence),
    /// Built from scratch; taxon and identifier are both derived.
    Fields { description: String, data: String },
    /// The description is replaced and only the taxon is derived again.
    DescriptionOverride { sequence: Sequence, description: String },
    /// The data is replaced and only the identifier is derived again.
    DataOverride { sequence: Sequence, data: String },
}

impl NewSequence {
    fn into_sequence(self) -> SequenceResult<Sequence> {
        match self {
            NewSequence::Existing(sequence) => Ok(sequence),
            NewSequence::Fields { description, data } => Sequence::new(description, data),
            NewSequence::DescriptionOverride {
                mut sequence,
                description,
            } => {
                let (taxon, _) = derive_fields(&description)?;
                sequence.taxon = taxon;
                sequence.description = description;
                Ok(sequence)
            }
            NewSequence::DataOverride { mut sequence, data } => {
                let (_, identifier) = derive_fields(&sequence.description)?;
                sequence.identifier = identifier;
                sequence.set_data(data);
                Ok(sequence)
            }
        }
    }
}

impl From<Sequence> for NewSequence {
    fn from(sequence: Sequence) -> Self {
        NewSequence::Existing(sequence)
    }
}

/// Represents an alignment of multiple sequences read from, or written to, one file.
///
/// Sequences keep their insertion order. Nothing here assumes the sequences
/// share a length; use [`Alignment::is_aligned`] before treating the first
/// sequence's length as the column count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alignment {
    /// Path of the file this alignment belongs to
    pub filename: String,
    /// File extension, without the leading dot
    pub extension: Option<String>,
    /// All sequences in the alignment
    pub sequences: Vec<Sequence>,
}

impl Alignment {
    /// Creates an empty alignment; the extension is taken from the filename.
    pub fn new(filename: impl Into<String>) -> Self {
        let filename = filename.into();
        let extension = Path::new(&filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_string);
        Self {
            filename,
            extension,
            sequences: Vec::new(),
        }
    }

    /// Creates an alignment holding the given sequences.
    pub fn from_sequences(filename: impl Into<String>, sequences: Vec<Sequence>) -> Self {
        Self {
            sequences,
            ..Self::new(filename)
        }
    }

    /// Appends a sequence and returns the stored record.
    pub fn add(&mut self, new: impl Into<NewSequence>) -> SequenceResult<&Sequence> {
        let sequence = new.into().into_sequence()?;
        let index = self.sequences.len();
        self.sequences.push(sequence);
        Ok(&self.sequences[index])
    }

    /// First sequence whose description matches exactly.
    pub fn find(&self, description: &str) -> Option<&Sequence> {
        self.sequences.iter().find(|s| s.description == description)
    }

    /// Taxa of all sequences, in insertion order.
    pub fn taxa(&self) -> impl Iterator<Item = &str> + '_ {
        self.sequences.iter().map(Sequence::taxon)
    }

    /// Identifiers of all sequences, in insertion order.
    pub fn identifiers(&self) -> impl Iterator<Item = &str> + '_ {
        self.sequences.iter().map(Sequence::identifier)
    }

    /// Descriptions of all sequences, in insertion order.
    pub fn descriptions(&self) -> impl Iterator<Item = &str> + '_ {
        self.sequences.iter().map(Sequence::description)
    }

    /// Returns the number of sequences.
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Returns true if the alignment holds no sequences.
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Gets a sequence by index.
    pub fn get(&self, index: usize) -> Option<&Sequence> {
        self.sequences.get(index)
    }

    /// Returns true if every sequence has the same raw length.
    pub fn is_aligned(&self) -> bool {
        match self.sequences.first() {
            Some(first) => self.sequences.iter().all(|s| s.len() == first.len()),
            None => true,
        }
    }

    /// The sequence type implied by the extension, or else by the residues.
    pub fn sequence_type(&self) -> SequenceType {
        if let Some(seq_type) = self.extension.as_deref().and_then(SequenceType::from_extension) {
            return seq_type;
        }
        let any_protein = self
            .sequences
            .iter()
            .any(|s| SequenceType::detect(s.data()) == SequenceType::AminoAcid);
        if any_protein {
            SequenceType::AminoAcid
        } else {
            SequenceType::Nucleotide
        }
    }

    /// Validates every sequence, stopping at the first violation.
    ///
    /// Without an explicit type, the one from [`Alignment::sequence_type`] is used.
    pub fn validate(&self, sequence_type: Option<SequenceType>) -> SequenceResult<()> {
        let sequence_type = sequence_type.unwrap_or_else(|| self.sequence_type());
        self.sequences.iter().try_for_each(|s| s.validate(sequence_type))
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_creation() {
        let seq = Sequence::new("Homo_sapiens|ENSG01", "ACGT").unwrap();
        assert_eq!(seq.description(), "Homo_sapiens|ENSG01");
        assert_eq!(seq.data(), "ACGT");
        assert_eq!(seq.taxon(), "Homo_sapiens");
        assert_eq!(seq.identifier(), "ENSG01");
        assert_eq!(seq.len(), 4);
        assert!(!seq.is_alignment());
    }

    #[test]
    fn test_split_on_either_delimiter() {
        assert_eq!(split_description("sp1|id1").unwrap(), ("sp1", "id1"));
        assert_eq!(split_description("sp1@id1").unwrap(), ("sp1", "id1"));
        assert_eq!(split_description("sp1@id1|rest").unwrap(), ("sp1", "id1"));
        assert_eq!(split_description("sp1|id1@rest|more").unwrap(), ("sp1", "id1"));
        assert_eq!(split_description("sp1|").unwrap(), ("sp1", ""));
    }

    #[test]
    fn test_malformed_description() {
        let result = Sequence::new("no_delimiter_here", "ACGT");
        assert_eq!(
            result,
            Err(SequenceError::MalformedDescription("no_delimiter_here".to_string()))
        );
    }

    #[test]
    fn test_unlabelled_then_described() {
        let mut seq = Sequence::unlabelled("AC-T");
        assert_eq!(seq.taxon(), "");
        assert!(seq.is_alignment());

        seq.set_description("Mus@42").unwrap();
        assert_eq!(seq.taxon(), "Mus");
        assert_eq!(seq.identifier(), "42");
    }

    #[test]
    fn test_failed_set_description_keeps_fields() {
        let mut seq = Sequence::new("Mus|1", "ACGT").unwrap();
        assert!(seq.set_description("broken").is_err());
        assert_eq!(seq.description(), "Mus|1");
        assert_eq!(seq.taxon(), "Mus");
    }

    #[test]
    fn test_is_alignment_override() {
        let mut seq = Sequence::new("a|1", "ACGT").unwrap();
        assert!(!seq.is_alignment());
        seq.set_is_alignment(true);
        assert!(seq.is_alignment());

        let gapped = Sequence::new("a|2", "AC-GT").unwrap();
        assert!(gapped.is_alignment());
    }

    #[test]
    fn test_ungapped() {
        let seq = Sequence::new("a|1", "-AC--GT-").unwrap();
        let ungapped = seq.ungapped();
        assert_eq!(ungapped, "ACGT");
        assert!(!ungapped.contains('-'));
        assert_eq!(seq.ungapped_len(), 4);

        let again = Sequence::unlabelled(ungapped.clone());
        assert_eq!(again.ungapped(), ungapped);
    }

    #[test]
    fn test_count() {
        let seq = Sequence::new("a|1", "AACGA-").unwrap();
        assert_eq!(seq.count('A'), 3);
        assert_eq!(seq.count('-'), 1);
        assert_eq!(seq.count('T'), 0);
    }

    #[test]
    fn test_gc_content() {
        let seq = Sequence::new("a|1", "GGCCAATT").unwrap();
        assert_eq!(seq.gc_content(), 0.5);

        let seq = Sequence::new("a|1", "GCA").unwrap();
        assert_eq!(seq.gc_content(), 0.67);

        let lower = Sequence::new("a|1", "ggcaaattt").unwrap();
        let upper = Sequence::new("a|1", "GGCAAATTT").unwrap();
        assert_eq!(lower.gc_content(), upper.gc_content());
        assert!((0.0..=1.0).contains(&lower.gc_content()));
    }

    #[test]
    fn test_gc_content_uses_raw_length() {
        let seq = Sequence::new("a|1", "GC--").unwrap();
        assert_eq!(seq.gc_content(), 0.5);
    }

    #[test]
    fn test_gc_content_with_ambiguous_residues() {
        let seq = Sequence::new("a|1", "GCNN").unwrap();
        assert_eq!(seq.gc_content(), 0.5);

        let mixed = Sequence::new("a|1", "gC-nA-tG").unwrap();
        assert_eq!(mixed.gc_content(), 0.38);
    }

    #[test]
    fn test_lengths_count_characters() {
        let seq = Sequence::new("a|1", "ÄC-").unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.ungapped_len(), 2);
        assert_eq!(seq.ungapped_len(), seq.ungapped().chars().count());
    }

    #[test]
    fn test_gc_content_empty() {
        let seq = Sequence::new("a|1", "").unwrap();
        assert_eq!(seq.gc_content(), 0.0);
    }

    #[test]
    fn test_validate() {
        let dna = Sequence::new("a|1", "ACGTNRY-acgt").unwrap();
        assert!(dna.validate(SequenceType::Nucleotide).is_ok());

        let protein = Sequence::new("a|2", "EMKVL*").unwrap();
        assert!(protein.validate(SequenceType::AminoAcid).is_ok());
        match protein.validate(SequenceType::Nucleotide) {
            Err(SequenceError::AlphabetViolation { description, residue, .. }) => {
                assert_eq!(description, "a|2");
                assert_eq!(residue, 'E');
            }
            other => panic!("expected an alphabet violation, got {:?}", other),
        }
    }

    #[test]
    fn test_add_from_fields() {
        let mut alignment = Alignment::new("og1.fa");
        let seq = alignment
            .add(NewSequence::Fields {
                description: "sp1|id1".to_string(),
                data: "ACGT-".to_string(),
            })
            .unwrap();
        assert_eq!(seq.taxon(), "sp1");
        assert_eq!(seq.identifier(), "id1");
        assert_eq!(alignment.len(), 1);
    }

    #[test]
    fn test_add_existing() {
        let mut alignment = Alignment::new("og1.fa");
        let seq = Sequence::new("sp1|id1", "ACGT").unwrap();
        let stored = alignment.add(seq.clone()).unwrap();
        assert_eq!(stored, &seq);
    }

    #[test]
    fn test_add_description_override_derives_taxon_only() {
        let mut alignment = Alignment::new("og1.fa");
        let seq = Sequence::new("sp1|id1", "ACGT").unwrap();
        let stored = alignment
            .add(NewSequence::DescriptionOverride {
                sequence: seq,
                description: "sp2|id2".to_string(),
            })
            .unwrap();
        assert_eq!(stored.description(), "sp2|id2");
        assert_eq!(stored.taxon(), "sp2");
        assert_eq!(stored.identifier(), "id1");
    }

    #[test]
    fn test_add_data_override_derives_identifier_only() {
        let mut alignment = Alignment::new("og1.fa");
        let mut seq = Sequence::new("sp1|id1", "ACGT").unwrap();
        seq.set_is_alignment(true);
        let stored = alignment
            .add(NewSequence::DataOverride {
                sequence: seq,
                data: "AC-T".to_string(),
            })
            .unwrap();
        assert_eq!(stored.data(), "AC-T");
        assert_eq!(stored.taxon(), "sp1");
        assert_eq!(stored.identifier(), "id1");
        assert!(stored.is_alignment());
    }

    #[test]
    fn test_add_malformed_leaves_alignment_unchanged() {
        let mut alignment = Alignment::new("og1.fa");
        let result = alignment.add(NewSequence::Fields {
            description: "nodelimiter".to_string(),
            data: "ACGT".to_string(),
        });
        assert!(result.is_err());
        assert!(alignment.is_empty());
    }

    #[test]
    fn test_find() {
        let mut alignment = Alignment::new("og1.fa");
        alignment.add(Sequence::new("sp1|id1", "AC").unwrap()).unwrap();
        alignment.add(Sequence::new("sp2|id2", "GT").unwrap()).unwrap();

        assert_eq!(alignment.find("sp2|id2").map(Sequence::data), Some("GT"));
        assert!(alignment.find("sp3|id3").is_none());
    }

    #[test]
    fn test_field_iterators_are_restartable() {
        let alignment = Alignment::from_sequences(
            "og1.fa",
            vec![
                Sequence::new("sp1|id1", "AC").unwrap(),
                Sequence::new("sp2@id2", "GT").unwrap(),
                Sequence::new("sp1|id3", "GG").unwrap(),
            ],
        );

        let taxa: Vec<&str> = alignment.taxa().collect();
        assert_eq!(taxa, vec!["sp1", "sp2", "sp1"]);
        assert_eq!(alignment.taxa().count(), 3);

        let ids: Vec<&str> = alignment.identifiers().collect();
        assert_eq!(ids, vec!["id1", "id2", "id3"]);

        let descriptions: Vec<&str> = alignment.descriptions().collect();
        assert_eq!(descriptions, vec!["sp1|id1", "sp2@id2", "sp1|id3"]);
    }

    #[test]
    fn test_alignment_extension_and_display() {
        let alignment = Alignment::new("out/og1.faa");
        assert_eq!(alignment.extension.as_deref(), Some("faa"));
        assert_eq!(alignment.to_string(), "out/og1.faa");
        assert_eq!(alignment.sequence_type(), SequenceType::AminoAcid);

        let no_ext = Alignment::new("og1");
        assert_eq!(no_ext.extension, None);
    }

    #[test]
    fn test_is_aligned() {
        let aligned = Alignment::from_sequences(
            "a.fa",
            vec![
                Sequence::new("a|1", "AC-T").unwrap(),
                Sequence::new("b|1", "ACGT").unwrap(),
            ],
        );
        assert!(aligned.is_aligned());

        let ragged = Alignment::from_sequences(
            "b.fa",
            vec![
                Sequence::new("a|1", "ACGT").unwrap(),
                Sequence::new("b|1", "AC").unwrap(),
            ],
        );
        assert!(!ragged.is_aligned());
        assert!(Alignment::new("c.fa").is_aligned());
    }

    #[test]
    fn test_alignment_validate() {
        let alignment = Alignment::from_sequences(
            "a.fa",
            vec![
                Sequence::new("a|1", "ACGT").unwrap(),
                Sequence::new("b|1", "MKLE").unwrap(),
            ],
        );
        assert_eq!(alignment.sequence_type(), SequenceType::AminoAcid);
        assert!(alignment.validate(None).is_ok());
        assert!(alignment.validate(Some(SequenceType::Nucleotide)).is_err());
    }
}
