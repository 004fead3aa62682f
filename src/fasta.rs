//! FASTA reading and writing.
//!
//! This module handles reading FASTA alignments into the data model and
//! writing pruned alignments back out. It supports both single-line and
//! multi-line sequences.
//!
//! ## FASTA Format
//!
//! ```text
//! >Homo_sapiens@ENSG0001
//! ACGTACGT--ACGT...
//! >Mus_musculus|ENSMUSG0001
//! ACGTAC-TTACGT...
//! ```
//!
//! The whole header line after `>` is kept as the description, so every
//! header must carry a taxon and an identifier separated by `|` or `@`.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use thiserror::Error;

use crate::model::{Alignment, NewSequence, SequenceError};

/// Residues per line when writing.
pub const LINE_WIDTH: usize = 60;

/// Errors that can occur during FASTA parsing.
#[derive(Error, Debug)]
pub enum FastaError {
    #[error("Failed to open file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Empty FASTA file")]
    EmptyFile,

    #[error("Invalid FASTA format: {0}")]
    InvalidFormat(String),

    #[error("Sequence without header at line {0}")]
    SequenceWithoutHeader(usize),

    #[error("Invalid header at line {line}: {source}")]
    InvalidHeader {
        line: usize,
        #[source]
        source: SequenceError,
    },
}

/// Result type for FASTA operations.
pub type FastaResult<T> = Result<T, FastaError>;

/// Parses a FASTA file and returns an Alignment named after the file.
///
/// # Examples
///
/// ```no_run
/// use ppp_report::fasta::parse_fasta_file;
///
/// let alignment = parse_fasta_file("orthologs/og1.fa").unwrap();
/// println!("Loaded {} sequences", alignment.len());
/// ```
pub fn parse_fasta_file<P: AsRef<Path>>(path: P) -> FastaResult<Alignment> {
    let file = File::open(&path)?;
    let reader = BufReader::new(file);
    let parsed = parse_fasta(reader)?;
    Ok(Alignment::from_sequences(
        path.as_ref().display().to_string(),
        parsed.sequences,
    ))
}

/// Parses FASTA content from a reader.
///
/// The returned alignment has no filename.
pub fn parse_fasta<R: BufRead>(reader: R) -> FastaResult<Alignment> {
    let mut alignment = Alignment::default();
    // (header line number, description)
    let mut current: Option<(usize, String)> = None;
    let mut current_seq = String::new();
    let mut line_number = 0;

    for line_result in reader.lines() {
        line_number += 1;
        let line = line_result?;
        let line = line.trim();

        // Skip empty lines
        if line.is_empty() {
            continue;
        }

        if let Some(header) = line.strip_prefix('>') {
            // Save previous sequence if exists
            if let Some((header_line, description)) = current.take() {
                push_record(&mut alignment, header_line, description, std::mem::take(&mut current_seq))?;
            }

            let description = header.trim();
            if description.is_empty() {
                return Err(FastaError::InvalidFormat(format!(
                    "Empty sequence description at line {}",
                    line_number
                )));
            }

            current = Some((line_number, description.to_string()));
        } else {
            if current.is_none() {
                return Err(FastaError::SequenceWithoutHeader(line_number));
            }

            // Append sequence data (removing any whitespace)
            if line.bytes().all(|b| !b.is_ascii_whitespace()) {
                current_seq.push_str(line);
            } else {
                current_seq.extend(line.chars().filter(|c| !c.is_whitespace()));
            }
        }
    }

    // Don't forget the last sequence
    if let Some((header_line, description)) = current {
        push_record(&mut alignment, header_line, description, current_seq)?;
    }

    if alignment.is_empty() {
        return Err(FastaError::EmptyFile);
    }

    Ok(alignment)
}

fn push_record(
    alignment: &mut Alignment,
    line: usize,
    description: String,
    data: String,
) -> FastaResult<()> {
    alignment
        .add(NewSequence::Fields { description, data })
        .map_err(|source| FastaError::InvalidHeader { line, source })?;
    Ok(())
}

/// Parses FASTA content from a string.
///
/// Useful for testing or processing in-memory data.
pub fn parse_fasta_str(content: &str) -> FastaResult<Alignment> {
    parse_fasta(content.as_bytes())
}

/// Writes an alignment as FASTA, wrapping residues at [`LINE_WIDTH`].
pub fn write_fasta<W: Write>(mut writer: W, alignment: &Alignment) -> std::io::Result<()> {
    for seq in &alignment.sequences {
        writeln!(writer, ">{}", seq.description())?;
        let mut rest = seq.data();
        while !rest.is_empty() {
            let end = rest
                .char_indices()
                .nth(LINE_WIDTH)
                .map_or(rest.len(), |(index, _)| index);
            writeln!(writer, "{}", &rest[..end])?;
            rest = &rest[end..];
        }
    }
    writer.flush()
}

/// Writes an alignment to the file named by its `filename`.
pub fn write_fasta_file(alignment: &Alignment) -> FastaResult<()> {
    let file = File::create(&alignment.filename)?;
    write_fasta(BufWriter::new(file), alignment)?;
    Ok(())
}
