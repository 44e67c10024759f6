// contigio: Conversion between ACE and TIGR assembly formats.
//
// Copyright 2025 Tommi Mäklin [tommi@maklin.fi].
//
// Copyrights in this project are retained by contributors. No copyright assignment
// is required to contribute to this project.
//
// Except as otherwise noted (below and/or in individual files), this
// project is licensed under the Apache License, Version 2.0
// <LICENSE-APACHE> or <http://www.apache.org/licenses/LICENSE-2.0> or
// the MIT license, <LICENSE-MIT> or <http://opensource.org/licenses/MIT>,
// at your option.
//

//! contigio is a library and a command-line client for:
//!
//!   - Reading genome assemblies (contigs, singlets, aligned reads and their tags) from plain text.
//!   - Writing assemblies back out in the same or another supported format.
//!   - Translating positions between the gapped consensus, the ungapped consensus and read coordinates.
//!
//! The following plain text formats are supported:
//!   - [ACE](http://www.phrap.org/consed/distributions/README.29.0.txt) as written by phrap and consed.
//!   - ACE as written by the Roche 454 assembler (input only, written back as reference ACE).
//!   - TIGR assembly (tasm) files.
//!
//! ## Usage
//!
//! ### Command line
//!
//! The contigio CLI supports the following subcommands:
//!   - `contigio convert` convert between supported formats.
//!   - `contigio stats` print per-contig summaries as tab separated values.
//!
//! ### Rust API
//!
//! The API provides several functions for operating on structs that implement
//! [Read] and/or [Write]. These are meant for use cases where an entire file
//! should be processed.
//!
//! For use cases requiring access to a single contig at a time, the following
//! structs are provided:
//!
//!   - [AceParser](parser::AceParser): takes a [Read] containing ACE records and returns one [AssemblyUnit](assembly::AssemblyUnit) at a time.
//!   - [TigrParser](parser::TigrParser): takes a [Read] containing tasm records and returns one [AssemblyUnit](assembly::AssemblyUnit) at a time.
//!   - [Printer](printer::Printer): takes a [Scaffold] and formats its units into plain text.
//!
//! Positions are stored in gapped consensus coordinates. See [coords] for
//! moving between coordinate frames.
//!
use std::io::Read;
use std::io::Seek;
use std::io::Write;

use assembly::Scaffold;
use errors::Result;

pub mod assembly;
pub mod coords;
pub mod errors;
pub mod parser;
pub mod printer;

pub use parser::guess_format;

/// Supported plain text formats.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Ace,
    Ace454,
    Tigr,
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ace" => Ok(Format::Ace),
            "ace454" => Ok(Format::Ace454),
            "tigr" => Ok(Format::Tigr),
            _ => Err(format!("'{}' is not a valid Format", s)),
        }
    }
}

/// Placement convention of an ACE file.
///
/// 454 files may place reads before the first consensus column or past its
/// end. These are re-framed on input so that every read lies inside the
/// consensus.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AceVariant {
    #[default]
    Standard,
    Roche454,
}

/// Options shared by the parsers and the printers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Characters (or quality scores) per line in ACE output.
    pub line_width: usize,
    /// Quality written for contigs that have no stored quality.
    pub default_quality: u8,
    pub variant: AceVariant,
}

impl Default for Config {
    fn default() -> Self {
        Config { line_width: 50, default_quality: 20, variant: AceVariant::Standard }
    }
}

/// Parse a whole file in `format` from something that implements [Read] and [Seek].
///
/// [Format::Ace454] overrides the variant in `config`.
///
/// ## Usage
///
/// ```rust
/// use contigio::{parse_from_read, Config, Format};
/// use std::io::Cursor;
///
/// let data = b"AS 1 2\n\nCO Contig1 6 2 2 U\nACG*TA\n\nBQ\n 30 30 30 30 30\n\nAF r1 U 1\nAF r2 C 3\nBS 1 3 r1\nBS 4 6 r2\n\nRD r1 4 0 0\nACG*\n\nQA 1 4 1 4\n\nRD r2 4 0 0\nG*TA\n\nQA 1 4 1 4\n\n";
/// let mut input = Cursor::new(data.to_vec());
///
/// let scaffold = parse_from_read(Format::Ace, &Config::default(), &mut input).unwrap();
/// let contig = scaffold.unit("Contig1").unwrap().contig();
///
/// assert_eq!(contig.ungapped_consensus(), "ACGTA");
/// assert_eq!(contig.read("r2").unwrap().anchor.start, 3);
/// ```
///
pub fn parse_from_read<R: Read + Seek>(
    format: Format,
    config: &Config,
    conn: &mut R,
) -> Result<Scaffold> {
    match format {
        Format::Ace => parser::parse_ace(config, conn),
        Format::Ace454 => {
            let config = Config { variant: AceVariant::Roche454, ..config.clone() };
            parser::parse_ace(&config, conn)
        },
        Format::Tigr => parser::parse_tigr(config, conn),
    }
}

/// Write `scaffold` in `format` to something that implements [Write].
///
/// ## Usage
///
/// ```rust
/// use contigio::{print_to_write, Config, Format};
/// use contigio::assembly::{AssemblyUnit, Scaffold, Seq, Strand};
///
/// let mut scaffold = Scaffold::new();
/// scaffold.push(AssemblyUnit::singlet("s1", Seq::new("r1", "AC-GT", 1, Strand::Forward)).unwrap());
///
/// let mut output: Vec<u8> = Vec::new();
/// print_to_write(Format::Tigr, &Config::default(), &scaffold, &mut output).unwrap();
/// let text = String::from_utf8(output).unwrap();
///
/// assert!(text.starts_with("sequence\tACGT\nlsequence\tAC-GT\n"));
/// assert!(text.contains("\nseq#\t1\n"));
/// ```
///
pub fn print_to_write<W: Write>(
    format: Format,
    config: &Config,
    scaffold: &Scaffold,
    conn: &mut W,
) -> Result<()> {
    let mut printer = printer::Printer::new(scaffold, config, format);
    for block in printer.by_ref() {
        conn.write_all(&block?)?;
    }
    conn.flush()?;
    log::info!("Wrote {} units with {} reads", scaffold.len(), scaffold.read_count());
    Ok(())
}

/// Convert between supported formats.
///
/// ## Usage
///
/// ```rust
/// use contigio::{convert_from_read_to_write, Config, Format};
/// use std::io::Cursor;
///
/// let data = b"sequence\tACGT\nlsequence\tAC-GT\nasmbl_id\t7\nseq#\t1\n\nseq_name\tr1\nasm_lend\t1\nasm_rend\t4\nlsequence\tAC-GT\n|\n";
/// let mut input = Cursor::new(data.to_vec());
/// let mut output: Vec<u8> = Vec::new();
///
/// convert_from_read_to_write(Format::Tigr, Format::Ace, &Config::default(), &mut input, &mut output).unwrap();
///
/// assert!(output.starts_with(b"AS 1 1\n\nCO 7 5 1 0 U\nAC*GT\n\nBQ\n 20 20 20 20\n\n"));
/// ```
///
pub fn convert_from_read_to_write<R: Read + Seek, W: Write>(
    in_format: Format,
    out_format: Format,
    config: &Config,
    conn_in: &mut R,
    conn_out: &mut W,
) -> Result<()> {
    let scaffold = parse_from_read(in_format, config, conn_in)?;
    print_to_write(out_format, config, &scaffold, conn_out)
}
