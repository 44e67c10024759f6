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

//! Printer for outputting a [Scaffold] as plain text in any supported [Format].
//!
//! Returns one assembly unit at a time using next(). The first call also
//! returns the file header and the call after the last unit returns the
//! footer, if the format has them.
//!
//! Both ACE flavours are written in the reference dialect.
//!
//! ## Usage
//!
//! ```rust
//! use contigio::{Config, Format};
//! use contigio::assembly::{AssemblyUnit, Scaffold, Seq, Strand};
//! use contigio::printer::Printer;
//! use std::io::Write;
//!
//! let mut scaffold = Scaffold::new();
//! scaffold.push(AssemblyUnit::singlet("s1", Seq::new("r1", "ACGT", 1, Strand::Forward)).unwrap());
//!
//! let config = Config::default();
//! let mut printer = Printer::new(&scaffold, &config, Format::Ace);
//!
//! let mut output: Vec<u8> = Vec::new();
//! for block in printer.by_ref() {
//!     output.write_all(&block.unwrap()).unwrap();
//! }
//!
//! let mut expected: Vec<u8> = Vec::new();
//! expected.append(&mut b"AS 1 1\n\n".to_vec());
//! expected.append(&mut b"CO s1 4 1 0 U\nACGT\n\nBQ\n 20 20 20 20\n\n".to_vec());
//! expected.append(&mut b"AF r1 U 1\n\n".to_vec());
//! expected.append(&mut b"RD r1 4 0 0\nACGT\n\nQA -1 -1 -1 -1\n\n".to_vec());
//!
//! assert_eq!(output, expected);
//! ```
//!
use std::io::Write;

use crate::Config;
use crate::Format;
use crate::assembly::Scaffold;
use crate::errors::Result;

use ace::format_ace_footer;
use ace::format_ace_header;
use ace::format_ace_unit;
use tigr::format_tigr_unit;

// Format specific implementations
pub mod ace;
pub mod tigr;

/// Write `bytes` as lines of at most `width` characters.
pub(crate) fn write_wrapped<W: Write>(
    bytes: &[u8],
    width: usize,
    conn: &mut W,
) -> Result<()> {
    for line in bytes.chunks(width.max(1)) {
        conn.write_all(line)?;
        conn.write_all(b"\n")?;
    }
    Ok(())
}

pub struct Printer<'a> {
    // Inputs
    scaffold: &'a Scaffold,
    config: Config,

    index: usize,
    footer_done: bool,
    pub format: Format,
}

impl<'a> Printer<'a> {
    pub fn new(
        scaffold: &'a Scaffold,
        config: &Config,
        format: Format,
    ) -> Self {
        Printer {
            scaffold,
            config: config.clone(),
            index: 0, footer_done: false,
            format,
        }
    }

    pub fn print_header(
        &self,
    ) -> Result<Option<Vec<u8>>> {
        let mut out: Vec<u8> = Vec::new();
        match self.format {
            Format::Ace | Format::Ace454 => {
                format_ace_header(self.scaffold.len(), self.scaffold.read_count(), &mut out)?;
                Ok(Some(out))
            },
            Format::Tigr => Ok(None),
        }
    }

    pub fn print_footer(
        &self,
    ) -> Result<Option<Vec<u8>>> {
        let mut out: Vec<u8> = Vec::new();
        match self.format {
            Format::Ace | Format::Ace454 => {
                format_ace_footer(self.scaffold, &mut out)?;
                Ok(if out.is_empty() { None } else { Some(out) })
            },
            Format::Tigr => Ok(None),
        }
    }

    fn print_unit(
        &self,
        index: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        let contig = self.scaffold.units()[index].contig();
        match self.format {
            Format::Ace | Format::Ace454 => format_ace_unit(contig, &self.config, out),
            Format::Tigr => format_tigr_unit(contig, &self.config, out),
        }
    }

    fn next_block(&mut self) -> Result<Option<Vec<u8>>> {
        let mut out: Vec<u8> = Vec::new();
        if self.index == 0 && !self.footer_done {
            if let Some(mut header) = self.print_header()? {
                out.append(&mut header);
            }
        }

        if self.index < self.scaffold.len() {
            self.print_unit(self.index, &mut out)?;
            self.index += 1;
            return Ok(Some(out))
        }

        if self.footer_done {
            return Ok(None)
        }
        self.footer_done = true;
        if let Some(mut footer) = self.print_footer()? {
            out.append(&mut footer);
        }
        Ok(if out.is_empty() { None } else { Some(out) })
    }
}

impl Iterator for Printer<'_> {
    type Item = Result<Vec<u8>>;

    fn next(
        &mut self,
    ) -> Option<Result<Vec<u8>>> {
        self.next_block().transpose()
    }
}
