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

//! Parsers that turn plain text assembly records into [AssemblyUnit]s.
//!
//! Both parsers read one unit per call to `next_unit` (or per iteration) so
//! that large files can be streamed. [parse_ace] and [parse_tigr] collect a
//! whole input into a [Scaffold](crate::assembly::Scaffold).
//!

// Format specific implementations
pub mod ace;
pub mod tigr;

pub use ace::parse_ace;
pub use ace::AceParser;
pub use tigr::parse_tigr;
pub use tigr::TigrParser;

use crate::Format;
use crate::errors::Result;

use std::io::BufRead;
use std::io::BufReader;
use std::io::Read;

/// Line source with one line of pushback and 1-based line numbers.
pub(crate) struct LineReader<'a, R: Read> {
    reader: BufReader<&'a mut R>,
    pushed: Option<String>,
    line_no: usize,
}

impl<'a, R: Read> LineReader<'a, R> {
    pub(crate) fn new(conn: &'a mut R) -> Self {
        LineReader { reader: BufReader::new(conn), pushed: None, line_no: 0 }
    }

    /// Next line without its terminator, None at end of input.
    pub(crate) fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.pushed.take() {
            self.line_no += 1;
            return Ok(Some(line))
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(None)
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        self.line_no += 1;
        Ok(Some(line))
    }

    pub(crate) fn push_back(
        &mut self,
        line: String,
    ) {
        self.line_no -= 1;
        self.pushed = Some(line);
    }

    /// Number of the line returned last.
    pub(crate) fn line_no(&self) -> usize {
        self.line_no
    }

    /// Lines up to the next blank line or end of input. The blank line is consumed.
    pub(crate) fn read_body(&mut self) -> Result<Vec<String>> {
        let mut body: Vec<String> = Vec::new();
        while let Some(line) = self.next_line()? {
            if line.trim().is_empty() {
                break;
            }
            body.push(line);
        }
        Ok(body)
    }

    /// Lines up to a line equal to `terminator`, which is consumed.
    ///
    /// Returns None if the input ends first.
    pub(crate) fn read_until(
        &mut self,
        terminator: &str,
    ) -> Result<Option<Vec<String>>> {
        let mut body: Vec<String> = Vec::new();
        while let Some(line) = self.next_line()? {
            if line.trim_end() == terminator {
                return Ok(Some(body))
            }
            body.push(line);
        }
        Ok(None)
    }
}

/// Guess the format from the first non-empty line of `bytes`.
///
/// ACE files start with an `AS` or `CO` record, TIGR files with a tab
/// separated `key\tvalue` line. The 454 flavour of ACE can't be told apart
/// from the reference one by its first line, so [Format::Ace] is returned.
///
pub fn guess_format(
    bytes: &[u8],
) -> Option<Format> {
    let first_line = bytes
        .split(|x| *x == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .find(|line| !line.iter().all(|x| x.is_ascii_whitespace()))?;

    if first_line.starts_with(b"AS ") || first_line.starts_with(b"CO ") {
        return Some(Format::Ace)
    }

    let key = first_line.split(|x| *x == b'\t').next()?;
    if first_line.contains(&b'\t') && tigr::is_contig_field(&String::from_utf8_lossy(key)) {
        return Some(Format::Tigr)
    }

    None
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn guess_format_ace() {
        use crate::Format;
        use super::guess_format;

        let data: Vec<u8> = b"AS 1 2\n\nCO Contig1 10 2 1 U\n".to_vec();
        let got = guess_format(&data).unwrap();

        assert_eq!(got, Format::Ace);
    }

    #[test]
    fn guess_format_ace_without_header() {
        use crate::Format;
        use super::guess_format;

        let data: Vec<u8> = b"\nCO Contig1 10 2 1 U\n".to_vec();
        let got = guess_format(&data).unwrap();

        assert_eq!(got, Format::Ace);
    }

    #[test]
    fn guess_format_tigr() {
        use crate::Format;
        use super::guess_format;

        let data: Vec<u8> = b"sequence\tACGT\nlsequence\tAC-GT\n".to_vec();
        let got = guess_format(&data).unwrap();

        assert_eq!(got, Format::Tigr);
    }

    #[test]
    fn guess_format_unknown() {
        use super::guess_format;

        assert!(guess_format(b">seq1\nACGT\n").is_none());
        assert!(guess_format(b"").is_none());
    }

    #[test]
    fn line_reader_pushback() {
        use super::LineReader;
        use std::io::Cursor;

        let mut data = Cursor::new(b"CO a\r\nACGT\n\nBQ\n".to_vec());
        let mut lines = LineReader::new(&mut data);

        let first = lines.next_line().unwrap().unwrap();
        assert_eq!(first, "CO a");
        lines.push_back(first);
        assert_eq!(lines.line_no(), 0);
        assert_eq!(lines.next_line().unwrap().unwrap(), "CO a");
        assert_eq!(lines.read_body().unwrap(), vec!["ACGT".to_string()]);
        assert_eq!(lines.next_line().unwrap().unwrap(), "BQ");
        assert_eq!(lines.line_no(), 4);
        assert!(lines.next_line().unwrap().is_none());
    }
}
