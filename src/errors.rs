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

//! Error type shared by the coordinate engine, the parsers and the printers.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A line did not match the record expected in the current parser state.
    #[error("Malformed {record} record on line {line}: {reason}")]
    MalformedRecord {
        line: usize,
        record: String,
        reason: String,
    },

    /// Coordinate translation was given a position outside the source frame.
    #[error("Position {position} is out of range in the {frame} frame")]
    OutOfRange {
        position: i64,
        frame: String,
    },

    /// Quality vector that does not cover every consensus column.
    #[error("Contig \"{contig}\" has {scores} quality scores for {columns} columns")]
    QualityLength {
        contig: String,
        scores: usize,
        columns: usize,
    },

    #[error("Read \"{0}\" is not registered")]
    UnknownRead(String),

    #[error("Contig \"{0}\" is not registered")]
    UnknownContig(String),

    #[error("Read \"{0}\" is already registered")]
    DuplicateRead(String),

    /// TIGR key that has no setter.
    #[error("Unrecognized field \"{field}\" on line {line}")]
    UnrecognizedField {
        line: usize,
        field: String,
    },

    #[error("Error reading or writing bytes: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn malformed(line: usize, record: &str, reason: impl Into<String>) -> Self {
        Error::MalformedRecord { line, record: record.to_string(), reason: reason.into() }
    }
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn malformed_record_message() {
        use super::Error;

        let err = Error::malformed(12, "CO", "expected 6 fields");
        let msg = format!("{}", err);

        assert!(msg.contains("CO"));
        assert!(msg.contains("line 12"));
        assert!(msg.contains("expected 6 fields"));
    }

    #[test]
    fn out_of_range_message() {
        use super::Error;

        let err = Error::OutOfRange { position: 0, frame: "gapped consensus".to_string() };

        assert_eq!(format!("{}", err), "Position 0 is out of range in the gapped consensus frame");
    }

    #[test]
    fn io_error_converts() {
        use super::Error;

        let err: Error = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof").into();

        assert!(matches!(err, Error::Io(_)));
    }
}
