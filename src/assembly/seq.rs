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
use crate::assembly::Strand;

/// Internal gap symbol. Codecs map their wire glyphs onto this.
pub const GAP: u8 = b'-';

/// A sequence with an identifier, a start offset and a strand.
///
/// Reads store their aligned (padded) sequence, the consensus stores the
/// gapped consensus.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Seq {
    id: String,
    sequence: String,
    start: i64,
    strand: Strand,
}

impl Seq {
    pub fn new(
        id: &str,
        sequence: &str,
        start: i64,
        strand: Strand,
    ) -> Self {
        Seq { id: id.to_string(), sequence: sequence.to_string(), start, strand }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn bytes(&self) -> &[u8] {
        self.sequence.as_bytes()
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Character at 1-based `position`, None if outside the sequence.
    pub fn base_at(
        &self,
        position: i64,
    ) -> Option<u8> {
        if position < 1 {
            return None
        }
        self.sequence.as_bytes().get(position as usize - 1).copied()
    }

    pub fn is_gap_at(
        &self,
        position: i64,
    ) -> bool {
        self.base_at(position) == Some(GAP)
    }

    /// Sequence with gap symbols removed.
    pub fn ungapped(&self) -> String {
        self.sequence.bytes().filter(|x| *x != GAP).map(|x| x as char).collect()
    }

    pub fn gap_count(&self) -> usize {
        self.sequence.bytes().filter(|x| *x == GAP).count()
    }
}
