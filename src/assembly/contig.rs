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
use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::assembly::tag::BASE_SEGMENT;
use crate::assembly::Anchor;
use crate::assembly::Location;
use crate::assembly::Seq;
use crate::assembly::Tag;
use crate::assembly::TagStore;
use crate::coords::Frame;
use crate::coords::GapMap;
use crate::errors::Error;
use crate::errors::Result;

/// A read together with its anchor interval in gapped consensus coordinates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedRead {
    pub read: Seq,
    pub anchor: Location,
}

/// Consensus plus aligned reads and their tags.
///
/// The gap map used for ungapped consensus translation is built on first use
/// and dropped whenever the consensus is replaced.
#[derive(Clone, Debug)]
pub struct Contig {
    id: String,
    consensus: Seq,
    quality: Option<Vec<u8>>,
    reads: IndexMap<String, PlacedRead>,
    tags: TagStore,
    left_padding: i64,
    gap_map: OnceLock<GapMap>,
}

impl Contig {
    pub fn new(
        id: &str,
        consensus: Seq,
    ) -> Self {
        Contig {
            id: id.to_string(),
            consensus,
            quality: None,
            reads: IndexMap::new(),
            tags: TagStore::default(),
            left_padding: 0,
            gap_map: OnceLock::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn consensus(&self) -> &Seq {
        &self.consensus
    }

    /// Replace the consensus and invalidate the cached gap map.
    ///
    /// Stored quality is dropped if it no longer covers every column.
    pub fn set_consensus(
        &mut self,
        consensus: Seq,
    ) {
        if self.quality.as_ref().is_some_and(|x| x.len() != consensus.len()) {
            self.quality = None;
        }
        self.consensus = consensus;
        self.gap_map = OnceLock::new();
    }

    pub fn ungapped_consensus(&self) -> String {
        self.consensus.ungapped()
    }

    /// Consensus quality, one score per gapped position.
    pub fn quality(&self) -> Option<&[u8]> {
        self.quality.as_deref()
    }

    /// Store consensus quality, one score per gapped column.
    ///
    /// ## Errors
    ///
    /// [Error::QualityLength] if `quality` does not match the consensus length.
    pub fn set_quality(
        &mut self,
        quality: Option<Vec<u8>>,
    ) -> Result<()> {
        if let Some(scores) = &quality {
            if scores.len() != self.consensus.len() {
                return Err(Error::QualityLength { contig: self.id.clone(), scores: scores.len(), columns: self.consensus.len() })
            }
        }
        self.quality = quality;
        Ok(())
    }

    /// Consensus quality with `default` filled in when none was stored.
    pub fn quality_or(
        &self,
        default: u8,
    ) -> Vec<u8> {
        match &self.quality {
            Some(quality) => quality.clone(),
            None => vec![default; self.consensus.len()],
        }
    }

    /// Number of gap columns added to the left of the consensus when the
    /// contig was re-framed (454 style ACE input).
    pub fn left_padding(&self) -> i64 {
        self.left_padding
    }

    /// Register `read` at `anchor`.
    ///
    /// The anchor must span exactly as many columns as the read has
    /// characters, since aligned positions map linearly onto it.
    pub fn add_read(
        &mut self,
        read: Seq,
        anchor: Location,
    ) -> Result<()> {
        if self.reads.contains_key(read.id()) {
            return Err(Error::DuplicateRead(read.id().to_string()))
        }
        if anchor.len() != read.len() {
            return Err(Error::OutOfRange { position: anchor.end, frame: Frame::Aligned(read.id().to_string()).to_string() })
        }
        self.reads.insert(read.id().to_string(), PlacedRead { read, anchor });
        Ok(())
    }

    pub fn read(
        &self,
        id: &str,
    ) -> Result<&PlacedRead> {
        self.reads.get(id).ok_or_else(|| Error::UnknownRead(id.to_string()))
    }

    pub fn has_read(
        &self,
        id: &str,
    ) -> bool {
        self.reads.contains_key(id)
    }

    /// Reads in insertion order.
    pub fn reads(&self) -> impl Iterator<Item = &PlacedRead> {
        self.reads.values()
    }

    pub fn n_reads(&self) -> usize {
        self.reads.len()
    }

    /// Append a tag. Locations must already be in gapped consensus coordinates.
    ///
    /// Contig tags must lie within the consensus. Read tags are bounded by
    /// their read instead, which may overhang the consensus ends.
    pub fn add_tag(
        &mut self,
        tag: Tag,
    ) -> Result<()> {
        match &tag.anchor {
            Anchor::Read(id) => {
                if !self.reads.contains_key(id) {
                    return Err(Error::UnknownRead(id.to_string()))
                }
            },
            Anchor::Contig | Anchor::Assembly => {
                if let Some(location) = tag.location {
                    self.check_columns(location.start, location.end)?;
                }
            },
        }
        self.tags.add(tag);
        Ok(())
    }

    /// Check that `start..=end` are columns of the gapped consensus.
    pub fn check_columns(
        &self,
        start: i64,
        end: i64,
    ) -> Result<()> {
        let len = self.consensus.len() as i64;
        for position in [start, end] {
            if position < 1 || position > len {
                return Err(Error::OutOfRange { position, frame: Frame::GappedConsensus.to_string() })
            }
        }
        Ok(())
    }

    pub fn tags(&self) -> &[Tag] {
        self.tags.all()
    }

    /// Tags whose class starts with `prefix`, in insertion order.
    pub fn tags_by_class<'a>(
        &'a self,
        prefix: &'a str,
    ) -> impl Iterator<Item = &'a Tag> {
        self.tags.filter(move |tag| tag.class.starts_with(prefix))
    }

    /// Tags anchored to read `id`, in insertion order.
    pub fn read_tags<'a>(
        &'a self,
        id: &'a str,
    ) -> impl Iterator<Item = &'a Tag> {
        self.tags.filter(move |tag| tag.read_id() == Some(id))
    }

    /// First read tag of `class` for read `id`.
    pub fn read_tag<'a>(
        &'a self,
        id: &'a str,
        class: &str,
    ) -> Option<&'a Tag> {
        self.read_tags(id).find(|tag| tag.class == class)
    }

    /// Base segments sorted by ascending start.
    pub fn base_segments(&self) -> Vec<&Tag> {
        let mut segments: Vec<&Tag> = self.tags_by_class(BASE_SEGMENT).filter(|tag| tag.location.is_some()).collect();
        segments.sort_by_key(|tag| tag.location.map(|x| x.start));
        segments
    }

    pub fn gap_map(&self) -> &GapMap {
        self.gap_map.get_or_init(|| GapMap::new(self.consensus.bytes()))
    }

    /// Translate `position` between coordinate frames of this contig.
    pub fn translate(
        &self,
        from: &Frame,
        to: &Frame,
        position: i64,
    ) -> Result<i64> {
        crate::coords::translate(self, from, to, position)
    }

    /// Move every read anchor and located tag by `by` columns.
    pub(crate) fn shift(
        &mut self,
        by: i64,
    ) {
        if by == 0 {
            return
        }
        self.reads.values_mut().for_each(|placed| placed.anchor = placed.anchor.shifted(by));
        self.tags.all_mut().iter_mut().for_each(|tag| {
            tag.location = tag.location.map(|x| x.shifted(by));
        });
    }

    /// Pad the consensus with gap columns on both ends. Quality, if present,
    /// gets a zero score in every added column.
    pub(crate) fn pad_consensus(
        &mut self,
        left: usize,
        right: usize,
    ) {
        if left == 0 && right == 0 {
            return
        }
        let gap = crate::assembly::GAP as char;
        let mut padded = String::with_capacity(left + self.consensus.len() + right);
        padded.extend(std::iter::repeat(gap).take(left));
        padded.push_str(self.consensus.sequence());
        padded.extend(std::iter::repeat(gap).take(right));

        self.quality = self.quality.take().map(|quality| {
            let mut out = vec![0_u8; left];
            out.extend(quality);
            out.extend(std::iter::repeat(0_u8).take(right));
            out
        });
        let consensus = Seq::new(self.consensus.id(), &padded, self.consensus.start(), self.consensus.strand());
        self.set_consensus(consensus);
        self.left_padding += left as i64;
    }
}
