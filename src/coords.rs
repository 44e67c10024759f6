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

//! Translation between the coordinate frames of a contig.
//!
//! Three frames are supported, all 1-based:
//!   - [Frame::GappedConsensus]: columns of the consensus, gap symbols included.
//!   - [Frame::UngappedConsensus]: consensus residues numbered contiguously.
//!   - [Frame::Aligned]: positions in a read's stored (padded) sequence.
//!
//! Aligned position 1 is the lower bound of the read's anchor interval
//! regardless of strand, so read frames are a plain offset from the gapped
//! consensus. The ungapped frame goes through a [GapMap] built once from the
//! consensus and cached in the [Contig].
//!
//! A gap column has no residue of its own. Translating it to the ungapped
//! frame yields the next residue to its right, or the last residue for
//! trailing gap columns.
//!
//! ## Usage
//!
//! ```rust
//! use contigio::assembly::{Contig, Location, Seq, Strand};
//! use contigio::coords::Frame;
//!
//! let mut contig = Contig::new("c1", Seq::new("c1", "AC--GT", 1, Strand::Forward));
//! contig.add_read(Seq::new("r1", "C--G", 1, Strand::Reverse), Location::new(2, 5, Strand::Reverse)).unwrap();
//!
//! let read = Frame::Aligned("r1".to_string());
//!
//! assert_eq!(contig.translate(&Frame::GappedConsensus, &Frame::UngappedConsensus, 5).unwrap(), 3);
//! assert_eq!(contig.translate(&Frame::UngappedConsensus, &Frame::GappedConsensus, 3).unwrap(), 5);
//! assert_eq!(contig.translate(&read, &Frame::GappedConsensus, 1).unwrap(), 2);
//! assert_eq!(contig.translate(&read, &Frame::UngappedConsensus, 4).unwrap(), 3);
//! ```
//!
use crate::assembly::Contig;
use crate::assembly::GAP;
use crate::errors::Error;
use crate::errors::Result;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Frame {
    GappedConsensus,
    UngappedConsensus,
    /// Local frame of the named read.
    Aligned(String),
}

impl std::fmt::Display for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Frame::GappedConsensus => write!(f, "gapped consensus"),
            Frame::UngappedConsensus => write!(f, "ungapped consensus"),
            Frame::Aligned(id) => write!(f, "aligned {}", id),
        }
    }
}

/// Monotonic maps between gapped and ungapped consensus positions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GapMap {
    // gapped column (0-based) -> ungapped position (1-based)
    to_ungapped: Vec<usize>,
    // ungapped position (0-based) -> gapped column (1-based)
    to_gapped: Vec<usize>,
}

impl GapMap {
    /// Build both directions with one forward and one backward scan.
    pub fn new(sequence: &[u8]) -> Self {
        let mut to_ungapped: Vec<usize> = vec![0; sequence.len()];
        let mut to_gapped: Vec<usize> = Vec::with_capacity(sequence.len());

        sequence.iter().enumerate().for_each(|(idx, base)| {
            if *base != GAP {
                to_gapped.push(idx + 1);
                to_ungapped[idx] = to_gapped.len();
            }
        });

        let mut next_residue = to_gapped.len();
        for idx in (0..sequence.len()).rev() {
            if sequence[idx] == GAP {
                to_ungapped[idx] = next_residue;
            } else {
                next_residue = to_ungapped[idx];
            }
        }

        GapMap { to_ungapped, to_gapped }
    }

    pub fn gapped_len(&self) -> usize {
        self.to_ungapped.len()
    }

    pub fn ungapped_len(&self) -> usize {
        self.to_gapped.len()
    }

    pub fn gap_count(&self) -> usize {
        self.gapped_len() - self.ungapped_len()
    }

    pub fn to_ungapped(
        &self,
        gapped: i64,
    ) -> Result<i64> {
        if gapped < 1 || gapped as usize > self.gapped_len() || self.ungapped_len() == 0 {
            return Err(Error::OutOfRange { position: gapped, frame: Frame::GappedConsensus.to_string() })
        }
        Ok(self.to_ungapped[gapped as usize - 1] as i64)
    }

    /// Last residue at or before `gapped`, for the right end of a range.
    ///
    /// Differs from [GapMap::to_ungapped] only on gap columns that have a
    /// residue to their right.
    pub fn last_residue_at(
        &self,
        gapped: i64,
    ) -> Result<i64> {
        let right = self.to_ungapped(gapped)?;
        if self.to_gapped(right)? <= gapped {
            return Ok(right)
        }
        if right == 1 {
            return Err(Error::OutOfRange { position: gapped, frame: Frame::GappedConsensus.to_string() })
        }
        Ok(right - 1)
    }

    pub fn to_gapped(
        &self,
        ungapped: i64,
    ) -> Result<i64> {
        if ungapped < 1 || ungapped as usize > self.ungapped_len() {
            return Err(Error::OutOfRange { position: ungapped, frame: Frame::UngappedConsensus.to_string() })
        }
        Ok(self.to_gapped[ungapped as usize - 1] as i64)
    }
}

/// Translate `position` from frame `from` to frame `to` on `contig`.
///
/// Read frames compose through the gapped consensus. When the target is a
/// read frame the gapped position must lie inside that read's anchor
/// interval, which also admits reads overhanging the consensus ends.
///
/// ## Errors
///
/// [Error::OutOfRange] if `position` is outside the source frame, or the
/// intermediate gapped position is outside the target frame.
///
/// From [Frame::GappedConsensus] to [Frame::Aligned] the source bounds are
/// not checked: the position only has to lie inside the read's anchor, so
/// `translate(contig, &Frame::GappedConsensus, &Frame::Aligned(id), 0)`
/// succeeds for a read overhanging the left end of the consensus.
///
/// [Error::UnknownRead] if either frame names a read the contig doesn't have.
///
pub fn translate(
    contig: &Contig,
    from: &Frame,
    to: &Frame,
    position: i64,
) -> Result<i64> {
    let gapped = match (from, to) {
        // Gapped positions addressed to a read are bounded by its anchor instead.
        (Frame::GappedConsensus, Frame::Aligned(_)) => position,
        _ => to_gapped(contig, from, position)?,
    };
    from_gapped(contig, to, gapped)
}

fn to_gapped(
    contig: &Contig,
    frame: &Frame,
    position: i64,
) -> Result<i64> {
    match frame {
        Frame::GappedConsensus => {
            if position < 1 || position as usize > contig.consensus().len() {
                return Err(Error::OutOfRange { position, frame: frame.to_string() })
            }
            Ok(position)
        },
        Frame::UngappedConsensus => contig.gap_map().to_gapped(position),
        Frame::Aligned(id) => {
            let placed = contig.read(id)?;
            if position < 1 || position as usize > placed.read.len() {
                return Err(Error::OutOfRange { position, frame: frame.to_string() })
            }
            Ok(placed.anchor.start + position - 1)
        },
    }
}

fn from_gapped(
    contig: &Contig,
    frame: &Frame,
    gapped: i64,
) -> Result<i64> {
    match frame {
        Frame::GappedConsensus => Ok(gapped),
        Frame::UngappedConsensus => contig.gap_map().to_ungapped(gapped),
        Frame::Aligned(id) => {
            let placed = contig.read(id)?;
            if !placed.anchor.contains(gapped) {
                return Err(Error::OutOfRange { position: gapped, frame: Frame::GappedConsensus.to_string() })
            }
            Ok(gapped - placed.anchor.start + 1)
        },
    }
}
