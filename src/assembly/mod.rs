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

//! In-memory assembly model.
//!
//! A [Scaffold] holds [assembly units](AssemblyUnit) in file order. Each unit
//! wraps a [Contig], which owns its consensus, its reads and the [tags](Tag)
//! anchored to them. All positions stored in the model are 1-based gapped
//! consensus coordinates; use [Contig::translate] to move between frames.
//!

pub mod contig;
pub mod seq;
pub mod tag;

pub use contig::Contig;
pub use contig::PlacedRead;
pub use seq::Seq;
pub use seq::GAP;
pub use tag::Anchor;
pub use tag::Tag;
pub use tag::TagStore;

use crate::errors::Result;

/// Orientation of a sequence relative to the consensus.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    /// +1 or -1.
    pub fn sign(&self) -> i8 {
        match self {
            Strand::Forward => 1,
            Strand::Reverse => -1,
        }
    }

    /// Parse the ACE orientation letter (`U` uncomplemented, `C` complemented).
    pub fn from_ace(letter: &str) -> Option<Strand> {
        match letter {
            "U" => Some(Strand::Forward),
            "C" => Some(Strand::Reverse),
            _ => None,
        }
    }

    pub fn ace_letter(&self) -> char {
        match self {
            Strand::Forward => 'U',
            Strand::Reverse => 'C',
        }
    }
}

/// Closed interval in gapped consensus coordinates.
///
/// `start <= end` always holds, the orientation is carried in `strand`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
}

impl Location {
    pub fn new(
        a: i64,
        b: i64,
        strand: Strand,
    ) -> Self {
        Location { start: a.min(b), end: a.max(b), strand }
    }

    pub fn len(&self) -> usize {
        (self.end - self.start + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn contains(&self, position: i64) -> bool {
        position >= self.start && position <= self.end
    }

    pub fn shifted(&self, by: i64) -> Self {
        Location { start: self.start + by, end: self.end + by, strand: self.strand }
    }
}

/// A contig or a singlet.
///
/// A singlet is a contig with a single read whose sequence doubles as the
/// consensus. Both variants share the [Contig] machinery.
#[derive(Clone, Debug)]
pub enum AssemblyUnit {
    Contig(Contig),
    Singlet(Contig),
}

impl AssemblyUnit {
    /// Build a singlet from `read`.
    ///
    /// The consensus is a copy of the read sequence and the read is anchored
    /// at `[1, read.len()]` on the read's strand.
    pub fn singlet(
        id: &str,
        read: Seq,
    ) -> Result<Self> {
        let consensus = Seq::new(id, read.sequence(), 1, Strand::Forward);
        let anchor = Location::new(1, read.len() as i64, read.strand());
        let mut contig = Contig::new(id, consensus);
        contig.add_read(read, anchor)?;
        Ok(AssemblyUnit::Singlet(contig))
    }

    pub fn contig(&self) -> &Contig {
        match self {
            AssemblyUnit::Contig(contig) => contig,
            AssemblyUnit::Singlet(contig) => contig,
        }
    }

    pub fn contig_mut(&mut self) -> &mut Contig {
        match self {
            AssemblyUnit::Contig(contig) => contig,
            AssemblyUnit::Singlet(contig) => contig,
        }
    }

    pub fn id(&self) -> &str {
        self.contig().id()
    }

    pub fn is_singlet(&self) -> bool {
        matches!(self, AssemblyUnit::Singlet(_))
    }
}

/// Ordered collection of contigs and singlets plus assembly-level tags.
#[derive(Clone, Debug, Default)]
pub struct Scaffold {
    units: Vec<AssemblyUnit>,
    tags: TagStore,
}

impl Scaffold {
    pub fn new() -> Self {
        Scaffold::default()
    }

    pub fn push(
        &mut self,
        unit: AssemblyUnit,
    ) {
        self.units.push(unit);
    }

    /// All units in file order.
    pub fn units(&self) -> &[AssemblyUnit] {
        &self.units
    }

    pub fn contigs(&self) -> impl Iterator<Item = &Contig> {
        self.units.iter().filter_map(|unit| match unit {
            AssemblyUnit::Contig(contig) => Some(contig),
            AssemblyUnit::Singlet(_) => None,
        })
    }

    pub fn singlets(&self) -> impl Iterator<Item = &Contig> {
        self.units.iter().filter_map(|unit| match unit {
            AssemblyUnit::Singlet(contig) => Some(contig),
            AssemblyUnit::Contig(_) => None,
        })
    }

    pub fn unit(
        &self,
        id: &str,
    ) -> Option<&AssemblyUnit> {
        self.units.iter().find(|unit| unit.id() == id)
    }

    pub fn unit_mut(
        &mut self,
        id: &str,
    ) -> Option<&mut AssemblyUnit> {
        self.units.iter_mut().find(|unit| unit.id() == id)
    }

    pub(crate) fn units_mut(&mut self) -> &mut [AssemblyUnit] {
        &mut self.units
    }

    /// Append a whole-assembly tag. These carry no location.
    pub fn add_tag(
        &mut self,
        tag: Tag,
    ) {
        self.tags.add(tag);
    }

    pub fn tags(&self) -> &[Tag] {
        self.tags.all()
    }

    pub fn read_count(&self) -> usize {
        self.units.iter().map(|unit| unit.contig().n_reads()).sum()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

// Tests
#[cfg(test)]
mod tests {

    #[test]
    fn location_normalizes_bounds() {
        use super::{Location, Strand};

        let got = Location::new(10, 3, Strand::Reverse);

        assert_eq!(got.start, 3);
        assert_eq!(got.end, 10);
        assert_eq!(got.len(), 8);
        assert!(got.contains(3));
        assert!(!got.contains(11));
    }

    #[test]
    fn singlet_consensus_is_read() {
        use super::{AssemblyUnit, Seq, Strand};

        let read = Seq::new("r1", "ACG-T", 1, Strand::Reverse);
        let unit = AssemblyUnit::singlet("s1", read).unwrap();

        assert!(unit.is_singlet());
        assert_eq!(unit.contig().consensus().sequence(), "ACG-T");
        let placed = unit.contig().read("r1").unwrap();
        assert_eq!(placed.anchor.start, 1);
        assert_eq!(placed.anchor.end, 5);
        assert_eq!(placed.anchor.strand, Strand::Reverse);
    }

    #[test]
    fn scaffold_views_keep_file_order() {
        use super::{AssemblyUnit, Contig, Scaffold, Seq, Strand};

        let mut scaffold = Scaffold::new();
        scaffold.push(AssemblyUnit::singlet("s1", Seq::new("r1", "ACGT", 1, Strand::Forward)).unwrap());
        scaffold.push(AssemblyUnit::Contig(Contig::new("c1", Seq::new("c1", "AC", 1, Strand::Forward))));
        scaffold.push(AssemblyUnit::singlet("s2", Seq::new("r2", "GG", 1, Strand::Forward)).unwrap());

        let singlets: Vec<&str> = scaffold.singlets().map(|c| c.id()).collect();
        let contigs: Vec<&str> = scaffold.contigs().map(|c| c.id()).collect();

        assert_eq!(singlets, vec!["s1", "s2"]);
        assert_eq!(contigs, vec!["c1"]);
        assert_eq!(scaffold.read_count(), 2);
        assert!(scaffold.unit("c1").is_some());
        assert!(scaffold.unit("c2").is_none());
    }

    #[test]
    fn ace_letters() {
        use super::Strand;

        assert_eq!(Strand::from_ace("U"), Some(Strand::Forward));
        assert_eq!(Strand::from_ace("C"), Some(Strand::Reverse));
        assert_eq!(Strand::from_ace("X"), None);
        assert_eq!(Strand::Reverse.ace_letter(), 'C');
        assert_eq!(Strand::Reverse.sign(), -1);
    }
}
