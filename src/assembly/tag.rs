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

//! Annotations attached to a scaffold, a contig or a read.
//!
//! Classes starting with `_` are reserved for information the codecs need to
//! reproduce a record (clipping ranges, base segments, descriptions, TIGR
//! metadata). Any other class is a user tag from an `RT`, `CT` or `WA` block.
//!
use indexmap::IndexMap;

use crate::assembly::Location;

pub const ALIGN_CLIPPING: &str = "_align_clipping";
pub const QUALITY_CLIPPING: &str = "_quality_clipping";
pub const BASE_SEGMENT: &str = "_base_segment";
pub const READ_DESC: &str = "_read_desc";
pub const TIGR_CONTIG: &str = "_tigr_contig";
pub const TIGR_READ: &str = "_tigr_read";

/// What a [Tag] hangs off.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Anchor {
    Assembly,
    Contig,
    Read(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub class: String,
    pub location: Option<Location>,
    pub anchor: Anchor,
    pub attributes: IndexMap<String, String>,
}

impl Tag {
    pub fn new(
        class: &str,
        anchor: Anchor,
    ) -> Self {
        Tag { class: class.to_string(), location: None, anchor, attributes: IndexMap::new() }
    }

    pub fn with_location(
        mut self,
        location: Location,
    ) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_attribute(
        mut self,
        key: &str,
        value: &str,
    ) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn attribute(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.attributes.get(key).map(|x| x.as_str())
    }

    pub fn is_reserved(&self) -> bool {
        self.class.starts_with('_')
    }

    /// Read id for read-anchored tags.
    pub fn read_id(&self) -> Option<&str> {
        match &self.anchor {
            Anchor::Read(id) => Some(id),
            _ => None,
        }
    }
}

/// Append-only tag collection, iterated in insertion order.
#[derive(Clone, Debug, Default)]
pub struct TagStore {
    tags: Vec<Tag>,
}

impl TagStore {
    pub fn add(
        &mut self,
        tag: Tag,
    ) {
        self.tags.push(tag);
    }

    pub fn all(&self) -> &[Tag] {
        &self.tags
    }

    pub fn filter<'a, P>(
        &'a self,
        predicate: P,
    ) -> impl Iterator<Item = &'a Tag>
    where
        P: Fn(&Tag) -> bool + 'a,
    {
        self.tags.iter().filter(move |tag| predicate(tag))
    }

    pub(crate) fn all_mut(&mut self) -> &mut [Tag] {
        &mut self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
