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

//! Parser for [ACE](http://www.phrap.org/consed/distributions/README.29.0.txt) assembly files.
//!
//! The first pass ([AceParser]) walks the per-contig records (`CO`, `BQ`,
//! `AF`, `BS`, `RD`, `QA`, `DS`, `RT{}`) and returns one [AssemblyUnit] per
//! `CO` record. File level `WA{}` and `CT{}` blocks are skipped there and
//! picked up by [read_assembly_tags] in a second pass over the same input.
//!
//! ## Usage
//!
//! ```rust
//! use contigio::Config;
//! use contigio::parser::parse_ace;
//! use std::io::Cursor;
//!
//! let mut input = Cursor::new(b"AS 1 1\n\nCO Contig1 5 1 1 U\nAC*GT\n\nBQ\n 20 20 30 30\n\nAF r1 U 1\nBS 1 5 r1\n\nRD r1 5 0 0\nAC*GT\n\nQA 1 5 1 5\n".to_vec());
//! let scaffold = parse_ace(&Config::default(), &mut input).unwrap();
//!
//! let singlet = scaffold.singlets().next().unwrap();
//! assert_eq!(singlet.consensus().sequence(), "AC-GT");
//! assert_eq!(singlet.quality().unwrap(), &[20, 20, 25, 30, 30]);
//! ```
//!
use std::collections::HashMap;
use std::io::Read;
use std::io::Seek;
use std::sync::OnceLock;

use regex::Regex;

use crate::AceVariant;
use crate::Config;
use crate::assembly::tag::ALIGN_CLIPPING;
use crate::assembly::tag::BASE_SEGMENT;
use crate::assembly::tag::QUALITY_CLIPPING;
use crate::assembly::tag::READ_DESC;
use crate::assembly::Anchor;
use crate::assembly::AssemblyUnit;
use crate::assembly::Contig;
use crate::assembly::Location;
use crate::assembly::Scaffold;
use crate::assembly::Seq;
use crate::assembly::Strand;
use crate::assembly::Tag;
use crate::assembly::GAP;
use crate::coords::Frame;
use crate::errors::Error;
use crate::errors::Result;
use crate::parser::LineReader;

/// Gap glyph used in ACE files.
pub const ACE_GAP: char = '*';

/// A parsed `RT{}` block, positions still in the read's aligned frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReadTagRecord {
    pub line: usize,
    pub read: String,
    pub class: String,
    pub source: String,
    pub start: i64,
    pub end: i64,
    pub date: String,
    pub flags: Option<String>,
    pub body: Vec<String>,
}

impl ReadTagRecord {
    /// Translate the aligned range and attach the tag to `contig`.
    pub fn attach(
        &self,
        contig: &mut Contig,
    ) -> Result<()> {
        let frame = Frame::Aligned(self.read.clone());
        let start = contig.translate(&frame, &Frame::GappedConsensus, self.start)?;
        let end = contig.translate(&frame, &Frame::GappedConsensus, self.end)?;
        let strand = contig.read(&self.read)?.anchor.strand;

        let mut tag = Tag::new(&self.class, Anchor::Read(self.read.clone()))
            .with_location(Location::new(start, end, strand))
            .with_attribute("source", &self.source)
            .with_attribute("date", &self.date);
        if let Some(flags) = &self.flags {
            tag = tag.with_attribute("flags", flags);
        }
        if !self.body.is_empty() {
            tag = tag.with_attribute("body", &self.body.join("\n"));
        }
        contig.add_tag(tag)
    }
}

// Contig being assembled from its records.
struct OpenUnit {
    line: usize,
    contig: Contig,
    n_reads: usize,
    singlet: bool,
    placements: HashMap<String, (Strand, i64)>,
    min_start: i64,
    max_end: i64,
    current_read: Option<String>,
}

pub struct AceParser<'a, R: Read> {
    lines: LineReader<'a, R>,
    config: Config,
    unit: Option<OpenUnit>,
    pending: Vec<ReadTagRecord>,
}

impl<'a, R: Read> AceParser<'a, R> {
    pub fn new(
        conn: &'a mut R,
        config: &Config,
    ) -> Self {
        AceParser { lines: LineReader::new(conn), config: config.clone(), unit: None, pending: Vec::new() }
    }

    /// `RT{}` blocks whose read was not in the unit open at the time.
    ///
    /// consed writes read tags after the last contig, so these have to be
    /// resolved against the whole scaffold once parsing is done.
    pub fn take_pending_read_tags(&mut self) -> Vec<ReadTagRecord> {
        std::mem::take(&mut self.pending)
    }

    /// Parse records until the next `CO` record or end of input.
    ///
    /// Returns None once the input is exhausted.
    pub fn next_unit(&mut self) -> Result<Option<AssemblyUnit>> {
        while let Some(line) = self.lines.next_line()? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let keyword = trimmed.split_whitespace().next().unwrap_or_default();
            match keyword {
                "AS" => {},
                "CO" => {
                    if self.unit.is_some() {
                        self.lines.push_back(line.clone());
                        return self.finish_unit().map(Some)
                    }
                    self.read_contig(trimmed)?;
                },
                "BQ" => self.read_base_qualities()?,
                "AF" => self.read_assembled_from(trimmed)?,
                "BS" => self.read_base_segment(trimmed)?,
                "RD" => self.read_read(trimmed)?,
                "QA" => self.read_quality_clipping(trimmed)?,
                "DS" => self.read_description(trimmed)?,
                "RT{" => self.read_read_tag()?,
                "WA{" | "CT{" | "WR{" => {
                    let start = self.lines.line_no();
                    skip_block(&mut self.lines, start, keyword)?;
                },
                _ => return Err(Error::malformed(self.lines.line_no(), keyword, "unexpected record")),
            }
        }

        if self.unit.is_some() {
            return self.finish_unit().map(Some)
        }
        Ok(None)
    }

    fn open_unit(
        &mut self,
        record: &str,
    ) -> Result<&mut OpenUnit> {
        let line = self.lines.line_no();
        self.unit.as_mut().ok_or_else(|| Error::malformed(line, record, "record outside of a CO block"))
    }

    fn read_contig(
        &mut self,
        line: &str,
    ) -> Result<()> {
        let line_no = self.lines.line_no();
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(Error::malformed(line_no, "CO", format!("expected 6 fields, got {}", fields.len())))
        }
        let id = fields[1];
        let len = parse_int::<usize>(fields[2], line_no, "CO")?;
        let n_reads = parse_int::<usize>(fields[3], line_no, "CO")?;
        let strand = Strand::from_ace(fields[5])
            .ok_or_else(|| Error::malformed(line_no, "CO", format!("invalid orientation '{}'", fields[5])))?;

        let sequence = self.lines.read_body()?.concat().replace(ACE_GAP, "-");
        if sequence.len() != len {
            return Err(Error::malformed(line_no, "CO", format!("consensus has {} bases, header says {}", sequence.len(), len)))
        }

        log::debug!("Reading contig {} ({} columns, {} reads)", id, len, n_reads);
        let contig = Contig::new(id, Seq::new(id, &sequence, 1, strand));
        self.unit = Some(OpenUnit {
            line: line_no,
            contig,
            n_reads,
            singlet: n_reads == 1,
            placements: HashMap::new(),
            min_start: i64::MAX,
            max_end: i64::MIN,
            current_read: None,
        });
        Ok(())
    }

    fn read_base_qualities(&mut self) -> Result<()> {
        let line_no = self.lines.line_no();
        let body = self.lines.read_body()?;
        let unit = self.open_unit("BQ")?;

        let scores = body.iter()
            .flat_map(|line| line.split_whitespace())
            .map(|x| parse_int::<u8>(x, line_no, "BQ"))
            .collect::<Result<Vec<u8>>>()?;

        let consensus = unit.contig.consensus().bytes();
        let n_bases = consensus.iter().filter(|x| **x != GAP).count();
        if scores.len() != n_bases {
            return Err(Error::malformed(line_no, "BQ", format!("{} scores for {} consensus bases", scores.len(), n_bases)))
        }
        let quality = fill_gap_qualities(consensus, scores);
        unit.contig.set_quality(Some(quality))
    }

    fn read_assembled_from(
        &mut self,
        line: &str,
    ) -> Result<()> {
        let line_no = self.lines.line_no();
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(Error::malformed(line_no, "AF", format!("expected 4 fields, got {}", fields.len())))
        }
        let strand = Strand::from_ace(fields[2])
            .ok_or_else(|| Error::malformed(line_no, "AF", format!("invalid orientation '{}'", fields[2])))?;
        let start = parse_int::<i64>(fields[3], line_no, "AF")?;

        let unit = self.open_unit("AF")?;
        unit.min_start = unit.min_start.min(start);
        unit.placements.insert(fields[1].to_string(), (strand, start));
        Ok(())
    }

    fn read_base_segment(
        &mut self,
        line: &str,
    ) -> Result<()> {
        let line_no = self.lines.line_no();
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 4 {
            return Err(Error::malformed(line_no, "BS", format!("expected 4 fields, got {}", fields.len())))
        }
        let start = parse_int::<i64>(fields[1], line_no, "BS")?;
        let end = parse_int::<i64>(fields[2], line_no, "BS")?;

        let unit = self.open_unit("BS")?;
        unit.contig.check_columns(start.min(end), start.max(end))
            .map_err(|_| Error::malformed(line_no, "BS", format!("segment {}..{} is outside the {} column consensus", start, end, unit.contig.consensus().len())))?;
        let tag = Tag::new(BASE_SEGMENT, Anchor::Contig)
            .with_location(Location::new(start, end, Strand::Forward))
            .with_attribute("read", fields[3]);
        unit.contig.add_tag(tag)
    }

    fn read_read(
        &mut self,
        line: &str,
    ) -> Result<()> {
        let line_no = self.lines.line_no();
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(Error::malformed(line_no, "RD", format!("expected 5 fields, got {}", fields.len())))
        }
        let id = fields[1];
        let len = parse_int::<usize>(fields[2], line_no, "RD")?;
        let sequence = self.lines.read_body()?.concat().replace(ACE_GAP, "-");
        if sequence.len() != len {
            return Err(Error::malformed(line_no, "RD", format!("read has {} bases, header says {}", sequence.len(), len)))
        }

        let unit = self.open_unit("RD")?;
        let (strand, start) = *unit.placements.get(id).ok_or_else(|| Error::UnknownRead(id.to_string()))?;
        let read = Seq::new(id, &sequence, 1, strand);

        if unit.singlet && unit.contig.n_reads() == 0 {
            if unit.contig.consensus().len() != read.len() {
                log::warn!("Singlet {} consensus length {} differs from read {} length {}, using the read", unit.contig.id(), unit.contig.consensus().len(), id, read.len());
            }
            let consensus = Seq::new(unit.contig.id(), read.sequence(), 1, unit.contig.consensus().strand());
            unit.contig.set_consensus(consensus);
            unit.contig.add_read(read, Location::new(1, len as i64, strand))?;
        } else {
            let anchor = Location::new(start, start + len as i64 - 1, strand);
            unit.max_end = unit.max_end.max(anchor.end);
            unit.contig.add_read(read, anchor)?;
        }
        unit.current_read = Some(id.to_string());
        Ok(())
    }

    fn current_read(
        &mut self,
        record: &str,
    ) -> Result<(&mut Contig, String)> {
        let line_no = self.lines.line_no();
        let unit = self.open_unit(record)?;
        let id = unit.current_read.clone()
            .ok_or_else(|| Error::malformed(line_no, record, "record before any RD"))?;
        Ok((&mut unit.contig, id))
    }

    fn read_quality_clipping(
        &mut self,
        line: &str,
    ) -> Result<()> {
        let line_no = self.lines.line_no();
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 5 {
            return Err(Error::malformed(line_no, "QA", format!("expected 5 fields, got {}", fields.len())))
        }
        let values = fields[1..].iter()
            .map(|x| parse_int::<i64>(x, line_no, "QA"))
            .collect::<Result<Vec<i64>>>()?;

        let (contig, id) = self.current_read("QA")?;
        for (class, start, end) in [(QUALITY_CLIPPING, values[0], values[1]), (ALIGN_CLIPPING, values[2], values[3])] {
            if start == -1 || end == -1 {
                continue;
            }
            let tag = clipping_tag(contig, &id, class, start, end)?;
            contig.add_tag(tag)?;
        }
        Ok(())
    }

    fn read_description(
        &mut self,
        line: &str,
    ) -> Result<()> {
        let text = line.strip_prefix("DS").unwrap_or(line).trim();
        let (contig, id) = self.current_read("DS")?;
        let anchor = contig.read(&id)?.anchor;

        let mut tag = Tag::new(READ_DESC, Anchor::Read(id.clone())).with_location(anchor);
        for (key, value) in split_description(text) {
            tag = tag.with_attribute(&key, &value);
        }
        contig.add_tag(tag)
    }

    fn read_read_tag(&mut self) -> Result<()> {
        let record = read_tag_record(&mut self.lines)?;
        match self.unit.as_mut() {
            Some(unit) if unit.contig.has_read(&record.read) => record.attach(&mut unit.contig),
            _ => {
                self.pending.push(record);
                Ok(())
            },
        }
    }

    fn finish_unit(&mut self) -> Result<AssemblyUnit> {
        let Some(mut unit) = self.unit.take() else {
            return Err(Error::malformed(self.lines.line_no(), "CO", "no open contig"))
        };
        if unit.contig.n_reads() != unit.n_reads {
            return Err(Error::malformed(unit.line, "CO", format!("{} reads declared, {} found", unit.n_reads, unit.contig.n_reads())))
        }

        if self.config.variant == AceVariant::Roche454 && !unit.singlet {
            reframe_454(&mut unit.contig, unit.min_start, unit.max_end);
        }

        log::debug!("Finished {} {} with {} reads", if unit.singlet { "singlet" } else { "contig" }, unit.contig.id(), unit.contig.n_reads());
        if unit.singlet {
            Ok(AssemblyUnit::Singlet(unit.contig))
        } else {
            Ok(AssemblyUnit::Contig(unit.contig))
        }
    }
}

impl<R: Read> Iterator for AceParser<'_, R> {
    type Item = Result<AssemblyUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_unit().transpose()
    }
}

/// Shift reads and tags so the smallest `AF` start lands on column 1, then
/// pad the consensus with gap columns to cover every read.
///
/// 454 style files place reads relative to the clear range, so `AF` starts
/// can be zero or negative and reads can run past the consensus end.
pub(crate) fn reframe_454(
    contig: &mut Contig,
    min_start: i64,
    max_end: i64,
) {
    let shift = if min_start < 1 { min_start.abs() + 1 } else { 0 };
    contig.shift(shift);

    let len = contig.consensus().len() as i64 + shift;
    let right = if max_end + shift > len { max_end + shift - len } else { 0 };
    contig.pad_consensus(shift as usize, right as usize);
}

/// Re-insert quality scores at gap columns.
///
/// `scores` holds one value per non-gap base. Gaps are filled left to right
/// with the integer mean of the current left and right neighbours, with 0
/// standing in for a missing neighbour.
pub fn fill_gap_qualities(
    consensus: &[u8],
    scores: Vec<u8>,
) -> Vec<u8> {
    let mut quality = scores;
    for (idx, base) in consensus.iter().enumerate() {
        if *base != GAP {
            continue;
        }
        let left = if idx > 0 { quality.get(idx - 1).copied().unwrap_or(0) } else { 0 };
        let right = quality.get(idx).copied().unwrap_or(0);
        let mean = ((left as u16 + right as u16) / 2) as u8;
        quality.insert(idx.min(quality.len()), mean);
    }
    quality
}

fn description_key() -> &'static Regex {
    static KEY: OnceLock<Regex> = OnceLock::new();
    KEY.get_or_init(|| Regex::new(r"(?:^|\s)([A-Za-z_][A-Za-z0-9_]*):").expect("valid regex"))
}

/// Split a `DS` line into `KEY: value` pairs in file order.
///
/// Keys are words directly followed by a colon and whitespace, so times such
/// as `10:00:00` stay in the value. Text before the first key is kept under
/// the empty key.
pub fn split_description(
    text: &str,
) -> Vec<(String, String)> {
    let keys: Vec<(usize, usize, &str)> = description_key()
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let key = caps.get(1)?;
            let after = text[whole.end()..].chars().next();
            match after {
                None => Some((whole.start(), whole.end(), key.as_str())),
                Some(c) if c.is_whitespace() => Some((whole.start(), whole.end(), key.as_str())),
                _ => None,
            }
        })
        .collect();

    let mut pairs: Vec<(String, String)> = Vec::new();
    let leading_end = keys.first().map(|x| x.0).unwrap_or(text.len());
    let leading = text[..leading_end].trim();
    if !leading.is_empty() {
        pairs.push((String::new(), leading.to_string()));
    }
    keys.iter().enumerate().for_each(|(idx, (_, value_start, key))| {
        let value_end = keys.get(idx + 1).map(|x| x.0).unwrap_or(text.len());
        pairs.push((key.to_string(), text[*value_start..value_end].trim().to_string()));
    });
    pairs
}

fn clipping_tag(
    contig: &Contig,
    id: &str,
    class: &str,
    start: i64,
    end: i64,
) -> Result<Tag> {
    let frame = Frame::Aligned(id.to_string());
    let start = contig.translate(&frame, &Frame::GappedConsensus, start)?;
    let end = contig.translate(&frame, &Frame::GappedConsensus, end)?;
    let strand = contig.read(id)?.anchor.strand;
    Ok(Tag::new(class, Anchor::Read(id.to_string())).with_location(Location::new(start, end, strand)))
}

fn read_tag_record<R: Read>(
    lines: &mut LineReader<'_, R>,
) -> Result<ReadTagRecord> {
    let start = lines.line_no();
    let mut body = lines.read_until("}")?
        .ok_or_else(|| Error::malformed(start, "RT{", "block is not closed"))?;
    if body.is_empty() {
        return Err(Error::malformed(start, "RT{", "missing header line"))
    }
    let header = body.remove(0);
    let fields: Vec<&str> = header.split_whitespace().collect();
    if fields.len() < 6 {
        return Err(Error::malformed(start + 1, "RT{", format!("expected at least 6 header fields, got {}", fields.len())))
    }
    Ok(ReadTagRecord {
        line: start,
        read: fields[0].to_string(),
        class: fields[1].to_string(),
        source: fields[2].to_string(),
        start: parse_int::<i64>(fields[3], start + 1, "RT{")?,
        end: parse_int::<i64>(fields[4], start + 1, "RT{")?,
        date: fields[5].to_string(),
        flags: if fields.len() > 6 { Some(fields[6..].join(" ")) } else { None },
        body,
    })
}

fn skip_block<R: Read>(
    lines: &mut LineReader<'_, R>,
    start: usize,
    keyword: &str,
) -> Result<()> {
    lines.read_until("}")?
        .ok_or_else(|| Error::malformed(start, keyword, "block is not closed"))?;
    Ok(())
}

fn parse_int<T: std::str::FromStr>(
    value: &str,
    line: usize,
    record: &str,
) -> Result<T> {
    value.parse::<T>().map_err(|_| Error::malformed(line, record, format!("'{}' is not a valid number", value)))
}

/// Second pass: attach `WA{}` blocks to `scaffold` and `CT{}` blocks to
/// their contigs.
///
/// `CT{}` positions are gapped consensus columns of the contig as written;
/// contigs that were re-framed on input have their padding added.
pub fn read_assembly_tags<R: Read>(
    conn: &mut R,
    scaffold: &mut Scaffold,
) -> Result<()> {
    let mut lines = LineReader::new(conn);
    let mut n_tags = 0;
    while let Some(line) = lines.next_line()? {
        let start = lines.line_no();
        match line.trim() {
            "WA{" => {
                let (header, body) = tag_block(&mut lines, start, "WA{")?;
                let fields: Vec<&str> = header.split_whitespace().collect();
                if fields.len() < 3 {
                    return Err(Error::malformed(start + 1, "WA{", format!("expected 3 header fields, got {}", fields.len())))
                }
                let mut tag = Tag::new(fields[0], Anchor::Assembly)
                    .with_attribute("source", fields[1])
                    .with_attribute("date", &fields[2..].join(" "));
                if !body.is_empty() {
                    tag = tag.with_attribute("body", &body.join("\n"));
                }
                scaffold.add_tag(tag);
                n_tags += 1;
            },
            "CT{" => {
                let (header, body) = tag_block(&mut lines, start, "CT{")?;
                let fields: Vec<&str> = header.split_whitespace().collect();
                if fields.len() < 6 {
                    return Err(Error::malformed(start + 1, "CT{", format!("expected at least 6 header fields, got {}", fields.len())))
                }
                let contig = scaffold.unit_mut(fields[0])
                    .ok_or_else(|| Error::UnknownContig(fields[0].to_string()))?
                    .contig_mut();
                let offset = contig.left_padding();
                let tag_start = parse_int::<i64>(fields[3], start + 1, "CT{")? + offset;
                let tag_end = parse_int::<i64>(fields[4], start + 1, "CT{")? + offset;
                contig.check_columns(tag_start.min(tag_end), tag_start.max(tag_end))
                    .map_err(|_| Error::malformed(start + 1, "CT{", format!("tag {}..{} is outside the {} column consensus", fields[3], fields[4], contig.consensus().len())))?;

                let mut tag = Tag::new(fields[1], Anchor::Contig)
                    .with_location(Location::new(tag_start, tag_end, Strand::Forward))
                    .with_attribute("source", fields[2])
                    .with_attribute("date", fields[5]);
                if fields.len() > 6 {
                    tag = tag.with_attribute("flags", &fields[6..].join(" "));
                }
                let (comment, text) = split_comment(&body);
                if !text.is_empty() {
                    tag = tag.with_attribute("body", &text.join("\n"));
                }
                if let Some(comment) = comment {
                    tag = tag.with_attribute("comment", &comment.join("\n"));
                }
                contig.add_tag(tag)?;
                n_tags += 1;
            },
            "RT{" | "WR{" => skip_block(&mut lines, start, line.trim())?,
            _ => {},
        }
    }
    log::debug!("Read {} assembly and contig tags", n_tags);
    Ok(())
}

fn tag_block<R: Read>(
    lines: &mut LineReader<'_, R>,
    start: usize,
    keyword: &str,
) -> Result<(String, Vec<String>)> {
    let mut body = lines.read_until("}")?
        .ok_or_else(|| Error::malformed(start, keyword, "block is not closed"))?;
    if body.is_empty() {
        return Err(Error::malformed(start, keyword, "missing header line"))
    }
    let header = body.remove(0);
    Ok((header, body))
}

// Separate a `COMMENT{ ... C}` sub-block from the rest of a CT body.
fn split_comment(
    body: &[String],
) -> (Option<Vec<String>>, Vec<String>) {
    let mut comment: Option<Vec<String>> = None;
    let mut text: Vec<String> = Vec::new();
    let mut in_comment = false;
    for line in body {
        if in_comment {
            if line.trim_end() == "C}" {
                in_comment = false;
            } else if let Some(lines) = comment.as_mut() {
                lines.push(line.clone());
            }
        } else if line.trim_end() == "COMMENT{" {
            in_comment = true;
            comment = Some(Vec::new());
        } else {
            text.push(line.clone());
        }
    }
    (comment, text)
}

/// Parse a whole ACE file into a [Scaffold].
///
/// Runs [AceParser] over `conn`, resolves read tags that followed their
/// contig, then rewinds `conn` for the `WA{}`/`CT{}` pass.
///
pub fn parse_ace<R: Read + Seek>(
    config: &Config,
    conn: &mut R,
) -> Result<Scaffold> {
    let mut scaffold = Scaffold::new();
    let pending = {
        let mut parser = AceParser::new(conn, config);
        while let Some(unit) = parser.next_unit()? {
            scaffold.push(unit);
        }
        parser.take_pending_read_tags()
    };

    for record in pending {
        let unit = scaffold.units_mut().iter_mut()
            .find(|unit| unit.contig().has_read(&record.read))
            .ok_or_else(|| Error::UnknownRead(record.read.clone()))?;
        record.attach(unit.contig_mut())?;
    }

    conn.rewind()?;
    read_assembly_tags(conn, &mut scaffold)?;

    log::info!("Parsed {} contigs and {} singlets with {} reads", scaffold.contigs().count(), scaffold.singlets().count(), scaffold.read_count());
    Ok(scaffold)
}

// Tests
#[cfg(test)]
mod tests {

    fn two_contigs() -> Vec<u8> {
        let mut data: Vec<u8> = b"AS 2 3\n\n".to_vec();
        data.append(&mut b"CO Singlet1 6 1 1 U\nACGTAC\n\nBQ\n 20 20 20 20 20 20\n\n".to_vec());
        data.append(&mut b"AF s1 U 1\nBS 1 6 s1\n\nRD s1 6 0 0\nACGTAC\n\nQA 1 6 1 6\n\n".to_vec());
        data.append(&mut b"CO Contig2 8 2 2 C\nAC*GTA*C\n\nBQ\n 10 20 30 40\n 50 60\n\n".to_vec());
        data.append(&mut b"AF r1 U 1\nAF r2 C 3\nBS 1 4 r1\nBS 5 8 r2\n\n".to_vec());
        data.append(&mut b"RD r1 5 0 0\nAC*GT\n\nQA 1 5 2 4\nDS CHROMAT_FILE: r1 PHD_FILE: r1.phd.1 TIME: Thu Jun 12 10:00:00 2003\n\n".to_vec());
        data.append(&mut b"RD r2 6 0 1\n*GTA*C\n\nQA -1 -1 1 6\n\n".to_vec());
        data.append(&mut b"RT{\nr2 polymorphism consed 2 3 050101:101010\nsome text\n}\n\n".to_vec());
        data.append(&mut b"WA{\nphrap_params phrap 050101:101010\nphrap reads.fasta\n}\n\n".to_vec());
        data.append(&mut b"CT{\nContig2 repeat consed 2 4 050101:101010\nCOMMENT{\nlooks repetitive\nC}\n}\n\n".to_vec());
        data
    }

    #[test]
    fn singlet_then_contig_in_file_order() {
        use super::parse_ace;
        use crate::Config;
        use std::io::Cursor;

        let mut input = Cursor::new(two_contigs());
        let scaffold = parse_ace(&Config::default(), &mut input).unwrap();

        assert_eq!(scaffold.len(), 2);
        assert!(scaffold.units()[0].is_singlet());
        assert!(!scaffold.units()[1].is_singlet());
        assert_eq!(scaffold.singlets().next().unwrap().id(), "Singlet1");
        assert_eq!(scaffold.contigs().next().unwrap().id(), "Contig2");
        assert_eq!(scaffold.read_count(), 3);
    }

    #[test]
    fn contig_records() {
        use super::parse_ace;
        use crate::Config;
        use crate::assembly::tag::{ALIGN_CLIPPING, QUALITY_CLIPPING, READ_DESC};
        use crate::assembly::Strand;
        use std::io::Cursor;

        let mut input = Cursor::new(two_contigs());
        let scaffold = parse_ace(&Config::default(), &mut input).unwrap();
        let contig = scaffold.unit("Contig2").unwrap().contig();

        assert_eq!(contig.consensus().sequence(), "AC-GTA-C");
        assert_eq!(contig.consensus().strand(), Strand::Reverse);
        assert_eq!(contig.quality().unwrap(), &[10, 20, 25, 30, 40, 50, 55, 60]);

        let r2 = contig.read("r2").unwrap();
        assert_eq!(r2.read.sequence(), "-GTA-C");
        assert_eq!((r2.anchor.start, r2.anchor.end), (3, 8));
        assert_eq!(r2.anchor.strand, Strand::Reverse);

        let quality = contig.read_tag("r1", QUALITY_CLIPPING).unwrap().location.unwrap();
        assert_eq!((quality.start, quality.end), (1, 5));
        let align = contig.read_tag("r1", ALIGN_CLIPPING).unwrap().location.unwrap();
        assert_eq!((align.start, align.end), (2, 4));
        assert!(contig.read_tag("r2", QUALITY_CLIPPING).is_none());
        let align = contig.read_tag("r2", ALIGN_CLIPPING).unwrap().location.unwrap();
        assert_eq!((align.start, align.end), (3, 8));

        let desc = contig.read_tag("r1", READ_DESC).unwrap();
        assert_eq!(desc.attribute("CHROMAT_FILE"), Some("r1"));
        assert_eq!(desc.attribute("PHD_FILE"), Some("r1.phd.1"));
        assert_eq!(desc.attribute("TIME"), Some("Thu Jun 12 10:00:00 2003"));
        assert_eq!(contig.base_segments().len(), 2);
    }

    #[test]
    fn read_and_contig_tags() {
        use super::parse_ace;
        use crate::Config;
        use std::io::Cursor;

        let mut input = Cursor::new(two_contigs());
        let scaffold = parse_ace(&Config::default(), &mut input).unwrap();
        let contig = scaffold.unit("Contig2").unwrap().contig();

        let rt = contig.read_tag("r2", "polymorphism").unwrap();
        let location = rt.location.unwrap();
        assert_eq!((location.start, location.end), (4, 5));
        assert_eq!(rt.attribute("source"), Some("consed"));
        assert_eq!(rt.attribute("body"), Some("some text"));

        let ct = contig.tags_by_class("repeat").next().unwrap();
        assert_eq!(ct.location.unwrap().start, 2);
        assert_eq!(ct.attribute("comment"), Some("looks repetitive"));
        assert_eq!(ct.attribute("body"), None);

        assert_eq!(scaffold.tags().len(), 1);
        assert_eq!(scaffold.tags()[0].class, "phrap_params");
        assert_eq!(scaffold.tags()[0].attribute("body"), Some("phrap reads.fasta"));
    }

    #[test]
    fn one_unit_per_call() {
        use super::AceParser;
        use crate::Config;
        use std::io::Cursor;

        let mut input = Cursor::new(two_contigs());
        let config = Config::default();
        let mut parser = AceParser::new(&mut input, &config);

        assert_eq!(parser.next_unit().unwrap().unwrap().id(), "Singlet1");
        assert_eq!(parser.next_unit().unwrap().unwrap().id(), "Contig2");
        assert!(parser.next_unit().unwrap().is_none());
    }

    #[test]
    fn read_tags_after_last_contig() {
        use super::parse_ace;
        use crate::Config;
        use std::io::Cursor;

        let mut data: Vec<u8> = b"CO c1 4 2 1 U\nACGT\n\nBQ\n 9 9 9 9\n\nAF r1 U 1\nAF r2 U 2\nBS 1 4 r1\n\n".to_vec();
        data.append(&mut b"RD r1 4 0 0\nACGT\n\nQA 1 4 1 4\n\nRD r2 3 0 0\nCGT\n\nQA 1 3 1 3\n\n".to_vec());
        data.append(&mut b"CO c2 2 1 1 U\nGG\n\nBQ\n 9 9\n\nAF r3 U 1\nBS 1 2 r3\n\nRD r3 2 0 0\nGG\n\nQA 1 2 1 2\n\n".to_vec());
        data.append(&mut b"RT{\nr1 comment consed 1 2 050101:101010\n}\n\n".to_vec());

        let mut input = Cursor::new(data);
        let scaffold = parse_ace(&Config::default(), &mut input).unwrap();
        let contig = scaffold.unit("c1").unwrap().contig();

        assert!(contig.read_tag("r1", "comment").is_some());
    }

    #[test]
    fn empty_input_is_empty_scaffold() {
        use super::parse_ace;
        use crate::Config;
        use std::io::Cursor;

        let mut input = Cursor::new(Vec::<u8>::new());
        let scaffold = parse_ace(&Config::default(), &mut input).unwrap();

        assert!(scaffold.is_empty());
    }

    #[test]
    fn fill_gap_qualities_averages_flanks() {
        use super::fill_gap_qualities;

        assert_eq!(fill_gap_qualities(b"AC-GT", vec![10, 20, 30, 40]), vec![10, 20, 25, 30, 40]);
        assert_eq!(fill_gap_qualities(b"-AC", vec![10, 20]), vec![5, 10, 20]);
        assert_eq!(fill_gap_qualities(b"AC-", vec![10, 20]), vec![10, 20, 10]);
        assert_eq!(fill_gap_qualities(b"A--C", vec![10, 30]), vec![10, 20, 25, 30]);
    }

    #[test]
    fn split_description_pairs() {
        use super::split_description;

        let got = split_description("CHROMAT_FILE: r1 PHD_FILE: r1.phd.1 TIME: Thu Jun 12 10:00:00 2003 CHEM: term");

        assert_eq!(got, vec![
            ("CHROMAT_FILE".to_string(), "r1".to_string()),
            ("PHD_FILE".to_string(), "r1.phd.1".to_string()),
            ("TIME".to_string(), "Thu Jun 12 10:00:00 2003".to_string()),
            ("CHEM".to_string(), "term".to_string()),
        ]);
    }

    #[test]
    fn split_description_free_text() {
        use super::split_description;

        assert_eq!(split_description("see http://example.org"), vec![(String::new(), "see http://example.org".to_string())]);
        assert!(split_description("").is_empty());
    }

    #[test]
    fn reframe_454_pads_consensus() {
        use super::parse_ace;
        use crate::{AceVariant, Config};
        use crate::coords::Frame;
        use std::io::Cursor;

        // Consensus of 30 columns, reads starting at -5, 0 and 10 with the
        // last one ending at 40.
        let consensus = "ACGTACGTAC".repeat(3);
        let mut data: Vec<u8> = format!("CO c454 30 3 1 U\n{}\n\n", consensus).into_bytes();
        data.append(&mut b"AF a U -5\nAF b U 0\nAF c U 10\nBS 1 30 c\n\n".to_vec());
        data.append(&mut format!("RD a 10 0 0\n{}\n\nQA 1 10 1 10\n\n", "A".repeat(10)).into_bytes());
        data.append(&mut format!("RD b 10 0 0\n{}\n\nQA 1 10 1 10\n\n", "C".repeat(10)).into_bytes());
        data.append(&mut format!("RD c 31 0 0\n{}\n\nQA 1 31 1 31\n\n", "G".repeat(31)).into_bytes());
        data.append(&mut b"CT{\nc454 repeat consed 1 3 050101:101010\n}\n\n".to_vec());

        let config = Config { variant: AceVariant::Roche454, ..Config::default() };
        let mut input = Cursor::new(data);
        let scaffold = parse_ace(&config, &mut input).unwrap();
        let contig = scaffold.unit("c454").unwrap().contig();

        assert_eq!(contig.consensus().len(), 46);
        assert_eq!(&contig.consensus().sequence()[0..6], "------");
        assert_eq!(&contig.consensus().sequence()[6..36], consensus);
        assert_eq!(&contig.consensus().sequence()[36..], "----------");
        assert_eq!(contig.ungapped_consensus(), consensus);
        assert_eq!(contig.read("a").unwrap().anchor.start, 1);
        assert_eq!(contig.read("c").unwrap().anchor.end, 46);
        assert_eq!(contig.base_segments()[0].location.unwrap().start, 7);
        assert_eq!(contig.tags_by_class("repeat").next().unwrap().location.unwrap().start, 7);
        for p in 1..=30 {
            let gapped = contig.translate(&Frame::UngappedConsensus, &Frame::GappedConsensus, p).unwrap();
            assert_eq!(gapped, p + 6);
        }
    }

    #[test]
    fn malformed_records_report_line() {
        use super::parse_ace;
        use crate::Config;
        use crate::errors::Error;
        use std::io::Cursor;

        let mut input = Cursor::new(b"AS 1 1\n\nCO c1 4 1 1 X\nACGT\n\n".to_vec());
        let got = parse_ace(&Config::default(), &mut input);
        assert!(matches!(got, Err(Error::MalformedRecord { line: 3, .. })));

        let mut input = Cursor::new(b"XX nothing\n".to_vec());
        let got = parse_ace(&Config::default(), &mut input);
        assert!(matches!(got, Err(Error::MalformedRecord { line: 1, .. })));

        let mut input = Cursor::new(b"CO c1 4 1 1 U\nACGT\n\nBQ\n 1 2 3\n\n".to_vec());
        let got = parse_ace(&Config::default(), &mut input);
        assert!(matches!(got, Err(Error::MalformedRecord { line: 4, .. })));
    }

    #[test]
    fn contig_tags_outside_consensus() {
        use super::parse_ace;
        use crate::Config;
        use crate::errors::Error;
        use std::io::Cursor;

        let mut input = Cursor::new(b"CO c1 4 1 1 U\nACGT\n\nAF r1 U 1\nBS 1 999 r1\n\nRD r1 4 0 0\nACGT\n\n".to_vec());
        let got = parse_ace(&Config::default(), &mut input);
        assert!(matches!(got, Err(Error::MalformedRecord { line: 5, record, .. }) if record == "BS"));

        let mut input = Cursor::new(b"CO c1 4 1 1 U\nACGT\n\nAF r1 U 1\nBS 1 4 r1\n\nRD r1 4 0 0\nACGT\n\nCT{\nc1 repeat consed 50 80 050101:101010\n}\n".to_vec());
        let got = parse_ace(&Config::default(), &mut input);
        assert!(matches!(got, Err(Error::MalformedRecord { line: 11, record, .. }) if record == "CT{"));
    }

    #[test]
    fn unknown_read_and_contig() {
        use super::parse_ace;
        use crate::Config;
        use crate::errors::Error;
        use std::io::Cursor;

        let mut input = Cursor::new(b"CO c1 4 1 1 U\nACGT\n\nRD r1 4 0 0\nACGT\n\n".to_vec());
        let got = parse_ace(&Config::default(), &mut input);
        assert!(matches!(got, Err(Error::UnknownRead(id)) if id == "r1"));

        let mut input = Cursor::new(b"CO c1 4 1 1 U\nACGT\n\nAF r1 U 1\n\nRD r1 4 0 0\nACGT\n\nCT{\nc9 repeat consed 1 2 050101:101010\n}\n".to_vec());
        let got = parse_ace(&Config::default(), &mut input);
        assert!(matches!(got, Err(Error::UnknownContig(id)) if id == "c9"));
    }

    #[test]
    fn duplicate_read() {
        use super::parse_ace;
        use crate::Config;
        use crate::errors::Error;
        use std::io::Cursor;

        let mut input = Cursor::new(b"CO c1 4 2 1 U\nACGT\n\nAF r1 U 1\n\nRD r1 4 0 0\nACGT\n\nRD r1 4 0 0\nACGT\n\n".to_vec());
        let got = parse_ace(&Config::default(), &mut input);

        assert!(matches!(got, Err(Error::DuplicateRead(id)) if id == "r1"));
    }
}
