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
use std::io::Read;
use std::io::Seek;
use std::io::Write;

use crate::Config;
use crate::assembly::tag::ALIGN_CLIPPING;
use crate::assembly::tag::QUALITY_CLIPPING;
use crate::assembly::tag::READ_DESC;
use crate::assembly::Anchor;
use crate::assembly::Contig;
use crate::assembly::PlacedRead;
use crate::assembly::Scaffold;
use crate::assembly::Tag;
use crate::assembly::GAP;
use crate::coords::Frame;
use crate::errors::Result;
use crate::printer::write_wrapped;

const DEFAULT_SOURCE: &str = "contigio";
const DEFAULT_DATE: &str = "000000:000000";

/// Write the `AS` line that opens an ACE file.
pub fn format_ace_header<W: Write>(
    n_units: usize,
    n_reads: usize,
    conn: &mut W,
) -> Result<()> {
    conn.write_all(format!("AS {} {}\n\n", n_units, n_reads).as_bytes())?;
    Ok(())
}

fn ace_sequence(sequence: &str) -> String {
    sequence.replace(GAP as char, "*")
}

// Gapped `location` of `tag` as a range in the read's aligned frame.
fn aligned_range(
    contig: &Contig,
    id: &str,
    tag: &Tag,
) -> Result<Option<(i64, i64)>> {
    let Some(location) = tag.location else {
        return Ok(None)
    };
    let frame = Frame::Aligned(id.to_string());
    let start = contig.translate(&Frame::GappedConsensus, &frame, location.start)?;
    let end = contig.translate(&Frame::GappedConsensus, &frame, location.end)?;
    Ok(Some((start, end)))
}

fn format_description(tag: &Tag) -> String {
    tag.attributes.iter()
        .map(|(key, value)| if key.is_empty() { value.clone() } else { format!("{}: {}", key, value) })
        .collect::<Vec<String>>()
        .join(" ")
}

fn format_read<W: Write>(
    contig: &Contig,
    placed: &PlacedRead,
    config: &Config,
    conn: &mut W,
) -> Result<()> {
    let id = placed.read.id();
    let user_tags: Vec<&Tag> = contig.read_tags(id).filter(|tag| !tag.is_reserved()).collect();

    conn.write_all(format!("RD {} {} 0 {}\n", id, placed.read.len(), user_tags.len()).as_bytes())?;
    write_wrapped(ace_sequence(placed.read.sequence()).as_bytes(), config.line_width, conn)?;
    conn.write_all(b"\n")?;

    let quality = match contig.read_tag(id, QUALITY_CLIPPING) {
        Some(tag) => aligned_range(contig, id, tag)?,
        None => None,
    };
    let align = match contig.read_tag(id, ALIGN_CLIPPING) {
        Some(tag) => aligned_range(contig, id, tag)?,
        None => None,
    };
    let (qs, qe) = quality.unwrap_or((-1, -1));
    let (als, ale) = align.unwrap_or((-1, -1));
    conn.write_all(format!("QA {} {} {} {}\n", qs, qe, als, ale).as_bytes())?;

    if let Some(desc) = contig.read_tag(id, READ_DESC) {
        let text = format_description(desc);
        if text.is_empty() {
            conn.write_all(b"DS\n")?;
        } else {
            conn.write_all(format!("DS {}\n", text).as_bytes())?;
        }
    }
    conn.write_all(b"\n")?;

    for tag in user_tags {
        let (start, end) = aligned_range(contig, id, tag)?.unwrap_or((1, placed.read.len() as i64));
        conn.write_all(b"RT{\n")?;
        conn.write_all(format!("{} {} {} {} {} {}",
                               id, tag.class,
                               tag.attribute("source").unwrap_or(DEFAULT_SOURCE),
                               start, end,
                               tag.attribute("date").unwrap_or(DEFAULT_DATE)).as_bytes())?;
        if let Some(flags) = tag.attribute("flags") {
            conn.write_all(format!(" {}", flags).as_bytes())?;
        }
        conn.write_all(b"\n")?;
        if let Some(body) = tag.attribute("body") {
            conn.write_all(format!("{}\n", body).as_bytes())?;
        }
        conn.write_all(b"}\n\n")?;
    }
    Ok(())
}

/// Write one contig or singlet as a `CO` block with its reads.
///
/// Consensus and read bodies are wrapped at `config.line_width` with `*`
/// for gaps. `BQ` only lists scores of non-gap columns; a contig without
/// stored quality gets `config.default_quality` everywhere.
///
pub fn format_ace_unit<W: Write>(
    contig: &Contig,
    config: &Config,
    conn: &mut W,
) -> Result<()> {
    let segments = contig.base_segments();
    conn.write_all(format!("CO {} {} {} {} {}\n",
                           contig.id(), contig.consensus().len(), contig.n_reads(),
                           segments.len(), contig.consensus().strand().ace_letter()).as_bytes())?;
    write_wrapped(ace_sequence(contig.consensus().sequence()).as_bytes(), config.line_width, conn)?;
    conn.write_all(b"\n")?;

    let scores: Vec<String> = contig.quality_or(config.default_quality).iter()
        .zip(contig.consensus().bytes().iter())
        .filter(|(_, base)| **base != GAP)
        .map(|(score, _)| score.to_string())
        .collect();
    conn.write_all(b"BQ\n")?;
    for line in scores.chunks(config.line_width.max(1)) {
        conn.write_all(format!(" {}\n", line.join(" ")).as_bytes())?;
    }
    conn.write_all(b"\n")?;

    for placed in contig.reads() {
        conn.write_all(format!("AF {} {} {}\n", placed.read.id(), placed.anchor.strand.ace_letter(), placed.anchor.start).as_bytes())?;
    }
    for segment in segments.iter() {
        if let Some(location) = segment.location {
            conn.write_all(format!("BS {} {} {}\n", location.start, location.end, segment.attribute("read").unwrap_or_default()).as_bytes())?;
        }
    }
    conn.write_all(b"\n")?;

    for placed in contig.reads() {
        format_read(contig, placed, config, conn)?;
    }
    Ok(())
}

/// Write the `WA{}` blocks of `scaffold` and the `CT{}` blocks of its contigs.
pub fn format_ace_footer<W: Write>(
    scaffold: &Scaffold,
    conn: &mut W,
) -> Result<()> {
    for tag in scaffold.tags().iter().filter(|tag| !tag.is_reserved()) {
        conn.write_all(format!("WA{{\n{} {} {}\n",
                               tag.class,
                               tag.attribute("source").unwrap_or(DEFAULT_SOURCE),
                               tag.attribute("date").unwrap_or(DEFAULT_DATE)).as_bytes())?;
        if let Some(body) = tag.attribute("body") {
            conn.write_all(format!("{}\n", body).as_bytes())?;
        }
        conn.write_all(b"}\n\n")?;
    }

    for unit in scaffold.units() {
        let contig = unit.contig();
        let tags = contig.tags().iter()
            .filter(|tag| !tag.is_reserved() && tag.anchor == Anchor::Contig);
        for tag in tags {
            let Some(location) = tag.location else {
                continue
            };
            conn.write_all(format!("CT{{\n{} {} {} {} {} {}",
                                   contig.id(), tag.class,
                                   tag.attribute("source").unwrap_or(DEFAULT_SOURCE),
                                   location.start, location.end,
                                   tag.attribute("date").unwrap_or(DEFAULT_DATE)).as_bytes())?;
            if let Some(flags) = tag.attribute("flags") {
                conn.write_all(format!(" {}", flags).as_bytes())?;
            }
            conn.write_all(b"\n")?;
            if let Some(body) = tag.attribute("body") {
                conn.write_all(format!("{}\n", body).as_bytes())?;
            }
            if let Some(comment) = tag.attribute("comment") {
                conn.write_all(format!("COMMENT{{\n{}\nC}}\n", comment).as_bytes())?;
            }
            conn.write_all(b"}\n\n")?;
        }
    }
    Ok(())
}

/// Insert the `AS` header in front of ACE records already written to `conn`.
///
/// Use this when units were streamed out without knowing the totals in
/// advance. Units and reads are counted from the `CO` and `RD` lines.
///
/// ## Usage
///
/// ```rust
/// use contigio::printer::ace::prepend_header;
/// use std::io::Cursor;
///
/// let mut output = Cursor::new(b"CO c1 2 1 0 U\nAC\n\nBQ\n 20 20\n\nAF r1 U 1\n\nRD r1 2 0 0\nAC\n\nQA -1 -1 -1 -1\n\n".to_vec());
/// prepend_header(&mut output).unwrap();
///
/// assert!(output.get_ref().starts_with(b"AS 1 1\n\nCO c1 2 1 0 U\n"));
/// ```
///
pub fn prepend_header<F: Read + Write + Seek>(
    conn: &mut F,
) -> Result<()> {
    conn.rewind()?;
    let mut contents: Vec<u8> = Vec::new();
    conn.read_to_end(&mut contents)?;

    // Free text inside RT{}, CT{} and WA{} blocks is not counted.
    let mut in_block = false;
    let (mut n_units, mut n_reads) = (0, 0);
    for line in contents.split(|x| *x == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if in_block {
            in_block = line != b"}";
        } else if line.ends_with(b"{") {
            in_block = true;
        } else if line.starts_with(b"CO ") {
            n_units += 1;
        } else if line.starts_with(b"RD ") {
            n_reads += 1;
        }
    }

    conn.rewind()?;
    format_ace_header(n_units, n_reads, conn)?;
    conn.write_all(&contents)?;
    conn.flush()?;
    Ok(())
}

// Tests
#[cfg(test)]
mod tests {

    fn contig() -> crate::assembly::Contig {
        use crate::assembly::tag::{ALIGN_CLIPPING, BASE_SEGMENT, QUALITY_CLIPPING, READ_DESC};
        use crate::assembly::{Anchor, Contig, Location, Seq, Strand, Tag};

        let mut contig = Contig::new("c1", Seq::new("c1", "AC-GTA", 1, Strand::Forward));
        contig.set_quality(Some(vec![10, 20, 25, 30, 40, 50])).unwrap();
        contig.add_read(Seq::new("r1", "AC-G", 1, Strand::Forward), Location::new(1, 4, Strand::Forward)).unwrap();
        contig.add_read(Seq::new("r2", "-GTA", 1, Strand::Reverse), Location::new(3, 6, Strand::Reverse)).unwrap();
        contig.add_tag(Tag::new(BASE_SEGMENT, Anchor::Contig).with_location(Location::new(4, 6, Strand::Forward)).with_attribute("read", "r2")).unwrap();
        contig.add_tag(Tag::new(BASE_SEGMENT, Anchor::Contig).with_location(Location::new(1, 3, Strand::Forward)).with_attribute("read", "r1")).unwrap();
        contig.add_tag(Tag::new(QUALITY_CLIPPING, Anchor::Read("r1".to_string())).with_location(Location::new(1, 4, Strand::Forward))).unwrap();
        contig.add_tag(Tag::new(ALIGN_CLIPPING, Anchor::Read("r1".to_string())).with_location(Location::new(2, 4, Strand::Forward))).unwrap();
        contig.add_tag(Tag::new(READ_DESC, Anchor::Read("r1".to_string())).with_location(Location::new(1, 4, Strand::Forward)).with_attribute("CHROMAT_FILE", "r1")).unwrap();
        contig.add_tag(Tag::new("comment", Anchor::Read("r2".to_string())).with_location(Location::new(4, 5, Strand::Reverse))
                       .with_attribute("source", "consed").with_attribute("date", "050101:101010").with_attribute("body", "check")).unwrap();
        contig
    }

    #[test]
    fn format_unit() {
        use super::format_ace_unit;
        use crate::Config;

        let mut expected: Vec<u8> = Vec::new();
        expected.append(&mut b"CO c1 6 2 2 U\nAC*GTA\n\nBQ\n 10 20 30 40 50\n\n".to_vec());
        expected.append(&mut b"AF r1 U 1\nAF r2 C 3\nBS 1 3 r1\nBS 4 6 r2\n\n".to_vec());
        expected.append(&mut b"RD r1 4 0 0\nAC*G\n\nQA 1 4 2 4\nDS CHROMAT_FILE: r1\n\n".to_vec());
        expected.append(&mut b"RD r2 4 0 1\n*GTA\n\nQA -1 -1 -1 -1\n\n".to_vec());
        expected.append(&mut b"RT{\nr2 comment consed 2 3 050101:101010\ncheck\n}\n\n".to_vec());

        let mut got: Vec<u8> = Vec::new();
        format_ace_unit(&contig(), &Config::default(), &mut got).unwrap();

        assert_eq!(String::from_utf8(got).unwrap(), String::from_utf8(expected).unwrap());
    }

    #[test]
    fn format_unit_wraps_lines() {
        use super::format_ace_unit;
        use crate::Config;

        let config = Config { line_width: 4, ..Config::default() };
        let mut got: Vec<u8> = Vec::new();
        format_ace_unit(&contig(), &config, &mut got).unwrap();
        let got = String::from_utf8(got).unwrap();

        assert!(got.starts_with("CO c1 6 2 2 U\nAC*G\nTA\n\nBQ\n 10 20 30 40\n 50\n\n"));
    }

    #[test]
    fn format_unit_default_quality() {
        use super::format_ace_unit;
        use crate::Config;
        use crate::assembly::{Contig, Seq, Strand};

        let contig = Contig::new("c2", Seq::new("c2", "A-C", 1, Strand::Reverse));
        let config = Config { default_quality: 7, ..Config::default() };
        let mut got: Vec<u8> = Vec::new();
        format_ace_unit(&contig, &config, &mut got).unwrap();

        assert_eq!(String::from_utf8(got).unwrap(), "CO c2 3 0 0 C\nA*C\n\nBQ\n 7 7\n\n\n");
    }

    #[test]
    fn format_footer() {
        use super::format_ace_footer;
        use crate::assembly::{Anchor, AssemblyUnit, Location, Scaffold, Strand, Tag};

        let mut c1 = contig();
        c1.add_tag(Tag::new("repeat", Anchor::Contig).with_location(Location::new(2, 4, Strand::Forward))
                   .with_attribute("source", "consed").with_attribute("date", "050101:101010")
                   .with_attribute("comment", "looks repetitive")).unwrap();
        let mut scaffold = Scaffold::new();
        scaffold.push(AssemblyUnit::Contig(c1));
        scaffold.add_tag(Tag::new("phrap_params", Anchor::Assembly)
                         .with_attribute("source", "phrap").with_attribute("date", "050101:101010")
                         .with_attribute("body", "phrap reads.fasta"));

        let mut expected: Vec<u8> = Vec::new();
        expected.append(&mut b"WA{\nphrap_params phrap 050101:101010\nphrap reads.fasta\n}\n\n".to_vec());
        expected.append(&mut b"CT{\nc1 repeat consed 2 4 050101:101010\nCOMMENT{\nlooks repetitive\nC}\n}\n\n".to_vec());

        let mut got: Vec<u8> = Vec::new();
        format_ace_footer(&scaffold, &mut got).unwrap();

        assert_eq!(String::from_utf8(got).unwrap(), String::from_utf8(expected).unwrap());
    }

    #[test]
    fn prepend_header_counts_records() {
        use super::{format_ace_unit, prepend_header};
        use crate::Config;
        use std::io::Cursor;

        let mut output: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        format_ace_unit(&contig(), &Config::default(), &mut output).unwrap();
        format_ace_unit(&contig(), &Config::default(), &mut output).unwrap();
        prepend_header(&mut output).unwrap();

        assert!(output.get_ref().starts_with(b"AS 2 4\n\nCO c1 6 2 2 U\n"));
    }

    #[test]
    fn prepend_header_skips_tag_bodies() {
        use super::{format_ace_footer, format_ace_unit, prepend_header};
        use crate::Config;
        use crate::assembly::{Anchor, AssemblyUnit, Location, Scaffold, Strand, Tag};
        use std::io::Cursor;

        let mut c1 = contig();
        c1.add_tag(Tag::new("repeat", Anchor::Contig).with_location(Location::new(2, 4, Strand::Forward))
                   .with_attribute("body", "CO c9 1 1 0 U")
                   .with_attribute("comment", "RD r9 1 0 0")).unwrap();
        let mut scaffold = Scaffold::new();
        scaffold.push(AssemblyUnit::Contig(c1));
        scaffold.add_tag(Tag::new("notes", Anchor::Assembly).with_attribute("body", "RD r8 2 0 0\nCO c8 2 1 0 U"));

        let mut output: Cursor<Vec<u8>> = Cursor::new(Vec::new());
        format_ace_unit(scaffold.units()[0].contig(), &Config::default(), &mut output).unwrap();
        format_ace_footer(&scaffold, &mut output).unwrap();
        prepend_header(&mut output).unwrap();

        assert!(output.get_ref().starts_with(b"AS 1 2\n\nCO c1 6 2 2 U\n"));
    }
}
