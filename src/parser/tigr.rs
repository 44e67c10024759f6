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

//! Parser for TIGR assembly (tasm) files.
//!
//! A tasm contig is a block of `key<TAB>value` lines followed by one block
//! per read, blocks separated by blank lines and contigs by a line holding
//! a single `|`.
//!
//! Keys are dispatched through static tables of setters, so any key that
//! is not a known contig or read field is an error.
//!
use std::io::Read;

use indexmap::IndexMap;

use crate::Config;
use crate::assembly::tag::QUALITY_CLIPPING;
use crate::assembly::tag::TIGR_CONTIG;
use crate::assembly::tag::TIGR_READ;
use crate::assembly::Anchor;
use crate::assembly::AssemblyUnit;
use crate::assembly::Contig;
use crate::assembly::Location;
use crate::assembly::Scaffold;
use crate::assembly::Seq;
use crate::assembly::Strand;
use crate::assembly::Tag;
use crate::coords::Frame;
use crate::errors::Error;
use crate::errors::Result;
use crate::parser::LineReader;

type Setter<T> = fn(&mut T, &str, &str) -> std::result::Result<(), String>;

#[derive(Clone, Debug, Default)]
pub(crate) struct ContigInfo {
    line: usize,
    sequence: Option<String>,
    lsequence: Option<String>,
    quality: Option<Vec<u8>>,
    asmbl_id: Option<String>,
    n_reads: Option<usize>,
    metadata: IndexMap<String, String>,
}

#[derive(Clone, Debug, Default)]
pub(crate) struct ReadInfo {
    line: usize,
    seq_name: Option<String>,
    db: String,
    asm_lend: Option<i64>,
    asm_rend: Option<i64>,
    seq_lend: Option<i64>,
    seq_rend: Option<i64>,
    offset: Option<i64>,
    lsequence: Option<String>,
    metadata: IndexMap<String, String>,
}

/// Contig keys in the order they are written.
pub(crate) static CONTIG_FIELDS: &[(&str, Setter<ContigInfo>)] = &[
    ("sequence", set_sequence),
    ("lsequence", set_lsequence),
    ("quality", set_quality),
    ("asmbl_id", set_asmbl_id),
    ("seq_id", set_contig_text),
    ("com_name", set_contig_text),
    ("type", set_contig_text),
    ("method", set_contig_text),
    ("ed_status", set_contig_text),
    ("redundancy", check_decimal),
    ("perc_N", check_decimal),
    ("seq#", set_read_count),
    ("full_cds", set_contig_text),
    ("cds_start", set_contig_text),
    ("cds_end", set_contig_text),
    ("ed_pn", set_contig_text),
    ("ed_date", set_contig_text),
    ("comment", set_contig_text),
    ("frameshift", set_contig_text),
];

/// Read keys in the order they are written.
pub(crate) static READ_FIELDS: &[(&str, Setter<ReadInfo>)] = &[
    ("seq_name", set_seq_name),
    ("asm_lend", set_read_coordinate),
    ("asm_rend", set_read_coordinate),
    ("seq_lend", set_read_coordinate),
    ("seq_rend", set_read_coordinate),
    ("best", set_read_text),
    ("comment", set_read_text),
    ("db", set_db),
    ("offset", set_offset),
    ("lsequence", set_read_lsequence),
];

pub(crate) fn is_contig_field(key: &str) -> bool {
    CONTIG_FIELDS.iter().any(|(name, _)| *name == key)
}

pub(crate) fn contig_keys() -> impl Iterator<Item = &'static str> {
    CONTIG_FIELDS.iter().map(|(name, _)| *name)
}

pub(crate) fn read_keys() -> impl Iterator<Item = &'static str> {
    READ_FIELDS.iter().map(|(name, _)| *name)
}

/// Full read id from the `db` and `seq_name` fields.
///
/// ```rust
/// use contigio::parser::tigr::join_read_id;
///
/// assert_eq!(join_read_id("GB", "read_1"), "GB|read_1");
/// assert_eq!(join_read_id("", "read_1"), "read_1");
/// ```
pub fn join_read_id(
    db: &str,
    seq_name: &str,
) -> String {
    if db.is_empty() {
        seq_name.to_string()
    } else {
        format!("{}|{}", db, seq_name)
    }
}

/// Split a read id into its `db` and `seq_name` parts at the first `|`.
pub fn split_read_id(
    id: &str,
) -> (&str, &str) {
    match id.split_once('|') {
        Some((db, seq_name)) => (db, seq_name),
        None => ("", id),
    }
}

/// Decode a hex quality string, two digits per score, `0x` prefix optional.
pub fn decode_quality(
    value: &str,
) -> std::result::Result<Vec<u8>, String> {
    let hex = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")).unwrap_or(value);
    if hex.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", hex.len()))
    }
    (0..hex.len()).step_by(2)
        .map(|idx| {
            let pair = hex.get(idx..(idx + 2)).ok_or_else(|| "quality is not ASCII".to_string())?;
            u8::from_str_radix(pair, 16).map_err(|_| format!("'{}' is not a hex score", pair))
        })
        .collect()
}

fn set_sequence(info: &mut ContigInfo, _key: &str, value: &str) -> std::result::Result<(), String> {
    info.sequence = Some(value.to_string());
    Ok(())
}

fn set_lsequence(info: &mut ContigInfo, _key: &str, value: &str) -> std::result::Result<(), String> {
    info.lsequence = Some(value.to_string());
    Ok(())
}

fn set_quality(info: &mut ContigInfo, _key: &str, value: &str) -> std::result::Result<(), String> {
    info.quality = Some(decode_quality(value)?);
    Ok(())
}

fn set_asmbl_id(info: &mut ContigInfo, _key: &str, value: &str) -> std::result::Result<(), String> {
    info.asmbl_id = Some(value.to_string());
    Ok(())
}

fn set_read_count(info: &mut ContigInfo, _key: &str, value: &str) -> std::result::Result<(), String> {
    info.n_reads = Some(value.parse::<usize>().map_err(|_| format!("'{}' is not a read count", value))?);
    Ok(())
}

// Derived on output, only checked here.
fn check_decimal(_info: &mut ContigInfo, _key: &str, value: &str) -> std::result::Result<(), String> {
    if !value.is_empty() {
        value.parse::<f64>().map_err(|_| format!("'{}' is not a decimal number", value))?;
    }
    Ok(())
}

fn set_contig_text(info: &mut ContigInfo, key: &str, value: &str) -> std::result::Result<(), String> {
    if !value.is_empty() {
        info.metadata.insert(key.to_string(), value.to_string());
    }
    Ok(())
}

fn set_seq_name(info: &mut ReadInfo, _key: &str, value: &str) -> std::result::Result<(), String> {
    info.seq_name = Some(value.to_string());
    Ok(())
}

fn set_db(info: &mut ReadInfo, _key: &str, value: &str) -> std::result::Result<(), String> {
    info.db = value.to_string();
    Ok(())
}

fn set_read_coordinate(info: &mut ReadInfo, key: &str, value: &str) -> std::result::Result<(), String> {
    let position = value.parse::<i64>().map_err(|_| format!("'{}' is not a position", value))?;
    match key {
        "asm_lend" => info.asm_lend = Some(position),
        "asm_rend" => info.asm_rend = Some(position),
        "seq_lend" => info.seq_lend = Some(position),
        "seq_rend" => info.seq_rend = Some(position),
        _ => return Err(format!("'{}' is not a read coordinate", key)),
    }
    Ok(())
}

// 0-based gapped start of the read.
fn set_offset(info: &mut ReadInfo, _key: &str, value: &str) -> std::result::Result<(), String> {
    if !value.is_empty() {
        info.offset = Some(value.parse::<i64>().map_err(|_| format!("'{}' is not an offset", value))?);
    }
    Ok(())
}

fn set_read_text(info: &mut ReadInfo, key: &str, value: &str) -> std::result::Result<(), String> {
    if !value.is_empty() {
        info.metadata.insert(key.to_string(), value.to_string());
    }
    Ok(())
}

fn set_read_lsequence(info: &mut ReadInfo, _key: &str, value: &str) -> std::result::Result<(), String> {
    info.lsequence = Some(value.to_string());
    Ok(())
}

fn set_field<T>(
    fields: &[(&str, Setter<T>)],
    target: &mut T,
    key: &str,
    value: &str,
    line: usize,
) -> Result<()> {
    let (_, setter) = fields.iter()
        .find(|(name, _)| *name == key)
        .ok_or_else(|| Error::UnrecognizedField { line, field: key.to_string() })?;
    setter(target, key, value).map_err(|reason| Error::malformed(line, key, reason))
}

fn split_field(line: &str) -> (&str, &str) {
    match line.split_once('\t') {
        Some((key, value)) => (key.trim(), value.trim_end()),
        None => (line.trim(), ""),
    }
}

fn build_contig(
    info: ContigInfo,
) -> Result<(Contig, Option<usize>)> {
    let id = info.asmbl_id.filter(|x| !x.is_empty())
        .ok_or_else(|| Error::malformed(info.line, "asmbl_id", "contig has no asmbl_id"))?;
    let lsequence = info.lsequence
        .ok_or_else(|| Error::malformed(info.line, "lsequence", format!("contig {} has no lsequence", id)))?;

    let mut contig = Contig::new(&id, Seq::new(&id, &lsequence, 1, Strand::Forward));
    if let Some(sequence) = &info.sequence {
        if *sequence != contig.ungapped_consensus() {
            return Err(Error::malformed(info.line, "sequence", format!("contig {} sequence does not match lsequence without gaps", id)))
        }
    }
    if let Some(quality) = info.quality {
        if quality.len() != lsequence.len() {
            return Err(Error::malformed(info.line, "quality", format!("{} scores for {} lsequence positions", quality.len(), lsequence.len())))
        }
        contig.set_quality(Some(quality))?;
    }

    if !info.metadata.is_empty() {
        let mut tag = Tag::new(TIGR_CONTIG, Anchor::Contig);
        tag.attributes = info.metadata;
        contig.add_tag(tag)?;
    }
    Ok((contig, info.n_reads))
}

fn place_read(
    contig: &mut Contig,
    info: ReadInfo,
) -> Result<()> {
    let seq_name = info.seq_name
        .ok_or_else(|| Error::malformed(info.line, "seq_name", "read has no seq_name"))?;
    let lsequence = info.lsequence
        .ok_or_else(|| Error::malformed(info.line, "lsequence", format!("read {} has no lsequence", seq_name)))?;
    let (Some(lend), Some(rend)) = (info.asm_lend, info.asm_rend) else {
        return Err(Error::malformed(info.line, "asm_lend", format!("read {} has no asm_lend/asm_rend", seq_name)))
    };

    let id = join_read_id(&info.db, &seq_name);
    let strand = if rend < lend { Strand::Reverse } else { Strand::Forward };
    // asm_lend/asm_rend can't tell a gap column from the residue after it.
    let start = match info.offset {
        Some(offset) => offset + 1,
        None => contig.translate(&Frame::UngappedConsensus, &Frame::GappedConsensus, lend.min(rend))?,
    };
    let end = start + lsequence.len() as i64 - 1;
    contig.add_read(Seq::new(&id, &lsequence, 1, strand), Location::new(start, end, strand))?;

    if let (Some(seq_lend), Some(seq_rend)) = (info.seq_lend, info.seq_rend) {
        let frame = Frame::Aligned(id.clone());
        let mut tag = Tag::new(QUALITY_CLIPPING, Anchor::Read(id.clone()))
            .with_attribute("seq_lend", &seq_lend.to_string())
            .with_attribute("seq_rend", &seq_rend.to_string());
        let clip_start = contig.translate(&frame, &Frame::GappedConsensus, seq_lend.min(seq_rend));
        let clip_end = contig.translate(&frame, &Frame::GappedConsensus, seq_lend.max(seq_rend));
        match (clip_start, clip_end) {
            (Ok(clip_start), Ok(clip_end)) => tag = tag.with_location(Location::new(clip_start, clip_end, strand)),
            _ => log::debug!("Read {} clear range {}..{} is outside its aligned sequence", id, seq_lend, seq_rend),
        }
        contig.add_tag(tag)?;
    }

    if !info.metadata.is_empty() {
        let mut tag = Tag::new(TIGR_READ, Anchor::Read(id));
        tag.attributes = info.metadata;
        contig.add_tag(tag)?;
    }
    Ok(())
}

pub struct TigrParser<'a, R: Read> {
    lines: LineReader<'a, R>,
}

impl<'a, R: Read> TigrParser<'a, R> {
    pub fn new(
        conn: &'a mut R,
        _config: &Config,
    ) -> Self {
        TigrParser { lines: LineReader::new(conn) }
    }

    /// Parse the next contig, up to and including its `|` line.
    ///
    /// At end of input the contig in progress is returned, or None if
    /// nothing was read.
    pub fn next_unit(&mut self) -> Result<Option<AssemblyUnit>> {
        let mut contig = ContigInfo::default();
        let mut reads: Vec<ReadInfo> = Vec::new();
        let mut current: Option<ReadInfo> = None;
        let mut in_header = true;
        let mut seen_fields = false;

        while let Some(line) = self.lines.next_line()? {
            let line_no = self.lines.line_no();
            let trimmed = line.trim();
            if trimmed == "|" {
                reads.extend(current.take());
                if seen_fields {
                    return finish_unit(contig, reads).map(Some)
                }
                continue;
            }
            if trimmed.is_empty() {
                in_header = !seen_fields;
                reads.extend(current.take());
                continue;
            }

            if !seen_fields {
                contig.line = line_no;
                seen_fields = true;
            }
            let (key, value) = split_field(&line);
            if in_header {
                set_field(CONTIG_FIELDS, &mut contig, key, value, line_no)?;
            } else {
                let read = current.get_or_insert_with(|| ReadInfo { line: line_no, ..Default::default() });
                set_field(READ_FIELDS, read, key, value, line_no)?;
            }
        }

        reads.extend(current.take());
        if seen_fields {
            return finish_unit(contig, reads).map(Some)
        }
        Ok(None)
    }
}

impl<R: Read> Iterator for TigrParser<'_, R> {
    type Item = Result<AssemblyUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_unit().transpose()
    }
}

fn finish_unit(
    info: ContigInfo,
    reads: Vec<ReadInfo>,
) -> Result<AssemblyUnit> {
    let line = info.line;
    let (mut contig, declared) = build_contig(info)?;
    let n_reads = reads.len();
    for read in reads {
        place_read(&mut contig, read)?;
    }

    if let Some(declared) = declared {
        if declared != n_reads {
            return Err(Error::malformed(line, "seq#", format!("{} reads declared, {} found", declared, n_reads)))
        }
    }

    log::debug!("Read TIGR contig {} with {} reads", contig.id(), contig.n_reads());
    if declared.unwrap_or(n_reads) == 1 {
        Ok(AssemblyUnit::Singlet(contig))
    } else {
        Ok(AssemblyUnit::Contig(contig))
    }
}

/// Parse a whole TIGR file into a [Scaffold].
///
/// ## Usage
///
/// ```rust
/// use contigio::Config;
/// use contigio::parser::parse_tigr;
/// use std::io::Cursor;
///
/// let data = b"sequence\tACGT\nlsequence\tAC-GT\nasmbl_id\t7\nseq#\t1\n\nseq_name\tr1\nasm_lend\t1\nasm_rend\t4\nlsequence\tAC-GT\n|\n";
/// let mut input = Cursor::new(data.to_vec());
/// let scaffold = parse_tigr(&Config::default(), &mut input).unwrap();
///
/// assert_eq!(scaffold.singlets().count(), 1);
/// assert_eq!(scaffold.unit("7").unwrap().contig().ungapped_consensus(), "ACGT");
/// ```
///
pub fn parse_tigr<R: Read>(
    config: &Config,
    conn: &mut R,
) -> Result<Scaffold> {
    let mut scaffold = Scaffold::new();
    for unit in TigrParser::new(conn, config) {
        scaffold.push(unit?);
    }
    log::info!("Parsed {} contigs and {} singlets with {} reads", scaffold.contigs().count(), scaffold.singlets().count(), scaffold.read_count());
    Ok(scaffold)
}
