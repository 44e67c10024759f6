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
use std::io::Write;

use crate::Config;
use crate::assembly::tag::QUALITY_CLIPPING;
use crate::assembly::tag::TIGR_CONTIG;
use crate::assembly::tag::TIGR_READ;
use crate::assembly::Contig;
use crate::assembly::PlacedRead;
use crate::assembly::Strand;
use crate::assembly::GAP;
use crate::coords::Frame;
use crate::errors::Result;
use crate::parser::tigr::contig_keys;
use crate::parser::tigr::read_keys;
use crate::parser::tigr::split_read_id;

// IUPAC ambiguity codes and the any-base symbols.
const AMBIGUOUS: &[u8] = b"NXRYKMSWBDHV";

/// Percentage of ambiguous bases in an ungapped sequence.
///
/// Lowercase letters and IUPAC ambiguity codes count as ambiguous.
///
/// ```rust
/// use contigio::printer::tigr::percent_ambiguous;
///
/// assert_eq!(percent_ambiguous(b"acgtACGT"), 50.0);
/// assert_eq!(percent_ambiguous(b"ACGN"), 25.0);
/// ```
pub fn percent_ambiguous(
    ungapped: &[u8],
) -> f64 {
    if ungapped.is_empty() {
        return 0.0
    }
    let n = ungapped.iter()
        .filter(|base| base.is_ascii_lowercase() || AMBIGUOUS.contains(&base.to_ascii_uppercase()))
        .count();
    100.0 * n as f64 / ungapped.len() as f64
}

/// Mean read depth of `contig`.
///
/// The sum of read lengths minus the gaps a read carries at consensus gap
/// columns it spans, divided by the ungapped consensus length.
pub fn redundancy(
    contig: &Contig,
) -> f64 {
    let ungapped_len = contig.gap_map().ungapped_len();
    if ungapped_len == 0 {
        return 0.0
    }
    let total: usize = contig.reads().map(|placed| placed.read.len()).sum();
    let respected: usize = contig.consensus().bytes().iter().enumerate()
        .filter(|(_, base)| **base == GAP)
        .map(|(idx, _)| {
            let column = idx as i64 + 1;
            contig.reads()
                .filter(|placed| placed.anchor.contains(column))
                .filter(|placed| placed.read.is_gap_at(column - placed.anchor.start + 1))
                .count()
        })
        .sum();
    (total.saturating_sub(respected)) as f64 / ungapped_len as f64
}

/// Hex encoding of quality scores, two uppercase digits each with a `0x` prefix.
pub fn encode_quality(
    quality: &[u8],
) -> String {
    let mut out = String::with_capacity(2 + 2 * quality.len());
    out.push_str("0x");
    quality.iter().for_each(|score| out.push_str(&format!("{:02X}", score)));
    out
}

// Ordered pair, (hi, lo) for reverse reads.
fn oriented(
    a: i64,
    b: i64,
    strand: Strand,
) -> (i64, i64) {
    let (lo, hi) = (a.min(b), a.max(b));
    match strand {
        Strand::Forward => (lo, hi),
        Strand::Reverse => (hi, lo),
    }
}

fn clear_range(
    contig: &Contig,
    placed: &PlacedRead,
) -> Result<(i64, i64)> {
    let id = placed.read.id();
    let Some(tag) = contig.read_tag(id, QUALITY_CLIPPING) else {
        return Ok((1, placed.read.len() as i64))
    };
    if let Some(location) = tag.location {
        let frame = Frame::Aligned(id.to_string());
        let start = contig.translate(&Frame::GappedConsensus, &frame, location.start)?;
        let end = contig.translate(&Frame::GappedConsensus, &frame, location.end)?;
        return Ok((start, end))
    }
    let lend = tag.attribute("seq_lend").and_then(|x| x.parse::<i64>().ok());
    let rend = tag.attribute("seq_rend").and_then(|x| x.parse::<i64>().ok());
    match (lend, rend) {
        (Some(lend), Some(rend)) => Ok((lend, rend)),
        _ => Ok((1, placed.read.len() as i64)),
    }
}

fn format_read<W: Write>(
    contig: &Contig,
    placed: &PlacedRead,
    conn: &mut W,
) -> Result<()> {
    let id = placed.read.id();
    let (db, seq_name) = split_read_id(id);
    let strand = placed.anchor.strand;
    let lend = contig.gap_map().to_ungapped(placed.anchor.start)?;
    let rend = contig.gap_map().last_residue_at(placed.anchor.end)?;
    let (asm_lend, asm_rend) = oriented(lend, rend, strand);
    let (start, end) = clear_range(contig, placed)?;
    let (seq_lend, seq_rend) = oriented(start, end, strand);
    let metadata = contig.read_tag(id, TIGR_READ);

    conn.write_all(b"\n")?;
    for key in read_keys() {
        let value = match key {
            "seq_name" => seq_name.to_string(),
            "asm_lend" => asm_lend.to_string(),
            "asm_rend" => asm_rend.to_string(),
            "seq_lend" => seq_lend.to_string(),
            "seq_rend" => seq_rend.to_string(),
            "db" => db.to_string(),
            "offset" => (placed.anchor.start - 1).to_string(),
            "lsequence" => placed.read.sequence().to_string(),
            _ => metadata.and_then(|tag| tag.attribute(key)).unwrap_or_default().to_string(),
        };
        conn.write_all(format!("{}\t{}\n", key, value).as_bytes())?;
    }
    Ok(())
}

/// Write one contig or singlet as a tasm block, ending with `|`.
///
/// `seq#`, `redundancy` and `perc_N` are computed from the contig. Reads
/// must lie within the consensus since their ends are written in ungapped
/// consensus coordinates.
///
/// ## Usage
///
/// ```rust
/// use contigio::Config;
/// use contigio::assembly::{Contig, Location, Seq, Strand};
/// use contigio::printer::tigr::format_tigr_unit;
///
/// let mut contig = Contig::new("7", Seq::new("7", "AC-GT", 1, Strand::Forward));
/// contig.add_read(Seq::new("r1", "AC-GT", 1, Strand::Forward), Location::new(1, 5, Strand::Forward)).unwrap();
///
/// let mut out: Vec<u8> = Vec::new();
/// format_tigr_unit(&contig, &Config::default(), &mut out).unwrap();
/// let text = String::from_utf8(out).unwrap();
///
/// assert!(text.starts_with("sequence\tACGT\nlsequence\tAC-GT\nquality\t0x1414141414\nasmbl_id\t7\n"));
/// assert!(text.contains("redundancy\t1.00\nperc_N\t0.00\nseq#\t1\n"));
/// assert!(text.ends_with("lsequence\tAC-GT\n|\n"));
/// ```
///
pub fn format_tigr_unit<W: Write>(
    contig: &Contig,
    config: &Config,
    conn: &mut W,
) -> Result<()> {
    let ungapped = contig.ungapped_consensus();
    let metadata = contig.tags_by_class(TIGR_CONTIG).next();

    for key in contig_keys() {
        let value = match key {
            "sequence" => ungapped.clone(),
            "lsequence" => contig.consensus().sequence().to_string(),
            "quality" => encode_quality(&contig.quality_or(config.default_quality)),
            "asmbl_id" => contig.id().to_string(),
            "redundancy" => format!("{:.2}", redundancy(contig)),
            "perc_N" => format!("{:.2}", percent_ambiguous(ungapped.as_bytes())),
            "seq#" => contig.n_reads().to_string(),
            _ => metadata.and_then(|tag| tag.attribute(key)).unwrap_or_default().to_string(),
        };
        conn.write_all(format!("{}\t{}\n", key, value).as_bytes())?;
    }

    for placed in contig.reads() {
        format_read(contig, placed, conn)?;
    }
    conn.write_all(b"|\n")?;
    Ok(())
}

// Tests
#[cfg(test)]
mod tests {

    fn contig() -> crate::assembly::Contig {
        use crate::assembly::tag::{QUALITY_CLIPPING, TIGR_CONTIG, TIGR_READ};
        use crate::assembly::{Anchor, Contig, Location, Seq, Strand, Tag};

        let mut contig = Contig::new("101", Seq::new("101", "ACG-TAC", 1, Strand::Forward));
        contig.set_quality(Some(vec![30, 30, 30, 0, 30, 30, 30])).unwrap();
        contig.add_read(Seq::new("GB|r1", "ACG-T", 1, Strand::Forward), Location::new(1, 5, Strand::Forward)).unwrap();
        contig.add_read(Seq::new("r2", "G-TAC", 1, Strand::Reverse), Location::new(3, 7, Strand::Reverse)).unwrap();
        contig.add_tag(Tag::new(QUALITY_CLIPPING, Anchor::Read("r2".to_string())).with_location(Location::new(3, 7, Strand::Reverse))).unwrap();
        contig.add_tag(Tag::new(TIGR_READ, Anchor::Read("GB|r1".to_string())).with_attribute("best", "1")).unwrap();
        contig.add_tag(Tag::new(TIGR_CONTIG, Anchor::Contig).with_attribute("com_name", "some gene")).unwrap();
        contig
    }

    #[test]
    fn format_unit() {
        use super::format_tigr_unit;
        use crate::Config;

        let mut expected: Vec<u8> = Vec::new();
        expected.append(&mut b"sequence\tACGTAC\nlsequence\tACG-TAC\nquality\t0x1E1E1E001E1E1E\nasmbl_id\t101\n".to_vec());
        expected.append(&mut b"seq_id\t\ncom_name\tsome gene\ntype\t\nmethod\t\ned_status\t\n".to_vec());
        expected.append(&mut b"redundancy\t1.33\nperc_N\t0.00\nseq#\t2\n".to_vec());
        expected.append(&mut b"full_cds\t\ncds_start\t\ncds_end\t\ned_pn\t\ned_date\t\ncomment\t\nframeshift\t\n".to_vec());
        expected.append(&mut b"\nseq_name\tr1\nasm_lend\t1\nasm_rend\t4\nseq_lend\t1\nseq_rend\t5\nbest\t1\ncomment\t\ndb\tGB\noffset\t0\nlsequence\tACG-T\n".to_vec());
        expected.append(&mut b"\nseq_name\tr2\nasm_lend\t6\nasm_rend\t3\nseq_lend\t5\nseq_rend\t1\nbest\t\ncomment\t\ndb\t\noffset\t2\nlsequence\tG-TAC\n".to_vec());
        expected.append(&mut b"|\n".to_vec());

        let mut got: Vec<u8> = Vec::new();
        format_tigr_unit(&contig(), &Config::default(), &mut got).unwrap();

        assert_eq!(String::from_utf8(got).unwrap(), String::from_utf8(expected).unwrap());
    }

    #[test]
    fn redundancy_discounts_respected_gaps() {
        use super::redundancy;

        // 10 read characters, 2 of them gaps at the consensus gap column.
        let got = redundancy(&contig());

        assert_eq!(format!("{:.2}", got), "1.33");
    }

    #[test]
    fn percent_ambiguous_mixed_case() {
        use super::percent_ambiguous;

        assert_eq!(format!("{:.2}", percent_ambiguous(b"acgtACGT")), "50.00");
        assert_eq!(format!("{:.2}", percent_ambiguous(b"RYKM")), "100.00");
        assert_eq!(percent_ambiguous(b""), 0.0);
    }

    #[test]
    fn encode_quality_uppercase_hex() {
        use super::encode_quality;

        assert_eq!(encode_quality(&[10, 30, 255, 0]), "0x0A1EFF00");
        assert_eq!(encode_quality(&[]), "0x");
    }

    #[test]
    fn read_ending_on_gap_column() {
        use super::format_tigr_unit;
        use crate::Config;
        use crate::assembly::{Contig, Location, Seq, Strand};

        let mut contig = Contig::new("1", Seq::new("1", "ACG-TAC", 1, Strand::Forward));
        contig.add_read(Seq::new("r1", "ACG-", 1, Strand::Forward), Location::new(1, 4, Strand::Forward)).unwrap();
        contig.add_read(Seq::new("r2", "-TAC", 1, Strand::Reverse), Location::new(4, 7, Strand::Reverse)).unwrap();

        let mut out: Vec<u8> = Vec::new();
        format_tigr_unit(&contig, &Config::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("\nseq_name\tr1\nasm_lend\t1\nasm_rend\t3\n"));
        assert!(text.contains("\nseq_name\tr2\nasm_lend\t6\nasm_rend\t4\n"));
    }

    #[test]
    fn overhanging_read_is_out_of_range() {
        use super::format_tigr_unit;
        use crate::Config;
        use crate::assembly::{Contig, Location, Seq, Strand};
        use crate::errors::Error;

        let mut contig = Contig::new("1", Seq::new("1", "ACGT", 1, Strand::Forward));
        contig.add_read(Seq::new("r1", "TTACGT", 1, Strand::Forward), Location::new(-1, 4, Strand::Forward)).unwrap();

        let mut out: Vec<u8> = Vec::new();
        let got = format_tigr_unit(&contig, &Config::default(), &mut out);

        assert!(matches!(got, Err(Error::OutOfRange { .. })));
    }
}
