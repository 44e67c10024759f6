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
use std::fs::File;
use std::io::BufWriter;
use std::io::Cursor;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use contigio::Config;
use contigio::Format;
use contigio::assembly::Scaffold;

mod cli;

type E = Box<dyn std::error::Error>;

/// Initializes the logger with verbosity given in `log_max_level`.
fn init_log(log_max_level: usize) {
    stderrlog::new()
    .module(module_path!())
    .quiet(false)
    .verbosity(log_max_level)
    .timestamp(stderrlog::Timestamp::Off)
    .init()
    .unwrap();
}

/// Read the whole input into memory, decompressing `.gz` files.
fn read_input(
    path: &Path,
) -> Result<Cursor<Vec<u8>>, E> {
    let file = File::open(path)?;
    let mut bytes: Vec<u8> = Vec::new();
    if path.extension().is_some_and(|x| x == "gz") {
        flate2::read::MultiGzDecoder::new(file).read_to_end(&mut bytes)?;
    } else {
        let mut file = file;
        file.read_to_end(&mut bytes)?;
    }
    log::debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(Cursor::new(bytes))
}

fn input_format(
    from: &Option<String>,
    bytes: &[u8],
) -> Result<Format, E> {
    match from {
        Some(name) => Ok(Format::from_str(name)?),
        None => {
            let format = contigio::guess_format(bytes).ok_or("Could not recognize the input format, use --from")?;
            log::info!("Input looks like {:?}", format);
            Ok(format)
        },
    }
}

fn read_scaffold(
    input_file: &PathBuf,
    from: &Option<String>,
    config: &Config,
) -> Result<Scaffold, E> {
    let mut conn_in = read_input(input_file)?;
    let format = input_format(from, conn_in.get_ref())?;
    Ok(contigio::parse_from_read(format, config, &mut conn_in)?)
}

fn convert(
    input_file: &PathBuf,
    out_file: &Option<PathBuf>,
    from: &Option<String>,
    to: &str,
    config: &Config,
) -> Result<(), E> {
    let out_format = Format::from_str(to)?;
    let scaffold = read_scaffold(input_file, from, config)?;

    match out_file {
        Some(path) => {
            let mut conn_out = BufWriter::new(File::create(path)?);
            contigio::print_to_write(out_format, config, &scaffold, &mut conn_out)?;
        },
        None => {
            let mut conn_out = BufWriter::new(std::io::stdout().lock());
            contigio::print_to_write(out_format, config, &scaffold, &mut conn_out)?;
        },
    }
    Ok(())
}

fn stats(
    input_file: &PathBuf,
    from: &Option<String>,
) -> Result<(), E> {
    let scaffold = read_scaffold(input_file, from, &Config::default())?;

    let mut conn_out = BufWriter::new(std::io::stdout().lock());
    conn_out.write_all(b"id\tkind\tgapped_length\tungapped_length\treads\tperc_N\tredundancy\n")?;
    for unit in scaffold.units() {
        let contig = unit.contig();
        let ungapped = contig.ungapped_consensus();
        let line = format!("{}\t{}\t{}\t{}\t{}\t{:.2}\t{:.2}\n",
                           contig.id(),
                           if unit.is_singlet() { "singlet" } else { "contig" },
                           contig.consensus().len(),
                           ungapped.len(),
                           contig.n_reads(),
                           contigio::printer::tigr::percent_ambiguous(ungapped.as_bytes()),
                           contigio::printer::tigr::redundancy(contig));
        conn_out.write_all(line.as_bytes())?;
    }
    conn_out.flush()?;
    Ok(())
}

fn main() {
    let cli = cli::Cli::parse();

    // Subcommands:
    let res = match &cli.command {
        // Convert
        Some(cli::Commands::Convert {
            input_file,
            out_file,
            from,
            to,
            line_width,
            default_quality,
            verbose,
        }) => {
            init_log(if *verbose { 2 } else { 1 });
            let config = Config { line_width: *line_width, default_quality: *default_quality, ..Config::default() };
            convert(input_file, out_file, from, to, &config)
        },

        // Stats
        Some(cli::Commands::Stats {
            input_file,
            from,
            verbose,
        }) => {
            init_log(if *verbose { 2 } else { 1 });
            stats(input_file, from)
        },
        None => {
            init_log(1);
            Err("No subcommand given, see --help".into())
        },
    };

    if let Err(e) = res {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
