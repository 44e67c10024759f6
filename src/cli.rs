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
use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    // Convert between supported formats
    Convert {
        // Input file, may be gzipped
        #[arg(group = "input", required = true, help = "Input file")]
        input_file: PathBuf,

        // Output file path, defaults to stdout
        #[arg(short = 'o', long = "output", required = false)]
        out_file: Option<PathBuf>,

        // Input format, guessed from the first line if not given
        #[arg(long = "from", required = false, help = "Input format (ace, ace454, tigr)")]
        from: Option<String>,

        // Output format, defaults to ACE
        #[arg(long = "to", default_value = "ace", help = "Output format (ace, tigr)")]
        to: String,

        // Characters per line in ACE output
        #[arg(long = "line-width", default_value_t = 50)]
        line_width: usize,

        // Quality score for contigs without stored quality
        #[arg(long = "default-quality", default_value_t = 20)]
        default_quality: u8,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },

    // Per-contig summary as tab separated values
    Stats {
        // Input file, may be gzipped
        #[arg(group = "input", required = true, help = "Input file")]
        input_file: PathBuf,

        // Input format, guessed from the first line if not given
        #[arg(long = "from", required = false, help = "Input format (ace, ace454, tigr)")]
        from: Option<String>,

        // Verbosity
        #[arg(long = "verbose", default_value_t = false)]
        verbose: bool,
    },
}
