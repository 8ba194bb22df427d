//! CLI argument handling.

use crate::analysis::Analysis;
use crate::cli::dis;
use clap::{App, Arg};
use std::io;

pub fn main() -> io::Result<()> {
    let matches = App::new("snesdis")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Static analyzer and disassembler for 65816 ROM images")
        .arg(
            Arg::with_name("ROM")
                .help("The ROM image to analyze")
                .required(true),
        )
        .arg(
            Arg::with_name("project")
                .long("project")
                .value_name("FILE")
                .takes_value(true)
                .help("Project file with user metadata to load before the run"),
        )
        .arg(
            Arg::with_name("save-project")
                .long("save-project")
                .value_name("FILE")
                .takes_value(true)
                .help("Write user metadata to FILE after the run"),
        )
        .get_matches();

    let rom_path = matches
        .value_of("ROM")
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no ROM path given"))?;

    let mut analysis = Analysis::from_path(rom_path)?;

    match matches.value_of("project") {
        Some(project_path) => analysis.load(project_path)?,
        None => analysis.run(),
    }

    let stdout = io::stdout();
    dis::write_disassembly(&analysis, &mut stdout.lock())?;

    if let Some(save_path) = matches.value_of("save-project") {
        analysis.save(save_path)?;
    }

    Ok(())
}
