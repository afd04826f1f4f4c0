extern crate log;
extern crate simplelog;

use std::fs::File;
use std::process::exit;

use openpar::cli::{
    configure_cli, configure_logging, get_log_level, ERR_SEMANTIC, ERR_TRACE_PARSE,
    ERR_TRACE_READ,
};
use openpar::trace::{replay, Trace};

fn main() {
    let config = configure_cli().get_matches();

    if let Some(level) = get_log_level(&config) {
        configure_logging(level).expect("Failed to configure logger.")
    }

    let input = config
        .value_of("input")
        .expect("Expected a trace file to replay");
    let file = match File::open(input) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Could not open {}: {}", input, e);
            exit(ERR_TRACE_READ);
        }
    };
    let trace: Trace = match serde_json::from_reader(file) {
        Ok(t) => t,
        Err(e) => {
            eprintln!("Could not parse {}: {}", input, e);
            exit(ERR_TRACE_PARSE);
        }
    };

    let (sema, outcome) = replay(&trace);

    if !config.is_present("quiet") {
        for diag in sema.reporter().diagnostics() {
            let marker = if diag.kind.is_note() { "note" } else { "error" };
            println!("{} at {}: {:?}", marker, diag.span, diag.kind);
        }
    }
    println!(
        "{} diagnostics ({} errors), {} directives failed",
        outcome.diagnostics, outcome.errors, outcome.failed_directives
    );

    if outcome.errors > 0 || outcome.failed_directives > 0 {
        exit(ERR_SEMANTIC);
    }
}
