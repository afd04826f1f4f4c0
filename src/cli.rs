use clap::{App, Arg};

// Exit codes for the different failure classes
pub const ERR_TRACE_READ: i32 = 1;
pub const ERR_TRACE_PARSE: i32 = 2;
pub const ERR_SEMANTIC: i32 = 3;

pub fn configure_cli() -> clap::App<'static, 'static> {
    App::new("openpar semantic replay")
        .version("0.4.0")
        .about("Replays a JSON directive-event trace through the parallel-pragma semantic engine")
        .arg(
            Arg::with_name("input")
                .short("i")
                .long("input")
                .takes_value(true)
                .required(true)
                .help("Trace file to replay"),
        )
        .arg(
            Arg::with_name("log")
                .long("log")
                .takes_value(true)
                .possible_values(&["debug", "info", "error"])
                .help("Enable engine logging at the given level"),
        )
        .arg(
            Arg::with_name("quiet")
                .short("q")
                .long("quiet")
                .help("Suppress the per-diagnostic listing, print only the summary"),
        )
}

pub fn get_log_level(args: &clap::ArgMatches) -> Option<log::LevelFilter> {
    args.value_of("log").map(|level| match level {
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        _ => log::LevelFilter::Error,
    })
}

pub fn configure_logging(level: log::LevelFilter) -> Result<(), log::SetLoggerError> {
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )
}
