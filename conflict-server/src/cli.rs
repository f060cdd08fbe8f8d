use std::env;
use std::net::SocketAddr;
use std::process;

use conflict_parser::InvalidDatePolicy;
use getopts::Options;
use tokio::time::Duration;

use crate::source::Source;

const ADDRESS_VAR: &str = "CONFLICT_SERVER_ADDR";

pub struct Args {
    pub address: SocketAddr,
    pub calendar: Source,
    pub lunchtime: Source,
    pub year: Option<i32>,
    pub refresh: Option<Duration>,
    pub on_invalid_date: InvalidDatePolicy,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Default: $CONFLICT_SERVER_ADDR or 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "c",
        "calendar",
        "School calendar document, a path or an http(s) URL [Default: calendar.docx]",
        "SOURCE",
    );
    opts.optopt(
        "l",
        "lunchtime",
        "Lunchtime activity calendar document, a path or an http(s) URL [Default: lunchtimecalendar.docx]",
        "SOURCE",
    );
    opts.optopt(
        "y",
        "year",
        "Year the calendars start in [Default: the current year]",
        "YEAR",
    );
    opts.optopt(
        "r",
        "refresh",
        "Seconds between calendar reloads, 0 to load only at startup [Default: 3600]",
        "SECONDS",
    );
    opts.optflag(
        "s",
        "strict-dates",
        "Reject a whole calendar when a cell names a date that does not exist [Default: skip the cell]",
    );
    opts
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("{message}");
    process::exit(1);
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(err) => fail(err),
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
        process::exit(0);
    }

    let default_address = match env::var(ADDRESS_VAR) {
        Ok(value) => match value.parse() {
            Ok(address) => address,
            Err(err) => fail(format!("Failed to parse `{ADDRESS_VAR}` environment variable: {err}")),
        },
        Err(_) => SocketAddr::from(([127, 0, 0, 1], 8080)),
    };

    let address = match matches.opt_get_default("address", default_address) {
        Ok(address) => address,
        Err(err) => fail(format!("Provided value for option 'address' is invalid: {err}")),
    };

    let calendar = match matches.opt_get_default("calendar", Source::path("calendar.docx")) {
        Ok(source) => source,
        Err(err) => fail(format!("Provided value for option 'calendar' is invalid: {err}")),
    };

    let lunchtime = match matches.opt_get_default("lunchtime", Source::path("lunchtimecalendar.docx")) {
        Ok(source) => source,
        Err(err) => fail(format!("Provided value for option 'lunchtime' is invalid: {err}")),
    };

    let year = match matches.opt_get::<i32>("year") {
        Ok(year) => year,
        Err(err) => fail(format!("Provided value for option 'year' is invalid: {err}")),
    };

    let refresh = match matches.opt_get_default("refresh", 3600) {
        Ok(0) => None,
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(err) => fail(format!("Provided value for option 'refresh' is invalid: {err}")),
    };

    let on_invalid_date = if matches.opt_present("strict-dates") {
        InvalidDatePolicy::Abort
    } else {
        InvalidDatePolicy::Skip
    };

    Args {
        address,
        calendar,
        lunchtime,
        year,
        refresh,
        on_invalid_date,
    }
}
