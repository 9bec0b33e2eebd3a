use std::env;
use std::net::SocketAddr;
use std::process;
use std::time::Duration;

use chrono_tz::Tz;
use getopts::Options;

pub struct Args {
    pub address: SocketAddr,
    pub upstream: String,
    pub timezone: Tz,
    pub cache_ttl: Duration,
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
        "Socket address (IP and port) to listen on [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "u",
        "upstream",
        "Base URL of the host serving schedule documents [Default: https://fosdem.org]",
        "URL",
    );
    opts.optopt(
        "z",
        "timezone",
        "Conference timezone used to interpret schedule times [Default: Europe/Brussels]",
        "TIMEZONE",
    );
    opts.optopt(
        "t",
        "cache-ttl",
        "Time-to-live for cached schedules [Default: 3600]",
        "SECONDS",
    );
    opts
}

pub fn parse(args: Vec<String>) -> Args {
    let opts = opts();

    let matches = match opts.parse(args) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", opts.usage(&opts.short_usage(env!("CARGO_PKG_NAME"))));
        process::exit(0);
    }

    let address = match matches.opt_get_default("address", SocketAddr::from(([127, 0, 0, 1], 8080)))
    {
        Ok(address) => address,
        Err(err) => {
            eprintln!("Provided value for option 'address' is invalid: {err}");
            process::exit(1);
        }
    };

    let upstream = matches
        .opt_str("upstream")
        .unwrap_or_else(|| "https://fosdem.org".into())
        .trim_end_matches('/')
        .to_owned();

    let timezone = match matches.opt_get_default("timezone", chrono_tz::Europe::Brussels) {
        Ok(timezone) => timezone,
        Err(err) => {
            eprintln!("Provided value for option 'timezone' is invalid: {err}");
            process::exit(1);
        }
    };

    let cache_ttl = match matches.opt_get_default("cache-ttl", 3600) {
        Ok(secs) => Duration::from_secs(secs),
        Err(err) => {
            eprintln!("Provided value for option 'cache-ttl' is invalid: {err}");
            process::exit(1);
        }
    };

    Args {
        address,
        upstream,
        timezone,
        cache_ttl,
    }
}
