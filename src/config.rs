use std::ffi::OsString;
use std::time::Duration;

use clap::{App, AppSettings, Arg, ArgMatches};
use thiserror::Error;

use crate::packet::DEFAULT_PAYLOAD_SIZE;

/// 65535 minus the 20 byte IP header and the 8 byte ICMP header
pub const MAX_PAYLOAD_SIZE: usize = 65507;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub destination: String,
    pub interval: Duration,
    pub payload_size: usize,
    pub ttl: Option<u32>,
    pub verbosity: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Usage(clap::Error),
    #[error("invalid interval {0:?} (ex: 1s, 400ms, 1m): {1}")]
    Interval(String, humantime::DurationError),
    #[error("interval must be greater than zero")]
    ZeroInterval,
    #[error("invalid packet size {0:?} (0 to 65507)")]
    PacketSize(String),
    #[error("invalid ttl {0:?} (1 to 255)")]
    Ttl(String),
}

fn app() -> App<'static, 'static> {
    App::new("echoping")
        .setting(AppSettings::ColoredHelp)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Send ICMP ECHO_REQUEST packets to an IPv4 host and print the replies as they arrive.")
        .arg(Arg::with_name("DESTINATION")
            .help("Hostname or IPv4 address")
            .required(true)
            .index(1))
        .arg(Arg::with_name("interval")
            .help("Set how long to wait in between pings (Default 1s)")
            .short("i")
            .takes_value(true))
        .arg(Arg::with_name("packetsize")
            .help("Number of data bytes after the ICMP header (Default 56)")
            .short("s")
            .takes_value(true))
        .arg(Arg::with_name("ttl")
            .help("Set ttl on outgoing packets")
            .short("t")
            .takes_value(true))
        .arg(Arg::with_name("verbose")
            .help("Log more (repeat for debug and trace output)")
            .short("v")
            .multiple(true))
}

impl Config {
    pub fn from_args<I, T>(args: I) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = app().get_matches_from_safe(args).map_err(ConfigError::Usage)?;
        Self::from_matches(&matches)
    }

    fn from_matches(matches: &ArgMatches) -> Result<Config, ConfigError> {
        // Required by clap, so always present here
        let destination = matches.value_of("DESTINATION").unwrap_or_default().to_string();

        let interval = matches.value_of("interval").unwrap_or("1s");
        let interval = humantime::parse_duration(interval)
            .map_err(|e| ConfigError::Interval(interval.to_string(), e))?;
        if interval == Duration::from_secs(0) {
            return Err(ConfigError::ZeroInterval);
        }

        let payload_size = match matches.value_of("packetsize") {
            Some(size) => size.parse::<usize>()
                .ok()
                .filter(|size| *size <= MAX_PAYLOAD_SIZE)
                .ok_or_else(|| ConfigError::PacketSize(size.to_string()))?,
            None => DEFAULT_PAYLOAD_SIZE,
        };

        let ttl = match matches.value_of("ttl") {
            Some(ttl) => Some(ttl.parse::<u8>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .ok_or_else(|| ConfigError::Ttl(ttl.to_string()))? as u32),
            None => None,
        };

        Ok(Config {
            destination,
            interval,
            payload_size,
            ttl,
            verbosity: matches.occurrences_of("verbose"),
        })
    }
}
