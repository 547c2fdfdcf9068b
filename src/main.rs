use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{Context, Result};
use clap::ErrorKind;
use colored::*;
use log::{error, info};

use echoping::channel::IcmpSocket;
use echoping::config::{Config, ConfigError};
use echoping::session::ProbeSession;
use echoping::{logging, output, receive, resolve, transmit};

fn main() {
    let config = match Config::from_args(std::env::args_os()) {
        Ok(config) => config,
        Err(ConfigError::Usage(e)) => match e.kind {
            ErrorKind::HelpDisplayed | ErrorKind::VersionDisplayed => e.exit(),
            _ => {
                println!("{}", e.message);
                process::exit(1);
            }
        },
        Err(e) => fail(e.into()),
    };

    if let Err(e) = run(config) {
        fail(e);
    }
}

fn fail(e: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "error:".red().bold(), e);
    process::exit(1);
}

fn run(config: Config) -> Result<()> {
    let _logger = logging::initialize(config.verbosity).context("Error initializing logging")?;

    let target = resolve::resolve_dest(&config.destination)
        .with_context(|| format!("Error resolving destination {}", config.destination))?;

    let socket = IcmpSocket::open(config.ttl)
        .context("Error opening raw ICMP socket (root or CAP_NET_RAW required)")?;
    // Wake up at least once per interval so an interrupt is noticed
    socket.set_read_timeout(Some(config.interval))
        .context("Error setting socket read timeout")?;
    let socket = Arc::new(socket);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    }).context("Error setting Ctrl-C handler")?;

    println!("{}", output::banner(&target, config.payload_size));

    let mut session = ProbeSession::new(socket.clone(), target.addr, config.payload_size);
    let identifier = session.identifier();
    info!("probing {} every {:?} with identifier {}", target.addr, config.interval, identifier);

    let interval = config.interval;
    let r = running.clone();
    let transmitter = thread::Builder::new()
        .name("transmit".to_string())
        .spawn(move || transmit::transmit_loop(&mut session, interval, &r))
        .context("Error starting transmit thread")?;

    receive::receive_loop(&*socket, identifier, &running, config.interval, |reply| println!("{}", reply));

    if transmitter.join().is_err() {
        error!("transmit thread panicked");
    }
    info!("interrupted, exiting");
    Ok(())
}
