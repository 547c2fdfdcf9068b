use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::tick;
use log::{debug, warn};

use crate::channel::RawChannel;
use crate::session::ProbeSession;

/// Send one echo request right away, then one per `interval` tick until
/// `running` is cleared. Each tick's send runs to completion before the next
/// tick is awaited, so the session is never touched concurrently.
pub fn transmit_loop<C: RawChannel>(session: &mut ProbeSession<C>, interval: Duration, running: &AtomicBool) {
    let ticker = tick(interval);

    while running.load(Ordering::SeqCst) {
        match session.ping() {
            Ok(sequence) => debug!("sent icmp_seq={} to {}", sequence, session.destination()),
            // Best effort: a failed tick is reported and skipped
            Err(e) => warn!("Error sending ping to {}: {}", session.destination(), e),
        }

        if ticker.recv().is_err() {
            break;
        }
    }
}
