//! Wall-time padding for network-exposed callers
//!
//! Identifier comparison and MAC verification are constant-time, but the
//! surrounding flow is not: a decode that corrects many errors costs more
//! than a clean one. API layers that expose verification over a network
//! pad the whole call to a fixed floor plus jitter so response timing
//! carries no signal.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::trace;

/// Pads a scope to a minimum wall time
///
/// Start before the guarded work, `finish` after it; the remainder of the
/// floor (plus a random slice of the jitter window) is slept away.
#[derive(Debug)]
pub struct TimingFloor {
    floor: Duration,
    jitter: Duration,
    started: Instant,
}

impl TimingFloor {
    /// Conventional floor for verification endpoints
    pub fn standard() -> Self {
        TimingFloor::start(Duration::from_millis(500), Duration::from_millis(50))
    }

    pub fn start(floor: Duration, jitter: Duration) -> Self {
        TimingFloor {
            floor,
            jitter,
            started: Instant::now(),
        }
    }

    /// Sleep out the remainder of the floor
    pub fn finish(self) {
        let jitter = if self.jitter.is_zero() {
            Duration::ZERO
        } else {
            let nanos = rand::thread_rng().gen_range(0..self.jitter.as_nanos() as u64);
            Duration::from_nanos(nanos)
        };
        let target = self.floor + jitter;
        let elapsed = self.started.elapsed();
        if elapsed < target {
            trace!(?elapsed, ?target, "padding response time");
            std::thread::sleep(target - elapsed);
        }
    }
}
