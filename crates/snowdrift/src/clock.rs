use crate::SNOWDRIFT_EPOCH;
use std::time::{SystemTime, UNIX_EPOCH};

/// A source of milliseconds elapsed since [`SNOWDRIFT_EPOCH`].
///
/// The engine performs no I/O other than reads through this trait, which
/// makes generation fully deterministic under a scripted implementation.
pub trait TimeSource {
    /// Returns the current time as milliseconds since [`SNOWDRIFT_EPOCH`].
    fn current_millis(&self) -> u64;
}

/// The production clock: a raw wall-clock read on every call.
///
/// This intentionally does *not* smooth the wall clock through a monotonic
/// proxy. Operating-system clock steps must stay visible so the engine can
/// reject rollback instead of silently reissuing timestamps it has already
/// used.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl TimeSource for SystemClock {
    fn current_millis(&self) -> u64 {
        // A system time before the epoch reads as 0, which the engine then
        // rejects as rollback once any ID has been issued.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .ok()
            .and_then(|now| now.checked_sub(SNOWDRIFT_EPOCH))
            .map_or(0, |elapsed| elapsed.as_millis() as u64)
    }
}
