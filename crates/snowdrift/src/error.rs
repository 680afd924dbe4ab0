use core::time::Duration;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All failures the generation engine can surface.
///
/// The variants are deliberately distinguishable so a front end can map
/// them to status classes without string matching: [`Error::Configuration`]
/// is startup-fatal, [`Error::RejectedCaller`] is a client fault, and the
/// clock-safety variants are node-internal server faults.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A node identity component was outside the valid range. Detected once
    /// at construction, never per request.
    #[error("invalid {field}: {value} is outside [1, {max}]", max = crate::MAX_NODE_ID)]
    Configuration {
        /// Which component was out of range.
        field: &'static str,
        /// The offending value.
        value: u64,
    },

    /// The agent policy refused the caller's identity string. No sequence
    /// state was touched and no timestamp was consumed.
    #[error("caller identity disallowed")]
    RejectedCaller,

    /// The clock reported a time earlier than the last issued timestamp.
    /// The engine never waits a backward step out: the size of the step is
    /// unbounded, so the fault is surfaced for the operator to route around.
    #[error("clock moved backwards by {drift_ms} ms")]
    ClockRollback {
        /// Magnitude of the observed backward step, in milliseconds.
        drift_ms: u64,
    },

    /// The clock failed to advance while the engine waited out an exhausted
    /// millisecond. Only a faulty time source can trigger this: the wait is
    /// bounded well above one millisecond.
    #[error("clock stalled for {waited:?} while waiting for the next millisecond")]
    ClockStalled {
        /// How long the engine waited before giving up.
        waited: Duration,
    },

    /// The offset from the epoch no longer fits the timestamp field. This
    /// bounds the deployment's operating lifetime and is surfaced rather
    /// than silently wrapped.
    #[error(
        "timestamp offset {offset_ms} ms exceeds the {bits}-bit field",
        bits = crate::TIMESTAMP_BITS
    )]
    TimestampOverflow {
        /// The measured offset that overflowed.
        offset_ms: u64,
    },
}
