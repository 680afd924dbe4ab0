use crate::{
    AgentPolicy, AllowAll, EngineMetrics, Error, MAX_SEQUENCE, MAX_TIMESTAMP, MetricsSnapshot,
    NodeIdentity, Result, SnowdriftId, SystemClock, TimeSource,
};
use parking_lot::Mutex;
use std::time::{Duration, Instant};

/// Upper bound on the sequence-exhaustion wait. The wait normally completes
/// in under a millisecond; anything near this bound means the time source
/// is not advancing.
const SEQUENCE_WAIT_BOUND: Duration = Duration::from_millis(10);

/// The engine's only mutable data: the last millisecond an ID was issued
/// for, and the position within that millisecond.
///
/// Never persisted. A restart resets it, which is safe as long as the clock
/// moves forward across restarts.
#[derive(Debug, Clone, Copy, Default)]
struct SequenceState {
    last_timestamp: u64,
    sequence: u64,
}

/// The ID generation engine.
///
/// One instance per process, shared freely across threads. All generation
/// flows through a single critical section over the sequence state; no
/// finer-grained locking is safe, because splitting the read-check-write of
/// the timestamp and sequence would reintroduce duplicate IDs.
///
/// The clock source and agent policy are injected at construction, which is
/// what makes the clock-safety paths testable without real time.
pub struct IdEngine<C = SystemClock, P = AllowAll>
where
    C: TimeSource,
    P: AgentPolicy,
{
    node: NodeIdentity,
    clock: C,
    policy: P,
    state: Mutex<SequenceState>,
    metrics: EngineMetrics,
}

impl IdEngine {
    /// Creates an engine with the production clock and the allow-all
    /// policy.
    pub fn new(node: NodeIdentity) -> Self {
        Self::with_parts(node, SystemClock, AllowAll)
    }
}

impl<C, P> IdEngine<C, P>
where
    C: TimeSource,
    P: AgentPolicy,
{
    /// Creates an engine with an explicit clock source and agent policy.
    pub fn with_parts(node: NodeIdentity, clock: C, policy: P) -> Self {
        Self {
            node,
            clock,
            policy,
            state: Mutex::new(SequenceState::default()),
            metrics: EngineMetrics::default(),
        }
    }

    /// The identity this engine stamps into every ID.
    pub fn node(&self) -> NodeIdentity {
        self.node
    }

    /// Snapshot of the engine's gauges and counters.
    pub fn metrics(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            datacenter_id: self.node.datacenter_id(),
            worker_id: self.node.worker_id(),
            ids_issued: self.metrics.ids_issued(),
            rollback_rejections: self.metrics.rollback_rejections(),
            exhaustion_waits: self.metrics.exhaustion_waits(),
        }
    }

    /// Generates the next ID.
    ///
    /// `caller` is the opaque identity string the front end extracted from
    /// the request (if any); it is only ever shown to the agent policy.
    ///
    /// IDs returned from one engine are unique and non-decreasing. The only
    /// blocking path is the sequence-exhaustion wait, bounded to roughly
    /// ten milliseconds; the lock is held across that wait, which is the
    /// simplest design that keeps the whole read-check-commit atomic and
    /// costs other callers at most slightly over one millisecond in the
    /// healthy case.
    ///
    /// # Errors
    ///
    /// - [`Error::RejectedCaller`] if the policy refuses `caller`. No state
    ///   is read and no timestamp is consumed.
    /// - [`Error::ClockRollback`] if the clock reports a time earlier than
    ///   the last issued timestamp. State is left untouched; the engine
    ///   never guesses a corrected time or waits the drift out.
    /// - [`Error::ClockStalled`] if the clock fails to advance during an
    ///   exhaustion wait. State is left untouched, so a retry after the
    ///   clock recovers cannot reuse an already-issued sequence number.
    /// - [`Error::TimestampOverflow`] if the epoch offset no longer fits
    ///   the timestamp field.
    pub fn next_id(&self, caller: Option<&str>) -> Result<u64> {
        if !self.policy.is_allowed(caller) {
            return Err(Error::RejectedCaller);
        }

        let mut state = self.state.lock();
        let mut now = self.clock.current_millis();

        if now < state.last_timestamp {
            self.metrics.record_rollback();
            return Err(Error::ClockRollback {
                drift_ms: state.last_timestamp - now,
            });
        }

        if now == state.last_timestamp {
            let next = (state.sequence + 1) & MAX_SEQUENCE;
            if next == 0 {
                // This millisecond is spent. Wait for the next one before
                // committing anything, so a stalled clock leaves the state
                // exactly as it was.
                self.metrics.record_exhaustion_wait();
                now = self.wait_for_next_millis(now)?;
                state.sequence = 0;
            } else {
                state.sequence = next;
            }
        } else {
            state.sequence = 0;
        }
        state.last_timestamp = now;

        if now > MAX_TIMESTAMP {
            return Err(Error::TimestampOverflow { offset_ms: now });
        }

        let id = SnowdriftId::from_parts(
            now,
            self.node.datacenter_id(),
            self.node.worker_id(),
            state.sequence,
        );
        self.metrics.record_issued();
        Ok(id.to_u64())
    }

    /// Spins until the clock reports a millisecond strictly greater than
    /// `last`. Runs with the state lock held.
    fn wait_for_next_millis(&self, last: u64) -> Result<u64> {
        let started = Instant::now();
        loop {
            let now = self.clock.current_millis();
            if now > last {
                return Ok(now);
            }
            let waited = started.elapsed();
            if waited > SEQUENCE_WAIT_BOUND {
                return Err(Error::ClockStalled { waited });
            }
            core::hint::spin_loop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserAgentPolicy;
    use core::cell::Cell;
    use std::collections::HashSet;
    use std::sync::Mutex as StdMutex;
    use std::thread;

    /// Always reports the same millisecond.
    struct FixedClock(u64);

    impl TimeSource for FixedClock {
        fn current_millis(&self) -> u64 {
            self.0
        }
    }

    /// Replays a script of readings, then repeats the last one.
    struct ScriptedClock {
        values: Vec<u64>,
        index: Cell<usize>,
    }

    impl ScriptedClock {
        fn new(values: Vec<u64>) -> Self {
            Self {
                values,
                index: Cell::new(0),
            }
        }
    }

    impl TimeSource for ScriptedClock {
        fn current_millis(&self) -> u64 {
            let i = self.index.get();
            self.index.set((i + 1).min(self.values.len() - 1));
            self.values[i]
        }
    }

    /// Reports `t` for the first `flip_after` readings, then `t + 1`.
    struct FlipClock {
        t: u64,
        reads: Cell<u64>,
        flip_after: u64,
    }

    impl TimeSource for FlipClock {
        fn current_millis(&self) -> u64 {
            let reads = self.reads.get() + 1;
            self.reads.set(reads);
            if reads > self.flip_after { self.t + 1 } else { self.t }
        }
    }

    fn node() -> NodeIdentity {
        NodeIdentity::new(1, 1).unwrap()
    }

    #[test]
    fn three_calls_across_a_tick_boundary() {
        let clock = ScriptedClock::new(vec![42, 42, 43]);
        let engine = IdEngine::with_parts(node(), clock, AllowAll);

        let ids: Vec<SnowdriftId> = (0..3)
            .map(|_| SnowdriftId::from_u64(engine.next_id(None).unwrap()))
            .collect();

        assert_eq!(ids[0].timestamp, 42);
        assert_eq!(ids[1].timestamp, 42);
        assert_eq!(ids[2].timestamp, 43);
        assert_eq!(ids[0].sequence, 0);
        assert_eq!(ids[1].sequence, 1);
        assert_eq!(ids[2].sequence, 0);
        for id in &ids {
            assert_eq!(id.datacenter_id, 1);
            assert_eq!(id.worker_id, 1);
        }
    }

    #[test]
    fn sequence_exhaustion_advances_the_timestamp() {
        let per_ms = MAX_SEQUENCE + 1;
        // One reading per issued ID, then the exhausted call reads once
        // more before the flip lets it through.
        let clock = FlipClock {
            t: 42,
            reads: Cell::new(0),
            flip_after: per_ms + 1,
        };
        let engine = IdEngine::with_parts(node(), clock, AllowAll);

        let first = SnowdriftId::from_u64(engine.next_id(None).unwrap());
        assert_eq!(first.timestamp, 42);
        for expected_seq in 1..per_ms {
            let id = SnowdriftId::from_u64(engine.next_id(None).unwrap());
            assert_eq!(id.timestamp, 42);
            assert_eq!(id.sequence, expected_seq);
        }

        let next = SnowdriftId::from_u64(engine.next_id(None).unwrap());
        assert_eq!(next.timestamp, 43);
        assert_eq!(next.sequence, 0);
        assert_eq!(engine.metrics().exhaustion_waits, 1);
        assert_eq!(engine.metrics().ids_issued, per_ms + 1);
    }

    #[test]
    fn rollback_is_rejected_and_state_preserved() {
        let clock = ScriptedClock::new(vec![100, 50, 100]);
        let engine = IdEngine::with_parts(node(), clock, AllowAll);

        let first = SnowdriftId::from_u64(engine.next_id(None).unwrap());
        assert_eq!(first.timestamp, 100);
        assert_eq!(first.sequence, 0);

        assert_eq!(
            engine.next_id(None),
            Err(Error::ClockRollback { drift_ms: 50 })
        );
        assert_eq!(engine.metrics().rollback_rejections, 1);
        assert_eq!(engine.metrics().ids_issued, 1);

        // The failed call must not have advanced the sequence state: the
        // next success continues exactly where the first left off.
        let after = SnowdriftId::from_u64(engine.next_id(None).unwrap());
        assert_eq!(after.timestamp, 100);
        assert_eq!(after.sequence, 1);
    }

    #[test]
    fn stalled_clock_is_surfaced_without_reusing_sequence_numbers() {
        let engine = IdEngine::with_parts(node(), FixedClock(7), AllowAll);

        for _ in 0..=MAX_SEQUENCE {
            engine.next_id(None).unwrap();
        }
        assert!(matches!(
            engine.next_id(None),
            Err(Error::ClockStalled { .. })
        ));
        // Still stuck: a retry waits again instead of handing out a
        // duplicate of an already-issued (timestamp, sequence) pair.
        assert!(matches!(
            engine.next_id(None),
            Err(Error::ClockStalled { .. })
        ));
        assert_eq!(engine.metrics().ids_issued, MAX_SEQUENCE + 1);
    }

    #[test]
    fn timestamp_overflow_is_surfaced() {
        let engine = IdEngine::with_parts(node(), FixedClock(MAX_TIMESTAMP + 1), AllowAll);
        assert_eq!(
            engine.next_id(None),
            Err(Error::TimestampOverflow {
                offset_ms: MAX_TIMESTAMP + 1
            })
        );
    }

    #[test]
    fn rejected_caller_touches_nothing() {
        let engine = IdEngine::with_parts(node(), ScriptedClock::new(vec![10]), UserAgentPolicy);

        assert_eq!(engine.next_id(None), Err(Error::RejectedCaller));
        assert_eq!(engine.next_id(Some("")), Err(Error::RejectedCaller));
        assert_eq!(engine.next_id(Some("mozilla")), Err(Error::RejectedCaller));
        assert_eq!(engine.metrics().ids_issued, 0);

        let id = SnowdriftId::from_u64(engine.next_id(Some("curl/8.5.0")).unwrap());
        assert_eq!(id.sequence, 0);
        assert_eq!(engine.metrics().ids_issued, 1);
    }

    #[test]
    fn ids_are_unique_and_monotonic_under_a_real_clock() {
        let engine = IdEngine::new(node());
        let mut seen = HashSet::new();
        let mut last = 0u64;
        for _ in 0..2_000 {
            let id = engine.next_id(None).unwrap();
            assert!(id >= last);
            assert!(seen.insert(id));
            assert_eq!(SnowdriftId::from_u64(id).to_u64(), id);
            last = id;
        }
        assert_eq!(engine.metrics().ids_issued, 2_000);
    }

    #[test]
    fn concurrent_callers_never_collide() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 1_250;

        let engine = IdEngine::new(node());
        let all = StdMutex::new(Vec::with_capacity(THREADS * PER_THREAD));

        thread::scope(|s| {
            for _ in 0..THREADS {
                s.spawn(|| {
                    let mut local = Vec::with_capacity(PER_THREAD);
                    for _ in 0..PER_THREAD {
                        local.push(engine.next_id(None).unwrap());
                    }
                    all.lock().unwrap().extend(local);
                });
            }
        });

        let ids = all.into_inner().unwrap();
        assert_eq!(ids.len(), THREADS * PER_THREAD);
        let unique: HashSet<_> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert_eq!(engine.metrics().ids_issued, (THREADS * PER_THREAD) as u64);
    }

    #[test]
    fn decoded_identity_matches_the_configured_node() {
        let node = NodeIdentity::new(512, 1024).unwrap();
        let engine = IdEngine::with_parts(node, FixedClock(99), AllowAll);
        let id = SnowdriftId::from_u64(engine.next_id(None).unwrap());
        assert_eq!(id.datacenter_id, 512);
        assert_eq!(id.worker_id, 1024);
        assert_eq!(id.timestamp, 99);
    }
}
