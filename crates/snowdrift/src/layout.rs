use core::fmt;
use core::time::Duration;

/// Width of the millisecond timestamp field (~17 years from
/// [`SNOWDRIFT_EPOCH`]).
pub const TIMESTAMP_BITS: u32 = 39;
/// Width of the datacenter identity field.
pub const DATACENTER_BITS: u32 = 10;
/// Width of the worker identity field.
pub const WORKER_BITS: u32 = 10;
/// Width of the per-millisecond sequence field.
pub const SEQUENCE_BITS: u32 = 4;

// The high bit is reserved so IDs stay non-negative when read as i64.
const _: () = assert!(1 + TIMESTAMP_BITS + DATACENTER_BITS + WORKER_BITS + SEQUENCE_BITS == 64);

/// Largest millisecond offset the timestamp field can carry.
pub const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;
/// Largest valid datacenter or worker identity. Identities are 1-based, so
/// the full `[1, 1024]` range occupies exactly [`DATACENTER_BITS`] (resp.
/// [`WORKER_BITS`]) once biased down by one.
pub const MAX_NODE_ID: u64 = 1 << DATACENTER_BITS;
/// Largest sequence value within one millisecond.
pub const MAX_SEQUENCE: u64 = (1 << SEQUENCE_BITS) - 1;

pub(crate) const WORKER_SHIFT: u32 = SEQUENCE_BITS;
pub(crate) const DATACENTER_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS;
pub(crate) const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_BITS + DATACENTER_BITS;

/// The fixed reference timestamp all generated IDs are relative to:
/// 2020-01-01T00:00:00Z, as a duration since the Unix epoch.
///
/// This constant must never change across a deployment's lifetime; changing
/// it changes the meaning of every previously issued ID.
pub const SNOWDRIFT_EPOCH: Duration = Duration::from_millis(1_577_836_800_000);

/// The typed decomposition of a generated ID.
///
/// `datacenter_id` and `worker_id` hold the operator-facing 1-based values;
/// the bias to the stored 10-bit field is applied during packing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnowdriftId {
    /// Milliseconds since [`SNOWDRIFT_EPOCH`].
    pub timestamp: u64,
    /// Datacenter identity, in `[1, MAX_NODE_ID]`.
    pub datacenter_id: u64,
    /// Worker identity, in `[1, MAX_NODE_ID]`.
    pub worker_id: u64,
    /// Position within the millisecond, from 0.
    pub sequence: u64,
}

impl SnowdriftId {
    /// Builds an ID from its four fields.
    ///
    /// Callers are expected to pass in-range values; the engine validates
    /// identity at construction and the timestamp before packing. Fields are
    /// masked to their widths here so a malformed input can never bleed into
    /// a neighboring field.
    pub fn from_parts(timestamp: u64, datacenter_id: u64, worker_id: u64, sequence: u64) -> Self {
        Self {
            timestamp: timestamp & MAX_TIMESTAMP,
            datacenter_id: (datacenter_id.wrapping_sub(1) & (MAX_NODE_ID - 1)) + 1,
            worker_id: (worker_id.wrapping_sub(1) & (MAX_NODE_ID - 1)) + 1,
            sequence: sequence & MAX_SEQUENCE,
        }
    }

    /// Packs the four fields into the wire representation.
    pub fn to_u64(self) -> u64 {
        (self.timestamp << TIMESTAMP_SHIFT)
            | ((self.datacenter_id.wrapping_sub(1) & (MAX_NODE_ID - 1)) << DATACENTER_SHIFT)
            | ((self.worker_id.wrapping_sub(1) & (MAX_NODE_ID - 1)) << WORKER_SHIFT)
            | self.sequence
    }

    /// Unpacks a wire representation into its four fields.
    pub fn from_u64(raw: u64) -> Self {
        Self {
            timestamp: (raw >> TIMESTAMP_SHIFT) & MAX_TIMESTAMP,
            datacenter_id: ((raw >> DATACENTER_SHIFT) & (MAX_NODE_ID - 1)) + 1,
            worker_id: ((raw >> WORKER_SHIFT) & (MAX_NODE_ID - 1)) + 1,
            sequence: raw & MAX_SEQUENCE,
        }
    }
}

impl fmt::Display for SnowdriftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_u64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_fields_into_expected_positions() {
        let id = SnowdriftId::from_parts(1, 1, 1, 1);
        assert_eq!(id.to_u64(), (1 << TIMESTAMP_SHIFT) | 1);

        let id = SnowdriftId::from_parts(0, 2, 3, 0);
        assert_eq!(id.to_u64(), (1 << DATACENTER_SHIFT) | (2 << WORKER_SHIFT));
    }

    #[test]
    fn round_trips_every_field_extreme() {
        for &ts in &[0, 1, MAX_TIMESTAMP] {
            for &dc in &[1, 2, MAX_NODE_ID] {
                for &w in &[1, 513, MAX_NODE_ID] {
                    for &seq in &[0, MAX_SEQUENCE] {
                        let id = SnowdriftId::from_parts(ts, dc, w, seq);
                        let rt = SnowdriftId::from_u64(id.to_u64());
                        assert_eq!(id, rt);
                        assert_eq!(rt.timestamp, ts);
                        assert_eq!(rt.datacenter_id, dc);
                        assert_eq!(rt.worker_id, w);
                        assert_eq!(rt.sequence, seq);
                    }
                }
            }
        }
    }

    #[test]
    fn sign_bit_stays_clear() {
        let id = SnowdriftId::from_parts(MAX_TIMESTAMP, MAX_NODE_ID, MAX_NODE_ID, MAX_SEQUENCE);
        assert_eq!(id.to_u64() >> 63, 0);
    }

    #[test]
    fn timestamp_is_the_most_significant_variable_field() {
        let earlier = SnowdriftId::from_parts(10, MAX_NODE_ID, MAX_NODE_ID, MAX_SEQUENCE);
        let later = SnowdriftId::from_parts(11, 1, 1, 0);
        assert!(earlier.to_u64() < later.to_u64());
    }
}
