use core::{fmt, time::Duration};

/// A 64-bit Snowflake ID with a split datacenter/worker identity.
///
/// - 1 bit reserved (always zero)
/// - 41 bits timestamp (ms since the worker's epoch)
/// - 5 bits datacenter ID
/// - 5 bits worker ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21              17 16          12 11             0
///              +--------------+----------------+------------------+--------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | datacenter (5)   | worker (5)   | sequence (12) |
///              +--------------+----------------+------------------+--------------+---------------+
///              |<----------------- MSB ------------- 64 bits ------------- LSB ---------------->|
/// ```
///
/// IDs minted by one worker compare in issuance order because the timestamp
/// occupies the most significant bits and the sequence the least.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Bitmask for the 41-bit timestamp field. Occupies bits 22 through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << 41) - 1;

    /// Bitmask for the 5-bit datacenter field. Occupies bits 17 through 21.
    pub const DATACENTER_ID_MASK: u64 = (1 << 5) - 1;

    /// Bitmask for the 5-bit worker field. Occupies bits 12 through 16.
    pub const WORKER_ID_MASK: u64 = (1 << 5) - 1;

    /// Bitmask for the 12-bit sequence field. Occupies bits 0 through 11.
    pub const SEQUENCE_MASK: u64 = (1 << 12) - 1;

    pub const TIMESTAMP_SHIFT: u64 = 22;
    pub const DATACENTER_ID_SHIFT: u64 = 17;
    pub const WORKER_ID_SHIFT: u64 = 12;
    pub const SEQUENCE_SHIFT: u64 = 0;

    /// Largest timestamp (ms since epoch) the layout can hold, roughly 69
    /// years.
    pub const MAX_TIMESTAMP: u64 = Self::TIMESTAMP_MASK;
    pub const MAX_DATACENTER_ID: u64 = Self::DATACENTER_ID_MASK;
    pub const MAX_WORKER_ID: u64 = Self::WORKER_ID_MASK;
    pub const MAX_SEQUENCE: u64 = Self::SEQUENCE_MASK;

    /// Packs the four fields into an ID. Each value is masked to its field
    /// width, so out-of-range inputs are truncated rather than bleeding into
    /// neighbouring fields.
    pub const fn from_components(
        timestamp: u64,
        datacenter_id: u64,
        worker_id: u64,
        sequence: u64,
    ) -> Self {
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let datacenter_id =
            (datacenter_id & Self::DATACENTER_ID_MASK) << Self::DATACENTER_ID_SHIFT;
        let worker_id = (worker_id & Self::WORKER_ID_MASK) << Self::WORKER_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | datacenter_id | worker_id | sequence,
        }
    }

    /// Extracts the timestamp (ms since epoch).
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    pub const fn datacenter_id(&self) -> u64 {
        (self.id >> Self::DATACENTER_ID_SHIFT) & Self::DATACENTER_ID_MASK
    }

    pub const fn worker_id(&self) -> u64 {
        (self.id >> Self::WORKER_ID_SHIFT) & Self::WORKER_ID_MASK
    }

    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Returns `true` if the reserved sign bit is clear.
    pub const fn is_valid(&self) -> bool {
        self.id >> 63 == 0
    }

    /// Absolute creation time in milliseconds since the Unix epoch, given the
    /// epoch the ID was minted against.
    pub const fn unix_millis(&self, epoch: Duration) -> u64 {
        epoch.as_millis() as u64 + self.timestamp()
    }

    /// Returns the ID as a zero-padded 20-digit string.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("raw", &format_args!("0x{:016x} ({})", self.id, self.id))
            .field("timestamp", &self.timestamp())
            .field("datacenter_id", &self.datacenter_id())
            .field("worker_id", &self.worker_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}
