//! The persisted non-volatile parameter record layout: fixed-width
//! `{group_id, mnemonic_id, value}` triples, versioned and indexed by
//! stable record position, terminated by a profile trailer sentinel.
//!
//! Only the record *shape* is in scope here; the flash/EEPROM read-write
//! driver that actually stores these bytes remains an external
//! collaborator, as spec.md's Non-goals state.

/// Size in bytes of one on-the-wire `ConfigRecord`.
pub const RECORD_SIZE: usize = 7;

/// One `{group_id, mnemonic_id, value}` parameter record.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConfigRecord {
    /// Which config group this belongs to (axis, motor, system, ...).
    pub group_id: u8,
    /// Which field within the group (feedrate_max, jerk_max, ...).
    pub mnemonic_id: u16,
    pub value: f32,
}

/// Sentinel record marking the end of a profile's record region.
pub const PROFILE_TRAILER: ConfigRecord = ConfigRecord { group_id: 0xFF, mnemonic_id: 0xFFFF, value: 0.0 };

impl ConfigRecord {
    pub fn to_bytes(self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        out[0] = self.group_id;
        out[1..3].copy_from_slice(&self.mnemonic_id.to_le_bytes());
        out[3..7].copy_from_slice(&self.value.to_le_bytes());
        out
    }

    pub fn from_bytes(bytes: [u8; RECORD_SIZE]) -> Self {
        Self {
            group_id: bytes[0],
            mnemonic_id: u16::from_le_bytes([bytes[1], bytes[2]]),
            value: f32::from_le_bytes([bytes[3], bytes[4], bytes[5], bytes[6]]),
        }
    }

    pub fn is_trailer(self) -> bool {
        self == PROFILE_TRAILER
    }
}

/// Well-known group identifiers, one per config table this crate exposes.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GroupId {
    Axis(u8),
    Motor(u8),
    System,
    GcodeDefaults,
}

impl GroupId {
    pub fn encode(self) -> u8 {
        match self {
            GroupId::Axis(n) => 0x10 + n,
            GroupId::Motor(n) => 0x20 + n,
            GroupId::System => 0x01,
            GroupId::GcodeDefaults => 0x02,
        }
    }
}

/// Serializes a slice of records into a flat byte buffer terminated by
/// `PROFILE_TRAILER`, the shape a flash page write would receive.
pub fn encode_profile(records: &[ConfigRecord]) -> Vec<u8> {
    let mut buffer = Vec::with_capacity((records.len() + 1) * RECORD_SIZE);
    for record in records {
        buffer.extend_from_slice(&record.to_bytes());
    }
    buffer.extend_from_slice(&PROFILE_TRAILER.to_bytes());
    buffer
}

/// Parses a flat byte buffer back into records, stopping at (and not
/// including) the trailer. Returns `None` if the buffer's length isn't a
/// multiple of `RECORD_SIZE` or no trailer is present.
pub fn decode_profile(bytes: &[u8]) -> Option<Vec<ConfigRecord>> {
    if bytes.len() % RECORD_SIZE != 0 {
        return None;
    }
    let mut records = Vec::new();
    for chunk in bytes.chunks_exact(RECORD_SIZE) {
        let record = ConfigRecord::from_bytes(chunk.try_into().ok()?);
        if record.is_trailer() {
            return Some(records);
        }
        records.push(record);
    }
    None
}
