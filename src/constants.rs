//! Bit-exact wire constants for the GM VPW diagnostic dialect.
//!
//! Every value here is a fixed single byte dictated by the protocol, not a
//! tunable. See spec [4.1].

/// Message priority byte (offset 0 of every [`crate::Message`]).
pub struct Priority;

impl Priority {
    /// Normal physically-addressed tool request/response priority.
    pub const PHYSICAL0: u8 = 0x6C;
    /// Priority used on broadcast-addressed upload/read payload responses.
    pub const BROADCAST_RESPONSE: u8 = 0x6D;
}

/// Device address bytes (offsets 1 and 2).
pub struct DeviceId;

impl DeviceId {
    pub const TOOL: u8 = 0xF0;
    pub const PCM: u8 = 0x10;
    pub const BROADCAST: u8 = 0xFE;
}

/// Mode byte (offset 3) conventions.
///
/// A positive response to mode `m` uses mode `m + 0x40`. A rejection uses
/// `Mode::REJECTED` followed by the original request mode byte.
pub struct Mode;

impl Mode {
    /// Added to a request mode to form its positive response mode.
    pub const POSITIVE_RESPONSE_OFFSET: u8 = 0x40;
    /// Rejection mode, followed by the original request mode byte.
    pub const REJECTED: u8 = 0x7F;

    pub const HIGH_SPEED_PREPARE: u8 = 0xA0;
    pub const HIGH_SPEED_PREPARE_RESPONSE: u8 = 0xE0;
    pub const HIGH_SPEED: u8 = 0xA1;

    pub const SEED_REQUEST: u8 = 0x27;
    pub const SEED_RESPONSE: u8 = 0x67;

    pub const BLOCK_READ_REQUEST: u8 = 0x3C;
    pub const BLOCK_READ_RESPONSE: u8 = 0x7C;
    pub const BLOCK_WRITE_REQUEST: u8 = 0x3B;

    pub const UPLOAD_REQUEST: u8 = 0x35;
    pub const UPLOAD_RESPONSE: u8 = 0x75;

    /// Generic block-data transfer mode, used bidirectionally: the tool
    /// uses it to stream kernel bytes into PCM RAM during upload, and the
    /// uploaded kernel later reuses the same frame shape to stream a
    /// memory block back during image read-out (see `ParsePayload`).
    pub const BLOCK_DATA: u8 = 0x36;

    pub const MEMORY_READ_REQUEST: u8 = 0x34;
    pub const MEMORY_READ_RESPONSE: u8 = 0x74;

    pub const EXIT_KERNEL: u8 = 0x20;

    pub const CLEAR_DTCS_REQUEST: u8 = 0x04;
    pub const CLEAR_DTCS_RESPONSE: u8 = 0x44;

    pub const TOOL_PRESENT: u8 = 0x3F;

    pub const DISABLE_NORMAL_MESSAGE_TRANSMISSION: u8 = 0x28;

    /// Seed sub-mode: request the seed.
    pub const SEED_SUBMODE_REQUEST: u8 = 0x01;
    /// Seed sub-mode: submit the unlock key.
    pub const SEED_SUBMODE_SUBMIT_KEY: u8 = 0x02;

    /// Unlock response sub-codes (byte following the `0x67` mode in a
    /// 6-byte unlock response).
    pub const UNLOCK_ACCEPTED: u8 = 0x34;
    pub const UNLOCK_KEY_REJECTED: u8 = 0x36;
    pub const UNLOCK_TIMEOUT: u8 = 0x37;
}

/// Block IDs naming a small read/write addressable PCM region.
pub struct BlockId;

impl BlockId {
    pub const VIN1: u8 = 0x01;
    pub const VIN2: u8 = 0x02;
    pub const VIN3: u8 = 0x03;
    pub const SERIAL1: u8 = 0x05;
    pub const SERIAL2: u8 = 0x06;
    pub const SERIAL3: u8 = 0x07;
    pub const BCC: u8 = 0x0A;
    pub const MEC: u8 = 0x13;
    pub const OPERATING_SYSTEM_ID: u8 = 0x0C;
    pub const HARDWARE_ID: u8 = 0x0B;
    pub const CALIBRATION_ID: u8 = 0x0D;
}

/// Payload block checksum/header overhead: the fixed 10-byte structural
/// envelope (4-byte message header + 1-byte encoding + 2-byte length +
/// 3-byte address) that surrounds a raw or RLE payload block, per spec
/// [4.3] `ParsePayload`/`CalcBlockChecksum`.
pub const BLOCK_OVERHEAD: usize = 10;

/// Per-message overhead subtracted from the device's `max_send_size` when
/// sizing kernel upload chunks. The spec's Open Questions flag this as the
/// one place where two plausible overhead constants (10 vs 12) compete;
/// REDESIGN FLAGS make `12` authoritative for chunk sizing specifically.
pub const CHUNK_OVERHEAD: u16 = 12;

/// Maximum number of times the engine (re-)sends a request before giving up
/// on the whole exchange with `Timeout`. See spec [4.5].
pub const MAX_SEND_ATTEMPTS: u32 = 10;

/// Maximum number of receive attempts made for a single send, before that
/// send is considered to have failed and (if attempts remain) is retried.
/// See spec [4.5].
pub const MAX_RECEIVE_ATTEMPTS: u32 = 15;

/// Backoff between polls while draining stray responses (e.g. waiting to
/// see whether a high-speed switch is refused). See spec [4.5] / [5].
pub const POLL_BACKOFF_MS: u64 = 10;

/// Number of backoff iterations performed while draining stray responses.
pub const POLL_BACKOFF_ITERATIONS: u32 = 10;
