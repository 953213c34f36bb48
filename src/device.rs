//! The [`Device`] capability: the narrow asynchronous I/O contract the
//! engine consumes from a pass-through adapter driver. See spec [6].
//!
//! Everything about the physical transport — serial/Bluetooth framing,
//! AT-command setup, concrete millisecond timeouts — lives on the other
//! side of this trait and is out of scope for this crate.

use crate::message::Message;

/// VPW bus signaling speed. Both sides of the link must agree before
/// making the electrical change; see spec [4.5] `VehicleSetVPW4x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VpwSpeed {
    /// Baseline 1x VPW.
    Standard,
    /// 4x VPW, used during kernel upload and memory read-out.
    FourX,
}

/// A timeout scenario, mapped by the device capability to concrete
/// milliseconds. The core never hard-codes a duration; see spec [3], [6].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TimeoutScenario {
    /// Short timeout for single-message property queries (VIN, seed, ...).
    ReadProperty,
    /// Longer timeout while reading kernel memory blocks.
    ReadMemoryBlock,
    /// Longest timeout, for streaming the kernel upload itself.
    SendKernel,
}

/// Asynchronous I/O contract between the protocol engine and a pass-through
/// adapter. The engine owns its `Device` exclusively for the duration of an
/// operation sequence; see spec [3] Ownership & lifecycle.
pub trait Device {
    /// Perform whatever handshake the adapter needs before use.
    async fn initialize(&mut self) -> bool;

    /// Send one framed message. Returns `false` on I/O failure.
    async fn send_message(&mut self, message: &Message) -> bool;

    /// Receive one framed message, or `None` if nothing arrived within the
    /// current [`TimeoutScenario`].
    async fn receive_message(&mut self) -> Option<Message>;

    /// Discard any messages currently queued, so a subsequent receive
    /// cannot be confused by stale traffic. See spec [5] Ordering.
    async fn clear_message_queue(&mut self);

    /// Select which timeout scenario subsequent receives should use.
    async fn set_timeout(&mut self, scenario: TimeoutScenario);

    /// Change the adapter's own electrical bus speed.
    async fn set_vpw_speed(&mut self, speed: VpwSpeed);

    /// Whether this adapter can drive 4x VPW at all.
    fn supports_4x(&self) -> bool;

    /// Largest single message this adapter can send.
    fn max_send_size(&self) -> u16;

    /// Largest single message this adapter can receive.
    fn max_receive_size(&self) -> u16;

    /// Human-readable adapter description, for logging.
    fn description(&self) -> &str;

    /// Release the device. Consumes `self`: after disposal the caller has
    /// no way to issue further I/O through this handle.
    async fn dispose(self);
}
