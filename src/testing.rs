//! Dummy implementations of [`Device`], [`Logger`], and [`KeyAlgorithm`]
//! for exercising the engine without real hardware. Mirrors the teacher's
//! `dummy.rs` fixtures, promoted to a `pub` module since this crate's
//! device driver is explicitly out of scope and callers need a fixture of
//! their own to write integration tests against the engine.

use std::collections::VecDeque;

use crate::device::{Device, TimeoutScenario, VpwSpeed};
use crate::key_algorithm::KeyAlgorithm;
use crate::logger::Logger;
use crate::message::Message;

/// A scripted [`Device`]: inbound messages are queued ahead of time and
/// handed out in order; every sent message is recorded for assertions.
#[derive(Debug, Default)]
pub struct DummyDevice {
    inbound: VecDeque<Message>,
    pub sent: Vec<Message>,
    pub speed_changes: Vec<VpwSpeed>,
    pub timeout_changes: Vec<TimeoutScenario>,
    pub clear_queue_calls: u32,
    pub supports_4x: bool,
    pub max_send_size: u16,
    pub max_receive_size: u16,
    /// When `Some`, `send_message` returns this instead of `true`. Used to
    /// simulate a device-level I/O fault.
    pub fail_next_send: bool,
}

impl DummyDevice {
    pub fn new() -> Self {
        Self {
            supports_4x: true,
            max_send_size: 128,
            max_receive_size: 128,
            ..Default::default()
        }
    }

    /// Queue a message to be returned by a future `receive_message` call.
    pub fn queue_inbound(&mut self, message: Message) {
        self.inbound.push_back(message);
    }
}

impl Device for DummyDevice {
    async fn initialize(&mut self) -> bool {
        true
    }

    async fn send_message(&mut self, message: &Message) -> bool {
        if self.fail_next_send {
            self.fail_next_send = false;
            return false;
        }
        self.sent.push(message.clone());
        true
    }

    async fn receive_message(&mut self) -> Option<Message> {
        self.inbound.pop_front()
    }

    async fn clear_message_queue(&mut self) {
        self.clear_queue_calls += 1;
        self.inbound.clear();
    }

    async fn set_timeout(&mut self, scenario: TimeoutScenario) {
        self.timeout_changes.push(scenario);
    }

    async fn set_vpw_speed(&mut self, speed: VpwSpeed) {
        self.speed_changes.push(speed);
    }

    fn supports_4x(&self) -> bool {
        self.supports_4x
    }

    fn max_send_size(&self) -> u16 {
        self.max_send_size
    }

    fn max_receive_size(&self) -> u16 {
        self.max_receive_size
    }

    fn description(&self) -> &str {
        "dummy device"
    }

    async fn dispose(self) {}
}

/// A [`Logger`] that records every message it receives, for assertions.
#[derive(Debug, Default)]
pub struct DummyLogger {
    pub user_messages: Vec<String>,
    pub debug_messages: Vec<String>,
}

impl Logger for DummyLogger {
    fn add_user_message(&mut self, message: &str) {
        self.user_messages.push(message.to_string());
    }

    fn add_debug_message(&mut self, message: &str) {
        self.debug_messages.push(message.to_string());
    }
}

/// A [`KeyAlgorithm`] that applies a fixed, caller-chosen transform to the
/// seed. Defaults to the identity function, which is never a real vehicle
/// algorithm but is convenient for tests that only care about plumbing.
pub struct DummyKeyAlgorithm {
    pub derive_fn: fn(u16, u16) -> u16,
}

impl Default for DummyKeyAlgorithm {
    fn default() -> Self {
        Self {
            derive_fn: |_algorithm_id, seed| seed ^ 0xFFFF,
        }
    }
}

impl KeyAlgorithm for DummyKeyAlgorithm {
    fn derive(&self, algorithm_id: u16, seed: u16) -> u16 {
        (self.derive_fn)(algorithm_id, seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dummy_device_echoes_queued_messages() {
        let mut device = DummyDevice::new();
        let m = Message::new(vec![0x6C, 0xF0, 0x10, 0x7C]).unwrap();
        device.queue_inbound(m.clone());
        assert_eq!(device.receive_message().await, Some(m));
        assert_eq!(device.receive_message().await, None);
    }

    #[test]
    fn dummy_key_algorithm_is_deterministic() {
        let algo = DummyKeyAlgorithm::default();
        assert_eq!(algo.derive(1, 0x1234), algo.derive(1, 0x1234));
    }
}
