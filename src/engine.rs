//! The protocol engine: orchestrates the multi-step operations built on
//! top of [`crate::message::factory`], [`crate::message::parser`], and
//! [`crate::query`]. See spec [4.5].
//!
//! Mirrors the teacher's `Sink<DRIVER, TIMER, DPM>` in shape: a single
//! struct generic over the device, key-derivation, and logging
//! capabilities, owning all three by value, with an explicit `State` enum
//! (here [`BusSpeedState`]) tracking where the bus-speed negotiation stands.

use tokio_util::sync::CancellationToken;

use crate::config::{EngineConfig, PcmInfo};
use crate::constants::{
    BlockId, DeviceId, Mode, Priority, CHUNK_OVERHEAD, MAX_RECEIVE_ATTEMPTS, MAX_SEND_ATTEMPTS, POLL_BACKOFF_ITERATIONS, POLL_BACKOFF_MS,
};
use crate::device::{Device, TimeoutScenario, VpwSpeed};
use crate::key_algorithm::KeyAlgorithm;
use crate::logger::Logger;
use crate::message::{factory, parser, Message};
use crate::query::{query, receive_one, receive_with_retry};
use crate::response::{Response, ResponseStatus};

/// Bus-speed negotiation state. See spec [4.5] State machine — bus speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusSpeedState {
    /// Baseline 1x, no negotiation in progress.
    Idle1x,
    /// Permission/begin handshake for 4x in progress.
    Negotiating,
    /// Running at 4x VPW.
    Running4x,
    /// Reverting from 4x back to 1x.
    Exiting4x,
}

/// Orchestrates VIN/serial/BCC/MEC/ID queries, the unlock challenge, bus
/// speed negotiation, and the kernel-upload + memory-read pipeline.
///
/// `ProtocolEngine` owns its [`Device`] by value for the duration of an
/// operation sequence, per spec [3] Ownership & lifecycle.
pub struct ProtocolEngine<D: Device, K: KeyAlgorithm, L: Logger> {
    device: D,
    key_algorithm: K,
    logger: L,
    config: EngineConfig,
    bus_speed_state: BusSpeedState,
    cleaned_up: bool,
}

impl<D: Device, K: KeyAlgorithm, L: Logger> ProtocolEngine<D, K, L> {
    pub fn new(device: D, key_algorithm: K, logger: L, config: EngineConfig) -> Self {
        Self {
            device,
            key_algorithm,
            logger,
            config,
            bus_speed_state: BusSpeedState::Idle1x,
            cleaned_up: false,
        }
    }

    /// Current bus-speed negotiation state.
    pub fn bus_speed_state(&self) -> BusSpeedState {
        self.bus_speed_state
    }

    /// Borrow the logger, e.g. so a caller can inspect recorded messages in
    /// tests.
    pub fn logger(&mut self) -> &mut L {
        &mut self.logger
    }

    /// Borrow the device, e.g. so a caller can inspect sent messages in
    /// tests.
    pub fn device(&mut self) -> &mut D {
        &mut self.device
    }

    // ---- simple property queries ------------------------------------

    /// Reads and assembles the 17-character VIN from its three blocks.
    pub async fn query_vin(&mut self) -> Response<String> {
        self.device.set_timeout(TimeoutScenario::ReadProperty).await;
        self.device.clear_message_queue().await;

        let mut raw = Vec::with_capacity(3);
        for n in 1..=3u8 {
            let response = receive_one(&mut self.device, &mut self.logger, || factory::create_vin_request(n)).await;
            if !response.is_success() {
                return Response::timeout();
            }
            raw.push(response.value);
        }
        parser::parse_vin_responses(&raw[0], &raw[1], &raw[2])
    }

    /// Reads and assembles the 12-character serial number from its three
    /// blocks.
    pub async fn query_serial(&mut self) -> Response<String> {
        self.device.set_timeout(TimeoutScenario::ReadProperty).await;
        self.device.clear_message_queue().await;

        let mut raw = Vec::with_capacity(3);
        for n in 1..=3u8 {
            let response = receive_one(&mut self.device, &mut self.logger, || factory::create_serial_request(n)).await;
            if !response.is_success() {
                return Response::timeout();
            }
            raw.push(response.value);
        }
        parser::parse_serial_responses(&raw[0], &raw[1], &raw[2])
    }

    /// Reads the Broadcast Code.
    pub async fn query_bcc(&mut self) -> Response<String> {
        self.device.set_timeout(TimeoutScenario::ReadProperty).await;
        query(&mut self.device, &mut self.logger, factory::create_bcc_request, parser::parse_bcc_response).await
    }

    /// Reads the Manufacturer Enable Counter.
    pub async fn query_mec(&mut self) -> Response<String> {
        self.device.set_timeout(TimeoutScenario::ReadProperty).await;
        query(&mut self.device, &mut self.logger, factory::create_mec_request, parser::parse_mec_response).await
    }

    /// Reads the operating system identifier.
    pub async fn query_os_id(&mut self) -> Response<u32> {
        self.device.set_timeout(TimeoutScenario::ReadProperty).await;
        query(
            &mut self.device,
            &mut self.logger,
            factory::create_operating_system_id_read_request,
            parser::parse_block_u32,
        )
        .await
    }

    /// Reads the hardware identifier.
    pub async fn query_hardware_id(&mut self) -> Response<u32> {
        self.device.set_timeout(TimeoutScenario::ReadProperty).await;
        query(
            &mut self.device,
            &mut self.logger,
            factory::create_hardware_id_read_request,
            parser::parse_block_u32,
        )
        .await
    }

    /// Reads the calibration identifier.
    pub async fn query_calibration_id(&mut self) -> Response<u32> {
        self.device.set_timeout(TimeoutScenario::ReadProperty).await;
        query(
            &mut self.device,
            &mut self.logger,
            factory::create_calibration_id_read_request,
            parser::parse_block_u32,
        )
        .await
    }

    /// Writes a new 17-character ASCII VIN, split into three 6-byte blocks
    /// (the leading 5-byte segment is zero-padded to 6 bytes at the
    /// front). Each block write failure aborts the whole operation.
    pub async fn update_vin(&mut self, vin: &str) -> Response<bool> {
        if vin.len() != 17 || !vin.is_ascii() {
            return Response::error("VIN must be exactly 17 ASCII characters");
        }
        let bytes = vin.as_bytes();

        let mut first = [0u8; 6];
        first[1..].copy_from_slice(&bytes[0..5]);
        let mut second = [0u8; 6];
        second.copy_from_slice(&bytes[5..11]);
        let mut third = [0u8; 6];
        third.copy_from_slice(&bytes[11..17]);

        self.device.set_timeout(TimeoutScenario::ReadProperty).await;
        self.device.clear_message_queue().await;

        for (block_id, segment) in [(BlockId::VIN1, first), (BlockId::VIN2, second), (BlockId::VIN3, third)] {
            let result = query(
                &mut self.device,
                &mut self.logger,
                || factory::create_vin_write_block(block_id, &segment),
                |m| parser::do_simple_validation(m, Priority::PHYSICAL0, Mode::BLOCK_WRITE_REQUEST),
            )
            .await;
            if !result.is_success() || !result.value {
                return Response::error(format!("VIN block 0x{block_id:02X} write failed"));
            }
        }

        Response::success(true)
    }

    // ---- unlock challenge ---------------------------------------------

    /// Runs the seed/key unlock challenge, deriving the key via `algorithm_id`
    /// and the engine's [`KeyAlgorithm`]. See spec [4.5] `UnlockEcu`.
    pub async fn unlock_ecu(&mut self, algorithm_id: u16) -> Response<bool> {
        self.device.set_timeout(TimeoutScenario::ReadProperty).await;
        self.device.clear_message_queue().await;

        if !self.send_with_retry(factory::create_seed_request()).await {
            return Response::timeout();
        }

        let mut seed = None;
        for _ in 0..MAX_RECEIVE_ATTEMPTS {
            match self.device.receive_message().await {
                Some(m) => {
                    if parser::is_unlocked(&m) {
                        return Response::success(true);
                    }
                    let parsed = parser::parse_seed(&m);
                    if parsed.is_success() {
                        seed = Some(parsed.value);
                        break;
                    }
                }
                None => break,
            }
        }
        let seed = match seed {
            Some(s) => s,
            None => return Response::timeout(),
        };
        if seed == 0 {
            return Response::success(true);
        }

        let key = self.key_algorithm.derive(algorithm_id, seed);

        if !self.send_with_retry(factory::create_unlock_request(key)).await {
            return Response::timeout();
        }

        for _ in 0..MAX_RECEIVE_ATTEMPTS {
            match self.device.receive_message().await {
                Some(m) => {
                    let parsed = parser::parse_unlock_response(&m);
                    if parsed.status != ResponseStatus::UnexpectedResponse {
                        return parsed;
                    }
                }
                None => break,
            }
        }
        Response::timeout()
    }

    /// Sends `message`, retrying up to `MAX_SEND_ATTEMPTS` times, returning
    /// whether any attempt succeeded.
    async fn send_with_retry(&mut self, message: Message) -> bool {
        for _ in 0..MAX_SEND_ATTEMPTS {
            if self.device.send_message(&message).await {
                return true;
            }
        }
        false
    }

    // ---- bus speed negotiation ------------------------------------------

    /// Polls the device for a stray response, backing off between attempts.
    /// See spec [4.5] / [5]: 10 ms backoff for up to 10 iterations.
    async fn poll_for_stray(&mut self) -> Option<Message> {
        for i in 0..POLL_BACKOFF_ITERATIONS {
            if let Some(m) = self.device.receive_message().await {
                return Some(m);
            }
            if i + 1 < POLL_BACKOFF_ITERATIONS {
                tokio::time::sleep(std::time::Duration::from_millis(POLL_BACKOFF_MS)).await;
            }
        }
        None
    }

    /// Negotiates (or reverts) VPW 4x signaling. See spec [4.5] `VehicleSetVPW4x`.
    pub async fn set_vpw_4x(&mut self, new_speed: VpwSpeed) -> Response<bool> {
        match new_speed {
            VpwSpeed::Standard => {
                self.bus_speed_state = BusSpeedState::Exiting4x;
                self.device.set_vpw_speed(VpwSpeed::Standard).await;
                self.device.set_timeout(TimeoutScenario::ReadProperty).await;
                self.bus_speed_state = BusSpeedState::Idle1x;
                Response::success(true)
            }
            VpwSpeed::FourX => {
                if !self.device.supports_4x() {
                    self.logger
                        .add_user_message("adapter does not support 4x VPW; remaining at 1x");
                    return Response::success(true);
                }

                self.bus_speed_state = BusSpeedState::Negotiating;
                self.device.clear_message_queue().await;

                if !self
                    .send_with_retry(factory::create_high_speed_permission_request(DeviceId::BROADCAST))
                    .await
                {
                    self.bus_speed_state = BusSpeedState::Idle1x;
                    return Response::timeout();
                }

                let mut any_refusal = false;
                while let Some(m) = self.poll_for_stray().await {
                    let parsed = parser::parse_high_speed_permission_response(&m);
                    if parsed.is_success() && parsed.value.is_valid && !parsed.value.permission_granted {
                        any_refusal = true;
                    }
                }
                if any_refusal {
                    self.bus_speed_state = BusSpeedState::Idle1x;
                    return Response::refused("high-speed permission denied");
                }

                if !self
                    .send_with_retry(factory::create_begin_high_speed(DeviceId::BROADCAST))
                    .await
                {
                    self.bus_speed_state = BusSpeedState::Idle1x;
                    return Response::timeout();
                }

                let mut refused = false;
                while let Some(m) = self.poll_for_stray().await {
                    let parsed = parser::parse_high_speed_refusal(&m);
                    if parsed.is_success() && parsed.value {
                        refused = true;
                    }
                }
                if refused {
                    self.bus_speed_state = BusSpeedState::Idle1x;
                    return Response::refused("high-speed switch refused");
                }

                self.device.set_vpw_speed(VpwSpeed::FourX).await;
                self.device.set_timeout(TimeoutScenario::ReadMemoryBlock).await;
                self.bus_speed_state = BusSpeedState::Running4x;
                Response::success(true)
            }
        }
    }

    // ---- kernel upload ---------------------------------------------------

    /// Uploads `payload` to PCM RAM at `base_address` and executes it.
    /// See spec [4.5] `PCMExecute`, and [9] Open Questions on chunk sizing
    /// and transmission order.
    pub async fn pcm_execute(&mut self, payload: &[u8], base_address: u32, cancel: &CancellationToken) -> Response<bool> {
        let permission = query(
            &mut self.device,
            &mut self.logger,
            || factory::create_upload_request(payload.len() as u32, base_address),
            |m| parser::parse_upload_permission_response(m),
        )
        .await;
        if !permission.is_success() || !permission.value {
            return Response::refused("upload request denied");
        }

        self.device.set_timeout(TimeoutScenario::SendKernel).await;

        let chunk_size = self.device.max_send_size().saturating_sub(CHUNK_OVERHEAD) as usize;
        if chunk_size == 0 {
            return Response::error("device max_send_size too small for any chunk");
        }

        for (offset, length, execute_on_load) in upload_block_plan(payload.len(), chunk_size) {
            if cancel.is_cancelled() {
                return Response::cancelled();
            }
            let address = base_address + offset as u32;
            let message = factory::create_block_message(payload, offset, length, address, execute_on_load);
            let ack = query(&mut self.device, &mut self.logger, || message.clone(), |m| parser::parse_upload_response(m)).await;
            if !ack.is_success() || !ack.value {
                return Response::error("kernel block write failed or was rejected");
            }
        }

        Response::success(true)
    }

    // ---- memory read-out --------------------------------------------------

    /// Uploads `kernel`, switches to 4x, and reads back `info.image_size`
    /// bytes starting at `info.image_base_address`. Invokes `on_tool_present`
    /// at the start and periodically during the read. Every exit path —
    /// success, error, or cancellation — runs [`Self::cleanup`].
    /// See spec [4.5] `ReadContents`.
    pub async fn read_contents(
        &mut self,
        info: PcmInfo,
        kernel: &[u8],
        cancel: &CancellationToken,
        mut on_tool_present: impl FnMut(),
    ) -> Response<Vec<u8>> {
        self.cleaned_up = false;
        let _ = self.device.send_message(&factory::create_tool_present()).await;
        on_tool_present();

        let speed = self.set_vpw_4x(VpwSpeed::FourX).await;
        if !speed.is_success() {
            self.cleanup().await;
            return Response::status_with(speed.status, Vec::new(), speed.reason.unwrap_or_default());
        }

        let upload = self.pcm_execute(kernel, self.config.kernel_load_address, cancel).await;
        if !upload.is_success() {
            self.cleanup().await;
            return Response::status_with(upload.status, Vec::new(), upload.reason.unwrap_or_default());
        }

        self.device.set_timeout(TimeoutScenario::ReadMemoryBlock).await;

        let mut image = vec![0u8; info.image_size as usize];
        let block = self.device.max_receive_size().saturating_sub(CHUNK_OVERHEAD);
        if block == 0 {
            self.cleanup().await;
            return Response::error("device max_receive_size too small for any block");
        }

        let mut address = info.image_base_address;
        let end = info.image_base_address + info.image_size;
        let mut blocks_read = 0u32;

        while address < end {
            if cancel.is_cancelled() {
                self.cleanup().await;
                return Response::cancelled();
            }

            let remaining = end - address;
            let this_block = remaining.min(u32::from(block)) as u16;

            let result = self.try_read_block(address, this_block).await;
            match result.status {
                ResponseStatus::Success => {
                    let offset = (address - info.image_base_address) as usize;
                    image[offset..offset + this_block as usize].copy_from_slice(&result.value);
                }
                _ => {
                    self.cleanup().await;
                    return Response::status_with(result.status, Vec::new(), result.reason.unwrap_or_default());
                }
            }

            address += u32::from(this_block);
            blocks_read += 1;
            if blocks_read % self.config.tool_present_interval_blocks == 0 {
                let _ = self.device.send_message(&factory::create_tool_present()).await;
                on_tool_present();
            }
        }

        self.cleanup().await;
        Response::success(image)
    }

    async fn try_read_block(&mut self, address: u32, length: u16) -> Response<Vec<u8>> {
        for _ in 0..MAX_SEND_ATTEMPTS {
            if !self.device.send_message(&factory::create_read_request(address, length)).await {
                continue;
            }

            let ack = receive_with_retry(&mut self.device, &mut self.logger, parser::parse_read_response).await;
            if matches!(ack.status, ResponseStatus::Timeout) {
                continue;
            }
            if !ack.is_success() || !ack.value {
                return Response::error("read request rejected");
            }

            let payload = receive_with_retry(&mut self.device, &mut self.logger, |m| parser::parse_payload(m, length, address)).await;
            if matches!(payload.status, ResponseStatus::Timeout) {
                continue;
            }
            return payload;
        }
        Response::timeout()
    }

    // ---- cleanup & disposal -----------------------------------------------

    /// Exits the kernel (at 4x if the device supports it), reverts to 1x,
    /// exits the kernel again, and clears DTCs. Not scoped to having run
    /// [`Self::read_contents`] — a fresh engine has `cleaned_up = false`, so
    /// the first call always runs the full sequence as a teardown safety
    /// net, even if no kernel was ever uploaded. Idempotent beyond that
    /// first call: while already cleaned up, a further call is a no-op.
    /// See spec [4.5] step 8, [8].
    pub async fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }

        if self.device.supports_4x() {
            let _ = self.device.send_message(&factory::create_exit_kernel()).await;
        }
        self.device.set_vpw_speed(VpwSpeed::Standard).await;
        self.device.set_timeout(TimeoutScenario::ReadProperty).await;
        self.bus_speed_state = BusSpeedState::Idle1x;

        let _ = self.device.send_message(&factory::create_exit_kernel()).await;
        let _ = self.device.send_message(&factory::create_clear_dtcs()).await;

        self.cleaned_up = true;
    }

    /// Releases the underlying device, after a best-effort [`Self::cleanup`].
    pub async fn dispose(mut self) {
        self.cleanup().await;
        let ProtocolEngine { device, .. } = self;
        device.dispose().await;
    }
}

/// Computes `(offset, length, execute_on_load)` for every
/// [`factory::create_block_message`] call a kernel upload makes, in
/// transmission order: the remainder first (if any), then full chunks
/// from the highest offset down to offset zero. Only the final message
/// (offset zero) carries `execute_on_load = true`, unless the whole
/// payload fits in a single remainder-only block, in which case that one
/// block both is first and executes.
fn upload_block_plan(len: usize, chunk_size: usize) -> Vec<(usize, usize, bool)> {
    let count = len / chunk_size;
    let rem = len % chunk_size;

    let mut blocks = Vec::new();
    if rem == len {
        blocks.push((0, rem, true));
        return blocks;
    }
    if rem > 0 {
        blocks.push((count * chunk_size, rem, false));
    }
    for i in (0..count).rev() {
        blocks.push((i * chunk_size, chunk_size, i == 0));
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_plan_matches_scenario() {
        let chunk_size = 16;
        let len = 2 * chunk_size + 5;
        let plan = upload_block_plan(len, chunk_size);
        let offsets: Vec<usize> = plan.iter().map(|(offset, _, _)| *offset).collect();
        assert_eq!(offsets, vec![2 * chunk_size, chunk_size, 0]);

        let executes: Vec<bool> = plan.iter().map(|(_, _, exec)| *exec).collect();
        assert_eq!(executes, vec![false, false, true]);
    }

    #[test]
    fn upload_plan_single_remainder_block_executes_immediately() {
        let plan = upload_block_plan(5, 16);
        assert_eq!(plan, vec![(0, 5, true)]);
    }
}
