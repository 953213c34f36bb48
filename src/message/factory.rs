//! Pure, deterministic constructors for every outbound [`Message`] kind the
//! engine sends. See spec [4.2].
//!
//! None of these functions touch a device or retain state; they only turn
//! typed request parameters into wire bytes.

use byteorder::{BigEndian, ByteOrder};

use super::wire::push_u24;
use super::Message;
use crate::constants::{BlockId, DeviceId, Mode, Priority};

fn header(mode: u8) -> Vec<u8> {
    vec![Priority::PHYSICAL0, DeviceId::PCM, DeviceId::TOOL, mode]
}

fn broadcast_header(mode: u8) -> Vec<u8> {
    vec![Priority::PHYSICAL0, DeviceId::BROADCAST, DeviceId::TOOL, mode]
}

/// `{0x6C, Pcm, Tool, 0x3C, VinN}` for `n in {1, 2, 3}`.
pub fn create_vin_request(n: u8) -> Message {
    let block_id = match n {
        1 => BlockId::VIN1,
        2 => BlockId::VIN2,
        3 => BlockId::VIN3,
        other => panic!("invalid VIN block index: {other}"),
    };
    create_block_read_request(block_id)
}

fn create_block_read_request(block_id: u8) -> Message {
    let mut bytes = header(Mode::BLOCK_READ_REQUEST);
    bytes.push(block_id);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// Block-read request whose response parses as a 32-bit big-endian integer.
pub fn create_operating_system_id_read_request() -> Message {
    create_block_read_request(BlockId::OPERATING_SYSTEM_ID)
}

/// Block-read request whose response parses as a 32-bit big-endian integer.
pub fn create_hardware_id_read_request() -> Message {
    create_block_read_request(BlockId::HARDWARE_ID)
}

/// Block-read request whose response parses as a 32-bit big-endian integer.
pub fn create_calibration_id_read_request() -> Message {
    create_block_read_request(BlockId::CALIBRATION_ID)
}

/// Block-read request for the Broadcast Code.
pub fn create_bcc_request() -> Message {
    create_block_read_request(BlockId::BCC)
}

/// Block-read request for the Manufacturer Enable Counter.
pub fn create_mec_request() -> Message {
    create_block_read_request(BlockId::MEC)
}

/// Block-read request for one of the three serial-number blocks.
pub fn create_serial_request(n: u8) -> Message {
    let block_id = match n {
        1 => BlockId::SERIAL1,
        2 => BlockId::SERIAL2,
        3 => BlockId::SERIAL3,
        other => panic!("invalid serial block index: {other}"),
    };
    create_block_read_request(block_id)
}

/// `{0x6C, Pcm, Tool, 0x27, 0x01}`.
pub fn create_seed_request() -> Message {
    let mut bytes = header(Mode::SEED_REQUEST);
    bytes.push(Mode::SEED_SUBMODE_REQUEST);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// `{0x6C, Pcm, Tool, 0x27, 0x02, key_hi, key_lo}`.
pub fn create_unlock_request(key: u16) -> Message {
    let mut bytes = header(Mode::SEED_REQUEST);
    bytes.push(Mode::SEED_SUBMODE_SUBMIT_KEY);
    bytes.push((key >> 8) as u8);
    bytes.push(key as u8);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// Broadcast request asking every module whether switching to 4x VPW is
/// permitted. `dest` is normally [`DeviceId::BROADCAST`] but the factory
/// leaves the choice to the caller to mirror the spec's generic signature.
pub fn create_high_speed_permission_request(dest: u8) -> Message {
    let mut bytes = vec![Priority::PHYSICAL0, dest, DeviceId::TOOL, Mode::HIGH_SPEED_PREPARE];
    bytes.push(Mode::HIGH_SPEED);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// Broadcast request instructing modules to actually switch to 4x VPW.
pub fn create_begin_high_speed(dest: u8) -> Message {
    let bytes = vec![Priority::PHYSICAL0, dest, DeviceId::TOOL, Mode::HIGH_SPEED];
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// Chatter suppression: tells other modules to stop their normal broadcast
/// traffic so the bus is quiet for the unlock/upload/read sequence.
pub fn create_disable_normal_message_transmission() -> Message {
    let bytes = broadcast_header(Mode::DISABLE_NORMAL_MESSAGE_TRANSMISSION);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// Keep-alive sent periodically so modules do not drop the diagnostic
/// session while a long read-out is in progress.
pub fn create_tool_present() -> Message {
    let bytes = header(Mode::TOOL_PRESENT);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// Announces an upcoming kernel upload of `size` bytes to `address`.
pub fn create_upload_request(size: u32, address: u32) -> Message {
    let mut bytes = header(Mode::UPLOAD_REQUEST);
    push_u24(&mut bytes, address);
    let mut size_buf = [0u8; 4];
    BigEndian::write_u32(&mut size_buf, size);
    bytes.extend_from_slice(&size_buf);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// One chunk of a kernel upload (or, when re-used by the kernel itself over
/// the wire, one chunk of a memory block), see spec [4.5] `PCMExecute`.
///
/// `offset` is the byte offset of `payload[..length]` relative to the start
/// of the whole upload (used only to compute `address`, which is the actual
/// destination address written to the frame).
pub fn create_block_message(payload: &[u8], offset: usize, length: usize, address: u32, execute_on_load: bool) -> Message {
    let mut bytes = header(Mode::BLOCK_DATA);
    bytes.push(if execute_on_load { 1 } else { 0 });
    let mut len_buf = [0u8; 2];
    BigEndian::write_u16(&mut len_buf, length as u16);
    bytes.extend_from_slice(&len_buf);
    push_u24(&mut bytes, address);
    bytes.extend_from_slice(&payload[offset..offset + length]);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// Requests `length` bytes starting at `address` from the running kernel.
pub fn create_read_request(address: u32, length: u16) -> Message {
    let mut bytes = header(Mode::MEMORY_READ_REQUEST);
    push_u24(&mut bytes, address);
    let mut len_buf = [0u8; 2];
    BigEndian::write_u16(&mut len_buf, length);
    bytes.extend_from_slice(&len_buf);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// Tells the uploaded kernel to exit, returning the PCM to its normal
/// firmware.
pub fn create_exit_kernel() -> Message {
    let bytes = header(Mode::EXIT_KERNEL);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// Clears stored Diagnostic Trouble Codes.
pub fn create_clear_dtcs() -> Message {
    let bytes = header(Mode::CLEAR_DTCS_REQUEST);
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// The PCM's positive acknowledgement for a DTC clear, used only in tests
/// and dummies that simulate a PCM.
pub fn create_clear_dtcs_ok() -> Message {
    let bytes = vec![
        Priority::PHYSICAL0,
        DeviceId::TOOL,
        DeviceId::PCM,
        Mode::CLEAR_DTCS_RESPONSE,
    ];
    Message::new(bytes).expect("header is at least 4 bytes")
}

/// A 6-byte VIN write block for `block_id`, mode `0x3B`. `bytes6` must be
/// exactly 6 bytes (the first written block is front-padded with a zero
/// byte by the caller, per spec [4.5] `UpdateVin`).
pub fn create_vin_write_block(block_id: u8, bytes6: &[u8; 6]) -> Message {
    let mut bytes = header(Mode::BLOCK_WRITE_REQUEST);
    bytes.push(block_id);
    bytes.extend_from_slice(bytes6);
    Message::new(bytes).expect("header is at least 4 bytes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vin_request_is_five_bytes() {
        let m = create_vin_request(1);
        assert_eq!(
            m.as_bytes(),
            &[Priority::PHYSICAL0, DeviceId::PCM, DeviceId::TOOL, Mode::BLOCK_READ_REQUEST, BlockId::VIN1]
        );
    }

    #[test]
    fn seed_request_bytes() {
        let m = create_seed_request();
        assert_eq!(m.as_bytes(), &[0x6C, 0x10, 0xF0, 0x27, 0x01]);
    }

    #[test]
    fn unlock_request_bytes() {
        let m = create_unlock_request(0xBEEF);
        assert_eq!(m.as_bytes(), &[0x6C, 0x10, 0xF0, 0x27, 0x02, 0xBE, 0xEF]);
    }

    #[test]
    fn upload_request_address_is_big_endian_24_bit() {
        let m = create_upload_request(0x1234, 0xFF_913E);
        assert_eq!(m.payload(), &[0xFF, 0x91, 0x3E, 0x00, 0x00, 0x12, 0x34]);
    }

    #[test]
    fn block_message_carries_execute_flag() {
        let payload = [0xAA, 0xBB, 0xCC, 0xDD];
        let m = create_block_message(&payload, 0, 4, 0x1000, true);
        assert_eq!(m.mode(), Mode::BLOCK_DATA);
        assert_eq!(m.payload()[0], 1);
        assert_eq!(&m.payload()[6..10], &payload);
    }
}
