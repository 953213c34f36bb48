//! Exercises the protocol engine end to end against a scripted [`DummyDevice`]
//! standing in for a real pass-through adapter. Not part of the library;
//! this binary exists so the engine can be driven locally without hardware,
//! the way the teacher crate promotes its `dummy.rs` fixtures into runnable
//! examples for manual exercise.

use tokio_util::sync::CancellationToken;
use vpw_pcm::config::PcmInfo;
use vpw_pcm::constants::{BlockId, DeviceId, Mode, Priority};
use vpw_pcm::message::Message;
use vpw_pcm::testing::{DummyDevice, DummyKeyAlgorithm};
use vpw_pcm::{EngineConfig, LogCrateLogger, ProtocolEngine};

fn vin_block_response(block_id: u8, data: &[u8]) -> Message {
    let mut bytes = vec![Priority::PHYSICAL0, DeviceId::TOOL, DeviceId::PCM, Mode::BLOCK_READ_RESPONSE, block_id];
    bytes.extend_from_slice(data);
    Message::new(bytes).unwrap()
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let mut device = DummyDevice::new();
    // r1 carries a leading status byte the parser skips; see parser::parse_vin_responses.
    device.queue_inbound(vin_block_response(BlockId::VIN1, &[0x00, b'1', b'G', b'1', b'Y', b'Y']));
    device.queue_inbound(vin_block_response(BlockId::VIN2, &[b'2', b'S', b'2', b'1', b'3', b'M']));
    device.queue_inbound(vin_block_response(BlockId::VIN3, &[b'1', b'2', b'3', b'4', b'5', b'6']));

    let mut engine = ProtocolEngine::new(device, DummyKeyAlgorithm::default(), LogCrateLogger, EngineConfig::default());

    let vin = engine.query_vin().await;
    println!("VIN query: status={:?} value={:?}", vin.status, vin.value);

    let _info = PcmInfo {
        image_base_address: 0,
        image_size: 0,
        key_algorithm_id: 0,
    };
    let _cancel = CancellationToken::new();
    // A real `read_contents` run additionally needs a kernel image and a
    // device that actually understands the upload/read protocol; the
    // DummyDevice above only scripts the VIN exchange above, so the rest of
    // the pipeline is exercised in the crate's own integration tests
    // instead of here.
}
