//! The generic send-one/receive-one/parse-one primitive every simple
//! request in the engine is built on. See spec [4.4].

use crate::constants::{MAX_RECEIVE_ATTEMPTS, MAX_SEND_ATTEMPTS};
use crate::device::Device;
use crate::logger::Logger;
use crate::message::Message;
use crate::response::{Response, ResponseStatus};

/// Waits for up to `MAX_RECEIVE_ATTEMPTS` inbound messages, draining any
/// that parse as `Timeout`/`UnexpectedResponse` and returning the first
/// message whose parse is definitive (`Success` or a terminal failure). A
/// `None` from the device (nothing arrived this attempt) ends the wait
/// early with `Response::timeout()`.
pub async fn receive_with_retry<D, L, T>(device: &mut D, logger: &mut L, parse: impl Fn(&Message) -> Response<T>) -> Response<T>
where
    D: Device,
    L: Logger,
    T: Default,
{
    for _ in 0..MAX_RECEIVE_ATTEMPTS {
        match device.receive_message().await {
            Some(received) => {
                let response = parse(&received);
                match response.status {
                    ResponseStatus::Timeout | ResponseStatus::UnexpectedResponse => {
                        logger.add_debug_message("draining unrelated or stale response");
                        continue;
                    }
                    _ => return response,
                }
            }
            None => break,
        }
    }
    Response::timeout()
}

/// Sends `build()`'s message, with retry, then waits for a matching
/// response, with retry, parsing each inbound message with `parse`.
///
/// The first `Success` wins. `Timeout` and `UnexpectedResponse` are
/// retried locally (a stray message is drained, not treated as the
/// answer); any other status is a definitive outcome and is returned
/// immediately. If no send round produces an answer within
/// `MAX_SEND_ATTEMPTS`, returns `Response::timeout()`.
pub async fn query<D, L, T>(
    device: &mut D,
    logger: &mut L,
    mut build: impl FnMut() -> Message,
    parse: impl Fn(&Message) -> Response<T>,
) -> Response<T>
where
    D: Device,
    L: Logger,
    T: Default,
{
    for send_attempt in 0..MAX_SEND_ATTEMPTS {
        let message = build();
        if !device.send_message(&message).await {
            logger.add_debug_message(&format!("send attempt {send_attempt} failed, retrying"));
            continue;
        }

        let response = receive_with_retry(device, logger, &parse).await;
        if response.status != ResponseStatus::Timeout {
            return response;
        }
        // A bare Timeout here can mean either "nothing arrived" or "drained
        // attempts exhausted"; either way the whole send round is retried.
    }

    logger.add_debug_message("query exhausted all send attempts");
    Response::timeout()
}

/// Sends `build()`'s message, with retry, and returns the first inbound
/// message as-is, with no parsing. Used where shape validation only makes
/// sense after combining several raw responses (e.g. the three VIN block
/// responses), so the retry loop can't yet tell success from failure.
pub async fn receive_one<D, L>(device: &mut D, logger: &mut L, mut build: impl FnMut() -> Message) -> Response<Message>
where
    D: Device,
    L: Logger,
{
    query(device, logger, &mut build, |m| Response::success(m.clone())).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DummyDevice, DummyLogger};

    #[tokio::test]
    async fn accepts_first_success() {
        let mut device = DummyDevice::new();
        device.queue_inbound(Message::new(vec![0xAA, 0xBB, 0xCC, 0xDD]).unwrap());
        let mut logger = DummyLogger::default();

        let result = query(
            &mut device,
            &mut logger,
            || Message::new(vec![0x6C, 0x10, 0xF0, 0x3C]).unwrap(),
            |m| Response::success(m.as_bytes().to_vec()),
        )
        .await;

        assert!(result.is_success());
        assert_eq!(result.value, vec![0xAA, 0xBB, 0xCC, 0xDD]);
    }

    #[tokio::test]
    async fn times_out_with_no_inbound_messages() {
        let mut device = DummyDevice::new();
        let mut logger = DummyLogger::default();

        let result: Response<Vec<u8>> = query(
            &mut device,
            &mut logger,
            || Message::new(vec![0x6C, 0x10, 0xF0, 0x3C]).unwrap(),
            |m| Response::success(m.as_bytes().to_vec()),
        )
        .await;

        assert_eq!(result.status, ResponseStatus::Timeout);
    }

    #[tokio::test]
    async fn drains_unexpected_before_accepting_match() {
        let mut device = DummyDevice::new();
        device.queue_inbound(Message::new(vec![0xDE, 0xAD, 0xBE, 0xEF]).unwrap());
        device.queue_inbound(Message::new(vec![0x6C, 0xF0, 0x10, 0x7C, 42]).unwrap());
        let mut logger = DummyLogger::default();

        let result = query(
            &mut device,
            &mut logger,
            || Message::new(vec![0x6C, 0x10, 0xF0, 0x3C]).unwrap(),
            |m| {
                if m.as_bytes().first() == Some(&0x6C) && m.len() == 5 {
                    Response::success(m.as_bytes()[4])
                } else {
                    Response::unexpected()
                }
            },
        )
        .await;

        assert!(result.is_success());
        assert_eq!(result.value, 42);
    }
}
