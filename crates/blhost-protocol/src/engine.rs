//! One command exchange, start to finish.
//!
//! ```text
//! host                          device
//! ping               ->
//!                    <-         ping response (optional)
//! [get-property 0x0b ->
//!                    <-         ACK, get-property response
//!  ACK               ->]
//! command            ->
//!                    <-         ACK, response
//! ACK                ->
//! [DATA              ->         (per chunk)
//!                    <-         ACK | NACK | ABORT
//!                    <-         generic response
//!  ACK               ->]
//! [                  <-         DATA (until byte count reached)
//!  ACK               ->
//!                    <-         generic response
//!  ACK               ->]
//! ```
//!
//! Frame-level failures that leave the link usable are reported once the
//! handshake has been walked to its end. Only a dead link (timeout, port
//! error) stops a transaction on the spot.

use blhost_port::{SimpleRead, SimpleWrite};
use derive_more::IsVariant;
use log::{debug, trace, warn};

use crate::{
    Config, Result,
    err::{DecodeError, Error, FrameError},
    frame::{
        FrameKind, PingInfo, SpecialKind, StandardFrame, decode_ping_response, decode_special,
        decode_standard, encode_ping, encode_special, encode_standard,
    },
    packet::{CommandPacket, CommandTag, PacketHeader},
    property::Property,
    response::{ResponseKind, decode_response},
    status::Status,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, IsVariant)]
pub enum State {
    #[default]
    Idle,
    Pinged,
    CommandSent,
    DataPhase,
    Complete,
    Failed,
}

/// Outcome of a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    /// Status word of the last response the device sent
    pub status: u32,
    /// Command response words after the status
    pub params: Vec<u32>,
    /// Bytes collected in the receive phase
    pub data: Option<Vec<u8>>,
}

impl CommandResponse {
    pub fn into_parts(self) -> (u32, Vec<u32>) {
        (self.status, self.params)
    }
}

/// First non-fatal failure of a transaction, surfaced once the handshake is closed.
#[derive(Default)]
struct Deferred(Option<Error>);

impl Deferred {
    fn record(&mut self, e: Error) {
        warn!("{e}");
        if self.0.is_none() {
            self.0 = Some(e);
        }
    }

    /// Attach the device's closing status to a recorded abort.
    fn abort_status(&mut self, final_status: u32) {
        if let Some(Error::TransferAborted { status, .. }) = &mut self.0 {
            *status = Some(final_status);
        }
    }

    fn finish<T>(self, value: T) -> Result<T> {
        match self.0 {
            Some(e) => Err(e),
            None => Ok(value),
        }
    }
}

/// Split a fatal error out so `?` can end the transaction, leaving the rest to the caller.
fn fatal<U>(result: Result<U>) -> Result<Result<U>> {
    match result {
        Err(e) if e.is_fatal() => Err(e),
        r => Ok(r),
    }
}

fn parse_response(expected: u8, payload: &[u8]) -> Result<Vec<u32>> {
    let header = PacketHeader::parse(payload)?;
    if header.tag != expected {
        return Err(Error::UnexpectedTag {
            expected,
            found: header.tag,
        });
    }
    Ok(decode_response(expected, payload)?)
}

fn split_status(words: Vec<u32>) -> Result<(u32, Vec<u32>)> {
    let mut words = words.into_iter();
    let status = words.next().ok_or(DecodeError::MissingStatus)?;
    Ok((status, words.collect()))
}

/// Drives the host side of the protocol over an exclusively owned link.
pub struct Engine<T: SimpleRead + SimpleWrite> {
    io: T,
    config: Config,
    state: State,
    ping: Option<PingInfo>,
}

impl<T: SimpleRead + SimpleWrite> Engine<T> {
    pub fn new(io: T) -> Self {
        Self::with_config(io, Config::default())
    }

    pub fn with_config(io: T, config: Config) -> Self {
        Self {
            io,
            config,
            state: State::Idle,
            ping: None,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Ping response seen by the last transaction, if the device answered.
    pub fn ping_info(&self) -> Option<&PingInfo> {
        self.ping.as_ref()
    }

    pub fn io(&self) -> &T {
        &self.io
    }

    pub fn into_inner(self) -> T {
        self.io
    }

    fn set_state(&mut self, state: State) {
        debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        trace!(">> {}", hex::encode(bytes));
        self.io.write(bytes).map_err(|e| e.into())
    }

    fn ack(&mut self) -> Result<()> {
        self.send(&encode_special(SpecialKind::Ack))
    }

    fn send_command(&mut self, packet: &CommandPacket) -> Result<()> {
        let frame = encode_standard(FrameKind::Command, &packet.encode()?)?;
        self.send(&frame)
    }

    /// Ping the device.
    ///
    /// Not every device answers. Without a usable answer an ACK is sent to
    /// push the device into command mode and `None` is returned.
    pub fn ping(&mut self) -> Result<Option<PingInfo>> {
        self.send(&encode_ping())?;
        let info = match decode_ping_response(&mut self.io) {
            Ok(info) => {
                debug!("ping response: {info}");
                Some(info)
            }
            Err(FrameError::Port(e)) => return Err(Error::Port(e)),
            Err(e) => {
                debug!("no usable ping response ({e}), sending ACK");
                self.ack()?;
                None
            }
        };

        self.ping = info;
        Ok(info)
    }

    /// Read a COMMAND frame and decode it as `expected`.
    fn read_response(&mut self, expected: u8) -> Result<Vec<u32>> {
        let frame = decode_standard(&mut self.io)?;
        if frame.kind != FrameKind::Command {
            return Err(FrameError::UnexpectedMarker(frame.kind as u8).into());
        }
        parse_response(expected, &frame.payload)
    }

    /// Read the device's ACK for a command, then its response.
    fn read_acked_response(&mut self, expected: u8) -> Result<Vec<u32>> {
        match decode_special(&mut self.io)? {
            SpecialKind::Ack => self.read_response(expected),
            kind => Err(Error::NoResponse(kind)),
        }
    }

    /// Ask the device for its max packet size.
    ///
    /// Any failure short of a broken port falls back to the configured chunk
    /// size. The exchange is always closed with an ACK.
    fn negotiate_max_chunk(&mut self) -> Result<usize> {
        let query = CommandPacket::new(
            CommandTag::GetProperty as u8,
            0,
            vec![Property::MaxPacketSize as u32, 0],
        );
        self.send_command(&query)?;

        let response = match self.read_acked_response(ResponseKind::GetProperty as u8) {
            Err(e @ (Error::Port(_) | Error::Io(_))) => return Err(e),
            r => r,
        };
        self.ack()?;

        let negotiated = match response.and_then(split_status) {
            Ok((0, values)) => values
                .first()
                .filter(|v| **v > 0)
                .map(|v| (*v as usize).min(u16::MAX as usize)),
            Ok((status, _)) => {
                warn!("max packet size query rejected: {}", Status(status));
                None
            }
            Err(e) => {
                warn!("max packet size query failed: {e}");
                None
            }
        };

        Ok(match negotiated {
            Some(max_chunk) => {
                debug!("max chunk {max_chunk} bytes");
                max_chunk
            }
            None => {
                let max_chunk = self.config.fallback_chunk();
                warn!("falling back to {max_chunk} byte chunks");
                max_chunk
            }
        })
    }

    /// Read the generic response closing a data phase and ACK it.
    ///
    /// `early` is a response the device already sent in place of data.
    fn complete(
        &mut self,
        early: Option<Vec<u8>>,
        deferred: &mut Deferred,
    ) -> Result<Option<u32>> {
        let generic = ResponseKind::Generic as u8;
        let response = match early {
            Some(payload) => parse_response(generic, &payload),
            None => fatal(self.read_response(generic))?,
        };
        self.ack()?;

        match response.and_then(split_status) {
            Ok((status, _)) => Ok(Some(status)),
            Err(e) => {
                deferred.record(e);
                Ok(None)
            }
        }
    }

    fn send_data(
        &mut self,
        data: &[u8],
        max_chunk: usize,
        deferred: &mut Deferred,
    ) -> Result<Option<u32>> {
        let total = data.len().div_ceil(max_chunk);
        for (i, chunk) in data.chunks(max_chunk).enumerate() {
            self.send(&encode_standard(FrameKind::Data, chunk)?)?;
            match decode_special(&mut self.io) {
                Ok(SpecialKind::Ack) => (),
                Ok(reason) => {
                    deferred.record(Error::TransferAborted {
                        sent: i + 1,
                        total,
                        reason,
                        status: None,
                    });
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    deferred.record(e.into());
                    break;
                }
            }
        }

        let status = self.complete(None, deferred)?;
        if let Some(status) = status {
            deferred.abort_status(status);
        }
        Ok(status)
    }

    fn receive_data(
        &mut self,
        len: usize,
        deferred: &mut Deferred,
    ) -> Result<(Vec<u8>, Option<u32>)> {
        let mut data = Vec::with_capacity(len.min(u16::MAX as usize));
        let mut early = None;

        while data.len() < len {
            match decode_standard(&mut self.io) {
                Ok(StandardFrame {
                    kind: FrameKind::Data,
                    payload,
                }) => data.extend_from_slice(&payload),
                Ok(StandardFrame {
                    kind: FrameKind::Command,
                    payload,
                }) => {
                    debug!("device ended the transfer at {} of {len} bytes", data.len());
                    early = Some(payload);
                    break;
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    // Keep the byte count in step with what the device sent.
                    if let FrameError::BadCrc { payload, .. } = &e {
                        data.extend_from_slice(payload);
                    }
                    deferred.record(e.into());
                }
            }
            self.ack()?;
        }

        let status = self.complete(early, deferred)?;
        Ok((data, status))
    }

    /// Run one command exchange.
    ///
    /// `data_to_send` adds a size negotiation and a chunked DATA phase.
    /// `expect_receive` collects DATA frames until `command.params[1]` bytes
    /// arrived. `expected_response` is the response tag the command answers
    /// with.
    pub fn execute_command(
        &mut self,
        command: &CommandPacket,
        data_to_send: Option<&[u8]>,
        expect_receive: bool,
        expected_response: u8,
    ) -> Result<CommandResponse> {
        self.set_state(State::Idle);
        let result = self.transact(command, data_to_send, expect_receive, expected_response);
        self.set_state(if result.is_ok() {
            State::Complete
        } else {
            State::Failed
        });
        result
    }

    fn transact(
        &mut self,
        command: &CommandPacket,
        data_to_send: Option<&[u8]>,
        expect_receive: bool,
        expected_response: u8,
    ) -> Result<CommandResponse> {
        let receive_len = match (expect_receive, command.params.get(1)) {
            (false, _) => None,
            (true, Some(len)) => Some(*len as usize),
            (true, None) => {
                return Err(Error::InvalidArgument(
                    "receiving data needs the byte count as the second parameter".into(),
                ));
            }
        };

        self.io.set_timeout(self.config.timeout)?;
        let mut deferred = Deferred::default();

        self.ping()?;
        self.set_state(State::Pinged);

        let max_chunk = match data_to_send {
            Some(_) => self.negotiate_max_chunk()?,
            None => self.config.fallback_chunk(),
        };

        self.send_command(command)?;
        self.set_state(State::CommandSent);
        let response = fatal(self.read_acked_response(expected_response))?;
        // Closes the command phase and asks for the first DATA frame.
        self.ack()?;

        let (mut status, params) = match response.and_then(split_status) {
            Ok((status, params)) if !Status(status).is_success() => {
                if data_to_send.is_some() || receive_len.is_some() {
                    debug!("command rejected with {}, no data phase", Status(status));
                }
                return Ok(CommandResponse {
                    status,
                    params,
                    data: None,
                });
            }
            Ok(response) => response,
            // The device may have accepted the command anyway, so the data
            // phase still runs to keep both sides in step.
            Err(e) => {
                deferred.record(e);
                (Status::SUCCESS.0, vec![])
            }
        };

        if let Some(data) = data_to_send {
            self.set_state(State::DataPhase);
            if let Some(s) = self.send_data(data, max_chunk, &mut deferred)? {
                status = s;
            }
        }

        let mut received = None;
        if let Some(len) = receive_len {
            self.set_state(State::DataPhase);
            let (data, completion) = self.receive_data(len, &mut deferred)?;
            if let Some(s) = completion {
                status = s;
            }
            received = Some(data);
        }

        deferred.finish(CommandResponse {
            status,
            params,
            data: received,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use blhost_port::mock::MockPort;

    use super::*;
    use crate::testutil::*;

    fn get_property() -> CommandPacket {
        CommandPacket::new(0x07, 0, vec![0x0b, 0])
    }

    fn write_memory(len: u32) -> CommandPacket {
        CommandPacket::new(0x04, 0, vec![0x2000_0000, len, 0])
    }

    fn read_memory(len: u32) -> CommandPacket {
        CommandPacket::new(0x03, 0, vec![0x1000, len, 0])
    }

    fn negotiated(max_chunk: u32) -> MockPort {
        MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(response(0xa7, &[0, max_chunk]))
    }

    /// Command phase plus `chunks` ACKed DATA frames and the closing response.
    fn write_device(port: MockPort, chunks: usize) -> MockPort {
        let mut port = port.reply(ACK_FRAME).reply(response(0xa0, &[0, 0x04]));
        for _ in 0..chunks {
            port = port.reply(ACK_FRAME);
        }
        port.reply(response(0xa0, &[0, 0x04]))
    }

    #[test]
    fn test_get_property() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(response(0xa7, &[0, 512]));
        let mut engine = Engine::new(port);

        let response = engine
            .execute_command(&get_property(), None, false, 0xa7)
            .unwrap();
        assert_eq!(response.clone().into_parts(), (0, vec![512]));
        assert_eq!(response.data, None);
        assert!(engine.state().is_complete());
        assert_eq!(engine.ping_info().map(|p| p.major()), Some(2));

        let port = engine.into_inner();
        let frames = host_frames(port.tx());
        assert_eq!(markers(port.tx()), [0xa6, 0xa4, 0xa1]);
        assert_eq!(frames[1].1, [0x07, 0, 0, 2, 0x0b, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(port.timeouts(), [Duration::from_secs(1)]);
        assert!(port.is_drained());
    }

    #[test]
    fn test_silent_ping_is_nudged() {
        let port = MockPort::new()
            .silence()
            .reply(ACK_FRAME)
            .reply(response(0xa7, &[0, 0x4b010200]));
        let mut engine = Engine::new(port);

        let response = engine
            .execute_command(&get_property(), None, false, 0xa7)
            .unwrap();
        assert_eq!(response.params, [0x4b010200]);
        assert!(engine.ping_info().is_none());
        assert_eq!(markers(engine.io().tx()), [0xa6, 0xa1, 0xa4, 0xa1]);
    }

    #[test]
    fn test_write_is_chunked_by_negotiated_size() {
        let data: Vec<u8> = (0..1300u32).map(|i| i as u8).collect();
        let mut engine = Engine::new(write_device(negotiated(512), 3));

        let response = engine
            .execute_command(&write_memory(1300), Some(&data), false, 0xa0)
            .unwrap();
        assert_eq!(response.status, 0);

        let port = engine.into_inner();
        assert_eq!(data_lens(port.tx()), [512, 512, 276]);
        assert_eq!(
            markers(port.tx()),
            [0xa6, 0xa4, 0xa1, 0xa4, 0xa1, 0xa5, 0xa5, 0xa5, 0xa1]
        );
        let sent: Vec<u8> = host_frames(port.tx())
            .into_iter()
            .filter(|(m, _)| *m == 0xa5)
            .flat_map(|(_, p)| p)
            .collect();
        assert_eq!(sent, data);
        assert!(port.is_drained());
    }

    #[test]
    fn test_exact_multiple_of_chunk() {
        let mut engine = Engine::new(write_device(negotiated(256), 2));
        engine
            .execute_command(&write_memory(512), Some(&[0x11; 512]), false, 0xa0)
            .unwrap();
        assert_eq!(data_lens(engine.io().tx()), [256, 256]);
    }

    #[test]
    fn test_negotiation_falls_back_to_512() {
        let failures = [
            MockPort::new().reply(ping_response()).silence(),
            MockPort::new()
                .reply(ping_response())
                .reply(ACK_FRAME)
                .reply(corrupt(response(0xa7, &[0, 1024]))),
            MockPort::new().reply(ping_response()).reply(NACK_FRAME),
            MockPort::new()
                .reply(ping_response())
                .reply(ACK_FRAME)
                .reply(response(0xa7, &[0, 0])),
            MockPort::new()
                .reply(ping_response())
                .reply(ACK_FRAME)
                .reply(response(0xa7, &[10300])),
        ];

        for port in failures {
            let mut engine = Engine::new(write_device(port, 2));
            let response = engine
                .execute_command(&write_memory(1000), Some(&[0xee; 1000]), false, 0xa0)
                .unwrap();
            assert_eq!(response.status, 0);

            let port = engine.into_inner();
            assert_eq!(data_lens(port.tx()), [512, 488]);
            assert!(port.is_drained());
        }
    }

    #[test]
    fn test_abort_stops_chunks() {
        for (frame, kind) in [
            (ABORT_FRAME, SpecialKind::Abort),
            (NACK_FRAME, SpecialKind::Nack),
        ] {
            let port = negotiated(512)
                .reply(ACK_FRAME)
                .reply(response(0xa0, &[0, 0x04]))
                .reply(ACK_FRAME)
                .reply(frame)
                .reply(response(0xa0, &[10002, 0x04]));
            let mut engine = Engine::new(port);

            let err = engine
                .execute_command(&write_memory(2000), Some(&[0; 2000]), false, 0xa0)
                .unwrap_err();
            assert!(matches!(
                err,
                Error::TransferAborted {
                    sent: 2,
                    total: 4,
                    reason,
                    status: Some(10002),
                } if reason == kind
            ));
            assert!(engine.state().is_failed());

            let port = engine.into_inner();
            assert_eq!(data_lens(port.tx()), [512, 512]);
            assert_eq!(markers(port.tx()).last(), Some(&0xa1));
            assert!(port.is_drained());
        }
    }

    #[test]
    fn test_chunk_ack_timeout_ends_transaction() {
        let port = negotiated(512)
            .reply(ACK_FRAME)
            .reply(response(0xa0, &[0, 0x04]))
            .reply(ACK_FRAME)
            .silence();
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&write_memory(1300), Some(&[0; 1300]), false, 0xa0)
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert!(engine.state().is_failed());

        let port = engine.into_inner();
        assert_eq!(data_lens(port.tx()), [512, 512]);
        assert_eq!(
            markers(port.tx()),
            [0xa6, 0xa4, 0xa1, 0xa4, 0xa1, 0xa5, 0xa5]
        );
    }

    #[test]
    fn test_garbage_after_chunk_stops_sending() {
        let port = negotiated(512)
            .reply(ACK_FRAME)
            .reply(response(0xa0, &[0, 0x04]))
            .reply([0x00, 0xa1])
            .reply(response(0xa0, &[0, 0x04]));
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&write_memory(1300), Some(&[0; 1300]), false, 0xa0)
            .unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::BadStartByte(0x00))));
        assert!(engine.state().is_failed());

        let port = engine.into_inner();
        assert_eq!(data_lens(port.tx()), [512]);
        assert_eq!(
            markers(port.tx()),
            [0xa6, 0xa4, 0xa1, 0xa4, 0xa1, 0xa5, 0xa1]
        );
        assert!(port.is_drained());
    }

    #[test]
    fn test_bad_crc_command_response_still_sends_data() {
        let port = negotiated(512)
            .reply(ACK_FRAME)
            .reply(corrupt(response(0xa0, &[0, 0x04])))
            .reply(ACK_FRAME)
            .reply(response(0xa0, &[0, 0x04]));
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&write_memory(100), Some(&[0x33; 100]), false, 0xa0)
            .unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::BadCrc { .. })));
        assert!(engine.state().is_failed());

        let port = engine.into_inner();
        assert_eq!(data_lens(port.tx()), [100]);
        assert_eq!(
            markers(port.tx()),
            [0xa6, 0xa4, 0xa1, 0xa4, 0xa1, 0xa5, 0xa1]
        );
        assert!(port.is_drained());
    }

    #[test]
    fn test_bad_crc_command_response_still_receives() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(corrupt(response(0xa3, &[0, 4])))
            .reply(data(&[1, 2, 3, 4]))
            .reply(response(0xa0, &[0, 0x03]));
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&read_memory(4), None, true, 0xa3)
            .unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::BadCrc { .. })));

        let port = engine.into_inner();
        assert_eq!(markers(port.tx()), [0xa6, 0xa4, 0xa1, 0xa1, 0xa1]);
        assert!(port.is_drained());
    }

    #[test]
    fn test_bad_crc_still_acked() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(corrupt(response(0xa7, &[0, 512])));
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&get_property(), None, false, 0xa7)
            .unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::BadCrc { .. })));
        assert!(engine.state().is_failed());

        let port = engine.into_inner();
        assert_eq!(markers(port.tx()), [0xa6, 0xa4, 0xa1]);
        assert!(port.is_drained());
    }

    #[test]
    fn test_unexpected_tag() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(response(0xa0, &[0, 0x07]));
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&get_property(), None, false, 0xa7)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedTag {
                expected: 0xa7,
                found: 0xa0
            }
        ));
        assert_eq!(markers(engine.io().tx()), [0xa6, 0xa4, 0xa1]);
    }

    #[test]
    fn test_unsupported_tag() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(response(0xb5, &[0]));
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&CommandPacket::new(0x15, 0, vec![]), None, false, 0xb5)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Decode(DecodeError::UnsupportedTag(0xb5))
        ));
    }

    #[test]
    fn test_nack_is_no_response() {
        let port = MockPort::new().reply(ping_response()).reply(NACK_FRAME);
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&get_property(), None, false, 0xa7)
            .unwrap_err();
        assert!(matches!(err, Error::NoResponse(SpecialKind::Nack)));
        assert_eq!(markers(engine.io().tx()), [0xa6, 0xa4, 0xa1]);
    }

    #[test]
    fn test_timeout_ends_transaction() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .silence();
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&get_property(), None, false, 0xa7)
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert!(engine.state().is_failed());
        assert_eq!(markers(engine.io().tx()), [0xa6, 0xa4]);
    }

    #[test]
    fn test_rejected_write_skips_data_phase() {
        let port = negotiated(512)
            .reply(ACK_FRAME)
            .reply(response(0xa0, &[10001, 0x04]));
        let mut engine = Engine::new(port);

        let response = engine
            .execute_command(&write_memory(100), Some(&[0; 100]), false, 0xa0)
            .unwrap();
        assert_eq!(response.status, 10001);

        let port = engine.into_inner();
        assert_eq!(markers(port.tx()), [0xa6, 0xa4, 0xa1, 0xa4, 0xa1]);
        assert!(port.is_drained());
    }

    #[test]
    fn test_receive() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(response(0xa3, &[0, 10]))
            .reply(data(&[1, 2, 3, 4, 5, 6]))
            .reply(data(&[7, 8, 9, 10]))
            .reply(response(0xa0, &[0, 0x03]));
        let mut engine = Engine::new(port);

        let response = engine
            .execute_command(&read_memory(10), None, true, 0xa3)
            .unwrap();
        assert_eq!(response.status, 0);
        assert_eq!(response.params, [10]);
        assert_eq!(response.data, Some((1..=10).collect()));

        let port = engine.into_inner();
        assert_eq!(markers(port.tx()), [0xa6, 0xa4, 0xa1, 0xa1, 0xa1, 0xa1]);
        assert!(port.is_drained());
    }

    #[test]
    fn test_receive_ended_early_by_device() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(response(0xa3, &[0, 10]))
            .reply(data(&[1, 2, 3, 4]))
            .reply(response(0xa0, &[1, 0x03]));
        let mut engine = Engine::new(port);

        let response = engine
            .execute_command(&read_memory(10), None, true, 0xa3)
            .unwrap();
        assert_eq!(response.status, 1);
        assert_eq!(response.data, Some(vec![1, 2, 3, 4]));

        let port = engine.into_inner();
        assert_eq!(markers(port.tx()), [0xa6, 0xa4, 0xa1, 0xa1, 0xa1]);
        assert!(port.is_drained());
    }

    #[test]
    fn test_receive_bad_crc_keeps_in_step() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(response(0xa3, &[0, 10]))
            .reply(corrupt(data(&[1, 2, 3, 4, 5, 6])))
            .reply(data(&[7, 8, 9, 10]))
            .reply(response(0xa0, &[0, 0x03]));
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&read_memory(10), None, true, 0xa3)
            .unwrap_err();
        assert!(matches!(err, Error::Frame(FrameError::BadCrc { .. })));

        let port = engine.into_inner();
        assert_eq!(markers(port.tx()), [0xa6, 0xa4, 0xa1, 0xa1, 0xa1, 0xa1]);
        assert!(port.is_drained());
    }

    #[test]
    fn test_silent_data_ends_receive() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(response(0xa3, &[0, 10]))
            .reply(data(&[1, 2, 3, 4, 5, 6]))
            .silence();
        let mut engine = Engine::new(port);

        let err = engine
            .execute_command(&read_memory(10), None, true, 0xa3)
            .unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert!(engine.state().is_failed());
        assert_eq!(markers(engine.io().tx()), [0xa6, 0xa4, 0xa1, 0xa1]);
    }

    #[test]
    fn test_huge_byte_count_ended_by_device() {
        let port = MockPort::new()
            .reply(ping_response())
            .reply(ACK_FRAME)
            .reply(response(0xa3, &[0, u32::MAX]))
            .reply(data(&[0xaa; 64]))
            .reply(response(0xa0, &[0, 0x03]));
        let mut engine = Engine::new(port);

        let response = engine
            .execute_command(&read_memory(u32::MAX), None, true, 0xa3)
            .unwrap();
        let data = response.data.unwrap();
        assert_eq!(data.len(), 64);
        assert!(data.capacity() < 1 << 20);
    }

    #[test]
    fn test_receive_needs_byte_count() {
        let mut engine = Engine::new(MockPort::new());
        let err = engine
            .execute_command(&CommandPacket::new(0x03, 0, vec![0x1000]), None, true, 0xa3)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(engine.io().tx().is_empty());
    }
}
