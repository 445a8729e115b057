//! # Frame Codec
//!
//! Pure arithmetic packing and unpacking of the 44-byte telemetry frame.
//!
//! ## Performance Profile
//!
//! - **Allocation**: none; decoding reads straight from the input slice,
//!   encoding writes into a stack array or a caller-provided `BufMut`
//! - **Validation**: length only; every bit pattern is a valid frame

use crate::error::{ProtocolError, ProtocolResult};
use bytes::{Buf, BufMut};
use meter_types::{MeterFrame, Record, FRAME_SIZE, MEASUREMENT_COUNT};

/// Unpack one frame without applying display rounding
pub fn parse_frame(data: &[u8]) -> ProtocolResult<MeterFrame> {
    if data.len() != FRAME_SIZE {
        return Err(ProtocolError::frame_length(data.len()));
    }

    let mut buf = data;
    let device_id = buf.get_u32_le();
    let epoch_seconds = buf.get_u32_le();
    let mut values = [0f32; MEASUREMENT_COUNT];
    for value in values.iter_mut() {
        *value = buf.get_f32_le();
    }

    Ok(MeterFrame::from_measurements(device_id, epoch_seconds, values))
}

/// Decode one frame into a display-ready [`Record`]
///
/// Fails with [`ProtocolError::FrameLength`] unless `data` is exactly
/// [`FRAME_SIZE`] bytes; never partially succeeds.
pub fn decode_frame(data: &[u8]) -> ProtocolResult<Record> {
    parse_frame(data).map(|frame| Record::from_frame(&frame))
}

/// Append the wire form of `frame` to `out`
pub fn encode_into<B: BufMut>(frame: &MeterFrame, out: &mut B) {
    out.put_u32_le(frame.device_id);
    out.put_u32_le(frame.epoch_seconds);
    for value in frame.measurements() {
        out.put_f32_le(value);
    }
}

/// Pack a frame exactly as a device transmits it
pub fn encode_frame(frame: &MeterFrame) -> [u8; FRAME_SIZE] {
    let mut bytes = [0u8; FRAME_SIZE];
    encode_into(frame, &mut &mut bytes[..]);
    bytes
}

/// Pack the frame equivalent of an already decoded record
pub fn encode_record(record: &Record) -> [u8; FRAME_SIZE] {
    encode_frame(&record.to_frame())
}
