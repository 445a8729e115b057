//! Frames and expected log lines shared by the scenarios

use meter_codec::encode_frame;
use meter_types::{MeterFrame, PhaseValues, FRAME_SIZE};

/// Log line the reference frame must produce
pub const REFERENCE_LINE: &str =
    "7,2023-11-14 22:13:20,1.0,2.0,3.0,220.0,221.0,222.0,100.0,200.0,300.0";

/// device 7 at 1700000000 with round-number readings
pub fn reference_frame() -> MeterFrame {
    MeterFrame {
        device_id: 7,
        epoch_seconds: 1_700_000_000,
        currents: PhaseValues::new(1.0, 2.0, 3.0),
        voltages: PhaseValues::new(220.0, 221.0, 222.0),
        active_power: PhaseValues::new(100.0, 200.0, 300.0),
    }
}

pub fn reference_bytes() -> [u8; FRAME_SIZE] {
    encode_frame(&reference_frame())
}

/// Frame whose device id and epoch identify its sender and sequence number
pub fn tagged_frame(device_id: u32, sequence: u32) -> [u8; FRAME_SIZE] {
    encode_frame(&MeterFrame {
        device_id,
        epoch_seconds: 1_700_000_000 + sequence,
        ..reference_frame()
    })
}
