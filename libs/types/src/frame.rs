//! Raw telemetry frame as transmitted by a metering device

use serde::{Deserialize, Serialize};

/// One value per electrical phase
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PhaseValues<T> {
    pub a: T,
    pub b: T,
    pub c: T,
}

impl<T: Copy> PhaseValues<T> {
    pub const fn new(a: T, b: T, c: T) -> Self {
        Self { a, b, c }
    }

    /// Values in wire order (A, B, C)
    pub fn to_array(self) -> [T; 3] {
        [self.a, self.b, self.c]
    }

    pub fn map<U: Copy>(self, f: impl Fn(T) -> U) -> PhaseValues<U> {
        PhaseValues {
            a: f(self.a),
            b: f(self.b),
            c: f(self.c),
        }
    }
}

impl<T: Copy> From<[T; 3]> for PhaseValues<T> {
    fn from(values: [T; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }
}

/// Unrounded contents of one 44-byte frame
///
/// Field order matches the wire layout: `device_id`, `epoch_seconds`, then
/// currents, voltages and forward active power for phases A, B, C.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MeterFrame {
    pub device_id: u32,
    /// UTC unix timestamp of the reading
    pub epoch_seconds: u32,
    pub currents: PhaseValues<f32>,
    pub voltages: PhaseValues<f32>,
    pub active_power: PhaseValues<f32>,
}

impl MeterFrame {
    /// The nine measurements in wire order
    pub fn measurements(&self) -> [f32; 9] {
        let [ia, ib, ic] = self.currents.to_array();
        let [va, vb, vc] = self.voltages.to_array();
        let [pa, pb, pc] = self.active_power.to_array();
        [ia, ib, ic, va, vb, vc, pa, pb, pc]
    }

    /// Rebuild a frame from identity fields and measurements in wire order
    pub fn from_measurements(device_id: u32, epoch_seconds: u32, values: [f32; 9]) -> Self {
        Self {
            device_id,
            epoch_seconds,
            currents: PhaseValues::new(values[0], values[1], values[2]),
            voltages: PhaseValues::new(values[3], values[4], values[5]),
            active_power: PhaseValues::new(values[6], values[7], values[8]),
        }
    }
}
