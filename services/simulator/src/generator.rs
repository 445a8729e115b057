//! Random telemetry within realistic ranges

use meter_types::{
    round_to_decimals, MeterFrame, PhaseValues, CURRENT_DECIMALS, POWER_DECIMALS,
    VOLTAGE_DECIMALS,
};
use rand::Rng;
use std::ops::RangeInclusive;

/// Phase current range in A
pub const CURRENT_RANGE: RangeInclusive<f64> = 0.0..=100.0;
/// Phase voltage range in V
pub const VOLTAGE_RANGE: RangeInclusive<f64> = 210.0..=230.0;
/// Forward active power range in W
pub const POWER_RANGE: RangeInclusive<f64> = 0.0..=10_000.0;

/// One reading for `device_id`, pre-rounded to the precision the collector keeps
pub fn generate_frame<R: Rng>(device_id: u32, epoch_seconds: u32, rng: &mut R) -> MeterFrame {
    let mut phases = |range: &RangeInclusive<f64>, decimals: u32| {
        let mut sample = || round_to_decimals(rng.gen_range(range.clone()), decimals) as f32;
        PhaseValues::new(sample(), sample(), sample())
    };

    let currents = phases(&CURRENT_RANGE, CURRENT_DECIMALS);
    let voltages = phases(&VOLTAGE_RANGE, VOLTAGE_DECIMALS);
    let active_power = phases(&POWER_RANGE, POWER_DECIMALS);

    MeterFrame {
        device_id,
        epoch_seconds,
        currents,
        voltages,
        active_power,
    }
}

/// Wall-clock UTC seconds, saturated into the frame's `u32` field
pub fn current_epoch_seconds() -> u32 {
    let now = chrono::Utc::now().timestamp();
    u32::try_from(now.max(0)).unwrap_or(u32::MAX)
}
