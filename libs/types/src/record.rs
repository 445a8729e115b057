//! Decoded, display-ready meter reading
//!
//! A [`Record`] is what the collector persists: the frame's identity fields,
//! the report time as a UTC calendar timestamp, and the nine measurements
//! rounded per quantity (currents 2 dp, voltages 1 dp, power 2 dp).

use crate::constants::{
    CSV_SEPARATOR, CURRENT_DECIMALS, POWER_DECIMALS, REPORT_TIME_FORMAT, VOLTAGE_DECIMALS,
};
use crate::frame::{MeterFrame, PhaseValues};
use crate::precision::{render_decimal, round_to_decimals};
use chrono::{DateTime, Utc};
use std::fmt;

/// One decoded reading. Immutable once produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    device_id: u32,
    epoch_seconds: u32,
    reported_at: DateTime<Utc>,
    currents: PhaseValues<f64>,
    voltages: PhaseValues<f64>,
    active_power: PhaseValues<f64>,
}

impl Record {
    /// Apply the display rounding rules to a raw frame
    pub fn from_frame(frame: &MeterFrame) -> Self {
        let widen = |decimals: u32| move |v: f32| round_to_decimals(v as f64, decimals);

        Self {
            device_id: frame.device_id,
            epoch_seconds: frame.epoch_seconds,
            // Every u32 second count is inside chrono's range
            reported_at: DateTime::from_timestamp(i64::from(frame.epoch_seconds), 0)
                .unwrap_or_default(),
            currents: frame.currents.map(widen(CURRENT_DECIMALS)),
            voltages: frame.voltages.map(widen(VOLTAGE_DECIMALS)),
            active_power: frame.active_power.map(widen(POWER_DECIMALS)),
        }
    }

    /// Frame carrying this record's values, as a device would send it
    pub fn to_frame(&self) -> MeterFrame {
        let narrow = |v: f64| v as f32;
        MeterFrame {
            device_id: self.device_id,
            epoch_seconds: self.epoch_seconds,
            currents: self.currents.map(narrow),
            voltages: self.voltages.map(narrow),
            active_power: self.active_power.map(narrow),
        }
    }

    pub fn device_id(&self) -> u32 {
        self.device_id
    }

    pub fn epoch_seconds(&self) -> u32 {
        self.epoch_seconds
    }

    pub fn reported_at(&self) -> DateTime<Utc> {
        self.reported_at
    }

    pub fn currents(&self) -> PhaseValues<f64> {
        self.currents
    }

    pub fn voltages(&self) -> PhaseValues<f64> {
        self.voltages
    }

    pub fn active_power(&self) -> PhaseValues<f64> {
        self.active_power
    }

    /// Report time as `YYYY-MM-DD HH:MM:SS` (UTC)
    pub fn report_time(&self) -> String {
        self.reported_at.format(REPORT_TIME_FORMAT).to_string()
    }

    /// Column values in log order: device id, time, current A/B/C,
    /// voltage A/B/C, power A/B/C
    pub fn csv_fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(crate::CSV_COLUMN_COUNT);
        fields.push(self.device_id.to_string());
        fields.push(self.report_time());
        for group in [self.currents, self.voltages, self.active_power] {
            fields.extend(group.to_array().into_iter().map(render_decimal));
        }
        fields
    }

    /// One newline-terminated log line
    pub fn to_csv_line(&self) -> String {
        let mut line = self.csv_fields().join(&CSV_SEPARATOR.to_string());
        line.push('\n');
        line
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.csv_fields().join(&CSV_SEPARATOR.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CSV_COLUMN_COUNT;

    fn sample_frame() -> MeterFrame {
        MeterFrame {
            device_id: 1003,
            epoch_seconds: 0,
            currents: PhaseValues::new(12.345, 0.001, 99.999),
            voltages: PhaseValues::new(219.96, 230.04, 210.55),
            active_power: PhaseValues::new(4999.994, 0.0, 10_000.0),
        }
    }

    #[test]
    fn test_rounding_rules_per_quantity() {
        let record = Record::from_frame(&sample_frame());

        assert_eq!(record.currents(), PhaseValues::new(12.35, 0.0, 100.0));
        assert_eq!(record.voltages(), PhaseValues::new(220.0, 230.0, 210.6));
        assert_eq!(record.active_power(), PhaseValues::new(4999.99, 0.0, 10_000.0));
    }

    #[test]
    fn test_report_time_is_utc() {
        let record = Record::from_frame(&sample_frame());
        assert_eq!(record.report_time(), "1970-01-01 00:00:00");

        let late = MeterFrame {
            epoch_seconds: u32::MAX,
            ..sample_frame()
        };
        assert_eq!(Record::from_frame(&late).report_time(), "2106-02-07 06:28:15");
    }

    #[test]
    fn test_csv_line_layout() {
        let record = Record::from_frame(&sample_frame());
        let line = record.to_csv_line();

        assert!(line.ends_with('\n'));
        let columns: Vec<&str> = line.trim_end().split(',').collect();
        assert_eq!(columns.len(), CSV_COLUMN_COUNT);
        assert_eq!(columns[0], "1003");
        assert_eq!(columns[1], "1970-01-01 00:00:00");
        assert_eq!(&columns[2..5], &["12.35", "0.0", "100.0"]);
        assert_eq!(&columns[5..8], &["220.0", "230.0", "210.6"]);
        assert_eq!(&columns[8..], &["4999.99", "0.0", "10000.0"]);
        assert_eq!(record.to_string(), line.trim_end());
    }

    #[test]
    fn test_to_frame_reproduces_rounded_values() {
        let record = Record::from_frame(&sample_frame());
        let again = Record::from_frame(&record.to_frame());
        assert_eq!(again, record);
    }
}
