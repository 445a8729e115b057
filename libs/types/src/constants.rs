//! Protocol and log-format constants
//!
//! The frame layout is fixed by the devices in the field; nothing here is
//! negotiated at runtime.

/// Size in bytes of one telemetry frame on the wire
pub const FRAME_SIZE: usize = 44;

/// Number of IEEE-754 single-precision measurements per frame
pub const MEASUREMENT_COUNT: usize = 9;

/// Byte offset of the first measurement (after `device_id` and `epoch_seconds`)
pub const MEASUREMENTS_OFFSET: usize = 8;

/// Decimal places kept for phase currents (A)
pub const CURRENT_DECIMALS: u32 = 2;

/// Decimal places kept for phase voltages (V)
pub const VOLTAGE_DECIMALS: u32 = 1;

/// Decimal places kept for forward active power (W)
pub const POWER_DECIMALS: u32 = 2;

/// `strftime` pattern for the report time column, always UTC
pub const REPORT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column separator of the record log
pub const CSV_SEPARATOR: char = ',';

/// Header row written once when the record log is created.
///
/// Columns: device id, report time, current A/B/C, voltage A/B/C,
/// forward active power A/B/C.
pub const CSV_HEADER: &str =
    "设备ID,上报时间,电流A,电流B,电流C,电压A,电压B,电压C,正向有功功率A,正向有功功率B,正向有功功率C";

/// Number of columns in every record line
pub const CSV_COLUMN_COUNT: usize = 2 + MEASUREMENT_COUNT;

// Compile-time layout check: 2 x u32 + 9 x f32
const _: () = assert!(MEASUREMENTS_OFFSET + MEASUREMENT_COUNT * 4 == FRAME_SIZE);
