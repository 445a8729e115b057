//! Record log validation for E2E tests

use anyhow::{anyhow, bail, Result};
use meter_types::{CSV_COLUMN_COUNT, CSV_HEADER};
use std::collections::BTreeMap;

/// What a well-formed log contained
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogReport {
    pub records: usize,
    /// Records per device id
    pub per_device: BTreeMap<u32, usize>,
}

/// Check the header appears exactly once, first, and every other line is a
/// complete record; count records per device
pub fn validate_log(lines: &[String]) -> Result<LogReport> {
    let (header, records) = lines
        .split_first()
        .ok_or_else(|| anyhow!("Log is empty, header missing"))?;

    if header != CSV_HEADER {
        bail!("First line is not the header: {:?}", header);
    }

    let mut report = LogReport::default();
    for (index, line) in records.iter().enumerate() {
        if line == CSV_HEADER {
            bail!("Header repeated at line {}", index + 2);
        }

        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != CSV_COLUMN_COUNT {
            bail!(
                "Line {} has {} fields, expected {}: {:?}",
                index + 2,
                fields.len(),
                CSV_COLUMN_COUNT,
                line
            );
        }

        let device_id: u32 = fields[0]
            .parse()
            .map_err(|e| anyhow!("Line {} has a bad device id {:?}: {}", index + 2, fields[0], e))?;
        for value in &fields[2..] {
            value
                .parse::<f64>()
                .map_err(|e| anyhow!("Line {} has a bad value {:?}: {}", index + 2, value, e))?;
        }

        *report.per_device.entry(device_id).or_default() += 1;
        report.records += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::REFERENCE_LINE;

    fn log(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_accepts_well_formed_log() {
        let report = validate_log(&log(&[CSV_HEADER, REFERENCE_LINE, REFERENCE_LINE])).unwrap();
        assert_eq!(report.records, 2);
        assert_eq!(report.per_device.get(&7), Some(&2));
    }

    #[test]
    fn test_rejects_interleaved_line() {
        let broken = "7,2023-11-14 22:13:20,1.0,2.07,2023-11-14";
        assert!(validate_log(&log(&[CSV_HEADER, broken])).is_err());
    }

    #[test]
    fn test_rejects_repeated_header() {
        assert!(validate_log(&log(&[CSV_HEADER, REFERENCE_LINE, CSV_HEADER])).is_err());
    }

    #[test]
    fn test_rejects_missing_header() {
        assert!(validate_log(&log(&[REFERENCE_LINE])).is_err());
        assert!(validate_log(&[]).is_err());
    }
}
