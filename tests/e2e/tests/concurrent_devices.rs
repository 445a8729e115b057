//! Many devices writing into one record log at once

use meter_config::SimulatorConfig;
use meter_e2e_tests::{tagged_frame, validate_log, TestCollector};
use meter_simulator::run_fleet;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_devices_produce_intact_lines() {
    const DEVICES: u32 = 16;
    const FRAMES: u32 = 40;

    let collector = TestCollector::start().await.unwrap();

    let mut devices = Vec::new();
    for device_id in 0..DEVICES {
        let addr = collector.addr();
        devices.push(tokio::spawn(async move {
            let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
            for sequence in 0..FRAMES {
                // Odd split so frames straddle writes
                let frame = tagged_frame(device_id, sequence);
                stream.write_all(&frame[..17]).await.unwrap();
                stream.write_all(&frame[17..]).await.unwrap();
            }
            stream.shutdown().await.unwrap();
        }));
    }
    for device in devices {
        device.await.unwrap();
    }

    let total = (DEVICES * FRAMES) as usize;
    let lines = collector
        .wait_for_records(total, Duration::from_secs(10))
        .await
        .unwrap();
    let report = validate_log(&lines).unwrap();

    assert_eq!(report.records, total);
    assert_eq!(report.per_device.len(), DEVICES as usize);
    assert!(report.per_device.values().all(|&n| n == FRAMES as usize));

    // Per-device order follows send order
    for device_id in 0..DEVICES {
        let prefix = format!("{},", device_id);
        let times: Vec<&str> = lines[1..]
            .iter()
            .filter(|l| l.starts_with(&prefix))
            .map(|l| l.split(',').nth(1).unwrap())
            .collect();
        let mut sorted = times.clone();
        sorted.sort_unstable();
        assert_eq!(times, sorted, "device {} out of order", device_id);
    }

    collector.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simulated_fleet_reaches_log() {
    let collector = TestCollector::start().await.unwrap();

    let mut config = SimulatorConfig::default();
    config.target.host = collector.addr().ip().to_string();
    config.target.port = collector.addr().port();
    config.devices.count = 5;
    config.devices.first_device_id = 1000;
    config.devices.send_interval_ms = 20;

    let (stop, shutdown) = watch::channel(false);
    let fleet = tokio::spawn(async move { run_fleet(&config, shutdown).await });

    // At least three readings from every device
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    let report = loop {
        let lines = collector.log_lines().await.unwrap();
        let report = validate_log(&lines).unwrap();
        if report.per_device.len() == 5 && report.per_device.values().all(|&n| n >= 3) {
            break report;
        }
        assert!(tokio::time::Instant::now() < deadline, "fleet too slow: {:?}", report);
        tokio::time::sleep(Duration::from_millis(50)).await;
    };
    assert_eq!(
        report.per_device.keys().copied().collect::<Vec<_>>(),
        vec![1000, 1001, 1002, 1003, 1004]
    );

    stop.send(true).unwrap();
    let fleet_report = fleet.await.unwrap().unwrap();
    assert_eq!(fleet_report.failures(), 0);

    let server_report = collector.shutdown().await.unwrap();
    assert_eq!(server_report.connections_accepted, 5);
    assert_eq!(server_report.decode_failures, 0);
}

#[tokio::test]
async fn test_connection_cap_serves_queued_devices_in_turn() {
    let collector = TestCollector::start_with(|config| {
        config.limits.max_connections = Some(2);
    })
    .await
    .unwrap();

    let mut streams = Vec::new();
    for device_id in 0..4 {
        let mut stream = collector.connect().await.unwrap();
        stream.write_all(&tagged_frame(device_id, 0)).await.unwrap();
        streams.push(stream);
    }

    collector
        .wait_for_records(2, Duration::from_secs(5))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(collector.log_lines().await.unwrap().len(), 3);

    // Closing served devices frees slots for the waiting ones
    drop(streams);
    let lines = collector
        .wait_for_records(4, Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(validate_log(&lines).unwrap().per_device.len(), 4);

    collector.shutdown().await.unwrap();
}
