//! Single-connection scenarios against a real collector over TCP

use meter_e2e_tests::{reference_bytes, tagged_frame, validate_log, TestCollector, REFERENCE_LINE};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const WAIT: Duration = Duration::from_secs(5);

#[tokio::test]
async fn test_reference_frame_produces_reference_line() {
    let collector = TestCollector::start().await.unwrap();

    let mut device = collector.connect().await.unwrap();
    device.write_all(&reference_bytes()).await.unwrap();
    device.shutdown().await.unwrap();

    let lines = collector.wait_for_records(1, WAIT).await.unwrap();
    assert_eq!(lines[1], REFERENCE_LINE);

    let report = collector.shutdown().await.unwrap();
    assert_eq!(report.records_written, 1);
    assert_eq!(report.truncated_frames, 0);
}

#[tokio::test]
async fn test_connect_send_nothing_close() {
    let collector = TestCollector::start().await.unwrap();

    let device = collector.connect().await.unwrap();
    drop(device);

    // Give the handler time to observe EOF
    tokio::time::sleep(Duration::from_millis(100)).await;
    let lines = collector.log_lines().await.unwrap();
    assert_eq!(validate_log(&lines).unwrap().records, 0);

    let report = collector.shutdown().await.unwrap();
    assert_eq!(report.connections_accepted, 1);
    assert_eq!(report.connections_closed, 1);
    assert_eq!(report.records_written, 0);
    assert_eq!(report.truncated_frames, 0);
    assert_eq!(report.interrupted, 0);
}

#[tokio::test]
async fn test_fragmented_writes_are_reassembled() {
    let collector = TestCollector::start().await.unwrap();
    let frame = reference_bytes();
    let mut stream = frame.to_vec();
    stream.extend_from_slice(&frame);

    let mut device = collector.connect().await.unwrap();
    device.set_nodelay(true).unwrap();
    for chunk in [&stream[..3], &stream[3..50], &stream[50..51], &stream[51..]] {
        device.write_all(chunk).await.unwrap();
        device.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    device.shutdown().await.unwrap();

    let lines = collector.wait_for_records(2, WAIT).await.unwrap();
    assert_eq!(&lines[1..], &[REFERENCE_LINE.to_string(), REFERENCE_LINE.to_string()]);
    collector.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_coalesced_frames_in_one_write() {
    let collector = TestCollector::start().await.unwrap();

    let mut burst = Vec::new();
    for sequence in 0..5 {
        burst.extend_from_slice(&tagged_frame(42, sequence));
    }

    let mut device = collector.connect().await.unwrap();
    device.write_all(&burst).await.unwrap();
    device.shutdown().await.unwrap();

    let lines = collector.wait_for_records(5, WAIT).await.unwrap();
    let times: Vec<&str> = lines[1..]
        .iter()
        .map(|l| l.split(',').nth(1).unwrap())
        .collect();
    assert_eq!(
        times,
        vec![
            "2023-11-14 22:13:20",
            "2023-11-14 22:13:21",
            "2023-11-14 22:13:22",
            "2023-11-14 22:13:23",
            "2023-11-14 22:13:24",
        ]
    );
    collector.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_truncated_tail_yields_one_record() {
    let collector = TestCollector::start().await.unwrap();
    let frame = reference_bytes();

    let mut device = collector.connect().await.unwrap();
    device.write_all(&frame).await.unwrap();
    device.write_all(&frame[..20]).await.unwrap();
    device.shutdown().await.unwrap();
    drop(device);

    let lines = collector.wait_for_records(1, WAIT).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let report = collector.shutdown().await.unwrap();
    assert_eq!(report.records_written, 1);
    assert_eq!(report.truncated_frames, 1);
    assert_eq!(validate_log(&lines).unwrap().records, 1);
}

#[tokio::test]
async fn test_idle_connection_is_closed() {
    let collector = TestCollector::start_with(|config| {
        config.limits.idle_timeout_secs = Some(1);
    })
    .await
    .unwrap();

    let mut device = collector.connect().await.unwrap();
    device.write_all(&reference_bytes()).await.unwrap();
    collector.wait_for_records(1, WAIT).await.unwrap();

    // Collector closes its side; the device then reads EOF
    let mut buf = [0u8; 1];
    let read = tokio::time::timeout(
        Duration::from_secs(5),
        tokio::io::AsyncReadExt::read(&mut device, &mut buf),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(read, 0);

    let report = collector.shutdown().await.unwrap();
    assert_eq!(report.interrupted, 0);
}

#[tokio::test]
async fn test_existing_log_is_appended_not_truncated() {
    let first = TestCollector::start().await.unwrap();
    let path = first.log_path().to_path_buf();
    let mut device = first.connect().await.unwrap();
    device.write_all(&reference_bytes()).await.unwrap();
    device.shutdown().await.unwrap();
    first.wait_for_records(1, WAIT).await.unwrap();
    let before = first.log_lines().await.unwrap();

    // Second collector opens the same file
    let second = TestCollector::start_with(|config| config.output.path = path.clone())
        .await
        .unwrap();
    let mut device = second.connect().await.unwrap();
    device.write_all(&tagged_frame(8, 0)).await.unwrap();
    device.shutdown().await.unwrap();

    let after = second.wait_for_records(2, WAIT).await.unwrap();
    assert_eq!(&after[..before.len()], &before[..]);
    assert!(after[2].starts_with("8,"));
    assert_eq!(validate_log(&after).unwrap().records, 2);

    second.shutdown().await.unwrap();
    first.shutdown().await.unwrap();
}
