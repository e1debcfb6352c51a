// SPDX-License-Identifier: MIT
// Copyright (c) 2026 The Ouroboros Authors

//! Wire format tests: length-prefix framing and JSON encoding.

use super::*;
use proptest::prelude::*;

#[test]
fn encode_returns_json_without_length_prefix() {
    let response = Response::Ok;
    let encoded = encode(&response).expect("encode failed");

    let json_str = std::str::from_utf8(&encoded).expect("should be valid UTF-8");
    assert!(json_str.starts_with('{'), "should be JSON object: {}", json_str);
}

#[tokio::test]
async fn read_write_message_roundtrip() {
    let original = b"hello world";

    let mut buffer = Vec::new();
    write_message(&mut buffer, original).await.expect("write failed");

    assert_eq!(buffer.len(), 4 + original.len());

    let mut cursor = std::io::Cursor::new(buffer);
    let read_back = read_message(&mut cursor).await.expect("read failed");

    assert_eq!(read_back, original);
}

#[tokio::test]
async fn write_message_adds_length_prefix() {
    let data = b"test data";

    let mut buffer = Vec::new();
    write_message(&mut buffer, data).await.expect("write failed");

    let len = u32::from_be_bytes([buffer[0], buffer[1], buffer[2], buffer[3]]) as usize;

    assert_eq!(len, data.len());
    assert_eq!(&buffer[4..], data);
}

#[tokio::test]
async fn read_message_rejects_an_oversized_length_prefix() {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(&(64 * 1024 * 1024u32).to_be_bytes());

    let mut cursor = std::io::Cursor::new(buffer);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge(_)));
}

fn arb_status_report() -> impl Strategy<Value = StatusReport> {
    (
        ".*",
        ".*",
        ".*",
        0.0..1_000_000.0f64,
        0u64..10_000,
        any::<bool>(),
        any::<bool>(),
        0u64..10_000,
        0usize..1_000,
        0usize..1_000,
    )
        .prop_map(
            |(session_id, current_branch, current_sha, spent_usd, spent_calls, evolution_mode_enabled, bg_consciousness_enabled, evolution_cycle, pending_tasks, running_tasks)| StatusReport {
                session_id,
                current_branch,
                current_sha,
                spent_usd,
                spent_calls,
                evolution_mode_enabled,
                bg_consciousness_enabled,
                evolution_cycle,
                pending_tasks,
                running_tasks,
            },
        )
}

proptest! {
    /// Any `StatusReport` the daemon could ever produce survives an
    /// encode-then-decode round trip byte-for-byte in every field — the
    /// control socket must never silently truncate or mangle a status
    /// reply on its way to `ouroctl`.
    #[test]
    fn status_report_round_trips_through_encode_decode(report in arb_status_report()) {
        let bytes = encode(&Response::Status(report.clone())).unwrap();
        let decoded: Response = decode(&bytes).unwrap();
        prop_assert_eq!(decoded, Response::Status(report));
    }
}

#[tokio::test]
async fn query_and_response_round_trip_over_the_wire() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, &encode(&Query::Status).unwrap()).await.unwrap();

    let mut cursor = std::io::Cursor::new(buffer);
    let query = read_query(&mut cursor).await.unwrap();
    assert_eq!(query, Query::Status);

    let response = Response::Status(StatusReport { session_id: "ses-1".to_string(), ..StatusReport::default() });
    let mut out = Vec::new();
    write_response(&mut out, &response).await.unwrap();
    let mut cursor = std::io::Cursor::new(out);
    let decoded: Response = decode(&read_message(&mut cursor).await.unwrap()).unwrap();
    assert_eq!(decoded, response);
}
