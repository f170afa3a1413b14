#![cfg(feature = "metrics")]
//! Tests for the engine's metrics.
//!
//! Counters are read back through `metrics_util::debugging::DebuggingRecorder`
//! installed as the thread-local recorder. Engine tests run on the
//! current-thread runtime, so the spawned workers record into it as well.

use std::time::Duration;

use gatewire::{
    CommandHandle,
    ConnectivityCheck,
    frame::{Frame, codes},
    metrics as gw_metrics,
};
use gatewire_testing::{
    authenticated_engine,
    metrics::{counter, recorder},
    node_ack,
    request_expect,
    send_expect,
};
use metrics_util::debugging::DebugValue;
use rstest::rstest;

#[rstest]
#[case(1)]
#[case(3)]
fn counter_helpers_increment(#[case] times: u64) {
    let (snapshotter, recorder) = recorder();
    metrics::with_local_recorder(&recorder, || {
        for _ in 0..times {
            gw_metrics::inc_dispatched();
            gw_metrics::inc_frames_rejected();
        }
    });
    assert_eq!(counter(&snapshotter, gw_metrics::COMMANDS_DISPATCHED), times);
    assert_eq!(counter(&snapshotter, gw_metrics::FRAMES_REJECTED), times);
    assert_eq!(counter(&snapshotter, gw_metrics::COMMANDS_REQUEUED), 0);
}

#[test]
fn in_flight_gauge_holds_the_last_value() {
    let (snapshotter, recorder) = recorder();
    metrics::with_local_recorder(&recorder, || {
        gw_metrics::set_in_flight(4);
        gw_metrics::set_in_flight(2);
    });
    let found = snapshotter.snapshot().into_vec().into_iter().any(|(key, _, _, value)| {
        key.key().name() == gw_metrics::COMMANDS_IN_FLIGHT
            && matches!(
                value,
                DebugValue::Gauge(level) if (level.into_inner() - 2.0).abs() < f64::EPSILON
            )
    });
    assert!(found, "in-flight gauge not recorded");
}

#[tokio::test(start_paused = true)]
async fn engine_counts_dispatches_conflicts_and_timeouts() {
    let (snapshotter, recorder) = recorder();
    let _guard = metrics::set_default_local_recorder(&recorder);
    let (engine, mut gateway) = authenticated_engine();

    let first = CommandHandle::new(gatewire_testing::NodeCommand::new(5));
    let second = CommandHandle::new(gatewire_testing::NodeCommand::new(5));
    engine.submit(&first).expect("first queued");
    engine.submit(&second).expect("second queued");
    request_expect!(gateway);
    // One conflict retry while node 5 is busy.
    assert!(gateway.request_within(Duration::from_millis(600)).await.is_none());
    send_expect!(gateway, node_ack(5, 0));
    request_expect!(gateway);

    let check = CommandHandle::new(ConnectivityCheck::new());
    let outcome = engine.execute(&check, None).await;
    assert!(outcome.is_err());
    request_expect!(gateway);

    send_expect!(gateway, Frame::new(codes::NODE_INFORMATION_CHANGED_NTF, vec![1; 4]));
    send_expect!(gateway, Frame::confirm(codes::GET_STATE_CFM, 0));
    send_expect!(gateway, node_ack(5, 0));
    send_expect!(gateway, node_ack(5, 0));
    gateway.send_raw(&[0x00]).await.expect("send garbage");
    second.settled().await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    engine.shutdown().await;

    assert_eq!(counter(&snapshotter, gw_metrics::COMMANDS_DISPATCHED), 3);
    assert!(counter(&snapshotter, gw_metrics::COMMANDS_REQUEUED) >= 1);
    assert_eq!(counter(&snapshotter, gw_metrics::COMMANDS_TIMED_OUT), 1);
    assert_eq!(counter(&snapshotter, gw_metrics::FRAMES_RECEIVED), 5);
    assert_eq!(counter(&snapshotter, gw_metrics::FRAMES_REJECTED), 1);
    assert_eq!(counter(&snapshotter, gw_metrics::FRAMES_UNMATCHED), 1);
}
