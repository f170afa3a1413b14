//! Tests for command lifecycle, profiles and built-in commands.

use std::time::Duration;

use rstest::rstest;

use super::{
    Command,
    CommandError,
    CommandHandle,
    CommandProfile,
    CommandStatus,
    ConnectivityCheck,
    Lifecycle,
    Login,
    MAX_PASSWORD_LEN,
    NodeId,
    Progress,
};
use crate::frame::{Frame, codes};

#[test]
fn lifecycle_walks_the_happy_path() {
    let lifecycle = Lifecycle::new();
    assert_eq!(lifecycle.status(), CommandStatus::Created);
    assert!(lifecycle.mark_queued());
    assert!(lifecycle.mark_processing());
    assert!(lifecycle.complete());
    assert_eq!(lifecycle.status(), CommandStatus::Complete);
    assert!(lifecycle.error_detail().is_none());
}

#[test]
fn lifecycle_refuses_skipped_or_backward_steps() {
    let lifecycle = Lifecycle::new();
    assert!(!lifecycle.mark_processing(), "cannot skip QUEUED");
    assert!(lifecycle.mark_queued());
    assert!(!lifecycle.mark_queued(), "cannot re-enter QUEUED");
    assert!(lifecycle.mark_processing());
    assert!(!lifecycle.mark_queued(), "cannot move backwards");
}

#[test]
fn terminal_transition_happens_once() {
    let lifecycle = Lifecycle::new();
    assert!(lifecycle.mark_queued());
    assert!(lifecycle.fail("first"));
    assert!(!lifecycle.fail("second"));
    assert!(!lifecycle.complete());
    assert_eq!(lifecycle.status(), CommandStatus::Error);
    assert_eq!(lifecycle.error_detail().as_deref(), Some("first"));
}

#[test]
fn created_command_can_fail_directly() {
    let lifecycle = Lifecycle::new();
    assert!(lifecycle.fail("queue full"));
    assert_eq!(lifecycle.status(), CommandStatus::Error);
}

#[tokio::test]
async fn settled_waits_for_terminal_status() {
    let handle = CommandHandle::new(ConnectivityCheck::new());
    let waiter = handle.clone();
    let task = tokio::spawn(async move { waiter.settled().await });

    tokio::task::yield_now().await;
    assert!(handle.lifecycle().mark_queued());
    assert!(handle.lifecycle().mark_processing());
    assert!(!task.is_finished());
    assert!(handle.lifecycle().complete());

    let status = task.await.expect("waiter task");
    assert_eq!(status, CommandStatus::Complete);
}

#[tokio::test]
async fn settled_returns_immediately_when_already_finished() {
    let handle = CommandHandle::new(ConnectivityCheck::new());
    assert!(handle.lifecycle().fail("boom"));
    let status = tokio::time::timeout(Duration::from_millis(10), handle.settled())
        .await
        .expect("already settled");
    assert_eq!(status, CommandStatus::Error);
}

#[rstest]
#[case::gateway(CommandProfile::gateway(), None)]
#[case::node(CommandProfile::node(NodeId::new(4)), Some(NodeId::new(4)))]
#[case::session(CommandProfile::node(NodeId::new(4)).with_session(), None)]
fn only_session_less_node_commands_are_serialised(
    #[case] profile: CommandProfile,
    #[case] expected: Option<NodeId>,
) {
    assert_eq!(profile.serialised_node(), expected);
}

#[test]
fn node_profile_requires_authentication() {
    let profile = CommandProfile::node(NodeId::new(1));
    assert!(profile.requires_authentication);
    assert!(profile.is_node_specific());
    assert!(!CommandProfile::gateway().is_node_specific());
}

#[test]
fn deliver_ignores_frames_after_completion() {
    let handle = CommandHandle::new(ConnectivityCheck::new());
    let transaction = handle.transaction();
    assert!(handle.lifecycle().fail("timed out"));

    let status = transaction.deliver(&Frame::confirm(codes::GET_STATE_CFM, 5));
    assert_eq!(status, CommandStatus::Error);
    assert_eq!(handle.command().gateway_state(), None);
}

#[test]
fn connectivity_check_matches_confirm_only() {
    let check = ConnectivityCheck::new();
    assert!(check.matches(&Frame::confirm(codes::GET_STATE_CFM, 0)));
    assert!(!check.matches(&Frame::ack(codes::GET_STATE_CFM, 0, 0, 0)));
    assert!(!check.matches(&Frame::confirm(codes::PASSWORD_ENTER_CFM, 0)));
    assert_eq!(check.default_timeout(), Some(Duration::from_millis(1000)));
}

#[test]
fn connectivity_check_records_gateway_state() {
    let handle = CommandHandle::new(ConnectivityCheck::new());
    assert!(handle.lifecycle().mark_queued());
    assert!(handle.lifecycle().mark_processing());
    let status = handle
        .transaction()
        .deliver(&Frame::confirm(codes::GET_STATE_CFM, 2));
    assert_eq!(status, CommandStatus::Complete);
    assert_eq!(handle.command().gateway_state(), Some(2));
}

#[rstest]
#[case::empty("")]
#[case::too_long("x".repeat(MAX_PASSWORD_LEN + 1))]
fn login_rejects_bad_passwords(#[case] password: String) {
    let login = Login::new(password);
    assert!(matches!(login.validate(), Err(CommandError::Invalid(_))));
}

#[test]
fn login_pads_password_into_request() {
    let login = Login::new("velux123");
    assert!(login.validate().is_ok());
    let request = login.request();
    assert_eq!(request.code(), codes::PASSWORD_ENTER_REQ);
    assert_eq!(request.payload().len(), MAX_PASSWORD_LEN);
    assert_eq!(&request.payload()[..8], b"velux123");
    assert!(request.payload()[8..].iter().all(|b| *b == 0));
}

#[rstest]
#[case::accepted(0, Progress::Complete)]
#[case::rejected(1, Progress::Failed("password rejected (status 1)".into()))]
fn login_interprets_status(#[case] status: u8, #[case] expected: Progress) {
    let mut login = Login::new("secret");
    let ack = Frame::ack(codes::PASSWORD_ENTER_CFM, status, 0, 0);
    assert!(login.matches(&ack));
    assert_eq!(login.on_frame(&ack), expected);
}

#[test]
fn login_debug_hides_password() {
    let rendered = format!("{:?}", Login::new("hunter2"));
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn command_ids_increase() {
    let first = CommandHandle::new(ConnectivityCheck::new());
    let second = CommandHandle::new(ConnectivityCheck::new());
    assert!(first.id() < second.id());
}
