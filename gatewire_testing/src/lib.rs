//! Utilities for driving a [`gatewire::Engine`] against an in-memory gateway.
//!
//! The engine runs over one end of a `tokio::io::duplex` pipe and a
//! [`FakeGateway`] speaks gateway frames on the other, so tests can observe
//! exactly what was written and script the responses.
//!
//! ```rust
//! use gatewire::{CommandHandle, ConnectivityCheck, frame::{Frame, codes}};
//! use gatewire_testing::authenticated_engine;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (engine, mut gateway) = authenticated_engine();
//! let check = CommandHandle::new(ConnectivityCheck::new());
//! engine.submit(&check).expect("queued");
//!
//! let request = gateway.next_request().await.expect("request");
//! assert_eq!(request.code(), codes::GET_STATE_REQ);
//! gateway.send(Frame::confirm(codes::GET_STATE_CFM, 2)).await.expect("send");
//! check.settled().await;
//! assert_eq!(check.command().gateway_state(), Some(2));
//! engine.shutdown().await;
//! # }
//! ```

pub mod commands;
pub mod gateway;
pub mod logging;
pub mod macros;
pub mod metrics;

pub use commands::{NODE_CFM, NODE_REQ, NodeCommand, node_ack, requested_node};
pub use gateway::{FakeGateway, PIPE_CAPACITY, authenticated_engine, start_engine};
pub use logging::{LoggerHandle, logger};

/// Result alias for tests that propagate errors with `?`.
pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error + Send + Sync>>;
