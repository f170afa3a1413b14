//! Assertion macros shared by integration tests.

/// Await the next request from a [`FakeGateway`](crate::FakeGateway) and
/// panic with the call site if the engine closed the link instead.
#[macro_export]
macro_rules! request_expect {
    ($gateway:expr) => {{
        $gateway
            .next_request()
            .await
            .expect(concat!("no request at ", file!(), ":", line!()))
    }};
    ($gateway:expr, $msg:expr) => {{
        let m = ::std::format!("{msg} at {}:{}", file!(), line!(), msg = $msg);
        $gateway.next_request().await.expect(&m)
    }};
}

/// Send a frame from a [`FakeGateway`](crate::FakeGateway) and panic with
/// the call site on failure.
#[macro_export]
macro_rules! send_expect {
    ($gateway:expr, $frame:expr) => {{
        $gateway
            .send($frame)
            .await
            .expect(concat!("send failed at ", file!(), ":", line!()))
    }};
}

pub use crate::{request_expect, send_expect};
