//! Command fixtures for exercising the engine.

use gatewire::{
    Command,
    CommandProfile,
    NodeId,
    Progress,
    frame::{Frame, FrameCode, FrameShape},
};

/// Request code used by [`NodeCommand`].
pub const NODE_REQ: FrameCode = FrameCode::new(0x40);
/// Confirm code answering [`NodeCommand`].
pub const NODE_CFM: FrameCode = FrameCode::new(0x41);

/// Authenticated command addressed to one node, answered by an ack frame
/// carrying the same node.
#[derive(Clone, Debug)]
pub struct NodeCommand {
    node: NodeId,
    session: bool,
    status: Option<u8>,
}

impl NodeCommand {
    /// Command for `node` without a session token.
    #[must_use]
    pub fn new(node: u8) -> Self {
        Self {
            node: NodeId::new(node),
            session: false,
            status: None,
        }
    }

    /// Command for `node` that carries a session token.
    #[must_use]
    pub fn with_session(node: u8) -> Self {
        Self {
            session: true,
            ..Self::new(node)
        }
    }

    /// Status byte of the ack, once received.
    #[must_use]
    pub fn status(&self) -> Option<u8> { self.status }
}

impl Command for NodeCommand {
    fn name(&self) -> &'static str { "NodeCommand" }

    fn profile(&self) -> CommandProfile {
        let profile = CommandProfile::node(self.node);
        if self.session { profile.with_session() } else { profile }
    }

    fn request(&self) -> Frame { Frame::new(NODE_REQ, vec![self.node.as_u8()]) }

    fn matches(&self, frame: &Frame) -> bool {
        frame.code() == NODE_CFM
            && frame.shape() == FrameShape::Ack
            && frame.node() == Some(self.node.as_u8())
    }

    fn on_frame(&mut self, frame: &Frame) -> Progress {
        self.status = frame.status();
        match self.status {
            Some(0) => Progress::Complete,
            Some(status) => Progress::Failed(format!("node refused command (status {status})")),
            None => Progress::Failed("ack without status".into()),
        }
    }
}

/// Node addressed by a [`NodeCommand`] request.
#[must_use]
pub fn requested_node(request: &Frame) -> Option<u8> {
    (request.code() == NODE_REQ)
        .then(|| request.payload().first().copied())
        .flatten()
}

/// Ack answering a [`NodeCommand`] for `node`.
#[must_use]
pub fn node_ack(node: u8, status: u8) -> Frame { Frame::ack(NODE_CFM, status, node, 0) }
