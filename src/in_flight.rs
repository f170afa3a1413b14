//! Commands written to the gateway and still awaiting their responses.
//!
//! The set is keyed by [`CommandId`]. Cardinality is bounded by the queue
//! depth, so lookups scan linearly; when several in-flight commands accept the
//! same frame the oldest one wins.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    command::{CommandId, NodeId, Transaction},
    frame::Frame,
    metrics,
};

#[derive(Default)]
pub(crate) struct InFlightSet(DashMap<CommandId, Arc<dyn Transaction>>);

impl InFlightSet {
    pub(crate) fn new() -> Self { Self::default() }

    pub(crate) fn insert(&self, command: Arc<dyn Transaction>) {
        self.0.insert(command.id(), command);
        metrics::set_in_flight(self.0.len());
    }

    pub(crate) fn remove(&self, id: CommandId) -> Option<Arc<dyn Transaction>> {
        let removed = self.0.remove(&id).map(|(_, command)| command);
        metrics::set_in_flight(self.0.len());
        removed
    }

    /// Fail and remove every member.
    pub(crate) fn fail_all(&self, detail: &str) {
        for command in self.members() {
            command.lifecycle().fail(detail);
            self.0.remove(&command.id());
        }
        metrics::set_in_flight(self.0.len());
    }

    pub(crate) fn len(&self) -> usize { self.0.len() }

    pub(crate) fn is_empty(&self) -> bool { self.0.is_empty() }

    /// Copy out the current members, oldest first.
    ///
    /// Callers inspect the copy so no map shard stays locked while a
    /// command's own lock is taken.
    fn members(&self) -> Vec<Arc<dyn Transaction>> {
        let mut members: Vec<_> = self.0.iter().map(|entry| Arc::clone(entry.value())).collect();
        members.sort_by_key(|command| command.id());
        members
    }

    /// Whether a command scoped to `node` is awaiting responses.
    pub(crate) fn has_node(&self, node: NodeId) -> bool {
        self.0
            .iter()
            .any(|entry| entry.value().profile().node == Some(node))
    }

    /// Oldest in-flight command whose predicate accepts `frame`.
    pub(crate) fn find_match(&self, frame: &Frame) -> Option<Arc<dyn Transaction>> {
        self.members()
            .into_iter()
            .find(|command| command.matches(frame))
    }

    /// The only in-flight command, if there is exactly one.
    pub(crate) fn sole(&self) -> Option<Arc<dyn Transaction>> {
        let mut members = self.members();
        if members.len() == 1 { members.pop() } else { None }
    }

    /// Names of in-flight commands, oldest first.
    pub(crate) fn names(&self) -> Vec<&'static str> {
        self.members().iter().map(|command| command.name()).collect()
    }
}
