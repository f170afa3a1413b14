//! Bounded FIFO of commands waiting for the request dispatcher.
//!
//! Callers push at the back; the dispatcher is the only consumer. A command
//! that conflicts with one already in flight is pushed back at the front so
//! it keeps its place relative to everything submitted after it.

use std::{collections::VecDeque, sync::Arc, sync::Mutex};

use tokio::sync::Notify;

use crate::{command::Transaction, error::Rejected};

/// Item handed to the dispatcher.
pub(crate) enum Dispatch {
    Command(Arc<dyn Transaction>),
    /// Stop the dispatcher once everything ahead of it has been handled.
    Terminate,
}

pub(crate) struct PendingQueue {
    items: Mutex<VecDeque<Dispatch>>,
    ready: Notify,
    capacity: usize,
}

impl PendingQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity)),
            ready: Notify::new(),
            capacity,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Dispatch>> {
        self.items.lock().expect("lock poisoned")
    }

    pub(crate) fn capacity(&self) -> usize { self.capacity }

    /// Number of commands waiting, excluding the terminate marker.
    pub(crate) fn len(&self) -> usize {
        self.lock()
            .iter()
            .filter(|item| matches!(item, Dispatch::Command(_)))
            .count()
    }

    /// Append `command` and move it to `QUEUED`.
    ///
    /// The capacity check and the status change happen under the queue lock
    /// so a full queue never holds a `QUEUED` command it refused.
    ///
    /// # Errors
    ///
    /// [`Rejected::QueueFull`] when the queue is at capacity and
    /// [`Rejected::AlreadySubmitted`] when the command has left `CREATED`.
    pub(crate) fn offer(&self, command: Arc<dyn Transaction>) -> Result<(), Rejected> {
        let mut items = self.lock();
        let waiting = items
            .iter()
            .filter(|item| matches!(item, Dispatch::Command(_)))
            .count();
        if waiting >= self.capacity {
            return Err(Rejected::QueueFull {
                capacity: self.capacity,
            });
        }
        if !command.lifecycle().mark_queued() {
            return Err(Rejected::AlreadySubmitted);
        }
        items.push_back(Dispatch::Command(command));
        drop(items);
        self.ready.notify_one();
        Ok(())
    }

    /// Put `command` back at the head of the queue, ignoring capacity.
    pub(crate) fn requeue_front(&self, command: Arc<dyn Transaction>) {
        self.lock().push_front(Dispatch::Command(command));
        self.ready.notify_one();
    }

    /// Queue the terminate marker behind every waiting command.
    pub(crate) fn terminate(&self) {
        self.lock().push_back(Dispatch::Terminate);
        self.ready.notify_one();
    }

    /// Wait for and remove the head of the queue.
    pub(crate) async fn next(&self) -> Dispatch {
        loop {
            if let Some(item) = self.lock().pop_front() {
                return item;
            }
            self.ready.notified().await;
        }
    }

    /// Remove every waiting command, leaving the queue empty.
    pub(crate) fn drain(&self) -> Vec<Arc<dyn Transaction>> {
        self.lock()
            .drain(..)
            .filter_map(|item| match item {
                Dispatch::Command(command) => Some(command),
                Dispatch::Terminate => None,
            })
            .collect()
    }

    /// Names of waiting commands, head first.
    pub(crate) fn snapshot(&self) -> Vec<&'static str> {
        self.lock()
            .iter()
            .filter_map(|item| match item {
                Dispatch::Command(command) => Some(command.name()),
                Dispatch::Terminate => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::*;
    use crate::command::{CommandHandle, CommandStatus, ConnectivityCheck};

    fn command() -> (CommandHandle<ConnectivityCheck>, Arc<dyn Transaction>) {
        let handle = CommandHandle::new(ConnectivityCheck::new());
        let transaction = handle.transaction();
        (handle, transaction)
    }

    fn expect_command(item: Dispatch) -> Arc<dyn Transaction> {
        match item {
            Dispatch::Command(command) => command,
            Dispatch::Terminate => panic!("expected a command, got the terminate marker"),
        }
    }

    #[fixture]
    fn queue() -> PendingQueue { PendingQueue::new(2) }

    #[rstest]
    #[tokio::test]
    async fn commands_leave_in_submission_order(queue: PendingQueue) {
        let (first, a) = command();
        let (second, b) = command();
        queue.offer(a).expect("offer first");
        queue.offer(b).expect("offer second");
        assert_eq!(first.status(), CommandStatus::Queued);

        assert_eq!(expect_command(queue.next().await).id(), first.id());
        assert_eq!(expect_command(queue.next().await).id(), second.id());
    }

    #[rstest]
    fn full_queue_rejects_without_queueing(queue: PendingQueue) {
        queue.offer(command().1).expect("offer");
        queue.offer(command().1).expect("offer");
        let (handle, third) = command();
        assert_eq!(
            queue.offer(third),
            Err(Rejected::QueueFull { capacity: 2 })
        );
        assert_eq!(handle.status(), CommandStatus::Created);
        assert_eq!(queue.len(), 2);
    }

    #[rstest]
    fn resubmission_is_refused(queue: PendingQueue) {
        let (_handle, transaction) = command();
        queue.offer(Arc::clone(&transaction)).expect("offer");
        assert_eq!(queue.offer(transaction), Err(Rejected::AlreadySubmitted));
        assert_eq!(queue.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn requeued_command_goes_back_to_the_head(queue: PendingQueue) {
        let (first, a) = command();
        let (_second, b) = command();
        queue.offer(a).expect("offer first");
        queue.offer(b).expect("offer second");

        let head = expect_command(queue.next().await);
        queue.requeue_front(head);
        assert_eq!(queue.snapshot().len(), 2);
        assert_eq!(expect_command(queue.next().await).id(), first.id());
    }

    #[rstest]
    #[tokio::test]
    async fn terminate_bypasses_capacity(queue: PendingQueue) {
        queue.offer(command().1).expect("offer");
        queue.offer(command().1).expect("offer");
        queue.terminate();

        expect_command(queue.next().await);
        expect_command(queue.next().await);
        assert!(matches!(queue.next().await, Dispatch::Terminate));
    }

    #[rstest]
    #[tokio::test]
    async fn next_waits_for_an_offer(queue: PendingQueue) {
        let queue = Arc::new(queue);
        let consumer = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { expect_command(queue.next().await).id() })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(!consumer.is_finished());

        let (handle, transaction) = command();
        queue.offer(transaction).expect("offer");
        assert_eq!(consumer.await.expect("consumer"), handle.id());
    }

    #[rstest]
    fn drain_empties_the_queue(queue: PendingQueue) {
        queue.offer(command().1).expect("offer");
        queue.terminate();
        assert_eq!(queue.drain().len(), 1);
        assert_eq!(queue.len(), 0);
        assert!(queue.snapshot().is_empty());
    }
}
