//! Channel-backed result dispatcher
//!
//! Hosts that run their own event loop (a GUI toolkit, the CLI main task)
//! receive operation outcomes as messages instead of callbacks.

use crate::core::traits::{ExecutionResult, Operation, ResultDispatcher};
use tokio::sync::mpsc;

/// Message delivered to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchEvent {
    /// Show (`true`) or hide (`false`) the progress indicator
    Progress(bool),
    /// An operation reached its terminal result
    Completed {
        operation: Operation,
        result: ExecutionResult,
    },
}

/// [`ResultDispatcher`] that forwards every callback over an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::UnboundedSender<DispatchEvent>,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiving end the host listens on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DispatchEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: DispatchEvent) {
        // A closed receiver means the host is gone; nothing left to notify.
        if self.sender.send(event).is_err() {
            tracing::debug!("dispatch receiver dropped");
        }
    }
}

impl ResultDispatcher for ChannelDispatcher {
    fn on_result(&self, operation: &Operation, result: &ExecutionResult) {
        self.send(DispatchEvent::Completed {
            operation: operation.clone(),
            result: result.clone(),
        });
    }

    fn set_progress_visible(&self, visible: bool) {
        self.send(DispatchEvent::Progress(visible));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::Backend;

    #[tokio::test]
    async fn test_events_arrive_in_order() {
        let (dispatcher, mut events) = ChannelDispatcher::new();
        let op = Operation::install("vim", Backend::Alternate);
        let result = ExecutionResult::success(b"ok".to_vec());

        dispatcher.set_progress_visible(true);
        dispatcher.on_result(&op, &result);
        dispatcher.set_progress_visible(false);

        assert_eq!(events.recv().await, Some(DispatchEvent::Progress(true)));
        assert_eq!(
            events.recv().await,
            Some(DispatchEvent::Completed {
                operation: op,
                result,
            })
        );
        assert_eq!(events.recv().await, Some(DispatchEvent::Progress(false)));
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (dispatcher, events) = ChannelDispatcher::new();
        drop(events);
        dispatcher.set_progress_visible(true);
    }
}
