//! Shared completion state for one in-flight operation

use std::sync::Mutex;

use tokio::sync::oneshot;

use crate::dispatch::policy::{Accumulator, Policy};
use crate::error::Result;
use crate::ops::OpReply;

/// Completion state shared by the concurrent sub-calls of one operation.
///
/// Owned exclusively by the dispatch invocation that created it. Each reply
/// folds its result and decrements the pending counter under the context
/// lock; the completion that observes the counter reach zero takes the
/// sender and delivers the folded outcome. The sender is an `Option` taken
/// exactly once, so delivery happens exactly once regardless of reply
/// arrival order.
pub struct OperationContext {
    replica_count: usize,
    state: Mutex<Inner>,
}

struct Inner {
    pending: usize,
    acc: Accumulator,
    done: Option<oneshot::Sender<Result<OpReply>>>,
}

impl OperationContext {
    /// Create completion state expecting `pending` replies
    pub fn new(
        pending: usize,
        policy: Policy,
        replica_count: usize,
        done: oneshot::Sender<Result<OpReply>>,
    ) -> Self {
        debug_assert!(pending > 0, "context created with empty target set");
        Self {
            replica_count,
            state: Mutex::new(Inner {
                pending,
                acc: Accumulator::new(policy),
                done: Some(done),
            }),
        }
    }

    /// Fold one replica's reply; delivers the final outcome on the last one
    pub fn complete(&self, replica_index: usize, result: Result<OpReply>) {
        let mut inner = self.state.lock().unwrap();
        inner.acc.fold(self.replica_count, replica_index, result);
        inner.pending -= 1;

        if inner.pending == 0 {
            let done = inner.done.take();
            let outcome = inner.acc.finish();
            drop(inner);
            if let Some(tx) = done {
                // Receiver gone means the caller dropped the operation future
                let _ = tx.send(outcome);
            }
        }
    }
}
