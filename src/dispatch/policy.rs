//! Per-operation aggregation policies
//!
//! Every fold is commutative and associative with respect to reply arrival
//! order; the dispatcher relies on that to fold replies as they land.

use crate::error::{Error, Result};
use crate::ops::OpReply;

/// How replica replies are folded into one outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// First successful reply wins; later successes are discarded
    FirstSuccess,
    /// Only the completion count matters; success when any replica succeeded
    CountComplete,
    /// Minimum available capacity across successful replies
    MinCapacity,
}

/// Fold state accumulated across replica replies
pub struct Accumulator {
    policy: Policy,
    payload: Option<OpReply>,
    last_error: Option<Error>,
    successes: usize,
}

impl Accumulator {
    /// Create an empty accumulator for a policy
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            payload: None,
            last_error: None,
            successes: 0,
        }
    }

    /// Fold one replica's reply.
    ///
    /// `replica_index` is the correlation token the sub-call was issued
    /// with; inode numbers in a captured payload are rewritten with it.
    pub fn fold(&mut self, replica_count: usize, replica_index: usize, result: Result<OpReply>) {
        match result {
            Ok(reply) => {
                self.successes += 1;
                match self.policy {
                    Policy::FirstSuccess | Policy::CountComplete => {
                        if self.payload.is_none() {
                            let mut reply = reply;
                            reply.rewrite_inodes(replica_count, replica_index);
                            self.payload = Some(reply);
                        }
                    }
                    Policy::MinCapacity => {
                        if let OpReply::Capacity(incoming) = reply {
                            let keep_current = matches!(
                                &self.payload,
                                Some(OpReply::Capacity(current))
                                    if current.blocks_available <= incoming.blocks_available
                            );
                            if !keep_current {
                                self.payload = Some(OpReply::Capacity(incoming));
                            }
                        }
                    }
                }
            }
            Err(e) => {
                self.last_error = Some(e);
            }
        }
    }

    /// Number of successful replies folded so far
    pub fn successes(&self) -> usize {
        self.successes
    }

    /// Produce the final outcome once the last reply has been folded.
    ///
    /// Success requires at least one successful reply under every policy;
    /// with none, the last observed failure is surfaced.
    pub fn finish(&mut self) -> Result<OpReply> {
        if self.successes > 0 {
            Ok(self.payload.take().unwrap_or(OpReply::Done))
        } else {
            Err(self.last_error.take().unwrap_or(Error::ReplicaUnavailable))
        }
    }
}
