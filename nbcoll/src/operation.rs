//! One collective invocation and its Idle → Started → Completed lifecycle.

use crate::collective::helpers::payload_bytes;
use crate::collective::{
    CollectiveAlgorithm, CollectiveHandle, CollectiveJob, CollectiveParams, Exchange,
};
use crate::element::{Element, decode, encode};
use crate::error::{CollectiveError, Result};
use crate::group::Group;
use crate::transport::Transport;
use crate::types::{Algorithm, CollectiveKind, DataType};
use std::sync::Arc;

/// Lifecycle state of an [`Operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationState {
    /// Constructed, not started.
    Idle,
    /// Algorithm rounds running in the background.
    Started,
    /// Result delivered (or the algorithm failed). Terminal.
    Completed,
}

/// A single-use collective operation.
///
/// Built by [`Communicator`](crate::Communicator). [`start`](Self::start)
/// copies the local input and launches the algorithm on the current tokio
/// runtime without waiting on any peer.
/// [`wait_for_completion`](Self::wait_for_completion) suspends until every
/// round has finished and returns the result.
///
/// Dropping a started operation aborts its background task.
pub struct Operation {
    params: CollectiveParams,
    dtype: DataType,
    count: usize,
    algorithm: Algorithm,
    implementation: Arc<dyn CollectiveAlgorithm>,
    exchange: Exchange,
    state: OperationState,
    handle: Option<CollectiveHandle>,
}

impl Operation {
    /// Validates everything that can be checked locally. No message is sent.
    ///
    /// The group's next tag is drawn only once validation passed, so members
    /// that agree on the sequence of successful calls agree on every tag.
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        group: &Group,
        params: CollectiveParams,
        dtype: DataType,
        count: usize,
        algorithm: Algorithm,
        implementation: Arc<dyn CollectiveAlgorithm>,
    ) -> Result<Self> {
        if let CollectiveParams::Broadcast { root } = params
            && root >= group.size()
        {
            return Err(CollectiveError::InvalidRoot {
                root,
                group_size: group.size(),
            });
        }
        payload_bytes(count, dtype)?;
        implementation.validate(&params)?;

        let tag = group.next_tag();
        let exchange = Exchange::new(transport, group.clone(), tag, params.kind().name());

        Ok(Self {
            params,
            dtype,
            count,
            algorithm,
            implementation,
            exchange,
            state: OperationState::Idle,
            handle: None,
        })
    }

    pub fn kind(&self) -> CollectiveKind {
        self.params.kind()
    }

    pub fn params(&self) -> CollectiveParams {
        self.params
    }

    pub fn dtype(&self) -> DataType {
        self.dtype
    }

    /// Element count declared at construction. For allgatherv this is the
    /// local contribution only.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn state(&self) -> OperationState {
        self.state
    }

    /// Whether the operation is a broadcast whose root is a different member.
    fn ignores_input(&self) -> bool {
        matches!(
            self.params,
            CollectiveParams::Broadcast { root } if root != self.exchange.local_rank()
        )
    }

    fn check_dtype<T: Element>(&self) -> Result<()> {
        if T::DTYPE != self.dtype {
            return Err(CollectiveError::DTypeMismatch {
                expected: self.dtype,
                actual: T::DTYPE,
            });
        }
        Ok(())
    }

    /// Begin the collective with this rank's input.
    ///
    /// `input` must hold exactly `count` elements of the operation's type.
    /// Non-root broadcast members may pass `None`; their input is ignored
    /// either way. Must be called from within a tokio runtime.
    pub fn start<T: Element>(&mut self, input: Option<&[T]>) -> Result<()> {
        match self.state {
            OperationState::Idle => {}
            OperationState::Started => {
                return Err(CollectiveError::AlreadyStarted {
                    operation: self.kind(),
                });
            }
            OperationState::Completed => {
                return Err(CollectiveError::AlreadyCompleted {
                    operation: self.kind(),
                });
            }
        }
        self.check_dtype::<T>()?;

        let staged = if self.ignores_input() {
            Vec::new()
        } else {
            let input = input.ok_or(CollectiveError::MissingInput {
                operation: self.kind(),
            })?;
            if input.len() != self.count {
                return Err(CollectiveError::BufferSizeMismatch {
                    expected: self.count,
                    actual: input.len(),
                });
            }
            encode(input)
        };

        let job = CollectiveJob {
            exchange: self.exchange.clone(),
            params: self.params,
            dtype: self.dtype,
            count: self.count,
            input: staged,
        };
        let exchange = self.exchange.clone();
        let run = self.implementation.run(job);
        let handle = CollectiveHandle::spawn(async move {
            let result = run.await;
            exchange.retire();
            result
        })?;
        self.handle = Some(handle);
        self.state = OperationState::Started;

        tracing::debug!(
            operation = %self.kind(),
            algorithm = %self.algorithm,
            dtype = %self.dtype,
            count = self.count,
            group_size = self.exchange.size(),
            local_rank = self.exchange.local_rank(),
            tag = self.exchange.tag(),
            "collective started"
        );
        Ok(())
    }

    /// Wait for every round to finish and return this rank's result.
    ///
    /// Broadcast and allreduce return `count` elements; allgatherv returns
    /// the concatenation of every member's contribution. The operation is
    /// `Completed` afterwards, also when the algorithm failed.
    pub async fn wait_for_completion<T: Element>(&mut self) -> Result<Vec<T>> {
        match self.state {
            OperationState::Started => {}
            OperationState::Idle => {
                return Err(CollectiveError::NotStarted {
                    operation: self.kind(),
                });
            }
            OperationState::Completed => {
                return Err(CollectiveError::AlreadyCompleted {
                    operation: self.kind(),
                });
            }
        }
        self.check_dtype::<T>()?;

        let handle = self.handle.as_mut().ok_or(CollectiveError::NotStarted {
            operation: self.params.kind(),
        })?;
        let outcome = handle.wait().await;
        self.handle = None;
        self.state = OperationState::Completed;

        match &outcome {
            Ok(bytes) => tracing::debug!(
                operation = %self.kind(),
                algorithm = %self.algorithm,
                bytes = bytes.len(),
                tag = self.exchange.tag(),
                "collective completed"
            ),
            Err(e) => tracing::debug!(
                operation = %self.kind(),
                algorithm = %self.algorithm,
                tag = self.exchange.tag(),
                error = %e,
                "collective failed"
            ),
        }
        decode::<T>(&outcome?)
    }

    /// Non-blocking completion check. Does not change state.
    pub fn is_finished(&self) -> bool {
        match self.state {
            OperationState::Idle => false,
            OperationState::Started => self.handle.as_ref().is_none_or(|h| h.is_finished()),
            OperationState::Completed => true,
        }
    }

    /// Release the operation and its staging memory now.
    pub fn close(self) {}
}

impl Drop for Operation {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let finished = handle.is_finished();
            drop(handle);
            if !finished {
                self.exchange.abandon();
            }
        }
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("params", &self.params)
            .field("dtype", &self.dtype)
            .field("count", &self.count)
            .field("algorithm", &self.algorithm)
            .field("state", &self.state)
            .field("exchange", &self.exchange)
            .finish()
    }
}
