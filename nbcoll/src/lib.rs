//! Non-blocking collective communication over process groups.
//!
//! A [`Communicator`] builds [`Group`]s and single-use [`Operation`]s for
//! broadcast, allreduce and allgatherv. Each operation picks its algorithm
//! from the [`AlgorithmRegistry`] by (collective, element type, algorithm),
//! runs it as a background task after [`Operation::start`], and hands back
//! the result from [`Operation::wait_for_completion`].

pub mod client;
pub mod collective;
pub mod config;
pub mod context;
pub mod element;
pub mod error;
pub mod group;
pub mod operation;
pub mod reduce;
pub mod registry;
pub mod transport;
pub mod types;

pub use client::{Communicator, SyncCommunicator};
pub use collective::{CollectiveAlgorithm, CollectiveJob, CollectiveParams, Exchange};
pub use config::CollConfig;
pub use context::ProcessContext;
pub use element::Element;
pub use error::{CollectiveError, ErrorKind, Result};
pub use group::Group;
pub use operation::{Operation, OperationState};
pub use reduce::Reducer;
pub use registry::{AlgorithmFactory, AlgorithmRegistry};
pub use transport::{LocalTransport, Transport};
pub use types::{Algorithm, CollectiveKind, DataType, Rank, ReduceOp};
