//! CTM Server - Compositor side of the color transform control protocol
//!
//! A privileged client asks for exclusive control of one output's color
//! transform matrix, ships the matrix over a shared memory handle and the
//! engine applies it in step with the output's commit cycle.
//!
//! - `CtmManager` / `ManagerBinding`: the registry, one control per output
//! - `ControlObject`: per-(client, output) lifecycle
//! - `payload`: the one-shot 72-byte transfer
//! - `bridge`: output destroy/commit events routed to controls
//! - `Output` / `OutputBackend`: the collaborator seam to the renderer
//!
//! Everything runs on the compositor's single dispatch thread.

pub mod bridge;
pub mod config;
pub mod control;
pub mod error;
pub mod output;
pub mod payload;
pub mod registry;
pub mod requester;
pub mod signal;
pub mod software;

pub use bridge::OutputSubscriptions;
pub use config::ManagerConfig;
pub use control::{ControlId, ControlObject, ControlState};
pub use error::{FailureReason, PayloadError, ProtocolError};
pub use output::{CommitEvent, Output, OutputBackend, OutputEvents, OutputId, StateFields};
pub use payload::{receive, PayloadHandle, CTM_PAYLOAD_SIZE};
pub use registry::{CtmManager, ManagerBinding, ShutdownEvent, CTM_MANAGER_VERSION};
pub use requester::{ClientId, Requester};
pub use signal::{ListenerId, Signal, Subscription};
pub use software::SoftwareOutput;

#[cfg(test)]
mod test_support;
