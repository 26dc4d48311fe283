//! The client side of a control, as seen by the engine.

use std::fmt;

use crate::control::ControlId;
use crate::error::FailureReason;

/// Identity of a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u32);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client#{}", self.0)
    }
}

/// Events the engine sends back to a client.
///
/// Implemented by the RPC substrate. Calls arrive on the dispatch thread
/// and may re-enter the engine.
pub trait Requester {
    fn client_id(&self) -> ClientId;

    /// The control is gone. Sent at most once per control.
    fn failed(&self, control: ControlId, reason: FailureReason);
}
