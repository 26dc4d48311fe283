//! Per-(client, output) color transform control.
//!
//! State machine:
//!
//! ```text
//! Unbound --bind--> Bound --set_ctm--> Armed --set_ctm--> Armed
//!    |                |                  |
//!    +----------------+------------------+--> Destroyed
//! ```
//!
//! `Destroyed` is terminal. Teardown is idempotent and every callback
//! checks the state first, so destruction from inside one of the control's
//! own event handlers is safe.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use ctm_core::WireMatrix;
use tracing::{debug, error, info, warn};

use crate::bridge::{self, OutputSubscriptions};
use crate::config::ManagerConfig;
use crate::error::{FailureReason, PayloadError, ProtocolError};
use crate::output::{CommitEvent, Output, OutputId, StateFields};
use crate::payload::{self, PayloadHandle};
use crate::registry::Registry;
use crate::requester::{ClientId, Requester};

/// Identity of a control object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlId(pub u64);

impl ControlId {
    /// Id of controls created after the manager went away.
    pub const DETACHED: Self = Self(0);
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctm-control#{}", self.0)
    }
}

/// Lifecycle state of a [`ControlObject`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlState {
    /// Created, not yet attached to an output.
    Unbound,
    /// Attached to a live output, no matrix received.
    Bound,
    /// Holds a matrix.
    Armed,
    Destroyed,
}

/// How a control is being torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Teardown {
    Released,
    Failed(FailureReason),
    OutputDestroyed,
    Shutdown,
}

struct Inner {
    state: ControlState,
    ctm: Option<WireMatrix>,
    subscriptions: Option<OutputSubscriptions>,
}

/// Exclusive handle through which one client drives one output's CTM.
pub struct ControlObject {
    id: ControlId,
    requester: Rc<dyn Requester>,
    output_id: Option<OutputId>,
    output: Weak<Output>,
    registry: Weak<Registry>,
    config: ManagerConfig,
    inner: RefCell<Inner>,
}

impl ControlObject {
    pub(crate) fn new(
        id: ControlId,
        requester: Rc<dyn Requester>,
        output: Option<&Rc<Output>>,
        registry: Weak<Registry>,
        config: ManagerConfig,
    ) -> Rc<Self> {
        Rc::new(Self {
            id,
            requester,
            output_id: output.map(|o| o.id()),
            output: output.map(Rc::downgrade).unwrap_or_default(),
            registry,
            config,
            inner: RefCell::new(Inner {
                state: ControlState::Unbound,
                ctm: None,
                subscriptions: None,
            }),
        })
    }

    /// Subscribe to the output's events and move to `Bound`.
    pub(crate) fn bind(self: &Rc<Self>, output: &Output) {
        let subscriptions = bridge::attach(self, output);
        let mut inner = self.inner.borrow_mut();
        debug_assert_eq!(inner.state, ControlState::Unbound);
        inner.subscriptions = Some(subscriptions);
        inner.state = ControlState::Bound;
        debug!(control = %self.id, output = %output.id(), "control bound");
    }

    pub fn id(&self) -> ControlId {
        self.id
    }

    pub fn client_id(&self) -> ClientId {
        self.requester.client_id()
    }

    /// The targeted output, `None` if the request named none.
    pub fn output_id(&self) -> Option<OutputId> {
        self.output_id
    }

    pub fn state(&self) -> ControlState {
        self.inner.borrow().state
    }

    pub fn is_destroyed(&self) -> bool {
        self.state() == ControlState::Destroyed
    }

    /// Most recently received matrix.
    pub fn current_ctm(&self) -> Option<WireMatrix> {
        self.inner.borrow().ctm
    }

    /// Whether the control still listens to its output.
    pub fn is_subscribed(&self) -> bool {
        self.inner
            .borrow()
            .subscriptions
            .as_ref()
            .is_some_and(OutputSubscriptions::is_active)
    }

    /// Handle a `set_ctm` request.
    ///
    /// A payload of the wrong size is returned as a [`ProtocolError`] and
    /// leaves the control untouched. Read failures send `failed` and
    /// destroy the control; they are not errors for the caller.
    pub fn set_ctm<H: PayloadHandle>(&self, handle: H) -> Result<(), ProtocolError> {
        if self.is_destroyed() {
            debug!(control = %self.id, "set_ctm on destroyed control ignored");
            return Ok(());
        }

        let wire = match payload::receive(handle) {
            Ok(wire) => wire,
            Err(PayloadError::Short { expected, got }) => {
                warn!(control = %self.id, expected, got, "rejecting short ctm payload");
                return Err(ProtocolError::InvalidCtm { expected, got });
            }
            Err(err) => {
                error!(control = %self.id, error = %err, "failed to receive ctm");
                self.fail(FailureReason::Io);
                return Ok(());
            }
        };

        {
            let mut inner = self.inner.borrow_mut();
            inner.ctm = Some(wire);
            inner.state = ControlState::Armed;
        }
        debug!(control = %self.id, "ctm received");

        if self.config.apply_on_set && self.output_enabled() {
            self.apply();
        }
        Ok(())
    }

    /// Handle a `destroy` request.
    pub fn destroy(&self) {
        self.teardown(Teardown::Released);
    }

    /// Stage the stored matrix on the output and test it.
    ///
    /// On success a frame is scheduled and the matrix shows up on the next
    /// commit. On refusal the staged state is rolled back and the control
    /// fails.
    pub(crate) fn apply(&self) {
        let wire = {
            let inner = self.inner.borrow();
            match (inner.state, inner.ctm) {
                (ControlState::Armed, Some(wire)) => wire,
                _ => return,
            }
        };
        let Some(output) = self.output.upgrade() else {
            return;
        };

        let accepted = output.with_backend(|backend| {
            backend.set_ctm(Some(&wire));
            if backend.test() {
                backend.schedule_frame();
                true
            } else {
                backend.rollback();
                false
            }
        });

        if accepted {
            info!(control = %self.id, output = %output.id(), "ctm applied");
        } else {
            warn!(control = %self.id, output = %output.id(), "output rejected ctm");
            self.fail(FailureReason::Rejected);
        }
    }

    pub(crate) fn handle_output_destroyed(&self) {
        self.teardown(Teardown::OutputDestroyed);
    }

    pub(crate) fn handle_output_commit(&self, event: &CommitEvent) {
        if self.state() != ControlState::Armed
            || !event.committed.contains(StateFields::ENABLED)
            || !self.output_enabled()
        {
            return;
        }
        debug!(control = %self.id, output = %event.output, "output enabled, re-applying ctm");
        self.apply();
    }

    /// Tear down, then tell the client. At most one `failed` per control.
    pub(crate) fn fail(&self, reason: FailureReason) {
        if self.teardown(Teardown::Failed(reason)) {
            self.requester.failed(self.id, reason);
        }
    }

    /// Move to `Destroyed`. Returns false if already there.
    pub(crate) fn teardown(&self, how: Teardown) -> bool {
        let (from, subscriptions) = {
            let mut inner = self.inner.borrow_mut();
            if inner.state == ControlState::Destroyed {
                return false;
            }
            let from = std::mem::replace(&mut inner.state, ControlState::Destroyed);
            inner.ctm = None;
            (from, inner.subscriptions.take())
        };
        drop(subscriptions);

        if let Some(registry) = self.registry.upgrade() {
            registry.forget(self);
        }

        if matches!(how, Teardown::Released | Teardown::Failed(_)) {
            if let Some(output) = self.output.upgrade() {
                let clear = self.config.clear_on_release && from == ControlState::Armed;
                output.with_backend(|backend| {
                    if clear {
                        backend.set_ctm(None);
                    }
                    backend.schedule_frame();
                });
            }
        }

        debug!(control = %self.id, ?from, ?how, "control destroyed");
        true
    }

    fn output_enabled(&self) -> bool {
        self.output.upgrade().is_some_and(|o| o.is_enabled())
    }
}

impl fmt::Debug for ControlObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlObject")
            .field("id", &self.id)
            .field("output", &self.output_id)
            .field("state", &self.state())
            .finish()
    }
}
