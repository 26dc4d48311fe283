//! Outputs and the renderer collaborator seam.
//!
//! The engine never owns an output. It holds `Weak<Output>` references and
//! reacts to the `destroy` and `commit` signals. The actual pending-state,
//! test and commit machinery sits behind [`OutputBackend`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::BitOr;
use std::rc::Rc;

use ctm_core::WireMatrix;
use tracing::debug;

use crate::signal::Signal;

/// Identity of an output, stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputId(pub u32);

impl fmt::Display for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "output#{}", self.0)
    }
}

/// Bitmask of output state fields touched by a commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateFields(u32);

impl StateFields {
    pub const EMPTY: Self = Self(0);
    pub const ENABLED: Self = Self(1 << 1);
    pub const CTM: Self = Self(1 << 9);

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl BitOr for StateFields {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Payload of the output `commit` signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitEvent {
    pub output: OutputId,
    pub committed: StateFields,
}

/// The renderer side of an output.
///
/// Mirrors the compositor's pending/current state model: `set_*` stage
/// state, `test` validates the staged state without applying it, `commit`
/// applies it, `rollback` discards it.
pub trait OutputBackend {
    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    /// Stage a color transform. `None` stages the identity.
    fn set_ctm(&mut self, ctm: Option<&WireMatrix>);

    fn test(&self) -> bool;

    /// Apply the staged state. Returns the fields that were committed, or
    /// `None` if the staged state was refused.
    fn commit(&mut self) -> Option<StateFields>;

    fn rollback(&mut self);

    /// Ask for a new frame so staged state reaches the screen.
    fn schedule_frame(&mut self);
}

/// Signals emitted by an output.
#[derive(Default)]
pub struct OutputEvents {
    pub destroy: Signal<OutputId>,
    pub commit: Signal<CommitEvent>,
}

/// A display output shared between the compositor and the engine.
pub struct Output {
    id: OutputId,
    name: String,
    backend: RefCell<Box<dyn OutputBackend>>,
    events: OutputEvents,
    destroyed: Cell<bool>,
}

impl Output {
    pub fn new(
        id: OutputId,
        name: impl Into<String>,
        backend: impl OutputBackend + 'static,
    ) -> Rc<Self> {
        Rc::new(Self {
            id,
            name: name.into(),
            backend: RefCell::new(Box::new(backend)),
            events: OutputEvents::default(),
            destroyed: Cell::new(false),
        })
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn events(&self) -> &OutputEvents {
        &self.events
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.borrow().is_enabled()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }

    /// Run `f` against the backend. The borrow ends before `f`'s result
    /// is returned, so no signal fires while it is held.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut dyn OutputBackend) -> R) -> R {
        let mut backend = self.backend.borrow_mut();
        f(&mut **backend)
    }

    /// Stage an enable or disable for the next commit.
    pub fn set_enabled(&self, enabled: bool) {
        self.backend.borrow_mut().set_enabled(enabled);
    }

    /// Commit staged state and notify `commit` listeners.
    pub fn commit(&self) -> bool {
        let committed = self.backend.borrow_mut().commit();
        match committed {
            Some(committed) => {
                debug!(output = %self.id, fields = committed.bits(), "output committed");
                self.events.commit.emit(&CommitEvent {
                    output: self.id,
                    committed,
                });
                true
            }
            None => {
                debug!(output = %self.id, "output commit refused");
                false
            }
        }
    }

    /// Announce removal. Only the first call emits.
    pub fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        debug!(output = %self.id, name = %self.name, "output destroyed");
        self.events.destroy.emit(&self.id);
    }
}

impl Drop for Output {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}
