//! The CTM manager: registry of live controls, one per output.
//!
//! `CtmManager` is owned by the compositor and scoped to the display's
//! lifetime. Each client bind produces a [`ManagerBinding`] that creates
//! controls. A second control for an already controlled output evicts the
//! first: last writer wins, there is no queue.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use crate::config::ManagerConfig;
use crate::control::{ControlId, ControlObject, Teardown};
use crate::error::FailureReason;
use crate::output::{Output, OutputId};
use crate::requester::{ClientId, Requester};
use crate::signal::{Signal, Subscription};

/// Protocol version implemented by the manager global.
pub const CTM_MANAGER_VERSION: u32 = 1;

/// Emitted once when the manager shuts down, before controls are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownEvent {
    pub live_controls: usize,
}

pub(crate) struct Registry {
    controls: RefCell<HashMap<OutputId, Rc<ControlObject>>>,
    config: ManagerConfig,
    next_id: Cell<u64>,
    destroy: Signal<ShutdownEvent>,
    shut_down: Cell<bool>,
}

impl Registry {
    fn create(
        self: &Rc<Self>,
        requester: Rc<dyn Requester>,
        output: Option<&Rc<Output>>,
    ) -> Rc<ControlObject> {
        let id = ControlId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        if self.shut_down.get() {
            let control = ControlObject::new(id, requester, None, Weak::new(), self.config);
            control.fail(FailureReason::ManagerGone);
            return control;
        }

        let output = output.filter(|o| !o.is_destroyed());
        let control =
            ControlObject::new(id, requester, output, Rc::downgrade(self), self.config);

        let Some(output) = output else {
            warn!(control = %id, client = %control.client_id(), "control requested without output");
            control.fail(FailureReason::NoOutput);
            return control;
        };

        control.bind(output);
        let previous = self
            .controls
            .borrow_mut()
            .insert(output.id(), Rc::clone(&control));

        if let Some(previous) = previous {
            warn!(
                output = %output.id(),
                evicted = %previous.id(),
                by = %id,
                "output already controlled, evicting previous control"
            );
            previous.fail(FailureReason::Evicted);
        }
        debug!(control = %id, output = %output.id(), "control registered");
        control
    }

    /// Drop `control` from the index if it is still the entry for its output.
    pub(crate) fn forget(&self, control: &ControlObject) {
        let Some(output) = control.output_id() else {
            return;
        };
        let mut controls = self.controls.borrow_mut();
        if controls.get(&output).is_some_and(|c| c.id() == control.id()) {
            controls.remove(&output);
        }
    }

    fn shutdown(&self) {
        if self.shut_down.replace(true) {
            return;
        }
        let live_controls = self.controls.borrow().len();
        info!(live_controls, "ctm manager shutting down");
        self.destroy.emit(&ShutdownEvent { live_controls });

        let controls: Vec<Rc<ControlObject>> =
            self.controls.borrow_mut().drain().map(|(_, c)| c).collect();
        for control in controls {
            control.teardown(Teardown::Shutdown);
        }
    }
}

/// The manager global.
pub struct CtmManager {
    registry: Rc<Registry>,
}

impl CtmManager {
    pub fn new(config: ManagerConfig) -> Self {
        info!(version = CTM_MANAGER_VERSION, ?config, "ctm manager created");
        Self {
            registry: Rc::new(Registry {
                controls: RefCell::new(HashMap::new()),
                config,
                next_id: Cell::new(1),
                destroy: Signal::new(),
                shut_down: Cell::new(false),
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.registry.config
    }

    /// A client bound the global.
    pub fn bind(&self, requester: Rc<dyn Requester>) -> ManagerBinding {
        debug!(client = %requester.client_id(), "ctm manager bound");
        ManagerBinding {
            registry: Rc::downgrade(&self.registry),
            requester,
        }
    }

    /// The live control for `output`, if any.
    pub fn control_for(&self, output: OutputId) -> Option<Rc<ControlObject>> {
        self.registry.controls.borrow().get(&output).cloned()
    }

    pub fn control_count(&self) -> usize {
        self.registry.controls.borrow().len()
    }

    /// Observe manager shutdown.
    #[must_use = "dropping the subscription detaches the listener"]
    pub fn on_destroy(&self, callback: impl Fn(&ShutdownEvent) + 'static) -> Subscription {
        self.registry.destroy.subscribe(callback)
    }

    /// Tear down every live control without sending `failed`. Observers of
    /// [`on_destroy`](Self::on_destroy) are notified first.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Default for CtmManager {
    fn default() -> Self {
        Self::new(ManagerConfig::default())
    }
}

impl Drop for CtmManager {
    fn drop(&mut self) {
        self.registry.shutdown();
    }
}

/// One client's binding of the manager global.
pub struct ManagerBinding {
    registry: Weak<Registry>,
    requester: Rc<dyn Requester>,
}

impl ManagerBinding {
    pub fn client_id(&self) -> ClientId {
        self.requester.client_id()
    }

    /// Request control of `output`'s color transform.
    ///
    /// Always returns a control object. If it cannot be honoured the object
    /// is already destroyed and the client has been sent `failed`.
    pub fn get_control(&self, output: Option<&Rc<Output>>) -> Rc<ControlObject> {
        match self.registry.upgrade() {
            Some(registry) => registry.create(Rc::clone(&self.requester), output),
            None => {
                let control = ControlObject::new(
                    ControlId::DETACHED,
                    Rc::clone(&self.requester),
                    None,
                    Weak::new(),
                    ManagerConfig::default(),
                );
                control.fail(FailureReason::ManagerGone);
                control
            }
        }
    }

    /// Release the binding. Controls created through it are unaffected.
    pub fn destroy(self) {
        debug!(client = %self.requester.client_id(), "ctm manager binding released");
    }
}
