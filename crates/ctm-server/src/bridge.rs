//! Routes output lifecycle events to the control bound to that output.
//!
//! Listeners hold only a weak reference to their control. The returned
//! [`OutputSubscriptions`] lives inside the control and is dropped during
//! its teardown, which detaches both listeners together.

use std::rc::Rc;

use crate::control::ControlObject;
use crate::output::Output;
use crate::signal::Subscription;

/// The pair of listeners a control keeps on its output.
#[derive(Debug)]
pub struct OutputSubscriptions {
    destroy: Subscription,
    commit: Subscription,
}

impl OutputSubscriptions {
    pub fn is_active(&self) -> bool {
        self.destroy.is_active() && self.commit.is_active()
    }
}

/// Subscribe `control` to `output`'s destroy and commit signals.
///
/// Every commit is forwarded; the control decides whether to act on it.
pub(crate) fn attach(control: &Rc<ControlObject>, output: &Output) -> OutputSubscriptions {
    let events = output.events();

    let weak = Rc::downgrade(control);
    let destroy = events.destroy.subscribe(move |_| {
        if let Some(control) = weak.upgrade() {
            control.handle_output_destroyed();
        }
    });

    let weak = Rc::downgrade(control);
    let commit = events.commit.subscribe(move |event| {
        if let Some(control) = weak.upgrade() {
            control.handle_output_commit(event);
        }
    });

    OutputSubscriptions { destroy, commit }
}
