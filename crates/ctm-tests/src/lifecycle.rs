//! Exclusivity and teardown across controls, outputs and the manager.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use ctm_core::Matrix;
use ctm_server::{
    ClientId, ControlId, ControlState, CtmManager, FailureReason, ManagerConfig, Output, OutputId,
    Requester,
};

use crate::support::{output, shm_matrix, Client};

// ── Exclusivity ────────────────────────────────────────────────

#[test]
fn last_writer_wins() {
    let manager = CtmManager::default();
    let (out, backend) = output(1, true);
    let first_client = Client::new(1);
    let second_client = Client::new(2);

    let first = manager.bind(first_client.clone()).get_control(Some(&out));
    first.set_ctm(shm_matrix(&Matrix::saturation(0.0))).unwrap();
    let second = manager.bind(second_client.clone()).get_control(Some(&out));

    assert!(first.is_destroyed());
    assert_eq!(
        first_client.failures(),
        vec![(first.id(), FailureReason::Evicted)]
    );
    assert!(second_client.failures().is_empty());
    assert_eq!(manager.control_for(OutputId(1)).unwrap().id(), second.id());

    // The evicted control's matrix is cleared from the output.
    out.commit();
    assert!(backend.active_ctm().is_none());

    second.set_ctm(shm_matrix(&Matrix::saturation(1.2))).unwrap();
    out.commit();
    assert!(backend.active_ctm().is_some());
}

#[test]
fn evicted_control_ignores_requests() {
    let manager = CtmManager::default();
    let (out, _) = output(1, true);
    let first = manager.bind(Client::new(1)).get_control(Some(&out));
    let _second = manager.bind(Client::new(2)).get_control(Some(&out));

    first.set_ctm(shm_matrix(&Matrix::IDENTITY)).unwrap();
    assert!(first.current_ctm().is_none());
    first.destroy();
    assert_eq!(manager.control_count(), 1);
}

#[test]
fn at_most_one_failed_per_control() {
    let manager = CtmManager::default();
    let (out, backend) = output(1, true);
    backend.set_max_coefficient(0.5);
    let client = Client::new(1);
    let control = manager.bind(client.clone()).get_control(Some(&out));
    control.set_ctm(shm_matrix(&Matrix::IDENTITY)).unwrap();
    let _other = manager.bind(Client::new(2)).get_control(Some(&out));
    out.destroy();
    assert_eq!(client.failures().len(), 1);
}

// ── Teardown isolation ─────────────────────────────────────────

#[test]
fn release_detaches_both_listeners() {
    let manager = CtmManager::default();
    let (out, backend) = output(1, true);
    let control = manager.bind(Client::new(1)).get_control(Some(&out));
    assert!(control.is_subscribed());
    assert_eq!(out.events().destroy.listener_count(), 1);
    assert_eq!(out.events().commit.listener_count(), 1);

    control.destroy();
    assert!(!control.is_subscribed());
    assert_eq!(out.events().destroy.listener_count(), 0);
    assert_eq!(out.events().commit.listener_count(), 0);
    assert_eq!(backend.frames_scheduled(), 1);
}

#[test]
fn controls_on_other_outputs_survive() {
    let manager = CtmManager::default();
    let (a, _) = output(1, true);
    let (b, b_backend) = output(2, true);
    let client = Client::new(1);
    let binding = manager.bind(client.clone());
    let ca = binding.get_control(Some(&a));
    let cb = binding.get_control(Some(&b));
    cb.set_ctm(shm_matrix(&Matrix::saturation(0.0))).unwrap();

    a.destroy();
    assert!(ca.is_destroyed());
    assert_eq!(cb.state(), ControlState::Armed);
    assert!(client.failures().is_empty());

    b.commit();
    assert!(b_backend.active_ctm().is_some());
}

#[test]
fn dropping_output_tears_down_control() {
    let manager = CtmManager::default();
    let (out, backend) = output(1, true);
    let control = manager.bind(Client::new(1)).get_control(Some(&out));
    drop(out);
    assert!(control.is_destroyed());
    assert_eq!(manager.control_count(), 0);
    assert_eq!(backend.frames_scheduled(), 0);
}

#[test]
fn release_without_clear_keeps_transform() {
    let manager = CtmManager::new(ManagerConfig {
        clear_on_release: false,
        ..ManagerConfig::default()
    });
    let (out, backend) = output(1, true);
    let control = manager.bind(Client::new(1)).get_control(Some(&out));
    control.set_ctm(shm_matrix(&Matrix::saturation(0.0))).unwrap();
    out.commit();
    control.destroy();
    out.commit();
    assert!(backend.active_ctm().is_some());
}

/// Client that pulls the output out from under its control on `failed`.
struct Unplugger {
    output: RefCell<Option<Rc<Output>>>,
    failures: Cell<u32>,
}

impl Requester for Unplugger {
    fn client_id(&self) -> ClientId {
        ClientId(3)
    }

    fn failed(&self, _control: ControlId, _reason: FailureReason) {
        self.failures.set(self.failures.get() + 1);
        if let Some(output) = self.output.borrow_mut().take() {
            output.destroy();
        }
    }
}

#[test]
fn output_destroyed_during_commit_triggered_apply() {
    let manager = CtmManager::default();
    let (out, backend) = output(1, false);
    backend.set_max_coefficient(0.5);
    let client = Rc::new(Unplugger {
        output: RefCell::new(Some(out.clone())),
        failures: Cell::new(0),
    });
    let control = manager.bind(client.clone()).get_control(Some(&out));
    control.set_ctm(shm_matrix(&Matrix::IDENTITY)).unwrap();
    assert_eq!(control.state(), ControlState::Armed);

    // The enable commit applies, the backend refuses, and the client
    // destroys the output from inside `failed`.
    out.set_enabled(true);
    out.commit();

    assert!(out.is_destroyed());
    assert!(client.output.borrow().is_none());
    assert_eq!(client.failures.get(), 1);
    assert!(control.is_destroyed());
    assert_eq!(manager.control_count(), 0);
    assert_eq!(out.events().destroy.listener_count(), 0);
    assert_eq!(out.events().commit.listener_count(), 0);

    // Later commits and destroys find nothing to call.
    out.commit();
    out.destroy();
    assert_eq!(client.failures.get(), 1);
}

// ── Manager shutdown ───────────────────────────────────────────

#[test]
fn shutdown_destroys_everything_quietly() {
    let manager = CtmManager::default();
    let (a, _) = output(1, true);
    let (b, _) = output(2, true);
    let client = Client::new(1);
    let binding = manager.bind(client.clone());
    let ca = binding.get_control(Some(&a));
    let cb = binding.get_control(Some(&b));

    let fired = Rc::new(Cell::new(0));
    let seen = fired.clone();
    let _sub = manager.on_destroy(move |event| {
        assert_eq!(event.live_controls, 2);
        seen.set(seen.get() + 1);
    });

    manager.shutdown();
    assert_eq!(fired.get(), 1);
    assert!(ca.is_destroyed() && cb.is_destroyed());
    assert!(client.failures().is_empty());
    assert_eq!(a.events().commit.listener_count(), 0);

    // Late requests get an inert, already failed control.
    let late = binding.get_control(Some(&a));
    assert!(late.is_destroyed());
    assert_eq!(late.id(), ControlId::DETACHED);
    assert_eq!(
        client.failures(),
        vec![(ControlId::DETACHED, FailureReason::ManagerGone)]
    );
}
