//! End-to-end request flows.

use ctm_core::{decode, Matrix, WIRE_SIZE};
use ctm_server::{ControlState, CtmManager, FailureReason, ProtocolError};

use crate::support::{output, shm, shm_matrix, Client};

// ── Grayscale on an enabled output ─────────────────────────────

#[test]
fn grayscale_reaches_the_screen() {
    let manager = CtmManager::default();
    let (out, backend) = output(1, true);
    let client = Client::new(1);
    let control = manager.bind(client.clone()).get_control(Some(&out));

    control.set_ctm(shm_matrix(&Matrix::saturation(0.0))).unwrap();
    assert_eq!(control.state(), ControlState::Armed);
    assert_eq!(backend.frames_scheduled(), 1);

    assert!(out.commit());
    let active = backend.active_ctm().unwrap();
    for c in active.coefficients() {
        assert!((c - 1.0 / 3.0).abs() < 1e-9);
    }
    let px = backend.render_rgb([1.0, 0.0, 0.0]);
    assert!(px.iter().all(|v| (v - 1.0 / 3.0).abs() < 1e-9));
    assert!(client.failures().is_empty());
}

#[test]
fn stored_words_decode_to_requested_matrix() {
    let manager = CtmManager::default();
    let (out, _) = output(1, true);
    let control = manager.bind(Client::new(1)).get_control(Some(&out));

    let requested = Matrix::saturation(1.5);
    control.set_ctm(shm_matrix(&requested)).unwrap();
    let stored = decode(&control.current_ctm().unwrap());
    assert!(stored.approx_eq(&requested, 1e-9));
}

// ── Payload validation ─────────────────────────────────────────

#[test]
fn short_payload_is_a_protocol_error() {
    let manager = CtmManager::default();
    let (out, backend) = output(1, true);
    let client = Client::new(1);
    let control = manager.bind(client.clone()).get_control(Some(&out));

    let err = control.set_ctm(shm(&[0u8; 36])).unwrap_err();
    assert_eq!(
        err,
        ProtocolError::InvalidCtm {
            expected: WIRE_SIZE,
            got: 36
        }
    );
    assert_eq!(err.code(), ProtocolError::INVALID_CTM);
    assert_eq!(control.state(), ControlState::Bound);
    assert_eq!(backend.frames_scheduled(), 0);
    assert!(client.failures().is_empty());

    // The control is still usable.
    control.set_ctm(shm_matrix(&Matrix::IDENTITY)).unwrap();
    assert_eq!(control.state(), ControlState::Armed);
}

#[test]
fn empty_payload_is_a_protocol_error() {
    let manager = CtmManager::default();
    let (out, _) = output(1, true);
    let control = manager.bind(Client::new(1)).get_control(Some(&out));
    assert!(matches!(
        control.set_ctm(shm(&[])),
        Err(ProtocolError::InvalidCtm { got: 0, .. })
    ));
}

#[test]
fn output_refusal_fails_the_control() {
    let manager = CtmManager::default();
    let (out, backend) = output(1, true);
    backend.set_max_coefficient(1.0);
    let client = Client::new(1);
    let control = manager.bind(client.clone()).get_control(Some(&out));

    control.set_ctm(shm_matrix(&Matrix::saturation(3.0))).unwrap();
    assert!(control.is_destroyed());
    assert_eq!(
        client.failures(),
        vec![(control.id(), FailureReason::Rejected)]
    );
    out.commit();
    assert!(backend.active_ctm().is_none());
}

// ── Commit gating ──────────────────────────────────────────────

#[test]
fn matrix_follows_output_through_modeset() {
    let manager = CtmManager::default();
    let (out, backend) = output(1, false);
    let client = Client::new(1);
    let control = manager.bind(client.clone()).get_control(Some(&out));

    control.set_ctm(shm_matrix(&Matrix::saturation(0.0))).unwrap();
    assert_eq!(backend.frames_scheduled(), 0);

    out.set_enabled(true);
    out.commit();
    assert_eq!(backend.frames_scheduled(), 1);
    out.commit();
    let active = backend.active_ctm().unwrap();
    assert!(active
        .coefficients()
        .iter()
        .all(|c| (c - 1.0 / 3.0).abs() < 1e-9));

    // Plain commits do not re-apply.
    out.commit();
    assert_eq!(backend.frames_scheduled(), 1);

    out.set_enabled(false);
    out.commit();
    assert_eq!(backend.frames_scheduled(), 1);

    out.set_enabled(true);
    out.commit();
    assert_eq!(backend.frames_scheduled(), 2);
    assert_eq!(control.state(), ControlState::Armed);
    assert!(client.failures().is_empty());
}
