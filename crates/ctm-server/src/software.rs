//! In-memory output backend.
//!
//! Tracks pending and current state the way a real renderer would and
//! applies the active transform to RGB values on the CPU. Clones share
//! state, so the compositor can keep a handle for inspection after moving
//! one into an [`Output`](crate::Output).

use std::cell::RefCell;
use std::rc::Rc;

use ctm_core::{Matrix, WireMatrix};

use crate::output::{OutputBackend, StateFields};

#[derive(Debug, Default)]
struct Pending {
    enabled: Option<bool>,
    ctm: Option<Option<WireMatrix>>,
}

#[derive(Debug)]
struct State {
    enabled: bool,
    ctm: Option<WireMatrix>,
    pending: Pending,
    max_coefficient: f64,
    frames_scheduled: u32,
    commits: u32,
    rollbacks: u32,
}

/// CPU reference implementation of [`OutputBackend`].
#[derive(Debug, Clone)]
pub struct SoftwareOutput {
    state: Rc<RefCell<State>>,
}

impl SoftwareOutput {
    pub fn new(enabled: bool) -> Self {
        Self {
            state: Rc::new(RefCell::new(State {
                enabled,
                ctm: None,
                pending: Pending::default(),
                max_coefficient: f64::INFINITY,
                frames_scheduled: 0,
                commits: 0,
                rollbacks: 0,
            })),
        }
    }

    /// Refuse transforms whose largest coefficient magnitude exceeds `limit`.
    /// A limit below zero refuses every transform.
    pub fn with_max_coefficient(self, limit: f64) -> Self {
        self.set_max_coefficient(limit);
        self
    }

    pub fn set_max_coefficient(&self, limit: f64) {
        self.state.borrow_mut().max_coefficient = limit;
    }

    /// The committed transform, decoded. `None` means identity.
    pub fn active_ctm(&self) -> Option<Matrix> {
        self.state.borrow().ctm.map(|wire| wire.decode())
    }

    /// The staged transform, if one is staged. `Some(None)` is a staged clear.
    pub fn pending_ctm(&self) -> Option<Option<Matrix>> {
        self.state
            .borrow()
            .pending
            .ctm
            .map(|ctm| ctm.map(|wire| wire.decode()))
    }

    pub fn frames_scheduled(&self) -> u32 {
        self.state.borrow().frames_scheduled
    }

    pub fn commits(&self) -> u32 {
        self.state.borrow().commits
    }

    pub fn rollbacks(&self) -> u32 {
        self.state.borrow().rollbacks
    }

    /// What a linear RGB value looks like on screen right now.
    pub fn render_rgb(&self, rgb: [f64; 3]) -> [f64; 3] {
        match self.active_ctm() {
            Some(m) => m.apply_rgb(rgb),
            None => rgb,
        }
    }
}

impl OutputBackend for SoftwareOutput {
    fn is_enabled(&self) -> bool {
        self.state.borrow().enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.state.borrow_mut().pending.enabled = Some(enabled);
    }

    fn set_ctm(&mut self, ctm: Option<&WireMatrix>) {
        self.state.borrow_mut().pending.ctm = Some(ctm.copied());
    }

    fn test(&self) -> bool {
        let state = self.state.borrow();
        match state.pending.ctm {
            Some(Some(wire)) => wire.decode().max_abs() <= state.max_coefficient,
            _ => true,
        }
    }

    fn commit(&mut self) -> Option<StateFields> {
        if !self.test() {
            return None;
        }
        let mut state = self.state.borrow_mut();
        let pending = std::mem::take(&mut state.pending);
        let mut committed = StateFields::EMPTY;
        if let Some(enabled) = pending.enabled {
            state.enabled = enabled;
            committed.insert(StateFields::ENABLED);
        }
        if let Some(ctm) = pending.ctm {
            state.ctm = ctm;
            committed.insert(StateFields::CTM);
        }
        state.commits += 1;
        Some(committed)
    }

    fn rollback(&mut self) {
        let mut state = self.state.borrow_mut();
        state.pending = Pending::default();
        state.rollbacks += 1;
    }

    fn schedule_frame(&mut self) {
        self.state.borrow_mut().frames_scheduled += 1;
    }
}
