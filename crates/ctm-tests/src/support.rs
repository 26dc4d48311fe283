//! Shared fixtures.

use std::cell::RefCell;
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::rc::Rc;

use ctm_core::Matrix;
use ctm_server::{ClientId, ControlId, FailureReason, Output, OutputId, Requester, SoftwareOutput};

pub struct Client {
    id: ClientId,
    failures: RefCell<Vec<(ControlId, FailureReason)>>,
}

impl Client {
    pub fn new(id: u32) -> Rc<Self> {
        Rc::new(Self {
            id: ClientId(id),
            failures: RefCell::new(Vec::new()),
        })
    }

    pub fn failures(&self) -> Vec<(ControlId, FailureReason)> {
        self.failures.borrow().clone()
    }
}

impl Requester for Client {
    fn client_id(&self) -> ClientId {
        self.id
    }

    fn failed(&self, control: ControlId, reason: FailureReason) {
        self.failures.borrow_mut().push((control, reason));
    }
}

pub fn shm(bytes: &[u8]) -> File {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file
}

pub fn shm_matrix(matrix: &Matrix) -> File {
    shm(matrix.encode().as_bytes())
}

pub fn output(id: u32, enabled: bool) -> (Rc<Output>, SoftwareOutput) {
    let backend = SoftwareOutput::new(enabled);
    let output = Output::new(OutputId(id), format!("OUT-{id}"), backend.clone());
    (output, backend)
}
