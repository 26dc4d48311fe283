//! Helpers shared by the unit tests.

use std::cell::RefCell;
use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::rc::Rc;

use ctm_core::Matrix;

use crate::control::ControlId;
use crate::error::FailureReason;
use crate::payload::PayloadHandle;
use crate::requester::{ClientId, Requester};

/// Records every `failed` event it receives.
pub(crate) struct RecordingRequester {
    id: ClientId,
    failures: RefCell<Vec<(ControlId, FailureReason)>>,
}

impl RecordingRequester {
    pub(crate) fn new(id: u32) -> Rc<Self> {
        Rc::new(Self {
            id: ClientId(id),
            failures: RefCell::new(Vec::new()),
        })
    }

    pub(crate) fn failures(&self) -> Vec<(ControlId, FailureReason)> {
        self.failures.borrow().clone()
    }
}

impl Requester for RecordingRequester {
    fn client_id(&self) -> ClientId {
        self.id
    }

    fn failed(&self, control: ControlId, reason: FailureReason) {
        self.failures.borrow_mut().push((control, reason));
    }
}

/// A rewound temp file holding `bytes`.
pub(crate) fn payload_bytes(bytes: &[u8]) -> File {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file.seek(SeekFrom::Start(0)).unwrap();
    file
}

/// A rewound temp file holding the encoded `matrix`.
pub(crate) fn payload(matrix: &Matrix) -> File {
    payload_bytes(matrix.encode().as_bytes())
}

/// A handle whose reads always fail.
pub(crate) struct BrokenHandle;

impl PayloadHandle for BrokenHandle {
    fn set_nonblocking(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("device gone"))
    }
}
