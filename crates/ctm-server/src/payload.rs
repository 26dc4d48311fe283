//! One-shot transfer of an encoded matrix over a shared memory handle.
//!
//! The client fills a file (usually anonymous and mmapped) with exactly
//! [`CTM_PAYLOAD_SIZE`] bytes and passes the handle along with the request.
//! The handle is switched to non-blocking before the single read so a
//! misbehaving client cannot stall the dispatch thread. A short read is a
//! usage error; it is not retried.
//!
//! `receive` takes the handle by value: it is closed exactly once, when it
//! drops at the end of the call, on every path.

use std::io;

use ctm_core::{WireMatrix, WIRE_SIZE};

use crate::error::PayloadError;

/// Bytes in a valid payload: nine 64-bit words, or 18 32-bit words.
pub const CTM_PAYLOAD_SIZE: usize = WIRE_SIZE;

/// A readable, closable handle carrying a payload.
pub trait PayloadHandle {
    fn set_nonblocking(&mut self) -> io::Result<()>;

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

#[cfg(unix)]
impl PayloadHandle for std::fs::File {
    fn set_nonblocking(&mut self) -> io::Result<()> {
        use nix::fcntl::{fcntl, FcntlArg, OFlag};
        use std::os::fd::AsRawFd;

        let fd = self.as_raw_fd();
        let flags = OFlag::from_bits_truncate(fcntl(fd, FcntlArg::F_GETFL)?);
        fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        io::Read::read(self, buf)
    }
}

impl<H: PayloadHandle + ?Sized> PayloadHandle for Box<H> {
    fn set_nonblocking(&mut self) -> io::Result<()> {
        (**self).set_nonblocking()
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read(buf)
    }
}

/// Read one encoded matrix from `handle` and close it.
pub fn receive<H: PayloadHandle>(mut handle: H) -> Result<WireMatrix, PayloadError> {
    handle
        .set_nonblocking()
        .map_err(PayloadError::Nonblocking)?;

    let mut buf = [0u8; CTM_PAYLOAD_SIZE];
    let got = loop {
        match handle.read(&mut buf) {
            Ok(n) => break n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            // Nothing there yet. Delivery is a single write, so this is
            // the same as an empty payload.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break 0,
            Err(e) => return Err(PayloadError::Io(e)),
        }
    };

    if got != CTM_PAYLOAD_SIZE {
        return Err(PayloadError::Short {
            expected: CTM_PAYLOAD_SIZE,
            got,
        });
    }
    Ok(WireMatrix::from_bytes(&buf))
}
