//! Integration test crate for the CTM control engine.
//!
//! Drives ctm-core and ctm-server together the way a compositor would:
//! real payload files, software outputs and clients that record events.

#[cfg(test)]
mod support;

#[cfg(test)]
mod scenario;

#[cfg(test)]
mod lifecycle;
