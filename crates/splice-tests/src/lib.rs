//! Integration test crate for Splice.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives the timeline through its public facade only.


#[cfg(test)]
mod timeline;

#[cfg(test)]
mod properties;
