//! Batch interface: JSON-lines commands in, response envelopes and a CSV
//! wallet summary out.

pub mod csv;
pub mod json;
