//! Adapters behind the domain ports.

pub mod gateway;
pub mod in_memory;
pub mod otp;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
