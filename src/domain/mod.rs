//! Marketplace entities and the ports the application layer talks through.

pub mod artist;
pub mod booking;
pub mod calendar;
pub mod money;
pub mod ports;
pub mod review;
pub mod service;
pub mod ticket;
pub mod wallet;
pub mod withdrawal;
