//! Application layer orchestrating the marketplace use cases.
//!
//! Each service owns one area of the core and talks to storage only through
//! the `Store` port. Services that read-then-write share a `Locks` table so
//! checks and commits on the same artist, ticket type or wallet never
//! interleave.

pub mod availability;
pub mod booking;
pub mod calendar;
pub mod catalog;
pub mod ledger;
pub mod locks;
pub mod marketplace;
pub mod sweep;
pub mod ticketing;
