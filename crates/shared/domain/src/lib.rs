//! # Domain Models
//!
//! Pure domain types shared by every slice of the payment backend.
//! Keep it lean: no I/O, networking, or heavy logic, just data and simple helpers.

pub mod config;
pub mod constants;
pub mod payments;
pub mod registry;
