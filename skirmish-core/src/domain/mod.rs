//! Core domain types
//!
//! These types are shared between the controller (which persists them) and
//! the workers (which receive them when claiming work).

pub mod job;
