//! Skirmish Core
//!
//! Core types shared by every Skirmish component.
//!
//! This crate contains:
//! - Domain types: the `Job` record and its lifecycle
//! - DTOs: request bodies exchanged over the control plane

pub mod domain;
pub mod dto;
