//! Data Transfer Objects for the control plane
//!
//! Request bodies sent by workers and producers to the controller.

pub mod job;
