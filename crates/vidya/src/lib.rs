//! Core library for the school-management admit card service.
//!
//! The interesting logic lives in [`workflows::admit_card`]: per-student fee
//! eligibility, idempotent admit card generation, class-scale bulk issuance,
//! and the pay-to-unlock flow. [`config`], [`telemetry`], and [`error`] carry
//! the service plumbing shared with the HTTP binary.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
