//! `flywheel-kernel` — contracts shared by the Flywheel gateway and deploy CLI.
//!
//! - [`gateway`]: route/mock/backend configuration, router and filter traits.
//! - [`adoption`]: resource kinds, ownership metadata and the cluster access
//!   trait used by the adoption reconciler.
//! - [`config`]: multi-format configuration loading with environment
//!   substitution.

pub mod adoption;
pub mod config;
pub mod gateway;
