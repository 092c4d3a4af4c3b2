//! Control-plane services: lifecycle operations and background sweeps.

pub mod lifecycle;
pub mod sweeper;

pub use sweeper::{SweeperConfig, SweeperService};
