//! GHG emission factor matching and calculation engine.

pub mod activity;
pub mod calculation;
pub mod config;
pub mod error;
pub mod factors;
pub mod telemetry;
pub mod units;
