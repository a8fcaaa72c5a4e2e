pub mod config;
pub mod controller;
pub mod errors;
pub mod metrics;
pub mod probe;
pub mod scaler;
