pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod http;
pub mod telemetry;
pub mod views;
