// lib.rs

pub use std::{fmt, time::Duration};

pub use anyhow::bail;
pub use embedded_hal::{delay::DelayNs, digital::OutputPin};
pub use serde::{Deserialize, Serialize};

mod config;
pub use config::*;

mod state;
pub use state::*;

mod blink;
pub use blink::*;

mod measure;
pub use measure::*;

mod telemetry;
pub use telemetry::*;

mod transport;
pub use transport::*;

mod wifi;
pub use wifi::*;

mod node;
pub use node::*;

pub const FW_VERSION: &str = env!("CARGO_PKG_VERSION");

// EOF
