// telemetry.rs
//
// Report bodies are plain `key: value` lines. The collector loads them as
// YAML, so nothing here escapes or validates keys or values.

use std::fmt::{Display, Write};

use crate::*;

/// Append `key: val\n` to `buf`.
pub fn add_key_val<T: Display>(buf: &mut String, key: &str, val: T) {
    // writing into a String cannot fail
    let _ = writeln!(buf, "{key}: {val}");
}

/// Owned report body with a chaining interface over [`add_key_val`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Report {
    body: String,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(c: usize) -> Self {
        Report {
            body: String::with_capacity(c),
        }
    }

    pub fn add<T: Display>(&mut self, key: &str, val: T) -> &mut Self {
        add_key_val(&mut self.body, key, val);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.body
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.body)
    }
}

/// Body for one soil reading. `location` comes first; the collector names
/// its files after it.
pub fn build_report(state: &MyState, reading: &SoilReading) -> Report {
    let mut r = Report::with_capacity(128);
    r.add("location", &state.config.sensor_id)
        .add("ip", &state.ip_addr)
        .add("moisture_raw", reading.raw)
        .add("moisture", reading.moisture)
        .add("uptime", state.uptime)
        .add("fw_version", FW_VERSION);
    r
}


// EOF
