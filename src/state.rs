// state.rs

use crate::*;

pub struct MyState {
    pub config: MyConfig,
    pub myid: String,
    pub ip_addr: NetworkAddress,
    /// seconds since boot
    pub uptime: u64,
    pub reports_sent: u64,
    pub reports_failed: u64,
}

impl MyState {
    pub fn new(config: MyConfig) -> Self {
        MyState {
            myid: format!("gardennode-{}", config.sensor_id),
            config,
            ip_addr: NetworkAddress::unset(),
            uptime: 0,
            reports_sent: 0,
            reports_failed: 0,
        }
    }

    pub fn wifi_up(&self) -> bool {
        self.ip_addr.is_set()
    }
}

// EOF
