// config.rs

use anyhow::bail;
use crc::{Crc, CRC_32_ISCSI};
use log::*;
use serde::{Deserialize, Serialize};

use crate::{Calibration, Polarity, PollLimit};

pub const NVS_BUF_SIZE: usize = 256;

const DEFAULT_SERVER_ADDR: &str = "10.0.0.14";
const DEFAULT_SERVER_PORT: u16 = 5050;
const DEFAULT_ENDPOINT: &str = "update";
const DEFAULT_SENSOR_ID: &str = "d1-1";
const DEFAULT_REPORT_DELAY: u64 = 60;
const DEFAULT_BLINK_HALF_MS: u32 = 250;

#[cfg(target_os = "espidf")]
const CONFIG_NAME: &str = "cfg";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyConfig {
    pub wifi_ssid: String,
    pub wifi_pass: String,

    pub server_addr: String,
    pub server_port: u16,
    pub endpoint: String,
    pub sensor_id: String,
    pub calibration: Calibration,

    /// seconds between reports
    pub report_delay: u64,

    pub blink_half_ms: u32,
    pub led_active_low: bool,
    pub max_connect_polls: Option<u32>,
}

impl Default for MyConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: option_env!("WIFI_SSID").unwrap_or("internet").into(),
            wifi_pass: option_env!("WIFI_PASS").unwrap_or("password").into(),

            server_addr: option_env!("SERVER_ADDR").unwrap_or(DEFAULT_SERVER_ADDR).into(),
            server_port: option_env!("SERVER_PORT")
                .unwrap_or("-")
                .parse()
                .unwrap_or(DEFAULT_SERVER_PORT),
            endpoint: DEFAULT_ENDPOINT.into(),
            sensor_id: option_env!("SENSOR_ID").unwrap_or(DEFAULT_SENSOR_ID).into(),
            calibration: Calibration::default(),

            report_delay: DEFAULT_REPORT_DELAY,

            blink_half_ms: DEFAULT_BLINK_HALF_MS,
            led_active_low: true,
            max_connect_polls: None,
        }
    }
}

impl MyConfig {
    pub fn request_url(&self) -> String {
        format!(
            "http://{}:{}/{}",
            self.server_addr,
            self.server_port,
            self.endpoint.trim_start_matches('/')
        )
    }

    pub fn led_polarity(&self) -> Polarity {
        Polarity::from_active_low(self.led_active_low)
    }

    pub fn connect_limit(&self) -> PollLimit {
        match self.max_connect_polls {
            Some(n) => PollLimit::Bounded(n),
            None => PollLimit::Unbounded,
        }
    }

    pub fn from_bytes(b: &[u8]) -> Option<Self> {
        let crc = Crc::<u32>::new(&CRC_32_ISCSI);
        let digest = crc.digest();
        match postcard::from_bytes_crc32::<MyConfig>(b, digest) {
            Ok(c) => {
                info!("Successfully parsed config.");
                Some(c)
            }
            Err(e) => {
                error!("Cannot parse config: {e:?}");
                None
            }
        }
    }

    pub fn to_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let mut buf = [0u8; NVS_BUF_SIZE];
        let crc = Crc::<u32>::new(&CRC_32_ISCSI);
        let digest = crc.digest();
        match postcard::to_slice_crc32(self, &mut buf, digest) {
            Ok(d) => {
                info!("Encoded config to {sz} bytes.", sz = d.len());
                Ok(d.to_vec())
            }
            Err(e) => bail!("Cannot encode config to buffer {e:?}"),
        }
    }

    #[cfg(target_os = "espidf")]
    pub fn from_nvs(nvs: &mut esp_idf_svc::nvs::EspNvs<esp_idf_svc::nvs::NvsDefault>) -> Option<Self> {
        let mut nvsbuf = [0u8; NVS_BUF_SIZE];
        info!("Reading up to {sz} bytes from nvs...", sz = NVS_BUF_SIZE);
        let b = match nvs.get_raw(CONFIG_NAME, &mut nvsbuf) {
            Err(e) => {
                error!("Nvs read error {e:?}");
                return None;
            }
            Ok(Some(b)) => b,
            _ => {
                error!("Nvs key not found");
                return None;
            }
        };
        info!("Got {sz} bytes from nvs. Parsing config...", sz = b.len());
        Self::from_bytes(b)
    }

    #[cfg(target_os = "espidf")]
    pub fn to_nvs(&self, nvs: &mut esp_idf_svc::nvs::EspNvs<esp_idf_svc::nvs::NvsDefault>) -> anyhow::Result<()> {
        let data = self.to_bytes()?;
        if let Err(e) = nvs.set_raw(CONFIG_NAME, &data) {
            bail!("Cannot save to nvs: {e:?}");
        }
        info!("Config saved.");
        Ok(())
    }
}


// EOF
