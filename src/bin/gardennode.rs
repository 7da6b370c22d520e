// bin/gardennode.rs

use std::time::Instant;

use gardennode::*;
use log::*;

#[cfg(target_os = "espidf")]
esp_idf_sys::esp_app_desc!();

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use esp_idf_hal::{
        adc::{
            attenuation::DB_11,
            oneshot::{config::AdcChannelConfig, AdcChannelDriver, AdcDriver},
        },
        delay::FreeRtos,
        gpio::PinDriver,
        prelude::Peripherals,
    };
    use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs};

    esp_idf_sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Hello.");
    info!("gardennode {FW_VERSION} starting up.");
    let boot = Instant::now();

    let sysloop = EspSystemEventLoop::take()?;
    let nvs_default_partition = nvs::EspDefaultNvsPartition::take()?;

    let ns = env!("CARGO_BIN_NAME");
    let mut nvs = match nvs::EspNvs::new(nvs_default_partition.clone(), ns, true) {
        Ok(nvs) => {
            info!("Got namespace {ns:?} from default partition");
            nvs
        }
        Err(e) => bail!("Could not get namespace {ns}: {e:?}"),
    };

    #[cfg(feature = "reset_settings")]
    let config = {
        let c = MyConfig::default();
        c.to_nvs(&mut nvs)?;
        c
    };

    #[cfg(not(feature = "reset_settings"))]
    let config = match MyConfig::from_nvs(&mut nvs) {
        None => {
            error!("Could not read nvs config, using defaults");
            let c = MyConfig::default();
            c.to_nvs(&mut nvs)?;
            info!("Successfully saved default config to nvs.");
            c
        }

        // using settings saved on nvs if we could find them
        Some(c) => c,
    };
    info!("My config:\n{config:#?}");

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    #[cfg(feature = "esp32c3")]
    let (led_pin, soil_pin) = (pins.gpio8, pins.gpio2);

    #[cfg(feature = "esp32s")]
    let (led_pin, soil_pin) = (pins.gpio2, pins.gpio34);

    let mut led = StatusLed::new(PinDriver::output(led_pin)?, FreeRtos, config.led_polarity());
    led.off()?;

    let adc = AdcDriver::new(peripherals.adc1)?;
    let adc_config = AdcChannelConfig {
        attenuation: DB_11,
        ..Default::default()
    };
    let mut probe = AdcProbe {
        channel: AdcChannelDriver::new(&adc, soil_pin, &adc_config)?,
    };

    let mut sink = HttpSink {
        url: config.request_url(),
    };
    let mut state = MyState::new(config);

    let mut link = WifiLink::start(peripherals.modem, sysloop, nvs_default_partition, &state.config)?;
    if let Err(e) = establish_link(&mut state, &mut link, &mut led) {
        error!("{e:#}");
        error!("Resetting...");
        FreeRtos::delay_ms(5000);
        esp_idf_hal::reset::restart();
    }
    info!("{} up at {}, reporting to {}", state.myid, state.ip_addr, sink.url);

    let half_ms = state.config.blink_half_ms;
    let period_ms = (state.config.report_delay * 1000).max(u64::from(half_ms) * 2);
    loop {
        let started = Instant::now();
        state.uptime = boot.elapsed().as_secs();
        report_once(&mut state, &mut probe, &mut sink);

        heartbeat(&mut led, half_ms);
        let spent = started.elapsed().as_millis() as u64;
        FreeRtos::delay_ms(period_ms.saturating_sub(spent).min(u64::from(u32::MAX)) as u32);
    }
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use sim::*;

    env_logger::init();
    info!("gardennode {FW_VERSION} host simulator");

    let mut args = std::env::args().skip(1);
    let reports: u64 = match args.next() {
        Some(n) => n.parse()?,
        None => 3,
    };
    let polls_until_up: u32 = match args.next() {
        Some(n) => n.parse()?,
        None => 4,
    };

    let boot = Instant::now();
    let config = MyConfig {
        report_delay: 1,
        blink_half_ms: 50,
        ..MyConfig::default()
    };
    info!("Config:\n{config:#?}");
    info!("Reports would go to {}", config.request_url());

    let mut led = StatusLed::new(SimLed, StdDelay, config.led_polarity());
    let mut net = SimWifi::new(polls_until_up, "192.168.4.20");
    let mut probe = SimProbe::new(2600);
    let mut sink = LogSink::default();
    let mut state = MyState::new(config);

    establish_link(&mut state, &mut net, &mut led)?;
    info!("{} up at {}", state.myid, state.ip_addr);

    let half_ms = state.config.blink_half_ms;
    for _ in 0..reports {
        state.uptime = boot.elapsed().as_secs();
        report_once(&mut state, &mut probe, &mut sink);
        heartbeat(&mut led, half_ms);
        std::thread::sleep(Duration::from_secs(state.config.report_delay));
    }

    for body in &sink.sent {
        println!("{body}---");
    }
    info!("Sent {} reports, {} failed.", state.reports_sent, state.reports_failed);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::convert::Infallible;

    use gardennode::*;
    use log::*;

    /// Network that comes up after a fixed number of polls.
    pub struct SimWifi {
        polls_left: u32,
        address: &'static str,
    }

    impl SimWifi {
        pub fn new(polls_until_up: u32, address: &'static str) -> Self {
            SimWifi {
                polls_left: polls_until_up,
                address,
            }
        }
    }

    impl NetworkStatus for SimWifi {
        fn is_connected(&mut self) -> bool {
            if self.polls_left == 0 {
                return true;
            }
            self.polls_left -= 1;
            false
        }

        fn local_address(&mut self) -> NetworkAddress {
            self.address.into()
        }
    }

    pub struct SimLed;

    impl embedded_hal::digital::ErrorType for SimLed {
        type Error = Infallible;
    }

    impl OutputPin for SimLed {
        fn set_low(&mut self) -> Result<(), Infallible> {
            debug!("LED pin low");
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            debug!("LED pin high");
            Ok(())
        }
    }

    pub struct StdDelay;

    impl DelayNs for StdDelay {
        fn delay_ns(&mut self, ns: u32) {
            std::thread::sleep(Duration::from_nanos(u64::from(ns)));
        }
    }

    /// Probe that dries out slowly.
    pub struct SimProbe {
        raw: u16,
    }

    impl SimProbe {
        pub fn new(raw: u16) -> Self {
            SimProbe { raw }
        }
    }

    impl Sensor for SimProbe {
        type Error = Infallible;

        fn read_raw(&mut self) -> Result<u16, Infallible> {
            self.raw = self.raw.saturating_add(3).min(4095);
            Ok(self.raw)
        }
    }
}

// EOF
