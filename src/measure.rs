// measure.rs

use serde::{Deserialize, Serialize};

// Capacitive probe readings on a 12-bit ADC, measured in air and in water.
pub const DEFAULT_DRY_RAW: u16 = 3300;
pub const DEFAULT_WET_RAW: u16 = 1400;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    pub dry_raw: u16,
    pub wet_raw: u16,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            dry_raw: DEFAULT_DRY_RAW,
            wet_raw: DEFAULT_WET_RAW,
        }
    }
}

impl Calibration {
    /// Map a raw value to 0..=100 %, clamping outside the calibrated span.
    /// Works for probes that read higher when dry as well as lower.
    pub fn moisture_percent(&self, raw: u16) -> u8 {
        let (dry, wet, raw) = (i32::from(self.dry_raw), i32::from(self.wet_raw), i32::from(raw));
        if dry == wet {
            return 0;
        }
        let pct = (raw - dry) * 100 / (wet - dry);
        pct.clamp(0, 100) as u8
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SoilReading {
    pub raw: u16,
    pub moisture: u8,
}

impl SoilReading {
    pub fn new(raw: u16, cal: &Calibration) -> Self {
        SoilReading {
            raw,
            moisture: cal.moisture_percent(raw),
        }
    }
}

#[derive(Debug)]
pub enum MeasurementError<E> {
    Adc(E),
    NoReading,
}

/// Source of raw soil moisture values.
pub trait Sensor {
    type Error;

    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// Average `samples` raw reads, skipping failed ones.
pub fn measure_soil<S: Sensor>(
    sensor: &mut S,
    cal: &Calibration,
    samples: usize,
) -> Result<SoilReading, MeasurementError<S::Error>> {
    let mut sum: u32 = 0;
    let mut n: u32 = 0;
    let mut last_err = None;

    for _ in 0..samples {
        match sensor.read_raw() {
            Ok(v) => {
                sum += u32::from(v);
                n += 1;
            }
            Err(e) => last_err = Some(e),
        }
    }

    if n == 0 {
        return Err(match last_err {
            Some(e) => MeasurementError::Adc(e),
            None => MeasurementError::NoReading,
        });
    }
    Ok(SoilReading::new((sum / n) as u16, cal))
}

#[cfg(target_os = "espidf")]
pub use esp::*;

#[cfg(target_os = "espidf")]
mod esp {
    use std::borrow::Borrow;

    use esp_idf_hal::{
        adc::oneshot::{AdcChannelDriver, AdcDriver},
        gpio::ADCPin,
        sys::EspError,
    };

    use super::Sensor;

    pub struct AdcProbe<'d, T, M>
    where
        T: ADCPin,
        M: Borrow<AdcDriver<'d, T::Adc>>,
    {
        pub channel: AdcChannelDriver<'d, T, M>,
    }

    impl<'d, T, M> Sensor for AdcProbe<'d, T, M>
    where
        T: ADCPin,
        M: Borrow<AdcDriver<'d, T::Adc>>,
    {
        type Error = EspError;

        fn read_raw(&mut self) -> Result<u16, EspError> {
            self.channel.read_raw()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<Result<u16, &'static str>>);

    impl Sensor for Fixed {
        type Error = &'static str;

        fn read_raw(&mut self) -> Result<u16, Self::Error> {
            if self.0.is_empty() {
                Err("empty")
            } else {
                self.0.remove(0)
            }
        }
    }

    #[test]
    fn moisture_is_clamped() {
        let cal = Calibration::default();
        assert_eq!(cal.moisture_percent(DEFAULT_DRY_RAW), 0);
        assert_eq!(cal.moisture_percent(DEFAULT_WET_RAW), 100);
        assert_eq!(cal.moisture_percent(4095), 0);
        assert_eq!(cal.moisture_percent(0), 100);
        assert_eq!(cal.moisture_percent(2350), 50);
    }

    #[test]
    fn inverted_probe_maps_too() {
        let cal = Calibration { dry_raw: 100, wet_raw: 900 };
        assert_eq!(cal.moisture_percent(500), 50);
        assert_eq!(Calibration { dry_raw: 7, wet_raw: 7 }.moisture_percent(7), 0);
    }

    #[test]
    fn averages_good_samples() {
        let mut s = Fixed(vec![Ok(2000), Err("glitch"), Ok(2200)]);
        let r = measure_soil(&mut s, &Calibration::default(), 3).unwrap();
        assert_eq!(r.raw, 2100);
        assert_eq!(r.moisture, 63);
    }

    #[test]
    fn all_failed_reports_error() {
        let mut s = Fixed(vec![]);
        assert!(matches!(
            measure_soil(&mut s, &Calibration::default(), 2),
            Err(MeasurementError::Adc("empty"))
        ));
        assert!(matches!(
            measure_soil(&mut s, &Calibration::default(), 0),
            Err(MeasurementError::NoReading)
        ));
    }
}

// EOF
