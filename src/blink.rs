// blink.rs

use embedded_hal::{delay::DelayNs, digital::OutputPin};

/// Which electrical level lights the indicator.
///
/// Onboard LEDs on most ESP boards are wired to Vcc and light up when the pin
/// is pulled low, hence `ActiveLow`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Polarity {
    #[default]
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    pub fn from_active_low(active_low: bool) -> Self {
        if active_low {
            Polarity::ActiveLow
        } else {
            Polarity::ActiveHigh
        }
    }
}

/// One full on/off cycle: active for `half_ms`, inactive for `half_ms`.
///
/// Blocks the caller for `2 * half_ms` milliseconds. With `half_ms == 0` both
/// transitions happen back to back.
pub fn blink_led<P, D>(pin: &mut P, delay: &mut D, half_ms: u32, polarity: Polarity) -> Result<(), P::Error>
where
    P: OutputPin,
    D: DelayNs,
{
    match polarity {
        Polarity::ActiveHigh => pin.set_high()?,
        Polarity::ActiveLow => pin.set_low()?,
    }
    delay.delay_ms(half_ms);

    match polarity {
        Polarity::ActiveHigh => pin.set_low()?,
        Polarity::ActiveLow => pin.set_high()?,
    }
    delay.delay_ms(half_ms);

    Ok(())
}

/// Status LED bundled with its delay source and polarity, so it can be handed
/// around as a single retry hook.
pub struct StatusLed<P, D> {
    pin: P,
    delay: D,
    polarity: Polarity,
}

impl<P, D> StatusLed<P, D>
where
    P: OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D, polarity: Polarity) -> Self {
        StatusLed { pin, delay, polarity }
    }

    pub fn blink(&mut self, half_ms: u32) -> Result<(), P::Error> {
        blink_led(&mut self.pin, &mut self.delay, half_ms, self.polarity)
    }

    /// Drive the LED to its inactive level without waiting.
    pub fn off(&mut self) -> Result<(), P::Error> {
        match self.polarity {
            Polarity::ActiveHigh => self.pin.set_low(),
            Polarity::ActiveLow => self.pin.set_high(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use std::{cell::RefCell, rc::Rc};

    #[derive(Debug, PartialEq, Eq)]
    enum Ev {
        High,
        Low,
        Wait(u32),
    }

    type Log = Rc<RefCell<Vec<Ev>>>;

    struct Pin(Log);
    struct Delay(Log);

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().push(Ev::Low);
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Infallible> {
            self.0.borrow_mut().push(Ev::High);
            Ok(())
        }
    }

    impl DelayNs for Delay {
        fn delay_ns(&mut self, ns: u32) {
            if ns > 0 {
                self.0.borrow_mut().push(Ev::Wait(ns / 1_000_000));
            }
        }
        fn delay_ms(&mut self, ms: u32) {
            if ms > 0 {
                self.0.borrow_mut().push(Ev::Wait(ms));
            }
        }
    }

    fn rig() -> (Log, Pin, Delay) {
        let log: Log = Rc::default();
        (log.clone(), Pin(log.clone()), Delay(log))
    }

    #[test]
    fn active_high_goes_high_then_low() {
        let (log, mut pin, mut delay) = rig();
        blink_led(&mut pin, &mut delay, 250, Polarity::ActiveHigh).unwrap();
        assert_eq!(*log.borrow(), vec![Ev::High, Ev::Wait(250), Ev::Low, Ev::Wait(250)]);
    }

    #[test]
    fn active_low_goes_low_then_high() {
        let (log, mut pin, mut delay) = rig();
        blink_led(&mut pin, &mut delay, 100, Polarity::ActiveLow).unwrap();
        assert_eq!(*log.borrow(), vec![Ev::Low, Ev::Wait(100), Ev::High, Ev::Wait(100)]);
    }

    #[test]
    fn zero_half_cycle_flips_without_waiting() {
        let (log, mut pin, mut delay) = rig();
        blink_led(&mut pin, &mut delay, 0, Polarity::ActiveHigh).unwrap();
        assert_eq!(*log.borrow(), vec![Ev::High, Ev::Low]);
    }

    #[test]
    fn status_led_repeats_one_cycle_per_call() {
        let (log, pin, delay) = rig();
        let mut led = StatusLed::new(pin, delay, Polarity::from_active_low(true));
        led.blink(10).unwrap();
        led.blink(10).unwrap();
        led.off().unwrap();
        assert_eq!(
            *log.borrow(),
            vec![
                Ev::Low,
                Ev::Wait(10),
                Ev::High,
                Ev::Wait(10),
                Ev::Low,
                Ev::Wait(10),
                Ev::High,
                Ev::Wait(10),
                Ev::High,
            ]
        );
    }
}

// EOF
