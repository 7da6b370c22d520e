// node.rs

use std::fmt::Debug;

use log::*;

use crate::*;

/// Raw ADC samples averaged into one reading.
pub const SOIL_SAMPLES: usize = 8;

/// One status blink. A pin fault is logged and swallowed so it cannot stop
/// the caller's loop. Returns whether the blink went through.
pub fn heartbeat<P, D>(led: &mut StatusLed<P, D>, half_ms: u32) -> bool
where
    P: OutputPin,
    P::Error: Debug,
    D: DelayNs,
{
    match led.blink(half_ms) {
        Ok(()) => true,
        Err(e) => {
            error!("Status LED error: {e:?}");
            false
        }
    }
}

/// Wait for the network with the status LED blinking once per failed poll,
/// then store the assigned address in `state`.
///
/// With the default unbounded limit this only returns once connected.
pub fn establish_link<N, P, D>(state: &mut MyState, net: &mut N, led: &mut StatusLed<P, D>) -> anyhow::Result<()>
where
    N: NetworkStatus + ?Sized,
    P: OutputPin,
    P::Error: Debug,
    D: DelayNs,
{
    let half_ms = state.config.blink_half_ms;
    let limit = state.config.connect_limit();

    let address = wait_for_connection_limited(
        net,
        || {
            heartbeat(led, half_ms);
        },
        limit,
    );

    match address {
        Some(address) => {
            state.ip_addr = address;
            if let Err(e) = led.off() {
                error!("Status LED error: {e:?}");
            }
            Ok(())
        }
        None => bail!("WiFi not connected, poll limit {limit:?} reached"),
    }
}

/// Take one reading and push its report to `sink`. Returns whether the
/// report went out.
pub fn report_once<S, K>(state: &mut MyState, sensor: &mut S, sink: &mut K) -> bool
where
    S: Sensor,
    S::Error: Debug,
    K: ReportSink + ?Sized,
{
    let reading = match measure_soil(sensor, &state.config.calibration, SOIL_SAMPLES) {
        Ok(r) => r,
        Err(e) => {
            error!("Soil measurement failed: {e:?}");
            return false;
        }
    };
    debug!("Soil reading {reading:?}");

    let report = build_report(state, &reading);
    send_report(state, sink, &report)
}

// EOF
