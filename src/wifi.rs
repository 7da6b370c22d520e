// wifi.rs

use std::net::Ipv4Addr;

use log::*;

use crate::*;

/// Address assigned to the node by the network. Empty until connected.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct NetworkAddress(String);

impl NetworkAddress {
    pub fn unset() -> Self {
        NetworkAddress(String::new())
    }

    pub fn is_set(&self) -> bool {
        !self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NetworkAddress {
    fn from(s: String) -> Self {
        NetworkAddress(s)
    }
}

impl From<&str> for NetworkAddress {
    fn from(s: &str) -> Self {
        NetworkAddress(s.to_string())
    }
}

impl From<Ipv4Addr> for NetworkAddress {
    fn from(ip: Ipv4Addr) -> Self {
        if ip.is_unspecified() {
            NetworkAddress::unset()
        } else {
            NetworkAddress(ip.to_string())
        }
    }
}

impl fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the connection wait needs from the network stack.
pub trait NetworkStatus {
    fn is_connected(&mut self) -> bool;

    /// Only meaningful while `is_connected()` holds.
    fn local_address(&mut self) -> NetworkAddress;
}

/// Upper bound on connection polls. Production firmware runs unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PollLimit {
    #[default]
    Unbounded,
    Bounded(u32),
}

impl PollLimit {
    fn allows(&self, polls: u32) -> bool {
        match self {
            PollLimit::Unbounded => true,
            PollLimit::Bounded(max) => polls < *max,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Connected(NetworkAddress),
    Waiting,
}

/// Connection wait as an explicit state, advanced one poll at a time.
#[derive(Debug, Default)]
pub struct ConnectPoller {
    polls: u32,
    address: NetworkAddress,
}

impl ConnectPoller {
    pub fn new() -> Self {
        Self::default()
    }

    /// Query the network once. On failure `on_retry` runs before returning,
    /// so the hook always sits between two consecutive polls.
    ///
    /// Once an address has been captured it is kept and returned again
    /// without touching the network.
    pub fn poll<N, F>(&mut self, net: &mut N, on_retry: &mut F) -> PollOutcome
    where
        N: NetworkStatus + ?Sized,
        F: FnMut(),
    {
        if self.address.is_set() {
            return PollOutcome::Connected(self.address.clone());
        }

        self.polls = self.polls.saturating_add(1);
        if net.is_connected() {
            let address = net.local_address();
            if address.is_set() {
                info!("WiFi connected, address {address}");
                self.address = address.clone();
                return PollOutcome::Connected(address);
            }
            warn!("WiFi reports connected but has no address yet");
        }

        on_retry();
        info!("WiFi not connected (poll #{})", self.polls);
        PollOutcome::Waiting
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    pub fn address(&self) -> Option<&NetworkAddress> {
        self.address.is_set().then_some(&self.address)
    }
}

/// Block until the network reports a connection with a non-empty address.
///
/// There is no timeout: if the network never comes up this never returns,
/// and `on_retry` keeps being called once per failed poll.
pub fn wait_for_connection<N, F>(net: &mut N, mut on_retry: F) -> NetworkAddress
where
    N: NetworkStatus + ?Sized,
    F: FnMut(),
{
    info!("WiFi waiting for association...");
    let mut poller = ConnectPoller::new();
    loop {
        if let PollOutcome::Connected(address) = poller.poll(net, &mut on_retry) {
            return address;
        }
    }
}

/// Like [`wait_for_connection`] but gives up after `limit` polls.
/// `PollLimit::Unbounded` behaves exactly like the unbounded wait.
pub fn wait_for_connection_limited<N, F>(net: &mut N, mut on_retry: F, limit: PollLimit) -> Option<NetworkAddress>
where
    N: NetworkStatus + ?Sized,
    F: FnMut(),
{
    info!("WiFi waiting for association ({limit:?})...");
    let mut poller = ConnectPoller::new();
    while limit.allows(poller.polls()) {
        if let PollOutcome::Connected(address) = poller.poll(net, &mut on_retry) {
            return Some(address);
        }
    }
    error!("WiFi gave up after {} polls", poller.polls());
    None
}

#[cfg(target_os = "espidf")]
pub use esp::*;

#[cfg(target_os = "espidf")]
mod esp {
    use anyhow::anyhow;
    use embedded_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};
    use esp_idf_hal::modem::Modem;
    use esp_idf_svc::{
        eventloop::EspSystemEventLoop,
        nvs::EspDefaultNvsPartition,
        wifi::{BlockingWifi, EspWifi},
    };
    use log::*;

    use crate::*;

    // The driver does not retry a failed association on its own.
    const RECONNECT_EVERY: u32 = 20;

    pub struct WifiLink<'a> {
        pub wifi: BlockingWifi<EspWifi<'a>>,
        down_polls: u32,
    }

    impl<'a> WifiLink<'a> {
        pub fn start(
            modem: Modem,
            sysloop: EspSystemEventLoop,
            nvs: EspDefaultNvsPartition,
            config: &MyConfig,
        ) -> anyhow::Result<Self> {
            info!("Initializing Wi-Fi...");
            let espwifi = EspWifi::new(modem, sysloop.clone(), Some(nvs))?;
            let mut wifi = BlockingWifi::wrap(espwifi, sysloop)?;

            info!("WiFi setting credentials...");
            wifi.set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: config
                    .wifi_ssid
                    .as_str()
                    .try_into()
                    .map_err(|_| anyhow!("SSID too long: {}", config.wifi_ssid))?,
                password: config
                    .wifi_pass
                    .as_str()
                    .try_into()
                    .map_err(|_| anyhow!("WiFi password too long"))?,
                auth_method: if config.wifi_pass.is_empty() {
                    AuthMethod::None
                } else {
                    AuthMethod::WPA2Personal
                },
                ..Default::default()
            }))?;

            info!("WiFi driver starting...");
            wifi.start()?;

            info!("Connecting to {} ...", config.wifi_ssid);
            wifi.wifi_mut().connect()?;

            Ok(WifiLink { wifi, down_polls: 0 })
        }
    }

    impl NetworkStatus for WifiLink<'_> {
        fn is_connected(&mut self) -> bool {
            if self.wifi.is_up().unwrap_or(false) {
                self.down_polls = 0;
                return true;
            }

            self.down_polls += 1;
            if self.down_polls % RECONNECT_EVERY == 0 && !self.wifi.is_connected().unwrap_or(false) {
                debug!("WiFi re-issuing connect");
                if let Err(e) = self.wifi.wifi_mut().connect() {
                    error!("WiFi connect error: {e:?}");
                }
            }
            false
        }

        fn local_address(&mut self) -> NetworkAddress {
            match self.wifi.wifi().sta_netif().get_ip_info() {
                Ok(ip_info) => ip_info.ip.into(),
                Err(e) => {
                    error!("Cannot read IP info: {e:?}");
                    NetworkAddress::unset()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::RefCell, collections::VecDeque, rc::Rc};

    #[derive(Debug, PartialEq, Eq)]
    enum Ev {
        Poll,
        Retry,
    }

    /// Reports the scripted states in order, then stays on the last one.
    struct Scripted {
        states: VecDeque<Option<&'static str>>,
        current: Option<&'static str>,
        log: Rc<RefCell<Vec<Ev>>>,
    }

    impl Scripted {
        fn new(states: &[Option<&'static str>], log: Rc<RefCell<Vec<Ev>>>) -> Self {
            Scripted {
                states: states.iter().copied().collect(),
                current: None,
                log,
            }
        }
    }

    impl NetworkStatus for Scripted {
        fn is_connected(&mut self) -> bool {
            self.log.borrow_mut().push(Ev::Poll);
            if let Some(next) = self.states.pop_front() {
                self.current = next;
            }
            self.current.is_some()
        }

        fn local_address(&mut self) -> NetworkAddress {
            self.current.unwrap_or_default().into()
        }
    }

    #[test]
    fn returns_address_after_failed_polls() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut net = Scripted::new(&[None, None, None, Some("10.0.0.42")], log.clone());
        let hook_log = log.clone();

        let address = wait_for_connection(&mut net, || hook_log.borrow_mut().push(Ev::Retry));

        assert_eq!(address.as_str(), "10.0.0.42");
        assert_eq!(
            *log.borrow(),
            vec![Ev::Poll, Ev::Retry, Ev::Poll, Ev::Retry, Ev::Poll, Ev::Retry, Ev::Poll]
        );
    }

    #[test]
    fn connected_on_first_poll_never_retries() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut net = Scripted::new(&[Some("192.168.1.7")], log.clone());
        let mut retries = 0;

        let address = wait_for_connection(&mut net, || retries += 1);

        assert_eq!(address, NetworkAddress::from("192.168.1.7"));
        assert_eq!(retries, 0);
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn never_connected_exhausts_bound() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut net = Scripted::new(&[None], log.clone());
        let mut retries = 0;

        let address = wait_for_connection_limited(&mut net, || retries += 1, PollLimit::Bounded(50));

        assert_eq!(address, None);
        assert_eq!(retries, 50);
        assert_eq!(log.borrow().iter().filter(|e| **e == Ev::Poll).count(), 50);
    }

    #[test]
    fn empty_address_counts_as_failed_poll() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut net = Scripted::new(&[Some(""), Some("10.1.1.1")], log.clone());
        let mut retries = 0;

        let address = wait_for_connection_limited(&mut net, || retries += 1, PollLimit::Bounded(10));

        assert_eq!(address, Some(NetworkAddress::from("10.1.1.1")));
        assert_eq!(retries, 1);
    }

    #[test]
    fn poller_keeps_first_address() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut net = Scripted::new(&[None, Some("10.0.0.2"), Some("10.0.0.3")], log.clone());
        let mut poller = ConnectPoller::new();
        let mut hook = || {};

        assert_eq!(poller.poll(&mut net, &mut hook), PollOutcome::Waiting);
        assert_eq!(poller.address(), None);
        assert_eq!(poller.poll(&mut net, &mut hook), PollOutcome::Connected("10.0.0.2".into()));
        assert_eq!(poller.poll(&mut net, &mut hook), PollOutcome::Connected("10.0.0.2".into()));
        assert_eq!(poller.polls(), 2);
        assert_eq!(log.borrow().len(), 2);
    }

    #[test]
    fn unspecified_ip_is_unset() {
        assert!(!NetworkAddress::from(Ipv4Addr::UNSPECIFIED).is_set());
        assert_eq!(NetworkAddress::from(Ipv4Addr::new(10, 0, 0, 14)).to_string(), "10.0.0.14");
    }
}

// EOF
