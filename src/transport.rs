// transport.rs

use log::*;

use crate::*;

/// Something that accepts a finished report body.
///
/// One call is one attempt. Delivery is not retried here.
pub trait ReportSink {
    fn send(&mut self, body: &str) -> anyhow::Result<()>;
}

/// Sink that only logs the body.
#[derive(Debug, Default)]
pub struct LogSink {
    pub sent: Vec<String>,
}

impl ReportSink for LogSink {
    fn send(&mut self, body: &str) -> anyhow::Result<()> {
        info!("Report:\n{body}");
        self.sent.push(body.to_string());
        Ok(())
    }
}

/// Hand the report to `sink` and count the result. Errors are logged, not
/// returned, so the reporting loop keeps going.
pub fn send_report<S: ReportSink + ?Sized>(state: &mut MyState, sink: &mut S, report: &Report) -> bool {
    match sink.send(report.as_str()) {
        Ok(()) => {
            state.reports_sent += 1;
            info!("Report #{} sent.", state.reports_sent);
            true
        }
        Err(e) => {
            state.reports_failed += 1;
            error!("Report send failed: {e:?}");
            false
        }
    }
}

#[cfg(target_os = "espidf")]
pub use esp::*;

#[cfg(target_os = "espidf")]
mod esp {
    use anyhow::bail;
    use embedded_svc::{http::client::Client as HttpClient, io::Write};
    use esp_idf_svc::http::client::{Configuration as HttpConfiguration, EspHttpConnection};
    use log::*;

    use super::ReportSink;

    /// POSTs each report as `text/plain` to a fixed URL.
    pub struct HttpSink {
        pub url: String,
    }

    impl ReportSink for HttpSink {
        fn send(&mut self, body: &str) -> anyhow::Result<()> {
            let conn = EspHttpConnection::new(&HttpConfiguration::default())?;
            let mut client = HttpClient::wrap(conn);

            let len = body.len().to_string();
            let headers = [("content-type", "text/plain"), ("content-length", len.as_str())];

            info!("POST {} ({len} bytes)", self.url);
            let mut request = client.post(&self.url, &headers)?;
            request.write_all(body.as_bytes())?;
            request.flush()?;
            let response = request.submit()?;

            let status = response.status();
            if !(200..300).contains(&status) {
                bail!("Collector replied with HTTP {status}");
            }
            Ok(())
        }
    }
}


// EOF
