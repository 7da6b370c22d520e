// build.rs

use std::env;

fn main() -> anyhow::Result<()> {
    // Necessary because of this issue: https://github.com/rust-lang/cargo/issues/9641
    // see also https://github.com/rust-lang/cargo/issues/9554
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::build::CfgArgs::output_propagated("ESP_IDF")?;
        embuild::build::LinkArgs::output_propagated("ESP_IDF")?;
    }

    for (name, default) in [
        ("WIFI_SSID", "internet"),
        ("WIFI_PASS", "password"),
        ("SERVER_ADDR", "10.0.0.14"),
        ("SERVER_PORT", "5050"),
        ("SENSOR_ID", "d1-1"),
    ] {
        let value = env::var(name).unwrap_or_else(|_| default.into());
        println!("cargo:rustc-env={name}={value}");
        println!("cargo:rerun-if-env-changed={name}");
    }

    Ok(())
}

// EOF
