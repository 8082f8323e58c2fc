//! Build script for unobus-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates intercom.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use unobus_core::ConfigValues;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Top level of intercom.toml
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Document {
    intercom: ConfigValues,
}

/// Validate intercom.toml with the same rules the firmware applies at boot
fn validate_config() {
    println!("cargo:rerun-if-changed=intercom.toml");

    let config_path = Path::new("intercom.toml");
    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: intercom.toml not found!                                 ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires an intercom.toml configuration file       ║\n\
            ║  in the unobus-firmware directory.                               ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read intercom.toml", &e.to_string()),
    };

    let document: Document = match toml::from_str(&content) {
        Ok(document) => document,
        Err(e) => fail("Invalid intercom.toml", &e.to_string()),
    };

    // The firmware parses with its own reader; both must agree
    let embedded = match unobus_core::config::parse_values(&content) {
        Ok(values) => values,
        Err(e) => fail("intercom.toml uses unsupported syntax", &format!("{:?}", e)),
    };
    if embedded != document.intercom {
        fail(
            "intercom.toml is read differently on the device",
            "use plain integer values inside a single [intercom] section",
        );
    }

    match document.intercom.validate() {
        Ok(config) => println!(
            "cargo:warning=intercom.toml validated: intercom {:#04x}, command target {:#04x}",
            config.identity().intercom_id(),
            config.identity().command_target()
        ),
        Err(e) => fail("Invalid intercom configuration", &format!("{:?}", e)),
    }
}

fn fail(title: &str, detail: &str) -> ! {
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title,
        format_error_lines(detail)
    );
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
