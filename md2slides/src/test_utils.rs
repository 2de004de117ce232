//! Test utilities for handler and converter tests.

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum_test::TestServer;

use crate::config::{
    Config, ConversionLimitsConfig, ConverterConfig, CredentialsConfig, LimitsConfig, UploadsConfig,
};

/// Configuration that keeps every file the service touches inside `dir` and runs `program`
/// as the converter.
pub fn create_test_config(dir: &Path, program: &Path) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        converter: ConverterConfig {
            program: program.to_string_lossy().into_owned(),
            working_dir: dir.to_path_buf(),
            timeout: Duration::from_secs(10),
        },
        uploads: UploadsConfig {
            dir: dir.join("uploads"),
            text_dir: dir.join("text"),
            ..Default::default()
        },
        credentials: CredentialsConfig {
            application_credentials: None,
            credentials_json: None,
            json_path: dir.join("google_credentials.json"),
        },
        static_dir: None,
        limits: LimitsConfig {
            conversions: ConversionLimitsConfig {
                max_concurrent: 4,
                max_waiting: 20,
                max_wait: Duration::from_secs(10),
            },
        },
        enable_otel_export: false,
    }
}

pub async fn create_test_app(config: Config) -> TestServer {
    let app = crate::Application::new(config).await.expect("Failed to create application");
    app.into_test_server()
}

/// Write an executable shell script standing in for the converter and return its path.
#[cfg(unix)]
pub fn write_fake_converter(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(format!("fake-converter-{}", uuid::Uuid::new_v4().simple()));
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).expect("Failed to write fake converter");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("Failed to make fake converter executable");
    path
}

/// Regular files currently in `dir` (empty if the directory does not exist).
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Install the rustls crypto provider used by reqwest clients. Safe to call more than once.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}
