// 🔧 Configuration - Injected endpoints and paths
//
// Every external target the binaries touch comes from here; nothing is
// hardcoded at the call sites.

use std::env;
use std::path::PathBuf;

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file for saved records
    pub database_path: PathBuf,

    /// Directory holding city.json / township.json (CLI mode)
    pub reference_dir: PathBuf,

    /// Base URL serving city.json / township.json (server mode)
    pub reference_base_url: String,

    /// Listen address for the web server
    pub bind_addr: String,
}

impl Config {
    /// Build from environment variables, falling back to local defaults:
    ///
    /// - `LOCATION_DB`            (default `locations.db`)
    /// - `LOCATION_REFERENCE_DIR` (default `data`)
    /// - `LOCATION_REFERENCE_URL` (default `http://localhost:3000/reference`)
    /// - `LOCATION_BIND_ADDR`     (default `0.0.0.0:3000`)
    pub fn from_env() -> Self {
        Config {
            database_path: env::var("LOCATION_DB")
                .unwrap_or_else(|_| "locations.db".to_string())
                .into(),
            reference_dir: env::var("LOCATION_REFERENCE_DIR")
                .unwrap_or_else(|_| "data".to_string())
                .into(),
            reference_base_url: env::var("LOCATION_REFERENCE_URL")
                .unwrap_or_else(|_| "http://localhost:3000/reference".to_string()),
            bind_addr: env::var("LOCATION_BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        }
    }
}
