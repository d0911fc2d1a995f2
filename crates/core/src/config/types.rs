use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub reference: ReferenceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub hasher: HasherConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    9001
}

/// Reference data configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReferenceConfig {
    /// Flat `<sha1> <archive>:<file>` file.
    #[serde(default = "default_reference_path")]
    pub path: PathBuf,

    /// Label of the reference data release, reported by the API.
    /// Usually set through `ROMCHECK_REFERENCE_VERSION`.
    #[serde(default)]
    pub version: Option<String>,
}

fn default_reference_path() -> PathBuf {
    PathBuf::from("roms.txt")
}

/// Catalog persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_db")]
    pub database: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            database: default_catalog_db(),
        }
    }
}

fn default_catalog_db() -> PathBuf {
    PathBuf::from("catalog.db")
}

/// Archive scanner / catalog worker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScannerConfig {
    /// Run the background catalog worker.
    #[serde(default)]
    pub enabled: bool,

    /// Root folder holding the archives.
    #[serde(default)]
    pub rom_path: Option<PathBuf>,

    /// Archive file extensions to consider (case-insensitive).
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Minimum time between two directory walks (seconds).
    #[serde(default = "default_rescan_interval")]
    pub rescan_interval_secs: u64,

    /// How often the worker looks for the next changed archive (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            rom_path: None,
            extensions: default_extensions(),
            rescan_interval_secs: default_rescan_interval(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["7z".to_string(), "zip".to_string()]
}

fn default_rescan_interval() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    5000
}

/// External archiver configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HasherConfig {
    /// Path to the 7-Zip binary.
    #[serde(default = "default_seven_zip")]
    pub seven_zip_path: PathBuf,

    /// Scratch folder for extracted archives.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,

    /// Upper bound for a single 7-Zip invocation (seconds).
    #[serde(default = "default_hasher_timeout")]
    pub timeout_secs: u64,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            seven_zip_path: default_seven_zip(),
            temp_dir: default_temp_dir(),
            timeout_secs: default_hasher_timeout(),
        }
    }
}

fn default_seven_zip() -> PathBuf {
    PathBuf::from("7z")
}

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("romcheck")
}

fn default_hasher_timeout() -> u64 {
    600
}
