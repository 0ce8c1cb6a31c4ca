use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tylo_core::{CodeRegistry, Decoder};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub bus: BusConfig,
    pub sink: SinkConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize)]
pub struct MonitorConfig {
    /// Prefix for every published topic, e.g. `sauna/temp_set`
    pub namespace: String,
    /// Also publish packets without a decoding rule under `<namespace>/raw`
    #[serde(default)]
    pub publish_unknown: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BusConfig {
    /// Serial device node (configured for 19200 8E1 beforehand) or a capture file
    Device { path: PathBuf },
    /// Serial-to-TCP bridge
    Tcp {
        addr: SocketAddr,
        /// Upper bound in seconds for the reconnect backoff
        #[serde(default = "default_reconnect_max_secs")]
        reconnect_max_secs: u64,
    },
}

fn default_reconnect_max_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Log,
    Stdout,
    Http {
        url: String,
        /// Bearer token sent with every request
        token: Option<String>,
        #[serde(default = "default_http_timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_http_timeout_secs() -> u64 {
    5
}

#[derive(Debug, Default, Deserialize)]
pub struct DecoderConfig {
    /// Decode the acknowledge codes that are not verified against traffic
    #[serde(default)]
    pub experimental_codes: bool,
}

impl DecoderConfig {
    /// Build the decoder this configuration asks for.
    pub fn decoder(&self) -> Decoder {
        if self.experimental_codes {
            Decoder::new(CodeRegistry::experimental())
        } else {
            Decoder::default()
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// Address for the HTTP server to listen on
    pub http_addr: SocketAddr,
}

impl Config {
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            monitor: MonitorConfig {
                namespace: "sauna".to_string(),
                publish_unknown: false,
            },
            bus: BusConfig::Device {
                path: PathBuf::from("/dev/ttyUSB0"),
            },
            sink: SinkConfig::Log,
            decoder: DecoderConfig::default(),
            server: ServerConfig {
                http_addr: "0.0.0.0:8082".parse().unwrap(),
            },
        }
    }
}
