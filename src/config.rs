use crate::prelude::*;

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    pub inverter: Inverter,
    pub mqtt: Mqtt,
    pub influx: Influx,

    #[serde(default)]
    pub network: Network,

    #[serde(default)]
    pub poll: Poll,

    #[serde(default = "Config::default_loglevel")]
    pub loglevel: String,
}

// Inverter {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Inverter {
    /// Serial device the RS-485 adapter shows up as, eg /dev/ttyUSB0
    pub port: String,
    #[serde(default = "Config::default_baud_rate")]
    pub baud_rate: u32,
    #[serde(default = "Config::default_slave_id")]
    pub slave_id: u8,
    pub read_timeout_ms: Option<u64>,
}
impl Inverter {
    pub fn port(&self) -> &str {
        &self.port
    }

    pub fn baud_rate(&self) -> u32 {
        self.baud_rate
    }

    pub fn slave_id(&self) -> u8 {
        self.slave_id
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms.unwrap_or(1000))
    }
} // }}}

// Mqtt {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Mqtt {
    #[serde(default = "Config::default_enabled")]
    pub enabled: bool,

    #[serde(default)]
    pub host: String,
    #[serde(default = "Config::default_mqtt_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,

    #[serde(default = "Config::default_mqtt_client_id")]
    pub client_id: String,

    #[serde(default = "Config::default_mqtt_namespace")]
    pub namespace: String,

    pub retain: Option<bool>,
    pub timeout_ms: Option<u64>,
}
impl Mqtt {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn username(&self) -> &Option<String> {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn retain(&self) -> bool {
        self.retain != Some(false)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(3000))
    }
} // }}}

// Influx {{{
#[derive(Clone, Debug, Deserialize)]
pub struct Influx {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,

    pub database: String,
}
impl Influx {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn username(&self) -> &Option<String> {
        &self.username
    }

    pub fn password(&self) -> &Option<String> {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }
} // }}}

// Network {{{
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Network {
    /// Interface to watch, eg wlan0. Without one the link is assumed up.
    pub interface: Option<String>,
    pub connect_timeout_ms: Option<u64>,
    pub reconnect_delay_ms: Option<u64>,
}
impl Network {
    pub fn interface(&self) -> Option<&str> {
        self.interface.as_deref()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.unwrap_or(5000))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms.unwrap_or(1000))
    }
} // }}}

// Poll {{{
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Poll {
    pub interval_ms: Option<u32>,
    pub tick_ms: Option<u64>,
}
impl Poll {
    pub fn interval_ms(&self) -> u32 {
        self.interval_ms.unwrap_or(2000)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.unwrap_or(50))
    }
} // }}}

#[derive(Clone, Debug)]
pub struct ConfigWrapper {
    config: Arc<Config>,
}

impl ConfigWrapper {
    pub fn new(file: String) -> Result<Self> {
        Ok(Self::from_config(Config::new(file)?))
    }

    pub fn from_config(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn inverter(&self) -> &Inverter {
        &self.config.inverter
    }

    pub fn mqtt(&self) -> &Mqtt {
        &self.config.mqtt
    }

    pub fn influx(&self) -> &Influx {
        &self.config.influx
    }

    pub fn network(&self) -> &Network {
        &self.config.network
    }

    pub fn poll(&self) -> &Poll {
        &self.config.poll
    }

    pub fn loglevel(&self) -> &str {
        &self.config.loglevel
    }
}

impl Config {
    pub fn new(file: String) -> Result<Self> {
        let content = std::fs::read_to_string(&file)
            .map_err(|err| anyhow!("error reading {}: {}", file, err))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    // the logger isn't up until the loglevel has been read, so this is
    // called separately once it is.
    pub fn log_summary(&self) {
        info!("Configuration loaded successfully:");
        info!("  Inverter:");
        info!("    Port: {}", self.inverter.port);
        info!("    Baud Rate: {}", self.inverter.baud_rate);
        info!("    Slave ID: {}", self.inverter.slave_id);
        info!("    Read Timeout: {}ms", self.inverter.read_timeout().as_millis());

        info!("  MQTT: {}", if self.mqtt.enabled { "enabled" } else { "disabled" });
        if self.mqtt.enabled {
            info!("    Host: {}", self.mqtt.host);
            info!("    Port: {}", self.mqtt.port);
            info!("    Client ID: {}", self.mqtt.client_id);
            info!("    Namespace: {}", self.mqtt.namespace);
            info!("    Retain: {}", self.mqtt.retain());
        }

        info!("  InfluxDB:");
        info!("    URL: {}", self.influx.url);
        info!("    Database: {}", self.influx.database);

        info!("  Network:");
        info!("    Interface: {}", self.network.interface().unwrap_or("(not watched)"));

        info!("  Poll Interval: {}ms", self.poll.interval_ms());
        info!("  Log Level: {}", self.loglevel);
    }

    fn validate(&self) -> Result<()> {
        if self.inverter.port.is_empty() {
            bail!("inverter.port cannot be empty");
        }
        if self.inverter.baud_rate == 0 {
            bail!("inverter.baud_rate must be greater than 0");
        }

        if self.mqtt.enabled {
            if self.mqtt.port == 0 {
                bail!("mqtt.port must be between 1 and 65535");
            }
            if self.mqtt.host.is_empty() {
                bail!("mqtt.host cannot be empty");
            }
        }

        if let Err(e) = url::Url::parse(&self.influx.url) {
            bail!("invalid influx.url: {}", e);
        }
        if self.influx.database.is_empty() {
            bail!("influx.database cannot be empty");
        }

        if self.poll.interval_ms() == 0 {
            bail!("poll.interval_ms must be greater than 0");
        }
        if self.poll.tick().is_zero() {
            bail!("poll.tick_ms must be greater than 0");
        }

        Ok(())
    }

    fn default_baud_rate() -> u32 {
        9600
    }

    fn default_slave_id() -> u8 {
        1
    }

    fn default_mqtt_port() -> u16 {
        1883
    }

    fn default_mqtt_client_id() -> String {
        "Sungrow-SG8K-D".to_string()
    }

    fn default_mqtt_namespace() -> String {
        "home/solar/sungrow".to_string()
    }

    fn default_enabled() -> bool {
        true
    }

    fn default_loglevel() -> String {
        "info".to_string()
    }
}
