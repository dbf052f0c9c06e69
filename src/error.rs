/// Recoverable failures raised by the poll cycle.
///
/// None of these stop the process on their own; each one is logged where it
/// happens and counted once by the `watchdog::FailureCounter`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The MODBUS block read failed, timed out or came back short.
    #[error("MODBUS read failed: {0}")]
    Bus(String),

    /// The time-series database rejected a write.
    #[error("InfluxDB write failed: {0}")]
    Publish(String),

    /// The MQTT broker refused the connection or the publish.
    #[error("MQTT failed: {0}")]
    Broker(String),

    /// The network link is down.
    #[error("network link down: {0}")]
    Connectivity(String),
}

impl Error {
    pub fn subsystem(&self) -> &'static str {
        match self {
            Self::Bus(_) => "modbus",
            Self::Publish(_) => "influx",
            Self::Broker(_) => "mqtt",
            Self::Connectivity(_) => "network",
        }
    }
}
