use crate::prelude::*;
use crate::influx::{Point, TimeSeriesSink};
use crate::mqtt::{BrokerSink, Message};

/// Builds outgoing records for both sinks and reports how each attempt went.
/// Logging failures and counting them is left to the caller.
pub struct Publisher<S, B> {
    influx: S,
    mqtt: Option<B>,
    namespace: String,
    retain: bool,
}

impl<S, B> Publisher<S, B>
where
    S: TimeSeriesSink + Send,
    B: BrokerSink + Send,
{
    /// `mqtt` is `None` when MQTT is disabled in the config.
    pub fn new(influx: S, mqtt: Option<B>, config: &config::Mqtt) -> Self {
        Self {
            influx,
            mqtt,
            namespace: config.namespace().to_owned(),
            retain: config.retain(),
        }
    }

    /// Writes a completed window's payload to InfluxDB.
    pub async fn store(&mut self, spec: &RegisterSpec, value: f64) -> Result<(), Error> {
        let point = Point::new(spec, value);
        info!("Sending data to InfluxDB: {}", point.to_line_protocol());

        self.influx.write(&point).await
    }

    /// Connects if needed and publishes the latest value. One outcome per
    /// call, covering both steps. `None` when MQTT is disabled.
    pub async fn push(&mut self, spec: &RegisterSpec, value: f64) -> Option<Result<(), Error>> {
        let message = Message::for_metric(&self.namespace, spec, value, self.retain);
        let mqtt = self.mqtt.as_mut()?;

        let result = match mqtt.connect().await {
            Ok(()) => {
                info!("Posting {} to MQTT topic {}", message.payload, message.topic);
                mqtt.publish(&message).await
            }
            Err(e) => Err(e),
        };

        Some(result)
    }

    /// Lets the broker client handle pending traffic, then reconnects if the
    /// session is gone. `None` when there was nothing to do.
    pub async fn maintain(&mut self) -> Option<Result<(), Error>> {
        let mqtt = self.mqtt.as_mut()?;

        mqtt.service().await;
        if mqtt.is_connected() {
            return None;
        }

        info!("MQTT disconnected. Attempting to reconnect...");
        let result = mqtt.connect().await;
        if result.is_ok() {
            info!("MQTT Connected.");
        }
        Some(result)
    }

    pub fn mqtt_mut(&mut self) -> Option<&mut B> {
        self.mqtt.as_mut()
    }
}
