use crate::prelude::*;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, MqttOptions, Outgoing, QoS};
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};

// Message {{{
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Message {
    pub topic: String,
    pub retain: bool,
    pub payload: String,
}

impl Message {
    /// `<namespace>/<metric name>` carrying the value with two decimals.
    pub fn for_metric(namespace: &str, spec: &RegisterSpec, value: f64, retain: bool) -> Self {
        Self {
            topic: format!("{}/{}", namespace, spec.name),
            retain,
            payload: format!("{:.2}", value),
        }
    }
} // }}}

// BrokerSink {{{
#[async_trait]
pub trait BrokerSink {
    fn is_connected(&self) -> bool;

    /// Connects if there isn't a live session already.
    async fn connect(&mut self) -> Result<(), Error>;

    /// Sends on the current session; callers `connect()` first.
    async fn publish(&mut self, message: &Message) -> Result<(), Error>;

    /// Handles whatever network traffic is already waiting (keepalives,
    /// disconnects) without blocking on the broker.
    async fn service(&mut self);
} // }}}

// Mqtt {{{
pub struct Mqtt {
    config: config::Mqtt,
    client: AsyncClient,
    eventloop: EventLoop,
    connected: bool,
    // the session ended underneath us; the eventloop may still hold the old
    // socket's error
    dropped: bool,
}

impl Mqtt {
    pub fn new(config: &config::Mqtt) -> Self {
        let mut options = MqttOptions::new(config.client_id(), config.host(), config.port());

        let will = LastWill {
            topic: lwt_topic(config),
            message: bytes::Bytes::from("offline"),
            qos: QoS::AtLeastOnce,
            retain: true,
        };
        options.set_last_will(will);

        options.set_keep_alive(Duration::from_secs(60));
        if let (Some(u), Some(p)) = (config.username(), config.password()) {
            options.set_credentials(u, p);
        }

        info!("initializing mqtt at {}:{}", config.host(), config.port());

        let (client, eventloop) = AsyncClient::new(options, 10);

        Self {
            config: config.clone(),
            client,
            eventloop,
            connected: false,
            dropped: false,
        }
    }

    pub async fn stop(&mut self) {
        if !self.connected {
            return;
        }

        info!("Stopping MQTT client...");
        let offline = Message {
            topic: lwt_topic(&self.config),
            retain: true,
            payload: "offline".to_owned(),
        };
        if let Err(e) = self.send(&offline).await {
            warn!("{}", e);
        }
        let _ = self.client.try_disconnect();
        let _ = timeout(self.config.timeout(), self.eventloop.poll()).await;
        self.connected = false;
    }

    fn lost(&mut self) {
        self.connected = false;
        self.dropped = true;
    }

    // hands the message to the eventloop and drives it until the PUBLISH
    // has actually gone out
    async fn send(&mut self, message: &Message) -> Result<(), Error> {
        self.client
            .try_publish(
                message.topic.as_str(),
                QoS::AtMostOnce,
                message.retain,
                message.payload.as_bytes().to_vec(),
            )
            .map_err(|err| Error::Broker(format!("publish to {} failed: {}", message.topic, err)))?;

        let deadline = Instant::now() + self.config.timeout();
        loop {
            match timeout_at(deadline, self.eventloop.poll()).await {
                Ok(Ok(Event::Outgoing(Outgoing::Publish(_)))) => return Ok(()),
                Ok(Ok(Event::Incoming(Incoming::Disconnect))) => {
                    self.lost();
                    return Err(Error::Broker("broker sent DISCONNECT".to_owned()));
                }
                Ok(Ok(_)) => {} // keepalives etc
                Ok(Err(err)) => {
                    self.lost();
                    return Err(Error::Broker(format!("publish to {} failed: {}", message.topic, err)));
                }
                Err(_) => {
                    return Err(Error::Broker(format!(
                        "publish to {} not sent within {}ms",
                        message.topic,
                        self.config.timeout().as_millis()
                    )))
                }
            }
        }
    }
}

#[async_trait]
impl BrokerSink for Mqtt {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn connect(&mut self) -> Result<(), Error> {
        if self.connected {
            return Ok(());
        }

        let mut retried = false;
        let deadline = Instant::now() + self.config.timeout();
        loop {
            match timeout_at(deadline, self.eventloop.poll()).await {
                Ok(Ok(Event::Incoming(Incoming::ConnAck(_)))) => break,
                Ok(Ok(_)) => {}
                Ok(Err(err)) if self.dropped && !retried => {
                    debug!("stale MQTT connection error: {}", err);
                    retried = true;
                }
                Ok(Err(err)) => return Err(Error::Broker(format!("connection failed: {}", err))),
                Err(_) => {
                    return Err(Error::Broker(format!(
                        "no CONNACK from {}:{} within {}ms",
                        self.config.host(),
                        self.config.port(),
                        self.config.timeout().as_millis()
                    )))
                }
            }
        }

        self.connected = true;
        self.dropped = false;
        info!("MQTT connected to {}:{}", self.config.host(), self.config.port());

        let online = Message {
            topic: lwt_topic(&self.config),
            retain: true,
            payload: "online".to_owned(),
        };
        if let Err(e) = self.send(&online).await {
            warn!("{}", e);
        }
        Ok(())
    }

    async fn publish(&mut self, message: &Message) -> Result<(), Error> {
        if !self.connected {
            return Err(Error::Broker(format!("not connected, dropping {}", message.topic)));
        }
        self.send(message).await
    }

    async fn service(&mut self) {
        if !self.connected {
            return;
        }

        for _ in 0..32 {
            match timeout(Duration::from_millis(10), self.eventloop.poll()).await {
                Ok(Ok(Event::Incoming(Incoming::Disconnect))) => {
                    warn!("MQTT broker sent DISCONNECT");
                    self.lost();
                    break;
                }
                Ok(Ok(event)) => trace!("mqtt: {:?}", event),
                Ok(Err(err)) => {
                    warn!("MQTT connection lost: {}", err);
                    self.lost();
                    break;
                }
                Err(_) => break, // nothing waiting
            }
        }
    }
} // }}}

fn lwt_topic(config: &config::Mqtt) -> String {
    format!("{}/LWT", config.namespace())
}
