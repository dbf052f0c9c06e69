#![allow(dead_code)]

pub use sungrow_bridge::coordinator::{Coordinator, Tick};
pub use sungrow_bridge::influx::{Point, TimeSeriesSink};
pub use sungrow_bridge::mqtt::{BrokerSink, Message};
pub use sungrow_bridge::network::Link;
pub use sungrow_bridge::prelude::*;
pub use sungrow_bridge::publisher::Publisher;
pub use sungrow_bridge::sungrow::inverter::Transport;
pub use sungrow_bridge::sungrow::registers::{BLOCK_LEN, BLOCK_START, REGISTERS};

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

pub fn common_setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub type TestCoordinator = Coordinator<MockTransport, MockInflux, MockBroker, MockLink>;

// MockTransport {{{
#[derive(Clone)]
pub struct MockTransport {
    pub reply: Arc<Mutex<Result<RegisterBlock, Error>>>,
    pub reads: Arc<Mutex<Vec<(u16, u16)>>>,
}

impl MockTransport {
    pub fn replying(block: RegisterBlock) -> Self {
        Self {
            reply: Arc::new(Mutex::new(Ok(block))),
            reads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Arc::new(Mutex::new(Err(Error::Bus("timeout".to_owned())))),
            reads: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn set_reply(&self, reply: Result<RegisterBlock, Error>) {
        *self.reply.lock().unwrap() = reply;
    }

    pub fn reads(&self) -> Vec<(u16, u16)> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn read_block(&mut self, start: u16, count: u16) -> Result<RegisterBlock, Error> {
        self.reads.lock().unwrap().push((start, count));
        self.reply.lock().unwrap().clone()
    }
} // }}}

// MockInflux {{{
#[derive(Clone, Default)]
pub struct MockInflux {
    pub points: Arc<Mutex<Vec<Point>>>,
    pub fail: Arc<Mutex<bool>>,
}

impl MockInflux {
    pub fn points(&self) -> Vec<Point> {
        self.points.lock().unwrap().clone()
    }

    pub fn set_fail(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl TimeSeriesSink for MockInflux {
    async fn write(&mut self, point: &Point) -> Result<(), Error> {
        if *self.fail.lock().unwrap() {
            return Err(Error::Publish("database not found".to_owned()));
        }
        self.points.lock().unwrap().push(point.clone());
        Ok(())
    }
} // }}}

// MockBroker {{{
#[derive(Clone, Default)]
pub struct MockBroker {
    pub connected: Arc<Mutex<bool>>,
    pub refuse: Arc<Mutex<bool>>,
    pub connects: Arc<Mutex<u32>>,
    pub services: Arc<Mutex<u32>>,
    pub published: Arc<Mutex<Vec<Message>>>,
}

impl MockBroker {
    pub fn refusing() -> Self {
        let broker = Self::default();
        broker.set_refuse(true);
        broker
    }

    pub fn set_refuse(&self, refuse: bool) {
        *self.refuse.lock().unwrap() = refuse;
    }

    pub fn drop_session(&self) {
        *self.connected.lock().unwrap() = false;
    }

    pub fn published(&self) -> Vec<Message> {
        self.published.lock().unwrap().clone()
    }

    pub fn connects(&self) -> u32 {
        *self.connects.lock().unwrap()
    }

    pub fn services(&self) -> u32 {
        *self.services.lock().unwrap()
    }
}

#[async_trait]
impl BrokerSink for MockBroker {
    fn is_connected(&self) -> bool {
        *self.connected.lock().unwrap()
    }

    async fn connect(&mut self) -> Result<(), Error> {
        if *self.refuse.lock().unwrap() {
            *self.connected.lock().unwrap() = false;
            return Err(Error::Broker("connection refused".to_owned()));
        }

        let mut connected = self.connected.lock().unwrap();
        if !*connected {
            *connected = true;
            *self.connects.lock().unwrap() += 1;
        }
        Ok(())
    }

    async fn publish(&mut self, message: &Message) -> Result<(), Error> {
        if !self.is_connected() {
            return Err(Error::Broker("not connected".to_owned()));
        }
        self.published.lock().unwrap().push(message.clone());
        Ok(())
    }

    async fn service(&mut self) {
        *self.services.lock().unwrap() += 1;
    }
} // }}}

// MockLink {{{
#[derive(Clone)]
pub struct MockLink {
    pub up: Arc<Mutex<bool>>,
    pub reconnects: Arc<Mutex<u32>>,
    pub services: Arc<Mutex<u32>>,
}

impl Default for MockLink {
    fn default() -> Self {
        Self {
            up: Arc::new(Mutex::new(true)),
            reconnects: Arc::new(Mutex::new(0)),
            services: Arc::new(Mutex::new(0)),
        }
    }
}

impl MockLink {
    pub fn set_up(&self, up: bool) {
        *self.up.lock().unwrap() = up;
    }

    pub fn reconnects(&self) -> u32 {
        *self.reconnects.lock().unwrap()
    }

    pub fn services(&self) -> u32 {
        *self.services.lock().unwrap()
    }
}

#[async_trait]
impl Link for MockLink {
    async fn is_up(&mut self) -> bool {
        *self.up.lock().unwrap()
    }

    async fn reconnect(&mut self) {
        *self.reconnects.lock().unwrap() += 1;
    }

    async fn service(&mut self) {
        *self.services.lock().unwrap() += 1;
    }
} // }}}

pub struct Factory();
impl Factory {
    pub fn yaml() -> &'static str {
        r#"
inverter:
  port: /dev/ttyUSB0
mqtt:
  host: localhost
influx:
  url: http://localhost:8086
  database: solar
"#
    }

    pub fn config() -> Config {
        Config::from_yaml(Self::yaml()).unwrap()
    }

    /// A full-length block with the given (offset, word) pairs set.
    pub fn block(words: &[(u16, u16)]) -> RegisterBlock {
        let mut data = vec![0u16; usize::from(BLOCK_LEN)];
        for &(offset, word) in words {
            data[usize::from(offset)] = word;
        }
        RegisterBlock::new(BLOCK_START, data)
    }

    pub fn spec(name: &str) -> RegisterSpec {
        *REGISTERS.iter().find(|s| s.name == name).unwrap()
    }

    pub fn index(name: &str) -> usize {
        REGISTERS.iter().position(|s| s.name == name).unwrap()
    }

    pub fn coordinator(
        transport: MockTransport,
        influx: MockInflux,
        broker: Option<MockBroker>,
        link: MockLink,
    ) -> TestCoordinator {
        let config = Self::config();
        let publisher = Publisher::new(influx, broker, &config.mqtt);
        Coordinator::new(transport, publisher, link, config.poll.interval_ms())
    }
}
