use crate::prelude::*;

use crate::aggregator::Aggregator;
use crate::influx::TimeSeriesSink;
use crate::mqtt::BrokerSink;
use crate::network::Link;
use crate::publisher::Publisher;
use crate::scheduler::{Clock, PollTimer};
use crate::sungrow::inverter::Transport;
use crate::sungrow::registers::{BLOCK_LEN, BLOCK_START, REGISTERS};
use crate::watchdog::FailureCounter;

/// What a single pass of the outer loop did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    Idle,
    Polled,
    /// The failure ceiling was reached; nothing further should run.
    Restart,
}

#[derive(Default, Debug, Clone)]
pub struct PollStats {
    pub polls: u64,
    pub bus_errors: u64,
    pub samples_decoded: u64,
    pub samples_clamped: u64,
    pub influx_writes: u64,
    pub influx_errors: u64,
    pub mqtt_messages_sent: u64,
    pub mqtt_errors: u64,
    pub mqtt_reconnects: u64,
    pub link_drops: u64,
}

impl PollStats {
    pub fn print_summary(&self) {
        info!("Poll Statistics:");
        info!("  Polls: {}", self.polls);
        info!("  MODBUS read failures: {}", self.bus_errors);
        info!("  Samples:");
        info!("    Decoded: {}", self.samples_decoded);
        info!("    Clamped: {}", self.samples_clamped);
        info!("  InfluxDB:");
        info!("    Writes: {}", self.influx_writes);
        info!("    Errors: {}", self.influx_errors);
        info!("  MQTT:");
        info!("    Messages sent: {}", self.mqtt_messages_sent);
        info!("    Errors: {}", self.mqtt_errors);
        info!("    Reconnects: {}", self.mqtt_reconnects);
        info!("  Network link drops: {}", self.link_drops);
    }
}

pub struct Coordinator<T, S, B, L> {
    transport: T,
    publisher: Publisher<S, B>,
    link: L,
    aggregator: Aggregator,
    failures: FailureCounter,
    clock: Clock,
    timer: PollTimer,
    stats: PollStats,
}

impl<T, S, B, L> Coordinator<T, S, B, L>
where
    T: Transport + Send,
    S: TimeSeriesSink + Send,
    B: BrokerSink + Send,
    L: Link + Send,
{
    pub fn new(transport: T, publisher: Publisher<S, B>, link: L, interval_ms: u32) -> Self {
        let clock = Clock::new();

        Self {
            transport,
            publisher,
            link,
            aggregator: Aggregator::new(REGISTERS.len()),
            failures: FailureCounter::default(),
            timer: PollTimer::new(interval_ms, clock.millis()),
            clock,
            stats: PollStats::default(),
        }
    }

    /// One pass of the outer loop. Housekeeping and the link check run every
    /// time; a poll only once the interval has passed.
    pub async fn tick(&mut self) -> Tick {
        self.link.service().await;

        if !self.link.is_up().await {
            self.stats.link_drops += 1;
            self.failures
                .fail(&Error::Connectivity("link is not up, reconnecting".to_owned()));
            self.link.reconnect().await;
        }

        let mut polled = false;
        if self.timer.due(self.clock.millis()) {
            self.poll().await;
            self.timer.reset(self.clock.millis());
            polled = true;
        }

        if self.failures.tripped() {
            error!(
                "Failure counter has reached: {}. Rebooting...",
                self.failures.count()
            );
            self.stats.print_summary();
            return Tick::Restart;
        }

        if polled {
            Tick::Polled
        } else {
            Tick::Idle
        }
    }

    /// Read the block, push every metric through decode/aggregate/publish,
    /// then check on the broker session.
    pub async fn poll(&mut self) {
        self.stats.polls += 1;
        info!("Reading the MODBUS...");

        match self.transport.read_block(BLOCK_START, BLOCK_LEN).await {
            Ok(block) => {
                // one decrement for the read, however many metrics it held
                self.failures.succeed();
                debug!(
                    "Full MODBUS response ({} registers from {:#06x}): {:?}",
                    block.len(),
                    block.start(),
                    block.words()
                );
                self.process(&block).await;
            }
            Err(e) => {
                self.stats.bus_errors += 1;
                self.failures.fail(&e);
            }
        }

        if let Some(result) = self.publisher.maintain().await {
            if result.is_ok() {
                self.stats.mqtt_reconnects += 1;
            }
            self.failures.record(&result);
        }
    }

    async fn process(&mut self, block: &RegisterBlock) {
        for (index, spec) in REGISTERS.iter().enumerate() {
            self.link.service().await;

            let scaled = spec.scaled(block);
            let value = spec.clamp(scaled);
            self.stats.samples_decoded += 1;
            if value != scaled {
                self.stats.samples_clamped += 1;
                warn!("{}: discarding implausible {} (AC input interrupted?)", spec.name, scaled);
            }
            info!("{}: {}", spec.name, value);

            if let Some(payload) = self.aggregator.record(index, spec, value) {
                let result = self.publisher.store(spec, payload).await;
                match &result {
                    Ok(()) => {
                        self.stats.influx_writes += 1;
                        info!("{}: stored {} in InfluxDB", spec.name, payload);
                    }
                    Err(_) => self.stats.influx_errors += 1,
                }
                self.failures.record(&result);
            }

            if let Some(result) = self.publisher.push(spec, value).await {
                match &result {
                    Ok(()) => {
                        self.stats.mqtt_messages_sent += 1;
                        info!("{}: published to MQTT", spec.name);
                    }
                    Err(_) => self.stats.mqtt_errors += 1,
                }
                self.failures.record(&result);
            }
        }
    }

    pub fn failures(&self) -> &FailureCounter {
        &self.failures
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn publisher_mut(&mut self) -> &mut Publisher<S, B> {
        &mut self.publisher
    }

    pub fn stats(&self) -> &PollStats {
        &self.stats
    }
}
