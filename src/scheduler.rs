use crate::prelude::*;
use crate::coordinator::{Coordinator, Tick};
use crate::influx::TimeSeriesSink;
use crate::mqtt::BrokerSink;
use crate::network::Link;
use crate::sungrow::inverter::Transport;

use std::time::{Duration, Instant};

// Clock {{{
/// Milliseconds since start as a u32. Wraps after ~49.7 days, so compare
/// readings with `wrapping_sub` only.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    origin: Instant,
    offset: u32,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// A clock whose first reading is `millis`.
    pub fn starting_at(millis: u32) -> Self {
        Self {
            origin: Instant::now(),
            offset: millis,
        }
    }

    pub fn millis(&self) -> u32 {
        // truncation is the wraparound
        self.offset.wrapping_add(self.origin.elapsed().as_millis() as u32)
    }
} // }}}

// PollTimer {{{
#[derive(Clone, Copy, Debug)]
pub struct PollTimer {
    interval: u32,
    last: u32,
}

impl PollTimer {
    pub fn new(interval: u32, now: u32) -> Self {
        Self {
            interval,
            last: now,
        }
    }

    pub fn due(&self, now: u32) -> bool {
        now.wrapping_sub(self.last) >= self.interval
    }

    pub fn reset(&mut self, now: u32) {
        self.last = now;
    }
} // }}}

pub struct Scheduler {
    tick: Duration,
}

impl Scheduler {
    pub fn new(config: &ConfigWrapper) -> Self {
        Self {
            tick: config.poll().tick(),
        }
    }

    /// Ticks the coordinator until it asks for a restart.
    pub async fn start<T, S, B, L>(&self, coordinator: &mut Coordinator<T, S, B, L>)
    where
        T: Transport + Send,
        S: TimeSeriesSink + Send,
        B: BrokerSink + Send,
        L: Link + Send,
    {
        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            if coordinator.tick().await == Tick::Restart {
                return;
            }
        }
    }
}
