use crate::prelude::*;

use async_trait::async_trait;
use std::time::Duration;
use tokio_modbus::client::{rtu, Context, Reader};
use tokio_modbus::Slave;

// Transport {{{
#[async_trait]
pub trait Transport {
    /// One contiguous read of `count` input registers from `start`.
    async fn read_block(&mut self, start: u16, count: u16) -> Result<RegisterBlock, Error>;
} // }}}

// ModbusRtu {{{
pub struct ModbusRtu {
    port: String,
    baud_rate: u32,
    slave: Slave,
    timeout: Duration,
    ctx: Option<Context>,
}

impl ModbusRtu {
    pub fn new(config: &config::Inverter) -> Self {
        Self {
            port: config.port().to_owned(),
            baud_rate: config.baud_rate(),
            slave: Slave(config.slave_id()),
            timeout: config.read_timeout(),
            ctx: None,
        }
    }

    fn open(&self) -> Result<Context, Error> {
        info!("opening {} at {} baud", self.port, self.baud_rate);

        let builder = tokio_serial::new(&self.port, self.baud_rate).timeout(self.timeout);
        let port = tokio_serial::SerialStream::open(&builder)
            .map_err(|err| Error::Bus(format!("cannot open {}: {}", self.port, err)))?;

        Ok(rtu::attach_slave(port, self.slave))
    }
}

#[async_trait]
impl Transport for ModbusRtu {
    async fn read_block(&mut self, start: u16, count: u16) -> Result<RegisterBlock, Error> {
        let mut ctx = match self.ctx.take() {
            Some(ctx) => ctx,
            None => self.open()?,
        };

        let reply = tokio::time::timeout(self.timeout, ctx.read_input_registers(start, count)).await;

        let words = match reply {
            Ok(Ok(Ok(words))) => words,
            Ok(Ok(Err(exception))) => {
                // the bus itself is fine, keep the port open
                self.ctx = Some(ctx);
                return Err(Error::Bus(format!("exception response {:?}", exception)));
            }
            Ok(Err(err)) => return Err(Error::Bus(err.to_string())),
            Err(_) => {
                return Err(Error::Bus(format!(
                    "no reply within {}ms",
                    self.timeout.as_millis()
                )))
            }
        };

        self.ctx = Some(ctx);

        if words.len() < usize::from(count) {
            return Err(Error::Bus(format!(
                "short response: got {} of {} registers",
                words.len(),
                count
            )));
        }

        Ok(RegisterBlock::new(start, words))
    }
} // }}}
