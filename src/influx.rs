use crate::prelude::*;

use async_trait::async_trait;
use rinfluxdb::line_protocol::{r#async::Client, LineBuilder};
use std::time::Duration;

// Point {{{
/// One time-series record: a measurement per metric, the fixed sensor tag
/// and a single `value` field.
#[derive(Clone, Debug, PartialEq)]
pub struct Point {
    pub measurement: String,
    pub sensor: String,
    pub value: f64,
}

impl Point {
    pub fn new(spec: &RegisterSpec, value: f64) -> Self {
        Self {
            measurement: spec.label.to_owned(),
            sensor: sungrow::registers::SENSOR.to_owned(),
            value,
        }
    }

    /// Line protocol rendering, only used for the diagnostic log.
    pub fn to_line_protocol(&self) -> String {
        format!(
            "{},sensor={} value={}",
            escape(&self.measurement, &[',', ' ']),
            escape(&self.sensor, &[',', '=', ' ']),
            self.value
        )
    }
}

fn escape(s: &str, special: &[char]) -> String {
    let mut r = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            r.push('\\');
        }
        r.push(c);
    }
    r
} // }}}

// TimeSeriesSink {{{
#[async_trait]
pub trait TimeSeriesSink {
    async fn write(&mut self, point: &Point) -> Result<(), Error>;
} // }}}

// Influx {{{
pub struct Influx {
    config: config::Influx,
    client: Client,
}

impl Influx {
    pub fn new(config: &config::Influx) -> Result<Self> {
        info!("initializing influx at {}", config.url());

        let client = {
            let url = reqwest::Url::parse(config.url())?;
            let credentials = match (config.username(), config.password()) {
                (Some(u), Some(p)) => Some((u, p)),
                _ => None,
            };

            Client::new(url, credentials)?
        };

        Ok(Self {
            config: config.clone(),
            client,
        })
    }

    /// Checks the server answers `/ping` before the poll loop starts.
    pub async fn validate_connection(&self) -> Result<()> {
        ping(self.config.url()).await
    }
}

pub async fn ping(url: &str) -> Result<()> {
    let mut url = reqwest::Url::parse(url)?;
    if url.cannot_be_a_base() {
        bail!("{} cannot carry a path", url);
    }
    // appended, so a path prefix like /influx is kept
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("ping");
    }

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()?;

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|err| anyhow!("{} unreachable: {}", url, err))?;

    if !response.status().is_success() {
        bail!("{} returned {}", url, response.status());
    }

    Ok(())
}

#[async_trait]
impl TimeSeriesSink for Influx {
    async fn write(&mut self, point: &Point) -> Result<(), Error> {
        let line = LineBuilder::new(point.measurement.as_str())
            .insert_tag("sensor", point.sensor.as_str())
            .insert_field("value", point.value)
            .set_timestamp(chrono::Utc::now())
            .build();

        let points = vec![line];
        self.client
            .send(self.config.database(), &points)
            .await
            .map_err(|err| Error::Publish(format!("{:?}", err)))
    }
} // }}}
