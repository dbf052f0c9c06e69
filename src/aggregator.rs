use crate::prelude::*;

/// Samples per window (`avSamples`). At one poll every two seconds a window
/// covers two minutes.
pub const AV_SAMPLES: usize = 60;

// Window {{{
/// Bounded run of samples. Drains itself the moment it fills, so it never
/// holds more than one window's worth.
#[derive(Clone, Debug)]
pub struct Window {
    samples: Vec<f64>,
    sum: f64,
    capacity: usize,
}

impl Window {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            sum: 0.0,
            capacity: capacity.max(1),
        }
    }

    /// Adds a sample. When this fills the window its mean is returned and
    /// the window is cleared.
    pub fn push(&mut self, value: f64) -> Option<f64> {
        self.samples.push(value);
        self.sum += value;

        if self.samples.len() < self.capacity {
            return None;
        }

        let mean = self.mean();
        self.clear();
        Some(mean)
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            0.0
        } else {
            self.sum / self.samples.len() as f64
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
} // }}}

// MetricState {{{
#[derive(Clone, Debug)]
pub struct MetricState {
    pub last_value: f64,
    pub window: Window,
}

impl MetricState {
    pub fn new(capacity: usize) -> Self {
        Self {
            last_value: 0.0,
            window: Window::new(capacity),
        }
    }
} // }}}

// Aggregator {{{
/// One `MetricState` per register spec, indexed by table position.
#[derive(Clone, Debug)]
pub struct Aggregator {
    states: Vec<MetricState>,
}

impl Aggregator {
    pub fn new(metrics: usize) -> Self {
        Self::with_window(metrics, AV_SAMPLES)
    }

    pub fn with_window(metrics: usize, capacity: usize) -> Self {
        Self {
            states: (0..metrics).map(|_| MetricState::new(capacity)).collect(),
        }
    }

    /// Records a decoded value for metric `index`. Returns the payload for
    /// the time-series sink once the window fills: the window mean for
    /// `WindowAverage`, otherwise the sample just recorded.
    pub fn record(&mut self, index: usize, spec: &RegisterSpec, value: f64) -> Option<f64> {
        let state = self.states.get_mut(index)?;
        state.last_value = value;

        let mean = state.window.push(value)?;
        trace!("{}: window complete, mean {}", spec.name, mean);

        Some(match spec.emit {
            EmitPolicy::WindowAverage => mean,
            EmitPolicy::LatestValue => value,
        })
    }

    pub fn state(&self, index: usize) -> Option<&MetricState> {
        self.states.get(index)
    }

    pub fn last_value(&self, index: usize) -> Option<f64> {
        self.state(index).map(|s| s.last_value)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
} // }}}
