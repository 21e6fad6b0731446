use log::debug;
use serde::Serialize;

use crate::instrument::InstrumentSpec;
use crate::math::{mean, sample_standard_deviation};
use crate::{Error, Result};

/// Raw flow readings taken at one fixed pressure setpoint, in uL/min.
///
/// A series is immutable once constructed and always holds at least one
/// sample; statistical reduction additionally needs two.
#[derive(Clone, Debug)]
pub struct SampleSeries {
    pressure_mbar: f64,
    samples: Vec<f64>,
}

impl SampleSeries {
    /// Build a series from readings taken at `pressure_mbar`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InsufficientSamples`] if `samples` is empty.
    pub fn new(pressure_mbar: f64, samples: Vec<f64>) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::InsufficientSamples {
                pressure_mbar,
                count: 0,
            });
        }
        Ok(Self {
            pressure_mbar,
            samples,
        })
    }

    #[must_use]
    pub const fn pressure_mbar(&self) -> f64 {
        self.pressure_mbar
    }

    #[must_use]
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// The reduced result for one sample series.
///
/// The zeroth- and first-order terms are deliberately separate fields so a
/// caller can audit which one dominates a given setpoint.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct FlowEstimate {
    pub pressure_mbar: f64,
    pub sample_count: usize,
    /// Arithmetic mean of the readings, uL/min
    pub mean_flow_ul_min: f64,
    /// Instrument-specification uncertainty evaluated at the mean, uL/min
    pub u_zero_order_ul_min: f64,
    /// Instrument and sampling uncertainty combined in quadrature, uL/min
    pub u_first_order_ul_min: f64,
}

/// Reduce a series to its mean flow with zeroth- and first-order uncertainty.
///
/// The zeroth-order term is evaluated at the mean flow, not per sample. When
/// the accuracy is value-proportional the two are not equivalent; the mean is
/// the canonical choice here and the one the tests pin down. The statistical
/// term is `2 s / sqrt(n)`, an approximate 95% half-width of the mean, and
/// the two terms combine in quadrature on the assumption they are
/// independent.
///
/// # Errors
///
/// Returns [`Error::InsufficientSamples`] when the series holds a single
/// sample, where the sample standard deviation is undefined. It never comes
/// back as zero or NaN.
#[allow(clippy::cast_precision_loss)]
pub fn reduce(series: &SampleSeries, spec: &InstrumentSpec) -> Result<FlowEstimate> {
    let mean_flow = mean(series.samples());
    let std_dev =
        sample_standard_deviation(series.samples()).ok_or(Error::InsufficientSamples {
            pressure_mbar: series.pressure_mbar(),
            count: series.len(),
        })?;

    let u_zero_order = spec.zero_order_uncertainty(mean_flow);
    let u_statistical = 2.0 * std_dev / (series.len() as f64).sqrt();
    let u_first_order = (u_zero_order.powi(2) + u_statistical.powi(2)).sqrt();

    debug!(
        "reduced {} samples at {} mbar to mean {mean_flow} uL/min",
        series.len(),
        series.pressure_mbar()
    );

    Ok(FlowEstimate {
        pressure_mbar: series.pressure_mbar(),
        sample_count: series.len(),
        mean_flow_ul_min: mean_flow,
        u_zero_order_ul_min: u_zero_order,
        u_first_order_ul_min: u_first_order,
    })
}
