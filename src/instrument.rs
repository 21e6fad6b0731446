use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Static accuracy and range figures for one micro-flow sensor model.
///
/// The device reports flow with an accuracy that is the larger of a fixed
/// fraction of full scale and a fraction of the measured value, combined in
/// quadrature with a digitisation precision of half the least-significant
/// bit of the readout.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct InstrumentSpec {
    /// Full scale of the device in uL/min
    pub full_scale: f64,
    /// Full measurable range of the device in uL/min
    pub full_range: f64,
    /// Accuracy as a fraction of full scale
    pub full_scale_accuracy: f64,
    /// Accuracy as a fraction of the measured value
    pub measured_value_accuracy: f64,
    /// Resolution of the readout in bits
    pub resolution_bits: u32,
}

impl InstrumentSpec {
    /// Half the least-significant bit of the readout, in uL/min.
    fn precision(&self) -> f64 {
        let resolution = self.full_range / (2f64.powi(i32::try_from(self.resolution_bits).expect("resolution must fit in `i32`")) - 1.0);
        0.5 * resolution
    }

    /// Zeroth-order (device specification) uncertainty at flow `flow` uL/min.
    ///
    /// This term is present even for a single reading: it reflects the
    /// instrument, not the scatter of the data. Zero flow is a legitimate
    /// operating point, where the value-proportional term vanishes and the
    /// full-scale term takes over.
    #[must_use]
    pub fn zero_order_uncertainty(&self, flow: f64) -> f64 {
        let fs_acc = self.full_scale_accuracy * self.full_scale;
        let mv_acc = flow.abs() * self.measured_value_accuracy;
        let flow_acc = mv_acc.max(fs_acc);
        (flow_acc.powi(2) + self.precision().powi(2)).sqrt()
    }
}

/// Registry mapping device identifiers to their specs.
///
/// Looking up an unregistered identifier is an error. We never substitute a
/// default spec for an unknown device.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct InstrumentTable(HashMap<String, InstrumentSpec>);

impl InstrumentTable {
    /// The devices this laboratory has characterised.
    ///
    /// Currently the Sensirion SLI-0430 sampled at 11 bits through the
    /// vendor viewer software.
    #[must_use]
    pub fn builtin() -> Self {
        let mut table = HashMap::new();
        table.insert(
            "SLI-0430".to_owned(),
            InstrumentSpec {
                full_scale: 1000.0,
                full_range: 1200.0,
                full_scale_accuracy: 0.01,
                measured_value_accuracy: 0.20,
                resolution_bits: 11,
            },
        );
        Self(table)
    }

    /// Register a spec for `device`, replacing any existing entry.
    pub fn register(&mut self, device: impl Into<String>, spec: InstrumentSpec) {
        self.0.insert(device.into(), spec);
    }

    /// Look up the spec for `device`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownInstrument`] if no spec is registered under
    /// `device`.
    pub fn get(&self, device: &str) -> Result<&InstrumentSpec> {
        self.0.get(device).ok_or_else(|| Error::UnknownInstrument {
            device: device.to_owned(),
        })
    }
}
