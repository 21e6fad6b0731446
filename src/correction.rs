use itertools::Itertools;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::gravimetric::VolumetricFlowEstimate;
use crate::series::FlowEstimate;
use crate::{Error, Result};

/// Direction of the imposed flow during a test run.
///
/// For the negative setup the raw mass-difference sign disagrees with the
/// sign the sensor reports, so the gravimetric flow is negated before
/// pairing. Always passed explicitly; there is no ambient "current run"
/// state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum FlowDirection {
    Positive,
    Negative,
}

impl FlowDirection {
    /// Sign applied to the gravimetric flow so it agrees with the sensor's
    /// reported sign convention for this physical setup.
    const fn sign(self) -> f64 {
        match self {
            Self::Positive => 1.0,
            Self::Negative => -1.0,
        }
    }
}

/// Composite key identifying one test configuration.
///
/// Carried on the paired dataset so downstream tables never reconstruct it
/// from file names or other derived strings.
#[derive(Clone, Copy, Debug, PartialEq, Deserialize, Serialize)]
pub struct TestCondition {
    pub viscosity_cst: f64,
    pub direction: FlowDirection,
}

/// One paired row of the regression dataset for a test condition.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CorrectionObservation {
    pub pressure_mbar: f64,
    /// Sensor-side mean flow, uL/min
    pub measured_flow_ul_min: f64,
    /// First-order uncertainty of the sensor-side mean, uL/min
    pub u_measured_flow_ul_min: f64,
    /// Gravimetric ground-truth flow, sign-corrected for the direction, uL/min
    pub reference_flow_ul_min: f64,
    /// Gravimetric uncertainty magnitude, uL/min
    pub u_reference_flow_ul_min: f64,
}

/// The paired dataset for one viscosity and direction, ready for fitting.
#[derive(Clone, Debug)]
pub struct CorrectionDataset {
    pub condition: TestCondition,
    pub observations: Vec<CorrectionObservation>,
}

/// Pair sensor-side and gravimetric estimates by pressure setpoint.
///
/// Matching is exact on the pressure key, never nearest-neighbour, and must
/// be complete: a setpoint present on one side only means the caller handed
/// over mismatched runs. Rows come back pressure-sorted, the conventional
/// presentation order; the fit itself does not care.
///
/// # Errors
///
/// Returns [`Error::MismatchedPairing`] naming the first orphaned pressure
/// and which side it is missing from.
pub fn pair(
    condition: TestCondition,
    measured: &[FlowEstimate],
    reference: &[VolumetricFlowEstimate],
) -> Result<CorrectionDataset> {
    let sign = condition.direction.sign();

    let observations: Vec<CorrectionObservation> = measured
        .iter()
        .map(|flow| {
            // Exact key equality on the pressure setpoint
            let counterpart = reference
                .iter()
                .find(|vol| vol.pressure_mbar.to_bits() == flow.pressure_mbar.to_bits())
                .ok_or(Error::MismatchedPairing {
                    pressure_mbar: flow.pressure_mbar,
                    missing: "gravimetric",
                })?;

            Ok(CorrectionObservation {
                pressure_mbar: flow.pressure_mbar,
                measured_flow_ul_min: flow.mean_flow_ul_min,
                u_measured_flow_ul_min: flow.u_first_order_ul_min,
                reference_flow_ul_min: sign * counterpart.volumetric_flow_ul_min,
                u_reference_flow_ul_min: counterpart.u_volumetric_flow_ul_min,
            })
        })
        .collect::<Result<_>>()?;

    if let Some(orphan) = reference.iter().find(|vol| {
        !measured
            .iter()
            .any(|flow| flow.pressure_mbar.to_bits() == vol.pressure_mbar.to_bits())
    }) {
        return Err(Error::MismatchedPairing {
            pressure_mbar: orphan.pressure_mbar,
            missing: "sensor",
        });
    }

    let observations = observations
        .into_iter()
        .sorted_by(|a, b| {
            a.pressure_mbar
                .partial_cmp(&b.pressure_mbar)
                .expect("pressure setpoints must be finite")
        })
        .collect::<Vec<_>>();

    debug!(
        "paired {} setpoints at {} cSt ({:?})",
        observations.len(),
        condition.viscosity_cst,
        condition.direction
    );

    Ok(CorrectionDataset {
        condition,
        observations,
    })
}

#[cfg(test)]
mod tests {
    use crate::gravimetric::VolumetricFlowEstimate;
    use crate::series::FlowEstimate;
    use crate::{Error, Result};

    use super::{pair, FlowDirection, TestCondition};

    fn flow_estimate(pressure_mbar: f64, mean_flow_ul_min: f64) -> FlowEstimate {
        FlowEstimate {
            pressure_mbar,
            sample_count: 30,
            mean_flow_ul_min,
            u_zero_order_ul_min: 10.0,
            u_first_order_ul_min: 10.5,
        }
    }

    fn volumetric_estimate(pressure_mbar: f64, flow_ul_min: f64) -> VolumetricFlowEstimate {
        VolumetricFlowEstimate {
            pressure_mbar,
            mass_flow_rate_kg_s: flow_ul_min / 60.0e9 * 1000.0,
            u_mass_flow_rate_kg_s: 1e-9,
            volumetric_flow_ul_min: flow_ul_min,
            u_volumetric_flow_ul_min: 0.06,
        }
    }

    const fn condition(direction: FlowDirection) -> TestCondition {
        TestCondition {
            viscosity_cst: 20.0,
            direction,
        }
    }

    #[test]
    fn complete_sets_pair_in_pressure_order() -> Result<()> {
        let measured = [
            flow_estimate(600.0, 310.0),
            flow_estimate(200.0, 105.0),
            flow_estimate(400.0, 207.0),
        ];
        let reference = [
            volumetric_estimate(200.0, 100.0),
            volumetric_estimate(400.0, 200.0),
            volumetric_estimate(600.0, 300.0),
        ];

        let dataset = pair(condition(FlowDirection::Positive), &measured, &reference)?;

        let pressures: Vec<f64> = dataset
            .observations
            .iter()
            .map(|obs| obs.pressure_mbar)
            .collect();
        assert_eq!(pressures, vec![200.0, 400.0, 600.0]);
        approx::assert_relative_eq!(dataset.observations[0].measured_flow_ul_min, 105.0);
        approx::assert_relative_eq!(dataset.observations[0].reference_flow_ul_min, 100.0);
        approx::assert_relative_eq!(dataset.observations[0].u_measured_flow_ul_min, 10.5);
        Ok(())
    }

    #[test]
    fn negative_direction_flips_the_reference_sign_but_not_its_uncertainty() -> Result<()> {
        let measured = [flow_estimate(300.0, -150.0)];
        let reference = [volumetric_estimate(300.0, 148.0)];

        let dataset = pair(condition(FlowDirection::Negative), &measured, &reference)?;

        approx::assert_relative_eq!(dataset.observations[0].reference_flow_ul_min, -148.0);
        approx::assert_relative_eq!(dataset.observations[0].u_reference_flow_ul_min, 0.06);
        Ok(())
    }

    #[test]
    fn a_setpoint_without_gravimetric_counterpart_is_rejected() {
        let measured = [flow_estimate(200.0, 105.0), flow_estimate(400.0, 207.0)];
        let reference = [volumetric_estimate(200.0, 100.0)];

        let result = pair(condition(FlowDirection::Positive), &measured, &reference);

        assert!(matches!(
            result,
            Err(Error::MismatchedPairing {
                missing: "gravimetric",
                ..
            })
        ));
    }

    #[test]
    fn a_setpoint_without_sensor_counterpart_is_rejected() {
        let measured = [flow_estimate(200.0, 105.0)];
        let reference = [
            volumetric_estimate(200.0, 100.0),
            volumetric_estimate(500.0, 250.0),
        ];

        let result = pair(condition(FlowDirection::Positive), &measured, &reference);

        assert!(matches!(
            result,
            Err(Error::MismatchedPairing {
                missing: "sensor",
                ..
            })
        ));
    }
}
