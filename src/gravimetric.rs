use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Stopwatch uncertainty assumed for every timed mass measurement, seconds.
pub const TIME_UNCERTAINTY_S: f64 = 0.005;

/// Unit conversion from m^3/s to uL/min: 1e9 uL per m^3, 60 s per min.
const M3_PER_S_TO_UL_PER_MIN: f64 = 60.0 * 1.0e9;

/// One manual gravimetric measurement: the mass collected on the balance over
/// a timed interval at a fixed pressure setpoint.
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct MassBalanceTrial {
    pub pressure_mbar: f64,
    pub measurement_time_s: f64,
    pub initial_mass_g: f64,
    pub final_mass_g: f64,
}

/// Volumetric flow rate derived from a mass-balance trial.
///
/// The flow carries the sign of the measured mass difference; uncertainties
/// are magnitudes.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct VolumetricFlowEstimate {
    pub pressure_mbar: f64,
    pub mass_flow_rate_kg_s: f64,
    pub u_mass_flow_rate_kg_s: f64,
    pub volumetric_flow_ul_min: f64,
    pub u_volumetric_flow_ul_min: f64,
}

/// Derive the volumetric flow rate from a timed mass measurement.
///
/// The only propagated input uncertainty is the stopwatch term
/// [`TIME_UNCERTAINTY_S`]; the balance readings are treated as exact. No
/// uncertainty in `fluid_density_kg_m3` is propagated either: the supplier
/// quotes no tolerance on the density and none was measured, a documented
/// simplification rather than an oversight.
///
/// # Errors
///
/// Returns [`Error::NonPositiveMeasurementTime`] if the trial's timed
/// interval is zero or negative.
pub fn reduce(trial: &MassBalanceTrial, fluid_density_kg_m3: f64) -> Result<VolumetricFlowEstimate> {
    if trial.measurement_time_s <= 0.0 {
        return Err(Error::NonPositiveMeasurementTime {
            pressure_mbar: trial.pressure_mbar,
            time_s: trial.measurement_time_s,
        });
    }

    let mass_diff_kg = (trial.final_mass_g - trial.initial_mass_g) / 1000.0;
    let mass_flow_rate = mass_diff_kg / trial.measurement_time_s;
    let u_mass_flow_rate =
        (mass_diff_kg / trial.measurement_time_s.powi(2) * TIME_UNCERTAINTY_S).abs();

    let volumetric_flow_m3_s = mass_flow_rate / fluid_density_kg_m3;
    let u_volumetric_flow_m3_s = u_mass_flow_rate / fluid_density_kg_m3;

    debug!(
        "trial at {} mbar: {mass_diff_kg} kg over {} s",
        trial.pressure_mbar, trial.measurement_time_s
    );

    Ok(VolumetricFlowEstimate {
        pressure_mbar: trial.pressure_mbar,
        mass_flow_rate_kg_s: mass_flow_rate,
        u_mass_flow_rate_kg_s: u_mass_flow_rate,
        volumetric_flow_ul_min: volumetric_flow_m3_s * M3_PER_S_TO_UL_PER_MIN,
        u_volumetric_flow_ul_min: u_volumetric_flow_m3_s * M3_PER_S_TO_UL_PER_MIN,
    })
}

#[cfg(test)]
mod tests {
    use crate::{Error, Result};

    use super::{reduce, MassBalanceTrial, TIME_UNCERTAINTY_S};

    #[test]
    fn golden_water_trial_reduces_to_a_round_flow_rate() -> Result<()> {
        // 10 g of water over a minute is 10 mL/min, i.e. 1e4 uL/min
        let trial = MassBalanceTrial {
            pressure_mbar: 600.0,
            measurement_time_s: 60.0,
            initial_mass_g: 0.0,
            final_mass_g: 10.0,
        };

        let estimate = reduce(&trial, 1000.0)?;

        approx::assert_relative_eq!(estimate.mass_flow_rate_kg_s, 0.01 / 60.0);
        approx::assert_relative_eq!(
            estimate.volumetric_flow_ul_min,
            10_000.0,
            max_relative = 1e-12
        );
        Ok(())
    }

    #[test]
    fn time_uncertainty_propagates_through_the_chain() -> Result<()> {
        let trial = MassBalanceTrial {
            pressure_mbar: 400.0,
            measurement_time_s: 120.0,
            initial_mass_g: 1.0,
            final_mass_g: 4.0,
        };
        let density = 913.0;

        let estimate = reduce(&trial, density)?;

        let mass_diff_kg = 3.0e-3;
        let expected_u_mass = mass_diff_kg / (120.0 * 120.0) * TIME_UNCERTAINTY_S;
        approx::assert_relative_eq!(estimate.u_mass_flow_rate_kg_s, expected_u_mass);
        approx::assert_relative_eq!(
            estimate.u_volumetric_flow_ul_min,
            expected_u_mass / density * 60.0e9
        );
        Ok(())
    }

    #[test]
    fn flow_carries_the_sign_of_the_mass_difference() -> Result<()> {
        let trial = MassBalanceTrial {
            pressure_mbar: 250.0,
            measurement_time_s: 90.0,
            initial_mass_g: 12.0,
            final_mass_g: 7.0,
        };

        let estimate = reduce(&trial, 960.0)?;

        assert!(estimate.mass_flow_rate_kg_s < 0.0);
        assert!(estimate.volumetric_flow_ul_min < 0.0);
        // Uncertainties stay magnitudes regardless of the flow sign
        assert!(estimate.u_mass_flow_rate_kg_s > 0.0);
        assert!(estimate.u_volumetric_flow_ul_min > 0.0);
        Ok(())
    }

    #[test]
    fn non_positive_measurement_times_are_rejected() {
        let trial = MassBalanceTrial {
            pressure_mbar: 100.0,
            measurement_time_s: 0.0,
            initial_mass_g: 0.0,
            final_mass_g: 1.0,
        };

        let result = reduce(&trial, 1000.0);

        assert!(matches!(
            result,
            Err(Error::NonPositiveMeasurementTime { .. })
        ));
    }
}
