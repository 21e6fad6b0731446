//! Tabular input and output.
//!
//! The raw inputs are the per-pressure sample export from the sensor viewer
//! software and the hand-entered mass-balance sheet; the outputs are the
//! reduced estimate tables and the per-condition correction summary. Callers
//! locate the files and supply the keys: nothing here walks directories or
//! derives keys from file names.

use std::fs;
use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::correction::{CorrectionObservation, TestCondition};
use crate::gravimetric::MassBalanceTrial;
use crate::linfit::CorrectionModel;
use crate::series::{FlowEstimate, SampleSeries};
use crate::Result;

/// A row of the sensor viewer export: sample number, relative time in
/// seconds, flow in uL/min. Only the flow column feeds the reduction.
#[derive(Deserialize)]
struct SampleRow {
    #[serde(rename = "sample")]
    _sample: u64,
    #[serde(rename = "relative_time_s")]
    _relative_time_s: f64,
    flow_ul_min: f64,
}

/// Read one per-pressure sample export into a series.
///
/// The pressure setpoint is not recorded in the export itself, so the caller
/// supplies it alongside the path.
///
/// # Errors
///
/// Returns an error if the file cannot be read, a row fails to parse, or the
/// export holds no samples.
pub fn read_sample_series(path: &Path, pressure_mbar: f64) -> Result<SampleSeries> {
    let file = fs::read(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(&file[..]);

    let mut samples = vec![];
    for record in rdr.deserialize() {
        let row: SampleRow = record?;
        samples.push(row.flow_ul_min);
    }

    debug!(
        "read {} samples at {pressure_mbar} mbar from {}",
        samples.len(),
        path.display()
    );

    SampleSeries::new(pressure_mbar, samples)
}

/// Read a hand-entered mass-balance sheet.
///
/// Expected headers: `pressure_mbar`, `measurement_time_s`, `initial_mass_g`,
/// `final_mass_g`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a row fails to parse.
pub fn read_mass_balance_trials(path: &Path) -> Result<Vec<MassBalanceTrial>> {
    let file = fs::read(path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(&file[..]);

    let mut trials = vec![];
    for record in rdr.deserialize() {
        let trial: MassBalanceTrial = record?;
        trials.push(trial);
    }

    debug!("read {} trials from {}", trials.len(), path.display());

    Ok(trials)
}

/// Write reduced flow estimates, sorted by pressure for presentation.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_flow_estimates(path: &Path, estimates: &[FlowEstimate]) -> Result<()> {
    let mut rows = estimates.to_vec();
    rows.sort_by(|a, b| {
        a.pressure_mbar
            .partial_cmp(&b.pressure_mbar)
            .expect("pressure setpoints must be finite")
    });

    let mut wtr = csv::Writer::from_path(path)?;
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write one condition's paired observations, in their pressure order.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_observations(path: &Path, observations: &[CorrectionObservation]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for row in observations {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct SummaryRow {
    viscosity_cst: f64,
    direction: crate::correction::FlowDirection,
    intercept: f64,
    intercept_ci95_halfwidth: f64,
    intercept_rel_uncertainty_pct: f64,
    slope: f64,
    slope_ci95_halfwidth: f64,
    slope_rel_uncertainty_pct: f64,
    r_squared: f64,
}

/// Write the fitted correction coefficients for a set of test conditions,
/// sorted in ascending viscosity.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_correction_summary(
    path: &Path,
    models: &[(TestCondition, CorrectionModel)],
) -> Result<()> {
    let mut rows: Vec<SummaryRow> = models
        .iter()
        .map(|(condition, model)| SummaryRow {
            viscosity_cst: condition.viscosity_cst,
            direction: condition.direction,
            intercept: model.intercept,
            intercept_ci95_halfwidth: model.intercept_ci95_halfwidth,
            intercept_rel_uncertainty_pct: model.intercept_rel_uncertainty_pct,
            slope: model.slope,
            slope_ci95_halfwidth: model.slope_ci95_halfwidth,
            slope_rel_uncertainty_pct: model.slope_rel_uncertainty_pct,
            r_squared: model.r_squared,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.viscosity_cst
            .partial_cmp(&b.viscosity_cst)
            .expect("viscosities must be finite")
    });

    let mut wtr = csv::Writer::from_path(path)?;
    for row in &rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
