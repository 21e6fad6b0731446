use log::{debug, warn};
use ndarray::{Array1, ScalarOperand};
use ndarray_linalg::{Inverse, Lapack, OperationNorm, Scalar};
use num_traits::Float;
use serde::Serialize;
use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::correction::CorrectionObservation;
use crate::math::{mean, vandermonde};
use crate::{Error, Result};

/// Largest acceptable 1-norm condition estimate for the normal matrix.
///
/// Beyond this the inverse is numerically unstable and the fit is refused
/// rather than reported with meaningless parameters.
const CONDITION_LIMIT: f64 = 1e8;

/// Ordinary least-squares straight line through a set of observations.
///
/// Confidence half-widths are 95% and use the Student-t quantile at the
/// fit's degrees of freedom, so they stay honest for the small datasets a
/// calibration run produces.
#[derive(Clone, Copy, Debug)]
pub struct LinearFit<E> {
    pub intercept: E,
    pub slope: E,
    pub intercept_ci95_halfwidth: E,
    pub slope_ci95_halfwidth: E,
    pub r_squared: E,
    pub degrees_of_freedom: usize,
}

/// Fit `y ~ intercept + slope * x` by ordinary least squares.
///
/// The design matrix is the degree-one Vandermonde matrix, the estimator the
/// textbook normal-equation solution `(X^T X)^-1 X^T y` with
/// `sigma^2 = SSE / (n - 2)` and parameter covariance
/// `sigma^2 (X^T X)^-1`.
///
/// # Errors
///
/// Returns [`Error::DegenerateFit`] for fewer than three observations, a
/// zero-variance predictor, or a normal matrix whose condition estimate
/// exceeds [`CONDITION_LIMIT`].
pub fn linfit<E>(x: &[E], y: &[E]) -> Result<LinearFit<E>>
where
    E: Float + Lapack + Scalar<Real = E> + ScalarOperand,
{
    let n = x.len();
    if n < 3 {
        return Err(Error::DegenerateFit {
            observations: n,
            reason: "a two-parameter fit needs at least 3 observations".to_owned(),
        });
    }
    if x.iter().all(|xi| *xi == x[0]) {
        return Err(Error::DegenerateFit {
            observations: n,
            reason: "predictor has zero variance".to_owned(),
        });
    }

    let design = vandermonde(x, 1)?;
    let response = Array1::from_iter(y.iter().copied());

    let normal = design.t().dot(&design);
    let inverse = normal.inv().map_err(|_| Error::DegenerateFit {
        observations: n,
        reason: "normal matrix is singular".to_owned(),
    })?;

    let condition = normal.opnorm_one()? * inverse.opnorm_one()?;
    if condition > E::from(CONDITION_LIMIT).expect("condition limit must fit in the scalar type") {
        return Err(Error::DegenerateFit {
            observations: n,
            reason: format!("normal matrix is ill-conditioned (estimate {condition:e})"),
        });
    }

    let beta = inverse.dot(&design.t().dot(&response));
    let predicted = design.dot(&beta);
    let residuals = &response - &predicted;

    let sse = residuals
        .iter()
        .fold(E::zero(), |acc, &r| acc + Scalar::powi(r, 2));
    let degrees_of_freedom = n - 2;
    let sigma_squared =
        sse / E::from(degrees_of_freedom).expect("dof must fit in the scalar type");
    let covariance = &inverse * sigma_squared;

    let response_mean = mean(y);
    let sst = y
        .iter()
        .fold(E::zero(), |acc, &yi| acc + Scalar::powi(yi - response_mean, 2));
    let r_squared = (sst - sse) / sst;

    let t: E = student_t_quantile(degrees_of_freedom)?;

    debug!("fit over {n} observations, condition estimate {condition:e}");

    Ok(LinearFit {
        intercept: beta[0],
        slope: beta[1],
        intercept_ci95_halfwidth: t * Float::sqrt(covariance[[0, 0]]),
        slope_ci95_halfwidth: t * Float::sqrt(covariance[[1, 1]]),
        r_squared,
        degrees_of_freedom,
    })
}

/// Two-sided 95% Student-t quantile at `degrees_of_freedom`.
///
/// A fixed 1.96 normal multiplier would understate the interval for the
/// handful of setpoints a run produces; at 3 observations the factor is
/// above 12.
#[allow(clippy::cast_precision_loss)]
fn student_t_quantile<E: Float>(degrees_of_freedom: usize) -> Result<E> {
    let distribution =
        StudentsT::new(0.0, 1.0, degrees_of_freedom as f64).map_err(|_| Error::DegenerateFit {
            observations: degrees_of_freedom + 2,
            reason: "no degrees of freedom remain for the confidence interval".to_owned(),
        })?;
    Ok(E::from(distribution.inverse_cdf(0.975)).expect("quantile must fit in the scalar type"))
}

/// Output of fitting one test condition's paired dataset.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct CorrectionModel {
    pub intercept: f64,
    pub slope: f64,
    pub intercept_ci95_halfwidth: f64,
    pub slope_ci95_halfwidth: f64,
    pub intercept_rel_uncertainty_pct: f64,
    pub slope_rel_uncertainty_pct: f64,
    pub r_squared: f64,
}

/// Fit the correction law `reference ~ intercept + slope * measured`.
///
/// The observation uncertainties ride along for reporting; the fit itself is
/// unweighted.
///
/// # Errors
///
/// Returns [`Error::DegenerateFit`] under the same conditions as [`linfit`].
pub fn fit(observations: &[CorrectionObservation]) -> Result<CorrectionModel> {
    let measured: Vec<f64> = observations
        .iter()
        .map(|obs| obs.measured_flow_ul_min)
        .collect();
    let reference: Vec<f64> = observations
        .iter()
        .map(|obs| obs.reference_flow_ul_min)
        .collect();

    let fit = linfit(&measured, &reference)?;

    Ok(CorrectionModel {
        intercept: fit.intercept,
        slope: fit.slope,
        intercept_ci95_halfwidth: fit.intercept_ci95_halfwidth,
        slope_ci95_halfwidth: fit.slope_ci95_halfwidth,
        intercept_rel_uncertainty_pct: relative_pct(fit.intercept_ci95_halfwidth, fit.intercept),
        slope_rel_uncertainty_pct: relative_pct(fit.slope_ci95_halfwidth, fit.slope),
        r_squared: fit.r_squared,
    })
}

/// Relative uncertainty of an estimate, in percent.
///
/// Undefined for an exactly-zero estimate; reported as NaN with a warning
/// rather than dividing through silently.
pub(crate) fn relative_pct(half_width: f64, estimate: f64) -> f64 {
    if estimate == 0.0 {
        warn!("relative uncertainty is undefined for a zero estimate");
        return f64::NAN;
    }
    (half_width / estimate).abs() * 100.0
}
