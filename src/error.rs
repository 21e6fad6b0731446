use thiserror::Error;

/// Failure modes of the reduction and fitting pipeline.
///
/// Every variant is a deterministic data or configuration defect: nothing
/// here is transient, so no retry policy applies. Each carries enough context
/// (pressure, device identifier, dataset size) to diagnose the offending
/// input without re-running the reduction.
#[derive(Debug, Error)]
pub enum Error {
    #[error("no instrument spec registered for device `{device}`")]
    UnknownInstrument { device: String },

    #[error("no density registered for fluid viscosity {viscosity_cst} cSt")]
    UnknownFluid { viscosity_cst: f64 },

    #[error(
        "series at {pressure_mbar} mbar has {count} sample(s); \
         the statistical term needs at least 2"
    )]
    InsufficientSamples { pressure_mbar: f64, count: usize },

    #[error(
        "mass-balance trial at {pressure_mbar} mbar has non-positive \
         measurement time {time_s} s"
    )]
    NonPositiveMeasurementTime { pressure_mbar: f64, time_s: f64 },

    #[error("degenerate fit over {observations} observation(s): {reason}")]
    DegenerateFit {
        observations: usize,
        reason: String,
    },

    #[error("pressure {pressure_mbar} mbar has no {missing} counterpart during pairing")]
    MismatchedPairing {
        pressure_mbar: f64,
        missing: &'static str,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Linalg(#[from] ndarray_linalg::error::LinalgError),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}
