use std::fs;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::instrument::InstrumentTable;
use crate::{Error, Result};

/// One working fluid, identified by its nominal viscosity.
#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Fluid {
    pub viscosity_cst: f64,
    pub density_kg_m3: f64,
}

/// Laboratory configuration: the instruments that have been characterised
/// and the working fluids with a known density.
///
/// Read from TOML of the form:
///
/// ```toml
/// [instruments."SLI-0430"]
/// full_scale = 1000.0
/// full_range = 1200.0
/// full_scale_accuracy = 0.01
/// measured_value_accuracy = 0.20
/// resolution_bits = 11
///
/// [[fluids]]
/// viscosity_cst = 5.0
/// density_kg_m3 = 913.0
/// ```
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub instruments: InstrumentTable,
    #[serde(default)]
    pub fluids: Vec<Fluid>,
}

impl Config {
    /// Configuration matching the silicone-oil series this rig was
    /// characterised with. Densities are the supplier's data-sheet values.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            instruments: InstrumentTable::builtin(),
            fluids: vec![
                Fluid {
                    viscosity_cst: 5.0,
                    density_kg_m3: 913.0,
                },
                Fluid {
                    viscosity_cst: 10.0,
                    density_kg_m3: 930.0,
                },
                Fluid {
                    viscosity_cst: 20.0,
                    density_kg_m3: 950.0,
                },
                Fluid {
                    viscosity_cst: 50.0,
                    density_kg_m3: 960.0,
                },
                Fluid {
                    viscosity_cst: 100.0,
                    density_kg_m3: 960.0,
                },
            ],
        }
    }

    /// Parse a configuration from its TOML representation.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not valid TOML for the layout above.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Read a configuration from a TOML file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&raw)?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Density of the fluid with the given nominal viscosity, kg/m^3.
    ///
    /// Lookup is exact on the viscosity key, same fail-fast policy as the
    /// instrument table.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownFluid`] if no fluid is registered at
    /// `viscosity_cst`.
    pub fn density_for(&self, viscosity_cst: f64) -> Result<f64> {
        self.fluids
            .iter()
            .find(|fluid| fluid.viscosity_cst.to_bits() == viscosity_cst.to_bits())
            .map(|fluid| fluid.density_kg_m3)
            .ok_or(Error::UnknownFluid { viscosity_cst })
    }
}
