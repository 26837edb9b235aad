//! JSON configuration of a complete simulation
//!
//! A [ModelConfig] describes a topology, a dosing protocol, and optionally the solver
//! settings and evaluation grid. Building the model replays the same validated operations
//! as the programmatic API, so an invalid configuration fails with the same errors.
//!
//! ```
//! use pkmodel::prelude::*;
//!
//! let config = ModelConfig::from_json(r#"{
//!     "topology": {
//!         "clearance_rate": 1.0,
//!         "central_volume": 1.0,
//!         "peripherals": [{ "name": "Compartment 1", "volume": 2.0, "transfer_rate": 3.0 }],
//!         "subcutaneous": { "absorption_rate": 2.0 }
//!     },
//!     "protocol": {
//!         "dose_amount": 1.0,
//!         "continuous": { "start": 0.0, "end": 0.5 }
//!     }
//! }"#)?;
//!
//! let topology = config.build_topology()?;
//! assert_eq!(topology.compartment_count(), 3);
//! # Ok::<(), PkError>(())
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::data::{CompartmentTopology, DosingProtocol};
use crate::error::PkError;
use crate::simulator::{time_grid, SolverSettings};

fn one() -> f64 {
    1.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeripheralConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "one")]
    pub volume: f64,
    #[serde(default = "one")]
    pub transfer_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubcutaneousConfig {
    #[serde(default = "one")]
    pub absorption_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologyConfig {
    #[serde(default = "one")]
    pub clearance_rate: f64,
    #[serde(default = "one")]
    pub central_volume: f64,
    #[serde(default)]
    pub peripherals: Vec<PeripheralConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcutaneous: Option<SubcutaneousConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WindowConfig {
    pub start: f64,
    pub end: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolConfig {
    #[serde(default = "one")]
    pub dose_amount: f64,
    #[serde(default)]
    pub instantaneous: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continuous: Option<WindowConfig>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        ProtocolConfig {
            dose_amount: 1.0,
            instantaneous: Vec::new(),
            continuous: None,
        }
    }
}

/// Evenly spaced evaluation grid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeConfig {
    pub start: f64,
    pub end: f64,
    pub points: usize,
}

impl Default for TimeConfig {
    fn default() -> Self {
        TimeConfig {
            start: 0.0,
            end: 1.0,
            points: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    pub topology: TopologyConfig,
    #[serde(default)]
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub solver: SolverSettings,
    #[serde(default)]
    pub time: TimeConfig,
}

impl ModelConfig {
    pub fn from_json(json: &str) -> Result<Self, PkError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PkError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn to_json(&self) -> Result<String, PkError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Describe an existing topology and protocol
    pub fn from_model(topology: &CompartmentTopology, protocol: &DosingProtocol) -> Self {
        ModelConfig {
            topology: TopologyConfig {
                clearance_rate: topology.clearance_rate(),
                central_volume: topology.central_volume(),
                peripherals: topology
                    .peripheral_compartments()
                    .iter()
                    .map(|p| PeripheralConfig {
                        name: Some(p.name().to_string()),
                        volume: p.volume(),
                        transfer_rate: p.transfer_rate(),
                    })
                    .collect(),
                subcutaneous: topology
                    .subcutaneous_absorption_rate()
                    .map(|absorption_rate| SubcutaneousConfig { absorption_rate }),
            },
            protocol: ProtocolConfig {
                dose_amount: protocol.dose_amount(),
                instantaneous: protocol.instantaneous_times().to_vec(),
                continuous: protocol.continuous_window().map(|w| WindowConfig {
                    start: w.start(),
                    end: w.end(),
                }),
            },
            solver: SolverSettings::default(),
            time: TimeConfig::default(),
        }
    }

    pub fn build_topology(&self) -> Result<CompartmentTopology, PkError> {
        let config = &self.topology;
        let mut topology = CompartmentTopology::new(config.clearance_rate, config.central_volume)?;
        for peripheral in &config.peripherals {
            topology.add_peripheral_compartment(
                peripheral.name.as_deref(),
                peripheral.volume,
                peripheral.transfer_rate,
            )?;
        }
        if let Some(subcutaneous) = &config.subcutaneous {
            topology.add_subcutaneous_compartment(subcutaneous.absorption_rate)?;
        }
        Ok(topology)
    }

    pub fn build_protocol(&self) -> Result<DosingProtocol, PkError> {
        let config = &self.protocol;
        let mut protocol = DosingProtocol::new(config.dose_amount)?;
        for &t in &config.instantaneous {
            protocol.add_instantaneous(t)?;
        }
        if let Some(window) = config.continuous {
            protocol.enable_continuous(window.start, window.end)?;
        }
        Ok(protocol)
    }

    pub fn time_points(&self) -> Result<Vec<f64>, PkError> {
        time_grid(self.time.start, self.time.end, self.time.points)
    }
}
