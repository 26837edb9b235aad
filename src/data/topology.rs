use std::fmt;

use serde::Serialize;

use crate::error::{ensure_positive, PkError};

const CENTRAL_LABEL: &str = "Central Compartment";
const SUBCUTANEOUS_LABEL: &str = "Subcutaneous Compartment";

/// The role a compartment plays in the model
///
/// Each compartment of a [CompartmentTopology] maps to exactly one position in the
/// state vector. The central compartment is always first, followed by the
/// peripheral compartments in insertion order, and finally the subcutaneous depot
/// if one was added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Compartment {
    /// The central compartment, which is cleared and connected to all peripherals
    Central,
    /// A peripheral compartment, identified by its zero-indexed insertion order
    Peripheral(usize),
    /// The subcutaneous absorption depot
    SubcutaneousDepot,
}

impl fmt::Display for Compartment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Compartment::Central => write!(f, "Central"),
            Compartment::Peripheral(i) => write!(f, "Peripheral({})", i),
            Compartment::SubcutaneousDepot => write!(f, "SubcutaneousDepot"),
        }
    }
}

/// A compartment exchanging drug mass with the central compartment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeripheralCompartment {
    name: String,
    volume: f64,
    transfer_rate: f64,
}

impl PeripheralCompartment {
    /// Get the name of the compartment
    pub fn name(&self) -> &str {
        &self.name
    }
    /// Get the volume of the compartment
    pub fn volume(&self) -> f64 {
        self.volume
    }
    /// Get the transfer rate between the central compartment and this compartment
    pub fn transfer_rate(&self) -> f64 {
        self.transfer_rate
    }
}

/// Structure of a multi-compartment pharmacokinetic model
///
/// A topology always contains a central compartment, described by its clearance rate and volume.
/// Peripheral compartments and a single subcutaneous depot can be appended, but never removed.
///
/// # Example
///
/// ```
/// use pkmodel::prelude::*;
///
/// let mut topology = CompartmentTopology::new(1.0, 1.0)?;
/// topology.add_peripheral_compartment(None, 2.0, 3.0)?;
/// topology.add_subcutaneous_compartment(2.0)?;
/// assert_eq!(topology.compartment_count(), 3);
/// # Ok::<(), PkError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompartmentTopology {
    clearance_rate: f64,
    central_volume: f64,
    peripheral_compartments: Vec<PeripheralCompartment>,
    subcutaneous_absorption_rate: Option<f64>,
}

impl Default for CompartmentTopology {
    fn default() -> Self {
        CompartmentTopology {
            clearance_rate: 1.0,
            central_volume: 1.0,
            peripheral_compartments: Vec::new(),
            subcutaneous_absorption_rate: None,
        }
    }
}

impl CompartmentTopology {
    /// Create a topology with only a central compartment
    ///
    /// # Arguments
    ///
    /// * `clearance_rate` - Elimination rate from the central compartment
    /// * `central_volume` - Volume of the central compartment
    pub fn new(clearance_rate: f64, central_volume: f64) -> Result<Self, PkError> {
        Ok(CompartmentTopology {
            clearance_rate: ensure_positive("clearance_rate", clearance_rate)?,
            central_volume: ensure_positive("central_volume", central_volume)?,
            peripheral_compartments: Vec::new(),
            subcutaneous_absorption_rate: None,
        })
    }

    /// Append a peripheral compartment
    ///
    /// Unnamed compartments are called `Peripheral Compartment {k}`, where `k` is the
    /// one-indexed insertion order. Compartment labels are unique: a name already used by
    /// another peripheral compartment, or by the central or subcutaneous compartment, fails
    /// with [PkError::DuplicateLabel].
    pub fn add_peripheral_compartment(
        &mut self,
        name: Option<&str>,
        volume: f64,
        transfer_rate: f64,
    ) -> Result<&mut Self, PkError> {
        let volume = ensure_positive("volume", volume)?;
        let transfer_rate = ensure_positive("transfer_rate", transfer_rate)?;
        let name = match name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!(
                "Peripheral Compartment {}",
                self.peripheral_compartments.len() + 1
            ),
        };
        if name == CENTRAL_LABEL
            || name == SUBCUTANEOUS_LABEL
            || self.peripheral_compartments.iter().any(|p| p.name == name)
        {
            return Err(PkError::DuplicateLabel(name));
        }
        tracing::debug!(
            "Adding peripheral compartment '{}' (volume = {}, transfer rate = {})",
            name,
            volume,
            transfer_rate
        );
        self.peripheral_compartments.push(PeripheralCompartment {
            name,
            volume,
            transfer_rate,
        });
        Ok(self)
    }

    /// Install the subcutaneous depot
    ///
    /// Fails with [PkError::DuplicateCompartment] if a depot already exists.
    pub fn add_subcutaneous_compartment(
        &mut self,
        absorption_rate: f64,
    ) -> Result<&mut Self, PkError> {
        if self.subcutaneous_absorption_rate.is_some() {
            return Err(PkError::DuplicateCompartment);
        }
        let absorption_rate = ensure_positive("absorption_rate", absorption_rate)?;
        tracing::debug!(
            "Adding subcutaneous compartment (absorption rate = {})",
            absorption_rate
        );
        self.subcutaneous_absorption_rate = Some(absorption_rate);
        Ok(self)
    }

    /// Get the clearance rate of the central compartment
    pub fn clearance_rate(&self) -> f64 {
        self.clearance_rate
    }

    /// Get the volume of the central compartment
    pub fn central_volume(&self) -> f64 {
        self.central_volume
    }

    pub fn peripheral_compartments(&self) -> &[PeripheralCompartment] {
        &self.peripheral_compartments
    }

    pub fn peripheral_count(&self) -> usize {
        self.peripheral_compartments.len()
    }

    /// Get the absorption rate of the subcutaneous depot, if there is one
    pub fn subcutaneous_absorption_rate(&self) -> Option<f64> {
        self.subcutaneous_absorption_rate
    }

    pub fn is_subcutaneous(&self) -> bool {
        self.subcutaneous_absorption_rate.is_some()
    }

    /// Total number of compartments, which is also the length of the state vector
    pub fn compartment_count(&self) -> usize {
        1 + self.peripheral_compartments.len() + usize::from(self.is_subcutaneous())
    }

    /// All compartments, in state vector order
    pub fn compartments(&self) -> Vec<Compartment> {
        let mut compartments = Vec::with_capacity(self.compartment_count());
        compartments.push(Compartment::Central);
        compartments.extend((0..self.peripheral_compartments.len()).map(Compartment::Peripheral));
        if self.is_subcutaneous() {
            compartments.push(Compartment::SubcutaneousDepot);
        }
        compartments
    }

    /// Position of a compartment in the state vector
    pub fn index_of(&self, compartment: Compartment) -> Option<usize> {
        match compartment {
            Compartment::Central => Some(0),
            Compartment::Peripheral(i) if i < self.peripheral_compartments.len() => Some(i + 1),
            Compartment::Peripheral(_) => None,
            Compartment::SubcutaneousDepot if self.is_subcutaneous() => {
                Some(self.compartment_count() - 1)
            }
            Compartment::SubcutaneousDepot => None,
        }
    }

    /// The compartment receiving exogenous drug input
    ///
    /// This is the depot when the model is subcutaneous, and the central compartment otherwise.
    pub fn dosing_compartment(&self) -> Compartment {
        if self.is_subcutaneous() {
            Compartment::SubcutaneousDepot
        } else {
            Compartment::Central
        }
    }

    /// Human readable name of a compartment
    pub fn label(&self, compartment: Compartment) -> Option<String> {
        match compartment {
            Compartment::Central => Some(CENTRAL_LABEL.to_string()),
            Compartment::Peripheral(i) => self
                .peripheral_compartments
                .get(i)
                .map(|p| p.name.clone()),
            Compartment::SubcutaneousDepot => self
                .is_subcutaneous()
                .then(|| SUBCUTANEOUS_LABEL.to_string()),
        }
    }

    /// Labels of all compartments, in state vector order
    pub fn labels(&self) -> Vec<String> {
        self.compartments()
            .into_iter()
            .filter_map(|c| self.label(c))
            .collect()
    }

    /// Volume of a compartment
    ///
    /// The subcutaneous depot has no volume, and returns `None`.
    pub fn volume(&self, compartment: Compartment) -> Option<f64> {
        match compartment {
            Compartment::Central => Some(self.central_volume),
            Compartment::Peripheral(i) => self.peripheral_compartments.get(i).map(|p| p.volume),
            Compartment::SubcutaneousDepot => None,
        }
    }
}

impl fmt::Display for CompartmentTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}\t|\t vol: {}\t|\t clearance: {}",
            CENTRAL_LABEL, self.central_volume, self.clearance_rate
        )?;
        for p in &self.peripheral_compartments {
            writeln!(
                f,
                "{}\t|\t vol: {}\t|\t transfer: {}",
                p.name, p.volume, p.transfer_rate
            )?;
        }
        if let Some(ka) = self.subcutaneous_absorption_rate {
            writeln!(f, "{}\t|\t absorption: {}", SUBCUTANEOUS_LABEL, ka)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_topology() {
        let topology = CompartmentTopology::default();
        assert_eq!(topology.clearance_rate(), 1.0);
        assert_eq!(topology.central_volume(), 1.0);
        assert_eq!(topology.peripheral_count(), 0);
        assert_eq!(topology.subcutaneous_absorption_rate(), None);
        assert_eq!(topology.compartment_count(), 1);
    }

    #[test]
    fn test_rejects_non_positive_parameters() {
        for (cl, vc) in [(0.0, 1.0), (1.0, 0.0), (-1.0, 1.0), (1.0, f64::NAN)] {
            match CompartmentTopology::new(cl, vc) {
                Err(PkError::InvalidParameter { .. }) => {}
                other => panic!("expected InvalidParameter, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_peripheral_naming() {
        let mut topology = CompartmentTopology::default();
        topology
            .add_peripheral_compartment(Some("per comp 1"), 11.0, 12.0)
            .unwrap()
            .add_peripheral_compartment(Some("some cell"), 21.0, 22.0)
            .unwrap()
            .add_peripheral_compartment(None, 1.0, 1.0)
            .unwrap();
        let names: Vec<&str> = topology
            .peripheral_compartments()
            .iter()
            .map(|p| p.name())
            .collect();
        assert_eq!(names, vec!["per comp 1", "some cell", "Peripheral Compartment 3"]);
        assert_eq!(topology.compartment_count(), 4);
        assert_eq!(topology.peripheral_compartments()[1].volume(), 21.0);
        assert_eq!(topology.peripheral_compartments()[1].transfer_rate(), 22.0);
    }

    #[test]
    fn test_invalid_peripheral_leaves_topology_unchanged() {
        let mut topology = CompartmentTopology::default();
        assert!(topology.add_peripheral_compartment(None, -1.0, 1.0).is_err());
        assert!(topology.add_peripheral_compartment(None, 1.0, 0.0).is_err());
        assert_eq!(topology.compartment_count(), 1);
    }

    #[test]
    fn test_compartment_labels_are_unique() {
        let mut topology = CompartmentTopology::default();
        topology
            .add_peripheral_compartment(Some("Peripheral Compartment 2"), 1.0, 1.0)
            .unwrap();
        for name in [
            Some("Central Compartment"),
            Some("Subcutaneous Compartment"),
            Some("Peripheral Compartment 2"),
            // Auto-named second compartment collides with the first
            None,
        ] {
            assert!(matches!(
                topology.add_peripheral_compartment(name, 1.0, 1.0),
                Err(PkError::DuplicateLabel(_))
            ));
        }
        assert_eq!(topology.peripheral_count(), 1);
    }

    #[test]
    fn test_duplicate_subcutaneous() {
        let mut topology = CompartmentTopology::default();
        topology.add_subcutaneous_compartment(2.0).unwrap();
        assert_eq!(topology.compartment_count(), 2);
        assert!(matches!(
            topology.add_subcutaneous_compartment(1.0),
            Err(PkError::DuplicateCompartment)
        ));
        topology.add_peripheral_compartment(None, 1.0, 1.0).unwrap();
        assert!(matches!(
            topology.add_subcutaneous_compartment(3.0),
            Err(PkError::DuplicateCompartment)
        ));
        assert_eq!(topology.subcutaneous_absorption_rate(), Some(2.0));
    }

    #[test]
    fn test_layout_keeps_depot_last() {
        let mut topology = CompartmentTopology::default();
        topology.add_subcutaneous_compartment(2.0).unwrap();
        topology.add_peripheral_compartment(None, 1.0, 1.0).unwrap();
        topology.add_peripheral_compartment(None, 1.0, 1.0).unwrap();

        assert_eq!(
            topology.compartments(),
            vec![
                Compartment::Central,
                Compartment::Peripheral(0),
                Compartment::Peripheral(1),
                Compartment::SubcutaneousDepot
            ]
        );
        assert_eq!(topology.index_of(Compartment::SubcutaneousDepot), Some(3));
        assert_eq!(topology.index_of(Compartment::Peripheral(1)), Some(2));
        assert_eq!(topology.index_of(Compartment::Peripheral(2)), None);
        assert_eq!(topology.dosing_compartment(), Compartment::SubcutaneousDepot);
        assert_eq!(topology.volume(Compartment::SubcutaneousDepot), None);
        assert_eq!(
            topology.labels(),
            vec![
                "Central Compartment",
                "Peripheral Compartment 1",
                "Peripheral Compartment 2",
                "Subcutaneous Compartment"
            ]
        );
    }

    #[test]
    fn test_intravenous_doses_central() {
        let topology = CompartmentTopology::default();
        assert_eq!(topology.dosing_compartment(), Compartment::Central);
        assert_eq!(topology.index_of(Compartment::SubcutaneousDepot), None);
    }
}
