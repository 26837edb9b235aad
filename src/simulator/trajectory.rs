use std::fmt;
use std::io::Write;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::data::{Compartment, CompartmentTopology};
use crate::error::PkError;

/// Drug mass in every compartment, sampled at a sequence of time points
///
/// States are stored with one row per time point and one column per compartment, in the
/// state vector order of the [CompartmentTopology] that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    times: Vec<f64>,
    states: Array2<f64>,
    compartments: Vec<Compartment>,
    labels: Vec<String>,
    volumes: Vec<Option<f64>>,
}

impl Trajectory {
    pub(crate) fn new(
        topology: &CompartmentTopology,
        times: Vec<f64>,
        states: Array2<f64>,
    ) -> Self {
        debug_assert_eq!(states.nrows(), times.len());
        debug_assert_eq!(states.ncols(), topology.compartment_count());
        let compartments = topology.compartments();
        let labels = topology.labels();
        let volumes = compartments.iter().map(|&c| topology.volume(c)).collect();
        Trajectory {
            times,
            states,
            compartments,
            labels,
            volumes,
        }
    }

    /// Get the sampled time points
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Get the matrix of drug masses, with one row per time point
    pub fn states(&self) -> &Array2<f64> {
        &self.states
    }

    /// Get the compartments, in column order
    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    /// Get the compartment labels, in column order
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Number of time points
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Drug mass over time in the compartment at state vector position `index`
    pub fn compartment(&self, index: usize) -> Option<ArrayView1<'_, f64>> {
        (index < self.states.ncols()).then(|| self.states.column(index))
    }

    /// Drug mass over time in the compartment labelled `name`
    pub fn by_name(&self, name: &str) -> Result<ArrayView1<'_, f64>, PkError> {
        self.labels
            .iter()
            .position(|label| label == name)
            .map(|index| self.states.column(index))
            .ok_or_else(|| PkError::UnknownCompartment(name.to_string()))
    }

    /// Drug mass over time in the central compartment
    pub fn central(&self) -> ArrayView1<'_, f64> {
        self.states.column(0)
    }

    /// The full state vector at the `row`-th time point
    pub fn state_at(&self, row: usize) -> Option<ArrayView1<'_, f64>> {
        (row < self.states.nrows()).then(|| self.states.row(row))
    }

    /// Drug concentration over time in the compartment at position `index`
    ///
    /// Returns `None` for the subcutaneous depot, which has no volume.
    pub fn concentration(&self, index: usize) -> Option<Array1<f64>> {
        let volume = (*self.volumes.get(index)?)?;
        Some(self.states.column(index).mapv(|mass| mass / volume))
    }

    /// Total drug mass in the system at each time point
    pub fn total_mass(&self) -> Array1<f64> {
        self.states.sum_axis(Axis(1))
    }

    /// Write the trajectory as CSV, with a `time` column followed by one column per compartment
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), PkError> {
        let mut writer = csv::Writer::from_writer(writer);
        let mut header = Vec::with_capacity(self.labels.len() + 1);
        header.push("time");
        header.extend(self.labels.iter().map(String::as_str));
        writer.write_record(&header)?;
        for (time, row) in self.times.iter().zip(self.states.rows()) {
            let mut record = Vec::with_capacity(row.len() + 1);
            record.push(time.to_string());
            record.extend(row.iter().map(|mass| mass.to_string()));
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the trajectory to a CSV file at `path`
    pub fn to_csv(&self, path: impl AsRef<Path>) -> Result<(), PkError> {
        let file = std::fs::File::create(path)?;
        self.write_csv(file)
    }
}

impl fmt::Display for Trajectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "time")?;
        for label in &self.labels {
            write!(f, "\t{}", label)?;
        }
        writeln!(f)?;
        for (time, row) in self.times.iter().zip(self.states.rows()) {
            write!(f, "{:.4}", time)?;
            for mass in row {
                write!(f, "\t{:.4}", mass)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
