use rayon::prelude::*;

use super::integrator::SolverSettings;
use super::solver::TrajectorySolver;
use super::trajectory::Trajectory;
use crate::data::{CompartmentTopology, DosingProtocol};
use crate::error::PkError;

/// A self-contained simulation problem
///
/// Scenarios own their topology and protocol, so many of them can be solved in parallel.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub topology: CompartmentTopology,
    pub protocol: DosingProtocol,
    pub initial_state: Option<Vec<f64>>,
    pub time_points: Vec<f64>,
    pub settings: SolverSettings,
}

impl Scenario {
    pub fn new(
        topology: CompartmentTopology,
        protocol: DosingProtocol,
        time_points: Vec<f64>,
    ) -> Self {
        Scenario {
            topology,
            protocol,
            initial_state: None,
            time_points,
            settings: SolverSettings::default(),
        }
    }

    pub fn with_initial_state(mut self, initial_state: Vec<f64>) -> Self {
        self.initial_state = Some(initial_state);
        self
    }

    pub fn with_settings(mut self, settings: SolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn solve(&self) -> Result<Trajectory, PkError> {
        let mut solver =
            TrajectorySolver::new(&self.topology, &self.protocol).with_settings(self.settings);
        Ok(solver
            .solve(self.initial_state.as_deref(), &self.time_points)?
            .clone())
    }
}

/// Solve independent scenarios in parallel
///
/// Results are returned in the order of `scenarios`. A failing scenario does not affect the others.
pub fn solve_all(scenarios: &[Scenario]) -> Vec<Result<Trajectory, PkError>> {
    tracing::debug!("Solving {} scenarios in parallel", scenarios.len());
    scenarios.par_iter().map(Scenario::solve).collect()
}
