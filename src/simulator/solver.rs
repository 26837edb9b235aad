use std::time::Instant;

use super::integrator::{BdfIntegrator, BolusMode, Impulse, Integrator, SolverSettings};
use super::rate::RateFunction;
use super::trajectory::Trajectory;
use crate::data::{CompartmentTopology, DosingProtocol};
use crate::error::PkError;

/// `n` evenly spaced time points from `start` to `end`, both included
pub fn time_grid(start: f64, end: f64, n: usize) -> Result<Vec<f64>, PkError> {
    if !start.is_finite() || !end.is_finite() || end < start {
        return Err(PkError::InvalidTimePoints(format!(
            "cannot build a grid from {} to {}",
            start, end
        )));
    }
    match n {
        0 => Err(PkError::InvalidTimePoints(
            "a time grid needs at least one point".to_string(),
        )),
        1 => Ok(vec![start]),
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut grid: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            grid[n - 1] = end;
            Ok(grid)
        }
    }
}

/// Integrates a compartmental model over time
///
/// The solver borrows its [CompartmentTopology] and [DosingProtocol], so neither can be
/// mutated while the solver is alive. Each successful call to [TrajectorySolver::solve]
/// replaces the stored [Trajectory].
///
/// # Example
///
/// ```
/// use pkmodel::prelude::*;
///
/// let mut topology = CompartmentTopology::new(1.0, 1.0)?;
/// topology.add_peripheral_compartment(None, 1.0, 1.0)?;
/// let mut protocol = DosingProtocol::new(1.0)?;
/// protocol.enable_continuous(0.0, 2.0)?;
///
/// let mut solver = TrajectorySolver::new(&topology, &protocol);
/// let trajectory = solver.solve(None, &time_grid(0.0, 1.0, 5)?)?;
/// assert_eq!(trajectory.len(), 5);
/// # Ok::<(), PkError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TrajectorySolver<'a> {
    topology: &'a CompartmentTopology,
    protocol: &'a DosingProtocol,
    settings: SolverSettings,
    trajectory: Option<Trajectory>,
}

impl<'a> TrajectorySolver<'a> {
    pub fn new(topology: &'a CompartmentTopology, protocol: &'a DosingProtocol) -> Self {
        Self {
            topology,
            protocol,
            settings: SolverSettings::default(),
            trajectory: None,
        }
    }

    pub fn with_settings(mut self, settings: SolverSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    pub fn topology(&self) -> &CompartmentTopology {
        self.topology
    }

    pub fn protocol(&self) -> &DosingProtocol {
        self.protocol
    }

    /// The right-hand side this solver integrates
    pub fn rate_function(&self) -> RateFunction {
        let rate = RateFunction::new(self.topology, self.protocol);
        match self.settings.bolus_mode {
            BolusMode::RateTerm => rate,
            BolusMode::StateJump => rate.without_instantaneous(),
        }
    }

    /// The trajectory of the last successful solve
    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_ref()
    }

    pub fn into_trajectory(self) -> Option<Trajectory> {
        self.trajectory
    }

    /// Integrate the model with the BDF integrator configured by the solver settings
    ///
    /// `initial_state` defaults to all compartments being empty. The integration starts at
    /// the first of `time_points`, which must be sorted.
    pub fn solve(
        &mut self,
        initial_state: Option<&[f64]>,
        time_points: &[f64],
    ) -> Result<&Trajectory, PkError> {
        let integrator = BdfIntegrator::new(self.settings);
        self.solve_with(&integrator, initial_state, time_points)
    }

    /// Integrate the model with any [Integrator]
    pub fn solve_with<I: Integrator>(
        &mut self,
        integrator: &I,
        initial_state: Option<&[f64]>,
        time_points: &[f64],
    ) -> Result<&Trajectory, PkError> {
        let nstates = self.topology.compartment_count();
        validate_time_points(time_points)?;
        let initial_state = match initial_state {
            Some(state) => {
                validate_initial_state(state, nstates)?;
                state.to_vec()
            }
            None => vec![0.0; nstates],
        };
        let impulses = self.impulses(time_points);

        tracing::info!(
            "Solving {} compartment model over {} time points",
            nstates,
            time_points.len()
        );
        let now = Instant::now();
        let states = integrator
            .integrate(&self.rate_function(), &initial_state, time_points, &impulses)
            .inspect_err(|err| tracing::error!("Integration failed: {}", err))?;
        tracing::info!("Integration complete after {:.2?}", now.elapsed());

        let expected = (time_points.len(), nstates);
        if states.dim() != expected {
            let err = PkError::IntegrationFailure(format!(
                "integrator returned a {:?} state matrix, expected {:?}",
                states.dim(),
                expected
            ));
            tracing::error!("{}", err);
            return Err(err);
        }

        let trajectory = Trajectory::new(self.topology, time_points.to_vec(), states);
        Ok(self.trajectory.insert(trajectory))
    }

    fn impulses(&self, time_points: &[f64]) -> Vec<Impulse> {
        if self.settings.bolus_mode != BolusMode::StateJump {
            return Vec::new();
        }
        let (Some(&first), Some(&last)) = (time_points.first(), time_points.last()) else {
            return Vec::new();
        };
        let index = self
            .topology
            .index_of(self.topology.dosing_compartment())
            .unwrap_or(0);
        self.protocol
            .instantaneous_times()
            .iter()
            .filter(|&&time| {
                let inside = first <= time && time <= last;
                if !inside {
                    tracing::warn!(
                        "Instantaneous dose at t = {} is outside [{}, {}] and is ignored",
                        time,
                        first,
                        last
                    );
                }
                inside
            })
            .map(|&time| Impulse {
                time,
                index,
                amount: self.protocol.dose_amount(),
            })
            .collect()
    }
}

fn validate_time_points(time_points: &[f64]) -> Result<(), PkError> {
    if time_points.is_empty() {
        return Err(PkError::InvalidTimePoints(
            "at least one time point is required".to_string(),
        ));
    }
    if let Some(t) = time_points.iter().find(|t| !t.is_finite()) {
        return Err(PkError::InvalidTimePoints(format!(
            "time point {} is not finite",
            t
        )));
    }
    if let Some(pair) = time_points.windows(2).find(|pair| pair[1] < pair[0]) {
        return Err(PkError::InvalidTimePoints(format!(
            "time points must be sorted, but {} comes after {}",
            pair[1], pair[0]
        )));
    }
    Ok(())
}

fn validate_initial_state(state: &[f64], nstates: usize) -> Result<(), PkError> {
    if state.len() != nstates {
        return Err(PkError::InvalidInitialState(format!(
            "expected {} values, one per compartment, got {}",
            nstates,
            state.len()
        )));
    }
    if let Some((index, value)) = state
        .iter()
        .enumerate()
        .find(|(_, value)| !value.is_finite() || **value < 0.0)
    {
        return Err(PkError::InvalidInitialState(format!(
            "drug mass in compartment {} must be a non-negative number, got {}",
            index, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::Array2;

    struct EmptyIntegrator;

    impl Integrator for EmptyIntegrator {
        fn integrate(
            &self,
            _rate: &RateFunction,
            _initial_state: &[f64],
            _time_points: &[f64],
            _impulses: &[Impulse],
        ) -> Result<Array2<f64>, PkError> {
            Ok(Array2::zeros((0, 0)))
        }
    }

    #[test]
    fn test_time_grid() {
        assert_eq!(
            time_grid(0.0, 1.0, 5).unwrap(),
            vec![0.0, 0.25, 0.5, 0.75, 1.0]
        );
        assert_eq!(time_grid(2.0, 3.0, 1).unwrap(), vec![2.0]);
        assert!(time_grid(0.0, 1.0, 0).is_err());
        assert!(time_grid(1.0, 0.0, 3).is_err());
        assert!(time_grid(0.0, f64::INFINITY, 3).is_err());
    }

    #[test]
    fn test_validate_time_points() {
        assert!(validate_time_points(&[0.0, 0.5, 0.5, 1.0]).is_ok());
        for bad in [vec![], vec![0.0, f64::NAN], vec![1.0, 0.0]] {
            assert!(matches!(
                validate_time_points(&bad),
                Err(PkError::InvalidTimePoints(_))
            ));
        }
    }

    #[test]
    fn test_validate_initial_state() {
        assert!(validate_initial_state(&[0.0, 0.0], 2).is_ok());
        assert!(validate_initial_state(&[1.0, 2.0], 2).is_ok());
        for bad in [vec![0.0], vec![-1.0, -2.0], vec![0.0, f64::NAN]] {
            assert!(matches!(
                validate_initial_state(&bad, 2),
                Err(PkError::InvalidInitialState(_))
            ));
        }
    }

    #[test]
    fn test_failed_solve_keeps_previous_trajectory() {
        let topology = CompartmentTopology::default();
        let protocol = DosingProtocol::default();
        let mut solver = TrajectorySolver::new(&topology, &protocol);
        assert!(solver.trajectory().is_none());
        solver.solve(None, &[0.0, 1.0]).unwrap();
        assert!(solver.solve(Some(&[-1.0]), &[0.0, 1.0]).is_err());
        assert_eq!(solver.trajectory().unwrap().len(), 2);
    }

    #[test]
    fn test_integration_failure_keeps_previous_trajectory() {
        let topology = CompartmentTopology::default();
        let mut protocol = DosingProtocol::default();
        protocol.enable_continuous(0.0, 1.0).unwrap();
        let mut solver = TrajectorySolver::new(&topology, &protocol);
        let previous = solver.solve(None, &[0.0, 1.0]).unwrap().clone();

        solver.settings.max_steps = 1;
        assert!(matches!(
            solver.solve(None, &[0.0, 1000.0]),
            Err(PkError::IntegrationFailure(_))
        ));
        assert_eq!(solver.trajectory(), Some(&previous));
    }

    #[test]
    fn test_misshapen_integrator_output_is_rejected() {
        let topology = CompartmentTopology::default();
        let protocol = DosingProtocol::default();
        let mut solver = TrajectorySolver::new(&topology, &protocol);
        assert!(matches!(
            solver.solve_with(&EmptyIntegrator, None, &[0.0, 1.0]),
            Err(PkError::IntegrationFailure(_))
        ));
        assert!(solver.trajectory().is_none());
    }

    #[test]
    fn test_state_jump_impulses() {
        let mut topology = CompartmentTopology::default();
        topology.add_subcutaneous_compartment(1.0).unwrap();
        let mut protocol = DosingProtocol::new(2.0).unwrap();
        protocol
            .add_instantaneous(-1.0)
            .unwrap()
            .add_instantaneous(0.5)
            .unwrap()
            .add_instantaneous(3.0)
            .unwrap();
        let solver = TrajectorySolver::new(&topology, &protocol).with_settings(SolverSettings {
            bolus_mode: BolusMode::StateJump,
            ..Default::default()
        });
        let impulses = solver.impulses(&[0.0, 1.0, 2.0]);
        assert_eq!(
            impulses,
            vec![Impulse {
                time: 0.5,
                index: 1,
                amount: 2.0
            }]
        );

        let default_solver = TrajectorySolver::new(&topology, &protocol);
        assert!(default_solver.impulses(&[0.0, 1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_state_jump_bolus_decays() {
        let topology = CompartmentTopology::new(1.0, 2.0).unwrap();
        let mut protocol = DosingProtocol::new(10.0).unwrap();
        protocol.add_instantaneous(0.0).unwrap();
        let mut solver =
            TrajectorySolver::new(&topology, &protocol).with_settings(SolverSettings {
                bolus_mode: BolusMode::StateJump,
                ..Default::default()
            });
        let trajectory = solver.solve(None, &time_grid(0.0, 4.0, 5).unwrap()).unwrap();
        for (&t, &mass) in trajectory.times().iter().zip(trajectory.central().iter()) {
            assert_abs_diff_eq!(mass, 10.0 * (-0.5 * t).exp(), epsilon = 2e-2);
        }
    }
}
