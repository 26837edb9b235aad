use diffsol::{ode_solver::method::OdeSolverMethod, OdeBuilder, OdeSolverStopReason};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::closure::PkProblem;
use super::rate::RateFunction;
use super::M;
use crate::error::PkError;

const RTOL: f64 = 1e-4;
const ATOL: f64 = 1e-4;
const H0: f64 = 1e-3;
const MAX_STEPS: usize = 100_000;

/// How instantaneous doses enter the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BolusMode {
    /// Instantaneous doses are part of the rate function, and only contribute when the
    /// integrator evaluates it at exactly the dose time
    #[default]
    RateTerm,
    /// Instantaneous doses are added to the dosing compartment as a jump of the state vector
    StateJump,
}

/// Tolerances and limits of the numerical integration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverSettings {
    /// Relative tolerance
    pub rtol: f64,
    /// Absolute tolerance, applied to every compartment
    pub atol: f64,
    /// Initial step size
    pub h0: f64,
    /// Maximum number of internal steps between two consecutive stops
    pub max_steps: usize,
    pub bolus_mode: BolusMode,
}

impl Default for SolverSettings {
    fn default() -> Self {
        SolverSettings {
            rtol: RTOL,
            atol: ATOL,
            h0: H0,
            max_steps: MAX_STEPS,
            bolus_mode: BolusMode::default(),
        }
    }
}

/// An instantaneous change of the state vector during integration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impulse {
    /// Time at which the impulse is applied
    pub time: f64,
    /// State vector index receiving the impulse
    pub index: usize,
    pub amount: f64,
}

/// Capability to integrate an initial value problem
///
/// Implementations integrate `dq/dt = rate(t, q)` from `initial_state` at `time_points[0]`,
/// and return one row of state values per requested time point. Impulses are added to
/// the state at their time, before any time point sampled at that same time. The time points
/// are sorted, and the impulses are sorted and lie within the span of the time points.
pub trait Integrator {
    fn integrate(
        &self,
        rate: &RateFunction,
        initial_state: &[f64],
        time_points: &[f64],
        impulses: &[Impulse],
    ) -> Result<Array2<f64>, PkError>;
}

enum Stop {
    Sample(usize),
    Impulse { index: usize, amount: f64 },
    // Discontinuity of the drug input, where the solver is restarted
    Breakpoint,
}

/// Variable order BDF integration, backed by diffsol
#[derive(Debug, Clone, Copy, Default)]
pub struct BdfIntegrator {
    settings: SolverSettings,
}

impl BdfIntegrator {
    pub fn new(settings: SolverSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }
}

impl Integrator for BdfIntegrator {
    fn integrate(
        &self,
        rate: &RateFunction,
        initial_state: &[f64],
        time_points: &[f64],
        impulses: &[Impulse],
    ) -> Result<Array2<f64>, PkError> {
        let nstates = rate.nstates();
        let mut output = Array2::zeros((time_points.len(), nstates));
        let (Some(&t0), Some(&t_last)) = (time_points.first(), time_points.last()) else {
            return Ok(output);
        };

        // Merge samples, impulses and input discontinuities into a single timeline. On ties,
        // the state is updated before it is sampled
        let mut stops: Vec<(f64, Stop)> = impulses
            .iter()
            .map(|impulse| {
                (
                    impulse.time,
                    Stop::Impulse {
                        index: impulse.index,
                        amount: impulse.amount,
                    },
                )
            })
            .chain(
                rate.breakpoints()
                    .into_iter()
                    .filter(|&t| t0 < t && t < t_last)
                    .map(|t| (t, Stop::Breakpoint)),
            )
            .chain(
                time_points
                    .iter()
                    .enumerate()
                    .map(|(row, &t)| (t, Stop::Sample(row))),
            )
            .collect();
        stops.sort_by(|a, b| {
            a.0.total_cmp(&b.0)
                .then_with(|| matches!(a.1, Stop::Sample(_)).cmp(&matches!(b.1, Stop::Sample(_))))
        });
        let mut stops = stops.into_iter();

        // Each segment between two breakpoints is solved with a fresh solver, with the
        // continuous input held at its value at the start of the segment
        let mut segment_start = t0;
        let mut state = initial_state.to_vec();
        'segments: loop {
            let problem = OdeBuilder::<M>::new()
                .atol(vec![self.settings.atol; nstates])
                .rtol(self.settings.rtol)
                .t0(segment_start)
                .h0(self.settings.h0)
                .build_from_eqn(PkProblem::new(rate.frozen_at(segment_start), &state))?;
            let mut solver = problem.bdf::<diffsol::NalgebraLU<f64>>()?;

            let mut current = segment_start;
            for (time, stop) in stops.by_ref() {
                // Solve to the next stop
                if time > current {
                    solver.set_stop_time(time)?;
                    let mut steps = 0;
                    loop {
                        match solver.step() {
                            Ok(OdeSolverStopReason::InternalTimestep) => {
                                steps += 1;
                                if steps > self.settings.max_steps {
                                    return Err(PkError::IntegrationFailure(format!(
                                        "exceeded {} steps between t = {} and t = {}",
                                        self.settings.max_steps, current, time
                                    )));
                                }
                            }
                            Ok(OdeSolverStopReason::TstopReached) => break,
                            Ok(reason) => {
                                return Err(PkError::IntegrationFailure(format!(
                                    "unexpected solver return value: {:?}",
                                    reason
                                )))
                            }
                            Err(err) => return Err(err.into()),
                        }
                    }
                    current = time;
                }

                match stop {
                    Stop::Impulse { index, amount } => {
                        solver.state_mut().y[index] += amount;
                    }
                    Stop::Sample(row) => {
                        let y = solver.state().y;
                        if let Some(value) = y.iter().find(|v| !v.is_finite()) {
                            return Err(PkError::IntegrationFailure(format!(
                                "non-finite state value {} at t = {}",
                                value, time
                            )));
                        }
                        output
                            .row_mut(row)
                            .iter_mut()
                            .zip(y.iter())
                            .for_each(|(out, &value)| *out = value);
                    }
                    Stop::Breakpoint => {
                        state = solver.state().y.as_slice().to_vec();
                        segment_start = time;
                        continue 'segments;
                    }
                }
            }
            break;
        }

        Ok(output)
    }
}
