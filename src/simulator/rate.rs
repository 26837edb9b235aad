use crate::data::{Compartment, CompartmentTopology, DosingProtocol};

/// Parameters of a single compartment, resolved ahead of integration
#[derive(Debug, Clone, Copy, PartialEq)]
enum Kinetics {
    Central,
    Peripheral { volume: f64, transfer_rate: f64 },
    SubcutaneousDepot { absorption_rate: f64 },
}

/// The right-hand side of the compartmental ODE system
///
/// A [RateFunction] is a frozen snapshot of a [CompartmentTopology] and a
/// [DosingProtocol]. Mutating either after the rate function is built has no effect on
/// it, and evaluation is a pure function of `(t, q)`, so the integrator may call it in
/// any order.
///
/// For a state vector `q` (drug masses), the derivative is
/// - `dq_p/dt = Q_p (q_c/V_c - q_p/V_p)` for every peripheral compartment `p`
/// - `dq_c/dt = input - q_c/V_c CL - Σ dq_p/dt` for the central compartment, where the input
///   is `dose(t)` for intravenous models, and `ka q_d` when a depot exists
/// - `dq_d/dt = dose(t) - ka q_d` for the subcutaneous depot
#[derive(Debug, Clone)]
pub struct RateFunction {
    clearance_rate: f64,
    central_volume: f64,
    layout: Vec<Kinetics>,
    depot: Option<usize>,
    protocol: DosingProtocol,
    instantaneous: bool,
    // Continuous input held constant over an integration segment
    frozen_continuous: Option<f64>,
}

impl RateFunction {
    /// Build the rate function of a topology under a dosing protocol
    pub fn new(topology: &CompartmentTopology, protocol: &DosingProtocol) -> Self {
        let layout = topology
            .compartments()
            .into_iter()
            .map(|compartment| match compartment {
                Compartment::Central => Kinetics::Central,
                Compartment::Peripheral(i) => {
                    let p = &topology.peripheral_compartments()[i];
                    Kinetics::Peripheral {
                        volume: p.volume(),
                        transfer_rate: p.transfer_rate(),
                    }
                }
                Compartment::SubcutaneousDepot => Kinetics::SubcutaneousDepot {
                    // The depot is only listed when an absorption rate is present
                    absorption_rate: topology.subcutaneous_absorption_rate().unwrap_or_default(),
                },
            })
            .collect::<Vec<_>>();
        let depot = topology.index_of(Compartment::SubcutaneousDepot);

        RateFunction {
            clearance_rate: topology.clearance_rate(),
            central_volume: topology.central_volume(),
            layout,
            depot,
            protocol: protocol.clone(),
            instantaneous: true,
            frozen_continuous: None,
        }
    }

    /// Exclude instantaneous doses from the drug input
    ///
    /// Used when instantaneous doses are applied as jumps of the state vector instead.
    pub(crate) fn without_instantaneous(mut self) -> Self {
        self.instantaneous = false;
        self
    }

    /// Hold the continuous input at its value at `t`
    ///
    /// Only valid over a segment starting at `t` that contains none of the
    /// [RateFunction::breakpoints]. Within such a segment the continuous input is constant,
    /// and freezing it keeps implicit steps ending on a window edge from seeing the input
    /// of the next segment.
    pub(crate) fn frozen_at(&self, t: f64) -> Self {
        RateFunction {
            frozen_continuous: Some(self.protocol.continuous_rate_at(t)),
            ..self.clone()
        }
    }

    /// Times at which the continuous input switches on or off, sorted
    pub fn breakpoints(&self) -> Vec<f64> {
        self.protocol
            .continuous_window()
            .map(|window| {
                [window.start(), window.end()]
                    .into_iter()
                    .filter(|t| t.is_finite())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Length of the state vector
    pub fn nstates(&self) -> usize {
        self.layout.len()
    }

    /// Exogenous drug input at time `t`
    pub fn input_at(&self, t: f64) -> f64 {
        let continuous = self
            .frozen_continuous
            .unwrap_or_else(|| self.protocol.continuous_rate_at(t));
        if self.instantaneous && self.protocol.is_instantaneous_at(t) {
            continuous + self.protocol.dose_amount()
        } else {
            continuous
        }
    }

    /// Evaluate `dq/dt` at time `t` into `dq`
    ///
    /// # Panics
    ///
    /// Panics if `q` or `dq` is shorter than [RateFunction::nstates].
    #[inline(always)]
    pub fn call_inplace(&self, t: f64, q: &[f64], dq: &mut [f64]) {
        self.assemble(q, self.input_at(t), dq);
    }

    /// Evaluate `dq/dt` at time `t`
    ///
    /// # Panics
    ///
    /// Panics if `q` is shorter than [RateFunction::nstates].
    pub fn evaluate(&self, t: f64, q: &[f64]) -> Vec<f64> {
        let mut dq = vec![0.0; self.nstates()];
        self.call_inplace(t, q, &mut dq);
        dq
    }

    /// Product of the Jacobian `∂(dq/dt)/∂q` with `v`
    ///
    /// The system is linear in `q`, so this is the homogeneous part of the rate function
    /// applied to `v`.
    ///
    /// # Panics
    ///
    /// Panics if `v` or `y` is shorter than [RateFunction::nstates].
    #[inline(always)]
    pub fn jac_mul_inplace(&self, v: &[f64], y: &mut [f64]) {
        self.assemble(v, 0.0, y);
    }

    fn assemble(&self, q: &[f64], input: f64, dq: &mut [f64]) {
        let n = self.nstates();
        assert!(
            q.len() >= n && dq.len() >= n,
            "state vectors must have {} entries, got {} and {}",
            n,
            q.len(),
            dq.len()
        );

        let central_concentration = q[0] / self.central_volume;
        let mut transfer = 0.0;
        let mut absorption = 0.0;
        for (i, kinetics) in self.layout.iter().enumerate() {
            dq[i] = match *kinetics {
                Kinetics::Peripheral {
                    volume,
                    transfer_rate,
                } => {
                    let transition = transfer_rate * (central_concentration - q[i] / volume);
                    transfer += transition;
                    transition
                }
                Kinetics::SubcutaneousDepot { absorption_rate } => {
                    absorption = absorption_rate * q[i];
                    input - absorption
                }
                // Filled in once all transitions are known
                Kinetics::Central => 0.0,
            };
        }

        let central_input = if self.depot.is_some() {
            absorption
        } else {
            input
        };
        dq[0] = central_input - central_concentration * self.clearance_rate - transfer;
    }
}
