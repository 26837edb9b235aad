//! Time evolution of compartmental models
//!
//! The [RateFunction] assembles the right-hand side of the ODE system from a
//! [CompartmentTopology](crate::data::CompartmentTopology) and a
//! [DosingProtocol](crate::data::DosingProtocol). The [TrajectorySolver] hands it to an
//! [Integrator], by default the diffsol backed [BdfIntegrator], and stores the resulting
//! [Trajectory].
pub mod batch;
mod closure;
pub mod integrator;
pub mod rate;
pub mod solver;
pub mod trajectory;

pub use batch::{solve_all, Scenario};
pub use integrator::{BdfIntegrator, BolusMode, Impulse, Integrator, SolverSettings};
pub use rate::RateFunction;
pub use solver::{time_grid, TrajectorySolver};
pub use trajectory::Trajectory;

type T = f64;
type V = nalgebra::DVector<T>;
type M = nalgebra::DMatrix<T>;
