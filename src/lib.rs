//! Multi-compartment pharmacokinetic models
//!
//! A model is made of a [CompartmentTopology], describing the central compartment, any
//! number of peripheral compartments and an optional subcutaneous depot, and a
//! [DosingProtocol], describing instantaneous and continuous drug input. The
//! [TrajectorySolver] integrates the drug mass in every compartment over time.
//!
//! ```
//! use pkmodel::prelude::*;
//!
//! let mut topology = CompartmentTopology::new(1.0, 1.0)?;
//! topology.add_peripheral_compartment(None, 1.0, 1.0)?;
//!
//! let mut protocol = DosingProtocol::new(1.0)?;
//! protocol.enable_continuous(0.0, 10.0)?;
//!
//! let mut solver = TrajectorySolver::new(&topology, &protocol);
//! let trajectory = solver.solve(None, &time_grid(0.0, 1.0, 5)?)?;
//! assert!((trajectory.central()[4] - 0.49).abs() < 0.01);
//! # Ok::<(), PkError>(())
//! ```
pub mod data;
pub mod error;
pub mod logger;
pub mod simulator;

pub use crate::data::*;
pub use crate::simulator::{
    solve_all, time_grid, BdfIntegrator, BolusMode, Impulse, Integrator, RateFunction, Scenario,
    SolverSettings, Trajectory, TrajectorySolver,
};
pub use error::PkError;

pub mod prelude {
    pub use crate::data::{
        Compartment, CompartmentTopology, ContinuousWindow, DosingProtocol, ModelConfig,
        PeripheralCompartment,
    };
    pub use crate::error::PkError;
    pub use crate::simulator::{
        time_grid, BolusMode, RateFunction, SolverSettings, Trajectory, TrajectorySolver,
    };
}
