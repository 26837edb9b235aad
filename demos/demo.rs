//! A continuous dose of 1 for the first half of the simulated time, absorbed through a
//! subcutaneous depot into a central compartment with two peripheral compartments.
//!
//! The trajectory is written as CSV to the path given as first argument, or to stdout. In the
//! latter case, logging is disabled and the model summary goes to stderr.
use anyhow::Result;
use pkmodel::prelude::*;

fn main() -> Result<()> {
    let path = std::env::args().nth(1);
    if path.is_some() {
        pkmodel::logger::setup_log("info")?;
    }

    let mut protocol = DosingProtocol::new(1.0)?;
    protocol.enable_continuous(0.0, 0.5)?;

    // The starting model only has a central compartment and assumes intravenous dosing
    let mut topology = CompartmentTopology::new(1.0, 1.0)?;
    topology.add_subcutaneous_compartment(2.0)?;
    topology.add_peripheral_compartment(Some("Compartment 1"), 2.0, 3.0)?;
    topology.add_peripheral_compartment(None, 1.0, 1.0)?;
    eprint!("{}", topology);

    let mut solver = TrajectorySolver::new(&topology, &protocol);
    let trajectory = solver.solve(None, &time_grid(0.0, 1.0, 1000)?)?;

    match path {
        Some(path) => trajectory.to_csv(&path)?,
        None => trajectory.write_csv(std::io::stdout())?,
    }
    Ok(())
}
