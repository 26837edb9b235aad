pub mod config;
pub mod protocol;
pub mod topology;
pub use config::ModelConfig;
pub use protocol::{ContinuousWindow, DosingProtocol};
pub use topology::{Compartment, CompartmentTopology, PeripheralCompartment};
