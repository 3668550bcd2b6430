#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_doc_code_examples)]
#![warn(clippy::missing_docs_in_private_items)]
#![doc = include_str!("../README.md")]

pub mod config;
pub mod detection;
pub mod entropy;
pub mod equilibrium;
pub mod errors;
pub mod failure;
pub mod frame;
pub mod geometry;
pub mod redistribution;
pub mod scenarios;
pub mod simulation;
pub mod state;
pub mod stiffness;

pub use config::{CollapseMethod, SimulationConfig};
pub use detection::CollapseDetector;
pub use equilibrium::{Equilibrium, SolveMethod};
pub use errors::{ConfigError, FrameError, MaterialError, SimulationError};
pub use frame::{Frame, Load, Material, MaterialId, Member, MemberId, Node, NodeId};
pub use geometry::{point, Dof, Point};
pub use scenarios::Scenario;
pub use simulation::{run, Simulation};
pub use state::{EnergyState, EntropyRecord, MemberState, SimulationResult, Termination};
