//! Error types produced while building frames, configuring or running simulations.

use thiserror::Error;

use crate::frame::{MaterialId, MemberId, NodeId};

/// Error returned when a material grade carries physically meaningless properties.
///
/// Every capacity and stiffness parameter must be strictly positive; a zero or
/// negative yield stress would fail every member on the first step.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MaterialError {
    /// Returned when Young's modulus is zero, negative or not a number.
    #[error("material {name:?}: elastic modulus must be positive (received {value})")]
    NonPositiveElasticModulus {
        /// Name of the rejected grade.
        name: String,
        /// Rejected modulus in pascals.
        value: f64,
    },
    /// Returned when the cross-sectional area is zero, negative or not a number.
    #[error("material {name:?}: area must be positive (received {value})")]
    NonPositiveArea {
        /// Name of the rejected grade.
        name: String,
        /// Rejected area in square metres.
        value: f64,
    },
    /// Returned when the second moment of area is zero, negative or not a number.
    #[error("material {name:?}: second moment of area must be positive (received {value})")]
    NonPositiveMomentOfInertia {
        /// Name of the rejected grade.
        name: String,
        /// Rejected second moment of area in m^4.
        value: f64,
    },
    /// Returned when the yield stress is zero, negative or not a number.
    #[error("material {name:?}: yield stress must be positive (received {value})")]
    NonPositiveYieldStress {
        /// Name of the rejected grade.
        name: String,
        /// Rejected yield stress in pascals.
        value: f64,
    },
}

/// Error returned when editing or querying a [`Frame`](crate::Frame).
///
/// # Examples
///
/// ```
/// use collapsex::{point, Frame, FrameError};
///
/// let mut frame = Frame::new("demo");
/// frame.add_node(0, point(0.0, 0.0, 0.0)).expect("first node accepted");
/// let error = frame
///     .add_node(0, point(1.0, 0.0, 0.0))
///     .expect_err("duplicate id rejected");
/// assert_eq!(error, FrameError::DuplicateNode(0));
/// ```
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FrameError {
    /// Returned when a node id is registered twice.
    #[error("node {0} already exists in this frame")]
    DuplicateNode(NodeId),
    /// Returned when a node id cannot be found in the frame.
    #[error("node {0} does not exist in this frame")]
    UnknownNode(NodeId),
    /// Returned when a member id is registered twice.
    #[error("member {0} already exists in this frame")]
    DuplicateMember(MemberId),
    /// Returned when a member id cannot be found in the frame.
    #[error("member {0} does not exist in this frame")]
    UnknownMember(MemberId),
    /// Returned when a material handle does not belong to this frame.
    #[error("material {0:?} does not exist in this frame")]
    UnknownMaterial(MaterialId),
    /// Returned when a member's endpoints coincide.
    #[error("member {0} has zero length")]
    ZeroLengthMember(MemberId),
    /// Returned when a degree-of-freedom index is outside `0..6`.
    #[error("degree of freedom {0} is out of range (expected 0..=5)")]
    InvalidDof(usize),
    /// Returned when a material grade is rejected.
    #[error(transparent)]
    InvalidMaterial(#[from] MaterialError),
}

/// Error returned when a simulation configuration is rejected.
///
/// Configuration problems are reported before the first step runs, so no
/// partial result is ever produced.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Returned when a collapse detection method identifier is not recognised.
    #[error("unknown collapse detection method {0:?}; use \"threshold\" or \"zscore\"")]
    UnknownCollapseMethod(String),
    /// Returned when a scenario name is not part of the registry.
    #[error("unknown scenario {name:?}; available: {available}")]
    UnknownScenario {
        /// Rejected scenario name.
        name: String,
        /// Comma separated list of accepted names.
        available: String,
    },
    /// Returned when `max_steps` is zero.
    #[error("max_steps must be positive")]
    NonPositiveMaxSteps,
    /// Returned when the redistribution time increment is not a positive number.
    #[error("redistribution_dt must be positive (received {0})")]
    NonPositiveTimeStep(f64),
    /// Returned when the entropy-drop threshold is not negative.
    #[error("collapse_threshold must be negative (received {0})")]
    NonNegativeThreshold(f64),
    /// Returned when the z-score cutoff is not a positive number.
    #[error("collapse_zscore must be positive (received {0})")]
    NonPositiveZScore(f64),
    /// Returned when the z-score detector is asked to activate on an empty history.
    #[error("zscore_min_history must be at least 1")]
    ZeroMinHistory,
    /// Returned when a load factor parameter is infinite or not a number.
    #[error("load factor parameter {name} must be finite (received {value})")]
    NonFiniteLoadFactor {
        /// Name of the offending option.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// Returned when a configuration document cannot be parsed.
    #[error("invalid configuration: {0}")]
    Parse(String),
    /// Returned when a configuration file cannot be read.
    #[error("cannot read configuration file {path}: {message}")]
    Io {
        /// Path that was requested.
        path: String,
        /// Operating system error message.
        message: String,
    },
}

/// Error returned when a simulation cannot be carried out.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SimulationError {
    /// The frame is malformed.
    #[error(transparent)]
    Frame(#[from] FrameError),
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The least-squares fallback could not produce a solution.
    #[error("least-squares fallback failed: {0}")]
    LeastSquares(&'static str),
}
