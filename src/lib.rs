//! Mixed-integer linear modeling with piecewise-linear approximation of nonlinear constraints.
//!
//! The crate builds optimization models in a backend-neutral form and hands them to a solver
//! backend (see the `pwlmodel_highs` and `pwlmodel_microlp` crates). Its core is the
//! [pwl] module, which replaces a nonlinear scalar response function, for example the M/M/1
//! queueing delay `1/(rate - load)`, by a table of sampled breakpoints and a set of
//! convex-combination weights with an SOS2 adjacency restriction.
//!
//! # Example
//!
//! A facility with service rate 4 whose queueing delay must stay below 1.0:
//!
//! ```rust
//! use pwlmodel::*;
//! use pwlmodel::pwl::{add_piecewise_linear, BreakpointTable, PwlConfig, QueueingDelay};
//!
//! let mut m = dummy::Model::new(Some("facility"));
//! let load = m.variable(Some("load"), in_range(0.0, 3.0).integer()).unwrap();
//!
//! let config = PwlConfig::default().with_samples(20);
//! let delay = QueueingDelay::new(4.0).unwrap();
//! let table = BreakpointTable::sample(&delay, &config).unwrap();
//! let pwl = add_piecewise_linear(&mut m, "delay", table, &load, &config).unwrap();
//!
//! m.constraint(Some("theta"), &pwl.response(), less_than(1.0)).unwrap();
//! m.objective(Some("obj"), Sense::Maximize, &load).unwrap();
//! assert_eq!(pwl.weights().len(), 20);
//! ```

pub mod assignment;
pub mod constraint;
pub mod domain;
pub mod dummy;
pub mod expr;
pub mod lp_format;
pub mod model;
pub mod pwl;
pub mod shortest_path;
pub mod utils;
pub mod variable;
pub mod warehouse;

pub use constraint::{Constraint, Sos2Set};
pub use domain::*;
pub use expr::{Expr, IntoExpr};
pub use model::{
    BaseModelTrait, Capabilities, ModelAPI, ModelItem, OptimalSolution, ParameterValue,
    ProblemData, Sense, Solution, SolutionStatus, SolveOutcome,
};
pub use variable::Variable;

/// Error type encompassing all modeling, solving and evaluation errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A response function was evaluated at or beyond its singularity.
    #[error("Load {load} is not strictly below the rate {rate}; the response is undefined")]
    UndefinedRegion { load : f64, rate : f64 },
    /// The backend does not provide a requested feature.
    #[error("Backend does not support {0}")]
    Unsupported(String),
    /// A modeling-time precondition was violated.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Breakpoints are sampled too close to a singularity of the response function.
    #[error("Largest sampled response {response} exceeds the limit {limit}; reduce the margin")]
    IllConditioned { response : f64, limit : f64 },
    /// The solver failed.
    #[error("Solver error: {0}")]
    Backend(String),
    /// The problem is unbounded.
    #[error("The problem is unbounded")]
    Unbounded,
    /// The solver terminated without proving optimality.
    #[error("Solver terminated with status {0:?}")]
    NotOptimal(SolutionStatus),
    /// Solution values were requested but no solution is available.
    #[error("Solution is not available")]
    SolutionUnavailable,
    /// No selected edge leaves the given node before the target is reached.
    #[error("Selected edges do not continue from node {0}")]
    BrokenPath(usize),
    /// Following the selected edges visits the given node twice.
    #[error("Selected edges revisit node {0}")]
    CyclicPath(usize),
    /// More than one selected edge leaves the given node.
    #[error("More than one selected edge leaves node {0}")]
    AmbiguousPath(usize),
    /// Writing a problem file failed.
    #[error("Could not write problem: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias using [`Error`](enum.Error.html).
pub type Result<T> = std::result::Result<T, Error>;
