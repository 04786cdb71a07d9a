//! Piecewise-linear approximation of a nonlinear response function inside a MILP.
//!
//! A response function `f` is sampled at breakpoints `(l_0,r_0),...,(l_{n-1},r_{n-1})`
//! ([BreakpointTable]). The model gets one weight `w_i ∈ [0,1]` per breakpoint and a response
//! variable `y` constrained by
//! ```text
//! Σ w_i         = 1
//! Σ w_i · l_i   = load
//! Σ w_i · r_i   = y
//! ```
//! together with the SOS2 condition that at most two weights are nonzero, and only if they are
//! adjacent. With the SOS2 condition `y` is the linear interpolation of `f` at `load`.
//!
//! The SOS2 condition is either declared to the backend, if it has native support, or encoded
//! with `n-1` binary segment selectors `z_k`:
//! ```text
//! Σ z_k = 1
//! w_0     <= z_0
//! w_i     <= z_{i-1} + z_i     for 0 < i < n-1
//! w_{n-1} <= z_{n-2}
//! ```
//! See [Sos2Encoding].

mod breakpoints;

pub use breakpoints::{BreakpointTable, QueueingDelay, ResponseFunction};

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::constraint::{Constraint, Sos2Set};
use crate::domain::*;
use crate::expr::{Expr, IntoExpr};
use crate::model::{BaseModelTrait, ModelAPI, OptimalSolution};
use crate::utils::{indexed_name, is_sos2_feasible};
use crate::variable::Variable;
use crate::{Error, Result};

/// Largest accepted number of breakpoints.
pub const MAX_SAMPLES : usize = 100_000;
/// Margins above this value are accepted, but sample close to the singularity.
pub const RECOMMENDED_MARGIN : f64 = 0.95;

/// How the SOS2 condition on the weights is expressed.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Default,Serialize,Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sos2Encoding {
    /// Native if the backend supports it, otherwise selector binaries.
    #[default]
    Auto,
    /// Declare an SOS2 set. Fails with `Error::Unsupported` on backends without native support.
    Native,
    /// Encode with binary segment selectors.
    Selector,
}

/// Parameters of the piecewise-linear approximation.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(default)]
pub struct PwlConfig {
    /// Number of breakpoints.
    pub num_samples  : usize,
    /// Breakpoints are sampled on `[0, margin * limit]` where `limit` is the singularity of the
    /// response function.
    pub margin       : f64,
    /// Largest accepted response at a breakpoint.
    pub max_response : f64,
    /// How the adjacency condition on the weights is expressed.
    pub encoding     : Sos2Encoding,
}

impl Default for PwlConfig {
    fn default() -> Self {
        PwlConfig{
            num_samples  : 100,
            margin       : RECOMMENDED_MARGIN,
            max_response : 1e4,
            encoding     : Sos2Encoding::Auto,
        }
    }
}

impl PwlConfig {
    pub fn with_samples(self, num_samples : usize) -> PwlConfig { PwlConfig{ num_samples, ..self } }
    pub fn with_margin(self, margin : f64) -> PwlConfig { PwlConfig{ margin, ..self } }
    pub fn with_max_response(self, max_response : f64) -> PwlConfig { PwlConfig{ max_response, ..self } }
    pub fn with_encoding(self, encoding : Sos2Encoding) -> PwlConfig { PwlConfig{ encoding, ..self } }

    /// Check the parameters.
    ///
    /// # Returns
    /// `Error::InvalidParameter` unless `2 <= num_samples <= MAX_SAMPLES`, `0 < margin < 1` and
    /// `max_response > 0`. A margin above [RECOMMENDED_MARGIN] is accepted with a warning.
    pub fn validate(&self) -> Result<()> {
        if self.num_samples < 2 || self.num_samples > MAX_SAMPLES {
            return Err(Error::InvalidParameter(format!("number of samples must be in [2,{}], got {}",MAX_SAMPLES,self.num_samples)));
        }
        if ! (self.margin > 0.0 && self.margin < 1.0) {
            return Err(Error::InvalidParameter(format!("margin must be in (0,1), got {}",self.margin)));
        }
        if ! (self.max_response > 0.0) {
            return Err(Error::InvalidParameter(format!("max_response must be positive, got {}",self.max_response)));
        }
        if self.margin > RECOMMENDED_MARGIN {
            warn!("Margin {} exceeds {}; breakpoints approach the singularity", self.margin, RECOMMENDED_MARGIN);
        }
        Ok(())
    }
}

/// Handles of the items created by [add_piecewise_linear].
#[derive(Clone,Debug)]
pub struct PiecewiseLinear {
    name          : String,
    table         : BreakpointTable,
    encoding      : Sos2Encoding,
    weights       : Vec<Variable>,
    response      : Variable,
    selectors     : Vec<Variable>,
    weight_sum    : Constraint,
    load_link     : Constraint,
    response_link : Constraint,
    sos2          : Option<Sos2Set>,
}

/// Values of a [PiecewiseLinear] in a solution.
#[derive(Clone,Debug)]
pub struct PwlPoint {
    pub weights    : Vec<f64>,
    /// `Σ w_i`
    pub weight_sum : f64,
    /// `Σ w_i · l_i`
    pub load       : f64,
    /// Value of the response variable.
    pub response   : f64,
}

impl PwlPoint {
    /// Returns true if at most two weights exceed `tol`, and if two, they are adjacent.
    pub fn is_adjacent(&self, tol : f64) -> bool { is_sos2_feasible(self.weights.as_slice(),tol) }
}

impl PiecewiseLinear {
    pub fn name(&self) -> &str { self.name.as_str() }
    pub fn table(&self) -> &BreakpointTable { &self.table }
    /// The encoding actually used; never `Auto`.
    pub fn encoding(&self) -> Sos2Encoding { self.encoding }
    /// The convex-combination weights, one per breakpoint.
    pub fn weights(&self) -> &[Variable] { self.weights.as_slice() }
    /// The response variable `y`.
    pub fn response(&self) -> Variable { self.response }
    /// Segment selector binaries; empty for the native encoding.
    pub fn selectors(&self) -> &[Variable] { self.selectors.as_slice() }
    pub fn weight_sum(&self) -> Constraint { self.weight_sum }
    pub fn load_link(&self) -> Constraint { self.load_link }
    pub fn response_link(&self) -> Constraint { self.response_link }
    /// The declared SOS2 set for the native encoding.
    pub fn sos2_set(&self) -> Option<&Sos2Set> { self.sos2.as_ref() }

    /// Read the weights, the reconstructed load and the response from a solution.
    pub fn point(&self, sol : &OptimalSolution) -> Result<PwlPoint> {
        let weights = sol.values_of(self.weights.as_slice())?;
        Ok(PwlPoint{
            weight_sum : weights.iter().sum(),
            load       : weights.iter().zip(self.table.loads().iter()).map(|(w,l)| w*l).sum(),
            response   : sol.value(&self.response)?,
            weights,
        })
    }
}

/// Add the piecewise-linear approximation of a sampled response function to a model.
///
/// # Arguments
/// - `model` The model.
/// - `name` Base name of the created items, for example `delay[0]`. The weights are named
///   `<name>.w[i]`, the response `<name>.y` and the selectors `<name>.z[k]`.
/// - `table` The breakpoints.
/// - `load` The load expression the weights are linked to.
/// - `config` Selects the SOS2 encoding.
///
/// # Returns
/// The handles of the created items, or
/// - `Error::Unsupported` if the native encoding is requested but the backend does not support
///   it,
/// - `Error::InvalidParameter` if `load` refers to variables not in the model.
///
/// On error the model is left unchanged.
pub fn add_piecewise_linear<T,E>(model  : &mut ModelAPI<T>,
                                 name   : &str,
                                 table  : BreakpointTable,
                                 load   : E,
                                 config : &PwlConfig) -> Result<PiecewiseLinear>
    where
        T : BaseModelTrait,
        E : IntoExpr
{
    let native = model.capabilities().native_sos2;
    let encoding = match config.encoding {
        Sos2Encoding::Auto => if native { Sos2Encoding::Native } else { Sos2Encoding::Selector },
        Sos2Encoding::Native if ! native => return Err(Error::Unsupported("native SOS2 sets".to_string())),
        e => e,
    };
    let load = load.into_expr().compress();
    model.data().check_expr_subj(load.subj())?;

    let n = table.len();
    let (r_lo,r_hi) = table.responses().iter()
        .fold((f64::INFINITY,f64::NEG_INFINITY), |(lo,hi),&r| (lo.min(r),hi.max(r)));

    let weights  = model.variables(Some(format!("{}.w",name).as_str()), n, in_range(0.0,1.0))?;
    let response = model.variable(Some(format!("{}.y",name).as_str()), in_range(r_lo,r_hi))?;

    let weight_sum    = model.constraint(Some(format!("{}.wsum",name).as_str()), weights.as_slice(), equal_to(1.0))?;
    let load_link     = model.constraint(Some(format!("{}.load",name).as_str()),
                                         Expr::dot(weights.as_slice(),table.loads()).sub(load),
                                         equal_to(0.0))?;
    let response_link = model.constraint(Some(format!("{}.response",name).as_str()),
                                         Expr::dot(weights.as_slice(),table.responses()).sub(&response),
                                         equal_to(0.0))?;

    let (selectors,sos2) = match encoding {
        Sos2Encoding::Native => {
            let s = model.sos2(Some(format!("{}.sos2",name).as_str()), weights.as_slice(), table.loads())?;
            (Vec::new(),Some(s))
        },
        _ => {
            let z = model.variables(Some(format!("{}.z",name).as_str()), n-1, binary())?;
            model.constraint(Some(format!("{}.zsum",name).as_str()), z.as_slice(), equal_to(1.0))?;
            for (i,w) in weights.iter().enumerate() {
                let mut e = w.to_expr();
                if i > 0   { e = e.sub(&z[i-1]); }
                if i < n-1 { e = e.sub(&z[i]); }
                model.constraint(Some(indexed_name(format!("{}.adj",name).as_str(),&[i]).as_str()), e, less_than(0.0))?;
            }
            (z,None)
        }
    };

    debug!("Piecewise-linear {}: {} breakpoints, {:?} encoding, {} selectors",
           name, n, encoding, selectors.len());

    Ok(PiecewiseLinear{
        name : name.to_string(),
        table,
        encoding,
        weights,
        response,
        selectors,
        weight_sum,
        load_link,
        response_link,
        sos2,
    })
}
