//! The [ModelAPI] object and the interface a solver backend implements.
//!
//! A model stores its variables, linear constraints, SOS2 sets and objective in a
//! backend-neutral [ProblemData] object. When solving, the backend receives the data and fills
//! in a [Solution]. This way every backend sees exactly the same problem, and the model can
//! evaluate objective values and constraint activities itself.

use std::path::Path;
use std::time::Instant;

use itertools::izip;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::constraint::{Constraint, Sos2Set};
use crate::domain::LinearDomain;
use crate::expr::IntoExpr;
use crate::utils::indexed_name;
use crate::variable::Variable;
use crate::{lp_format, Error, Result};

/// Feasibility tolerance used when checking a returned solution.
pub const FEASIBILITY_TOLERANCE : f64 = 1e-6;

/// Objective sense
#[derive(Clone,Copy,Debug,PartialEq,Eq,Default,Serialize,Deserialize)]
pub enum Sense {
    Maximize,
    #[default]
    Minimize
}

/// Solution status indicator.
#[derive(Clone,Copy,Debug,PartialEq,Eq,Default)]
pub enum SolutionStatus {
    /// The solution is optimal within tolerances.
    Optimal,
    /// The solution is feasible, but optimality was not proven (for example on a time limit).
    Feasible,
    /// The problem was proven infeasible; no solution values are available.
    Infeasible,
    /// The problem was proven unbounded.
    Unbounded,
    /// The solver terminated without a conclusion.
    Unknown,
    /// No solution is available.
    #[default]
    Undefined
}

impl SolutionStatus {
    /// Returns true if the status means that solution values are available.
    pub fn has_values(&self) -> bool {
        matches!(self, SolutionStatus::Optimal | SolutionStatus::Feasible)
    }
}

/// Solution produced by a backend.
#[derive(Clone,Debug,Default)]
pub struct Solution {
    pub status : SolutionStatus,
    /// Values of all variables, indexed by variable index.
    pub var    : Vec<f64>,
    /// Objective value, computed by the model from `var`.
    pub obj    : f64,
}

/// Features a backend may or may not provide.
#[derive(Clone,Copy,Debug,Default,PartialEq,Eq)]
pub struct Capabilities {
    /// The backend accepts SOS2 set declarations and enforces them itself.
    pub native_sos2 : bool,
}

/// Value of a solver parameter.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(String),
}

impl From<bool> for ParameterValue { fn from(v : bool) -> Self { ParameterValue::Bool(v) } }
impl From<i32>  for ParameterValue { fn from(v : i32) -> Self { ParameterValue::Int(v) } }
impl From<f64>  for ParameterValue { fn from(v : f64) -> Self { ParameterValue::Double(v) } }
impl From<&str> for ParameterValue { fn from(v : &str) -> Self { ParameterValue::Str(v.to_string()) } }
impl From<String> for ParameterValue { fn from(v : String) -> Self { ParameterValue::Str(v) } }

/// The interface implemented by solver backends.
pub trait BaseModelTrait {
    fn new(name : Option<&str>) -> Self where Self : Sized;

    /// Features provided by the backend. Model builders check these before choosing how to
    /// express a structure.
    fn capabilities(&self) -> Capabilities;

    /// Set a solver parameter by name.
    fn set_parameter(&mut self, parname : &str, parval : ParameterValue) -> Result<()>;

    /// Solve the problem defined by `data`, and store status and variable values in `sol`.
    ///
    /// Not finding a solution, finding a non-optimal solution or proving infeasibility is *not*
    /// an error; those are reported through `sol.status`.
    fn solve(&mut self, data : &ProblemData, sol : &mut Solution) -> Result<()>;
}

//======================================================
// ProblemData
//======================================================

/// A declared SOS2 set as stored in [ProblemData].
#[derive(Clone,Debug,PartialEq)]
pub struct Sos2Data {
    pub name    : Option<String>,
    pub subj    : Vec<usize>,
    pub weights : Vec<f64>,
}

/// Backend-neutral storage of a mixed-integer linear problem. Rows are stored in compressed
/// sparse row format: row `i` consists of `a_subj[a_ptr[i]..a_ptr[i+1]]` and the corresponding
/// coefficients in `a_cof`.
#[derive(Clone,Debug)]
pub struct ProblemData {
    name       : Option<String>,

    var_name   : Vec<Option<String>>,
    var_lb     : Vec<f64>,
    var_ub     : Vec<f64>,
    var_int    : Vec<bool>,

    a_ptr      : Vec<usize>,
    a_subj     : Vec<usize>,
    a_cof      : Vec<f64>,
    con_lb     : Vec<f64>,
    con_ub     : Vec<f64>,
    con_name   : Vec<Option<String>>,

    sos2       : Vec<Sos2Data>,

    sense      : Sense,
    obj_name   : Option<String>,
    c_subj     : Vec<usize>,
    c_cof      : Vec<f64>,
    c_constant : f64,
}

impl Default for ProblemData {
    fn default() -> Self { ProblemData::new(None) }
}

impl ProblemData {
    pub fn new(name : Option<&str>) -> ProblemData {
        ProblemData{
            name       : name.map(|v| v.to_string()),
            var_name   : Vec::new(),
            var_lb     : Vec::new(),
            var_ub     : Vec::new(),
            var_int    : Vec::new(),
            a_ptr      : vec![0],
            a_subj     : Vec::new(),
            a_cof      : Vec::new(),
            con_lb     : Vec::new(),
            con_ub     : Vec::new(),
            con_name   : Vec::new(),
            sos2       : Vec::new(),
            sense      : Sense::Minimize,
            obj_name   : None,
            c_subj     : Vec::new(),
            c_cof      : Vec::new(),
            c_constant : 0.0,
        }
    }

    pub fn name(&self) -> Option<&str> { self.name.as_deref() }
    pub fn num_var(&self) -> usize { self.var_lb.len() }
    pub fn num_con(&self) -> usize { self.con_lb.len() }
    pub fn num_integer(&self) -> usize { self.var_int.iter().filter(|&&b| b).count() }
    pub fn num_nonzeros(&self) -> usize { self.a_subj.len() }

    pub fn var_name(&self, j : usize) -> Option<&str> { self.var_name[j].as_deref() }
    pub fn var_bounds(&self, j : usize) -> (f64,f64) { (self.var_lb[j],self.var_ub[j]) }
    pub fn is_integer(&self, j : usize) -> bool { self.var_int[j] }

    pub fn con_name(&self, i : usize) -> Option<&str> { self.con_name[i].as_deref() }
    pub fn con_bounds(&self, i : usize) -> (f64,f64) { (self.con_lb[i],self.con_ub[i]) }
    /// The sparse row `i` as `(subj,cof)`.
    pub fn row(&self, i : usize) -> (&[usize],&[f64]) {
        let (b,e) = (self.a_ptr[i],self.a_ptr[i+1]);
        (&self.a_subj[b..e],&self.a_cof[b..e])
    }

    pub fn sos2_sets(&self) -> &[Sos2Data] { self.sos2.as_slice() }

    pub fn sense(&self) -> Sense { self.sense }
    pub fn objective_name(&self) -> Option<&str> { self.obj_name.as_deref() }
    /// The objective as `(subj,cof,constant)`.
    pub fn objective(&self) -> (&[usize],&[f64],f64) { (self.c_subj.as_slice(),self.c_cof.as_slice(),self.c_constant) }

    /// The objective coefficients as a dense vector of length `num_var()`.
    pub fn dense_objective(&self) -> Vec<f64> {
        let mut c = vec![0.0; self.num_var()];
        for (&j,&v) in izip!(self.c_subj.iter(),self.c_cof.iter()) { c[j] += v; }
        c
    }

    /// Objective value at `x`. `x` must have length `num_var()`.
    pub fn objective_value(&self, x : &[f64]) -> f64 {
        izip!(self.c_subj.iter(),self.c_cof.iter()).map(|(&j,&c)| c * x[j]).sum::<f64>() + self.c_constant
    }

    /// Activity `a_i x` of row `i`. `x` must have length `num_var()`.
    pub fn row_activity(&self, i : usize, x : &[f64]) -> f64 {
        let (subj,cof) = self.row(i);
        izip!(subj.iter(),cof.iter()).map(|(&j,&c)| c * x[j]).sum()
    }

    /// Largest violation of variable bounds, integrality, row bounds and SOS2 sets at `x`.
    /// SOS2 members with absolute value at most `tol` count as zero.
    pub fn max_violation(&self, x : &[f64], tol : f64) -> f64 {
        let bounds = izip!(x.iter(),self.var_lb.iter(),self.var_ub.iter(),self.var_int.iter())
            .map(|(&v,&lb,&ub,&int)| {
                let b = (lb - v).max(v - ub).max(0.0);
                if int { b.max((v - v.round()).abs()) } else { b }
            })
            .fold(0.0,f64::max);
        let rows = (0..self.num_con())
            .map(|i| { let a = self.row_activity(i,x); (self.con_lb[i] - a).max(a - self.con_ub[i]).max(0.0) })
            .fold(0.0,f64::max);
        let sos2 = self.sos2.iter()
            .map(|s| {
                let vals : Vec<f64> = s.subj.iter().map(|&j| x[j]).collect();
                if crate::utils::is_sos2_feasible(vals.as_slice(),tol) { 0.0 }
                else { vals.iter().map(|v| v.abs()).fold(0.0,f64::max) }
            })
            .fold(0.0,f64::max);
        bounds.max(rows).max(sos2)
    }

    pub(crate) fn check_expr_subj(&self, subj : &[usize]) -> Result<()> {
        if let Some(&j) = subj.iter().find(|&&j| j >= self.num_var()) {
            Err(Error::InvalidParameter(format!("expression refers to variable {} but the model has {} variables",j,self.num_var())))
        }
        else {
            Ok(())
        }
    }

    fn add_variable(&mut self, name : Option<String>, dom : &LinearDomain) -> usize {
        let j = self.var_lb.len();
        self.var_name.push(name);
        self.var_lb.push(dom.lower());
        self.var_ub.push(dom.upper());
        self.var_int.push(dom.is_integer());
        j
    }

    fn add_row(&mut self, name : Option<String>, subj : &[usize], cof : &[f64], lb : f64, ub : f64) -> usize {
        let i = self.con_lb.len();
        self.a_subj.extend_from_slice(subj);
        self.a_cof.extend_from_slice(cof);
        self.a_ptr.push(self.a_subj.len());
        self.con_lb.push(lb);
        self.con_ub.push(ub);
        self.con_name.push(name);
        i
    }
}

//======================================================
// Solution access
//======================================================

/// The `ModelItem` represents either a variable or a constraint belonging to a [ModelAPI]. It
/// is used to read solution values.
pub trait ModelItem {
    fn primal(&self, data : &ProblemData, x : &[f64]) -> Result<f64>;
}

impl ModelItem for Variable {
    fn primal(&self, _data : &ProblemData, x : &[f64]) -> Result<f64> {
        x.get(self.idx).copied().ok_or_else(|| Error::InvalidParameter(format!("variable index {} out of bounds",self.idx)))
    }
}

impl ModelItem for Constraint {
    fn primal(&self, data : &ProblemData, x : &[f64]) -> Result<f64> {
        if self.idx >= data.num_con() || x.len() != data.num_var() {
            Err(Error::InvalidParameter(format!("constraint index {} out of bounds",self.idx)))
        }
        else {
            Ok(data.row_activity(self.idx,x))
        }
    }
}

/// Values of an optimal solution.
#[derive(Clone,Debug)]
pub struct OptimalSolution {
    values    : Vec<f64>,
    objective : f64,
}

impl OptimalSolution {
    pub fn objective(&self) -> f64 { self.objective }
    pub fn values(&self) -> &[f64] { self.values.as_slice() }
    /// Value of a variable.
    pub fn value(&self, v : &Variable) -> Result<f64> {
        self.values.get(v.idx).copied().ok_or_else(|| Error::InvalidParameter(format!("variable index {} out of bounds",v.idx)))
    }
    /// Values of a sequence of variables.
    pub fn values_of(&self, vs : &[Variable]) -> Result<Vec<f64>> {
        vs.iter().map(|v| self.value(v)).collect()
    }
    /// Returns true if a binary variable is set. Values above 0.5 count as set.
    pub fn is_set(&self, v : &Variable) -> Result<bool> { Ok(self.value(v)? > 0.5) }
    /// Evaluate an expression in the solution.
    pub fn evaluate<E>(&self, expr : E) -> Result<f64> where E : IntoExpr {
        expr.into_expr().eval(self.values.as_slice())
    }
}

/// Uniform interpretation of a solve, independent of the backend.
#[derive(Debug)]
pub enum SolveOutcome {
    /// A proven optimal solution.
    Optimal(OptimalSolution),
    /// The problem has no feasible solution.
    Infeasible,
    /// The solver failed, the problem is unbounded, or the solver stopped without proving
    /// optimality.
    SolverError(Error),
}

impl SolveOutcome {
    pub fn is_optimal(&self) -> bool { matches!(self, SolveOutcome::Optimal(_)) }
    pub fn is_infeasible(&self) -> bool { matches!(self, SolveOutcome::Infeasible) }

    /// Convert into `Ok(Some(sol))` for optimal, `Ok(None)` for infeasible and `Err(e)` for a
    /// solver error.
    pub fn into_result(self) -> Result<Option<OptimalSolution>> {
        match self {
            SolveOutcome::Optimal(sol) => Ok(Some(sol)),
            SolveOutcome::Infeasible => Ok(None),
            SolveOutcome::SolverError(e) => Err(e),
        }
    }
}

//======================================================
// ModelAPI
//======================================================

/// The `ModelAPI` object encapsulates an optimization problem and the backend used to solve it.
///
/// Variables and constraints are created through the model and belong to exactly that model.
/// Backend crates define an alias `Model = ModelAPI<Backend>`.
///
/// # Example
///
/// ```rust
/// use pwlmodel::*;
///
/// let mut model = dummy::Model::new(Some("MyModel"));
/// // A binary variable
/// let x = model.variable(Some("x"), binary()).unwrap();
/// // A vector of nonnegative variables named y[0], y[1], y[2]
/// let y = model.variables(Some("y"), 3, nonnegative()).unwrap();
///
/// model.constraint(Some("c1"), Expr::sum(y.iter()).sub(x.mul(3.0)), less_than(0.0)).unwrap();
/// model.objective(Some("obj"), Sense::Maximize, Expr::sum(y.iter())).unwrap();
/// assert_eq!(model.data().num_var(), 4);
/// ```
pub struct ModelAPI<T> where T : BaseModelTrait {
    inner : T,
    data  : ProblemData,
    sol   : Solution,
}

impl<T> ModelAPI<T> where T : BaseModelTrait {
    /// Create a model with an optional name.
    pub fn new(name : Option<&str>) -> ModelAPI<T> {
        ModelAPI{
            inner : T::new(name),
            data  : ProblemData::new(name),
            sol   : Solution::default(),
        }
    }

    /// Create a model using an already configured backend.
    pub fn with_backend(name : Option<&str>, inner : T) -> ModelAPI<T> {
        ModelAPI{
            inner,
            data  : ProblemData::new(name),
            sol   : Solution::default(),
        }
    }

    pub fn capabilities(&self) -> Capabilities { self.inner.capabilities() }
    pub fn backend(&self) -> &T { &self.inner }
    pub fn backend_mut(&mut self) -> &mut T { &mut self.inner }
    /// The problem data entered so far.
    pub fn data(&self) -> &ProblemData { &self.data }

    /// Add a scalar variable.
    ///
    /// # Arguments
    /// - `name` Optional variable name. It is used when writing the problem and passed on to
    ///   the backend.
    /// - `dom` Bounds and integrality of the variable.
    ///
    /// # Returns
    /// The new variable, or `Error::InvalidParameter` if the domain is inconsistent.
    pub fn variable(&mut self, name : Option<&str>, dom : LinearDomain) -> Result<Variable> {
        dom.validate()?;
        Ok(Variable::new(self.data.add_variable(name.map(|v| v.to_string()),&dom)))
    }

    /// Add `n` scalar variables with the same domain. If `name` is given, the variables are
    /// named `name[0]`, `name[1]`, ...
    pub fn variables(&mut self, name : Option<&str>, n : usize, dom : LinearDomain) -> Result<Vec<Variable>> {
        dom.validate()?;
        Ok((0..n).map(|i| Variable::new(self.data.add_variable(name.map(|v| indexed_name(v,&[i])),&dom))).collect())
    }

    /// Add a linear constraint `expr ∈ dom`. The constant term of the expression is moved to
    /// the bounds.
    ///
    /// # Returns
    /// The new constraint, or `Error::InvalidParameter` if the domain is inconsistent or the
    /// expression refers to variables not in the model.
    pub fn constraint<E>(&mut self, name : Option<&str>, expr : E, dom : LinearDomain) -> Result<Constraint> where E : IntoExpr {
        if dom.is_integer() {
            return Err(Error::InvalidParameter("constraint domain cannot be integer".to_string()));
        }
        dom.validate()?;
        let expr = expr.into_expr().compress();
        self.data.check_expr_subj(expr.subj())?;
        let dom = dom.shifted(expr.constant_term());
        Ok(Constraint::new(self.data.add_row(name.map(|v| v.to_string()),expr.subj(),expr.cof(),dom.lower(),dom.upper())))
    }

    /// Declare an SOS2 set: at most two of `vars` may be nonzero, and if two, they must be
    /// adjacent in the order of `weights`.
    ///
    /// # Returns
    /// - `Error::Unsupported` if the backend does not support native SOS2 sets. Callers that can
    ///   fall back to another formulation should check [ModelAPI::capabilities] first.
    /// - `Error::InvalidParameter` if `vars` and `weights` have different lengths, the weights are
    ///   not strictly increasing or a variable is repeated.
    pub fn sos2(&mut self, name : Option<&str>, vars : &[Variable], weights : &[f64]) -> Result<Sos2Set> {
        if ! self.inner.capabilities().native_sos2 {
            return Err(Error::Unsupported("native SOS2 sets".to_string()));
        }
        if vars.len() != weights.len() {
            return Err(Error::InvalidParameter(format!("SOS2 set has {} members but {} weights",vars.len(),weights.len())));
        }
        if vars.is_empty() {
            return Err(Error::InvalidParameter("SOS2 set is empty".to_string()));
        }
        if ! weights.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::InvalidParameter("SOS2 weights must be strictly increasing".to_string()));
        }
        let mut subj : Vec<usize> = vars.iter().map(|v| v.idx).collect();
        self.data.check_expr_subj(subj.as_slice())?;
        subj.sort_unstable();
        if subj.windows(2).any(|w| w[0] == w[1]) {
            return Err(Error::InvalidParameter("SOS2 set contains a repeated variable".to_string()));
        }

        let idx = self.data.sos2.len();
        self.data.sos2.push(Sos2Data{
            name    : name.map(|v| v.to_string()),
            subj    : vars.iter().map(|v| v.idx).collect(),
            weights : weights.to_vec()
        });
        Ok(Sos2Set{ idx, members : vars.to_vec() })
    }

    /// Set the objective. Replaces any previously set objective.
    pub fn objective<E>(&mut self, name : Option<&str>, sense : Sense, expr : E) -> Result<()> where E : IntoExpr {
        let expr = expr.into_expr().compress();
        self.data.check_expr_subj(expr.subj())?;
        self.data.sense      = sense;
        self.data.obj_name   = name.map(|v| v.to_string());
        self.data.c_subj     = expr.subj().to_vec();
        self.data.c_cof      = expr.cof().to_vec();
        self.data.c_constant = expr.constant_term();
        Ok(())
    }

    /// Set a solver parameter in the backend.
    ///
    /// # Arguments
    /// - `parname` Backend specific parameter name, for example `"time_limit"` for HiGHS.
    /// - `parval` Parameter value; `bool`, `i32`, `f64` and strings convert automatically.
    pub fn set_parameter<V>(&mut self, parname : &str, parval : V) -> Result<()> where V : Into<ParameterValue> {
        self.inner.set_parameter(parname,parval.into())
    }

    /// Write the problem in CPLEX LP format, including SOS2 declarations.
    pub fn write_problem<P>(&self, filename : P) -> Result<()> where P : AsRef<Path> {
        let mut f = std::io::BufWriter::new(std::fs::File::create(filename.as_ref())?);
        lp_format::write_lp(&self.data,&mut f)?;
        Ok(())
    }

    /// Solve the problem and extract the solution.
    ///
    /// This will fail if the backend fails with an error. Not producing a solution, producing a
    /// non-optimal solution or proving infeasibility is *not* an error.
    pub fn solve(&mut self) -> Result<()> {
        self.sol = Solution::default();
        info!("Solving model {:?}: {} variables ({} integer), {} constraints, {} nonzeros, {} SOS2 sets",
              self.data.name().unwrap_or(""),
              self.data.num_var(),
              self.data.num_integer(),
              self.data.num_con(),
              self.data.num_nonzeros(),
              self.data.sos2.len());
        let t0 = Instant::now();
        let res = self.inner.solve(&self.data,&mut self.sol);
        info!("Solve finished in {:?} with status {:?}", t0.elapsed(), self.sol.status);
        if let Err(e) = res {
            self.sol = Solution::default();
            return Err(e);
        }

        if self.sol.status.has_values() {
            if self.sol.var.len() != self.data.num_var() {
                let n = self.sol.var.len();
                self.sol = Solution::default();
                return Err(Error::Backend(format!("backend returned {} values for {} variables",n,self.data.num_var())));
            }
            self.sol.obj = self.data.objective_value(self.sol.var.as_slice());
            let viol = self.data.max_violation(self.sol.var.as_slice(),FEASIBILITY_TOLERANCE);
            if viol > FEASIBILITY_TOLERANCE {
                warn!("Solution violates the problem by {:e}", viol);
            }
            debug!("Objective value {}", self.sol.obj);
        }
        else {
            self.sol.var.clear();
        }
        Ok(())
    }

    /// Solve the problem and interpret the result. See [SolveOutcome].
    pub fn solve_and_interpret(&mut self) -> SolveOutcome {
        if let Err(e) = self.solve() {
            return SolveOutcome::SolverError(e);
        }
        match self.sol.status {
            SolutionStatus::Optimal => SolveOutcome::Optimal(OptimalSolution{ values : self.sol.var.clone(), objective : self.sol.obj }),
            SolutionStatus::Infeasible => SolveOutcome::Infeasible,
            SolutionStatus::Unbounded => SolveOutcome::SolverError(Error::Unbounded),
            status => {
                warn!("Solver stopped with status {:?}", status);
                SolveOutcome::SolverError(Error::NotOptimal(status))
            }
        }
    }

    /// Status of the current solution.
    pub fn solution_status(&self) -> SolutionStatus { self.sol.status }

    /// Primal objective value, if a solution is available.
    pub fn primal_objective_value(&self) -> Option<f64> {
        if self.sol.status.has_values() { Some(self.sol.obj) } else { None }
    }

    /// Get the primal solution value of a variable or the activity of a constraint.
    pub fn primal_solution<I>(&self, item : &I) -> Result<f64> where I : ModelItem {
        if ! self.sol.status.has_values() {
            return Err(Error::SolutionUnavailable);
        }
        item.primal(&self.data,self.sol.var.as_slice())
    }

    /// Evaluate an expression in the primal solution.
    pub fn evaluate_primal<E>(&self, expr : E) -> Result<f64> where E : IntoExpr {
        if ! self.sol.status.has_values() {
            return Err(Error::SolutionUnavailable);
        }
        expr.into_expr().eval(self.sol.var.as_slice())
    }
}
