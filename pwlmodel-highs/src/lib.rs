//! This module implements the HiGHS backend for [ModelAPI]. It supports
//! - Continuous and integer variables with bounds
//! - Linear and ranged constraints
//! - Solver options by name through [ModelAPI::set_parameter], for example `"time_limit"` or
//!   `"mip_rel_gap"`. Output is off by default; set `"output_flag"` to `true` to see the solver log.
//!
//! HiGHS has no SOS2 sets, so [pwlmodel::pwl::add_piecewise_linear] uses segment selector
//! binaries with this backend.
//!
//! # Example: `milo1`
//!
//! ```rust
//! use pwlmodel::*;
//! use pwlmodel_highs::Model;
//!
//! let mut m = Model::new(Some("milo1"));
//! let x0 = m.variable(Some("x0"), greater_than(0.0).integer()).unwrap();
//! let x1 = m.variable(Some("x1"), greater_than(0.0).integer()).unwrap();
//!
//! m.constraint(Some("c1"), Expr::dot(&[x0,x1], &[50.0,31.0]), less_than(250.0)).unwrap();
//! m.constraint(Some("c2"), Expr::dot(&[x0,x1], &[3.0,-2.0]), greater_than(-4.0)).unwrap();
//! m.objective(Some("obj"), Sense::Maximize, Expr::dot(&[x0,x1], &[1.0,0.64])).unwrap();
//!
//! match m.solve_and_interpret() {
//!     SolveOutcome::Optimal(sol) => {
//!         assert_eq!(sol.value(&x0).unwrap().round(), 5.0);
//!         assert_eq!(sol.value(&x1).unwrap().round(), 0.0);
//!     },
//!     other => panic!("unexpected outcome {:?}", other)
//! }
//! ```

use itertools::izip;
use log::debug;
use highs::{Col, HighsModelStatus, RowProblem};

use pwlmodel::*;

pub type Model = ModelAPI<Backend>;

/// HiGHS backend. The problem is transferred to HiGHS on every solve.
#[derive(Default)]
pub struct Backend {
    name    : Option<String>,
    options : Vec<(String,ParameterValue)>,
}

fn apply_option(model : &mut highs::Model, name : &str, value : &ParameterValue) -> Result<()> {
    let res = match value {
        ParameterValue::Bool(v)   => model.try_set_option(name, *v),
        ParameterValue::Int(v)    => model.try_set_option(name, *v),
        ParameterValue::Double(v) => model.try_set_option(name, *v),
        ParameterValue::Str(v)    => model.try_set_option(name, v.as_str()),
    };
    res.map_err(|e| Error::Backend(format!("HiGHS rejected option {} = {:?}: {:?}",name,value,e)))
}

impl BaseModelTrait for Backend {
    fn new(name : Option<&str>) -> Self {
        Backend{
            name : name.map(|v| v.to_string()),
            .. Default::default()
        }
    }

    fn capabilities(&self) -> Capabilities { Capabilities{ native_sos2 : false } }

    /// Options are validated by HiGHS when solving.
    fn set_parameter(&mut self, parname : &str, parval : ParameterValue) -> Result<()> {
        if let Some(item) = self.options.iter_mut().find(|(n,_)| n == parname) {
            item.1 = parval;
        }
        else {
            self.options.push((parname.to_string(),parval));
        }
        Ok(())
    }

    fn solve(&mut self, data : &ProblemData, sol : &mut Solution) -> Result<()> {
        if ! data.sos2_sets().is_empty() {
            return Err(Error::Unsupported("native SOS2 sets".to_string()));
        }

        let c = data.dense_objective();
        let mut pb = RowProblem::default();
        let cols : Vec<Col> = izip!(0..data.num_var(),c.iter())
            .map(|(j,&cj)| {
                let (lb,ub) = data.var_bounds(j);
                pb.add_column_with_integrality(cj, lb..=ub, data.is_integer(j))
            })
            .collect();
        for i in 0..data.num_con() {
            let (subj,cof) = data.row(i);
            let (lb,ub) = data.con_bounds(i);
            pb.add_row(lb..=ub, izip!(subj.iter(),cof.iter()).map(|(&j,&a)| (cols[j],a)));
        }

        let sense = match data.sense() {
            Sense::Maximize => highs::Sense::Maximise,
            Sense::Minimize => highs::Sense::Minimise,
        };
        let mut model = pb.optimise(sense);
        model.make_quiet();
        for (name,value) in self.options.iter() {
            apply_option(&mut model, name.as_str(), value)?;
        }

        debug!("HiGHS: solving {:?}", self.name.as_deref().unwrap_or(""));
        let solved = model.try_solve().map_err(|e| Error::Backend(format!("HiGHS failed: {:?}",e)))?;
        let status = solved.status();
        debug!("HiGHS: model status {:?}", status);

        match status {
            HighsModelStatus::Optimal | HighsModelStatus::ModelEmpty => {
                sol.status = SolutionStatus::Optimal;
                sol.var = solved.get_solution().columns().to_vec();
            },
            HighsModelStatus::Infeasible => {
                sol.status = SolutionStatus::Infeasible;
            },
            HighsModelStatus::Unbounded => {
                sol.status = SolutionStatus::Unbounded;
            },
            // Presolve does not tell the two apart. With all variables bounded the problem
            // cannot be unbounded.
            HighsModelStatus::UnboundedOrInfeasible => {
                let bounded = (0..data.num_var()).all(|j| { let (lb,ub) = data.var_bounds(j); lb.is_finite() && ub.is_finite() });
                sol.status = if bounded { SolutionStatus::Infeasible } else { SolutionStatus::Unknown };
            },
            _ => {
                sol.status = SolutionStatus::Unknown;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lp() {
        // max x + y, x + 2y <= 4, 3x + y <= 6, x,y >= 0  =>  x = 1.6, y = 1.2
        let mut m = Model::new(Some("lp"));
        let x = m.variable(Some("x"), nonnegative()).unwrap();
        let y = m.variable(Some("y"), nonnegative()).unwrap();
        let c1 = m.constraint(Some("c1"), x.add(y.mul(2.0)), less_than(4.0)).unwrap();
        m.constraint(Some("c2"), x.mul(3.0).add(&y), less_than(6.0)).unwrap();
        m.objective(Some("obj"), Sense::Maximize, x.add(&y).add(1.0)).unwrap();
        m.solve().unwrap();

        assert_eq!(m.solution_status(), SolutionStatus::Optimal);
        assert!((m.primal_solution(&x).unwrap() - 1.6).abs() < 1e-7);
        assert!((m.primal_solution(&y).unwrap() - 1.2).abs() < 1e-7);
        assert!((m.primal_solution(&c1).unwrap() - 4.0).abs() < 1e-7);
        // the objective includes the constant term
        assert!((m.primal_objective_value().unwrap() - 3.8).abs() < 1e-7);
    }

    #[test]
    fn infeasible() {
        let mut m = Model::new(None);
        let x = m.variable(None, binary()).unwrap();
        let y = m.variable(None, binary()).unwrap();
        m.constraint(None, x.add(&y), greater_than(3.0)).unwrap();
        m.objective(None, Sense::Minimize, x.add(&y)).unwrap();
        assert!(m.solve_and_interpret().is_infeasible());
    }

    #[test]
    fn unbounded() {
        let mut m = Model::new(None);
        let x = m.variable(None, nonnegative()).unwrap();
        m.objective(None, Sense::Maximize, &x).unwrap();
        assert!(matches!(m.solve_and_interpret(), SolveOutcome::SolverError(_)));
    }

    #[test]
    fn parameters() {
        let mut m = Model::new(None);
        let x = m.variable(None, in_range(0.0, 2.5).integer()).unwrap();
        m.objective(None, Sense::Maximize, &x).unwrap();
        m.set_parameter("time_limit", 10.0).unwrap();
        m.set_parameter("mip_rel_gap", 0.0).unwrap();
        let sol = m.solve_and_interpret().into_result().unwrap().unwrap();
        assert_eq!(sol.value(&x).unwrap().round(), 2.0);

        m.set_parameter("no_such_option", 1).unwrap();
        assert!(matches!(m.solve(), Err(Error::Backend(_))));
    }

    #[test]
    fn rejects_sos2_declarations() {
        let mut data_model = pwlmodel::dummy::Model::new(None);
        let w = data_model.variables(None, 3, in_range(0.0,1.0)).unwrap();
        data_model.sos2(None, w.as_slice(), &[0.0,1.0,2.0]).unwrap();
        let mut b = Backend::new(None);
        let mut sol = Solution::default();
        assert!(matches!(b.solve(data_model.data(), &mut sol), Err(Error::Unsupported(_))));
    }
}
