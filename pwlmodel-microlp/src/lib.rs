//! This module implements a backend for [ModelAPI] based on the pure Rust `microlp` solver. It
//! supports continuous, integer and binary variables and linear and ranged constraints. There
//! are no solver parameters and no SOS2 sets.
//!
//! ```rust
//! use pwlmodel::*;
//! use pwlmodel_microlp::Model;
//!
//! let mut m = Model::new(None);
//! let x = m.variables(Some("x"), 3, binary()).unwrap();
//! m.constraint(None, x.as_slice(), less_than(2.0)).unwrap();
//! m.objective(None, Sense::Maximize, Expr::dot(x.as_slice(), &[3.0,1.0,2.0])).unwrap();
//!
//! let sol = m.solve_and_interpret().into_result().unwrap().unwrap();
//! assert!((sol.objective() - 5.0).abs() < 1e-9);
//! ```

use itertools::izip;
use log::debug;
use microlp::{ComparisonOp, OptimizationDirection, Problem};

use pwlmodel::*;

pub type Model = ModelAPI<Backend>;

#[derive(Default)]
pub struct Backend {
    name : Option<String>,
}

fn int_bound(v : f64, default : i32) -> i32 {
    if v.is_finite() { v.clamp(i32::MIN as f64, i32::MAX as f64) as i32 } else { default }
}

impl BaseModelTrait for Backend {
    fn new(name : Option<&str>) -> Self {
        Backend{ name : name.map(|v| v.to_string()) }
    }

    fn capabilities(&self) -> Capabilities { Capabilities{ native_sos2 : false } }

    fn set_parameter(&mut self, parname : &str, _parval : ParameterValue) -> Result<()> {
        Err(Error::Unsupported(format!("parameter {}",parname)))
    }

    fn solve(&mut self, data : &ProblemData, sol : &mut Solution) -> Result<()> {
        if ! data.sos2_sets().is_empty() {
            return Err(Error::Unsupported("native SOS2 sets".to_string()));
        }

        let dir = match data.sense() {
            Sense::Maximize => OptimizationDirection::Maximize,
            Sense::Minimize => OptimizationDirection::Minimize,
        };
        let mut pb = Problem::new(dir);
        let c = data.dense_objective();
        let vars : Vec<microlp::Variable> = izip!(0..data.num_var(),c.iter())
            .map(|(j,&cj)| {
                let (lb,ub) = data.var_bounds(j);
                if ! data.is_integer(j) {
                    pb.add_var(cj, (lb,ub))
                }
                else if lb == 0.0 && ub == 1.0 {
                    pb.add_binary_var(cj)
                }
                else {
                    pb.add_integer_var(cj, (int_bound(lb.ceil(),i32::MIN),int_bound(ub.floor(),i32::MAX)))
                }
            })
            .collect();

        for i in 0..data.num_con() {
            let (subj,cof) = data.row(i);
            let (lb,ub) = data.con_bounds(i);
            if subj.is_empty() {
                if lb > 0.0 || ub < 0.0 {
                    debug!("microlp: empty row {} with bounds [{},{}]", i, lb, ub);
                    sol.status = SolutionStatus::Infeasible;
                    return Ok(());
                }
                continue;
            }
            let terms : Vec<(microlp::Variable,f64)> = izip!(subj.iter(),cof.iter()).map(|(&j,&a)| (vars[j],a)).collect();
            if lb == ub {
                pb.add_constraint(terms, ComparisonOp::Eq, lb);
            }
            else {
                if lb > f64::NEG_INFINITY { pb.add_constraint(terms.clone(), ComparisonOp::Ge, lb); }
                if ub < f64::INFINITY     { pb.add_constraint(terms, ComparisonOp::Le, ub); }
            }
        }

        debug!("microlp: solving {:?}", self.name.as_deref().unwrap_or(""));
        match pb.solve() {
            Ok(res) => {
                sol.status = SolutionStatus::Optimal;
                sol.var = vars.iter().map(|&v| res[v]).collect();
            },
            Err(microlp::Error::Infeasible) => { sol.status = SolutionStatus::Infeasible; },
            Err(microlp::Error::Unbounded) => { sol.status = SolutionStatus::Unbounded; },
            Err(e) => return Err(Error::Backend(format!("microlp failed: {}",e))),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milp() {
        let mut m = Model::new(Some("milp"));
        let x0 = m.variable(Some("x0"), greater_than(0.0).integer()).unwrap();
        let x1 = m.variable(Some("x1"), greater_than(0.0).integer()).unwrap();
        m.constraint(Some("c1"), Expr::dot(&[x0,x1], &[50.0,31.0]), less_than(250.0)).unwrap();
        m.constraint(Some("c2"), Expr::dot(&[x0,x1], &[3.0,-2.0]), greater_than(-4.0)).unwrap();
        m.objective(Some("obj"), Sense::Maximize, Expr::dot(&[x0,x1], &[1.0,0.64])).unwrap();
        let sol = m.solve_and_interpret().into_result().unwrap().unwrap();
        assert!((sol.value(&x0).unwrap() - 5.0).abs() < 1e-6);
        assert!(sol.value(&x1).unwrap().abs() < 1e-6);
    }

    #[test]
    fn ranged_rows() {
        let mut m = Model::new(None);
        let x = m.variable(None, unbounded()).unwrap();
        m.constraint(None, x.add(1.0), in_range(2.0, 5.0)).unwrap();
        m.objective(None, Sense::Minimize, &x).unwrap();
        let sol = m.solve_and_interpret().into_result().unwrap().unwrap();
        assert!((sol.value(&x).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn infeasible() {
        let mut m = Model::new(None);
        let x = m.variables(None, 2, binary()).unwrap();
        m.constraint(None, x.as_slice(), greater_than(3.0)).unwrap();
        assert!(m.solve_and_interpret().is_infeasible());

        let mut m = Model::new(None);
        m.constraint(None, Expr::constant(1.0), less_than(0.0)).unwrap();
        assert!(m.solve_and_interpret().is_infeasible());
    }

    #[test]
    fn no_parameters() {
        let mut m = Model::new(None);
        assert!(matches!(m.set_parameter("time_limit", 1.0), Err(Error::Unsupported(_))));
    }
}
