//! Capacitated warehouse location.
//!
//! Warehouse `i` has opening cost `f_i` and capacity `b_i`; customer `j` has demand `a_j` and is
//! served by exactly one open warehouse at cost `c_ij`. The primal problem is
//! ```text
//! min  Σ_i f_i y_i + Σ_ij c_ij x_ij
//! s.t. Σ_j a_j x_ij <= b_i     for all i
//!      Σ_i x_ij      = 1       for all j
//!      x_ij         <= y_i     for all i,j
//!      x, y binary
//! ```
//! Relaxing the capacity rows with multipliers `λ_i >= 0` gives the Lagrangian problem
//! ```text
//! min  Σ_i f_i y_i + Σ_ij (c_ij + λ_i a_j) x_ij - Σ_i λ_i b_i
//! ```
//! subject to the remaining rows. Its optimal value is a lower bound on the primal optimum.

use itertools::izip;
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::*;
use crate::expr::Expr;
use crate::model::{BaseModelTrait, ModelAPI, OptimalSolution, Sense};
use crate::utils::indexed_name;
use crate::variable::Variable;
use crate::{Error, Result};

const CAPACITY_TOLERANCE : f64 = 1e-9;

/// Data of a warehouse location instance.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct WarehouseInstance {
    /// Cost `c[i][j]` of serving customer `j` from warehouse `i`.
    pub assign_cost : Vec<Vec<f64>>,
    /// Opening cost per warehouse.
    pub open_cost   : Vec<f64>,
    /// Demand per customer.
    pub demand      : Vec<f64>,
    /// Capacity per warehouse.
    pub capacity    : Vec<f64>,
}

impl WarehouseInstance {
    pub fn new(assign_cost : Vec<Vec<f64>>, open_cost : Vec<f64>, demand : Vec<f64>, capacity : Vec<f64>) -> Result<WarehouseInstance> {
        let inst = WarehouseInstance{ assign_cost, open_cost, demand, capacity };
        inst.validate()?;
        Ok(inst)
    }

    /// Random instance: assignment costs in `[1,10)`, opening costs in `[30,100)`, demands in
    /// `[5,10)` and capacities in `[50,70)`.
    pub fn random<R>(num_warehouses : usize, num_customers : usize, rng : &mut R) -> WarehouseInstance where R : Rng {
        WarehouseInstance{
            assign_cost : (0..num_warehouses).map(|_| (0..num_customers).map(|_| rng.gen_range(1.0..10.0)).collect()).collect(),
            open_cost   : (0..num_warehouses).map(|_| rng.gen_range(30.0..100.0)).collect(),
            demand      : (0..num_customers).map(|_| rng.gen_range(5.0..10.0)).collect(),
            capacity    : (0..num_warehouses).map(|_| rng.gen_range(50.0..70.0)).collect(),
        }
    }

    pub fn num_warehouses(&self) -> usize { self.open_cost.len() }
    pub fn num_customers(&self) -> usize { self.demand.len() }

    /// Check dimensions and that all values are finite.
    pub fn validate(&self) -> Result<()> {
        let (n,m) = (self.num_warehouses(),self.num_customers());
        if n == 0 {
            return Err(Error::InvalidParameter("instance has no warehouses".to_string()));
        }
        if self.capacity.len() != n || self.assign_cost.len() != n || self.assign_cost.iter().any(|r| r.len() != m) {
            return Err(Error::InvalidParameter(format!("dimensions do not match {} warehouses and {} customers",n,m)));
        }
        let mut all = self.assign_cost.iter().flatten().chain(self.open_cost.iter()).chain(self.demand.iter()).chain(self.capacity.iter());
        if let Some(v) = all.find(|v| ! v.is_finite()) {
            return Err(Error::InvalidParameter(format!("instance contains the value {}",v)));
        }
        Ok(())
    }
}

/// Opening and assignment decisions.
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Decisions {
    /// Whether each warehouse is open.
    pub open   : Vec<bool>,
    /// The warehouse serving each customer.
    pub serves : Vec<usize>,
}

impl Decisions {
    /// Total opening and assignment cost.
    pub fn cost(&self, inst : &WarehouseInstance) -> f64 {
        let open : f64 = izip!(self.open.iter(),inst.open_cost.iter()).filter(|(o,_)| **o).map(|(_,f)| f).sum();
        let assign : f64 = self.serves.iter().enumerate().map(|(j,&i)| inst.assign_cost[i][j]).sum();
        open + assign
    }

    /// Demand served by each warehouse.
    pub fn served_demand(&self, inst : &WarehouseInstance) -> Vec<f64> {
        let mut res = vec![0.0; inst.num_warehouses()];
        for (&i,&a) in self.serves.iter().zip(inst.demand.iter()) { res[i] += a; }
        res
    }

    /// Returns true if the decisions satisfy all primal constraints: customers are served by
    /// open warehouses, within capacity.
    pub fn is_feasible(&self, inst : &WarehouseInstance) -> bool {
        self.open.len() == inst.num_warehouses()
            && self.serves.len() == inst.num_customers()
            && self.serves.iter().all(|&i| i < self.open.len() && self.open[i])
            && izip!(self.served_demand(inst).iter(),inst.capacity.iter()).all(|(&d,&b)| d <= b + CAPACITY_TOLERANCE)
    }
}

/// Primal or Lagrangian warehouse model.
pub struct WarehouseModel<T> where T : BaseModelTrait {
    model : ModelAPI<T>,
    x     : Vec<Vec<Variable>>,
    y     : Vec<Variable>,
}

impl<T> WarehouseModel<T> where T : BaseModelTrait {
    fn build(inst : &WarehouseInstance, multipliers : Option<&[f64]>) -> Result<WarehouseModel<T>> {
        inst.validate()?;
        let (n,m) = (inst.num_warehouses(),inst.num_customers());
        let mut model = ModelAPI::<T>::new(Some(if multipliers.is_some() { "warehouse_lagrangian" } else { "warehouse" }));

        let x = (0..n).map(|i| (0..m).map(|j| model.variable(Some(indexed_name("x",&[i,j]).as_str()), binary())).collect::<Result<Vec<Variable>>>())
            .collect::<Result<Vec<Vec<Variable>>>>()?;
        let y = model.variables(Some("y"), n, binary())?;

        let mut obj = Expr::dot(y.as_slice(),inst.open_cost.as_slice());
        match multipliers {
            None => {
                for (i,xi) in x.iter().enumerate() {
                    obj = obj.add(Expr::dot(xi.as_slice(),inst.assign_cost[i].as_slice()));
                    model.constraint(Some(indexed_name("capacity",&[i]).as_str()),
                                     Expr::dot(xi.as_slice(),inst.demand.as_slice()),
                                     less_than(inst.capacity[i]))?;
                }
            },
            Some(lambda) => {
                for (i,(xi,&l)) in x.iter().zip(lambda.iter()).enumerate() {
                    let cof : Vec<f64> = izip!(inst.assign_cost[i].iter(),inst.demand.iter()).map(|(&c,&a)| c + l * a).collect();
                    obj = obj.add(Expr::dot(xi.as_slice(),cof.as_slice())).sub(l * inst.capacity[i]);
                }
            }
        }

        for j in 0..m {
            model.constraint(Some(indexed_name("serve",&[j]).as_str()), Expr::sum(x.iter().map(|xi| xi[j])), equal_to(1.0))?;
        }
        for (i,(xi,yi)) in x.iter().zip(y.iter()).enumerate() {
            for (j,xij) in xi.iter().enumerate() {
                model.constraint(Some(indexed_name("open",&[i,j]).as_str()), xij.sub(yi), less_than(0.0))?;
            }
        }
        model.objective(Some("cost"), Sense::Minimize, obj)?;

        Ok(WarehouseModel{ model, x, y })
    }

    /// The primal model.
    pub fn primal(inst : &WarehouseInstance) -> Result<WarehouseModel<T>> {
        WarehouseModel::build(inst,None)
    }

    /// The Lagrangian relaxation of the capacity rows.
    ///
    /// # Returns
    /// `Error::InvalidParameter` unless there is one finite, nonnegative multiplier per
    /// warehouse.
    pub fn lagrangian(inst : &WarehouseInstance, multipliers : &[f64]) -> Result<WarehouseModel<T>> {
        if multipliers.len() != inst.num_warehouses() {
            return Err(Error::InvalidParameter(format!("{} multipliers for {} warehouses",multipliers.len(),inst.num_warehouses())));
        }
        if let Some(l) = multipliers.iter().find(|l| ! (l.is_finite() && **l >= 0.0)) {
            return Err(Error::InvalidParameter(format!("multipliers must be finite and nonnegative, got {}",l)));
        }
        WarehouseModel::build(inst,Some(multipliers))
    }

    pub fn model(&self) -> &ModelAPI<T> { &self.model }
    pub fn model_mut(&mut self) -> &mut ModelAPI<T> { &mut self.model }

    /// Read the decisions from a solution.
    pub fn decisions(&self, sol : &OptimalSolution) -> Result<Decisions> {
        let open = self.y.iter().map(|v| sol.is_set(v)).collect::<Result<Vec<bool>>>()?;
        let mut serves = Vec::new();
        for j in 0..self.x.first().map(|xi| xi.len()).unwrap_or(0) {
            let mut sel = Vec::new();
            for (i,xi) in self.x.iter().enumerate() {
                if sol.is_set(&xi[j])? { sel.push(i); }
            }
            match sel.as_slice() {
                [i] => serves.push(*i),
                _ => return Err(Error::Backend(format!("customer {} is served by warehouses {:?}",j,sel))),
            }
        }
        Ok(Decisions{ open, serves })
    }

    /// Solve the model.
    ///
    /// # Returns
    /// `Ok(Some((decisions,objective)))` on an optimal solution, `Ok(None)` if the model is
    /// infeasible.
    pub fn solve(&mut self) -> Result<Option<(Decisions,f64)>> {
        match self.model.solve_and_interpret().into_result()? {
            Some(sol) => Ok(Some((self.decisions(&sol)?,sol.objective()))),
            None => Ok(None),
        }
    }
}

/// Outcome of comparing the primal problem with its Lagrangian relaxation.
#[derive(Clone,Debug)]
pub struct DualityReport {
    pub primal_objective     : f64,
    pub lagrangian_objective : f64,
    /// The Lagrangian decisions.
    pub lagrangian_decisions : Decisions,
    /// Whether the Lagrangian decisions are feasible for the primal problem.
    pub lagrangian_feasible  : bool,
}

impl DualityReport {
    /// `primal_objective - lagrangian_objective`, nonnegative up to solver tolerances.
    pub fn duality_gap(&self) -> f64 { self.primal_objective - self.lagrangian_objective }
}

/// Solve the primal problem and the Lagrangian relaxation with the given multipliers.
///
/// # Returns
/// `Ok(None)` if the primal problem is infeasible.
pub fn duality_report<T>(inst : &WarehouseInstance, multipliers : &[f64]) -> Result<Option<DualityReport>> where T : BaseModelTrait {
    let primal = WarehouseModel::<T>::primal(inst)?.solve()?;
    let Some((_,primal_objective)) = primal else {
        info!("Primal warehouse problem is infeasible");
        return Ok(None);
    };
    // the relaxation only drops capacity rows, so it is feasible whenever the primal is
    let (lagrangian_decisions,lagrangian_objective) = WarehouseModel::<T>::lagrangian(inst,multipliers)?.solve()?
        .ok_or_else(|| Error::Backend("Lagrangian relaxation reported infeasible".to_string()))?;
    let lagrangian_feasible = lagrangian_decisions.is_feasible(inst);
    info!("Objective (primal) = {}, objective (Lagrangian) = {}, duality gap = {}, primal feasible = {}",
          primal_objective, lagrangian_objective, primal_objective - lagrangian_objective, lagrangian_feasible);
    Ok(Some(DualityReport{ primal_objective, lagrangian_objective, lagrangian_decisions, lagrangian_feasible }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn instance() -> WarehouseInstance {
        WarehouseInstance::new(
            vec![vec![1.0,2.0,3.0],vec![3.0,2.0,1.0]],
            vec![10.0,20.0],
            vec![4.0,5.0,6.0],
            vec![10.0,12.0]).unwrap()
    }

    #[test]
    fn decisions() {
        let inst = instance();
        let d = Decisions{ open : vec![true,true], serves : vec![0,0,1] };
        assert_eq!(d.cost(&inst), 30.0 + 1.0 + 2.0 + 1.0);
        assert_eq!(d.served_demand(&inst), vec![9.0,6.0]);
        assert!(d.is_feasible(&inst));

        // over capacity
        let d = Decisions{ open : vec![true,false], serves : vec![0,0,0] };
        assert!(! d.is_feasible(&inst));
        // served by a closed warehouse
        let d = Decisions{ open : vec![true,false], serves : vec![0,1,0] };
        assert!(! d.is_feasible(&inst));
    }

    #[test]
    fn invalid_instances() {
        assert!(WarehouseInstance::new(vec![], vec![], vec![1.0], vec![]).is_err());
        assert!(WarehouseInstance::new(vec![vec![1.0]], vec![1.0], vec![1.0,2.0], vec![1.0]).is_err());
        assert!(WarehouseInstance::new(vec![vec![1.0]], vec![1.0], vec![f64::INFINITY], vec![1.0]).is_err());
        let inst = instance();
        assert!(WarehouseModel::<dummy::Backend>::lagrangian(&inst, &[1.0]).is_err());
        assert!(WarehouseModel::<dummy::Backend>::lagrangian(&inst, &[1.0,-1.0]).is_err());
    }

    #[test]
    fn random_instance() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let inst = WarehouseInstance::random(5, 8, &mut rng);
        assert!(inst.validate().is_ok());
        assert!(inst.capacity.iter().all(|&b| (50.0..70.0).contains(&b)));
        assert!(inst.demand.iter().all(|&a| (5.0..10.0).contains(&a)));
    }

    #[test]
    fn primal_structure() {
        let inst = instance();
        let wm = WarehouseModel::<dummy::Backend>::primal(&inst).unwrap();
        let data = wm.model().data();
        assert_eq!(data.num_var(), 8);
        // 2 capacity, 3 serve, 6 open
        assert_eq!(data.num_con(), 11);
        assert_eq!(data.con_bounds(1), (f64::NEG_INFINITY,12.0));
        assert_eq!(data.dense_objective(), vec![1.0,2.0,3.0,3.0,2.0,1.0,10.0,20.0]);
        assert_eq!(data.objective().2, 0.0);
    }

    #[test]
    fn lagrangian_structure() {
        let inst = instance();
        let wm = WarehouseModel::<dummy::Backend>::lagrangian(&inst, &[1.0,0.5]).unwrap();
        let data = wm.model().data();
        assert_eq!(data.num_con(), 9);
        assert_eq!(data.dense_objective(), vec![5.0,7.0,9.0,5.0,4.5,4.0,10.0,20.0]);
        assert_eq!(data.objective().2, -(10.0 + 6.0));
    }
}
