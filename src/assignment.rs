//! Assignment of units to facilities under a queueing-delay limit.
//!
//! Every unit is assigned to exactly one facility. Facility `j` has service rate `rate_j` and
//! per-unit cost `cost_j`; with `L_j` units assigned its M/M/1 queueing delay is
//! `1/(rate_j - L_j)`, which must not exceed `theta`. The objective is the total assignment cost
//! `Σ_j cost_j · L_j`.
//!
//! The delay limit is formulated either with a piecewise-linear approximation of the delay (see
//! [crate::pwl]), or exactly as the capacity limit `L_j <= rate_j - 1/theta`, which is equivalent
//! because the delay is increasing in the load.

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::*;
use crate::expr::Expr;
use crate::model::{BaseModelTrait, ModelAPI, OptimalSolution, Sense};
use crate::pwl::{add_piecewise_linear, BreakpointTable, PiecewiseLinear, PwlConfig, QueueingDelay, ResponseFunction};
use crate::utils::indexed_name;
use crate::variable::Variable;
use crate::{Constraint, Error, Result};

/// Problem data of an assignment instance.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
pub struct Scenario {
    pub num_units : usize,
    /// Service rate per facility.
    pub rates     : Vec<f64>,
    /// Cost per assigned unit, per facility.
    pub costs     : Vec<f64>,
    /// Upper limit on the queueing delay of every facility.
    pub theta     : f64,
}

impl Scenario {
    /// Create and validate a scenario.
    pub fn new(num_units : usize, rates : Vec<f64>, costs : Vec<f64>, theta : f64) -> Result<Scenario> {
        let s = Scenario{ num_units, rates, costs, theta };
        s.validate()?;
        Ok(s)
    }

    /// Random scenario with integer rates in `3..=6` and integer costs in `10..=40`.
    pub fn random<R>(num_units : usize, num_facilities : usize, theta : f64, rng : &mut R) -> Scenario where R : Rng {
        let rates = (0..num_facilities).map(|_| rng.gen_range(3..=6) as f64).collect();
        let costs = (0..num_facilities).map(|_| rng.gen_range(10..=40) as f64).collect();
        Scenario{ num_units, rates, costs, theta }
    }

    /// Check the scenario.
    ///
    /// # Returns
    /// `Error::InvalidParameter` unless there is at least one facility, rates and costs have the
    /// same length, rates and `theta` are finite and positive and costs are finite.
    pub fn validate(&self) -> Result<()> {
        if self.rates.is_empty() {
            return Err(Error::InvalidParameter("scenario has no facilities".to_string()));
        }
        if self.rates.len() != self.costs.len() {
            return Err(Error::InvalidParameter(format!("{} rates but {} costs",self.rates.len(),self.costs.len())));
        }
        if let Some(r) = self.rates.iter().find(|r| ! (r.is_finite() && **r > 0.0)) {
            return Err(Error::InvalidParameter(format!("service rate must be finite and positive, got {}",r)));
        }
        if let Some(c) = self.costs.iter().find(|c| ! c.is_finite()) {
            return Err(Error::InvalidParameter(format!("cost must be finite, got {}",c)));
        }
        if ! (self.theta.is_finite() && self.theta > 0.0) {
            return Err(Error::InvalidParameter(format!("delay limit must be finite and positive, got {}",self.theta)));
        }
        Ok(())
    }

    pub fn num_facilities(&self) -> usize { self.rates.len() }

    /// Index of the facility with the lowest cost; the first one on ties.
    pub fn cheapest_facility(&self) -> usize {
        self.costs.iter().enumerate()
            .fold((0,f64::INFINITY), |(bj,bc),(j,&c)| if c < bc { (j,c) } else { (bj,bc) })
            .0
    }

    /// Assign every unit to the cheapest facility, ignoring the delay limit.
    pub fn naive_assignment(&self) -> Assignment {
        Assignment{
            facility_of    : vec![self.cheapest_facility(); self.num_units],
            num_facilities : self.num_facilities()
        }
    }

    /// Cost of [Scenario::naive_assignment]. It is a lower bound on the cost of any assignment.
    pub fn naive_cost(&self) -> f64 { self.naive_assignment().cost(self) }
}

/// How the delay limit is formulated.
#[derive(Clone,Debug,PartialEq,Serialize,Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelayFormulation {
    /// Piecewise-linear approximation of the delay per facility. The approximation
    /// over-estimates the delay, so solutions are feasible for the exact limit.
    PiecewiseLinear(PwlConfig),
    /// The equivalent capacity limit `L_j <= rate_j - 1/theta`.
    ExactCapacity,
}

/// Units-to-facilities assignment.
#[derive(Clone,Debug,PartialEq,Eq)]
pub struct Assignment {
    facility_of    : Vec<usize>,
    num_facilities : usize,
}

impl Assignment {
    /// Create an assignment from the facility of each unit.
    pub fn new(facility_of : Vec<usize>, num_facilities : usize) -> Result<Assignment> {
        if let Some(&j) = facility_of.iter().find(|&&j| j >= num_facilities) {
            return Err(Error::InvalidParameter(format!("facility {} out of range, {} facilities",j,num_facilities)));
        }
        Ok(Assignment{ facility_of, num_facilities })
    }

    /// The facility of each unit.
    pub fn facility_of(&self) -> &[usize] { self.facility_of.as_slice() }

    /// Number of units per facility.
    pub fn loads(&self) -> Vec<usize> {
        let mut loads = vec![0; self.num_facilities];
        for &j in self.facility_of.iter() { loads[j] += 1; }
        loads
    }

    /// Total assignment cost.
    pub fn cost(&self, scenario : &Scenario) -> f64 {
        self.facility_of.iter().map(|&j| scenario.costs[j]).sum()
    }

    /// Exact queueing delay per facility. A facility whose load reaches its rate has
    /// `Err(Error::UndefinedRegion)`; the other facilities are still reported.
    pub fn delays(&self, scenario : &Scenario) -> Vec<Result<f64>> {
        self.loads().iter().zip(scenario.rates.iter())
            .map(|(&l,&r)| QueueingDelay::new(r)?.try_value(l as f64))
            .collect()
    }

    /// Returns true if every facility has a defined delay of at most `theta`.
    pub fn satisfies_delay_limit(&self, scenario : &Scenario) -> bool {
        self.delays(scenario).iter().all(|d| matches!(d, Ok(v) if *v <= scenario.theta))
    }
}

/// An assignment problem built in a model.
pub struct AssignmentModel<T> where T : BaseModelTrait {
    model     : ModelAPI<T>,
    scenario  : Scenario,
    x         : Vec<Vec<Variable>>,
    delay     : Vec<PiecewiseLinear>,
    delay_lim : Vec<Constraint>,
}

impl<T> AssignmentModel<T> where T : BaseModelTrait {
    /// Build the model of a scenario.
    ///
    /// # Returns
    /// The model, or the first error from validating the scenario or building the delay
    /// formulation.
    pub fn build(scenario : &Scenario, formulation : &DelayFormulation) -> Result<AssignmentModel<T>> {
        scenario.validate()?;
        let (n,m) = (scenario.num_units,scenario.num_facilities());
        let mut model = ModelAPI::<T>::new(Some("assignment"));

        let x = (0..n).map(|i| (0..m).map(|j| model.variable(Some(indexed_name("x",&[i,j]).as_str()), binary())).collect::<Result<Vec<Variable>>>())
            .collect::<Result<Vec<Vec<Variable>>>>()?;

        for (i,xi) in x.iter().enumerate() {
            model.constraint(Some(indexed_name("assign",&[i]).as_str()), xi.as_slice(), equal_to(1.0))?;
        }

        let load = |j : usize| Expr::sum(x.iter().map(|xi| xi[j]));
        let mut delay = Vec::new();
        let mut delay_lim = Vec::new();
        match formulation {
            DelayFormulation::PiecewiseLinear(config) => {
                for (j,&rate) in scenario.rates.iter().enumerate() {
                    let table = BreakpointTable::sample(&QueueingDelay::new(rate)?,config)?;
                    let pwl = add_piecewise_linear(&mut model, indexed_name("delay",&[j]).as_str(), table, load(j), config)?;
                    delay_lim.push(model.constraint(Some(indexed_name("theta",&[j]).as_str()), pwl.response(), less_than(scenario.theta))?);
                    delay.push(pwl);
                }
            },
            DelayFormulation::ExactCapacity => {
                for (j,&rate) in scenario.rates.iter().enumerate() {
                    let cap = rate - 1.0/scenario.theta;
                    debug!("Facility {} capacity {}", j, cap);
                    delay_lim.push(model.constraint(Some(indexed_name("capacity",&[j]).as_str()), load(j), less_than(cap))?);
                }
            }
        }

        let obj = Expr::sum(x.iter().flat_map(|xi| xi.iter().zip(scenario.costs.iter()).map(|(&v,&c)| v.mul(c))));
        model.objective(Some("cost"), Sense::Minimize, obj)?;

        info!("Built assignment model: {} units, {} facilities, {} variables, {} constraints",
              n, m, model.data().num_var(), model.data().num_con());
        Ok(AssignmentModel{ model, scenario : scenario.clone(), x, delay, delay_lim })
    }

    pub fn model(&self) -> &ModelAPI<T> { &self.model }
    pub fn model_mut(&mut self) -> &mut ModelAPI<T> { &mut self.model }
    pub fn scenario(&self) -> &Scenario { &self.scenario }
    /// The binary assignment variables, indexed `[unit][facility]`.
    pub fn assignment_vars(&self) -> &[Vec<Variable>] { self.x.as_slice() }
    /// The piecewise-linear delay approximations; empty for the exact formulation.
    pub fn delays(&self) -> &[PiecewiseLinear] { self.delay.as_slice() }
    /// The delay-limit or capacity constraint per facility.
    pub fn delay_limits(&self) -> &[Constraint] { self.delay_lim.as_slice() }

    /// Solve the model.
    ///
    /// # Returns
    /// - `Ok(Some((assignment,solution)))` on an optimal solution,
    /// - `Ok(None)` if no assignment satisfies the delay limit,
    /// - `Err(e)` if the solver failed.
    pub fn solve(&mut self) -> Result<Option<(Assignment,OptimalSolution)>> {
        match self.model.solve_and_interpret().into_result()? {
            Some(sol) => {
                let a = self.interpret(&sol)?;
                info!("Optimal assignment cost {}, loads {:?}", sol.objective(), a.loads());
                Ok(Some((a,sol)))
            },
            None => {
                info!("No assignment satisfies the delay limit {}", self.scenario.theta);
                Ok(None)
            }
        }
    }

    /// Read the assignment from a solution.
    ///
    /// # Returns
    /// The assignment, or `Error::Backend` if some unit is not assigned to exactly one
    /// facility.
    pub fn interpret(&self, sol : &OptimalSolution) -> Result<Assignment> {
        let mut facility_of = Vec::with_capacity(self.x.len());
        for (i,xi) in self.x.iter().enumerate() {
            let mut sel = Vec::new();
            for (j,v) in xi.iter().enumerate() {
                if sol.is_set(v)? { sel.push(j); }
            }
            match sel.as_slice() {
                [j] => facility_of.push(*j),
                _ => return Err(Error::Backend(format!("unit {} is assigned to facilities {:?}",i,sel))),
            }
        }
        Assignment::new(facility_of,self.scenario.num_facilities())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy;
    use crate::pwl::Sos2Encoding;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn scenario() -> Scenario {
        Scenario::new(5, vec![3.0,6.0,6.0], vec![10.0,25.0,40.0], 1.0).unwrap()
    }

    #[test]
    fn naive() {
        let s = scenario();
        assert_eq!(s.cheapest_facility(), 0);
        assert_eq!(s.naive_cost(), 50.0);
        let a = s.naive_assignment();
        assert_eq!(a.loads(), vec![5,0,0]);
        // 5 units on rate 3
        let d = a.delays(&s);
        assert!(matches!(d[0], Err(Error::UndefinedRegion{ .. })));
        assert_eq!(*d[1].as_ref().unwrap(), 1.0/6.0);
        assert!(! a.satisfies_delay_limit(&s));
    }

    #[test]
    fn assignment_report() {
        let s = scenario();
        let a = Assignment::new(vec![0,1,0,1,1], 3).unwrap();
        assert_eq!(a.loads(), vec![2,3,0]);
        assert_eq!(a.cost(&s), 95.0);
        assert!(a.satisfies_delay_limit(&s));
        let d : Vec<f64> = a.delays(&s).into_iter().map(|d| d.unwrap()).collect();
        assert_eq!(d, vec![1.0,1.0/3.0,1.0/6.0]);

        assert!(Assignment::new(vec![3], 3).is_err());
    }

    #[test]
    fn invalid_scenarios() {
        assert!(Scenario::new(5, vec![], vec![], 1.0).is_err());
        assert!(Scenario::new(5, vec![3.0], vec![1.0,2.0], 1.0).is_err());
        assert!(Scenario::new(5, vec![0.0], vec![1.0], 1.0).is_err());
        assert!(Scenario::new(5, vec![3.0], vec![f64::NAN], 1.0).is_err());
        assert!(Scenario::new(5, vec![3.0], vec![1.0], 0.0).is_err());
    }

    #[test]
    fn random_scenario() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let s = Scenario::random(5, 3, 1.0, &mut rng);
        assert!(s.validate().is_ok());
        assert!(s.rates.iter().all(|&r| (3.0..=6.0).contains(&r) && r.fract() == 0.0));
        assert!(s.costs.iter().all(|&c| (10.0..=40.0).contains(&c) && c.fract() == 0.0));

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(Scenario::random(5, 3, 1.0, &mut rng), s);
    }

    #[test]
    fn scenario_from_json() {
        let s : Scenario = serde_json::from_str(r#"{"num_units": 5, "rates": [3, 6, 6], "costs": [10, 25, 40], "theta": 1.0}"#).unwrap();
        assert_eq!(s, scenario());
        let f : DelayFormulation = serde_json::from_str(r#""exact_capacity""#).unwrap();
        assert_eq!(f, DelayFormulation::ExactCapacity);
    }

    #[test]
    fn build_pwl() {
        let config = PwlConfig::default().with_samples(10).with_encoding(Sos2Encoding::Selector);
        let am = AssignmentModel::<dummy::Backend>::build(&scenario(), &DelayFormulation::PiecewiseLinear(config)).unwrap();
        let data = am.model().data();
        // x: 15, per facility 10 weights + 1 response + 9 selectors
        assert_eq!(data.num_var(), 15 + 3*20);
        // 5 assignment rows, per facility 3 links + 1 selector sum + 10 adjacency + 1 limit
        assert_eq!(data.num_con(), 5 + 3*15);
        assert_eq!(am.delays().len(), 3);
        assert_eq!(data.con_bounds(am.delay_limits()[0].index()), (f64::NEG_INFINITY,1.0));
        assert_eq!(data.dense_objective()[..3], [10.0,25.0,40.0]);
    }

    #[test]
    fn build_exact() {
        let am = AssignmentModel::<dummy::Backend>::build(&scenario(), &DelayFormulation::ExactCapacity).unwrap();
        let data = am.model().data();
        assert_eq!(data.num_var(), 15);
        assert_eq!(data.num_con(), 8);
        assert!(am.delays().is_empty());
        assert_eq!(data.con_bounds(am.delay_limits()[0].index()), (f64::NEG_INFINITY,2.0));
        assert_eq!(data.con_bounds(am.delay_limits()[2].index()), (f64::NEG_INFINITY,5.0));
        assert_eq!(data.var_name(am.assignment_vars()[4][2].index()), Some("x[4,2]"));
    }
}
