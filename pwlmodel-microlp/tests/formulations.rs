use approx::assert_abs_diff_eq;

use pwlmodel::*;
use pwlmodel::assignment::{AssignmentModel, DelayFormulation, Scenario};
use pwlmodel::pwl::{add_piecewise_linear, BreakpointTable, PwlConfig, QueueingDelay, Sos2Encoding};
use pwlmodel::shortest_path::{Digraph, ShortestPathModel};
use pwlmodel::warehouse::{duality_report, WarehouseInstance};
use pwlmodel_microlp::{Backend, Model};

const TOL : f64 = 1e-6;

fn scenario() -> Scenario {
    Scenario::new(5, vec![3.0,6.0,6.0], vec![10.0,25.0,40.0], 1.0).unwrap()
}

#[test]
fn assignment_both_formulations() {
    let s = scenario();
    let config = PwlConfig::default().with_samples(10);
    let mut am = AssignmentModel::<Backend>::build(&s, &DelayFormulation::PiecewiseLinear(config)).unwrap();
    let (a,sol) = am.solve().unwrap().expect("feasible");
    assert_abs_diff_eq!(sol.objective(), 110.0, epsilon = TOL);
    assert!(a.satisfies_delay_limit(&s));
    for pwl in am.delays() {
        assert_eq!(pwl.encoding(), Sos2Encoding::Selector);
        let p = pwl.point(&sol).unwrap();
        assert_abs_diff_eq!(p.weight_sum, 1.0, epsilon = TOL);
        assert!(p.is_adjacent(TOL));
    }

    let mut am = AssignmentModel::<Backend>::build(&s, &DelayFormulation::ExactCapacity).unwrap();
    let (a,_) = am.solve().unwrap().expect("feasible");
    assert_eq!(a.loads(), vec![2,3,0]);
}

/// Minimizing the load with a lower bound on the interpolated delay pins the solution to the
/// interpolant.
#[test]
fn interpolation_at_solution() {
    let delay = QueueingDelay::new(4.0).unwrap();
    let config = PwlConfig::default().with_samples(5);
    let table = BreakpointTable::sample(&delay, &config).unwrap();

    let mut m = Model::new(None);
    let load = m.variable(Some("load"), in_range(0.0, 3.8)).unwrap();
    let pwl = add_piecewise_linear(&mut m, "delay", table.clone(), &load, &config).unwrap();
    m.constraint(None, pwl.response(), greater_than(1.0)).unwrap();
    m.objective(None, Sense::Minimize, &load).unwrap();

    let sol = m.solve_and_interpret().into_result().unwrap().expect("feasible");
    let l = sol.value(&load).unwrap();
    assert_abs_diff_eq!(table.interpolate(l).unwrap(), 1.0, epsilon = TOL);
    // the interpolant over-estimates, so the load is below the exact point f(3) = 1
    assert!(l <= 3.0 + TOL);
    let p = pwl.point(&sol).unwrap();
    assert!(p.is_adjacent(TOL));
    assert_abs_diff_eq!(p.load, l, epsilon = TOL);
}

#[test]
fn non_monotone_table() {
    let table = BreakpointTable::from_points(vec![0.0,1.0,2.0], vec![0.0,5.0,0.0]).unwrap();
    let mut m = Model::new(None);
    let load = m.variable(Some("load"), equal_to(1.0)).unwrap();
    let pwl = add_piecewise_linear(&mut m, "peak", table.clone(), &load, &PwlConfig::default()).unwrap();
    // without adjacency, w_0 = w_2 = 0.5 would give a response of 0
    m.objective(None, Sense::Minimize, pwl.response()).unwrap();

    let sol = m.solve_and_interpret().into_result().unwrap().expect("feasible");
    assert_abs_diff_eq!(sol.value(&pwl.response()).unwrap(), table.interpolate(1.0).unwrap(), epsilon = TOL);
    assert!(pwl.point(&sol).unwrap().is_adjacent(TOL));
}

#[test]
fn shortest_path() {
    let g = Digraph::from_edges(4, &[(0,1,1.0),(1,3,1.0),(0,2,1.0),(2,3,3.0)]).unwrap();
    let p = ShortestPathModel::<Backend>::build(&g, 0, 3).unwrap().solve().unwrap().expect("reachable");
    assert_eq!(p.nodes, vec![0,1,3]);
    assert_abs_diff_eq!(p.cost, 2.0, epsilon = TOL);
}

#[test]
fn warehouse() {
    let inst = WarehouseInstance::new(
        vec![vec![1.0,2.0,3.0],vec![3.0,2.0,1.0]],
        vec![10.0,20.0],
        vec![4.0,5.0,6.0],
        vec![10.0,12.0]).unwrap();
    let r = duality_report::<Backend>(&inst, &[0.0,0.0]).unwrap().expect("feasible");
    assert_abs_diff_eq!(r.primal_objective, 34.0, epsilon = TOL);
    assert_abs_diff_eq!(r.duality_gap(), 18.0, epsilon = TOL);
}
