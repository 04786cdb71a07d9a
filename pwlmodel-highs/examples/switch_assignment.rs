//!
//!  Purpose: Assigns switches to controllers so that the M/M/1 queueing delay of every
//!           controller stays below a limit, at minimum cost. The delay limit is modeled with a
//!           piecewise-linear approximation and, for comparison, as the equivalent capacity
//!           limit.
//!
//!  Run with `RUST_LOG=info` to see solver progress.
//!
extern crate pwlmodel;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pwlmodel::*;
use pwlmodel::assignment::{AssignmentModel, DelayFormulation, Scenario};
use pwlmodel::pwl::PwlConfig;
use pwlmodel_highs::Backend;

fn report(name : &str, s : &Scenario, formulation : &DelayFormulation) -> Result<()> {
    println!("--- {} ---", name);
    let mut am = AssignmentModel::<Backend>::build(s, formulation)?;
    match am.solve()? {
        Some((a,sol)) => {
            for (i,j) in a.facility_of().iter().enumerate() {
                println!("Switch {} assigned to controller {}", i, j);
            }
            println!("Objective = {}", sol.objective());
            for (j,d) in a.delays(s).iter().enumerate() {
                match d {
                    Ok(v) => println!("  controller {}: load {}, delay {:.4}", j, a.loads()[j], v),
                    Err(e) => println!("  controller {}: {}", j, e),
                }
            }
        },
        None => println!("No assignment satisfies the delay limit {}", s.theta),
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let s = Scenario::random(5, 3, 1.0, &mut rng);
    println!("rates = {:?}, costs = {:?}, theta = {}", s.rates, s.costs, s.theta);
    println!("Naive cost (all to the cheapest controller) = {}", s.naive_cost());

    report("piecewise linear, 100 samples", &s, &DelayFormulation::PiecewiseLinear(PwlConfig::default()))?;
    report("exact capacity", &s, &DelayFormulation::ExactCapacity)?;
    Ok(())
}

#[test]
fn test() { main().unwrap() }
