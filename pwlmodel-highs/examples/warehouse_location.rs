//!
//!  Purpose: Solves a random capacitated warehouse location problem and its Lagrangian
//!           relaxation of the capacity constraints, and reports the duality gap.
//!
extern crate pwlmodel;

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pwlmodel::Result;
use pwlmodel::warehouse::{duality_report, WarehouseInstance};
use pwlmodel_highs::Backend;

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let inst = WarehouseInstance::random(5, 8, &mut rng);

    let t0 = Instant::now();
    match duality_report::<Backend>(&inst, &[0.0; 5])? {
        Some(r) => {
            println!("Objective (Primal) = {}", r.primal_objective);
            println!("Objective (Lagrangian) = {}", r.lagrangian_objective);
            println!("Duality gap = {}", r.duality_gap());
            println!("Primal feasible = {}", r.lagrangian_feasible);
        },
        None => println!("Primal problem is infeasible"),
    }
    println!("Elapsed time: {:?}", t0.elapsed());
    Ok(())
}

#[test]
fn test() { main().unwrap() }
