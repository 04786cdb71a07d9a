//!
//!  Purpose: Formulates a shortest path problem on a random preferential-attachment graph as an
//!           integer program.
//!
extern crate pwlmodel;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use pwlmodel::Result;
use pwlmodel::shortest_path::{Digraph, ShortestPathModel};
use pwlmodel_highs::Backend;

fn main() -> Result<()> {
    env_logger::init();

    let mut rng = ChaCha8Rng::seed_from_u64(2018);
    let g = Digraph::barabasi_albert(20, 2, &mut rng)?;

    let mut sp = ShortestPathModel::<Backend>::build(&g, 0, 5)?;
    match sp.solve()? {
        Some(p) => {
            println!("Total path delay = {}", p.cost);
            println!("The shortest path is {:?}", p.nodes);
        },
        None => println!("Node 5 is not reachable from node 0"),
    }
    Ok(())
}

#[test]
fn test() { main().unwrap() }
