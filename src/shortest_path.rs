//! Shortest path as an integer program.
//!
//! Every edge `e` of a directed graph gets a binary variable `x_e`. Flow conservation requires
//! out-flow minus in-flow to be `1` at the source, `-1` at the target and `0` at every other
//! node. The objective is the total cost of the selected edges. Edge costs are nonnegative, so the
//! selected edges contain a simple path, which [path_sequence] turns into a node sequence.

use std::collections::{HashMap, HashSet};

use log::{debug, info};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::domain::*;
use crate::expr::Expr;
use crate::model::{BaseModelTrait, ModelAPI, OptimalSolution, Sense};
use crate::utils::indexed_name;
use crate::variable::Variable;
use crate::{Error, Result};

/// A directed graph with one cost per edge.
#[derive(Clone,Debug,Default,PartialEq)]
pub struct Digraph {
    num_nodes : usize,
    edges     : Vec<(usize,usize)>,
    costs     : Vec<f64>,
}

impl Digraph {
    /// A graph with `num_nodes` nodes `0..num_nodes` and no edges.
    pub fn new(num_nodes : usize) -> Digraph { Digraph{ num_nodes, ..Default::default() } }

    /// Build a graph from `(from,to,cost)` triplets.
    pub fn from_edges(num_nodes : usize, edges : &[(usize,usize,f64)]) -> Result<Digraph> {
        let mut g = Digraph::new(num_nodes);
        for &(i,j,c) in edges { g.add_edge(i,j,c)?; }
        Ok(g)
    }

    /// Add the edge `from -> to`.
    ///
    /// # Returns
    /// `Error::InvalidParameter` if a node is out of range, the cost is negative or not finite,
    /// or the edge already exists.
    pub fn add_edge(&mut self, from : usize, to : usize, cost : f64) -> Result<()> {
        if from >= self.num_nodes || to >= self.num_nodes {
            return Err(Error::InvalidParameter(format!("edge ({},{}) out of range, {} nodes",from,to,self.num_nodes)));
        }
        if ! (cost.is_finite() && cost >= 0.0) {
            return Err(Error::InvalidParameter(format!("edge ({},{}) has cost {}",from,to,cost)));
        }
        if self.edges.contains(&(from,to)) {
            return Err(Error::InvalidParameter(format!("duplicate edge ({},{})",from,to)));
        }
        self.edges.push((from,to));
        self.costs.push(cost);
        Ok(())
    }

    /// Random graph grown by preferential attachment: starting from `m` isolated nodes, each new
    /// node is linked to `m` distinct existing nodes chosen with probability proportional to
    /// their degree. Every undirected link becomes two directed edges, each with a cost drawn
    /// uniformly from `[1,20)`.
    pub fn barabasi_albert<R>(n : usize, m : usize, rng : &mut R) -> Result<Digraph> where R : Rng {
        if m < 1 || m >= n {
            return Err(Error::InvalidParameter(format!("preferential attachment needs 1 <= m < n, got m = {}, n = {}",m,n)));
        }
        let mut g = Digraph::new(n);
        let mut targets : Vec<usize> = (0..m).collect();
        let mut repeated : Vec<usize> = Vec::new();
        for source in m..n {
            for &t in targets.iter() {
                g.add_edge(source,t,rng.gen_range(1.0..20.0))?;
                g.add_edge(t,source,rng.gen_range(1.0..20.0))?;
            }
            repeated.extend_from_slice(targets.as_slice());
            repeated.extend(std::iter::repeat(source).take(m));

            let mut next = HashSet::new();
            while next.len() < m {
                if let Some(&v) = repeated.choose(rng) { next.insert(v); }
            }
            targets = next.into_iter().collect();
            targets.sort_unstable();
        }
        debug!("Generated graph with {} nodes and {} edges", n, g.num_edges());
        Ok(g)
    }

    pub fn num_nodes(&self) -> usize { self.num_nodes }
    pub fn num_edges(&self) -> usize { self.edges.len() }
    pub fn edges(&self) -> &[(usize,usize)] { self.edges.as_slice() }
    pub fn costs(&self) -> &[f64] { self.costs.as_slice() }

    /// Cost of the edge `from -> to`, if it exists.
    pub fn edge_cost(&self, from : usize, to : usize) -> Option<f64> {
        self.edges.iter().position(|&e| e == (from,to)).map(|k| self.costs[k])
    }
}

/// A path found by [ShortestPathModel::solve].
#[derive(Clone,Debug,PartialEq)]
pub struct ShortestPath {
    /// Nodes from source to target.
    pub nodes : Vec<usize>,
    /// Edges in path order.
    pub edges : Vec<(usize,usize)>,
    pub cost  : f64,
}

/// Turn an unordered set of edges forming a path into the node sequence from `source` to
/// `target`. The input is not modified.
///
/// # Returns
/// - `Error::AmbiguousPath(v)` if two edges leave node `v`,
/// - `Error::BrokenPath(v)` if no edge leaves node `v` before the target is reached,
/// - `Error::CyclicPath(v)` if following the edges returns to node `v`.
pub fn path_sequence(edges : &[(usize,usize)], source : usize, target : usize) -> Result<Vec<usize>> {
    let mut succ = HashMap::with_capacity(edges.len());
    for &(i,j) in edges {
        if succ.insert(i,j).is_some() {
            return Err(Error::AmbiguousPath(i));
        }
    }

    let mut path = vec![source];
    let mut visited = HashSet::from([source]);
    let mut cur = source;
    while cur != target {
        cur = *succ.get(&cur).ok_or(Error::BrokenPath(cur))?;
        if ! visited.insert(cur) {
            return Err(Error::CyclicPath(cur));
        }
        path.push(cur);
    }
    Ok(path)
}

/// The shortest path problem built in a model.
pub struct ShortestPathModel<T> where T : BaseModelTrait {
    model  : ModelAPI<T>,
    graph  : Digraph,
    source : usize,
    target : usize,
    x      : Vec<Variable>,
}

impl<T> ShortestPathModel<T> where T : BaseModelTrait {
    /// Build the model.
    ///
    /// # Returns
    /// `Error::InvalidParameter` if `source` or `target` is not a node, or the graph has no
    /// edges.
    pub fn build(graph : &Digraph, source : usize, target : usize) -> Result<ShortestPathModel<T>> {
        if source >= graph.num_nodes() {
            return Err(Error::InvalidParameter(format!("source {} not in range, {} nodes",source,graph.num_nodes())));
        }
        if target >= graph.num_nodes() {
            return Err(Error::InvalidParameter(format!("target {} not in range, {} nodes",target,graph.num_nodes())));
        }
        if graph.num_edges() == 0 {
            return Err(Error::InvalidParameter("graph has no edge costs".to_string()));
        }

        let mut model = ModelAPI::<T>::new(Some("shortest_path"));
        let x = graph.edges().iter()
            .map(|&(i,j)| model.variable(Some(indexed_name("x",&[i,j]).as_str()), binary()))
            .collect::<Result<Vec<Variable>>>()?;

        let mut outgoing = vec![Vec::new(); graph.num_nodes()];
        let mut incoming = vec![Vec::new(); graph.num_nodes()];
        for (&(i,j),&v) in graph.edges().iter().zip(x.iter()) {
            outgoing[i].push(v);
            incoming[j].push(v);
        }
        for (node,(out,inc)) in outgoing.iter().zip(incoming.iter()).enumerate() {
            let rhs =
                if node == source && node != target { 1.0 }
                else if node == target && node != source { -1.0 }
                else { 0.0 };
            model.constraint(Some(indexed_name("flow",&[node]).as_str()),
                             Expr::sum(out.iter()).sub(Expr::sum(inc.iter())),
                             equal_to(rhs))?;
        }
        model.objective(Some("cost"), Sense::Minimize, Expr::dot(x.as_slice(),graph.costs()))?;

        info!("Built shortest path model {} -> {}: {} nodes, {} edges", source, target, graph.num_nodes(), graph.num_edges());
        Ok(ShortestPathModel{ model, graph : graph.clone(), source, target, x })
    }

    pub fn model(&self) -> &ModelAPI<T> { &self.model }
    pub fn model_mut(&mut self) -> &mut ModelAPI<T> { &mut self.model }
    /// The edge variables, in the order of [Digraph::edges].
    pub fn edge_vars(&self) -> &[Variable] { self.x.as_slice() }

    /// The edges selected in a solution, in graph order.
    pub fn selected_edges(&self, sol : &OptimalSolution) -> Result<Vec<(usize,usize)>> {
        let mut res = Vec::new();
        for (&e,v) in self.graph.edges().iter().zip(self.x.iter()) {
            if sol.is_set(v)? { res.push(e); }
        }
        Ok(res)
    }

    /// Solve the model.
    ///
    /// # Returns
    /// - `Ok(Some(path))` if the target is reachable,
    /// - `Ok(None)` if it is not,
    /// - `Err(e)` if the solver failed or the selected edges do not form a path.
    pub fn solve(&mut self) -> Result<Option<ShortestPath>> {
        let sol = match self.model.solve_and_interpret().into_result()? {
            Some(sol) => sol,
            None => {
                info!("Target {} is not reachable from {}", self.target, self.source);
                return Ok(None);
            }
        };
        let selected = self.selected_edges(&sol)?;
        if selected.is_empty() { info!("No edge selected"); }
        let nodes = path_sequence(selected.as_slice(), self.source, self.target)?;
        let edges : Vec<(usize,usize)> = nodes.windows(2).map(|w| (w[0],w[1])).collect();
        let cost = edges.iter()
            .map(|&(i,j)| self.graph.edge_cost(i,j).ok_or_else(|| Error::Backend(format!("edge ({},{}) is not in the graph",i,j))))
            .sum::<Result<f64>>()?;
        if (cost - sol.objective()).abs() > 1e-6 * cost.abs().max(1.0) {
            debug!("Path cost {} differs from objective {}; extra zero-cost edges were selected", cost, sol.objective());
        }
        info!("Shortest path {:?} with cost {}", nodes, cost);
        Ok(Some(ShortestPath{ nodes, edges, cost }))
    }
}
