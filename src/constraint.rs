use crate::variable::Variable;

/// A Constraint object is a wrapper around the index of a linear row in a
/// [crate::ModelAPI].
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash)]
pub struct Constraint {
    pub(crate) idx : usize
}

impl Constraint {
    pub(crate) fn new(idx : usize) -> Constraint { Constraint{ idx } }
    /// Index of the constraint in its model.
    pub fn index(&self) -> usize { self.idx }
}

/// A declared special ordered set of type 2: at most two members may be nonzero, and if two,
/// they must be consecutive in the order given by the weights.
#[derive(Clone,Debug,PartialEq)]
pub struct Sos2Set {
    pub(crate) idx     : usize,
    pub(crate) members : Vec<Variable>,
}

impl Sos2Set {
    pub fn index(&self) -> usize { self.idx }
    pub fn members(&self) -> &[Variable] { self.members.as_slice() }
}
