//! Module for Variable object and related implementations

use crate::expr::{Expr, IntoExpr};

/// A Variable object is a wrapper around the index of a scalar variable in a
/// [crate::ModelAPI]. It contains no reference to the model it belongs to, so in a context of
/// multiple models, it is not possible to verify that it is used with the originating model.
///
/// A [Variable] converts into an [Expr] wherever an expression is expected:
///
/// ```
/// use pwlmodel::*;
///
/// let mut model = dummy::Model::new(None);
/// let x = model.variable(None,unbounded()).unwrap();
/// let y = model.variable(None,unbounded()).unwrap();
/// // Explicitly convert x to expression
/// model.constraint(None, x.to_expr(), equal_to(1.0)).unwrap();
/// // Use x reference, indirectly causes it to be converted
/// model.constraint(None, &x, equal_to(1.0)).unwrap();
/// // Build an expression from variables
/// model.constraint(None, x.mul(2.0).add(&y), less_than(4.0)).unwrap();
/// ```
#[derive(Clone,Copy,Debug,PartialEq,Eq,Hash,PartialOrd,Ord)]
pub struct Variable {
    pub(crate) idx : usize
}

impl Variable {
    pub(crate) fn new(idx : usize) -> Variable { Variable{ idx } }

    /// Index of the variable in its model.
    pub fn index(&self) -> usize { self.idx }

    pub fn to_expr(&self) -> Expr { Expr::term(*self,1.0) }

    /// Create the expression `c * self`.
    pub fn mul(&self, c : f64) -> Expr { Expr::term(*self,c) }

    /// Create the expression `self + rhs`.
    pub fn add<E>(&self, rhs : E) -> Expr where E : IntoExpr { self.to_expr().add(rhs) }

    /// Create the expression `self - rhs`.
    pub fn sub<E>(&self, rhs : E) -> Expr where E : IntoExpr { self.to_expr().sub(rhs) }
}

impl IntoExpr for Variable {
    fn into_expr(self) -> Expr { self.to_expr() }
}

impl IntoExpr for &Variable {
    fn into_expr(self) -> Expr { self.to_expr() }
}

impl IntoExpr for &[Variable] {
    /// The sum of the variables.
    fn into_expr(self) -> Expr { Expr::sum(self.iter()) }
}

impl IntoExpr for &Vec<Variable> {
    fn into_expr(self) -> Expr { Expr::sum(self.iter()) }
}
