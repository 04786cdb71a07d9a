//! Scalar affine expressions `Σ cof[k] * x[subj[k]] + constant`.
//!
//! Expressions are passed by value. Anything implementing [IntoExpr] can be used where an
//! expression is expected: [Expr], [crate::Variable], `&Variable`, slices of variables (their
//! sum), constants and `(Variable,f64)` terms.

use itertools::{izip, Itertools};

use crate::variable::Variable;
use crate::{Error, Result};

/// A scalar affine expression.
#[derive(Clone,Debug,Default,PartialEq)]
pub struct Expr {
    subj     : Vec<usize>,
    cof      : Vec<f64>,
    constant : f64,
}

/// Anything that can be turned into an [Expr].
pub trait IntoExpr {
    fn into_expr(self) -> Expr;
}

impl IntoExpr for Expr {
    fn into_expr(self) -> Expr { self }
}

impl IntoExpr for &Expr {
    fn into_expr(self) -> Expr { self.clone() }
}

impl IntoExpr for f64 {
    fn into_expr(self) -> Expr { Expr::constant(self) }
}

impl IntoExpr for (Variable,f64) {
    fn into_expr(self) -> Expr { Expr::term(self.0,self.1) }
}

impl Expr {
    /// The zero expression.
    pub fn new() -> Expr { Expr::default() }

    /// The constant expression `c`.
    pub fn constant(c : f64) -> Expr { Expr{ subj : Vec::new(), cof : Vec::new(), constant : c } }

    /// The expression `c * v`.
    pub fn term(v : Variable, c : f64) -> Expr { Expr{ subj : vec![v.idx], cof : vec![c], constant : 0.0 } }

    /// Sum of a sequence of expressions.
    pub fn sum<I,E>(items : I) -> Expr where I : IntoIterator<Item = E>, E : IntoExpr {
        items.into_iter().fold(Expr::new(), |acc,e| acc.add(e))
    }

    /// Inner product `Σ cof[k] * vars[k]`. If the slices differ in length, the trailing entries
    /// of the longer one are ignored.
    pub fn dot(vars : &[Variable], cof : &[f64]) -> Expr {
        let (subj,cof) = vars.iter().zip(cof.iter()).map(|(v,&c)| (v.idx,c)).unzip();
        Expr{ subj, cof, constant : 0.0 }
    }

    /// Create the expression `self + rhs`.
    pub fn add<E>(mut self, rhs : E) -> Expr where E : IntoExpr {
        let rhs = rhs.into_expr();
        self.subj.extend_from_slice(rhs.subj.as_slice());
        self.cof.extend_from_slice(rhs.cof.as_slice());
        self.constant += rhs.constant;
        self
    }

    /// Create the expression `self - rhs`.
    pub fn sub<E>(self, rhs : E) -> Expr where E : IntoExpr { self.add(rhs.into_expr().mul(-1.0)) }

    /// Create the expression `c * self`.
    pub fn mul(mut self, c : f64) -> Expr {
        self.cof.iter_mut().for_each(|a| *a *= c);
        self.constant *= c;
        self
    }

    /// Merge repeated variables and drop zero coefficients. The result is sorted by variable
    /// index.
    pub fn compress(self) -> Expr {
        let (subj,cof) : (Vec<usize>,Vec<f64>) = self.subj.into_iter().zip(self.cof)
            .sorted_by_key(|&(j,_)| j)
            .coalesce(|(j0,c0),(j1,c1)| if j0 == j1 { Ok((j0,c0+c1)) } else { Err(((j0,c0),(j1,c1))) })
            .filter(|&(_,c)| c != 0.0)
            .unzip();
        Expr{ subj, cof, constant : self.constant }
    }

    pub fn subj(&self) -> &[usize] { self.subj.as_slice() }
    pub fn cof(&self) -> &[f64] { self.cof.as_slice() }
    pub fn constant_term(&self) -> f64 { self.constant }
    pub fn is_constant(&self) -> bool { self.cof.iter().all(|&c| c == 0.0) }

    /// Evaluate the expression at the point `x`, indexed by variable index.
    pub fn eval(&self, x : &[f64]) -> Result<f64> {
        if let Some(&j) = self.subj.iter().find(|&&j| j >= x.len()) {
            return Err(Error::InvalidParameter(format!("variable index {} out of bounds for point of length {}",j,x.len())));
        }
        Ok(izip!(self.subj.iter(),self.cof.iter()).map(|(&j,&c)| c * x[j]).sum::<f64>() + self.constant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(n : usize) -> Vec<Variable> { (0..n).map(Variable::new).collect() }

    #[test]
    fn build_and_compress() {
        let x = vars(3);
        let e = x[2].mul(2.0).add(&x[0]).add(x[2].mul(1.5)).sub(1.0).add(x[1].mul(0.0));
        let e = e.compress();
        assert_eq!(e.subj(), &[0,2]);
        assert_eq!(e.cof(), &[1.0,3.5]);
        assert_eq!(e.constant_term(), -1.0);
    }

    #[test]
    fn sum_and_dot() {
        let x = vars(4);
        let s = Expr::sum(x.iter());
        assert_eq!(s.subj(), &[0,1,2,3]);
        assert!(s.cof().iter().all(|&c| c == 1.0));

        let d = Expr::dot(&x[1..3], &[2.0,3.0]);
        assert_eq!(d.eval(&[1.0,1.0,2.0,0.0]).unwrap(), 8.0);

        // extra entries are dropped, later terms stay aligned
        let d = Expr::dot(&x[..3], &[2.0,3.0]).add(&x[3]);
        assert_eq!(d.subj(), &[0,1,3]);
        assert_eq!(d.cof(), &[2.0,3.0,1.0]);
        assert_eq!(Expr::dot(&x[..1], &[2.0,3.0]).cof(), &[2.0]);
    }

    #[test]
    fn eval_out_of_bounds() {
        let x = vars(3);
        assert!(x[2].to_expr().eval(&[1.0]).is_err());
        assert_eq!(Expr::constant(2.5).eval(&[]).unwrap(), 2.5);
        assert!(Expr::constant(2.5).is_constant());
    }

    #[test]
    fn scaling() {
        let x = vars(2);
        let e = x[0].add(&x[1]).add(1.0).mul(-2.0);
        assert_eq!(e.eval(&[1.0,2.0]).unwrap(), -8.0);
    }
}
