//!
//! Domains define bounds and integrality of variables and the bounds of constraints.
//!
//! Domains are created with a builder-like logic. An object is created by one of the free
//! functions [greater_than], [less_than], [equal_to], [in_range], [unbounded], [nonnegative]
//! or [binary] and then modified, for example with [LinearDomain::integer]. The object is
//! passed to [crate::ModelAPI::variable] or [crate::ModelAPI::constraint], which validates it.
//!

use crate::{Error, Result};

/// Bound type of a linear domain.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum LinearDomainType {
    /// `lb <= x`
    NonNegative,
    /// `x <= ub`
    NonPositive,
    /// `x == b`
    Zero,
    /// `lb <= x <= ub`
    Ranged,
    /// No bounds
    Free
}

/// A linear domain `lb <= x <= ub`, optionally restricted to integers.
#[derive(Clone,Copy,Debug,PartialEq)]
pub struct LinearDomain {
    domain_type : LinearDomainType,
    lb          : f64,
    ub          : f64,
    is_integer  : bool,
}

impl LinearDomain {
    /// Restrict the domain to integer values.
    pub fn integer(self) -> LinearDomain { LinearDomain{ is_integer : true, ..self } }
    /// Allow continuous values.
    pub fn continuous(self) -> LinearDomain { LinearDomain{ is_integer : false, ..self } }

    pub fn domain_type(&self) -> LinearDomainType { self.domain_type }
    pub fn lower(&self) -> f64 { self.lb }
    pub fn upper(&self) -> f64 { self.ub }
    pub fn is_integer(&self) -> bool { self.is_integer }

    /// Shift both bounds by `-ofs`. Used when moving the constant term of an expression to the
    /// right-hand side.
    pub(crate) fn shifted(self, ofs : f64) -> LinearDomain {
        LinearDomain{ lb : self.lb - ofs, ub : self.ub - ofs, ..self }
    }

    /// Check that the bounds are consistent.
    ///
    /// # Returns
    /// - `Ok(())` if neither bound is NaN, `lb <= ub`, and an integer domain contains at least
    ///   one integer.
    /// - `Err(Error::InvalidParameter)` otherwise.
    pub fn validate(&self) -> Result<()> {
        if self.lb.is_nan() || self.ub.is_nan() {
            return Err(Error::InvalidParameter("domain bound is NaN".to_string()));
        }
        if self.lb == f64::INFINITY || self.ub == f64::NEG_INFINITY {
            return Err(Error::InvalidParameter(format!("empty domain [{},{}]",self.lb,self.ub)));
        }
        if self.lb > self.ub {
            return Err(Error::InvalidParameter(format!("lower bound {} exceeds upper bound {}",self.lb,self.ub)));
        }
        if self.is_integer && self.lb.ceil() > self.ub.floor() {
            return Err(Error::InvalidParameter(format!("integer domain [{},{}] contains no integers",self.lb,self.ub)));
        }
        Ok(())
    }
}

/// Domain `x >= b`.
pub fn greater_than(b : f64) -> LinearDomain {
    LinearDomain{ domain_type : LinearDomainType::NonNegative, lb : b, ub : f64::INFINITY, is_integer : false }
}

/// Domain `x <= b`.
pub fn less_than(b : f64) -> LinearDomain {
    LinearDomain{ domain_type : LinearDomainType::NonPositive, lb : f64::NEG_INFINITY, ub : b, is_integer : false }
}

/// Domain `x == b`.
pub fn equal_to(b : f64) -> LinearDomain {
    LinearDomain{ domain_type : LinearDomainType::Zero, lb : b, ub : b, is_integer : false }
}

/// Domain `lb <= x <= ub`.
pub fn in_range(lb : f64, ub : f64) -> LinearDomain {
    LinearDomain{ domain_type : LinearDomainType::Ranged, lb, ub, is_integer : false }
}

/// Domain of free values.
pub fn unbounded() -> LinearDomain {
    LinearDomain{ domain_type : LinearDomainType::Free, lb : f64::NEG_INFINITY, ub : f64::INFINITY, is_integer : false }
}

/// Domain `x >= 0`.
pub fn nonnegative() -> LinearDomain { greater_than(0.0) }

/// Domain `x ∈ {0,1}`.
pub fn binary() -> LinearDomain { in_range(0.0, 1.0).integer() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds() {
        let d = binary();
        assert_eq!(d.lower(), 0.0);
        assert_eq!(d.upper(), 1.0);
        assert!(d.is_integer());
        assert!(d.validate().is_ok());
        assert!(! d.continuous().is_integer());

        assert_eq!(less_than(2.0).lower(), f64::NEG_INFINITY);
        assert_eq!(greater_than(2.0).upper(), f64::INFINITY);
        assert_eq!(equal_to(3.0).domain_type(), LinearDomainType::Zero);
    }

    #[test]
    fn invalid_domains() {
        assert!(in_range(2.0, 1.0).validate().is_err());
        assert!(in_range(f64::NAN, 1.0).validate().is_err());
        assert!(in_range(0.2, 0.8).integer().validate().is_err());
        assert!(in_range(0.2, 0.8).validate().is_ok());
        assert!(greater_than(f64::INFINITY).validate().is_err());
    }

    #[test]
    fn shift() {
        let d = in_range(1.0, 3.0).shifted(1.0);
        assert_eq!((d.lower(),d.upper()), (0.0,2.0));
        let d = less_than(1.0).shifted(-1.0);
        assert_eq!((d.lower(),d.upper()), (f64::NEG_INFINITY,2.0));
    }
}
