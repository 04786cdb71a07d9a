//! Nonlinear response functions and their sampled breakpoint tables.

use log::debug;

use crate::utils::linspace;
use crate::{Error, Result};
use super::PwlConfig;

const SEARCH_ITERATIONS : usize = 200;

/// A scalar function of the load on a facility. The function is defined for loads strictly below
/// [ResponseFunction::limit].
pub trait ResponseFunction {
    /// The load where the function stops being defined.
    fn limit(&self) -> f64;

    /// Evaluate the function.
    ///
    /// # Returns
    /// The response, or `Error::UndefinedRegion` if `load` is not strictly below the limit. The
    /// check happens before any arithmetic, so the result is never infinite.
    fn try_value(&self, load : f64) -> Result<f64>;
}

/// The M/M/1 queueing delay `1/(rate - load)` of a facility with service rate `rate`.
#[derive(Clone,Copy,Debug,PartialEq)]
pub struct QueueingDelay {
    rate : f64
}

impl QueueingDelay {
    /// Create the delay function for a given service rate. The rate must be finite and positive.
    pub fn new(rate : f64) -> Result<QueueingDelay> {
        if rate.is_finite() && rate > 0.0 {
            Ok(QueueingDelay{ rate })
        }
        else {
            Err(Error::InvalidParameter(format!("service rate must be finite and positive, got {}",rate)))
        }
    }

    pub fn rate(&self) -> f64 { self.rate }
}

impl ResponseFunction for QueueingDelay {
    fn limit(&self) -> f64 { self.rate }

    fn try_value(&self, load : f64) -> Result<f64> {
        // also rejects NaN
        if ! (load < self.rate) {
            return Err(Error::UndefinedRegion{ load, rate : self.rate });
        }
        Ok(1.0 / (self.rate - load))
    }
}

/// Ordered `(load, response)` samples of a response function.
#[derive(Clone,Debug,PartialEq)]
pub struct BreakpointTable {
    loads     : Vec<f64>,
    responses : Vec<f64>,
}

impl BreakpointTable {
    /// Sample `f` at `config.num_samples` evenly spaced loads from 0 to `config.margin * f.limit()`,
    /// both ends included.
    ///
    /// # Returns
    /// - `Error::InvalidParameter` if the configuration is invalid, see [PwlConfig::validate].
    /// - `Error::IllConditioned` if the absolute response at some breakpoint exceeds
    ///   `config.max_response`, or is NaN.
    pub fn sample<F>(f : &F, config : &PwlConfig) -> Result<BreakpointTable> where F : ResponseFunction {
        config.validate()?;
        let limit = f.limit();
        if ! (limit.is_finite() && limit > 0.0) {
            return Err(Error::InvalidParameter(format!("response function limit must be finite and positive, got {}",limit)));
        }
        let loads = linspace(0.0, config.margin * limit, config.num_samples);
        let responses = loads.iter().map(|&l| f.try_value(l)).collect::<Result<Vec<f64>>>()?;

        if let Some(&worst) = responses.iter().find(|r| ! (r.abs() <= config.max_response)) {
            return Err(Error::IllConditioned{ response : worst, limit : config.max_response });
        }
        let table = BreakpointTable{ loads, responses };
        debug!("Sampled {} breakpoints on [0,{}], responses in [{},{}]",
               table.len(),
               config.margin * limit,
               table.responses[0],
               table.responses[table.len()-1]);
        Ok(table)
    }

    /// Build a table from given points.
    ///
    /// # Returns
    /// `Error::InvalidParameter` unless there are at least two points, the vectors have the same
    /// length, all values are finite and the loads are strictly increasing.
    pub fn from_points(loads : Vec<f64>, responses : Vec<f64>) -> Result<BreakpointTable> {
        if loads.len() != responses.len() {
            return Err(Error::InvalidParameter(format!("{} loads but {} responses",loads.len(),responses.len())));
        }
        if loads.len() < 2 {
            return Err(Error::InvalidParameter("a breakpoint table needs at least two points".to_string()));
        }
        if ! loads.iter().chain(responses.iter()).all(|v| v.is_finite()) {
            return Err(Error::InvalidParameter("breakpoints must be finite".to_string()));
        }
        if ! loads.windows(2).all(|w| w[0] < w[1]) {
            return Err(Error::InvalidParameter("breakpoint loads must be strictly increasing".to_string()));
        }
        Ok(BreakpointTable{ loads, responses })
    }

    pub fn len(&self) -> usize { self.loads.len() }
    pub fn is_empty(&self) -> bool { self.loads.is_empty() }
    pub fn loads(&self) -> &[f64] { self.loads.as_slice() }
    pub fn responses(&self) -> &[f64] { self.responses.as_slice() }

    /// Smallest and largest breakpoint load.
    pub fn domain(&self) -> (f64,f64) { (self.loads[0],self.loads[self.len()-1]) }

    /// Returns true if the responses are non-decreasing in load.
    pub fn is_nondecreasing(&self) -> bool { self.responses.windows(2).all(|w| w[0] <= w[1]) }

    /// Index `k` of the segment `[loads[k],loads[k+1]]` containing `load`.
    fn segment(&self, load : f64) -> Result<usize> {
        let (lo,hi) = self.domain();
        if ! (lo <= load && load <= hi) {
            return Err(Error::InvalidParameter(format!("load {} outside breakpoint domain [{},{}]",load,lo,hi)));
        }
        Ok(self.loads.partition_point(|&l| l <= load).clamp(1,self.len()-1) - 1)
    }

    fn chord(&self, k : usize, load : f64) -> f64 {
        let (l0,l1) = (self.loads[k],self.loads[k+1]);
        let (r0,r1) = (self.responses[k],self.responses[k+1]);
        r0 + (r1-r0) * (load-l0) / (l1-l0)
    }

    /// Linear interpolation of the responses at `load`.
    ///
    /// # Returns
    /// The interpolated value or `Error::InvalidParameter` if `load` is outside the sampled
    /// domain.
    pub fn interpolate(&self, load : f64) -> Result<f64> {
        let k = self.segment(load)?;
        Ok(self.chord(k,load))
    }

    /// The largest absolute difference between the interpolant and `f` on the sampled domain.
    ///
    /// On each segment the maximum is located by ternary search, which finds the exact maximum
    /// when `f` is convex or concave on the segment.
    pub fn max_interpolation_error<F>(&self, f : &F) -> Result<f64> where F : ResponseFunction {
        let mut res = 0.0f64;
        for k in 0..self.len()-1 {
            let err = |l : f64| -> Result<f64> { Ok((self.chord(k,l) - f.try_value(l)?).abs()) };
            let (mut a,mut b) = (self.loads[k],self.loads[k+1]);
            for _ in 0..SEARCH_ITERATIONS {
                if b - a <= f64::EPSILON * b.abs().max(1.0) { break; }
                let m1 = a + (b-a) / 3.0;
                let m2 = b - (b-a) / 3.0;
                if err(m1)? < err(m2)? { a = m1; } else { b = m2; }
            }
            res = res.max(err(0.5*(a+b))?);
        }
        Ok(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    /// Exact maximum chord error of `1/u` on `[s,s+h]`.
    fn exact_segment_error(s : f64, h : f64) -> f64 {
        (1.0/s.sqrt() - 1.0/(s+h).sqrt()).powi(2)
    }

    #[test]
    fn delay_values() {
        let f = QueueingDelay::new(4.0).unwrap();
        assert_eq!(f.try_value(0.0).unwrap(), 0.25);
        assert_eq!(f.try_value(3.0).unwrap(), 1.0);
        assert!(matches!(f.try_value(4.0), Err(Error::UndefinedRegion{ load, rate }) if load == 4.0 && rate == 4.0));
        assert!(matches!(f.try_value(5.0), Err(Error::UndefinedRegion{ .. })));
        assert!(matches!(f.try_value(f64::NAN), Err(Error::UndefinedRegion{ .. })));

        assert!(QueueingDelay::new(0.0).is_err());
        assert!(QueueingDelay::new(-1.0).is_err());
        assert!(QueueingDelay::new(f64::INFINITY).is_err());
    }

    #[test]
    fn sample_rate_4() {
        let f = QueueingDelay::new(4.0).unwrap();
        let t = BreakpointTable::sample(&f, &PwlConfig::default().with_samples(100).with_margin(0.95)).unwrap();
        assert_eq!(t.len(), 100);
        assert_eq!(t.loads()[0], 0.0);
        assert_abs_diff_eq!(t.loads()[99], 3.8, epsilon = 1e-12);
        assert!(t.loads().iter().all(|&l| l < 4.0));
        assert_eq!(t.responses()[0], 0.25);
        assert_abs_diff_eq!(t.responses()[99], 5.0, epsilon = 1e-9);
        assert!(t.is_nondecreasing());
    }

    #[test]
    fn sample_rejects_bad_config() {
        let f = QueueingDelay::new(4.0).unwrap();
        assert!(matches!(BreakpointTable::sample(&f, &PwlConfig::default().with_margin(1.0)), Err(Error::InvalidParameter(_))));
        assert!(matches!(BreakpointTable::sample(&f, &PwlConfig::default().with_samples(1)), Err(Error::InvalidParameter(_))));
        assert!(matches!(BreakpointTable::sample(&f, &PwlConfig::default().with_margin(0.99999)), Err(Error::IllConditioned{ .. })));
        assert!(BreakpointTable::sample(&f, &PwlConfig::default().with_margin(0.9999)).is_ok());
    }

    /// Response with a pole inside the sampled range.
    struct InteriorPole;

    impl ResponseFunction for InteriorPole {
        fn limit(&self) -> f64 { 4.0 }
        fn try_value(&self, load : f64) -> Result<f64> { Ok(1.0 / (load - 1.0).abs().max(1e-9)) }
    }

    #[test]
    fn ill_conditioned_interior_breakpoint() {
        // loads 0, 1, 2 (margin 0.5): the pole is at the middle breakpoint
        let config = PwlConfig::default().with_samples(3).with_margin(0.5);
        assert!(matches!(BreakpointTable::sample(&InteriorPole, &config), Err(Error::IllConditioned{ response, .. }) if response > 1e4));
        let config = PwlConfig::default().with_samples(4).with_margin(0.5);
        assert!(BreakpointTable::sample(&InteriorPole, &config).is_ok());
    }

    #[test]
    fn interpolation() {
        let t = BreakpointTable::from_points(vec![0.0,1.0,3.0], vec![1.0,2.0,6.0]).unwrap();
        assert_eq!(t.interpolate(0.0).unwrap(), 1.0);
        assert_eq!(t.interpolate(0.5).unwrap(), 1.5);
        assert_eq!(t.interpolate(1.0).unwrap(), 2.0);
        assert_eq!(t.interpolate(2.0).unwrap(), 4.0);
        assert_eq!(t.interpolate(3.0).unwrap(), 6.0);
        assert!(t.interpolate(3.5).is_err());
        assert!(t.interpolate(-0.1).is_err());

        assert!(BreakpointTable::from_points(vec![0.0], vec![1.0]).is_err());
        assert!(BreakpointTable::from_points(vec![0.0,0.0], vec![1.0,2.0]).is_err());
        assert!(BreakpointTable::from_points(vec![0.0,1.0], vec![1.0]).is_err());
        assert!(BreakpointTable::from_points(vec![0.0,f64::INFINITY], vec![1.0,2.0]).is_err());
    }

    #[test]
    fn interpolant_over_estimates_delay() {
        let f = QueueingDelay::new(3.0).unwrap();
        let t = BreakpointTable::sample(&f, &PwlConfig::default().with_samples(10)).unwrap();
        let (_,hi) = t.domain();
        for i in 0..=100 {
            let l = hi * (i as f64 / 100.0);
            assert!(t.interpolate(l).unwrap() >= f.try_value(l).unwrap() - 1e-12);
        }
    }

    #[test]
    fn error_matches_closed_form() {
        let rate = 6.0;
        let f = QueueingDelay::new(rate).unwrap();
        let t = BreakpointTable::sample(&f, &PwlConfig::default().with_samples(10)).unwrap();
        // the largest error is on the last segment
        let h = 0.95 * rate / 9.0;
        let s = rate - 0.95 * rate;
        assert_abs_diff_eq!(t.max_interpolation_error(&f).unwrap(), exact_segment_error(s,h), epsilon = 1e-9);
    }

    proptest! {
        #[test]
        fn error_nonincreasing_in_samples(
            rate in 1.0..10.0_f64,
            margin in 0.1..0.95_f64,
            n1 in 2..200_usize,
            extra in 0..200_usize,
        ) {
            let f = QueueingDelay::new(rate).unwrap();
            let c1 = PwlConfig::default().with_margin(margin).with_samples(n1);
            let c2 = PwlConfig::default().with_margin(margin).with_samples(n1 + extra);
            let e1 = BreakpointTable::sample(&f, &c1).unwrap().max_interpolation_error(&f).unwrap();
            let e2 = BreakpointTable::sample(&f, &c2).unwrap().max_interpolation_error(&f).unwrap();
            prop_assert!(e2 <= e1 + 1e-12, "{} samples: {}, {} samples: {}", n1, e1, n1 + extra, e2);
        }

        #[test]
        fn responses_nondecreasing(
            rate in 0.5..100.0_f64,
            margin in 0.01..0.95_f64,
            n in 2..500_usize,
        ) {
            let f = QueueingDelay::new(rate).unwrap();
            let t = BreakpointTable::sample(&f, &PwlConfig::default().with_margin(margin).with_samples(n)).unwrap();
            prop_assert!(t.is_nondecreasing());
            prop_assert!(t.loads().iter().all(|&l| l < rate));
        }
    }
}
