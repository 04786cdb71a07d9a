//! Small helpers shared by the model and the formulations.

/// A trait that supplies functionality for appending self to a string.
pub trait NameAppender {
    /// Append self to a string
    fn append_to_string(&self, s : & mut String);
}

impl<T> NameAppender for [T] where T : NameAppender {
    fn append_to_string(&self, s : & mut String) {
        s.push('[');
        if let Some((first,rest)) = self.split_first() {
            first.append_to_string(s);
            for i in rest.iter() { s.push(','); i.append_to_string(s) }
        }
        s.push(']');
    }
}

impl NameAppender for usize {
    fn append_to_string(&self, s : & mut String) {
        s.push_str(self.to_string().as_str());
    }
}

/// Build a name like `base[i,j]`.
pub fn indexed_name(base : &str, index : &[usize]) -> String {
    let mut s = String::with_capacity(base.len()+2+4*index.len());
    s.push_str(base);
    index.append_to_string(&mut s);
    s
}

/// `n` evenly spaced values from `first` to `last`, both included. For `n == 1` the result is
/// `[first]`.
pub fn linspace(first : f64, last : f64, n : usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![first],
        _ => {
            let step = (last-first) / (n-1) as f64;
            // last point is set exactly to avoid rounding drift
            (0..n).map(|i| if i+1 == n { last } else { first + step * i as f64 }).collect()
        }
    }
}

/// Indexes of the entries with absolute value above `tol`.
pub fn support(values : &[f64], tol : f64) -> Vec<usize> {
    values.iter().enumerate().filter(|(_,v)| v.abs() > tol).map(|(i,_)| i).collect()
}

/// Check the SOS2 condition: at most two entries are nonzero, and if two, they are adjacent.
/// Entries with absolute value at most `tol` count as zero.
pub fn is_sos2_feasible(values : &[f64], tol : f64) -> bool {
    match support(values,tol).as_slice() {
        [] | [_] => true,
        [i,j] => i+1 == *j,
        _ => false
    }
}
