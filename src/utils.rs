//! Common small functions used throughout the crate
//!
//! These are left public for the convenience of the user. For example
//! prettier formatting for scientific numbers, or the float comparisons needed
//! for sorting records.

use std::cmp::Ordering;
use std::fmt::LowerExp;

// Alias for the format! macro out of laziness
pub use std::format as f;

/// Extends primitives with more specific formatting options
pub trait NumberFmt {
    /// Better scientific number formatting
    ///
    /// The default is not very consistent for scientific in particular, so this
    /// allows easy definition. The exponent is always signed and padded, which
    /// is what the ANT-MOC tools (and python `{:e}` formats) produce.
    ///
    /// ```rust
    /// # use antmocdata::utils::NumberFmt;
    /// let number = -1.0;
    /// assert_eq!(number.sci(5, 2), "-1.00000e+00".to_string());
    /// assert_eq!((1234.5).sci(2, 2), "1.23e+03".to_string());
    /// ```
    fn sci(&self, precision: usize, exp_pad: usize) -> String;

    /// Same as [NumberFmt::sci] but with an upper case `E`
    ///
    /// ```rust
    /// # use antmocdata::utils::NumberFmt;
    /// assert_eq!((1.123456789e3).sci_upper(5, 2), "1.12346E+03".to_string());
    /// ```
    fn sci_upper(&self, precision: usize, exp_pad: usize) -> String {
        self.sci(precision, exp_pad).replace('e', "E")
    }
}

impl<T: LowerExp> NumberFmt for T {
    fn sci(&self, precision: usize, exp_pad: usize) -> String {
        let mut num = f!("{:.precision$e}", &self, precision = precision);
        // inf and NaN have no exponent to fix up
        let Some(split) = num.find('e') else {
            return num;
        };
        let exp = num.split_off(split);
        // Make sure the exponent is signed
        let (sign, exp) = match exp.strip_prefix("e-") {
            Some(exp) => ('-', exp),
            None => ('+', &exp[1..]),
        };
        // Pad the exponent with zeros if needed and put it back on the number
        num.push_str(&f!("e{}{:0>pad$}", sign, exp, pad = exp_pad));
        num
    }
}

/// Find the maximum value of a slice of `f64`
///
/// Floating-point types do not implement Ord because of NaN, so this is the
/// workaround. Returns `None` for an empty slice.
///
/// ```rust
/// # use antmocdata::utils::vec_f64_max;
/// let vector = vec![1.0, 2.0, 3.0];
/// assert_eq!(vec_f64_max(&vector), Some(3.0));
/// assert_eq!(vec_f64_max(&[]), None);
/// ```
pub fn vec_f64_max(vector: &[f64]) -> Option<f64> {
    vector.iter().copied().max_by(|a, b| a.total_cmp(b))
}

/// Find the minimum value of a slice of `f64`
///
/// ```rust
/// # use antmocdata::utils::vec_f64_min;
/// let vector = vec![1.0, 2.0, 3.0];
/// assert_eq!(vec_f64_min(&vector), Some(1.0));
/// ```
pub fn vec_f64_min(vector: &[f64]) -> Option<f64> {
    vector.iter().copied().min_by(|a, b| a.total_cmp(b))
}

/// Compare two strings as numbers if both parse, lexicographically otherwise
///
/// This is the ordering used by the query language and for sorting records.
/// `None` is only returned for NaN comparisons.
///
/// ```rust
/// # use antmocdata::utils::compare_mixed;
/// # use std::cmp::Ordering;
/// assert_eq!(compare_mixed("10", "9"), Some(Ordering::Greater));
/// assert_eq!(compare_mixed("10", "9x"), Some(Ordering::Less));
/// ```
pub fn compare_mixed(a: &str, b: &str) -> Option<Ordering> {
    match (a.trim().parse::<f64>(), b.trim().parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y),
        _ => Some(a.cmp(b)),
    }
}
