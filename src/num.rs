//! Numbers as they are read from source and carried at run time.

use core::fmt;

use arbitrary::Arbitrary;

/// A number is either an exact integer or an inexact real.
///
/// Arithmetic keeps integers exact for as long as possible and only
/// falls back to reals when an inexact operand shows up (or an integer
/// division does not come out even).
#[derive(Debug, PartialEq, Clone, Copy, Arbitrary)]
pub enum Number {
    Integer(i64),
    Real(f64),
}

impl Number {
    pub fn is_zero(self) -> bool {
        match self {
            Self::Integer(i) => i == 0,
            Self::Real(r) => r == 0.0,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Self::Integer(i) => i as f64,
            Self::Real(r) => r,
        }
    }

    /// Numeric equality across exactness, so `(= 1 1.0)` holds.
    pub fn num_eq(self, other: Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (a, b) => a.to_f64() == b.to_f64(),
        }
    }

    pub fn num_lt(self, other: Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a < b,
            (a, b) => a.to_f64() < b.to_f64(),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Real(r) if r.is_nan() => write!(f, "+nan.0"),
            Self::Real(r) if r.is_infinite() => {
                write!(f, "{}inf.0", if r.is_sign_negative() { "-" } else { "+" })
            }
            // reals always carry a decimal point, so they read back as reals
            Self::Real(r) if r.fract() == 0.0 => write!(f, "{r}.0"),
            Self::Real(r) => write!(f, "{r}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use assert2::check;

    use super::Number;

    #[test]
    fn display_keeps_exactness_visible() {
        check!(Number::Integer(-42).to_string() == "-42");
        check!(Number::Real(2.0).to_string() == "2.0");
        check!(Number::Real(-0.5).to_string() == "-0.5");
        check!(Number::Real(f64::INFINITY).to_string() == "+inf.0");
        check!(Number::Real(f64::NEG_INFINITY).to_string() == "-inf.0");
        check!(Number::Real(f64::NAN).to_string() == "+nan.0");
    }

    #[test]
    fn comparisons_cross_exactness() {
        check!(Number::Integer(1).num_eq(Number::Real(1.0)));
        check!(!Number::Integer(1).num_eq(Number::Real(1.5)));
        check!(Number::Integer(1).num_lt(Number::Real(1.5)));
        check!(!Number::Real(2.0).num_lt(Number::Integer(2)));
    }
}
