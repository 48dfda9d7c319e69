use std::fmt;

/// Open interval check: `lower < value < upper`, with either side optional.
///
/// Both bounds are exclusive; a value equal to a bound is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RangeCheck {
    /// Exclusive lower bound.
    pub lower: Option<f64>,
    /// Exclusive upper bound.
    pub upper: Option<f64>,
}

impl RangeCheck {
    /// Construct a check from optional bounds.
    pub fn new(lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { lower, upper }
    }

    /// Whether `value` lies strictly between the configured bounds.
    pub fn accepts(&self, value: f64) -> bool {
        if let Some(lower) = self.lower {
            if value <= lower {
                return false;
            }
        }
        if let Some(upper) = self.upper {
            if value >= upper {
                return false;
            }
        }
        true
    }

    /// Overwrite the bounds that are given, keep the others.
    pub fn update(&mut self, lower: Option<f64>, upper: Option<f64>) {
        if lower.is_some() {
            self.lower = lower;
        }
        if upper.is_some() {
            self.upper = upper;
        }
    }
}

impl fmt::Display for RangeCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<f64>| b.map_or_else(|| "-".to_string(), |b| b.to_string());
        write!(f, "RangeCheck({}, {})", bound(self.lower), bound(self.upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1.0, false ; "lower bound is exclusive")]
    #[test_case(2.0, false ; "upper bound is exclusive")]
    #[test_case(1.5, true ; "midpoint passes")]
    #[test_case(0.5, false ; "below range")]
    #[test_case(2.5, false ; "above range")]
    fn bounded_check(value: f64, expected: bool) {
        assert_eq!(RangeCheck::new(Some(1.0), Some(2.0)).accepts(value), expected);
    }

    #[test]
    fn unbounded_sides_accept_anything() {
        assert!(RangeCheck::default().accepts(f64::MAX));
        assert!(RangeCheck::new(None, Some(0.0)).accepts(-1e9));
        assert!(RangeCheck::new(Some(0.1), None).accepts(0.11));
    }

    #[test]
    fn update_keeps_missing_bounds() {
        let mut check = RangeCheck::new(Some(1.0), None);
        check.update(None, Some(5.0));
        assert_eq!(check, RangeCheck::new(Some(1.0), Some(5.0)));
        assert_eq!(check.to_string(), "RangeCheck(1, 5)");
    }
}
