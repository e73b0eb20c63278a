//! Linear rescaling between numeric domains
//!
//! Maps raw pulse widths (in samples) onto joint angles (in degrees).

/// A `(lower, upper)` bound pair describing one side of a linear mapping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RescaleDomain {
    pub lower: f64,
    pub upper: f64,
}

impl RescaleDomain {
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }
}

/// Linear map from one domain onto another
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rescale {
    from: RescaleDomain,
    to: RescaleDomain,
}

impl Rescale {
    pub const fn new(from: RescaleDomain, to: RescaleDomain) -> Self {
        Self { from, to }
    }

    pub fn from_domain(&self) -> RescaleDomain {
        self.from
    }

    pub fn to_domain(&self) -> RescaleDomain {
        self.to
    }

    /// Position of `x` within the source domain (0 at lower, 1 at upper).
    ///
    /// A zero-width source domain divides by `1 / upper` instead of the width.
    pub fn uninterpolate(&self, x: f64) -> f64 {
        let width = self.from.upper - self.from.lower;
        let span = if width != 0.0 {
            width
        } else {
            1.0 / self.from.upper
        };
        (x - self.from.lower) / span
    }

    /// Point at normalized position `t` within the target domain
    pub fn interpolate(&self, t: f64) -> f64 {
        self.to.lower * (1.0 - t) + self.to.upper * t
    }

    /// Unclamped linear mapping of `x`
    pub fn rescale(&self, x: f64) -> f64 {
        self.interpolate(self.uninterpolate(x))
    }

    /// Integer mapping of `x`, converted toward zero and clamped to the target domain.
    ///
    /// NaN converts to 0 and infinities saturate before clamping.
    pub fn rescale_clamped(&self, x: f64) -> i64 {
        let (lo, hi) = self.target_bounds();
        (self.rescale(x) as i64).clamp(lo, hi)
    }

    fn target_bounds(&self) -> (i64, i64) {
        let a = self.to.lower as i64;
        let b = self.to.upper as i64;
        (a.min(b), a.max(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eye() -> Rescale {
        Rescale::new(RescaleDomain::new(42.0, 62.0), RescaleDomain::new(0.0, 90.0))
    }

    #[test]
    fn test_rescale_endpoints() {
        let r = eye();
        assert_eq!(r.rescale(42.0), 0.0);
        assert_eq!(r.rescale(62.0), 90.0);
        assert_eq!(r.rescale(52.0), 45.0);
    }

    #[test]
    fn test_rescale_extrapolates_before_clamp() {
        let r = eye();
        assert!(r.rescale(30.0) < 0.0);
        assert!(r.rescale(80.0) > 90.0);
    }

    #[test]
    fn test_clamp_below_and_above() {
        let r = eye();
        for x in [0.0, 10.0, 41.0, -5.0] {
            assert_eq!(r.rescale_clamped(x), 0, "x={}", x);
        }
        for x in [63.0, 100.0, 1e9] {
            assert_eq!(r.rescale_clamped(x), 90, "x={}", x);
        }
    }

    #[test]
    fn test_monotonic_inside_domain() {
        let r = Rescale::new(RescaleDomain::new(50.0, 73.0), RescaleDomain::new(0.0, 45.0));
        let mut prev = r.rescale_clamped(50.0);
        for x in 51..=73 {
            let v = r.rescale_clamped(x as f64);
            assert!(v >= prev, "not monotonic at x={}: {} < {}", x, v, prev);
            prev = v;
        }
        assert_eq!(prev, 45);
    }

    #[test]
    fn test_integer_conversion_truncates() {
        let r = Rescale::new(RescaleDomain::new(45.0, 65.0), RescaleDomain::new(0.0, 45.0));
        // 22.5 converts toward zero
        assert_eq!(r.rescale(55.0), 22.5);
        assert_eq!(r.rescale_clamped(55.0), 22);
    }

    #[test]
    fn test_zero_width_domain_uses_reciprocal() {
        let r = Rescale::new(RescaleDomain::new(4.0, 4.0), RescaleDomain::new(0.0, 10.0));
        // span = 1/4, so normalized = (5 - 4) / 0.25 = 4
        assert_eq!(r.uninterpolate(5.0), 4.0);
        assert_eq!(r.rescale(5.0), 40.0);
        assert_eq!(r.rescale_clamped(5.0), 10);
    }

    #[test]
    fn test_zero_width_domain_at_zero_does_not_panic() {
        let r = Rescale::new(RescaleDomain::new(0.0, 0.0), RescaleDomain::new(0.0, 45.0));
        // 1/0 = inf span, normalized = 0
        assert_eq!(r.rescale_clamped(3.0), 0);
        // 0/inf = 0
        assert_eq!(r.rescale_clamped(0.0), 0);
    }

    #[test]
    fn test_nan_clamps_to_lower() {
        let r = eye();
        assert_eq!(r.rescale_clamped(f64::NAN), 0);
    }

    #[test]
    fn test_reversed_target_domain() {
        let r = Rescale::new(RescaleDomain::new(0.0, 10.0), RescaleDomain::new(90.0, 0.0));
        assert_eq!(r.rescale_clamped(0.0), 90);
        assert_eq!(r.rescale_clamped(10.0), 0);
        assert_eq!(r.rescale_clamped(20.0), 0);
    }
}
