use crate::CoreError;

/// Floating point type used throughout the model
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

pub const MM_PER_M: Real = 1000.0;

/// Precipitation and melt depths cross the API in mm, internal accounting is in m.
#[inline]
pub fn mm_to_m(v: Real) -> Real {
    v / MM_PER_M
}

#[inline]
pub fn m_to_mm(v: Real) -> Real {
    v * MM_PER_M
}
