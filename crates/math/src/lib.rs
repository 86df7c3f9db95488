//! Math kernel: vectors, quaternions, 4x4 matrices and bounds.
//!
//! # Invariants
//! - Matrices are column-major; `data[12..15]` holds the translation.
//! - Nothing here normalizes implicitly. Callers normalize quaternions and
//!   axes when they need unit length.
//! - Degenerate inputs are no-ops, never panics: normalizing a zero vector or
//!   inverting a singular matrix leaves the value untouched.

mod bounds;
mod mat4;
mod quat;
mod vec3;

pub use bounds::Bounds;
pub use mat4::Mat4;
pub use quat::Quat;
pub use vec3::Vec3;

/// Component-wise comparison within `eps`, used by tests across the workspace.
pub fn approx_eq(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

pub fn crate_info() -> &'static str {
    "glscene-math v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("math"));
    }

    #[test]
    fn approx_eq_tolerance() {
        assert!(approx_eq(1.0, 1.0 + 1e-7, 1e-6));
        assert!(!approx_eq(1.0, 1.1, 1e-3));
    }
}
