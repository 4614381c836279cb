//! Rayleigh and Mie phase functions.

use std::f64::consts::PI;

/// Rayleigh phase function for the cosine `nu` of the scattering angle.
pub fn rayleigh_phase_function(nu: f64) -> f64 {
    let k = 3.0 / (16.0 * PI);
    k * (1.0 + nu * nu)
}

/// Cornette-Shanks approximation of the Mie phase function with asymmetry factor `g`.
pub fn mie_phase_function(g: f64, nu: f64) -> f64 {
    let k = 3.0 / (8.0 * PI) * (1.0 - g * g) / (2.0 + g * g);
    k * (1.0 + nu * nu) / (1.0 + g * g - 2.0 * g * nu).powf(1.5)
}
