//! Tabulated spectral data and reduction of spectral curves to RGB.
//!
//! All tables are sampled every 10nm from [`LAMBDA_MIN`] to [`LAMBDA_MAX`].

use glam::DVec3;

/// First tabulated wavelength, in nanometers.
pub const LAMBDA_MIN: u32 = 360;
/// Last tabulated wavelength, in nanometers.
pub const LAMBDA_MAX: u32 = 830;
/// Number of tabulated samples.
pub const LAMBDA_COUNT: usize = ((LAMBDA_MAX - LAMBDA_MIN) / 10 + 1) as usize;

/// Representative wavelength of the red channel, in nanometers.
pub const LAMBDA_R: f64 = 680.0;
/// Representative wavelength of the green channel, in nanometers.
pub const LAMBDA_G: f64 = 550.0;
/// Representative wavelength of the blue channel, in nanometers.
pub const LAMBDA_B: f64 = 440.0;

/// Solar irradiance at the top of the atmosphere in W.m^-2.nm^-1.
///
/// ASTM G-173 ETR column, averaged over each 10nm bin.
pub const SOLAR_IRRADIANCE: [f64; LAMBDA_COUNT] = [
    1.11776, 1.14259, 1.01249, 1.14716, 1.72765, 1.73054, 1.6887, 1.61253, 1.91198, 2.03474,
    2.02042, 2.02212, 1.93377, 1.95809, 1.91686, 1.8298, 1.8685, 1.8931, 1.85149, 1.8504, 1.8341,
    1.8345, 1.8147, 1.78158, 1.7533, 1.6965, 1.68194, 1.64654, 1.6048, 1.52143, 1.55622, 1.5113,
    1.474, 1.4482, 1.41018, 1.36775, 1.34188, 1.31429, 1.28303, 1.26758, 1.2367, 1.2082, 1.18737,
    1.14683, 1.12362, 1.1058, 1.07124, 1.04992,
];

/// Ozone absorption cross section at 233K in m^2, averaged over each 10nm bin.
pub const OZONE_CROSS_SECTION: [f64; LAMBDA_COUNT] = [
    1.18e-27, 2.182e-28, 2.818e-28, 6.636e-28, 1.527e-27, 2.763e-27, 5.52e-27, 8.451e-27,
    1.582e-26, 2.316e-26, 3.669e-26, 4.924e-26, 7.752e-26, 9.016e-26, 1.48e-25, 1.602e-25,
    2.139e-25, 2.755e-25, 3.091e-25, 3.5e-25, 4.266e-25, 4.672e-25, 4.398e-25, 4.701e-25,
    5.019e-25, 4.305e-25, 3.74e-25, 3.215e-25, 2.662e-25, 2.238e-25, 1.852e-25, 1.473e-25,
    1.209e-25, 9.423e-26, 7.455e-26, 6.566e-26, 5.105e-26, 4.15e-26, 4.228e-26, 3.237e-26,
    2.451e-26, 2.801e-26, 2.534e-26, 1.624e-26, 1.465e-26, 2.078e-26, 1.383e-26, 7.105e-27,
];

/// A spectral curve sampled at the tabulated wavelengths.
pub type Spectrum = [f64; LAMBDA_COUNT];

/// The tabulated wavelengths in nanometers.
pub fn wavelengths() -> Spectrum {
    std::array::from_fn(|i| f64::from(LAMBDA_MIN) + 10.0 * i as f64)
}

/// Build a spectrum by evaluating `f` at every tabulated wavelength (in nanometers).
pub fn sample_spectrum(f: impl Fn(f64) -> f64) -> Spectrum {
    let lambdas = wavelengths();
    std::array::from_fn(|i| f(lambdas[i]))
}

/// Piecewise-linear interpolation of a tabulated curve, clamped at both ends.
pub fn interpolate(wavelengths: &[f64], values: &[f64], wavelength: f64) -> f64 {
    debug_assert_eq!(wavelengths.len(), values.len());
    let Some((&first, &last)) = values.first().zip(values.last()) else {
        return 0.0;
    };
    if wavelength < wavelengths[0] {
        return first;
    }
    for i in 0..wavelengths.len() - 1 {
        if wavelength < wavelengths[i + 1] {
            let u = (wavelength - wavelengths[i]) / (wavelengths[i + 1] - wavelengths[i]);
            return values[i] * (1.0 - u) + values[i + 1] * u;
        }
    }
    last
}

/// Reduce a spectral curve to RGB by sampling it at the three representative
/// wavelengths, then scale the result.
pub fn to_rgb(values: &Spectrum, scale: f64) -> DVec3 {
    let lambdas = wavelengths();
    DVec3::new(
        interpolate(&lambdas, values, LAMBDA_R),
        interpolate(&lambdas, values, LAMBDA_G),
        interpolate(&lambdas, values, LAMBDA_B),
    ) * scale
}
