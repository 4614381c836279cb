use aether_atmosphere::*;
use glam::DVec3;

fn earth() -> Atmosphere {
    initialize_atmosphere().0
}

fn steps(start: f64, end: f64, count: usize) -> impl Iterator<Item = f64> {
    (0..=count).map(move |i| start + (end - start) * i as f64 / count as f64)
}

#[test]
fn test_transmittance_parameterization_round_trip() {
    let atmosphere = earth();
    let layout = TextureLayout::default();
    // At the very top every upward ray has zero length, so stop just below it.
    for r in steps(atmosphere.bottom_radius, atmosphere.top_radius - 0.5, 40) {
        for mu in steps(-1.0, 1.0, 80) {
            let uv = get_transmittance_texture_uv_from_r_mu(&atmosphere, &layout, r, mu);
            let (r2, mu2) = get_r_mu_from_transmittance_texture_uv(&atmosphere, &layout, uv);
            assert!((r2 - r).abs() < 1e-4, "r: {r} -> {r2} (mu = {mu})");
            assert!((mu2 - mu).abs() < 1e-4, "mu: {mu} -> {mu2} (r = {r})");
        }
    }
}

#[test]
fn test_scattering_parameterization_round_trip_space_branch() {
    let atmosphere = earth();
    let layout = TextureLayout::default();
    for r in steps(atmosphere.bottom_radius, atmosphere.top_radius - 0.5, 24) {
        let horizon = mu_horizon(&atmosphere, r);
        for mu in steps(horizon + 1e-6, 1.0, 24) {
            for mu_s in steps(atmosphere.mu_s_min, 1.0, 12) {
                for nu in steps(-1.0, 1.0, 4) {
                    let coords = ScatteringCoords::new(&atmosphere, r, mu, mu_s, nu);
                    assert!(!coords.ray_r_mu_intersects_ground);
                    let uvwz =
                        get_scattering_texture_uvwz_from_r_mu_mu_s_nu(&atmosphere, &layout, &coords);
                    let back =
                        get_r_mu_mu_s_nu_from_scattering_texture_uvwz(&atmosphere, &layout, uvwz);
                    assert!(!back.ray_r_mu_intersects_ground);
                    assert!((back.r - r).abs() < 1e-4, "r {r} -> {}", back.r);
                    assert!((back.mu - mu).abs() < 1e-4, "mu {mu} -> {} at r {r}", back.mu);
                    assert!((back.mu_s - mu_s).abs() < 1e-4, "mu_s {mu_s} -> {}", back.mu_s);
                    assert!((back.nu - nu).abs() < 1e-4);
                }
            }
        }
    }
}

#[test]
fn test_scattering_parameterization_round_trip_ground_branch() {
    let atmosphere = earth();
    let layout = TextureLayout::default();
    // On the ground every downward ray has zero length, so start just above it.
    for r in steps(atmosphere.bottom_radius + 0.01, atmosphere.top_radius, 24) {
        let horizon = mu_horizon(&atmosphere, r);
        for mu in steps(-1.0, horizon - 1e-6, 24) {
            for mu_s in steps(atmosphere.mu_s_min, 1.0, 12) {
                let coords = ScatteringCoords::new(&atmosphere, r, mu, mu_s, 0.0);
                assert!(coords.ray_r_mu_intersects_ground, "r {r} mu {mu}");
                let uvwz =
                    get_scattering_texture_uvwz_from_r_mu_mu_s_nu(&atmosphere, &layout, &coords);
                assert!(uvwz.z < 0.5);
                let back =
                    get_r_mu_mu_s_nu_from_scattering_texture_uvwz(&atmosphere, &layout, uvwz);
                assert!(back.ray_r_mu_intersects_ground);
                assert!((back.r - r).abs() < 1e-4, "r {r} -> {}", back.r);
                assert!((back.mu - mu).abs() < 1e-4, "mu {mu} -> {} at r {r}", back.mu);
                assert!((back.mu_s - mu_s).abs() < 1e-4, "mu_s {mu_s} -> {}", back.mu_s);
            }
        }
    }
}

#[test]
fn test_transmittance_is_in_unit_range_and_decreases_towards_horizon() {
    let atmosphere = earth();
    for r in steps(atmosphere.bottom_radius + 0.1, atmosphere.top_radius - 0.1, 12) {
        let horizon = mu_horizon(&atmosphere, r);
        let mut previous = DVec3::ONE;
        for mu in steps(1.0, horizon, 40) {
            let t = compute_transmittance_to_top_atmosphere_boundary(&atmosphere, r, mu);
            assert!(t.min_element() > 0.0, "T({r}, {mu}) = {t:?}");
            assert!(t.max_element() <= 1.0, "T({r}, {mu}) = {t:?}");
            assert!(
                t.x <= previous.x + 1e-12 && t.y <= previous.y + 1e-12 && t.z <= previous.z + 1e-12,
                "T increased at r = {r}, mu = {mu}: {previous:?} -> {t:?}"
            );
            previous = t;
        }
    }
}

#[test]
fn test_vertical_path_transmits_more_than_grazing_path() {
    let atmosphere = earth();
    let rg = atmosphere.bottom_radius;
    let up = compute_transmittance_to_top_atmosphere_boundary(&atmosphere, rg, 1.0);
    let grazing = compute_transmittance_to_top_atmosphere_boundary(&atmosphere, rg, 0.05);
    assert!(up.x > grazing.x && up.y > grazing.y && up.z > grazing.z);
}

#[test]
fn test_ground_intersection_boundary() {
    let atmosphere = earth();
    for r in steps(atmosphere.bottom_radius, atmosphere.top_radius, 10) {
        assert!(!ray_intersects_ground(&atmosphere, r, 0.0), "horizontal ray at r = {r}");
        assert!(!ray_intersects_ground(&atmosphere, r, 0.5));
        assert!(ray_intersects_ground(&atmosphere, r, -1.0));
        let horizon = mu_horizon(&atmosphere, r);
        if horizon < -1e-6 {
            assert!(ray_intersects_ground(&atmosphere, r, horizon - 1e-6));
            assert!(!ray_intersects_ground(&atmosphere, r, horizon + 1e-6));
        }
    }
}

#[test]
fn test_density_profiles_are_continuous_at_layer_boundaries() {
    let atmosphere = earth();
    let profiles = [
        ("rayleigh", &atmosphere.rayleigh_density),
        ("mie", &atmosphere.mie_density),
        ("ozone", &atmosphere.absorption_density),
    ];
    for (name, profile) in profiles {
        let boundary = profile.layers[0].width;
        let at = get_profile_density(profile, boundary);
        let above = get_profile_density(profile, boundary + 1e-9);
        assert!((at - above).abs() < 1e-6, "{name}: {at} vs {above}");
        if boundary > 0.0 {
            let below = get_profile_density(profile, boundary - 1e-9);
            assert!((at - below).abs() < 1e-6, "{name}: {below} vs {at}");
        }
    }
}

#[test]
fn test_reference_coefficients_fixture() {
    let atmosphere = earth();
    let close = |actual: f64, expected: f64| (actual - expected).abs() <= 1e-4 * expected.abs();

    let rayleigh = [0.005_802_339_4, 0.013_557_762_4, 0.033_100_006];
    let mie_scattering = [0.003_996; 3];
    let mie_extinction = [0.004_44; 3];
    let solar = [1.474, 1.8504, 1.91198];
    for c in 0..3 {
        assert!(
            close(atmosphere.rayleigh_scattering[c], rayleigh[c]),
            "rayleigh[{c}] = {}",
            atmosphere.rayleigh_scattering[c]
        );
        assert!(close(atmosphere.mie_scattering[c], mie_scattering[c]));
        assert!(close(atmosphere.mie_extinction[c], mie_extinction[c]));
        assert!(close(atmosphere.solar_irradiance[c], solar[c]));
    }
    assert_eq!(atmosphere.bottom_radius, 6360.0);
    assert_eq!(atmosphere.top_radius, 6420.0);
}
