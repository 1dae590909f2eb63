//! Exponential rocket-equation integration over one elapsed interval.
//!
//! The exponential form matters: accelerated-regime intervals can span
//! hours of mission time, where a linear approximation would materially
//! overstate the imparted deltaV.

use glam::DVec3;

use crate::mixture::MixtureDensity;

/// Standard gravity used by the rocket equation, m/s^2. Conventional
/// constant, not the local gravitational acceleration.
pub const STANDARD_GRAVITY: f64 = 9.81;

// ---------------------------------------------------------------------------
// Errors and results
// ---------------------------------------------------------------------------

/// Defensive guards raised during burn integration. Handled locally by the
/// step pipeline: the engine's contribution is skipped for the step and a
/// diagnostic emitted; never a hard failure.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum IntegrationError {
    #[error("consuming {consumed:.3} kg would not leave positive mass from {mass:.3} kg")]
    MassNonPositive { mass: f64, consumed: f64 },
    #[error("specific impulse must be positive, got {0}")]
    NonPositiveIsp(f64),
}

/// Trajectory and propellant effect of thrusting over one interval.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BurnDelta {
    /// Velocity change to apply to the trajectory, m/s.
    pub delta_v: DVec3,
    /// Propellant mass drawn from the vehicle, kg.
    pub mass_consumed: f64,
    /// Total demand to split across the mixture's components, store units.
    pub mass_demand: f64,
}

// ---------------------------------------------------------------------------
// Integration
// ---------------------------------------------------------------------------

/// Integrate thrust over `dt` seconds against the current vehicle mass.
///
/// `thrust <= 0` or `dt <= 0` short-circuit to a zero result without
/// touching the logarithm. A `Massless` mixture consumes no vehicle mass
/// and produces no demand; its deltaV degenerates to the constant-mass
/// limit `thrust / mass * dt`.
pub fn integrate(
    mass: f64,
    dt: f64,
    thrust: f64,
    specific_impulse: f64,
    direction: DVec3,
    density: MixtureDensity,
) -> Result<BurnDelta, IntegrationError> {
    if thrust <= 0.0 || dt <= 0.0 {
        return Ok(BurnDelta::default());
    }
    if specific_impulse <= 0.0 {
        return Err(IntegrationError::NonPositiveIsp(specific_impulse));
    }
    if mass <= 0.0 {
        return Err(IntegrationError::MassNonPositive {
            mass,
            consumed: 0.0,
        });
    }

    let density = match density {
        MixtureDensity::Massed(d) => d,
        MixtureDensity::Massless => {
            let magnitude = thrust / mass * dt;
            return Ok(BurnDelta {
                delta_v: magnitude * direction,
                mass_consumed: 0.0,
                mass_demand: 0.0,
            });
        }
    };

    let mass_flow = thrust / (specific_impulse * STANDARD_GRAVITY);
    let consumed = mass_flow * dt;
    if consumed >= mass {
        return Err(IntegrationError::MassNonPositive { mass, consumed });
    }

    let mass_after = mass - consumed;
    let magnitude = specific_impulse * STANDARD_GRAVITY * (mass / mass_after).ln();
    Ok(BurnDelta {
        delta_v: magnitude * direction,
        mass_consumed: consumed,
        mass_demand: consumed / density,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn plus_x() -> DVec3 {
        DVec3::X
    }

    #[test]
    fn hour_long_burn_matches_rocket_equation() {
        // 1000 N at 300 s Isp for one hour against a 10 t vehicle.
        let delta = integrate(
            10_000.0,
            3_600.0,
            1_000.0,
            300.0,
            plus_x(),
            MixtureDensity::Massed(833.333333),
        )
        .unwrap();

        let mass_flow = 1_000.0 / (300.0 * STANDARD_GRAVITY);
        let consumed = mass_flow * 3_600.0;
        assert!((delta.mass_consumed - consumed).abs() < EPS);
        assert!((consumed - 1_223.24).abs() < 0.01);

        let expected = 300.0 * STANDARD_GRAVITY * (10_000.0 / (10_000.0 - consumed)).ln();
        assert!((delta.delta_v.length() - expected).abs() < EPS);
        // Around 384 m/s for this operating point.
        assert!(delta.delta_v.length() > 380.0 && delta.delta_v.length() < 390.0);

        assert!((delta.mass_demand - consumed / 833.333333).abs() < EPS);
    }

    #[test]
    fn delta_v_is_parallel_to_direction() {
        let direction = DVec3::new(0.6, 0.8, 0.0);
        let delta = integrate(
            5_000.0,
            60.0,
            800.0,
            250.0,
            direction,
            MixtureDensity::Massed(1_000.0),
        )
        .unwrap();
        let cross = delta.delta_v.cross(direction);
        assert!(cross.length() < EPS);
        assert!(delta.delta_v.dot(direction) > 0.0);
    }

    #[test]
    fn zero_thrust_short_circuits() {
        let delta = integrate(
            10_000.0,
            3_600.0,
            0.0,
            300.0,
            plus_x(),
            MixtureDensity::Massed(1_000.0),
        )
        .unwrap();
        assert_eq!(delta, BurnDelta::default());
    }

    #[test]
    fn zero_elapsed_time_short_circuits() {
        let delta = integrate(
            10_000.0,
            0.0,
            1_000.0,
            300.0,
            plus_x(),
            MixtureDensity::Massed(1_000.0),
        )
        .unwrap();
        assert_eq!(delta, BurnDelta::default());
    }

    #[test]
    fn massless_mixture_skips_mass_based_integration() {
        let delta = integrate(
            10_000.0,
            3_600.0,
            1_000.0,
            300.0,
            plus_x(),
            MixtureDensity::Massless,
        )
        .unwrap();
        assert_eq!(delta.mass_consumed, 0.0);
        assert_eq!(delta.mass_demand, 0.0);
        // Constant-mass limit: a = F/m over the interval.
        assert!((delta.delta_v.length() - 360.0).abs() < EPS);
    }

    #[test]
    fn consuming_the_whole_vehicle_is_guarded() {
        // 10 kg vehicle cannot feed an hour of this burn.
        let result = integrate(
            10.0,
            3_600.0,
            1_000.0,
            300.0,
            plus_x(),
            MixtureDensity::Massed(1_000.0),
        );
        assert!(matches!(
            result,
            Err(IntegrationError::MassNonPositive { .. })
        ));
    }

    #[test]
    fn non_positive_isp_is_guarded() {
        let result = integrate(
            10_000.0,
            60.0,
            1_000.0,
            0.0,
            plus_x(),
            MixtureDensity::Massed(1_000.0),
        );
        assert_eq!(result, Err(IntegrationError::NonPositiveIsp(0.0)));
    }
}
