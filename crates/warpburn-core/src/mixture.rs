//! Propellant mixtures: immutable descriptions of the propellant set
//! feeding one engine and their mass-flow ratios.
//!
//! A mixture is built once when the owning engine is registered and is
//! read-only for the simulation's lifetime. The normalized mass fractions
//! and the average density are computed at build time.

use serde::{Deserialize, Serialize};

use crate::id::ResourceId;

// ---------------------------------------------------------------------------
// Component and error types
// ---------------------------------------------------------------------------

/// One propellant component: the backing store resource, its mass-flow
/// ratio relative to the other components, and its density in kg per
/// store unit. A density of zero marks a massless resource.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Propellant {
    pub resource: ResourceId,
    pub ratio: f64,
    pub density: f64,
}

/// Errors from building a propellant mixture. Construction failure is fatal
/// to that engine's persistent simulation; the engine falls back to the
/// disabled regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum MixtureError {
    #[error("mixture has no components")]
    Empty,
    #[error("mixture ratios must sum to a positive value")]
    NonPositiveRatios,
}

// ---------------------------------------------------------------------------
// Average density
// ---------------------------------------------------------------------------

/// Average density of a mixture.
///
/// `Massless` is a distinguished zero, not an error: a mixture of only
/// zero-density propellants skips mass-based integration entirely.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MixtureDensity {
    /// Mass-fraction-weighted average density, kg per store unit. Positive.
    Massed(f64),
    /// Every component is massless.
    Massless,
}

impl MixtureDensity {
    /// Whether this mixture carries no mass at all.
    pub fn is_massless(&self) -> bool {
        matches!(self, MixtureDensity::Massless)
    }
}

// ---------------------------------------------------------------------------
// PropellantMixture
// ---------------------------------------------------------------------------

/// Immutable, ordered propellant set feeding one engine.
#[derive(Debug, Clone, PartialEq)]
pub struct PropellantMixture {
    components: Vec<Propellant>,
    /// Normalized mass fraction per component, same order as `components`.
    fractions: Vec<f64>,
    density: MixtureDensity,
}

impl PropellantMixture {
    /// Build a mixture from raw components.
    ///
    /// Fails when the list is empty or no ratio is positive. Components with
    /// a non-positive ratio contribute zero weight but keep their slot, so
    /// demand splits stay order-preserving.
    pub fn build(components: Vec<Propellant>) -> Result<Self, MixtureError> {
        if components.is_empty() {
            return Err(MixtureError::Empty);
        }
        let total: f64 = components.iter().map(|p| p.ratio.max(0.0)).sum();
        if total <= 0.0 {
            return Err(MixtureError::NonPositiveRatios);
        }
        let fractions: Vec<f64> = components
            .iter()
            .map(|p| p.ratio.max(0.0) / total)
            .collect();

        // Mass-fraction-weighted harmonic mean over the massed components.
        // Massless components are excluded from both sums.
        let mut massed_weight = 0.0;
        let mut inverse_sum = 0.0;
        for (component, &weight) in components.iter().zip(&fractions) {
            if component.density > 0.0 && weight > 0.0 {
                massed_weight += weight;
                inverse_sum += weight / component.density;
            }
        }
        let density = if inverse_sum > 0.0 {
            MixtureDensity::Massed(massed_weight / inverse_sum)
        } else {
            MixtureDensity::Massless
        };

        Ok(Self {
            components,
            fractions,
            density,
        })
    }

    /// The average density computed at build time.
    pub fn average_density(&self) -> MixtureDensity {
        self.density
    }

    /// Components in registration order.
    pub fn components(&self) -> &[Propellant] {
        &self.components
    }

    /// Split a total demand across components proportionally to their
    /// normalized mass fractions.
    ///
    /// Pure function of the immutable ratios: repeated calls with the same
    /// total return identical splits, and the splits sum to the total.
    pub fn demand_for(&self, total: f64) -> Vec<(ResourceId, f64)> {
        self.components
            .iter()
            .zip(&self.fractions)
            .map(|(component, &weight)| (component.resource, total * weight))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lf() -> ResourceId {
        ResourceId(0)
    }
    fn ox() -> ResourceId {
        ResourceId(1)
    }
    fn ec() -> ResourceId {
        ResourceId(2)
    }

    fn bipropellant() -> PropellantMixture {
        PropellantMixture::build(vec![
            Propellant {
                resource: lf(),
                ratio: 0.8,
                density: 1000.0,
            },
            Propellant {
                resource: ox(),
                ratio: 0.2,
                density: 500.0,
            },
        ])
        .unwrap()
    }

    #[test]
    fn empty_mixture_rejected() {
        assert_eq!(
            PropellantMixture::build(Vec::new()),
            Err(MixtureError::Empty)
        );
    }

    #[test]
    fn non_positive_ratios_rejected() {
        let result = PropellantMixture::build(vec![
            Propellant {
                resource: lf(),
                ratio: 0.0,
                density: 1000.0,
            },
            Propellant {
                resource: ox(),
                ratio: -1.0,
                density: 500.0,
            },
        ]);
        assert_eq!(result, Err(MixtureError::NonPositiveRatios));
    }

    #[test]
    fn harmonic_average_density() {
        // 1 / (0.8/1000 + 0.2/500) = 1 / 0.0012
        let mixture = bipropellant();
        match mixture.average_density() {
            MixtureDensity::Massed(d) => assert!((d - 833.333333).abs() < 1e-6),
            MixtureDensity::Massless => panic!("bipropellant is not massless"),
        }
    }

    #[test]
    fn all_massless_reports_distinguished_value() {
        let mixture = PropellantMixture::build(vec![Propellant {
            resource: ec(),
            ratio: 1.0,
            density: 0.0,
        }])
        .unwrap();
        assert!(mixture.average_density().is_massless());
    }

    #[test]
    fn massless_component_excluded_from_average() {
        let mixture = PropellantMixture::build(vec![
            Propellant {
                resource: lf(),
                ratio: 1.0,
                density: 800.0,
            },
            Propellant {
                resource: ec(),
                ratio: 1.0,
                density: 0.0,
            },
        ])
        .unwrap();
        // Only the massed half participates: 0.5 / (0.5 / 800) = 800.
        match mixture.average_density() {
            MixtureDensity::Massed(d) => assert!((d - 800.0).abs() < 1e-9),
            MixtureDensity::Massless => panic!("half the mixture has mass"),
        }
    }

    #[test]
    fn demand_split_is_proportional_and_ordered() {
        let mixture = bipropellant();
        let split = mixture.demand_for(10.0);
        assert_eq!(split.len(), 2);
        assert_eq!(split[0].0, lf());
        assert_eq!(split[1].0, ox());
        assert!((split[0].1 - 8.0).abs() < 1e-12);
        assert!((split[1].1 - 2.0).abs() < 1e-12);
    }

    #[test]
    fn demand_split_round_trips() {
        let mixture = bipropellant();
        let total: f64 = mixture.demand_for(3.7).iter().map(|(_, d)| d).sum();
        assert!((total - 3.7).abs() < 1e-12);
    }

    #[test]
    fn demand_split_is_idempotent() {
        let mixture = bipropellant();
        assert_eq!(mixture.demand_for(5.0), mixture.demand_for(5.0));
    }

    #[test]
    fn zero_ratio_component_keeps_its_slot() {
        let mixture = PropellantMixture::build(vec![
            Propellant {
                resource: lf(),
                ratio: 1.0,
                density: 1000.0,
            },
            Propellant {
                resource: ox(),
                ratio: 0.0,
                density: 500.0,
            },
        ])
        .unwrap();
        let split = mixture.demand_for(4.0);
        assert_eq!(split.len(), 2);
        assert!((split[0].1 - 4.0).abs() < 1e-12);
        assert_eq!(split[1].1, 0.0);
    }
}
