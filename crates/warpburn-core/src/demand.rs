//! Demand resolution: converting a propellant mass demand into
//! per-component withdrawal requests against the external store.

use crate::hardware::ResourceStore;
use crate::id::ResourceId;
use crate::mixture::PropellantMixture;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Per-component outcome of one resolved demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentDemand {
    pub resource: ResourceId,
    pub requested: f64,
    pub granted: f64,
}

/// Outcome of resolving one step's propellant demand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandResult {
    /// One entry per mixture component, in mixture order.
    pub components: Vec<ComponentDemand>,
    /// Set when any component was granted exactly zero against a strictly
    /// positive request. Partial grants (> 0) count as success for that
    /// component; the resulting shortfall over long accelerated intervals
    /// is accepted rather than scaled (see DESIGN.md).
    pub depleted: bool,
}

impl DemandResult {
    /// The first component that came back empty, if any.
    pub fn first_depleted(&self) -> Option<ResourceId> {
        self.components
            .iter()
            .find(|c| c.requested > 0.0 && c.granted == 0.0)
            .map(|c| c.resource)
    }

    /// Total granted across components, store units.
    pub fn total_granted(&self) -> f64 {
        self.components.iter().map(|c| c.granted).sum()
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Which component classes the resolver may request from the store.
#[derive(Debug, Clone, Copy)]
pub struct DemandPolicy {
    /// Request zero-density components at all.
    pub request_massless: bool,
    /// Request components with mass at all.
    pub request_massed: bool,
    /// Treat every request as trivially granted without consulting the
    /// store.
    pub infinite_propellant: bool,
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve a total demand against the external store: at most one
/// withdrawal request per component, no retries.
///
/// A component whose applicable policy flag is off is skipped with zero
/// requested and granted; a skipped component can never flag depletion.
pub fn resolve(
    mixture: &PropellantMixture,
    total_demand: f64,
    policy: DemandPolicy,
    store: &mut dyn ResourceStore,
) -> DemandResult {
    let mut result = DemandResult::default();

    for (component, (resource, requested)) in mixture
        .components()
        .iter()
        .zip(mixture.demand_for(total_demand))
    {
        let massless = component.density <= 0.0;
        let allowed = if massless {
            policy.request_massless
        } else {
            policy.request_massed
        };
        if !allowed || requested <= 0.0 {
            result.components.push(ComponentDemand {
                resource,
                requested: 0.0,
                granted: 0.0,
            });
            continue;
        }

        let granted = if policy.infinite_propellant {
            requested
        } else {
            store.request(resource, requested)
        };
        if granted == 0.0 {
            result.depleted = true;
        }
        result.components.push(ComponentDemand {
            resource,
            requested,
            granted,
        });
    }

    result
}
