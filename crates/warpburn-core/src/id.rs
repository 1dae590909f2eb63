use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies one simulated engine unit within a simulation.
    pub struct EngineId;
}

/// Identifies a propellant resource in the external store. Cheap to copy
/// and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_id_equality() {
        let a = ResourceId(0);
        let b = ResourceId(0);
        let c = ResourceId(1);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn resource_ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ResourceId(0), "liquid_fuel");
        map.insert(ResourceId(1), "oxidizer");
        assert_eq!(map[&ResourceId(0)], "liquid_fuel");
    }
}
