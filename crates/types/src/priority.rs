//! Spanning tree priority vectors.
//!
//! Both types derive `Ord` with field order matching the protocol's
//! significance order, so `a < b` means "a is better than b".

use crate::{PortId, SwitchId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Upper bound for root path cost. Accumulated costs saturate here.
pub const MAX_PATH_COST: u32 = 200_000_000;

/// The four-field priority carried in a BPDU.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct Priority {
    pub root_id: SwitchId,
    pub root_path_cost: u32,
    pub designated_switch_id: SwitchId,
    pub designated_port_id: PortId,
}

impl Priority {
    pub fn new(
        root_id: SwitchId,
        root_path_cost: u32,
        designated_switch_id: SwitchId,
        designated_port_id: PortId,
    ) -> Self {
        Self {
            root_id,
            root_path_cost,
            designated_switch_id,
            designated_port_id,
        }
    }

    /// Add a link cost to the root path cost, saturating at [`MAX_PATH_COST`].
    pub fn with_added_cost(mut self, cost: u32) -> Self {
        self.root_path_cost = self
            .root_path_cost
            .saturating_add(cost)
            .min(MAX_PATH_COST);
        self
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "root={} cost={} bridge={} port={}",
            self.root_id, self.root_path_cost, self.designated_switch_id, self.designated_port_id
        )
    }
}

/// Priority plus the receiving port id, used to rank candidate root paths.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct PriorityVector {
    pub priority: Priority,
    pub rx_port_id: PortId,
}

impl PriorityVector {
    pub fn new(priority: Priority, rx_port_id: PortId) -> Self {
        Self {
            priority,
            rx_port_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MacAddress, PortNumber};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::cmp::Ordering;

    fn random_switch(rng: &mut ChaCha8Rng) -> SwitchId {
        // Narrow ranges so ties actually happen.
        SwitchId::new(
            rng.gen_range(0..3u16) * 4096,
            MacAddress([0, 0, 0, 0, 0, rng.gen_range(0..3u8)]),
        )
    }

    fn random_vector(rng: &mut ChaCha8Rng) -> PriorityVector {
        PriorityVector::new(
            Priority::new(
                random_switch(rng),
                rng.gen_range(0..3u32),
                random_switch(rng),
                PortId::new(rng.gen_range(0..2u8) * 16, PortNumber(rng.gen_range(0..3u8))),
            ),
            PortId::new(128, PortNumber(rng.gen_range(0..3u8))),
        )
    }

    #[test]
    fn test_cost_saturates() {
        let p = Priority::default().with_added_cost(MAX_PATH_COST - 1);
        assert_eq!(p.with_added_cost(10).root_path_cost, MAX_PATH_COST);
        assert_eq!(
            p.with_added_cost(u32::MAX).root_path_cost,
            MAX_PATH_COST
        );
    }

    #[test]
    fn test_field_significance() {
        let base = Priority::new(
            SwitchId::new(32768, MacAddress([0, 0, 0, 0, 0, 5])),
            100,
            SwitchId::new(32768, MacAddress([0, 0, 0, 0, 0, 7])),
            PortId::new(128, PortNumber(2)),
        );
        let better_root = Priority {
            root_id: SwitchId::new(4096, MacAddress([0, 0, 0, 0, 0, 9])),
            root_path_cost: 5000,
            ..base
        };
        assert!(better_root < base);

        let cheaper = Priority {
            root_path_cost: 99,
            designated_switch_id: SwitchId::new(61440, MacAddress([0xff; 6])),
            ..base
        };
        assert!(cheaper < base);

        let rx_a = PriorityVector::new(base, PortId::new(128, PortNumber(1)));
        let rx_b = PriorityVector::new(base, PortId::new(128, PortNumber(3)));
        assert!(rx_a < rx_b);
        assert_eq!(rx_a.priority, rx_b.priority);
    }

    #[test]
    fn test_vector_order_is_strict_weak() {
        let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
        for _ in 0..2000 {
            let a = random_vector(&mut rng);
            let b = random_vector(&mut rng);
            let c = random_vector(&mut rng);

            let outcomes = [a < b, a == b, b < a];
            assert_eq!(outcomes.iter().filter(|x| **x).count(), 1);

            if a < b && b < c {
                assert!(a < c);
            }
            assert_eq!(a.cmp(&b), b.cmp(&a).reverse());
            if a.cmp(&b) == Ordering::Equal {
                assert_eq!(a, b);
            }
        }
    }
}
