use crate::models::{PositionType, TimelineNode};

/// Calculates explicit `order` values for drops, appends and rebalancing
pub struct OrderCalculator;

impl OrderCalculator {
    /// Order value for a node dropped next to a sibling
    ///
    /// # Examples
    /// ```
    /// use timeline_core::models::PositionType;
    /// use timeline_core::ordering::OrderCalculator;
    ///
    /// assert_eq!(OrderCalculator::order_for_drop(5, PositionType::Before), 4);
    /// assert_eq!(OrderCalculator::order_for_drop(5, PositionType::After), 6);
    /// ```
    pub fn order_for_drop(target_order: i64, edge: PositionType) -> i64 {
        match edge {
            PositionType::Before => target_order.saturating_sub(1),
            PositionType::After => target_order.saturating_add(1),
        }
    }

    /// Order value that places a node after every sibling in `siblings`
    pub fn order_for_append(siblings: &[TimelineNode]) -> i64 {
        siblings
            .iter()
            .map(|node| node.order)
            .max()
            .map_or(0, |max| max.saturating_add(1))
    }

    /// Check if rendered orders are no longer strictly increasing
    pub fn needs_rebalancing(orders: &[i64]) -> bool {
        orders.windows(2).any(|pair| pair[1] <= pair[0])
    }

    /// Evenly spaced orders for `count` siblings
    ///
    /// # Example
    /// Input:  4
    /// Output: [0, 1, 2, 3]
    pub fn rebalance(count: usize) -> Vec<i64> {
        (0..count as i64).collect()
    }

    /// Like [`rebalance`](Self::rebalance) but two apart, so `order ± 1`
    /// fits between any two neighbours
    pub fn rebalance_spaced(count: usize) -> Vec<i64> {
        (0..count as i64).map(|position| position * 2).collect()
    }
}
