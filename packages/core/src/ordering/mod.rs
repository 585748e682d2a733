//! Sibling Ordering Engine
//!
//! Reconciles the three independently optional ordering signals of a sibling
//! set into one deterministic, total sequence:
//!
//! 1. **Timed** nodes (non-empty time value) sort by `order`, then by time
//!    (see [`crate::models::time`]). An explicit `order` wins over timestamps.
//! 2. **Plain** nodes (no time, no anchor) sort by `order` and render after
//!    every timed node.
//! 3. **Relative** nodes (no time, with `position_relative_to`) attach directly
//!    before or after their anchor, wherever the anchor renders.
//!
//! A node that is timed *and* anchored is treated purely as timed.
//!
//! # Relative attachment
//!
//! Relative nodes are attached in input order. A node whose anchor has not
//! been placed yet is retried once the pass completes, so forward references
//! resolve regardless of input order. Anchors that do not exist in the sibling
//! set (deleted, or under another parent) never fail the ordering: those nodes
//! are appended after the timed segment, ahead of plain nodes. Anchor cycles
//! are broken by appending the earliest node of the cycle the same way.
//!
//! Several nodes on the same anchor and side render in the order they were
//! attached, i.e. input order. Nodes attached before an anchor keep that
//! order ahead of it, nodes attached after follow it in that order. Feeding
//! the output back in (with `order` renumbered to the rendered positions)
//! reproduces the same sequence.
//!
//! Ties on every key fall back to input position, so the result never depends
//! on sort stability.
//!
//! # Examples
//!
//! ```rust
//! use timeline_core::models::{NodeKind, PositionType, TimelineNode};
//! use timeline_core::ordering::order_siblings;
//!
//! let v1 = TimelineNode::new(NodeKind::Event, "era", "V1").with_time("1939-09-01");
//! let v2 = TimelineNode::new(NodeKind::Event, "era", "V2").with_time("1940-05-10");
//! let v3 = TimelineNode::new(NodeKind::Event, "era", "V3")
//!     .positioned(v1.id.clone(), PositionType::Before);
//!
//! let ordered = order_siblings(vec![v1, v2, v3]);
//! let titles: Vec<_> = ordered.iter().map(|n| n.title.as_str()).collect();
//! assert_eq!(titles, ["V3", "V1", "V2"]);
//! ```

mod order_calculator;

pub use order_calculator::OrderCalculator;

use crate::models::{NodeUpdate, PositionType, TimeValue, TimelineNode};
use std::collections::{HashMap, HashSet};

struct Slot {
    node: Option<TimelineNode>,
    before: Vec<usize>,
    after: Vec<usize>,
}

fn order_of(slots: &[Slot], index: usize) -> i64 {
    slots[index].node.as_ref().map_or(0, |n| n.order)
}

enum Step {
    Visit(usize),
    Emit(usize),
}

/// Order a sibling set. Pure and total: the output is always a permutation of the input.
pub fn order_siblings(nodes: Vec<TimelineNode>) -> Vec<TimelineNode> {
    let mut slots: Vec<Slot> = Vec::with_capacity(nodes.len());
    let mut timed: Vec<(usize, TimeValue)> = Vec::new();
    let mut plain: Vec<usize> = Vec::new();
    let mut relative: Vec<usize> = Vec::new();
    let mut index_by_id: HashMap<String, usize> = HashMap::with_capacity(nodes.len());

    for (index, node) in nodes.into_iter().enumerate() {
        index_by_id.entry(node.id.clone()).or_insert(index);
        let time = node.time_value();
        if !time.is_empty() {
            timed.push((index, time));
        } else if node.relative_anchor().is_some() {
            relative.push(index);
        } else {
            plain.push(index);
        }
        slots.push(Slot {
            node: Some(node),
            before: Vec::new(),
            after: Vec::new(),
        });
    }

    timed.sort_unstable_by(|(a, a_time), (b, b_time)| {
        order_of(&slots, *a)
            .cmp(&order_of(&slots, *b))
            .then_with(|| a_time.cmp(b_time))
            .then_with(|| a.cmp(b))
    });
    plain.sort_unstable_by(|a, b| {
        order_of(&slots, *a)
            .cmp(&order_of(&slots, *b))
            .then_with(|| a.cmp(b))
    });

    let mut placed = vec![false; slots.len()];
    for &(index, _) in &timed {
        placed[index] = true;
    }
    for &index in &plain {
        placed[index] = true;
    }

    let anchors: HashMap<usize, (String, PositionType)> = relative
        .iter()
        .filter_map(|&index| {
            let node = slots[index].node.as_ref()?;
            let (anchor, side) = node.relative_anchor()?;
            Some((index, (anchor.to_string(), side)))
        })
        .collect();

    // Relative nodes that could not attach anywhere, appended after the timed segment
    let mut detached: Vec<usize> = Vec::new();
    let mut pending = relative;

    while !pending.is_empty() {
        // Attach everything whose anchor is placed, repeating until no progress
        loop {
            let mut progressed = false;
            let mut still_pending = Vec::with_capacity(pending.len());
            for index in pending {
                let (anchor, side) = &anchors[&index];
                match index_by_id.get(anchor.as_str()) {
                    Some(&target) if placed[target] && target != index => {
                        match side {
                            PositionType::Before => slots[target].before.push(index),
                            PositionType::After => slots[target].after.push(index),
                        }
                        placed[index] = true;
                        progressed = true;
                    }
                    _ => still_pending.push(index),
                }
            }
            pending = still_pending;
            if !progressed || pending.is_empty() {
                break;
            }
        }

        if pending.is_empty() {
            break;
        }

        // Anchors missing from the sibling set fall back to append
        let (dangling, waiting): (Vec<usize>, Vec<usize>) = pending
            .into_iter()
            .partition(|index| !index_by_id.contains_key(anchors[index].0.as_str()));

        if !dangling.is_empty() {
            for &index in &dangling {
                tracing::debug!(
                    "Relative anchor '{}' not among siblings; appending node at end of timed segment",
                    anchors[&index].0
                );
                placed[index] = true;
            }
            detached.extend(dangling);
            pending = waiting;
            continue;
        }

        // Whatever is left forms or hangs off an anchor cycle; detach the earliest
        let mut waiting = waiting;
        let head = waiting.remove(0);
        tracing::debug!("Relative anchor cycle detected; detaching node at input position {head}");
        placed[head] = true;
        detached.push(head);
        pending = waiting;
    }

    let roots = timed
        .iter()
        .map(|(index, _)| *index)
        .chain(detached)
        .chain(plain);

    let mut sequence = Vec::with_capacity(slots.len());
    let mut stack = Vec::new();
    for root in roots {
        stack.push(Step::Visit(root));
        while let Some(step) = stack.pop() {
            match step {
                Step::Visit(index) => {
                    let slot = &slots[index];
                    stack.extend(slot.after.iter().rev().map(|&a| Step::Visit(a)));
                    stack.push(Step::Emit(index));
                    stack.extend(slot.before.iter().rev().map(|&b| Step::Visit(b)));
                }
                Step::Emit(index) => {
                    if let Some(node) = slots[index].node.take() {
                        sequence.push(node);
                    }
                }
            }
        }
    }

    sequence
}

/// Renumber `order` to the rendered positions `0..n`.
///
/// Feeding the result back into [`order_siblings`] yields the same sequence.
pub fn renumber(nodes: &mut [TimelineNode]) {
    let orders = OrderCalculator::rebalance(nodes.len());
    for (node, order) in nodes.iter_mut().zip(orders) {
        node.order = order;
    }
}

/// Renumber `order` to the rendered positions, leaving a free value between
/// neighbours so a drop at `order ± 1` lands strictly between two siblings.
pub fn renumber_spaced(nodes: &mut [TimelineNode]) {
    let orders = OrderCalculator::rebalance_spaced(nodes.len());
    for (node, order) in nodes.iter_mut().zip(orders) {
        node.order = order;
    }
}

/// Ids in `rendered` whose relative-anchor chain leads to `id`, plus `id`
///
/// Timed nodes ignore their anchor, so they never belong to another node's chain.
pub fn anchored_chain<'a>(rendered: &'a [TimelineNode], id: &'a str) -> HashSet<&'a str> {
    let anchors: HashMap<&str, &str> = rendered
        .iter()
        .filter(|node| !node.is_timed())
        .filter_map(|node| Some((node.id.as_str(), node.relative_anchor()?.0)))
        .collect();

    let mut chain = HashSet::from([id]);
    for node in rendered {
        let mut current = node.id.as_str();
        // Bounded walk; a cycle that never reaches `id` just runs out
        for _ in 0..=rendered.len() {
            if current == id {
                chain.insert(node.id.as_str());
                break;
            }
            match anchors.get(current) {
                Some(&anchor) => current = anchor,
                None => break,
            }
        }
    }
    chain
}

/// Patches that keep the nodes anchored to `id` where they render once `id`
/// leaves the sibling set
///
/// `rendered` must be the output of [`order_siblings`]. Dependents on the
/// `Before` side re-anchor after the sibling rendered just before `id`'s
/// chain, dependents on the `After` side re-anchor before the sibling rendered
/// just after it, so both groups keep their relative order. Either side falls
/// back to the other neighbour. With no neighbour left the dependents become
/// plain nodes ordered by their current position. Their own dependents are
/// untouched.
pub fn splice_out(rendered: &[TimelineNode], id: &str) -> Vec<(String, NodeUpdate)> {
    let dependents: Vec<(usize, PositionType)> = rendered
        .iter()
        .enumerate()
        .filter(|(_, node)| !node.is_timed())
        .filter_map(|(index, node)| match node.relative_anchor() {
            Some((anchor, side)) if anchor == id => Some((index, side)),
            _ => None,
        })
        .collect();
    if dependents.is_empty() {
        return Vec::new();
    }

    let chain = anchored_chain(rendered, id);
    let span: Vec<usize> = rendered
        .iter()
        .enumerate()
        .filter(|(_, node)| chain.contains(node.id.as_str()))
        .map(|(index, _)| index)
        .collect();
    let (first, last) = match (span.iter().min(), span.iter().max()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Vec::new(),
    };

    let previous = first
        .checked_sub(1)
        .and_then(|index| rendered.get(index))
        .map(|node| (node.id.clone(), PositionType::After));
    let next = rendered
        .get(last + 1)
        .map(|node| (node.id.clone(), PositionType::Before));

    dependents
        .into_iter()
        .map(|(index, side)| {
            let neighbour = match side {
                PositionType::Before => previous.clone().or_else(|| next.clone()),
                PositionType::After => next.clone().or_else(|| previous.clone()),
            };
            let patch = match neighbour {
                Some(anchor) => NodeUpdate::new().with_relative_position(Some(anchor)),
                None => NodeUpdate::new()
                    .with_relative_position(None)
                    .with_order(index as i64),
            };
            (rendered[index].id.clone(), patch)
        })
        .collect()
}

#[cfg(test)]
mod ordering_test;
