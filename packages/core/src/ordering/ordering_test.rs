//! Tests for the sibling ordering engine
//!
//! Covers the timed / relative / plain partitions, fallback behaviour for
//! broken anchors, and the permutation and fixed-point properties.

use super::*;
use crate::models::NodeKind;

fn event(title: &str) -> TimelineNode {
    let mut node = TimelineNode::new(NodeKind::Event, "era-1", title);
    // Titles double as ids to keep assertions readable
    node.id = title.to_string();
    node
}

fn titles(nodes: &[TimelineNode]) -> Vec<&str> {
    nodes.iter().map(|n| n.title.as_str()).collect()
}

/// Renumber, shuffle nothing, and order again
fn reorder_normalized(nodes: &[TimelineNode]) -> Vec<TimelineNode> {
    let mut normalized = nodes.to_vec();
    renumber(&mut normalized);
    order_siblings(normalized)
}

#[test]
fn test_empty_input() {
    assert!(order_siblings(Vec::new()).is_empty());
}

#[test]
fn test_earlier_absolute_date_first() {
    let ordered = order_siblings(vec![
        event("june").with_time("2024-06-01"),
        event("january").with_time("2024-01-01"),
    ]);
    assert_eq!(titles(&ordered), ["january", "june"]);
}

#[test]
fn test_absolute_before_fictional() {
    // "Age" would sort before "2024" as a plain string
    let ordered = order_siblings(vec![
        event("future").with_time("Year 3000"),
        event("age").with_time("Age of Myth"),
        event("real").with_time("2024-01-01"),
    ]);
    assert_eq!(titles(&ordered), ["real", "age", "future"]);
}

#[test]
fn test_explicit_order_beats_time() {
    let ordered = order_siblings(vec![
        event("early").with_time("1900-01-01").with_order(2),
        event("late").with_time("2000-01-01").with_order(1),
    ]);
    assert_eq!(titles(&ordered), ["late", "early"]);
}

#[test]
fn test_plain_nodes_follow_timed_and_sort_by_order() {
    let ordered = order_siblings(vec![
        event("plain-b").with_order(2),
        event("timed").with_time("2024-01-01").with_order(10),
        event("plain-a").with_order(1),
    ]);
    assert_eq!(titles(&ordered), ["timed", "plain-a", "plain-b"]);
}

#[test]
fn test_ties_keep_input_order() {
    let ordered = order_siblings(vec![
        event("x"),
        event("y"),
        event("z"),
        event("t1").with_time("2024-01-01"),
        event("t2").with_time("2024-01-01"),
    ]);
    assert_eq!(titles(&ordered), ["t1", "t2", "x", "y", "z"]);
}

#[test]
fn test_relative_before_and_after_plain_anchor() {
    let ordered = order_siblings(vec![
        event("first").with_order(1),
        event("A").with_order(5),
        event("B").positioned("A", PositionType::After),
        event("C").positioned("A", PositionType::Before),
        event("last").with_order(9),
    ]);
    assert_eq!(titles(&ordered), ["first", "C", "A", "B", "last"]);
}

#[test]
fn test_relative_before_timed_anchor() {
    let ordered = order_siblings(vec![
        event("V1").with_time("1939-09-01"),
        event("V2").with_time("1940-05-10"),
        event("V3").positioned("V1", PositionType::Before),
    ]);
    assert_eq!(titles(&ordered), ["V3", "V1", "V2"]);
}

#[test]
fn test_timed_node_ignores_its_anchor() {
    let ordered = order_siblings(vec![
        event("a").with_time("2024-01-01"),
        event("b").with_time("2025-01-01"),
        event("c")
            .with_time("2026-01-01")
            .positioned("a", PositionType::Before),
    ]);
    assert_eq!(titles(&ordered), ["a", "b", "c"]);
}

#[test]
fn test_missing_anchor_appends_after_timed_segment() {
    let ordered = order_siblings(vec![
        event("plain"),
        event("orphan").positioned("deleted-node", PositionType::Before),
        event("timed").with_time("2024-01-01"),
    ]);
    assert_eq!(titles(&ordered), ["timed", "orphan", "plain"]);
}

#[test]
fn test_forward_reference_resolves() {
    // D is listed before the node it anchors to
    let ordered = order_siblings(vec![
        event("A"),
        event("D").positioned("C", PositionType::Before),
        event("C").positioned("A", PositionType::After),
    ]);
    assert_eq!(titles(&ordered), ["A", "D", "C"]);
}

#[test]
fn test_shared_anchor_follows_input_order() {
    let ordered = order_siblings(vec![
        event("A"),
        event("x").positioned("A", PositionType::After),
        event("y").positioned("A", PositionType::After),
        event("p").positioned("A", PositionType::Before),
        event("q").positioned("A", PositionType::Before),
    ]);
    assert_eq!(titles(&ordered), ["p", "q", "A", "x", "y"]);
}

#[test]
fn test_anchor_cycle_does_not_drop_nodes() {
    let ordered = order_siblings(vec![
        event("plain"),
        event("x").positioned("y", PositionType::After),
        event("y").positioned("x", PositionType::After),
    ]);
    assert_eq!(titles(&ordered), ["x", "y", "plain"]);
}

#[test]
fn test_self_anchor_is_detached() {
    let ordered = order_siblings(vec![
        event("self").positioned("self", PositionType::Before),
        event("plain"),
    ]);
    assert_eq!(titles(&ordered), ["self", "plain"]);
}

#[test]
fn test_output_is_permutation() {
    let input = vec![
        event("a").with_time("Year 3000"),
        event("b").positioned("a", PositionType::After),
        event("c").positioned("zzz", PositionType::After),
        event("d").with_order(-4),
        event("e").positioned("d", PositionType::Before),
        event("f").with_time("1999-12-31").with_order(3),
        event("g").positioned("g", PositionType::After),
    ];
    let ordered = order_siblings(input.clone());
    assert_eq!(ordered.len(), input.len());

    let mut expected: Vec<_> = input.iter().map(|n| n.id.clone()).collect();
    let mut actual: Vec<_> = ordered.iter().map(|n| n.id.clone()).collect();
    expected.sort();
    actual.sort();
    assert_eq!(expected, actual);
}

#[test]
fn test_duplicate_ids_are_all_kept() {
    let ordered = order_siblings(vec![event("dup"), event("dup"), event("other")]);
    assert_eq!(ordered.len(), 3);
}

#[test]
fn test_normalized_output_is_fixed_point() {
    let cases = vec![
        vec![
            event("A").with_order(5),
            event("B").positioned("A", PositionType::After),
            event("C").positioned("A", PositionType::Before),
        ],
        vec![
            event("A"),
            event("C").positioned("A", PositionType::After),
            event("D").positioned("C", PositionType::Before),
        ],
        vec![
            event("A"),
            event("X").positioned("A", PositionType::After),
            event("Z").positioned("X", PositionType::After),
            event("Y").positioned("A", PositionType::After),
        ],
        vec![
            event("t2").with_time("2024-06-01"),
            event("t1").with_time("2024-01-01"),
            event("r").positioned("t2", PositionType::Before),
            event("lost").positioned("nowhere", PositionType::After),
            event("p2").with_order(8),
            event("p1").with_order(3),
            event("fic").with_time("Year 3000"),
        ],
        vec![
            event("x").positioned("y", PositionType::After),
            event("y").positioned("x", PositionType::Before),
            event("w").positioned("x", PositionType::Before),
        ],
    ];

    for input in cases {
        let first = order_siblings(input);
        let second = reorder_normalized(&first);
        assert_eq!(titles(&first), titles(&second));
    }
}

#[test]
fn test_ordering_is_deterministic() {
    let input = vec![
        event("a").with_time("2024-01-01"),
        event("b"),
        event("c").positioned("a", PositionType::After),
    ];
    let first = order_siblings(input.clone());
    let second = order_siblings(input);
    assert_eq!(first, second);
}

#[test]
fn test_renumber_assigns_positions() {
    let mut nodes = vec![event("a").with_order(9), event("b").with_order(-3)];
    renumber(&mut nodes);
    assert_eq!(nodes[0].order, 0);
    assert_eq!(nodes[1].order, 1);
}

/// Drop `id` from a rendered sequence after applying `patches` to the rest
fn remove_spliced(
    rendered: &[TimelineNode],
    id: &str,
    patches: Vec<(String, NodeUpdate)>,
) -> Vec<TimelineNode> {
    let mut patches: HashMap<String, NodeUpdate> = patches.into_iter().collect();
    rendered
        .iter()
        .filter(|node| node.id != id)
        .cloned()
        .map(|mut node| {
            if let Some(patch) = patches.remove(&node.id) {
                patch.apply_to(&mut node);
            }
            node
        })
        .collect()
}

#[test]
fn test_anchored_chain_skips_timed_nodes() {
    let rendered = order_siblings(vec![
        event("x"),
        event("t").positioned("x", PositionType::After),
        event("w").positioned("t", PositionType::After),
        event("s").with_time("2024-01-01").positioned("x", PositionType::After),
    ]);
    let chain = anchored_chain(&rendered, "x");
    assert_eq!(chain, HashSet::from(["x", "t", "w"]));
}

#[test]
fn test_splice_out_keeps_dependents_in_place() {
    let rendered = order_siblings(vec![
        event("a").with_time("2024-01-01"),
        event("b").with_time("2025-01-01"),
        event("x").positioned("b", PositionType::Before),
        event("t").positioned("x", PositionType::After),
        event("u").positioned("x", PositionType::Before),
        event("w").positioned("t", PositionType::After),
    ]);
    assert_eq!(titles(&rendered), ["a", "u", "x", "t", "w", "b"]);

    let patches = splice_out(&rendered, "x");
    // Only direct dependents move; "w" still follows "t"
    let mut patched: Vec<&str> = patches.iter().map(|(id, _)| id.as_str()).collect();
    patched.sort_unstable();
    assert_eq!(patched, ["t", "u"]);

    let remaining = order_siblings(remove_spliced(&rendered, "x", patches));
    assert_eq!(titles(&remaining), ["a", "u", "t", "w", "b"]);
}

#[test]
fn test_splice_out_without_neighbours_leaves_plain_nodes() {
    let rendered = order_siblings(vec![
        event("x"),
        event("t").positioned("x", PositionType::After),
        event("u").positioned("x", PositionType::Before),
    ]);
    assert_eq!(titles(&rendered), ["u", "x", "t"]);

    let remaining = order_siblings(remove_spliced(&rendered, "x", splice_out(&rendered, "x")));
    assert_eq!(titles(&remaining), ["u", "t"]);
    assert!(remaining.iter().all(|node| node.relative_anchor().is_none()));
}

#[test]
fn test_splice_out_without_dependents_is_empty() {
    let rendered = order_siblings(vec![
        event("a").with_time("2024-01-01"),
        event("x"),
        event("s").with_time("2025-01-01").positioned("x", PositionType::Before),
    ]);
    assert!(splice_out(&rendered, "x").is_empty());
}

#[test]
fn test_renumber_spaced_keeps_rendering() {
    let mut rendered = order_siblings(vec![
        event("c").with_time("2026-01-01"),
        event("a").with_time("2024-01-01"),
        event("b").with_time("2025-01-01"),
    ]);
    renumber_spaced(&mut rendered);
    let orders: Vec<i64> = rendered.iter().map(|n| n.order).collect();
    assert_eq!(orders, [0, 2, 4]);
    assert_eq!(titles(&order_siblings(rendered)), ["a", "b", "c"]);
}
