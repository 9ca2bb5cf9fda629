//! End-to-end checks of the document -> graph -> navigation pipeline

use json_diagram::config::{CollapsePolicy, DiagramConfig};
use json_diagram::diagram::geometry::icon_anchor;
use json_diagram::diagram::graph::{AnnotationRole, Highlight, NodeKind, PathSegment, ValueKind, ROOT_ID};
use json_diagram::diagram::metrics::EstimatedMetrics;
use json_diagram::diagram::navigation::{Navigator, NoopObserver};
use json_diagram::diagram::{build, Action, DocumentFormat, Orientation};
use json_diagram::Session;
use proptest::prelude::*;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

fn session() -> Session {
    Session::new(
        DiagramConfig::default(),
        Box::new(EstimatedMetrics::default()),
        Box::new(NoopObserver),
    )
}

fn annotation_pairs(session: &Session, id: &str) -> Vec<(Option<String>, String)> {
    session
        .graph()
        .get_node(id)
        .unwrap()
        .lines()
        .into_iter()
        .map(|(k, v)| (k.map(|k| k.display.clone()), v.display.clone()))
        .collect()
}

#[test]
fn flat_object_is_one_folded_leaf() {
    let mut s = session();
    s.set_text(r#"{"a": 1, "b": "x"}"#).unwrap();

    let graph = s.graph();
    assert_eq!(graph.nodes().iter().filter(|n| n.kind == NodeKind::Root).count(), 1);
    assert_eq!(graph.nodes().iter().filter(|n| n.kind == NodeKind::Container).count(), 0);
    let leaves: Vec<_> = graph.nodes().iter().filter(|n| n.is_leaf()).collect();
    assert_eq!(leaves.len(), 1);
    assert_eq!(
        annotation_pairs(&s, &leaves[0].id),
        vec![
            (Some("a".to_string()), "1".to_string()),
            (Some("b".to_string()), "\"x\"".to_string()),
        ]
    );
}

#[test]
fn nested_object_expands_one_level() {
    let mut s = session();
    s.set_text(r#"{"a": {"b": 1}}"#).unwrap();

    let graph = s.graph();
    let container = graph.get_node(graph.children_of(ROOT_ID)[0]).unwrap();
    assert_eq!(container.kind, NodeKind::Container);
    assert_eq!(container.child_count, 1);
    assert_eq!(container.annotations[0].text, "a");
    assert_eq!(container.annotations[1].role, AnnotationRole::Count);

    let leaf = graph.children_of(&container.id)[0];
    assert_eq!(annotation_pairs(&s, leaf), vec![(Some("b".to_string()), "1".to_string())]);
}

#[test]
fn scalar_array_folds_without_keys() {
    let mut s = session();
    s.set_text("[1,2,3]").unwrap();

    let graph = s.graph();
    assert_eq!(graph.len(), 2);
    let leaf = graph.children_of(ROOT_ID)[0];
    assert_eq!(
        annotation_pairs(&s, leaf),
        vec![(None, "1".to_string()), (None, "2".to_string()), (None, "3".to_string())]
    );
}

#[test]
fn typed_values_are_colored() {
    let mut s = session();
    s.set_text(r#"["42", 42, "True", false, "hello", null]"#).unwrap();

    let graph = s.graph();
    let leaf = graph.get_node(graph.children_of(ROOT_ID)[0]).unwrap();
    let kinds: Vec<Option<ValueKind>> = leaf.annotations.iter().map(|a| a.value_kind).collect();
    assert_eq!(
        kinds,
        vec![
            Some(ValueKind::Number),
            Some(ValueKind::Number),
            Some(ValueKind::True),
            Some(ValueKind::False),
            Some(ValueKind::String),
            Some(ValueKind::Null),
        ]
    );

    let theme = *s.theme();
    assert_eq!(leaf.annotations[0].color, theme.number_color);
    assert_eq!(leaf.annotations[0].display, "42");
    assert_eq!(leaf.annotations[2].color, theme.true_color);
    assert_eq!(leaf.annotations[2].display, "true");
    assert_eq!(leaf.annotations[3].color, theme.false_color);
    assert_eq!(leaf.annotations[4].color, theme.string_color);
    assert_eq!(leaf.annotations[4].display, "\"hello\"");
    assert_ne!(theme.true_color, theme.false_color);

    s.load("<r><age>42</age><ok>True</ok><name>Ada</name></r>", DocumentFormat::Xml)
        .unwrap();
    let graph = s.graph();
    let leaf = graph.nodes().iter().find(|n| n.is_leaf()).unwrap();
    let kinds: Vec<Option<ValueKind>> = leaf
        .annotations
        .iter()
        .filter(|a| a.role == AnnotationRole::Value)
        .map(|a| a.value_kind)
        .collect();
    assert_eq!(
        kinds,
        vec![Some(ValueKind::Number), Some(ValueKind::True), Some(ValueKind::String)]
    );
}

#[test]
fn xml_is_normalized_before_building() {
    let mut s = session();
    s.load(
        r#"<config debug="False"><server port="80">main</server><server port="81">backup</server></config>"#,
        DocumentFormat::Xml,
    )
    .unwrap();

    let paths: Vec<String> = s.graph().nodes().iter().map(|n| n.path.clone()).collect();
    assert!(paths.iter().any(|p| p == "Root.config.server[1]"));

    s.apply(Action::Search("backup".into())).unwrap();
    let focused = s.search_state().focused().unwrap().to_string();
    assert_eq!(s.details(&focused).unwrap().path, "Root.config.server[1]");

    let debug_leaf = s
        .graph()
        .nodes()
        .iter()
        .find(|n| n.display_text().contains("debug"))
        .unwrap();
    assert!(debug_leaf.display_text().contains("debug: false"));
}

#[test]
fn rotation_cycles_and_moves_icons() {
    let mut s = session();
    s.set_text(r#"{"a": {"b": {"c": 1}}, "d": [{"e": 1}, 2]}"#).unwrap();
    let start = s.orientation();

    for _ in 0..4 {
        s.apply(Action::RotateLayout).unwrap();
        let orientation = s.orientation();
        for node in s.graph().nodes().iter().filter(|n| n.has_expand_icon()) {
            let anchor = node.icon_anchor.unwrap();
            assert_eq!(anchor, icon_anchor(node.geometry, orientation));
            if orientation.is_horizontal() {
                assert!((anchor.y - node.geometry.height / 2.0).abs() < 1e-3);
            } else {
                assert!((anchor.x - node.geometry.width / 2.0).abs() < 1e-3);
            }
        }
    }
    assert_eq!(s.orientation(), start);
    assert_eq!(start, Orientation::LeftToRight);
}

#[test]
fn empty_search_resets_everything() {
    let mut s = session();
    s.set_text(r#"{"a": {"x": "needle"}, "b": {"y": "needle"}}"#).unwrap();
    s.apply(Action::Search("NEEDLE".into())).unwrap();
    assert_eq!(s.search_state().position(), (1, 2));

    s.apply(Action::Search(String::new())).unwrap();
    assert_eq!(s.search_state().position(), (0, 0));
    assert!(s.graph().nodes().iter().all(|n| n.style.highlight == Highlight::None));
}

#[test]
fn derived_policy_from_config() {
    let config = DiagramConfig {
        collapse_policy: CollapsePolicy::Derived,
        ..DiagramConfig::default()
    };
    let mut s = Session::new(config, Box::new(EstimatedMetrics::default()), Box::new(NoopObserver));
    s.set_text(r#"{"a": {"b": {"c": 1}}, "d": {"e": 1}}"#).unwrap();

    s.apply(Action::CollapseAll).unwrap();
    s.apply(Action::ToggleNode("root/0".into())).unwrap();
    // one top-tier node is still collapsed, so the toggle expands everything
    s.apply(Action::ToggleCollapseAll).unwrap();
    assert!(s.graph().nodes().iter().all(|n| n.is_expanded != Some(false)));
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| json!(n)),
        "[a-zA-Z0-9 ]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(5, 48, 5, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..5).prop_map(Value::Array),
            prop::collection::vec(("[a-z]{1,4}", inner), 0..5)
                .prop_map(|entries| Value::Object(entries.into_iter().collect())),
        ]
    })
}

/// Every value of a document keyed by its locator path
fn values_by_path(value: &Value) -> HashMap<String, &Value> {
    let mut out = HashMap::new();
    let mut stack = vec![("Root".to_string(), value)];
    while let Some((path, value)) = stack.pop() {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    let mut child_path = path.clone();
                    PathSegment::Key(key.clone()).append_to(&mut child_path);
                    stack.push((child_path, child));
                }
            }
            Value::Array(items) => {
                for (i, child) in items.iter().enumerate() {
                    let mut child_path = path.clone();
                    PathSegment::Index(i).append_to(&mut child_path);
                    stack.push((child_path, child));
                }
            }
            _ => {}
        }
        out.insert(path, value);
    }
    out
}

/// Direct members of a container; a scalar document is its own single member
fn members(value: &Value) -> Vec<&Value> {
    match value {
        Value::Object(map) => map.values().collect(),
        Value::Array(items) => items.iter().collect(),
        scalar => vec![scalar],
    }
}

proptest! {
    #[test]
    fn build_produces_a_tree(value in json_value()) {
        let graph = build(&value).unwrap();
        prop_assert_eq!(graph.nodes().iter().filter(|n| n.kind == NodeKind::Root).count(), 1);
        prop_assert_eq!(graph.edges().len() + 1, graph.len());
        prop_assert!(graph.validate().is_ok());
        for node in graph.nodes().iter().filter(|n| n.kind != NodeKind::Root) {
            prop_assert!(graph.parent_of(&node.id).is_some());
        }
        for edge in graph.edges() {
            prop_assert!(graph.get_node(&edge.source_id).is_some());
            prop_assert!(graph.get_node(&edge.target_id).is_some());
        }
    }

    #[test]
    fn folding_law(value in json_value()) {
        let graph = build(&value).unwrap();
        let sources = values_by_path(&value);

        for node in graph.nodes() {
            let children = graph.children_of(&node.id);
            if node.is_leaf() {
                prop_assert!(children.is_empty());
                continue;
            }

            let source = sources.get(node.path.as_str()).copied();
            prop_assert!(source.is_some(), "no source value for {}", node.path);
            let members = members(source.unwrap());

            if members.is_empty() {
                prop_assert!(children.is_empty());
            } else if members.iter().all(|m| !m.is_object() && !m.is_array()) {
                // all-scalar: exactly one folded leaf holding every member
                prop_assert_eq!(children.len(), 1);
                let leaf = graph.get_node(children[0]).unwrap();
                prop_assert!(leaf.is_leaf());
                let values = leaf
                    .annotations
                    .iter()
                    .filter(|a| a.role == AnnotationRole::Value)
                    .count();
                prop_assert_eq!(values, members.len());
            } else {
                // mixed: one node per member, nothing folded
                prop_assert_eq!(children.len(), members.len());
                for id in &children {
                    prop_assert!(!id.ends_with("/values"));
                }
            }
        }
    }

    #[test]
    fn ids_are_stable(value in json_value()) {
        let first: Vec<String> = build(&value).unwrap().nodes().iter().map(|n| n.id.clone()).collect();
        let second: Vec<String> = build(&value).unwrap().nodes().iter().map(|n| n.id.clone()).collect();
        let unique: HashSet<&String> = first.iter().collect();
        prop_assert_eq!(unique.len(), first.len());
        prop_assert_eq!(first, second);
    }

    #[test]
    fn paths_roundtrip(value in json_value()) {
        let graph = build(&value).unwrap();
        for node in graph.nodes() {
            prop_assert_eq!(graph.reconstruct_path(&node.id), Some(node.path.clone()));
        }
    }

    #[test]
    fn advance_visits_every_match_once(value in json_value(), query in "[a-z0-9]") {
        let mut graph = build(&value).unwrap();
        let mut nav = Navigator::new(CollapsePolicy::Toggle, Box::new(NoopObserver));
        let matches = nav.search(&mut graph, &query).matches.clone();

        for id in &matches {
            let node = graph.get_node(id).unwrap();
            prop_assert!(node.is_leaf());
            prop_assert!(node.matches_query(&query));
        }

        let mut seen = HashSet::new();
        if let Some(first) = matches.first() {
            seen.insert(first.clone());
        }
        for _ in 1..matches.len() {
            let id = nav.advance(&mut graph).unwrap().to_string();
            prop_assert!(seen.insert(id));
        }
        prop_assert_eq!(seen.len(), matches.len());
        if !matches.is_empty() {
            prop_assert_eq!(nav.advance(&mut graph), Some(matches[0].as_str()));
        }
    }
}
