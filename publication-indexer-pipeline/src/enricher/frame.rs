//! Linked-data frame.
//!
//! A frame is a static JSON-LD frame document describing which external
//! nodes get embedded at which positions of the base document, and which of
//! their properties survive. Only the subset of JSON-LD framing the indexer
//! needs is supported:
//!
//! - `@context` is copied to the output unchanged
//! - `@type` on the root frame must match the base document's type
//! - nested property frames embed the graph node a reference points to
//! - `@explicit: true` keeps only the listed properties (plus id and type)
//! - `@embed: "@never"` keeps a reference as-is
//! - `@default` supplies a value for a missing property
//!
//! The graph is treated as a set. Nodes sharing an identifier are merged in a
//! canonical order, so the output does not depend on the order fragments were
//! supplied in.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use publication_indexer_shared::canonicalize;

/// The frame bundled with the indexer.
pub const DEFAULT_FRAME: &str = include_str!("frame.json");

const ID_KEYS: [&str; 2] = ["id", "@id"];
const TYPE_KEYS: [&str; 2] = ["type", "@type"];
const BLANK_NODE_PREFIX: &str = "_:";

/// Errors raised while loading or applying a frame.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FramingError {
    /// The frame document is not a usable frame.
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// The base document is not a JSON object.
    #[error("Invalid base document: {0}")]
    InvalidBase(String),

    /// The base document's type does not match the frame's root type.
    #[error("Base document type {found:?} does not match frame type {expected:?}")]
    RootTypeMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Options controlling the shape of the framed output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramingOptions {
    /// Return the root node itself instead of wrapping it in `@graph`.
    pub omit_graph: bool,
    /// Drop blank node identifiers (`_:` prefixed) from the output.
    pub prune_blank_node_identifiers: bool,
}

impl Default for FramingOptions {
    fn default() -> Self {
        Self {
            omit_graph: true,
            prune_blank_node_identifiers: true,
        }
    }
}

/// An immutable frame document.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    root: Map<String, Value>,
}

impl Frame {
    /// Create a frame from a JSON value. The value must be an object.
    pub fn from_value(value: Value) -> Result<Self, FramingError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(FramingError::InvalidFrame(format!(
                "expected a JSON object, found {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parse a frame from JSON text.
    pub fn from_json(json: &str) -> Result<Self, FramingError> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| FramingError::InvalidFrame(e.to_string()))?;
        Self::from_value(value)
    }

    /// Load a frame from a file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, FramingError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| FramingError::InvalidFrame(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    /// The frame bundled with the indexer.
    pub fn bundled() -> Result<Self, FramingError> {
        Self::from_json(DEFAULT_FRAME)
    }

    /// The frame's `@context`, if any.
    pub fn context(&self) -> Option<&Value> {
        self.root.get("@context")
    }

    /// Frame `base` together with the given fragments.
    ///
    /// `base` is the root of the output. Fragments are graph nodes that
    /// references inside `base` may point to; fragments nothing points to
    /// are discarded.
    pub fn apply(
        &self,
        base: &Value,
        fragments: &[Value],
        options: FramingOptions,
    ) -> Result<Value, FramingError> {
        let base = base.as_object().ok_or_else(|| {
            FramingError::InvalidBase(format!("expected a JSON object, found {}", json_kind(base)))
        })?;

        self.check_root_type(base)?;

        let graph = NodeIndex::build(base, fragments);
        let mut path: Vec<String> = node_id(base).into_iter().collect();
        let mut framed = graph.frame_node(base, &self.root, &mut path);

        if options.prune_blank_node_identifiers {
            prune_blank_node_ids(&mut framed);
        }

        let mut output = Map::new();
        if let Some(context) = self.context() {
            output.insert("@context".to_string(), context.clone());
        }
        if options.omit_graph {
            output.extend(framed);
        } else {
            output.insert(
                "@graph".to_string(),
                Value::Array(vec![Value::Object(framed)]),
            );
        }

        Ok(Value::Object(output))
    }

    fn check_root_type(&self, base: &Map<String, Value>) -> Result<(), FramingError> {
        let expected = TYPE_KEYS
            .iter()
            .find_map(|k| self.root.get(*k))
            .map(string_set)
            .unwrap_or_default();
        if expected.is_empty() {
            return Ok(());
        }

        let found = TYPE_KEYS
            .iter()
            .find_map(|k| base.get(*k))
            .map(string_set)
            .unwrap_or_default();

        if found.iter().any(|t| expected.contains(t)) {
            Ok(())
        } else {
            Err(FramingError::RootTypeMismatch { expected, found })
        }
    }
}

/// Graph nodes by identifier, merged in canonical order.
struct NodeIndex {
    nodes: BTreeMap<String, Map<String, Value>>,
}

impl NodeIndex {
    fn build(base: &Map<String, Value>, fragments: &[Value]) -> Self {
        let mut candidates: Vec<(String, String, &Map<String, Value>)> = fragments
            .iter()
            .flat_map(graph_nodes)
            .filter_map(|node| {
                let id = node_id(node)?;
                let canonical = canonicalize(&Value::Object(node.clone())).to_string();
                Some((id, canonical, node))
            })
            .collect();
        candidates.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

        let mut nodes: BTreeMap<String, Map<String, Value>> = BTreeMap::new();
        if let Some(id) = node_id(base) {
            nodes.insert(id, base.clone());
        }
        for (id, _, node) in candidates {
            let entry = nodes.entry(id).or_default();
            merge_missing(entry, node);
        }

        debug!(node_count = nodes.len(), "Built node index");
        Self { nodes }
    }

    fn frame_node(
        &self,
        node: &Map<String, Value>,
        frame: &Map<String, Value>,
        path: &mut Vec<String>,
    ) -> Map<String, Value> {
        let explicit = frame.get("@explicit").and_then(Value::as_bool).unwrap_or(false);
        let mut output = Map::new();

        for (key, value) in node {
            if key == "@context" {
                continue;
            }
            let is_identity = ID_KEYS.contains(&key.as_str()) || TYPE_KEYS.contains(&key.as_str());
            match frame.get(key) {
                Some(subframe) if !is_identity => {
                    let subframe = as_frame(subframe);
                    output.insert(key.clone(), self.frame_value(value, &subframe, path));
                }
                Some(_) => {
                    output.insert(key.clone(), value.clone());
                }
                None if !explicit || is_identity => {
                    output.insert(key.clone(), value.clone());
                }
                None => {}
            }
        }

        for (key, subframe) in frame {
            if key.starts_with('@') || output.contains_key(key) || node.contains_key(key) {
                continue;
            }
            if let Some(default) = subframe.get("@default") {
                let default = match default.as_str() {
                    Some("@null") => Value::Null,
                    _ => default.clone(),
                };
                output.insert(key.clone(), default);
            }
        }

        output
    }

    fn frame_value(&self, value: &Value, frame: &Map<String, Value>, path: &mut Vec<String>) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| self.frame_value(item, frame, path))
                    .collect(),
            ),
            Value::Object(object) => Value::Object(self.frame_object(object, frame, path)),
            scalar => scalar.clone(),
        }
    }

    fn frame_object(
        &self,
        object: &Map<String, Value>,
        frame: &Map<String, Value>,
        path: &mut Vec<String>,
    ) -> Map<String, Value> {
        let embed = frame.get("@embed").and_then(Value::as_str) != Some("@never");

        let target = node_id(object)
            .filter(|_| embed)
            .filter(|id| !path.contains(id))
            .and_then(|id| self.nodes.get(&id).map(|node| (id, node)));

        match target {
            Some((id, node)) => {
                let mut merged = object.clone();
                merge_missing(&mut merged, node);
                path.push(id);
                let framed = self.frame_node(&merged, frame, path);
                path.pop();
                framed
            }
            None => self.frame_node(object, frame, path),
        }
    }
}

/// Nodes contributed by a fragment: the fragment itself, the members of its
/// `@graph` if it has one, or the objects of a top-level array.
fn graph_nodes(fragment: &Value) -> Vec<&Map<String, Value>> {
    match fragment {
        Value::Array(members) => members.iter().filter_map(Value::as_object).collect(),
        Value::Object(node) => match node.get("@graph") {
            Some(Value::Array(members)) => members.iter().filter_map(Value::as_object).collect(),
            _ => vec![node],
        },
        _ => Vec::new(),
    }
}

fn node_id(node: &Map<String, Value>) -> Option<String> {
    ID_KEYS
        .iter()
        .find_map(|k| node.get(*k))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Copy every property of `source` that `target` lacks. Nested objects
/// present on both sides are merged recursively; on any other conflict the
/// value already in `target` is kept.
fn merge_missing(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        if key == "@context" {
            continue;
        }
        match target.get_mut(key) {
            None => {
                target.insert(key.clone(), value.clone());
            }
            Some(Value::Object(existing)) => {
                if let Value::Object(incoming) = value {
                    merge_missing(existing, incoming);
                }
            }
            Some(_) => {}
        }
    }
}

fn prune_blank_node_ids(node: &mut Map<String, Value>) {
    for key in ID_KEYS {
        let is_blank = node
            .get(key)
            .and_then(Value::as_str)
            .is_some_and(|id| id.starts_with(BLANK_NODE_PREFIX));
        if is_blank {
            node.remove(key);
        }
    }
    for value in node.values_mut() {
        prune_value(value);
    }
}

fn prune_value(value: &mut Value) {
    match value {
        Value::Object(object) => prune_blank_node_ids(object),
        Value::Array(items) => items.iter_mut().for_each(prune_value),
        _ => {}
    }
}

/// Frames may wrap a property frame in a single-element array.
fn as_frame(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(frame) => frame.clone(),
        Value::Array(items) => items
            .first()
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default(),
        _ => Map::new(),
    }
}

fn string_set(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const JOURNAL: &str = "https://api.example.org/channels/journal/123";
    const PUBLISHER: &str = "https://api.example.org/channels/publisher/456";

    fn base() -> Value {
        json!({
            "id": "https://api.example.org/resources/r1",
            "identifier": "r1",
            "title": "T",
            "context": {
                "journal": {"id": JOURNAL, "type": "Journal"},
                "publisher": {"id": PUBLISHER}
            }
        })
    }

    fn journal() -> Value {
        json!({
            "@context": "https://schema.example.org/context.json",
            "id": JOURNAL,
            "type": "Journal",
            "name": "Journal of Tests",
            "onlineIssn": "1234-5678",
            "internalScore": 7
        })
    }

    fn publisher() -> Value {
        json!({"id": PUBLISHER, "type": "Publisher", "name": "Test Press"})
    }

    fn frame() -> Frame {
        Frame::bundled().unwrap()
    }

    #[test]
    fn test_bundled_frame_parses() {
        let frame = frame();
        assert!(frame.context().is_some());
    }

    #[test]
    fn test_no_fragments_returns_base_with_context() {
        let output = frame().apply(&base(), &[], FramingOptions::default()).unwrap();

        let mut expected = base();
        expected["@context"] = frame().context().unwrap().clone();
        assert_eq!(output, expected);
    }

    #[test]
    fn test_embeds_referenced_fragments() {
        let output = frame()
            .apply(&base(), &[journal(), publisher()], FramingOptions::default())
            .unwrap();

        let journal = &output["context"]["journal"];
        assert_eq!(journal["name"], "Journal of Tests");
        assert_eq!(journal["onlineIssn"], "1234-5678");
        assert_eq!(journal["type"], "Journal");
        assert!(journal.get("internalScore").is_none());
        assert!(journal.get("@context").is_none());
        assert_eq!(output["context"]["publisher"]["name"], "Test Press");
        assert_eq!(output["title"], "T");
    }

    #[test]
    fn test_missing_fragment_leaves_reference() {
        let output = frame()
            .apply(&base(), &[publisher()], FramingOptions::default())
            .unwrap();

        assert_eq!(
            output["context"]["journal"],
            json!({"id": JOURNAL, "type": "Journal"})
        );
        assert_eq!(output["context"]["publisher"]["name"], "Test Press");
    }

    #[test]
    fn test_fragment_order_does_not_matter() {
        let conflicting = json!({"id": JOURNAL, "name": "Other Name"});
        let orders = [
            vec![journal(), publisher(), conflicting.clone()],
            vec![conflicting.clone(), publisher(), journal()],
            vec![publisher(), conflicting, journal()],
        ];

        let outputs: Vec<Value> = orders
            .iter()
            .map(|fragments| {
                frame()
                    .apply(&base(), fragments, FramingOptions::default())
                    .unwrap()
            })
            .collect();

        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[1], outputs[2]);
    }

    #[test]
    fn test_unreferenced_fragments_are_discarded() {
        let stray = json!({"id": "https://api.example.org/other", "name": "Stray"});
        let with_stray = frame()
            .apply(&base(), &[stray], FramingOptions::default())
            .unwrap();
        let without = frame().apply(&base(), &[], FramingOptions::default()).unwrap();

        assert_eq!(with_stray, without);
    }

    #[test]
    fn test_fragment_graph_members_are_indexed() {
        let wrapped = json!({"@graph": [journal(), {"id": "_:b0", "value": 1}]});
        let output = frame()
            .apply(&base(), &[wrapped], FramingOptions::default())
            .unwrap();

        assert_eq!(output["context"]["journal"]["name"], "Journal of Tests");
    }

    #[test]
    fn test_top_level_array_members_are_indexed() {
        let expanded = json!([journal(), {"id": PUBLISHER, "name": "Publisher"}, "stray"]);
        let output = frame()
            .apply(&base(), &[expanded], FramingOptions::default())
            .unwrap();

        assert_eq!(output["context"]["journal"]["name"], "Journal of Tests");
        assert_eq!(output["context"]["publisher"]["name"], "Publisher");
    }

    #[test]
    fn test_scalar_fragment_contributes_nothing() {
        let with_scalar = frame()
            .apply(&base(), &[json!("not a node")], FramingOptions::default())
            .unwrap();
        let without = frame().apply(&base(), &[], FramingOptions::default()).unwrap();

        assert_eq!(with_scalar, without);
    }

    #[test]
    fn test_cycle_does_not_recurse() {
        let frame = Frame::from_value(json!({
            "context": {"journal": {"publisher": {"journal": {}}}}
        }))
        .unwrap();
        let journal = json!({"id": JOURNAL, "publisher": {"id": PUBLISHER}});
        let publisher = json!({"id": PUBLISHER, "journal": {"id": JOURNAL}});

        let output = frame
            .apply(&base(), &[journal, publisher], FramingOptions::default())
            .unwrap();

        assert_eq!(
            output["context"]["journal"]["publisher"]["journal"],
            json!({"id": JOURNAL})
        );
    }

    #[test]
    fn test_prunes_blank_node_identifiers() {
        let base = json!({
            "id": "_:b0",
            "identifier": "r1",
            "context": {"id": "_:b1", "journal": {"id": JOURNAL}}
        });

        let pruned = frame().apply(&base, &[], FramingOptions::default()).unwrap();
        assert!(pruned.get("id").is_none());
        assert!(pruned["context"].get("id").is_none());
        assert_eq!(pruned["context"]["journal"]["id"], JOURNAL);

        let options = FramingOptions {
            prune_blank_node_identifiers: false,
            ..FramingOptions::default()
        };
        let kept = frame().apply(&base, &[], options).unwrap();
        assert_eq!(kept["id"], "_:b0");
    }

    #[test]
    fn test_graph_wrapper_when_not_omitted() {
        let options = FramingOptions {
            omit_graph: false,
            ..FramingOptions::default()
        };
        let output = frame().apply(&base(), &[], options).unwrap();

        assert!(output["@context"].is_object());
        assert_eq!(output["@graph"][0]["identifier"], "r1");
    }

    #[test]
    fn test_embed_never_keeps_reference() {
        let frame = Frame::from_value(json!({
            "context": {"journal": {"@embed": "@never"}}
        }))
        .unwrap();

        let output = frame
            .apply(&base(), &[journal()], FramingOptions::default())
            .unwrap();
        assert!(output["context"]["journal"].get("name").is_none());
    }

    #[test]
    fn test_default_value_for_missing_property() {
        let frame = Frame::from_value(json!({
            "abstract": {"@default": "@null"},
            "language": {"@default": "und"}
        }))
        .unwrap();

        let output = frame.apply(&base(), &[], FramingOptions::default()).unwrap();
        assert_eq!(output["abstract"], Value::Null);
        assert_eq!(output["language"], "und");
    }

    #[test]
    fn test_root_type_mismatch() {
        let frame = Frame::from_value(json!({"@type": "Publication"})).unwrap();

        let result = frame.apply(&base(), &[], FramingOptions::default());
        assert!(matches!(result, Err(FramingError::RootTypeMismatch { .. })));

        let mut typed = base();
        typed["type"] = json!("Publication");
        assert!(frame.apply(&typed, &[], FramingOptions::default()).is_ok());
    }

    #[test]
    fn test_invalid_base() {
        let result = frame().apply(&json!(["not", "an", "object"]), &[], FramingOptions::default());
        assert!(matches!(result, Err(FramingError::InvalidBase(_))));
    }

    #[test]
    fn test_invalid_frame() {
        assert!(matches!(
            Frame::from_json("[1, 2]"),
            Err(FramingError::InvalidFrame(_))
        ));
        assert!(matches!(
            Frame::from_json("{broken"),
            Err(FramingError::InvalidFrame(_))
        ));
        assert!(matches!(
            Frame::load("/nonexistent/frame.json"),
            Err(FramingError::InvalidFrame(_))
        ));
    }
}
