//! Typed syntax tree for a parsed grammar.
//!
//! Ownership is a tree: every aggregate owns its children exclusively, and
//! rules refer to each other by name only, so the structure is acyclic no
//! matter how recursive the grammar itself is.

use std::collections::BTreeMap;

use crate::NumberFlag;

/// One node of a rule body.
#[derive(Debug, PartialEq)]
pub enum Node {
    Prose(String),
    Number(NumberNode),
    QuotedString(String),
    Rulename(String),
    Repetition(RepetitionNode),
    /// `( ... )`; children are alternations.
    Group(Vec<Node>),
    /// `[ ... ]`; children are alternations.
    Optional(Vec<Node>),
    /// Children are repetitions.
    Concatenation(Vec<Node>),
    /// Children are concatenations.
    Alternation(Vec<Node>),
    Rule(RuleNode),
}

impl Node {
    pub fn traverse<V: Visitor>(&self, vis: &mut V) {
        match self {
            Node::Prose(text) => vis.prose(text),
            Node::QuotedString(text) => vis.quoted_string(text),
            Node::Rulename(name) => vis.rulename(name),
            Node::Number(num) => {
                if num.is_range() {
                    vis.number_range(num.flag(), &num.values()[0], &num.values()[1]);
                } else {
                    for value in num.values() {
                        vis.number(num.flag(), value);
                    }
                }
            }
            Node::Repetition(rep) => {
                vis.begin_repetition(rep.min(), rep.max());
                if let Some(element) = rep.element() {
                    element.traverse(vis);
                }
                vis.end_repetition();
            }
            Node::Group(children) => {
                vis.begin_group();
                for child in children {
                    child.traverse(vis);
                }
                vis.end_group();
            }
            Node::Optional(children) => {
                vis.begin_option();
                for child in children {
                    child.traverse(vis);
                }
                vis.end_option();
            }
            Node::Concatenation(children) => {
                vis.begin_concatenation();
                for child in children {
                    child.traverse(vis);
                }
                vis.end_concatenation();
            }
            Node::Alternation(children) => {
                vis.begin_alternation();
                for child in children {
                    child.traverse(vis);
                }
                vis.end_alternation();
            }
            Node::Rule(rule) => rule.traverse(vis),
        }
    }
}

/// A `%`-prefixed numeric value: either a `.`-separated sequence of literal
/// values or a two-value range. Once a range is set no more values may be
/// appended.
#[derive(Debug, PartialEq)]
pub struct NumberNode {
    flag: NumberFlag,
    range: bool,
    values: Vec<String>,
}

impl NumberNode {
    pub fn new(flag: NumberFlag) -> Self {
        Self {
            flag,
            range: false,
            values: Vec::new(),
        }
    }

    pub fn flag(&self) -> NumberFlag {
        self.flag
    }

    pub fn is_range(&self) -> bool {
        self.range
    }

    /// Two values for a range, one or more for a sequence.
    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub(crate) fn set_first(&mut self, text: &str) {
        assert!(self.values.is_empty());
        self.values.push(text.to_owned());
    }

    pub(crate) fn set_last(&mut self, text: &str) {
        assert_eq!(self.values.len(), 1);
        self.range = true;
        self.values.push(text.to_owned());
    }

    pub(crate) fn push_next(&mut self, text: &str) {
        assert!(!self.values.is_empty());
        assert!(!self.range);
        self.values.push(text.to_owned());
    }
}

/// A repetition slot: repeat bounds plus exactly one inner element. The
/// bounds default to `(1, 1)` when no repeat prefix was present; a `max` of
/// `None` means no upper limit.
#[derive(Debug, PartialEq)]
pub struct RepetitionNode {
    min: u64,
    max: Option<u64>,
    element: Option<Box<Node>>,
}

impl Default for RepetitionNode {
    fn default() -> Self {
        Self {
            min: 1,
            max: Some(1),
            element: None,
        }
    }
}

impl RepetitionNode {
    pub fn min(&self) -> u64 {
        self.min
    }

    pub fn max(&self) -> Option<u64> {
        self.max
    }

    /// `None` only while the node is still under construction.
    pub fn element(&self) -> Option<&Node> {
        self.element.as_deref()
    }

    pub(crate) fn set_bounds(&mut self, min: u64, max: Option<u64>) {
        self.min = min;
        self.max = max;
    }

    pub(crate) fn set_element(&mut self, element: Node) {
        self.element = Some(Box::new(element));
    }
}

/// A named rule; the body is its list of alternations (a single one after
/// incremental definitions are folded in).
#[derive(Debug, PartialEq)]
pub struct RuleNode {
    name: String,
    pub(crate) alternations: Vec<Node>,
}

impl RuleNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alternations: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alternations(&self) -> &[Node] {
        &self.alternations
    }

    pub fn traverse<V: Visitor>(&self, vis: &mut V) {
        vis.begin_rule(&self.name);
        for alternation in &self.alternations {
            alternation.traverse(vis);
        }
        vis.end_rule();
    }
}

/// The top-level container: each rule name occurs at most once. Iteration
/// and traversal are name-ordered and therefore deterministic.
#[derive(Debug, Default, PartialEq)]
pub struct RulelistNode {
    rules: BTreeMap<String, RuleNode>,
}

impl RulelistNode {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&RuleNode> {
        self.rules.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RuleNode)> {
        self.rules.iter().map(|(name, rule)| (name.as_str(), rule))
    }

    pub(crate) fn emplace(&mut self, name: &str, rule: RuleNode) {
        self.rules.insert(name.to_owned(), rule);
    }

    /// Takes a rule out of the list, for incremental redefinition. The rule
    /// stays out if the redefinition fails.
    pub(crate) fn extract(&mut self, name: &str) -> Option<RuleNode> {
        self.rules.remove(name)
    }

    /// Depth-first, name-ordered walk over the whole grammar. The callback
    /// shape mirrors the parse event protocol.
    pub fn traverse<V: Visitor>(&self, vis: &mut V) {
        vis.begin_document();
        for rule in self.rules.values() {
            rule.traverse(vis);
        }
        vis.end_document();
    }
}

/// Read-only visitor over a finished tree. Unlike the parse-time context,
/// traversal cannot fail, so nothing returns a continue flag.
///
/// `begin_repetition` carries the repeat bounds and the number callbacks
/// carry the base flag; a context fed from a traversal can rebuild an equal
/// tree.
pub trait Visitor {
    fn begin_document(&mut self) {}
    fn end_document(&mut self) {}

    fn begin_rule(&mut self, _name: &str) {}
    fn end_rule(&mut self) {}

    fn begin_alternation(&mut self) {}
    fn end_alternation(&mut self) {}

    fn begin_concatenation(&mut self) {}
    fn end_concatenation(&mut self) {}

    fn begin_repetition(&mut self, _min: u64, _max: Option<u64>) {}
    fn end_repetition(&mut self) {}

    fn begin_group(&mut self) {}
    fn end_group(&mut self) {}

    fn begin_option(&mut self) {}
    fn end_option(&mut self) {}

    fn rulename(&mut self, _name: &str) {}
    fn prose(&mut self, _text: &str) {}
    fn quoted_string(&mut self, _text: &str) {}

    fn number(&mut self, _flag: NumberFlag, _value: &str) {}
    fn number_range(&mut self, _flag: NumberFlag, _from: &str, _to: &str) {}
}
