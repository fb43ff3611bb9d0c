//! Assembles parse events into a [`SyntaxTree`].
//!
//! [`TreeBuilder`] keeps a LIFO stack of in-construction nodes. The
//! combinator layer guarantees properly nested begin/end events, so each
//! handler pattern-matches the stack top against the node type its
//! production expects; a mismatch means the engine and the builder disagree
//! and is a hard panic, not a recoverable error.

use crate::{
    ast::{Node, NumberNode, RepetitionNode, RuleNode, RulelistNode, Visitor},
    parser, Context, Cursor, ErrorCode, NumberFlag, SyntaxError,
};

/// Parses a whole grammar with no quoted-string length limit.
pub fn parse(src: &str) -> SyntaxTree {
    parse_with_limit(src, 0)
}

/// Parses a whole grammar. `max_quoted_string_length` bounds the interior of
/// quoted literals; zero disables the check.
pub fn parse_with_limit(src: &str, max_quoted_string_length: usize) -> SyntaxTree {
    let mut builder = TreeBuilder::new(max_quoted_string_length);
    let mut s = Cursor::new(src);
    parser::rulelist(&mut s, &mut builder);
    builder.finish(s.pos())
}

/// Result of a parse: the rule tree, the recorded error if any, and how far
/// into the source the engine got.
///
/// A parse can fail two ways: with an error code, or silently by stopping
/// early — check [`error`](Self::error) first, then compare
/// [`consumed`](Self::consumed) against the source length to detect trailing
/// junk after a valid prefix.
#[derive(Debug)]
pub struct SyntaxTree {
    root: Option<RulelistNode>,
    error: Option<SyntaxError>,
    consumed: u32,
}

impl SyntaxTree {
    pub fn error(&self) -> Option<&SyntaxError> {
        self.error.as_ref()
    }

    /// Byte offset one past the last consumed character.
    pub fn consumed(&self) -> u32 {
        self.consumed
    }

    pub fn rules_count(&self) -> usize {
        self.root.as_ref().map_or(0, RulelistNode::len)
    }

    pub fn root(&self) -> Option<&RulelistNode> {
        self.root.as_ref()
    }

    pub fn into_root(self) -> Option<RulelistNode> {
        self.root
    }

    pub fn traverse<V: Visitor>(&self, vis: &mut V) {
        if let Some(root) = &self.root {
            root.traverse(vis);
        }
    }
}

/// Context implementation that builds the syntax tree.
pub struct TreeBuilder {
    max_quoted_string_length: usize,
    stack: Vec<Node>,
    rulelist: Option<RulelistNode>,
    root: Option<RulelistNode>,
    error: Option<SyntaxError>,
}

impl TreeBuilder {
    pub fn new(max_quoted_string_length: usize) -> Self {
        Self {
            max_quoted_string_length,
            stack: Vec::new(),
            rulelist: None,
            root: None,
            error: None,
        }
    }

    pub fn finish(self, consumed: u32) -> SyntaxTree {
        SyntaxTree {
            root: self.root,
            error: self.error,
            consumed,
        }
    }

    fn rulelist_mut(&mut self) -> &mut RulelistNode {
        match &mut self.rulelist {
            Some(rulelist) => rulelist,
            None => unreachable!("begin_document did not run"),
        }
    }

    fn top_repetition(&mut self) -> &mut RepetitionNode {
        match self.stack.last_mut() {
            Some(Node::Repetition(rep)) => rep,
            _ => unreachable!("repetition expected on top of the stack"),
        }
    }

    fn top_number(&mut self) -> &mut NumberNode {
        match self.stack.last_mut() {
            Some(Node::Number(num)) => num,
            _ => unreachable!("number expected on top of the stack"),
        }
    }

    /// Pops the finished node and, on success, attaches it as a child of
    /// the aggregate now on top.
    fn end_aggregate_component(&mut self, success: bool) -> bool {
        let node = self.stack.pop().expect("empty construction stack");
        if success {
            match self.stack.last_mut() {
                Some(Node::Rule(rule)) => rule.alternations.push(node),
                Some(
                    Node::Group(children)
                    | Node::Optional(children)
                    | Node::Concatenation(children)
                    | Node::Alternation(children),
                ) => children.push(node),
                _ => unreachable!("aggregate expected below the closed node"),
            }
        }
        success
    }

    /// Pops a finished group or option and, on success, makes it the inner
    /// element of the repetition below.
    fn end_element(&mut self, success: bool) -> bool {
        let node = self.stack.pop().expect("empty construction stack");
        if success {
            self.top_repetition().set_element(node);
        }
        success
    }
}

impl Context for TreeBuilder {
    fn max_quoted_string_length(&self) -> usize {
        self.max_quoted_string_length
    }

    fn error(&mut self, code: ErrorCode, line: u32) {
        self.error = Some(SyntaxError::new(code, line));
    }

    fn begin_document(&mut self) -> bool {
        self.rulelist = Some(RulelistNode::default());
        true
    }

    fn end_document(&mut self, success: bool) -> bool {
        assert!(self.stack.is_empty());
        self.root = self.rulelist.take();
        success
    }

    fn begin_rule(&mut self, name: &str, incremental: bool, line: u32) -> bool {
        if incremental {
            // continue an existing rule: take it out, accumulate onto it
            match self.rulelist_mut().extract(name) {
                Some(rule) => {
                    self.stack.push(Node::Rule(rule));
                    true
                }
                None => {
                    self.error =
                        Some(SyntaxError::with_detail(ErrorCode::RuleUndefined, line, name));
                    false
                }
            }
        } else if self.rulelist_mut().contains(name) {
            self.error = Some(SyntaxError::with_detail(
                ErrorCode::RulenameDuplicated,
                line,
                name,
            ));
            false
        } else {
            self.stack.push(Node::Rule(RuleNode::new(name)));
            true
        }
    }

    fn end_rule(&mut self, name: &str, incremental: bool, success: bool) -> bool {
        let Some(Node::Rule(mut rule)) = self.stack.pop() else {
            unreachable!("rule expected on top of the stack");
        };
        if success {
            if incremental {
                // fold the freshly parsed alternatives into the original
                // alternation, in definition order
                let Some(Node::Alternation(extra)) = rule.alternations.pop() else {
                    unreachable!("incremental rule without a new alternation");
                };
                match rule.alternations.first_mut() {
                    Some(Node::Alternation(first)) => first.extend(extra),
                    _ => unreachable!("rule body is not an alternation"),
                }
            }
            self.rulelist_mut().emplace(name, rule);
        }
        success
    }

    fn begin_alternation(&mut self) -> bool {
        self.stack.push(Node::Alternation(Vec::new()));
        true
    }

    fn end_alternation(&mut self, success: bool) -> bool {
        self.end_aggregate_component(success)
    }

    fn begin_concatenation(&mut self) -> bool {
        self.stack.push(Node::Concatenation(Vec::new()));
        true
    }

    fn end_concatenation(&mut self, success: bool) -> bool {
        self.end_aggregate_component(success)
    }

    fn begin_repetition(&mut self) -> bool {
        self.stack.push(Node::Repetition(RepetitionNode::default()));
        true
    }

    fn end_repetition(&mut self, success: bool) -> bool {
        self.end_aggregate_component(success)
    }

    fn repeat(&mut self, min: u64, max: Option<u64>) -> bool {
        self.top_repetition().set_bounds(min, max);
        true
    }

    fn begin_group(&mut self) -> bool {
        self.stack.push(Node::Group(Vec::new()));
        true
    }

    fn end_group(&mut self, success: bool) -> bool {
        self.end_element(success)
    }

    fn begin_option(&mut self) -> bool {
        self.stack.push(Node::Optional(Vec::new()));
        true
    }

    fn end_option(&mut self, success: bool) -> bool {
        self.end_element(success)
    }

    fn rulename(&mut self, name: &str) -> bool {
        self.top_repetition()
            .set_element(Node::Rulename(name.to_owned()));
        true
    }

    fn prose(&mut self, text: &str) -> bool {
        self.top_repetition()
            .set_element(Node::Prose(text.to_owned()));
        true
    }

    fn quoted_string(&mut self, text: &str) -> bool {
        self.top_repetition()
            .set_element(Node::QuotedString(text.to_owned()));
        true
    }

    fn first_number(&mut self, flag: NumberFlag, text: &str) -> bool {
        let mut num = NumberNode::new(flag);
        num.set_first(text);
        self.stack.push(Node::Number(num));
        true
    }

    fn next_number(&mut self, _flag: NumberFlag, text: &str) -> bool {
        self.top_number().push_next(text);
        true
    }

    fn last_number(&mut self, _flag: NumberFlag, text: &str) -> bool {
        // a non-empty text closes a range; an empty one just ends the value
        if !text.is_empty() {
            self.top_number().set_last(text);
        }
        let Some(number @ Node::Number(_)) = self.stack.pop() else {
            unreachable!("number expected on top of the stack");
        };
        self.top_repetition().set_element(number);
        true
    }
}
