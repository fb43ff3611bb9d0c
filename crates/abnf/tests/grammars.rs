//! End-to-end tests: whole grammars in, trees out.

use abnf::{
    ast::{Node, RuleNode, Visitor},
    build::TreeBuilder,
    parse, parser, Context, Cursor, ErrorCode, NumberFlag,
};

/// The ABNF grammar of ABNF itself, RFC 5234 sections 4 and B.1.
const RFC5234_ABNF: &str = r#"; RFC 5234 - Augmented BNF for Syntax Specifications
; the grammar of ABNF expressed in itself

rulelist = 1*( rule / (*c-wsp c-nl) )
rule = rulename defined-as elements c-nl
rulename = ALPHA *(ALPHA / DIGIT / "-")
defined-as = *c-wsp ("=" / "=/") *c-wsp
elements = alternation *c-wsp
c-wsp = WSP / (c-nl WSP)
c-nl = comment / CRLF
comment = ";" *(WSP / VCHAR) CRLF
alternation = concatenation *(*c-wsp "/" *c-wsp concatenation)
concatenation = repetition *(1*c-wsp repetition)
repetition = [repeat] element
repeat = 1*DIGIT / (*DIGIT "*" *DIGIT)
element = rulename / group / option / char-val / num-val / prose-val
group = "(" *c-wsp alternation *c-wsp ")"
option = "[" *c-wsp alternation *c-wsp "]"
char-val = DQUOTE *(%x20-21 / %x23-7E) DQUOTE
num-val = "%" (bin-val / dec-val / hex-val)
bin-val = "b" 1*BIT [ 1*("." 1*BIT) / ("-" 1*BIT) ]
dec-val = "d" 1*DIGIT [ 1*("." 1*DIGIT) / ("-" 1*DIGIT) ]
hex-val = "x" 1*HEXDIG [ 1*("." 1*HEXDIG) / ("-" 1*HEXDIG) ]
prose-val = "<" *(%x20-3D / %x3F-7E) ">"

; core rules (appendix B.1)

ALPHA = %x41-5A / %x61-7A
BIT = "0" / "1"
CHAR = %x01-7F
CR = %x0D
CRLF = CR LF
CTL = %x00-1F / %x7F
DIGIT = %x30-39
DQUOTE = %x22
HEXDIG = DIGIT / "A" / "B" / "C" / "D" / "E" / "F"
HTAB = %x09
LF = %x0A
LWSP = *(WSP / CRLF WSP)
OCTET = %x00-FF
SP = %x20
VCHAR = %x21-7E
WSP = SP / HTAB
"#;

/// The JSON grammar of RFC 8259, collected from sections 2 through 8.
const RFC8259_JSON: &str = r#"; RFC 8259 - The JavaScript Object Notation (JSON) Data Interchange Format

JSON-text = ws value ws

begin-array = ws %x5B ws
begin-object = ws %x7B ws
end-array = ws %x5D ws
end-object = ws %x7D ws
name-separator = ws %x3A ws
value-separator = ws %x2C ws
ws = *( %x20 / %x09 / %x0A / %x0D )

value = false / null / true / object / array / number / string
false = %x66.61.6c.73.65
null = %x6e.75.6c.6c
true = %x74.72.75.65

object = begin-object [ member *( value-separator member ) ] end-object
member = string name-separator value
array = begin-array [ value *( value-separator value ) ] end-array

number = [ minus ] int [ frac ] [ exp ]
decimal-point = %x2E
digit1-9 = %x31-39
e = %x65 / %x45
exp = e [ minus / plus ] 1*DIGIT
frac = decimal-point 1*DIGIT
int = zero / ( digit1-9 *DIGIT )
minus = %x2D
plus = %x2B
zero = %x30

string = quotation-mark *char quotation-mark
char = unescaped / escape ( %x22 / %x5C / %x2F / %x62 / %x66 / %x6E / %x72 / %x74 / %x75 4HEXDIG )
escape = %x5C
quotation-mark = %x22
unescaped = %x20-21 / %x23-5B / %x5D-10FFFF
"#;

fn parse_ok(src: &str) -> abnf::SyntaxTree {
    let st = parse(src);
    assert!(st.error().is_none(), "{:?}", st.error());
    assert_eq!(st.consumed() as usize, src.len(), "incomplete parse");
    st
}

/// Visitor that flattens the traversal into comparable strings.
#[derive(Default)]
struct EventLog(Vec<String>);

impl Visitor for EventLog {
    fn begin_document(&mut self) {
        self.0.push("begin document".into());
    }
    fn end_document(&mut self) {
        self.0.push("end document".into());
    }
    fn begin_rule(&mut self, name: &str) {
        self.0.push(format!("begin rule {name}"));
    }
    fn end_rule(&mut self) {
        self.0.push("end rule".into());
    }
    fn begin_alternation(&mut self) {
        self.0.push("begin alternation".into());
    }
    fn end_alternation(&mut self) {
        self.0.push("end alternation".into());
    }
    fn begin_concatenation(&mut self) {
        self.0.push("begin concatenation".into());
    }
    fn end_concatenation(&mut self) {
        self.0.push("end concatenation".into());
    }
    fn begin_repetition(&mut self, min: u64, max: Option<u64>) {
        match max {
            Some(max) => self.0.push(format!("begin repetition {min} {max}")),
            None => self.0.push(format!("begin repetition {min} *")),
        }
    }
    fn end_repetition(&mut self) {
        self.0.push("end repetition".into());
    }
    fn begin_group(&mut self) {
        self.0.push("begin group".into());
    }
    fn end_group(&mut self) {
        self.0.push("end group".into());
    }
    fn begin_option(&mut self) {
        self.0.push("begin option".into());
    }
    fn end_option(&mut self) {
        self.0.push("end option".into());
    }
    fn rulename(&mut self, name: &str) {
        self.0.push(format!("rulename {name}"));
    }
    fn prose(&mut self, text: &str) {
        self.0.push(format!("prose {text}"));
    }
    fn quoted_string(&mut self, text: &str) {
        self.0.push(format!("quoted {text:?}"));
    }
    fn number(&mut self, _flag: NumberFlag, value: &str) {
        self.0.push(format!("number {value}"));
    }
    fn number_range(&mut self, _flag: NumberFlag, from: &str, to: &str) {
        self.0.push(format!("number range {from}-{to}"));
    }
}

/// Visitor that replays a traversal into a fresh [`TreeBuilder`], proving
/// that the callback stream carries everything the tree holds.
struct Rebuilder {
    builder: TreeBuilder,
    rule: Option<String>,
    pending_number: Option<NumberFlag>,
}

impl Rebuilder {
    fn new() -> Self {
        Self {
            builder: TreeBuilder::new(0),
            rule: None,
            pending_number: None,
        }
    }

    fn flush_number(&mut self) {
        if let Some(flag) = self.pending_number.take() {
            self.builder.last_number(flag, "");
        }
    }
}

impl Visitor for Rebuilder {
    fn begin_document(&mut self) {
        self.builder.begin_document();
    }
    fn end_document(&mut self) {
        self.builder.end_document(true);
    }
    fn begin_rule(&mut self, name: &str) {
        self.rule = Some(name.to_owned());
        self.builder.begin_rule(name, false, 0);
    }
    fn end_rule(&mut self) {
        let name = self.rule.take().expect("end_rule without begin_rule");
        self.builder.end_rule(&name, false, true);
    }
    fn begin_alternation(&mut self) {
        self.builder.begin_alternation();
    }
    fn end_alternation(&mut self) {
        self.builder.end_alternation(true);
    }
    fn begin_concatenation(&mut self) {
        self.builder.begin_concatenation();
    }
    fn end_concatenation(&mut self) {
        self.builder.end_concatenation(true);
    }
    fn begin_repetition(&mut self, min: u64, max: Option<u64>) {
        self.builder.begin_repetition();
        self.builder.repeat(min, max);
    }
    fn end_repetition(&mut self) {
        self.flush_number();
        self.builder.end_repetition(true);
    }
    fn begin_group(&mut self) {
        self.builder.begin_group();
    }
    fn end_group(&mut self) {
        self.builder.end_group(true);
    }
    fn begin_option(&mut self) {
        self.builder.begin_option();
    }
    fn end_option(&mut self) {
        self.builder.end_option(true);
    }
    fn rulename(&mut self, name: &str) {
        self.builder.rulename(name);
    }
    fn prose(&mut self, text: &str) {
        self.builder.prose(text);
    }
    fn quoted_string(&mut self, text: &str) {
        self.builder.quoted_string(text);
    }
    fn number(&mut self, flag: NumberFlag, value: &str) {
        if self.pending_number.is_some() {
            self.builder.next_number(flag, value);
        } else {
            self.pending_number = Some(flag);
            self.builder.first_number(flag, value);
        }
    }
    fn number_range(&mut self, flag: NumberFlag, from: &str, to: &str) {
        self.builder.first_number(flag, from);
        self.builder.last_number(flag, to);
    }
}

#[test]
fn whitespace_and_comments_only() {
    let st = parse_ok(" ;c\n\n");
    assert_eq!(st.rules_count(), 0);
}

#[test]
fn single_rule_event_sequence() {
    let st = parse_ok("WSP = \" \" / \"\t\" ; white space\n");
    assert_eq!(st.rules_count(), 1);

    let mut log = EventLog::default();
    st.traverse(&mut log);
    assert_eq!(
        log.0,
        [
            "begin document",
            "begin rule WSP",
            "begin alternation",
            "begin concatenation",
            "begin repetition 1 1",
            "quoted \" \"",
            "end repetition",
            "end concatenation",
            "begin concatenation",
            "begin repetition 1 1",
            "quoted \"\\t\"",
            "end repetition",
            "end concatenation",
            "end alternation",
            "end rule",
            "end document",
        ]
    );
}

#[test]
fn option_group_and_reference() {
    let src = "repetition = [repeat] element\nrepeat = \"x\"\nelement = \"y\"\n";
    let st = parse_ok(src);
    assert_eq!(st.rules_count(), 3);

    let rule = st.root().unwrap().get("repetition").unwrap();
    let [Node::Alternation(concats)] = rule.alternations() else {
        panic!("expected one alternation");
    };
    let [Node::Concatenation(reps)] = concats.as_slice() else {
        panic!("expected one concatenation");
    };
    let [Node::Repetition(first), Node::Repetition(second)] = reps.as_slice() else {
        panic!("expected two repetitions, got {reps:?}");
    };

    // the option wraps an alternation around the `repeat` reference
    let Some(Node::Optional(alts)) = first.element() else {
        panic!("expected an option element");
    };
    let [Node::Alternation(inner)] = alts.as_slice() else {
        panic!("expected one inner alternation");
    };
    let [Node::Concatenation(inner_reps)] = inner.as_slice() else {
        panic!("expected one inner concatenation");
    };
    let [Node::Repetition(inner_rep)] = inner_reps.as_slice() else {
        panic!("expected one inner repetition");
    };
    assert_eq!(
        inner_rep.element(),
        Some(&Node::Rulename("repeat".to_owned()))
    );

    assert_eq!(
        second.element(),
        Some(&Node::Rulename("element".to_owned()))
    );
}

#[test]
fn incremental_alternatives_compose_in_order() {
    let st = parse_ok("R = \"a\"\nR =/ \"b\"\n");
    assert_eq!(st.rules_count(), 1);

    let mut log = EventLog::default();
    st.traverse(&mut log);
    assert_eq!(
        log.0,
        [
            "begin document",
            "begin rule R",
            "begin alternation",
            "begin concatenation",
            "begin repetition 1 1",
            "quoted \"a\"",
            "end repetition",
            "end concatenation",
            "begin concatenation",
            "begin repetition 1 1",
            "quoted \"b\"",
            "end repetition",
            "end concatenation",
            "end alternation",
            "end rule",
            "end document",
        ]
    );
}

#[test]
fn duplicate_rulename_is_reported_on_its_line() {
    let st = parse("R = \"a\"\nR = \"b\"\n");
    let err = st.error().expect("expected an error");
    assert_eq!(err.code, ErrorCode::RulenameDuplicated);
    assert_eq!(err.line, 2);
}

#[test]
fn incremental_without_base_is_reported() {
    let st = parse("R =/ \"a\"\n");
    let err = st.error().expect("expected an error");
    assert_eq!(err.code, ErrorCode::RuleUndefined);
    assert_eq!(err.line, 1);
}

#[test]
fn malformed_range_is_a_clean_non_match() {
    let st = parse("R = %b1-\n");
    assert!(st.error().is_none());
    assert_eq!(st.rules_count(), 0);
    assert_eq!(st.consumed(), 0);
}

#[test]
fn junk_after_valid_prefix_is_incomplete() {
    let src = "a = b\n???\n";
    let st = parse(src);
    assert!(st.error().is_none());
    assert_eq!(st.rules_count(), 1);
    assert!((st.consumed() as usize) < src.len());
}

#[test]
fn rfc5234_self_description() {
    let st = parse_ok(RFC5234_ABNF);
    assert_eq!(st.rules_count(), 37);
}

#[test]
fn rfc8259_json_grammar() {
    let st = parse_ok(RFC8259_JSON);
    assert_eq!(st.rules_count(), 30);
}

#[test]
fn rulelist_names_are_unique() {
    for src in [RFC5234_ABNF, RFC8259_JSON] {
        let st = parse_ok(src);
        let root = st.root().unwrap();
        let mut names: Vec<_> = root.iter().map(|(name, _)| name.to_owned()).collect();
        let before = names.len();
        names.dedup();
        assert_eq!(names.len(), before);
    }
}

#[test]
fn traversal_is_idempotent() {
    let st = parse_ok(RFC5234_ABNF);
    let mut first = EventLog::default();
    let mut second = EventLog::default();
    st.traverse(&mut first);
    st.traverse(&mut second);
    assert_eq!(first.0, second.0);
}

#[test]
fn traversal_round_trips_through_the_builder() {
    for src in [
        RFC5234_ABNF,
        RFC8259_JSON,
        "R = \"a\"\nR =/ %x41-5A\n",
        "seq = %b0.1.11 <prose> [\"opt\"] 2*4(a / b)\n",
    ] {
        let st = parse_ok(src);

        let mut rebuilder = Rebuilder::new();
        st.traverse(&mut rebuilder);
        let rebuilt = rebuilder.builder.finish(st.consumed());

        assert_eq!(st.root(), rebuilt.root(), "round trip differs for {src:?}");
    }
}

#[test]
fn combinators_do_not_move_on_failure() {
    // (combinator, input that must not match)
    let cases: &[(fn(&mut Cursor, &mut TreeBuilder) -> bool, &str)] = &[
        (parser::prose, "‹no›"),
        (parser::prose, "<unterminated"),
        (parser::number, "%q12"),
        (parser::number, "%b1-"),
        (parser::rulename, "1name"),
        (parser::comment, "no comment"),
        (parser::c_nl, "x"),
        (parser::c_wsp, "\nx"),
        (parser::element, "=x"),
        (parser::repetition, "3*"),
        (parser::concatenation, "/a"),
        (parser::alternation, "/a"),
        (parser::group, "(a"),
        (parser::option, "[a"),
        (parser::rule, "name == x\n"),
        (parser::rule, "name = x"),
    ];

    for &(combinator, input) in cases {
        let mut s = Cursor::new(input);
        let mut cx = TreeBuilder::new(0);
        cx.begin_document();
        assert!(!combinator(&mut s, &mut cx), "{input:?}");
        assert_eq!(s.pos(), 0, "{input:?}");
    }
}

#[test]
fn star_repeat_with_no_digits() {
    let st = parse_ok("r = *name\n");
    let mut log = EventLog::default();
    st.traverse(&mut log);
    assert!(log.0.contains(&"begin repetition 0 *".to_owned()));
}

#[test]
fn comment_without_trailing_newline() {
    let st = parse_ok("a = b\n; trailing");
    assert_eq!(st.rules_count(), 1);
}

#[test]
fn empty_quoted_string() {
    let st = parse_ok("empty = \"\"\n");
    let rule = st.root().unwrap().get("empty").unwrap();
    let mut log = EventLog::default();
    rule.traverse(&mut log);
    assert!(log.0.contains(&"quoted \"\"".to_owned()));
}

#[test]
fn prose_reaches_the_tree() {
    let st = parse_ok("hint = <informal description>\n");
    let mut log = EventLog::default();
    st.traverse(&mut log);
    assert!(log.0.contains(&"prose informal description".to_owned()));
}

fn collect_references(rule: &RuleNode) -> Vec<String> {
    struct Refs(Vec<String>);
    impl Visitor for Refs {
        fn rulename(&mut self, name: &str) {
            self.0.push(name.to_owned());
        }
    }
    let mut refs = Refs(Vec::new());
    rule.traverse(&mut refs);
    refs.0
}

#[test]
fn references_are_symbolic() {
    // a self-referential rule parses fine; the tree stores the name only
    let st = parse_ok("loop = \"x\" loop\n");
    let rule = st.root().unwrap().get("loop").unwrap();
    assert_eq!(collect_references(rule), ["loop"]);
}
