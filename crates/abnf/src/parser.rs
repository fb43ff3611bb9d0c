//! Recursive-descent combinators, one per ABNF production.
//!
//! Every combinator has the same shape: attempt to match its production at
//! the current cursor position, advance and return `true` on a match,
//! restore the position and return `false` otherwise. Failure without a
//! reported error emits no unpaired callback, which is what makes the
//! ordered disjunction in [`element`] work.

use crate::{
    advance_newline, advance_repeated, advance_run, is_alpha, is_bit, is_cr, is_digit, is_dquote,
    is_hexdigit, is_htab, is_lf, is_prose_char, is_quoted_char, is_wsp, Context, Cursor, ErrorCode,
    NumberFlag, Span,
};

/// `prose-val = "<" *(%x20-3D / %x3F-7E) ">"`
pub fn prose<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    if !s.consume(b'<') {
        return false;
    }
    let body = s.consume_while(is_prose_char);
    if !s.consume(b'>') {
        s.restore(start);
        return false;
    }
    if !cx.prose(s.str(body)) {
        s.restore(start);
        return false;
    }
    true
}

/// `num-val = "%" (bin-val / dec-val / hex-val)` where each sub-form is
/// `1*DIGIT [ 1*("." 1*DIGIT) / ("-" 1*DIGIT) ]` over the base's digits.
///
/// The whole shape is scanned before any callback fires, so a half-matched
/// number (`%b1-`) is a clean non-match with no dangling events.
pub fn number<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    if !s.consume(b'%') {
        return false;
    }
    let (flag, class): (NumberFlag, fn(u8) -> bool) = match s.peek() {
        Some(b'b') => (NumberFlag::Binary, is_bit),
        Some(b'd') => (NumberFlag::Decimal, is_digit),
        Some(b'x') => (NumberFlag::Hexadecimal, is_hexdigit),
        _ => {
            s.restore(start);
            return false;
        }
    };
    s.next();

    let first = advance_run(s, class);
    if first.is_empty() {
        s.restore(start);
        return false;
    }

    enum Tail {
        Atom,
        Range(Span),
        Sequence(Vec<Span>),
    }

    let tail = match s.peek() {
        Some(b'-') => {
            s.next();
            let last = advance_run(s, class);
            if last.is_empty() {
                s.restore(start);
                return false;
            }
            Tail::Range(last)
        }
        Some(b'.') => {
            let mut values = Vec::new();
            while s.peek() == Some(b'.') {
                s.next();
                let value = advance_run(s, class);
                if value.is_empty() {
                    s.restore(start);
                    return false;
                }
                values.push(value);
            }
            Tail::Sequence(values)
        }
        _ => Tail::Atom,
    };

    let ok = match tail {
        Tail::Atom => cx.first_number(flag, s.str(first)) && cx.last_number(flag, ""),
        Tail::Range(last) => {
            cx.first_number(flag, s.str(first)) && cx.last_number(flag, s.str(last))
        }
        Tail::Sequence(values) => {
            cx.first_number(flag, s.str(first))
                && values.iter().all(|v| cx.next_number(flag, s.str(*v)))
                && cx.last_number(flag, "")
        }
    };
    if !ok {
        s.restore(start);
        return false;
    }
    true
}

/// `char-val = DQUOTE *(%x20-21 / %x23-7E) DQUOTE`, HTAB tolerated inside
/// the quotes.
///
/// Reports `unbalanced_quote` when the input ends before the closing quote,
/// `bad_quoted_char` on any other forbidden character, and
/// `max_length_exceeded` once the interior outgrows the context's limit.
pub fn quoted_string<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    if !s.consume_if(is_dquote) {
        return false;
    }
    let max = cx.max_quoted_string_length();
    let body_start = s.pos();
    loop {
        match s.peek() {
            None => {
                cx.error(ErrorCode::UnbalancedQuote, s.line());
                s.restore(start);
                return false;
            }
            Some(b'"') => break,
            Some(b) if is_quoted_char(b) || is_htab(b) => {
                s.next();
            }
            Some(_) => {
                cx.error(ErrorCode::BadQuotedChar, s.line());
                s.restore(start);
                return false;
            }
        }
        if max != 0 && (s.pos() - body_start) as usize > max {
            cx.error(ErrorCode::MaxLengthExceeded, s.line());
            s.restore(start);
            return false;
        }
    }
    let body = s.span_since(body_start);
    s.next(); // closing quote
    if !cx.quoted_string(s.str(body)) {
        s.restore(start);
        return false;
    }
    true
}

/// Folds a run of decimal digits, clamping instead of overflowing.
fn digits_value(text: &str) -> u64 {
    text.bytes()
        .fold(0u64, |n, d| n.saturating_mul(10).saturating_add((d - b'0') as u64))
}

/// `repeat = 1*DIGIT / (*DIGIT "*" *DIGIT)`
///
/// A missing lower bound defaults to 0, a missing upper bound to "no
/// limit"; a bare count `N` means exactly `(N, N)`. A lower bound above the
/// upper bound reports `bad_repeat_range` and fails.
pub fn repeat<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    let line = s.line();
    let lower = advance_run(s, is_digit);
    if s.consume(b'*') {
        let upper = advance_run(s, is_digit);
        let min = if lower.is_empty() {
            0
        } else {
            digits_value(s.str(lower))
        };
        let max = if upper.is_empty() {
            None
        } else {
            Some(digits_value(s.str(upper)))
        };
        if max.is_some_and(|m| min > m) {
            cx.error(ErrorCode::BadRepeatRange, line);
            s.restore(start);
            return false;
        }
        if !cx.repeat(min, max) {
            s.restore(start);
            return false;
        }
        true
    } else {
        if lower.is_empty() {
            return false;
        }
        let exact = digits_value(s.str(lower));
        if !cx.repeat(exact, Some(exact)) {
            s.restore(start);
            return false;
        }
        true
    }
}

/// `comment = ";" *<any non-CR non-LF> CRLF`, relaxed from the RFC in two
/// ways: the interior accepts any character that is not a line terminator,
/// and end-of-input is accepted in place of the terminator.
pub fn comment<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    if !s.consume(b';') {
        return false;
    }
    let body = s.consume_while(|b| !is_cr(b) && !is_lf(b));
    if !s.is_empty() {
        advance_newline(s);
    }
    if !cx.comment(s.str(body)) {
        s.restore(start);
        return false;
    }
    true
}

/// `c-nl = comment / CRLF`
pub fn c_nl<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    comment(s, cx) || advance_newline(s)
}

/// `c-wsp = WSP / (c-nl WSP)`
pub fn c_wsp<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    if s.consume_if(is_wsp) {
        return true;
    }
    let start = s.checkpoint();
    if c_nl(s, cx) && s.consume_if(is_wsp) {
        return true;
    }
    s.restore(start);
    false
}

fn skip_c_wsp<C: Context>(s: &mut Cursor, cx: &mut C) {
    advance_repeated(s, 0, None, |s| c_wsp(s, cx));
}

/// `rulename = ALPHA *(ALPHA / DIGIT / "-")`, without firing the rulename
/// callback. Shared between [`rulename`] elements and [`rule`] headers.
fn rulename_span(s: &mut Cursor) -> Option<Span> {
    if !matches!(s.peek(), Some(b) if is_alpha(b)) {
        return None;
    }
    let start = s.pos();
    s.next();
    s.consume_while(|b| is_alpha(b) || is_digit(b) || b == b'-');
    Some(s.span_since(start))
}

/// A rule reference in element position.
pub fn rulename<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    let Some(span) = rulename_span(s) else {
        return false;
    };
    if !cx.rulename(s.str(span)) {
        s.restore(start);
        return false;
    }
    true
}

/// `element = rulename / group / option / num-val / char-val / prose-val`
///
/// First combinator to make progress wins; every branch is non-destructive
/// on failure, so the order is the whole tie-break.
pub fn element<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    rulename(s, cx)
        || group(s, cx)
        || option(s, cx)
        || number(s, cx)
        || quoted_string(s, cx)
        || prose(s, cx)
}

/// `repetition = [repeat] element`
pub fn repetition<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    if !cx.begin_repetition() {
        return false;
    }
    let _ = repeat(s, cx);
    let ok = element(s, cx);
    if !cx.end_repetition(ok) || !ok {
        s.restore(start);
        return false;
    }
    true
}

/// `concatenation = repetition *(1*c-wsp repetition)`
pub fn concatenation<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    if !cx.begin_concatenation() {
        return false;
    }
    let ok = repetition(s, cx);
    if ok {
        loop {
            let mark = s.checkpoint();
            if !advance_repeated(s, 1, None, |s| c_wsp(s, cx)) {
                break;
            }
            if !repetition(s, cx) {
                s.restore(mark);
                break;
            }
        }
    }
    if !cx.end_concatenation(ok) || !ok {
        s.restore(start);
        return false;
    }
    true
}

/// `alternation = concatenation *(*c-wsp "/" *c-wsp concatenation)`
pub fn alternation<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    if !cx.begin_alternation() {
        return false;
    }
    let ok = concatenation(s, cx);
    if ok {
        loop {
            let mark = s.checkpoint();
            skip_c_wsp(s, cx);
            if !s.consume(b'/') {
                s.restore(mark);
                break;
            }
            skip_c_wsp(s, cx);
            if !concatenation(s, cx) {
                s.restore(mark);
                break;
            }
        }
    }
    if !cx.end_alternation(ok) || !ok {
        s.restore(start);
        return false;
    }
    true
}

/// `group = "(" *c-wsp alternation *c-wsp ")"`
pub fn group<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    if !s.consume(b'(') {
        return false;
    }
    if !cx.begin_group() {
        s.restore(start);
        return false;
    }
    skip_c_wsp(s, cx);
    let mut ok = alternation(s, cx);
    if ok {
        skip_c_wsp(s, cx);
        ok = s.consume(b')');
    }
    if !cx.end_group(ok) || !ok {
        s.restore(start);
        return false;
    }
    true
}

/// `option = "[" *c-wsp alternation *c-wsp "]"`
pub fn option<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    if !s.consume(b'[') {
        return false;
    }
    if !cx.begin_option() {
        s.restore(start);
        return false;
    }
    skip_c_wsp(s, cx);
    let mut ok = alternation(s, cx);
    if ok {
        skip_c_wsp(s, cx);
        ok = s.consume(b']');
    }
    if !cx.end_option(ok) || !ok {
        s.restore(start);
        return false;
    }
    true
}

/// `defined-as = *c-wsp ("=" / "=/") *c-wsp`
///
/// Returns whether the definition is an incremental alternative (`=/`), or
/// `None` on a non-match.
pub fn defined_as<C: Context>(s: &mut Cursor, cx: &mut C) -> Option<bool> {
    let start = s.checkpoint();
    skip_c_wsp(s, cx);
    if !s.consume(b'=') {
        s.restore(start);
        return None;
    }
    let incremental = s.consume(b'/');
    skip_c_wsp(s, cx);
    Some(incremental)
}

/// `elements = alternation *c-wsp`
pub fn elements<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    if !alternation(s, cx) {
        return false;
    }
    skip_c_wsp(s, cx);
    true
}

/// `rule = rulename defined-as elements c-nl`
pub fn rule<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    let start = s.checkpoint();
    let line = s.line();
    let Some(name_span) = rulename_span(s) else {
        return false;
    };
    let name = s.str(name_span);
    let Some(incremental) = defined_as(s, cx) else {
        s.restore(start);
        return false;
    };
    if !cx.begin_rule(name, incremental, line) {
        s.restore(start);
        return false;
    }
    let mut ok = elements(s, cx);
    if ok {
        ok = c_nl(s, cx);
    }
    if !cx.end_rule(name, incremental, ok) || !ok {
        s.restore(start);
        return false;
    }
    true
}

/// `rulelist = 1*( rule / (*c-wsp c-nl) )`
///
/// Wraps the whole run in `begin_document`/`end_document`, even when the
/// input yields zero rules.
pub fn rulelist<C: Context>(s: &mut Cursor, cx: &mut C) -> bool {
    if !cx.begin_document() {
        return false;
    }
    let mut matched = false;
    loop {
        if rule(s, cx) {
            matched = true;
            continue;
        }
        let mark = s.checkpoint();
        skip_c_wsp(s, cx);
        if c_nl(s, cx) {
            matched = true;
            continue;
        }
        s.restore(mark);
        break;
    }
    cx.end_document(matched)
}
