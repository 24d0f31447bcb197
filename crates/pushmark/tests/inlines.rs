//! Inline structure: emphasis, code spans, escapes, entities, autolinks,
//! raw HTML spans and line breaks.

mod harness;

use harness::{assert_balanced, assert_events, events};
use pushmark::ParserOptions;

fn opts() -> ParserOptions {
    ParserOptions::empty()
}

#[test]
fn emphasis_and_strong() {
    assert_events(
        "*foo*\n",
        opts(),
        &["+doc", "+p", "+em", "t:foo", "-em", "-p", "-doc"],
    );
    assert_events(
        "**foo**\n",
        opts(),
        &["+doc", "+p", "+strong", "t:foo", "-strong", "-p", "-doc"],
    );
    assert_events(
        "***foo***\n",
        opts(),
        &[
            "+doc", "+p", "+em", "+strong", "t:foo", "-strong", "-em", "-p", "-doc",
        ],
    );
}

#[test]
fn longer_opener_splits_over_reserved_dummies() {
    // "**foo* bar*" resolves as nested emphasis.
    assert_events(
        "**foo* bar*\n",
        opts(),
        &[
            "+doc", "+p", "+em", "+em", "t:foo", "-em", "t: bar", "-em", "-p", "-doc",
        ],
    );
}

#[test]
fn rule_of_three_blocks_mixed_runs() {
    // Per CommonMark, "*foo**bar*" is one <em> with literal asterisks
    // inside rather than nested emphasis.
    assert_events(
        "*foo**bar*\n",
        opts(),
        &["+doc", "+p", "+em", "t:foo**bar", "-em", "-p", "-doc"],
    );
}

#[test]
fn intraword_underscore_is_literal() {
    assert_events(
        "foo_bar_baz\n",
        opts(),
        &["+doc", "+p", "t:foo_bar_baz", "-p", "-doc"],
    );
    assert_events(
        "foo*bar*baz\n",
        opts(),
        &["+doc", "+p", "t:foo", "+em", "t:bar", "-em", "t:baz", "-p", "-doc"],
    );
}

#[test]
fn code_spans() {
    assert_events(
        "a `code` b\n",
        opts(),
        &[
            "+doc", "+p", "t:a ", "+codespan", "code:code", "-codespan", "t: b", "-p", "-doc",
        ],
    );
    // One space is stripped from each side when the contents allow it.
    assert_events(
        "` code `\n",
        opts(),
        &["+doc", "+p", "+codespan", "code:code", "-codespan", "-p", "-doc"],
    );
    // But not when the span is all spaces.
    assert_events(
        "` `\n",
        opts(),
        &["+doc", "+p", "+codespan", "code: ", "-codespan", "-p", "-doc"],
    );
}

#[test]
fn code_span_backticks_must_match_in_length() {
    assert_events(
        "``a`b``\n",
        opts(),
        &["+doc", "+p", "+codespan", "code:a`b", "-codespan", "-p", "-doc"],
    );
}

#[test]
fn code_span_joins_lines_with_spaces() {
    assert_events(
        "`a\nb`\n",
        opts(),
        &[
            "+doc", "+p", "+codespan", "code:a", "code: ", "code:b", "-codespan", "-p", "-doc",
        ],
    );
}

#[test]
fn oversized_code_span_opener_is_literal() {
    // A run of 33 backticks can never open a code span.
    let run = "`".repeat(33);
    let input = format!("{run}code{run}\n");
    let expected_text = format!("t:{run}code{run}");
    assert_events(
        &input,
        opts(),
        &["+doc", "+p", &expected_text, "-p", "-doc"],
    );
}

#[test]
fn backslash_escapes() {
    assert_events(
        "\\*not\\*\n",
        opts(),
        &["+doc", "+p", "t:*", "t:not", "t:*", "-p", "-doc"],
    );
    // Letters cannot be escaped.
    assert_events("\\a\n", opts(), &["+doc", "+p", "t:\\a", "-p", "-doc"]);
}

#[test]
fn hard_breaks() {
    assert_events(
        "foo  \nbar\n",
        opts(),
        &["+doc", "+p", "t:foo", "br", "t:bar", "-p", "-doc"],
    );
    assert_events(
        "foo\\\nbar\n",
        opts(),
        &["+doc", "+p", "t:foo", "br", "t:bar", "-p", "-doc"],
    );
    // A backslash on the last line of the block is plain text.
    assert_events("foo\\\n", opts(), &["+doc", "+p", "t:foo\\", "-p", "-doc"]);
}

#[test]
fn hard_soft_breaks_option_promotes_all_breaks() {
    assert_events(
        "a\nb\n",
        ParserOptions::HARD_SOFT_BREAKS,
        &["+doc", "+p", "t:a", "br", "t:b", "-p", "-doc"],
    );
}

#[test]
fn entities_pass_through_raw() {
    assert_events(
        "&amp; &x;\n",
        opts(),
        &["+doc", "+p", "ent:&amp;", "t: &x;", "-p", "-doc"],
    );
    assert_events(
        "&#35;&#xCab;\n",
        opts(),
        &["+doc", "+p", "ent:&#35;", "ent:&#xCab;", "-p", "-doc"],
    );
}

#[test]
fn uri_autolink() {
    assert_events(
        "<http://x.y/>\n",
        opts(),
        &[
            "+doc",
            "+p",
            "+autolink(http://x.y/)",
            "t:http://x.y/",
            "-autolink",
            "-p",
            "-doc",
        ],
    );
}

#[test]
fn email_autolink_gets_mailto_prefix() {
    assert_events(
        "<a@b.c>\n",
        opts(),
        &[
            "+doc",
            "+p",
            "+autolink(mailto:a@b.c)",
            "t:a@b.c",
            "-autolink",
            "-p",
            "-doc",
        ],
    );
}

#[test]
fn raw_html_span() {
    assert_events(
        "a <b>x</b>\n",
        opts(),
        &[
            "+doc", "+p", "t:a ", "html:<b>", "t:x", "html:</b>", "-p", "-doc",
        ],
    );
}

#[test]
fn html_comment_span() {
    assert_events(
        "a <!-- b --> c\n",
        opts(),
        &["+doc", "+p", "t:a ", "html:<!-- b -->", "t: c", "-p", "-doc"],
    );
}

#[test]
fn no_html_spans_option() {
    assert_events(
        "a <b>x</b>\n",
        ParserOptions::NO_HTML_SPANS,
        &["+doc", "+p", "t:a <b>x</b>", "-p", "-doc"],
    );
}

#[test]
fn null_byte_is_reported_as_nullchar() {
    assert_events("a\0b\n", opts(), &["+doc", "+p", "t:a", "null", "t:b", "-p", "-doc"]);
}

#[test]
fn collapse_whitespace() {
    assert_events(
        "a  b\tc\n",
        ParserOptions::COLLAPSE_WHITESPACE,
        &["+doc", "+p", "t:a", "t: ", "t:b", "t: ", "t:c", "-p", "-doc"],
    );
}

#[test]
fn pathological_inputs_stay_balanced() {
    let nested_brackets = format!("{}text{}\n", "[".repeat(64), "]".repeat(64));
    let emphasis_soup = "*a**b***c****d*****e******\n".to_string();
    let tildes = "~~a~b~~c~\n".to_string();
    for input in [nested_brackets, emphasis_soup, tildes] {
        assert_balanced(&input, ParserOptions::GITHUB);
    }
    assert_balanced("` `` ``` `` ` ``\n", opts());
}

#[test]
fn unresolved_markers_render_literally() {
    assert_events(
        "a * b _ c ~ d\n",
        opts(),
        &["+doc", "+p", "t:a * b _ c ~ d", "-p", "-doc"],
    );
}

#[test]
fn events_reference_input_in_document_order() {
    // The concatenation of plain text payloads follows input order.
    let input = "pre *em* `code` post\n";
    let text: String = events(input, opts())
        .iter()
        .filter_map(|e| {
            e.strip_prefix("t:")
                .or_else(|| e.strip_prefix("code:"))
                .map(str::to_string)
        })
        .collect();
    assert_eq!(text, "pre em code post");
}
