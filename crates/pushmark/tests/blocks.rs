//! Block structure: paragraphs, headings, quotes, lists, code blocks,
//! thematic breaks and HTML blocks.

mod harness;

use harness::{assert_balanced, assert_events, events};
use pushmark::ParserOptions;

fn opts() -> ParserOptions {
    ParserOptions::empty()
}

#[test]
fn empty_input() {
    assert_events("", opts(), &["+doc", "-doc"]);
}

#[test]
fn atx_heading() {
    assert_events("# Hello\n", opts(), &["+doc", "+h1", "t:Hello", "-h", "-doc"]);
}

#[test]
fn missing_trailing_newline_makes_no_difference() {
    for input in [
        "# Hello",
        "para",
        "- item",
        "> quoted",
        "```\ncode\n```",
        "text\n====",
    ] {
        let with_newline = format!("{input}\n");
        assert_eq!(
            events(input, opts()),
            events(&with_newline, opts()),
            "input: {input:?}"
        );
    }
}

#[test]
fn paragraph_lines_join_with_soft_breaks() {
    assert_events(
        "one\ntwo\n",
        opts(),
        &["+doc", "+p", "t:one", "softbr", "t:two", "-p", "-doc"],
    );
}

#[test]
fn block_quote_with_following_paragraph() {
    assert_events(
        "> a\n> b\n\nc\n",
        opts(),
        &[
            "+doc", "+quote", "+p", "t:a", "softbr", "t:b", "-p", "-quote", "+p", "t:c", "-p",
            "-doc",
        ],
    );
}

#[test]
fn lazy_continuation_stays_in_the_quote() {
    assert_events(
        "> a\nb\n",
        opts(),
        &["+doc", "+quote", "+p", "t:a", "softbr", "t:b", "-p", "-quote", "-doc"],
    );
}

#[test]
fn setext_headings() {
    assert_events("title\n=====\n", opts(), &["+doc", "+h1", "t:title", "-h", "-doc"]);
    assert_events("title\n-\n", opts(), &["+doc", "+h2", "t:title", "-h", "-doc"]);
}

#[test]
fn setext_underline_after_consumed_ref_defs_downgrades() {
    assert_events(
        "[a]: /x\n===\n",
        opts(),
        &["+doc", "+p", "t:===", "-p", "-doc"],
    );
}

#[test]
fn thematic_break() {
    assert_events("***\n", opts(), &["+doc", "+hr", "-hr", "-doc"]);
    assert_events("- - -\n", opts(), &["+doc", "+hr", "-hr", "-doc"]);
}

#[test]
fn tight_list_suppresses_paragraphs() {
    assert_events(
        "- a\n- b\n",
        opts(),
        &[
            "+doc",
            "+ul(-,tight)",
            "+li",
            "t:a",
            "-li",
            "+li",
            "t:b",
            "-li",
            "-ul",
            "-doc",
        ],
    );
}

#[test]
fn loose_list_keeps_paragraphs() {
    assert_events(
        "- a\n\n- b\n",
        opts(),
        &[
            "+doc",
            "+ul(-,loose)",
            "+li",
            "+p",
            "t:a",
            "-p",
            "-li",
            "+li",
            "+p",
            "t:b",
            "-p",
            "-li",
            "-ul",
            "-doc",
        ],
    );
}

#[test]
fn ordered_list_start_is_reported() {
    assert_events(
        "3. a\n4. b\n",
        opts(),
        &[
            "+doc",
            "+ol(3,.,tight)",
            "+li",
            "t:a",
            "-li",
            "+li",
            "t:b",
            "-li",
            "-ol",
            "-doc",
        ],
    );
}

#[test]
fn ordered_list_interrupts_paragraph_only_from_one() {
    assert_events(
        "text\n2. x\n",
        opts(),
        &["+doc", "+p", "t:text", "softbr", "t:2. x", "-p", "-doc"],
    );
    assert_events(
        "text\n1. x\n",
        opts(),
        &[
            "+doc",
            "+p",
            "t:text",
            "-p",
            "+ol(1,.,tight)",
            "+li",
            "t:x",
            "-li",
            "-ol",
            "-doc",
        ],
    );
}

#[test]
fn list_mark_with_blank_line_cannot_interrupt_paragraph() {
    assert_events(
        "text\n-\n",
        opts(),
        &["+doc", "+p", "t:text", "softbr", "t:-", "-p", "-doc"],
    );
}

#[test]
fn quote_in_tight_list_still_wraps_paragraphs() {
    assert_events(
        "- > q\n",
        opts(),
        &[
            "+doc",
            "+ul(-,tight)",
            "+li",
            "+quote",
            "+p",
            "t:q",
            "-p",
            "-quote",
            "-li",
            "-ul",
            "-doc",
        ],
    );
}

#[test]
fn two_blank_lines_at_item_start_end_the_list() {
    // "A list item can begin with at most one blank line"; the second
    // blank forces the list closed before the following text.
    assert_events(
        "-\n\n\n  text\n",
        opts(),
        &[
            "+doc",
            "+ul(-,tight)",
            "+li",
            "-li",
            "-ul",
            "+p",
            "t:text",
            "-p",
            "-doc",
        ],
    );
}

#[test]
fn indented_code_block() {
    assert_events(
        "    let x;\n",
        opts(),
        &["+doc", "+code", "code:let x;", "code:\n", "-code", "-doc"],
    );
}

#[test]
fn indented_code_preserves_extra_indentation() {
    assert_events(
        "      foo\n",
        opts(),
        &["+doc", "+code", "code:  ", "code:foo", "code:\n", "-code", "-doc"],
    );
}

#[test]
fn indented_code_strips_surrounding_blank_lines() {
    assert_events(
        "    a\n\n    b\n",
        opts(),
        &[
            "+doc", "+code", "code:a", "code:\n", "code:\n", "code:b", "code:\n", "-code", "-doc",
        ],
    );
}

#[test]
fn fenced_code_reports_info_and_lang() {
    assert_events(
        "```rust ignore\nlet x;\n```\n",
        opts(),
        &[
            "+doc",
            "+code(`,info=rust ignore,lang=rust)",
            "code:let x;",
            "code:\n",
            "-code",
            "-doc",
        ],
    );
}

#[test]
fn unclosed_fence_runs_to_the_end() {
    assert_events(
        "~~~\ncode\n",
        opts(),
        &[
            "+doc",
            "+code(~,info=,lang=)",
            "code:code",
            "code:\n",
            "-code",
            "-doc",
        ],
    );
}

#[test]
fn html_block_type_6_ends_on_blank_line() {
    assert_events(
        "<div>\nhi\n</div>\n\npara\n",
        opts(),
        &[
            "+doc",
            "+htmlblock",
            "html:<div>",
            "html:\n",
            "html:hi",
            "html:\n",
            "html:</div>",
            "html:\n",
            "-htmlblock",
            "+p",
            "t:para",
            "-p",
            "-doc",
        ],
    );
}

#[test]
fn html_comment_block_closes_on_its_own_line() {
    assert_events(
        "<!-- c -->\npara\n",
        opts(),
        &[
            "+doc",
            "+htmlblock",
            "html:<!-- c -->",
            "html:\n",
            "-htmlblock",
            "+p",
            "t:para",
            "-p",
            "-doc",
        ],
    );
}

#[test]
fn no_html_blocks_option_disables_them() {
    // The tag still resolves as an inline raw HTML span inside the
    // paragraph; NO_HTML disables that too.
    assert_events(
        "<div>\n",
        ParserOptions::NO_HTML_BLOCKS,
        &["+doc", "+p", "html:<div>", "-p", "-doc"],
    );
    assert_events(
        "<div>\n",
        ParserOptions::NO_HTML,
        &["+doc", "+p", "t:<div>", "-p", "-doc"],
    );
}

#[test]
fn no_indented_code_option_disables_it() {
    assert_events(
        "    foo\n",
        ParserOptions::NO_INDENTED_CODE_BLOCKS,
        &["+doc", "+p", "t:foo", "-p", "-doc"],
    );
}

#[test]
fn permissive_atx_headers() {
    assert_events("#x\n", opts(), &["+doc", "+p", "t:#x", "-p", "-doc"]);
    assert_events(
        "#x\n",
        ParserOptions::PERMISSIVE_ATX_HEADERS,
        &["+doc", "+h1", "t:x", "-h", "-doc"],
    );
}

#[test]
fn nested_structures_stay_balanced() {
    let inputs = [
        "> - a\n>   - b\n> - c\n",
        "1. a\n   > q\n2. b\n",
        "- ```\n  code\n  ```\n",
        "> # h\n>\n> p\n",
        "* * *\n- x\n",
    ];
    for input in inputs {
        assert_balanced(input, opts());
    }
}
