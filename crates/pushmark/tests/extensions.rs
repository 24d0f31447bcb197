//! Extension behaviors: tables, strikethrough, task lists, math spans,
//! wiki links, underline and the permissive autolink forms.

mod harness;

use harness::{assert_balanced, assert_events, events, EventCollector};
use pushmark::{Block, EventSink, ParserOptions, Span, TextKind};

#[test]
fn pipe_table() {
    assert_events(
        "| a | b |\n|---|:-:|\n| 1 | 2 |\n",
        ParserOptions::TABLES,
        &[
            "+doc",
            "+table(2,1,1)",
            "+thead",
            "+tr",
            "+th(default)",
            "t:a",
            "-th",
            "+th(center)",
            "t:b",
            "-th",
            "-tr",
            "-thead",
            "+tbody",
            "+tr",
            "+td(default)",
            "t:1",
            "-td",
            "+td(center)",
            "t:2",
            "-td",
            "-tr",
            "-tbody",
            "-table",
            "-doc",
        ],
    );
}

#[test]
fn table_fills_missing_cells_and_drops_extra_ones() {
    assert_events(
        "| a | b |\n|---|---|\n| 1 |\n| x | y | z |\n",
        ParserOptions::TABLES,
        &[
            "+doc",
            "+table(2,1,2)",
            "+thead",
            "+tr",
            "+th(default)",
            "t:a",
            "-th",
            "+th(default)",
            "t:b",
            "-th",
            "-tr",
            "-thead",
            "+tbody",
            "+tr",
            "+td(default)",
            "t:1",
            "-td",
            "+td(default)",
            "-td",
            "-tr",
            "+tr",
            "+td(default)",
            "t:x",
            "-td",
            "+td(default)",
            "t:y",
            "-td",
            "-tr",
            "-tbody",
            "-table",
            "-doc",
        ],
    );
}

#[test]
fn oversized_table_underline_is_ignored() {
    let header: String = (0..130).map(|_| "| h ").collect::<String>() + "|\n";
    let underline: String = (0..130).map(|_| "|---").collect::<String>() + "|\n";
    let input = format!("{header}{underline}");

    let mut sink = EventCollector::new();
    pushmark::parse(&input, ParserOptions::TABLES, &mut sink).unwrap();
    assert_eq!(sink.events[1], "+p");
    assert_eq!(
        sink.logs,
        vec!["Suppressing table (column_count > 128)".to_string()]
    );
}

#[test]
fn escaped_pipe_is_not_a_cell_boundary() {
    assert_events(
        "| a \\| b |\n|---|\n",
        ParserOptions::TABLES,
        &[
            "+doc",
            "+table(1,1,0)",
            "+thead",
            "+tr",
            "+th(default)",
            "t:a ",
            "t:|",
            "t: b",
            "-th",
            "-tr",
            "-thead",
            "-table",
            "-doc",
        ],
    );
}

#[test]
fn strikethrough() {
    assert_events(
        "~~x~~\n",
        ParserOptions::STRIKETHROUGH,
        &["+doc", "+p", "+del", "t:x", "-del", "-p", "-doc"],
    );
    assert_events(
        "a ~b~ c\n",
        ParserOptions::STRIKETHROUGH,
        &["+doc", "+p", "t:a ", "+del", "t:b", "-del", "t: c", "-p", "-doc"],
    );
}

#[test]
fn strikethrough_runs_must_match_in_length() {
    assert_events(
        "~~x~ y\n",
        ParserOptions::STRIKETHROUGH,
        &["+doc", "+p", "t:~~x~ y", "-p", "-doc"],
    );
}

#[test]
fn task_lists() {
    assert_events(
        "- [x] task\n- [ ] open\n",
        ParserOptions::TASK_LISTS,
        &[
            "+doc",
            "+ul(-,tight)",
            "+li(task:x)",
            "t:task",
            "-li",
            "+li(task: )",
            "t:open",
            "-li",
            "-ul",
            "-doc",
        ],
    );
}

#[test]
fn task_mark_offset_points_at_the_mark() {
    struct Offsets(Vec<usize>);
    impl EventSink for Offsets {
        type Error = std::convert::Infallible;
        fn enter_block(&mut self, block: &Block<'_>) -> Result<(), Self::Error> {
            if let Block::ListItem(d) = block {
                if d.is_task {
                    self.0.push(d.task_mark_offset);
                }
            }
            Ok(())
        }
        fn leave_block(&mut self, _: &Block<'_>) -> Result<(), Self::Error> {
            Ok(())
        }
        fn enter_span(&mut self, _: &Span<'_>) -> Result<(), Self::Error> {
            Ok(())
        }
        fn leave_span(&mut self, _: &Span<'_>) -> Result<(), Self::Error> {
            Ok(())
        }
        fn text(&mut self, _: TextKind, _: &str) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    let input = "- [x] task\n";
    let mut sink = Offsets(Vec::new());
    pushmark::parse(input, ParserOptions::TASK_LISTS, &mut sink).unwrap();
    assert_eq!(sink.0, vec![3]);
    assert_eq!(&input[3..4], "x");
}

#[test]
fn math_spans() {
    assert_events(
        "$x+y$\n",
        ParserOptions::LATEX_MATH_SPANS,
        &["+doc", "+p", "+math", "math:x+y", "-math", "-p", "-doc"],
    );
    assert_events(
        "$$x$$\n",
        ParserOptions::LATEX_MATH_SPANS,
        &["+doc", "+p", "+mathd", "math:x", "-mathd", "-p", "-doc"],
    );
}

#[test]
fn math_run_lengths_must_match() {
    assert_events(
        "$$x$ y\n",
        ParserOptions::LATEX_MATH_SPANS,
        &["+doc", "+p", "t:$$x$ y", "-p", "-doc"],
    );
}

#[test]
fn wiki_links() {
    assert_events(
        "[[target]]\n",
        ParserOptions::WIKILINKS,
        &["+doc", "+p", "+wiki(target)", "t:target", "-wiki", "-p", "-doc"],
    );
    assert_events(
        "[[target|label]]\n",
        ParserOptions::WIKILINKS,
        &["+doc", "+p", "+wiki(target)", "t:label", "-wiki", "-p", "-doc"],
    );
}

#[test]
fn wiki_link_destination_limits() {
    // Over 100 characters of destination: not a wiki link.
    let long = "x".repeat(101);
    let input = format!("[[{long}]]\n");
    assert_balanced(&input, ParserOptions::WIKILINKS);
    let found = events(&input, ParserOptions::WIKILINKS);
    assert!(
        !found.iter().any(|e| e.starts_with("+wiki")),
        "events: {found:?}"
    );
}

#[test]
fn underline_replaces_underscore_emphasis() {
    assert_events(
        "_x_\n",
        ParserOptions::UNDERLINE,
        &["+doc", "+p", "+u", "t:x", "-u", "-p", "-doc"],
    );
    // Asterisk emphasis is unaffected.
    assert_events(
        "*x*\n",
        ParserOptions::UNDERLINE,
        &["+doc", "+p", "+em", "t:x", "-em", "-p", "-doc"],
    );
}

#[test]
fn permissive_url_autolink() {
    assert_events(
        "visit http://x.com now\n",
        ParserOptions::PERMISSIVE_URL_AUTOLINKS,
        &[
            "+doc",
            "+p",
            "t:visit ",
            "+autolink(http://x.com)",
            "t:http://x.com",
            "-autolink",
            "t: now",
            "-p",
            "-doc",
        ],
    );
}

#[test]
fn permissive_email_autolink() {
    assert_events(
        "mail a@b.cz.\n",
        ParserOptions::PERMISSIVE_EMAIL_AUTOLINKS,
        &[
            "+doc",
            "+p",
            "t:mail ",
            "+autolink(mailto:a@b.cz)",
            "t:a@b.cz",
            "-autolink",
            "t:.",
            "-p",
            "-doc",
        ],
    );
}

#[test]
fn permissive_www_autolink() {
    assert_events(
        "www.foo.bar\n",
        ParserOptions::PERMISSIVE_WWW_AUTOLINKS,
        &[
            "+doc",
            "+p",
            "+autolink(http://www.foo.bar)",
            "t:www.foo.bar",
            "-autolink",
            "-p",
            "-doc",
        ],
    );
}

#[test]
fn link_text_formed_only_by_autolink_suppresses_it() {
    assert_events(
        "[www.a.com](/url)\n",
        ParserOptions::GITHUB,
        &["+doc", "+p", "+a(/url)", "t:www.a.com", "-a", "-p", "-doc"],
    );
}

#[test]
fn github_dialect_bundles_extensions() {
    let github = events("~~x~~ and www.a.com\n", ParserOptions::GITHUB);
    assert!(github.iter().any(|e| e == "+del"));
    assert!(github.iter().any(|e| e.starts_with("+autolink")));
}

#[test]
fn callback_error_aborts_the_parse() {
    struct FailAfter(usize, Vec<String>);
    impl EventSink for FailAfter {
        type Error = &'static str;
        fn enter_block(&mut self, _: &Block<'_>) -> Result<(), Self::Error> {
            self.bump()
        }
        fn leave_block(&mut self, _: &Block<'_>) -> Result<(), Self::Error> {
            self.bump()
        }
        fn enter_span(&mut self, _: &Span<'_>) -> Result<(), Self::Error> {
            self.bump()
        }
        fn leave_span(&mut self, _: &Span<'_>) -> Result<(), Self::Error> {
            self.bump()
        }
        fn text(&mut self, _: TextKind, text: &str) -> Result<(), Self::Error> {
            self.1.push(text.to_string());
            self.bump()
        }
    }
    impl FailAfter {
        fn bump(&mut self) -> Result<(), &'static str> {
            if self.0 == 0 {
                return Err("stop");
            }
            self.0 -= 1;
            Ok(())
        }
    }

    let mut sink = FailAfter(3, Vec::new());
    let result = pushmark::parse("# a\n\npara\n", ParserOptions::empty(), &mut sink);
    assert_eq!(result, Err("stop"));
    // Nothing after the aborting callback was delivered.
    assert_eq!(sink.1, vec!["a".to_string()]);
}

#[test]
fn extension_soup_stays_balanced() {
    let inputs = [
        "| *a* | ~~b~~ |\n|---|---|\n| $x$ | [[w]] |\n",
        "- [x] *task* with www.link.com\n",
        "**bold http://a.b/c?d=e#f** tail\n",
        "a@b.c d@e.fg ~x~ $y$\n",
    ];
    let options = ParserOptions::GITHUB
        | ParserOptions::LATEX_MATH_SPANS
        | ParserOptions::WIKILINKS
        | ParserOptions::TASK_LISTS;
    for input in inputs {
        assert_balanced(input, options);
    }
}
