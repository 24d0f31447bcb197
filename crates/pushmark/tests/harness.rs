use std::convert::Infallible;

use pushmark::{Block, EventSink, ParserOptions, Span, TextKind};

/// Records the event stream as compact strings, one per callback:
/// `+kind(detail)` / `-kind` for blocks and spans, `t:...` (and friends)
/// for text.
pub struct EventCollector {
    pub events: Vec<String>,
    pub logs: Vec<String>,
}

impl EventCollector {
    pub fn new() -> Self {
        EventCollector {
            events: Vec::new(),
            logs: Vec::new(),
        }
    }
}

fn block_enter_name(block: &Block<'_>) -> String {
    match block {
        Block::Document => "doc".into(),
        Block::Quote => "quote".into(),
        Block::UnorderedList(d) => format!(
            "ul({},{})",
            d.mark,
            if d.is_tight { "tight" } else { "loose" }
        ),
        Block::OrderedList(d) => format!(
            "ol({},{},{})",
            d.start,
            d.mark_delimiter,
            if d.is_tight { "tight" } else { "loose" }
        ),
        Block::ListItem(d) => {
            if d.is_task {
                format!("li(task:{})", d.task_mark)
            } else {
                "li".into()
            }
        }
        Block::ThematicBreak => "hr".into(),
        Block::Heading(d) => format!("h{}", d.level),
        Block::Code(d) => match d.fence_char {
            Some(fence) => format!(
                "code({},info={},lang={})",
                fence,
                d.info.as_str(),
                d.lang.as_str()
            ),
            None => "code".into(),
        },
        Block::Html => "htmlblock".into(),
        Block::Paragraph => "p".into(),
        Block::Table(d) => format!(
            "table({},{},{})",
            d.col_count, d.head_row_count, d.body_row_count
        ),
        Block::TableHead => "thead".into(),
        Block::TableBody => "tbody".into(),
        Block::TableRow => "tr".into(),
        Block::TableHeaderCell(d) => format!("th({:?})", d.align).to_lowercase(),
        Block::TableCell(d) => format!("td({:?})", d.align).to_lowercase(),
    }
}

fn block_leave_name(block: &Block<'_>) -> &'static str {
    match block {
        Block::Document => "doc",
        Block::Quote => "quote",
        Block::UnorderedList(_) => "ul",
        Block::OrderedList(_) => "ol",
        Block::ListItem(_) => "li",
        Block::ThematicBreak => "hr",
        Block::Heading(_) => "h",
        Block::Code(_) => "code",
        Block::Html => "htmlblock",
        Block::Paragraph => "p",
        Block::Table(_) => "table",
        Block::TableHead => "thead",
        Block::TableBody => "tbody",
        Block::TableRow => "tr",
        Block::TableHeaderCell(_) => "th",
        Block::TableCell(_) => "td",
    }
}

fn span_name(span: &Span<'_>) -> String {
    match span {
        Span::Emphasis => "em".into(),
        Span::Strong => "strong".into(),
        Span::Link(d) => {
            let mut out = if d.is_autolink {
                format!("autolink({}", d.href.as_str())
            } else {
                format!("a({}", d.href.as_str())
            };
            if !d.title.is_empty() {
                out.push_str(&format!(",title={}", d.title.as_str()));
            }
            out.push(')');
            out
        }
        Span::Image(d) => {
            let mut out = format!("img({}", d.src.as_str());
            if !d.title.is_empty() {
                out.push_str(&format!(",title={}", d.title.as_str()));
            }
            out.push(')');
            out
        }
        Span::Code => "codespan".into(),
        Span::Strikethrough => "del".into(),
        Span::LatexMath => "math".into(),
        Span::LatexMathDisplay => "mathd".into(),
        Span::WikiLink(d) => format!("wiki({})", d.target.as_str()),
        Span::Underline => "u".into(),
    }
}

fn span_leave_name(span: &Span<'_>) -> &'static str {
    match span {
        Span::Emphasis => "em",
        Span::Strong => "strong",
        Span::Link(d) => {
            if d.is_autolink {
                "autolink"
            } else {
                "a"
            }
        }
        Span::Image(_) => "img",
        Span::Code => "codespan",
        Span::Strikethrough => "del",
        Span::LatexMath => "math",
        Span::LatexMathDisplay => "mathd",
        Span::WikiLink(_) => "wiki",
        Span::Underline => "u",
    }
}

impl EventSink for EventCollector {
    type Error = Infallible;

    fn enter_block(&mut self, block: &Block<'_>) -> Result<(), Infallible> {
        self.events.push(format!("+{}", block_enter_name(block)));
        Ok(())
    }

    fn leave_block(&mut self, block: &Block<'_>) -> Result<(), Infallible> {
        self.events.push(format!("-{}", block_leave_name(block)));
        Ok(())
    }

    fn enter_span(&mut self, span: &Span<'_>) -> Result<(), Infallible> {
        self.events.push(format!("+{}", span_name(span)));
        Ok(())
    }

    fn leave_span(&mut self, span: &Span<'_>) -> Result<(), Infallible> {
        self.events.push(format!("-{}", span_leave_name(span)));
        Ok(())
    }

    fn text(&mut self, kind: TextKind, text: &str) -> Result<(), Infallible> {
        let event = match kind {
            TextKind::Normal => format!("t:{text}"),
            TextKind::NullChar => "null".into(),
            TextKind::HardBreak => "br".into(),
            TextKind::SoftBreak => "softbr".into(),
            TextKind::Entity => format!("ent:{text}"),
            TextKind::Code => format!("code:{text}"),
            TextKind::Html => format!("html:{text}"),
            TextKind::LatexMath => format!("math:{text}"),
        };
        self.events.push(event);
        Ok(())
    }

    fn debug_log(&mut self, message: &str) {
        self.logs.push(message.into());
    }
}

pub fn events(input: &str, options: ParserOptions) -> Vec<String> {
    let mut sink = EventCollector::new();
    pushmark::parse(input, options, &mut sink).unwrap();
    sink.events
}

#[allow(unused)]
pub fn assert_events(input: &str, options: ParserOptions, expected: &[&str]) {
    assert_eq!(events(input, options), expected, "input: {input:?}");
}

/// Checks that enter/leave events are properly paired and nested.
#[allow(unused)]
pub fn assert_balanced(input: &str, options: ParserOptions) {
    let mut depth_stack: Vec<String> = Vec::new();
    for event in events(input, options) {
        if let Some(name) = event.strip_prefix('+') {
            let name = name.split('(').next().unwrap().to_string();
            // Heading enter names carry the level, leave names do not.
            let name = if matches!(name.as_str(), "h1" | "h2" | "h3" | "h4" | "h5" | "h6") {
                "h".to_string()
            } else {
                name
            };
            depth_stack.push(name);
        } else if let Some(name) = event.strip_prefix('-') {
            let top = depth_stack.pop();
            assert_eq!(
                top.as_deref(),
                Some(name),
                "mismatched leave in {input:?}"
            );
        }
    }
    assert!(depth_stack.is_empty(), "unbalanced events in {input:?}");
}
