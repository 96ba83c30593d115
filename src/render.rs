//! Rendering of generated content into structured blocks.
//!
//! [`render`] is a pure function: the same [`GeneratedContent`] always yields
//! the same [`Block`]s. Markdown is parsed with pulldown-cmark; a handful of
//! block kinds carry a fixed [`Style`], everything else renders with
//! [`Style::Default`].
//!
//! ```text
//! GeneratedContent ──▶ normalise ──▶ pulldown-cmark ──▶ Vec<Block> ──▶ to_html / to_terminal
//! ```

use crate::model::GeneratedContent;
use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;
use serde::Serialize;

// ── Output model ─────────────────────────────────────────────────────────

/// Presentation class attached to a rendered block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Style {
    /// Level-3 headings: the section titles of generated copy.
    Title,
    /// Paragraphs.
    Body,
    /// Unordered lists.
    Bullets,
    /// Ordered lists.
    Numbered,
    /// List items.
    Item,
    /// Everything without a dedicated mapping.
    Default,
}

impl Style {
    /// CSS classes for HTML output, or `None` for default rendering.
    pub fn class(self) -> Option<&'static str> {
        match self {
            Style::Title => Some("text-4xl font-bold mb-4 text-sky-400"),
            Style::Body => Some("mb-2 text-slate-500"),
            Style::Bullets => Some("list-disc pl-5 text-slate-500"),
            Style::Numbered => Some("list-decimal pl-5 text-slate-500"),
            Style::Item => Some("mb-2 text-slate-500"),
            Style::Default => None,
        }
    }
}

/// One rendered block of content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Heading { level: u8, text: String },
    Paragraph { text: String },
    /// `start` is `None` for unordered lists.
    List { start: Option<u64>, items: Vec<ListItem> },
    CodeBlock { language: Option<String>, code: String },
    Quote { blocks: Vec<Block> },
    Rule,
}

impl Block {
    pub fn style(&self) -> Style {
        match self {
            Block::Heading { level: 3, .. } => Style::Title,
            Block::Paragraph { .. } => Style::Body,
            Block::List { start: None, .. } => Style::Bullets,
            Block::List { start: Some(_), .. } => Style::Numbered,
            _ => Style::Default,
        }
    }
}

/// A list entry: inline text of a tight item, plus any nested blocks.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ListItem {
    pub text: String,
    pub blocks: Vec<Block>,
}

impl ListItem {
    pub fn style(&self) -> Style {
        Style::Item
    }
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Render generated content.
///
/// * `Markdown`: parsed and rendered.
/// * `Blocks`: every `"text"` block rendered in order; other kinds skipped.
/// * `None`: nothing.
pub fn render(content: Option<&GeneratedContent>) -> Vec<Block> {
    match content {
        Some(GeneratedContent::Markdown(text)) => render_markdown(text),
        Some(GeneratedContent::Blocks(blocks)) => blocks
            .iter()
            .filter(|b| b.is_text())
            .flat_map(|b| render_markdown(&b.text))
            .collect(),
        None => Vec::new(),
    }
}

/// Render one markdown string.
pub fn render_markdown(text: &str) -> Vec<Block> {
    let text = normalize_markdown(text);
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut builder = BlockBuilder::new();
    for event in Parser::new_ext(&text, Options::empty()) {
        builder.process_event(event);
    }
    builder.finish()
}

// ── Normalisation ────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:markdown|md)[ \t]*\n(.*?)\n```\s*$").expect("valid fence regex")
});

/// Undo wrapping the vendors sometimes add around generated markdown.
///
/// Strips an outer ```` ```markdown ```` fence, normalises line endings, and
/// removes zero-width characters. Untagged fences are real code blocks and
/// are left alone.
pub fn normalize_markdown(input: &str) -> String {
    let s = input.replace("\r\n", "\n").replace('\r', "\n");
    let s = strip_outer_fence(&s).unwrap_or(s);
    s.chars()
        .filter(|c| !matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'))
        .collect()
}

/// Body of a ```` ```markdown ```` wrapper spanning the whole input.
///
/// `None` when the body holds fence lines of its own: the outer fences then
/// belong to separate blocks.
fn strip_outer_fence(s: &str) -> Option<String> {
    let body = RE_OUTER_FENCES.captures(s.trim())?.get(1)?.as_str();
    if body.lines().any(|l| l.trim_start().starts_with("```")) {
        return None;
    }
    Some(body.to_string())
}

// ── Event → Block conversion ─────────────────────────────────────────────

/// Leaf block currently collecting inline text.
enum Leaf {
    Paragraph,
    Heading(u8),
    Code(Option<String>),
}

/// Open container blocks, innermost last.
enum Frame {
    Root(Vec<Block>),
    Quote(Vec<Block>),
    List { start: Option<u64>, items: Vec<ListItem> },
    Item(ListItem),
}

struct BlockBuilder {
    stack: Vec<Frame>,
    leaf: Option<Leaf>,
    buf: String,
}

impl BlockBuilder {
    fn new() -> Self {
        Self {
            stack: vec![Frame::Root(Vec::new())],
            leaf: None,
            buf: String::new(),
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) | Event::Code(text) => self.push_text(&text),
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.push_text("\n"),
            Event::Rule => self.push_block(Block::Rule),
            // Raw HTML is never passed through.
            Event::Html(_) | Event::InlineHtml(_) => {}
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => self.open_leaf(Leaf::Paragraph),
            Tag::Heading { level, .. } => self.open_leaf(Leaf::Heading(level as u8)),
            Tag::CodeBlock(kind) => {
                let language = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                self.open_leaf(Leaf::Code(language));
            }
            Tag::BlockQuote(_) => self.stack.push(Frame::Quote(Vec::new())),
            Tag::List(start) => self.stack.push(Frame::List {
                start,
                items: Vec::new(),
            }),
            Tag::Item => self.stack.push(Frame::Item(ListItem::default())),
            // Inline tags only contribute their text.
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::CodeBlock => self.close_leaf(),
            TagEnd::BlockQuote(_) => {
                if let Some(Frame::Quote(blocks)) = self.stack.pop() {
                    self.push_block(Block::Quote { blocks });
                }
            }
            TagEnd::List(_) => {
                if let Some(Frame::List { start, items }) = self.stack.pop() {
                    self.push_block(Block::List { start, items });
                }
            }
            TagEnd::Item => {
                if let Some(Frame::Item(mut item)) = self.stack.pop() {
                    item.text = item.text.trim().to_string();
                    if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                        items.push(item);
                    }
                }
            }
            _ => {}
        }
    }

    fn open_leaf(&mut self, leaf: Leaf) {
        self.leaf = Some(leaf);
        self.buf.clear();
    }

    fn close_leaf(&mut self) {
        let text = std::mem::take(&mut self.buf);
        let block = match self.leaf.take() {
            Some(Leaf::Paragraph) => Block::Paragraph {
                text: text.trim().to_string(),
            },
            Some(Leaf::Heading(level)) => Block::Heading {
                level,
                text: text.trim().to_string(),
            },
            Some(Leaf::Code(language)) => Block::CodeBlock {
                language,
                code: text.trim_end_matches('\n').to_string(),
            },
            None => return,
        };
        self.push_block(block);
    }

    fn push_text(&mut self, text: &str) {
        if self.leaf.is_some() {
            self.buf.push_str(text);
        } else if let Some(Frame::Item(item)) = self.stack.last_mut() {
            // Tight list items carry their text without a paragraph.
            item.text.push_str(text);
        }
    }

    fn push_block(&mut self, block: Block) {
        match self.stack.last_mut() {
            Some(Frame::Root(blocks)) | Some(Frame::Quote(blocks)) => blocks.push(block),
            Some(Frame::Item(item)) => item.blocks.push(block),
            // A list only ever receives items; anything else is dropped.
            Some(Frame::List { .. }) | None => {}
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.close_leaf();
        // Unwind anything left open so no content is lost.
        while self.stack.len() > 1 {
            match self.stack.pop() {
                Some(Frame::Quote(blocks)) => self.push_block(Block::Quote { blocks }),
                Some(Frame::List { start, items }) => self.push_block(Block::List { start, items }),
                Some(Frame::Item(item)) => {
                    if let Some(Frame::List { items, .. }) = self.stack.last_mut() {
                        items.push(item);
                    }
                }
                Some(Frame::Root(_)) | None => {}
            }
        }
        match self.stack.pop() {
            Some(Frame::Root(blocks)) => blocks,
            _ => Vec::new(),
        }
    }
}

// ── HTML output ──────────────────────────────────────────────────────────

/// Render blocks as an HTML fragment using the [`Style`] classes.
pub fn to_html(blocks: &[Block]) -> String {
    let mut out = String::new();
    for block in blocks {
        write_html_block(&mut out, block);
    }
    out
}

fn open_tag(out: &mut String, tag: &str, style: Style) {
    match style.class() {
        Some(class) => out.push_str(&format!("<{tag} class=\"{class}\">")),
        None => out.push_str(&format!("<{tag}>")),
    }
}

fn write_html_block(out: &mut String, block: &Block) {
    let style = block.style();
    match block {
        Block::Heading { level, text } => {
            let tag = format!("h{}", (*level).clamp(1, 6));
            open_tag(out, &tag, style);
            out.push_str(&escape_html(text));
            out.push_str(&format!("</{tag}>\n"));
        }
        Block::Paragraph { text } => {
            open_tag(out, "p", style);
            out.push_str(&escape_html(text).replace('\n', "<br>\n"));
            out.push_str("</p>\n");
        }
        Block::List { start, items } => {
            let tag = if start.is_some() { "ol" } else { "ul" };
            match (style.class(), start) {
                (Some(class), Some(n)) if *n != 1 => {
                    out.push_str(&format!("<ol class=\"{class}\" start=\"{n}\">"))
                }
                _ => open_tag(out, tag, style),
            }
            out.push('\n');
            for item in items {
                open_tag(out, "li", item.style());
                out.push_str(&escape_html(&item.text));
                if !item.blocks.is_empty() {
                    out.push('\n');
                    out.push_str(&to_html(&item.blocks));
                }
                out.push_str("</li>\n");
            }
            out.push_str(&format!("</{tag}>\n"));
        }
        Block::CodeBlock { language, code } => {
            match language {
                Some(lang) => out.push_str(&format!(
                    "<pre><code class=\"language-{}\">",
                    escape_html(lang)
                )),
                None => out.push_str("<pre><code>"),
            }
            out.push_str(&escape_html(code));
            out.push_str("</code></pre>\n");
        }
        Block::Quote { blocks } => {
            out.push_str("<blockquote>\n");
            out.push_str(&to_html(blocks));
            out.push_str("</blockquote>\n");
        }
        Block::Rule => out.push_str("<hr>\n"),
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ── Terminal output ──────────────────────────────────────────────────────

/// Render blocks as terminal text, with ANSI styling when `color` is set.
pub fn to_terminal(blocks: &[Block], color: bool) -> String {
    let mut lines = Vec::new();
    for block in blocks {
        write_terminal_block(&mut lines, block, 0, color);
    }
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn paint(s: &str, code: &str, color: bool) -> String {
    if color {
        format!("\x1b[{code}m{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

fn write_terminal_block(lines: &mut Vec<String>, block: &Block, depth: usize, color: bool) {
    let indent = "  ".repeat(depth);
    match block {
        Block::Heading { level, text } => {
            let painted = match block.style() {
                Style::Title => paint(text, "1;36", color),
                _ => paint(&format!("{} {}", "#".repeat(usize::from(*level)), text), "1", color),
            };
            lines.push(format!("{indent}{painted}"));
            lines.push(String::new());
        }
        Block::Paragraph { text } => {
            for line in text.lines() {
                lines.push(format!("{indent}{line}"));
            }
            lines.push(String::new());
        }
        Block::List { start, items } => {
            for (i, item) in items.iter().enumerate() {
                let marker = match start {
                    Some(n) => format!("{}.", n + i as u64),
                    None => "•".to_string(),
                };
                lines.push(format!("{indent}{} {}", paint(&marker, "36", color), item.text));
                for nested in &item.blocks {
                    write_terminal_block(lines, nested, depth + 1, color);
                }
            }
            if depth == 0 {
                lines.push(String::new());
            }
        }
        Block::CodeBlock { code, .. } => {
            for line in code.lines() {
                lines.push(format!("{indent}    {}", paint(line, "2", color)));
            }
            lines.push(String::new());
        }
        Block::Quote { blocks } => {
            let mut inner = Vec::new();
            for b in blocks {
                write_terminal_block(&mut inner, b, 0, color);
            }
            while inner.last().is_some_and(|l| l.is_empty()) {
                inner.pop();
            }
            for line in inner {
                lines.push(format!("{indent}{} {line}", paint("│", "2", color)));
            }
            lines.push(String::new());
        }
        Block::Rule => {
            lines.push(format!("{indent}{}", paint(&"─".repeat(40), "2", color)));
            lines.push(String::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ContentBlock;

    fn md(s: &str) -> GeneratedContent {
        GeneratedContent::Markdown(s.to_string())
    }

    #[test]
    fn heading_and_paragraph() {
        let blocks = render(Some(&md("### Title\n\nBody text")));
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 3,
                    text: "Title".into()
                },
                Block::Paragraph {
                    text: "Body text".into()
                },
            ]
        );
        assert_eq!(blocks[0].style(), Style::Title);
        assert_eq!(blocks[1].style(), Style::Body);
    }

    #[test]
    fn only_text_blocks_are_rendered() {
        let content = GeneratedContent::Blocks(vec![
            ContentBlock::text("A"),
            ContentBlock {
                kind: "image".into(),
                text: "ignored".into(),
            },
            ContentBlock::text("B"),
        ]);
        assert_eq!(
            render(Some(&content)),
            vec![
                Block::Paragraph { text: "A".into() },
                Block::Paragraph { text: "B".into() },
            ]
        );
    }

    #[test]
    fn none_renders_nothing() {
        assert!(render(None).is_empty());
    }

    #[test]
    fn empty_markdown_renders_nothing() {
        assert!(render(Some(&md(""))).is_empty());
        assert!(render(Some(&md("  \n\n "))).is_empty());
    }

    #[test]
    fn rendering_is_idempotent() {
        let content = md("### Amenities\n\n- Pool\n- Gym\n\n1. Visit\n2. Buy\n\n> quoted");
        assert_eq!(render(Some(&content)), render(Some(&content)));
        let blocks = GeneratedContent::Blocks(vec![ContentBlock::text("## Hi\n\n* a")]);
        assert_eq!(render(Some(&blocks)), render(Some(&blocks)));
    }

    #[test]
    fn lists_map_to_bullets_and_numbered() {
        let blocks = render_markdown("- Pool\n- Gym\n\n3. Visit\n4. Buy");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].style(), Style::Bullets);
        assert_eq!(blocks[1].style(), Style::Numbered);
        let Block::List { start, items } = &blocks[1] else {
            panic!("expected list");
        };
        assert_eq!(*start, Some(3));
        assert_eq!(items[0].text, "Visit");
        assert_eq!(items[1].style(), Style::Item);
    }

    #[test]
    fn nested_list_lands_in_item_blocks() {
        let blocks = render_markdown("- Outer\n  - Inner");
        let Block::List { items, .. } = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(items[0].text, "Outer");
        let Block::List { items: inner, .. } = &items[0].blocks[0] else {
            panic!("expected nested list");
        };
        assert_eq!(inner[0].text, "Inner");
    }

    #[test]
    fn loose_list_items_hold_paragraphs() {
        let blocks = render_markdown("- First\n\n- Second");
        let Block::List { items, .. } = &blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].text, "");
        assert_eq!(
            items[0].blocks,
            vec![Block::Paragraph {
                text: "First".into()
            }]
        );
    }

    #[test]
    fn other_headings_use_default_style() {
        let blocks = render_markdown("# Big\n\n## Medium");
        assert!(blocks.iter().all(|b| b.style() == Style::Default));
    }

    #[test]
    fn inline_markup_keeps_text() {
        let blocks = render_markdown("Live **steps** from the `beach`, see [site](https://x.io).");
        assert_eq!(
            blocks,
            vec![Block::Paragraph {
                text: "Live steps from the beach, see site.".into()
            }]
        );
    }

    #[test]
    fn soft_breaks_become_spaces() {
        let blocks = render_markdown("one\ntwo");
        assert_eq!(
            blocks,
            vec![Block::Paragraph {
                text: "one two".into()
            }]
        );
    }

    #[test]
    fn raw_html_is_dropped() {
        let blocks = render_markdown("<script>alert(1)</script>\n\nSafe");
        assert_eq!(blocks, vec![Block::Paragraph { text: "Safe".into() }]);
    }

    #[test]
    fn code_block_and_quote_fall_back_to_default() {
        let blocks = render_markdown("```rust\nfn main() {}\n```\n\n> Said");
        assert_eq!(
            blocks[0],
            Block::CodeBlock {
                language: Some("rust".into()),
                code: "fn main() {}".into()
            }
        );
        assert_eq!(
            blocks[1],
            Block::Quote {
                blocks: vec![Block::Paragraph { text: "Said".into() }]
            }
        );
        assert_eq!(blocks[1].style(), Style::Default);
    }

    #[test]
    fn normalize_strips_outer_fence_and_crlf() {
        assert_eq!(normalize_markdown("```markdown\r\n### Hi\r\n```"), "### Hi");
        assert_eq!(normalize_markdown("a\u{200B}b"), "ab");
        assert_eq!(normalize_markdown("### Hi"), "### Hi");
    }

    #[test]
    fn untagged_fence_stays_a_code_block() {
        assert_eq!(
            render_markdown("```\n# not a heading\n```"),
            vec![Block::CodeBlock {
                language: None,
                code: "# not a heading".into()
            }]
        );
    }

    #[test]
    fn separate_fences_keep_their_order() {
        let blocks = render_markdown("```\nfirst\n```\n\nmiddle\n\n```\nlast\n```");
        assert_eq!(
            blocks,
            vec![
                Block::CodeBlock {
                    language: None,
                    code: "first".into()
                },
                Block::Paragraph {
                    text: "middle".into()
                },
                Block::CodeBlock {
                    language: None,
                    code: "last".into()
                },
            ]
        );
    }

    #[test]
    fn markdown_wrapper_with_inner_fences_is_kept() {
        let input = "```markdown\nintro\n```\n\n```markdown\noutro\n```";
        assert_eq!(normalize_markdown(input), input);
    }

    #[test]
    fn fenced_markdown_renders_as_markdown() {
        let blocks = render_markdown("```markdown\n### Title\n\nBody\n```");
        assert_eq!(blocks[0].style(), Style::Title);
    }

    #[test]
    fn html_uses_style_classes() {
        let html = to_html(&render_markdown("### T\n\nP & Q\n\n- a\n\n1. b"));
        assert!(html.contains("<h3 class=\"text-4xl font-bold mb-4 text-sky-400\">T</h3>"));
        assert!(html.contains("<p class=\"mb-2 text-slate-500\">P &amp; Q</p>"));
        assert!(html.contains("<ul class=\"list-disc pl-5 text-slate-500\">"));
        assert!(html.contains("<ol class=\"list-decimal pl-5 text-slate-500\">"));
        assert!(html.contains("<li class=\"mb-2 text-slate-500\">a</li>"));
    }

    #[test]
    fn html_ordered_list_keeps_start() {
        let html = to_html(&render_markdown("5. five\n6. six"));
        assert!(html.contains("start=\"5\""), "got: {html}");
    }

    #[test]
    fn terminal_plain_output() {
        let text = to_terminal(&render_markdown("### Title\n\nBody\n\n2. x\n3. y"), false);
        assert_eq!(text, "Title\n\nBody\n\n2. x\n3. y\n\n");
    }

    #[test]
    fn terminal_color_wraps_title() {
        let text = to_terminal(&render_markdown("### Title"), true);
        assert!(text.starts_with("\x1b[1;36mTitle\x1b[0m"));
    }
}
