use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::document::{Document, ListKind, Mark, Marks, Node, TextBlock, TextKind};
use crate::hover_menu::SelectionRect;
use crate::selection::{Point, Selection};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    pub cursor_map: Vec<(Point, CursorVisualPosition)>,
}

impl RenderResult {
    pub fn position_of(&self, point: Point) -> Option<CursorVisualPosition> {
        self.cursor_map
            .iter()
            .find(|(candidate, _)| *candidate == point)
            .map(|(_, position)| *position)
    }

    /// Closest caret position on `line`: the last one not right of `column`,
    /// or the first on the line when `column` lies before all of them.
    pub fn point_at(&self, line: usize, column: u16) -> Option<Point> {
        let mut on_line = self
            .cursor_map
            .iter()
            .filter(|(_, position)| position.line == line)
            .peekable();
        let first = on_line.peek().map(|(point, _)| *point)?;
        Some(
            on_line
                .filter(|(_, position)| position.column <= column)
                .last()
                .map(|(point, _)| *point)
                .unwrap_or(first),
        )
    }

    /// Caret position one visual line above or below `point`, skipping
    /// decoration lines such as blank separators and heading underlines.
    pub fn vertical_neighbor(&self, point: Point, delta: isize) -> Option<Point> {
        let origin = self.position_of(point)?;
        let mut line = origin.line;
        loop {
            line = line.checked_add_signed(delta)?;
            if line >= self.total_lines {
                return None;
            }
            if let Some(found) = self.point_at(line, origin.column) {
                return Some(found);
            }
        }
    }

    /// Bounding box of the range between two points in document lines.
    ///
    /// A range spanning several lines covers the full width of those lines.
    pub fn selection_rect(&self, start: Point, end: Point) -> Option<SelectionRect> {
        let from = self.position_of(start)?;
        let to = self.position_of(end)?;
        let (from, to) = if (to.line, to.column) < (from.line, from.column) {
            (to, from)
        } else {
            (from, to)
        };
        if from.line == to.line {
            return Some(SelectionRect {
                top: from.line as i32,
                left: i32::from(from.column),
                width: i32::from(to.column - from.column),
                height: 1,
            });
        }
        let width = self.lines[from.line..=to.line]
            .iter()
            .map(line_width)
            .max()
            .unwrap_or(0);
        Some(SelectionRect {
            top: from.line as i32,
            left: 0,
            width: width as i32,
            height: (to.line - from.line + 1) as i32,
        })
    }
}

/// Renders `document` wrapped at `width` cells, highlighting the expanded
/// part of `selection` with `selection_style`.
pub fn render_document(
    document: &Document,
    selection: Option<&Selection>,
    width: usize,
    selection_style: Style,
) -> RenderResult {
    let mut renderer = Renderer::new(width.max(1), document, selection, selection_style);
    renderer.render_document(document);
    renderer.finish()
}

struct Renderer {
    wrap_width: usize,
    focus: Option<Point>,
    highlight: Option<Highlight>,
    selection_style: Style,
    cursor: Option<CursorVisualPosition>,
    cursor_map: Vec<(Point, CursorVisualPosition)>,
    lines: Vec<Line<'static>>,
    current_line_index: usize,
}

struct Highlight {
    start: Point,
    end: Point,
    started: bool,
}

impl Highlight {
    fn range_in(&mut self, block: &TextBlock) -> Option<(usize, usize)> {
        let len = block.char_len();
        let lo = if block.key == self.start.key {
            self.started = true;
            self.start.offset
        } else if self.started {
            0
        } else {
            return None;
        };
        if block.key == self.end.key {
            self.started = false;
            return Some((lo, self.end.offset));
        }
        Some((lo, len))
    }
}

impl Renderer {
    fn new(
        wrap_width: usize,
        document: &Document,
        selection: Option<&Selection>,
        selection_style: Style,
    ) -> Self {
        let highlight = selection
            .filter(|selection| selection.is_expanded())
            .map(|selection| {
                let (start, end) = selection.ordered(document);
                Highlight {
                    start,
                    end,
                    started: false,
                }
            });
        Self {
            wrap_width,
            focus: selection.map(|selection| selection.focus),
            highlight,
            selection_style,
            cursor: None,
            cursor_map: Vec::new(),
            lines: Vec::new(),
            current_line_index: 0,
        }
    }

    fn render_document(&mut self, document: &Document) {
        for (idx, node) in document.nodes.iter().enumerate() {
            if idx > 0 {
                self.push_blank_line();
            }
            match node {
                Node::Text(block) => self.render_block(block, ""),
                Node::List(list) => {
                    for (number, item) in list.items.iter().enumerate() {
                        let marker = match list.kind {
                            ListKind::Bulleted => "• ".to_string(),
                            ListKind::Numbered => format!("{}. ", number + 1),
                        };
                        self.render_block(item, &marker);
                    }
                }
            }
        }
    }

    fn render_block(&mut self, block: &TextBlock, marker: &str) {
        let continuation = " ".repeat(visible_width(marker));
        let (first_prefix, continuation_prefix) = match block.kind {
            TextKind::BlockQuote => (format!("{marker}| "), format!("{continuation}| ")),
            _ => (marker.to_string(), continuation),
        };

        let selected = self
            .highlight
            .as_mut()
            .and_then(|highlight| highlight.range_in(block));
        let fragments = tokenize_block(block, selected, self.selection_style);
        let mut lines = wrap_fragments(
            &fragments,
            &first_prefix,
            &continuation_prefix,
            self.wrap_width,
        );

        let underline = match block.kind {
            TextKind::HeadingOne => Some('='),
            TextKind::HeadingTwo => Some('-'),
            _ => None,
        };
        if underline.is_some() {
            for line in &mut lines {
                for span in &mut line.spans {
                    span.style = span.style.add_modifier(Modifier::BOLD);
                }
            }
        }

        self.consume_lines(block, lines);

        if let Some(ch) = underline {
            let width = self.lines.last().map(line_width).unwrap_or(0);
            self.push_plain_line(&underline_string(width, ch));
        }
    }

    fn push_blank_line(&mut self) {
        self.lines.push(Line::from(""));
        self.current_line_index += 1;
    }

    fn push_plain_line(&mut self, content: &str) {
        let span = Span::raw(content.to_string());
        self.lines.push(Line::from(vec![span]));
        self.current_line_index += 1;
    }

    fn consume_lines(&mut self, block: &TextBlock, outputs: Vec<LineOutput>) {
        for output in outputs {
            let spans: Vec<Span<'static>> = output
                .spans
                .into_iter()
                .map(|segment| Span::styled(segment.text, segment.style))
                .collect();
            for event in output.events {
                let point = Point::new(block.key, event.offset);
                let position = CursorVisualPosition {
                    line: self.current_line_index,
                    column: event.column,
                };
                if self.focus == Some(point) {
                    self.cursor = Some(position);
                }
                self.cursor_map.push((point, position));
            }
            self.lines.push(Line::from(spans));
            self.current_line_index += 1;
        }
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor: self.cursor,
            total_lines,
            cursor_map: self.cursor_map,
        }
    }
}

struct LineSegment {
    text: String,
    style: Style,
}

struct LineOutput {
    spans: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
}

#[derive(Clone, Copy)]
struct LocatedEvent {
    column: u16,
    offset: usize,
}

#[derive(Clone)]
struct Fragment {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

enum FragmentItem {
    Token(Fragment),
    LineBreak,
}

#[derive(Clone, Copy)]
struct TextEvent {
    column: usize,
    offset: usize,
}

fn marks_style(marks: Marks) -> Style {
    marks.iter().fold(Style::default(), |style, mark| {
        style.add_modifier(match mark {
            Mark::Bold => Modifier::BOLD,
            Mark::Italic => Modifier::ITALIC,
            Mark::Underline => Modifier::UNDERLINED,
        })
    })
}

fn tokenize_block(
    block: &TextBlock,
    selected: Option<(usize, usize)>,
    selection_style: Style,
) -> Vec<FragmentItem> {
    let mut fragments = Vec::new();
    let mut builder: Option<TokenBuilder> = None;
    let mut pending_offsets: Vec<usize> = Vec::new();
    let mut offset = 0;

    for leaf in &block.leaves {
        let leaf_style = marks_style(leaf.marks);
        for ch in leaf.text.chars() {
            pending_offsets.push(offset);
            let style = match selected {
                Some((lo, hi)) if lo <= offset && offset < hi => leaf_style.patch(selection_style),
                _ => leaf_style,
            };
            offset += 1;

            if ch == '\r' {
                continue;
            }
            if ch == '\n' {
                flush_token(&mut builder, &mut pending_offsets, style, &mut fragments);
                fragments.push(FragmentItem::LineBreak);
                continue;
            }

            let (actual, repeat) = if ch == '\t' { (' ', 4) } else { (ch, 1) };
            for _ in 0..repeat {
                let is_whitespace = actual.is_whitespace();
                let reuse = builder
                    .as_ref()
                    .is_some_and(|existing| existing.matches(is_whitespace, style));
                if !reuse {
                    if let Some(mut existing) = builder.take() {
                        existing.add_events(&mut pending_offsets);
                        fragments.push(FragmentItem::Token(existing.finish()));
                    }
                    builder = Some(TokenBuilder::new(style, is_whitespace));
                }
                if let Some(current) = builder.as_mut() {
                    current.add_events(&mut pending_offsets);
                    current.push_char(actual);
                }
            }
        }
    }

    pending_offsets.push(offset);
    flush_token(&mut builder, &mut pending_offsets, Style::default(), &mut fragments);
    fragments
}

/// Ends the current token, or emits an empty one when only caret positions
/// are pending.
fn flush_token(
    builder: &mut Option<TokenBuilder>,
    pending_offsets: &mut Vec<usize>,
    style: Style,
    fragments: &mut Vec<FragmentItem>,
) {
    if let Some(mut token) = builder.take() {
        token.add_events(pending_offsets);
        fragments.push(FragmentItem::Token(token.finish()));
    } else if !pending_offsets.is_empty() {
        let mut token = TokenBuilder::new(style, false);
        token.add_events(pending_offsets);
        fragments.push(FragmentItem::Token(token.finish()));
    }
}

struct TokenBuilder {
    text: String,
    style: Style,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

impl TokenBuilder {
    fn new(style: Style, is_whitespace: bool) -> Self {
        Self {
            text: String::new(),
            style,
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
            events: Vec::new(),
        }
    }

    fn matches(&self, is_whitespace: bool, style: Style) -> bool {
        self.style == style
            && matches!(
                (self.kind, is_whitespace),
                (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
            )
    }

    fn add_events(&mut self, pending: &mut Vec<usize>) {
        for offset in pending.drain(..) {
            self.events.push(TextEvent {
                column: self.width,
                offset,
            });
        }
    }

    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            text: self.text,
            style: self.style,
            kind: self.kind,
            width: self.width,
            events: self.events,
        }
    }
}

fn wrap_fragments(
    fragments: &[FragmentItem],
    first_prefix: &str,
    continuation_prefix: &str,
    width: usize,
) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::new(first_prefix);
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for fragment in fragments {
        match fragment {
            FragmentItem::LineBreak => {
                builder.consume_pending(&mut pending_whitespace);
                outputs.push(builder.build_line());
                builder = LineBuilder::new(continuation_prefix);
            }
            FragmentItem::Token(token) => match token.kind {
                FragmentKind::Whitespace => {
                    pending_whitespace.push(token.clone());
                }
                FragmentKind::Word => {
                    let whitespace_width: usize =
                        pending_whitespace.iter().map(|item| item.width).sum();
                    if token.width > 0
                        && builder.width > builder.prefix_width
                        && builder.width + whitespace_width + token.width > width
                    {
                        builder.consume_pending(&mut pending_whitespace);
                        outputs.push(builder.build_line());
                        builder = LineBuilder::new(continuation_prefix);
                    }
                    builder.consume_pending(&mut pending_whitespace);
                    builder.append_token(token.clone());
                }
            },
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

struct LineBuilder {
    segments: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
    width: usize,
    prefix_width: usize,
}

impl LineBuilder {
    fn new(prefix: &str) -> Self {
        let prefix_width = visible_width(prefix);
        let mut segments = Vec::new();
        if !prefix.is_empty() {
            segments.push(LineSegment {
                text: prefix.to_string(),
                style: Style::default(),
            });
        }
        Self {
            segments,
            events: Vec::new(),
            width: prefix_width,
            prefix_width,
        }
    }

    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        let start = self.width;
        for event in fragment.events {
            self.events.push(LocatedEvent {
                column: (start + event.column) as u16,
                offset: event.offset,
            });
        }
        if !fragment.text.is_empty() {
            self.segments.push(LineSegment {
                text: fragment.text,
                style: fragment.style,
            });
            self.width += fragment.width;
        }
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        LineOutput {
            spans: self.segments,
            events: self.events,
        }
    }
}

fn visible_width(text: &str) -> usize {
    text.chars()
        .map(|ch| UnicodeWidthChar::width(ch).unwrap_or(0))
        .sum()
}

fn line_width(line: &Line<'_>) -> usize {
    line.spans
        .iter()
        .map(|span| visible_width(span.content.as_ref()))
        .sum()
}

fn underline_string(width: usize, ch: char) -> String {
    std::iter::repeat_n(ch, width.max(1)).collect()
}
