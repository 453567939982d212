use std::{
    fmt, fs,
    io::{self, Cursor},
    path::{Path, PathBuf},
};

use tdoc::{ChecklistItem, InlineStyle, Paragraph, Span, markdown, writer::Writer};
use thiserror::Error;

use crate::document::{Document, Leaf, ListKind, Mark, Marks, Node, TextBlock, TextKind, normalize_leaves};
use crate::html;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Html,
    Markdown,
    Ftml,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match ext.as_deref() {
            Some("md") | Some("markdown") | Some("mkd") | Some("mdown") | Some("mdtxt") => {
                DocumentFormat::Markdown
            }
            Some("ftml") => DocumentFormat::Ftml,
            _ => DocumentFormat::Html,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            DocumentFormat::Html => "HTML",
            DocumentFormat::Markdown => "Markdown",
            DocumentFormat::Ftml => "FTML",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {format}: {message}")]
    Parse {
        format: DocumentFormat,
        message: String,
    },
    #[error("failed to render {format}: {message}")]
    Render {
        format: DocumentFormat,
        message: String,
    },
}

/// A document read from disk, with a status line for the host when the file
/// was missing or could not be parsed.
#[derive(Debug)]
pub struct Loaded {
    pub document: Document,
    pub format: DocumentFormat,
    pub status: Option<String>,
}

pub fn load(path: &Path) -> Result<Loaded, FormatError> {
    let format = DocumentFormat::from_path(path);
    if !path.exists() {
        return Ok(Loaded {
            document: Document::new(),
            format,
            status: Some("New document".to_string()),
        });
    }

    let content = fs::read_to_string(path).map_err(|source| FormatError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    match parse_str(format, &content) {
        Ok(document) => Ok(Loaded {
            document,
            format,
            status: None,
        }),
        Err(err) => Ok(Loaded {
            document: Document::new(),
            format,
            status: Some(format!("Parse error: {err}. Starting with empty document.")),
        }),
    }
}

pub fn save(path: &Path, format: DocumentFormat, document: &Document) -> Result<(), FormatError> {
    let contents = render(format, document)?;
    fs::write(path, contents).map_err(|source| FormatError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse_str(format: DocumentFormat, content: &str) -> Result<Document, FormatError> {
    let parse_error = |message: String| FormatError::Parse { format, message };
    match format {
        DocumentFormat::Html => Ok(html::deserialize(content)),
        DocumentFormat::Markdown => markdown::parse(Cursor::new(content))
            .map(|doc| from_tdoc(&doc))
            .map_err(|err| parse_error(err.to_string())),
        DocumentFormat::Ftml => tdoc::parse(Cursor::new(content))
            .map(|doc| from_tdoc(&doc))
            .map_err(|err| parse_error(err.to_string())),
    }
}

pub fn render(format: DocumentFormat, document: &Document) -> Result<String, FormatError> {
    let render_error = |message: String| FormatError::Render { format, message };
    match format {
        DocumentFormat::Html => Ok(html::serialize(document)),
        DocumentFormat::Markdown => {
            let mut contents = Vec::new();
            markdown::write(&mut contents, &to_tdoc(document))
                .map_err(|err| render_error(err.to_string()))?;
            String::from_utf8(contents).map_err(|err| render_error(err.to_string()))
        }
        DocumentFormat::Ftml => Writer::new()
            .write_to_string(&to_tdoc(document))
            .map_err(|err| render_error(err.to_string())),
    }
}

pub fn to_tdoc(document: &Document) -> tdoc::Document {
    let paragraphs = document
        .nodes
        .iter()
        .map(|node| match node {
            Node::Text(block) => text_paragraph(block),
            Node::List(list) => {
                let entries = list
                    .items
                    .iter()
                    .map(|item| vec![Paragraph::Text {
                        content: spans_from_leaves(&item.leaves),
                    }])
                    .collect();
                match list.kind {
                    ListKind::Bulleted => Paragraph::UnorderedList { entries },
                    ListKind::Numbered => Paragraph::OrderedList { entries },
                }
            }
        })
        .collect();
    tdoc::Document::new().with_paragraphs(paragraphs)
}

fn text_paragraph(block: &TextBlock) -> Paragraph {
    let content = spans_from_leaves(&block.leaves);
    match block.kind {
        TextKind::Paragraph | TextKind::ListItem => Paragraph::Text { content },
        TextKind::HeadingOne => Paragraph::Header1 { content },
        TextKind::HeadingTwo => Paragraph::Header2 { content },
        TextKind::BlockQuote => Paragraph::Quote {
            children: vec![Paragraph::Text { content }],
        },
    }
}

fn mark_style(mark: Mark) -> InlineStyle {
    match mark {
        Mark::Bold => InlineStyle::Bold,
        Mark::Italic => InlineStyle::Italic,
        Mark::Underline => InlineStyle::Underline,
    }
}

fn spans_from_leaves(leaves: &[Leaf]) -> Vec<Span> {
    leaves.iter().map(span_from_leaf).collect()
}

/// One styled span per mark, outermost first, with the text in an unstyled
/// leaf span.
fn span_from_leaf(leaf: &Leaf) -> Span {
    leaf.marks
        .iter()
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .fold(Span::new_text(leaf.text.as_str()), |inner, mark| {
            Span::new_styled(mark_style(mark)).with_children(vec![inner])
        })
}

pub fn from_tdoc(source: &tdoc::Document) -> Document {
    let mut document = Document::empty();
    for paragraph in &source.paragraphs {
        import_paragraph(&mut document, paragraph, false);
    }
    document
}

fn import_paragraph(document: &mut Document, paragraph: &Paragraph, in_quote: bool) {
    match paragraph {
        Paragraph::Text { content } | Paragraph::CodeBlock { content } => {
            let kind = if in_quote {
                TextKind::BlockQuote
            } else {
                TextKind::Paragraph
            };
            document.push_block(kind, leaves_from_spans(content));
        }
        Paragraph::Header1 { content } => {
            document.push_block(TextKind::HeadingOne, leaves_from_spans(content));
        }
        Paragraph::Header2 { content } | Paragraph::Header3 { content } => {
            document.push_block(TextKind::HeadingTwo, leaves_from_spans(content));
        }
        Paragraph::Quote { children } => {
            for child in children {
                import_paragraph(document, child, true);
            }
        }
        Paragraph::UnorderedList { entries } => {
            document.push_list(ListKind::Bulleted, entry_items(entries));
        }
        Paragraph::OrderedList { entries } => {
            document.push_list(ListKind::Numbered, entry_items(entries));
        }
        Paragraph::Checklist { items } => {
            let mut leaves = Vec::new();
            checklist_items(items, &mut leaves);
            document.push_list(ListKind::Bulleted, leaves);
        }
    }
}

fn entry_items(entries: &[Vec<Paragraph>]) -> Vec<Vec<Leaf>> {
    let mut items = Vec::new();
    for entry in entries {
        collect_items(entry, &mut items);
    }
    items
}

fn collect_items(paragraphs: &[Paragraph], items: &mut Vec<Vec<Leaf>>) {
    for paragraph in paragraphs {
        match paragraph {
            Paragraph::Text { content }
            | Paragraph::CodeBlock { content }
            | Paragraph::Header1 { content }
            | Paragraph::Header2 { content }
            | Paragraph::Header3 { content } => items.push(leaves_from_spans(content)),
            Paragraph::Quote { children } => collect_items(children, items),
            Paragraph::OrderedList { entries } | Paragraph::UnorderedList { entries } => {
                for entry in entries {
                    collect_items(entry, items);
                }
            }
            Paragraph::Checklist { items: checklist } => checklist_items(checklist, items),
        }
    }
}

fn checklist_items(checklist: &[ChecklistItem], items: &mut Vec<Vec<Leaf>>) {
    for item in checklist {
        items.push(leaves_from_spans(&item.content));
        checklist_items(&item.children, items);
    }
}

fn leaves_from_spans(spans: &[Span]) -> Vec<Leaf> {
    let mut leaves = Vec::new();
    for span in spans {
        collect_span(span, Marks::empty(), &mut leaves);
    }
    normalize_leaves(&mut leaves);
    leaves
}

fn collect_span(span: &Span, marks: Marks, leaves: &mut Vec<Leaf>) {
    let marks = match span.style {
        InlineStyle::Bold => marks.with(Mark::Bold),
        InlineStyle::Italic => marks.with(Mark::Italic),
        InlineStyle::Underline => marks.with(Mark::Underline),
        _ => marks,
    };
    if !span.text.is_empty() {
        leaves.push(Leaf::new(span.text.as_str(), marks));
    }
    for child in &span.children {
        collect_span(child, marks, leaves);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Document {
        Document::empty()
            .with_block(TextKind::HeadingOne, vec![Leaf::plain("Title")])
            .with_block(
                TextKind::Paragraph,
                vec![
                    Leaf::plain("plain"),
                    Leaf::new("bold", Marks::of(&[Mark::Bold])),
                    Leaf::new("both", Marks::of(&[Mark::Bold, Mark::Italic])),
                ],
            )
            .with_block(TextKind::BlockQuote, vec![Leaf::plain("quoted")])
            .with_list(
                ListKind::Numbered,
                vec![vec![Leaf::plain("one")], vec![Leaf::plain("two")]],
            )
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(DocumentFormat::from_path(Path::new("a.md")), DocumentFormat::Markdown);
        assert_eq!(DocumentFormat::from_path(Path::new("a.FTML")), DocumentFormat::Ftml);
        assert_eq!(DocumentFormat::from_path(Path::new("a.html")), DocumentFormat::Html);
        assert_eq!(DocumentFormat::from_path(Path::new("notes")), DocumentFormat::Html);
    }

    #[test]
    fn tdoc_conversion_preserves_supported_content() {
        let document = sample();
        let converted = from_tdoc(&to_tdoc(&document));
        assert!(converted.content_eq(&document), "{converted:#?}");
    }

    #[test]
    fn nested_marks_become_nested_spans() {
        let span = span_from_leaf(&Leaf::new("x", Marks::of(&[Mark::Bold, Mark::Underline])));
        assert_eq!(span.style, InlineStyle::Bold);
        assert!(span.text.is_empty());
        assert_eq!(span.children.len(), 1);

        let underline = &span.children[0];
        assert_eq!(underline.style, InlineStyle::Underline);
        assert!(underline.text.is_empty());
        assert_eq!(underline.children.len(), 1);
        assert_eq!(underline.children[0].style, InlineStyle::None);
        assert_eq!(underline.children[0].text, "x");
    }

    #[test]
    fn nested_tdoc_structures_are_flattened() {
        let source = tdoc::Document::new().with_paragraphs(vec![
            Paragraph::Header3 {
                content: vec![Span::new_text("Small")],
            },
            Paragraph::new_quote().with_children(vec![
                Paragraph::new_text().with_content(vec![Span::new_text("a")]),
                Paragraph::new_text().with_content(vec![Span::new_text("b")]),
            ]),
            Paragraph::new_unordered_list().with_entries(vec![vec![
                Paragraph::new_text().with_content(vec![Span::new_text("outer")]),
                Paragraph::new_ordered_list().with_entries(vec![vec![
                    Paragraph::new_text().with_content(vec![Span::new_text("inner")]),
                ]]),
            ]]),
        ]);

        let document = from_tdoc(&source);
        assert_eq!(
            html::serialize(&document),
            "<h2>Small</h2><blockquote>a</blockquote><blockquote>b</blockquote>\
             <ul><li>outer</li><li>inner</li></ul>"
        );
    }

    #[test]
    fn ftml_round_trip() {
        let document = sample();
        let ftml = render(DocumentFormat::Ftml, &document).unwrap();
        let parsed = parse_str(DocumentFormat::Ftml, &ftml).unwrap();
        assert!(parsed.content_eq(&document), "{ftml}");
    }

    #[test]
    fn ftml_keeps_every_mark() {
        let document = Document::empty()
            .with_block(
                TextKind::Paragraph,
                vec![Leaf::new("x", Marks::of(&[Mark::Bold]))],
            )
            .with_block(
                TextKind::Paragraph,
                vec![
                    Leaf::plain("a"),
                    Leaf::new("b", Marks::of(&[Mark::Italic])),
                    Leaf::new("c", Marks::of(&[Mark::Bold, Mark::Underline])),
                ],
            );

        let ftml = render(DocumentFormat::Ftml, &document).unwrap();
        let parsed = parse_str(DocumentFormat::Ftml, &ftml).unwrap();
        assert_eq!(
            html::serialize(&parsed),
            "<p><strong>x</strong></p><p>a<em>b</em><strong><u>c</u></strong></p>",
            "{ftml}"
        );
    }

    #[test]
    fn markdown_round_trip() {
        let document = Document::empty()
            .with_block(TextKind::HeadingOne, vec![Leaf::plain("Title")])
            .with_block(TextKind::HeadingTwo, vec![Leaf::plain("Sub")])
            .with_block(
                TextKind::Paragraph,
                vec![
                    Leaf::plain("plain "),
                    Leaf::new("bold", Marks::of(&[Mark::Bold])),
                    Leaf::plain(" and "),
                    Leaf::new("it", Marks::of(&[Mark::Italic])),
                ],
            )
            .with_block(TextKind::BlockQuote, vec![Leaf::plain("quoted")])
            .with_list(
                ListKind::Bulleted,
                vec![vec![Leaf::plain("a")], vec![Leaf::plain("b")]],
            )
            .with_block(TextKind::Paragraph, vec![Leaf::plain("between")])
            .with_list(
                ListKind::Numbered,
                vec![vec![Leaf::plain("one")], vec![Leaf::plain("two")]],
            );

        let markdown = render(DocumentFormat::Markdown, &document).unwrap();
        let parsed = parse_str(DocumentFormat::Markdown, &markdown).unwrap();
        assert!(parsed.content_eq(&document), "{markdown}\n{parsed:#?}");
    }

    #[test]
    fn save_and_load_native_html() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.html");
        save(&path, DocumentFormat::Html, &sample()).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.format, DocumentFormat::Html);
        assert!(loaded.status.is_none());
        assert!(loaded.document.content_eq(&sample()));
    }

    #[test]
    fn missing_file_starts_new_document() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load(&dir.path().join("new.md")).unwrap();
        assert_eq!(loaded.format, DocumentFormat::Markdown);
        assert_eq!(loaded.status.as_deref(), Some("New document"));
        assert_eq!(loaded.document.blocks().count(), 1);
    }
}
