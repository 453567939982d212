mod tokens;

use html_escape::encode_text;
use tracing::trace;

use crate::document::{
    Document, Leaf, ListKind, Mark, Marks, Node, TextBlock, TextKind, normalize_leaves,
};
use tokens::{Token, tokenize};

pub const EMPTY_DOCUMENT: &str = "<p></p>";

pub fn deserialize(html: &str) -> Document {
    let tree = build_tree(tokenize(html));
    let mut builder = DocumentBuilder {
        document: Document::empty(),
        nodes: Vec::new(),
    };
    builder.blocks_from(&tree, None);
    builder.finish()
}

pub fn serialize(document: &Document) -> String {
    let mut out = String::new();
    for node in &document.nodes {
        match node {
            Node::Text(block) => write_block(block, &mut out),
            Node::List(list) => {
                let tag = list_tag(list.kind);
                out.push('<');
                out.push_str(tag);
                out.push('>');
                for item in &list.items {
                    write_block(item, &mut out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
    out
}

fn block_tag(kind: TextKind) -> &'static str {
    match kind {
        TextKind::Paragraph => "p",
        TextKind::HeadingOne => "h1",
        TextKind::HeadingTwo => "h2",
        TextKind::BlockQuote => "blockquote",
        TextKind::ListItem => "li",
    }
}

fn list_tag(kind: ListKind) -> &'static str {
    match kind {
        ListKind::Bulleted => "ul",
        ListKind::Numbered => "ol",
    }
}

fn mark_tag(mark: Mark) -> &'static str {
    match mark {
        Mark::Bold => "strong",
        Mark::Italic => "em",
        Mark::Underline => "u",
    }
}

fn write_block(block: &TextBlock, out: &mut String) {
    let tag = block_tag(block.kind);
    out.push('<');
    out.push_str(tag);
    out.push('>');
    for leaf in &block.leaves {
        write_leaf(leaf, out);
    }
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_leaf(leaf: &Leaf, out: &mut String) {
    for mark in leaf.marks.iter() {
        out.push('<');
        out.push_str(mark_tag(mark));
        out.push('>');
    }
    for (idx, line) in leaf.text.split('\n').enumerate() {
        if idx > 0 {
            out.push_str("<br>");
        }
        out.push_str(&encode_text(line));
    }
    let marks = leaf.marks.iter().collect::<Vec<_>>();
    for mark in marks.into_iter().rev() {
        out.push_str("</");
        out.push_str(mark_tag(mark));
        out.push('>');
    }
}

#[derive(Debug)]
enum HtmlNode {
    Element { name: String, children: Vec<HtmlNode> },
    Text(String),
}

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const INLINE_ELEMENTS: &[&str] = &[
    "a", "abbr", "b", "big", "br", "cite", "code", "del", "em", "font", "i", "ins", "kbd",
    "label", "mark", "q", "s", "samp", "small", "span", "strike", "strong", "sub", "sup", "time",
    "tt", "u", "var",
];

const IGNORED_ELEMENTS: &[&str] = &[
    "script", "style", "head", "title", "meta", "link", "hr", "img", "input", "template",
    "iframe", "object", "embed", "svg", "noscript", "base",
];

fn is_inline(name: &str) -> bool {
    INLINE_ELEMENTS.contains(&name)
}

fn is_ignored(name: &str) -> bool {
    IGNORED_ELEMENTS.contains(&name)
}

fn is_block(node: &HtmlNode) -> bool {
    match node {
        HtmlNode::Element { name, .. } => !is_inline(name) && !is_ignored(name),
        HtmlNode::Text(_) => false,
    }
}

/// Builds an element tree with the recovery rules a browser would apply to
/// the tags that matter here: an open `<p>` closes before another block,
/// an open `<li>` closes before its next sibling item, unmatched closing
/// tags are ignored and everything still open at the end is closed.
fn build_tree(tokens: Vec<Token>) -> Vec<HtmlNode> {
    let mut stack: Vec<(String, Vec<HtmlNode>)> = vec![(String::new(), Vec::new())];

    fn close_top(stack: &mut Vec<(String, Vec<HtmlNode>)>) {
        if stack.len() > 1 {
            if let Some((name, children)) = stack.pop() {
                if let Some((_, parent)) = stack.last_mut() {
                    parent.push(HtmlNode::Element { name, children });
                }
            }
        }
    }

    for token in tokens {
        match token {
            Token::Text(text) => {
                if let Some((_, children)) = stack.last_mut() {
                    children.push(HtmlNode::Text(text));
                }
            }
            Token::Open { name, self_closing } => {
                let opens_block = !is_inline(&name) && !is_ignored(&name);
                if opens_block && stack.last().is_some_and(|(top, _)| top == "p") {
                    close_top(&mut stack);
                }
                if name == "li" {
                    let open_item = stack.iter().rposition(|(open, _)| open == "li");
                    let open_list = stack
                        .iter()
                        .rposition(|(open, _)| open == "ul" || open == "ol");
                    if let Some(item) = open_item {
                        if open_list.is_none_or(|list| list < item) {
                            while stack.len() > item {
                                close_top(&mut stack);
                            }
                        }
                    }
                }
                if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
                    if let Some((_, children)) = stack.last_mut() {
                        children.push(HtmlNode::Element {
                            name,
                            children: Vec::new(),
                        });
                    }
                } else {
                    stack.push((name, Vec::new()));
                }
            }
            Token::Close { name } => {
                if let Some(idx) = stack.iter().skip(1).rposition(|(open, _)| *open == name) {
                    while stack.len() > idx + 1 {
                        close_top(&mut stack);
                    }
                } else {
                    trace!(tag = %name, "ignoring unmatched closing tag");
                }
            }
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    stack.pop().map(|(_, children)| children).unwrap_or_default()
}

struct DocumentBuilder {
    document: Document,
    nodes: Vec<Node>,
}

impl DocumentBuilder {
    fn finish(mut self) -> Document {
        if self.nodes.is_empty() {
            let block = self.document.new_block(TextKind::Paragraph, Vec::new());
            self.nodes.push(Node::Text(block));
        }
        self.document.nodes = self.nodes;
        self.document
    }

    /// Converts a sequence of sibling nodes. Runs of inline content between
    /// blocks become blocks of `inherit` (paragraph at the top level);
    /// whitespace-only runs are dropped.
    fn blocks_from(&mut self, nodes: &[HtmlNode], inherit: Option<TextKind>) {
        let mut run: Vec<&HtmlNode> = Vec::new();
        for node in nodes {
            if is_block(node) {
                self.flush_run(&mut run, inherit);
                self.block_element(node, inherit);
            } else {
                run.push(node);
            }
        }
        self.flush_run(&mut run, inherit);
    }

    fn flush_run(&mut self, run: &mut Vec<&HtmlNode>, inherit: Option<TextKind>) {
        if run.is_empty() {
            return;
        }
        let mut leaves = Vec::new();
        for node in run.drain(..) {
            collect_leaves(node, Marks::empty(), &mut leaves);
        }
        normalize_leaves(&mut leaves);
        if leaves.iter().all(|leaf| leaf.text.trim().is_empty()) {
            return;
        }
        self.push_text(inherit.unwrap_or(TextKind::Paragraph), leaves);
    }

    fn block_element(&mut self, node: &HtmlNode, inherit: Option<TextKind>) {
        let HtmlNode::Element { name, children } = node else {
            return;
        };
        match name.as_str() {
            "ul" => self.list(ListKind::Bulleted, children),
            "ol" => self.list(ListKind::Numbered, children),
            "li" => {
                let items = self.list_items(std::slice::from_ref(node));
                self.push_items(ListKind::Bulleted, items, true);
            }
            _ => {
                let kind = match name.as_str() {
                    "h1" => TextKind::HeadingOne,
                    "h2" => TextKind::HeadingTwo,
                    "blockquote" => TextKind::BlockQuote,
                    _ => inherit.unwrap_or(TextKind::Paragraph),
                };
                if children.iter().any(is_block) {
                    self.blocks_from(children, Some(kind));
                } else {
                    let mut leaves = Vec::new();
                    for child in children {
                        collect_leaves(child, Marks::empty(), &mut leaves);
                    }
                    normalize_leaves(&mut leaves);
                    self.push_text(kind, leaves);
                }
            }
        }
    }

    fn list(&mut self, kind: ListKind, children: &[HtmlNode]) {
        let items = self.list_items(children);
        self.push_items(kind, items, false);
    }

    fn list_items(&mut self, children: &[HtmlNode]) -> Vec<TextBlock> {
        let mut items = Vec::new();
        let mut run: Vec<&HtmlNode> = Vec::new();
        for child in children {
            match child {
                HtmlNode::Element { name, children } if name == "li" => {
                    self.flush_item_run(&mut run, &mut items);
                    if children.iter().any(is_block) {
                        self.nested_items(children, &mut items);
                    } else {
                        let mut leaves = Vec::new();
                        for grandchild in children {
                            collect_leaves(grandchild, Marks::empty(), &mut leaves);
                        }
                        normalize_leaves(&mut leaves);
                        items.push(self.document.new_block(TextKind::ListItem, leaves));
                    }
                }
                HtmlNode::Element { name, children } if name == "ul" || name == "ol" => {
                    self.flush_item_run(&mut run, &mut items);
                    let nested = self.list_items(children);
                    items.extend(nested);
                }
                other if is_block(other) => {
                    self.flush_item_run(&mut run, &mut items);
                    self.nested_items(std::slice::from_ref(other), &mut items);
                }
                other => run.push(other),
            }
        }
        self.flush_item_run(&mut run, &mut items);
        items
    }

    fn nested_items(&mut self, nodes: &[HtmlNode], items: &mut Vec<TextBlock>) {
        let outer = std::mem::take(&mut self.nodes);
        self.blocks_from(nodes, Some(TextKind::ListItem));
        let nested = std::mem::replace(&mut self.nodes, outer);
        for node in nested {
            match node {
                Node::Text(mut block) => {
                    block.kind = TextKind::ListItem;
                    items.push(block);
                }
                Node::List(list) => items.extend(list.items),
            }
        }
    }

    fn flush_item_run(&mut self, run: &mut Vec<&HtmlNode>, items: &mut Vec<TextBlock>) {
        if run.is_empty() {
            return;
        }
        let mut leaves = Vec::new();
        for node in run.drain(..) {
            collect_leaves(node, Marks::empty(), &mut leaves);
        }
        normalize_leaves(&mut leaves);
        if leaves.iter().any(|leaf| !leaf.text.trim().is_empty()) {
            items.push(self.document.new_block(TextKind::ListItem, leaves));
        }
    }

    fn push_items(&mut self, kind: ListKind, items: Vec<TextBlock>, merge_with_previous: bool) {
        if items.is_empty() {
            return;
        }
        if merge_with_previous {
            if let Some(Node::List(previous)) = self.nodes.last_mut() {
                if previous.kind == kind {
                    previous.items.extend(items);
                    return;
                }
            }
        }
        let list = self.document.new_list(kind, items);
        self.nodes.push(Node::List(list));
    }

    fn push_text(&mut self, kind: TextKind, leaves: Vec<Leaf>) {
        let block = self.document.new_block(kind, leaves);
        if kind == TextKind::ListItem {
            self.push_items(ListKind::Bulleted, vec![block], true);
        } else {
            self.nodes.push(Node::Text(block));
        }
    }
}

fn collect_leaves(node: &HtmlNode, marks: Marks, leaves: &mut Vec<Leaf>) {
    match node {
        HtmlNode::Text(text) => leaves.push(Leaf::new(text.clone(), marks)),
        HtmlNode::Element { name, children } => {
            if name == "br" {
                leaves.push(Leaf::new("\n", marks));
                return;
            }
            if is_ignored(name) {
                return;
            }
            let marks = match name.as_str() {
                "strong" | "b" => marks.with(Mark::Bold),
                "em" | "i" => marks.with(Mark::Italic),
                "u" => marks.with(Mark::Underline),
                _ => marks,
            };
            for child in children {
                collect_leaves(child, marks, leaves);
            }
        }
    }
}

#[cfg(test)]
#[path = "html_tests.rs"]
mod html_tests;
