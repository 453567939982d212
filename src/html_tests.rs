use proptest::prelude::*;

use super::*;

fn texts(document: &Document) -> Vec<(TextKind, String)> {
    document
        .blocks()
        .map(|block| (block.kind, block.text()))
        .collect()
}

#[test]
fn deserializes_supported_blocks() {
    let document = deserialize(
        "<h1>Title</h1><h2>Sub</h2><p>Body</p><blockquote>Quote</blockquote>\
         <ul><li>one</li><li>two</li></ul><ol><li>first</li></ol>",
    );
    assert_eq!(document.nodes.len(), 6);
    assert_eq!(
        texts(&document),
        vec![
            (TextKind::HeadingOne, "Title".to_string()),
            (TextKind::HeadingTwo, "Sub".to_string()),
            (TextKind::Paragraph, "Body".to_string()),
            (TextKind::BlockQuote, "Quote".to_string()),
            (TextKind::ListItem, "one".to_string()),
            (TextKind::ListItem, "two".to_string()),
            (TextKind::ListItem, "first".to_string()),
        ]
    );
    let Node::List(numbered) = &document.nodes[5] else {
        panic!("expected list");
    };
    assert_eq!(numbered.kind, ListKind::Numbered);
}

#[test]
fn deserializes_marks_including_legacy_tags() {
    let document = deserialize("<p><b>bold</b> <i>it</i> <strong><em>both</em></strong><u>u</u></p>");
    let block = document.first_block().unwrap();
    let leaves = block
        .leaves
        .iter()
        .map(|leaf| (leaf.text.as_str(), leaf.marks))
        .collect::<Vec<_>>();
    assert_eq!(
        leaves,
        vec![
            ("bold", Marks::of(&[Mark::Bold])),
            (" ", Marks::empty()),
            ("it", Marks::of(&[Mark::Italic])),
            (" ", Marks::empty()),
            ("both", Marks::of(&[Mark::Bold, Mark::Italic])),
            ("u", Marks::of(&[Mark::Underline])),
        ]
    );
}

#[test]
fn serializes_marks_in_fixed_order() {
    let document = Document::empty().with_block(
        TextKind::Paragraph,
        vec![
            Leaf::plain("a & b "),
            Leaf::new("x", Marks::of(&[Mark::Underline, Mark::Bold])),
        ],
    );
    assert_eq!(
        serialize(&document),
        "<p>a &amp; b <strong><u>x</u></strong></p>"
    );
}

#[test]
fn empty_input_yields_empty_paragraph() {
    for input in ["", "   \n ", EMPTY_DOCUMENT, "<!-- nothing -->"] {
        let document = deserialize(input);
        assert_eq!(document.nodes.len(), 1, "input {input:?}");
        assert_eq!(
            texts(&document),
            vec![(TextKind::Paragraph, String::new())]
        );
        assert_eq!(serialize(&document), EMPTY_DOCUMENT);
    }
}

#[test]
fn unknown_blocks_become_paragraphs() {
    let document = deserialize("<div>one</div><h3>two</h3><section><pre>three</pre></section>");
    assert_eq!(
        texts(&document),
        vec![
            (TextKind::Paragraph, "one".to_string()),
            (TextKind::Paragraph, "two".to_string()),
            (TextKind::Paragraph, "three".to_string()),
        ]
    );
}

#[test]
fn unknown_inline_elements_keep_text() {
    let document = deserialize(r#"<p>see <a href="/x">the <code>link</code></a>!</p>"#);
    assert_eq!(
        texts(&document),
        vec![(TextKind::Paragraph, "see the link!".to_string())]
    );
    assert_eq!(document.first_block().unwrap().leaves.len(), 1);
}

#[test]
fn bare_text_between_blocks_is_wrapped() {
    let document = deserialize("intro <b>bold</b>\n<p>para</p>\n  \ntail");
    assert_eq!(
        texts(&document),
        vec![
            (TextKind::Paragraph, "intro bold\n".to_string()),
            (TextKind::Paragraph, "para".to_string()),
            (TextKind::Paragraph, "\n  \ntail".to_string()),
        ]
    );
}

#[test]
fn nested_blocks_inherit_enclosing_type() {
    let document = deserialize("<blockquote><p>first</p><p>second</p></blockquote>");
    assert_eq!(
        texts(&document),
        vec![
            (TextKind::BlockQuote, "first".to_string()),
            (TextKind::BlockQuote, "second".to_string()),
        ]
    );
}

#[test]
fn nested_lists_are_flattened() {
    let document =
        deserialize("<ul><li><p>outer</p><ul><li>inner</li></ul></li><li>last</li></ul>");
    assert_eq!(document.nodes.len(), 1);
    assert_eq!(
        texts(&document),
        vec![
            (TextKind::ListItem, "outer".to_string()),
            (TextKind::ListItem, "inner".to_string()),
            (TextKind::ListItem, "last".to_string()),
        ]
    );
}

#[test]
fn stray_list_items_are_wrapped_in_bulleted_list() {
    let document = deserialize("<li>a</li><li>b</li><p>c</p>");
    assert_eq!(document.nodes.len(), 2);
    let Node::List(list) = &document.nodes[0] else {
        panic!("expected list");
    };
    assert_eq!(list.kind, ListKind::Bulleted);
    assert_eq!(list.items.len(), 2);
}

#[test]
fn unclosed_tags_are_recovered() {
    let document = deserialize("<p>one<p>two<ul><li>a<li>b</ul><p><strong>bold");
    assert_eq!(
        texts(&document),
        vec![
            (TextKind::Paragraph, "one".to_string()),
            (TextKind::Paragraph, "two".to_string()),
            (TextKind::ListItem, "a".to_string()),
            (TextKind::ListItem, "b".to_string()),
            (TextKind::Paragraph, "bold".to_string()),
        ]
    );
}

#[test]
fn stray_closing_tags_are_ignored() {
    let document = deserialize("</div><p>text</em></p></blockquote>");
    assert_eq!(
        texts(&document),
        vec![(TextKind::Paragraph, "text".to_string())]
    );
}

#[test]
fn line_breaks_round_trip() {
    let document = deserialize("<p>one<br>two<br/>three</p>");
    assert_eq!(document.first_block().unwrap().text(), "one\ntwo\nthree");
    assert_eq!(serialize(&document), "<p>one<br>two<br>three</p>");
}

#[test]
fn scripts_and_styles_are_dropped() {
    let document = deserialize("<style>p{}</style><p>x<script>alert(1)</script></p>");
    assert_eq!(texts(&document), vec![(TextKind::Paragraph, "x".to_string())]);
}

#[test]
fn deserialization_keys_are_deterministic() {
    let input = "<p>a</p><ul><li>b</li></ul>";
    assert_eq!(deserialize(input), deserialize(input));
}

fn arb_marks() -> impl Strategy<Value = Marks> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(bold, italic, underline)| {
        let mut marks = Marks::empty();
        if bold {
            marks.insert(Mark::Bold);
        }
        if italic {
            marks.insert(Mark::Italic);
        }
        if underline {
            marks.insert(Mark::Underline);
        }
        marks
    })
}

fn arb_leaves() -> impl Strategy<Value = Vec<Leaf>> {
    prop::collection::vec(("[a-zA-Z0-9 &<>\"'.]{1,6}", arb_marks()), 0..4).prop_map(|runs| {
        let mut leaves = runs
            .into_iter()
            .map(|(text, marks)| Leaf::new(text, marks))
            .collect::<Vec<_>>();
        normalize_leaves(&mut leaves);
        leaves
    })
}

#[derive(Clone, Debug)]
enum ArbNode {
    Text(TextKind, Vec<Leaf>),
    List(ListKind, Vec<Vec<Leaf>>),
}

fn arb_node() -> impl Strategy<Value = ArbNode> {
    let text_kind = prop_oneof![
        Just(TextKind::Paragraph),
        Just(TextKind::HeadingOne),
        Just(TextKind::HeadingTwo),
        Just(TextKind::BlockQuote),
    ];
    let list_kind = prop_oneof![Just(ListKind::Bulleted), Just(ListKind::Numbered)];
    prop_oneof![
        (text_kind, arb_leaves()).prop_map(|(kind, leaves)| ArbNode::Text(kind, leaves)),
        (list_kind, prop::collection::vec(arb_leaves(), 1..4))
            .prop_map(|(kind, items)| ArbNode::List(kind, items)),
    ]
}

fn arb_document() -> impl Strategy<Value = Document> {
    prop::collection::vec(arb_node(), 1..6).prop_map(|nodes| {
        let mut document = Document::empty();
        for node in nodes {
            match node {
                ArbNode::Text(kind, leaves) => {
                    document.push_block(kind, leaves);
                }
                ArbNode::List(kind, items) => {
                    document.push_list(kind, items);
                }
            }
        }
        document
    })
}

proptest! {
    #[test]
    fn serialization_round_trips(document in arb_document()) {
        let html = serialize(&document);
        let parsed = deserialize(&html);
        prop_assert!(
            parsed.content_eq(&document),
            "round trip changed {html:?}: {:?}",
            parsed
        );
        prop_assert_eq!(serialize(&parsed), html);
    }
}
