use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(u64);

impl From<u64> for NodeKey {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Mark {
    Bold,
    Italic,
    Underline,
}

impl Mark {
    pub const ALL: [Mark; 3] = [Mark::Bold, Mark::Italic, Mark::Underline];

    pub fn name(self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
        }
    }

    fn bit(self) -> u8 {
        match self {
            Mark::Bold => 0b001,
            Mark::Italic => 0b010,
            Mark::Underline => 0b100,
        }
    }
}

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Marks {
    bits: u8,
}

impl Marks {
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    pub fn of(marks: &[Mark]) -> Self {
        let mut set = Self::empty();
        for mark in marks {
            set.insert(*mark);
        }
        set
    }

    pub fn with(mut self, mark: Mark) -> Self {
        self.insert(mark);
        self
    }

    pub fn insert(&mut self, mark: Mark) {
        self.bits |= mark.bit();
    }

    pub fn remove(&mut self, mark: Mark) {
        self.bits &= !mark.bit();
    }

    pub fn toggle(&mut self, mark: Mark) {
        self.bits ^= mark.bit();
    }

    pub fn contains(self, mark: Mark) -> bool {
        self.bits & mark.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Mark> {
        Mark::ALL.into_iter().filter(move |mark| self.contains(*mark))
    }
}

impl fmt::Debug for Marks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextKind {
    Paragraph,
    HeadingOne,
    HeadingTwo,
    BlockQuote,
    ListItem,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ListKind {
    Bulleted,
    Numbered,
}

impl ListKind {
    pub fn other(self) -> Self {
        match self {
            ListKind::Bulleted => ListKind::Numbered,
            ListKind::Numbered => ListKind::Bulleted,
        }
    }
}

/// The full block vocabulary, as named by toolbar buttons and the
/// persisted format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockType {
    Paragraph,
    HeadingOne,
    HeadingTwo,
    BlockQuote,
    ListItem,
    BulletedList,
    NumberedList,
}

impl BlockType {
    pub fn name(self) -> &'static str {
        match self {
            BlockType::Paragraph => "paragraph",
            BlockType::HeadingOne => "heading-one",
            BlockType::HeadingTwo => "heading-two",
            BlockType::BlockQuote => "block-quote",
            BlockType::ListItem => "list-item",
            BlockType::BulletedList => "bulleted-list",
            BlockType::NumberedList => "numbered-list",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "paragraph" => Some(BlockType::Paragraph),
            "heading-one" => Some(BlockType::HeadingOne),
            "heading-two" => Some(BlockType::HeadingTwo),
            "block-quote" => Some(BlockType::BlockQuote),
            "list-item" => Some(BlockType::ListItem),
            "bulleted-list" => Some(BlockType::BulletedList),
            "numbered-list" => Some(BlockType::NumberedList),
            _ => None,
        }
    }

    pub fn text_kind(self) -> Option<TextKind> {
        match self {
            BlockType::Paragraph => Some(TextKind::Paragraph),
            BlockType::HeadingOne => Some(TextKind::HeadingOne),
            BlockType::HeadingTwo => Some(TextKind::HeadingTwo),
            BlockType::BlockQuote => Some(TextKind::BlockQuote),
            BlockType::ListItem => Some(TextKind::ListItem),
            BlockType::BulletedList | BlockType::NumberedList => None,
        }
    }

    pub fn list_kind(self) -> Option<ListKind> {
        match self {
            BlockType::BulletedList => Some(ListKind::Bulleted),
            BlockType::NumberedList => Some(ListKind::Numbered),
            _ => None,
        }
    }
}

impl From<TextKind> for BlockType {
    fn from(kind: TextKind) -> Self {
        match kind {
            TextKind::Paragraph => BlockType::Paragraph,
            TextKind::HeadingOne => BlockType::HeadingOne,
            TextKind::HeadingTwo => BlockType::HeadingTwo,
            TextKind::BlockQuote => BlockType::BlockQuote,
            TextKind::ListItem => BlockType::ListItem,
        }
    }
}

impl From<ListKind> for BlockType {
    fn from(kind: ListKind) -> Self {
        match kind {
            ListKind::Bulleted => BlockType::BulletedList,
            ListKind::Numbered => BlockType::NumberedList,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Leaf {
    pub text: String,
    pub marks: Marks,
}

impl Leaf {
    pub fn new(text: impl Into<String>, marks: Marks) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Marks::empty())
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Drops empty leaves and merges neighbours that carry the same marks.
pub fn normalize_leaves(leaves: &mut Vec<Leaf>) {
    let mut merged: Vec<Leaf> = Vec::with_capacity(leaves.len());
    for leaf in leaves.drain(..) {
        if leaf.text.is_empty() {
            continue;
        }
        match merged.last_mut() {
            Some(last) if last.marks == leaf.marks => last.text.push_str(&leaf.text),
            _ => merged.push(leaf),
        }
    }
    *leaves = merged;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextBlock {
    pub key: NodeKey,
    pub kind: TextKind,
    pub leaves: Vec<Leaf>,
}

impl TextBlock {
    pub fn text(&self) -> String {
        self.leaves.iter().map(|leaf| leaf.text.as_str()).collect()
    }

    pub fn char_len(&self) -> usize {
        self.leaves.iter().map(Leaf::char_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.iter().all(|leaf| leaf.text.is_empty())
    }

    /// Marks in effect for text typed at `offset`: those of the character
    /// before the offset, or of the first character at the block start.
    pub fn marks_at(&self, offset: usize) -> Marks {
        let mut consumed = 0;
        for leaf in &self.leaves {
            let len = leaf.char_len();
            if offset <= consumed + len && (offset > consumed || consumed == 0) && len > 0 {
                return leaf.marks;
            }
            consumed += len;
        }
        Marks::empty()
    }

    fn content_eq(&self, other: &TextBlock) -> bool {
        self.kind == other.kind && self.leaves == other.leaves
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListBlock {
    pub key: NodeKey,
    pub kind: ListKind,
    pub items: Vec<TextBlock>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    Text(TextBlock),
    List(ListBlock),
}

impl Node {
    pub fn key(&self) -> NodeKey {
        match self {
            Node::Text(block) => block.key,
            Node::List(list) => list.key,
        }
    }

    pub fn block_type(&self) -> BlockType {
        match self {
            Node::Text(block) => block.kind.into(),
            Node::List(list) => list.kind.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockLocation {
    pub node: usize,
    pub item: Option<usize>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub nodes: Vec<Node>,
    next_key: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut document = Self::empty();
        let block = document.new_block(TextKind::Paragraph, Vec::new());
        document.nodes.push(Node::Text(block));
        document
    }

    /// A document without nodes. Callers must add at least one block before
    /// handing it to the editor; normalisation does so otherwise.
    pub fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            next_key: 0,
        }
    }

    pub fn generate_key(&mut self) -> NodeKey {
        let key = NodeKey(self.next_key);
        self.next_key += 1;
        key
    }

    pub fn new_block(&mut self, kind: TextKind, leaves: Vec<Leaf>) -> TextBlock {
        TextBlock {
            key: self.generate_key(),
            kind,
            leaves,
        }
    }

    pub fn new_list(&mut self, kind: ListKind, items: Vec<TextBlock>) -> ListBlock {
        ListBlock {
            key: self.generate_key(),
            kind,
            items,
        }
    }

    pub fn push_block(&mut self, kind: TextKind, leaves: Vec<Leaf>) -> NodeKey {
        let block = self.new_block(kind, leaves);
        let key = block.key;
        self.nodes.push(Node::Text(block));
        key
    }

    pub fn push_list(&mut self, kind: ListKind, items: Vec<Vec<Leaf>>) -> NodeKey {
        let items = items
            .into_iter()
            .map(|leaves| self.new_block(TextKind::ListItem, leaves))
            .collect();
        let list = self.new_list(kind, items);
        let key = list.key;
        self.nodes.push(Node::List(list));
        key
    }

    pub fn with_block(mut self, kind: TextKind, leaves: Vec<Leaf>) -> Self {
        self.push_block(kind, leaves);
        self
    }

    pub fn with_list(mut self, kind: ListKind, items: Vec<Vec<Leaf>>) -> Self {
        self.push_list(kind, items);
        self
    }

    pub fn blocks(&self) -> impl Iterator<Item = &TextBlock> {
        self.nodes.iter().flat_map(|node| match node {
            Node::Text(block) => std::slice::from_ref(block).iter(),
            Node::List(list) => list.items.iter(),
        })
    }

    pub fn block_keys(&self) -> Vec<NodeKey> {
        self.blocks().map(|block| block.key).collect()
    }

    pub fn block_index(&self, key: NodeKey) -> Option<usize> {
        self.blocks().position(|block| block.key == key)
    }

    pub fn locate(&self, key: NodeKey) -> Option<BlockLocation> {
        for (node_index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Text(block) if block.key == key => {
                    return Some(BlockLocation {
                        node: node_index,
                        item: None,
                    });
                }
                Node::Text(_) => {}
                Node::List(list) => {
                    if let Some(item) = list.items.iter().position(|item| item.key == key) {
                        return Some(BlockLocation {
                            node: node_index,
                            item: Some(item),
                        });
                    }
                }
            }
        }
        None
    }

    pub fn block(&self, key: NodeKey) -> Option<&TextBlock> {
        let location = self.locate(key)?;
        self.block_at(location)
    }

    pub fn block_mut(&mut self, key: NodeKey) -> Option<&mut TextBlock> {
        let location = self.locate(key)?;
        match (self.nodes.get_mut(location.node)?, location.item) {
            (Node::Text(block), None) => Some(block),
            (Node::List(list), Some(item)) => list.items.get_mut(item),
            _ => None,
        }
    }

    fn block_at(&self, location: BlockLocation) -> Option<&TextBlock> {
        match (self.nodes.get(location.node)?, location.item) {
            (Node::Text(block), None) => Some(block),
            (Node::List(list), Some(item)) => list.items.get(item),
            _ => None,
        }
    }

    pub fn closest_list(&self, key: NodeKey) -> Option<&ListBlock> {
        let location = self.locate(key)?;
        location.item?;
        match self.nodes.get(location.node)? {
            Node::List(list) => Some(list),
            Node::Text(_) => None,
        }
    }

    pub fn first_block(&self) -> Option<&TextBlock> {
        self.blocks().next()
    }

    pub fn last_block(&self) -> Option<&TextBlock> {
        self.blocks().last()
    }

    pub fn text(&self) -> String {
        self.blocks()
            .map(TextBlock::text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Compares structure, types, text and marks; node keys are ignored.
    pub fn content_eq(&self, other: &Document) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|pair| match pair {
                    (Node::Text(a), Node::Text(b)) => a.content_eq(b),
                    (Node::List(a), Node::List(b)) => {
                        a.kind == b.kind
                            && a.items.len() == b.items.len()
                            && a.items.iter().zip(&b.items).all(|(x, y)| x.content_eq(y))
                    }
                    _ => false,
                })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_scoped_to_the_document() {
        let first = Document::new();
        let second = Document::new();
        assert_eq!(first.block_keys(), second.block_keys());
    }

    #[test]
    fn blocks_iterate_list_items_in_order() {
        let document = Document::empty()
            .with_block(TextKind::HeadingOne, vec![Leaf::plain("Title")])
            .with_list(
                ListKind::Bulleted,
                vec![vec![Leaf::plain("one")], vec![Leaf::plain("two")]],
            )
            .with_block(TextKind::Paragraph, vec![Leaf::plain("tail")]);

        let texts = document.blocks().map(TextBlock::text).collect::<Vec<_>>();
        assert_eq!(texts, vec!["Title", "one", "two", "tail"]);

        let two = document.blocks().nth(2).map(|block| block.key).unwrap();
        assert_eq!(
            document.locate(two),
            Some(BlockLocation {
                node: 1,
                item: Some(1)
            })
        );
        assert_eq!(
            document.closest_list(two).map(|list| list.kind),
            Some(ListKind::Bulleted)
        );
    }

    #[test]
    fn marks_at_prefers_preceding_character() {
        let mut document = Document::empty();
        let key = document.push_block(
            TextKind::Paragraph,
            vec![
                Leaf::new("bold", Marks::of(&[Mark::Bold])),
                Leaf::plain(" plain"),
            ],
        );
        let block = document.block(key).unwrap();
        assert_eq!(block.marks_at(0), Marks::of(&[Mark::Bold]));
        assert_eq!(block.marks_at(4), Marks::of(&[Mark::Bold]));
        assert_eq!(block.marks_at(5), Marks::empty());
    }

    #[test]
    fn content_eq_ignores_keys() {
        let mut a = Document::empty();
        a.generate_key();
        a.push_block(TextKind::Paragraph, vec![Leaf::plain("x")]);
        let b = Document::empty().with_block(TextKind::Paragraph, vec![Leaf::plain("x")]);
        assert_ne!(a, b);
        assert!(a.content_eq(&b));
    }

    #[test]
    fn block_type_names_round_trip() {
        for kind in [
            BlockType::Paragraph,
            BlockType::HeadingOne,
            BlockType::HeadingTwo,
            BlockType::BlockQuote,
            BlockType::ListItem,
            BlockType::BulletedList,
            BlockType::NumberedList,
        ] {
            assert_eq!(BlockType::from_name(kind.name()), Some(kind));
        }
        assert_eq!(BlockType::from_name("code"), None);
    }
}
