use crate::editor::EditorState;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MenuSize {
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectionRect {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollOffset {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MenuPlacement {
    Hidden,
    Visible { top: i32, left: i32 },
}

/// Computes where the menu goes for the current state.
///
/// Returns `None` when there is nothing to position: no menu is mounted or
/// the surface reports no selection rectangle.
pub fn place_menu(
    state: &EditorState,
    menu: Option<MenuSize>,
    rect: Option<SelectionRect>,
    scroll: ScrollOffset,
) -> Option<MenuPlacement> {
    let menu = menu?;
    if state.is_blurred() || state.is_empty() {
        return Some(MenuPlacement::Hidden);
    }
    let rect = rect?;
    Some(MenuPlacement::Visible {
        top: rect.top + scroll.y - menu.height,
        left: rect.left + scroll.x - menu.width / 2 + rect.width / 2,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::Command;
    use crate::editor::apply;

    const MENU: MenuSize = MenuSize {
        width: 20,
        height: 3,
    };

    fn selected() -> EditorState {
        apply(&EditorState::from_html("<p>hello</p>"), &Command::SelectAll)
    }

    #[test]
    fn centers_menu_above_selection() {
        let rect = SelectionRect {
            top: 10,
            left: 30,
            width: 8,
            height: 1,
        };
        let scroll = ScrollOffset { x: 0, y: 5 };
        assert_eq!(
            place_menu(&selected(), Some(MENU), Some(rect), scroll),
            Some(MenuPlacement::Visible { top: 12, left: 24 })
        );
    }

    #[test]
    fn may_place_menu_off_screen() {
        let rect = SelectionRect {
            top: 1,
            left: 2,
            width: 2,
            height: 1,
        };
        assert_eq!(
            place_menu(&selected(), Some(MENU), Some(rect), ScrollOffset::default()),
            Some(MenuPlacement::Visible { top: -2, left: -7 })
        );
    }

    #[test]
    fn hidden_for_caret_or_blurred_editor() {
        let rect = Some(SelectionRect::default());
        let caret = EditorState::from_html("<p>hello</p>");
        assert_eq!(
            place_menu(&caret, Some(MENU), rect, ScrollOffset::default()),
            Some(MenuPlacement::Hidden)
        );

        let blurred = apply(&selected(), &Command::Blur);
        assert_eq!(
            place_menu(&blurred, Some(MENU), rect, ScrollOffset::default()),
            Some(MenuPlacement::Hidden)
        );
    }

    #[test]
    fn no_op_without_menu_or_rect() {
        let rect = Some(SelectionRect::default());
        assert_eq!(place_menu(&selected(), None, rect, ScrollOffset::default()), None);
        assert_eq!(
            place_menu(&selected(), Some(MENU), None, ScrollOffset::default()),
            None
        );
    }
}
