pub mod config;
pub mod document;
pub mod editor;
pub mod format;
pub mod hover_menu;
pub mod html;
pub mod render;
pub mod selection;
pub mod theme;
