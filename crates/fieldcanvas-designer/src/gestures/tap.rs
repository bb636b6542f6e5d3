use fieldcanvas_core::FieldKey;

use crate::hit_test::TouchTarget;

/// State a tap is resolved against. `target` is derived at the release point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TapContext {
    pub target: TouchTarget,
    pub editing: bool,
    pub menu_open: bool,
    pub multi_select: bool,
    pub has_selection: bool,
    /// A field was deleted within the recent-delete window.
    pub recently_deleted: bool,
}

/// The one thing a tap does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapAction {
    None,
    BlurEdit,
    ToggleMulti(FieldKey),
    OpenMenu(FieldKey),
    CloseMenu,
    Deselect,
    CreateField,
}

pub fn resolve_tap(ctx: &TapContext) -> TapAction {
    match ctx.target {
        TouchTarget::Menu => TapAction::None,
        _ if ctx.editing => TapAction::BlurEdit,
        TouchTarget::Field(key) if ctx.multi_select => TapAction::ToggleMulti(key),
        TouchTarget::Field(key) => TapAction::OpenMenu(key),
        TouchTarget::Document if ctx.menu_open => TapAction::CloseMenu,
        TouchTarget::Document if ctx.has_selection => TapAction::Deselect,
        TouchTarget::Document if ctx.recently_deleted => TapAction::None,
        TouchTarget::Document => TapAction::CreateField,
    }
}
