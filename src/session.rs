//! Per-document state: placements, the stamp image cache and the viewport
//!
//! The GUI layer feeds user actions in as [`Command`]s and gets back the
//! [`Effect`]s it has to act on. Cache invalidation is handled here so a
//! color change can never reach the renderer without clearing stale images.

use std::sync::Arc;

use log::{debug, info};

use crate::error::{Result, StampError};
use crate::settings::Settings;
use crate::stamp::{Bitmap, Color, ImageCache};
use crate::viewport::{
    Annotations, HistoryChange, PlacementId, Point, Rect, Size, StampPlacement,
};

/// Commands that modify session state
#[derive(Clone, Debug)]
pub enum Command {
    /// The viewport changed size
    Resize(Size),
    /// Show another page
    GoToPage(usize),
    /// A stamp image was dropped onto the viewport
    DropStamp { stamp: Arc<Bitmap>, at: Point },
    /// Tint a placement
    SetColor { id: PlacementId, color: Color },
    /// Render a placement unmodified again
    ResetColor(PlacementId),
    /// Delete a placement
    Remove(PlacementId),
    /// Revert the last add or remove
    Undo,
    /// Reapply the last undone add or remove
    Redo,
    /// Primary button pressed
    Press(Point),
    /// Pointer moved with the primary button held
    Drag(Point),
    /// Primary button released
    Release,
    /// Pointer moved without a button held
    Hover(Point),
    /// The document was reloaded from disk
    Reload,
    /// The document was closed
    Close,
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// The stamp image cache was cleared
    InvalidateCache,
    /// The current page must be repainted
    RenderCurrentPage,
    /// A placement was created
    Added(PlacementId),
    /// A placement was deleted
    Removed(PlacementId),
}

/// A placement ready to be painted
#[derive(Clone, Debug)]
pub struct RenderedStamp {
    pub id: PlacementId,
    /// Where to draw, in viewport pixels
    pub rect: Rect,
    /// Scaled and tinted image, shared with the cache
    pub image: Arc<Bitmap>,
    pub selected: bool,
}

/// Everything belonging to the currently open document
pub struct DocumentSession {
    annotations: Annotations,
    cache: ImageCache,
    viewport: Size,
    current_page: usize,
    default_stamp_width: f64,
}

impl DocumentSession {
    #[must_use]
    pub fn new(settings: &Settings, viewport: Size) -> Self {
        Self {
            annotations: Annotations::new(settings.edit_limits()),
            cache: settings.image_cache(),
            viewport,
            current_page: 0,
            default_stamp_width: settings.default_stamp_width,
        }
    }

    #[must_use]
    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }

    #[must_use]
    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    #[must_use]
    pub fn viewport(&self) -> Size {
        self.viewport
    }

    #[must_use]
    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Apply a command and return the effects the caller has to act on.
    ///
    /// `InvalidateCache` has already been carried out when it is returned.
    pub fn apply(&mut self, cmd: Command) -> Result<Vec<Effect>> {
        let effects = match cmd {
            Command::Resize(size) => {
                if self.viewport != size {
                    self.viewport = size;
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::GoToPage(page) => {
                if self.current_page != page {
                    self.current_page = page;
                    self.annotations.clear_state();
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::DropStamp { stamp, at } => {
                let placement = StampPlacement::dropped_at(
                    self.current_page,
                    stamp,
                    at,
                    self.default_stamp_width,
                    self.viewport,
                )?;
                let id = self.annotations.add(placement);
                vec![Effect::Added(id), Effect::RenderCurrentPage]
            }

            Command::SetColor { id, color } => {
                let placement = self
                    .annotations
                    .get_mut(id)
                    .ok_or(StampError::UnknownPlacement(id))?;
                if placement.set_color(color) {
                    debug!("Placement {id:?} color set to {color}");
                    vec![Effect::InvalidateCache, Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::ResetColor(id) => {
                let placement = self
                    .annotations
                    .get_mut(id)
                    .ok_or(StampError::UnknownPlacement(id))?;
                if placement.reset_color() {
                    debug!("Placement {id:?} color reset");
                    vec![Effect::InvalidateCache, Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::Remove(id) => {
                self.annotations.remove(id)?;
                vec![Effect::Removed(id), Effect::RenderCurrentPage]
            }

            Command::Undo => history_effects(self.annotations.undo()),

            Command::Redo => history_effects(self.annotations.redo()),

            Command::Press(point) => {
                let before = self.annotations.selected();
                let pressed = self.annotations.press(point, self.current_page, self.viewport)?;
                if pressed.is_some() || before.is_some() {
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::Drag(point) => match self.annotations.drag_to(point, self.viewport)? {
                Some(_) => vec![Effect::RenderCurrentPage],
                None => vec![],
            },

            Command::Release => {
                self.annotations.end_drag();
                vec![]
            }

            Command::Hover(point) => {
                let hovered =
                    self.annotations
                        .placement_at(point, self.current_page, self.viewport)?;
                if self.annotations.update_hover(hovered) {
                    vec![Effect::RenderCurrentPage]
                } else {
                    vec![]
                }
            }

            Command::Reload => vec![Effect::InvalidateCache, Effect::RenderCurrentPage],

            Command::Close => {
                info!(
                    "Closing document with {} stamp placements",
                    self.annotations.len()
                );
                self.annotations.clear();
                self.current_page = 0;
                vec![Effect::InvalidateCache, Effect::RenderCurrentPage]
            }
        };

        if effects.contains(&Effect::InvalidateCache) {
            self.cache.clear();
        }

        Ok(effects)
    }

    /// Images and rectangles for every placement on the current page,
    /// bottom to top.
    ///
    /// Fails with `DegenerateViewport` when there is nothing to draw into;
    /// the caller skips the frame. Placements too small to cover a pixel
    /// are left out.
    pub fn render_page(&self) -> Result<Vec<RenderedStamp>> {
        let selected = self.annotations.selected();
        let mut out = Vec::new();

        for (id, placement) in self.annotations.for_page(self.current_page) {
            let rect = placement.absolute_rect(self.viewport)?;
            let request = placement.render_request(self.viewport)?;
            let image = match self.cache.render(&request) {
                Ok(image) => image,
                Err(StampError::InvalidDimension { width, height }) => {
                    debug!("Skipping placement {id:?} rendered at {width}x{height}");
                    continue;
                }
                Err(e) => return Err(e),
            };
            out.push(RenderedStamp {
                id,
                rect,
                image,
                selected: selected == Some(id),
            });
        }

        Ok(out)
    }
}

fn history_effects(change: Option<HistoryChange>) -> Vec<Effect> {
    match change {
        Some(HistoryChange::Added(id)) => vec![Effect::Added(id), Effect::RenderCurrentPage],
        Some(HistoryChange::Removed(id)) => vec![Effect::Removed(id), Effect::RenderCurrentPage],
        None => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> DocumentSession {
        DocumentSession::new(&Settings::default(), Size::new(800.0, 600.0))
    }

    fn stamp() -> Arc<Bitmap> {
        Arc::new(Bitmap::from_pixels(2, 1, &[[10, 10, 10, 255], [200, 200, 200, 255]]).unwrap())
    }

    fn drop_one(s: &mut DocumentSession) -> PlacementId {
        let effects = s
            .apply(Command::DropStamp {
                stamp: stamp(),
                at: Point::new(400.0, 300.0),
            })
            .unwrap();
        match effects[0] {
            Effect::Added(id) => id,
            ref other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn set_color_invalidates_and_renders() {
        let mut s = session();
        let id = drop_one(&mut s);
        s.render_page().unwrap();
        assert!(!s.cache().is_empty());

        let effects = s.apply(Command::SetColor { id, color: Color::RED }).unwrap();
        assert_eq!(effects, vec![Effect::InvalidateCache, Effect::RenderCurrentPage]);
        assert!(s.cache().is_empty());
    }

    #[test]
    fn same_color_twice_is_a_no_op() {
        let mut s = session();
        let id = drop_one(&mut s);
        s.apply(Command::SetColor { id, color: Color::RED }).unwrap();
        let effects = s.apply(Command::SetColor { id, color: Color::RED }).unwrap();
        assert!(effects.is_empty());
    }

    #[test]
    fn reset_color_invalidates_only_when_tinted() {
        let mut s = session();
        let id = drop_one(&mut s);
        assert!(s.apply(Command::ResetColor(id)).unwrap().is_empty());

        s.apply(Command::SetColor { id, color: Color::BLUE }).unwrap();
        let effects = s.apply(Command::ResetColor(id)).unwrap();
        assert_eq!(effects, vec![Effect::InvalidateCache, Effect::RenderCurrentPage]);
    }

    #[test]
    fn resize_does_not_invalidate() {
        let mut s = session();
        drop_one(&mut s);
        s.render_page().unwrap();

        let effects = s.apply(Command::Resize(Size::new(400.0, 300.0))).unwrap();
        assert_eq!(effects, vec![Effect::RenderCurrentPage]);
        assert_eq!(s.cache().len(), 1);
        assert!(s.apply(Command::Resize(Size::new(400.0, 300.0))).unwrap().is_empty());
    }

    #[test]
    fn rendered_stamp_is_tinted_and_sized() {
        let mut s = session();
        let id = drop_one(&mut s);
        s.apply(Command::SetColor { id, color: Color::RED }).unwrap();

        let stamps = s.render_page().unwrap();
        assert_eq!(stamps.len(), 1);
        let rendered = &stamps[0];
        assert_eq!(rendered.id, id);
        assert_eq!(rendered.image.dimensions(), (100, 50));
        assert!((rendered.rect.width - 100.0).abs() < 1e-9);
        assert!((rendered.rect.x - 350.0).abs() < 1e-9);
    }

    #[test]
    fn degenerate_viewport_fails_render() {
        let mut s = session();
        drop_one(&mut s);
        s.apply(Command::Resize(Size::new(0.0, 600.0))).unwrap();
        assert!(matches!(
            s.render_page(),
            Err(StampError::DegenerateViewport { .. })
        ));
    }

    #[test]
    fn close_drops_everything() {
        let mut s = session();
        drop_one(&mut s);
        s.render_page().unwrap();

        let effects = s.apply(Command::Close).unwrap();
        assert_eq!(effects, vec![Effect::InvalidateCache, Effect::RenderCurrentPage]);
        assert!(s.annotations().is_empty());
        assert!(s.cache().is_empty());
    }

    #[test]
    fn placements_are_per_page() {
        let mut s = session();
        drop_one(&mut s);
        s.apply(Command::GoToPage(3)).unwrap();
        assert!(s.render_page().unwrap().is_empty());
        s.apply(Command::GoToPage(0)).unwrap();
        assert_eq!(s.render_page().unwrap().len(), 1);
    }

    #[test]
    fn press_drag_release_moves_and_selects() {
        let mut s = session();
        let id = drop_one(&mut s);

        assert_eq!(
            s.apply(Command::Press(Point::new(400.0, 300.0))).unwrap(),
            vec![Effect::RenderCurrentPage]
        );
        s.apply(Command::Drag(Point::new(410.0, 320.0))).unwrap();
        s.apply(Command::Release).unwrap();

        let stamps = s.render_page().unwrap();
        assert!(stamps[0].selected);
        assert!((stamps[0].rect.x - 360.0).abs() < 1e-9);
        assert!((stamps[0].rect.y - 295.0).abs() < 1e-9);
        assert_eq!(s.annotations().selected(), Some(id));
    }

    #[test]
    fn undo_and_redo_report_added_and_removed() {
        let mut s = session();
        let id = drop_one(&mut s);

        assert_eq!(
            s.apply(Command::Undo).unwrap(),
            vec![Effect::Removed(id), Effect::RenderCurrentPage]
        );
        assert!(s.render_page().unwrap().is_empty());

        assert_eq!(
            s.apply(Command::Redo).unwrap(),
            vec![Effect::Added(id), Effect::RenderCurrentPage]
        );
        assert_eq!(s.render_page().unwrap().len(), 1);

        s.apply(Command::Remove(id)).unwrap();
        assert_eq!(
            s.apply(Command::Undo).unwrap(),
            vec![Effect::Added(id), Effect::RenderCurrentPage]
        );
        assert_eq!(s.annotations().len(), 1);
    }

    #[test]
    fn undo_with_empty_history_does_nothing() {
        let mut s = session();
        assert!(s.apply(Command::Undo).unwrap().is_empty());
        assert!(s.apply(Command::Redo).unwrap().is_empty());

        drop_one(&mut s);
        s.apply(Command::Close).unwrap();
        assert!(s.apply(Command::Undo).unwrap().is_empty());
    }

    #[test]
    fn unknown_placement_is_reported() {
        let mut s = session();
        let id = drop_one(&mut s);
        s.apply(Command::Remove(id)).unwrap();
        assert!(matches!(
            s.apply(Command::SetColor { id, color: Color::RED }),
            Err(StampError::UnknownPlacement(_))
        ));
    }
}
