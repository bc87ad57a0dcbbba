//! Collection of stamp placements for the open document, with hit-testing
//! and the drag/resize interaction state

use log::{debug, error};

use super::geometry::{Point, Rect, RelativePoint, RelativeRect, Size};
use super::placement::StampPlacement;
use super::tracker::{ToAbsolute, ToRelative};
use crate::error::{Result, StampError};

/// Side of the square grab handle drawn on each corner, in pixels
pub const HANDLE_SIZE: f64 = 8.0;
/// Smallest width or height a stamp can be resized to, in pixels
pub const MIN_STAMP_SIZE: f64 = 20.0;

/// Stable identifier of a placement within one collection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlacementId(pub u64);

/// Corner grab handle of a selected stamp
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeHandle {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 4] = [
        ResizeHandle::TopLeft,
        ResizeHandle::TopRight,
        ResizeHandle::BottomLeft,
        ResizeHandle::BottomRight,
    ];

    /// Corner of `rect` this handle sits on
    #[must_use]
    pub fn corner(self, rect: &Rect) -> Point {
        match self {
            ResizeHandle::TopLeft => Point::new(rect.x, rect.y),
            ResizeHandle::TopRight => Point::new(rect.right(), rect.y),
            ResizeHandle::BottomLeft => Point::new(rect.x, rect.bottom()),
            ResizeHandle::BottomRight => Point::new(rect.right(), rect.bottom()),
        }
    }

    /// Square hit area of this handle on `rect`
    #[must_use]
    pub fn area(self, rect: &Rect, handle_size: f64) -> Rect {
        let c = self.corner(rect);
        Rect::new(
            c.x - handle_size / 2.0,
            c.y - handle_size / 2.0,
            handle_size,
            handle_size,
        )
    }

    /// Handle of `rect` under `point`, if any
    #[must_use]
    pub fn at(rect: &Rect, point: Point, handle_size: f64) -> Option<ResizeHandle> {
        Self::ALL
            .into_iter()
            .find(|handle| handle.area(rect, handle_size).contains(point))
    }

    /// Resize `start` by moving this handle's corner by `delta`.
    ///
    /// The moved corner stays within `bounds`, the opposite corner stays put
    /// and neither side shrinks below `min_size`.
    #[must_use]
    pub fn apply(self, start: Rect, delta: Point, min_size: f64, bounds: Size) -> Rect {
        let corner = self.corner(&start);
        let moved = Point::new(
            (corner.x + delta.x).clamp(0.0, bounds.width.max(0.0)),
            (corner.y + delta.y).clamp(0.0, bounds.height.max(0.0)),
        );
        let delta = moved - corner;

        let (grow_w, grow_h) = match self {
            ResizeHandle::TopLeft => (-delta.x, -delta.y),
            ResizeHandle::TopRight => (delta.x, -delta.y),
            ResizeHandle::BottomLeft => (-delta.x, delta.y),
            ResizeHandle::BottomRight => (delta.x, delta.y),
        };
        let width = (start.width + grow_w).max(min_size);
        let height = (start.height + grow_h).max(min_size);

        let x = match self {
            ResizeHandle::TopLeft | ResizeHandle::BottomLeft => start.right() - width,
            ResizeHandle::TopRight | ResizeHandle::BottomRight => start.x,
        };
        let y = match self {
            ResizeHandle::TopLeft | ResizeHandle::TopRight => start.bottom() - height,
            ResizeHandle::BottomLeft | ResizeHandle::BottomRight => start.y,
        };

        Rect::new(x, y, width, height)
    }
}

/// Pixel limits for interactive editing
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EditLimits {
    pub handle_size: f64,
    pub min_stamp_size: f64,
}

impl Default for EditLimits {
    fn default() -> Self {
        Self {
            handle_size: HANDLE_SIZE,
            min_stamp_size: MIN_STAMP_SIZE,
        }
    }
}

/// In-progress drag or resize. Both anchors are viewport fractions.
#[derive(Clone, Copy, Debug)]
struct Gesture {
    id: PlacementId,
    start_pointer: RelativePoint,
    start_rect: RelativeRect,
    handle: Option<ResizeHandle>,
}

/// Result of an undo or redo step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryChange {
    /// The placement is back in the collection
    Added(PlacementId),
    /// The placement left the collection
    Removed(PlacementId),
}

/// A reversible edit. Applying one yields its inverse.
#[derive(Clone, Debug)]
enum Edit {
    Insert {
        id: PlacementId,
        index: usize,
        placement: StampPlacement,
    },
    Delete(PlacementId),
}

/// All stamp placements of the open document, in paint order
#[derive(Debug, Default)]
pub struct Annotations {
    items: Vec<(PlacementId, StampPlacement)>,
    next_id: u64,
    limits: EditLimits,
    gesture: Option<Gesture>,
    selected: Option<PlacementId>,
    hovered: Option<PlacementId>,
    undo_stack: Vec<Edit>,
    redo_stack: Vec<Edit>,
}

impl Annotations {
    #[must_use]
    pub fn new(limits: EditLimits) -> Self {
        Self {
            limits,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn limits(&self) -> EditLimits {
        self.limits
    }

    /// Add a placement on top of the existing ones
    pub fn add(&mut self, placement: StampPlacement) -> PlacementId {
        let id = PlacementId(self.next_id);
        self.next_id += 1;
        debug!("Adding stamp placement {id:?} on page {}", placement.page);
        self.items.push((id, placement));
        self.record(Edit::Delete(id));
        id
    }

    /// Remove a placement, clearing any selection or gesture that refers to it
    pub fn remove(&mut self, id: PlacementId) -> Result<StampPlacement> {
        let Some((index, placement)) = self.take(id) else {
            error!("Stamp placement {id:?} not found");
            return Err(StampError::UnknownPlacement(id));
        };
        self.record(Edit::Insert {
            id,
            index,
            placement: placement.clone(),
        });
        Ok(placement)
    }

    /// Revert the most recent add or remove
    pub fn undo(&mut self) -> Option<HistoryChange> {
        let edit = self.undo_stack.pop()?;
        let (change, inverse) = self.perform(edit)?;
        self.redo_stack.push(inverse);
        debug!("Undo: {change:?}");
        Some(change)
    }

    /// Reapply the most recently undone add or remove
    pub fn redo(&mut self) -> Option<HistoryChange> {
        let edit = self.redo_stack.pop()?;
        let (change, inverse) = self.perform(edit)?;
        self.undo_stack.push(inverse);
        debug!("Redo: {change:?}");
        Some(change)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn record(&mut self, inverse: Edit) {
        self.undo_stack.push(inverse);
        self.redo_stack.clear();
    }

    fn perform(&mut self, edit: Edit) -> Option<(HistoryChange, Edit)> {
        match edit {
            Edit::Insert {
                id,
                index,
                placement,
            } => {
                let index = index.min(self.items.len());
                self.items.insert(index, (id, placement));
                Some((HistoryChange::Added(id), Edit::Delete(id)))
            }
            Edit::Delete(id) => {
                let (index, placement) = self.take(id)?;
                Some((
                    HistoryChange::Removed(id),
                    Edit::Insert {
                        id,
                        index,
                        placement,
                    },
                ))
            }
        }
    }

    fn take(&mut self, id: PlacementId) -> Option<(usize, StampPlacement)> {
        let index = self.items.iter().position(|(item_id, _)| *item_id == id)?;

        if self.selected == Some(id) {
            self.selected = None;
        }
        if self.hovered == Some(id) {
            self.hovered = None;
        }
        if self.gesture.is_some_and(|g| g.id == id) {
            self.gesture = None;
        }

        Some((index, self.items.remove(index).1))
    }

    #[must_use]
    pub fn get(&self, id: PlacementId) -> Option<&StampPlacement> {
        self.items
            .iter()
            .find(|(item_id, _)| *item_id == id)
            .map(|(_, p)| p)
    }

    pub fn get_mut(&mut self, id: PlacementId) -> Option<&mut StampPlacement> {
        self.items
            .iter_mut()
            .find(|(item_id, _)| *item_id == id)
            .map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlacementId, &StampPlacement)> {
        self.items.iter().map(|(id, p)| (*id, p))
    }

    /// Placements on `page`, bottom to top
    pub fn for_page(&self, page: usize) -> impl Iterator<Item = (PlacementId, &StampPlacement)> {
        self.iter().filter(move |(_, p)| p.page == page)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Remove every placement, the edit history and interaction state
    pub fn clear(&mut self) {
        self.items.clear();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.clear_state();
    }

    /// Forget selection, hover and any gesture in progress
    pub fn clear_state(&mut self) {
        self.gesture = None;
        self.selected = None;
        self.hovered = None;
    }

    #[must_use]
    pub fn selected(&self) -> Option<PlacementId> {
        self.selected
    }

    #[must_use]
    pub fn hovered(&self) -> Option<PlacementId> {
        self.hovered
    }

    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.gesture.is_some()
    }

    /// Topmost placement on `page` whose on-screen rectangle contains `point`
    pub fn placement_at(&self, point: Point, page: usize, viewport: Size) -> Result<Option<PlacementId>> {
        for (id, placement) in self.items.iter().rev() {
            if placement.page == page && placement.absolute_rect(viewport)?.contains(point) {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }

    /// Resize handle of the selected placement under `point`, when that
    /// placement is on `page`
    pub fn handle_at(&self, point: Point, page: usize, viewport: Size) -> Result<Option<ResizeHandle>> {
        let Some(placement) = self
            .selected
            .and_then(|id| self.get(id))
            .filter(|p| p.page == page)
        else {
            return Ok(None);
        };
        let rect = placement.absolute_rect(viewport)?;
        Ok(ResizeHandle::at(&rect, point, self.limits.handle_size))
    }

    /// Record the hovered placement. Returns true when it changed.
    pub fn update_hover(&mut self, hovered: Option<PlacementId>) -> bool {
        if hovered != self.hovered {
            self.hovered = hovered;
            true
        } else {
            false
        }
    }

    /// Primary button pressed at `point`.
    ///
    /// Grabbing a handle of the selected stamp starts a resize, pressing on
    /// a stamp starts a drag, pressing on empty space clears the selection.
    pub fn press(&mut self, point: Point, page: usize, viewport: Size) -> Result<Option<PlacementId>> {
        if let Some(handle) = self.handle_at(point, page, viewport)? {
            if let Some(id) = self.selected {
                self.begin_resize(id, handle, point, viewport)?;
                return Ok(Some(id));
            }
        }

        match self.placement_at(point, page, viewport)? {
            Some(id) => {
                self.begin_drag(id, point, viewport)?;
                Ok(Some(id))
            }
            None => {
                self.selected = None;
                Ok(None)
            }
        }
    }

    /// Start moving placement `id` with the pointer at `pointer`
    pub fn begin_drag(&mut self, id: PlacementId, pointer: Point, viewport: Size) -> Result<()> {
        self.begin_gesture(id, None, pointer, viewport)
    }

    /// Start resizing placement `id` from `handle`
    pub fn begin_resize(
        &mut self,
        id: PlacementId,
        handle: ResizeHandle,
        pointer: Point,
        viewport: Size,
    ) -> Result<()> {
        self.begin_gesture(id, Some(handle), pointer, viewport)
    }

    fn begin_gesture(
        &mut self,
        id: PlacementId,
        handle: Option<ResizeHandle>,
        pointer: Point,
        viewport: Size,
    ) -> Result<()> {
        let placement = self.get(id).ok_or(StampError::UnknownPlacement(id))?;
        let gesture = Gesture {
            id,
            start_pointer: pointer.to_relative(viewport)?,
            start_rect: placement.relative_rect(),
            handle,
        };
        self.gesture = Some(gesture);
        self.selected = Some(id);
        Ok(())
    }

    /// Pointer moved to `pointer` while the button is held.
    ///
    /// Returns the placement that changed, if a gesture is in progress.
    /// The gesture anchors are resolved against `viewport` as it is now.
    pub fn drag_to(&mut self, pointer: Point, viewport: Size) -> Result<Option<PlacementId>> {
        let Some(gesture) = self.gesture else {
            return Ok(None);
        };

        let start_pointer = gesture.start_pointer.to_absolute(viewport)?;
        let start_rect = gesture.start_rect.to_absolute(viewport)?;
        let delta = pointer - start_pointer;

        let new_rect = match gesture.handle {
            None => Rect::new(
                start_rect.x + delta.x,
                start_rect.y + delta.y,
                start_rect.width,
                start_rect.height,
            ),
            Some(handle) => handle.apply(start_rect, delta, self.limits.min_stamp_size, viewport),
        };

        let relative = new_rect.to_relative(viewport)?;
        let relative = match gesture.handle {
            None => relative.kept_inside(),
            Some(_) => relative.clamped(),
        };

        let placement = self
            .get_mut(gesture.id)
            .ok_or(StampError::UnknownPlacement(gesture.id))?;
        placement.set_relative_rect(relative);
        Ok(Some(gesture.id))
    }

    /// Primary button released
    pub fn end_drag(&mut self) {
        self.gesture = None;
    }
}
