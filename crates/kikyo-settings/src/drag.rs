use crate::error::Result;
use crate::layout_list::{LayoutEntryList, ListSnapshot};
use crate::types::LayoutId;
use std::collections::HashMap;
use tracing::{debug, info};

pub type PointerId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Secondary,
    Middle,
}

/// A raw pointer-device event in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub pointer_id: PointerId,
    pub button: PointerButton,
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    pub fn primary(pointer_id: PointerId, x: f64, y: f64) -> Self {
        Self {
            pointer_id,
            button: PointerButton::Primary,
            x,
            y,
        }
    }
}

/// Visual side of the reorderable list.
///
/// The controller only talks to the view through this trait: input capture,
/// the per-gesture move/up/cancel listeners, row styling and hit testing.
pub trait ReorderSurface {
    fn capture_pointer(&mut self, pointer: PointerId, handle: &LayoutId);
    fn release_pointer(&mut self, pointer: PointerId);
    fn attach_gesture_listeners(&mut self, pointer: PointerId);
    fn detach_gesture_listeners(&mut self, pointer: PointerId);
    fn set_lifted(&mut self, row: &LayoutId, lifted: bool);
    fn translate_row(&mut self, row: &LayoutId, dy: f64);
    fn mark_drop_target(&mut self, row: Option<&LayoutId>);
    /// Global flag used to suppress hover affordances while dragging.
    fn set_dragging_mode(&mut self, on: bool);
    fn hit_test(&self, x: f64, y: f64) -> Option<LayoutId>;
    fn render(&mut self, snapshot: &ListSnapshot);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveDrag {
    pub pointer_id: PointerId,
    pub source: LayoutId,
    pub start_y: f64,
    /// Last row hit-tested under the pointer that differs from `source`.
    pub target: Option<LayoutId>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(ActiveDrag),
}

/// Turns pointer gestures on row handles into list reorders.
///
/// Rows only move visually while the pointer moves; the list itself is
/// reordered once, on release. Every way out of `Dragging` (release, cancel,
/// a new press, dropping the controller) goes through `end_gesture`, which
/// undoes all visual state and detaches the gesture listeners.
pub struct DragReorderController<S: ReorderSurface> {
    surface: S,
    state: DragState,
}

impl<S: ReorderSurface> DragReorderController<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            state: DragState::Idle,
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    fn gesture_for(&self, pointer_id: PointerId) -> Option<&ActiveDrag> {
        match &self.state {
            DragState::Dragging(drag) if drag.pointer_id == pointer_id => Some(drag),
            _ => None,
        }
    }

    fn end_gesture(&mut self) -> Option<ActiveDrag> {
        let DragState::Dragging(drag) = std::mem::take(&mut self.state) else {
            return None;
        };
        self.surface.translate_row(&drag.source, 0.0);
        self.surface.set_lifted(&drag.source, false);
        self.surface.mark_drop_target(None);
        self.surface.set_dragging_mode(false);
        self.surface.release_pointer(drag.pointer_id);
        self.surface.detach_gesture_listeners(drag.pointer_id);
        Some(drag)
    }

    /// Press on the drag handle of `row`. Only the primary button starts a drag.
    pub fn pointer_down(&mut self, event: PointerEvent, row: &LayoutId) -> bool {
        if event.button != PointerButton::Primary {
            return false;
        }
        if let Some(stale) = self.end_gesture() {
            debug!("tearing down drag of {} before new gesture", stale.source);
        }

        self.surface.capture_pointer(event.pointer_id, row);
        self.surface.set_lifted(row, true);
        self.surface.set_dragging_mode(true);
        self.surface.attach_gesture_listeners(event.pointer_id);
        self.state = DragState::Dragging(ActiveDrag {
            pointer_id: event.pointer_id,
            source: row.clone(),
            start_y: event.y,
            target: None,
        });
        debug!("drag start: {} (pointer {})", row, event.pointer_id);
        true
    }

    pub fn pointer_move(&mut self, event: PointerEvent) {
        let Some(drag) = self.gesture_for(event.pointer_id) else {
            return;
        };
        let source = drag.source.clone();
        let dy = event.y - drag.start_y;

        self.surface.translate_row(&source, dy);
        let target = self
            .surface
            .hit_test(event.x, event.y)
            .filter(|hit| hit != &source);
        self.surface.mark_drop_target(target.as_ref());

        if let DragState::Dragging(drag) = &mut self.state {
            drag.target = target;
        }
    }

    /// Ends the gesture and, if it landed on another row, reorders `list` in
    /// memory and re-renders. Returns the new order to persist with
    /// [`LayoutEntryList::reorder`].
    pub fn pointer_up(
        &mut self,
        event: PointerEvent,
        list: &LayoutEntryList,
    ) -> Option<Vec<LayoutId>> {
        self.gesture_for(event.pointer_id)?;
        let drag = self.end_gesture()?;

        let target = drag.target.or_else(|| {
            self.surface
                .hit_test(event.x, event.y)
                .filter(|hit| hit != &drag.source)
        })?;

        if !list.move_entry(&drag.source, &target) {
            return None;
        }
        self.surface.render(&list.snapshot());
        info!("drag commit: {} -> position of {}", drag.source, target);
        Some(list.ids())
    }

    pub fn pointer_cancel(&mut self, event: PointerEvent) {
        if self.gesture_for(event.pointer_id).is_some() {
            if let Some(drag) = self.end_gesture() {
                debug!("drag cancelled: {}", drag.source);
            }
        }
    }

    /// Release followed by the backend reorder. A failed reorder has already
    /// been reconciled by the list when this returns the error; the surface
    /// is re-rendered from the reconciled list.
    pub async fn commit(&mut self, event: PointerEvent, list: &LayoutEntryList) -> Result<bool> {
        let Some(order) = self.pointer_up(event, list) else {
            return Ok(false);
        };
        match list.reorder(order).await {
            Ok(()) => Ok(true),
            Err(e) => {
                self.surface.render(&list.snapshot());
                Err(e)
            }
        }
    }
}

impl<S: ReorderSurface> Drop for DragReorderController<S> {
    fn drop(&mut self) {
        self.end_gesture();
    }
}

/// Headless surface: rows stacked top to bottom with a uniform height.
#[derive(Debug, Clone)]
pub struct StackedRows {
    top: f64,
    row_height: f64,
    rows: Vec<LayoutId>,
    active: Option<LayoutId>,
    lifted: Option<LayoutId>,
    offsets: HashMap<LayoutId, f64>,
    drop_target: Option<LayoutId>,
    dragging: bool,
    captured: Option<PointerId>,
    listening: Option<PointerId>,
}

impl StackedRows {
    pub fn new(top: f64, row_height: f64) -> Self {
        Self {
            top,
            row_height,
            rows: Vec::new(),
            active: None,
            lifted: None,
            offsets: HashMap::new(),
            drop_target: None,
            dragging: false,
            captured: None,
            listening: None,
        }
    }

    /// Vertical center of `row`, in client coordinates.
    pub fn row_center(&self, row: &LayoutId) -> Option<f64> {
        self.rows
            .iter()
            .position(|r| r == row)
            .map(|idx| self.top + (idx as f64 + 0.5) * self.row_height)
    }

    pub fn rows(&self) -> &[LayoutId] {
        &self.rows
    }

    pub fn active(&self) -> Option<&LayoutId> {
        self.active.as_ref()
    }

    pub fn lifted(&self) -> Option<&LayoutId> {
        self.lifted.as_ref()
    }

    pub fn offset(&self, row: &LayoutId) -> f64 {
        self.offsets.get(row).copied().unwrap_or(0.0)
    }

    pub fn drop_target(&self) -> Option<&LayoutId> {
        self.drop_target.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn captured(&self) -> Option<PointerId> {
        self.captured
    }

    pub fn listening(&self) -> Option<PointerId> {
        self.listening
    }
}

impl ReorderSurface for StackedRows {
    fn capture_pointer(&mut self, pointer: PointerId, _handle: &LayoutId) {
        self.captured = Some(pointer);
    }

    fn release_pointer(&mut self, pointer: PointerId) {
        if self.captured == Some(pointer) {
            self.captured = None;
        }
    }

    fn attach_gesture_listeners(&mut self, pointer: PointerId) {
        self.listening = Some(pointer);
    }

    fn detach_gesture_listeners(&mut self, pointer: PointerId) {
        if self.listening == Some(pointer) {
            self.listening = None;
        }
    }

    fn set_lifted(&mut self, row: &LayoutId, lifted: bool) {
        if lifted {
            self.lifted = Some(row.clone());
        } else if self.lifted.as_ref() == Some(row) {
            self.lifted = None;
        }
    }

    fn translate_row(&mut self, row: &LayoutId, dy: f64) {
        if dy == 0.0 {
            self.offsets.remove(row);
        } else {
            self.offsets.insert(row.clone(), dy);
        }
    }

    fn mark_drop_target(&mut self, row: Option<&LayoutId>) {
        self.drop_target = row.cloned();
    }

    fn set_dragging_mode(&mut self, on: bool) {
        self.dragging = on;
    }

    fn hit_test(&self, _x: f64, y: f64) -> Option<LayoutId> {
        if y < self.top || self.row_height <= 0.0 {
            return None;
        }
        let idx = ((y - self.top) / self.row_height) as usize;
        self.rows.get(idx).cloned()
    }

    fn render(&mut self, snapshot: &ListSnapshot) {
        self.rows = snapshot.ids();
        self.active = snapshot.active_id.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::gateway::{commands, BackendGateway, CommandTransport};
    use crate::status::StatusLine;
    use async_trait::async_trait;
    use futures::executor::block_on;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::sync::Arc;

    struct ThreeRows {
        reorder_fails: bool,
        reorders: Mutex<Vec<Value>>,
    }

    #[async_trait]
    impl CommandTransport for ThreeRows {
        async fn call(&self, command: &str, args: Value) -> Result<Value> {
            match command {
                commands::GET_LAYOUT_ENTRIES => Ok(json!({
                    "entries": [
                        { "id": "A", "path": "a.yab" },
                        { "id": "B", "path": "b.yab" },
                        { "id": "C", "path": "c.yab" }
                    ],
                    "active_layout_id": "A"
                })),
                commands::REORDER_LAYOUT_ENTRIES => {
                    self.reorders.lock().push(args["orderedIds"].clone());
                    if self.reorder_fails {
                        Err(Error::rejected("Invalid number of layout ids"))
                    } else {
                        Ok(Value::Null)
                    }
                }
                _ => Ok(Value::Null),
            }
        }
    }

    fn setup(reorder_fails: bool) -> (
        DragReorderController<StackedRows>,
        LayoutEntryList,
        Arc<ThreeRows>,
    ) {
        let backend = Arc::new(ThreeRows {
            reorder_fails,
            reorders: Mutex::new(Vec::new()),
        });
        let list = LayoutEntryList::new(BackendGateway::new(backend.clone()), StatusLine::new());
        block_on(list.refresh()).unwrap();
        let mut ctl = DragReorderController::new(StackedRows::new(0.0, 10.0));
        ctl.surface_mut().render(&list.snapshot());
        (ctl, list, backend)
    }

    fn assert_clean(surface: &StackedRows) {
        assert!(!surface.is_dragging());
        assert!(surface.lifted().is_none());
        assert!(surface.drop_target().is_none());
        assert!(surface.captured().is_none());
        assert!(surface.listening().is_none());
        for row in surface.rows() {
            assert_eq!(surface.offset(row), 0.0);
        }
    }

    #[test]
    fn drag_first_onto_last_commits_b_c_a() {
        let (mut ctl, list, backend) = setup(false);
        let a = LayoutId::new("A");

        assert!(ctl.pointer_down(PointerEvent::primary(1, 5.0, 5.0), &a));
        assert!(ctl.surface().is_dragging());
        assert_eq!(ctl.surface().lifted(), Some(&a));
        assert_eq!(ctl.surface().captured(), Some(1));

        ctl.pointer_move(PointerEvent::primary(1, 5.0, 25.0));
        assert_eq!(ctl.surface().offset(&a), 20.0);
        assert_eq!(ctl.surface().drop_target(), Some(&LayoutId::new("C")));
        // List untouched until release.
        assert_eq!(list.ids()[0], a);

        let committed = block_on(ctl.commit(PointerEvent::primary(1, 5.0, 25.0), &list)).unwrap();
        assert!(committed);
        assert_clean(ctl.surface());
        assert_eq!(
            ctl.surface().rows(),
            &[LayoutId::new("B"), LayoutId::new("C"), a.clone()]
        );
        assert_eq!(backend.reorders.lock()[0], json!(["B", "C", "A"]));
    }

    #[test]
    fn hovering_own_row_marks_no_target() {
        let (mut ctl, list, backend) = setup(false);
        let b = LayoutId::new("B");
        ctl.pointer_down(PointerEvent::primary(3, 5.0, 15.0), &b);
        ctl.pointer_move(PointerEvent::primary(3, 5.0, 18.0));
        assert!(ctl.surface().drop_target().is_none());

        assert_eq!(ctl.pointer_up(PointerEvent::primary(3, 5.0, 18.0), &list), None);
        assert_clean(ctl.surface());
        assert!(backend.reorders.lock().is_empty());
    }

    #[test]
    fn release_without_tracked_target_hit_tests_release_point() {
        let (mut ctl, list, _) = setup(false);
        let c = LayoutId::new("C");
        ctl.pointer_down(PointerEvent::primary(1, 5.0, 25.0), &c);
        let order = ctl.pointer_up(PointerEvent::primary(1, 5.0, 2.0), &list);
        assert_eq!(
            order,
            Some(vec![c.clone(), LayoutId::new("A"), LayoutId::new("B")])
        );
    }

    #[test]
    fn cancel_cleans_up_without_commit() {
        let (mut ctl, list, _) = setup(false);
        ctl.pointer_down(PointerEvent::primary(7, 5.0, 5.0), &LayoutId::new("A"));
        ctl.pointer_move(PointerEvent::primary(7, 5.0, 25.0));
        ctl.pointer_cancel(PointerEvent::primary(7, 5.0, 25.0));

        assert_eq!(ctl.state(), &DragState::Idle);
        assert_clean(ctl.surface());
        assert_eq!(list.ids()[0], LayoutId::new("A"));
    }

    #[test]
    fn other_pointer_and_secondary_button_are_ignored() {
        let (mut ctl, list, _) = setup(false);
        let press = PointerEvent {
            button: PointerButton::Secondary,
            ..PointerEvent::primary(1, 5.0, 5.0)
        };
        assert!(!ctl.pointer_down(press, &LayoutId::new("A")));
        assert!(!ctl.is_dragging());

        ctl.pointer_down(PointerEvent::primary(1, 5.0, 5.0), &LayoutId::new("A"));
        ctl.pointer_move(PointerEvent::primary(2, 5.0, 25.0));
        assert!(ctl.surface().drop_target().is_none());
        assert_eq!(ctl.pointer_up(PointerEvent::primary(2, 5.0, 25.0), &list), None);
        assert!(ctl.is_dragging());
    }

    #[test]
    fn new_press_tears_down_previous_gesture() {
        let (mut ctl, _, _) = setup(false);
        ctl.pointer_down(PointerEvent::primary(1, 5.0, 5.0), &LayoutId::new("A"));
        ctl.pointer_move(PointerEvent::primary(1, 5.0, 25.0));
        ctl.pointer_down(PointerEvent::primary(2, 5.0, 15.0), &LayoutId::new("B"));

        assert_eq!(ctl.surface().offset(&LayoutId::new("A")), 0.0);
        assert_eq!(ctl.surface().lifted(), Some(&LayoutId::new("B")));
        assert_eq!(ctl.surface().captured(), Some(2));
        assert!(ctl.surface().drop_target().is_none());
        match ctl.state() {
            DragState::Dragging(drag) => assert_eq!(drag.pointer_id, 2),
            DragState::Idle => panic!("expected an active drag"),
        }
    }

    #[test]
    fn failed_reorder_restores_backend_order() {
        let (mut ctl, list, _) = setup(true);
        ctl.pointer_down(PointerEvent::primary(1, 5.0, 5.0), &LayoutId::new("A"));
        ctl.pointer_move(PointerEvent::primary(1, 5.0, 25.0));
        let err = block_on(ctl.commit(PointerEvent::primary(1, 5.0, 25.0), &list)).unwrap_err();

        assert!(matches!(err, Error::ValidationRejected(_)));
        assert_eq!(
            list.ids(),
            vec![LayoutId::new("A"), LayoutId::new("B"), LayoutId::new("C")]
        );
        assert_eq!(ctl.surface().rows(), list.ids().as_slice());
        assert_clean(ctl.surface());

        // The next gesture hit-tests against the restored rows.
        ctl.pointer_down(PointerEvent::primary(2, 5.0, 15.0), &LayoutId::new("B"));
        ctl.pointer_move(PointerEvent::primary(2, 5.0, 5.0));
        assert_eq!(ctl.surface().drop_target(), Some(&LayoutId::new("A")));
    }

    #[test]
    fn stacked_rows_hit_test_bounds() {
        let mut rows = StackedRows::new(100.0, 20.0);
        rows.render(&ListSnapshot::default());
        assert_eq!(rows.hit_test(0.0, 110.0), None);

        let (ctl, _, _) = setup(false);
        let surface = ctl.surface();
        assert_eq!(surface.hit_test(0.0, -1.0), None);
        assert_eq!(surface.hit_test(0.0, 29.9), Some(LayoutId::new("C")));
        assert_eq!(surface.hit_test(0.0, 30.0), None);
        assert_eq!(surface.row_center(&LayoutId::new("B")), Some(15.0));
    }
}
