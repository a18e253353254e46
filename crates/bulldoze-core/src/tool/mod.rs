//! Bulldoze tool state machine.
//!
//! A [`DemolishSession`] lives from one activation of the host's demolish
//! control to the next. It owns the [`ToolMode`] and answers the hooked
//! input and demolition calls:
//!
//! ```text
//! Activate ──▶ mode from cursor id, thickness 1
//! OnKeyDown
//!   Escape      ──▶ end_input (only while a cell is picked)
//!   mode cycle  ──▶ filter kind + diagonal from modifiers
//! OnMouseWheel (diagonal + diagonal modifier)
//!               ──▶ thickness ± notches
//! preview / commit
//!               ──▶ [diagonal rebuild] ──▶ Demolition::demolish_region
//! ```

pub mod keys;

use std::fmt;

use tracing::{debug, info};

use crate::colors::{Color, HighlightColorKind, HighlightColors};
use crate::filter::OccupantFilterKind;
use crate::host::{BulldozeCursor, DemolishControl, Demolition, ModifierKeys, VK_ESCAPE, WHEEL_DELTA};
use crate::region::{CellSelection, Thickness, build_diagonal, overwrite_selection};

pub use keys::KeyBindings;

/// Current mode of the bulldoze tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToolMode {
    pub filter: OccupantFilterKind,
    pub diagonal: bool,
    pub thickness: Thickness,
}

impl ToolMode {
    /// Mode encoded by a cursor id; unknown ids give the default mode.
    pub fn from_cursor_id(cursor_id: u32) -> Self {
        let (filter, diagonal) = BulldozeCursor::from_repr(cursor_id)
            .map(|cursor| (cursor.filter_kind(), cursor.is_diagonal()))
            .unwrap_or_default();
        Self {
            filter,
            diagonal,
            thickness: Thickness::default(),
        }
    }

    pub fn cursor(&self) -> BulldozeCursor {
        BulldozeCursor::for_mode(self.filter, self.diagonal)
    }

    pub fn color_kind(&self) -> HighlightColorKind {
        match self.filter {
            OccupantFilterKind::None => HighlightColorKind::Normal,
            OccupantFilterKind::Flora => HighlightColorKind::Flora,
            OccupantFilterKind::Network => HighlightColorKind::Network,
        }
    }
}

impl fmt::Display for ToolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let filter = match self.filter {
            OccupantFilterKind::None => "Normal",
            OccupantFilterKind::Flora => "Flora",
            OccupantFilterKind::Network => "Network",
        };
        if self.diagonal {
            write!(f, "{filter} (diagonal, thickness {})", self.thickness)
        } else {
            f.write_str(filter)
        }
    }
}

/// State of one activation of the demolish control.
#[derive(Debug, Clone)]
pub struct DemolishSession {
    mode: ToolMode,
    colors: HighlightColors,
    bindings: KeyBindings,
}

impl DemolishSession {
    /// Start a session for a control showing `cursor_id`.
    pub fn activate(cursor_id: u32, colors: HighlightColors, bindings: KeyBindings) -> Self {
        let mode = ToolMode::from_cursor_id(cursor_id);
        info!("Bulldoze tool activated: {}", mode);
        Self {
            mode,
            colors,
            bindings,
        }
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn bindings(&self) -> &KeyBindings {
        &self.bindings
    }

    /// Highlight color of the current mode
    pub fn highlight_color(&self) -> Color {
        self.colors.demolish_ok_color(self.mode.color_kind())
    }

    /// Returns whether the key was handled.
    pub fn on_key_down<C>(&mut self, control: &mut C, vk_code: i32, modifiers: ModifierKeys) -> bool
    where
        C: DemolishControl + ?Sized,
    {
        if !control.is_on_top() {
            return false;
        }

        if vk_code == VK_ESCAPE {
            if control.is_cell_picked() {
                control.end_input();
                return true;
            }
            return false;
        }

        if vk_code != self.bindings.mode_cycle {
            return false;
        }

        let (filter, diagonal) = self.bindings.select(modifiers);
        self.set_mode(
            control,
            ToolMode {
                filter,
                diagonal,
                ..self.mode
            },
        );
        true
    }

    /// Returns whether the wheel event was consumed.
    ///
    /// Only consumed while diagonal mode is on and the diagonal modifier is
    /// held, whether or not the thickness changed.
    pub fn on_mouse_wheel<C>(&mut self, control: &mut C, modifiers: ModifierKeys, delta: i32) -> bool
    where
        C: DemolishControl + ?Sized,
    {
        if !self.mode.diagonal || !modifiers.contains(self.bindings.diagonal) {
            return false;
        }

        let thickness = self.mode.thickness.step(wheel_notches(delta));
        if thickness != self.mode.thickness {
            self.mode.thickness = thickness;
            info!("Diagonal thickness: {}", thickness);
            if control.is_cell_picked() {
                control.update_selected_region();
            }
        }
        true
    }

    /// Preview hook: color the selection and ask the host what would be demolished.
    pub fn preview_region<C, D>(
        &self,
        control: &mut C,
        demolition: &mut D,
        region: &mut D::Region,
    ) -> bool
    where
        C: DemolishControl + ?Sized,
        D: Demolition + ?Sized,
    {
        control.set_demolish_ok_color(self.highlight_color());
        self.dispatch(control, demolition, region, false)
    }

    /// Commit hook: demolish the final selection.
    pub fn commit_region<C, D>(
        &self,
        control: &mut C,
        demolition: &mut D,
        region: &mut D::Region,
    ) -> bool
    where
        C: DemolishControl + ?Sized,
        D: Demolition + ?Sized,
    {
        self.dispatch(control, demolition, region, true)
    }

    fn dispatch<C, D>(
        &self,
        control: &C,
        demolition: &mut D,
        region: &mut D::Region,
        demolish: bool,
    ) -> bool
    where
        C: DemolishControl + ?Sized,
        D: Demolition + ?Sized,
    {
        if self.mode.diagonal {
            let diagonal = build_diagonal(
                region.bounds(),
                Some(control.drag_origin()),
                self.mode.thickness,
            );
            overwrite_selection(region, &diagonal);
        }

        demolition.demolish_region(demolish, region, self.mode.filter.create_filter())
    }

    fn set_mode<C>(&mut self, control: &mut C, mode: ToolMode)
    where
        C: DemolishControl + ?Sized,
    {
        if mode == self.mode {
            debug!("Bulldoze mode unchanged: {}", mode);
            return;
        }

        self.mode = mode;
        control.set_cursor(mode.cursor());
        info!("Bulldoze mode: {}", mode);

        if control.is_cell_picked() {
            control.update_selected_region();
        }
    }
}

/// Route a hooked `DemolishRegion` call.
///
/// Goes through the session when there is one and the host objects could be
/// read; otherwise the host gets its call back unchanged.
pub fn route_demolish_region<C, D>(
    session: Option<&DemolishSession>,
    control: Option<&mut C>,
    demolition: &mut D,
    region: Option<&mut D::Region>,
    demolish: bool,
) -> bool
where
    C: DemolishControl + ?Sized,
    D: Demolition + ?Sized,
{
    match (session, control, region) {
        (Some(session), Some(control), Some(region)) => {
            if demolish {
                session.commit_region(control, demolition, region)
            } else {
                session.preview_region(control, demolition, region)
            }
        }
        (None, _, _) => {
            debug!("No bulldoze session, forwarding unchanged");
            demolition.forward(demolish)
        }
        _ => {
            debug!("Unreadable control or region, forwarding unchanged");
            demolition.forward(demolish)
        }
    }
}

/// Whole wheel notches in `delta`; a partial notch still counts as one.
pub fn wheel_notches(delta: i32) -> i32 {
    match delta / WHEEL_DELTA {
        0 => delta.signum(),
        notches => notches,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FLORA_OCCUPANT_TYPE, NetworkTypeFlags, OccupantFilter};
    use crate::filter::tests::TestOccupant;
    use crate::region::{CellPoint, CellRect, CellRegion};

    #[derive(Default)]
    struct FakeControl {
        on_top: bool,
        cell_picked: bool,
        origin: CellPoint,
        cursor: Option<BulldozeCursor>,
        color: Option<Color>,
        end_input_calls: usize,
        update_calls: usize,
    }

    impl FakeControl {
        fn on_top() -> Self {
            Self {
                on_top: true,
                ..Default::default()
            }
        }

        fn picked() -> Self {
            Self {
                on_top: true,
                cell_picked: true,
                ..Default::default()
            }
        }
    }

    impl DemolishControl for FakeControl {
        fn is_on_top(&self) -> bool {
            self.on_top
        }

        fn cursor_id(&self) -> u32 {
            self.cursor.map_or(BulldozeCursor::Default.id(), BulldozeCursor::id)
        }

        fn is_cell_picked(&self) -> bool {
            self.cell_picked
        }

        fn drag_origin(&self) -> CellPoint {
            self.origin
        }

        fn end_input(&mut self) {
            self.end_input_calls += 1;
            self.cell_picked = false;
        }

        fn set_cursor(&mut self, cursor: BulldozeCursor) {
            self.cursor = Some(cursor);
        }

        fn update_selected_region(&mut self) {
            self.update_calls += 1;
        }

        fn set_demolish_ok_color(&mut self, color: Color) {
            self.color = Some(color);
        }
    }

    /// Records what the host's demolition routine would have received
    #[derive(Default)]
    struct FakeDemolition {
        calls: Vec<(bool, CellRegion, Option<bool>)>,
        forwarded: Vec<bool>,
    }

    impl Demolition for FakeDemolition {
        type Region = CellRegion;

        fn demolish_region(
            &mut self,
            demolish: bool,
            region: &CellRegion,
            filter: Option<Box<dyn OccupantFilter>>,
        ) -> bool {
            // Record whether the filter would keep flora
            let keeps_flora = filter.map(|f| f.is_occupant_type_included(FLORA_OCCUPANT_TYPE));
            self.calls.push((demolish, region.clone(), keeps_flora));
            true
        }

        fn forward(&mut self, demolish: bool) -> bool {
            self.forwarded.push(demolish);
            true
        }
    }

    fn session(cursor: BulldozeCursor) -> DemolishSession {
        DemolishSession::activate(cursor.id(), HighlightColors::new(), KeyBindings::default())
    }

    const KEY_B: i32 = 0x42;

    #[test]
    fn test_activate_reads_mode_from_cursor() {
        let flora = session(BulldozeCursor::FloraDiagonal);
        assert_eq!(flora.mode().filter, OccupantFilterKind::Flora);
        assert!(flora.mode().diagonal);
        assert_eq!(flora.mode().thickness, Thickness::default());

        let unknown = DemolishSession::activate(0x1234, HighlightColors::new(), KeyBindings::default());
        assert_eq!(unknown.mode(), ToolMode::default());
    }

    #[test]
    fn test_network_diagonal_then_escape() {
        let mut session = session(BulldozeCursor::Default);
        let mut control = FakeControl::picked();

        let handled = session.on_key_down(&mut control, KEY_B, ModifierKeys::SHIFT | ModifierKeys::ALT);
        assert!(handled);
        assert_eq!(
            session.mode(),
            ToolMode {
                filter: OccupantFilterKind::Network,
                diagonal: true,
                thickness: Thickness::default(),
            }
        );
        assert_eq!(control.cursor, Some(BulldozeCursor::NetworkDiagonal));
        assert_eq!(control.update_calls, 1);

        let mode = session.mode();
        assert!(session.on_key_down(&mut control, VK_ESCAPE, ModifierKeys::empty()));
        assert_eq!(control.end_input_calls, 1);
        assert_eq!(session.mode(), mode);

        // Nothing left to cancel
        assert!(!session.on_key_down(&mut control, VK_ESCAPE, ModifierKeys::empty()));
        assert_eq!(control.end_input_calls, 1);
    }

    #[test]
    fn test_keys_ignored_when_not_on_top() {
        let mut session = session(BulldozeCursor::Default);
        let mut control = FakeControl {
            cell_picked: true,
            ..Default::default()
        };

        assert!(!session.on_key_down(&mut control, KEY_B, ModifierKeys::CONTROL));
        assert!(!session.on_key_down(&mut control, VK_ESCAPE, ModifierKeys::empty()));
        assert_eq!(session.mode(), ToolMode::default());
        assert_eq!(control.end_input_calls, 0);
        assert_eq!(control.cursor, None);
    }

    #[test]
    fn test_unchanged_mode_skips_cursor_update() {
        let mut session = session(BulldozeCursor::Flora);
        let mut control = FakeControl::picked();

        assert!(session.on_key_down(&mut control, KEY_B, ModifierKeys::CONTROL));
        assert_eq!(control.cursor, None);
        assert_eq!(control.update_calls, 0);

        assert!(!session.on_key_down(&mut control, 0x43, ModifierKeys::CONTROL));
    }

    #[test]
    fn test_mode_change_without_pick_does_not_recompute() {
        let mut session = session(BulldozeCursor::Default);
        let mut control = FakeControl::on_top();

        assert!(session.on_key_down(&mut control, KEY_B, ModifierKeys::CONTROL));
        assert_eq!(control.cursor, Some(BulldozeCursor::Flora));
        assert_eq!(control.update_calls, 0);
    }

    #[test]
    fn test_key_keeps_thickness() {
        let mut session = session(BulldozeCursor::DefaultDiagonal);
        let mut control = FakeControl::on_top();
        session.on_mouse_wheel(&mut control, ModifierKeys::ALT, 3 * WHEEL_DELTA);
        assert_eq!(session.mode().thickness.get(), 4);

        session.on_key_down(&mut control, KEY_B, ModifierKeys::SHIFT | ModifierKeys::ALT);
        assert_eq!(session.mode().thickness.get(), 4);
    }

    #[test]
    fn test_wheel_requires_diagonal_and_modifier() {
        let mut control = FakeControl::picked();

        let mut normal = session(BulldozeCursor::Default);
        assert!(!normal.on_mouse_wheel(&mut control, ModifierKeys::ALT, WHEEL_DELTA));

        let mut diagonal = session(BulldozeCursor::DefaultDiagonal);
        assert!(!diagonal.on_mouse_wheel(&mut control, ModifierKeys::SHIFT, WHEEL_DELTA));
        assert_eq!(diagonal.mode().thickness.get(), 1);
        assert_eq!(control.update_calls, 0);
    }

    #[test]
    fn test_wheel_steps_and_clamps_thickness() {
        let mut session = session(BulldozeCursor::NetworkDiagonal);
        let mut control = FakeControl::picked();

        assert!(session.on_mouse_wheel(&mut control, ModifierKeys::ALT, -WHEEL_DELTA));
        assert_eq!(session.mode().thickness.get(), -1);
        assert_eq!(control.update_calls, 1);

        assert!(session.on_mouse_wheel(&mut control, ModifierKeys::ALT, -10 * WHEEL_DELTA));
        assert_eq!(session.mode().thickness.get(), -5);

        // Already at the limit: consumed but nothing to redraw
        let updates = control.update_calls;
        assert!(session.on_mouse_wheel(&mut control, ModifierKeys::ALT, -WHEEL_DELTA));
        assert_eq!(session.mode().thickness.get(), -5);
        assert_eq!(control.update_calls, updates);
    }

    #[test]
    fn test_wheel_notches() {
        assert_eq!(wheel_notches(120), 1);
        assert_eq!(wheel_notches(-240), -2);
        assert_eq!(wheel_notches(30), 1);
        assert_eq!(wheel_notches(-1), -1);
        assert_eq!(wheel_notches(0), 0);
    }

    #[test]
    fn test_preview_writes_color_and_keeps_rectangle() {
        let session = session(BulldozeCursor::Network);
        let mut control = FakeControl::picked();
        let mut demolition = FakeDemolition::default();
        let bounds = CellRect::new(0, 0, 3, 2);
        let mut region = CellRegion::rectangle(bounds);

        assert!(session.preview_region(&mut control, &mut demolition, &mut region));

        assert_eq!(control.color, Some(Color::DEFAULT_DEMOLISH_OK));
        let (demolish, passed, keeps_flora) = &demolition.calls[0];
        assert!(!demolish);
        assert_eq!(passed, &CellRegion::rectangle(bounds));
        // The network filter accepts every type and decides per occupant
        assert_eq!(*keeps_flora, Some(true));
    }

    #[test]
    fn test_preview_rewrites_region_in_place_when_diagonal() {
        let session = session(BulldozeCursor::DefaultDiagonal);
        let mut control = FakeControl {
            origin: CellPoint::new(4, 0),
            ..FakeControl::picked()
        };
        let mut demolition = FakeDemolition::default();
        let bounds = CellRect::new(0, 0, 4, 4);
        let mut region = CellRegion::rectangle(bounds);
        let buffer = region.cells().as_ptr();

        session.preview_region(&mut control, &mut demolition, &mut region);

        assert_eq!(region.cells().as_ptr(), buffer);
        assert_eq!(region.selected_count(), 5);
        for i in 0..5 {
            assert!(region.is_selected(CellPoint::new(4 - i, i)));
        }
        let (demolish, passed, keeps_flora) = &demolition.calls[0];
        assert!(!demolish);
        assert_eq!(passed, &region);
        assert_eq!(*keeps_flora, None);
    }

    #[test]
    fn test_commit_passes_flora_filter_and_diagonal() {
        let session = session(BulldozeCursor::FloraDiagonal);
        let mut control = FakeControl::picked();
        let mut demolition = FakeDemolition::default();
        let mut region = CellRegion::rectangle(CellRect::new(10, 10, 15, 12));

        assert!(session.commit_region(&mut control, &mut demolition, &mut region));

        let (demolish, passed, keeps_flora) = &demolition.calls[0];
        assert!(demolish);
        assert_eq!(passed.selected_count(), 6);
        assert_eq!(*keeps_flora, Some(true));
        // Commit never touches the preview color
        assert_eq!(control.color, None);
    }

    #[test]
    fn test_commit_without_diagonal_passes_rectangle() {
        let session = session(BulldozeCursor::Network);
        let mut control = FakeControl::picked();
        let mut demolition = FakeDemolition::default();
        let bounds = CellRect::new(0, 0, 2, 2);
        let mut region = CellRegion::rectangle(bounds);

        session.commit_region(&mut control, &mut demolition, &mut region);

        assert_eq!(demolition.calls[0].1, CellRegion::rectangle(bounds));
    }

    #[test]
    fn test_network_mode_filter_behaviour() {
        let filter = session(BulldozeCursor::Network).mode().filter.create_filter().unwrap();
        assert!(filter.is_occupant_included(&TestOccupant::network(NetworkTypeFlags::HIGHWAY)));
        assert!(!filter.is_occupant_included(&TestOccupant::building()));
    }

    #[test]
    fn test_mode_display() {
        let mut mode = ToolMode::from_cursor_id(BulldozeCursor::FloraDiagonal.id());
        assert_eq!(mode.to_string(), "Flora (diagonal, thickness 1)");
        mode.diagonal = false;
        assert_eq!(mode.to_string(), "Flora");
    }

    #[test]
    fn test_route_without_session_forwards_unchanged() {
        let mut control = FakeControl::picked();
        let mut demolition = FakeDemolition::default();
        let mut region = CellRegion::rectangle(CellRect::new(0, 0, 3, 3));

        assert!(route_demolish_region(
            None,
            Some(&mut control),
            &mut demolition,
            Some(&mut region),
            true
        ));
        assert_eq!(demolition.forwarded, [true]);
        assert!(demolition.calls.is_empty());
        assert_eq!(region, CellRegion::rectangle(CellRect::new(0, 0, 3, 3)));
        assert_eq!(control.color, None);
    }

    #[test]
    fn test_route_with_unreadable_region_forwards_unchanged() {
        let session = session(BulldozeCursor::FloraDiagonal);
        let mut control = FakeControl::picked();
        let mut demolition = FakeDemolition::default();

        route_demolish_region(Some(&session), Some(&mut control), &mut demolition, None, false);
        route_demolish_region::<FakeControl, _>(Some(&session), None, &mut demolition, None, true);

        assert_eq!(demolition.forwarded, [false, true]);
        assert!(demolition.calls.is_empty());
    }

    #[test]
    fn test_route_with_session_previews_and_commits() {
        let session = session(BulldozeCursor::DefaultDiagonal);
        let mut control = FakeControl::picked();
        let mut demolition = FakeDemolition::default();
        let mut region = CellRegion::rectangle(CellRect::new(0, 0, 2, 2));

        route_demolish_region(Some(&session), Some(&mut control), &mut demolition, Some(&mut region), false);
        route_demolish_region(Some(&session), Some(&mut control), &mut demolition, Some(&mut region), true);

        assert!(demolition.forwarded.is_empty());
        let kinds: Vec<bool> = demolition.calls.iter().map(|call| call.0).collect();
        assert_eq!(kinds, [false, true]);
        assert_eq!(region.selected_count(), 3);
        assert_eq!(control.color, Some(Color::DEFAULT_DEMOLISH_OK));
    }

    #[test]
    fn test_wheel_with_extreme_delta() {
        let mut session = session(BulldozeCursor::DefaultDiagonal);
        let mut control = FakeControl::on_top();

        assert!(session.on_mouse_wheel(&mut control, ModifierKeys::ALT, i32::MIN));
        assert_eq!(session.mode().thickness.get(), -5);
        assert!(session.on_mouse_wheel(&mut control, ModifierKeys::ALT, i32::MAX));
        assert_eq!(session.mode().thickness.get(), 5);
    }
}
