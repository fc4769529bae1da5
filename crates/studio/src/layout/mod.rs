// Drag-driven proportional resizing of adjacent editor panes.
//
// Widths are percentages of the container and always sum to 100. A drag on
// handle `i` only ever moves width between panes `i` and `i + 1`; the pane
// that would shrink below its pixel minimum is pinned to exactly that
// minimum and its neighbour absorbs the rest.

use thiserror::Error;

/// Tolerance used when validating that widths sum to 100.
const TOTAL_TOLERANCE: f64 = 0.01;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LayoutError {
    #[error("a resizable layout needs at least two panes, got {0}")]
    TooFewPanes(usize),

    #[error("got {widths} widths but {minimums} minimum widths")]
    LengthMismatch { widths: usize, minimums: usize },

    #[error("pane width {0} is not a positive finite percentage")]
    InvalidWidth(f64),

    #[error("minimum width {0} is not a non-negative finite pixel count")]
    InvalidMinimum(f64),

    #[error("pane widths must sum to 100, got {0}")]
    BadTotal(f64),
}

/// Pane widths (percent) plus per-pane minimum pixel widths.
#[derive(Debug, Clone, PartialEq)]
pub struct PaneLayout {
    widths: Vec<f64>,
    min_widths_px: Vec<f64>,
}

impl PaneLayout {
    pub fn new(widths: Vec<f64>, min_widths_px: Vec<f64>) -> Result<Self, LayoutError> {
        if widths.len() < 2 {
            return Err(LayoutError::TooFewPanes(widths.len()));
        }
        if widths.len() != min_widths_px.len() {
            return Err(LayoutError::LengthMismatch {
                widths: widths.len(),
                minimums: min_widths_px.len(),
            });
        }
        if let Some(bad) = widths.iter().copied().find(|w| !w.is_finite() || *w <= 0.0) {
            return Err(LayoutError::InvalidWidth(bad));
        }
        if let Some(bad) = min_widths_px.iter().copied().find(|m| !m.is_finite() || *m < 0.0) {
            return Err(LayoutError::InvalidMinimum(bad));
        }
        let total: f64 = widths.iter().sum();
        if (total - 100.0).abs() > TOTAL_TOLERANCE {
            return Err(LayoutError::BadTotal(total));
        }
        Ok(Self { widths, min_widths_px })
    }

    /// Sidebar / outline / editor.
    pub fn three_pane() -> Self {
        Self { widths: vec![25.0, 35.0, 40.0], min_widths_px: vec![250.0, 300.0, 350.0] }
    }

    /// Editor / assistant split inside the editor panel.
    pub fn two_pane() -> Self {
        Self { widths: vec![50.0, 50.0], min_widths_px: vec![300.0, 300.0] }
    }

    pub fn widths(&self) -> &[f64] {
        &self.widths
    }

    pub fn min_widths_px(&self) -> &[f64] {
        &self.min_widths_px
    }

    pub fn pane_count(&self) -> usize {
        self.widths.len()
    }

    /// Handles sit between panes, so there is one fewer than panes.
    pub fn handle_count(&self) -> usize {
        self.widths.len() - 1
    }

    pub fn pixel_widths(&self, container_width_px: f64) -> Vec<f64> {
        self.widths.iter().map(|w| w / 100.0 * container_width_px).collect()
    }
}

impl Default for PaneLayout {
    fn default() -> Self {
        Self::three_pane()
    }
}

#[derive(Debug, Clone)]
struct DragState {
    handle: usize,
    start_x: f64,
    start_widths: Vec<f64>,
}

/// Tracks an in-progress drag on one resizer handle.
#[derive(Debug, Clone)]
pub struct PaneLayoutManager {
    layout: PaneLayout,
    defaults: PaneLayout,
    drag: Option<DragState>,
}

impl PaneLayoutManager {
    pub fn new(layout: PaneLayout) -> Self {
        Self { defaults: layout.clone(), layout, drag: None }
    }

    pub fn layout(&self) -> &PaneLayout {
        &self.layout
    }

    pub fn widths(&self) -> &[f64] {
        self.layout.widths()
    }

    pub fn active_handle(&self) -> Option<usize> {
        self.drag.as_ref().map(|drag| drag.handle)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Start dragging `handle` from `pointer_x`. Always captures the current
    /// widths, so a drag that was never released cannot leak stale state.
    pub fn begin_drag(&mut self, handle: usize, pointer_x: f64) -> bool {
        if handle >= self.layout.handle_count() || !pointer_x.is_finite() {
            return false;
        }
        self.drag = Some(DragState {
            handle,
            start_x: pointer_x,
            start_widths: self.layout.widths.clone(),
        });
        true
    }

    /// Apply a pointer move. Returns whether the widths changed.
    ///
    /// Ignored when no drag is active, the container has no measurable
    /// width yet, or the two panes cannot both fit their minimums.
    pub fn drag_to(&mut self, pointer_x: f64, container_width_px: f64) -> bool {
        let Some(drag) = self.drag.as_ref() else {
            return false;
        };
        if !container_width_px.is_finite() || container_width_px <= 0.0 || !pointer_x.is_finite()
        {
            return false;
        }

        let left_idx = drag.handle;
        let right_idx = drag.handle + 1;
        let start_left = drag.start_widths[left_idx];
        let combined = start_left + drag.start_widths[right_idx];

        let min_left = self.layout.min_widths_px[left_idx] / container_width_px * 100.0;
        let min_right = self.layout.min_widths_px[right_idx] / container_width_px * 100.0;
        if min_left + min_right > combined {
            return false;
        }

        let delta_percent = (pointer_x - drag.start_x) / container_width_px * 100.0;
        let mut left = start_left + delta_percent;
        let mut right = combined - left;
        if left < min_left {
            left = min_left;
            right = combined - left;
        } else if right < min_right {
            right = min_right;
            left = combined - right;
        }

        let changed =
            self.layout.widths[left_idx] != left || self.layout.widths[right_idx] != right;
        self.layout.widths[left_idx] = left;
        self.layout.widths[right_idx] = right;
        changed
    }

    /// Release the pointer. The last computed widths become the resting
    /// layout. Returns the handle that was being dragged.
    pub fn end_drag(&mut self) -> Option<usize> {
        self.drag.take().map(|drag| drag.handle)
    }

    /// Back to the layout the manager was created with.
    pub fn reset(&mut self) {
        self.layout = self.defaults.clone();
        self.drag = None;
    }
}

impl Default for PaneLayoutManager {
    fn default() -> Self {
        Self::new(PaneLayout::default())
    }
}
