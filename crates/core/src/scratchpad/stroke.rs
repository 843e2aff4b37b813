//! Freehand stroke state machine.
//!
//! Pointer and touch events drive a two-state machine:
//!
//! ```text
//! Idle --down--> Drawing --move*--> Drawing --up/leave--> Idle (save)
//! ```
//!
//! The machine is independent of any drawing surface; it only reports what
//! the surface should do.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A position on the drawing surface, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// On-screen rectangle the surface is displayed in.
///
/// The displayed size may differ from the surface's pixel size, so client
/// coordinates are scaled into surface coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Viewport {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    /// Map a client-space point into surface pixels.
    pub fn to_surface(&self, client: Point, surface_width: u32, surface_height: u32) -> Point {
        let scale_x = if self.width > 0.0 { surface_width as f32 / self.width } else { 1.0 };
        let scale_y = if self.height > 0.0 { surface_height as f32 / self.height } else { 1.0 };
        Point::new((client.x - self.left) * scale_x, (client.y - self.top) * scale_y)
    }
}

/// Typed input event stream for the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    MouseDown { x: f32, y: f32 },
    MouseMove { x: f32, y: f32 },
    MouseUp,
    /// Pointer left the surface.
    MouseLeave,
    TouchStart { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    TouchEnd,
}

impl InputEvent {
    pub fn is_touch(&self) -> bool {
        matches!(self, InputEvent::TouchStart { .. } | InputEvent::TouchMove { .. } | InputEvent::TouchEnd)
    }

    pub fn point(&self) -> Option<Point> {
        match *self {
            InputEvent::MouseDown { x, y }
            | InputEvent::MouseMove { x, y }
            | InputEvent::TouchStart { x, y }
            | InputEvent::TouchMove { x, y } => Some(Point::new(x, y)),
            InputEvent::MouseUp | InputEvent::MouseLeave | InputEvent::TouchEnd => None,
        }
    }

    /// Rewrite the event's coordinates, leaving the kind unchanged.
    pub fn map_point(self, f: impl FnOnce(Point) -> Point) -> Self {
        let Some(p) = self.point() else {
            return self;
        };
        let Point { x, y } = f(p);
        match self {
            InputEvent::MouseDown { .. } => InputEvent::MouseDown { x, y },
            InputEvent::MouseMove { .. } => InputEvent::MouseMove { x, y },
            InputEvent::TouchStart { .. } => InputEvent::TouchStart { x, y },
            InputEvent::TouchMove { .. } => InputEvent::TouchMove { x, y },
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum StrokeState {
    #[default]
    Idle,
    Drawing {
        last: Point,
    },
}

/// What the surface should do in response to an event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StrokeAction {
    /// Nothing to draw or save.
    None,
    /// A stroke started at this point.
    Begin(Point),
    /// Draw a segment from the previous point to the current one.
    Segment { from: Point, to: Point },
    /// The stroke completed; persist the surface.
    End,
}

#[derive(Debug, Clone, Default)]
pub struct StrokeMachine {
    state: StrokeState,
}

impl StrokeMachine {
    pub fn state(&self) -> StrokeState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        matches!(self.state, StrokeState::Drawing { .. })
    }

    pub fn handle(&mut self, event: InputEvent) -> StrokeAction {
        match (event, self.state) {
            // A second down while drawing restarts at the new point without saving.
            (InputEvent::MouseDown { x, y } | InputEvent::TouchStart { x, y }, _) => {
                let p = Point::new(x, y);
                self.state = StrokeState::Drawing { last: p };
                StrokeAction::Begin(p)
            }
            (InputEvent::MouseMove { x, y } | InputEvent::TouchMove { x, y }, StrokeState::Drawing { last }) => {
                let to = Point::new(x, y);
                self.state = StrokeState::Drawing { last: to };
                StrokeAction::Segment { from: last, to }
            }
            (
                InputEvent::MouseUp | InputEvent::MouseLeave | InputEvent::TouchEnd,
                StrokeState::Drawing { .. },
            ) => {
                self.state = StrokeState::Idle;
                StrokeAction::End
            }
            _ => StrokeAction::None,
        }
    }
}
