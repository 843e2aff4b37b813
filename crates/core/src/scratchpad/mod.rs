//! Scratchpad session: notes and a freehand drawing surface.
//!
//! One session exists per page instance and is owned by the host.

pub mod alert;
pub mod drawing;
pub mod notes;
pub mod raster;
pub mod stroke;

use std::sync::Arc;

use crate::storage::SharedStore;

pub use alert::{AlertQueue, Alerter};
pub use drawing::{DecodedImage, Drawing, EventOutcome, Export, PendingImage};
pub use notes::Notes;
pub use raster::{Color, Raster};
pub use stroke::{InputEvent, Point, StrokeAction, StrokeMachine, StrokeState, Viewport};

pub struct Scratchpad {
    notes: Notes,
    drawing: Drawing,
}

impl Scratchpad {
    pub fn new(store: SharedStore, alerts: Arc<dyn Alerter>, width: u32, height: u32) -> Self {
        Self { notes: Notes::new(store.clone(), alerts.clone()), drawing: Drawing::new(store, alerts, width, height) }
    }

    /// Restore the stored drawing. Notes are read on demand.
    pub async fn load(&mut self) -> bool {
        self.drawing.load().await
    }

    pub fn notes(&self) -> &Notes {
        &self.notes
    }

    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    pub fn drawing_mut(&mut self) -> &mut Drawing {
        &mut self.drawing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    #[tokio::test]
    async fn test_session_restores_notes_and_drawing() {
        let store: SharedStore = Arc::new(SqliteStore::open_in_memory(1024 * 1024).unwrap());
        let alerts = Arc::new(AlertQueue::new());

        let mut first = Scratchpad::new(store.clone(), alerts.clone(), 32, 32);
        assert!(first.notes().save("V1 142"));
        first.drawing_mut().handle(InputEvent::MouseDown { x: 2.0, y: 2.0 });
        first.drawing_mut().handle(InputEvent::MouseMove { x: 30.0, y: 30.0 });
        first.drawing_mut().handle(InputEvent::MouseUp);

        let mut second = Scratchpad::new(store, alerts.clone(), 32, 32);
        assert!(second.load().await);
        assert_eq!(second.notes().load(), "V1 142");
        assert_eq!(second.drawing().surface(), first.drawing().surface());
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_stroke_machine_through_reexports() {
        let mut machine = StrokeMachine::default();
        assert!(matches!(machine.handle(InputEvent::MouseDown { x: 1.0, y: 1.0 }), StrokeAction::Begin(_)));
        assert!(matches!(machine.handle(InputEvent::MouseMove { x: 4.0, y: 1.0 }), StrokeAction::Segment { .. }));
        assert!(matches!(machine.handle(InputEvent::MouseUp), StrokeAction::End));
        assert!(matches!(machine.handle(InputEvent::MouseUp), StrokeAction::None));
    }
}
