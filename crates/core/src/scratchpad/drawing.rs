//! Freehand drawing surface persisted as a PNG data URI.

use std::sync::Arc;

use chrono::NaiveDate;

use super::alert::Alerter;
use super::raster::{Color, Raster};
use super::stroke::{InputEvent, StrokeAction, StrokeMachine, StrokeState, Viewport};
use crate::Error;
use crate::storage::{SharedStore, keys};

pub const STROKE_WIDTH: f32 = 3.0;
pub const DEFAULT_COLOR: &str = "#e5e7eb";
pub const DRAWING_FULL_ALERT: &str = "Could not save drawing - image too large for storage";

/// Result of feeding one input event to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventOutcome {
    /// The host should suppress its default handling (touch scrolling).
    pub prevent_default: bool,
    /// Set when the event completed a stroke; whether the save succeeded.
    pub saved: Option<bool>,
}

/// A PNG snapshot ready to be written out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub file_name: String,
    pub png: Vec<u8>,
}

/// Stored drawing read under the surface owner, decoded without it.
#[derive(Debug, Clone)]
pub struct PendingImage {
    data_url: String,
    epoch: u64,
}

/// A decoded stored drawing, ready for [`Drawing::paint`].
#[derive(Debug, Clone)]
pub struct DecodedImage {
    image: Raster,
    epoch: u64,
}

impl PendingImage {
    /// Decode on the blocking pool. Malformed data yields `None`.
    pub async fn decode(self) -> Option<DecodedImage> {
        let Self { data_url, epoch } = self;
        match tokio::task::spawn_blocking(move || Raster::from_data_url(&data_url)).await {
            Ok(Ok(image)) => Some(DecodedImage { image, epoch }),
            Ok(Err(e)) => {
                tracing::warn!("ignoring malformed stored drawing: {e}");
                None
            }
            Err(e) => {
                tracing::warn!("drawing decode task failed: {e}");
                None
            }
        }
    }
}

pub struct Drawing {
    store: SharedStore,
    alerts: Arc<dyn Alerter>,
    surface: Raster,
    color: Color,
    strokes: StrokeMachine,
    /// Bumped whenever the surface is blanked; stale decodes are dropped.
    epoch: u64,
}

impl Drawing {
    pub fn new(store: SharedStore, alerts: Arc<dyn Alerter>, width: u32, height: u32) -> Self {
        Self {
            store,
            alerts,
            surface: Raster::new(width, height),
            color: Color { r: 0xe5, g: 0xe7, b: 0xeb, a: 0xff },
            strokes: StrokeMachine::default(),
            epoch: 0,
        }
    }

    pub fn surface(&self) -> &Raster {
        &self.surface
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn set_color(&mut self, color: &str) -> Result<(), Error> {
        self.color = Color::parse(color)?;
        Ok(())
    }

    pub fn state(&self) -> StrokeState {
        self.strokes.state()
    }

    /// Feed an event already expressed in surface pixels.
    pub fn handle(&mut self, event: InputEvent) -> EventOutcome {
        let mut outcome = EventOutcome { prevent_default: event.is_touch(), saved: None };
        match self.strokes.handle(event) {
            StrokeAction::Segment { from, to } => self.surface.stroke_segment(from, to, self.color, STROKE_WIDTH),
            StrokeAction::End => outcome.saved = Some(self.save()),
            StrokeAction::Begin(_) | StrokeAction::None => {}
        }
        outcome
    }

    /// Feed an event in client coordinates of the displayed `viewport`.
    pub fn handle_client(&mut self, event: InputEvent, viewport: &Viewport) -> EventOutcome {
        let (width, height) = (self.surface.width(), self.surface.height());
        self.handle(event.map_point(|p| viewport.to_surface(p, width, height)))
    }

    /// Persist the surface. Every failure is logged and alerted.
    pub fn save(&self) -> bool {
        let result = self.surface.to_data_url().and_then(|url| self.store.set(keys::DRAWING, &url));
        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("failed to save drawing: {e}");
                self.alerts.alert(DRAWING_FULL_ALERT);
                false
            }
        }
    }

    /// The stored drawing, if any, tagged with the current surface.
    pub fn pending_image(&self) -> Option<PendingImage> {
        match self.store.get(keys::DRAWING) {
            Ok(Some(data_url)) => Some(PendingImage { data_url, epoch: self.epoch }),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("failed to read drawing: {e}");
                None
            }
        }
    }

    /// Composite a decoded drawing at the origin, over any strokes made
    /// while it was decoding.
    ///
    /// Returns false when the surface was blanked since the image was read.
    pub fn paint(&mut self, decoded: &DecodedImage) -> bool {
        if decoded.epoch != self.epoch {
            tracing::debug!("dropping stale drawing decode");
            return false;
        }
        self.surface.draw_image(&decoded.image);
        tracing::debug!(width = decoded.image.width(), height = decoded.image.height(), "drawing restored");
        true
    }

    /// Decode and paint the stored drawing.
    ///
    /// Returns whether anything was painted. Malformed data is ignored.
    pub async fn load(&mut self) -> bool {
        let Some(pending) = self.pending_image() else {
            return false;
        };
        match pending.decode().await {
            Some(decoded) => self.paint(&decoded),
            None => false,
        }
    }

    /// Resize the surface. Resizing blanks it; the returned image repaints
    /// the stored drawing once decoded.
    pub fn resize(&mut self, width: u32, height: u32) -> Option<PendingImage> {
        self.surface = Raster::new(width, height);
        self.epoch += 1;
        self.pending_image()
    }

    /// Blank the surface and forget the stored drawing.
    pub fn clear(&mut self) -> Result<(), Error> {
        self.surface.clear();
        self.epoch += 1;
        self.store.remove(keys::DRAWING)
    }

    pub fn export(&self, date: NaiveDate) -> Result<Export, Error> {
        Ok(Export { file_name: format!("scratchpad-{}.png", date.format("%Y-%m-%d")), png: self.surface.encode_png()? })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scratchpad::alert::AlertQueue;
    use crate::storage::SqliteStore;

    fn drawing(store: &SharedStore) -> (Drawing, Arc<AlertQueue>) {
        let alerts = Arc::new(AlertQueue::new());
        (Drawing::new(store.clone(), alerts.clone(), 64, 48), alerts)
    }

    fn store(quota: usize) -> SharedStore {
        Arc::new(SqliteStore::open_in_memory(quota).unwrap())
    }

    fn stroke(drawing: &mut Drawing, points: &[(f32, f32)]) -> EventOutcome {
        let (x, y) = points[0];
        drawing.handle(InputEvent::MouseDown { x, y });
        for &(x, y) in &points[1..] {
            drawing.handle(InputEvent::MouseMove { x, y });
        }
        drawing.handle(InputEvent::MouseUp)
    }

    #[test]
    fn test_default_colour() {
        let (drawing, _) = drawing(&store(1024));
        assert_eq!(drawing.color(), Color::parse(DEFAULT_COLOR).unwrap());
    }

    #[test]
    fn test_stroke_saves_once_on_end() {
        let store = store(1024 * 1024);
        let (mut drawing, _) = drawing(&store);

        drawing.handle(InputEvent::MouseDown { x: 5.0, y: 5.0 });
        let outcome = drawing.handle(InputEvent::MouseMove { x: 30.0, y: 5.0 });
        assert_eq!(outcome.saved, None);
        assert!(store.get(keys::DRAWING).unwrap().is_none());

        let outcome = drawing.handle(InputEvent::MouseUp);
        assert_eq!(outcome.saved, Some(true));
        assert!(store.get(keys::DRAWING).unwrap().unwrap().starts_with("data:image/png;base64,"));
        assert_eq!(drawing.handle(InputEvent::MouseUp).saved, None);
    }

    #[test]
    fn test_touch_prevents_default() {
        let (mut drawing, _) = drawing(&store(1024 * 1024));
        assert!(drawing.handle(InputEvent::TouchStart { x: 1.0, y: 1.0 }).prevent_default);
        assert!(drawing.handle(InputEvent::TouchMove { x: 9.0, y: 9.0 }).prevent_default);
        let outcome = drawing.handle(InputEvent::TouchEnd);
        assert!(outcome.prevent_default);
        assert_eq!(outcome.saved, Some(true));
        assert!(!drawing.handle(InputEvent::MouseMove { x: 1.0, y: 1.0 }).prevent_default);
    }

    #[test]
    fn test_client_coordinates_are_scaled() {
        let (mut drawing, _) = drawing(&store(1024 * 1024));
        let viewport = Viewport { left: 100.0, top: 100.0, width: 32.0, height: 24.0 };

        drawing.handle_client(InputEvent::MouseDown { x: 100.0, y: 110.0 }, &viewport);
        drawing.handle_client(InputEvent::MouseMove { x: 132.0, y: 110.0 }, &viewport);

        // (110 - 100) * 48 / 24 = 20 in surface pixels.
        assert_eq!(drawing.surface().pixel(40, 20), Some([0xe5, 0xe7, 0xeb, 0xff]));
        assert_eq!(drawing.surface().pixel(40, 10), Some([0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn test_save_then_load_is_pixel_identical() {
        let store = store(1024 * 1024);
        let (mut first, _) = drawing(&store);
        first.set_color("#ef4444").unwrap();
        stroke(&mut first, &[(4.0, 4.0), (40.0, 30.0), (60.0, 4.0)]);

        let (mut second, _) = drawing(&store);
        assert!(second.load().await);
        assert_eq!(second.surface(), first.surface());
    }

    #[tokio::test]
    async fn test_malformed_drawing_is_ignored() {
        let store = store(1024 * 1024);
        store.set(keys::DRAWING, "data:image/png;base64,bm90IGEgcG5n").unwrap();

        let (mut drawing, _) = drawing(&store);
        assert!(!drawing.load().await);
        assert!(drawing.surface().is_blank());
    }

    #[test]
    fn test_every_failed_save_alerts() {
        let store = store(64);
        let (mut drawing, alerts) = drawing(&store);

        assert_eq!(stroke(&mut drawing, &[(1.0, 1.0), (50.0, 40.0)]).saved, Some(false));
        assert_eq!(stroke(&mut drawing, &[(1.0, 40.0), (50.0, 1.0)]).saved, Some(false));

        assert_eq!(alerts.drain(), vec![DRAWING_FULL_ALERT.to_string(), DRAWING_FULL_ALERT.to_string()]);
    }

    #[test]
    fn test_clear_removes_stored_drawing() {
        let store = store(1024 * 1024);
        let (mut drawing, _) = drawing(&store);
        stroke(&mut drawing, &[(1.0, 1.0), (20.0, 20.0)]);

        drawing.clear().unwrap();
        assert!(drawing.surface().is_blank());
        assert!(store.get(keys::DRAWING).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_resize_reloads_stored_drawing() {
        let store = store(1024 * 1024);
        let (mut drawing, _) = drawing(&store);
        stroke(&mut drawing, &[(2.0, 2.0), (20.0, 2.0)]);
        drawing.handle(InputEvent::MouseDown { x: 2.0, y: 30.0 });
        drawing.handle(InputEvent::MouseMove { x: 20.0, y: 30.0 });

        let pending = drawing.resize(128, 96).unwrap();
        assert!(drawing.surface().is_blank());
        let decoded = pending.decode().await.unwrap();
        assert!(drawing.paint(&decoded));
        assert_eq!(drawing.surface().width(), 128);
        assert_eq!(drawing.surface().pixel(10, 2), Some([0xe5, 0xe7, 0xeb, 0xff]));
        // The unfinished stroke was never saved.
        assert_eq!(drawing.surface().pixel(10, 30), Some([0, 0, 0, 0]));
    }

    #[tokio::test]
    async fn test_decode_after_clear_is_dropped() {
        let store = store(1024 * 1024);
        let (mut drawing, _) = drawing(&store);
        stroke(&mut drawing, &[(2.0, 2.0), (20.0, 2.0)]);

        let decoded = drawing.resize(64, 48).unwrap().decode().await.unwrap();
        drawing.clear().unwrap();
        assert!(!drawing.paint(&decoded));
        assert!(drawing.surface().is_blank());
    }

    #[tokio::test]
    async fn test_paint_keeps_strokes_made_during_decode() {
        let store = store(1024 * 1024);
        let (mut drawing, _) = drawing(&store);
        stroke(&mut drawing, &[(2.0, 2.0), (20.0, 2.0)]);

        let pending = drawing.resize(64, 48).unwrap();
        drawing.set_color("#ef4444").unwrap();
        drawing.handle(InputEvent::MouseDown { x: 2.0, y: 30.0 });
        drawing.handle(InputEvent::MouseMove { x: 20.0, y: 30.0 });

        assert!(drawing.paint(&pending.decode().await.unwrap()));
        assert_eq!(drawing.surface().pixel(10, 2), Some([0xe5, 0xe7, 0xeb, 0xff]));
        assert_eq!(drawing.surface().pixel(10, 30), Some([0xef, 0x44, 0x44, 0xff]));
    }

    #[test]
    fn test_export_names_file_by_date() {
        let (drawing, _) = drawing(&store(1024));
        let export = drawing.export(NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()).unwrap();
        assert_eq!(export.file_name, "scratchpad-2026-10-19.png");
        assert_eq!(Raster::decode_png(&export.png).unwrap(), *drawing.surface());
    }
}
