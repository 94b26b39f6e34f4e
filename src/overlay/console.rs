//! Terminal stand-ins for the host UI, used by the `mochi-guard` binary.

use super::surface::{
    NavigationTarget, Navigator, Notice, Notifier, NotifyError, RenderError, RenderedSurface,
    SurfaceRenderer, SurfaceSpec,
};
use super::SurfaceActions;
use crate::models::OverlayKind;
use log::{info, warn};
use std::io::{self, Write};

fn emit(line: &str) {
    let mut out = io::stdout().lock();
    if let Err(e) = writeln!(out, "{line}") {
        warn!("Failed to write to stdout: {e}");
    }
}

/// Prints each surface as a block of text. There is nothing to click, so
/// console surfaces only close through `hide` or auto-hide.
#[derive(Debug, Default)]
pub struct ConsoleRenderer;

impl SurfaceRenderer for ConsoleRenderer {
    fn can_draw_overlays(&self) -> bool {
        true
    }

    fn render_surface(
        &self,
        spec: &SurfaceSpec,
        actions: SurfaceActions,
    ) -> Result<Box<dyn RenderedSurface>, RenderError> {
        let buttons: Vec<String> = spec.buttons.iter().map(|b| format!("[{}]", b.label)).collect();
        emit(&format!("┌─ overlay #{} ({}) ─", actions.generation(), spec.kind));
        emit(&format!("│ {}", spec.message));
        if let Some(media) = &spec.media_ref {
            emit(&format!("│ media: {media}"));
        }
        emit(&format!("└─ {}", buttons.join(" ")));

        Ok(Box::new(ConsoleSurface {
            generation: actions.generation(),
            kind: spec.kind,
        }))
    }
}

struct ConsoleSurface {
    generation: u64,
    kind: OverlayKind,
}

impl RenderedSurface for ConsoleSurface {
    fn release(self: Box<Self>) {
        emit(&format!("── overlay #{} ({}) closed", self.generation, self.kind));
    }
}

#[derive(Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, target: &NavigationTarget) {
        match target {
            NavigationTarget::Home => info!("Navigate: home screen"),
            NavigationTarget::HostApp { route } => info!("Navigate: host app at /{route}"),
        }
    }
}

#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn post(&self, notice: &Notice) -> Result<(), NotifyError> {
        info!("Notification: {} | {}", notice.title, notice.body);
        Ok(())
    }
}
