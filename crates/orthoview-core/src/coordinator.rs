//! Keeps the zoom of the orthogonal slice windows consistent.
//!
//! With linked zoom on, every window shows the same number of screen pixels
//! per physical unit, so anatomy has the same size in all three views. The
//! coordinator then owns the zoom of each window (`managed_zoom`), and
//! fitting uses the smallest optimal zoom among them.

use tracing::debug;

use crate::config::ZoomConfig;
use crate::error::{OrthoviewError, Result};
use crate::event::EventKind;
use crate::observe::{Observable, Subject};
use crate::resource::LayerResourceFactory;
use crate::slice::SliceViewModel;

#[derive(Debug)]
pub struct ZoomCoordinator {
    subject: Subject,
    config: ZoomConfig,
    linked: bool,
}

fn check_index<F: LayerResourceFactory>(models: &[SliceViewModel<F>], index: usize) -> Result<()> {
    if index >= models.len() {
        return Err(OrthoviewError::WindowIndexOutOfRange {
            index,
            total: models.len(),
        });
    }
    Ok(())
}

impl ZoomCoordinator {
    pub fn new(config: ZoomConfig) -> Self {
        Self {
            subject: Subject::new(),
            linked: config.linked,
            config,
        }
    }

    pub fn is_linked_zoom(&self) -> bool {
        self.linked
    }

    /// Switch linked zoom on or off. Turning it on copies the zoom of the
    /// first initialized window to the others.
    pub fn set_linked_zoom<F: LayerResourceFactory>(
        &mut self,
        models: &mut [SliceViewModel<F>],
        linked: bool,
    ) {
        if self.linked == linked {
            return;
        }
        self.linked = linked;
        for model in models.iter_mut() {
            model.set_managed_zoom(linked);
        }
        if linked {
            if let Some(zoom) = models.iter().find(|m| m.is_initialized()).map(|m| m.view_zoom()) {
                for model in models.iter_mut().filter(|m| m.is_initialized()) {
                    model.set_view_zoom(zoom);
                }
            }
        }
        debug!(linked, "Linked zoom changed");
        self.subject.fire(EventKind::LinkedZoomUpdate);
    }

    /// Smallest valid optimal zoom among the initialized windows.
    pub fn common_optimal_zoom<F: LayerResourceFactory>(
        &self,
        models: &[SliceViewModel<F>],
    ) -> Option<f64> {
        models
            .iter()
            .filter(|m| m.is_initialized() && m.optimal_zoom() > 0.0)
            .map(|m| m.optimal_zoom())
            .reduce(f64::min)
    }

    /// Fit every initialized window. Linked windows share the common
    /// optimal zoom; unlinked windows each fit themselves.
    pub fn reset_views_to_fit<F: LayerResourceFactory>(&self, models: &mut [SliceViewModel<F>]) {
        for model in models.iter_mut().filter(|m| m.is_initialized()) {
            model.set_managed_zoom(self.linked);
            model.reset_view_to_fit();
        }
        if !self.linked {
            return;
        }
        if let Some(zoom) = self.common_optimal_zoom(models) {
            debug!(zoom, "Fitting linked windows");
            for model in models.iter_mut().filter(|m| m.is_initialized()) {
                model.set_view_zoom(zoom);
            }
        }
    }

    /// Apply `zoom` to window `index` and, when linked, to all others.
    pub fn on_zoom_update_in_window<F: LayerResourceFactory>(
        &self,
        models: &mut [SliceViewModel<F>],
        index: usize,
        zoom: f64,
    ) -> Result<()> {
        check_index(models, index)?;
        models[index].set_view_zoom(zoom);
        if self.linked {
            let applied = models[index].view_zoom();
            for (i, model) in models.iter_mut().enumerate() {
                if i != index && model.is_initialized() {
                    model.set_view_zoom(applied);
                }
            }
        }
        Ok(())
    }

    /// Clamp a requested zoom for window `index` into the configured range
    /// around the relevant optimal zoom.
    pub fn clamp_zoom<F: LayerResourceFactory>(
        &self,
        models: &[SliceViewModel<F>],
        index: usize,
        zoom: f64,
    ) -> Result<f64> {
        check_index(models, index)?;
        let optimal = if self.linked {
            self.common_optimal_zoom(models)
        } else {
            Some(models[index].optimal_zoom()).filter(|z| *z > 0.0)
        };
        Ok(match optimal {
            Some(optimal) => self.config.clamp(zoom, optimal),
            None => zoom,
        })
    }
}

impl Observable for ZoomCoordinator {
    fn subject(&self) -> &Subject {
        &self.subject
    }
}
