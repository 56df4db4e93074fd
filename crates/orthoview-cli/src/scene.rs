use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use clap::Args;
use orthoview_core::config::ViewerConfig;
use orthoview_core::coordinator::ZoomCoordinator;
use orthoview_core::coords::Plane;
use orthoview_core::model::Model;
use orthoview_core::resource::KeyFactory;
use orthoview_core::slice::{SliceViewModel, SliceViewSources};
use orthoview_core::source::{CursorStore, DisplayOrientation, ImageData, ImageGeometry};
use tracing::debug;

#[derive(Args)]
pub struct VolumeArgs {
    /// Volume dimensions in voxels, e.g. 256,256,128
    #[arg(long, value_parser = parse_triple::<u32>)]
    pub dims: [u32; 3],

    /// Voxel spacing, e.g. 0.9,0.9,2.5
    #[arg(long, value_parser = parse_triple::<f64>, default_value = "1,1,1")]
    pub spacing: [f64; 3],

    /// Image orientation code such as RAI or LPS (overrides the config file)
    #[arg(long)]
    pub orientation: Option<String>,

    /// Window size in pixels, e.g. 800x600
    #[arg(long, value_parser = parse_viewport, default_value = "512x512")]
    pub viewport: [u32; 2],

    /// Cursor voxel (defaults to the volume centre)
    #[arg(long, value_parser = parse_triple::<u32>)]
    pub cursor: Option<[u32; 3]>,

    /// Viewer config file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

pub fn parse_triple<T>(s: &str) -> std::result::Result<[T; 3], String>
where
    T: FromStr,
    T::Err: Display,
{
    let values = s
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<T>().map_err(|e| format!("'{part}': {e}"))
        })
        .collect::<std::result::Result<Vec<T>, String>>()?;
    <[T; 3]>::try_from(values)
        .map_err(|_| format!("expected three comma-separated values, got '{s}'"))
}

pub fn parse_pair(s: &str) -> std::result::Result<[f64; 2], String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected X,Y, got '{s}'"))?;
    let parse = |v: &str| v.trim().parse::<f64>().map_err(|e| format!("'{v}': {e}"));
    Ok([parse(x)?, parse(y)?])
}

fn parse_viewport(s: &str) -> std::result::Result<[u32; 2], String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let parse = |v: &str| v.trim().parse::<u32>().map_err(|e| format!("'{v}': {e}"));
    Ok([parse(w)?, parse(h)?])
}

pub fn load_config(path: Option<&Path>) -> Result<ViewerConfig> {
    let Some(path) = path else {
        return Ok(ViewerConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: ViewerConfig = toml::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    debug!(path = %path.display(), "Config loaded");
    Ok(config)
}

/// A loaded volume with the three orthogonal windows attached to it.
pub struct Scene {
    pub config: ViewerConfig,
    pub image_data: Rc<ImageData>,
    pub cursor: Rc<CursorStore>,
    pub models: Vec<SliceViewModel<KeyFactory>>,
    pub coordinator: ZoomCoordinator,
}

impl Scene {
    pub fn build(args: &VolumeArgs) -> Result<Self> {
        let mut config = load_config(args.config.as_deref())?;
        if let Some(ref code) = args.orientation {
            config.orientation = code.clone();
        }
        config.validate().context("Invalid viewer config")?;

        let geometry = ImageGeometry::new(args.dims, args.spacing)?;
        let cursor_voxel = args.cursor.unwrap_or(args.dims.map(|d| d / 2));
        if (0..3).any(|i| cursor_voxel[i] >= args.dims[i]) {
            bail!(
                "Cursor {:?} lies outside a volume of {:?} voxels",
                cursor_voxel,
                args.dims
            );
        }

        let image_data = ImageData::new();
        let cursor = CursorStore::new();
        let orientation = DisplayOrientation::from_code(&config.orientation)?;
        cursor.set(cursor_voxel);

        let sources = SliceViewSources {
            image_data: Rc::clone(&image_data),
            cursor: Rc::clone(&cursor),
            orientation,
        };
        let mut models: Vec<_> = Plane::ALL
            .iter()
            .map(|&plane| {
                SliceViewModel::new(
                    plane,
                    sources.clone(),
                    KeyFactory::new(),
                    config.slice_view.clone(),
                )
            })
            .collect();
        for model in models.iter_mut() {
            model.on_view_resize(args.viewport[0], args.viewport[1]);
        }

        image_data.load_main(geometry, "main");
        for model in models.iter_mut() {
            model.update();
        }

        let coordinator = ZoomCoordinator::new(config.zoom.clone());
        coordinator.reset_views_to_fit(&mut models);

        Ok(Self {
            config,
            image_data,
            cursor,
            models,
            coordinator,
        })
    }

    /// Bring every window up to date after the cursor or data changed.
    pub fn update(&mut self) {
        for model in self.models.iter_mut() {
            model.update();
        }
    }
}
