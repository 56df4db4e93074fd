use anyhow::Result;
use clap::Args;

use crate::scene::{Scene, VolumeArgs};
use crate::summary::print_scene_summary;

#[derive(Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub volume: VolumeArgs,

    /// Zoom every window by this factor relative to the fitted zoom
    #[arg(long)]
    pub zoom: Option<f64>,
}

pub fn run(args: &InfoArgs) -> Result<()> {
    let mut scene = Scene::build(&args.volume)?;

    if let Some(factor) = args.zoom {
        // Linked windows follow the first one.
        let windows = if scene.coordinator.is_linked_zoom() {
            1
        } else {
            scene.models.len()
        };
        for index in 0..windows {
            let requested = scene.models[index].view_zoom() * factor;
            let zoom = scene.coordinator.clamp_zoom(&scene.models, index, requested)?;
            scene
                .coordinator
                .on_zoom_update_in_window(&mut scene.models, index, zoom)?;
        }
    }

    print_scene_summary(&scene);
    Ok(())
}
