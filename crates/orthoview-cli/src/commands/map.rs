use anyhow::Result;
use clap::{Args, ValueEnum};
use console::Style;
use orthoview_core::coords::Plane;
use orthoview_core::navigation::CursorNavigation;

use crate::scene::{parse_pair, Scene, VolumeArgs};

#[derive(Clone, Copy, ValueEnum)]
pub enum PlaneArg {
    Axial,
    Coronal,
    Sagittal,
}

impl From<PlaneArg> for Plane {
    fn from(arg: PlaneArg) -> Self {
        match arg {
            PlaneArg::Axial => Plane::Axial,
            PlaneArg::Coronal => Plane::Coronal,
            PlaneArg::Sagittal => Plane::Sagittal,
        }
    }
}

#[derive(Args)]
pub struct MapArgs {
    #[command(flatten)]
    pub volume: VolumeArgs,

    /// Window to map in
    #[arg(long, value_enum, default_value = "axial")]
    pub plane: PlaneArg,

    /// Window position in pixels, e.g. 120,80
    #[arg(long, value_parser = parse_pair)]
    pub window: [f64; 2],

    /// Move the cursor to the mapped voxel and report the new slices
    #[arg(long)]
    pub click: bool,
}

fn format_point(p: &[f64]) -> String {
    let parts: Vec<String> = p.iter().map(|x| format!("{x:.3}")).collect();
    format!("({})", parts.join(", "))
}

pub fn run(args: &MapArgs) -> Result<()> {
    let mut scene = Scene::build(&args.volume)?;
    let plane = Plane::from(args.plane);
    let label = Style::new().dim();
    let value = Style::new().bold().white();

    let model = &scene.models[plane.index()];
    let slice = model.map_window_to_slice(args.window);
    let image = model.map_slice_to_image(slice);
    let voxel = model.map_slice_to_image_index(slice);
    let back = model.map_slice_to_window(slice);

    println!("{:<10}{}", label.apply_to("Window"), value.apply_to(format_point(&args.window)));
    println!("{:<10}{}", label.apply_to("Slice"), value.apply_to(format_point(&slice)));
    println!("{:<10}{}", label.apply_to("Image"), value.apply_to(format_point(&image)));
    match voxel {
        Some(v) => println!("{:<10}{}", label.apply_to("Voxel"), value.apply_to(format!("{v:?}"))),
        None => println!(
            "{:<10}{}",
            label.apply_to("Voxel"),
            Style::new().dim().yellow().apply_to("outside volume")
        ),
    }
    tracing::debug!(window = ?args.window, round_trip = ?back, "Window mapping");

    if args.click {
        let navigation = CursorNavigation::new(scene.config.zoom.clone());
        let cursor = navigation.update_cursor(&scene.models[plane.index()], args.window);
        scene.update();
        println!();
        println!("{:<10}{}", label.apply_to("Cursor"), value.apply_to(format!("{cursor:?}")));
        for model in &scene.models {
            println!(
                "{:<10}{}",
                label.apply_to(model.plane()),
                value.apply_to(format!(
                    "slice {} / {}",
                    model.slice_index() + 1,
                    model.number_of_slices()
                ))
            );
        }
    }

    Ok(())
}
