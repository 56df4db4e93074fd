use console::Style;
use orthoview_core::resource::KeyFactory;
use orthoview_core::slice::SliceViewModel;

use crate::scene::Scene;

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    flag: Style,
    disabled: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            flag: Style::new().green(),
            disabled: Style::new().dim().yellow(),
        }
    }
}

const AXIS_NAMES: [&str; 3] = ["X", "Y", "Z"];

fn format_triple<T: std::fmt::Display>(v: [T; 3]) -> String {
    format!("{} x {} x {}", v[0], v[1], v[2])
}

pub fn print_scene_summary(scene: &Scene) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Orthoview"));
    println!("  {}", s.title.apply_to("\u{2550}".repeat(9)));
    println!();

    if let Some(geometry) = scene.image_data.geometry() {
        println!(
            "  {:<14}{}",
            s.label.apply_to("Dimensions"),
            s.value.apply_to(format_triple(geometry.dimensions))
        );
        println!(
            "  {:<14}{}",
            s.label.apply_to("Spacing"),
            s.value.apply_to(format_triple(geometry.spacing))
        );
    }
    println!(
        "  {:<14}{}",
        s.label.apply_to("Orientation"),
        s.value.apply_to(&scene.config.orientation)
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Cursor"),
        s.value.apply_to(format!("{:?}", scene.cursor.get()))
    );
    let linked = if scene.coordinator.is_linked_zoom() {
        s.flag.apply_to("linked")
    } else {
        s.disabled.apply_to("per window")
    };
    println!("  {:<14}{}", s.label.apply_to("Zoom"), linked);
    println!();

    for model in &scene.models {
        print_window_section(&s, model);
    }
}

fn print_window_section(s: &Styles, model: &SliceViewModel<KeyFactory>) {
    println!("  {}", s.header.apply_to(model.plane()));
    if !model.is_initialized() {
        println!("    {}", s.disabled.apply_to("not initialized"));
        println!();
        return;
    }

    let size = model.slice_size();
    let spacing = model.slice_spacing();
    println!(
        "    {:<16}{}",
        s.label.apply_to("Slice size"),
        s.value.apply_to(format!("{} x {}", size[0], size[1]))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Pixel spacing"),
        s.value.apply_to(format!("{} x {}", spacing[0], spacing[1]))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Slice axis"),
        s.value
            .apply_to(AXIS_NAMES[model.slice_direction_in_image_space()])
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Slice"),
        s.value.apply_to(format!(
            "{} / {}",
            model.slice_index() + 1,
            model.number_of_slices()
        ))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Display map"),
        s.value.apply_to(model.image_to_display().permutation())
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("Optimal zoom"),
        s.value.apply_to(format!("{:.4}", model.optimal_zoom()))
    );
    println!(
        "    {:<16}{}",
        s.label.apply_to("View zoom"),
        s.value.apply_to(format!("{:.4}", model.view_zoom()))
    );
    let thumbnail = if model.is_thumbnail_on() {
        let t = model.thumbnail();
        s.flag
            .apply_to(format!("{} x {} px", t.size[0], t.size[1]))
    } else {
        s.disabled.apply_to("off".to_string())
    };
    println!("    {:<16}{}", s.label.apply_to("Thumbnail"), thumbnail);
    println!(
        "    {:<16}{}",
        s.label.apply_to("Layers"),
        s.value.apply_to(model.textures().len())
    );
    println!();
}
