//! Command-line host: build a card from a template and export it as PNG.

use std::path::PathBuf;

use anyhow::Context as _;
use cardsmith_core::{
    CanvasState, ElementId, ElementPatch, NewElement, PropertyEditor, template,
};
use cardsmith_render::{DirectorySink, Exporter, decode_or_empty};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "cardsmith", version, about = "Compose a condolence card and export it as PNG")]
struct Cli {
    /// Template JSON (array of element descriptors). Defaults to the built-in card.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Photo placed over the photo placeholder.
    #[arg(long)]
    photo: Option<PathBuf>,

    /// Extra TTF/OTF font files to make available to text elements.
    #[arg(long = "font")]
    fonts: Vec<PathBuf>,

    /// Field edits as `<element-id>.<field>=<value>`, e.g. `nome.content=Maria`.
    #[arg(long = "set", value_parser = parse_edit)]
    edits: Vec<Edit>,

    /// Directory the PNG is written into.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Canvas width in pixels.
    #[arg(long, default_value_t = cardsmith_core::DEFAULT_CANVAS_WIDTH)]
    width: f64,

    /// Canvas height in pixels.
    #[arg(long, default_value_t = cardsmith_core::DEFAULT_CANVAS_HEIGHT)]
    height: f64,
}

#[derive(Debug, Clone)]
struct Edit {
    id: ElementId,
    field: String,
    value: String,
}

fn parse_edit(raw: &str) -> Result<Edit, String> {
    let (target, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected <id>.<field>=<value>, got {raw:?}"))?;
    let (id, field) = target
        .rsplit_once('.')
        .ok_or_else(|| format!("expected <id>.<field> before '=', got {target:?}"))?;
    Ok(Edit {
        id: ElementId::new(id),
        field: field.to_string(),
        value: value.to_string(),
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut canvas = CanvasState::new(cli.width, cli.height);
    let elements = match &cli.template {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read template '{}'", path.display()))?;
            template::from_json(&json)
                .with_context(|| format!("parse template '{}'", path.display()))?
        }
        None => template::reference_template(),
    };
    canvas.load_template(elements);
    log::info!("loaded {} elements", canvas.len());

    if let Some(path) = &cli.photo {
        let bytes =
            std::fs::read(path).with_context(|| format!("read photo '{}'", path.display()))?;
        place_photo(&mut canvas, decode_or_empty(&bytes));
    }

    for edit in &cli.edits {
        if !canvas.select_element(&edit.id) {
            log::warn!("--set: no element {}", edit.id);
            continue;
        }
        if !PropertyEditor::set_field(&mut canvas, &edit.field, &edit.value) {
            log::warn!("--set: {}.{} left unchanged", edit.id, edit.field);
        }
    }
    canvas.clear_selection();

    let mut exporter = Exporter::new();
    for path in &cli.fonts {
        let bytes = std::fs::read(path).with_context(|| format!("read font '{}'", path.display()))?;
        exporter
            .renderer_mut()
            .register_font(bytes)
            .with_context(|| format!("register font '{}'", path.display()))?;
    }

    let mut sink = DirectorySink::new(&cli.out_dir);
    let filename = exporter
        .export(&canvas, &mut sink)
        .context("export card")?;
    println!("{}", sink.path_for(&filename).display());
    Ok(())
}

/// Put the photo where the placeholder was, as a round image, and drop the
/// placeholder. Without a placeholder the image keeps its default box.
fn place_photo(canvas: &mut CanvasState, source: Option<cardsmith_core::PixelSource>) {
    let placeholder_id = ElementId::new(template::PHOTO_PLACEHOLDER_ID);
    let placeholder = canvas.get(&placeholder_id).map(|el| el.bounds());

    canvas.add_element(NewElement::Image(source));
    if let Some(bounds) = placeholder {
        canvas.update_selected(&ElementPatch {
            x: Some(bounds.x0),
            y: Some(bounds.y0),
            width: Some(bounds.width()),
            height: Some(bounds.height()),
            border_radius: Some(50.0),
            ..ElementPatch::default()
        });
        canvas.select_element(&placeholder_id);
        canvas.delete_selected();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardsmith_core::PixelSource;

    #[test]
    fn test_parse_edit() {
        let edit = parse_edit("data-nasc.content=Nascimento: 02/03/1951").unwrap();
        assert_eq!(edit.id.as_str(), "data-nasc");
        assert_eq!(edit.field, "content");
        assert_eq!(edit.value, "Nascimento: 02/03/1951");
        assert!(parse_edit("nome").is_err());
        assert!(parse_edit("nome=Maria").is_err());
    }

    #[test]
    fn test_place_photo_replaces_placeholder() {
        let mut canvas = CanvasState::new(800.0, 600.0);
        canvas.load_template(template::reference_template());
        let source = PixelSource::from_rgba8(1, 1, &[9, 9, 9, 255]).unwrap();
        place_photo(&mut canvas, Some(source));

        assert_eq!(canvas.len(), 7);
        assert!(canvas
            .get(&ElementId::new(template::PHOTO_PLACEHOLDER_ID))
            .is_none());
        let photo = canvas
            .elements()
            .iter()
            .find(|el| el.as_image().is_some())
            .unwrap();
        assert_eq!((photo.position().x, photo.position().y), (60.0, 120.0));
        assert_eq!(photo.as_image().unwrap().border_radius, 50.0);
        assert!(canvas.selected_id().is_none());
    }
}
