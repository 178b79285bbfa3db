//! Card templates: the built-in condolence card and JSON-described layouts.

use crate::elements::{Element, ElementKind, HexColor, ShapeKind, ShapeProps, TextProps};
use crate::error::{CanvasError, CanvasResult};
use kurbo::Rect;

/// Id of the placeholder box where the photo goes.
pub const PHOTO_PLACEHOLDER_ID: &str = "foto-placeholder";

const TITLE_FONT: &str = "Georgia, serif";
const BODY_FONT: &str = "Arial, sans-serif";
const INK: HexColor = HexColor::rgb(0x1f, 0x29, 0x37);
const MUTED: HexColor = HexColor::rgb(0x4b, 0x55, 0x63);
const PLACEHOLDER_FILL: HexColor = HexColor::rgb(0xe5, 0xe7, 0xeb);

fn text(id: &str, content: &str, bounds: Rect, font_size: u32, z_index: u32) -> Element {
    let (family, color) = if font_size >= 28 {
        (TITLE_FONT, INK)
    } else {
        (BODY_FONT, MUTED)
    };
    let props = TextProps::new(content)
        .with_font_size(font_size)
        .with_font_family(family)
        .with_color(color);
    Element::new(id, ElementKind::Text(props), bounds, z_index)
}

/// The reference condolence card for an 800x600 canvas, in z order.
pub fn reference_template() -> Vec<Element> {
    vec![
        text(
            "titulo",
            "Nota de Falecimento",
            Rect::new(290.0, 40.0, 760.0, 100.0),
            36,
            1,
        ),
        text(
            "nome",
            "Nome do Falecido",
            Rect::new(290.0, 130.0, 760.0, 180.0),
            28,
            2,
        ),
        text(
            "data-nasc",
            "Nascimento: 01/01/1940",
            Rect::new(290.0, 200.0, 760.0, 240.0),
            18,
            3,
        ),
        text(
            "data-falec",
            "Falecimento: 01/01/2024",
            Rect::new(290.0, 250.0, 760.0, 290.0),
            18,
            4,
        ),
        text(
            "velorio",
            "Velório: Capela Central, às 10h",
            Rect::new(60.0, 380.0, 740.0, 420.0),
            18,
            5,
        ),
        text(
            "sepultamento",
            "Sepultamento: Cemitério Municipal, às 16h",
            Rect::new(60.0, 440.0, 740.0, 480.0),
            18,
            6,
        ),
        Element::new(
            PHOTO_PLACEHOLDER_ID,
            ElementKind::Shape(
                ShapeProps::new(ShapeKind::Circle).with_background(PLACEHOLDER_FILL),
            ),
            Rect::new(60.0, 120.0, 260.0, 320.0),
            7,
        ),
    ]
}

/// Parse a JSON array of element descriptors.
///
/// The document as a whole must be a JSON array. Individual descriptors that
/// do not describe a drawable element (unknown `type`, missing fields, empty
/// box) are skipped with a warning so one bad entry cannot sink the template.
pub fn from_json(json: &str) -> CanvasResult<Vec<Element>> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let serde_json::Value::Array(descriptors) = value else {
        return Err(CanvasError::TemplateShape);
    };

    let mut elements = Vec::with_capacity(descriptors.len());
    for (index, descriptor) in descriptors.into_iter().enumerate() {
        match serde_json::from_value::<Element>(descriptor) {
            Ok(element) if element.is_renderable() => elements.push(element),
            Ok(element) => {
                log::warn!("skipping template element {} with an empty box", element.id())
            }
            Err(err) => log::warn!("skipping template descriptor #{index}: {err}"),
        }
    }
    log::debug!("parsed template with {} elements", elements.len());
    Ok(elements)
}
