use super::*;

/// Monospace fake: glyphs are half the font size wide, lines one font size tall.
struct Mono;

impl TextMeasure for Mono {
    fn measure(&mut self, text: &str, size_px: f32, _bold: bool) -> ReelResult<TextExtent> {
        Ok(TextExtent {
            width: text.chars().count() as f32 * size_px * 0.5,
            height: size_px,
        })
    }
}

fn memorial(text: &str) -> MemorialTitle {
    MemorialTitle {
        name: "Anna Petrovna Ivanova".to_string(),
        dates: "1941 - 2023".to_string(),
        text: text.to_string(),
    }
}

#[test]
fn plain_title_is_centered_and_within_margins() {
    let plan = plan_plain_title(
        &mut Mono,
        Canvas::default(),
        "Forever in our hearts",
        &TitleParams::default(),
    )
    .unwrap();
    assert_eq!(plan.lines.len(), 1);
    let line = &plan.lines[0];
    assert!(line.bold);
    assert_eq!(line.center_x, 360.0);
    assert!(line.left() >= 20.0);
    assert!(line.left() + line.extent.width <= 700.0);
    assert!((line.top + line.extent.height / 2.0 - 640.0).abs() <= 1.0);
    assert!(plan.fits);
}

#[test]
fn memorial_short_text_uses_full_width() {
    let plan = plan_memorial_card(
        &mut Mono,
        Canvas::default(),
        &memorial("Loved and remembered"),
        Some((400, 600)),
        160,
        &TitleParams::default(),
    )
    .unwrap();
    assert_eq!(plan.flow, Some(MemorialFlow::FullWidth));
    assert!(plan.fits);

    let slot = plan.decoration.unwrap();
    assert_eq!((slot.x, slot.width, slot.height), (24, 230, 345));
    assert_eq!(slot.y + slot.height as i32, 1280 - 24);

    // Name first, below the watermark-safe band; dates grey beneath it; body at or below 52%.
    let name = &plan.lines[0];
    assert!(name.bold);
    assert!(name.top >= 24.0 + 160.0);
    let dates = plan
        .lines
        .iter()
        .find(|l| l.text == "1941 - 2023")
        .unwrap();
    assert_eq!(dates.color, Rgba8::rgb(200, 200, 200));
    assert!(dates.top > name.top);
    let body = plan.lines.last().unwrap();
    assert!(body.top >= 665.0);
    assert_eq!(body.center_x, 360.0);
}

#[test]
fn scenario_d_long_epitaph_falls_back_beside_decoration() {
    let epitaph = "remembered ".repeat(300);
    let plan = plan_memorial_card(
        &mut Mono,
        Canvas::default(),
        &memorial(&epitaph),
        Some((400, 600)),
        160,
        &TitleParams::default(),
    )
    .unwrap();
    assert_eq!(plan.flow, Some(MemorialFlow::BesideDecoration));
    assert!(!plan.fits);

    let slot = plan.decoration.unwrap();
    let column_left = (slot.x + slot.width as i32 + 24) as f32;
    let body: Vec<_> = plan.lines.iter().filter(|l| l.text.contains("remembered")).collect();
    assert!(!body.is_empty());
    for line in body {
        assert_eq!(line.size_px, 18);
        assert!(line.left() >= column_left, "{} < {column_left}", line.left());
        assert!(line.left() + line.extent.width <= 696.0);
    }
}

#[test]
fn memorial_without_decoration_still_plans() {
    let plan = plan_memorial_card(
        &mut Mono,
        Canvas::default(),
        &memorial(&"x ".repeat(5000)),
        None,
        160,
        &TitleParams::default(),
    )
    .unwrap();
    assert!(plan.decoration.is_none());
    assert_eq!(plan.flow, Some(MemorialFlow::BesideDecoration));
}

#[test]
fn long_name_shrinks_but_stays_bold() {
    let name = "Konstantin Konstantinovich Konstantinopolsky-Verkhovsky";
    let plan = plan_memorial_card(
        &mut Mono,
        Canvas::default(),
        &MemorialTitle {
            name: name.to_string(),
            ..MemorialTitle::default()
        },
        None,
        160,
        &TitleParams::default(),
    )
    .unwrap();
    assert!(plan.lines.iter().all(|l| l.bold && l.size_px < 72));
    assert!(plan.lines.iter().all(|l| l.left() >= 24.0));
}

#[test]
fn title_spec_json_is_tagged() {
    let spec: TitleSpec =
        serde_json::from_str(r#"{"kind":"memorial","name":"A","dates":"1-2"}"#).unwrap();
    assert_eq!(
        spec,
        TitleSpec::Memorial(MemorialTitle {
            name: "A".to_string(),
            dates: "1-2".to_string(),
            text: String::new(),
        })
    );
    let plain: TitleSpec = serde_json::from_str(r#"{"kind":"plain","text":"Hi"}"#).unwrap();
    assert_eq!(
        plain,
        TitleSpec::Plain {
            text: "Hi".to_string()
        }
    );
}
