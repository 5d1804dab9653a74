use std::collections::HashMap;

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::foundation::error::{ReelError, ReelResult};
use crate::raster::frame::FrameRGBA;
use crate::title::fonts::{ParleyText, TextBrush};
use crate::title::plan::CardPlan;

fn affine_to_cpu(a: kurbo::Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

/// vello_cpu font handles keyed by the shaped run's blob id and face index.
#[derive(Default)]
struct RunFonts {
    cache: HashMap<(u64, u32), vello_cpu::peniko::FontData>,
}

impl RunFonts {
    /// The face parley actually shaped `run` with, so glyph ids and advances match.
    fn for_run(
        &mut self,
        run: &parley::layout::GlyphRun<'_, TextBrush>,
    ) -> &vello_cpu::peniko::FontData {
        let font = run.run().font();
        self.cache
            .entry((font.data.id(), font.index))
            .or_insert_with(|| {
                vello_cpu::peniko::FontData::new(
                    vello_cpu::peniko::Blob::from(font.data.data().to_vec()),
                    font.index,
                )
            })
    }
}

/// Rasterize a planned card: solid background, decoration, then text.
pub fn paint_card(
    plan: &CardPlan,
    text: &mut ParleyText,
    decoration: Option<&RgbaImage>,
) -> ReelResult<FrameRGBA> {
    let canvas = plan.canvas;
    let mut frame = FrameRGBA::new_filled(canvas.width, canvas.height, plan.background.to_premul());
    if let (Some(slot), Some(img)) = (plan.decoration, decoration) {
        let scaled = imageops::resize(img, slot.width, slot.height, FilterType::Lanczos3);
        frame.draw_over(&FrameRGBA::from_straight(scaled), slot.x, slot.y, 1.0);
    }
    if !plan.lines.is_empty() {
        let layer = render_text_layer(plan, text)?;
        frame.draw_over(&layer, 0, 0, 1.0);
    }
    Ok(frame)
}

/// Glyphs of every planned line on a transparent premultiplied layer.
fn render_text_layer(plan: &CardPlan, text: &mut ParleyText) -> ReelResult<FrameRGBA> {
    let (w, h) = (plan.canvas.width, plan.canvas.height);
    let too_big = |_| ReelError::validation("title card is larger than 65535 px");
    let w16 = u16::try_from(w).map_err(too_big)?;
    let h16 = u16::try_from(h).map_err(too_big)?;

    let mut fonts = RunFonts::default();
    let mut ctx = vello_cpu::RenderContext::new(w16, h16);

    for line in &plan.lines {
        let c = line.color;
        let brush = TextBrush {
            r: c.r,
            g: c.g,
            b: c.b,
            a: c.a,
        };
        let layout = text.layout_line(&line.text, line.size_px as f32, line.bold, brush)?;
        let x = line.center_x - layout.width() / 2.0;
        let tr = kurbo::Affine::translate((f64::from(x), f64::from(line.top)));
        ctx.set_transform(affine_to_cpu(tr));

        for layout_line in layout.lines() {
            for item in layout_line.items() {
                let parley::layout::PositionedLayoutItem::GlyphRun(run) = item else {
                    continue;
                };
                let b = run.style().brush;
                ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(b.r, b.g, b.b, b.a));
                let glyphs = run.positioned_glyphs().map(|g| vello_cpu::Glyph {
                    id: g.id,
                    x: g.x,
                    y: g.y,
                });
                ctx.glyph_run(fonts.for_run(&run))
                    .font_size(run.run().font_size())
                    .fill_glyphs(glyphs);
            }
        }
    }

    ctx.flush();
    let mut pixmap = vello_cpu::Pixmap::new(w16, h16);
    ctx.render_to_pixmap(&mut pixmap);
    FrameRGBA::from_premul(w, h, pixmap.data_as_u8_slice().to_vec())
}
