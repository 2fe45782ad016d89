use super::deliver::{deliver, new_surface, Output};
use super::{ContentMode, ContentServices, RenderContext, Renderer};
use crate::render::draw_element;
use crate::template::DrawElement;
use anyhow::Result;
use async_trait::async_trait;

/// Controller status panel, drawn from the hardware's element list
pub struct ApInfoRenderer;

#[async_trait]
impl Renderer for ApInfoRenderer {
    fn mode(&self) -> ContentMode {
        ContentMode::ApInfo
    }

    async fn render(&self, ctx: &mut RenderContext, services: &ContentServices) -> Result<()> {
        let output = if ctx.is_segment() {
            ctx.params.set_segments("", 0);
            Output::Segments
        } else {
            let layout = ctx.layout(services, ContentMode::ApInfo);
            let mut surface = new_surface(ctx, services)?;
            let elements = layout.0.as_array().map(Vec::as_slice).unwrap_or_default();
            for element in elements.iter().filter_map(DrawElement::from_value) {
                draw_element(surface.as_mut(), &services.vars, &element);
            }
            Output::Surface(surface)
        };

        ctx.schedule_never();
        deliver(ctx, services, output, 0)
    }
}
