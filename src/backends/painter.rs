use crate::{Canvas, Error, PaintCommand, Painter, RenderedImage, Result};

/// Records the image at the canvas origin in the canvas display list.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayListPainter;

impl DisplayListPainter {
    pub fn new() -> Self {
        DisplayListPainter
    }
}

impl Painter for DisplayListPainter {
    fn paint(&self, image: &RenderedImage, canvas: &Canvas) -> Result<()> {
        if image.is_empty() {
            return Err(Error::PaintError("image is empty".into()));
        }
        canvas.push(PaintCommand::DrawImage {
            x: 0,
            y: 0,
            image: image.clone(),
        });
        Ok(())
    }
}
