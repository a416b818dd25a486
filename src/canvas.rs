//! Caller-supplied drawing surface

use crate::RenderedImage;
use std::sync::{Arc, Mutex, MutexGuard};

/// Paint command recorded on a canvas
#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    DrawImage {
        x: i32,
        y: i32,
        image: RenderedImage,
    },
}

#[derive(Debug)]
struct Surface {
    width: u32,
    height: u32,
    commands: Vec<PaintCommand>,
}

/// A drawing surface with a fixed size and a display list
///
/// `Canvas` is a cheap handle: clones share the same surface, so the caller
/// keeps a clone and inspects what the painter drew once the pipeline is done.
#[derive(Debug, Clone)]
pub struct Canvas {
    surface: Arc<Mutex<Surface>>,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: Arc::new(Mutex::new(Surface {
                width,
                height,
                commands: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Surface> {
        self.surface.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn width(&self) -> u32 {
        self.lock().width
    }

    pub fn height(&self) -> u32 {
        self.lock().height
    }

    pub fn push(&self, cmd: PaintCommand) {
        self.lock().commands.push(cmd);
    }

    pub fn commands(&self) -> Vec<PaintCommand> {
        self.lock().commands.clone()
    }

    /// Whether two handles point at the same surface
    pub fn same_surface(&self, other: &Canvas) -> bool {
        Arc::ptr_eq(&self.surface, &other.surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_display_list() {
        let canvas = Canvas::new(123, 456);
        let handle = canvas.clone();
        let image = RenderedImage::svg(1, 1, "<svg/>");
        handle.push(PaintCommand::DrawImage { x: 0, y: 0, image: image.clone() });
        assert!(canvas.same_surface(&handle));
        assert_eq!(canvas.commands(), vec![PaintCommand::DrawImage { x: 0, y: 0, image }]);
        assert_eq!((canvas.width(), canvas.height()), (123, 456));
        assert!(!canvas.same_surface(&Canvas::new(123, 456)));
    }
}
