use image::{Rgba, RgbaImage};

use crate::mapping::Color;

use super::Viewport;

fn rgba(color: Color) -> Rgba<u8> {
    Rgba([color.r, color.g, color.b, 0xff])
}

/// RGBA8 frame the renderer draws into.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    image: RgbaImage,
}

impl Raster {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn fill(&mut self, color: Color) {
        self.image = RgbaImage::from_pixel(self.width(), self.height(), rgba(color));
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.image.get_pixel_checked(x, y).map(|px| px.0)
    }

    /// Sets one pixel; coordinates outside the frame are ignored.
    pub fn put(&mut self, x: i64, y: i64, color: Color) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if x < self.width() && y < self.height() {
            self.image.put_pixel(x, y, rgba(color));
        }
    }

    pub fn fill_circle(&mut self, cx: f64, cy: f64, radius: f64, color: Color) {
        let r = radius.max(0.5);
        let (x0, x1) = ((cx - r).floor() as i64, (cx + r).ceil() as i64);
        let (y0, y1) = ((cy - r).floor() as i64, (cy + r).ceil() as i64);
        for y in y0..=y1 {
            for x in x0..=x1 {
                let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                if dx * dx + dy * dy <= r * r {
                    self.put(x, y, color);
                }
            }
        }
    }

    /// Draws a round-capped line by stamping discs along its length.
    pub fn draw_line(&mut self, from: (f64, f64), to: (f64, f64), width: f64, color: Color) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        let radius = width / 2.0;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            self.fill_circle(from.0 + dx * t, from.1 + dy * t, radius, color);
        }
    }
}

/// Off-screen target the visible map is redrawn into for recording. Sized in
/// device pixels; `scale` maps logical pixels onto it.
#[derive(Debug, Clone)]
pub struct CompositeSurface {
    raster: Raster,
    scale: f64,
}

impl CompositeSurface {
    pub fn for_viewport(viewport: Viewport) -> Self {
        let scale = f64::from(viewport.device_pixel_ratio.max(0.1));
        let width = (f64::from(viewport.width) * scale).round().max(1.0) as u32;
        let height = (f64::from(viewport.height) * scale).round().max(1.0) as u32;
        Self {
            raster: Raster::new(width, height),
            scale,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn raster_mut(&mut self) -> &mut Raster {
        &mut self.raster
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_is_device_pixel_ratio_aware() {
        let surface = CompositeSurface::for_viewport(Viewport {
            width: 400,
            height: 300,
            device_pixel_ratio: 2.0,
        });
        assert_eq!(surface.raster().width(), 800);
        assert_eq!(surface.raster().height(), 600);
        assert_eq!(surface.scale(), 2.0);
    }

    #[test]
    fn draws_clipped_lines() {
        let mut raster = Raster::new(10, 10);
        raster.fill(Color::WHITE);
        raster.draw_line((-5.0, 5.0), (20.0, 5.0), 1.0, Color::BLACK);
        assert_eq!(raster.pixel(0, 5), Some([0, 0, 0, 255]));
        assert_eq!(raster.pixel(9, 5), Some([0, 0, 0, 255]));
        assert_eq!(raster.pixel(5, 0), Some([255, 255, 255, 255]));
        assert_eq!(raster.pixel(10, 5), None);
    }

    #[test]
    fn exposes_the_underlying_image() {
        let mut raster = Raster::new(3, 2);
        raster.fill(Color::rgb(1, 2, 3));
        raster.put(2, 1, Color::WHITE);
        raster.put(-1, 0, Color::BLACK);
        raster.put(0, 7, Color::BLACK);

        let image = raster.image();
        assert_eq!(image.dimensions(), (3, 2));
        assert_eq!(image.get_pixel(0, 0).0, [1, 2, 3, 255]);
        assert_eq!(image.get_pixel(2, 1).0, [255, 255, 255, 255]);
    }
}
