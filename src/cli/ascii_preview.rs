use crate::core::geometry::SourceRegion;
use image::RgbaImage;
use std::io::{self, Write};
use crossterm::{
    terminal::{self, ClearType},
    cursor,
};

const ASCII_RAMP: &str = " .·:;+=xX#@";
const DEFAULT_WIDTH: usize = 80;
const DEFAULT_HEIGHT: usize = 30;

/// Renders frames as text so the guide box can be lined up from a terminal.
pub struct AsciiRenderer {
    width: usize,
    height: usize,
}

impl AsciiRenderer {
    pub fn new(width: Option<usize>, height: Option<usize>) -> Self {
        let (term_width, term_height) = terminal::size()
            .map(|(w, h)| (w as usize, h as usize))
            .unwrap_or((DEFAULT_WIDTH, DEFAULT_HEIGHT));

        Self {
            width: width.unwrap_or(term_width.min(DEFAULT_WIDTH)).max(1),
            height: height.unwrap_or(term_height.saturating_sub(5).min(DEFAULT_HEIGHT)).max(1),
        }
    }

    /// Frame with the guide crop outlined.
    pub fn render_with_guide(&self, frame: &RgbaImage, region: &SourceRegion) -> String {
        let mut grid = self.image_to_ascii(frame);
        self.draw_guide_box(&mut grid, region, frame.width() as f64, frame.height() as f64);
        self.grid_to_string(&grid)
    }

    pub fn render(&self, frame: &RgbaImage) -> String {
        self.grid_to_string(&self.image_to_ascii(frame))
    }

    fn image_to_ascii(&self, frame: &RgbaImage) -> Vec<Vec<char>> {
        let mut grid = vec![vec![' '; self.width]; self.height];
        let ramp: Vec<char> = ASCII_RAMP.chars().collect();
        let (img_width, img_height) = frame.dimensions();
        if img_width == 0 || img_height == 0 {
            return grid;
        }

        for (term_y, row) in grid.iter_mut().enumerate() {
            for (term_x, cell) in row.iter_mut().enumerate() {
                let img_x = (term_x as f32 / self.width as f32 * img_width as f32) as u32;
                let img_y = (term_y as f32 / self.height as f32 * img_height as f32) as u32;

                let [r, g, b, _] = frame.get_pixel(img_x.min(img_width - 1), img_y.min(img_height - 1)).0;
                let brightness = crate::core::quality::luma(r, g, b);
                let idx = (brightness / 255.0 * (ramp.len() - 1) as f64).round() as usize;
                *cell = ramp[idx.min(ramp.len() - 1)];
            }
        }

        grid
    }

    fn draw_guide_box(&self, grid: &mut [Vec<char>], region: &SourceRegion, img_width: f64, img_height: f64) {
        if img_width <= 0.0 || img_height <= 0.0 {
            return;
        }
        let to_col = |x: f64| ((x / img_width) * self.width as f64).clamp(0.0, (self.width - 1) as f64) as usize;
        let to_row = |y: f64| ((y / img_height) * self.height as f64).clamp(0.0, (self.height - 1) as f64) as usize;

        let (x1, x2) = (to_col(region.x), to_col(region.x + region.width));
        let (y1, y2) = (to_row(region.y), to_row(region.y + region.height));
        if x2 <= x1 || y2 <= y1 {
            return;
        }

        for x in x1 + 1..x2 {
            grid[y1][x] = '─';
            grid[y2][x] = '─';
        }
        for row in grid.iter_mut().take(y2).skip(y1 + 1) {
            row[x1] = '│';
            row[x2] = '│';
        }
        grid[y1][x1] = '┌';
        grid[y1][x2] = '┐';
        grid[y2][x1] = '└';
        grid[y2][x2] = '┘';
    }

    fn grid_to_string(&self, grid: &[Vec<char>]) -> String {
        grid.iter()
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn clear_screen() -> io::Result<()> {
    crossterm::execute!(
        io::stdout(),
        terminal::Clear(ClearType::All),
        cursor::MoveTo(0, 0)
    )?;
    io::stdout().flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_black_and_white_use_ramp_ends() {
        let renderer = AsciiRenderer::new(Some(2), Some(1));
        let frame = RgbaImage::from_fn(2, 1, |x, _| {
            if x == 0 { Rgba([0, 0, 0, 255]) } else { Rgba([255, 255, 255, 255]) }
        });
        assert_eq!(renderer.render(&frame), " @");
    }

    #[test]
    fn test_guide_box_corners() {
        let renderer = AsciiRenderer::new(Some(10), Some(5));
        let frame = RgbaImage::from_pixel(100, 50, Rgba([0, 0, 0, 255]));
        let region = SourceRegion { x: 20.0, y: 10.0, width: 50.0, height: 30.0 };

        let text = renderer.render_with_guide(&frame, &region);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[1].chars().nth(2), Some('┌'));
        assert_eq!(lines[1].chars().nth(7), Some('┐'));
        assert_eq!(lines[4].chars().nth(2), Some('└'));
        assert_eq!(lines[2].chars().nth(2), Some('│'));
    }
}
