//! Terminal drawing surface.
//!
//! Renders RGB images with Unicode half-block characters, so every terminal
//! cell shows two vertically stacked pixels.

use crossterm::{
    event::{self, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use image::RgbImage;
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    style::Style, widgets::Widget,
};
use std::io::{self, Stdout, stdout};
use std::time::Duration;
use tracing::warn;

/// A raw-mode alternate screen. The terminal is restored on `restore` or drop.
pub struct TerminalScreen {
    terminal: Option<Terminal<CrosstermBackend<Stdout>>>,
}

impl TerminalScreen {
    pub fn open() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                let _ = disable_raw_mode();
                return Err(e);
            }
        };
        Ok(Self {
            terminal: Some(terminal),
        })
    }

    /// Size in image pixels available above the status line.
    pub fn canvas_size(&self) -> io::Result<(u32, u32)> {
        let Some(terminal) = &self.terminal else {
            return Err(closed());
        };
        let size = terminal.size()?;
        Ok((
            size.width as u32,
            size.height.saturating_sub(1) as u32 * 2,
        ))
    }

    /// Draw `image` scaled into the screen with `status` on the bottom line.
    pub fn draw(&mut self, image: Option<&RgbImage>, status: &str) -> io::Result<()> {
        let Some(terminal) = &mut self.terminal else {
            return Err(closed());
        };
        terminal.draw(|f| {
            let area = f.area();
            let image_area = Rect {
                height: area.height.saturating_sub(1),
                ..area
            };
            let status_area = Rect {
                y: area.y + area.height.saturating_sub(1),
                height: 1.min(area.height),
                ..area
            };
            f.render_widget(FrameWidget { image }, image_area);
            f.render_widget(StatusBar { message: status }, status_area);
        })?;
        Ok(())
    }

    /// Wait up to `timeout` for a key press. `Duration::ZERO` never blocks.
    pub fn next_key(&mut self, timeout: Duration) -> io::Result<Option<KeyEvent>> {
        if self.terminal.is_none() {
            return Err(closed());
        }
        if event::poll(timeout)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            return Ok(Some(key));
        }
        Ok(None)
    }

    /// Leave the alternate screen and raw mode. Safe to call twice.
    pub fn restore(&mut self) {
        let Some(mut terminal) = self.terminal.take() else {
            return;
        };
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to disable raw mode: {}", e);
        }
        if let Err(e) = execute!(terminal.backend_mut(), LeaveAlternateScreen) {
            warn!("Failed to leave alternate screen: {}", e);
        }
        if let Err(e) = terminal.show_cursor() {
            warn!("Failed to show cursor: {}", e);
        }
    }
}

impl Drop for TerminalScreen {
    fn drop(&mut self) {
        self.restore();
    }
}

fn closed() -> io::Error {
    io::Error::other("terminal already restored")
}

/// Half-block rendering of an RGB image, aspect-preserving and centered.
pub struct FrameWidget<'a> {
    pub image: Option<&'a RgbImage>,
}

impl Widget for FrameWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(image) = self.image.filter(|i| i.width() > 0 && i.height() > 0) else {
            let msg = "Waiting for camera...";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };
        if area.width == 0 || area.height == 0 {
            return;
        }

        let (display_width, display_height) =
            fit(image.width(), image.height(), area.width, area.height);
        if display_width == 0 || display_height == 0 {
            return;
        }

        let x_offset = area.x + (area.width - display_width) / 2;
        let y_offset = area.y + (area.height - display_height) / 2;
        let x_scale = image.width() as f64 / display_width as f64;
        let y_scale = image.height() as f64 / (display_height as f64 * 2.0);

        // upper pixel is the foreground of '▀', lower pixel the background
        for ty in 0..display_height {
            for tx in 0..display_width {
                let src_x = (tx as f64 * x_scale) as u32;
                let src_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                if let Some(cell) = buf.cell_mut((x_offset + tx, y_offset + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(sample(image, src_x, src_top));
                    cell.set_bg(sample(image, src_x, src_bottom));
                }
            }
        }
    }
}

/// Largest cell rectangle holding an image of `width` x `height` pixels
/// at its aspect ratio, two pixels per cell vertically.
fn fit(width: u32, height: u32, cols: u16, rows: u16) -> (u16, u16) {
    let aspect = width as f64 / height as f64;
    let term_width = cols as f64;
    let term_height = rows as f64 * 2.0;

    if term_width / term_height > aspect {
        let h = term_height;
        (((h * aspect) as u16).min(cols), (h / 2.0) as u16)
    } else {
        let w = term_width;
        (w as u16, ((w / aspect / 2.0) as u16).min(rows))
    }
}

fn sample(image: &RgbImage, x: u32, y: u32) -> Color {
    let [r, g, b] = image
        .get_pixel(x.min(image.width() - 1), y.min(image.height() - 1))
        .0;
    Color::Rgb(r, g, b)
}

/// Single-line status bar.
pub struct StatusBar<'a> {
    pub message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let style = Style::default().fg(Color::White).bg(Color::DarkGray);
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }
        let text: String = self.message.chars().take(area.width as usize).collect();
        buf.set_string(area.x, area.y, text, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_fit_keeps_aspect() {
        // 4:3 image in an 80x24 terminal (48 pixel rows): height bound
        assert_eq!(fit(640, 480, 80, 24), (64, 24));
        // wide terminal strip: width bound
        assert_eq!(fit(640, 480, 20, 40), (20, 7));
    }

    #[test]
    fn test_frame_widget_half_blocks() {
        let mut image = RgbImage::from_pixel(2, 2, Rgb([0, 0, 255]));
        image.put_pixel(0, 0, Rgb([255, 0, 0]));
        image.put_pixel(0, 1, Rgb([0, 255, 0]));

        let area = Rect::new(0, 0, 2, 1);
        let mut buf = Buffer::empty(area);
        FrameWidget { image: Some(&image) }.render(area, &mut buf);

        let cell = &buf[(0, 0)];
        assert_eq!(cell.symbol(), "▀");
        assert_eq!(cell.fg, Color::Rgb(255, 0, 0));
        assert_eq!(cell.bg, Color::Rgb(0, 255, 0));
        assert_eq!(buf[(1, 0)].fg, Color::Rgb(0, 0, 255));
    }

    #[test]
    fn test_frame_widget_placeholder() {
        let area = Rect::new(0, 0, 30, 3);
        let mut buf = Buffer::empty(area);
        FrameWidget { image: None }.render(area, &mut buf);
        let line: String = (0..30).map(|x| buf[(x, 1)].symbol().to_string()).collect();
        assert!(line.contains("Waiting for camera..."));
    }

    #[test]
    fn test_status_bar_truncates() {
        let area = Rect::new(0, 0, 5, 1);
        let mut buf = Buffer::empty(area);
        StatusBar { message: "capture | quit" }.render(area, &mut buf);
        let line: String = (0..5).map(|x| buf[(x, 0)].symbol().to_string()).collect();
        assert_eq!(line, "captu");
    }
}
