use std::path::PathBuf;
use std::thread;

use ab_glyph::FontVec;
use chrono::{DateTime, Datelike, Local};
use crossbeam_channel::Sender;
use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{error, info};

use crate::domain::{DirectoryError, Message, ATTRIBUTION};
use crate::model::CardView;

// Base geometry of the landscape canvas; everything is multiplied by
// the job's scale factor before rasterization.
const GRID_COLUMNS: usize = 5;
const CARD_WIDTH: u32 = 230;
const CARD_HEIGHT: u32 = 100;
const CARD_GAP: u32 = 12;
const CARD_PADDING: u32 = 10;
const MARGIN: u32 = 24;
const HEADER_HEIGHT: u32 = 42;
const FOOTER_HEIGHT: u32 = 30;
const LINE_HEIGHT: u32 = 16;
const TITLE_SIZE: f32 = 24.0;
const NAME_SIZE: f32 = 14.0;
const FIELD_SIZE: f32 = 11.0;
const CARD_LINE_CHARS: usize = 34;

const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);
const INK: Rgba<u8> = Rgba([24, 24, 24, 255]);
const MUTED: Rgba<u8> = Rgba([90, 90, 90, 255]);
const BORDER: Rgba<u8> = Rgba([204, 204, 204, 255]);

// Probed in order; the first readable font wins. Rasterizing without
// any of these is an export failure.
const FONT_CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Everything the renderer needs, captured at trigger time so the
/// event loop can keep mutating the model while we draw.
#[derive(Debug, Clone)]
pub struct SnapshotJob {
    pub header: String,
    pub cards: Vec<CardView>,
    pub footer: String,
    pub path: PathBuf,
    pub scale: u32,
}

/// Render and save off the event loop. Failures are logged and
/// dropped; only success reports back.
pub fn spawn_render(job: SnapshotJob, events: Sender<Message>) {
    thread::spawn(move || match render_to_file(&job) {
        Ok(()) => {
            info!("Exported snapshot to {:?}", job.path);
            let _ = events.send(Message::ExportFinished(job.path.clone()));
        }
        Err(e) => error!("Snapshot export failed: {}", e),
    });
}

pub fn render_to_file(job: &SnapshotJob) -> Result<(), DirectoryError> {
    let image = render(job)?;
    image
        .save(&job.path)
        .map_err(|e| DirectoryError::Snapshot(e.to_string()))?;
    Ok(())
}

/// Canvas dimensions for a page of cards, already scaled. The grid is
/// wider than it is tall for a full page, matching the landscape
/// orientation of the captured region.
pub fn canvas_size(ncards: usize, scale: u32) -> (u32, u32) {
    let rows = ncards.div_ceil(GRID_COLUMNS).max(1) as u32;
    let cols = GRID_COLUMNS as u32;
    let width = 2 * MARGIN + cols * CARD_WIDTH + (cols - 1) * CARD_GAP;
    let height =
        2 * MARGIN + HEADER_HEIGHT + rows * CARD_HEIGHT + (rows - 1) * CARD_GAP + FOOTER_HEIGHT;
    (width * scale, height * scale)
}

pub fn render(job: &SnapshotJob) -> Result<RgbaImage, DirectoryError> {
    let font = load_font()?;
    let s = job.scale;
    let (width, height) = canvas_size(job.cards.len(), s);
    let mut canvas = RgbaImage::from_pixel(width, height, PAPER);

    draw_text_mut(
        &mut canvas,
        INK,
        (MARGIN * s) as i32,
        (MARGIN * s) as i32,
        TITLE_SIZE * s as f32,
        &font,
        &job.header,
    );

    for (i, card) in job.cards.iter().enumerate() {
        let col = (i % GRID_COLUMNS) as u32;
        let row = (i / GRID_COLUMNS) as u32;
        let x = s * (MARGIN + col * (CARD_WIDTH + CARD_GAP));
        let y = s * (MARGIN + HEADER_HEIGHT + row * (CARD_HEIGHT + CARD_GAP));
        draw_card(&mut canvas, &font, card, x, y, s);
    }

    draw_text_mut(
        &mut canvas,
        MUTED,
        (MARGIN * s) as i32,
        (height - (MARGIN + FOOTER_HEIGHT / 2) * s) as i32,
        FIELD_SIZE * s as f32,
        &font,
        &job.footer,
    );

    Ok(canvas)
}

fn draw_card(canvas: &mut RgbaImage, font: &FontVec, card: &CardView, x: u32, y: u32, s: u32) {
    draw_hollow_rect_mut(
        canvas,
        Rect::at(x as i32, y as i32).of_size(CARD_WIDTH * s, CARD_HEIGHT * s),
        BORDER,
    );

    let text_x = (x + CARD_PADDING * s) as i32;
    let mut text_y = (y + CARD_PADDING * s) as i32;

    draw_text_mut(
        canvas,
        INK,
        text_x,
        text_y,
        NAME_SIZE * s as f32,
        font,
        &fit(&card.name, CARD_LINE_CHARS),
    );
    text_y += (LINE_HEIGHT * s) as i32 + (s * 2) as i32;

    let fields = [
        format!("Designation: {}", card.designation),
        format!("Room No: {}", card.room),
        format!("Department: {}", card.department),
        format!("Email: {}", card.email),
    ];
    for field in &fields {
        draw_text_mut(
            canvas,
            MUTED,
            text_x,
            text_y,
            FIELD_SIZE * s as f32,
            font,
            &fit(field, CARD_LINE_CHARS),
        );
        text_y += (LINE_HEIGHT * s) as i32;
    }
}

// Long values are shortened with an ellipsis instead of bleeding
// over the card border.
fn fit(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut reduced: String = text.chars().take(width.saturating_sub(3)).collect();
    reduced.push_str("...");
    reduced
}

fn load_font() -> Result<FontVec, DirectoryError> {
    for path in FONT_CANDIDATES {
        if let Ok(bytes) = std::fs::read(path)
            && let Ok(font) = FontVec::try_from_vec(bytes)
        {
            return Ok(font);
        }
    }
    Err(DirectoryError::FontNotFound)
}

/// 1 -> "1st", 2 -> "2nd", 11 -> "11th", 21 -> "21st".
pub fn ordinal_suffix(day: u32) -> &'static str {
    match day % 100 {
        11..=13 => "th",
        _ => match day % 10 {
            1 => "st",
            2 => "nd",
            3 => "rd",
            _ => "th",
        },
    }
}

/// Attribution line written under the card grid, composed when the
/// export is triggered.
pub fn footer_text(now: DateTime<Local>) -> String {
    let day = now.day();
    format!(
        "{}, Downloaded on {}{} {} {} at {}.",
        ATTRIBUTION,
        day,
        ordinal_suffix(day),
        now.format("%B"),
        now.year(),
        now.format("%-I:%M:%S %p")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn ordinal_suffixes() {
        let cases = [
            (1, "1st"),
            (2, "2nd"),
            (3, "3rd"),
            (4, "4th"),
            (11, "11th"),
            (12, "12th"),
            (13, "13th"),
            (21, "21st"),
            (22, "22nd"),
            (23, "23rd"),
            (24, "24th"),
            (31, "31st"),
        ];
        for (day, expected) in cases {
            assert_eq!(format!("{}{}", day, ordinal_suffix(day)), expected);
        }
    }

    #[test]
    fn footer_carries_attribution_date_and_time() {
        let now = Local.with_ymd_and_hms(2025, 3, 1, 15, 42, 7).unwrap();
        let footer = footer_text(now);
        assert_eq!(
            footer,
            "Generated from FARHAN-DEV, Downloaded on 1st March 2025 at 3:42:07 PM."
        );
    }

    #[test]
    fn canvas_is_landscape_for_a_full_page() {
        let (width, height) = canvas_size(20, 2);
        assert!(width > height);

        // An empty page still has somewhere to draw header and footer.
        let (width, height) = canvas_size(0, 2);
        assert!(width > 0 && height > 0);
    }

    #[test]
    fn fit_shortens_long_lines() {
        assert_eq!(fit("short", 10), "short");
        assert_eq!(fit("a very long faculty name indeed", 10), "a very ...");
    }
}
