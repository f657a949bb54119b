use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Clear, List, ListItem, Paragraph},
};

use crate::domain::Modus;
use crate::model::{CardView, UIData};

pub const HEADER_HEIGHT: u16 = 1;
pub const INPUT_HEIGHT: u16 = 3;
pub const PAGINATION_HEIGHT: u16 = 1;
pub const STATUSLINE_HEIGHT: u16 = 1;
// A bordered card: name in the title row plus four field lines.
pub const CARD_HEIGHT: u16 = 6;
pub const CARD_MIN_WIDTH: u16 = 34;
pub const SUGGESTION_LIMIT: usize = 8;

const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(5);

pub struct DirectoryUI;

impl DirectoryUI {
    pub fn new() -> Self {
        DirectoryUI
    }

    pub fn draw(&mut self, uidata: &UIData, frame: &mut Frame) {
        let [header_area, inputs_area, body_area, pagination_area, status_area] =
            Layout::vertical([
                Constraint::Length(HEADER_HEIGHT),
                Constraint::Length(INPUT_HEIGHT),
                Constraint::Min(0),
                Constraint::Length(PAGINATION_HEIGHT),
                Constraint::Length(STATUSLINE_HEIGHT),
            ])
            .areas(frame.area());

        self.draw_header(uidata, header_area, frame);
        let faculty_input_area = self.draw_inputs(uidata, inputs_area, frame);
        self.draw_body(uidata, body_area, frame);
        self.draw_pagination(uidata, pagination_area, frame);
        self.draw_statusline(uidata, status_area, frame);

        if uidata.modus == Modus::FACULTY {
            self.draw_suggestions(uidata, faculty_input_area, body_area, frame);
        }
        if uidata.show_popup {
            self.draw_popup(uidata, frame);
        }
    }

    fn draw_header(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let line = Line::from(vec![
            " Faculty Directory ".bold(),
            uidata.header.clone().yellow(),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    // Returns the faculty input rect so the suggestion list can hang
    // underneath it.
    fn draw_inputs(&self, uidata: &UIData, area: Rect, frame: &mut Frame) -> Rect {
        let [search_area, faculty_area] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(area);

        self.draw_input(
            "Search </>",
            &uidata.query,
            uidata,
            uidata.modus == Modus::SEARCH,
            search_area,
            frame,
        );
        self.draw_input(
            "Faculty <f>",
            &uidata.faculty,
            uidata,
            uidata.modus == Modus::FACULTY,
            faculty_area,
            frame,
        );
        faculty_area
    }

    fn draw_input(
        &self,
        title: &str,
        value: &str,
        uidata: &UIData,
        active: bool,
        area: Rect,
        frame: &mut Frame,
    ) {
        let block = if active {
            Block::bordered()
                .title(Line::from(title.bold().yellow()))
                .border_style(Style::new().yellow())
        } else {
            Block::bordered().title(Line::from(title.dim()))
        };

        let shown = if active {
            uidata.cmdinput.input.as_str()
        } else {
            value
        };
        frame.render_widget(Paragraph::new(shown).block(block), area);

        if active {
            let curser = uidata.cmdinput.curser_pos.min(area.width.saturating_sub(2) as usize);
            frame.set_cursor_position((area.x + 1 + curser as u16, area.y + 1));
        }
    }

    fn draw_body(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        if uidata.empty {
            // Empty display state: no grid, no pagination, only the
            // no-results indicator.
            let message =
                Paragraph::new(Line::from("No matching faculty found.".dim())).centered();
            let [_, center, _] = Layout::vertical([
                Constraint::Fill(1),
                Constraint::Length(1),
                Constraint::Fill(1),
            ])
            .areas(area);
            frame.render_widget(message, center);
            return;
        }

        let columns = (area.width / CARD_MIN_WIDTH).max(1) as usize;
        let card_width = area.width / columns as u16;

        for (idx, card) in uidata.cards.iter().enumerate() {
            let col = (idx % columns) as u16;
            let row = (idx / columns) as u16;
            let y = area.y + row * CARD_HEIGHT;
            if y + CARD_HEIGHT > area.bottom() {
                // The terminal is too small for a full page; clip.
                break;
            }
            let rect = Rect::new(area.x + col * card_width, y, card_width, CARD_HEIGHT);
            self.draw_card(card, idx == uidata.selected, rect, frame);
        }
    }

    fn draw_card(&self, card: &CardView, selected: bool, area: Rect, frame: &mut Frame) {
        let block = if selected {
            Block::bordered()
                .title(Line::from(card.name.clone().bold().yellow()))
                .border_set(border::THICK)
                .border_style(Style::new().yellow())
        } else {
            Block::bordered().title(Line::from(card.name.clone().bold()))
        };

        let lines = vec![
            field_line("Designation: ", &card.designation),
            field_line("Room No: ", &card.room),
            field_line("Department: ", &card.department),
            field_line("Email: ", &card.email),
        ];
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_suggestions(
        &self,
        uidata: &UIData,
        input_area: Rect,
        body_area: Rect,
        frame: &mut Frame,
    ) {
        if uidata.suggestions.is_empty() {
            return;
        }
        let height = (uidata.suggestions.len() as u16).min(body_area.height);
        let area = Rect::new(
            input_area.x + 1,
            body_area.y,
            input_area.width.saturating_sub(2),
            height,
        );

        let items: Vec<ListItem> = uidata
            .suggestions
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                if idx == 0 {
                    // Tab completes the topmost entry.
                    ListItem::new(Line::from(name.clone().reversed()))
                } else {
                    ListItem::new(Line::from(name.clone()))
                }
            })
            .collect();

        frame.render_widget(Clear, area);
        frame.render_widget(List::new(items), area);
    }

    fn draw_pagination(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        if uidata.empty {
            // Hidden together with the grid.
            return;
        }

        let prev = if uidata.has_prev {
            " <p> prev ".blue().bold()
        } else {
            " <p> prev ".dim()
        };
        let next = if uidata.has_next {
            " <n> next ".blue().bold()
        } else {
            " <n> next ".dim()
        };
        let line = Line::from(vec![
            format!(" Page {}/{} ", uidata.page, uidata.total_pages.max(1)).into(),
            format!("({} of {} records) ", uidata.nrows, uidata.ntotal).dim(),
            prev,
            next,
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_statusline(&self, uidata: &UIData, area: Rect, frame: &mut Frame) {
        let recent = uidata.last_status_message_update.elapsed() < STATUS_MESSAGE_TTL;
        let line = if recent && !uidata.status_message.is_empty() {
            Line::from(uidata.status_message.clone().yellow())
        } else {
            Line::from(" / search  f faculty  n/p page  y copy  d download  ? help  q quit ".dim())
        };
        frame.render_widget(Paragraph::new(line), area);
    }

    fn draw_popup(&self, uidata: &UIData, frame: &mut Frame) {
        let area = popup_area(frame.area(), 44, 18);
        let block = Block::bordered()
            .title(Line::from(" Help ".bold()).centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(
            Paragraph::new(uidata.popup_message.as_str()).block(block),
            area,
        );
    }
}

fn field_line<'a>(label: &'a str, value: &'a str) -> Line<'a> {
    Line::from(vec![Span::from(label).dim(), Span::from(value)])
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
