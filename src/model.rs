use std::ops::Range;
use std::time::Instant;

use arboard::Clipboard;
use chrono::Local;
use crossbeam_channel::Sender;
use rayon::prelude::*;
use ratatui::crossterm::event::{KeyCode, KeyEvent};
use tracing::trace;

use crate::domain::{
    Config, DirectoryError, Message, Modus, Status, DEFAULT_HEADER, EXPORT_SCALE, HELP_TEXT,
    MISSING_FIELD, MISSING_NAME, PAGE_SIZE, SELECTOR_FIELD,
};
use crate::inputter::{InputResult, Inputter};
use crate::snapshot::{self, SnapshotJob};
use crate::source::Record;
use crate::ui::SUGGESTION_LIMIT;

/// One display unit of the card grid. Missing fields are substituted
/// here so neither the terminal renderer nor the snapshot renderer
/// has to care.
#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub name: String,
    pub designation: String,
    pub room: String,
    pub department: String,
    pub email: String,
}

impl CardView {
    pub fn from_record(record: &Record) -> Self {
        CardView {
            name: Self::display(record, SELECTOR_FIELD, MISSING_NAME),
            designation: Self::display(record, "Designation", MISSING_FIELD),
            room: Self::display(record, "Room No", MISSING_FIELD),
            department: Self::display(record, "Department", MISSING_FIELD),
            email: Self::display(record, "Email", MISSING_FIELD),
        }
    }

    // An empty string counts as missing, same as an absent field.
    fn display(record: &Record, field: &str, placeholder: &str) -> String {
        record
            .field(field)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| placeholder.to_string())
    }

    pub fn as_text(&self) -> String {
        format!(
            "{}\nDesignation: {}\nRoom No: {}\nDepartment: {}\nEmail: {}",
            self.name, self.designation, self.room, self.department, self.email
        )
    }
}

/// Everything the UI needs for one frame. Rebuilt in full on every
/// model mutation; a page holds at most PAGE_SIZE cards.
pub struct UIData {
    pub header: String,
    pub cards: Vec<CardView>,
    pub empty: bool,
    pub nrows: usize,
    pub ntotal: usize,
    pub page: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
    pub selected: usize,
    pub query: String,
    pub faculty: String,
    pub modus: Modus,
    pub cmdinput: InputResult,
    pub suggestions: Vec<String>,
    pub show_popup: bool,
    pub popup_message: String,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            header: DEFAULT_HEADER.to_string(),
            cards: Vec::new(),
            empty: true,
            nrows: 0,
            ntotal: 0,
            page: 1,
            total_pages: 0,
            has_prev: false,
            has_next: false,
            selected: 0,
            query: String::new(),
            faculty: String::new(),
            modus: Modus::BROWSE,
            cmdinput: InputResult::default(),
            suggestions: Vec::new(),
            show_popup: false,
            popup_message: String::new(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        }
    }
}

pub struct Model {
    config: Config,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    data: Vec<Record>,
    faculty_names: Vec<String>,
    filtered: Vec<usize>,
    faculty_filter: String,
    query: String,
    page: usize,
    selected: usize,
    input: Inputter,
    clipboard: Option<Clipboard>,
    events: Sender<Message>,
    uidata: UIData,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(config: &Config, events: Sender<Message>) -> Result<Self, DirectoryError> {
        let mut model = Self {
            config: config.clone(),
            status: Status::LOADING,
            modus: Modus::BROWSE,
            previous_modus: Modus::BROWSE,
            data: Vec::new(),
            faculty_names: Vec::new(),
            filtered: Vec::new(),
            faculty_filter: String::new(),
            query: String::new(),
            page: 1,
            selected: 0,
            input: Inputter::default(),
            clipboard: Clipboard::new().ok(),
            events,
            uidata: UIData::empty(),
            status_message: String::new(),
            last_status_message_update: Instant::now(),
        };
        model.set_status_message("Loading ...".to_string());
        Ok(model)
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn raw_keyevents(&self) -> bool {
        matches!(self.modus, Modus::SEARCH | Modus::FACULTY)
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    // ------------------------- Filter engine ------------------------- //

    /// Indices of the records satisfying both criteria, source order.
    /// The scan is parallel; rayon's collect keeps the order stable.
    pub fn filter_records(data: &[Record], faculty: &str, query: &str) -> Vec<usize> {
        let faculty = faculty.trim().to_lowercase();
        let query = query.trim().to_lowercase();

        data.par_iter()
            .enumerate()
            .filter(|(_, record)| {
                let selector_match = faculty.is_empty()
                    || record
                        .field(SELECTOR_FIELD)
                        .map(|value| value.to_lowercase().contains(&faculty))
                        .unwrap_or(false);
                let query_match = query.is_empty()
                    || record
                        .values()
                        .any(|value| value.to_lowercase().contains(&query));
                selector_match && query_match
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Distinct, sorted selector values across the whole dataset.
    /// Computed once at load, used for the suggestion list.
    pub fn faculty_values(data: &[Record]) -> Vec<String> {
        let mut names: Vec<String> = data
            .iter()
            .filter_map(|record| record.field(SELECTOR_FIELD))
            .filter(|name| !name.is_empty())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    // ---------------------- Pagination controller --------------------- //

    /// The page slice [(page-1)*size, page*size), clipped to the subset.
    /// An empty range is the empty-result state, not an error.
    pub fn page_slice(len: usize, page: usize, page_size: usize) -> Range<usize> {
        let start = page.saturating_sub(1).saturating_mul(page_size).min(len);
        let end = (start + page_size).min(len);
        start..end
    }

    pub fn has_prev(page: usize) -> bool {
        page > 1
    }

    pub fn has_next(page: usize, len: usize, page_size: usize) -> bool {
        page * page_size < len
    }

    pub fn total_pages(len: usize, page_size: usize) -> usize {
        len.div_ceil(page_size)
    }

    // -------------------------- Update loop --------------------------- //

    pub fn update(&mut self, message: Message) -> Result<(), DirectoryError> {
        // Results from the background threads apply in any modus.
        let message = match message {
            Message::DataLoaded(records) => {
                self.data_loaded(records);
                return Ok(());
            }
            Message::LoadFailed(_) => {
                // Already logged by the loader; the dataset stays empty.
                self.status = Status::EMPTY;
                self.update_uidata();
                return Ok(());
            }
            Message::ExportFinished(path) => {
                self.set_status_message(format!("Saved snapshot to {}", path.display()));
                return Ok(());
            }
            other => other,
        };

        match self.modus {
            Modus::BROWSE => match message {
                Message::Quit => self.quit(),
                Message::NextPage => self.next_page(),
                Message::PrevPage => self.prev_page(),
                Message::MoveUp | Message::MoveLeft => self.move_selection(-1),
                Message::MoveDown | Message::MoveRight => self.move_selection(1),
                Message::EditSearch => self.enter_edit(Modus::SEARCH),
                Message::EditFaculty => self.enter_edit(Modus::FACULTY),
                Message::ClearFilters => self.clear_filters(),
                Message::CopyCard => self.copy_card(),
                Message::Export => self.start_export(),
                Message::Help => self.show_help(),
                _ => (),
            },
            Modus::SEARCH | Modus::FACULTY => {
                if let Message::RawKey(key) = message {
                    self.raw_input(key);
                }
            }
            Modus::POPUP => match message {
                Message::Quit => self.quit(),
                Message::Help | Message::Exit => self.close_popup(),
                _ => (),
            },
        }
        Ok(())
    }

    fn data_loaded(&mut self, records: Vec<Record>) {
        self.faculty_names = Self::faculty_values(&records);
        self.data = records;
        self.status = Status::READY;
        self.set_status_message(format!("Loaded {} records", self.data.len()));
        self.apply_filters();
    }

    // Recompute the filtered subset in full and drop back to page 1.
    fn apply_filters(&mut self) {
        self.filtered = Self::filter_records(&self.data, &self.faculty_filter, &self.query);
        self.page = 1;
        self.selected = 0;
        self.update_uidata();
    }

    fn clear_filters(&mut self) {
        self.faculty_filter.clear();
        self.query.clear();
        self.apply_filters();
    }

    fn next_page(&mut self) {
        if Self::has_next(self.page, self.filtered.len(), PAGE_SIZE) {
            self.page += 1;
            self.selected = 0;
            self.update_uidata();
        }
    }

    fn prev_page(&mut self) {
        if Self::has_prev(self.page) {
            self.page -= 1;
            self.selected = 0;
            self.update_uidata();
        }
    }

    fn move_selection(&mut self, delta: isize) {
        let visible = Self::page_slice(self.filtered.len(), self.page, PAGE_SIZE).len();
        if visible == 0 {
            return;
        }
        let target = self.selected as isize + delta;
        self.selected = target.clamp(0, visible as isize - 1) as usize;
        self.update_uidata();
    }

    // ---------------------- Criteria input handling -------------------- //

    fn enter_edit(&mut self, modus: Modus) {
        self.previous_modus = self.modus;
        self.modus = modus;
        self.input.clear();
        let preset = match modus {
            Modus::SEARCH => self.query.clone(),
            Modus::FACULTY => self.faculty_filter.clone(),
            _ => String::new(),
        };
        self.input.set(&preset);
        self.update_uidata();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        // Tab completes the first suggestion while the faculty filter
        // is being edited.
        if self.modus == Modus::FACULTY && key.code == KeyCode::Tab {
            if let Some(first) = self.suggestions().first().cloned() {
                self.input.set(&first);
            }
            self.apply_live_input();
            return;
        }

        let result = self.input.read(key);
        if result.finished {
            self.commit_input(result);
        } else {
            self.apply_live_input();
        }
    }

    // Criteria changes take effect on every keystroke.
    fn apply_live_input(&mut self) {
        let value = self.input.get().input;
        match self.modus {
            Modus::SEARCH => self.query = value,
            Modus::FACULTY => self.faculty_filter = value,
            _ => return,
        }
        self.apply_filters();
    }

    // Enter keeps the value, Esc has already cleared it.
    fn commit_input(&mut self, result: InputResult) {
        match self.modus {
            Modus::SEARCH => self.query = result.input,
            Modus::FACULTY => self.faculty_filter = result.input,
            _ => {}
        }
        self.previous_modus = self.modus;
        self.modus = Modus::BROWSE;
        self.apply_filters();
    }

    fn suggestions(&self) -> Vec<String> {
        let needle = self.faculty_filter.trim().to_lowercase();
        self.faculty_names
            .iter()
            .filter(|name| needle.is_empty() || name.to_lowercase().contains(&needle))
            .take(SUGGESTION_LIMIT)
            .cloned()
            .collect()
    }

    // -------------------- Control handling functions ---------------------- //

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
        self.update_uidata();
    }

    fn close_popup(&mut self) {
        self.modus = self.previous_modus;
        self.previous_modus = Modus::POPUP;
        self.update_uidata();
    }

    fn copy_card(&mut self) {
        let range = Self::page_slice(self.filtered.len(), self.page, PAGE_SIZE);
        let Some(&idx) = self.filtered.get(range.start + self.selected) else {
            return;
        };
        let content = CardView::from_record(&self.data[idx]).as_text();

        match self.clipboard.as_mut() {
            Some(clipboard) => match clipboard.set_text(content) {
                Ok(_) => trace!("Copied card content to clipboard."),
                Err(e) => trace!("Error copying to clipboard: {:?}", e),
            },
            None => trace!("Clipboard is not available."),
        }
    }

    /// Capture the current view and render it off the event loop.
    /// A second trigger while one is in flight is not prevented; the
    /// last write to the output file wins.
    fn start_export(&mut self) {
        let job = SnapshotJob {
            header: self.uidata.header.clone(),
            cards: self.uidata.cards.clone(),
            footer: snapshot::footer_text(Local::now()),
            path: self.config.export_path.clone(),
            scale: EXPORT_SCALE,
        };
        snapshot::spawn_render(job, self.events.clone());
        self.set_status_message("Rendering snapshot ...".to_string());
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        self.update_uidata();
    }

    fn update_uidata(&mut self) {
        let range = Self::page_slice(self.filtered.len(), self.page, PAGE_SIZE);
        let cards: Vec<CardView> = self.filtered[range]
            .iter()
            .map(|&idx| CardView::from_record(&self.data[idx]))
            .collect();

        let header = if self.faculty_filter.trim().is_empty() {
            DEFAULT_HEADER.to_string()
        } else {
            format!("[{}]", self.faculty_filter)
        };

        self.uidata = UIData {
            header,
            empty: cards.is_empty(),
            nrows: self.filtered.len(),
            ntotal: self.data.len(),
            page: self.page,
            total_pages: Self::total_pages(self.filtered.len(), PAGE_SIZE),
            has_prev: Self::has_prev(self.page),
            has_next: Self::has_next(self.page, self.filtered.len(), PAGE_SIZE),
            selected: self.selected,
            cards,
            query: self.query.clone(),
            faculty: self.faculty_filter.clone(),
            modus: self.modus,
            cmdinput: self.input.get(),
            suggestions: if self.modus == Modus::FACULTY {
                self.suggestions()
            } else {
                Vec::new()
            },
            show_popup: self.modus == Modus::POPUP,
            popup_message: if self.modus == Modus::POPUP {
                HELP_TEXT.to_string()
            } else {
                String::new()
            },
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;
    use ratatui::crossterm::event::KeyModifiers;

    fn dataset() -> Vec<Record> {
        vec![
            Record::from_pairs(&[("Faculty Name", "Jane Doe"), ("Department", "CS")]),
            Record::from_pairs(&[("Faculty Name", "John Roe"), ("Department", "EE")]),
        ]
    }

    fn numbered(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| {
                Record::from_pairs(&[
                    ("Faculty Name", format!("Person {i:03}").as_str()),
                    ("Department", "CS"),
                ])
            })
            .collect()
    }

    fn test_model(records: Vec<Record>) -> Model {
        let (tx, _rx) = unbounded();
        let mut model = Model::init(&Config::default(), tx).unwrap();
        model.update(Message::DataLoaded(records)).unwrap();
        model
    }

    fn type_text(model: &mut Model, text: &str) {
        for chr in text.chars() {
            model
                .update(Message::RawKey(KeyEvent::new(
                    KeyCode::Char(chr),
                    KeyModifiers::NONE,
                )))
                .unwrap();
        }
    }

    #[test]
    fn empty_criteria_return_the_full_dataset_in_order() {
        let data = numbered(30);
        let filtered = Model::filter_records(&data, "", "");
        assert_eq!(filtered, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn selector_matches_case_insensitive_substrings() {
        let data = dataset();
        assert_eq!(Model::filter_records(&data, "jane", ""), vec![0]);
        assert_eq!(Model::filter_records(&data, "  JANE ", ""), vec![0]);
        assert_eq!(Model::filter_records(&data, "oe", ""), vec![0, 1]);
        assert!(Model::filter_records(&data, "smith", "").is_empty());
    }

    #[test]
    fn query_matches_any_field() {
        let data = dataset();
        assert_eq!(Model::filter_records(&data, "", "ee"), vec![1]);
        assert_eq!(Model::filter_records(&data, "", "doe"), vec![0]);
        assert_eq!(Model::filter_records(&data, "", "e"), vec![0, 1]);
    }

    #[test]
    fn both_criteria_are_anded() {
        let data = dataset();
        assert_eq!(Model::filter_records(&data, "roe", "ee"), vec![1]);
        assert!(Model::filter_records(&data, "jane", "ee").is_empty());
    }

    #[test]
    fn missing_selector_field_fails_a_nonempty_selector() {
        let data = vec![
            Record::from_pairs(&[("Department", "CS")]),
            Record::from_pairs(&[("Faculty Name", "Jane Doe"), ("Department", "CS")]),
        ];
        assert_eq!(Model::filter_records(&data, "doe", ""), vec![1]);
        // ... but the record still shows up in a free-text search.
        assert_eq!(Model::filter_records(&data, "", "cs"), vec![0, 1]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let data = numbered(50);
        let first = Model::filter_records(&data, "1", "cs");
        let second = Model::filter_records(&data, "1", "cs");
        assert_eq!(first, second);
    }

    #[test]
    fn pages_cover_the_subset_without_gaps_or_duplicates() {
        let data = numbered(45);
        let filtered = Model::filter_records(&data, "", "");
        let mut joined = Vec::new();
        for page in 1..=Model::total_pages(filtered.len(), PAGE_SIZE) {
            let range = Model::page_slice(filtered.len(), page, PAGE_SIZE);
            joined.extend_from_slice(&filtered[range]);
        }
        assert_eq!(joined, filtered);
    }

    #[test]
    fn navigation_flags_at_the_boundaries() {
        // n=25: page 1 has a next page but no previous, page 2 the inverse.
        assert!(Model::has_next(1, 25, PAGE_SIZE));
        assert!(!Model::has_prev(1));
        assert!(!Model::has_next(2, 25, PAGE_SIZE));
        assert!(Model::has_prev(2));

        // A single partial page has neither.
        assert!(!Model::has_next(1, 20, PAGE_SIZE));
        assert!(!Model::has_next(1, 1, PAGE_SIZE));
        assert!(!Model::has_next(1, 0, PAGE_SIZE));
    }

    #[test]
    fn page_slice_is_clipped_to_the_subset() {
        assert_eq!(Model::page_slice(45, 1, PAGE_SIZE), 0..20);
        assert_eq!(Model::page_slice(45, 3, PAGE_SIZE), 40..45);
        assert_eq!(Model::page_slice(45, 9, PAGE_SIZE), 45..45);
        assert_eq!(Model::page_slice(0, 1, PAGE_SIZE), 0..0);
    }

    #[test]
    fn faculty_values_are_distinct_and_sorted() {
        let data = vec![
            Record::from_pairs(&[("Faculty Name", "Zoe")]),
            Record::from_pairs(&[("Faculty Name", "Ada")]),
            Record::from_pairs(&[("Faculty Name", "Zoe")]),
            Record::from_pairs(&[("Faculty Name", "")]),
            Record::from_pairs(&[("Department", "CS")]),
        ];
        assert_eq!(Model::faculty_values(&data), vec!["Ada", "Zoe"]);
    }

    #[test]
    fn cards_substitute_placeholders() {
        let record = Record::from_pairs(&[("Faculty Name", "Jane Doe"), ("Email", "")]);
        let card = CardView::from_record(&record);
        assert_eq!(card.name, "Jane Doe");
        assert_eq!(card.designation, MISSING_FIELD);
        assert_eq!(card.email, MISSING_FIELD);

        let nameless = CardView::from_record(&Record::from_pairs(&[("Department", "CS")]));
        assert_eq!(nameless.name, MISSING_NAME);
    }

    #[test]
    fn live_editing_refilters_and_resets_the_page() {
        let mut model = test_model(numbered(45));
        assert_eq!(model.get_uidata().nrows, 45);

        model.update(Message::NextPage).unwrap();
        assert_eq!(model.get_uidata().page, 2);

        model.update(Message::EditSearch).unwrap();
        type_text(&mut model, "person 04");
        let uidata = model.get_uidata();
        assert_eq!(uidata.nrows, 5);
        assert_eq!(uidata.page, 1);

        // Enter commits and returns to browsing.
        model
            .update(Message::RawKey(KeyEvent::new(
                KeyCode::Enter,
                KeyModifiers::NONE,
            )))
            .unwrap();
        assert_eq!(model.get_uidata().nrows, 5);
        assert!(!model.raw_keyevents());
    }

    #[test]
    fn selector_editing_updates_the_header() {
        let mut model = test_model(dataset());
        assert_eq!(model.get_uidata().header, DEFAULT_HEADER);

        model.update(Message::EditFaculty).unwrap();
        type_text(&mut model, "jane");
        let uidata = model.get_uidata();
        assert_eq!(uidata.header, "[jane]");
        assert_eq!(uidata.nrows, 1);
        assert_eq!(uidata.cards[0].name, "Jane Doe");
        assert_eq!(uidata.suggestions, vec!["Jane Doe"]);

        // Esc clears the criterion again.
        model
            .update(Message::RawKey(KeyEvent::new(
                KeyCode::Esc,
                KeyModifiers::NONE,
            )))
            .unwrap();
        let uidata = model.get_uidata();
        assert_eq!(uidata.header, DEFAULT_HEADER);
        assert_eq!(uidata.nrows, 2);
    }

    #[test]
    fn empty_subset_yields_the_empty_display_state() {
        let mut model = test_model(dataset());
        model.update(Message::EditSearch).unwrap();
        type_text(&mut model, "does not exist");
        let uidata = model.get_uidata();
        assert!(uidata.empty);
        assert!(uidata.cards.is_empty());
        assert!(!uidata.has_prev);
        assert!(!uidata.has_next);
    }

    #[test]
    fn navigation_is_a_noop_at_the_edges() {
        let mut model = test_model(numbered(25));
        model.update(Message::PrevPage).unwrap();
        assert_eq!(model.get_uidata().page, 1);
        model.update(Message::NextPage).unwrap();
        model.update(Message::NextPage).unwrap();
        assert_eq!(model.get_uidata().page, 2);
        assert_eq!(model.get_uidata().cards.len(), 5);
    }

    #[test]
    fn tab_completes_the_first_suggestion() {
        let mut model = test_model(dataset());
        model.update(Message::EditFaculty).unwrap();
        type_text(&mut model, "ja");
        model
            .update(Message::RawKey(KeyEvent::new(
                KeyCode::Tab,
                KeyModifiers::NONE,
            )))
            .unwrap();
        let uidata = model.get_uidata();
        assert_eq!(uidata.faculty, "Jane Doe");
        assert_eq!(uidata.nrows, 1);
    }

    #[test]
    fn load_failure_leaves_an_empty_dataset() {
        let (tx, _rx) = unbounded();
        let mut model = Model::init(&Config::default(), tx).unwrap();
        model
            .update(Message::LoadFailed("boom".to_string()))
            .unwrap();
        assert_eq!(model.status, Status::EMPTY);
        assert!(model.get_uidata().empty);
    }
}
