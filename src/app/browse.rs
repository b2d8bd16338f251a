// src/app/browse.rs
use std::time::{Duration, Instant};

use tracing::debug;

use super::data::{GenreId, Show};
use super::filters::{filter_and_sort, ShowFilter};
use super::search::Debouncer;
use super::types::LoadState;

/// Home page state: the catalog list, the filter controls, and the debounced
/// search box. Filtering always uses the settled search term, never raw input.
pub struct Browser {
    shows: Vec<Show>,
    load: LoadState,
    filter: ShowFilter,
    search: Debouncer,
    raw_input: String,
}

impl Browser {
    pub fn new(debounce: Duration) -> Self {
        Self {
            shows: Vec::new(),
            load: LoadState::Idle,
            filter: ShowFilter::default(),
            search: Debouncer::new(debounce),
            raw_input: String::new(),
        }
    }

    pub fn set_loading(&mut self) {
        self.load = LoadState::Loading;
    }

    pub fn set_shows(&mut self, shows: Vec<Show>) {
        debug!("browser holds {} shows", shows.len());
        self.shows = shows;
        self.load = LoadState::Ready;
    }

    pub fn set_failed(&mut self, message: impl Into<String>) {
        self.load = LoadState::Failed(message.into());
    }

    pub fn load_state(&self) -> &LoadState {
        &self.load
    }

    pub fn shows(&self) -> &[Show] {
        &self.shows
    }

    pub fn filter(&self) -> &ShowFilter {
        &self.filter
    }

    /// What the search box shows; may run ahead of the applied term.
    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    pub fn type_search(&mut self, value: impl Into<String>, now: Instant) {
        let value = value.into();
        self.raw_input.clone_from(&value);
        self.search.input(value, now);
    }

    /// Apply a settled search term. Returns true when the view changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.search.poll(now) {
            Some(term) => {
                self.filter.search_term = term;
                true
            }
            None => false,
        }
    }

    pub fn set_letter(&mut self, letter: Option<char>) {
        self.filter.set_letter(letter);
    }

    pub fn set_genre(&mut self, genre: Option<GenreId>) {
        self.filter.set_genre(genre);
    }

    pub fn toggle_order(&mut self) {
        self.filter.toggle_order();
    }

    /// "Clear Filter": letter and search term reset at once, no debounce.
    pub fn clear(&mut self) {
        self.filter.clear();
        self.search.reset("");
        self.raw_input.clear();
    }

    pub fn visible(&self) -> Vec<Show> {
        filter_and_sort(&self.shows, &self.filter)
    }

    pub fn teardown(&mut self) {
        self.search.teardown();
    }
}
