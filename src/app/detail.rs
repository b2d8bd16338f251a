// src/app/detail.rs
use tracing::debug;

use super::data::{Episode, Season, ShowDetail};

/// Detail page state: one season expanded at a time, one episode playing.
#[derive(Clone, Debug)]
pub struct ShowViewer {
    detail: ShowDetail,
    open_season: Option<String>,
    selected_episode: Option<usize>,
}

impl ShowViewer {
    pub fn new(detail: ShowDetail) -> Self {
        Self {
            detail,
            open_season: None,
            selected_episode: None,
        }
    }

    pub fn detail(&self) -> &ShowDetail {
        &self.detail
    }

    /// Expand `season_id`, or collapse it when it is already open.
    /// The selected episode is cleared either way. Returns whether a season is open.
    pub fn toggle_season(&mut self, season_id: &str) -> bool {
        self.selected_episode = None;
        if self.open_season.as_deref() == Some(season_id) {
            self.open_season = None;
            return false;
        }
        if !self.detail.seasons.iter().any(|s| s.id == season_id) {
            debug!("no season {season_id} in show {}", self.detail.id);
            self.open_season = None;
            return false;
        }
        self.open_season = Some(season_id.to_string());
        true
    }

    pub fn open_season(&self) -> Option<&Season> {
        let id = self.open_season.as_deref()?;
        self.detail.seasons.iter().find(|s| s.id == id)
    }

    /// Select an episode of the open season by position.
    pub fn select_episode(&mut self, index: usize) -> bool {
        let in_range = self
            .open_season()
            .is_some_and(|season| index < season.episodes.len());
        if in_range {
            self.selected_episode = Some(index);
        }
        in_range
    }

    pub fn now_playing(&self) -> Option<&Episode> {
        self.open_season()?.episodes.get(self.selected_episode?)
    }
}
