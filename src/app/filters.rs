// src/app/filters.rs
use std::cmp::Ordering;

use super::data::{genre_name, GenreId, Show};
use super::types::SortOrder;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ShowFilter {
    pub search_term: String,
    pub selected_letter: Option<char>,
    pub selected_genre: Option<GenreId>,
    pub order: SortOrder,
}

impl ShowFilter {
    pub fn set_letter(&mut self, letter: Option<char>) {
        self.selected_letter = letter;
    }

    pub fn set_genre(&mut self, genre: Option<GenreId>) {
        self.selected_genre = genre;
    }

    pub fn toggle_order(&mut self) {
        self.order = self.order.flipped();
    }

    /// "Clear Filter": drops the letter and the search term, keeps genre and order.
    pub fn clear(&mut self) {
        self.selected_letter = None;
        self.search_term.clear();
    }
}

pub fn normalize_title(s: &str) -> String {
    s.to_lowercase()
}

fn matches_search(show: &Show, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    normalize_title(&show.title).contains(needle)
        || show
            .genres
            .iter()
            .filter_map(|id| genre_name(*id))
            .any(|name| name.to_lowercase().contains(needle))
}

fn matches_letter(show: &Show, letter: Option<char>) -> bool {
    let Some(letter) = letter else {
        return true;
    };
    let prefix: String = letter.to_lowercase().collect();
    normalize_title(&show.title).starts_with(&prefix)
}

fn matches_genre(show: &Show, genre: Option<GenreId>) -> bool {
    genre.map_or(true, |g| show.genres.contains(&g))
}

pub fn show_matches(show: &Show, filter: &ShowFilter) -> bool {
    let needle = filter.search_term.to_lowercase();
    matches_search(show, &needle)
        && matches_letter(show, filter.selected_letter)
        && matches_genre(show, filter.selected_genre)
}

/// Filter then sort by lower-cased title. The input is untouched; equal
/// titles keep their input order in both directions.
pub fn filter_and_sort(shows: &[Show], filter: &ShowFilter) -> Vec<Show> {
    let mut out: Vec<(String, &Show)> = shows
        .iter()
        .filter(|s| show_matches(s, filter))
        .map(|s| (normalize_title(&s.title), s))
        .collect();

    // sort_by is stable, and a reversed comparator still reports Equal for ties
    out.sort_by(|(a, _), (b, _)| compare_keys(a, b, filter.order));

    out.into_iter().map(|(_, s)| s.clone()).collect()
}

fn compare_keys(a: &str, b: &str, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Ascending => a.cmp(b),
        SortOrder::Descending => b.cmp(a),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(id: &str, title: &str, genres: &[GenreId]) -> Show {
        Show {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            image: String::new(),
            updated: None,
            genres: genres.to_vec(),
        }
    }

    fn titles(shows: &[Show]) -> Vec<&str> {
        shows.iter().map(|s| s.title.as_str()).collect()
    }

    fn catalog() -> Vec<Show> {
        vec![
            show("1", "Zeta", &[4]),
            show("2", "alpha", &[3]),
            show("3", "Crime Junkie", &[2]),
            show("4", "Business Wars", &[6, 3]),
            show("5", "Bedtime", &[9, 77]),
        ]
    }

    #[test]
    fn sorts_case_insensitively_both_ways() {
        let shows = vec![show("1", "Zeta", &[]), show("2", "alpha", &[])];
        let mut filter = ShowFilter::default();
        assert_eq!(titles(&filter_and_sort(&shows, &filter)), ["alpha", "Zeta"]);
        filter.toggle_order();
        assert_eq!(titles(&filter_and_sort(&shows, &filter)), ["Zeta", "alpha"]);
    }

    #[test]
    fn empty_filter_returns_everything_ascending() {
        let shows = catalog();
        let out = filter_and_sort(&shows, &ShowFilter::default());
        assert_eq!(
            titles(&out),
            ["alpha", "Bedtime", "Business Wars", "Crime Junkie", "Zeta"]
        );
        assert_eq!(shows.len(), 5);
        assert_eq!(shows[0].title, "Zeta");
    }

    #[test]
    fn search_matches_title_or_genre_name() {
        let shows = catalog();
        let filter = ShowFilter {
            search_term: "HISTORY".into(),
            ..Default::default()
        };
        assert_eq!(titles(&filter_and_sort(&shows, &filter)), ["alpha", "Business Wars"]);

        let filter = ShowFilter {
            search_term: "junk".into(),
            ..Default::default()
        };
        assert_eq!(titles(&filter_and_sort(&shows, &filter)), ["Crime Junkie"]);
    }

    #[test]
    fn unmapped_genre_never_matches_search() {
        let shows = vec![show("1", "Quiet", &[77])];
        let filter = ShowFilter {
            search_term: "77".into(),
            ..Default::default()
        };
        assert!(filter_and_sort(&shows, &filter).is_empty());
    }

    #[test]
    fn letter_and_genre_compose_with_search() {
        let shows = catalog();
        let mut filter = ShowFilter::default();
        filter.set_letter(Some('b'));
        assert_eq!(titles(&filter_and_sort(&shows, &filter)), ["Bedtime", "Business Wars"]);

        filter.set_genre(Some(3));
        assert_eq!(titles(&filter_and_sort(&shows, &filter)), ["Business Wars"]);

        filter.search_term = "kids".into();
        assert!(filter_and_sort(&shows, &filter).is_empty());
    }

    #[test]
    fn equal_titles_keep_input_order() {
        let shows = vec![
            show("a", "Same", &[]),
            show("b", "same", &[]),
            show("c", "Other", &[]),
        ];
        let mut filter = ShowFilter::default();
        let ids: Vec<String> = filter_and_sort(&shows, &filter).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["c", "a", "b"]);

        filter.toggle_order();
        let ids: Vec<String> = filter_and_sort(&shows, &filter).into_iter().map(|s| s.id).collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn rerun_is_identical_and_a_subsequence() {
        let shows = catalog();
        let filter = ShowFilter {
            search_term: "e".into(),
            order: SortOrder::Descending,
            ..Default::default()
        };
        let first = filter_and_sort(&shows, &filter);
        assert_eq!(first, filter_and_sort(&shows, &filter));
        assert!(first.iter().all(|s| shows.contains(s)));
        assert!(first.iter().all(|s| show_matches(s, &filter)));
        assert!(first
            .windows(2)
            .all(|w| {
                let (a, b) = (normalize_title(&w[0].title), normalize_title(&w[1].title));
                compare_keys(&a, &b, filter.order) != Ordering::Greater
            }));
    }

    #[test]
    fn order_round_trips_through_its_name() {
        for order in [SortOrder::Ascending, SortOrder::Descending] {
            assert_eq!(SortOrder::from_str(order.as_str()), Some(order));
        }
        assert_eq!(SortOrder::from_str("sideways"), None);
    }

    #[test]
    fn clear_resets_letter_and_term_only() {
        let mut filter = ShowFilter {
            search_term: "x".into(),
            selected_letter: Some('Q'),
            selected_genre: Some(2),
            order: SortOrder::Descending,
        };
        filter.clear();
        assert_eq!(filter.search_term, "");
        assert_eq!(filter.selected_letter, None);
        assert_eq!(filter.selected_genre, Some(2));
        assert_eq!(filter.order, SortOrder::Descending);
    }
}
