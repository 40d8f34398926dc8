use crate::api::Show;

/// Cursor over the known show numbers, walking from newest to oldest
///
/// `last_show_number` is an exclusive upper bound: the next page holds the
/// known numbers strictly between `last_show_number - page_size` and
/// `last_show_number`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    show_numbers: Vec<u32>,
    last_show_number: u32,
    page_size: u32,
}

impl PaginationState {
    pub fn new(page_size: u32) -> Self {
        Self {
            show_numbers: Vec::new(),
            last_show_number: 0,
            page_size,
        }
    }

    /// Whether the show number index has been loaded
    pub fn is_seeded(&self) -> bool {
        !self.show_numbers.is_empty()
    }

    /// Known show numbers, descending and unique
    pub fn show_numbers(&self) -> &[u32] {
        &self.show_numbers
    }

    pub fn last_show_number(&self) -> u32 {
        self.last_show_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Install the show number index and place the cursor one past its maximum.
    ///
    /// Returns `false` and leaves the state untouched for an empty index.
    pub fn seed(&mut self, mut numbers: Vec<u32>) -> bool {
        let Some(&max) = numbers.iter().max() else {
            return false;
        };

        numbers.sort_unstable_by(|a, b| b.cmp(a));
        numbers.dedup();

        self.show_numbers = numbers;
        self.last_show_number = max.saturating_add(1);
        true
    }

    /// Show numbers of the next page, in index order
    pub fn next_indexes(&self) -> Vec<u32> {
        let upper = self.last_show_number;
        let lower = upper.checked_sub(self.page_size);

        self.show_numbers
            .iter()
            .copied()
            .filter(|&n| n < upper && lower.is_none_or(|lower| n > lower))
            .collect()
    }

    /// Move the cursor to the last show of a fetched batch.
    ///
    /// An empty batch leaves the cursor where it is.
    pub fn advance(&mut self, batch: &[Show]) {
        if let Some(last) = batch.last() {
            self.last_show_number = last.show_number;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(numbers: impl IntoIterator<Item = u32>, page_size: u32) -> PaginationState {
        let mut state = PaginationState::new(page_size);
        assert!(state.seed(numbers.into_iter().collect()));
        state
    }

    fn shows(numbers: &[u32]) -> Vec<Show> {
        numbers
            .iter()
            .map(|&n| Show::new(n, format!("Show {n}")))
            .collect()
    }

    #[test]
    fn new_state_is_empty() {
        let state = PaginationState::new(20);
        assert!(!state.is_seeded());
        assert_eq!(state.last_show_number(), 0);
        assert!(state.next_indexes().is_empty());
    }

    #[test]
    fn seed_sets_cursor_past_maximum() {
        let state = seeded([12, 40, 7], 20);
        assert_eq!(state.last_show_number(), 41);
        assert_eq!(state.show_numbers(), &[40, 12, 7]);
    }

    #[test]
    fn seed_with_empty_index_is_ignored() {
        let mut state = PaginationState::new(20);
        assert!(!state.seed(Vec::new()));
        assert!(!state.is_seeded());
        assert_eq!(state.last_show_number(), 0);
    }

    #[test]
    fn seed_removes_duplicates() {
        let state = seeded([5, 5, 4, 5], 20);
        assert_eq!(state.show_numbers(), &[5, 4]);
    }

    #[test]
    fn first_page_stays_strictly_inside_window() {
        let state = seeded((31..=50).rev(), 20);
        let indexes = state.next_indexes();

        // Window is (31, 51): 31 itself sits on the excluded lower bound
        let expected: Vec<u32> = (32..=50).rev().collect();
        assert_eq!(indexes, expected);
    }

    #[test]
    fn indexes_are_subset_of_known_numbers() {
        let state = seeded([100, 97, 95, 90, 81, 80, 60], 20);
        let indexes = state.next_indexes();

        assert_eq!(indexes, vec![100, 97, 95, 90]);
        for n in &indexes {
            assert!(state.show_numbers().contains(n));
            assert!(*n < state.last_show_number());
            assert!(*n > state.last_show_number() - state.page_size());
        }
    }

    #[test]
    fn advance_moves_cursor_to_last_fetched_show() {
        let mut state = seeded((1..=50).rev(), 20);
        state.advance(&shows(&[50, 49, 32]));
        assert_eq!(state.last_show_number(), 32);

        let expected: Vec<u32> = (13..=31).rev().collect();
        assert_eq!(state.next_indexes(), expected);
    }

    #[test]
    fn advance_with_empty_batch_keeps_cursor() {
        let mut state = seeded([10, 9], 20);
        state.advance(&[]);
        assert_eq!(state.last_show_number(), 11);
    }

    #[test]
    fn window_below_page_size_includes_lowest_numbers() {
        let mut state = seeded([8, 3, 1, 0], 20);
        state.advance(&shows(&[5]));
        assert_eq!(state.next_indexes(), vec![3, 1, 0]);
    }

    #[test]
    fn exhausted_cursor_yields_no_indexes() {
        let mut state = seeded([3, 2, 1], 20);
        state.advance(&shows(&[1]));
        assert!(state.next_indexes().is_empty());
    }

    #[test]
    fn ascending_batch_order_moves_cursor_to_its_last_item() {
        // The cursor follows received order, so an ascending batch points
        // back at its maximum and the same window is requested again.
        let mut state = seeded([30, 29, 28], 20);
        state.advance(&shows(&[28, 29, 30]));
        assert_eq!(state.last_show_number(), 30);
        assert_eq!(state.next_indexes(), vec![29, 28]);
    }
}
