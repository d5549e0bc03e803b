use std::fmt;

pub const PROGRESS_SEGMENTS: usize = 10;

const FILLED: char = '█';
const EMPTY: char = '░';

/// Ten-segment text progress bar: one filled segment per full 10% of `max_score`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgressBar {
    pub score: u32,
    pub filled: usize,
}

impl ProgressBar {
    pub fn new(score: u32) -> Self {
        Self::with_max(score, 100)
    }

    pub fn with_max(score: u32, max_score: u32) -> Self {
        let filled = if max_score == 0 {
            0
        } else {
            let percentage = (u64::from(score) * 100 / u64::from(max_score)).min(100);
            (percentage / 10) as usize
        };
        Self { score, filled }
    }

    pub fn empty(&self) -> usize {
        PROGRESS_SEGMENTS - self.filled
    }

    pub fn bar(&self) -> String {
        let mut bar = String::with_capacity(PROGRESS_SEGMENTS * FILLED.len_utf8());
        bar.extend(std::iter::repeat(FILLED).take(self.filled));
        bar.extend(std::iter::repeat(EMPTY).take(self.empty()));
        bar
    }
}

impl fmt::Display for ProgressBar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}%", self.bar(), self.score)
    }
}

#[cfg(test)]
mod tests {
    use super::{ProgressBar, PROGRESS_SEGMENTS};

    #[test]
    fn filled_segments_follow_floor_of_score_over_ten() {
        assert_eq!(ProgressBar::new(0).filled, 0);
        assert_eq!(ProgressBar::new(100).filled, 10);

        let bar = ProgressBar::new(85);
        assert_eq!(bar.filled, 8);
        assert_eq!(bar.empty(), 2);
        assert_eq!(bar.bar(), "████████░░");
    }

    #[test]
    fn renders_bar_with_score_suffix() {
        assert_eq!(ProgressBar::new(74).to_string(), "[███████░░░] 74%");
        assert_eq!(ProgressBar::new(77).to_string(), "[███████░░░] 77%");
    }

    #[test]
    fn overflowing_scores_are_capped() {
        let bar = ProgressBar::new(140);
        assert_eq!(bar.filled, PROGRESS_SEGMENTS);
        assert_eq!(bar.empty(), 0);
    }

    #[test]
    fn custom_maximum_scales_percentage() {
        assert_eq!(ProgressBar::with_max(7, 10).filled, 7);
        assert_eq!(ProgressBar::with_max(5, 0).filled, 0);
    }
}
