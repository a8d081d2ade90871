use crate::constants::TICKS_PER_SECOND;
use crate::models::ChapterInfo;

/// Pure timeline math for one item: fractional position to seconds/ticks,
/// remaining time and chapter lookup. A missing or zero duration yields
/// position zero and no chapter; there are no failure modes.
#[derive(Debug, Clone, Default)]
pub struct TimelineModel {
    duration_ticks: i64,
    chapters: Vec<ChapterInfo>,
}

impl TimelineModel {
    pub fn new(duration_ticks: Option<i64>, chapters: Vec<ChapterInfo>) -> Self {
        Self {
            duration_ticks: duration_ticks.unwrap_or(0).max(0),
            chapters,
        }
    }

    pub fn duration_ticks(&self) -> i64 {
        self.duration_ticks
    }

    pub fn duration_seconds(&self) -> f64 {
        (self.duration_ticks / TICKS_PER_SECOND) as f64
    }

    pub fn chapters(&self) -> &[ChapterInfo] {
        &self.chapters
    }

    /// Whole seconds elapsed at `fraction` of the duration.
    pub fn position_seconds(&self, fraction: f64) -> f64 {
        if self.duration_ticks <= 0 {
            return 0.0;
        }
        (fraction * self.duration_seconds()).round()
    }

    pub fn position_ticks(&self, fraction: f64) -> i64 {
        self.position_seconds(fraction) as i64 * TICKS_PER_SECOND
    }

    pub fn remaining_seconds(&self, fraction: f64) -> f64 {
        (self.duration_seconds() - self.position_seconds(fraction)).max(0.0)
    }

    /// The chapter whose range contains `position_ticks`. Consecutive
    /// chapter starts partition the timeline; the last chapter extends to
    /// the end of the item.
    pub fn chapter_at(&self, position_ticks: i64) -> Option<&ChapterInfo> {
        if self.chapters.is_empty() || self.duration_ticks <= 0 {
            return None;
        }

        for pair in self.chapters.windows(2) {
            if pair[0].start_position_ticks <= position_ticks
                && position_ticks < pair[1].start_position_ticks
            {
                return Some(&pair[0]);
            }
        }

        let last = self.chapters.last()?;
        if position_ticks >= last.start_position_ticks {
            return Some(last);
        }

        None
    }

    /// `H:MM:SS` label, with the hour field omitted while it is zero.
    pub fn format_elapsed(seconds: f64) -> String {
        let total = seconds.max(0.0) as u64;
        let hours = total / 3600;
        let minutes = (total % 3600) / 60;
        let secs = total % 60;

        if hours != 0 {
            format!("{}:{:02}:{:02}", hours, minutes, secs)
        } else {
            format!("{:02}:{:02}", minutes, secs)
        }
    }
}
