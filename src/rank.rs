use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RankTier {
    pub name: &'static str,
    pub min_level: u32,
    /// `None` only on the last, open-ended tier.
    pub max_level: Option<u32>,
}

impl RankTier {
    pub fn contains(&self, level: u32) -> bool {
        level >= self.min_level && self.max_level.map_or(true, |max| level <= max)
    }
}

/// Sorted ascending, contiguous, non-overlapping.
pub const RANKS: &[RankTier] = &[
    RankTier { name: "Aspiring Developer", min_level: 0, max_level: Some(9) },
    RankTier { name: "Beginner Developer", min_level: 10, max_level: Some(19) },
    RankTier { name: "Apprentice Developer", min_level: 20, max_level: Some(29) },
    RankTier { name: "Assistant Developer", min_level: 30, max_level: Some(39) },
    RankTier { name: "Basic Developer", min_level: 40, max_level: Some(49) },
    RankTier { name: "Junior Developer", min_level: 50, max_level: Some(54) },
    RankTier { name: "Confirmed Developer", min_level: 55, max_level: Some(59) },
    RankTier { name: "Full-Stack Developer", min_level: 60, max_level: None },
];

fn rank_index(level: u32) -> usize {
    RANKS
        .iter()
        .position(|tier| tier.contains(level))
        .unwrap_or(RANKS.len() - 1)
}

pub fn rank_for(level: u32) -> &'static RankTier {
    &RANKS[rank_index(level)]
}

pub fn next_rank(level: u32) -> Option<&'static RankTier> {
    RANKS.get(rank_index(level) + 1)
}

/// Percent of the way from the current tier's minimum to the next tier's.
pub fn progress_percent(level: u32) -> f64 {
    let current = rank_for(level);
    match next_rank(level) {
        Some(next) => {
            let span = next.min_level.saturating_sub(current.min_level);
            if span == 0 {
                return 100.0;
            }
            let done = level as f64 - current.min_level as f64;
            (done / span as f64 * 100.0).clamp(0.0, 100.0)
        }
        None => 100.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_contiguous_and_open_ended() {
        for pair in RANKS.windows(2) {
            let max = pair[0].max_level.expect("only the last tier is open");
            assert_eq!(max + 1, pair[1].min_level, "{} -> {}", pair[0].name, pair[1].name);
        }
        assert_eq!(RANKS[0].min_level, 0);
        assert!(RANKS.last().unwrap().max_level.is_none());
    }

    #[test]
    fn every_level_has_exactly_one_tier() {
        for level in 0..=200u32 {
            let matching = RANKS.iter().filter(|t| t.contains(level)).count();
            assert_eq!(matching, 1, "level {}", level);
            assert!(rank_for(level).contains(level));
        }
    }

    #[test]
    fn boundaries() {
        assert_eq!(rank_for(0).name, "Aspiring Developer");
        assert_eq!(rank_for(9).name, "Aspiring Developer");
        assert_eq!(rank_for(10).name, "Beginner Developer");
        assert_eq!(rank_for(20).name, "Apprentice Developer");
        assert_eq!(rank_for(60).name, "Full-Stack Developer");
        assert_eq!(rank_for(u32::MAX).name, "Full-Stack Developer");
        assert_eq!(next_rank(12).map(|r| r.name), Some("Apprentice Developer"));
        assert_eq!(next_rank(61), None);
    }

    #[test]
    fn progress_between_tiers() {
        assert_eq!(progress_percent(0), 0.0);
        assert_eq!(progress_percent(5), 50.0);
        assert_eq!(progress_percent(52), 40.0);
        assert_eq!(progress_percent(75), 100.0);
        for level in 0..100 {
            let p = progress_percent(level);
            assert!((0.0..=100.0).contains(&p));
        }
    }
}
