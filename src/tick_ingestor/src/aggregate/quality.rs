/// Tick count below which a window's bars are flagged as low confidence.
pub const DEFAULT_MIN_TICKS: usize = 26;

/// Whether a window carried enough ticks to trust its bars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowQuality {
    Sufficient,
    LowConfidence { tick_count: usize, min_expected: usize },
}

impl WindowQuality {
    pub fn is_low_confidence(&self) -> bool {
        matches!(self, WindowQuality::LowConfidence { .. })
    }
}

pub fn assess_window(tick_count: usize, min_expected: usize) -> WindowQuality {
    if tick_count < min_expected {
        WindowQuality::LowConfidence {
            tick_count,
            min_expected,
        }
    } else {
        WindowQuality::Sufficient
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert!(assess_window(25, DEFAULT_MIN_TICKS).is_low_confidence());
        assert_eq!(assess_window(26, DEFAULT_MIN_TICKS), WindowQuality::Sufficient);
        assert_eq!(assess_window(0, 0), WindowQuality::Sufficient);
    }
}
