use crate::aggregate::WindowQuality;

/// What one window contributed to a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSummary {
    pub label: String,
    /// Rows appended to the table.
    pub rows: usize,
    /// Raw ticks the rows were derived from.
    pub ticks: usize,
    pub quality: Option<WindowQuality>,
}

/// A window whose job returned an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedWindow {
    pub label: String,
    pub reason: String,
}

/// Result of processing one window.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowOutput<R> {
    pub rows: Vec<R>,
    pub ticks: usize,
    pub quality: Option<WindowQuality>,
}

impl<R> WindowOutput<R> {
    pub fn new(rows: Vec<R>, ticks: usize) -> Self {
        Self {
            rows,
            ticks,
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: WindowQuality) -> Self {
        self.quality = Some(quality);
        self
    }
}

/// Append-only accumulation of every window's rows, in processing order.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterTable<R> {
    rows: Vec<R>,
    windows: Vec<WindowSummary>,
    skipped: Vec<SkippedWindow>,
}

impl<R> Default for MasterTable<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            windows: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

impl<R> MasterTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, label: impl Into<String>, output: WindowOutput<R>) {
        self.windows.push(WindowSummary {
            label: label.into(),
            rows: output.rows.len(),
            ticks: output.ticks,
            quality: output.quality,
        });
        self.rows.extend(output.rows);
    }

    pub fn skip(&mut self, label: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(SkippedWindow {
            label: label.into(),
            reason: reason.into(),
        });
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    pub fn windows(&self) -> &[WindowSummary] {
        &self.windows
    }

    pub fn skipped(&self) -> &[SkippedWindow] {
        &self.skipped
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn low_confidence_windows(&self) -> impl Iterator<Item = &WindowSummary> {
        self.windows
            .iter()
            .filter(|w| w.quality.is_some_and(|q| q.is_low_confidence()))
    }
}
