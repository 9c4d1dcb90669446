//! Append-only diagnostic collector. The engine narrates its decisions
//! here when collection is enabled; callers render or discard the lines.

#[derive(Debug, Default, Clone)]
pub struct DiagCollector {
    enabled: bool,
    lines: Vec<String>,
}

impl DiagCollector {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            lines: Vec::new(),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn note(&mut self, line: impl Into<String>) {
        if self.enabled {
            self.lines.push(line.into());
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.iter().any(|line| line.contains(needle))
    }
}
