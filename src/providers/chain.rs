//! Priority-ordered provider chain with a cursor.

use super::config::ProviderConfig;

/// Providers for one capability, sorted by descending priority, plus the
/// index of the provider currently in use.
///
/// The cursor is either a valid index or equal to `len()`, which marks the
/// chain as exhausted: [`current()`](Self::current) then returns `None`
/// until [`reset()`](Self::reset).
#[derive(Debug, Clone, Default)]
pub struct FallbackChain {
    providers: Vec<ProviderConfig>,
    cursor: usize,
}

impl FallbackChain {
    /// Sort `providers` by descending priority and point at the first one.
    ///
    /// The sort is stable: equal priorities keep their input order.
    pub fn new(mut providers: Vec<ProviderConfig>) -> Self {
        providers.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self {
            providers,
            cursor: 0,
        }
    }

    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn current(&self) -> Option<&ProviderConfig> {
        self.providers.get(self.cursor)
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.providers.len()
    }

    /// Point back at the highest-priority provider.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Point at `index`, clamped to the exhausted position.
    pub(crate) fn move_to(&mut self, index: usize) {
        self.cursor = index.min(self.providers.len());
    }

    pub(crate) fn exhaust(&mut self) {
        self.cursor = self.providers.len();
    }
}
