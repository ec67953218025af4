use tile_defence_core::LevelDefinition;

/// Ordered list of levels played one after another.
#[derive(Clone, Debug)]
pub struct LevelSequence {
    levels: Vec<LevelDefinition>,
    position: usize,
}

impl LevelSequence {
    /// Creates a sequence positioned on the first level; `None` when empty.
    #[must_use]
    pub fn new(levels: Vec<LevelDefinition>) -> Option<Self> {
        if levels.is_empty() {
            return None;
        }
        Some(Self {
            levels,
            position: 0,
        })
    }

    /// Level at the current position.
    #[must_use]
    pub fn current(&self) -> &LevelDefinition {
        &self.levels[self.position]
    }

    /// Zero-based index of the current level.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Number of levels in the sequence.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always false; empty sequences cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Reports whether the current level is the final one.
    #[must_use]
    pub fn is_last(&self) -> bool {
        self.position + 1 == self.levels.len()
    }

    /// Moves to the next level, returning it, or `None` after the final level.
    pub fn advance(&mut self) -> Option<&LevelDefinition> {
        if self.is_last() {
            return None;
        }
        self.position += 1;
        Some(self.current())
    }

    /// Returns to the first level.
    pub fn restart(&mut self) -> &LevelDefinition {
        self.position = 0;
        self.current()
    }

    /// Jumps to `index`, clamped to the final level.
    pub fn select(&mut self, index: usize) -> &LevelDefinition {
        self.position = index.min(self.levels.len() - 1);
        self.current()
    }
}
