use std::collections::HashMap;

/// Span counts recorded for a line by its last two tokenize passes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockInfo {
    /// Spans starting on the line before the last pass
    pub previous_pass: usize,
    /// Spans starting on the line after the last pass
    pub last_pass: usize,
}

/// An edit reported by the host for one line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextChange {
    pub block: usize,
    pub removed: usize,
    pub inserted: usize,
}

impl TextChange {
    pub fn is_noop(&self) -> bool {
        self.removed == 0 && self.inserted == 0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RehighlightState {
    #[default]
    Stable,
    NeedsFullRehighlight,
}

/// Decides after an edit whether the whole document has to be tokenized again.
///
/// Any inserted or removed character is enough, since it can open or close a multi-line
/// construct somewhere. Otherwise a change in the number of spans the edited line starts is.
#[derive(Debug, Clone, Default)]
pub struct RehighlightPolicy {
    state: RehighlightState,
    blocks: HashMap<usize, BlockInfo>,
}

impl RehighlightPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RehighlightState {
        self.state
    }

    pub fn block_info(&self, block: usize) -> Option<BlockInfo> {
        self.blocks.get(&block).copied()
    }

    /// Called after every tokenize pass of `block` with the number of spans now starting on it
    pub fn record_pass(&mut self, block: usize, span_count: usize) {
        self.blocks
            .entry(block)
            .and_modify(|info| {
                info.previous_pass = info.last_pass;
                info.last_pass = span_count;
            })
            .or_insert(BlockInfo {
                previous_pass: span_count,
                last_pass: span_count,
            });
    }

    /// Returns true when a full rehighlight is needed. `span_count` is the number of spans
    /// currently starting on the edited line.
    pub fn on_text_changed(&mut self, change: TextChange, span_count: usize) -> bool {
        let previous = self
            .blocks
            .get(&change.block)
            .map_or(0, |info| info.previous_pass);

        if span_count != previous || !change.is_noop() {
            #[cfg(feature = "debug")]
            log::debug!(
                "[policy] full rehighlight needed after {change:?} \
                 (spans {previous} -> {span_count})"
            );
            self.state = RehighlightState::NeedsFullRehighlight;
        }
        self.state == RehighlightState::NeedsFullRehighlight
    }

    /// Forgets every line before a full rehighlight. The passes that follow record them again.
    pub fn start_full_rehighlight(&mut self) {
        self.blocks.clear();
    }

    pub fn finish_full_rehighlight(&mut self) {
        self.state = RehighlightState::Stable;
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.state = RehighlightState::Stable;
    }
}
