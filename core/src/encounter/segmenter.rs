use std::mem;

use crate::combat_log::CombatEvent;

use super::{CombatState, EncounterCandidate, SegmentConfig, finish, transition};

/// Iterator adapter turning a log's events into boss attempts, in file order.
///
/// Each candidate is yielded as soon as its attempt resolves.
pub struct Segmenter<'r, I> {
    source: I,
    config: SegmentConfig<'r>,
    state: CombatState,
    ordinal: usize,
    finished: bool,
}

impl<'r, I> Segmenter<'r, I>
where
    I: Iterator<Item = CombatEvent>,
{
    pub fn new(source: I, config: SegmentConfig<'r>) -> Self {
        Self {
            source,
            config,
            state: CombatState::Idle,
            ordinal: 0,
            finished: false,
        }
    }

    /// The wrapped event source, e.g. to read tokenizer statistics.
    pub fn source(&self) -> &I {
        &self.source
    }

    /// Number of events consumed so far.
    pub fn events_seen(&self) -> usize {
        self.ordinal
    }
}

impl<I> Iterator for Segmenter<'_, I>
where
    I: Iterator<Item = CombatEvent>,
{
    type Item = EncounterCandidate;

    fn next(&mut self) -> Option<EncounterCandidate> {
        if self.finished {
            return None;
        }
        for event in self.source.by_ref() {
            let state = mem::take(&mut self.state);
            let (next, candidate) = transition(state, self.ordinal, event, &self.config);
            self.state = next;
            self.ordinal += 1;
            if candidate.is_some() {
                return candidate;
            }
        }
        self.finished = true;
        finish(mem::take(&mut self.state), &self.config)
    }
}
