use std::iter::FusedIterator;

use super::Frontier;
use crate::dict::DictError;
use crate::matching::Match;

/// Lazy, forward-only cursor over completion results.
///
/// The iterator is `Active` while [`current`](Self::current) holds a Match and
/// `Exhausted` afterwards. Each [`advance`](Self::advance) drives the
/// best-first expansion just far enough to surface the next Match. Dropping
/// the iterator at any point releases the frontier and its store reference.
pub struct MatchIterator {
    frontier: Option<Frontier>,
    current: Option<Match>,
}

impl MatchIterator {
    pub(crate) fn new(mut frontier: Frontier) -> Self {
        let current = frontier.next_match();
        Self {
            frontier: current.is_some().then_some(frontier),
            current,
        }
    }

    /// An iterator that starts exhausted.
    pub fn empty() -> Self {
        Self {
            frontier: None,
            current: None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }

    /// The Match under the cursor.
    pub fn current(&self) -> Result<&Match, DictError> {
        self.current
            .as_ref()
            .ok_or(DictError::InvalidState("dereferenced an exhausted match iterator"))
    }

    /// Move to the next Match.
    pub fn advance(&mut self) -> Result<(), DictError> {
        if self.current.is_none() {
            return Err(DictError::InvalidState("advanced an exhausted match iterator"));
        }
        self.step();
        Ok(())
    }

    /// Entries waiting in the frontier.
    #[cfg(test)]
    pub(crate) fn frontier_len(&self) -> usize {
        self.frontier.as_ref().map_or(0, Frontier::len)
    }

    fn step(&mut self) -> Option<Match> {
        let next = self.frontier.as_mut().and_then(Frontier::next_match);
        if next.is_none() {
            // Exhausted: release the heap and the store reference right away.
            self.frontier = None;
        }
        std::mem::replace(&mut self.current, next)
    }
}

impl Iterator for MatchIterator {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        if self.current.is_none() {
            return None;
        }
        self.step()
    }
}

impl FusedIterator for MatchIterator {}

impl std::fmt::Debug for MatchIterator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchIterator")
            .field("current", &self.current)
            .field("frontier_len", &self.frontier.as_ref().map_or(0, Frontier::len))
            .finish()
    }
}
