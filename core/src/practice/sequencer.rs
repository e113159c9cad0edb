use std::sync::Arc;

use super::error::PracticeError;
use super::types::Word;

/// Forward-only cursor over a song's words. A new session gets a new sequencer.
#[derive(Debug, Clone)]
pub struct WordSequencer {
    words: Arc<[Word]>,
    position: usize,
}

impl WordSequencer {
    pub fn new(words: Arc<[Word]>) -> Self {
        Self { words, position: 0 }
    }

    pub fn current(&self) -> Result<&Word, PracticeError> {
        self.words
            .get(self.position)
            .ok_or(PracticeError::OutOfRange {
                position: self.position,
                len: self.words.len(),
            })
    }

    /// Moves to the next word. Returns false once the end of the song is reached.
    pub fn advance(&mut self) -> bool {
        if self.position < self.words.len() {
            self.position += 1;
        }
        self.position < self.words.len()
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.words.len().saturating_sub(self.position)
    }

    pub fn is_exhausted(&self) -> bool {
        self.position >= self.words.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(tokens: &[&str]) -> Arc<[Word]> {
        tokens.iter().map(|token| Word::new(token)).collect()
    }

    #[test]
    fn walks_words_in_order() {
        let mut sequencer = WordSequencer::new(words(&["cat", "dog", "owl"]));
        assert_eq!(sequencer.current().expect("first").text(), "cat");
        assert!(sequencer.advance());
        assert_eq!(sequencer.current().expect("second").text(), "dog");
        assert!(sequencer.advance());
        assert_eq!(sequencer.remaining(), 1);
        assert!(!sequencer.advance());
        assert!(sequencer.is_exhausted());
    }

    #[test]
    fn current_fails_once_exhausted() {
        let mut sequencer = WordSequencer::new(words(&["cat"]));
        assert!(!sequencer.advance());
        assert_eq!(
            sequencer.current(),
            Err(PracticeError::OutOfRange {
                position: 1,
                len: 1
            })
        );
    }

    #[test]
    fn advancing_past_the_end_does_not_move_position() {
        let mut sequencer = WordSequencer::new(words(&["cat"]));
        sequencer.advance();
        sequencer.advance();
        assert_eq!(sequencer.position(), 1);
    }

    #[test]
    fn empty_sequencer_is_out_of_range() {
        let sequencer = WordSequencer::new(words(&[]));
        assert!(sequencer.is_empty());
        assert!(sequencer.current().is_err());
    }
}
