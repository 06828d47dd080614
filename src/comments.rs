//! Line normalization - removes comments and blank lines from raw source.
//!
//! **Supported comment syntax** (markers configurable through [`ParseConfig`]):
//! - Line comments: `%` to end of line
//! - Block comments: a line starting with `#|` opens the comment, the first line
//!   that is or ends with `|#` closes it. Both marker lines are discarded along
//!   with everything between. Block comments do not nest.
//!
//! A block comment that is never closed swallows the rest of the input unless
//! [`UnterminatedComment::Reject`] is configured.

use std::iter::FusedIterator;

use crate::{Error, ParseConfig, UnterminatedComment};

/// A trimmed, comment-free, non-empty source line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    /// 1-based line number in the original source
    pub number: usize,
    pub text: String,
}

/// Comment nesting state carried from one raw line to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentState {
    #[default]
    Code,
    InBlock {
        opened_at: usize,
    },
}

impl CommentState {
    /// Apply the comment rules to raw line `line_number`, moving in or out of a
    /// block comment. Returns the surviving code, if any.
    pub fn advance(&mut self, raw: &str, line_number: usize, config: &ParseConfig) -> Option<String> {
        let trimmed = raw.trim();
        let open = config.block_comment_open.as_str();
        let close = config.block_comment_close.as_str();

        match *self {
            CommentState::InBlock { .. } => {
                if trimmed.ends_with(close) {
                    *self = CommentState::Code;
                }
                None
            }
            CommentState::Code => {
                if let Some(after_open) = trimmed.strip_prefix(open) {
                    // `#| note |#` on one line opens and closes in place
                    if !after_open.trim_end().ends_with(close) {
                        *self = CommentState::InBlock {
                            opened_at: line_number,
                        };
                    }
                    return None;
                }
                let code = strip_line_comment(trimmed, &config.line_comment).trim();
                (!code.is_empty()).then(|| code.to_owned())
            }
        }
    }
}

/// Lazily normalizes a sequence of raw lines.
///
/// Yields `Err` at most once, and only for an unterminated block comment under
/// [`UnterminatedComment::Reject`]; after that, or after the input runs out, it
/// yields `None` forever.
pub struct LineNormalizer<'c, I> {
    lines: I,
    config: &'c ParseConfig,
    state: CommentState,
    line_number: usize,
    finished: bool,
}

impl<'c, I, S> LineNormalizer<'c, I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    pub fn new(lines: I, config: &'c ParseConfig) -> Self {
        LineNormalizer {
            lines,
            config,
            state: CommentState::Code,
            line_number: 0,
            finished: false,
        }
    }

    pub fn state(&self) -> CommentState {
        self.state
    }
}

/// Cut `line` at the first occurrence of `marker`
fn strip_line_comment<'a>(line: &'a str, marker: &str) -> &'a str {
    if marker.is_empty() {
        return line;
    }
    line.find(marker).map_or(line, |pos| &line[..pos])
}

impl<I, S> Iterator for LineNormalizer<'_, I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    type Item = Result<NormalizedLine, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        for raw in self.lines.by_ref() {
            self.line_number += 1;
            let text = self
                .state
                .advance(raw.as_ref(), self.line_number, self.config);
            if let Some(text) = text {
                log::trace!("line {}: {text}", self.line_number);
                return Some(Ok(NormalizedLine {
                    number: self.line_number,
                    text,
                }));
            }
        }
        self.finished = true;

        match self.state {
            CommentState::InBlock { opened_at } => match self.config.unterminated_comment {
                UnterminatedComment::DropRemainder => {
                    log::debug!(
                        "block comment opened on line {opened_at} is never closed, dropping the rest of the input"
                    );
                    None
                }
                UnterminatedComment::Reject => Some(Err(Error::syntax(
                    "unterminated block comment",
                    self.config.block_comment_open.as_str(),
                )
                .at_line(opened_at))),
            },
            CommentState::Code => None,
        }
    }
}

impl<I, S> FusedIterator for LineNormalizer<'_, I>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
}
