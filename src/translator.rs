//! Translation driver.
//!
//! [`Translator`] walks the normalized lines of a source in order. Definition
//! lines extend the constant table, block lines are parsed and merged into the
//! result document, anything else is rejected (or skipped, see
//! [`UnknownLines`]). A block may span several lines; its lines are joined until
//! the opening brace is closed.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::ast::Document;
use crate::comments::{LineNormalizer, NormalizedLine};
use crate::constants::{ConstantTable, is_definition, parse_definition};
use crate::dictionary::{ITEM_SEPARATOR, matching_brace, parse_dictionary};
use crate::{Error, ParseConfig, UnknownLines};

/// Assembles whole sources into documents.
///
/// Every run starts from an empty constant table. The table built by the most
/// recent run stays available through [`Translator::constants`].
#[derive(Debug, Clone, Default)]
pub struct Translator {
    config: ParseConfig,
    constants: ConstantTable,
}

impl Translator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParseConfig) -> Self {
        Translator {
            config,
            constants: ConstantTable::new(),
        }
    }

    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    /// Translate an ordered sequence of raw source lines.
    pub fn parse_lines<I, S>(&mut self, lines: I) -> Result<Document, Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.constants = ConstantTable::new();
        assemble(lines.into_iter(), &self.config, &mut self.constants)
    }

    /// Translate source text held in memory.
    pub fn parse_str(&mut self, source: &str) -> Result<Document, Error> {
        self.parse_lines(source.lines())
    }

    /// Translate everything a reader yields.
    pub fn parse_reader<R: BufRead>(&mut self, reader: R) -> Result<Document, Error> {
        let lines = read_lines(reader, "cannot read source")?;
        self.parse_lines(lines)
    }

    /// Translate the file at `path`.
    pub fn parse_file(&mut self, path: impl AsRef<Path>) -> Result<Document, Error> {
        let path = path.as_ref();
        log::info!("parsing file {}", path.display());
        let file = File::open(path)
            .map_err(|e| Error::io(format!("cannot open '{}'", path.display()), e))?;
        let lines = read_lines(
            BufReader::new(file),
            &format!("cannot read '{}'", path.display()),
        )?;
        self.parse_lines(lines)
    }
}

fn read_lines<R: BufRead>(reader: R, context: &str) -> Result<Vec<String>, Error> {
    reader
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::io(context, e))
}

fn assemble<I, S>(
    lines: I,
    config: &ParseConfig,
    constants: &mut ConstantTable,
) -> Result<Document, Error>
where
    I: Iterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = Document::new();
    let mut normalizer = LineNormalizer::new(lines, config);

    while let Some(line) = normalizer.next() {
        let NormalizedLine { number, text } = line?;

        if is_definition(&text) {
            parse_definition(&text, constants, config).map_err(|e| e.at_line(number))?;
        } else if text.starts_with('{') {
            let block = collect_block(number, text, &mut normalizer)?;
            let document =
                parse_dictionary(&block, constants, config).map_err(|e| e.at_line(number))?;
            log::debug!("line {number}: block with {} key(s)", document.len());
            result
                .merge(document, config.duplicate_keys, &block)
                .map_err(|e| e.at_line(number))?;
        } else {
            match config.unknown_lines {
                UnknownLines::Reject => {
                    return Err(Error::syntax("unrecognized statement", text).at_line(number));
                }
                UnknownLines::Ignore => {
                    log::warn!("line {number}: ignoring unrecognized statement '{text}'");
                }
            }
        }
    }

    log::debug!(
        "translation finished: {} constant(s), {} top-level key(s)",
        constants.len(),
        result.len()
    );
    Ok(result)
}

/// Join lines until the brace opened by `first` is closed.
/// A single `;` after the closing brace is dropped.
fn collect_block<I>(start: usize, first: String, lines: &mut I) -> Result<String, Error>
where
    I: Iterator<Item = Result<NormalizedLine, Error>>,
{
    let mut block = first;
    let end = loop {
        if let Some(end) = matching_brace(&block) {
            break end;
        }
        match lines.next() {
            Some(line) => {
                block.push(' ');
                block.push_str(&line?.text);
            }
            None => {
                return Err(Error::syntax("block is never closed", block).at_line(start));
            }
        }
    };
    if block[end + 1..].trim().strip_prefix(ITEM_SEPARATOR) == Some("") {
        block.truncate(end + 1);
    }
    Ok(block)
}

#[cfg(test)]
#[expect(clippy::unwrap_used)] // test code OK
mod tests {
    use super::*;
    use crate::ast::{doc, val};
    use crate::{ErrorKind, OnConflict, UnterminatedComment};

    fn translate(lines: &[&str]) -> Result<Document, Error> {
        Translator::new().parse_lines(lines)
    }

    #[test]
    fn test_parse_lines_with_block_comment() {
        let lines = [
            "#|",
            "Multi-line comment",
            "|#",
            "(define CONST1 100);",
            "(define CONST2 200);",
            "{ key1 : ^(CONST1); key2 : ^(CONST2); }",
        ];
        assert_eq!(
            translate(&lines).unwrap(),
            doc([("key1", val(100)), ("key2", val(200))])
        );
    }

    #[test]
    fn test_sum_and_difference_scenario() {
        let lines = [
            "(define X 10);",
            "(define Y 5);",
            "{ sum : ^(X) + ^(Y); diff : ^(X) - ^(Y); }",
        ];
        let result = translate(&lines).unwrap();
        assert_eq!(result, doc([("sum", val(15)), ("diff", val(5))]));
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["sum", "diff"]);
    }

    #[test]
    fn test_later_blocks_overwrite_earlier_keys() {
        let result = translate(&["{ k : 1; }", "{ k : 2; }"]).unwrap();
        assert_eq!(result, doc([("k", val(2))]));

        let result = translate(&["{ a : 1; b : 2; }", "{ c : 3; a : 4; }"]).unwrap();
        assert_eq!(result.keys().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(result.get("a"), Some(&val(4)));
    }

    #[test]
    fn test_duplicate_top_level_keys_rejected_when_configured() {
        let mut translator = Translator::with_config(ParseConfig {
            duplicate_keys: OnConflict::Reject,
            ..ParseConfig::default()
        });
        let err = translator.parse_lines(["{ k : 1; }", "", "{ k : 2; }"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.line(), Some(3));
    }

    #[test]
    fn test_constants_only_visible_after_definition() {
        let err = translate(&["{ a : ^(LATE); }", "(define LATE 1);"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        assert_eq!(err.line(), Some(1));
    }

    #[test]
    fn test_unknown_lines() {
        let err = translate(&["(define A 1);", "hello world"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.line(), Some(2));

        let err = translate(&["(print 1)"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);

        let mut lenient = Translator::with_config(ParseConfig {
            unknown_lines: UnknownLines::Ignore,
            ..ParseConfig::default()
        });
        let result = lenient.parse_lines(["hello world", "{ a : 1; }"]).unwrap();
        assert_eq!(result, doc([("a", val(1))]));
    }

    #[test]
    fn test_multi_line_block() {
        let lines = [
            "(define W 80);",
            "{",
            "  screen : {",
            "    width : ^(W);   % columns",
            "    height : ^(W) / 2;",
            "  };",
            "  depth : 3;",
            "};",
            "{ extra : 1; }",
        ];
        assert_eq!(
            translate(&lines).unwrap(),
            doc([
                ("screen", val(doc([("width", val(80)), ("height", val(40))]))),
                ("depth", val(3)),
                ("extra", val(1)),
            ])
        );
    }

    #[test]
    fn test_unclosed_block_reports_opening_line() {
        let err = translate(&["(define A 1);", "{ a : 1;", "  b : 2;"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.line(), Some(2));
        assert!(err.to_string().contains("never closed"));
    }

    #[test]
    fn test_trailing_text_after_block() {
        assert!(translate(&["{ a : 1; };"]).is_ok());
        let err = translate(&["{ a : 1; } junk"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
    }

    #[test]
    fn test_malformed_definition_names_line() {
        let err = translate(&["{ a : 1; }", "(define CONST1);"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.line(), Some(2));
        assert!(err.to_string().contains("(define CONST1);"));
    }

    #[test]
    fn test_unterminated_block_comment_policies() {
        let lines = ["{ a : 1; }", "#|", "{ b : 2; }"];
        assert_eq!(translate(&lines).unwrap(), doc([("a", val(1))]));

        let mut strict = Translator::with_config(ParseConfig {
            unterminated_comment: UnterminatedComment::Reject,
            ..ParseConfig::default()
        });
        let err = strict.parse_lines(lines).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Syntax);
        assert_eq!(err.line(), Some(2));
    }

    #[test]
    fn test_each_run_starts_with_fresh_constants() {
        let mut translator = Translator::new();
        translator.parse_lines(["(define A 1);"]).unwrap();
        assert_eq!(translator.constants().get("A"), Some(1));

        let err = translator.parse_lines(["{ a : ^(A); }"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Value);
        assert!(translator.constants().is_empty());
    }

    #[test]
    fn test_parse_reader_and_str() {
        let source = "(define N 3);\n% comment\n{ n : ^(N) * ^(N); }\n";
        let expected = doc([("n", val(9))]);
        assert_eq!(Translator::new().parse_str(source).unwrap(), expected);
        assert_eq!(
            Translator::new().parse_reader(source.as_bytes()).unwrap(),
            expected
        );
    }

    #[test]
    fn test_invalid_utf8_is_io_error() {
        let bytes: &[u8] = b"{ a : 1; }\n\xff\xfe\n";
        let err = Translator::new().parse_reader(bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Translator::new()
            .parse_file("definitely/not/here.conf")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("definitely/not/here.conf"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(translate(&[]).unwrap(), Document::new());
        assert_eq!(translate(&["", "% only comments", "#| x |#"]).unwrap(), Document::new());
    }
}
