use std::mem;

use tracing::debug;

use crate::core::error::{LineError, RecognitionSchemaError};
use crate::core::geometry::{BoundingBox, ShapeStrategy};
use crate::core::model::Line;
use crate::ocr::annotation::{BreakType, Paragraph, TextAnnotation};

/// What a symbol's break does to the line being accumulated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakRule {
    Continue,
    Space,
    SpaceAndClose,
    Close,
    HyphenAndClose,
}

impl BreakRule {
    /// `None` for break types with no rule; callers must fail on those.
    pub fn for_break(break_type: &BreakType) -> Option<Self> {
        match break_type {
            BreakType::None => Some(BreakRule::Continue),
            BreakType::Space => Some(BreakRule::Space),
            BreakType::EolSureSpace => Some(BreakRule::SpaceAndClose),
            BreakType::LineBreak => Some(BreakRule::Close),
            BreakType::Hyphen => Some(BreakRule::HyphenAndClose),
            BreakType::SureSpace | BreakType::Unknown | BreakType::Unrecognized(_) => None,
        }
    }

    fn inserts_space(self) -> bool {
        matches!(self, BreakRule::Space | BreakRule::SpaceAndClose)
    }

    fn closes_line(self) -> bool {
        matches!(
            self,
            BreakRule::SpaceAndClose | BreakRule::Close | BreakRule::HyphenAndClose
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstructOptions {
    /// Emit the text left open when a paragraph ends instead of dropping it.
    pub flush_trailing: bool,
}

/// Lines of a document plus the unterminated fragments that were dropped.
#[derive(Debug, Clone, Default)]
pub struct Reconstruction {
    pub lines: Vec<Line>,
    pub dropped: Vec<String>,
}

/// Walks the symbols of each paragraph and cuts them into lines at the
/// line-ending break codes.
#[derive(Debug, Clone)]
pub struct LineReconstructor<S> {
    strategy: S,
    options: ReconstructOptions,
}

#[derive(Default)]
struct Pending {
    text: String,
    word_boxes: Vec<BoundingBox>,
}

impl Pending {
    fn is_empty(&self) -> bool {
        self.text.is_empty() && self.word_boxes.is_empty()
    }
}

impl<S: ShapeStrategy> LineReconstructor<S> {
    pub fn new(strategy: S) -> Self {
        Self {
            strategy,
            options: ReconstructOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReconstructOptions) -> Self {
        self.options = options;
        self
    }

    pub fn reconstruct(&self, annotation: &TextAnnotation) -> Result<Reconstruction, LineError> {
        let mut out = Reconstruction::default();
        for (path, paragraph) in annotation.paragraphs()? {
            self.reconstruct_paragraph(paragraph, &path, &mut out)?;
        }
        debug!(
            lines = out.lines.len(),
            dropped = out.dropped.len(),
            "reconstructed document"
        );
        Ok(out)
    }

    /// Appends the lines of one paragraph to `out`. Accumulators start
    /// empty for every paragraph.
    pub fn reconstruct_paragraph(
        &self,
        paragraph: &Paragraph,
        path: &str,
        out: &mut Reconstruction,
    ) -> Result<(), LineError> {
        let mut pending = Pending::default();

        for (word_idx, word) in paragraph.words(path)?.iter().enumerate() {
            let word_path = format!("{path}.words[{word_idx}]");
            pending.word_boxes.push(word.bounding_box(&word_path)?);

            for (sym_idx, symbol) in word.symbols(&word_path)?.iter().enumerate() {
                let sym_path = format!("{word_path}.symbols[{sym_idx}]");
                let text = symbol.text(&sym_path)?;
                pending.text.push_str(text);

                let break_type = symbol.break_type();
                let rule = BreakRule::for_break(&break_type).ok_or_else(|| {
                    RecognitionSchemaError {
                        break_type: break_type.to_string(),
                        symbol: text.to_string(),
                        path: sym_path.clone(),
                    }
                })?;

                if rule.inserts_space() {
                    pending.text.push(' ');
                }
                if rule == BreakRule::HyphenAndClose {
                    pending.text.push('-');
                }
                if rule.closes_line() {
                    out.lines.push(self.close(&mut pending)?);
                }
            }
        }

        if !pending.is_empty() {
            if self.options.flush_trailing && !pending.text.is_empty() {
                debug!(path, text = %pending.text, "flushing unterminated fragment");
                out.lines.push(self.close(&mut pending)?);
            } else {
                debug!(path, text = %pending.text, "dropping unterminated fragment");
                out.dropped.push(pending.text);
            }
        }
        Ok(())
    }

    fn close(&self, pending: &mut Pending) -> Result<Line, LineError> {
        let shape = self.strategy.build_from_boxes(&pending.word_boxes)?;
        Ok(Line {
            text: mem::take(&mut pending.text),
            word_boxes: mem::take(&mut pending.word_boxes),
            shape,
        })
    }
}
