//! Document text annotation tree: pages → blocks → paragraphs → words →
//! symbols, in reading order.
//!
//! Container fields are optional at the serde level so that a malformed tree
//! still deserializes; the accessors report the first missing field as a
//! [`StructureError`] carrying the path to the offending node.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::StructureError;
use crate::core::geometry::{BoundingBox, Point};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotateImageResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text_annotation: Option<TextAnnotation>,
}

impl AnnotateImageResponse {
    pub fn from_value(value: serde_json::Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    pub fn annotation(&self) -> Result<&TextAnnotation, StructureError> {
        self.full_text_annotation
            .as_ref()
            .ok_or_else(|| StructureError::new("response", "fullTextAnnotation"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextAnnotation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Page>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<Vec<Block>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraphs: Option<Vec<Paragraph>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paragraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub words: Option<Vec<Word>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Word {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbols: Option<Vec<Symbol>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property: Option<TextProperty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingPoly>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextProperty {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_break: Option<DetectedBreak>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedBreak {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<RawBreak>,
    #[serde(default)]
    pub is_prefix: bool,
}

/// Break codes arrive as integers, or as enum names from some encoders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawBreak {
    Code(i64),
    Name(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BoundingPoly {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vertices: Option<Vec<Vertex>>,
}

/// Zero-valued coordinates are omitted by the service, hence the defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vertex {
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
}

impl From<Vertex> for Point {
    fn from(v: Vertex) -> Self {
        Point::new(v.x, v.y)
    }
}

/// Per-symbol break metadata. `None` means the symbol carries none.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BreakType {
    #[default]
    None,
    Unknown,
    Space,
    SureSpace,
    EolSureSpace,
    Hyphen,
    LineBreak,
    Unrecognized(String),
}

impl BreakType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => BreakType::Unknown,
            1 => BreakType::Space,
            2 => BreakType::SureSpace,
            3 => BreakType::EolSureSpace,
            4 => BreakType::Hyphen,
            5 => BreakType::LineBreak,
            other => BreakType::Unrecognized(other.to_string()),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "UNKNOWN" => BreakType::Unknown,
            "SPACE" => BreakType::Space,
            "SURE_SPACE" => BreakType::SureSpace,
            "EOL_SURE_SPACE" => BreakType::EolSureSpace,
            "HYPHEN" => BreakType::Hyphen,
            "LINE_BREAK" => BreakType::LineBreak,
            other => BreakType::Unrecognized(other.to_string()),
        }
    }
}

impl fmt::Display for BreakType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakType::None => f.write_str("NONE"),
            BreakType::Unknown => f.write_str("UNKNOWN"),
            BreakType::Space => f.write_str("SPACE"),
            BreakType::SureSpace => f.write_str("SURE_SPACE"),
            BreakType::EolSureSpace => f.write_str("EOL_SURE_SPACE"),
            BreakType::Hyphen => f.write_str("HYPHEN"),
            BreakType::LineBreak => f.write_str("LINE_BREAK"),
            BreakType::Unrecognized(raw) => write!(f, "unrecognized({raw})"),
        }
    }
}

impl From<&RawBreak> for BreakType {
    fn from(raw: &RawBreak) -> Self {
        match raw {
            RawBreak::Code(code) => BreakType::from_code(*code),
            RawBreak::Name(name) => BreakType::from_name(name),
        }
    }
}

/// Granularity for [`TextAnnotation::feature_bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureLevel {
    Page,
    Block,
    Paragraph,
    Word,
    Symbol,
}

fn required<'a, T>(
    field: &'a Option<T>,
    path: &str,
    name: &'static str,
) -> Result<&'a T, StructureError> {
    field
        .as_ref()
        .ok_or_else(|| StructureError::new(path, name))
}

fn child_path(path: &str, field: &str, idx: usize) -> String {
    format!("{path}.{field}[{idx}]")
}

fn box_of(poly: &Option<BoundingPoly>, path: &str) -> Result<BoundingBox, StructureError> {
    let poly = required(poly, path, "boundingBox")?;
    let vertices = required(&poly.vertices, &format!("{path}.boundingBox"), "vertices")?;
    Ok(BoundingBox::new(
        vertices.iter().copied().map(Point::from).collect(),
    ))
}

impl TextAnnotation {
    pub fn pages(&self) -> Result<&[Page], StructureError> {
        required(&self.pages, "fullTextAnnotation", "pages").map(Vec::as_slice)
    }

    /// Every paragraph of the document in traversal order, paired with its
    /// path (`fullTextAnnotation.pages[0].blocks[1].paragraphs[2]`).
    pub fn paragraphs(&self) -> Result<Vec<(String, &Paragraph)>, StructureError> {
        let mut out = Vec::new();
        for (page_idx, page) in self.pages()?.iter().enumerate() {
            let page_path = child_path("fullTextAnnotation", "pages", page_idx);
            for (block_idx, block) in page.blocks(&page_path)?.iter().enumerate() {
                let block_path = child_path(&page_path, "blocks", block_idx);
                for (para_idx, paragraph) in block.paragraphs(&block_path)?.iter().enumerate() {
                    out.push((child_path(&block_path, "paragraphs", para_idx), paragraph));
                }
            }
        }
        Ok(out)
    }

    /// Boxes of every node at `level`, in traversal order. Pages carry no
    /// box in this schema and yield nothing.
    pub fn feature_bounds(&self, level: FeatureLevel) -> Result<Vec<BoundingBox>, StructureError> {
        let mut bounds = Vec::new();
        for (page_idx, page) in self.pages()?.iter().enumerate() {
            let page_path = child_path("fullTextAnnotation", "pages", page_idx);
            for (block_idx, block) in page.blocks(&page_path)?.iter().enumerate() {
                let block_path = child_path(&page_path, "blocks", block_idx);
                for (para_idx, paragraph) in block.paragraphs(&block_path)?.iter().enumerate() {
                    let para_path = child_path(&block_path, "paragraphs", para_idx);
                    for (word_idx, word) in paragraph.words(&para_path)?.iter().enumerate() {
                        let word_path = child_path(&para_path, "words", word_idx);
                        if level == FeatureLevel::Symbol {
                            for (sym_idx, symbol) in word.symbols(&word_path)?.iter().enumerate() {
                                let sym_path = child_path(&word_path, "symbols", sym_idx);
                                bounds.push(symbol.bounding_box(&sym_path)?);
                            }
                        }
                        if level == FeatureLevel::Word {
                            bounds.push(word.bounding_box(&word_path)?);
                        }
                    }
                    if level == FeatureLevel::Paragraph {
                        bounds.push(paragraph.bounding_box(&para_path)?);
                    }
                }
                if level == FeatureLevel::Block {
                    bounds.push(block.bounding_box(&block_path)?);
                }
            }
        }
        Ok(bounds)
    }
}

impl Page {
    pub fn blocks(&self, path: &str) -> Result<&[Block], StructureError> {
        required(&self.blocks, path, "blocks").map(Vec::as_slice)
    }
}

impl Block {
    pub fn paragraphs(&self, path: &str) -> Result<&[Paragraph], StructureError> {
        required(&self.paragraphs, path, "paragraphs").map(Vec::as_slice)
    }

    pub fn bounding_box(&self, path: &str) -> Result<BoundingBox, StructureError> {
        box_of(&self.bounding_box, path)
    }
}

impl Paragraph {
    pub fn words(&self, path: &str) -> Result<&[Word], StructureError> {
        required(&self.words, path, "words").map(Vec::as_slice)
    }

    pub fn bounding_box(&self, path: &str) -> Result<BoundingBox, StructureError> {
        box_of(&self.bounding_box, path)
    }
}

impl Word {
    pub fn symbols(&self, path: &str) -> Result<&[Symbol], StructureError> {
        required(&self.symbols, path, "symbols").map(Vec::as_slice)
    }

    pub fn bounding_box(&self, path: &str) -> Result<BoundingBox, StructureError> {
        box_of(&self.bounding_box, path)
    }
}

impl Symbol {
    pub fn text(&self, path: &str) -> Result<&str, StructureError> {
        required(&self.text, path, "text").map(String::as_str)
    }

    pub fn bounding_box(&self, path: &str) -> Result<BoundingBox, StructureError> {
        box_of(&self.bounding_box, path)
    }

    /// Missing `property`, `detectedBreak`, or `type` all mean no break.
    pub fn break_type(&self) -> BreakType {
        self.property
            .as_ref()
            .and_then(|p| p.detected_break.as_ref())
            .and_then(|b| b.kind.as_ref())
            .map(BreakType::from)
            .unwrap_or_default()
    }
}
