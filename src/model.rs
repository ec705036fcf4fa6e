use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Tablet,
    Desktop,
}

impl Breakpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Breakpoint::Mobile => "mobile",
            Breakpoint::Tablet => "tablet",
            Breakpoint::Desktop => "desktop",
        }
    }
}

impl fmt::Display for Breakpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Breakpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mobile" => Ok(Breakpoint::Mobile),
            "tablet" => Ok(Breakpoint::Tablet),
            "desktop" => Ok(Breakpoint::Desktop),
            other => Err(format!("unknown breakpoint: {other:?}")),
        }
    }
}

/// Section height per breakpoint, serialized as `"auto"` or `"fixed:<px>"`.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub enum HeightPolicy {
    #[default]
    Auto,
    Fixed(f32),
}

impl HeightPolicy {
    pub fn fixed_px(&self) -> Option<f32> {
        match self {
            HeightPolicy::Auto => None,
            HeightPolicy::Fixed(px) => Some(*px),
        }
    }
}

impl fmt::Display for HeightPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeightPolicy::Auto => f.write_str("auto"),
            HeightPolicy::Fixed(px) => write!(f, "fixed:{px}"),
        }
    }
}

impl FromStr for HeightPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "auto" {
            return Ok(HeightPolicy::Auto);
        }
        if let Some(px) = s.strip_prefix("fixed:") {
            let px: f32 = px
                .parse()
                .map_err(|_| format!("bad height policy: {s:?}"))?;
            return Ok(HeightPolicy::Fixed(px));
        }
        Err(format!("bad height policy: {s:?}"))
    }
}

impl Serialize for HeightPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HeightPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionGeometry {
    #[serde(default = "default_columns")]
    pub columns: u32,
    #[serde(default)]
    pub gap_px: f32,
    #[serde(default)]
    pub height: HeightPolicy,
}

fn default_columns() -> u32 {
    1
}

/// How a section type renders; `InlineAside` triggers the image-first
/// reordering rule in the snapshot renderer.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionRole {
    #[default]
    Standard,
    InlineAside,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextPolicy {
    pub target_words: u32,
    #[serde(default)]
    pub min_words: Option<u32>,
    #[serde(default)]
    pub max_words: Option<u32>,
    #[serde(default = "default_true")]
    pub snap_to_sentence: bool,
    #[serde(default)]
    pub max_height_px: Option<f32>,
}

impl TextPolicy {
    /// Word-count window: explicit bounds, else 75%/125% of target.
    pub fn word_window(&self) -> (usize, usize) {
        let target = self.target_words as f64;
        let min = self
            .min_words
            .map(|w| w as usize)
            .unwrap_or((0.75 * target).round() as usize);
        let max = self
            .max_words
            .map(|w| w as usize)
            .unwrap_or((1.25 * target).round() as usize);
        (min, max)
    }

    /// Token count to take from the remaining text. Clamps without
    /// panicking on inverted windows (those are not validated).
    pub fn take_words(&self) -> usize {
        let (min, max) = self.word_window();
        (self.target_words as usize).max(min).min(max)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum BlockKind {
    Text {
        #[serde(default)]
        accepts_text_flow: bool,
        #[serde(default)]
        policy: Option<TextPolicy>,
    },
    Image {
        image_slot_id: String,
    },
    Quote {
        #[serde(default)]
        quote_slot_id: Option<String>,
    },
    Carousel {
        image_slot_ids: Vec<String>,
    },
}

/// Blocks never hold content, only identity and fitting rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockDef {
    pub id: String,
    #[serde(flatten)]
    pub kind: BlockKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionDef {
    pub section_type_id: String,
    pub version: u32,
    #[serde(default)]
    pub role: SectionRole,
    #[serde(default)]
    pub geometry: HashMap<Breakpoint, SectionGeometry>,
    pub blocks: Vec<BlockDef>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionRef {
    pub section_type_id: String,
    pub version: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverflowStrategy {
    #[default]
    Continue,
    Stop,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateDef {
    pub template_id: String,
    pub version: u32,
    pub sections: Vec<SectionRef>,
    #[serde(default = "default_true")]
    pub truncate_on_text_end: bool,
    #[serde(default)]
    pub overflow_strategy: OverflowStrategy,
}

/// One entry of the engine's flat output flow. Character offsets are byte
/// offsets into the UTF-8 master text; text ranges are half-open and land
/// on token boundaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum BlockInstance {
    Text {
        section_type_id: String,
        section_instance_key: String,
        block_id: String,
        start_char: usize,
        end_char: usize,
    },
    Image {
        section_type_id: String,
        section_instance_key: String,
        block_id: String,
        image_slot_id: String,
    },
    Quote {
        section_type_id: String,
        section_instance_key: String,
        block_id: String,
        quote_slot_id: Option<String>,
    },
    Carousel {
        section_type_id: String,
        section_instance_key: String,
        block_id: String,
        image_slot_ids: Vec<String>,
    },
}

impl BlockInstance {
    pub fn section_type_id(&self) -> &str {
        match self {
            BlockInstance::Text {
                section_type_id, ..
            }
            | BlockInstance::Image {
                section_type_id, ..
            }
            | BlockInstance::Quote {
                section_type_id, ..
            }
            | BlockInstance::Carousel {
                section_type_id, ..
            } => section_type_id,
        }
    }

    pub fn section_instance_key(&self) -> &str {
        match self {
            BlockInstance::Text {
                section_instance_key,
                ..
            }
            | BlockInstance::Image {
                section_instance_key,
                ..
            }
            | BlockInstance::Quote {
                section_instance_key,
                ..
            }
            | BlockInstance::Carousel {
                section_instance_key,
                ..
            } => section_instance_key,
        }
    }

    pub fn block_id(&self) -> &str {
        match self {
            BlockInstance::Text { block_id, .. }
            | BlockInstance::Image { block_id, .. }
            | BlockInstance::Quote { block_id, .. }
            | BlockInstance::Carousel { block_id, .. } => block_id,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, BlockInstance::Text { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeftoverText {
    pub start_char: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInstance {
    pub template_id: String,
    pub template_version: u32,
    pub breakpoint: Breakpoint,
    pub flow: Vec<BlockInstance>,
    pub leftover_text: Option<LeftoverText>,
}

/// Image content resolved outside the core, keyed by
/// `"<sectionInstanceKey>:<slotId>"` with a plain `<slotId>` fallback.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub storage_path: String,
    #[serde(default)]
    pub alt: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}
