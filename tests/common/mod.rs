use std::collections::HashMap;

use article_flow::{
    BlockDef, BlockKind, Breakpoint, LayoutInput, OverflowStrategy, SectionDef, SectionRef,
    SectionRole, TemplateDef, TextPolicy,
};

pub fn text_policy(target_words: u32) -> TextPolicy {
    TextPolicy {
        target_words,
        min_words: None,
        max_words: None,
        snap_to_sentence: true,
        max_height_px: None,
    }
}

pub fn flow_block(id: &str, policy: TextPolicy) -> BlockDef {
    BlockDef {
        id: id.to_string(),
        kind: BlockKind::Text {
            accepts_text_flow: true,
            policy: Some(policy),
        },
    }
}

pub fn image_block(id: &str, slot_id: &str) -> BlockDef {
    BlockDef {
        id: id.to_string(),
        kind: BlockKind::Image {
            image_slot_id: slot_id.to_string(),
        },
    }
}

pub fn section(section_type_id: &str, blocks: Vec<BlockDef>) -> SectionDef {
    SectionDef {
        section_type_id: section_type_id.to_string(),
        version: 1,
        role: SectionRole::Standard,
        geometry: HashMap::new(),
        blocks,
    }
}

pub fn catalog(sections: Vec<SectionDef>) -> HashMap<String, SectionDef> {
    sections
        .into_iter()
        .map(|s| (s.section_type_id.clone(), s))
        .collect()
}

pub fn template(section_type_ids: &[&str]) -> TemplateDef {
    TemplateDef {
        template_id: "article".to_string(),
        version: 1,
        sections: section_type_ids
            .iter()
            .map(|id| SectionRef {
                section_type_id: id.to_string(),
                version: 1,
            })
            .collect(),
        truncate_on_text_end: true,
        overflow_strategy: OverflowStrategy::Continue,
    }
}

pub fn input(
    template: TemplateDef,
    section_catalog: HashMap<String, SectionDef>,
    text: &str,
    breakpoint: Breakpoint,
) -> LayoutInput {
    LayoutInput {
        template,
        section_catalog,
        text: text.to_string(),
        breakpoint,
    }
}

/// `n` whitespace-separated words with no sentence terminators.
pub fn words(n: usize) -> String {
    (0..n)
        .map(|i| format!("w{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}
