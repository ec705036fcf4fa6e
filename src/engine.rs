use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::measure::{Measurer, style_signature};
use crate::model::{
    BlockInstance, BlockKind, Breakpoint, LayoutInstance, LeftoverText, OverflowStrategy,
    SectionDef, TemplateDef, TextPolicy,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutInput {
    pub template: TemplateDef,
    pub section_catalog: HashMap<String, SectionDef>,
    pub text: String,
    pub breakpoint: Breakpoint,
}

/// Distribute the master text and image slots of `input` over the template's
/// sections. Pure given a deterministic `measurer`; holds no state across
/// calls. Never fails: unknown section types, missing policies, and empty
/// excerpts all degrade to "emit nothing for this item".
pub fn compute_layout(input: &LayoutInput, measurer: Option<&dyn Measurer>) -> LayoutInstance {
    let text = input.text.as_str();
    let mut flow: Vec<BlockInstance> = Vec::new();
    let mut cursor = 0usize;
    // Instance numbering is local to one invocation.
    let mut instance_counts: HashMap<&str, u32> = HashMap::new();

    for section_ref in &input.template.sections {
        let Some(section) = input.section_catalog.get(&section_ref.section_type_id) else {
            log::debug!(
                "template {} references unknown section type {:?}, skipped",
                input.template.template_id,
                section_ref.section_type_id,
            );
            continue;
        };

        let count = instance_counts
            .entry(section.section_type_id.as_str())
            .or_insert(0);
        *count += 1;
        let instance_key = format!("{}#{}", section.section_type_id, count);

        for block in &section.blocks {
            match &block.kind {
                BlockKind::Image { image_slot_id } => flow.push(BlockInstance::Image {
                    section_type_id: section.section_type_id.clone(),
                    section_instance_key: instance_key.clone(),
                    block_id: block.id.clone(),
                    image_slot_id: image_slot_id.clone(),
                }),
                BlockKind::Quote { quote_slot_id } => flow.push(BlockInstance::Quote {
                    section_type_id: section.section_type_id.clone(),
                    section_instance_key: instance_key.clone(),
                    block_id: block.id.clone(),
                    quote_slot_id: quote_slot_id.clone(),
                }),
                BlockKind::Carousel { image_slot_ids } => flow.push(BlockInstance::Carousel {
                    section_type_id: section.section_type_id.clone(),
                    section_instance_key: instance_key.clone(),
                    block_id: block.id.clone(),
                    image_slot_ids: image_slot_ids.clone(),
                }),
                BlockKind::Text {
                    accepts_text_flow: false,
                    ..
                } => {}
                BlockKind::Text {
                    accepts_text_flow: true,
                    policy,
                } => {
                    let Some(policy) = policy else {
                        log::debug!(
                            "flow block {:?} in {instance_key} has no text policy, skipped",
                            block.id,
                        );
                        continue;
                    };
                    if cursor >= text.len() {
                        continue;
                    }

                    let remaining = &text[cursor..];
                    let mut end = end_of_n_words(remaining, policy.take_words());
                    if policy.snap_to_sentence {
                        end = snap_to_sentence_end(&remaining[..end]);
                    }

                    if let Some(m) = measurer
                        && let Some(cap) = height_cap(policy, section, input.breakpoint)
                    {
                        let sig =
                            style_signature(&section.section_type_id, &block.id, input.breakpoint);
                        if m.measure_overflow(&remaining[..end], &sig, Some(cap)) {
                            // Single corrective trim, accepted without re-measuring.
                            end = drop_last_sentence(&remaining[..end]);
                        }
                    }

                    if remaining[..end].trim().is_empty() {
                        continue;
                    }
                    flow.push(BlockInstance::Text {
                        section_type_id: section.section_type_id.clone(),
                        section_instance_key: instance_key.clone(),
                        block_id: block.id.clone(),
                        start_char: cursor,
                        end_char: cursor + end,
                    });
                    cursor += end;
                }
            }
        }

        if input.template.truncate_on_text_end && cursor >= text.len() {
            break;
        }
    }

    let leftover_text = if cursor < text.len() {
        match input.template.overflow_strategy {
            OverflowStrategy::Stop => Some(LeftoverText { start_char: cursor }),
            // Unconsumed tail is dropped under the default strategy.
            OverflowStrategy::Continue => None,
        }
    } else {
        None
    };

    LayoutInstance {
        template_id: input.template.template_id.clone(),
        template_version: input.template.version,
        breakpoint: input.breakpoint,
        flow,
        leftover_text,
    }
}

fn height_cap(policy: &TextPolicy, section: &SectionDef, breakpoint: Breakpoint) -> Option<f32> {
    policy.max_height_px.or_else(|| {
        section
            .geometry
            .get(&breakpoint)
            .and_then(|g| g.height.fixed_px())
    })
}

/// Byte offset just past the `n`-th whitespace-delimited token of `text`,
/// or `text.len()` when fewer tokens remain.
fn end_of_n_words(text: &str, n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let mut words = 0usize;
    let mut in_word = false;
    for (i, ch) in text.char_indices() {
        if ch.is_whitespace() {
            if in_word {
                words += 1;
                if words == n {
                    return i;
                }
                in_word = false;
            }
        } else {
            in_word = true;
        }
    }
    text.len()
}

/// Offsets just past each complete sentence in `slice`: a terminator
/// followed by whitespace, or a terminator closing the slice.
fn sentence_ends(slice: &str) -> Vec<usize> {
    let mut ends = Vec::new();
    for (i, ch) in slice.char_indices() {
        if matches!(ch, '.' | '?' | '!') {
            let after = i + ch.len_utf8();
            if slice[after..].starts_with(|c: char| c.is_whitespace()) {
                ends.push(after);
            }
        }
    }
    let trimmed = slice.trim_end();
    if trimmed.ends_with(['.', '?', '!']) && ends.last() != Some(&trimmed.len()) {
        ends.push(trimmed.len());
    }
    ends
}

/// When the slice spans more than one sentence and ends inside an
/// incomplete one, pull the end back to just after the last complete
/// sentence, provided non-empty content remains.
fn snap_to_sentence_end(slice: &str) -> usize {
    let ends = sentence_ends(slice);
    let Some(&last) = ends.last() else {
        return slice.len();
    };
    let tail = &slice[last..];
    if tail.trim().is_empty() {
        // Already ends on a sentence boundary.
        return slice.len();
    }
    if slice[..last].trim().is_empty() {
        return slice.len();
    }
    last
}

/// Overflow correction: drop the slice's final sentence. No-op when the
/// slice holds at most one sentence.
fn drop_last_sentence(slice: &str) -> usize {
    let ends = sentence_ends(slice);
    let Some(&last) = ends.last() else {
        return slice.len();
    };
    if !slice[last..].trim().is_empty() {
        // The incomplete tail is the final sentence.
        return last;
    }
    if ends.len() >= 2 {
        ends[ends.len() - 2]
    } else {
        slice.len()
    }
}
