use std::collections::{HashMap, HashSet};

use maud::{Markup, html};

use crate::model::{BlockInstance, ImageRef, LayoutInstance, SectionDef, SectionRole};

/// Serializes a [`LayoutInstance`] back into final markup: blocks grouped by
/// section instance in first-seen order, with the image-first reordering
/// rule applied to inline-aside sections.
pub struct SnapshotRenderer {
    aside_types: HashSet<String>,
}

impl SnapshotRenderer {
    /// Renderer with the conventional `inlineAside` section type designated
    /// as the reordered kind.
    pub fn new() -> Self {
        SnapshotRenderer {
            aside_types: HashSet::from(["inlineAside".to_string()]),
        }
    }

    /// Collect the designated aside types from the catalog's section roles.
    pub fn from_catalog(catalog: &HashMap<String, SectionDef>) -> Self {
        SnapshotRenderer {
            aside_types: catalog
                .values()
                .filter(|s| s.role == SectionRole::InlineAside)
                .map(|s| s.section_type_id.clone())
                .collect(),
        }
    }

    pub fn with_aside_types<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SnapshotRenderer {
            aside_types: types.into_iter().map(Into::into).collect(),
        }
    }

    pub fn render(
        &self,
        layout: &LayoutInstance,
        master_text: &str,
        images_by_slot: &HashMap<String, ImageRef>,
    ) -> Markup {
        let groups = group_flow(&layout.flow);
        html! {
            article class="article" data-template=(layout.template_id)
                data-template-version=(layout.template_version)
                data-breakpoint=(layout.breakpoint.as_str())
            {
                @for (key, blocks) in &groups {
                    @let type_id = blocks[0].section_type_id();
                    @let ordered = if self.aside_types.contains(type_id) {
                        reorder_aside(blocks)
                    } else {
                        blocks.clone()
                    };
                    section class={ "section section--" (type_id) } data-instance=(key) {
                        @for block in &ordered {
                            (render_block(block, master_text, images_by_slot))
                        }
                    }
                }
            }
        }
    }
}

impl Default for SnapshotRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Group flow entries by section instance key, preserving first-seen order.
fn group_flow(flow: &[BlockInstance]) -> Vec<(&str, Vec<&BlockInstance>)> {
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&BlockInstance>> = HashMap::new();
    for block in flow {
        let key = block.section_instance_key();
        if !groups.contains_key(key) {
            order.push(key);
        }
        groups.entry(key).or_default().push(block);
    }
    order
        .into_iter()
        .map(|key| {
            let blocks = groups.remove(key).expect("group recorded in first pass");
            (key, blocks)
        })
        .collect()
}

/// Inline-aside rule: the first image-kind instance leads, then every text
/// instance in original relative order, then the remaining image-kind ones.
fn reorder_aside<'a>(blocks: &[&'a BlockInstance]) -> Vec<&'a BlockInstance> {
    let Some(lead) = blocks.iter().position(|b| !b.is_text()) else {
        return blocks.to_vec();
    };
    let mut out = Vec::with_capacity(blocks.len());
    out.push(blocks[lead]);
    out.extend(blocks.iter().filter(|b| b.is_text()).copied());
    out.extend(
        blocks
            .iter()
            .enumerate()
            .filter(|&(i, b)| i != lead && !b.is_text())
            .map(|(_, b)| *b),
    );
    out
}

/// Composite key first, plain slot id as fallback.
fn resolve_slot<'a>(
    images: &'a HashMap<String, ImageRef>,
    instance_key: &str,
    slot_id: &str,
) -> Option<&'a ImageRef> {
    images
        .get(&format!("{instance_key}:{slot_id}"))
        .or_else(|| images.get(slot_id))
}

/// Authoring gaps stay visible: the placeholder names both the slot and the
/// section instance it belongs to.
fn missing_slot(slot_id: &str, instance_key: &str) -> Markup {
    html! {
        span class="missing-slot" {
            "Missing content for slot " (slot_id) " (" (instance_key) ")"
        }
    }
}

fn image_figure(image: &ImageRef) -> Markup {
    html! {
        img src=(image.storage_path) alt=[image.alt.as_deref()];
        @if let Some(caption) = &image.caption {
            figcaption { (caption) }
        }
    }
}

/// Paragraphs split on blank-line boundaries; wrapped source lines within a
/// paragraph are joined with single spaces.
fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current = String::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(line.trim());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

fn render_block(
    block: &BlockInstance,
    master_text: &str,
    images: &HashMap<String, ImageRef>,
) -> Markup {
    match block {
        BlockInstance::Text {
            block_id,
            start_char,
            end_char,
            ..
        } => {
            // Offsets from a layout computed against different text
            // degrade to an empty block.
            let slice = master_text.get(*start_char..*end_char).unwrap_or("");
            html! {
                div class="block block--text" data-block=(block_id) {
                    @for paragraph in split_paragraphs(slice) {
                        p { (paragraph) }
                    }
                }
            }
        }
        BlockInstance::Image {
            section_instance_key,
            block_id,
            image_slot_id,
            ..
        } => html! {
            figure class="block block--image" data-block=(block_id) data-slot=(image_slot_id) {
                @if let Some(image) = resolve_slot(images, section_instance_key, image_slot_id) {
                    (image_figure(image))
                } @else {
                    (missing_slot(image_slot_id, section_instance_key))
                }
            }
        },
        BlockInstance::Quote {
            section_instance_key,
            block_id,
            quote_slot_id,
            ..
        } => {
            let copy = quote_slot_id
                .as_deref()
                .and_then(|slot| resolve_slot(images, section_instance_key, slot))
                .and_then(|r| r.caption.as_deref());
            html! {
                blockquote class="block block--quote" data-block=(block_id)
                    data-slot=[quote_slot_id.as_deref()]
                {
                    @if let Some(copy) = copy {
                        p { (copy) }
                    } @else {
                        (missing_slot(quote_slot_id.as_deref().unwrap_or("(none)"), section_instance_key))
                    }
                }
            }
        }
        BlockInstance::Carousel {
            section_instance_key,
            block_id,
            image_slot_ids,
            ..
        } => html! {
            div class="block block--carousel" data-block=(block_id) {
                ul class="carousel" {
                    @for slot_id in image_slot_ids {
                        li data-slot=(slot_id) {
                            @if let Some(image) = resolve_slot(images, section_instance_key, slot_id) {
                                (image_figure(image))
                            } @else {
                                (missing_slot(slot_id, section_instance_key))
                            }
                        }
                    }
                }
            }
        },
    }
}
