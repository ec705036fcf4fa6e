mod engine;
mod error;
mod fonts;
mod measure;
mod model;
mod snapshot;

pub use engine::{LayoutInput, compute_layout};
pub use error::Error;
pub use fonts::{FontMetrics, find_font_file};
pub use measure::{
    FontMeasurer, Measurer, NoOverflow, TextStyle, sanitize_style_signature, style_signature,
};
pub use model::{
    BlockDef, BlockInstance, BlockKind, Breakpoint, HeightPolicy, ImageRef, LayoutInstance,
    LeftoverText, OverflowStrategy, SectionDef, SectionGeometry, SectionRef, SectionRole,
    TemplateDef, TextPolicy,
};
pub use snapshot::SnapshotRenderer;

use std::collections::HashMap;
use std::time::Instant;

use maud::Markup;

/// One-call pipeline: compute the layout for `input`, then serialize it to
/// markup with the aside designation taken from the catalog's section roles.
pub fn publish_snapshot(
    input: &LayoutInput,
    measurer: Option<&dyn Measurer>,
    images: &HashMap<String, ImageRef>,
) -> Markup {
    let t0 = Instant::now();

    let layout = compute_layout(input, measurer);
    let t_layout = t0.elapsed();

    let renderer = SnapshotRenderer::from_catalog(&input.section_catalog);
    let markup = renderer.render(&layout, &input.text, images);
    let t_total = t0.elapsed();

    log::info!(
        "Timing: layout={:.1}ms, snapshot={:.1}ms ({} blocks, {} chars)",
        t_layout.as_secs_f64() * 1000.0,
        (t_total - t_layout).as_secs_f64() * 1000.0,
        layout.flow.len(),
        input.text.len(),
    );

    markup
}
