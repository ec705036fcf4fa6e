use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use maud::{Markup, html};

use article_flow::{
    Breakpoint, Error, FontMeasurer, FontMetrics, ImageRef, LayoutInput, Measurer, SectionDef,
    SnapshotRenderer, TemplateDef, TextStyle, compute_layout,
};

#[derive(Parser)]
#[command(
    name = "article-flow",
    version,
    about = "Flow article text into a section template and write an HTML snapshot"
)]
struct Args {
    /// Section catalog JSON: map of sectionTypeId to section definition
    #[arg(long)]
    catalog: PathBuf,

    /// Template JSON
    #[arg(long)]
    template: PathBuf,

    /// Master text file (UTF-8 prose)
    #[arg(long)]
    text: PathBuf,

    /// mobile, tablet or desktop
    #[arg(long, default_value = "desktop")]
    breakpoint: String,

    /// Image map JSON: "instanceKey:slotId" (or plain "slotId") to image
    #[arg(long)]
    images: Option<PathBuf>,

    /// Font family name or font file path; enables the fit-check measurer
    #[arg(long)]
    font: Option<String>,

    /// Default style for fit checks, in px
    #[arg(long, default_value_t = 16.0)]
    font_size: f32,

    /// Default column width for fit checks, in px
    #[arg(long, default_value_t = 640.0)]
    column_width: f32,

    /// Output HTML path; stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also write the computed layout instance as pretty JSON
    #[arg(long)]
    emit_layout: Option<PathBuf>,
}

fn build_measurer(args: &Args) -> Result<Option<FontMeasurer>, Error> {
    let Some(font) = &args.font else {
        return Ok(None);
    };
    let path = PathBuf::from(font);
    let metrics = if path.is_file() {
        FontMetrics::from_file(&path)?
    } else {
        FontMetrics::load_family(font)?
    };
    let style = TextStyle {
        font_size_px: args.font_size,
        line_height_px: None,
        column_width_px: args.column_width,
    };
    Ok(Some(FontMeasurer::with_default_style(metrics, style)))
}

fn page_shell(title: &str, snapshot: Markup) -> String {
    html! {
        (maud::DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (title) }
            }
            body { (snapshot) }
        }
    }
    .into_string()
}

fn run(args: &Args) -> Result<(), Error> {
    let section_catalog: HashMap<String, SectionDef> =
        serde_json::from_str(&std::fs::read_to_string(&args.catalog)?)?;
    let template: TemplateDef = serde_json::from_str(&std::fs::read_to_string(&args.template)?)?;
    let text = std::fs::read_to_string(&args.text)?;
    let breakpoint: Breakpoint = args.breakpoint.parse().map_err(Error::Input)?;

    let images: HashMap<String, ImageRef> = match &args.images {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => HashMap::new(),
    };

    let measurer = build_measurer(args)?;

    let input = LayoutInput {
        template,
        section_catalog,
        text,
        breakpoint,
    };

    let layout = compute_layout(&input, measurer.as_ref().map(|m| m as &dyn Measurer));

    if let Some(path) = &args.emit_layout {
        std::fs::write(path, serde_json::to_string_pretty(&layout)?)?;
        log::info!("wrote layout instance to {}", path.display());
    }

    let renderer = SnapshotRenderer::from_catalog(&input.section_catalog);
    let snapshot = renderer.render(&layout, &input.text, &images);
    let page = page_shell(&layout.template_id, snapshot);

    match &args.out {
        Some(path) => {
            std::fs::write(path, &page)?;
            log::info!("wrote snapshot to {} ({} bytes)", path.display(), page.len());
        }
        None => println!("{page}"),
    }

    Ok(())
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
