use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use imgchain::{Catalog, Editor, EditorOpts, PluginRuntime};

#[derive(Parser, Debug)]
#[command(name = "imgchain", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List node kinds and their parameters.
    Kinds(KindsArgs),
    /// Print the resolved chain of a project.
    Chain(ChainArgs),
    /// Load a project, render it and write the result.
    Render(RenderArgs),
}

#[derive(Parser, Debug)]
struct KindsArgs {
    /// Directory of plugin descriptors to register.
    #[arg(long)]
    plugins: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct ChainArgs {
    /// Project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Directory of plugin descriptors to register.
    #[arg(long)]
    plugins: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Project JSON.
    #[arg(long)]
    project: PathBuf,

    /// Output image path; the format follows the extension.
    #[arg(long)]
    out: PathBuf,

    /// Source image, overriding the one named by the project.
    #[arg(long)]
    image: Option<PathBuf>,

    /// Editor options JSON.
    #[arg(long)]
    opts: Option<PathBuf>,

    /// Directory of plugin descriptors to register.
    #[arg(long)]
    plugins: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Kinds(args) => cmd_kinds(args),
        Command::Chain(args) => cmd_chain(args),
        Command::Render(args) => cmd_render(args),
    }
}

fn catalog(plugins: Option<&Path>) -> anyhow::Result<Catalog> {
    let mut catalog = Catalog::builtin();
    if let Some(dir) = plugins {
        let descriptors = imgchain::discover_plugins(dir)?;
        let names = catalog.register_plugins(&descriptors, &PluginRuntime::standard())?;
        tracing::info!(count = names.len(), "registered plugin kinds");
    }
    Ok(catalog)
}

fn open_project(
    project: &Path,
    catalog: Catalog,
    opts: EditorOpts,
    image: Option<&Path>,
) -> anyhow::Result<Editor> {
    let mut editor = Editor::new(catalog, opts, image::RgbaImage::new(1, 1))?;
    let report = match image {
        // Size-derived defaults must see the override, so it goes in before the nodes.
        Some(path) => {
            let img = imgchain::project::image_io::read_image(path)?;
            editor.set_input_image(img, Some(path.to_path_buf()));
            editor.load_graph(project)?
        }
        // The project's own image replaces this placeholder during load.
        None => editor.load(project)?,
    };
    if !report.skipped_nodes.is_empty() || report.dropped_links > 0 {
        eprintln!(
            "warning: skipped {} node(s), dropped {} link(s)",
            report.skipped_nodes.len(),
            report.dropped_links
        );
    }
    Ok(editor)
}

fn cmd_kinds(args: KindsArgs) -> anyhow::Result<()> {
    let catalog = catalog(args.plugins.as_deref())?;
    for kind in catalog.kinds() {
        let flags = match (kind.protected, kind.plugin) {
            (true, true) => " [protected, plugin]",
            (true, false) => " [protected]",
            (false, true) => " [plugin]",
            (false, false) => "",
        };
        println!("{}{flags}: {}", kind.name, kind.description);
        for spec in &kind.params {
            let range = match (spec.min, spec.max) {
                (Some(lo), Some(hi)) => format!(" {lo}..={hi}"),
                (Some(lo), None) => format!(" >= {lo}"),
                (None, Some(hi)) => format!(" <= {hi}"),
                (None, None) => String::new(),
            };
            let choices = if spec.choices.is_empty() {
                String::new()
            } else {
                format!(" {:?}", spec.choices)
            };
            println!("  {}: {:?}{range}{choices}", spec.name, spec.default);
        }
    }
    Ok(())
}

fn cmd_chain(args: ChainArgs) -> anyhow::Result<()> {
    let catalog = catalog(args.plugins.as_deref())?;
    let editor = open_project(&args.project, catalog, EditorOpts::default(), None)?;
    let chain = editor.chain();
    let labels = chain
        .nodes
        .iter()
        .map(|&id| editor.node(id).map(|n| n.label.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    println!("{}", labels.join(" -> "));
    if !chain.complete {
        println!("(incomplete: chain does not reach the Output node)");
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let opts = match &args.opts {
        Some(path) => EditorOpts::from_json_file(path)?,
        None => EditorOpts::default(),
    };
    let catalog = catalog(args.plugins.as_deref())?;
    let mut editor = open_project(&args.project, catalog, opts, args.image.as_deref())?;

    let output = editor
        .recompute()
        .with_context(|| format!("render project '{}'", args.project.display()))?;
    if let Some(label) = &output.size_label {
        eprintln!("{label}");
    }
    editor.export(&args.out)?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}
