use anyhow::Context;
use clap::{Parser, Subcommand};
use glam::Vec3;
use levelforge_author::{CommandStack, CreateNode, EditorContext, EditorEvent};
use levelforge_common::{NodeId, Transform};
use levelforge_kernel::FrameClock;
use levelforge_modules::builtin::register_builtins;
use levelforge_modules::{ModuleRegistry, ModuleStore, NodeDecl, Project};
use levelforge_tools::{ModuleInspector, SceneInspector};
use levelforge_watch::ProjectWatcher;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "levelforge", about = "Level editor tooling: modules, play mode, hot reload")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and registered module classes
    Info,
    /// List module files found under a project
    Discover {
        #[arg(default_value = ".")]
        root: PathBuf,
    },
    /// Build the project scene, run play mode for a number of frames, then
    /// restore edit-mode state
    Play {
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Number of frames to simulate
        #[arg(short, long, default_value = "60")]
        frames: u64,
        /// Seconds per frame
        #[arg(long, default_value = "0.016")]
        dt: f32,
        /// Drop attributes created during play when restoring
        #[arg(long)]
        remove_differences: bool,
    },
    /// Load every module and apply file changes as they happen
    Watch {
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Stop after this many seconds; runs until interrupted if omitted
        #[arg(short, long)]
        seconds: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match cli.command {
        Commands::Info => info(),
        Commands::Discover { root } => discover(&root),
        Commands::Play {
            root,
            frames,
            dt,
            remove_differences,
        } => play(&root, frames, dt, remove_differences),
        Commands::Watch { root, seconds } => watch(&root, seconds.map(Duration::from_secs)),
    }
}

fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    register_builtins(&mut registry);
    registry
}

fn open_store(root: &Path) -> anyhow::Result<(Project, ModuleStore)> {
    let project = Project::open(root).with_context(|| format!("opening {}", root.display()))?;
    let mut store = ModuleStore::new(registry(), project.discovery());
    let report = store.load_all();
    for err in &report.errors {
        eprintln!("error: {err}");
    }
    println!(
        "{}: loaded {} module(s), {} failed",
        project.name(),
        report.loaded.len(),
        report.errors.len()
    );
    Ok((project, store))
}

fn info() -> anyhow::Result<()> {
    println!("levelforge v{}", env!("CARGO_PKG_VERSION"));
    let registry = registry();
    for name in registry.names() {
        if let Some(class) = registry.get(name) {
            let fields: Vec<_> = class.fields().iter().map(|f| f.name.as_str()).collect();
            println!("  {name} v{} [{}]", class.version(), fields.join(", "));
        }
    }
    Ok(())
}

fn discover(root: &Path) -> anyhow::Result<()> {
    let project = Project::open(root).with_context(|| format!("opening {}", root.display()))?;
    let discovery = project.discovery();
    let mut count = 0;
    for path in discovery.iter() {
        let shown = path.strip_prefix(project.root()).unwrap_or(&path);
        println!("{}", shown.display());
        count += 1;
    }
    println!("{count} module file(s)");
    Ok(())
}

/// Create the configured nodes through the undo stack, parents first.
fn build_scene(
    nodes: &[NodeDecl],
    ctx: &mut EditorContext,
    stack: &mut CommandStack,
) -> anyhow::Result<()> {
    let mut created: HashMap<&str, NodeId> = HashMap::new();
    let mut remaining: Vec<&NodeDecl> = nodes.iter().collect();
    while !remaining.is_empty() {
        let before = remaining.len();
        let mut deferred = Vec::new();
        for decl in remaining {
            let parent = match decl.parent.as_deref() {
                None => None,
                Some(name) => match created.get(name) {
                    Some(id) => Some(*id),
                    None => {
                        deferred.push(decl);
                        continue;
                    }
                },
            };
            let transform = Transform::from_position(Vec3::from_array(decl.position));
            stack.execute(ctx, CreateNode::new(decl.name.clone(), parent, transform))?;
            let id = ctx
                .selection
                .primary()
                .context("created node was not selected")?;
            created.insert(decl.name.as_str(), id);
        }
        if deferred.len() == before {
            let names: Vec<_> = deferred.iter().map(|s| s.name.as_str()).collect();
            anyhow::bail!("nodes with unknown parents: {}", names.join(", "));
        }
        remaining = deferred;
    }
    Ok(())
}

fn play(root: &Path, frames: u64, dt: f32, remove_differences: bool) -> anyhow::Result<()> {
    let (project, mut store) = open_store(root)?;

    let mut ctx = EditorContext::new();
    ctx.bus.subscribe(|event: &EditorEvent| {
        tracing::debug!(kind = event.kind.name(), nodes = event.nodes.len(), "editor event");
    });
    let mut stack = CommandStack::new();
    build_scene(&project.config().nodes, &mut ctx, &mut stack)?;
    println!("{}", ModuleInspector::history(&stack));

    for (id, node) in store.bind_nodes(&ctx.scene) {
        eprintln!("warning: module {id} wants node `{node}`, which does not exist");
    }

    let before = ctx.scene.state_hash();
    let skipped = store.enter_play(&mut ctx.scene);
    for (id, err) in &skipped {
        eprintln!("warning: module {id}: {err}");
    }

    let mut clock = FrameClock::new();
    let mut dispatched = 0;
    for _ in 0..frames {
        let time = clock.advance(dt);
        dispatched += store.update(&mut ctx.scene, time).dispatched;
    }
    println!(
        "played {frames} frame(s), {:.2}s, {dispatched} callback(s)",
        clock.elapsed()
    );
    for line in SceneInspector::tree(&ctx.scene) {
        println!("  {line}");
    }
    for row in ModuleInspector::rows(&store) {
        println!("  {row}");
        for attr in &row.attributes {
            println!("      {attr}");
        }
    }

    for (id, report) in store.exit_play(remove_differences) {
        println!(
            "restored {id}: {} value(s), {} removed, {} skipped",
            report.restored,
            report.removed.len(),
            report.skipped.len()
        );
    }
    println!("{}", ModuleInspector::summary(&store));
    println!(
        "scene changed during play: {}",
        if ctx.scene.state_hash() == before { "no" } else { "yes" }
    );
    Ok(())
}

fn watch(root: &Path, limit: Option<Duration>) -> anyhow::Result<()> {
    let (project, mut store) = open_store(root)?;
    let mut watcher = ProjectWatcher::new(project.root(), project.config().debounce())?;
    println!("watching {} (debounce {:?})", project.root().display(), project.config().debounce());

    let started = Instant::now();
    while limit.is_none_or(|limit| started.elapsed() < limit) {
        let changes = watcher.poll();
        if !changes.is_empty() {
            let report = store.apply_changes(&changes);
            for err in &report.errors {
                eprintln!("error: {err}");
            }
            println!(
                "loaded {} reloaded {} unloaded {} failed {}",
                report.loaded.len(),
                report.reloaded.len(),
                report.unloaded.len(),
                report.errors.len()
            );
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    println!("{}", ModuleInspector::summary(&store));
    Ok(())
}
