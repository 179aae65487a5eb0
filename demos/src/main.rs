//! # Rig Session
//!
//! Builds a small joint chain with a staged settings compound on an in-memory
//! scene, wires it up, then optionally walks the whole undo history back.
//!
//! ```text
//! rig_session --joints 4 --policy atomic --undo-all
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use plugwork::{
    AttributeDescriptor, CommitPolicy, EngineResult, Node, NodeRef, PlugRef, SceneContext,
    load_or_default,
};
use plugwork_scene::{DataType, MemoryScene};

#[derive(Parser, Debug)]
#[command(
    name = "rig_session",
    about = "Replays a scripted rigging session against an in-memory scene",
    version
)]
struct Args {
    /// Engine configuration file.
    #[arg(long, default_value = "plugwork.toml")]
    config: PathBuf,

    /// Overrides the configured commit policy.
    #[arg(long, value_enum)]
    policy: Option<CliPolicy>,

    /// Number of joints in the chain.
    #[arg(long, default_value = "3")]
    joints: usize,

    /// Undo every recorded step at the end.
    #[arg(long)]
    undo_all: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum CliPolicy {
    BestEffort,
    Atomic,
}

impl From<CliPolicy> for CommitPolicy {
    fn from(policy: CliPolicy) -> Self {
        match policy {
            CliPolicy::BestEffort => CommitPolicy::BestEffort,
            CliPolicy::Atomic => CommitPolicy::Atomic,
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = load_or_default(&args.config);
    if let Some(policy) = args.policy {
        config.modifier.commit_policy = policy.into();
    }
    let mut ctx = SceneContext::with_config(MemoryScene::new(), config);

    match run(&mut ctx, &args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Session failed: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &mut SceneContext<MemoryScene>, args: &Args) -> EngineResult {
    let root = ctx.create_node("transform", Some("rig"), None)?;
    let joints = build_chain(ctx, &root, args.joints)?;
    add_settings(ctx, &root)?;
    wire(ctx, &root, &joints)?;

    for joint in &joints {
        joint.attr(ctx, "radius")?.set_keyable(ctx, true)?;
    }
    root.set_locked(ctx, true)?;

    log::info!(
        "Scene has {} node(s) and {} connection(s); {} undo step(s) recorded",
        ctx.scene().node_count(),
        ctx.scene().connections().len(),
        ctx.ledger().undo_count()
    );
    for description in ctx.ledger().undo_descriptions() {
        log::debug!("  {description}");
    }

    if args.undo_all {
        let mut undone = 0;
        while ctx.can_undo() {
            ctx.undo()?;
            undone += 1;
        }
        log::info!(
            "Undid {undone} step(s), {} node(s) left",
            ctx.scene().node_count()
        );
    }
    Ok(())
}

/// Creates the joints in one modifier, each parented to the previous one.
fn build_chain(
    ctx: &mut SceneContext<MemoryScene>,
    root: &Node,
    count: usize,
) -> EngineResult<Vec<Node>> {
    let mut modifier = ctx.modifier(format!("build {count} joint chain"));
    let mut parent = NodeRef::from(root.id());
    for index in 0..count {
        let name = format!("joint{}", index + 1);
        let joint = modifier.create_node("joint", Some(name.as_str()), Some(parent))?;
        modifier.set_plug_value(PlugRef::named(joint, "tx"), 2.0)?;
        parent = joint;
    }
    ctx.commit(modifier)?;
    (0..count)
        .map(|index| ctx.node(format!("joint{}", index + 1)))
        .collect()
}

/// Stages a three-child compound; it attaches with the last child.
fn add_settings(ctx: &mut SceneContext<MemoryScene>, root: &Node) -> EngineResult {
    let settings = AttributeDescriptor::builder("settings")
        .with_short_name("set")
        .with_children_count(3)
        .build()?;
    let mode = AttributeDescriptor::builder("mode")
        .with_enum_names("fk=0:ik=1:blend=2")
        .with_keyable(true)
        .with_parent_descriptor(&settings)
        .build()?;
    let gain = AttributeDescriptor::builder("gain")
        .with_data_type(DataType::Float)
        .with_default(1.0)
        .with_min(0.0)
        .with_soft_max(10.0)
        .with_parent("settings")
        .build()?;
    let label = AttributeDescriptor::builder("label")
        .with_default("main rig")
        .with_parent("settings")
        .build()?;

    ctx.batch("add rig settings", |ctx, modifier| {
        for desc in [&settings, &mode, &gain, &label] {
            root.add_attr_with(ctx, desc, modifier)?;
        }
        Ok(())
    })?;
    root.attr(ctx, "mode")?.set(ctx, "ik")?;
    Ok(())
}

/// Drives every joint's rotation from the rig's gain.
fn wire(ctx: &mut SceneContext<MemoryScene>, root: &Node, joints: &[Node]) -> EngineResult {
    let gain = root.attr(ctx, "gain")?;
    let mut modifier = ctx.modifier("wire gain");
    for joint in joints {
        let rotate_x = joint.attr(ctx, "rx")?;
        gain.connect_with(&mut modifier, &rotate_x, false)?;
    }
    ctx.commit(modifier)
}
