//! Scene inspection: summary and node hierarchy

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::path::PathBuf;

use anim_tree::{EdgeStatus, NodeId, NodeKind};

use crate::scene::{BuiltScene, Scene};
use crate::utils::{
    NodeType, TreeNode, TreeOptions, format_rotation, format_seconds, format_vec3, render_tree,
};

#[derive(Args)]
pub struct InspectArgs {
    /// Path to the scene file (.yaml, .yml or .json)
    pub scene: PathBuf,

    /// Maximum depth to display
    #[arg(long)]
    pub depth: Option<usize>,

    /// Hide node parameters
    #[arg(long)]
    pub no_metadata: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Show parameters inline
    #[arg(long)]
    pub compact: bool,

    /// List every bone with its bind transform
    #[arg(long)]
    pub bones: bool,
}

pub fn execute(args: InspectArgs) -> Result<()> {
    let scene = Scene::load(&args.scene)?
        .build()
        .with_context(|| format!("Failed to build scene: {}", args.scene.display()))?;

    print_summary(&scene, args.bones);

    let file_name = args
        .scene
        .file_name()
        .map_or_else(|| args.scene.display().to_string(), |n| n.to_string_lossy().into_owned());
    let root = TreeNode::new(file_name, NodeType::Scene)
        .with_metadata("nodes", format!("{}/{}", scene.tree.node_count(), scene.tree.capacity()))
        .add_child(build_node(&scene, scene.root, &mut Vec::new())?);

    let options = TreeOptions {
        max_depth: args.depth,
        no_color: args.no_color,
        show_metadata: !args.no_metadata,
        compact: args.compact,
    };
    print!("{}", render_tree(&root, &options));
    Ok(())
}

fn print_summary(scene: &BuiltScene, list_bones: bool) {
    let player = scene.tree.player();
    let skeleton = player.skeleton();

    println!("{}", style("Scene").bold().underlined());
    println!("  Bones: {}", skeleton.bone_count());
    if list_bones {
        for line in bind_pose_lines(scene) {
            println!("    {line}");
        }
    }
    match scene.tree.root_bone().and_then(|b| skeleton.bone(b)) {
        Some(bone) => println!("  Root bone: {}", style(&bone.name).cyan()),
        None => println!("  Root bone: {}", style("none").dim()),
    }

    println!("  Clips: {}", player.library().len());
    for clip in player.library().iter() {
        println!(
            "    {} ({}, {} channels)",
            style(clip.name()).green(),
            format_seconds(clip.duration_seconds()),
            clip.channels().len()
        );
    }
    println!("  Events: {}", scene.events.len());
    println!();
}

/// Builds the display subtree of `node`. `path` holds the nodes of the
/// current branch so shared subtrees print fully but loops stop.
fn build_node(scene: &BuiltScene, node: NodeId, path: &mut Vec<NodeId>) -> Result<TreeNode> {
    let name = scene.node_name(node);
    if path.contains(&node) {
        return Ok(TreeNode::new(format!("{name} (cycle)"), NodeType::Cycle));
    }
    path.push(node);

    let tree = &scene.tree;
    let mut display = match tree.node_kind(node)? {
        NodeKind::Clip => {
            let params = tree.clip_params(node)?;
            TreeNode::new(name, NodeType::Clip)
                .with_metadata("clip", tree.clip_name(node)?)
                .with_metadata("time", format_seconds(params.state.current_time))
                .with_metadata("speed", params.state.speed)
                .with_metadata("play", params.state.play)
                .with_metadata("loop", params.state.looping)
                .with_metadata("looper", params.looper)
        }
        NodeKind::Blend2 => {
            let params = tree.blend2_params(node)?;
            TreeNode::new(name, NodeType::Blend)
                .with_metadata("blend", params.blend)
                .with_metadata("mask", mask_summary(params.mask.as_ref()))
        }
        NodeKind::Add2 => {
            let params = tree.add2_params(node)?;
            TreeNode::new(name, NodeType::Add)
                .with_metadata("weight", params.weight)
                .with_metadata("mask", mask_summary(params.mask.as_ref()))
        }
        NodeKind::Switch => {
            let params = tree.switch_params(node)?;
            TreeNode::new(name, NodeType::Switch)
                .with_metadata("active", params.active_input)
                .with_metadata("cross_fade", format_seconds(params.cross_fade))
                .with_metadata("synced", params.synced)
        }
        NodeKind::StateMachine => {
            let config = tree.state_machine_config(node)?;
            TreeNode::new(name, NodeType::StateMachine)
                .with_metadata("states", format!("{}/{}", tree.state_nodes(node)?.len(), config.max_states))
                .with_metadata("edges", format!("{}/{}", tree.edges(node)?.len(), config.max_edges))
                .with_metadata("travel", config.travel)
        }
        NodeKind::Exit => TreeNode::new(name, NodeType::Exit),
    };

    match tree.node_kind(node)? {
        NodeKind::StateMachine => {
            for child in state_children(scene, node, path)? {
                display = display.add_child(child);
            }
        }
        _ => {
            for (input, child) in tree.node_inputs(node)?.into_iter().enumerate() {
                let child = match child {
                    Some(child) => build_node(scene, child, path)?,
                    None => TreeNode::new(format!("input {input} (unconnected)"), NodeType::Cycle),
                };
                display = display.add_child(child);
            }
        }
    }

    path.pop();
    Ok(display)
}

fn state_children(scene: &BuiltScene, stm: NodeId, path: &mut Vec<NodeId>) -> Result<Vec<TreeNode>> {
    let tree = &scene.tree;
    let machine = scene.machine(stm);
    let state_name = |index: usize| {
        machine
            .and_then(|m| m.states.get(index))
            .map_or_else(|| format!("S{index}"), Clone::clone)
    };
    let active = tree.active_state(stm)?.index();
    let edges = tree.edges(stm)?;

    let mut children = Vec::new();
    for (index, node) in tree.state_nodes(stm)?.into_iter().enumerate() {
        let mut label = state_name(index);
        if index == active {
            label.push_str(" *");
        }

        let mut state = TreeNode::new(label, NodeType::State);
        for edge in edges.iter().filter(|e| e.begin.index() == index) {
            let mut info = TreeNode::new(format!("-> {}", state_name(edge.end.index())), NodeType::Edge)
                .with_metadata("mode", format!("{:?}", edge.params.mode))
                .with_metadata("status", format!("{:?}", edge.params.status))
                .with_metadata("cross_fade", format_seconds(edge.params.cross_fade));
            if edge.params.status == EdgeStatus::Once {
                info = info.with_metadata("then", format!("{:?}", edge.params.next_status));
            }
            state = state.add_child(info);
        }
        children.push(state.add_child(build_node(scene, node, path)?));
    }
    Ok(children)
}

fn mask_summary(mask: Option<&anim_tree::BoneMask>) -> String {
    match mask {
        None => "all bones".to_string(),
        Some(mask) => format!("{} of {} bones", mask.len(), mask.bone_count()),
    }
}

fn bind_pose_lines(scene: &BuiltScene) -> Vec<String> {
    let skeleton = scene.tree.player().skeleton();
    skeleton
        .bones()
        .iter()
        .zip(skeleton.local_bind())
        .map(|(bone, bind)| {
            let (_, rotation, translation) = bind.to_scale_rotation_translation();
            format!(
                "{}: {} {}",
                bone.name,
                format_vec3(translation),
                format_rotation(rotation)
            )
        })
        .collect()
}
