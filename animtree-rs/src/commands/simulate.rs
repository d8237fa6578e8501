//! Frame-by-frame simulation of a scene

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use console::style;
use glam::Vec3;
use serde::Serialize;
use std::path::PathBuf;

use anim_clip::Transform;

use crate::scene::{BuiltScene, Scene};
use crate::utils::{add_table_row, create_table, format_seconds, format_vec3, format_weight};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args)]
pub struct SimulateArgs {
    /// Path to the scene file (.yaml, .yml or .json)
    pub scene: PathBuf,

    /// Number of frames to run
    #[arg(short, long, default_value = "30")]
    pub frames: usize,

    /// Seconds per frame
    #[arg(long, default_value = "0.033333")]
    pub dt: f32,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
pub struct MachineReport {
    pub name: String,
    pub active: String,
    pub current: String,
    /// Weight of the crossfade into the active state, if one is running
    pub fade: Option<f32>,
}

#[derive(Debug, Serialize)]
pub struct FrameReport {
    pub frame: usize,
    pub time: f32,
    pub events: Vec<String>,
    pub motion: Vec3,
    pub distance: Vec3,
    /// Local translation written for the root bone
    pub root_translation: Option<Vec3>,
    pub machines: Vec<MachineReport>,
    pub error: Option<String>,
}

pub fn execute(args: SimulateArgs) -> Result<()> {
    if !(args.dt.is_finite() && args.dt >= 0.0) {
        bail!("Frame time must be a non-negative number, got {}", args.dt);
    }

    let mut scene = Scene::load(&args.scene)?
        .build()
        .with_context(|| format!("Failed to build scene: {}", args.scene.display()))?;

    let reports = run(&mut scene, args.frames, args.dt)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Table => print_table(&reports),
    }
    Ok(())
}

/// Runs `frames` updates of `dt` seconds, applying scheduled events before
/// the update of their frame. A failed frame is reported and the run goes
/// on, as the tree starts afresh on its next update.
pub fn run(scene: &mut BuiltScene, frames: usize, dt: f32) -> Result<Vec<FrameReport>> {
    let mut reports = Vec::with_capacity(frames);

    for frame in 0..frames {
        let due: Vec<_> = scene
            .events
            .iter()
            .filter(|e| e.frame == frame)
            .map(|e| e.event)
            .collect();
        let mut events = Vec::with_capacity(due.len());
        for event in due {
            let description = scene
                .apply(event)
                .with_context(|| format!("Failed to apply event at frame {frame}"))?;
            events.push(description);
        }

        let (motion, error) = match scene.tree.update(dt) {
            Ok(motion) => (motion, None),
            Err(err) => (anim_tree::RootMotion::ZERO, Some(err.to_string())),
        };

        let root_translation = scene.tree.root_bone().map(|bone| {
            let local = scene.tree.player().local_pose()[bone];
            Transform::from_matrix(&local).translation
        });

        reports.push(FrameReport {
            frame,
            time: (frame + 1) as f32 * dt,
            events,
            motion: motion.motion.translation,
            distance: motion.distance.translation,
            root_translation,
            machines: machine_reports(scene)?,
            error,
        });
    }

    Ok(reports)
}

fn machine_reports(scene: &BuiltScene) -> Result<Vec<MachineReport>> {
    scene
        .machines
        .iter()
        .map(|machine| {
            let active = scene.tree.active_state(machine.node)?;
            let current = scene.tree.current_state(machine.node)?;
            let fade = if active == current {
                None
            } else {
                scene
                    .tree
                    .edges(machine.node)?
                    .into_iter()
                    .find(|e| e.end == active && e.begin == current)
                    .map(|e| e.weight)
            };
            Ok(MachineReport {
                name: machine.name.clone(),
                active: machine.state_name(active).to_string(),
                current: machine.state_name(current).to_string(),
                fade,
            })
        })
        .collect()
}

fn print_table(reports: &[FrameReport]) {
    let mut table = create_table(&["Frame", "Time", "Motion", "Root", "States", "Events"]);
    let mut total = Vec3::ZERO;
    let mut failures = 0;

    for report in reports {
        total += report.motion;

        let states = report
            .machines
            .iter()
            .map(|m| match m.fade {
                Some(weight) => format!("{}: {} -> {} ({})", m.name, m.current, m.active, format_weight(weight)),
                None => format!("{}: {}", m.name, m.active),
            })
            .collect::<Vec<_>>()
            .join("\n");

        let mut events = report.events.join("\n");
        if let Some(error) = &report.error {
            failures += 1;
            if !events.is_empty() {
                events.push('\n');
            }
            events.push_str(&format!("error: {error}"));
        }

        add_table_row(
            &mut table,
            vec![
                report.frame.to_string(),
                format_seconds(report.time),
                format_vec3(report.motion),
                report.root_translation.map_or_else(|| "-".to_string(), format_vec3),
                states,
                events,
            ],
        );
    }

    table.printstd();
    println!();
    println!("Total root motion: {}", style(format_vec3(total)).cyan());
    if failures > 0 {
        println!(
            "{} {} frame(s) failed and fell back to the bind pose",
            style("warning:").yellow().bold(),
            failures
        );
    }
}
