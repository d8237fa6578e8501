mod common;

use anim_tree::{
    AnimTreeError, AnimationTree, ClipParams, EdgeMode, EdgeParams, EdgeStatus, NodeId,
    PlaybackState, StateId, StateMachineConfig, TravelOutcome, TreeConfig,
};
use common::*;
use glam::{Quat, Vec3};
use pretty_assertions::assert_eq;

fn edge(status: EdgeStatus, mode: EdgeMode, cross_fade: f32) -> EdgeParams {
    EdgeParams {
        mode,
        status,
        next_status: status,
        cross_fade,
    }
}

fn clips() -> Vec<anim_clip::AnimationClip> {
    vec![
        pose_clip("a", Vec3::ZERO, Quat::IDENTITY, 1.0),
        pose_clip("b", Vec3::X, Quat::IDENTITY, 1.0),
        pose_clip("c", Vec3::Y, Quat::IDENTITY, 1.0),
    ]
}

/// A state machine holding one state per entry of `params`, each on its own
/// clip ("a", "b", "c").
fn machine(
    tree: &mut AnimationTree,
    config: StateMachineConfig,
    params: &[ClipParams],
) -> (NodeId, Vec<NodeId>, Vec<StateId>) {
    let stm = tree.create_state_machine_node(config).unwrap();
    let mut clips = Vec::new();
    let mut states = Vec::new();
    for (name, params) in ["a", "b", "c"].into_iter().zip(params) {
        let clip = tree.create_clip_node(name, *params).unwrap();
        clips.push(clip);
        states.push(tree.create_state(stm, clip, 2).unwrap());
    }
    (stm, clips, states)
}

#[test]
fn automatic_edges_forming_a_cycle_fail_the_frame() {
    init_logging();
    let mut tree = tree(clips(), TreeConfig::new(8));
    let (stm, _, s) = machine(&mut tree, StateMachineConfig::new(2, 2), &[paused(), paused()]);
    tree.create_edge(stm, s[0], s[1], edge(EdgeStatus::Auto, EdgeMode::Instant, 0.0))
        .unwrap();
    tree.create_edge(stm, s[1], s[0], edge(EdgeStatus::Auto, EdgeMode::Instant, 0.0))
        .unwrap();
    tree.set_root(stm).unwrap();

    let err = tree.update(0.1).unwrap_err();
    assert!(matches!(err, AnimTreeError::TransitionCycle { state: 0, .. }));

    // the failed frame leaves the skeleton in its bind pose
    let bind = tree.player().skeleton().local_bind()[1];
    assert_eq!(tree.player().local_pose()[1], bind);

    // each frame is attempted independently
    assert!(tree.update(0.1).is_err());
}

#[test]
fn leftover_time_carries_into_the_next_state() {
    let mut tree = tree(clips(), TreeConfig::new(8));
    let ending = ClipParams {
        state: PlaybackState {
            current_time: 0.75,
            ..PlaybackState::default()
        },
        looper: true,
    };
    let (stm, clip, s) = machine(
        &mut tree,
        StateMachineConfig::new(2, 1),
        &[ending, playing(1.0, true)],
    );
    tree.create_edge(stm, s[0], s[1], edge(EdgeStatus::Auto, EdgeMode::Instant, 0.0))
        .unwrap();
    tree.set_root(stm).unwrap();

    tree.update(0.5).unwrap();

    assert_eq!(tree.active_state(stm).unwrap(), s[1]);
    let first = tree.clip_params(clip[0]).unwrap().state;
    assert!(!first.play);
    assert!(approx(first.current_time, 1.0));
    // 0.25s ran out the first clip, the rest went to the second
    assert!(approx(tree.clip_params(clip[1]).unwrap().state.current_time, 0.25));
}

#[test]
fn on_done_edge_waits_for_the_clip_to_finish() {
    let mut tree = tree(clips(), TreeConfig::new(8));
    let (stm, _, s) = machine(
        &mut tree,
        StateMachineConfig::new(2, 1),
        &[playing(1.0, false), paused()],
    );
    let e0 = tree
        .create_edge(stm, s[0], s[1], edge(EdgeStatus::Auto, EdgeMode::OnDone, 0.2))
        .unwrap();
    tree.set_root(stm).unwrap();

    tree.update(0.5).unwrap();
    assert_eq!(tree.active_state(stm).unwrap(), s[0]);

    // the clip stops at its end; it reports done on the next update
    tree.update(0.7).unwrap();
    assert_eq!(tree.active_state(stm).unwrap(), s[0]);

    tree.update(0.1).unwrap();
    assert_eq!(tree.active_state(stm).unwrap(), s[1]);
    assert!(approx(tree.edge_weight(stm, e0).unwrap(), 0.5));
    assert_eq!(tree.current_state(stm).unwrap(), s[0]);
}

#[test]
fn looper_clip_fires_inside_the_crossfade_window() {
    let mut tree = tree(clips(), TreeConfig::new(8));
    let looper = ClipParams {
        looper: true,
        ..playing(1.0, false)
    };
    let (stm, _, s) = machine(&mut tree, StateMachineConfig::new(2, 1), &[looper, paused()]);
    let e0 = tree
        .create_edge(stm, s[0], s[1], edge(EdgeStatus::Auto, EdgeMode::OnDone, 0.2))
        .unwrap();
    tree.set_root(stm).unwrap();

    tree.update(0.7).unwrap();
    assert_eq!(tree.active_state(stm).unwrap(), s[0]);

    tree.update(0.2).unwrap();
    assert_eq!(tree.active_state(stm).unwrap(), s[1]);
    assert_eq!(tree.edge_weight(stm, e0).unwrap(), 0.0);
    assert_eq!(tree.current_state(stm).unwrap(), s[0]);
}

#[test]
fn once_edge_switches_to_its_next_status() {
    let mut tree = tree(clips(), TreeConfig::new(8));
    let (stm, _, s) = machine(
        &mut tree,
        StateMachineConfig::new(2, 2).with_travel(),
        &[paused(), paused()],
    );
    let once = tree
        .create_edge(
            stm,
            s[0],
            s[1],
            EdgeParams {
                status: EdgeStatus::Once,
                next_status: EdgeStatus::Off,
                ..EdgeParams::default()
            },
        )
        .unwrap();
    tree.create_edge(stm, s[1], s[0], edge(EdgeStatus::On, EdgeMode::Instant, 0.0))
        .unwrap();
    tree.set_root(stm).unwrap();

    tree.update(0.1).unwrap();
    assert_eq!(tree.active_state(stm).unwrap(), s[1]);
    assert_eq!(tree.edge_params(stm, once).unwrap().status, EdgeStatus::Off);

    assert_eq!(
        tree.travel_to(stm, s[0]).unwrap(),
        TravelOutcome::Queued { hops: 1 }
    );
    tree.update(0.1).unwrap();
    assert_eq!(tree.active_state(stm).unwrap(), s[0]);

    // the once edge stays closed
    tree.update(0.1).unwrap();
    assert_eq!(tree.active_state(stm).unwrap(), s[0]);
}

#[test]
fn travel_follows_the_shortest_open_path() {
    let mut tree = tree(clips(), TreeConfig::new(8));
    let (stm, _, s) = machine(
        &mut tree,
        StateMachineConfig::new(3, 3).with_travel(),
        &[paused(), paused(), paused()],
    );
    tree.create_edge(stm, s[0], s[2], edge(EdgeStatus::Off, EdgeMode::Instant, 0.0))
        .unwrap();
    tree.create_edge(stm, s[0], s[1], edge(EdgeStatus::On, EdgeMode::Instant, 0.0))
        .unwrap();
    tree.create_edge(stm, s[1], s[2], edge(EdgeStatus::On, EdgeMode::Instant, 0.0))
        .unwrap();
    tree.set_root(stm).unwrap();

    assert_eq!(
        tree.travel_to(stm, s[2]).unwrap(),
        TravelOutcome::Queued { hops: 2 }
    );
    // nothing moves before the next update
    assert_eq!(tree.active_state(stm).unwrap(), s[0]);

    tree.update(0.1).unwrap();
    assert_eq!(tree.active_state(stm).unwrap(), s[2]);
    assert_eq!(tree.current_state(stm).unwrap(), s[2]);
}

#[test]
fn travel_edge_is_used_up_while_the_source_keeps_playing() {
    let mut tree = tree(clips(), TreeConfig::new(8));
    let (stm, _, s) = machine(
        &mut tree,
        StateMachineConfig::new(2, 1).with_travel(),
        &[playing(1.0, true), playing(1.0, true)],
    );
    let e0 = tree
        .create_edge(stm, s[0], s[1], edge(EdgeStatus::On, EdgeMode::Instant, 0.2))
        .unwrap();
    tree.set_root(stm).unwrap();

    assert_eq!(
        tree.travel_to(stm, s[1]).unwrap(),
        TravelOutcome::Queued { hops: 1 }
    );

    tree.update(0.1).unwrap();
    assert_eq!(tree.active_state(stm).unwrap(), s[1]);
    assert_eq!(tree.current_state(stm).unwrap(), s[0]);

    tree.update(0.1).unwrap();
    assert!(approx(tree.edge_weight(stm, e0).unwrap(), 0.5));

    // the crossfade settles and the edge does not fire again
    for _ in 0..10 {
        tree.update(0.1).unwrap();
        assert!(approx(tree.edge_weight(stm, e0).unwrap(), 1.0));
        assert_eq!(tree.current_state(stm).unwrap(), s[1]);
        assert_eq!(tree.active_state(stm).unwrap(), s[1]);
    }
}

#[test]
fn travel_to_the_active_state_changes_nothing() {
    let mut tree = tree(clips(), TreeConfig::new(8));
    let (stm, clip, s) = machine(
        &mut tree,
        StateMachineConfig::new(2, 1).with_travel(),
        &[playing(1.0, true), paused()],
    );
    tree.create_edge(stm, s[0], s[1], EdgeParams::default()).unwrap();
    tree.set_root(stm).unwrap();
    tree.update(0.3).unwrap();

    assert_eq!(tree.travel_to(stm, s[0]).unwrap(), TravelOutcome::AlreadyActive);
    assert!(approx(tree.clip_params(clip[0]).unwrap().state.current_time, 0.3));
}

#[test]
fn unreachable_travel_target_is_jumped_to() {
    let mut tree = tree(clips(), TreeConfig::new(8));
    let mid_clip = ClipParams {
        state: PlaybackState {
            current_time: 0.5,
            looping: true,
            ..PlaybackState::default()
        },
        looper: false,
    };
    let (stm, clip, s) = machine(
        &mut tree,
        StateMachineConfig::new(3, 1).with_travel(),
        &[paused(), paused(), mid_clip],
    );
    tree.create_edge(stm, s[0], s[1], EdgeParams::default()).unwrap();
    tree.set_root(stm).unwrap();

    assert_eq!(tree.travel_to(stm, s[2]).unwrap(), TravelOutcome::Jumped);
    assert_eq!(tree.active_state(stm).unwrap(), s[2]);
    assert_eq!(tree.current_state(stm).unwrap(), s[2]);
    assert_eq!(tree.clip_params(clip[2]).unwrap().state.current_time, 0.0);
}

#[test]
fn travel_without_path_buffers_jumps() {
    let mut tree = tree(clips(), TreeConfig::new(8));
    let (stm, _, s) = machine(&mut tree, StateMachineConfig::new(2, 1), &[paused(), paused()]);
    tree.create_edge(stm, s[0], s[1], EdgeParams::default()).unwrap();
    tree.set_root(stm).unwrap();

    assert_eq!(tree.travel_to(stm, s[1]).unwrap(), TravelOutcome::Jumped);
    assert_eq!(tree.active_state(stm).unwrap(), s[1]);
}

#[test]
fn exit_node_reports_nested_machine_done() {
    for with_exit in [true, false] {
        let mut tree = tree(clips(), TreeConfig::new(12));

        let inner = tree
            .create_state_machine_node(StateMachineConfig::new(2, 1))
            .unwrap();
        let a = tree.create_clip_node("a", paused()).unwrap();
        let b = tree.create_clip_node("b", paused()).unwrap();
        let last = if with_exit {
            tree.create_exit_node(b).unwrap()
        } else {
            b
        };
        let i0 = tree.create_state(inner, a, 1).unwrap();
        let i1 = tree.create_state(inner, last, 0).unwrap();
        tree.create_edge(inner, i0, i1, edge(EdgeStatus::Auto, EdgeMode::Instant, 0.0))
            .unwrap();

        let outer = tree
            .create_state_machine_node(StateMachineConfig::new(2, 1))
            .unwrap();
        let c = tree.create_clip_node("c", paused()).unwrap();
        let o0 = tree.create_state(outer, inner, 1).unwrap();
        let o1 = tree.create_state(outer, c, 0).unwrap();
        tree.create_edge(outer, o0, o1, edge(EdgeStatus::Auto, EdgeMode::OnDone, 0.0))
            .unwrap();
        tree.set_root(outer).unwrap();

        tree.update(0.1).unwrap();

        assert_eq!(tree.active_state(inner).unwrap(), i1);
        let expected = if with_exit { o1 } else { o0 };
        assert_eq!(tree.active_state(outer).unwrap(), expected);
    }
}

#[test]
fn capacities_are_enforced() {
    let mut tree = tree(clips(), TreeConfig::new(8));
    let stm = tree
        .create_state_machine_node(StateMachineConfig::new(2, 1))
        .unwrap();
    let a = tree.create_clip_node("a", paused()).unwrap();

    let s0 = tree.create_state(stm, a, 1).unwrap();
    let s1 = tree.create_state(stm, a, 0).unwrap();
    assert!(matches!(
        tree.create_state(stm, a, 1),
        Err(AnimTreeError::StateCapacity { capacity: 2, .. })
    ));

    assert!(matches!(
        tree.create_edge(stm, s1, s0, EdgeParams::default()),
        Err(AnimTreeError::OutEdgeCapacity { state: 1, capacity: 0 })
    ));
    tree.create_edge(stm, s0, s1, EdgeParams::default()).unwrap();
    assert!(matches!(
        tree.create_edge(stm, s0, s1, EdgeParams::default()),
        Err(AnimTreeError::EdgeCapacity { capacity: 1, .. })
    ));
}

#[test]
fn empty_state_machine_cannot_update() {
    let mut tree = tree(clips(), TreeConfig::new(2));
    let stm = tree
        .create_state_machine_node(StateMachineConfig::default())
        .unwrap();
    tree.set_root(stm).unwrap();

    assert!(matches!(
        tree.update(0.1),
        Err(AnimTreeError::EmptyStateMachine(node)) if node == stm
    ));
}
