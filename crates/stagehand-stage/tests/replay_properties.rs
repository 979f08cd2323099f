//! Replay properties of compiled command queues: apply/revert symmetry and
//! path independence of the cursor state.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use stagehand_core::message::{Message, Role};
use stagehand_stage::application::compiler::{CompileOptions, compile_message};
use stagehand_stage::domain::queue::CommandQueue;
use stagehand_stage::domain::scene::SceneState;
use uuid::Uuid;

const IDS: [&str; 3] = ["kai", "mira", "odo"];
const EXPRESSIONS: [&str; 3] = ["calm", "angry", "smile"];
const POSITIONS: [&str; 3] = ["left", "center", "right"];

fn element() -> impl Strategy<Value = String> {
    prop_oneof![
        (0..3usize).prop_map(|i| format!(r#"<background src="bg{i}.png"/>"#)),
        (0..3usize, proptest::option::of(0..3usize), 0..3usize).prop_map(|(id, expr, pos)| {
            match expr {
                Some(e) => format!(
                    r#"<enter id="{}" expression="{}" position="{}"/>"#,
                    IDS[id], EXPRESSIONS[e], POSITIONS[pos]
                ),
                None => format!(r#"<enter id="{}" position="{}"/>"#, IDS[id], POSITIONS[pos]),
            }
        }),
        (0..3usize).prop_map(|id| format!(r#"<exit id="{}"/>"#, IDS[id])),
        (0..3usize, proptest::option::of(0..3usize)).prop_map(|(id, expr)| match expr {
            Some(e) => format!(
                r#"<dialogue from="{}" expression="{}">Line</dialogue>"#,
                IDS[id], EXPRESSIONS[e]
            ),
            None => format!(r#"<dialogue from="{}">Line</dialogue>"#, IDS[id]),
        }),
        Just("<narrate>Wind.</narrate>".to_owned()),
        Just(r#"<pause for="0.5"/>"#.to_owned()),
    ]
}

fn conversation() -> impl Strategy<Value = Vec<Vec<String>>> {
    proptest::collection::vec(proptest::collection::vec(element(), 0..6), 1..5)
}

fn build_queue(messages: &[Vec<String>]) -> CommandQueue {
    let mut queue = CommandQueue::new();
    let mut shadow = SceneState::default();
    for elements in messages {
        let message = Message {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: elements.concat(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        };
        let compiled = compile_message(&message, &mut shadow, CompileOptions::default());
        queue.append(message.id, compiled.commands);
    }
    queue
}

proptest! {
    #[test]
    fn test_revert_undoes_apply_for_every_command(messages in conversation()) {
        let queue = build_queue(&messages);
        let mut state = SceneState::default();
        for command in queue.commands() {
            let before = state.clone();
            command.apply(&mut state);
            let mut undone = state.clone();
            command.revert(&mut undone);
            prop_assert_eq!(undone, before);
        }
    }

    #[test]
    fn test_retreat_then_advance_matches_straight_replay(
        messages in conversation(),
        picks in (any::<prop::sample::Index>(), any::<prop::sample::Index>()),
    ) {
        let queue = build_queue(&messages);
        prop_assume!(!queue.is_empty());
        let i = picks.0.index(queue.len());
        let j = picks.1.index(i + 1);

        let mut state = SceneState::default();
        for command in &queue.commands()[..=i] {
            command.apply(&mut state);
        }
        prop_assert_eq!(&state, &queue.replay(Some(i)));

        // Retreat to just before j, then advance again through i.
        for command in queue.commands()[j..=i].iter().rev() {
            command.revert(&mut state);
        }
        let expected_before_j = if j == 0 { SceneState::default() } else { queue.replay(Some(j - 1)) };
        prop_assert_eq!(&state, &expected_before_j);
        for command in &queue.commands()[j..=i] {
            command.apply(&mut state);
        }
        prop_assert_eq!(state, queue.replay(Some(i)));
    }
}
