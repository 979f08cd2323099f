//! Script compiler.
//!
//! Walks a sanitized content tree and emits one stage command per top-level
//! element. The compiler works against a shadow copy of the scene state so it
//! can snapshot "previous" values for revert; the live state is only ever
//! touched by playback.

use std::time::Duration;

use serde::Serialize;
use stagehand_core::message::{Message, Role};
use stagehand_markup::domain::vocabulary::{self as tags, attr};
use stagehand_markup::{Element, Node, Sanitized, sanitize, sanitize_truncated};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::domain::commands::{ExpressionChange, StageCommand};
use crate::domain::scene::{CharacterOnStage, Position, SceneState};

/// Text of the marker appended to a stream stopped before completion.
pub const GENERATION_STOPPED: &str = "generation stopped";

/// Tunables the compiler needs from playback configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    /// Pause length used when `for` is missing or unreadable.
    pub default_pause: Duration,
    /// Upper bound for any pause.
    pub max_pause: Duration,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            default_pause: Duration::from_secs(1),
            max_pause: Duration::from_secs(10),
        }
    }
}

/// A message that could not be staged and must be shown as plain text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainMessage {
    /// Source message.
    pub message_id: Uuid,
    /// Escaped message text.
    pub escaped_text: String,
    /// Parse error detail.
    pub error: String,
}

/// Compilation result for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMessage {
    /// Source message.
    pub message_id: Uuid,
    /// Commands in document order.
    pub commands: Vec<StageCommand>,
    /// Set when the markup degraded to plain text.
    pub plain: Option<PlainMessage>,
    /// Whether tag repair was needed.
    pub repaired: bool,
}

/// Compiles one chat message. Only assistant messages carry scene markup;
/// everything else compiles to zero commands.
#[instrument(skip(message, shadow), fields(message_id = %message.id))]
pub fn compile_message(
    message: &Message,
    shadow: &mut SceneState,
    options: CompileOptions,
) -> CompiledMessage {
    if message.role != Role::Assistant {
        return CompiledMessage {
            message_id: message.id,
            commands: Vec::new(),
            plain: None,
            repaired: false,
        };
    }
    compile_outcome(message.id, sanitize(&message.content), shadow, options, false)
}

/// Compiles the text of a stream that ended, optionally cut off early. A
/// stopped stream is recovered as truncated markup and gets a trailing
/// "generation stopped" narration.
#[instrument(skip(text, shadow))]
pub fn compile_stream(
    message_id: Uuid,
    text: &str,
    stopped: bool,
    shadow: &mut SceneState,
    options: CompileOptions,
) -> CompiledMessage {
    let outcome = if stopped {
        sanitize_truncated(text)
    } else {
        sanitize(text)
    };
    compile_outcome(message_id, outcome, shadow, options, stopped)
}

fn compile_outcome(
    message_id: Uuid,
    outcome: Sanitized,
    shadow: &mut SceneState,
    options: CompileOptions,
    stopped: bool,
) -> CompiledMessage {
    match outcome {
        Sanitized::Scene { root, repaired } => {
            let mut commands = compile_scene(&root, shadow, options);
            if stopped {
                commands.push(stopped_marker());
            }
            debug!(commands = commands.len(), repaired, "compiled message");
            CompiledMessage {
                message_id,
                commands,
                plain: None,
                repaired,
            }
        }
        Sanitized::Degraded {
            mut escaped_text,
            error,
        } => {
            if stopped {
                escaped_text.push_str("\n(");
                escaped_text.push_str(GENERATION_STOPPED);
                escaped_text.push(')');
            }
            CompiledMessage {
                message_id,
                commands: Vec::new(),
                plain: Some(PlainMessage {
                    message_id,
                    escaped_text,
                    error,
                }),
                repaired: false,
            }
        }
    }
}

fn stopped_marker() -> StageCommand {
    StageCommand::Narrate {
        content: vec![Node::Element(
            Element::new(tags::EM).with_child(Node::Text(GENERATION_STOPPED.to_owned())),
        )],
    }
}

/// Compiles the top-level elements of `root`, applying each emitted command
/// to `shadow`. `scene` elements are transparent.
pub fn compile_scene(
    root: &Element,
    shadow: &mut SceneState,
    options: CompileOptions,
) -> Vec<StageCommand> {
    let mut commands = Vec::new();
    compile_children(root, shadow, options, &mut commands);
    commands
}

fn compile_children(
    parent: &Element,
    shadow: &mut SceneState,
    options: CompileOptions,
    out: &mut Vec<StageCommand>,
) {
    for child in &parent.children {
        let element = match child {
            Node::Element(element) => element,
            Node::Text(text) => {
                if !text.trim().is_empty() {
                    debug!("skipping loose text between stage elements");
                }
                continue;
            }
        };
        if element.name == tags::SCENE {
            compile_children(element, shadow, options, out);
            continue;
        }
        if let Some(command) = compile_element(element, shadow, options) {
            command.apply(shadow);
            out.push(command);
        }
    }
}

fn compile_element(
    element: &Element,
    shadow: &SceneState,
    options: CompileOptions,
) -> Option<StageCommand> {
    match element.name.as_str() {
        tags::BACKGROUND => {
            let src = required(element, attr::SRC)?;
            Some(StageCommand::Background {
                src,
                previous: shadow.background.clone(),
            })
        }
        tags::ENTER => {
            let id = required(element, attr::ID)?;
            Some(StageCommand::Enter {
                replaced: shadow.character(&id).cloned(),
                character: CharacterOnStage {
                    expression: element.attr(attr::EXPRESSION).map(str::to_owned),
                    position: Position::from_attr(element.attr(attr::POSITION)),
                    id,
                },
            })
        }
        tags::EXIT => {
            let id = required(element, attr::ID)?;
            Some(StageCommand::Exit {
                removed: shadow.character(&id).cloned(),
                id,
            })
        }
        tags::DIALOGUE => {
            let content = trimmed_content(&element.children);
            let Some(speaker) = element.attr(attr::FROM) else {
                warn!("dialogue without speaker compiled as narration");
                return Some(StageCommand::Narrate { content });
            };
            let change = element.attr(attr::EXPRESSION).and_then(|to| {
                shadow.character(speaker).map(|character| ExpressionChange {
                    to: to.to_owned(),
                    from: character.expression.clone(),
                })
            });
            Some(StageCommand::Dialogue {
                speaker: speaker.to_owned(),
                change,
                content,
            })
        }
        tags::NARRATE => Some(StageCommand::Narrate {
            content: trimmed_content(&element.children),
        }),
        tags::PROMPT => compile_prompt(element),
        tags::PAUSE => Some(StageCommand::Pause {
            duration: pause_duration(element, options),
        }),
        tags::IMAGE | tags::SHOW => {
            let src = required(element, attr::SRC)?;
            Some(StageCommand::ShowImage {
                src,
                from: element.attr(attr::FROM).map(str::to_owned),
            })
        }
        other => {
            debug!(element = other, "skipping element with no stage command");
            None
        }
    }
}

fn compile_prompt(element: &Element) -> Option<StageCommand> {
    let info = element
        .child_elements()
        .find(|child| child.name == tags::INFO)
        .map(|child| child.text().trim().to_owned())
        .unwrap_or_default();
    let choices: Vec<String> = element
        .child_elements()
        .filter(|child| child.name == tags::CHOICE)
        .map(|child| child.text().trim().to_owned())
        .filter(|text| !text.is_empty())
        .collect();
    if choices.is_empty() {
        warn!("prompt without choices skipped");
        return None;
    }
    Some(StageCommand::Prompt { info, choices })
}

fn required(element: &Element, name: &str) -> Option<String> {
    let value = element.attr(name).map(str::to_owned);
    if value.is_none() {
        warn!(
            element = %element.name,
            attribute = name,
            "element missing required attribute skipped"
        );
    }
    value
}

/// Reads `for` as seconds, clamped to the configured maximum.
#[must_use]
pub fn pause_duration(element: &Element, options: CompileOptions) -> Duration {
    let parsed = element
        .attr(attr::FOR)
        .map(|raw| raw.trim_end_matches('s').trim())
        .and_then(|raw| raw.parse::<f64>().ok())
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok());
    match parsed {
        Some(duration) => duration.min(options.max_pause),
        None => {
            debug!("pause without readable duration uses default");
            options.default_pause
        }
    }
}

/// Drops leading whitespace of the first text node and trailing whitespace of
/// the last one, so reveal does not start or end on blank characters.
fn trimmed_content(children: &[Node]) -> Vec<Node> {
    let mut content = children.to_vec();
    if let Some(Node::Text(first)) = content.first_mut() {
        *first = first.trim_start().to_owned();
    }
    if let Some(Node::Text(last)) = content.last_mut() {
        *last = last.trim_end().to_owned();
    }
    content.retain(|node| !matches!(node, Node::Text(text) if text.is_empty()));
    content
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use stagehand_markup::application::parser::{Strictness, parse_fragment};

    use super::*;

    fn assistant(content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: content.to_owned(),
            timestamp: Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap(),
        }
    }

    fn compile(content: &str, shadow: &mut SceneState) -> CompiledMessage {
        compile_message(&assistant(content), shadow, CompileOptions::default())
    }

    #[test]
    fn test_scenario_a_compiles_three_commands() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile(
            r#"<scene><background src="forest.png"/><enter id="kai" position="left"/><dialogue from="kai">Hello</dialogue></scene>"#,
            &mut shadow,
        );

        // Assert
        assert_eq!(compiled.commands.len(), 3);
        assert!(compiled.plain.is_none());
        assert_eq!(compiled.commands[0].command_type(), "stage.background");
        assert_eq!(compiled.commands[1].command_type(), "stage.enter");
        match &compiled.commands[2] {
            StageCommand::Dialogue {
                speaker, content, ..
            } => {
                assert_eq!(speaker, "kai");
                assert_eq!(content, &vec![Node::Text("Hello".to_owned())]);
            }
            other => panic!("expected Dialogue, got {other:?}"),
        }
        assert_eq!(shadow.background.as_deref(), Some("forest.png"));
        assert_eq!(shadow.character("kai").unwrap().position, Position::Left);
    }

    #[test]
    fn test_scenario_b_repaired_typo_compiles() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile(r#"<dialoge from="kai">Hi</dialoge>"#, &mut shadow);

        // Assert
        assert!(compiled.repaired);
        assert_eq!(compiled.commands.len(), 1);
        assert_eq!(compiled.commands[0].command_type(), "stage.dialogue");
    }

    #[test]
    fn test_scenario_c_prompt_is_single_wait_point() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile(
            "<prompt><info>Pick one</info><choice>Fight</choice><choice>Flee</choice></prompt>",
            &mut shadow,
        );

        // Assert
        assert_eq!(compiled.commands.len(), 1);
        let prompt = &compiled.commands[0];
        assert!(prompt.is_wait_point());
        assert_eq!(
            prompt,
            &StageCommand::Prompt {
                info: "Pick one".to_owned(),
                choices: vec!["Fight".to_owned(), "Flee".to_owned()],
            }
        );
        assert_eq!(shadow, SceneState::default());
    }

    #[test]
    fn test_scenario_d_empty_input_compiles_to_nothing() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile("", &mut shadow);

        // Assert
        assert!(compiled.commands.is_empty());
        assert!(compiled.plain.is_none());
    }

    #[test]
    fn test_exit_snapshots_record_from_earlier_message() {
        // Arrange
        let mut shadow = SceneState::default();
        compile(r#"<enter id="kai" expression="smile" position="right"/>"#, &mut shadow);

        // Act
        let compiled = compile(r#"<exit id="kai"/>"#, &mut shadow);

        // Assert
        match &compiled.commands[0] {
            StageCommand::Exit { id, removed } => {
                assert_eq!(id, "kai");
                let removed = removed.as_ref().unwrap();
                assert_eq!(removed.expression.as_deref(), Some("smile"));
                assert_eq!(removed.position, Position::Right);
            }
            other => panic!("expected Exit, got {other:?}"),
        }
        assert!(shadow.character("kai").is_none());
    }

    #[test]
    fn test_dialogue_expression_snapshot_only_when_speaker_on_stage() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile(
            r#"<dialogue from="mira" expression="sad">Alone.</dialogue><enter id="kai" expression="calm"/><dialogue from="kai" expression="angry">No!</dialogue>"#,
            &mut shadow,
        );

        // Assert
        assert!(matches!(
            &compiled.commands[0],
            StageCommand::Dialogue { change: None, .. }
        ));
        assert!(matches!(
            &compiled.commands[2],
            StageCommand::Dialogue { change: Some(ExpressionChange { to, from }), .. }
                if to == "angry" && from.as_deref() == Some("calm")
        ));
        assert_eq!(
            shadow.character("kai").unwrap().expression.as_deref(),
            Some("angry")
        );
    }

    #[test]
    fn test_dialogue_keeps_inline_structure() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile(
            r#"<dialogue from="kai">  Have you met <ref id="mira">Mira</ref>? She is <em>fast</em>.  </dialogue>"#,
            &mut shadow,
        );

        // Assert
        let StageCommand::Dialogue { content, .. } = &compiled.commands[0] else {
            panic!("expected Dialogue");
        };
        assert_eq!(content.len(), 5);
        assert_eq!(content[0], Node::Text("Have you met ".to_owned()));
        assert!(matches!(&content[1], Node::Element(el) if el.name == "ref" && el.attr("id") == Some("mira")));
        assert_eq!(content[4], Node::Text(".".to_owned()));
    }

    #[test]
    fn test_unknown_and_incomplete_elements_are_skipped() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile(
            r#"<soundtrack src="a.ogg"/><background/><enter/><prompt><info>?</info></prompt><narrate>Still here.</narrate>"#,
            &mut shadow,
        );

        // Assert
        assert_eq!(compiled.commands.len(), 1);
        assert_eq!(compiled.commands[0].command_type(), "stage.narrate");
    }

    #[test]
    fn test_dialogue_without_speaker_becomes_narration() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile("<dialogue>Who said that?</dialogue>", &mut shadow);

        // Assert
        assert_eq!(compiled.commands[0].command_type(), "stage.narrate");
    }

    #[test]
    fn test_show_is_synonym_for_image() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile(r#"<show src="letter.png" from="kai"/>"#, &mut shadow);

        // Assert
        assert_eq!(
            compiled.commands[0],
            StageCommand::ShowImage {
                src: "letter.png".to_owned(),
                from: Some("kai".to_owned()),
            }
        );
    }

    #[test]
    fn test_pause_duration_parsing() {
        let options = CompileOptions::default();
        let pause = |markup: &str| {
            let root = parse_fragment(markup, Strictness::Vocabulary).unwrap();
            let element = root.child_elements().next().unwrap().clone();
            pause_duration(&element, options)
        };

        assert_eq!(pause(r#"<pause for="1.5"/>"#), Duration::from_millis(1500));
        assert_eq!(pause(r#"<pause for="2s"/>"#), Duration::from_secs(2));
        assert_eq!(pause(r#"<pause for="soon"/>"#), options.default_pause);
        assert_eq!(pause(r#"<pause for="-1"/>"#), options.default_pause);
        assert_eq!(pause("<pause/>"), options.default_pause);
        assert_eq!(pause(r#"<pause for="600"/>"#), options.max_pause);
    }

    #[test]
    fn test_degraded_markup_yields_plain_message_and_no_commands() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile("<narrate>Broken <em>nest</narrate></em>", &mut shadow);

        // Assert
        assert!(compiled.commands.is_empty());
        let plain = compiled.plain.unwrap();
        assert_eq!(plain.message_id, compiled.message_id);
        assert!(plain.escaped_text.contains("&lt;em&gt;"));
        assert_eq!(shadow, SceneState::default());
    }

    #[test]
    fn test_user_messages_compile_to_nothing() {
        // Arrange
        let mut shadow = SceneState::default();
        let message = Message {
            role: Role::User,
            ..assistant(r#"<background src="x.png"/>"#)
        };

        // Act
        let compiled = compile_message(&message, &mut shadow, CompileOptions::default());

        // Assert
        assert!(compiled.commands.is_empty());
        assert!(compiled.plain.is_none());
    }

    #[test]
    fn test_stopped_stream_appends_marker_narration() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile_stream(
            Uuid::new_v4(),
            r#"<enter id="kai"/><dialogue from="kai">I was about to say"#,
            true,
            &mut shadow,
            CompileOptions::default(),
        );

        // Assert
        assert_eq!(compiled.commands.len(), 3);
        let StageCommand::Narrate { content } = &compiled.commands[2] else {
            panic!("expected stopped marker");
        };
        assert!(matches!(&content[0], Node::Element(el) if el.text() == GENERATION_STOPPED));
    }

    #[test]
    fn test_stopped_stream_that_degrades_is_annotated() {
        // Arrange
        let mut shadow = SceneState::default();

        // Act
        let compiled = compile_stream(
            Uuid::new_v4(),
            "just prose, no tags",
            true,
            &mut shadow,
            CompileOptions::default(),
        );

        // Assert
        assert!(compiled.commands.is_empty());
        assert!(compiled.plain.unwrap().escaped_text.ends_with("(generation stopped)"));
    }
}
