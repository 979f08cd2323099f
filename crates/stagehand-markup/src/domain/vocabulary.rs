//! The fixed set of recognized element and attribute names.

/// Name of the synthetic root produced by the parser. Never valid in input.
pub const ROOT: &str = "#root";

/// Transparent grouping element; its children are treated as top-level.
pub const SCENE: &str = "scene";
/// Sets the stage background.
pub const BACKGROUND: &str = "background";
/// Places a character on stage.
pub const ENTER: &str = "enter";
/// Removes a character from stage.
pub const EXIT: &str = "exit";
/// A line spoken by a character.
pub const DIALOGUE: &str = "dialogue";
/// Narration without a speaker.
pub const NARRATE: &str = "narrate";
/// A choice presented to the user.
pub const PROMPT: &str = "prompt";
/// Prompt description, inside `prompt`.
pub const INFO: &str = "info";
/// One option, inside `prompt`.
pub const CHOICE: &str = "choice";
/// Timed pause, top-level or inline inside text.
pub const PAUSE: &str = "pause";
/// Shows an illustration.
pub const IMAGE: &str = "image";
/// Synonym for `image`.
pub const SHOW: &str = "show";
/// Inline character reference.
pub const REF: &str = "ref";
/// Inline emphasis.
pub const EM: &str = "em";
/// Inline strong emphasis.
pub const STRONG: &str = "strong";

/// Every element name the interpreter recognizes.
pub const ELEMENTS: &[&str] = &[
    SCENE, BACKGROUND, ENTER, EXIT, DIALOGUE, NARRATE, PROMPT, INFO, CHOICE, PAUSE, IMAGE, SHOW,
    REF, EM, STRONG,
];

/// Attribute names.
pub mod attr {
    /// Character identifier on `enter`, `exit`, `ref`.
    pub const ID: &str = "id";
    /// Sprite expression on `enter`, `dialogue`.
    pub const EXPRESSION: &str = "expression";
    /// Stage slot on `enter`.
    pub const POSITION: &str = "position";
    /// Asset reference on `background`, `image`.
    pub const SRC: &str = "src";
    /// Speaker on `dialogue`, owner on `image`.
    pub const FROM: &str = "from";
    /// Pause length in seconds.
    pub const FOR: &str = "for";
}

/// Returns `true` if `name` is a recognized element name.
#[must_use]
pub fn is_known(name: &str) -> bool {
    ELEMENTS.contains(&name)
}
