use serde::Serialize;

/// Shown while the bot "thinks".
pub const THINKING: &str = ":thinking_face:";

/// Frames shown between the placeholder and the drumroll, in order.
pub const WIND_UP_FRAMES: [&str; 5] = [
    ":grin:",
    ":point_left:",
    ":point_right:",
    ":point_left:",
    ":bulb:",
];

/// Sent when nobody in the channel can be blamed.
pub const FALLBACK_TEXT: &str = "Of course it is your fault.";

const DRUMROLL_TEXT: &str = "*It's … :drum_with_drumsticks:*";
const HIDDEN_AVATAR: &str = ":question:";
const POINT_RIGHT: &str = ":point_right::point_right:";
const POINT_LEFT: &str = ":point_left::point_left:";

/// Content of one animation frame.
#[derive(Debug, Clone, PartialEq)]
pub enum BlameMessage {
    /// Plain text rendered in a single section block
    Plain(String),
    /// Markdown text without blocks
    Markdown(String),
    /// Block Kit layout with its notification fallback text
    Layout { text: String, blocks: Vec<Block> },
}

impl BlameMessage {
    pub fn plain(text: impl Into<String>) -> Self {
        Self::Plain(text.into())
    }

    /// Text used for notifications and clients that cannot render blocks
    pub fn text(&self) -> &str {
        match self {
            Self::Plain(text) | Self::Markdown(text) => text,
            Self::Layout { text, .. } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section {
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<Element>,
        #[serde(skip_serializing_if = "Option::is_none")]
        fields: Option<Vec<Element>>,
    },
    Context {
        elements: Vec<Element>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    PlainText {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        emoji: Option<bool>,
    },
    Mrkdwn {
        text: String,
    },
    Image {
        image_url: String,
        alt_text: String,
    },
}

impl Element {
    fn plain(text: &str) -> Self {
        Self::PlainText {
            text: text.to_string(),
            emoji: None,
        }
    }

    fn emoji(text: &str) -> Self {
        Self::PlainText {
            text: text.to_string(),
            emoji: Some(true),
        }
    }
}

/// The two final frames of the animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Drumroll,
    Reveal,
}

/// Suffix that turns `name` into its possessive form.
pub fn possessive_suffix(name: &str) -> &'static str {
    if name.ends_with('s') {
        "'"
    } else {
        "'s"
    }
}

/// "Chris" becomes "Chris'", "Ana" becomes "Ana's".
pub fn possessive(name: &str) -> String {
    format!("{}{}", name, possessive_suffix(name))
}

/// Render the drumroll or reveal frame for the blamed user.
///
/// Users with an avatar get a Block Kit layout with the avatar between two
/// pairs of pointing fingers; everyone else gets plain emphasized text.
pub fn final_blame_message(
    user_id: &str,
    name: &str,
    avatar: Option<&str>,
    phase: Phase,
) -> BlameMessage {
    let text = match phase {
        Phase::Drumroll => DRUMROLL_TEXT.to_string(),
        Phase::Reveal => format!("*It's <@{}>{} fault!*", user_id, possessive_suffix(name)),
    };

    let Some(avatar) = avatar else {
        return BlameMessage::Markdown(format!("*{}*", text));
    };

    let blamee = match phase {
        Phase::Drumroll => Element::emoji(HIDDEN_AVATAR),
        Phase::Reveal => Element::Image {
            image_url: avatar.to_string(),
            alt_text: "avatar".to_string(),
        },
    };

    BlameMessage::Layout {
        blocks: vec![
            Block::Section {
                text: None,
                fields: Some(vec![Element::Mrkdwn { text: text.clone() }]),
            },
            Block::Context {
                elements: vec![
                    Element::emoji(POINT_RIGHT),
                    blamee,
                    Element::plain(" "),
                    Element::emoji(POINT_LEFT),
                ],
            },
        ],
        text,
    }
}

/// Section block carrying a plain text frame.
pub fn plain_section(text: &str) -> Block {
    Block::Section {
        text: Some(Element::plain(text)),
        fields: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_possessive() {
        assert_eq!(possessive("Chris"), "Chris'");
        assert_eq!(possessive("Ana"), "Ana's");
        assert_eq!(possessive(""), "'s");
    }

    #[test]
    fn test_possessive_is_case_sensitive() {
        assert_eq!(possessive("JAMES"), "JAMES's");
    }

    #[test]
    fn test_reveal_without_avatar_is_emphasized_text() {
        let msg = final_blame_message("U2", "Chris", None, Phase::Reveal);
        assert_eq!(msg, BlameMessage::Markdown("**It's <@U2>' fault!**".to_string()));
    }

    #[test]
    fn test_reveal_with_empty_name_is_well_formed() {
        let msg = final_blame_message("U2", "", None, Phase::Reveal);
        assert!(msg.text().ends_with("'s fault!**"));
    }

    #[test]
    fn test_reveal_with_avatar_is_layout() {
        let msg = final_blame_message("U3", "Ana", Some("https://img/48.png"), Phase::Reveal);
        let BlameMessage::Layout { text, blocks } = msg else {
            panic!("expected layout");
        };
        assert_eq!(text, "*It's <@U3>'s fault!*");
        assert_eq!(
            serde_json::to_value(&blocks).unwrap(),
            json!([
                {
                    "type": "section",
                    "fields": [{ "type": "mrkdwn", "text": "*It's <@U3>'s fault!*" }]
                },
                {
                    "type": "context",
                    "elements": [
                        { "type": "plain_text", "text": ":point_right::point_right:", "emoji": true },
                        { "type": "image", "image_url": "https://img/48.png", "alt_text": "avatar" },
                        { "type": "plain_text", "text": " " },
                        { "type": "plain_text", "text": ":point_left::point_left:", "emoji": true }
                    ]
                }
            ])
        );
    }

    #[test]
    fn test_drumroll_hides_avatar() {
        let msg = final_blame_message("U3", "Ana", Some("https://img/48.png"), Phase::Drumroll);
        let BlameMessage::Layout { text, blocks } = msg else {
            panic!("expected layout");
        };
        assert!(!text.contains("U3"));
        let Block::Context { elements } = &blocks[1] else {
            panic!("expected context block");
        };
        assert_eq!(elements[1], Element::emoji(":question:"));
    }

    #[test]
    fn test_plain_section_serialization() {
        assert_eq!(
            serde_json::to_value(plain_section(":grin:")).unwrap(),
            json!({ "type": "section", "text": { "type": "plain_text", "text": ":grin:" } })
        );
    }
}
