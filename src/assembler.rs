//! Builds the turn lists sent to the completion provider.
//!
//! Both builders are pure: the same input always yields the same turns in the
//! same order.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::model::{ContentBlock, ImageUrl, Message};

pub const CRITIC_INSTRUCTIONS: &str = "You are a critical art critic AI that rates drawings and analyzes character battles. Your role is to:

1. When analyzing a single drawing:
   - Rate it from 1-10 based on:
     - Creativity and originality (25%)
     - Technical skill and effort (25%)
     - Attention to detail (25%)
     - Overall composition and appeal (25%)
   - Provide constructive feedback explaining your rating
   - Include what was done well, what could be improved, and specific suggestions

2. When comparing two drawings (stick figures or characters):
   - Analyze each character's:
     - Physical attributes (size, strength, weapons)
     - Fighting style and stance
     - Special abilities or advantages
     - Potential weaknesses
   - Determine the winner based on:
     - Combat capabilities
     - Strategic advantages
     - Fighting experience implied by their pose/stance
   - Provide a detailed explanation of why one would win
   - Include a fun, creative description of how the fight would play out

3. If no drawing is provided, ask the user to draw something specific and interesting.

Remember: Be critical but constructive. Don't inflate scores - a 5/10 should be average effort, and 8-10 should be reserved for truly exceptional work.";

pub const CRITIC_GREETING: &str = "Hi! I'm an AI that loves to rate drawings and analyze character battles! Draw something for me and I'll give you a rating from 1-10. Or draw two characters and I'll tell you who would win in a fight!";

const IMAGE_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// Base64 image data with any data-URI header already removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    data: String,
}

impl ImagePayload {
    /// Accepts either a full data URI or bare base64. Everything up to and
    /// including the first comma is treated as metadata and dropped.
    /// Returns `None` for empty input.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }

        let data = match raw.split_once(',') {
            Some((_, data)) => data,
            None => raw,
        };
        Some(Self {
            data: data.to_string(),
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: STANDARD.encode(bytes),
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    /// Always labelled PNG; the payload is never sniffed.
    pub fn data_uri(&self) -> String {
        format!("{IMAGE_DATA_URI_PREFIX}{}", self.data)
    }
}

pub fn critic_turns(text: &str, image: Option<&ImagePayload>) -> Vec<Message> {
    let user = match image {
        Some(image) => Message::user_blocks(vec![
            ContentBlock::Text {
                text: text.to_string(),
            },
            ContentBlock::ImageUrl {
                image_url: ImageUrl {
                    url: image.data_uri(),
                },
            },
        ]),
        None => Message::user(text),
    };

    vec![
        Message::system(CRITIC_INSTRUCTIONS),
        Message::assistant(CRITIC_GREETING),
        user,
    ]
}

pub fn console_turns(system_prompt: &str, text: &str) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if !system_prompt.trim().is_empty() {
        messages.push(Message::system(system_prompt));
    }
    messages.push(Message::user(text));
    messages
}
