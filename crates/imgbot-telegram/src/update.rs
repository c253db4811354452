use teloxide::types::{Message, MessageEntityKind, Update, UpdateKind};

use imgbot_core::{
    domain::{ChatId, UserId},
    messaging::types::IncomingUpdate,
};

/// Convert a webhook update into a core update.
///
/// Only new text messages matter; edits, media, callbacks and the rest map to
/// `None`. A message is a command only when Telegram marked it with a
/// `bot_command` entity at offset 0. Commands addressed to another bot
/// (`/start@OtherBot`) also map to `None`. With no known `bot_username`
/// every `@` suffix is accepted.
pub fn to_incoming(update: &Update, bot_username: Option<&str>) -> Option<IncomingUpdate> {
    let UpdateKind::Message(msg) = &update.kind else {
        return None;
    };
    let text = msg.text()?;

    let chat_id = ChatId(msg.chat.id.0);
    // Channel posts carry no sender; the chat stands in for the user.
    let user_id = msg
        .from()
        .map(|u| UserId(u.id.0 as i64))
        .unwrap_or(UserId(chat_id.0));

    let Some(len) = leading_command_len(msg) else {
        return Some(IncomingUpdate::text(chat_id, user_id, text));
    };

    let command = utf16_prefix(text, len);
    let args = text[command.len()..].trim();
    let (name, target) = match command.trim_start_matches('/').split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (command.trim_start_matches('/'), None),
    };

    if let (Some(target), Some(me)) = (target, bot_username) {
        if !target.eq_ignore_ascii_case(me) {
            return None;
        }
    }

    Some(IncomingUpdate::command(chat_id, user_id, name, args))
}

fn leading_command_len(msg: &Message) -> Option<usize> {
    msg.entities()?
        .iter()
        .find(|e| e.offset == 0 && matches!(e.kind, MessageEntityKind::BotCommand))
        .map(|e| e.length)
}

/// Entity offsets and lengths count UTF-16 code units.
fn utf16_prefix(text: &str, units: usize) -> &str {
    let mut used = 0;
    for (idx, c) in text.char_indices() {
        if used >= units {
            return &text[..idx];
        }
        used += c.len_utf16();
    }
    text
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const ME: Option<&str> = Some("ImgBot");

    /// Parse from a string, the way the webhook body arrives.
    fn parse(update: serde_json::Value) -> Update {
        serde_json::from_str(&update.to_string()).unwrap()
    }

    fn message_update(content: serde_json::Value) -> Update {
        let mut message = json!({
            "message_id": 5,
            "date": 1_700_000_000,
            "chat": { "id": 555, "type": "private", "first_name": "Ana" },
            "from": { "id": 777, "is_bot": false, "first_name": "Ana" },
        });
        if let (Some(msg), Some(extra)) = (message.as_object_mut(), content.as_object()) {
            msg.extend(extra.clone());
        }
        let upd = parse(json!({ "update_id": 1, "message": message }));
        assert!(
            matches!(upd.kind, UpdateKind::Message(_)),
            "fixture did not parse as a message: {:?}",
            upd.kind
        );
        upd
    }

    fn command_update(text: &str, entity_len: usize) -> Update {
        message_update(json!({
            "text": text,
            "entities": [{ "type": "bot_command", "offset": 0, "length": entity_len }]
        }))
    }

    fn text_update(text: &str) -> Update {
        message_update(json!({ "text": text }))
    }

    fn prompt(text: &str) -> Option<IncomingUpdate> {
        Some(IncomingUpdate::text(ChatId(555), UserId(777), text))
    }

    #[test]
    fn text_message_becomes_prompt() {
        let upd = text_update("A cat in a spaceship");
        assert_eq!(to_incoming(&upd, ME), prompt("A cat in a spaceship"));
    }

    #[test]
    fn start_becomes_command() {
        let upd = command_update("/start", 6);
        assert_eq!(
            to_incoming(&upd, ME),
            Some(IncomingUpdate::command(ChatId(555), UserId(777), "start", ""))
        );
    }

    #[test]
    fn command_addressed_to_this_bot_keeps_args() {
        let upd = command_update("/start@imgbot hello there", 13);
        assert_eq!(
            to_incoming(&upd, ME),
            Some(IncomingUpdate::command(
                ChatId(555),
                UserId(777),
                "start",
                "hello there"
            ))
        );
    }

    #[test]
    fn command_addressed_to_another_bot_is_ignored() {
        let upd = command_update("/start@SomeOtherBot", 19);
        assert_eq!(to_incoming(&upd, ME), None);
    }

    #[test]
    fn any_target_is_accepted_without_known_username() {
        let upd = command_update("/start@SomeOtherBot", 19);
        let Some(IncomingUpdate::Command(cmd)) = to_incoming(&upd, None) else {
            panic!("expected command");
        };
        assert_eq!(cmd.name, "start");
    }

    #[test]
    fn slash_text_without_command_entity_is_a_prompt() {
        for text in ["//start", "/猫 terbang di luar angkasa", "/"] {
            let upd = text_update(text);
            assert_eq!(to_incoming(&upd, ME), prompt(text), "input {text:?}");
        }
    }

    #[test]
    fn command_entity_not_at_start_is_a_prompt() {
        let upd = message_update(json!({
            "text": "please /start",
            "entities": [{ "type": "bot_command", "offset": 7, "length": 6 }]
        }));
        assert_eq!(to_incoming(&upd, ME), prompt("please /start"));
    }

    #[test]
    fn photo_message_is_ignored() {
        let upd = message_update(json!({
            "photo": [{ "file_id": "AgAD", "file_unique_id": "AQAD", "width": 90, "height": 90 }]
        }));
        assert_eq!(to_incoming(&upd, ME), None);
    }

    #[test]
    fn edited_message_is_ignored() {
        let upd = parse(json!({
            "update_id": 2,
            "edited_message": {
                "message_id": 5,
                "date": 1_700_000_000,
                "edit_date": 1_700_000_100,
                "chat": { "id": 555, "type": "private", "first_name": "Ana" },
                "from": { "id": 777, "is_bot": false, "first_name": "Ana" },
                "text": "changed"
            }
        }));
        assert!(matches!(upd.kind, UpdateKind::EditedMessage(_)));
        assert_eq!(to_incoming(&upd, ME), None);
    }

    #[test]
    fn utf16_prefix_respects_surrogate_pairs() {
        assert_eq!(utf16_prefix("/start rest", 6), "/start");
        assert_eq!(utf16_prefix("\u{1F431}ab", 2), "\u{1F431}");
        assert_eq!(utf16_prefix("ab", 10), "ab");
    }
}
