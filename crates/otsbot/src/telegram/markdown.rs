//! MarkdownV2 escaping and sending

use teloxide::prelude::*;
use teloxide::types::{ParseMode, ReplyMarkup};
use teloxide::RequestError;

/// Escapes every character MarkdownV2 treats as markup.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(
            c,
            '\\' | '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-' | '=' | '|' | '{' | '}' | '.' | '!'
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Bold, with the content escaped.
pub fn bold(text: &str) -> String {
    format!("*{}*", escape_markdown_v2(text))
}

/// Inline code. Only `` ` `` and `\` need escaping inside.
pub fn code(text: &str) -> String {
    format!("`{}`", text.replace('\\', "\\\\").replace('`', "\\`"))
}

fn is_markdown_parse_error(err: &RequestError) -> bool {
    err.to_string().to_lowercase().contains("can't parse entities")
}

/// Send a MarkdownV2 message and auto-escape on parse errors.
pub async fn send_message_markdown_v2(
    bot: &Bot,
    chat_id: ChatId,
    text: impl Into<String>,
    markup: Option<ReplyMarkup>,
) -> ResponseResult<Message> {
    let raw_text = text.into();
    let mut req = bot
        .send_message(chat_id, raw_text.clone())
        .parse_mode(ParseMode::MarkdownV2);
    if let Some(kb) = markup.clone() {
        req = req.reply_markup(kb);
    }

    match req.await {
        Ok(msg) => Ok(msg),
        Err(e) if is_markdown_parse_error(&e) => {
            log::warn!("MarkdownV2 rejected for chat {}, resending escaped", chat_id);
            let escaped = escape_markdown_v2(&raw_text);
            let mut retry = bot.send_message(chat_id, escaped).parse_mode(ParseMode::MarkdownV2);
            if let Some(kb) = markup {
                retry = retry.reply_markup(kb);
            }
            retry.await
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_markdown_v2() {
        assert_eq!(escape_markdown_v2("99.50 ETB (fee)!"), "99\\.50 ETB \\(fee\\)\\!");
        assert_eq!(escape_markdown_v2("+251-911"), "\\+251\\-911");
        assert_eq!(escape_markdown_v2("plain text"), "plain text");
    }

    #[test]
    fn test_bold_and_code() {
        assert_eq!(bold("A_B"), "*A\\_B*");
        assert_eq!(code("tx-1-2"), "`tx-1-2`");
        assert_eq!(code("a`b"), "`a\\`b`");
    }
}
