//! Reply texts and inline keyboards (Telegram HTML).

use chrono::{DateTime, Local};

use hackchat_core::{
    domain::UserId,
    formatting::escape_html,
    messaging::types::{InlineButton, InlineKeyboard},
    relay::{Profile, RelayStats},
};

pub const STICKERS: [&str; 8] = ["😀", "😂", "😎", "🤖", "🚀", "💻", "🎮", "📱"];
const STICKERS_PER_ROW: usize = 4;

pub const HELP: &str = "🤖 <b>HackChat Bot commands:</b>\n\n\
/start - Start the bot\n\
/help - This help\n\
/chat - Open the shared chat\n\
/profile - Your profile\n\
/broadcast - Send to everyone (admin only)\n\
/stats - Statistics (admin only)\n\n\
📱 <b>How to use:</b>\n\
1. Send messages to the bot in private\n\
2. They are stored in the shared history\n\
3. Use the buttons to navigate\n\n\
💡 Stickers and voice messages are supported.";

pub const ADMIN_ONLY: &str = "❌ Admin only!";
pub const BROADCAST_USAGE: &str = "Usage: /broadcast &lt;message&gt;";

pub fn main_menu() -> InlineKeyboard {
    InlineKeyboard::column(vec![
        InlineButton::new("📱 My profile", "profile"),
        InlineButton::new("💬 Shared chat", "chat"),
        InlineButton::new("🎮 Stickers", "stickers"),
        InlineButton::new("🔧 Help", "help"),
    ])
}

pub fn sticker_menu() -> InlineKeyboard {
    let buttons = STICKERS
        .iter()
        .enumerate()
        .map(|(i, s)| InlineButton::new(*s, format!("sticker_{i}")))
        .collect();
    InlineKeyboard::grid(buttons, STICKERS_PER_ROW)
        .push_row(vec![InlineButton::new("« Back", "back")])
}

/// Emoji for a `sticker_<n>` callback, if `n` is in range.
pub fn sticker_choice(data: &str) -> Option<&'static str> {
    let idx = data.strip_prefix("sticker_")?.parse::<usize>().ok()?;
    STICKERS.get(idx).copied()
}

pub fn welcome(first_name: &str) -> String {
    format!(
        "🚀 <b>Welcome to HackChat, {}!</b>\n\n\
         A shared chat relayed through this bot.\n\n\
         ✨ <b>Features:</b>\n\
         • Shared chat with every user\n\
         • Stickers and voice messages\n\
         • Announcements from the admin\n\n\
         Choose an action:",
        escape_html(first_name)
    )
}

pub fn chat_info(audience: usize) -> String {
    format!(
        "💬 <b>Shared chat</b>\n\n\
         Send any message and it joins the shared history.\n\n\
         Users in chat: <b>{audience}</b>"
    )
}

pub fn format_joined(joined: Option<DateTime<Local>>) -> String {
    joined
        .map(|j| j.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "today".to_string())
}

/// Compact profile shown from the inline menu.
pub fn profile_summary(profile: &Profile) -> String {
    format!(
        "📊 <b>Your stats:</b>\n\nMessages: {}\nMember since: {}",
        profile.message_count,
        format_joined(profile.joined)
    )
}

pub struct ProfileCard<'a> {
    pub user_id: UserId,
    pub full_name: &'a str,
    pub username: Option<&'a str>,
    pub bot_username: &'a str,
}

pub fn profile_card(card: &ProfileCard<'_>, profile: &Profile) -> String {
    let mut out = format!(
        "📱 <b>Your profile:</b>\n\n\
         👤 Name: {}\n\
         🆔 ID: <code>{}</code>\n\
         📝 Username: @{}\n\
         📨 Messages sent: {}\n\
         📅 Member since: {}",
        escape_html(card.full_name),
        card.user_id,
        escape_html(card.username.unwrap_or("none")),
        profile.message_count,
        format_joined(profile.joined),
    );
    if !card.bot_username.is_empty() {
        out.push_str(&format!(
            "\n\n💡 <b>Your invite link:</b>\n<code>https://t.me/{}?start=ref{}</code>",
            card.bot_username, card.user_id
        ));
    }
    out
}

pub fn stats(stats: &RelayStats) -> String {
    let mut out = format!(
        "📊 <b>HackChat statistics:</b>\n\n\
         👥 Users: {}\n\
         📨 Total messages: {}\n\
         💾 Stored in history: {}\n\
         🆕 New today: {}\n\n\
         💡 <b>Top 5 users:</b>\n",
        stats.user_count, stats.total_messages, stats.stored_in_history, stats.new_today
    );
    for (i, (id, count)) in stats.top5.iter().enumerate() {
        out.push_str(&format!("{}. ID {id}: {count} messages\n", i + 1));
    }
    out
}

pub fn broadcast_done(succeeded: usize, failed: usize) -> String {
    if failed == 0 {
        return format!("✅ Message sent to {succeeded} users");
    }
    format!("✅ Message sent to {succeeded} users (⚠️ {failed} failed)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sticker_menu_is_a_grid_with_back_row() {
        let kb = sticker_menu();
        let lens: Vec<usize> = kb.rows.iter().map(|r| r.len()).collect();
        assert_eq!(lens, vec![4, 4, 1]);
        assert_eq!(kb.rows[1][3].callback_data, "sticker_7");
        assert_eq!(kb.rows[2][0].callback_data, "back");
    }

    #[test]
    fn sticker_choice_rejects_out_of_range() {
        assert_eq!(sticker_choice("sticker_0"), Some("😀"));
        assert_eq!(sticker_choice("sticker_7"), Some("📱"));
        assert_eq!(sticker_choice("sticker_8"), None);
        assert_eq!(sticker_choice("sticker_x"), None);
        assert_eq!(sticker_choice("profile"), None);
    }

    #[test]
    fn stats_lists_top_users_in_order() {
        let s = stats(&RelayStats {
            user_count: 2,
            total_messages: 12,
            stored_in_history: 12,
            new_today: 3,
            top5: vec![(UserId(7), 9), (UserId(3), 3)],
        });
        assert!(s.contains("👥 Users: 2"));
        assert!(s.contains("🆕 New today: 3"));
        let first = s.find("1. ID 7: 9 messages").unwrap();
        let second = s.find("2. ID 3: 3 messages").unwrap();
        assert!(first < second);
    }

    #[test]
    fn profile_card_escapes_and_links() {
        let card = ProfileCard {
            user_id: UserId(42),
            full_name: "<Ann>",
            username: None,
            bot_username: "hackchat_bot",
        };
        let out = profile_card(
            &card,
            &Profile {
                message_count: 3,
                joined: None,
            },
        );
        assert!(out.contains("&lt;Ann&gt;"));
        assert!(out.contains("@none"));
        assert!(out.contains("Member since: today"));
        assert!(out.contains("https://t.me/hackchat_bot?start=ref42"));
    }

    #[test]
    fn broadcast_summary_mentions_failures_only_when_present() {
        assert_eq!(broadcast_done(3, 0), "✅ Message sent to 3 users");
        assert!(broadcast_done(3, 2).contains("2 failed"));
    }
}
