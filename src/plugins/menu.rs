//! `menu` handler: paginated list of every command, grouped by tag
//!
//! Page buttons carry `menu_<n>` callback data; pressing one deletes the old
//! menu and sends the requested page in its place.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use serde::Deserialize;

use crate::application::errors::{HandlerResult, PluginError, PluginResult};
use crate::domain::entities::{ChatId, CommandSpec, User};
use crate::domain::traits::{Bot, KeyboardButton, SendOptions};
use crate::infrastructure::plugins::Generation;
use super::{CallbackContext, CallbackInterest, CommandHandler, InboundContext, PluginEnv};

const CALLBACK_PREFIX: &str = "menu_";
const NOOP: &str = "noop";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MenuSettings {
    /// Tag groups per page
    pub per_page: usize,
    /// Offset of the clock shown in the header
    pub utc_offset_hours: i32,
    pub footer: Vec<String>,
    pub website: Option<String>,
    pub website_label: String,
}

impl Default for MenuSettings {
    fn default() -> Self {
        Self {
            per_page: 10,
            utc_offset_hours: 7,
            footer: vec!["Bot active 24/7".to_string()],
            website: None,
            website_label: "Website".to_string(),
        }
    }
}

/// Commands sharing one tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagGroup {
    pub tag: String,
    /// One entry per plugin, e.g. `/start, /menu`
    pub entries: Vec<String>,
}

pub struct MenuHandler {
    spec: CommandSpec,
    settings: MenuSettings,
    owners: Vec<i64>,
    offset: FixedOffset,
}

impl MenuHandler {
    pub fn new(spec: CommandSpec, settings: MenuSettings, env: &PluginEnv) -> PluginResult<Self> {
        if settings.per_page == 0 {
            return Err(PluginError::InvalidHandler("menu `per-page` must be at least 1".to_string()));
        }
        let offset = FixedOffset::east_opt(settings.utc_offset_hours * 3600).ok_or_else(|| {
            PluginError::InvalidHandler(format!("invalid utc-offset-hours: {}", settings.utc_offset_hours))
        })?;

        Ok(Self {
            spec,
            settings,
            owners: env.owners.clone(),
            offset,
        })
    }

    fn total_pages(&self, groups: usize) -> usize {
        groups.div_ceil(self.settings.per_page).max(1)
    }

    pub fn render_text(
        &self,
        user: Option<&User>,
        now: DateTime<FixedOffset>,
        page: usize,
        groups: &[TagGroup],
    ) -> String {
        let total = self.total_pages(groups.len());
        let name = user
            .and_then(|u| u.first_name.clone())
            .unwrap_or_else(|| "User".to_string());
        let role = match user {
            Some(u) if self.owners.contains(&u.id) => "Owner",
            _ => "User",
        };

        let mut text = format!("Hello, {}!\n", name);
        text.push_str(&format!("Time: {}\n", now.format("%A, %d %B %Y %H:%M:%S")));
        text.push_str(&format!("Role: {}\n", role));
        text.push_str(&format!("Page: {}/{}\n\n", page, total));
        text.push_str("Bot commands:\n\n");

        let start = (page - 1) * self.settings.per_page;
        for group in groups.iter().skip(start).take(self.settings.per_page) {
            text.push_str(&group.tag);
            text.push('\n');
            for entry in &group.entries {
                text.push_str(&format!("- {}\n", entry));
            }
            text.push('\n');
        }

        text.push_str(&self.settings.footer.join("\n"));
        text
    }

    async fn send_page(
        &self,
        bot: &dyn Bot,
        chat_id: ChatId,
        user: Option<&User>,
        requested: usize,
        plugins: &Generation,
    ) -> HandlerResult {
        let groups = tag_groups(plugins);
        let total = self.total_pages(groups.len());
        let page = requested.clamp(1, total);

        let now = Utc::now().with_timezone(&self.offset);
        let text = self.render_text(user, now, page, &groups);

        let website = self
            .settings
            .website
            .as_deref()
            .map(|url| (self.settings.website_label.as_str(), url));
        let opts = SendOptions::default()
            .with_keyboard(pagination_keyboard(page, total, website))
            .without_preview();

        bot.send_message(chat_id, &text, opts).await?;
        Ok(())
    }
}

#[async_trait]
impl CommandHandler for MenuHandler {
    fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    async fn invoke(&self, ctx: InboundContext) -> HandlerResult {
        let page = ctx
            .args
            .split_whitespace()
            .next()
            .and_then(|p| p.parse::<usize>().ok())
            .unwrap_or(1);

        self.send_page(ctx.bot.as_ref(), ctx.chat_id(), ctx.message.from.as_ref(), page, &ctx.plugins)
            .await
    }

    fn callback_interest(&self) -> CallbackInterest {
        CallbackInterest::Prefix(CALLBACK_PREFIX.to_string())
    }

    async fn on_callback(&self, ctx: CallbackContext) -> HandlerResult {
        let Some(page) = ctx.query.data().strip_prefix(CALLBACK_PREFIX) else {
            return Ok(());
        };

        if page == NOOP {
            ctx.bot.answer_callback(&ctx.query.id, Some("Quick navigation")).await?;
            return Ok(());
        }

        let Ok(page) = page.parse::<usize>() else {
            return Ok(());
        };
        let Some(message) = ctx.query.message.as_ref() else {
            return Ok(());
        };

        let chat_id = message.chat.id;
        if let Err(e) = ctx.bot.delete_message(chat_id, message.message_id).await {
            tracing::error!(chat_id, "Error deleting menu message: {}", e);
        }

        self.send_page(ctx.bot.as_ref(), chat_id, Some(&ctx.query.from), page, &ctx.plugins)
            .await?;
        ctx.bot.answer_callback(&ctx.query.id, None).await?;
        Ok(())
    }
}

/// Group every tagged plugin's commands by tag, in registration order
pub fn tag_groups(plugins: &Generation) -> Vec<TagGroup> {
    let mut groups: Vec<TagGroup> = Vec::new();

    for plugin in plugins.plugins() {
        let handler = &plugin.handler;
        if handler.tags().is_empty() {
            continue;
        }

        let entry = handler
            .commands()
            .iter()
            .map(|c| format!("/{}", c))
            .collect::<Vec<_>>()
            .join(", ");

        for tag in handler.tags() {
            let tag = capitalize(tag);
            match groups.iter_mut().find(|g| g.tag == tag) {
                Some(group) => group.entries.push(entry.clone()),
                None => groups.push(TagGroup {
                    tag,
                    entries: vec![entry.clone()],
                }),
            }
        }
    }

    groups
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn page_button(text: impl Into<String>, page: usize) -> KeyboardButton {
    KeyboardButton::new(text).with_callback(format!("{}{}", CALLBACK_PREFIX, page))
}

fn noop_button() -> KeyboardButton {
    KeyboardButton::new("...").with_callback(format!("{}{}", CALLBACK_PREFIX, NOOP))
}

/// Previous/next row, a jump row once there are more than three pages,
/// and an optional link row
pub fn pagination_keyboard(current: usize, total: usize, website: Option<(&str, &str)>) -> Vec<Vec<KeyboardButton>> {
    let mut keyboard = Vec::new();

    let mut nav = Vec::new();
    if current > 1 {
        nav.push(page_button("◀ Previous", current - 1));
    }
    if current < total {
        nav.push(page_button("Next ▶", current + 1));
    }
    if !nav.is_empty() {
        keyboard.push(nav);
    }

    if total > 3 {
        let mut jump = Vec::new();

        if current > 2 {
            jump.push(page_button("1", 1));
            if current > 3 {
                jump.push(noop_button());
            }
        }

        for i in current.saturating_sub(1).max(1)..=(current + 1).min(total) {
            let label = if i == current { format!("[{}]", i) } else { i.to_string() };
            jump.push(page_button(label, i));
        }

        if current + 1 < total {
            if current + 2 < total {
                jump.push(noop_button());
            }
            jump.push(page_button(total.to_string(), total));
        }

        keyboard.push(jump);
    }

    if let Some((label, url)) = website {
        keyboard.push(vec![KeyboardButton::new(label).with_url(url)]);
    }

    keyboard
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::application::messaging::testing::RecordingBot;
    use crate::application::messaging::LoadingTracker;
    use crate::domain::entities::{CallbackQuery, Chat, InboundMessage};
    use crate::plugins::reply::{ReplyHandler, ReplySettings};

    fn labels(row: &[KeyboardButton]) -> Vec<&str> {
        row.iter().map(|b| b.text.as_str()).collect()
    }

    fn reply(commands: &[&str], tags: &[&str]) -> Arc<dyn CommandHandler> {
        let spec = CommandSpec::new(commands.iter().copied())
            .with_tags(tags.iter().map(|t| t.to_string()).collect());
        Arc::new(
            ReplyHandler::new(
                spec,
                ReplySettings {
                    text: "ok".to_string(),
                    markdown: false,
                },
            )
            .unwrap(),
        )
    }

    fn menu(per_page: usize, owners: Vec<i64>) -> MenuHandler {
        let settings = MenuSettings {
            per_page,
            ..MenuSettings::default()
        };
        MenuHandler::new(
            CommandSpec::new(["start", "menu"]).with_tags(vec!["main".to_string()]),
            settings,
            &PluginEnv::new("bot", "plugins").with_owners(owners),
        )
        .unwrap()
    }

    fn generation() -> Generation {
        let mut generation = Generation::new();
        generation.register("a.yaml", reply(&["ping"], &["tools"]));
        generation.register("b.yaml", reply(&["get", "fetch"], &["internet", "tools"]));
        generation.register("c.yaml", reply(&["secret"], &[]));
        generation
    }

    #[test]
    fn groups_by_tag_in_registration_order() {
        let groups = tag_groups(&generation());
        assert_eq!(
            groups,
            vec![
                TagGroup {
                    tag: "Tools".to_string(),
                    entries: vec!["/ping".to_string(), "/get, /fetch".to_string()],
                },
                TagGroup {
                    tag: "Internet".to_string(),
                    entries: vec!["/get, /fetch".to_string()],
                },
            ]
        );
    }

    #[test]
    fn keyboard_for_small_menus_has_only_navigation() {
        let keyboard = pagination_keyboard(1, 1, None);
        assert!(keyboard.is_empty());

        let keyboard = pagination_keyboard(2, 3, None);
        assert_eq!(keyboard.len(), 1);
        assert_eq!(labels(&keyboard[0]), vec!["◀ Previous", "Next ▶"]);
        assert_eq!(keyboard[0][0].callback_data.as_deref(), Some("menu_1"));
        assert_eq!(keyboard[0][1].callback_data.as_deref(), Some("menu_3"));
    }

    #[test]
    fn keyboard_jump_row_in_the_middle() {
        let keyboard = pagination_keyboard(5, 10, Some(("Website", "https://example.com")));
        assert_eq!(keyboard.len(), 3);
        assert_eq!(labels(&keyboard[1]), vec!["1", "...", "4", "[5]", "6", "...", "10"]);
        assert_eq!(keyboard[1][1].callback_data.as_deref(), Some("menu_noop"));
        assert_eq!(keyboard[2][0].url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn keyboard_jump_row_at_the_edges() {
        let first = pagination_keyboard(1, 5, None);
        assert_eq!(labels(&first[0]), vec!["Next ▶"]);
        assert_eq!(labels(&first[1]), vec!["[1]", "2", "...", "5"]);

        let last = pagination_keyboard(5, 5, None);
        assert_eq!(labels(&last[0]), vec!["◀ Previous"]);
        assert_eq!(labels(&last[1]), vec!["1", "...", "4", "[5]"]);

        let near_end = pagination_keyboard(4, 5, None);
        assert_eq!(labels(&near_end[1]), vec!["1", "...", "3", "[4]", "5"]);
    }

    #[test]
    fn render_shows_role_and_page() {
        let handler = menu(1, vec![5]);
        let owner = User::new(5).with_name("Alfi", None::<String>);
        let now = Utc::now().with_timezone(&FixedOffset::east_opt(7 * 3600).unwrap());
        let groups = tag_groups(&generation());

        let text = handler.render_text(Some(&owner), now, 2, &groups);
        assert!(text.starts_with("Hello, Alfi!\n"));
        assert!(text.contains("Role: Owner\n"));
        assert!(text.contains("Page: 2/2\n"));
        assert!(text.contains("Internet\n- /get, /fetch\n"));
        assert!(!text.contains("Tools"));
        assert!(text.ends_with("Bot active 24/7"));

        let guest = User::new(6);
        let text = handler.render_text(Some(&guest), now, 1, &groups);
        assert!(text.starts_with("Hello, User!\n"));
        assert!(text.contains("Role: User\n"));
    }

    #[test]
    fn zero_per_page_is_rejected() {
        let settings = MenuSettings {
            per_page: 0,
            ..MenuSettings::default()
        };
        let result = MenuHandler::new(CommandSpec::new(["menu"]), settings, &PluginEnv::new("bot", "plugins"));
        assert!(matches!(result, Err(PluginError::InvalidHandler(_))));
    }

    #[tokio::test]
    async fn invoke_clamps_page_to_range() {
        let bot = Arc::new(RecordingBot::new());
        let ctx = InboundContext {
            bot: bot.clone(),
            message: InboundMessage::new(1, Chat::private(3), "/menu 99"),
            command: "menu".to_string(),
            args: "99".to_string(),
            plugins: Arc::new(generation()),
            loading: Arc::new(LoadingTracker::default()),
        };

        menu(1, vec![]).invoke(ctx).await.unwrap();

        let sent = bot.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].text.contains("Page: 2/2"));
        assert!(sent[0].keyboard.is_some());
    }

    fn callback(data: &str) -> CallbackQuery {
        CallbackQuery {
            id: "cb-1".to_string(),
            from: User::new(5),
            message: Some(InboundMessage::new(40, Chat::private(3), "menu")),
            data: Some(data.to_string()),
        }
    }

    #[tokio::test]
    async fn page_callback_replaces_menu() {
        let bot = Arc::new(RecordingBot::new());
        let ctx = CallbackContext {
            bot: bot.clone(),
            query: callback("menu_2"),
            plugins: Arc::new(generation()),
        };

        menu(1, vec![]).on_callback(ctx).await.unwrap();

        let methods: Vec<&str> = bot.sent().iter().map(|s| s.method).collect();
        assert_eq!(methods, vec!["deleteMessage", "sendMessage", "answerCallbackQuery"]);
        assert_eq!(bot.sent_with("deleteMessage")[0].message_id, Some(40));
        assert!(bot.sent_with("sendMessage")[0].text.contains("Page: 2/2"));
    }

    #[tokio::test]
    async fn noop_callback_only_answers() {
        let bot = Arc::new(RecordingBot::new());
        let ctx = CallbackContext {
            bot: bot.clone(),
            query: callback("menu_noop"),
            plugins: Arc::new(generation()),
        };

        menu(1, vec![]).on_callback(ctx).await.unwrap();

        let sent = bot.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].method, "answerCallbackQuery");
        assert_eq!(sent[0].text, "Quick navigation");
    }

    #[tokio::test]
    async fn unrelated_callback_is_ignored() {
        let bot = Arc::new(RecordingBot::new());
        let ctx = CallbackContext {
            bot: bot.clone(),
            query: callback("vote_up"),
            plugins: Arc::new(generation()),
        };

        menu(1, vec![]).on_callback(ctx).await.unwrap();
        assert!(bot.sent().is_empty());
    }
}
