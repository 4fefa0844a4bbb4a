//! Message dispatcher - Routes inbound updates to plugin handlers
//!
//! Every handler call runs in its own task so that an error or a panic
//! inside a plugin is turned into a [`HandlerError`] here and never reaches
//! the update loop.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use crate::application::errors::{HandlerError, HandlerResult};
use crate::domain::entities::{CallbackQuery, InboundMessage, Update};
use crate::domain::traits::{Bot, SendOptions};
use crate::infrastructure::plugins::PluginRegistry;
use crate::plugins::{CallbackContext, InboundContext};
use super::loading::LoadingTracker;
use super::parser::CommandParser;

/// User-facing texts sent when something goes wrong
#[derive(Debug, Clone)]
pub struct Notices {
    pub command_error: String,
    pub callback_error: String,
}

impl Default for Notices {
    fn default() -> Self {
        Self {
            command_error: "❌ Error while running the command.".to_string(),
            callback_error: "❌ Callback error".to_string(),
        }
    }
}

/// What happened to one inbound text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// No text or no command prefix
    Ignored,
    /// Prefixed, but no handler owns the token
    Unknown(String),
    Handled(String),
    /// Handler errored or panicked; the chat got the error notice
    Failed(String),
}

/// Result of fanning one callback out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackOutcome {
    pub delivered: usize,
    pub failed: usize,
}

pub struct Dispatcher {
    bot: Arc<dyn Bot>,
    registry: Arc<PluginRegistry>,
    parser: CommandParser,
    loading: Arc<LoadingTracker>,
    notices: Notices,
}

impl Dispatcher {
    pub fn new(bot: Arc<dyn Bot>, registry: Arc<PluginRegistry>) -> Self {
        Self {
            bot,
            registry,
            parser: CommandParser::default(),
            loading: Arc::new(LoadingTracker::default()),
            notices: Notices::default(),
        }
    }

    pub fn with_parser(mut self, parser: CommandParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_loading(mut self, loading: LoadingTracker) -> Self {
        self.loading = Arc::new(loading);
        self
    }

    pub fn with_notices(mut self, notices: Notices) -> Self {
        self.notices = notices;
        self
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn loading(&self) -> &Arc<LoadingTracker> {
        &self.loading
    }

    /// Push the current generation's commands to the platform menu
    pub async fn publish_commands(&self) {
        let menu = self.registry.snapshot().command_menu();
        if let Err(e) = self.bot.set_commands(&menu).await {
            tracing::warn!("Failed to register commands: {}", e);
        }
    }

    pub async fn dispatch(&self, update: Update) {
        match update {
            Update::Message(message) => {
                self.handle_message(message).await;
            }
            Update::Callback(query) => {
                self.handle_callback(query).await;
            }
        }
    }

    pub async fn handle_message(&self, message: InboundMessage) -> MessageOutcome {
        let text = message.text();
        let sender = message
            .from
            .as_ref()
            .map(|u| u.tag())
            .unwrap_or_else(|| "unknown".to_string());
        tracing::info!(
            chat_id = message.chat.id,
            "[{}] {} | {}: {}",
            message.chat.kind.as_str(),
            message.chat.display_name(),
            sender,
            text
        );

        if text.is_empty() {
            return MessageOutcome::Ignored;
        }

        let Some(parsed) = self.parser.parse(text) else {
            return MessageOutcome::Ignored;
        };

        // Pin the generation so a reload mid-command cannot change the answer
        let plugins = self.registry.snapshot();
        let Some(handler) = plugins.lookup(&parsed.name) else {
            tracing::debug!(command = %parsed.name, "No handler for command");
            return MessageOutcome::Unknown(parsed.name);
        };

        let chat_id = message.chat.id;
        let origin = message.message_id;
        let ctx = InboundContext {
            bot: Arc::clone(&self.bot),
            message,
            command: parsed.name.clone(),
            args: parsed.args,
            plugins,
            loading: Arc::clone(&self.loading),
        };

        let result = isolate(async move { handler.invoke(ctx).await }).await;

        if self.loading.discard(chat_id, origin) {
            tracing::debug!(chat_id, command = %parsed.name, "Dropped unfinished loading indicator");
        }

        match result {
            Ok(()) => MessageOutcome::Handled(parsed.name),
            Err(e) => {
                tracing::error!(chat_id, command = %parsed.name, "Error in command /{}: {}", parsed.name, e);
                if let Err(e) = self
                    .bot
                    .send_message(chat_id, &self.notices.command_error, SendOptions::default())
                    .await
                {
                    tracing::error!(chat_id, "Failed to send error notice: {}", e);
                }
                MessageOutcome::Failed(parsed.name)
            }
        }
    }

    /// Offer the event to every interested handler, in registration order
    pub async fn handle_callback(&self, query: CallbackQuery) -> CallbackOutcome {
        let plugins = self.registry.snapshot();
        let mut outcome = CallbackOutcome::default();

        tracing::debug!(data = %query.data(), "Callback from {}", query.from.tag());

        for plugin in plugins.plugins() {
            if !plugin.handler.callback_interest().accepts(query.data()) {
                continue;
            }

            let handler = Arc::clone(&plugin.handler);
            let ctx = CallbackContext {
                bot: Arc::clone(&self.bot),
                query: query.clone(),
                plugins: Arc::clone(&plugins),
            };

            outcome.delivered += 1;
            if let Err(e) = isolate(async move { handler.on_callback(ctx).await }).await {
                outcome.failed += 1;
                tracing::error!(file = %plugin.file, "Callback error in {}: {}", plugin.file, e);
                if let Err(e) = self
                    .bot
                    .answer_callback(&query.id, Some(&self.notices.callback_error))
                    .await
                {
                    tracing::error!("Failed to answer callback: {}", e);
                }
            }
        }

        outcome
    }
}

/// Run a handler future on its own task, turning a panic into an error
async fn isolate<F>(fut: F) -> HandlerResult
where
    F: Future<Output = HandlerResult> + Send + 'static,
{
    match tokio::spawn(fut).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(HandlerError::Panicked(panic_message(e.into_panic()))),
        Err(e) => Err(HandlerError::ExecutionFailed(e.to_string())),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use async_trait::async_trait;
    use tempfile::TempDir;

    use crate::application::messaging::testing::RecordingBot;
    use crate::domain::entities::{Chat, CommandSpec, User};
    use crate::infrastructure::plugins::{Generation, PluginLoader};
    use crate::plugins::{CallbackInterest, CommandHandler, HandlerFactory, PluginEnv};

    type Journal = Arc<Mutex<Vec<String>>>;

    enum Behavior {
        Ok,
        Fail,
        Panic,
    }

    struct TestHandler {
        name: &'static str,
        spec: CommandSpec,
        behavior: Behavior,
        interest: CallbackInterest,
        journal: Journal,
    }

    impl TestHandler {
        fn new(name: &'static str, commands: &[&'static str], behavior: Behavior, journal: &Journal) -> Self {
            Self {
                name,
                spec: CommandSpec::new(commands.iter().copied()),
                behavior,
                interest: CallbackInterest::All,
                journal: Arc::clone(journal),
            }
        }

        fn interested_in(mut self, interest: CallbackInterest) -> Self {
            self.interest = interest;
            self
        }

        fn act(&self, what: String) -> HandlerResult {
            self.journal.lock().unwrap().push(what);
            match self.behavior {
                Behavior::Ok => Ok(()),
                Behavior::Fail => Err(HandlerError::ExecutionFailed("boom".to_string())),
                Behavior::Panic => panic!("{} exploded", self.name),
            }
        }
    }

    #[async_trait]
    impl CommandHandler for TestHandler {
        fn spec(&self) -> &CommandSpec {
            &self.spec
        }

        async fn invoke(&self, ctx: InboundContext) -> HandlerResult {
            self.act(format!("{}:{}:{}", self.name, ctx.command, ctx.args))
        }

        fn callback_interest(&self) -> CallbackInterest {
            self.interest.clone()
        }

        async fn on_callback(&self, ctx: CallbackContext) -> HandlerResult {
            self.act(format!("{}:cb:{}", self.name, ctx.query.data()))
        }
    }

    struct Fixture {
        _dir: TempDir,
        bot: Arc<RecordingBot>,
        dispatcher: Dispatcher,
        journal: Journal,
    }

    /// Registry whose published generation is built by hand
    fn fixture(build: impl FnOnce(&mut Generation, &Journal)) -> Fixture {
        let dir = TempDir::new().unwrap();
        let journal: Journal = Arc::default();
        let factory = HandlerFactory::new(PluginEnv::new("bot", dir.path()));
        let registry = Arc::new(PluginRegistry::new(PluginLoader::new(dir.path(), "yaml", factory)));

        let mut generation = Generation::new();
        build(&mut generation, &journal);
        registry.publish_for_test(generation);

        let bot = Arc::new(RecordingBot::new());
        let dispatcher = Dispatcher::new(bot.clone(), registry);
        Fixture {
            _dir: dir,
            bot,
            dispatcher,
            journal,
        }
    }

    fn text(body: &str) -> InboundMessage {
        InboundMessage::new(10, Chat::private(42), body).with_sender(User::new(7).with_username("alice"))
    }

    fn callback(data: &str) -> CallbackQuery {
        CallbackQuery {
            id: "cb-1".to_string(),
            from: User::new(7),
            message: Some(text("menu")),
            data: Some(data.to_string()),
        }
    }

    /// Collects formatted log output
    #[derive(Clone, Default)]
    struct LogCapture(Arc<Mutex<Vec<u8>>>);

    impl LogCapture {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
        type Writer = LogCapture;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn textless_message_is_logged_then_ignored() {
        let f = fixture(|g, j| g.register("start.yaml", Arc::new(TestHandler::new("start", &["start"], Behavior::Ok, j))));
        let logs = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(logs.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let outcome = f.dispatcher.handle_message(text("")).await;

        assert_eq!(outcome, MessageOutcome::Ignored);
        assert!(logs.contents().contains("@alice"));
        assert!(f.bot.sent().is_empty());
        assert!(f.journal.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn publish_commands_sends_current_menu() {
        let f = fixture(|g, j| {
            g.register("start.yaml", Arc::new(TestHandler::new("start", &["start", "Menu"], Behavior::Ok, j)));
            g.register("odd.yaml", Arc::new(TestHandler::new("odd", &["odd-one"], Behavior::Ok, j)));
        });

        f.dispatcher.publish_commands().await;

        let published = f.bot.sent_with("setMyCommands");
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].text, "menu,start");
    }

    #[tokio::test]
    async fn routes_by_lowercased_token_with_args() {
        let f = fixture(|g, j| g.register("start.yaml", Arc::new(TestHandler::new("start", &["start"], Behavior::Ok, j))));

        let outcome = f.dispatcher.handle_message(text("/Start hello   world")).await;

        assert_eq!(outcome, MessageOutcome::Handled("start".to_string()));
        assert_eq!(*f.journal.lock().unwrap(), vec!["start:start:hello world"]);
    }

    #[tokio::test]
    async fn strips_bot_suffix() {
        let f = fixture(|g, j| g.register("menu.yaml", Arc::new(TestHandler::new("menu", &["menu"], Behavior::Ok, j))));

        let outcome = f.dispatcher.handle_message(text("/menu@SomeBotName")).await;

        assert_eq!(outcome, MessageOutcome::Handled("menu".to_string()));
    }

    #[tokio::test]
    async fn unknown_command_and_plain_text_are_silent() {
        let f = fixture(|g, j| g.register("start.yaml", Arc::new(TestHandler::new("start", &["start"], Behavior::Ok, j))));

        assert_eq!(
            f.dispatcher.handle_message(text("/unknown x")).await,
            MessageOutcome::Unknown("unknown".to_string())
        );
        assert_eq!(f.dispatcher.handle_message(text("hello there")).await, MessageOutcome::Ignored);
        assert!(f.bot.sent().is_empty());
        assert!(f.journal.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failing_handler_sends_one_notice_and_dispatch_continues() {
        let f = fixture(|g, j| {
            g.register("bad.yaml", Arc::new(TestHandler::new("bad", &["bad"], Behavior::Fail, j)));
            g.register("good.yaml", Arc::new(TestHandler::new("good", &["good"], Behavior::Ok, j)));
        });

        let outcome = f.dispatcher.handle_message(text("/bad")).await;
        assert_eq!(outcome, MessageOutcome::Failed("bad".to_string()));

        let sent = f.bot.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].chat_id, 42);
        assert_eq!(sent[0].text, Notices::default().command_error);

        let outcome = f.dispatcher.handle_message(text("/good")).await;
        assert_eq!(outcome, MessageOutcome::Handled("good".to_string()));
        assert_eq!(f.bot.sent().len(), 1);
    }

    #[tokio::test]
    async fn panicking_handler_is_contained() {
        let f = fixture(|g, j| {
            g.register("crash.yaml", Arc::new(TestHandler::new("crash", &["crash"], Behavior::Panic, j)));
            g.register("good.yaml", Arc::new(TestHandler::new("good", &["good"], Behavior::Ok, j)));
        });

        let outcome = f.dispatcher.handle_message(text("/crash")).await;
        assert_eq!(outcome, MessageOutcome::Failed("crash".to_string()));
        assert_eq!(f.bot.sent().len(), 1);

        let outcome = f.dispatcher.handle_message(text("/good now")).await;
        assert_eq!(outcome, MessageOutcome::Handled("good".to_string()));
    }

    #[tokio::test]
    async fn callback_fans_out_in_order_despite_failures() {
        let f = fixture(|g, j| {
            g.register("a.yaml", Arc::new(TestHandler::new("a", &["a"], Behavior::Fail, j)));
            g.register("b.yaml", Arc::new(TestHandler::new("b", &["b"], Behavior::Panic, j)));
            g.register("c.yaml", Arc::new(TestHandler::new("c", &["c"], Behavior::Ok, j)));
        });

        let outcome = f.dispatcher.handle_callback(callback("menu_2")).await;

        assert_eq!(outcome, CallbackOutcome { delivered: 3, failed: 2 });
        assert_eq!(*f.journal.lock().unwrap(), vec!["a:cb:menu_2", "b:cb:menu_2", "c:cb:menu_2"]);

        let answers = f.bot.sent_with("answerCallbackQuery");
        assert_eq!(answers.len(), 2);
        assert!(answers.iter().all(|a| a.text == Notices::default().callback_error));
        assert_eq!(answers[0].callback_id.as_deref(), Some("cb-1"));
    }

    #[tokio::test]
    async fn callback_skips_uninterested_handlers() {
        let f = fixture(|g, j| {
            g.register(
                "menu.yaml",
                Arc::new(
                    TestHandler::new("menu", &["menu"], Behavior::Ok, j)
                        .interested_in(CallbackInterest::Prefix("menu_".to_string())),
                ),
            );
            g.register(
                "quiet.yaml",
                Arc::new(TestHandler::new("quiet", &["quiet"], Behavior::Ok, j).interested_in(CallbackInterest::None)),
            );
            g.register("all.yaml", Arc::new(TestHandler::new("all", &["all"], Behavior::Ok, j)));
        });

        let outcome = f.dispatcher.handle_callback(callback("vote_1")).await;

        assert_eq!(outcome, CallbackOutcome { delivered: 1, failed: 0 });
        assert_eq!(*f.journal.lock().unwrap(), vec!["all:cb:vote_1"]);
        assert!(f.bot.sent().is_empty());
    }

    #[tokio::test]
    async fn overridden_handler_gets_no_callbacks() {
        let f = fixture(|g, j| {
            g.register("old.yaml", Arc::new(TestHandler::new("old", &["ping"], Behavior::Ok, j)));
            g.register("new.yaml", Arc::new(TestHandler::new("new", &["ping"], Behavior::Ok, j)));
        });

        f.dispatcher.handle_callback(callback("x")).await;

        assert_eq!(*f.journal.lock().unwrap(), vec!["new:cb:x"]);
    }

    struct ForgetfulHandler(CommandSpec);

    #[async_trait]
    impl CommandHandler for ForgetfulHandler {
        fn spec(&self) -> &CommandSpec {
            &self.0
        }

        async fn invoke(&self, ctx: InboundContext) -> HandlerResult {
            ctx.start_loading().await;
            Err(HandlerError::InvalidArgs("never finished".to_string()))
        }
    }

    #[tokio::test]
    async fn leftover_loading_entry_is_cleared() {
        let f = fixture(|g, _| g.register("slow.yaml", Arc::new(ForgetfulHandler(CommandSpec::new(["slow"])))));

        f.dispatcher.handle_message(text("/slow")).await;

        assert_eq!(f.dispatcher.loading().pending(), 0);
    }

    #[test]
    fn panic_payloads_are_readable() {
        assert_eq!(panic_message(Box::new("static")), "static");
        assert_eq!(panic_message(Box::new("owned".to_string())), "owned");
        assert_eq!(panic_message(Box::new(3u8)), "unknown panic");
    }
}
