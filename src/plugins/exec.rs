//! `exec` handler: runs an external program and replies with its output

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::application::errors::{HandlerError, HandlerResult, PluginError, PluginResult};
use crate::domain::entities::CommandSpec;
use super::{truncate_chars, CommandHandler, InboundContext, PluginEnv};

const MAX_REPLY_CHARS: usize = 4000;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecSettings {
    /// Program to run; a relative path containing a separator resolves
    /// against the plugin directory, a bare name is looked up on PATH
    #[serde(default)]
    pub program: String,
    /// Fixed arguments, placed before the user's
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    /// Defaults to the plugin directory
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

pub struct ExecHandler {
    spec: CommandSpec,
    program: PathBuf,
    args: Vec<String>,
    timeout: Option<Duration>,
    working_dir: PathBuf,
}

impl ExecHandler {
    pub fn new(spec: CommandSpec, settings: ExecSettings, env: &PluginEnv) -> PluginResult<Self> {
        let program = settings.program.trim();
        if program.is_empty() {
            return Err(PluginError::InvalidHandler("exec needs a `program`".to_string()));
        }
        if settings.timeout_secs == Some(0) {
            return Err(PluginError::InvalidHandler("exec `timeout-secs` must be positive".to_string()));
        }

        let program = PathBuf::from(program);
        let program = if program.is_relative() && program.components().count() > 1 {
            env.plugin_dir.join(program)
        } else {
            program
        };

        let working_dir = match settings.working_dir {
            Some(dir) if dir.is_relative() => env.plugin_dir.join(dir),
            Some(dir) => dir,
            None => env.plugin_dir.clone(),
        };

        Ok(Self {
            spec,
            program,
            args: settings.args,
            timeout: settings.timeout_secs.map(Duration::from_secs),
            working_dir,
        })
    }

    async fn run(&self, ctx: &InboundContext) -> Result<String, HandlerError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .args(ctx.args.split_whitespace())
            .current_dir(&self.working_dir)
            .env("BOT_CHAT_ID", ctx.chat_id().to_string())
            .env("BOT_COMMAND", &ctx.command)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(user) = &ctx.message.from {
            command.env("BOT_USER_ID", user.id.to_string());
        }

        let output = command.output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, output).await.map_err(|_| {
                HandlerError::ExecutionFailed(format!("{} timed out after {:?}", self.program.display(), limit))
            })?,
            None => output.await,
        }
        .map_err(|e| HandlerError::ExecutionFailed(format!("failed to start {}: {}", self.program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(HandlerError::ExecutionFailed(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl CommandHandler for ExecHandler {
    fn spec(&self) -> &CommandSpec {
        &self.spec
    }

    async fn invoke(&self, ctx: InboundContext) -> HandlerResult {
        ctx.start_loading().await;
        let result = self.run(&ctx).await;
        ctx.finish_loading().await;

        let stdout = result?;
        let text = if stdout.is_empty() {
            "(no output)".to_string()
        } else {
            truncate_chars(&stdout, MAX_REPLY_CHARS)
        };
        ctx.reply(&text).await?;
        Ok(())
    }
}
