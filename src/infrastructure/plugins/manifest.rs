//! Plugin manifest definition

use serde::Deserialize;

use crate::application::errors::{PluginError, PluginResult};
use crate::domain::entities::CommandSpec;
use crate::plugins::exec::ExecSettings;
use crate::plugins::get::GetSettings;
use crate::plugins::media::MediaSettings;
use crate::plugins::menu::MenuSettings;
use crate::plugins::reply::ReplySettings;

/// A single string or a list of strings
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

/// Contents of one plugin file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PluginManifest {
    /// Command name or list of names (required)
    #[serde(default)]
    pub command: Option<OneOrMany>,

    /// Category labels used by the menu
    #[serde(default)]
    pub tags: Option<OneOrMany>,

    /// Usage lines
    #[serde(default)]
    pub help: Option<OneOrMany>,

    /// Compiled handler kind and its settings (required)
    #[serde(default)]
    pub handler: Option<HandlerSpec>,
}

/// Handler kinds a manifest can bind commands to
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum HandlerSpec {
    Reply(ReplySettings),
    Media(MediaSettings),
    Get(GetSettings),
    Menu(MenuSettings),
    Exec(ExecSettings),
}

impl HandlerSpec {
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerSpec::Reply(_) => "reply",
            HandlerSpec::Media(_) => "media",
            HandlerSpec::Get(_) => "get",
            HandlerSpec::Menu(_) => "menu",
            HandlerSpec::Exec(_) => "exec",
        }
    }
}

impl PluginManifest {
    pub fn parse(content: &str) -> PluginResult<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Check the handler contract and split into spec + handler settings
    pub fn validate(self) -> PluginResult<(CommandSpec, HandlerSpec)> {
        let commands: Vec<String> = self
            .command
            .map(OneOrMany::into_vec)
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if commands.is_empty() {
            return Err(PluginError::MissingCommand);
        }

        let handler = self.handler.ok_or(PluginError::MissingHandler)?;

        let spec = CommandSpec::new(commands)
            .with_tags(self.tags.map(OneOrMany::into_vec).unwrap_or_default())
            .with_help(self.help.map(OneOrMany::into_vec).unwrap_or_default());

        Ok((spec, handler))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_command_string() {
        let manifest = PluginManifest::parse(
            "command: get\ntags: [internet, tools]\nhelp: ['get <url>']\nhandler:\n  kind: get\n",
        )
        .unwrap();
        let (spec, handler) = manifest.validate().unwrap();
        assert_eq!(spec.commands, vec!["get"]);
        assert_eq!(spec.tags, vec!["internet", "tools"]);
        assert_eq!(spec.help, vec!["get <url>"]);
        assert_eq!(handler.kind(), "get");
    }

    #[test]
    fn accepts_command_list_and_single_tag() {
        let manifest = PluginManifest::parse(
            "command: [start, menu]\ntags: main\nhandler:\n  kind: menu\n  per-page: 5\n",
        )
        .unwrap();
        let (spec, handler) = manifest.validate().unwrap();
        assert_eq!(spec.commands, vec!["start", "menu"]);
        assert_eq!(spec.tags, vec!["main"]);
        match handler {
            HandlerSpec::Menu(settings) => assert_eq!(settings.per_page, 5),
            other => panic!("unexpected handler {:?}", other),
        }
    }

    #[test]
    fn missing_command_is_a_contract_failure() {
        let manifest = PluginManifest::parse("tags: [x]\nhandler:\n  kind: reply\n  text: hi\n").unwrap();
        assert!(matches!(manifest.validate(), Err(PluginError::MissingCommand)));
    }

    #[test]
    fn blank_commands_are_a_contract_failure() {
        let manifest = PluginManifest::parse("command: ['  ', '']\nhandler:\n  kind: reply\n  text: hi\n").unwrap();
        assert!(matches!(manifest.validate(), Err(PluginError::MissingCommand)));
    }

    #[test]
    fn missing_handler_is_a_contract_failure() {
        let manifest = PluginManifest::parse("command: ping\n").unwrap();
        assert!(matches!(manifest.validate(), Err(PluginError::MissingHandler)));
    }

    #[test]
    fn unknown_kind_fails_to_parse() {
        let err = PluginManifest::parse("command: x\nhandler:\n  kind: teleport\n").unwrap_err();
        assert!(matches!(err, PluginError::Manifest(_)));
    }
}
