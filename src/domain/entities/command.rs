/// Command names, tags and usage lines a handler is registered with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    pub commands: Vec<String>,
    pub tags: Vec<String>,
    pub help: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            tags: Vec::new(),
            help: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_help(mut self, help: Vec<String>) -> Self {
        self.help = help;
        self
    }

    /// Lowercased tokens the registry indexes this handler under
    pub fn tokens(&self) -> impl Iterator<Item = String> + '_ {
        self.commands.iter().map(|c| c.to_lowercase())
    }
}
