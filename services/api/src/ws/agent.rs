//! Agent profiles: what each voice endpoint configures its live session with.

use anyhow::{Context, Result};
use gemini_realtime::{Content, LiveConnectConfig, Modality, SpeechConfig};
use std::{collections::HashMap, fmt, fs, path::Path, sync::Arc};
use voice_agent_core::{Backends, ToolDispatcher, ToolRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentKind {
    /// Sells security courses and takes orders.
    Course,
    /// Runs a mock job interview. Has no tools.
    Interview,
}

impl AgentKind {
    pub const ALL: [AgentKind; 2] = [AgentKind::Course, AgentKind::Interview];

    /// File stem of the agent's system prompt in the prompts directory.
    pub fn prompt_key(self) -> &'static str {
        match self {
            AgentKind::Course => "course_agent",
            AgentKind::Interview => "interview_agent",
        }
    }

    pub fn registry(self) -> ToolRegistry {
        match self {
            AgentKind::Course => ToolRegistry::course_agent(),
            AgentKind::Interview => ToolRegistry::empty(),
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentKind::Course => write!(f, "course"),
            AgentKind::Interview => write!(f, "interview"),
        }
    }
}

/// Loads every `.md` file in `prompts_path`, keyed by file stem.
pub fn load_prompts(prompts_path: &Path) -> Result<HashMap<String, String>> {
    let mut prompts = HashMap::new();
    let entries = fs::read_dir(prompts_path)
        .with_context(|| format!("Failed to read prompts directory {}", prompts_path.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("md") {
            let prompt_key = path
                .file_stem()
                .and_then(|s| s.to_str())
                .context("Could not get file stem")?
                .to_string();
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read prompt {}", path.display()))?;
            prompts.insert(prompt_key, content);
        }
    }
    Ok(prompts)
}

/// Everything one agent's sessions share.
#[derive(Clone)]
pub struct AgentProfile {
    pub kind: AgentKind,
    pub live_config: LiveConnectConfig,
    pub dispatcher: ToolDispatcher,
}

impl AgentProfile {
    pub fn new(kind: AgentKind, system_prompt: &str, voice_name: &str, backends: Backends) -> Self {
        let registry = Arc::new(kind.registry());
        let live_config = LiveConnectConfig {
            response_modalities: vec![Modality::Audio, Modality::Text],
            speech_config: Some(SpeechConfig::prebuilt(voice_name)),
            audio_timestamp: true,
            system_instruction: Some(Content::text(system_prompt.trim())),
            tools: registry.to_tools(),
        };
        Self {
            kind,
            live_config,
            dispatcher: ToolDispatcher::new(registry, backends),
        }
    }
}

pub struct AgentProfiles {
    course: AgentProfile,
    interview: AgentProfile,
}

impl AgentProfiles {
    /// Builds both profiles. Fails if either agent's prompt is missing.
    pub fn from_prompts(
        prompts: &HashMap<String, String>,
        voice_name: &str,
        backends: Backends,
    ) -> Result<Self> {
        let build = |kind: AgentKind| -> Result<AgentProfile> {
            let prompt = prompts
                .get(kind.prompt_key())
                .with_context(|| format!("{}.md not found in prompts directory", kind.prompt_key()))?;
            Ok(AgentProfile::new(kind, prompt, voice_name, backends.clone()))
        };
        Ok(Self {
            course: build(AgentKind::Course)?,
            interview: build(AgentKind::Interview)?,
        })
    }

    pub fn get(&self, kind: AgentKind) -> &AgentProfile {
        match kind {
            AgentKind::Course => &self.course,
            AgentKind::Interview => &self.interview,
        }
    }
}
