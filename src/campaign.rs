// Campaign definition passed from JS as JSON. Immutable for the length of a session.
// Field names follow the host's camelCase document shape.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::phase::{FlowPlan, ScreenKey};
use crate::types::{MicrogameId, Outcome, TrackId};

/// Skin overrides for a microgame: logical sprite name to asset key.
pub type SkinConfig = BTreeMap<String, String>;

/// Complete macrogame configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDefinition {
    #[serde(default)]
    pub intro_config: ScreenConfig,
    #[serde(default)]
    pub promo_config: ScreenConfig,
    #[serde(default)]
    pub per_game_config: PerGameConfig,
    /// Play order. Insertion order is load-bearing.
    #[serde(default)]
    pub flow: Vec<MicrogameReference>,
    #[serde(default)]
    pub audio_config: HashMap<ScreenKey, ScreenAudio>,
    #[serde(default)]
    pub background_music_track: Option<TrackId>,
    /// Host-supplied fallback when an entry has no rule for an outcome.
    #[serde(default)]
    pub default_point_rules: Option<PointRule>,
    /// Seed for the built-in units' spawn patterns.
    #[serde(default)]
    pub seed: u64,
}

/// Intro or promo screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_screen_duration")]
    pub duration_ms: u64,
    #[serde(default)]
    pub background_image: Option<String>,
    /// Advance on click. The duration still applies; whichever comes first wins.
    /// A zero duration with click enabled waits for the click only.
    #[serde(default)]
    pub click_to_continue: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        ScreenConfig {
            enabled: false,
            text: String::new(),
            duration_ms: default_screen_duration(),
            background_image: None,
            click_to_continue: false,
        }
    }
}

impl ScreenConfig {
    /// Timer for this screen, `None` when only a click can advance it.
    pub fn timer_ms(&self) -> Option<u64> {
        if self.click_to_continue && self.duration_ms == 0 {
            None
        } else {
            Some(self.duration_ms)
        }
    }
}

/// Durations shared by every flow entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerGameConfig {
    #[serde(default = "default_title_duration")]
    pub title_duration_ms: u64,
    #[serde(default = "default_controls_duration")]
    pub controls_duration_ms: u64,
    #[serde(default = "default_result_duration")]
    pub result_duration_ms: u64,
    /// Pause before advancing past an entry that could not be played.
    #[serde(default = "default_skip_grace")]
    pub skip_grace_ms: u64,
    /// Force a loss when a unit has not reported within this window. Off by default.
    #[serde(default)]
    pub stall_timeout_ms: Option<u64>,
}

impl Default for PerGameConfig {
    fn default() -> Self {
        PerGameConfig {
            title_duration_ms: default_title_duration(),
            controls_duration_ms: default_controls_duration(),
            result_duration_ms: default_result_duration(),
            skip_grace_ms: default_skip_grace(),
            stall_timeout_ms: None,
        }
    }
}

fn default_screen_duration() -> u64 {
    3_000
}

fn default_title_duration() -> u64 {
    2_000
}

fn default_controls_duration() -> u64 {
    2_000
}

fn default_result_duration() -> u64 {
    2_000
}

fn default_skip_grace() -> u64 {
    1_000
}

/// One entry of the flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MicrogameReference {
    pub microgame_id: MicrogameId,
    #[serde(default)]
    pub variant_id: Option<String>,
    #[serde(default)]
    pub point_rules: Option<PointRule>,
    #[serde(default)]
    pub skin: SkinConfig,
    /// Overrides the text shown on the controls card.
    #[serde(default)]
    pub controls_text: Option<String>,
}

impl MicrogameReference {
    pub fn new(microgame_id: impl Into<MicrogameId>) -> Self {
        MicrogameReference {
            microgame_id: microgame_id.into(),
            variant_id: None,
            point_rules: None,
            skin: SkinConfig::new(),
            controls_text: None,
        }
    }

    pub fn with_points(mut self, rule: PointRule) -> Self {
        self.point_rules = Some(rule);
        self
    }
}

/// Points awarded per outcome. Values may be zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PointRule {
    #[serde(default)]
    pub win: Option<i64>,
    #[serde(default)]
    pub lose: Option<i64>,
}

impl PointRule {
    pub fn new(win: Option<i64>, lose: Option<i64>) -> Self {
        PointRule { win, lose }
    }

    pub fn for_outcome(&self, outcome: Outcome) -> Option<i64> {
        if outcome.win {
            self.win
        } else {
            self.lose
        }
    }

    /// `rule[outcome] ?? fallback[outcome] ?? 0`.
    pub fn points_for(rule: Option<&PointRule>, fallback: Option<&PointRule>, outcome: Outcome) -> i64 {
        rule.and_then(|r| r.for_outcome(outcome))
            .or_else(|| fallback.and_then(|r| r.for_outcome(outcome)))
            .unwrap_or(0)
    }
}

/// Music setting for one screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ScreenAudio {
    #[serde(default)]
    pub play_music: bool,
    #[serde(default)]
    pub track_id: Option<TrackId>,
}

impl CampaignDefinition {
    /// Parse and validate a campaign from JSON.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let campaign: CampaignDefinition = serde_json::from_str(json)?;
        campaign.validate()?;
        Ok(campaign)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if let Some(index) = self
            .flow
            .iter()
            .position(|entry| entry.microgame_id.as_str().trim().is_empty())
        {
            return Err(EngineError::InvalidConfig(format!(
                "flow entry {} has an empty microgameId",
                index
            )));
        }
        Ok(())
    }

    pub fn plan(&self) -> FlowPlan {
        FlowPlan {
            flow_len: self.flow.len(),
            intro_enabled: self.intro_config.enabled,
            promo_enabled: self.promo_config.enabled,
        }
    }

    /// Track that should loop while `screen` is shown, if any.
    /// Screens missing from the audio config are silent.
    pub fn resolve_track(&self, screen: ScreenKey) -> Option<&TrackId> {
        let audio = self.audio_config.get(&screen)?;
        if !audio.play_music {
            return None;
        }
        audio
            .track_id
            .as_ref()
            .or(self.background_music_track.as_ref())
    }

    /// Points for entry `index` finishing with `outcome`.
    pub fn points_for(&self, index: usize, outcome: Outcome) -> i64 {
        let rule = self.flow.get(index).and_then(|e| e.point_rules.as_ref());
        PointRule::points_for(rule, self.default_point_rules.as_ref(), outcome)
    }
}

impl Default for CampaignDefinition {
    fn default() -> Self {
        CampaignDefinition {
            intro_config: ScreenConfig::default(),
            promo_config: ScreenConfig::default(),
            per_game_config: PerGameConfig::default(),
            flow: Vec::new(),
            audio_config: HashMap::new(),
            background_music_track: None,
            default_point_rules: None,
            seed: 0,
        }
    }
}
