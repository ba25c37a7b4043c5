pub mod afk;
pub mod commands;
pub mod config;
pub mod events;
pub mod levels;
pub mod utils;
pub mod voice;

use serenity::model::id::ChannelId;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;

pub struct Data {
    pub voice_manager: voice::state::VoiceManager,
    pub voice_config: voice::VoiceConfig,
    pub level_db: levels::db::LevelDb,
    pub cooldowns: levels::CooldownMap,
    pub voice_sessions: levels::VoiceSessions,
    pub afk_tracker: afk::AfkTracker,
    pub log_channel_id: Option<ChannelId>,
}
