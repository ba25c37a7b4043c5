use std::collections::HashMap;

use serenity::model::id::GuildId;
use tracing::{info, warn};

use super::gateway::{VoiceError, VoiceGateway};
use super::pool::NamePool;
use super::state::{GuildVoiceState, VoiceManager};
use super::VoiceConfig;

/// 길드 attach: 트리거 채널 확보 + 지난 실행이 남긴 빈 통화방 청소.
/// 정상 추적이 시작되기 전에 한 번 실행되며, 이미 attach된 길드는 건드리지 않는다.
pub async fn attach_guild<G>(
    gateway: &G,
    manager: &VoiceManager,
    config: &VoiceConfig,
    guild_id: GuildId,
) -> Result<(), VoiceError>
where
    G: VoiceGateway + ?Sized,
{
    {
        let guilds = manager.read().await;
        if guilds.contains_key(&guild_id) {
            return Ok(());
        }
    }

    let category_id = match &config.category_name {
        Some(name) => gateway.find_category(guild_id, name).await?,
        None => None,
    };

    let channels = gateway.list_voice_channels(guild_id).await?;

    let (trigger_id, trigger_position) = match channels
        .iter()
        .find(|ch| ch.name == config.trigger_name)
    {
        Some(ch) => (ch.id, ch.position),
        None => {
            let id = gateway
                .create_plain_voice_channel(guild_id, &config.trigger_name, category_id)
                .await?;
            info!("트리거 채널 생성: {} ({id})", config.trigger_name);
            (id, 0)
        }
    };

    // 지난 실행이 추적하다 만 빈 통화방 정리. 개별 실패는 건너뛴다.
    for ch in &channels {
        if ch.id == trigger_id || ch.member_count > 0 {
            continue;
        }
        if !config.catalog.iter().any(|n| *n == ch.name) {
            continue;
        }
        match gateway.delete_channel(ch.id, "기동 시 잔여 통화방 정리").await {
            Ok(()) | Err(VoiceError::NotFound) => {
                info!("잔여 통화방 삭제: {} ({})", ch.name, ch.id);
            }
            Err(e) => warn!("잔여 통화방 삭제 실패 ({}): {e}", ch.name),
        }
    }

    let state = GuildVoiceState {
        trigger_channel_id: trigger_id,
        trigger_position,
        category_id,
        tracked: HashMap::new(),
        pool: NamePool::new(config.catalog.clone())?,
    };

    let mut guilds = manager.write().await;
    guilds.insert(guild_id, state);
    info!("길드 attach 완료: {guild_id} (트리거 {trigger_id})");
    Ok(())
}

/// 길드 detach: 상태 제거와 함께 남은 타이머를 전부 중단한다.
pub async fn detach_guild(manager: &VoiceManager, guild_id: GuildId) {
    let mut guilds = manager.write().await;
    if let Some(guild) = guilds.remove(&guild_id) {
        for rec in guild.tracked.into_values() {
            if let Some(handle) = rec.pending_delete {
                handle.abort();
            }
        }
        info!("길드 detach: {guild_id}");
    }
}
