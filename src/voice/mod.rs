pub mod bootstrap;
pub mod discord;
pub mod gateway;
pub mod pool;
pub mod provision;
pub mod reaper;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use serenity::model::id::{ChannelId, GuildId, UserId};
use tracing::{debug, warn};

use gateway::{VoiceError, VoiceGateway};
use state::VoiceManager;

/// 음성 상태 변화를 네 가지 형태로 정규화한 것.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceTransition {
    Joined { channel: ChannelId },
    Left { channel: ChannelId },
    Moved { from: ChannelId, to: ChannelId },
    NoOp,
}

/// (이전 채널, 새 채널) 쌍에서 전이 형태를 만든다. 분기는 여기서 한 번만.
pub fn normalize(old: Option<ChannelId>, new: Option<ChannelId>) -> VoiceTransition {
    match (old, new) {
        (None, Some(ch)) => VoiceTransition::Joined { channel: ch },
        (Some(ch), None) => VoiceTransition::Left { channel: ch },
        (Some(from), Some(to)) if from != to => VoiceTransition::Moved { from, to },
        _ => VoiceTransition::NoOp,
    }
}

/// 음성 채널 코어 설정. `Config`에서 잘라낸 부분집합.
#[derive(Clone)]
pub struct VoiceConfig {
    pub trigger_name: String,
    pub category_name: Option<String>,
    pub delete_delay: Duration,
    pub catalog: Vec<String>,
}

/// 전이 하나를 처리한다. 같은 길드의 이벤트는 도착 순서대로 들어온다고 가정한다.
pub async fn handle_transition<G>(
    gateway: &Arc<G>,
    manager: &VoiceManager,
    config: &VoiceConfig,
    guild_id: GuildId,
    user_id: UserId,
    transition: VoiceTransition,
) -> Result<(), VoiceError>
where
    G: VoiceGateway + ?Sized + 'static,
{
    match transition {
        VoiceTransition::Joined { channel } => {
            handle_join(gateway, manager, config, guild_id, user_id, channel).await
        }
        VoiceTransition::Left { channel } => {
            handle_leave(gateway, manager, config, guild_id, channel).await
        }
        VoiceTransition::Moved { from, to } => {
            // 퇴장 쪽을 먼저 처리해도 삭제는 타이머 뒤로 미뤄지므로 순서 문제가 없다.
            // 퇴장 처리 실패가 입장(생성) 처리를 막아서는 안 된다.
            if let Err(e) = handle_leave(gateway, manager, config, guild_id, from).await {
                warn!("퇴장 처리 실패 (채널 {from}): {e}");
            }
            handle_join(gateway, manager, config, guild_id, user_id, to).await
        }
        VoiceTransition::NoOp => Ok(()),
    }
}

async fn handle_join<G>(
    gateway: &Arc<G>,
    manager: &VoiceManager,
    config: &VoiceConfig,
    guild_id: GuildId,
    user_id: UserId,
    channel: ChannelId,
) -> Result<(), VoiceError>
where
    G: VoiceGateway + ?Sized + 'static,
{
    if state::is_trigger(manager, guild_id, channel).await {
        let created =
            provision::on_trigger_join(gateway, manager, guild_id, user_id, config.delete_delay)
                .await?;
        debug!("통화방 생성됨: {created} (요청자 {user_id}, 길드 {guild_id})");
        return Ok(());
    }

    if state::is_tracked(manager, guild_id, channel).await {
        state::cancel_pending(manager, guild_id, channel).await;
    }
    Ok(())
}

async fn handle_leave<G>(
    gateway: &Arc<G>,
    manager: &VoiceManager,
    config: &VoiceConfig,
    guild_id: GuildId,
    channel: ChannelId,
) -> Result<(), VoiceError>
where
    G: VoiceGateway + ?Sized + 'static,
{
    if !state::is_tracked(manager, guild_id, channel).await
        || state::is_trigger(manager, guild_id, channel).await
    {
        return Ok(());
    }

    let count = gateway.member_count(guild_id, channel).await?;
    if count == 0 {
        reaper::schedule_delete(gateway, manager, guild_id, channel, config.delete_delay).await;
    }
    Ok(())
}

/// 종료 전 정리. 대기 중인 삭제 타이머를 전부 취소한다.
/// 남은 빈 채널은 다음 기동 시 부트스트랩이 정리하므로 여기서 강제 삭제하지 않는다.
pub async fn shutdown(manager: &VoiceManager) {
    let mut guilds = manager.write().await;
    let mut canceled = 0usize;
    for guild in guilds.values_mut() {
        for rec in guild.tracked.values_mut() {
            if let Some(handle) = rec.pending_delete.take() {
                handle.abort();
                canceled += 1;
            }
        }
    }
    if canceled > 0 {
        warn!("종료: 삭제 타이머 {canceled}개 취소, 빈 채널은 다음 기동 시 정리됩니다");
    }
}
