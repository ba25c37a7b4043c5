use std::sync::Arc;
use std::time::Duration;

use serenity::model::id::{ChannelId, GuildId, UserId};
use tracing::{debug, warn};

use super::gateway::{VoiceError, VoiceGateway};
use super::reaper;
use super::state::{TrackedChannel, VoiceManager};

/// 트리거 채널 입장 처리: 이름 할당 → 채널 생성 → 배치 → 등록 → 이동.
///
/// 생성 실패 시 할당된 이름은 반납하지 않는다. 반쯤 만들어진 채널과의
/// 이름 재사용 경쟁을 피하기 위한 것으로, 생성 실패가 반복되면 풀이
/// 줄어드는 알려진 누수가 있다 (로그로 관찰).
pub async fn on_trigger_join<G>(
    gateway: &Arc<G>,
    manager: &VoiceManager,
    guild_id: GuildId,
    user_id: UserId,
    delete_delay: Duration,
) -> Result<ChannelId, VoiceError>
where
    G: VoiceGateway + ?Sized + 'static,
{
    let (name, category_id, position) = {
        let mut guilds = manager.write().await;
        let guild = guilds.get_mut(&guild_id).ok_or_else(|| {
            VoiceError::Config(format!("attach되지 않은 길드입니다: {guild_id}"))
        })?;
        (
            guild.pool.allocate(),
            guild.category_id,
            guild.trigger_position.saturating_add(1),
        )
    };

    let channel_id = create_channel(gateway, guild_id, &name, category_id, user_id).await?;

    // 트리거 채널 바로 아래에 배치. 실패해도 외관 문제일 뿐이라 무시한다.
    if let Err(e) = gateway.set_channel_position(channel_id, position).await {
        warn!("채널 위치 조정 실패 ({name}): {e}");
    }

    {
        let mut guilds = manager.write().await;
        if let Some(guild) = guilds.get_mut(&guild_id) {
            guild.tracked.insert(
                channel_id,
                TrackedChannel {
                    channel_id,
                    owner_id: user_id,
                    name: name.clone(),
                    pending_delete: None,
                },
            );
        }
    }

    if let Err(e) = gateway.move_member(guild_id, user_id, channel_id).await {
        // 이동 전에 나간 경우. 채널은 빈 채로 남으므로 바로 리퍼 경로로 보낸다.
        match e {
            VoiceError::NotFound => debug!("요청자가 이미 나감, 빈 채널 정리 예약: {name}"),
            _ => warn!("멤버 이동 실패 ({name}): {e}"),
        }
        reaper::schedule_delete(gateway, manager, guild_id, channel_id, delete_delay).await;
    }

    Ok(channel_id)
}

/// 2단계 생성 전략: 카테고리를 지정해 시도하고, 권한 문제면 카테고리 없이 재시도.
async fn create_channel<G>(
    gateway: &Arc<G>,
    guild_id: GuildId,
    name: &str,
    category_id: Option<ChannelId>,
    owner_id: UserId,
) -> Result<ChannelId, VoiceError>
where
    G: VoiceGateway + ?Sized,
{
    match gateway
        .create_voice_channel(guild_id, name, category_id, owner_id)
        .await
    {
        Ok(id) => Ok(id),
        Err(VoiceError::Permission(msg)) if category_id.is_some() => {
            warn!("카테고리 내 생성 권한 없음, 카테고리 없이 재시도: {msg}");
            gateway
                .create_voice_channel(guild_id, name, None, owner_id)
                .await
        }
        Err(e) => Err(e),
    }
}
