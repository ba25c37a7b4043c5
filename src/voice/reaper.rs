use std::sync::Arc;
use std::time::Duration;

use serenity::model::id::{ChannelId, GuildId};
use tracing::{debug, info, warn};

use super::gateway::{VoiceError, VoiceGateway};
use super::state::VoiceManager;

/// 빈 통화방 삭제 예약. `delay` 뒤에도 비어있으면 삭제한다.
/// 이미 타이머가 걸려있거나 추적 대상이 아니면 아무 일도 하지 않는다.
pub async fn schedule_delete<G>(
    gateway: &Arc<G>,
    manager: &VoiceManager,
    guild_id: GuildId,
    channel_id: ChannelId,
    delay: Duration,
) where
    G: VoiceGateway + ?Sized + 'static,
{
    let mut guilds = manager.write().await;
    let Some(rec) = guilds
        .get_mut(&guild_id)
        .and_then(|g| g.tracked.get_mut(&channel_id))
    else {
        return;
    };
    if rec.pending_delete.is_some() {
        return;
    }

    let gateway = Arc::clone(gateway);
    let manager = manager.clone();
    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        fire(&gateway, &manager, guild_id, channel_id).await;
    });
    rec.pending_delete = Some(task.abort_handle());
    debug!("빈 채널 삭제 예약: {channel_id} ({delay:?} 뒤)");
}

/// 타이머 만료. 예약 시점 상태를 믿지 않고 현재 인원을 다시 확인한다.
/// 만료와 입장이 동시에 일어난 경쟁은 여기서 닫힌다.
async fn fire<G>(gateway: &Arc<G>, manager: &VoiceManager, guild_id: GuildId, channel_id: ChannelId)
where
    G: VoiceGateway + ?Sized,
{
    let mut guilds = manager.write().await;
    let Some(guild) = guilds.get_mut(&guild_id) else {
        return;
    };
    let Some(rec) = guild.tracked.get_mut(&channel_id) else {
        return;
    };

    let count = match gateway.member_count(guild_id, channel_id).await {
        Ok(n) => n,
        Err(VoiceError::NotFound) => {
            // 채널이 밖에서 이미 지워짐. 기록만 정리한다.
            let rec = guild.tracked.remove(&channel_id).unwrap();
            guild.pool.release(&rec.name);
            return;
        }
        Err(e) => {
            warn!("인원 확인 실패, 삭제 보류 ({channel_id}): {e}");
            rec.pending_delete = None;
            return;
        }
    };

    if count > 0 {
        // 만료 직전에 누가 들어옴. 타이머 핸들만 지우고 채널은 유지.
        debug!("삭제 취소: {channel_id}에 인원이 돌아옴");
        rec.pending_delete = None;
        return;
    }

    match gateway.delete_channel(channel_id, "빈 통화방 자동 정리").await {
        Ok(()) | Err(VoiceError::NotFound) => {
            let rec = guild.tracked.remove(&channel_id).unwrap();
            guild.pool.release(&rec.name);
            info!("빈 통화방 삭제: {} ({channel_id})", rec.name);
        }
        Err(e) => {
            // 추적은 유지한 채 핸들만 비워서 다음 빈 전이 때 재시도되게 한다
            warn!("통화방 삭제 실패 ({channel_id}): {e}");
            rec.pending_delete = None;
        }
    }
}
