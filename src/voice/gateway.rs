use async_trait::async_trait;
use serenity::model::id::{ChannelId, GuildId, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VoiceError {
    /// 설정 문제. 해당 작업을 중단하고 아무 것도 남기지 않는다.
    #[error("설정 오류: {0}")]
    Config(String),
    /// 권한 부족. 로그를 남기고 건너뛰거나 축소 동작한다.
    #[error("권한 부족: {0}")]
    Permission(String),
    /// 대상이 이미 사라짐. 동시성 상의 정상 결과로 취급한다.
    #[error("대상을 찾을 수 없습니다")]
    NotFound,
    /// 레이트리밋. 재시도는 HTTP 클라이언트 계층 책임.
    #[error("요청이 제한되었습니다")]
    RateLimited,
    #[error("API 오류: {0}")]
    Api(String),
}

/// 봇이 관리하는 음성 채널 목록 항목.
#[derive(Debug, Clone)]
pub struct VoiceChannelInfo {
    pub id: ChannelId,
    pub name: String,
    pub position: u16,
    pub member_count: usize,
}

/// 디스코드 API 호출 표면. 코어는 이 트레잇만 호출하고,
/// 실제 구현은 `discord::DiscordGateway`, 테스트는 목 구현을 쓴다.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// 음성 채널 생성. `owner`에게 관리 권한, @everyone에 보기/접속 권한을 부여한다.
    async fn create_voice_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        category_id: Option<ChannelId>,
        owner_id: UserId,
    ) -> Result<ChannelId, VoiceError>;

    /// 권한 오버라이드 없는 음성 채널 생성 (트리거 채널용).
    async fn create_plain_voice_channel(
        &self,
        guild_id: GuildId,
        name: &str,
        category_id: Option<ChannelId>,
    ) -> Result<ChannelId, VoiceError>;

    async fn delete_channel(&self, channel_id: ChannelId, reason: &str) -> Result<(), VoiceError>;

    async fn set_channel_position(
        &self,
        channel_id: ChannelId,
        position: u16,
    ) -> Result<(), VoiceError>;

    async fn move_member(
        &self,
        guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Result<(), VoiceError>;

    /// 현재 채널 인원 수. 리퍼가 삭제 직전 재확인에 쓴다.
    async fn member_count(&self, guild_id: GuildId, channel_id: ChannelId)
        -> Result<usize, VoiceError>;

    async fn list_voice_channels(
        &self,
        guild_id: GuildId,
    ) -> Result<Vec<VoiceChannelInfo>, VoiceError>;

    async fn find_category(
        &self,
        guild_id: GuildId,
        name: &str,
    ) -> Result<Option<ChannelId>, VoiceError>;
}
