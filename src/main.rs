use std::time::Duration;

use maru_bot::{afk, commands, config, events, levels, voice, Data};
use poise::serenity_prelude::{self as serenity, ChannelId};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    let intents = serenity::GatewayIntents::non_privileged() | serenity::GatewayIntents::GUILD_MEMBERS;

    let voice_manager = voice::state::new_voice_manager();
    let voice_config = config.voice_config();
    let afk_timeout = Duration::from_secs(config.afk_timeout_secs);
    let log_channel_id = config.log_channel_id.map(ChannelId::new);
    let db_path = config.db_path.clone();

    let setup_manager = voice_manager.clone();
    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: commands::all(),
            event_handler: |ctx, event, framework, data| {
                Box::pin(events::handler(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(move |ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;

                let level_db = levels::db::LevelDb::new(&db_path)?;
                tracing::info!("레벨 DB 초기화 완료: {db_path}");

                let afk_tracker = afk::new_afk_tracker();
                afk::spawn_sweep(ctx.clone(), afk_tracker.clone(), afk_timeout);

                tracing::info!("봇이 준비되었습니다!");
                Ok(Data {
                    voice_manager: setup_manager,
                    voice_config,
                    level_db,
                    cooldowns: levels::new_cooldown_map(),
                    voice_sessions: levels::new_voice_sessions(),
                    afk_tracker,
                    log_channel_id,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&config.discord_token, intents)
        .framework(framework)
        .await
        .expect("클라이언트 생성 실패");

    // ctrl-c 처리: 대기 중인 삭제 타이머를 정리한 뒤 샤드를 내린다
    let shard_manager = client.shard_manager.clone();
    let shutdown_manager = voice_manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("종료 신호 수신");
            voice::shutdown(&shutdown_manager).await;
            shard_manager.shutdown_all().await;
        }
    });

    if let Err(e) = client.start().await {
        tracing::error!("클라이언트 오류: {e}");
    }
}
