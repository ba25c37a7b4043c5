use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use maru_bot::voice::gateway::{VoiceChannelInfo, VoiceError, VoiceGateway};
use maru_bot::voice::state::{self, VoiceManager};
use maru_bot::voice::{bootstrap, handle_transition, VoiceConfig, VoiceTransition};
use serenity::model::id::{ChannelId, GuildId, UserId};

const GUILD: GuildId = GuildId::new(1);
const TRIGGER: ChannelId = ChannelId::new(10);
const MEMBER: UserId = UserId::new(7);

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Create {
        name: String,
        category: Option<ChannelId>,
    },
    CreatePlain(String),
    Delete(ChannelId),
    Move(UserId, ChannelId),
    SetPosition(ChannelId, u16),
}

/// Scriptable gateway double: records every call, serves membership counts
/// from a table the test mutates to simulate joins/leaves.
struct MockGateway {
    calls: Mutex<Vec<Call>>,
    counts: Mutex<HashMap<ChannelId, usize>>,
    listing: Mutex<Vec<VoiceChannelInfo>>,
    category: Option<ChannelId>,
    next_id: Mutex<u64>,
    fail_create: Mutex<bool>,
    fail_create_in_category: bool,
    fail_move: Mutex<bool>,
}

impl MockGateway {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            counts: Mutex::new(HashMap::new()),
            listing: Mutex::new(vec![trigger_info()]),
            category: None,
            next_id: Mutex::new(100),
            fail_create: Mutex::new(false),
            fail_create_in_category: false,
            fail_move: Mutex::new(false),
        }
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn delete_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Delete(_)))
            .count()
    }

    fn set_count(&self, channel: ChannelId, count: usize) {
        self.counts.lock().unwrap().insert(channel, count);
    }
}

fn trigger_info() -> VoiceChannelInfo {
    VoiceChannelInfo {
        id: TRIGGER,
        name: "로비".to_string(),
        position: 0,
        member_count: 0,
    }
}

fn test_config(catalog: &[&str], delay_ms: u64) -> VoiceConfig {
    VoiceConfig {
        trigger_name: "로비".to_string(),
        category_name: None,
        delete_delay: Duration::from_millis(delay_ms),
        catalog: catalog.iter().map(|s| s.to_string()).collect(),
    }
}

#[async_trait]
impl VoiceGateway for MockGateway {
    async fn create_voice_channel(
        &self,
        _guild_id: GuildId,
        name: &str,
        category_id: Option<ChannelId>,
        _owner_id: UserId,
    ) -> Result<ChannelId, VoiceError> {
        self.record(Call::Create {
            name: name.to_string(),
            category: category_id,
        });
        if *self.fail_create.lock().unwrap() {
            return Err(VoiceError::Permission("mock: create denied".into()));
        }
        if self.fail_create_in_category && category_id.is_some() {
            return Err(VoiceError::Permission("mock: category denied".into()));
        }
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Ok(ChannelId::new(*next))
    }

    async fn create_plain_voice_channel(
        &self,
        _guild_id: GuildId,
        name: &str,
        _category_id: Option<ChannelId>,
    ) -> Result<ChannelId, VoiceError> {
        self.record(Call::CreatePlain(name.to_string()));
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        Ok(ChannelId::new(*next))
    }

    async fn delete_channel(&self, channel_id: ChannelId, _reason: &str) -> Result<(), VoiceError> {
        self.record(Call::Delete(channel_id));
        Ok(())
    }

    async fn set_channel_position(
        &self,
        channel_id: ChannelId,
        position: u16,
    ) -> Result<(), VoiceError> {
        self.record(Call::SetPosition(channel_id, position));
        Ok(())
    }

    async fn move_member(
        &self,
        _guild_id: GuildId,
        user_id: UserId,
        channel_id: ChannelId,
    ) -> Result<(), VoiceError> {
        if *self.fail_move.lock().unwrap() {
            return Err(VoiceError::NotFound);
        }
        self.record(Call::Move(user_id, channel_id));
        Ok(())
    }

    async fn member_count(
        &self,
        _guild_id: GuildId,
        channel_id: ChannelId,
    ) -> Result<usize, VoiceError> {
        Ok(self
            .counts
            .lock()
            .unwrap()
            .get(&channel_id)
            .copied()
            .unwrap_or(0))
    }

    async fn list_voice_channels(
        &self,
        _guild_id: GuildId,
    ) -> Result<Vec<VoiceChannelInfo>, VoiceError> {
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn find_category(
        &self,
        _guild_id: GuildId,
        _name: &str,
    ) -> Result<Option<ChannelId>, VoiceError> {
        Ok(self.category)
    }
}

async fn attach(gateway: &Arc<MockGateway>, manager: &VoiceManager, config: &VoiceConfig) {
    bootstrap::attach_guild(gateway.as_ref(), manager, config, GUILD)
        .await
        .unwrap();
}

async fn pool_in_use(manager: &VoiceManager) -> usize {
    manager.read().await.get(&GUILD).unwrap().pool.in_use_count()
}

/// Provisions one channel through the trigger and returns its id.
async fn provision_one(
    gateway: &Arc<MockGateway>,
    manager: &VoiceManager,
    config: &VoiceConfig,
) -> ChannelId {
    handle_transition(
        gateway,
        manager,
        config,
        GUILD,
        MEMBER,
        VoiceTransition::Joined { channel: TRIGGER },
    )
    .await
    .unwrap();

    let created = gateway
        .calls()
        .into_iter()
        .rev()
        .find_map(|c| match c {
            Call::Move(_, ch) => Some(ch),
            _ => None,
        })
        .expect("no move call recorded");
    created
}

#[tokio::test]
async fn test_scenario_a_create_then_reap_after_debounce() {
    // Member joins trigger -> channel created with a catalog name, member
    // moved in. Member leaves -> channel empty, debounce elapses -> channel
    // deleted and the name returns to the pool.
    let gateway = Arc::new(MockGateway::new());
    let manager = state::new_voice_manager();
    let config = test_config(&["Alpha", "Beta"], 100);
    attach(&gateway, &manager, &config).await;

    let created = provision_one(&gateway, &manager, &config).await;
    gateway.set_count(created, 1);

    let calls = gateway.calls();
    let name = calls
        .iter()
        .find_map(|c| match c {
            Call::Create { name, .. } => Some(name.clone()),
            _ => None,
        })
        .unwrap();
    assert!(name == "Alpha" || name == "Beta");
    assert!(calls.contains(&Call::Move(MEMBER, created)));
    assert!(state::is_tracked(&manager, GUILD, created).await);
    assert_eq!(pool_in_use(&manager).await, 1);

    // Member leaves, channel is now empty
    gateway.set_count(created, 0);
    handle_transition(
        &gateway,
        &manager,
        &config,
        GUILD,
        MEMBER,
        VoiceTransition::Left { channel: created },
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(gateway.delete_count(), 1);
    assert!(!state::is_tracked(&manager, GUILD, created).await);
    assert_eq!(pool_in_use(&manager).await, 0);
}

#[tokio::test]
async fn test_scenario_b_rejoin_cancels_debounce() {
    // Member leaves then rejoins within the debounce window: the timer is
    // canceled, no delete call is ever issued, the record keeps its name.
    let gateway = Arc::new(MockGateway::new());
    let manager = state::new_voice_manager();
    let config = test_config(&["Alpha", "Beta"], 200);
    attach(&gateway, &manager, &config).await;

    let created = provision_one(&gateway, &manager, &config).await;

    gateway.set_count(created, 0);
    handle_transition(
        &gateway,
        &manager,
        &config,
        GUILD,
        MEMBER,
        VoiceTransition::Left { channel: created },
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    gateway.set_count(created, 1);
    handle_transition(
        &gateway,
        &manager,
        &config,
        GUILD,
        MEMBER,
        VoiceTransition::Joined { channel: created },
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(gateway.delete_count(), 0);
    assert!(state::is_tracked(&manager, GUILD, created).await);
    assert_eq!(pool_in_use(&manager).await, 1);
}

#[tokio::test]
async fn test_scenario_c_single_entry_catalog_reissues_name() {
    // Catalog of size 1: the second provisioning resets the pool and
    // reissues "Alpha" while the first channel is still alive. Documented
    // behavior of a single-entry catalog.
    let gateway = Arc::new(MockGateway::new());
    let manager = state::new_voice_manager();
    let config = test_config(&["Alpha"], 100);
    attach(&gateway, &manager, &config).await;

    provision_one(&gateway, &manager, &config).await;
    provision_one(&gateway, &manager, &config).await;

    let names: Vec<String> = gateway
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Create { name, .. } => Some(name),
            _ => None,
        })
        .collect();
    assert_eq!(names, vec!["Alpha", "Alpha"]);
}

#[tokio::test]
async fn test_idempotent_fire_when_member_returns_at_expiry() {
    // Membership comes back between scheduling and expiry without a gateway
    // event reaching the reaper in time. The fire-time re-check sees the
    // occupant, aborts the delete, and clears the stale handle.
    let gateway = Arc::new(MockGateway::new());
    let manager = state::new_voice_manager();
    let config = test_config(&["Alpha"], 100);
    attach(&gateway, &manager, &config).await;

    let created = provision_one(&gateway, &manager, &config).await;

    gateway.set_count(created, 0);
    handle_transition(
        &gateway,
        &manager,
        &config,
        GUILD,
        MEMBER,
        VoiceTransition::Left { channel: created },
    )
    .await
    .unwrap();

    // Simulate the racing rejoin: count flips before the timer fires
    gateway.set_count(created, 1);
    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(gateway.delete_count(), 0);
    assert!(state::is_tracked(&manager, GUILD, created).await);
    let pending = manager
        .read()
        .await
        .get(&GUILD)
        .unwrap()
        .tracked
        .get(&created)
        .unwrap()
        .pending_delete
        .is_some();
    assert!(!pending);
}

#[tokio::test]
async fn test_move_failure_leaves_channel_for_reaper() {
    // Member disconnects before the move lands: the channel stays tracked
    // and the normal empty-channel sweep removes it.
    let gateway = Arc::new(MockGateway::new());
    *gateway.fail_move.lock().unwrap() = true;
    let manager = state::new_voice_manager();
    let config = test_config(&["Alpha"], 100);
    attach(&gateway, &manager, &config).await;

    handle_transition(
        &gateway,
        &manager,
        &config,
        GUILD,
        MEMBER,
        VoiceTransition::Joined { channel: TRIGGER },
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(gateway.delete_count(), 1);
    let guilds = manager.read().await;
    assert!(guilds.get(&GUILD).unwrap().tracked.is_empty());
}

#[tokio::test]
async fn test_create_failure_burns_the_allocated_name() {
    // Creation failure never returns the name to the pool (known leak,
    // kept to avoid reuse races with a half-created channel).
    let gateway = Arc::new(MockGateway::new());
    *gateway.fail_create.lock().unwrap() = true;
    let manager = state::new_voice_manager();
    let config = test_config(&["Alpha", "Beta"], 100);
    attach(&gateway, &manager, &config).await;

    let result = handle_transition(
        &gateway,
        &manager,
        &config,
        GUILD,
        MEMBER,
        VoiceTransition::Joined { channel: TRIGGER },
    )
    .await;

    assert!(result.is_err());
    assert_eq!(pool_in_use(&manager).await, 1);
    let guilds = manager.read().await;
    assert!(guilds.get(&GUILD).unwrap().tracked.is_empty());
}

#[tokio::test]
async fn test_category_permission_falls_back_to_no_category() {
    // Creating inside the category is denied: the provisioner retries
    // without a category instead of failing the whole attempt.
    let mut mock = MockGateway::new();
    mock.category = Some(ChannelId::new(55));
    mock.fail_create_in_category = true;
    let gateway = Arc::new(mock);
    let manager = state::new_voice_manager();
    let mut config = test_config(&["Alpha"], 100);
    config.category_name = Some("통화방".to_string());
    attach(&gateway, &manager, &config).await;

    let created = provision_one(&gateway, &manager, &config).await;
    assert!(state::is_tracked(&manager, GUILD, created).await);

    let creates: Vec<Option<ChannelId>> = gateway
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Create { category, .. } => Some(category),
            _ => None,
        })
        .collect();
    assert_eq!(creates, vec![Some(ChannelId::new(55)), None]);
}

#[tokio::test]
async fn test_bootstrap_sweeps_stale_catalog_channels() {
    // Two empty channels with catalog names survive from a previous run,
    // one occupied catalog channel and one foreign channel do not get
    // touched, and neither does the trigger.
    let gateway = Arc::new(MockGateway::new());
    {
        let mut listing = gateway.listing.lock().unwrap();
        listing.push(VoiceChannelInfo {
            id: ChannelId::new(21),
            name: "Alpha".to_string(),
            position: 1,
            member_count: 0,
        });
        listing.push(VoiceChannelInfo {
            id: ChannelId::new(22),
            name: "Beta".to_string(),
            position: 2,
            member_count: 0,
        });
        listing.push(VoiceChannelInfo {
            id: ChannelId::new(23),
            name: "Beta".to_string(),
            position: 3,
            member_count: 2,
        });
        listing.push(VoiceChannelInfo {
            id: ChannelId::new(24),
            name: "다른 채널".to_string(),
            position: 4,
            member_count: 0,
        });
    }
    let manager = state::new_voice_manager();
    let config = test_config(&["Alpha", "Beta"], 100);
    attach(&gateway, &manager, &config).await;

    let deletes: Vec<ChannelId> = gateway
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            Call::Delete(ch) => Some(ch),
            _ => None,
        })
        .collect();
    assert_eq!(deletes, vec![ChannelId::new(21), ChannelId::new(22)]);
}

#[tokio::test]
async fn test_bootstrap_creates_missing_trigger_once() {
    // No trigger channel in the listing: attach creates it. A second attach
    // is a no-op (the guild is already installed).
    let gateway = Arc::new(MockGateway::new());
    gateway.listing.lock().unwrap().clear();
    let manager = state::new_voice_manager();
    let config = test_config(&["Alpha"], 100);

    attach(&gateway, &manager, &config).await;
    attach(&gateway, &manager, &config).await;

    let plains: Vec<Call> = gateway
        .calls()
        .into_iter()
        .filter(|c| matches!(c, Call::CreatePlain(_)))
        .collect();
    assert_eq!(plains, vec![Call::CreatePlain("로비".to_string())]);
}

#[tokio::test]
async fn test_shutdown_cancels_pending_timers() {
    // Shutdown drains timers instead of force-firing them: no delete call,
    // the stale channel is left for the next bootstrap pass.
    let gateway = Arc::new(MockGateway::new());
    let manager = state::new_voice_manager();
    let config = test_config(&["Alpha"], 150);
    attach(&gateway, &manager, &config).await;

    let created = provision_one(&gateway, &manager, &config).await;
    gateway.set_count(created, 0);
    handle_transition(
        &gateway,
        &manager,
        &config,
        GUILD,
        MEMBER,
        VoiceTransition::Left { channel: created },
    )
    .await
    .unwrap();

    maru_bot::voice::shutdown(&manager).await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(gateway.delete_count(), 0);
}
