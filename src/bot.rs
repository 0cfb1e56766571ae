//! Bot main loop: receives messages from every channel and feeds them to
//! one sequential worker per user.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::channels::{ChannelManager, IncomingMessage, OutgoingResponse, StatusUpdate};
use crate::config::BotConfig;
use crate::error::{ConfigError, Error};
use crate::plan::{LlmPlanGenerator, PlanConfig, PlanGenerator};
use crate::registration::{ConversationEngine, RegistrationRouteState, SessionStore};
use crate::store::{LibSqlBackend, ProfileStore};

/// How long shutdown waits for in-flight turns.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Queue and task serving one user.
struct Worker {
    tx: mpsc::UnboundedSender<IncomingMessage>,
    handle: JoinHandle<()>,
    last_seen: Instant,
}

/// Storage, sessions and engine shared by the bot loop and the admin routes.
pub struct Services {
    pub store: Arc<dyn ProfileStore>,
    pub sessions: Arc<SessionStore>,
    pub engine: Arc<ConversationEngine>,
}

impl Services {
    /// Build the plan generator, open the database and wire the engine.
    pub async fn open(config: &BotConfig, plan: Option<PlanConfig>) -> Result<Self, Error> {
        let plan = plan.ok_or_else(|| ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".into()))?;
        let generator = Arc::new(LlmPlanGenerator::new(plan)?);
        let store = Arc::new(LibSqlBackend::new_local(&config.db_path).await?);
        Ok(Self::with(store, generator))
    }

    pub fn with(store: Arc<dyn ProfileStore>, generator: Arc<dyn PlanGenerator>) -> Self {
        let sessions = Arc::new(SessionStore::new());
        let engine = Arc::new(ConversationEngine::new(
            Arc::clone(&sessions),
            Arc::clone(&store),
            generator,
        ));
        Self {
            store,
            sessions,
            engine,
        }
    }

    pub fn route_state(&self) -> RegistrationRouteState {
        RegistrationRouteState {
            sessions: Arc::clone(&self.sessions),
            store: Arc::clone(&self.store),
        }
    }
}

/// The running bot.
pub struct Bot {
    config: BotConfig,
    engine: Arc<ConversationEngine>,
    channels: Arc<ChannelManager>,
}

impl Bot {
    pub fn new(config: BotConfig, engine: Arc<ConversationEngine>, channels: ChannelManager) -> Self {
        Self {
            config,
            engine,
            channels: Arc::new(channels),
        }
    }

    /// Run until Ctrl+C or until every channel stream ends.
    pub async fn run(self) -> Result<(), Error> {
        let mut message_stream = self.channels.start_all().await?;

        // Spawn session pruning task
        let sessions = Arc::clone(self.engine.sessions());
        let idle_timeout = self.config.session_idle_timeout;
        let prune_interval = self.config.prune_interval;
        let pruning_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(prune_interval);
            interval.tick().await; // Skip immediate first tick
            loop {
                interval.tick().await;
                let removed = sessions.prune_stale(idle_timeout).await;
                if removed > 0 {
                    tracing::info!(removed, "Pruned idle sessions");
                }
            }
        });

        let mut workers: HashMap<i64, Worker> = HashMap::new();
        let mut sweep = tokio::time::interval(prune_interval);
        sweep.tick().await;

        tracing::info!(channels = ?self.channels.names(), "Bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                _ = sweep.tick() => {
                    evict_idle_workers(&mut workers, idle_timeout);
                    continue;
                }
                msg = message_stream.next() => {
                    match msg {
                        Some(m) => m,
                        None => {
                            tracing::info!("All channel streams ended, shutting down...");
                            break;
                        }
                    }
                }
            };

            let Some(user_id) = message.numeric_user_id() else {
                tracing::warn!(
                    channel = %message.channel,
                    user = %message.user_id,
                    "Dropping message from non-numeric user id"
                );
                continue;
            };

            self.dispatch(&mut workers, user_id, message);
        }

        // Cleanup
        tracing::info!("Bot shutting down...");
        pruning_handle.abort();
        drain_workers(workers).await;
        self.channels.shutdown_all().await?;

        Ok(())
    }

    /// Queue a message on the user's worker, spawning one if needed.
    fn dispatch(&self, workers: &mut HashMap<i64, Worker>, user_id: i64, message: IncomingMessage) {
        let message = match workers.get_mut(&user_id) {
            Some(worker) => match worker.tx.send(message) {
                Ok(()) => {
                    worker.last_seen = Instant::now();
                    return;
                }
                // The worker is gone; take the message back and respawn.
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(
            user_id,
            rx,
            Arc::clone(&self.engine),
            Arc::clone(&self.channels),
        ));
        tracing::debug!(user_id, "Spawned user worker");

        if tx.send(message).is_err() {
            tracing::error!(user_id, "New user worker rejected its first message");
        }
        workers.insert(
            user_id,
            Worker {
                tx,
                handle,
                last_seen: Instant::now(),
            },
        );
    }
}

/// Process one user's messages strictly in arrival order.
async fn run_worker(
    user_id: i64,
    mut rx: mpsc::UnboundedReceiver<IncomingMessage>,
    engine: Arc<ConversationEngine>,
    channels: Arc<ChannelManager>,
) {
    while let Some(message) = rx.recv().await {
        let _ = channels
            .send_status(
                &message.channel,
                StatusUpdate::Thinking("Processing...".into()),
                &message.metadata,
            )
            .await;

        let reply = engine.handle(user_id, &message.content).await;
        let response = OutgoingResponse::text(reply.text).with_buttons(reply.buttons);
        if let Err(e) = channels.respond(&message, response).await {
            tracing::error!(user_id, channel = %message.channel, error = %e, "Failed to send reply");
        }
    }
    tracing::debug!(user_id, "User worker finished");
}

/// Drop the queues of workers idle longer than `idle_timeout`. Each worker
/// finishes whatever is still queued and exits.
fn evict_idle_workers(workers: &mut HashMap<i64, Worker>, idle_timeout: Duration) -> usize {
    let before = workers.len();
    workers.retain(|_, w| w.last_seen.elapsed() < idle_timeout && !w.handle.is_finished());
    let evicted = before - workers.len();
    if evicted > 0 {
        tracing::debug!(evicted, "Evicted idle user workers");
    }
    evicted
}

/// Close every queue and wait for in-flight turns to finish.
async fn drain_workers(workers: HashMap<i64, Worker>) {
    let handles: Vec<JoinHandle<()>> = workers.into_values().map(|w| w.handle).collect();
    let pending = handles.len();
    if tokio::time::timeout(DRAIN_TIMEOUT, futures::future::join_all(handles))
        .await
        .is_err()
    {
        tracing::warn!(pending, "Timed out waiting for user workers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::channels::manager::tests::ScriptedChannel;
    use crate::error::PlanError;
    use crate::registration::model::{UserProfile, sample_profile};
    use crate::registration::{StateTag, prompts};

    /// Generator that takes a while, so queued messages pile up behind it.
    struct SlowGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl PlanGenerator for SlowGenerator {
        async fn generate(&self, profile: &UserProfile) -> Result<String, PlanError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(format!("План #{n} для {}", profile.name))
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn engine_with(store: Arc<LibSqlBackend>) -> Arc<ConversationEngine> {
        let generator = Arc::new(SlowGenerator {
            calls: AtomicUsize::new(0),
        });
        Services::with(store, generator).engine
    }

    async fn engine() -> Arc<ConversationEngine> {
        engine_with(Arc::new(LibSqlBackend::new_memory().await.unwrap()))
    }

    fn script(user: &str, inputs: &[&str]) -> Vec<IncomingMessage> {
        inputs
            .iter()
            .map(|text| IncomingMessage::new("scripted", user, *text))
            .collect()
    }

    fn config_at(dir: &tempfile::TempDir) -> BotConfig {
        BotConfig {
            db_path: dir.path().join("data").join("bot.db"),
            ..BotConfig::default()
        }
    }

    #[tokio::test]
    async fn services_require_plan_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Services::open(&config_at(&dir), None).await.err().unwrap();
        assert!(
            matches!(err, Error::Config(ConfigError::MissingEnvVar(ref key)) if key == "ANTHROPIC_API_KEY"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn services_open_database_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_at(&dir);
        let services = Services::open(&config, Some(PlanConfig::new("k")))
            .await
            .unwrap();
        assert!(config.db_path.exists());
        assert_eq!(services.store.count().await.unwrap(), 0);

        services.engine.handle(3, "/start").await;
        assert_eq!(services.route_state().sessions.len().await, 1);
    }

    #[tokio::test]
    async fn services_report_unusable_database_path() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let config = BotConfig {
            db_path: blocker.join("bot.db"),
            ..BotConfig::default()
        };

        let err = Services::open(&config, Some(PlanConfig::new("k")))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Database(_)), "{err}");
    }

    #[tokio::test]
    async fn registers_and_replies_in_order() {
        let mut inbox = script(
            "10",
            &[
                "/start",
                "Анна",
                "30",
                "ж",
                "65",
                "170",
                "нет",
                "Похудение",
                "3 месяца",
                "Вперёд к цели",
                "/mydata",
            ],
        );
        inbox.extend(script("20", &["/start", "Борис"]));

        let channel = ScriptedChannel::new("scripted", inbox);
        let sent = channel.sent.clone();
        let mut channels = ChannelManager::new();
        channels.add(Box::new(channel));

        let engine = engine().await;
        Bot::new(BotConfig::default(), Arc::clone(&engine), channels)
            .run()
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        let for_user = |id: &str| -> Vec<String> {
            sent.iter()
                .filter(|(user, _)| user == id)
                .map(|(_, r)| r.content.clone())
                .collect()
        };

        let anna = for_user("10");
        assert_eq!(anna.len(), 11);
        assert_eq!(anna[0], prompts::greeting(10));
        assert_eq!(anna[1], prompts::ASK_AGE);
        assert!(anna[8].starts_with("✅ Регистрация завершена!"));
        assert_eq!(anna[9], "План #0 для Анна");
        assert!(anna[10].starts_with("📋 Ваши данные:"));

        let boris = for_user("20");
        assert_eq!(boris, vec![prompts::greeting(20), prompts::ASK_AGE.to_string()]);

        assert_eq!(
            engine.sessions().get(20).await.map(|s| s.state),
            Some(StateTag::AwaitingAge)
        );
    }

    #[tokio::test]
    async fn queued_messages_wait_for_slow_plan() {
        let store = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        store.save(&sample_profile(5)).await.unwrap();
        let engine = engine_with(store);

        let channel = ScriptedChannel::new(
            "scripted",
            script("5", &["/regenerate", "/regenerate", "/delete"]),
        );
        let sent = channel.sent.clone();
        let mut channels = ChannelManager::new();
        channels.add(Box::new(channel));

        Bot::new(BotConfig::default(), engine, channels)
            .run()
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        let texts: Vec<&str> = sent.iter().map(|(_, r)| r.content.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "План #0 для Анна",
                "План #1 для Анна",
                prompts::ASK_DELETE_CONFIRMATION,
            ]
        );
        assert_eq!(sent[2].1.buttons.len(), 2);
    }

    #[tokio::test]
    async fn non_numeric_senders_are_dropped() {
        let channel = ScriptedChannel::new(
            "scripted",
            vec![
                IncomingMessage::new("scripted", "alice", "/start"),
                IncomingMessage::new("scripted", "3", "/start"),
            ],
        );
        let sent = channel.sent.clone();
        let mut channels = ChannelManager::new();
        channels.add(Box::new(channel));

        Bot::new(BotConfig::default(), engine().await, channels)
            .run()
            .await
            .unwrap();

        let sent = sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "3");
    }

    #[tokio::test]
    async fn idle_workers_are_evicted() {
        let engine = engine().await;
        let channels = Arc::new(ChannelManager::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_worker(1, rx, engine, channels));

        let mut workers = HashMap::new();
        workers.insert(
            1,
            Worker {
                tx,
                handle,
                last_seen: Instant::now() - Duration::from_secs(120),
            },
        );

        assert_eq!(evict_idle_workers(&mut workers, Duration::from_secs(3600)), 0);
        assert_eq!(evict_idle_workers(&mut workers, Duration::from_secs(60)), 1);
        assert!(workers.is_empty());
    }
}
