//! Main runtime: poll loop, scheduler and shutdown.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use yabot_runtime::BotRuntime;
//!
//! // Loads yabot.toml from the current directory plus YABOT_* / YANDEX_BOT_API_KEY
//! let runtime = BotRuntime::builder()
//!     .router(menu_router())
//!     .build()?;
//!
//! // Runs until Ctrl+C or SIGTERM
//! runtime.run().await?;
//! ```
//!
//! # Loop
//!
//! ```text
//! ┌──────────── stop requested? ◀──────────────────────────────┐
//! │                  │ no                                      │
//! │                  ▼                                         │
//! │   Scheduler::ready (a slot is free, woken by stop)         │
//! │                  │                                         │
//! │                  ▼                                         │
//! │   Poller::fetch ─▶ parse ─▶ Scheduler::submit (per update) │
//! │                  │                                         │
//! │                  ▼                                         │
//! │   sleep(active | idle interval, woken by stop) ─▶ reap ────┘
//! │ yes
//! ▼
//! Scheduler::shutdown(timeout) ─▶ "Bot stopped"
//! ```

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{BotConfig, ConfigLoader, validate_config, validate_runtime_settings};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;
use crate::poller::Poller;
use crate::scheduler::Scheduler;
use yabot_core::{Bot, BoxedTransport, InboundEvent, Transport};
use yabot_framework::{Dispatcher, HandlerSpec, Middleware, MiddlewareChain, Registry, Router};
use yabot_transport::HttpTransport;

// =============================================================================
// StopHandle
// =============================================================================

/// Requests a graceful stop of a running [`BotRuntime`].
///
/// The poll loop exits at the start of its next iteration (an in-flight fetch
/// completes first), then running events are drained.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests the stop. Calling it again has no effect.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            info!("Stop requested");
        }
        self.token.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Completes once a stop was requested.
    pub async fn stopped(&self) {
        self.token.cancelled().await
    }
}

// =============================================================================
// BotRuntime
// =============================================================================

/// Polls the Bot API and dispatches every update under a concurrency limit.
pub struct BotRuntime {
    config: BotConfig,
    bot: Bot,
    dispatcher: Arc<Dispatcher>,
    stop: StopHandle,
    running: AtomicBool,
}

impl BotRuntime {
    /// Creates a runtime builder.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime talking to the HTTP Bot API described by `config`.
    ///
    /// Initializes logging from `config.logging` if no subscriber is set yet.
    pub fn from_config(config: BotConfig, registry: Registry) -> RuntimeResult<Self> {
        Self::builder().config(config).router(registry).build()
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// The bot handle shared by all handlers.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// A handle that stops [`run`](Self::run) or [`run_until`](Self::run_until).
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs until Ctrl+C, SIGTERM or [`StopHandle::stop`].
    pub async fn run(&self) -> RuntimeResult<()> {
        info!("Bot runtime is now running. Press Ctrl+C to stop.");
        self.run_until(wait_for_shutdown()).await
    }

    /// Runs until `shutdown` completes or [`StopHandle::stop`] is called.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RuntimeError::AlreadyRunning);
        }
        info!(
            max_concurrency = self.config.scheduler.max_concurrency,
            fetch_limit = self.config.api.fetch_limit,
            "Bot started"
        );

        let mut poller = Poller::new(self.bot.transport().clone(), self.config.api.fetch_limit);
        let mut scheduler = Scheduler::new(
            self.dispatcher.clone(),
            self.bot.clone(),
            &self.config.scheduler,
        );

        let watch_shutdown = async {
            tokio::select! {
                _ = shutdown => self.stop.stop(),
                _ = self.stop.stopped() => {}
            }
        };
        tokio::join!(
            self.poll_loop(&mut poller, &mut scheduler),
            watch_shutdown
        );

        let report = scheduler
            .shutdown(self.config.scheduler.shutdown_timeout())
            .await;
        self.running.store(false, Ordering::SeqCst);
        info!(
            completed = report.completed,
            failed = report.failed,
            cancelled = report.cancelled,
            cursor = poller.cursor(),
            "Bot stopped"
        );
        Ok(())
    }

    async fn poll_loop(&self, poller: &mut Poller, scheduler: &mut Scheduler) {
        let polling = &self.config.polling;

        while !self.stop.is_stopped() {
            // Nothing is fetched, and so acknowledged, while every slot is busy.
            tokio::select! {
                biased;
                _ = self.stop.stopped() => break,
                ready = scheduler.ready() => {
                    if ready.is_err() {
                        break;
                    }
                }
            }

            let updates = poller.fetch().await;
            let received = !updates.is_empty();

            for raw in updates {
                let event = match InboundEvent::from_raw(&raw) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(update_id = ?raw.get("update_id"), error = %e, "Skipping malformed update");
                        continue;
                    }
                };
                let update_id = event.update_id();
                if let Err(e) = scheduler.submit(event) {
                    warn!(update_id, error = %e, "Update not dispatched");
                }
            }

            let pause = if received {
                polling.active_interval()
            } else {
                polling.idle_interval()
            };
            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = self.stop.stopped() => {}
            }
            scheduler.reap();
        }
        debug!("Poll loop exited");
    }
}

/// Waits for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
                info!("Received Ctrl+C, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c().await;
        info!("Received Ctrl+C, shutting down");
    }
}

/// Completes on Ctrl+C. If the handler cannot be installed, never completes.
async fn ctrl_c() {
    if let Err(e) = signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for [`BotRuntime`].
///
/// ```rust,ignore
/// let runtime = BotRuntime::builder()
///     .config_file("config/yabot.toml")
///     .profile("production")
///     .middleware(log_timing)
///     .router(menu_router())
///     .router(name_router())
///     .build()?;
/// ```
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
    config: Option<BotConfig>,
    registry: Registry,
    middleware: MiddlewareChain,
    transport: Option<BoxedTransport>,
    init_logging: bool,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
            config: None,
            registry: Registry::new(),
            middleware: MiddlewareChain::new(),
            transport: None,
            init_logging: true,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Disables environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Uses `config` as is instead of loading one.
    pub fn config(mut self, config: BotConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds one handler.
    pub fn handler(mut self, spec: HandlerSpec) -> Self {
        self.registry.add(spec);
        self
    }

    /// Appends a router's handlers.
    pub fn router(mut self, router: Router) -> Self {
        self.registry.include(router);
        self
    }

    /// Appends a middleware; the first one added is outermost.
    pub fn middleware<M: Middleware>(mut self, middleware: M) -> Self {
        self.middleware.push(middleware);
        self
    }

    /// Uses `transport` instead of the HTTP Bot API. `api` settings other
    /// than `fetch_limit` are then ignored.
    pub fn transport<T: Transport>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Leaves logging setup to the caller.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    /// Loads and validates the configuration and builds the runtime.
    pub fn build(self) -> RuntimeResult<BotRuntime> {
        let config = match self.config {
            Some(config) => config,
            None => self.config_loader.load()?,
        };

        if self.init_logging {
            logging::init_from_config(&config.logging);
        }

        let transport = match self.transport {
            Some(transport) => {
                validate_runtime_settings(&config)?;
                transport
            }
            None => {
                validate_config(&config)?;
                Arc::new(HttpTransport::new(config.api.to_transport_config())?) as BoxedTransport
            }
        };

        let dispatcher = Dispatcher::builder()
            .router(self.registry)
            .middleware_chain(self.middleware)
            .replies(config.replies.clone())
            .build();

        info!(
            log_level = %config.logging.level,
            dispatcher = ?dispatcher,
            "Runtime initialized from configuration"
        );

        Ok(BotRuntime {
            bot: Bot::from_transport(transport),
            dispatcher: Arc::new(dispatcher),
            config,
            stop: StopHandle::new(),
            running: AtomicBool::new(false),
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::config::ConfigError;
    use yabot_core::testing::RecordingTransport;
    use yabot_framework::{FsmContext, Message, on_button, on_message, on_text};

    fn runtime(transport: &RecordingTransport, router: Router) -> BotRuntime {
        BotRuntime::builder()
            .config(BotConfig::default())
            .transport(transport.clone())
            .without_logging()
            .router(router)
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_dispatches_and_stops() {
        let transport = RecordingTransport::new();
        transport.push_batch(vec![
            json!({"update_id": 1, "from": {"login": "alice"}, "text": "/start"}),
            json!({"update_id": 2, "text": "no sender"}),
            json!({"update_id": 3, "from": {"login": "bob"}, "callback_data": {"cmd": "/ask_name"}}),
        ]);
        let router = Router::new()
            .with(on_text("/start").handler(|fsm: FsmContext| async move {
                fsm.set(Some("main"));
                "Hello! Choose an option:"
            }))
            .with(on_button("ask_name").handler(|fsm: FsmContext| async move {
                fsm.set(Some("wait_name"));
                "Enter your name:"
            }));
        let rt = runtime(&transport, router);

        rt.run_until(tokio::time::sleep(Duration::from_secs(3)))
            .await
            .unwrap();

        let mut texts = transport.sent_texts();
        texts.sort();
        assert_eq!(texts, ["Enter your name:", "Hello! Choose an option:"]);
        assert_eq!(rt.bot().state("alice").map(|s| s.to_string()).as_deref(), Some("main"));
        assert_eq!(
            rt.bot().state("bob").map(|s| s.to_string()).as_deref(),
            Some("wait_name")
        );

        let offsets = transport.offsets();
        assert_eq!(offsets[0], 1);
        assert!(offsets[1..].iter().all(|&o| o == 4));
        assert!(!rt.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_repoll_after_updates_then_idle() {
        let transport = RecordingTransport::new();
        transport.push_batch(vec![json!({"update_id": 1, "from": {"login": "a"}, "text": "x"})]);
        let rt = runtime(&transport, Router::new());

        // t=0 fetch, t=0.2 fetch (empty), t=1.2 fetch (empty), stop at t=1.5
        rt.run_until(tokio::time::sleep(Duration::from_millis(1500)))
            .await
            .unwrap();

        assert_eq!(transport.offsets(), [1, 2, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_from_handler() {
        let transport = RecordingTransport::new();
        transport.push_batch(vec![json!({"update_id": 1, "from": {"login": "a"}, "text": "/quit"})]);
        let stop = StopHandle::new();
        let handler_stop = stop.clone();

        let rt = runtime(
            &transport,
            Router::new().with(on_text("/quit").handler(move || {
                let stop = handler_stop.clone();
                async move {
                    stop.stop();
                    "bye"
                }
            })),
        );
        let rt_stop = rt.stop_handle();

        rt.run_until(async move { stop.stopped().await })
            .await
            .unwrap();

        assert!(rt_stop.is_stopped());
        assert_eq!(transport.sent_texts(), ["bye"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_events_drain_before_stop() {
        let transport = RecordingTransport::new();
        transport.push_batch(vec![json!({"update_id": 1, "from": {"login": "bob"}, "text": "Bob"})]);
        let rt = runtime(
            &transport,
            Router::new().with(on_message().handler(|msg: Message| async move {
                tokio::time::sleep(Duration::from_secs(5)).await;
                format!("Nice to meet you, {}!", msg.text)
            })),
        );

        rt.run_until(tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();

        assert_eq!(transport.sent_texts(), ["Nice to meet you, Bob!"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetched_updates_survive_stop_while_slots_busy() {
        let transport = RecordingTransport::new();
        transport.push_batch(vec![
            json!({"update_id": 1, "from": {"login": "alice"}, "text": "one"}),
            json!({"update_id": 2, "from": {"login": "bob"}, "text": "two"}),
        ]);
        let mut config = BotConfig::default();
        config.scheduler.max_concurrency = 1;
        let rt = BotRuntime::builder()
            .config(config)
            .transport(transport.clone())
            .without_logging()
            .router(Router::new().with(on_message().handler(|msg: Message| async move {
                tokio::time::sleep(Duration::from_secs(2)).await;
                format!("done {}", msg.text)
            })))
            .build()
            .unwrap();

        rt.run_until(tokio::time::sleep(Duration::from_millis(100)))
            .await
            .unwrap();

        assert_eq!(transport.sent_texts(), ["done one", "done two"]);
        assert_eq!(transport.offsets(), [1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_keep_loop_alive() {
        let transport = RecordingTransport::new();
        transport.push_error(yabot_core::TransportError::Timeout);
        transport.push_batch(vec![json!({"update_id": 9, "from": {"login": "c"}, "text": "xyz"})]);
        let rt = runtime(&transport, Router::new());

        rt.run_until(tokio::time::sleep(Duration::from_secs(2)))
            .await
            .unwrap();

        assert_eq!(transport.offsets()[..2], [1, 1]);
        assert_eq!(
            transport.sent_texts(),
            [rt.config().replies.unknown_text.clone()]
        );
    }

    #[test]
    fn test_http_runtime_requires_token() {
        let result = BotRuntime::builder()
            .config(BotConfig::default())
            .without_logging()
            .build();
        assert!(matches!(
            result,
            Err(RuntimeError::Config(ConfigError::MissingField { .. }))
        ));
    }

    #[test]
    fn test_custom_transport_still_checks_scheduler() {
        let mut config = BotConfig::default();
        config.scheduler.max_concurrency = 0;
        let result = BotRuntime::builder()
            .config(config)
            .transport(RecordingTransport::new())
            .without_logging()
            .build();
        assert!(result.is_err());
    }
}
