//! Entry point - validates the player and framework, then wires everything
//!
//! ```text
//!  init_tracking(player, config)
//!        │
//!        ├─ validate player / framework ──(fail)──> warn!, None
//!        ├─ destroy any previous session on the player
//!        ├─ token = collector.build_uuid(); collector.configure(token, ..)
//!        ├─ player.set_tracking_handle(handle)
//!        ├─ LifecycleController::attach()
//!        └─ route the framework's instrumentation to the new session;
//!           the first attach decorates every Html5 source handler:
//!              handle_source ─> install RequestInterceptor
//!                            ─> inner.handle_source
//!                            ─> VariantWatcher on the owning player's session
//! ```
//!
//! Decorators and request hooks live as long as the framework does, so they
//! are installed once per framework and re-attaches only move the route.

use crate::collector::Collector;
use crate::config::{CollectorConfig, PlayheadFetcher, StateFetcher, TrackingConfig};
use crate::error::Error;
use crate::guard::best_effort;
use crate::host::{HostFramework, MediaSource, Player, SourceHandle, SourceHandler, Tech};
use crate::interceptor::RequestInterceptor;
use crate::lifecycle::{Dispatcher, LifecycleController, Session, SessionRoute, TrackingHandle};
use crate::reporter::RequestReporter;
use crate::resolver::{self, PlayerIdResolver};
use crate::scheduler::Scheduler;
use crate::snapshot;
use crate::types::Attributes;
use crate::variant::VariantWatcher;
use crate::Result;
use anyhow::Context;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::{debug, info, instrument, warn};

/// What the caller gets back from a successful attach
#[derive(Debug, Clone)]
pub struct TrackingApi {
    handle: TrackingHandle,
}

impl TrackingApi {
    /// Dispatch a custom event on the session
    pub fn dispatch(&self, event: &str, attributes: Attributes) {
        self.handle.dispatch(event, attributes);
    }
}

/// Instrumentation shared by every session attached through one framework
struct HostInstrumentation {
    host: Weak<dyn HostFramework>,
    route: SessionRoute,
    interceptor: RequestInterceptor,
    resolver: Rc<dyn PlayerIdResolver>,
    decorators: RefCell<Vec<Weak<InstrumentedSourceHandler>>>,
    watchers: RefCell<Vec<(String, Rc<VariantWatcher>)>>,
}

impl HostInstrumentation {
    fn serves(&self, host: &Rc<dyn HostFramework>) -> bool {
        self.host
            .upgrade()
            .is_some_and(|existing| std::ptr::addr_eq(Rc::as_ptr(&existing), Rc::as_ptr(host)))
    }

    fn is_decorator(&self, handler: &Rc<dyn SourceHandler>) -> bool {
        self.decorators
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .any(|decorator| std::ptr::addr_eq(Rc::as_ptr(&decorator), Rc::as_ptr(handler)))
    }

    /// Decorate every handler not already decorated
    fn decorate(self: &Rc<Self>, host: &Rc<dyn HostFramework>) -> usize {
        let mut decorated = 0;
        for (index, inner) in host.source_handlers().into_iter().enumerate() {
            if self.is_decorator(&inner) {
                continue;
            }
            let instrumented = Rc::new(InstrumentedSourceHandler {
                inner,
                shared: self.clone(),
            });
            self.decorators.borrow_mut().push(Rc::downgrade(&instrumented));
            host.set_source_handler(index, instrumented);
            decorated += 1;
        }
        decorated
    }

    fn install_interceptor(&self) -> anyhow::Result<()> {
        let host = self.host.upgrade().context("framework dropped")?;
        if let Some(hooks) = host.xhr_hooks() {
            self.interceptor.install_once(&hooks);
        }
        Ok(())
    }

    /// Watch the owning player's variants on that player's own session
    fn watch_variants(&self, handle: &dyn SourceHandle) -> anyhow::Result<()> {
        let id = self
            .resolver
            .resolve(handle)
            .with_context(|| format!("{} resolver found no player id", self.resolver.name()))?;
        let host = self.host.upgrade().context("framework dropped")?;
        let player = host
            .player(&id)
            .with_context(|| format!("no player registered as {id}"))?;
        let Some(tracking) = player.tracking_handle() else {
            debug!(player = %id, "Source loaded on an untracked player");
            return Ok(());
        };

        let mut watchers = self.watchers.borrow_mut();
        watchers.retain(|(player_id, watcher)| {
            let replaced = *player_id == id;
            if replaced {
                watcher.detach();
            }
            !replaced && watcher.is_attached()
        });
        match VariantWatcher::watch(&player, tracking.dispatcher()) {
            Some(watcher) => watchers.push((id, watcher)),
            None => debug!(player = %id, "No segment metadata track to watch"),
        }
        Ok(())
    }
}

/// Source handler decorator installing request and variant instrumentation
pub struct InstrumentedSourceHandler {
    inner: Rc<dyn SourceHandler>,
    shared: Rc<HostInstrumentation>,
}

impl SourceHandler for InstrumentedSourceHandler {
    fn name(&self) -> String {
        self.inner.name()
    }

    fn can_handle_source(&self, source: &MediaSource) -> bool {
        self.inner.can_handle_source(source)
    }

    fn handle_source(
        &self,
        source: &MediaSource,
        tech: &Rc<dyn Tech>,
        options: &Attributes,
    ) -> Option<Rc<dyn SourceHandle>> {
        best_effort("install interceptor", || self.shared.install_interceptor());

        let handle = self.inner.handle_source(source, tech, options);

        if let Some(handle) = handle.as_deref().filter(|h| h.has_xhr()) {
            best_effort("variant watcher", || self.shared.watch_variants(handle));
        }

        handle
    }
}

/// Attaches tracking sessions to players
pub struct Bridge {
    collector: Rc<dyn Collector>,
    scheduler: Rc<dyn Scheduler>,
    default_host: Option<Rc<dyn HostFramework>>,
    resolver: Option<Rc<dyn PlayerIdResolver>>,
    hosts: RefCell<Vec<Rc<HostInstrumentation>>>,
}

impl Bridge {
    pub fn new(collector: Rc<dyn Collector>, scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            collector,
            scheduler,
            default_host: None,
            resolver: None,
            hosts: RefCell::new(Vec::new()),
        }
    }

    /// Framework used when `init_tracking` is not given one (the global `videojs`)
    pub fn with_default_host(mut self, host: Rc<dyn HostFramework>) -> Self {
        self.default_host = Some(host);
        self
    }

    /// Override the version-based player id resolution
    pub fn with_resolver(mut self, resolver: Rc<dyn PlayerIdResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Attach tracking to `player`. Invalid input logs one warning and
    /// returns `None`.
    pub fn init_tracking(
        &self,
        player: &Rc<dyn Player>,
        host: Option<Rc<dyn HostFramework>>,
        config: TrackingConfig,
    ) -> Option<TrackingApi> {
        match self.try_init_tracking(player, host, config) {
            Ok(api) => Some(api),
            Err(error) => {
                warn!(code = error.error_code(), "{error}");
                None
            }
        }
    }

    /// Attach tracking to `player`, returning validation failures
    #[instrument(skip_all)]
    pub fn try_init_tracking(
        &self,
        player: &Rc<dyn Player>,
        host: Option<Rc<dyn HostFramework>>,
        config: TrackingConfig,
    ) -> Result<TrackingApi> {
        if !player.can_subscribe() {
            return Err(Error::InvalidPlayer);
        }

        let host = host
            .or_else(|| self.default_host.clone())
            .filter(|host| host.is_invocable())
            .ok_or(Error::InvalidHostFramework)?;
        let version = host
            .version()
            .filter(|version| !version.is_empty())
            .ok_or(Error::InvalidHostFramework)?;

        if let Some(previous) = player.tracking_handle() {
            debug!(token = ?previous.token(), "Replacing existing tracking session");
            previous.destroy();
            player.set_tracking_handle(None);
        }

        let token = self.collector.build_uuid();
        let session = Rc::new(Session::new(token.clone(), config.automatic_error_tracking));
        let dispatcher = Dispatcher::new(session, self.collector.clone());

        let controller =
            LifecycleController::new(player, dispatcher.clone(), self.scheduler.clone());
        let handle = TrackingHandle::new(controller.clone());
        player.set_tracking_handle(Some(handle.clone()));

        let collector_config = CollectorConfig {
            tracking: config.with_software_metadata(&version),
            fetch_state_data: state_fetcher(player),
            fetch_playhead_time: playhead_fetcher(player),
        };
        self.collector.configure(&token, collector_config);

        controller.attach();
        self.instrument_source_handlers(&host, dispatcher, &version);

        info!(token = %token, version = %version, "Tracking session attached");
        Ok(TrackingApi { handle })
    }

    /// Instrumentation for `host`, created on first use
    fn host_instrumentation(
        &self,
        host: &Rc<dyn HostFramework>,
        version: &str,
    ) -> Rc<HostInstrumentation> {
        let mut hosts = self.hosts.borrow_mut();
        hosts.retain(|existing| existing.host.strong_count() > 0);
        if let Some(existing) = hosts.iter().find(|existing| existing.serves(host)) {
            return existing.clone();
        }

        let route = SessionRoute::new();
        let resolver = self
            .resolver
            .clone()
            .unwrap_or_else(|| resolver::for_version(version));
        let instrumentation = Rc::new(HostInstrumentation {
            host: Rc::downgrade(host),
            interceptor: RequestInterceptor::new(RequestReporter::new(
                self.collector.clone(),
                route.clone(),
            )),
            route,
            resolver,
            decorators: RefCell::new(Vec::new()),
            watchers: RefCell::new(Vec::new()),
        });
        hosts.push(instrumentation.clone());
        instrumentation
    }

    fn instrument_source_handlers(
        &self,
        host: &Rc<dyn HostFramework>,
        dispatcher: Dispatcher,
        version: &str,
    ) {
        let instrumentation = self.host_instrumentation(host, version);
        instrumentation.route.route_to(dispatcher);
        let decorated = instrumentation.decorate(host);

        debug!(
            decorated,
            resolver = instrumentation.resolver.name(),
            "Source handlers instrumented"
        );
    }
}

fn state_fetcher(player: &Rc<dyn Player>) -> StateFetcher {
    let player = Rc::downgrade(player);
    Rc::new(move || {
        player
            .upgrade()
            .map(|player| snapshot::state_attributes(player.as_ref()))
            .unwrap_or_default()
    })
}

fn playhead_fetcher(player: &Rc<dyn Player>) -> PlayheadFetcher {
    let player = Rc::downgrade(player);
    Rc::new(move || {
        player
            .upgrade()
            .map(|player| snapshot::playhead_millis(player.as_ref()))
            .unwrap_or(0)
    })
}
