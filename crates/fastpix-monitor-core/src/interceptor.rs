//! Request interception
//!
//! The streaming engine exposes its request pipeline in one of two shapes:
//! - `onRequest(hook)` registration (current VHS)
//! - a `beforeRequest` property holding a single transform (older engines)
//!
//! Either way the instrumentation is a decorator: it wraps the caller's
//! `beforeSend` so the send time is recorded and the request's
//! `onreadystatechange` is chained, reporter first and the caller's original
//! callback second. Every wrapped call runs inside its own failure boundary.

use crate::guard::best_effort;
use crate::host::{
    ready_state, BeforeSend, ReadyStateCallback, RequestHook, RequestOptions, XhrHooks, XhrRequest,
};
use crate::reporter::RequestReporter;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use tracing::debug;

/// How the interceptor was attached to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStyle {
    OnRequest,
    BeforeRequest,
}

/// Chain the reporter in front of a request's existing ready-state callback.
/// A request is reported at most once, however often `DONE` is signalled.
pub fn chain_ready_state(
    request: Weak<dyn XhrRequest>,
    request_start: f64,
    reporter: RequestReporter,
    previous: Option<ReadyStateCallback>,
) -> ReadyStateCallback {
    let consumed = Cell::new(false);
    Rc::new(move || {
        if !consumed.get() {
            best_effort("request outcome", || match request.upgrade() {
                Some(request) => {
                    if request.ready_state() == ready_state::DONE {
                        consumed.set(true);
                    }
                    reporter.observe(request.as_ref(), request_start)
                }
                None => Ok(()),
            });
        }

        if let Some(previous) = &previous {
            best_effort("ready state callback", || {
                previous();
                Ok(())
            });
        }
    })
}

/// Decorate a `beforeSend` hook
pub fn wrap_before_send(original: Option<BeforeSend>, reporter: RequestReporter) -> BeforeSend {
    Rc::new(move |request: &Rc<dyn XhrRequest>| {
        let request_start = reporter.collector().now();

        if let Some(original) = &original {
            best_effort("before send", || {
                original(request);
                Ok(())
            });
        }

        best_effort("ready state chain", || {
            let previous = request.on_ready_state_change();
            let chained =
                chain_ready_state(Rc::downgrade(request), request_start, reporter.clone(), previous);
            request.set_on_ready_state_change(Some(chained));
            Ok(())
        });
    })
}

fn instrument_options(mut options: RequestOptions, reporter: &RequestReporter) -> RequestOptions {
    options.before_send = Some(wrap_before_send(options.before_send.take(), reporter.clone()));
    options
}

/// Hook for `onRequest`-style registration
pub fn on_request_hook(reporter: RequestReporter) -> RequestHook {
    Rc::new(move |options: RequestOptions| Some(instrument_options(options, &reporter)))
}

/// Decorate a `beforeRequest` transform. The original runs first; when it
/// returns nothing the untouched options go out, still instrumented.
pub fn wrap_before_request(original: Option<RequestHook>, reporter: RequestReporter) -> RequestHook {
    Rc::new(move |options: RequestOptions| {
        let outgoing = match &original {
            Some(hook) => {
                let passthrough = options.clone();
                hook(options).unwrap_or(passthrough)
            }
            None => options,
        };
        Some(instrument_options(outgoing, &reporter))
    })
}

/// Attach the reporter to an engine's request pipeline
pub fn install(hooks: &dyn XhrHooks, reporter: &RequestReporter) -> HookStyle {
    if hooks.on_request(on_request_hook(reporter.clone())) {
        return HookStyle::OnRequest;
    }
    let original = hooks.before_request();
    hooks.set_before_request(wrap_before_request(original, reporter.clone()));
    HookStyle::BeforeRequest
}

/// Per-framework interceptor; installs at most once per hooks object
pub struct RequestInterceptor {
    reporter: RequestReporter,
    installed: RefCell<Vec<Weak<dyn XhrHooks>>>,
}

impl RequestInterceptor {
    pub fn new(reporter: RequestReporter) -> Self {
        Self {
            reporter,
            installed: RefCell::new(Vec::new()),
        }
    }

    fn is_installed(&self, hooks: &Rc<dyn XhrHooks>) -> bool {
        self.installed
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .any(|existing| std::ptr::addr_eq(Rc::as_ptr(&existing), Rc::as_ptr(hooks)))
    }

    /// Install into `hooks` unless this session already did
    pub fn install_once(&self, hooks: &Rc<dyn XhrHooks>) -> Option<HookStyle> {
        if self.is_installed(hooks) {
            return None;
        }
        let style = install(hooks.as_ref(), &self.reporter);
        self.installed.borrow_mut().push(Rc::downgrade(hooks));
        debug!(style = ?style, "Request interceptor installed");
        Some(style)
    }

    pub fn reporter(&self) -> &RequestReporter {
        &self.reporter
    }
}
