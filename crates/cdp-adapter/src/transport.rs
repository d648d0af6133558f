use std::collections::HashMap;
use std::convert::TryInto;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::async_process::Child;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::target::SessionId as CdpSessionId;
use chromiumoxide::cdp::events::CdpEventMessage;
use chromiumoxide::conn::Connection;
use chromiumoxide::error::CdpError;
use chromiumoxide_types::{CallId, CdpJsonEventMessage, Message, MethodId, Response};
use futures::{future::BoxFuture, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::util::extract_ws_url;

/// Event frame as delivered by the browser, before the adapter interprets it.
#[derive(Clone, Debug)]
pub struct TransportEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

/// Where a command is routed: the browser endpoint or a flattened page session.
#[derive(Clone, Debug)]
pub enum CommandTarget {
    Browser,
    Session(String),
}

#[async_trait]
pub trait CdpTransport: Send + Sync {
    async fn start(&self) -> Result<(), AdapterError>;
    async fn next_event(&self) -> Option<TransportEvent>;
    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError>;
}

/// Transport used when no browser is available; every command fails.
#[derive(Default)]
pub struct NoopTransport;

#[async_trait]
impl CdpTransport for NoopTransport {
    async fn start(&self) -> Result<(), AdapterError> {
        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        None
    }

    async fn send_command(
        &self,
        _target: CommandTarget,
        method: &str,
        _params: Value,
    ) -> Result<Value, AdapterError> {
        Err(AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(format!("no browser connected; cannot send {method}")))
    }
}

type LinkFactory =
    Arc<dyn Fn(CdpConfig) -> BoxFuture<'static, Result<Arc<Link>, AdapterError>> + Send + Sync>;

type Pending = HashMap<CallId, oneshot::Sender<Result<Value, AdapterError>>>;

/// Transport over a chromiumoxide websocket connection. The link is created
/// lazily and rebuilt if its pump task dies.
#[derive(Clone)]
pub struct ChromiumTransport {
    cfg: CdpConfig,
    link: Arc<OnceCell<Mutex<Option<Arc<Link>>>>>,
    factory: LinkFactory,
}

impl ChromiumTransport {
    pub fn new(cfg: CdpConfig) -> Self {
        let factory: LinkFactory = Arc::new(|cfg: CdpConfig| {
            Box::pin(async move { Link::open(cfg).await.map(Arc::new) })
        });
        Self {
            cfg,
            link: Arc::new(OnceCell::new()),
            factory,
        }
    }

    async fn link(&self) -> Result<Arc<Link>, AdapterError> {
        let cell = self.link.get_or_init(|| async { Mutex::new(None) }).await;
        let mut slot = cell.lock().await;
        if let Some(existing) = slot.as_ref() {
            if existing.is_alive() {
                return Ok(existing.clone());
            }
            debug!(target: "cdp-transport", "browser link is dead, reconnecting");
        }
        let fresh = (self.factory)(self.cfg.clone()).await?;
        *slot = Some(fresh.clone());
        Ok(fresh)
    }

    fn deadline(&self) -> Duration {
        Duration::from_millis(self.cfg.default_deadline_ms)
    }

    #[cfg(test)]
    fn with_factory(cfg: CdpConfig, factory: LinkFactory) -> Self {
        Self {
            cfg,
            link: Arc::new(OnceCell::new()),
            factory,
        }
    }
}

#[async_trait]
impl CdpTransport for ChromiumTransport {
    async fn start(&self) -> Result<(), AdapterError> {
        let link = self.link().await?;
        link.call(
            CommandTarget::Browser,
            "Target.setDiscoverTargets",
            json!({ "discover": true }),
            self.deadline(),
        )
        .await?;
        link.call(
            CommandTarget::Browser,
            "Target.setAutoAttach",
            json!({ "autoAttach": true, "waitForDebuggerOnStart": false, "flatten": true }),
            self.deadline(),
        )
        .await?;
        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        match self.link().await {
            Ok(link) => link.next_event().await,
            Err(err) => {
                warn!(target: "cdp-transport", ?err, "browser link unavailable");
                None
            }
        }
    }

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let link = self.link().await?;
        link.call(target, method, params, self.deadline()).await
    }
}

struct Outbound {
    target: CommandTarget,
    method: String,
    params: Value,
    reply: oneshot::Sender<Result<Value, AdapterError>>,
}

struct Link {
    outbound: mpsc::Sender<Outbound>,
    inbound: Mutex<mpsc::Receiver<TransportEvent>>,
    pump: JoinHandle<()>,
    heartbeat: Option<JoinHandle<()>>,
    child: Mutex<Option<Child>>,
    alive: Arc<AtomicBool>,
}

impl Link {
    async fn open(cfg: CdpConfig) -> Result<Self, AdapterError> {
        let (child, ws_url) = match cfg.websocket_url.clone() {
            Some(url) => (None, url),
            None => {
                let (child, url) = launch(browser_config(&cfg)?).await?;
                (Some(child), url)
            }
        };

        let conn = Connection::<CdpEventMessage>::connect(&ws_url)
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        let (outbound, outbound_rx) = mpsc::channel(128);
        let (inbound_tx, inbound) = mpsc::channel(512);
        let alive = Arc::new(AtomicBool::new(true));

        let pump_alive = alive.clone();
        let pump = tokio::spawn(async move {
            let outcome = pump_connection(conn, outbound_rx, inbound_tx).await;
            pump_alive.store(false, Ordering::Relaxed);
            if let Err(err) = outcome {
                error!(target: "cdp-transport", ?err, "connection pump stopped");
            }
        });

        let heartbeat = spawn_heartbeat(
            outbound.clone(),
            alive.clone(),
            Duration::from_millis(cfg.heartbeat_interval_ms),
        );

        info!(target: "cdp-transport", url = %ws_url, "connected to browser");

        Ok(Self {
            outbound,
            inbound: Mutex::new(inbound),
            pump,
            heartbeat,
            child: Mutex::new(child),
            alive,
        })
    }

    #[cfg(test)]
    fn detached() -> (Arc<Self>, Arc<AtomicBool>) {
        let (outbound, _outbound_rx) = mpsc::channel(8);
        let (_inbound_tx, inbound) = mpsc::channel(8);
        let alive = Arc::new(AtomicBool::new(true));
        let pump = tokio::spawn(futures::future::pending::<()>());
        (
            Arc::new(Self {
                outbound,
                inbound: Mutex::new(inbound),
                pump,
                heartbeat: None,
                child: Mutex::new(None),
                alive: alive.clone(),
            }),
            alive,
        )
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    async fn call(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, AdapterError> {
        let (reply, reply_rx) = oneshot::channel();
        self.outbound
            .send(Outbound {
                target,
                method: method.to_string(),
                params,
                reply,
            })
            .await
            .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;

        match tokio::time::timeout(deadline, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("{method}: reply channel dropped"))),
            Err(_) => Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                .with_hint(format!("{method} timed out"))
                .retriable(true)),
        }
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        self.inbound.lock().await.recv().await
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Relaxed);
        self.pump.abort();
        if let Some(handle) = &self.heartbeat {
            handle.abort();
        }
        let Ok(mut slot) = self.child.try_lock() else {
            return;
        };
        if let Some(mut child) = slot.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    handle.spawn(async move {
                        if let Err(err) = child.kill().await {
                            warn!(target: "cdp-transport", ?err, "failed to stop browser process");
                        }
                    });
                }
                Err(_) => debug!(target: "cdp-transport", "no runtime left to stop browser process"),
            }
        }
    }
}

fn spawn_heartbeat(
    outbound: mpsc::Sender<Outbound>,
    alive: Arc<AtomicBool>,
    every: Duration,
) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        return None;
    }
    Some(tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        ticker.tick().await;
        while alive.load(Ordering::Relaxed) {
            ticker.tick().await;
            let (reply, reply_rx) = oneshot::channel();
            let ping = Outbound {
                target: CommandTarget::Browser,
                method: "Browser.getVersion".to_string(),
                params: json!({}),
                reply,
            };
            if outbound.send(ping).await.is_err() {
                break;
            }
            match tokio::time::timeout(Duration::from_secs(5), reply_rx).await {
                Ok(Ok(Ok(_))) => {}
                Ok(Ok(Err(err))) => {
                    warn!(target: "cdp-transport", ?err, "heartbeat rejected");
                    break;
                }
                Ok(Err(_)) => break,
                Err(_) => {
                    warn!(target: "cdp-transport", "heartbeat timed out");
                    break;
                }
            }
        }
    }))
}

fn browser_config(cfg: &CdpConfig) -> Result<BrowserConfig, AdapterError> {
    if !cfg.executable.as_os_str().is_empty() && !cfg.executable.exists() {
        return Err(AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(format!(
                "chrome executable not found at {}",
                cfg.executable.display()
            ))
            .with_data(json!({
                "expected": cfg.executable,
                "hint": "Set PROMPTCAST_CHROME or browser.chrome_path to a chrome/chromium binary."
            })));
    }

    let profile_dir = if cfg.user_data_dir.is_absolute() {
        cfg.user_data_dir.clone()
    } else {
        std::env::current_dir()
            .map_err(|err| {
                AdapterError::new(AdapterErrorKind::Internal)
                    .with_hint(format!("cannot resolve working directory: {err}"))
            })?
            .join(&cfg.user_data_dir)
    };
    fs::create_dir_all(&profile_dir).map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal)
            .with_hint(format!("cannot create profile dir {}: {err}", profile_dir.display()))
    })?;

    let mut builder = BrowserConfig::builder()
        .request_timeout(Duration::from_millis(cfg.default_deadline_ms))
        .launch_timeout(Duration::from_secs(20))
        .user_data_dir(profile_dir);

    if !cfg.headless {
        builder = builder.with_head();
    }
    if std::env::var("PROMPTCAST_DISABLE_SANDBOX")
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
    {
        builder = builder.no_sandbox();
    }

    let mut args = vec![
        "--disable-background-timer-throttling",
        "--disable-breakpad",
        "--disable-default-apps",
        "--disable-dev-shm-usage",
        "--disable-popup-blocking",
        "--no-first-run",
        "--no-default-browser-check",
        "--remote-allow-origins=*",
    ];
    if cfg.headless {
        args.push("--headless=new");
    }
    builder = builder.args(args);

    if !cfg.executable.as_os_str().is_empty() {
        builder = builder.chrome_executable(cfg.executable.clone());
    }

    builder.build().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal).with_hint(format!("browser config error: {err}"))
    })
}

async fn launch(config: BrowserConfig) -> Result<(Child, String), AdapterError> {
    let mut child = config.launch().map_err(|err| {
        AdapterError::new(AdapterErrorKind::CdpIo).with_hint(format!("failed to launch chrome: {err}"))
    })?;
    let ws_url = extract_ws_url(&mut child)
        .await
        .map_err(|err| AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string()))?;
    Ok((child, ws_url))
}

async fn pump_connection(
    mut conn: Connection<CdpEventMessage>,
    mut outbound: mpsc::Receiver<Outbound>,
    inbound: mpsc::Sender<TransportEvent>,
) -> Result<(), AdapterError> {
    let mut pending: Pending = HashMap::new();

    loop {
        tokio::select! {
            Some(cmd) = outbound.recv() => {
                let session = match cmd.target {
                    CommandTarget::Browser => None,
                    CommandTarget::Session(id) => Some(CdpSessionId::from(id)),
                };
                let method: MethodId = cmd.method.clone().into();
                match conn.submit_command(method, session, cmd.params) {
                    Ok(call_id) => {
                        pending.insert(call_id, cmd.reply);
                    }
                    Err(err) => {
                        let failure = AdapterError::new(AdapterErrorKind::CdpIo).with_hint(err.to_string());
                        let _ = cmd.reply.send(Err(failure.clone()));
                        return Err(failure);
                    }
                }
            }
            frame = conn.next() => {
                match frame {
                    Some(Ok(Message::Response(resp))) => {
                        if let Some(reply) = pending.remove(&resp.id) {
                            let _ = reply.send(response_payload(resp));
                        }
                    }
                    Some(Ok(Message::Event(event))) => {
                        match decode_event(event) {
                            Ok(ev) => {
                                if inbound.send(ev).await.is_err() {
                                    debug!(target: "cdp-transport", "event receiver dropped");
                                }
                            }
                            Err(err) => warn!(target: "cdp-transport", ?err, "undecodable event"),
                        }
                    }
                    Some(Err(err)) => {
                        let failure = map_cdp_error(err);
                        fail_pending(&mut pending, &failure);
                        return Err(failure);
                    }
                    None => {
                        let failure = AdapterError::new(AdapterErrorKind::CdpIo)
                            .with_hint("browser connection closed");
                        fail_pending(&mut pending, &failure);
                        return Ok(());
                    }
                }
            }
        }
    }
}

fn fail_pending(pending: &mut Pending, failure: &AdapterError) {
    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(failure.clone()));
    }
}

fn decode_event(event: CdpEventMessage) -> Result<TransportEvent, AdapterError> {
    let raw: CdpJsonEventMessage = event.try_into().map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal).with_hint(format!("event decode: {err}"))
    })?;
    Ok(TransportEvent {
        method: raw.method.into_owned(),
        params: raw.params,
        session_id: raw.session_id,
    })
}

fn response_payload(resp: Response) -> Result<Value, AdapterError> {
    match (resp.result, resp.error) {
        (Some(result), _) => Ok(result),
        (None, Some(error)) => Err(AdapterError::new(AdapterErrorKind::Protocol)
            .with_hint(format!("cdp error {}: {}", error.code, error.message))
            .with_data(json!({ "code": error.code }))),
        (None, None) => {
            Err(AdapterError::new(AdapterErrorKind::Internal).with_hint("empty cdp response"))
        }
    }
}

fn map_cdp_error(err: CdpError) -> AdapterError {
    let hint = err.to_string();
    match err {
        CdpError::Timeout => AdapterError::new(AdapterErrorKind::NavTimeout)
            .with_hint(hint)
            .retriable(true),
        CdpError::JavascriptException(_) => {
            AdapterError::new(AdapterErrorKind::ScriptFailed).with_hint(hint)
        }
        CdpError::Serde(_) | CdpError::FrameNotFound(_) => {
            AdapterError::new(AdapterErrorKind::Internal).with_hint(hint)
        }
        _ => AdapterError::new(AdapterErrorKind::CdpIo)
            .with_hint(hint)
            .retriable(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn reconnects_after_link_dies() {
        let opened = Arc::new(AtomicUsize::new(0));
        let flags = Arc::new(Mutex::new(Vec::<Arc<AtomicBool>>::new()));

        let factory: LinkFactory = {
            let opened = opened.clone();
            let flags = flags.clone();
            Arc::new(move |_cfg: CdpConfig| {
                let opened = opened.clone();
                let flags = flags.clone();
                Box::pin(async move {
                    opened.fetch_add(1, Ordering::SeqCst);
                    let (link, alive) = Link::detached();
                    flags.lock().await.push(alive);
                    Ok(link)
                })
            })
        };

        let transport = ChromiumTransport::with_factory(CdpConfig::default(), factory);
        let first = transport.link().await.expect("first link");
        let again = transport.link().await.expect("cached link");
        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(opened.load(Ordering::SeqCst), 1);

        flags.lock().await[0].store(false, Ordering::SeqCst);
        let second = transport.link().await.expect("second link");
        assert_eq!(opened.load(Ordering::SeqCst), 2);
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn noop_transport_rejects_commands() {
        let err = NoopTransport
            .send_command(CommandTarget::Browser, "Target.getTargets", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::CdpIo);
    }
}
