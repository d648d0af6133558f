use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio::{select, spawn};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::CdpConfig;
use crate::error::{AdapterError, AdapterErrorKind};
use crate::events::RawEvent;
use crate::ids::{BrowserId, PageId};
use crate::registry::Registry;
use crate::transport::{ChromiumTransport, CommandTarget, CdpTransport, NoopTransport, TransportEvent};
use crate::{chrome_mode, metrics, resolve_chrome_path, AdapterMode, ChromeMode, EventBus, PageSummary};

/// Browser-wide adapter: owns the transport, the page registry and the
/// event loop that keeps both in sync with the browser.
pub struct CdpAdapter {
    pub browser_id: BrowserId,
    pub cfg: CdpConfig,
    bus: EventBus,
    registry: Arc<Registry>,
    mode: AdapterMode,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    transport: Arc<dyn CdpTransport>,
    targets: DashMap<String, PageId>,
    sessions: DashMap<String, PageId>,
}

impl CdpAdapter {
    pub fn new(mut cfg: CdpConfig, bus: EventBus) -> Self {
        let chrome = chrome_mode();
        let detected = resolve_chrome_path(&cfg);
        let use_real = match chrome {
            ChromeMode::ForceStub => false,
            _ if cfg.websocket_url.is_some() => true,
            ChromeMode::ForceReal => true,
            ChromeMode::Auto => detected.is_some(),
        };

        if use_real && cfg.websocket_url.is_none() {
            match detected {
                Some(path) => cfg.executable = path,
                None => warn!(
                    target: "cdp-adapter",
                    "no chrome executable detected; launch will likely fail"
                ),
            }
        }

        if use_real {
            info!(target: "cdp-adapter", ws = ?cfg.websocket_url, "using chromium transport");
            let transport = Arc::new(ChromiumTransport::new(cfg.clone()));
            Self::assemble(cfg, bus, transport, AdapterMode::Real)
        } else {
            warn!(
                target: "cdp-adapter",
                mode = %AdapterMode::Stub.as_str(),
                remediation = "install Chrome/Chromium, set PROMPTCAST_CHROME or pass --chrome-path/--ws-url",
                "no browser available; deliveries will fail"
            );
            Self::assemble(cfg, bus, Arc::new(NoopTransport), AdapterMode::Stub)
        }
    }

    pub fn with_transport(cfg: CdpConfig, bus: EventBus, transport: Arc<dyn CdpTransport>) -> Self {
        Self::assemble(cfg, bus, transport, AdapterMode::Real)
    }

    fn assemble(
        cfg: CdpConfig,
        bus: EventBus,
        transport: Arc<dyn CdpTransport>,
        mode: AdapterMode,
    ) -> Self {
        Self {
            browser_id: BrowserId::new(),
            cfg,
            bus,
            registry: Arc::new(Registry::new()),
            mode,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            transport,
            targets: DashMap::new(),
            sessions: DashMap::new(),
        }
    }

    pub fn mode(&self) -> AdapterMode {
        self.mode
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RawEvent> {
        self.bus.subscribe()
    }

    pub async fn start(self: Arc<Self>) -> Result<(), AdapterError> {
        if !self.tasks.lock().await.is_empty() {
            return Ok(());
        }
        self.transport.start().await?;
        let loop_task = spawn(Self::event_loop(Arc::clone(&self)));
        self.tasks.lock().await.push(loop_task);
        self.adopt_existing_pages().await?;
        info!(target: "cdp-adapter", mode = self.mode.as_str(), "adapter started");
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let mut handles = self.tasks.lock().await;
        while let Some(handle) = handles.pop() {
            let _ = handle.await;
        }
    }

    /// Auto-attach only covers targets created after it was enabled; pages
    /// that were already open when we connected need an explicit attach.
    async fn adopt_existing_pages(&self) -> Result<(), AdapterError> {
        for info in self.fetch_targets().await? {
            let page = self.track_target(&info);
            if !info.attached && self.registry.get_cdp_session(&page).is_none() {
                let params = json!({ "targetId": info.target_id, "flatten": true });
                match self.send_command("Target.attachToTarget", params).await {
                    Ok(resp) => {
                        if let Some(session) = resp.get("sessionId").and_then(Value::as_str) {
                            self.bind_session(page, session.to_string());
                        }
                    }
                    Err(err) => warn!(target: "cdp-adapter", ?err, target_id = %info.target_id, "attach failed"),
                }
            }
        }
        Ok(())
    }

    async fn fetch_targets(&self) -> Result<Vec<TargetInfoPayload>, AdapterError> {
        let response = self.send_command("Target.getTargets", json!({})).await?;
        let infos: Vec<TargetInfoPayload> = response
            .get("targetInfos")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(decode_error)?
            .unwrap_or_default();
        Ok(infos.into_iter().filter(|info| info.is_page()).collect())
    }

    /// All open page targets, in browser order.
    pub async fn pages(&self) -> Result<Vec<PageSummary>, AdapterError> {
        let infos = self.fetch_targets().await?;
        Ok(infos
            .into_iter()
            .map(|info| {
                let page = self.track_target(&info);
                summary(page, &info)
            })
            .collect())
    }

    /// Current url and title of a page, or `None` once the target is gone.
    pub async fn page_info(&self, page: PageId) -> Result<Option<PageSummary>, AdapterError> {
        let Some(ctx) = self.registry.get(&page) else {
            return Ok(None);
        };
        let response = match self
            .send_command("Target.getTargetInfo", json!({ "targetId": ctx.target_id }))
            .await
        {
            Ok(value) => value,
            Err(err) if err.kind == AdapterErrorKind::Protocol => return Ok(None),
            Err(err) => return Err(err),
        };
        let info: TargetInfoPayload = response
            .get("targetInfo")
            .cloned()
            .map(serde_json::from_value)
            .transpose()
            .map_err(decode_error)?
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal).with_hint("getTargetInfo missing targetInfo")
            })?;
        self.registry.set_url(&page, &info.url);
        self.registry.set_title(&page, &info.title);
        Ok(Some(summary(page, &info)))
    }

    pub async fn create_page(&self, url: &str) -> Result<PageId, AdapterError> {
        validate_url(url)?;
        let response = self
            .send_command("Target.createTarget", json!({ "url": url }))
            .await?;
        let target_id = response
            .get("targetId")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AdapterError::new(AdapterErrorKind::Internal).with_hint("createTarget missing targetId")
            })?
            .to_string();

        let deadline = Instant::now() + Duration::from_millis(self.cfg.attach_timeout_ms);
        loop {
            if let Some(page) = self.targets.get(&target_id).map(|entry| *entry.value()) {
                if self.registry.get_cdp_session(&page).is_some() {
                    return Ok(page);
                }
            }
            if Instant::now() >= deadline {
                return Err(AdapterError::new(AdapterErrorKind::NavTimeout)
                    .with_hint(format!("target {target_id} never attached")));
            }
            sleep(Duration::from_millis(50)).await;
        }
    }

    pub async fn navigate(&self, page: PageId, url: &str) -> Result<(), AdapterError> {
        validate_url(url)?;
        let response = self
            .send_page_command(page, "Page.navigate", json!({ "url": url }))
            .await?;
        if let Some(text) = response.get("errorText").and_then(Value::as_str) {
            return Err(AdapterError::new(AdapterErrorKind::CdpIo)
                .with_hint(format!("navigation to {url} failed: {text}")));
        }
        self.registry.set_url(&page, url);
        Ok(())
    }

    pub async fn activate_page(&self, page: PageId) -> Result<(), AdapterError> {
        let ctx = self.registry.get(&page).ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::TargetClosed).with_hint(format!("page {page} is gone"))
        })?;
        self.send_command("Target.activateTarget", json!({ "targetId": ctx.target_id }))
            .await
            .map(|_| ())
    }

    /// Evaluates `expression` in the page's main world and returns the
    /// by-value result. Page exceptions surface as `ScriptFailed`.
    pub async fn evaluate_script(&self, page: PageId, expression: &str) -> Result<Value, AdapterError> {
        self.wait_for_session(page).await?;
        let response = self
            .send_page_command(
                page,
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                    "userGesture": true,
                }),
            )
            .await?;

        if let Some(details) = response.get("exceptionDetails") {
            let text = details
                .pointer("/exception/description")
                .or_else(|| details.get("text"))
                .and_then(Value::as_str)
                .unwrap_or("page script raised an exception")
                .to_string();
            return Err(AdapterError::new(AdapterErrorKind::ScriptFailed)
                .with_hint(text)
                .with_data(details.clone()));
        }

        Ok(response
            .pointer("/result/value")
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn wait_for_session(&self, page: PageId) -> Result<(), AdapterError> {
        let deadline = Instant::now() + Duration::from_millis(self.cfg.attach_timeout_ms);
        loop {
            if !self.registry.contains(&page) {
                return Err(AdapterError::new(AdapterErrorKind::TargetClosed)
                    .with_hint(format!("page {page} is gone")));
            }
            if self.registry.get_cdp_session(&page).is_some() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AdapterError::new(AdapterErrorKind::TargetNotFound)
                    .with_hint(format!("page {page} has no attached session")));
            }
            sleep(Duration::from_millis(50)).await;
        }
    }

    async fn event_loop(self: Arc<Self>) {
        debug!(target: "cdp-adapter", "event loop entered");
        let min_backoff = Duration::from_millis(self.cfg.retry_backoff_ms.max(50));
        let max_backoff = Duration::from_secs(5);
        let mut backoff = min_backoff;

        loop {
            select! {
                _ = self.shutdown.cancelled() => break,
                event = self.transport.next_event() => match event {
                    Some(ev) => {
                        backoff = min_backoff;
                        self.handle_event(ev);
                    }
                    None => {
                        if self.shutdown.is_cancelled() {
                            break;
                        }
                        self.forget_all_pages();
                        warn!(target: "cdp-adapter", "event stream ended; restarting transport");
                        if let Err(err) = self.transport.start().await {
                            warn!(target: "cdp-adapter", ?err, "transport restart failed");
                        }
                        sleep(backoff).await;
                        backoff = (backoff + min_backoff).min(max_backoff);
                    }
                },
            }
        }
        debug!(target: "cdp-adapter", "event loop exiting");
    }

    fn forget_all_pages(&self) {
        for (page, _) in self.registry.iter() {
            self.emit(RawEvent::PageClosed { page, ts: timestamp_now() });
        }
        self.registry.clear();
        self.targets.clear();
        self.sessions.clear();
    }

    fn handle_event(&self, event: TransportEvent) {
        if let Err(err) = self.process_event(event) {
            let _ = self.bus.send(RawEvent::Error {
                page: None,
                message: format!("cdp event handling error: {err}"),
            });
        }
    }

    fn process_event(&self, event: TransportEvent) -> Result<(), AdapterError> {
        metrics::record_event();
        match event.method.as_str() {
            "Target.targetCreated" | "Target.targetInfoChanged" => {
                let payload: TargetInfoEnvelope =
                    serde_json::from_value(event.params).map_err(decode_error)?;
                if payload.target_info.is_page() {
                    self.on_target_info(payload.target_info);
                }
            }
            "Target.targetDestroyed" => {
                let payload: TargetDestroyedParams =
                    serde_json::from_value(event.params).map_err(decode_error)?;
                self.on_target_destroyed(&payload.target_id);
            }
            "Target.attachedToTarget" => {
                let payload: AttachedToTargetParams =
                    serde_json::from_value(event.params).map_err(decode_error)?;
                if payload.target_info.is_page() {
                    let page = self.track_target(&payload.target_info);
                    self.bind_session(page, payload.session_id);
                }
            }
            "Target.detachedFromTarget" => {
                let payload: DetachedFromTargetParams =
                    serde_json::from_value(event.params).map_err(decode_error)?;
                if let Some((_, page)) = self.sessions.remove(&payload.session_id) {
                    self.registry.clear_cdp_session(&page);
                }
            }
            "Runtime.exceptionThrown" => {
                let page = event
                    .session_id
                    .as_ref()
                    .and_then(|sid| self.sessions.get(sid).map(|entry| *entry.value()));
                let message = event
                    .params
                    .pointer("/exceptionDetails/exception/description")
                    .or_else(|| event.params.pointer("/exceptionDetails/text"))
                    .and_then(Value::as_str)
                    .unwrap_or("runtime exception")
                    .to_string();
                let _ = self.bus.send(RawEvent::Error { page, message });
            }
            other => debug!(target: "cdp-adapter", method = %other, "ignored cdp event"),
        }
        Ok(())
    }

    fn on_target_info(&self, info: TargetInfoPayload) {
        let known = self.targets.get(&info.target_id).map(|entry| *entry.value());
        let page = match known {
            Some(page) => page,
            None => {
                let page = self.track_target(&info);
                self.emit(RawEvent::PageOpened {
                    page,
                    url: info.url.clone(),
                    ts: timestamp_now(),
                });
                return;
            }
        };
        if !info.url.is_empty() && self.registry.set_url(&page, &info.url) {
            self.emit(RawEvent::PageNavigated {
                page,
                url: info.url.clone(),
                ts: timestamp_now(),
            });
        }
        if self.registry.set_title(&page, &info.title) {
            self.emit(RawEvent::PageTitleChanged {
                page,
                title: info.title,
                ts: timestamp_now(),
            });
        }
    }

    fn on_target_destroyed(&self, target_id: &str) {
        if let Some((_, page)) = self.targets.remove(target_id) {
            self.sessions.retain(|_, owner| *owner != page);
            self.registry.remove_page(&page);
            self.emit(RawEvent::PageClosed { page, ts: timestamp_now() });
        }
    }

    fn track_target(&self, info: &TargetInfoPayload) -> PageId {
        *self
            .targets
            .entry(info.target_id.clone())
            .or_insert_with(|| {
                let page = PageId::new();
                self.registry
                    .insert_page(page, info.target_id.clone(), info.url.clone(), info.title.clone());
                page
            })
            .value()
    }

    fn bind_session(&self, page: PageId, session: String) {
        self.sessions.insert(session.clone(), page);
        self.registry.set_cdp_session(&page, session);
    }

    fn emit(&self, event: RawEvent) {
        let _ = self.bus.send(event);
    }

    async fn send_command(&self, method: &str, params: Value) -> Result<Value, AdapterError> {
        self.timed(CommandTarget::Browser, method, params).await
    }

    async fn send_page_command(
        &self,
        page: PageId,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        if !self.registry.contains(&page) {
            return Err(AdapterError::new(AdapterErrorKind::TargetClosed)
                .with_hint(format!("page {page} is gone")));
        }
        let session = self.registry.get_cdp_session(&page).ok_or_else(|| {
            AdapterError::new(AdapterErrorKind::TargetNotFound)
                .with_hint(format!("missing cdp session for page {page}"))
        })?;
        self.timed(CommandTarget::Session(session), method, params).await
    }

    async fn timed(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, AdapterError> {
        let start = Instant::now();
        metrics::record_command(method);
        match self.transport.send_command(target, method, params).await {
            Ok(value) => {
                metrics::record_command_success(method, start.elapsed());
                Ok(value)
            }
            Err(err) => {
                metrics::record_command_failure(method);
                Err(err)
            }
        }
    }
}

fn summary(page: PageId, info: &TargetInfoPayload) -> PageSummary {
    PageSummary {
        page,
        target_id: info.target_id.clone(),
        url: info.url.clone(),
        title: info.title.clone(),
    }
}

fn validate_url(raw: &str) -> Result<(), AdapterError> {
    url::Url::parse(raw).map(|_| ()).map_err(|err| {
        AdapterError::new(AdapterErrorKind::Internal).with_hint(format!("invalid url {raw}: {err}"))
    })
}

fn decode_error(err: serde_json::Error) -> AdapterError {
    AdapterError::new(AdapterErrorKind::Internal).with_hint(err.to_string())
}

fn timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Debug, Deserialize)]
struct TargetInfoPayload {
    #[serde(rename = "targetId")]
    target_id: String,
    #[serde(rename = "type")]
    target_type: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    attached: bool,
}

impl TargetInfoPayload {
    fn is_page(&self) -> bool {
        self.target_type == "page"
    }
}

#[derive(Debug, Deserialize)]
struct TargetInfoEnvelope {
    #[serde(rename = "targetInfo")]
    target_info: TargetInfoPayload,
}

#[derive(Debug, Deserialize)]
struct TargetDestroyedParams {
    #[serde(rename = "targetId")]
    target_id: String,
}

#[derive(Debug, Deserialize)]
struct AttachedToTargetParams {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "targetInfo")]
    target_info: TargetInfoPayload,
}

#[derive(Debug, Deserialize)]
struct DetachedFromTargetParams {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use tokio::sync::mpsc;

    /// Scripted transport: events are pushed through a channel and command
    /// replies are queued per method.
    pub(crate) struct MockTransport {
        rx: Mutex<mpsc::UnboundedReceiver<TransportEvent>>,
        commands: Mutex<Vec<(String, Value)>>,
        responses: Mutex<std::collections::HashMap<String, VecDeque<Result<Value, AdapterError>>>>,
    }

    impl MockTransport {
        pub(crate) fn new_pair() -> (Arc<Self>, mpsc::UnboundedSender<TransportEvent>) {
            let (tx, rx) = mpsc::unbounded_channel();
            (
                Arc::new(Self {
                    rx: Mutex::new(rx),
                    commands: Mutex::new(Vec::new()),
                    responses: Mutex::new(Default::default()),
                }),
                tx,
            )
        }

        pub(crate) async fn respond(&self, method: &str, reply: Result<Value, AdapterError>) {
            self.responses
                .lock()
                .await
                .entry(method.to_string())
                .or_default()
                .push_back(reply);
        }

        pub(crate) async fn methods(&self) -> Vec<String> {
            self.commands.lock().await.iter().map(|(m, _)| m.clone()).collect()
        }
    }

    #[async_trait]
    impl CdpTransport for MockTransport {
        async fn start(&self) -> Result<(), AdapterError> {
            Ok(())
        }

        async fn next_event(&self) -> Option<TransportEvent> {
            self.rx.lock().await.recv().await
        }

        async fn send_command(
            &self,
            _target: CommandTarget,
            method: &str,
            params: Value,
        ) -> Result<Value, AdapterError> {
            self.commands.lock().await.push((method.to_string(), params));
            self.responses
                .lock()
                .await
                .get_mut(method)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(json!({})))
        }
    }

    fn event(method: &str, params: Value, session: Option<&str>) -> TransportEvent {
        TransportEvent {
            method: method.to_string(),
            params,
            session_id: session.map(str::to_string),
        }
    }

    fn info(target: &str, url: &str, title: &str) -> Value {
        json!({ "targetId": target, "type": "page", "url": url, "title": title, "attached": true })
    }

    async fn started() -> (
        Arc<CdpAdapter>,
        Arc<MockTransport>,
        mpsc::UnboundedSender<TransportEvent>,
        broadcast::Receiver<RawEvent>,
    ) {
        let (bus, rx) = crate::event_bus(32);
        let (transport, tx) = MockTransport::new_pair();
        let adapter = Arc::new(CdpAdapter::with_transport(
            CdpConfig::default(),
            bus,
            transport.clone() as Arc<dyn CdpTransport>,
        ));
        Arc::clone(&adapter).start().await.expect("start");
        (adapter, transport, tx, rx)
    }

    #[tokio::test]
    async fn title_changes_are_published_once() {
        let (adapter, _transport, tx, mut rx) = started().await;
        tx.send(event(
            "Target.targetCreated",
            json!({ "targetInfo": info("t1", "https://chat.example/", "") }),
            None,
        ))
        .unwrap();
        let page = match rx.recv().await.unwrap() {
            RawEvent::PageOpened { page, .. } => page,
            other => panic!("unexpected {other:?}"),
        };

        for _ in 0..2 {
            tx.send(event(
                "Target.targetInfoChanged",
                json!({ "targetInfo": info("t1", "https://chat.example/", "Example Chat") }),
                None,
            ))
            .unwrap();
        }
        tx.send(event("Target.targetDestroyed", json!({ "targetId": "t1" }), None))
            .unwrap();

        match rx.recv().await.unwrap() {
            RawEvent::PageTitleChanged { page: p, title, .. } => {
                assert_eq!(p, page);
                assert_eq!(title, "Example Chat");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(rx.recv().await.unwrap(), RawEvent::PageClosed { page: p, .. } if p == page));
        assert!(adapter.registry().get(&page).is_none());
        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn create_page_waits_for_attach() {
        let (adapter, transport, tx, _rx) = started().await;
        transport
            .respond("Target.createTarget", Ok(json!({ "targetId": "t9" })))
            .await;
        let attach = tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            tx.send(event(
                "Target.attachedToTarget",
                json!({ "sessionId": "s9", "targetInfo": info("t9", "https://a.example/", "") }),
                None,
            ))
            .unwrap();
        });

        let page = adapter.create_page("https://a.example/").await.expect("page");
        attach.await.unwrap();
        assert_eq!(adapter.registry().get_cdp_session(&page).as_deref(), Some("s9"));
        assert!(transport.methods().await.contains(&"Target.createTarget".to_string()));
        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn evaluate_reports_page_exceptions() {
        let (adapter, transport, tx, _rx) = started().await;
        tx.send(event(
            "Target.attachedToTarget",
            json!({ "sessionId": "s1", "targetInfo": info("t1", "https://a.example/", "") }),
            None,
        ))
        .unwrap();
        let page = loop {
            if let Some((page, _)) = adapter.registry().iter().into_iter().next() {
                break page;
            }
            sleep(Duration::from_millis(5)).await;
        };

        transport
            .respond(
                "Runtime.evaluate",
                Ok(json!({ "exceptionDetails": { "text": "Uncaught", "exception": { "description": "ReferenceError: x" } } })),
            )
            .await;
        let err = adapter.evaluate_script(page, "x").await.unwrap_err();
        assert_eq!(err.kind, AdapterErrorKind::ScriptFailed);
        assert_eq!(err.hint.as_deref(), Some("ReferenceError: x"));

        transport
            .respond("Runtime.evaluate", Ok(json!({ "result": { "type": "number", "value": 3 } })))
            .await;
        assert_eq!(adapter.evaluate_script(page, "1 + 2").await.unwrap(), json!(3));
        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn page_info_is_none_for_vanished_targets() {
        let (adapter, transport, _tx, _rx) = started().await;
        transport
            .respond("Target.getTargets", Ok(json!({ "targetInfos": [info("t2", "https://b.example/", "B")] })))
            .await;
        let pages = adapter.pages().await.unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "B");

        transport
            .respond(
                "Target.getTargetInfo",
                Err(AdapterError::new(AdapterErrorKind::Protocol).with_hint("No target with given id")),
            )
            .await;
        assert!(adapter.page_info(pages[0].page).await.unwrap().is_none());
        assert!(adapter.page_info(PageId::new()).await.unwrap().is_none());
        adapter.shutdown().await;
    }
}
