//! Parameter synchronization with a remote node.
//!
//! `ParameterClient` keeps three pieces of state, each behind its own mutex:
//! the session (node list, selected node, status line, phase), the
//! authoritative [`ParameterSet`] of the selected node, and the
//! [`OverlayStore`] of staged edits. Locks are only held while reading or
//! replacing state, never across a remote call, and are always taken in that
//! order.
//!
//! Remote calls may complete in any order. Every node selection bumps a
//! generation counter and every fetch bumps an epoch counter; a fetch only
//! applies its result when both are still current, so the parameter set
//! always belongs to the most recently selected node and the newest fetch.

use std::path::Path;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde::Serialize;
use serde::de::{DeserializeOwned, IgnoredAny};
use strum::Display;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, LoadError, Result, TransportError};
use crate::parameter::codec::{decode_for_display, encode_from_text};
use crate::parameter::loader::{self, LoadReport};
use crate::parameter::overlay::{OverlayStore, PendingValue};
use crate::parameter::store::ParameterSet;
use crate::parameter::types::{Parameter, ParameterValue};
use crate::parameter::wire_types::{
    GetParametersRequest, GetParametersResponse, ListParametersRequest, ListParametersResponse,
    NodesRequest, NodesResponse, SetParametersRequest,
};
use crate::transport::ServiceTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
pub enum ClientPhase {
    #[default]
    Idle,
    NodesListed,
    ParametersLoaded,
    Committing,
}

#[derive(Debug, Default)]
struct SessionState {
    nodes: Vec<String>,
    node: Option<String>,
    status: String,
    phase: ClientPhase,
}

/// Outcome of a commit: what was sent and what the node reports afterwards.
///
/// The remote service does not acknowledge individual parameters, so the only
/// evidence of what was applied is the refreshed parameter set.
#[derive(Debug)]
pub struct CommitReport {
    pub attempted: Vec<Parameter>,
    pub send: Result<()>,
    pub refresh: Result<()>,
    pub read_back: ParameterSet,
}

impl CommitReport {
    pub fn acknowledged(&self) -> bool {
        self.send.is_ok()
    }

    /// Attempted parameters whose read-back value differs from what was sent.
    pub fn divergent(&self) -> Vec<(&Parameter, Option<&ParameterValue>)> {
        self.attempted
            .iter()
            .map(|p| (p, self.read_back.value(&p.name)))
            .filter(|(p, read)| *read != Some(&p.value))
            .collect()
    }
}

/// Result of loading a parameter file: staging plus the commit it triggered.
#[derive(Debug)]
pub struct LoadOutcome {
    pub report: LoadReport,
    pub commit: CommitReport,
}

pub struct ParameterClient<T> {
    transport: T,
    config: ClientConfig,
    session: Mutex<SessionState>,
    parameters: Mutex<ParameterSet>,
    overlay: Mutex<OverlayStore>,
    generation: AtomicU64,
    fetch_epoch: AtomicU64,
    fetches: AtomicUsize,
}

impl<T: ServiceTransport> ParameterClient<T> {
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            session: Mutex::new(SessionState::default()),
            parameters: Mutex::new(ParameterSet::new()),
            overlay: Mutex::new(OverlayStore::new()),
            generation: AtomicU64::new(0),
            fetch_epoch: AtomicU64::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // ── Remote operations ────────────────────────────────────────────────────

    /// Enumerate the nodes reachable through the transport.
    ///
    /// On failure the node list is emptied and the status line explains why.
    pub async fn list_nodes(&self) -> Result<Vec<String>> {
        self.set_status("Fetching nodes...");
        let service = self.config.nodes_service.clone();

        match self
            .request::<_, NodesResponse>(&service, &NodesRequest {})
            .await
        {
            Ok(response) => {
                let mut session = self.session.lock();
                session.nodes = response.nodes.clone();
                if session.phase == ClientPhase::Idle {
                    session.phase = ClientPhase::NodesListed;
                }
                session.status = "Fetching nodes done".to_string();
                debug!(count = response.nodes.len(), "Fetched nodes");
                Ok(response.nodes)
            }
            Err(e) => {
                warn!(error = %e, "Fetching nodes failed");
                let mut session = self.session.lock();
                session.nodes.clear();
                session.status = format!("Fetching nodes failed: {e}");
                Err(e)
            }
        }
    }

    /// Switch to `node`, dropping the previous node's parameters and any
    /// unsent edits, then fetch the new node's parameters.
    pub async fn select_node(&self, node: &str) -> Result<()> {
        {
            let mut session = self.session.lock();
            self.generation.fetch_add(1, Ordering::AcqRel);
            session.node = Some(node.to_string());
            session.phase = ClientPhase::NodesListed;
            *self.parameters.lock() = ParameterSet::new();
            self.overlay.lock().clear();
        }
        info!(node, "Selected node");
        self.load_parameters().await
    }

    /// Fetch names and values of the selected node's parameters.
    ///
    /// On success the parameter set is replaced and staged edits are dropped.
    /// On failure the previous parameter set is kept.
    pub async fn load_parameters(&self) -> Result<()> {
        let (generation, node) = {
            let session = self.session.lock();
            let node = session.node.clone().ok_or(ClientError::NoNodeSelected)?;
            (self.generation.load(Ordering::Acquire), node)
        };
        self.fetch(&node, generation, true).await
    }

    /// Send every staged edit in one call, then re-read the node.
    ///
    /// The refresh runs whether or not the send succeeded. Sent edits are
    /// dropped only when the send succeeded, so a failed commit can be
    /// retried as is. Edits staged while the call is in flight are kept for
    /// the next commit.
    pub async fn commit(&self) -> Result<CommitReport> {
        let (generation, node, attempted) = {
            let mut session = self.session.lock();
            let node = session.node.clone().ok_or(ClientError::NoNodeSelected)?;
            let attempted = self.overlay.lock().pending_list();
            session.phase = ClientPhase::Committing;
            session.status = format!("Sending node parameters for node {node}...");
            (self.generation.load(Ordering::Acquire), node, attempted)
        };
        info!(node = %node, count = attempted.len(), "Sending node parameters");

        let service = format!("{node}/set_parameters");
        let request = SetParametersRequest {
            parameters: attempted.iter().map(Parameter::to_wire).collect(),
        };
        let send = self
            .request::<_, IgnoredAny>(&service, &request)
            .await
            .map(|_| ());

        {
            let mut session = self.session.lock();
            let current = self.generation.load(Ordering::Acquire) == generation;
            match &send {
                Ok(()) if current => {
                    self.overlay.lock().remove_sent(&attempted);
                    session.status = "Sending node parameters done".to_string();
                }
                Ok(()) => {}
                Err(e) => {
                    warn!(node = %node, error = %e, "Sending node parameters failed");
                    if current {
                        session.status = format!("Sending node parameters failed: {e}");
                    }
                }
            }
        }

        let refresh = self.fetch(&node, generation, false).await;
        {
            let mut session = self.session.lock();
            if self.generation.load(Ordering::Acquire) == generation {
                session.phase = ClientPhase::ParametersLoaded;
            }
        }

        Ok(CommitReport {
            attempted,
            send,
            refresh,
            read_back: self.parameters.lock().clone(),
        })
    }

    /// Parse a parameter document, stage its values and commit them.
    pub async fn load_str(&self, text: &str) -> std::result::Result<LoadOutcome, LoadError> {
        let node = self.selected_node().ok_or(ClientError::NoNodeSelected)?;
        let entries = loader::parse_document(text, &node)?;
        let report = {
            let parameters = self.parameters.lock();
            let mut overlay = self.overlay.lock();
            loader::stage_entries(&entries, &parameters, &mut overlay, self.config.coercion)?
        };
        info!(
            node = %node,
            staged = report.staged.len(),
            skipped = report.skipped.len(),
            "Staged parameter file"
        );
        let commit = self.commit().await?;
        Ok(LoadOutcome { report, commit })
    }

    /// Read a parameter file from disk and load it like [`Self::load_str`].
    pub async fn load_file(&self, path: &Path) -> std::result::Result<LoadOutcome, LoadError> {
        let text = loader::read_parameter_file(path)?;
        self.load_str(&text).await
    }

    // ── Local editing ────────────────────────────────────────────────────────

    /// Stage operator text for a parameter, typed after its current value.
    pub fn stage_text(&self, name: &str, text: &str) -> Result<PendingValue> {
        let parameters = self.parameters.lock();
        let current = parameters
            .value(name)
            .ok_or_else(|| ClientError::UnknownParameter(name.to_string()))?;
        let pending =
            encode_from_text(current, text, self.config.coercion).map_err(|source| {
                ClientError::Codec {
                    name: name.to_string(),
                    source,
                }
            })?;
        self.overlay.lock().set(name, pending.clone());
        Ok(pending)
    }

    /// Stage an already typed edit.
    pub fn stage(&self, name: &str, value: PendingValue) {
        self.overlay.lock().set(name, value);
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn nodes(&self) -> Vec<String> {
        self.session.lock().nodes.clone()
    }

    pub fn selected_node(&self) -> Option<String> {
        self.session.lock().node.clone()
    }

    pub fn status(&self) -> String {
        self.session.lock().status.clone()
    }

    pub fn phase(&self) -> ClientPhase {
        self.session.lock().phase
    }

    pub fn parameters(&self) -> ParameterSet {
        self.parameters.lock().clone()
    }

    pub fn parameter(&self, name: &str) -> Option<Parameter> {
        self.parameters.lock().get(name).cloned()
    }

    /// Display text of a parameter's current value.
    pub fn display_value(&self, name: &str) -> String {
        decode_for_display(self.parameters.lock().value(name))
    }

    /// Staged edits in staging order, including cleared ones.
    pub fn pending(&self) -> Vec<(String, PendingValue)> {
        self.overlay
            .lock()
            .iter()
            .map(|(name, pending)| (name.to_string(), pending.clone()))
            .collect()
    }

    /// Parameters the next commit would send.
    pub fn pending_list(&self) -> Vec<Parameter> {
        self.overlay.lock().pending_list()
    }

    /// Number of parameter fetches started so far.
    pub fn refresh_count(&self) -> usize {
        self.fetches.load(Ordering::Acquire)
    }

    // ── Internals ────────────────────────────────────────────────────────────

    async fn fetch(&self, node: &str, generation: u64, reset_overlay: bool) -> Result<()> {
        // A fetch for a node that is no longer selected must not supersede the
        // current node's fetch.
        let epoch = {
            let mut session = self.session.lock();
            if self.generation.load(Ordering::Acquire) != generation {
                debug!(node, "Skipping refresh of deselected node");
                return Err(ClientError::Stale);
            }
            self.fetches.fetch_add(1, Ordering::AcqRel);
            session.status = format!("Fetching node parameters for node {node}...");
            self.fetch_epoch.fetch_add(1, Ordering::AcqRel) + 1
        };

        let list_service = format!("{node}/list_parameters");
        let names = self
            .request::<_, ListParametersResponse>(&list_service, &ListParametersRequest {})
            .await
            .map_err(|e| self.fetch_failed("Fetching node parameters failed", generation, epoch, e))?
            .result
            .names;

        if !self.is_current(generation, epoch) {
            debug!(node, "Discarding stale parameter list");
            return Err(ClientError::Stale);
        }

        let get_service = format!("{node}/get_parameters");
        let request = GetParametersRequest {
            names: names.clone(),
        };
        let fresh = self
            .request::<_, GetParametersResponse>(&get_service, &request)
            .await
            .and_then(|response| ParameterSet::from_fetch(&names, &response.values))
            .map_err(|e| {
                self.fetch_failed("Fetching node parameters values failed", generation, epoch, e)
            })?;

        let mut session = self.session.lock();
        if !self.is_current(generation, epoch) {
            debug!(node, "Discarding stale parameter values");
            return Err(ClientError::Stale);
        }
        let count = fresh.len();
        *self.parameters.lock() = fresh;
        if reset_overlay {
            self.overlay.lock().reset(count);
        }
        session.phase = ClientPhase::ParametersLoaded;
        session.status = "Fetching node parameters done".to_string();
        info!(node, count, "Fetched node parameters");
        Ok(())
    }

    fn is_current(&self, generation: u64, epoch: u64) -> bool {
        self.generation.load(Ordering::Acquire) == generation
            && self.fetch_epoch.load(Ordering::Acquire) == epoch
    }

    /// Record a fetch failure unless the fetch was superseded meanwhile.
    fn fetch_failed(&self, what: &str, generation: u64, epoch: u64, e: ClientError) -> ClientError {
        let mut session = self.session.lock();
        if !self.is_current(generation, epoch) {
            return ClientError::Stale;
        }
        warn!(error = %e, "{}", what);
        session.status = format!("{what}: {e}");
        e
    }

    fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        debug!(status = %status, "Status");
        self.session.lock().status = status;
    }

    async fn request<Req, Resp>(&self, service: &str, request: &Req) -> Result<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let protocol = |source| ClientError::Protocol {
            service: service.to_string(),
            source,
        };
        let transport = |source| ClientError::Transport {
            service: service.to_string(),
            source,
        };

        let request = serde_json::to_value(request).map_err(protocol)?;
        let response = tokio::time::timeout(
            self.config.call_timeout,
            self.transport.call(service, request),
        )
        .await
        .map_err(|_| transport(TransportError::Timeout(service.to_string())))?
        .map_err(transport)?;
        serde_json::from_value(response).map_err(protocol)
    }
}
