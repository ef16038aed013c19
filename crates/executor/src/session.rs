//! Session context: everything that lives for one connection.
//!
//! The [`SessionContext`] owns the session handle together with the path
//! index, the result cache, caller subscriptions and the structural
//! watchers that keep the index honest about edits made outside the bridge.
//! It is created on connect and torn down on disconnect; nothing in it is
//! global.
//!
//! # Usage
//!
//! ```ignore
//! use bridge_executor::{BridgeConfig, Command, MemoryProject, Plan, SessionContext};
//!
//! let project = MemoryProject::new();
//! let mut ctx = SessionContext::connect(&project.connector(), BridgeConfig::default())?;
//!
//! let outcome = ctx.execute(Plan::new(vec![Command::ListEvents { filter: None }]))?;
//! assert!(!outcome.transactional);
//!
//! ctx.disconnect();
//! ```

use std::collections::{HashMap, HashSet};

use bridge_core::{ObjectId, ObjectPath};
use bridge_index::{IndexEntry, PathIndex, ResultCache};
use bridge_session::{methods, ChangeEvent, Connector, SessionHandle, Subscription, SubscriptionId};
use serde_json::json;
use tracing::{debug, info};

use crate::bridge::Remote;
use crate::convert::convert_result;
use crate::{BridgeConfig, Error, Executor, Plan, PlanOutcome, Result};

/// Per-connection state of the bridge.
///
/// Plans run one at a time through [`SessionContext::execute`]; the
/// `&mut self` receiver is what keeps two plans from overlapping on the
/// same session.
pub struct SessionContext {
    handle: Option<Box<dyn SessionHandle>>,
    index: PathIndex,
    cache: ResultCache,
    config: BridgeConfig,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    watchers: Vec<Subscription>,
    touched: HashSet<ObjectId>,
}

impl SessionContext {
    /// Validate `config`, open a session through `connector` and start
    /// watching structural changes.
    ///
    /// # Errors
    ///
    /// `Config` for an invalid configuration, `Connection` if the session
    /// cannot be opened.
    pub fn connect(connector: &dyn Connector, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        let handle = convert_result(connector.connect(&config.session_options()))?;
        info!(target: "bridge::session", url = %config.url, "Connected");
        Self::with_handle(handle, config)
    }

    /// Wrap an already open session handle.
    ///
    /// # Errors
    ///
    /// `Config` for an invalid configuration, `NotConnected` if the handle
    /// is closed.
    pub fn with_handle(mut handle: Box<dyn SessionHandle>, config: BridgeConfig) -> Result<Self> {
        config.validate()?;
        if !handle.is_connected() {
            return Err(Error::NotConnected);
        }
        let mut watchers = Vec::with_capacity(methods::STRUCTURAL_TOPICS.len());
        for topic in methods::STRUCTURAL_TOPICS {
            watchers.push(convert_result(handle.subscribe(topic, json!({})))?);
        }
        Ok(Self {
            handle: Some(handle),
            index: PathIndex::new(),
            cache: ResultCache::new(),
            config,
            subscriptions: HashMap::new(),
            watchers,
            touched: HashSet::new(),
        })
    }

    /// Run a plan. See [`Executor::execute`].
    pub fn execute(&mut self, plan: Plan) -> Result<PlanOutcome> {
        Executor::new().execute(self, plan)
    }

    /// Close the session and drop the index, the cache and every
    /// subscription. Idempotent.
    pub fn disconnect(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            let ids = self
                .watchers
                .iter()
                .map(Subscription::id)
                .chain(self.subscriptions.keys().copied());
            for id in ids {
                if let Err(e) = handle.unsubscribe(id) {
                    debug!(target: "bridge::session", %id, error = %e, "Unsubscribe on disconnect failed");
                }
            }
            handle.disconnect();
            info!(target: "bridge::session", "Disconnected");
        }
        self.watchers.clear();
        self.subscriptions.clear();
        self.touched.clear();
        self.index.clear();
        self.cache.clear();
    }

    /// Whether the session is open.
    pub fn is_connected(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| h.is_connected())
    }

    /// The path index.
    pub fn index(&self) -> &PathIndex {
        &self.index
    }

    /// The result cache.
    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// The configuration the session was opened with.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Ids of the caller's open subscriptions.
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.subscriptions.keys().copied().collect()
    }

    /// Flattened index entries under `root`, `root` included.
    pub fn query_index(&self, root: &ObjectPath) -> Vec<IndexEntry> {
        self.index.entries_under(root)
    }

    /// Resolve one path to its id, from the index when possible.
    ///
    /// # Errors
    ///
    /// `NotFound` if the path does not exist remotely, `NotConnected` after
    /// disconnect.
    pub fn lookup(&mut self, path: &ObjectPath) -> Result<ObjectId> {
        self.absorb_external_changes();
        let mut remote = self.remote(false)?;
        remote.resolve(path).map(|entry| entry.object_id)
    }

    /// Mark `path` and its descendants stale.
    pub fn invalidate(&mut self, path: &ObjectPath) -> usize {
        self.index.invalidate(path)
    }

    // =========================================================================
    // Executor plumbing
    // =========================================================================

    pub(crate) fn session_mut(&mut self) -> Result<&mut dyn SessionHandle> {
        match self.handle.as_mut() {
            Some(handle) if handle.is_connected() => {
                let session: &mut dyn SessionHandle = handle.as_mut();
                Ok(session)
            }
            _ => Err(Error::NotConnected),
        }
    }

    /// Borrow the parts a handler may touch while one command runs.
    pub(crate) fn remote(&mut self, reuse_previous: bool) -> Result<Remote<'_>> {
        let session = match self.handle.as_mut() {
            Some(handle) if handle.is_connected() => handle,
            _ => return Err(Error::NotConnected),
        };
        Ok(Remote {
            session: &mut **session,
            index: &mut self.index,
            cache: &self.cache,
            config: &self.config,
            subscriptions: &mut self.subscriptions,
            touched: &mut self.touched,
            reuse_previous,
        })
    }

    pub(crate) fn index_mut(&mut self) -> &mut PathIndex {
        &mut self.index
    }

    pub(crate) fn cache_mut(&mut self) -> &mut ResultCache {
        &mut self.cache
    }

    // =========================================================================
    // External change tracking
    // =========================================================================

    /// Treat every buffered structural event as an external edit.
    ///
    /// Runs before a plan, when no change of the bridge's own can be pending.
    pub(crate) fn absorb_external_changes(&mut self) -> usize {
        let events: Vec<ChangeEvent> = self.watchers.iter().flat_map(Subscription::drain_all).collect();
        let count: usize = events.iter().map(|e| invalidate_for(&mut self.index, e)).sum();
        if count > 0 {
            debug!(target: "bridge::index", events = events.len(), count, "External changes invalidated index entries");
        }
        count
    }

    /// Sort the events a plan left behind: changes to objects the plan
    /// touched are its own echoes, anything else came from outside.
    pub(crate) fn settle_change_events(&mut self) -> usize {
        let events: Vec<ChangeEvent> = self.watchers.iter().flat_map(Subscription::drain_all).collect();
        let mut echoes = 0;
        let mut count = 0;
        for event in &events {
            let own = event.object_id.as_ref().is_some_and(|id| self.touched.contains(id));
            if own {
                echoes += 1;
            } else {
                count += invalidate_for(&mut self.index, event);
            }
        }
        self.touched.clear();
        debug!(target: "bridge::index", echoes, invalidated = count, "Settled change events");
        count
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("connected", &self.is_connected())
            .field("indexed", &self.index.len())
            .field("cached", &self.cache.get().map_or(0, |set| set.len()))
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Invalidate whatever `event` may have made wrong. Returns how many
/// entries were marked stale.
fn invalidate_for(index: &mut PathIndex, event: &ChangeEvent) -> usize {
    let mut count = 0;
    if let Some(id) = &event.object_id {
        count += index.invalidate_id(id);
    }
    if let Some(path) = &event.path {
        count += index.invalidate(path);
    }
    if let Some(path) = &event.new_path {
        count += index.invalidate(path);
    }
    count
}
