//! Tip list: live suggestions fetched while the user types.
//!
//! At most one fetch is in flight per box. Starting a fetch aborts the
//! previous one first, and a fetch only commits its list if its ticket is
//! still the box's pending ticket at commit time. Commits replace the list
//! wholesale through a `watch` channel.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::cancel::{AbortHandle, AbortSignal};
use crate::collab::{all_visible, VisiblePredicate};
use crate::dict::{Dict, DictItem};
use crate::input::ValueInput;
use crate::pipeline::Stage;
use crate::state::BoxState;
use crate::value::any_to_str;

/// Minimum gap between accepted fetch triggers.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(10);

/// When a focused box may show its tip list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TipShowTime {
    /// Whenever focused
    #[default]
    Focus,
    /// Only after a key press
    Keyin,
    /// Only while the typed text differs from the committed value
    Input,
}

/// Why a tip update was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerReason {
    KeyedInput,
    ValueChanged,
    Focus,
}

#[derive(Debug, Clone)]
pub struct TipOptions {
    pub show_time: TipShowTime,
    /// Pass the typed text to the source; otherwise enumerate everything
    pub use_hint: bool,
    /// Stages used to tidy the hint before querying; empty leaves it as typed
    pub tidy_by: Vec<Stage>,
    /// Keep raw source items instead of normalizing them
    pub keep_raw: bool,
    pub debounce: Duration,
}

impl Default for TipOptions {
    fn default() -> Self {
        Self {
            show_time: TipShowTime::default(),
            use_hint: true,
            tidy_by: Vec::new(),
            keep_raw: false,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// One suggestion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TipItem {
    Std(DictItem),
    Raw(Value),
}

impl TipItem {
    pub fn text(&self) -> String {
        match self {
            TipItem::Std(item) => item.text.clone(),
            TipItem::Raw(raw) => any_to_str(raw),
        }
    }
}

pub type TipList = Arc<Vec<TipItem>>;

/// What `request_update` did.
#[derive(Debug)]
pub enum TipRequest {
    /// Inside the debounce window of the previous accepted request
    Debounced,
    /// Show policy not met; the list was reset
    Hidden,
    /// The box has no dictionary to query
    NoDict,
    Issued(FetchHandle),
}

impl TipRequest {
    pub fn into_handle(self) -> Option<FetchHandle> {
        match self {
            TipRequest::Issued(handle) => Some(handle),
            _ => None,
        }
    }
}

/// How a fetch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// List committed with this many items
    Committed(usize),
    /// Aborted or replaced before it could commit
    Superseded,
    /// Source failed; list left untouched
    Failed,
}

/// Join handle of a spawned fetch.
#[derive(Debug)]
pub struct FetchHandle {
    ticket: u64,
    task: JoinHandle<FetchOutcome>,
}

impl FetchHandle {
    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub async fn outcome(self) -> FetchOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(ticket = self.ticket, error = %err, "tip fetch task died");
                FetchOutcome::Failed
            }
        }
    }
}

#[derive(Debug, Default)]
struct Slot {
    pending: Option<AbortHandle>,
    last_request: Option<Instant>,
}

impl Slot {
    fn abort_pending(&mut self, reason: &str) {
        if let Some(handle) = self.pending.take() {
            handle.abort(reason);
        }
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.pending.as_ref().map(AbortHandle::ticket) == Some(ticket)
    }
}

fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct TipListController {
    input: Arc<ValueInput>,
    options: TipOptions,
    visible: VisiblePredicate,
    slot: Arc<Mutex<Slot>>,
    tips: watch::Sender<Option<TipList>>,
}

impl TipListController {
    pub fn new(input: Arc<ValueInput>, options: TipOptions) -> Self {
        let (tips, _) = watch::channel(None);
        Self {
            input,
            options,
            visible: all_visible(),
            slot: Arc::new(Mutex::new(Slot::default())),
            tips,
        }
    }

    pub fn with_visible(mut self, visible: VisiblePredicate) -> Self {
        self.visible = visible;
        self
    }

    pub fn options(&self) -> &TipOptions {
        &self.options
    }

    /// Current tip list; `None` after a reset.
    pub fn tips(&self) -> Option<TipList> {
        self.tips.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TipList>> {
        self.tips.subscribe()
    }

    pub fn is_fetching(&self) -> bool {
        lock(&self.slot).pending.is_some()
    }

    pub fn pending_ticket(&self) -> Option<u64> {
        lock(&self.slot).pending.as_ref().map(AbortHandle::ticket)
    }

    fn should_show(&self, reason: TriggerReason, state: &BoxState) -> bool {
        if !state.focused {
            return false;
        }
        match self.options.show_time {
            TipShowTime::Focus => true,
            TipShowTime::Keyin => reason == TriggerReason::KeyedInput || state.keyboard.is_some(),
            TipShowTime::Input => state.input_differs(),
        }
    }

    /// Ask for a fresh tip list for `hint`.
    ///
    /// Slot updates (abort of the previous fetch, new ticket, request
    /// time) happen before this returns; the fetch itself runs on a
    /// spawned task. Must be called inside a tokio runtime.
    pub fn request_update(&self, hint: &str, reason: TriggerReason, state: &BoxState) -> TipRequest {
        let now = Instant::now();
        let mut slot = lock(&self.slot);

        if let Some(last) = slot.last_request {
            if now.duration_since(last) < self.options.debounce {
                debug!(?reason, "tip request debounced");
                return TipRequest::Debounced;
            }
        }

        if !self.should_show(reason, state) {
            debug!(?reason, show_time = ?self.options.show_time, "tip list hidden");
            self.reset_locked(&mut slot);
            return TipRequest::Hidden;
        }

        slot.abort_pending("Cancel Last Query");

        let Some(dict) = self.input.dict().cloned() else {
            return TipRequest::NoDict;
        };

        let handle = AbortHandle::new();
        let ticket = handle.ticket();
        let signal = handle.signal();
        slot.pending = Some(handle);
        slot.last_request = Some(now);
        drop(slot);

        debug!(ticket, hint, ?reason, "tip fetch issued");
        let job = FetchJob {
            ticket,
            signal,
            hint: hint.to_string(),
            dict,
            input: self.input.clone(),
            options: self.options.clone(),
            visible: self.visible.clone(),
            slot: self.slot.clone(),
            tips: self.tips.clone(),
        };
        TipRequest::Issued(FetchHandle {
            ticket,
            task: tokio::spawn(job.run()),
        })
    }

    /// Forget the request time, abort any fetch and clear the list.
    /// Idempotent.
    pub fn reset(&self) {
        let mut slot = lock(&self.slot);
        self.reset_locked(&mut slot);
    }

    fn reset_locked(&self, slot: &mut Slot) {
        slot.last_request = None;
        slot.abort_pending("Reset TipList");
        self.tips.send_replace(None);
    }
}

impl Drop for TipListController {
    fn drop(&mut self) {
        lock(&self.slot).abort_pending("Box dropped");
    }
}

struct FetchJob {
    ticket: u64,
    signal: AbortSignal,
    hint: String,
    dict: Arc<Dict>,
    input: Arc<ValueInput>,
    options: TipOptions,
    visible: VisiblePredicate,
    slot: Arc<Mutex<Slot>>,
    tips: watch::Sender<Option<TipList>>,
}

impl FetchJob {
    async fn run(self) -> FetchOutcome {
        let query = async {
            let hint = self.tidy_hint().await;
            let hint = self.options.use_hint.then_some(hint);
            self.dict.query_list(hint.as_deref(), &self.signal).await
        };

        // Dropping the query future aborts the underlying source call.
        let result = tokio::select! {
            biased;
            _ = self.signal.aborted() => return FetchOutcome::Superseded,
            result = query => result,
        };

        match result {
            Ok(list) => {
                let items = self.normalize(list);
                self.commit(items)
            }
            Err(err) => {
                let mut slot = lock(&self.slot);
                if !slot.is_current(self.ticket) {
                    debug!(ticket = self.ticket, error = %err, "stale tip fetch failed");
                    return FetchOutcome::Superseded;
                }
                warn!(ticket = self.ticket, dict = self.dict.name(), error = %err, "tip fetch failed");
                slot.pending = None;
                FetchOutcome::Failed
            }
        }
    }

    async fn tidy_hint(&self) -> String {
        if self.options.tidy_by.is_empty() {
            return self.hint.clone();
        }
        match self
            .input
            .tidy(Value::String(self.hint.clone()), &self.options.tidy_by)
            .await
        {
            Ok(v) => any_to_str(&v),
            Err(err) => {
                warn!(error = %err, "hint tidy failed; querying with raw hint");
                self.hint.clone()
            }
        }
    }

    fn normalize(&self, list: Vec<Value>) -> Vec<TipItem> {
        let i18n = self.input.i18n();
        list.into_iter()
            .filter(|raw| (self.visible)(raw))
            .map(|raw| {
                if self.options.keep_raw {
                    TipItem::Raw(raw)
                } else {
                    let mut item = self.dict.to_item(&raw);
                    item.text = i18n.text(&item.text);
                    item.tip = item.tip.map(|t| i18n.text(&t));
                    TipItem::Std(item)
                }
            })
            .collect()
    }

    fn commit(&self, items: Vec<TipItem>) -> FetchOutcome {
        let mut slot = lock(&self.slot);
        if !slot.is_current(self.ticket) {
            debug!(ticket = self.ticket, "stale tip fetch dropped");
            return FetchOutcome::Superseded;
        }
        slot.pending = None;
        let count = items.len();
        self.tips.send_replace(Some(Arc::new(items)));
        debug!(ticket = self.ticket, count, "tip list committed");
        FetchOutcome::Committed(count)
    }
}
