use crate::domain::calendar_grid::{build_grid, month_title};
use crate::domain::event_index::index_by_date;
use crate::domain::models::{Event, MonthView, ViewMonth};
use crate::error::PlannerError;
use crate::infrastructure::planner_api::PlannerApi;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::time::{sleep, Duration as TokioDuration};
use tracing::{debug, warn};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Prev,
    Next,
}

/// Machine position of the store. The event list and viewed month live
/// alongside the phase, so `Error` still renders the last known events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlannerPhase {
    Idle,
    Loading,
    Ready,
    Error(PlannerError),
}

#[derive(Debug, Clone)]
struct StoredEvent {
    event: Event,
    provisional_token: Option<u64>,
}

#[derive(Debug)]
struct PlannerState {
    phase: PlannerPhase,
    events: Vec<StoredEvent>,
    view: ViewMonth,
    generation: u64,
}

/// Holds the authoritative event list and the viewed month, and composes
/// the grid and index into the renderable month view. All mutation goes
/// through the operations below; callers only ever receive clones.
pub struct PlannerStore<A: PlannerApi> {
    api: Arc<A>,
    state: Mutex<PlannerState>,
    retry_policy: RetryPolicy,
    next_token: AtomicU64,
}

impl<A: PlannerApi> PlannerStore<A> {
    pub fn new(api: Arc<A>) -> Self {
        let view = ViewMonth::from_date(Utc::now().date_naive());
        Self {
            api,
            state: Mutex::new(PlannerState {
                phase: PlannerPhase::Idle,
                events: Vec::new(),
                view,
                generation: 0,
            }),
            retry_policy: RetryPolicy::default(),
            next_token: AtomicU64::new(1),
        }
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Seed the starting month from an injected clock. The store never
    /// consults the clock again after construction; "today" only picks the
    /// first viewed month.
    pub fn with_now_provider(self, now_provider: NowProvider) -> Self {
        {
            let mut state = self.lock_state();
            state.view = ViewMonth::from_date((now_provider)().date_naive());
        }
        self
    }

    /// Initial load: fetch the event list and enter `Ready` (or `Error`,
    /// keeping whatever list was already known).
    pub async fn load(&self) -> Result<MonthView, PlannerError> {
        self.refresh().await
    }

    /// Recover from `Error` without moving the viewed month.
    pub async fn retry(&self) -> Result<MonthView, PlannerError> {
        self.refresh().await
    }

    /// Step the viewed month, wrapping at year boundaries, then re-fetch.
    /// Months are never cached; every navigation is a fresh load.
    pub async fn navigate(&self, direction: Direction) -> Result<MonthView, PlannerError> {
        {
            let mut state = self.lock_state();
            state.view = match direction {
                Direction::Prev => state.view.prev(),
                Direction::Next => state.view.next(),
            };
        }
        self.refresh().await
    }

    /// Jump to a specific month. `month` is a zero-based index; anything
    /// outside [0, 11] is rejected before the view or network is touched.
    pub async fn set_month(&self, year: i32, month: u32) -> Result<MonthView, PlannerError> {
        let view = ViewMonth::new(year, month)?;
        {
            let mut state = self.lock_state();
            state.view = view;
        }
        self.refresh().await
    }

    /// Optimistic create: the event appears in the view immediately and is
    /// reconciled with the server's canonical record when the request
    /// resolves, or rolled back if it fails.
    pub async fn add_event(&self, title: &str, date: &str) -> Result<MonthView, PlannerError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PlannerError::Validation(
                "event title must not be empty".to_string(),
            ));
        }
        let date = date.trim();

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        {
            let mut state = self.lock_state();
            state.events.push(StoredEvent {
                event: Event {
                    id: None,
                    title: title.to_string(),
                    date: if date.is_empty() {
                        None
                    } else {
                        Some(date.to_string())
                    },
                },
                provisional_token: Some(token),
            });
            debug!(token, "inserted provisional planner event");
        }

        match self.api.create(title, date).await {
            Ok(canonical) => {
                let mut state = self.lock_state();
                if let Some(stored) = state
                    .events
                    .iter_mut()
                    .find(|stored| stored.provisional_token == Some(token))
                {
                    debug!(token, id = ?canonical.id, "reconciled provisional planner event");
                    stored.event = canonical;
                    stored.provisional_token = None;
                } else if !state
                    .events
                    .iter()
                    .any(|stored| stored.event.id.is_some() && stored.event.id == canonical.id)
                {
                    // A wholesale refresh replaced the list while the create
                    // was in flight and did not yet include this record.
                    state.events.push(StoredEvent {
                        event: canonical,
                        provisional_token: None,
                    });
                }
                state.phase = PlannerPhase::Ready;
                Self::render(&state)
            }
            Err(error) => {
                let mut state = self.lock_state();
                state
                    .events
                    .retain(|stored| stored.provisional_token != Some(token));
                state.phase = PlannerPhase::Error(error.clone());
                warn!(token, error = %error, "rolled back provisional planner event");
                Err(error)
            }
        }
    }

    /// Render the current state. Derived fresh on every call; the result is
    /// never a handle into store internals.
    pub fn view_model(&self) -> Result<MonthView, PlannerError> {
        Self::render(&self.lock_state())
    }

    pub fn phase(&self) -> PlannerPhase {
        self.lock_state().phase.clone()
    }

    pub fn view_month(&self) -> ViewMonth {
        self.lock_state().view
    }

    /// Snapshot of the authoritative event list, including undated and
    /// malformed-date events that never appear in the grid.
    pub fn events(&self) -> Vec<Event> {
        self.lock_state()
            .events
            .iter()
            .map(|stored| stored.event.clone())
            .collect()
    }

    async fn refresh(&self) -> Result<MonthView, PlannerError> {
        let (generation, view) = {
            let mut state = self.lock_state();
            state.generation += 1;
            state.phase = PlannerPhase::Loading;
            (state.generation, state.view)
        };
        debug!(generation, year = view.year(), month = view.month(), "issuing planner fetch");

        let outcome = self.fetch_with_retry().await;

        let mut state = self.lock_state();
        if state.generation != generation {
            // Superseded by a newer navigate; last navigate wins.
            debug!(generation, current = state.generation, "discarding stale planner response");
            return Self::render(&state);
        }

        match outcome {
            Ok(events) => {
                state.events = events
                    .into_iter()
                    .map(|event| StoredEvent {
                        event,
                        provisional_token: None,
                    })
                    .collect();
                state.phase = PlannerPhase::Ready;
                debug!(generation, count = state.events.len(), "applied planner fetch");
                Self::render(&state)
            }
            Err(error) => {
                state.phase = PlannerPhase::Error(error.clone());
                Err(error)
            }
        }
    }

    async fn fetch_with_retry(&self) -> Result<Vec<Event>, PlannerError> {
        let max_attempts = self.retry_policy.max_attempts.max(1);
        let mut attempt: u8 = 0;

        loop {
            match self.api.fetch_all().await {
                Ok(events) => return Ok(events),
                Err(error) if Self::should_retry(&error) && attempt + 1 < max_attempts => {
                    let delay = self
                        .retry_policy
                        .base_delay_ms
                        .saturating_mul(2u64.saturating_pow(u32::from(attempt)));
                    warn!(attempt = attempt + 1, delay_ms = delay, error = %error, "retrying planner fetch");
                    sleep(TokioDuration::from_millis(delay)).await;
                    attempt = attempt.saturating_add(1);
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn should_retry(error: &PlannerError) -> bool {
        matches!(error, PlannerError::Network(_))
    }

    fn render(state: &PlannerState) -> Result<MonthView, PlannerError> {
        let events: Vec<Event> = state
            .events
            .iter()
            .map(|stored| stored.event.clone())
            .collect();
        let mut index = index_by_date(&events);

        let mut cells = build_grid(state.view.year(), state.view.month())?;
        for cell in &mut cells {
            let Some(day) = cell.day_of_month else {
                continue;
            };
            if let Some(day_events) = index.remove(&state.view.date_key(day)) {
                cell.events = day_events;
            }
        }

        Ok(MonthView {
            title: month_title(&state.view),
            cells,
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, PlannerState> {
        // State stays consistent even if a panicking caller poisoned the lock.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
