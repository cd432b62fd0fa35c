//! Replay handler: drives one entry through a trace and reports its state.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;
use tokio::time::Instant;

use wifitrack_core::{
    ActionKind, CallbackContext, Collaborators, ConnectivityReport, EntryConfig, EntryListener,
    EntryView, NetworkKey, WifiEntry,
};

use crate::cli::{GlobalOpts, OutputFormat, ReplayArgs};
use crate::config;
use crate::error::CliError;
use crate::output;
use crate::trace::{self, ScriptedManager, Step, Trace};

// ── Report types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub key: String,
    pub summary: String,
    pub steps: Vec<StepRecord>,
    pub actions: Vec<ActionOutcome>,
    /// Requests still waiting for an outcome when the trace ended.
    pub pending: Vec<ActionKind>,
    pub final_view: EntryView,
}

#[derive(Debug, Serialize)]
pub struct StepRecord {
    pub step: usize,
    pub at_ms: u64,
    pub event: String,
    /// Listener notifications delivered while applying this step.
    pub notifications: usize,
    pub view: EntryView,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub at_ms: u64,
    pub kind: ActionKind,
    pub status: String,
}

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    step: usize,
    #[tabled(rename = "At (ms)")]
    at_ms: u64,
    #[tabled(rename = "Event")]
    event: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Level")]
    level: i32,
    #[tabled(rename = "Internet")]
    internet: String,
    #[tabled(rename = "Default")]
    default: String,
    #[tabled(rename = "Degraded")]
    degraded: String,
    #[tabled(rename = "Notified")]
    notifications: usize,
}

impl StepRow {
    fn new(record: &StepRecord, color: bool) -> Self {
        let view = &record.view;
        Self {
            step: record.step,
            at_ms: record.at_ms,
            event: record.event.clone(),
            state: output::paint_state(view.connected_state, color),
            level: view.level,
            internet: output::yes_no(view.has_internet_access),
            default: output::yes_no(view.is_default_network),
            degraded: output::yes_no(view.should_show_degraded_icon),
            notifications: record.notifications,
        }
    }
}

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "At (ms)")]
    at_ms: u64,
    #[tabled(rename = "Action")]
    kind: String,
    #[tabled(rename = "Status")]
    status: String,
}

// ── Listener ────────────────────────────────────────────────────────

#[derive(Default)]
struct UpdateCounter(AtomicUsize);

impl UpdateCounter {
    fn take(&self) -> usize {
        self.0.swap(0, Ordering::SeqCst)
    }
}

impl EntryListener for UpdateCounter {
    fn on_updated(&self, _key: &NetworkKey) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

type Outcomes = Arc<Mutex<Vec<ActionOutcome>>>;

fn elapsed_ms(origin: Instant) -> u64 {
    u64::try_from(origin.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn recorder<S: std::fmt::Display + 'static>(
    outcomes: &Outcomes,
    origin: Instant,
    kind: ActionKind,
) -> Box<dyn FnOnce(S) + Send + 'static> {
    let outcomes = Arc::clone(outcomes);
    Box::new(move |status: S| {
        outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ActionOutcome {
                at_ms: elapsed_ms(origin),
                kind,
                status: status.to_string(),
            });
    })
}

// ── Runner ──────────────────────────────────────────────────────────

/// Apply every step of `trace` to a fresh entry, in virtual time.
pub async fn run(trace: Trace, config: EntryConfig) -> Result<ReplayReport, CliError> {
    let ctx = CallbackContext::current()?;
    let collaborators = Collaborators {
        manager: Arc::new(ScriptedManager::new(trace.manager)),
        resolver: Arc::new(trace.resolver),
    };
    let entry = WifiEntry::new(trace.entry, collaborators, ctx.clone(), config)?;
    let counter = Arc::new(UpdateCounter::default());
    entry.set_listener(&counter);

    if !trace.known_security.is_empty() {
        entry.set_known_security_types(&trace.known_security);
        ctx.flush().await?;
        counter.take();
    }

    let outcomes: Outcomes = Arc::default();
    let origin = Instant::now();
    let mut steps = Vec::with_capacity(trace.steps.len());

    for (index, step) in trace.steps.into_iter().enumerate() {
        let event = step.to_string();
        tracing::debug!(step = index + 1, %event, "applying step");
        apply(&entry, step, &outcomes, origin).await;
        ctx.flush().await?;
        steps.push(StepRecord {
            step: index + 1,
            at_ms: elapsed_ms(origin),
            event,
            notifications: counter.take(),
            view: (*entry.view()).clone(),
        });
    }

    let pending = [
        ActionKind::Connect,
        ActionKind::Disconnect,
        ActionKind::Forget,
        ActionKind::SignIn,
    ]
    .into_iter()
    .filter(|kind| entry.is_action_pending(*kind))
    .collect();

    let report = ReplayReport {
        key: entry.key().to_string(),
        summary: entry.to_string(),
        steps,
        actions: outcomes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone(),
        pending,
        final_view: (*entry.view()).clone(),
    };
    entry.shutdown();
    Ok(report)
}

async fn apply(entry: &WifiEntry, step: Step, outcomes: &Outcomes, origin: Instant) {
    match step {
        Step::LinkInfo { info, state } => entry.on_link_info_changed(&info, state),
        Step::Capabilities { network, caps } => entry.on_capabilities_changed(network, caps),
        Step::LinkProperties {
            network,
            properties,
        } => entry.on_link_properties_changed(network, &properties),
        Step::NetworkLost { network } => entry.on_network_lost(network),
        Step::DefaultCapabilities { network, caps } => {
            entry.on_default_network_capabilities_changed(network, caps);
        }
        Step::DefaultNetworkLost => entry.on_default_network_lost(),
        Step::ConnectivityReport { network, validated } => {
            entry.on_connectivity_report(ConnectivityReport { network, validated });
        }
        Step::KnownSecurity { descriptors } => entry.set_known_security_types(&descriptors),
        Step::Connect => {
            entry.connect(Some(recorder(outcomes, origin, ActionKind::Connect)));
        }
        Step::Disconnect => {
            entry.disconnect(Some(recorder(outcomes, origin, ActionKind::Disconnect)));
        }
        Step::Forget => entry.forget(Some(recorder(outcomes, origin, ActionKind::Forget))),
        Step::SignIn => entry.sign_in(Some(recorder(outcomes, origin, ActionKind::SignIn))),
        Step::Advance { ms } => tokio::time::sleep(Duration::from_millis(ms)).await,
    }
}

// ── Rendering ───────────────────────────────────────────────────────

fn render_table(report: &ReplayReport, color: bool) -> String {
    let mut out = String::new();
    if !report.steps.is_empty() {
        let rows: Vec<StepRow> = report
            .steps
            .iter()
            .map(|record| StepRow::new(record, color))
            .collect();
        out.push_str(&output::render_table(&rows));
        out.push('\n');
    }
    if !report.actions.is_empty() {
        let rows: Vec<ActionRow> = report
            .actions
            .iter()
            .map(|outcome| ActionRow {
                at_ms: outcome.at_ms,
                kind: outcome.kind.to_string(),
                status: output::paint_status(&outcome.status, color),
            })
            .collect();
        out.push_str(&output::render_table(&rows));
        out.push('\n');
    }
    for kind in &report.pending {
        out.push_str(&format!("pending: {kind}\n"));
    }
    out.push_str(&report.summary);
    out
}

fn render_plain(report: &ReplayReport) -> String {
    let mut lines: Vec<String> = report
        .steps
        .iter()
        .map(|r| {
            format!(
                "{} {}ms {} -> {} level={}",
                r.step, r.at_ms, r.event, r.view.connected_state, r.view.level
            )
        })
        .collect();
    lines.extend(
        report
            .actions
            .iter()
            .map(|a| format!("{}ms {} {}", a.at_ms, a.kind, a.status)),
    );
    lines.push(report.summary.clone());
    lines.join("\n")
}

pub async fn handle(args: ReplayArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let format = config::output_format(global, &cfg);
    let color = output::should_color(config::color_mode(global, &cfg));
    let ReplayArgs {
        trace: trace_path,
        format: trace_format,
        connect_timeout_ms,
        final_only,
    } = args;
    let entry_config = config::entry_config(&cfg, connect_timeout_ms)?;

    let trace = trace::load(&trace_path, trace_format)?;
    let mut report = run(trace, entry_config).await?;
    if final_only {
        report.steps.clear();
    }

    let out = match format {
        OutputFormat::Table => render_table(&report, color),
        other => output::render_single(other, &report, |r| render_table(r, color), render_plain)?,
    };
    output::print_output(&out, global.quiet);
    Ok(())
}
