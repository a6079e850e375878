//! Pipeline orchestration for one review run.
//!
//! Step order matters: the change set is collected and bounded first, the
//! backend reviews it, then stale annotations from prior runs are reconciled
//! against the *full* finding set before the locator caps what goes inline —
//! a finding that cannot be placed inline still keeps its annotation alive.

use crossbeam_channel::Sender;
use tracing::{debug, info, warn};

use revbot_core::db;
use revbot_core::findings::parse_review_response;
use revbot_core::locate::locate_findings;
use revbot_core::reconcile::{plan_retractions, Retraction};
use revbot_core::select::select_change_set;

use crate::backend::{complete_with_retry, MessagesApiClient, ModelRequest};
use crate::config::Config;
use crate::error::RevbotError;
use crate::git::types::{ChangeSetPayload, ChangeSetRequest, DiffMode};
use crate::git::worker::change_set_worker;
use crate::prompt::build_prompt;
use crate::report::{annotation_body, review_report};

/// Per-run options resolved from the CLI.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub repo_path: String,
    pub mode: DiffMode,
    /// `(from, to)` refs; forces [`DiffMode::CommitRange`].
    pub range: Option<(String, String)>,
    /// Log planned writes and retractions instead of applying them.
    pub dry_run: bool,
}

/// Executes one full review run.
pub async fn run(options: &RunOptions, config: &Config) -> Result<(), RevbotError> {
    // The git worker thread owns the Repository; one request, one reply.
    let (request_tx, request_rx) = crossbeam_channel::unbounded::<ChangeSetRequest>();
    let (result_tx, mut result_rx) = tokio::sync::mpsc::unbounded_channel::<ChangeSetPayload>();
    let repo_path = options.repo_path.clone();
    std::thread::spawn(move || change_set_worker(repo_path, request_rx, result_tx));

    send_change_set_request(&request_tx, options)?;
    let payload = result_rx
        .recv()
        .await
        .ok_or_else(|| RevbotError::ChangeSet("git worker exited before replying".to_owned()))?;
    if let Some(error) = payload.error {
        return Err(RevbotError::ChangeSet(error));
    }
    if payload.files.is_empty() {
        info!("no files changed, skipping review");
        return Ok(());
    }
    info!(files = payload.files.len(), mode = payload.mode.as_str(), "collected change set");

    // Bound the change set, then ask the model.
    let rules = config.priority_rules();
    let selection = select_change_set(&payload.files, &rules, config.review.budget_bytes);
    debug!(
        included = selection.files.len(),
        total = selection.total_files,
        truncated = selection.truncated,
        "selected change set"
    );

    let prompt = build_prompt(&selection, config.review.max_inline);
    let client = MessagesApiClient::from_env(&config.review.api_base)?;
    let response = complete_with_retry(
        &client,
        &ModelRequest {
            model: config.review.model.clone(),
            system_prompt: prompt.system,
            user_prompt: prompt.user,
            max_tokens: config.review.max_tokens,
        },
    )
    .await?;

    let review = parse_review_response(&response);
    if review.dropped > 0 {
        warn!(dropped = review.dropped, "dropped malformed finding entries");
    }
    info!(findings = review.findings.len(), "parsed review response");

    // Reconcile against the session's annotation history, then place the
    // surviving findings inline.
    let db_dir = std::path::Path::new(&options.repo_path).join(".revbot");
    std::fs::create_dir_all(&db_dir)?;
    let conn = db::open_db(&db_dir.join("reviews.db").to_string_lossy()).await?;

    let diff_args = options
        .range
        .as_ref()
        .map(|(from, to)| format!("{from}..{to}"))
        .unwrap_or_default();
    let session = db::resume_or_create_session(
        &conn,
        &options.repo_path,
        effective_mode(options).as_str(),
        &diff_args,
    )
    .await?;

    let prior = db::load_open_annotations(&conn, &session.id).await?;
    let retractions = plan_retractions(&prior, &review.findings, &config.review.marker);
    apply_retractions(&conn, &retractions, options.dry_run).await;

    let located = locate_findings(&review.findings, &selection.files, config.review.max_inline);
    info!(
        inline = located.located.len(),
        unlocated = located.unlocated.len(),
        "located findings"
    );

    if options.dry_run {
        info!("dry run: skipping annotation writes");
    } else {
        for item in &located.located {
            let body = annotation_body(&item.finding, &config.review.marker);
            db::record_annotation(
                &conn,
                &session.id,
                &item.finding.path,
                item.finding.line,
                item.finding.severity,
                &body,
            )
            .await?;
        }
    }

    let report = review_report(
        &review.summary,
        review.findings.len(),
        &located.located,
        &located.unlocated,
        &selection,
        &config.review.marker,
    );
    println!("{report}");

    db::touch_session(&conn, &session.id).await?;
    Ok(())
}

/// Picks the diff mode actually in effect: an explicit range wins.
fn effective_mode(options: &RunOptions) -> DiffMode {
    if options.range.is_some() {
        DiffMode::CommitRange
    } else {
        options.mode
    }
}

fn send_change_set_request(
    tx: &Sender<ChangeSetRequest>,
    options: &RunOptions,
) -> Result<(), RevbotError> {
    let request = match &options.range {
        Some((from, to)) => ChangeSetRequest::CollectRange {
            from: from.clone(),
            to: to.clone(),
        },
        None => ChangeSetRequest::Collect(options.mode),
    };
    tx.send(request)
        .map_err(|_| RevbotError::ChangeSet("git worker is not running".to_owned()))
}

/// Applies (or, in dry-run mode, logs) the planned retractions.
///
/// Per-item failures are isolated: a failed retraction is logged and the
/// loop continues, with an aggregate warning at the end.
async fn apply_retractions(
    conn: &tokio_rusqlite::Connection,
    retractions: &[Retraction],
    dry_run: bool,
) {
    if retractions.is_empty() {
        debug!("no stale annotations to retract");
        return;
    }
    info!(count = retractions.len(), "retracting stale annotations");

    let mut failures = 0;
    for retraction in retractions {
        if dry_run {
            info!(
                path = %retraction.path,
                line = retraction.line,
                id = %retraction.id,
                "would retract stale annotation"
            );
            continue;
        }
        match db::retract_annotation(conn, &retraction.id).await {
            Ok(true) => {
                debug!(path = %retraction.path, line = retraction.line, "retracted");
            }
            Ok(false) => {
                debug!(id = %retraction.id, "annotation already retracted or missing");
            }
            Err(e) => {
                failures += 1;
                warn!(
                    path = %retraction.path,
                    line = retraction.line,
                    error = %e,
                    "failed to retract annotation"
                );
            }
        }
    }

    if failures > 0 {
        warn!(failures, "some retractions failed and remain open");
    }
}
