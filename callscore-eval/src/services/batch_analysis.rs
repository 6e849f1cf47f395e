//! Batch LLM analysis
//!
//! Runs the persona prompt against every transcript through a bounded pool of
//! concurrent tasks. Each task reads its transcript, asks the [`Analyzer`]
//! for a reply, strips a ```` ```json ```` fence and stores the reply as the
//! persona's analysis of that call. A failed task is recorded and the others
//! keep running.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use callscore_common::{Error, Result};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::loader::FsStore;

/// Pool width used when the caller has no preference
pub const DEFAULT_WORKERS: usize = 5;

/// Produces an analysis reply for one transcript
///
/// The LLM call itself lives behind this trait; the runner only needs the raw
/// reply text.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, prompt: &str, transcript: &str) -> anyhow::Result<String>;
}

/// A transcript whose analysis failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    pub transcript: String,
    pub error: String,
}

/// Outcome of a batch run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub persona: String,
    /// Call ids whose analysis was stored
    pub succeeded: Vec<String>,
    pub failed: Vec<TaskFailure>,
}

/// Strip a Markdown code fence (```` ```json ... ``` ````) around a reply
pub fn strip_json_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim()
}

/// Analyze every transcript for a persona with at most `concurrency` tasks
/// in flight (`0` runs one at a time)
///
/// Fails only when the persona prompt or the transcript list cannot be read.
pub async fn run_batch<A>(
    store: &FsStore,
    analyzer: Arc<A>,
    persona: &str,
    concurrency: usize,
) -> Result<BatchOutcome>
where
    A: Analyzer + ?Sized + 'static,
{
    let prompt = {
        let store = store.clone();
        let persona = persona.to_string();
        tokio::task::spawn_blocking(move || store.read_prompt(&persona))
            .await
            .map_err(|e| Error::Internal(e.to_string()))??
    };
    let transcripts = {
        let store = store.clone();
        tokio::task::spawn_blocking(move || store.list_transcriptions())
            .await
            .map_err(|e| Error::Internal(e.to_string()))??
    };

    let total = transcripts.len();
    let workers = concurrency.max(1);
    info!(
        persona = %persona,
        transcripts = total,
        workers = workers,
        "Starting batch analysis"
    );

    let prompt = Arc::new(prompt);
    let completed = Arc::new(AtomicUsize::new(0));

    let results: Vec<(String, anyhow::Result<()>)> = stream::iter(transcripts)
        .map(|transcript| {
            let store = store.clone();
            let analyzer = analyzer.clone();
            let prompt = prompt.clone();
            let completed = completed.clone();
            let persona = persona.to_string();

            async move {
                let result =
                    analyze_one(&store, analyzer.as_ref(), &prompt, &persona, &transcript).await;

                match &result {
                    Ok(()) => debug!(persona = %persona, transcript = %transcript, "Analysis stored"),
                    Err(e) => error!(
                        persona = %persona,
                        transcript = %transcript,
                        error = %e,
                        "Analysis failed"
                    ),
                }

                let current = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if current % 10 == 0 || current == total {
                    info!(
                        persona = %persona,
                        progress = format!("{}/{}", current, total),
                        "Batch analysis progress"
                    );
                }

                (transcript, result)
            }
        })
        .buffer_unordered(workers)
        .collect()
        .await;

    let mut outcome = BatchOutcome {
        persona: persona.to_string(),
        ..Default::default()
    };
    for (transcript, result) in results {
        match result {
            Ok(()) => outcome.succeeded.push(call_id(&transcript).to_string()),
            Err(e) => outcome.failed.push(TaskFailure {
                transcript,
                error: format!("{:#}", e),
            }),
        }
    }
    outcome.succeeded.sort();
    outcome.failed.sort_by(|a, b| a.transcript.cmp(&b.transcript));

    info!(
        persona = %persona,
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "Batch analysis finished"
    );
    Ok(outcome)
}

async fn analyze_one<A>(
    store: &FsStore,
    analyzer: &A,
    prompt: &str,
    persona: &str,
    transcript: &str,
) -> anyhow::Result<()>
where
    A: Analyzer + ?Sized,
{
    let text = {
        let store = store.clone();
        let name = transcript.to_string();
        tokio::task::spawn_blocking(move || store.read_transcription(&name))
            .await?
            .context("reading transcript")?
    };

    let reply = analyzer
        .analyze(prompt, &text)
        .await
        .context("analyzer call")?;
    let body = strip_json_fence(&reply).to_string();

    let store = store.clone();
    let persona = persona.to_string();
    let call = call_id(transcript).to_string();
    tokio::task::spawn_blocking(move || store.save_analysis(&persona, &call, &body))
        .await?
        .context("storing analysis")?;
    Ok(())
}

/// Call id of a transcript file (`c1.txt` → `c1`)
fn call_id(transcript: &str) -> &str {
    transcript.strip_suffix(".txt").unwrap_or(transcript)
}
