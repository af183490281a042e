//! Drives one user-initiated analysis from submit to a terminal outcome.
//!
//! A cached player goes through the single round-trip regenerate call; a cache
//! miss (or a forced refresh) streams the full analysis. Every state change is
//! sent to the UI as a [`Delta`] stamped with the request generation, and a run
//! stops touching anything once a newer generation has begun.

use std::io::{self, ErrorKind, Read};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use crate::api::{RoastBackend, StreamBody};
use crate::frames::{FrameDecoder, StreamEvent, parse_frame};
use crate::model::{
    AnalysisRequest, AnalyzeRequestBody, CacheEntry, LastSearch, RegenerateRequest, ResultPayload,
    flatten_pro_directory,
};
use crate::session_cache::{SessionCache, cache_key};
use crate::state::Delta;

pub const REGENERATING_MESSAGE: &str = "Regenerating roasts...";
pub const STREAM_ENDED_EARLY: &str = "Analysis stream ended before a result arrived";
const READ_CHUNK: usize = 8 * 1024;
const READ_AHEAD_CHUNKS: usize = 4;
/// How often a worker blocked on the stream re-checks its ticket.
const CANCEL_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(Box<ResultPayload>),
    Failed(String),
    /// A newer request started before this one finished; nothing was applied.
    Superseded,
}

/// Handle for one request generation.
#[derive(Debug, Clone)]
pub struct Ticket {
    generation: u64,
    latest: Arc<AtomicU64>,
}

impl Ticket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.generation
    }

    /// A failure seen after a newer request took over is reported as superseded.
    fn fail(&self, error: impl Into<String>) -> Outcome {
        if self.is_current() {
            Outcome::Failed(error.into())
        } else {
            Outcome::Superseded
        }
    }
}

pub struct Orchestrator {
    backend: Arc<dyn RoastBackend>,
    cache: SessionCache,
    latest: Arc<AtomicU64>,
}

impl Orchestrator {
    pub fn new(backend: Arc<dyn RoastBackend>, cache: SessionCache) -> Self {
        Self {
            backend,
            cache,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    pub fn backend(&self) -> &Arc<dyn RoastBackend> {
        &self.backend
    }

    /// Starts a new generation, superseding whatever is in flight.
    pub fn begin(&self) -> Ticket {
        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        Ticket {
            generation,
            latest: self.latest.clone(),
        }
    }

    /// Supersedes the in-flight request without starting another one.
    pub fn cancel(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn run_analysis(
        &self,
        request: &AnalysisRequest,
        ticket: &Ticket,
        tx: &Sender<Delta>,
    ) -> Outcome {
        let generation = ticket.generation();
        let _ = tx.send(Delta::Started { generation });

        let search = LastSearch {
            summoner_name: request.player_identity.clone(),
            region: request.region,
        };
        if let Err(err) = self.cache.set_last_search(&search) {
            let _ = tx.send(Delta::Log(format!("[WARN] Could not save last search: {err:#}")));
        }

        let key = cache_key(&request.player_identity, request.region);
        let cached = if request.force_refresh {
            None
        } else {
            self.cache.get(&key)
        };

        let outcome = match cached {
            Some(entry) => self.regenerate_from_cache(&key, entry, ticket, tx),
            None => self.stream_analysis(&key, request, ticket, tx),
        };

        match &outcome {
            Outcome::Success(result) => {
                let _ = tx.send(Delta::Finished {
                    generation,
                    result: result.clone(),
                });
            }
            Outcome::Failed(error) => {
                let _ = tx.send(Delta::Failed {
                    generation,
                    error: error.clone(),
                });
            }
            Outcome::Superseded => {}
        }
        outcome
    }

    /// Replays the last search with default options. Returns `None` when
    /// nothing has been searched yet this session.
    pub fn roast_again(&self, ticket: &Ticket, tx: &Sender<Delta>) -> Option<Outcome> {
        let Some(last) = self.cache.last_search() else {
            let _ = tx.send(Delta::Log("[INFO] Nothing to roast again yet".to_string()));
            return None;
        };
        let request = AnalysisRequest::new(last.summoner_name, last.region);
        Some(self.run_analysis(&request, ticket, tx))
    }

    fn regenerate_from_cache(
        &self,
        key: &str,
        mut entry: CacheEntry,
        ticket: &Ticket,
        tx: &Sender<Delta>,
    ) -> Outcome {
        let _ = tx.send(Delta::Progress {
            generation: ticket.generation(),
            message: Some(REGENERATING_MESSAGE.to_string()),
            rate_limit: None,
        });

        let response = match self.backend.regenerate(&RegenerateRequest::from_entry(&entry)) {
            Ok(response) => response,
            Err(err) => return ticket.fail(format!("{err:#}")),
        };
        if !ticket.is_current() {
            return Outcome::Superseded;
        }
        if let Some(error) = response.error.filter(|e| !e.trim().is_empty()) {
            return Outcome::Failed(error);
        }

        let entry = match self.cache.append_used_topics(key, &response.used_topics) {
            Ok(Some(updated)) => updated,
            Ok(None) => {
                entry.used_topics.extend(response.used_topics);
                entry
            }
            Err(err) => {
                let _ = tx.send(Delta::Log(format!("[WARN] Cache write failed: {err:#}")));
                entry.used_topics.extend(response.used_topics);
                entry
            }
        };
        Outcome::Success(Box::new(ResultPayload::from_cache(
            &entry,
            response.postcards,
        )))
    }

    fn stream_analysis(
        &self,
        key: &str,
        request: &AnalysisRequest,
        ticket: &Ticket,
        tx: &Sender<Delta>,
    ) -> Outcome {
        let body = AnalyzeRequestBody::from_request(request);
        let reader = match self.backend.open_analyze_stream(&body) {
            Ok(reader) => reader,
            Err(err) => return ticket.fail(format!("{err:#}")),
        };
        let chunks = read_ahead(reader);

        let mut decoder = FrameDecoder::new();
        loop {
            if !ticket.is_current() {
                return Outcome::Superseded;
            }
            let bytes = match chunks.recv_timeout(CANCEL_POLL) {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(err)) => return ticket.fail(format!("stream read failed: {err}")),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };
            for payload in decoder.push(&bytes) {
                if let ControlFlow::Break(outcome) = self.handle_frame(key, &payload, ticket, tx) {
                    return outcome;
                }
            }
        }

        if let Some(payload) = decoder.finish()
            && let ControlFlow::Break(outcome) = self.handle_frame(key, &payload, ticket, tx)
        {
            return outcome;
        }
        ticket.fail(STREAM_ENDED_EARLY)
    }

    fn handle_frame(
        &self,
        key: &str,
        payload: &str,
        ticket: &Ticket,
        tx: &Sender<Delta>,
    ) -> ControlFlow<Outcome> {
        if !ticket.is_current() {
            return ControlFlow::Break(Outcome::Superseded);
        }
        let event = match parse_frame(payload) {
            Ok(event) => event,
            Err(err) => {
                let _ = tx.send(Delta::Log(format!(
                    "[WARN] Skipping stream frame: {err:#} ({})",
                    preview(payload)
                )));
                return ControlFlow::Continue(());
            }
        };
        match event {
            StreamEvent::Progress {
                message,
                rate_limit,
            } => {
                let _ = tx.send(Delta::Progress {
                    generation: ticket.generation(),
                    message,
                    rate_limit,
                });
                ControlFlow::Continue(())
            }
            StreamEvent::Failed(error) => ControlFlow::Break(Outcome::Failed(error)),
            StreamEvent::Finished(result) => {
                if let Err(err) = self.cache.put(key, &CacheEntry::from_result(&result)) {
                    let _ = tx.send(Delta::Log(format!("[WARN] Cache write failed: {err:#}")));
                }
                ControlFlow::Break(Outcome::Success(result))
            }
        }
    }
}

/// Moves blocking body reads onto their own thread so the worker can give up
/// on a stalled stream. The channel closes at EOF or after the first error;
/// the reader thread exits once the worker drops the receiver.
fn read_ahead(mut reader: StreamBody) -> Receiver<io::Result<Vec<u8>>> {
    let (tx, rx) = mpsc::sync_channel(READ_AHEAD_CHUNKS);
    thread::spawn(move || {
        let mut buf = vec![0u8; READ_CHUNK];
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => return,
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => {
                    let _ = tx.send(Err(err));
                    return;
                }
            };
            if tx.send(Ok(buf[..n].to_vec())).is_err() {
                return;
            }
        }
    });
    rx
}

fn preview(payload: &str) -> String {
    const MAX: usize = 60;
    let mut out: String = payload.chars().take(MAX).collect();
    if payload.chars().count() > MAX {
        out.push_str("...");
    }
    out
}

/// Runs one analysis on its own thread. The generation is claimed before the
/// thread starts, so a request submitted right after this call always wins.
pub fn spawn_analysis(
    orchestrator: Arc<Orchestrator>,
    request: AnalysisRequest,
    tx: Sender<Delta>,
) -> u64 {
    let ticket = orchestrator.begin();
    let generation = ticket.generation();
    thread::spawn(move || {
        orchestrator.run_analysis(&request, &ticket, &tx);
    });
    generation
}

pub fn spawn_roast_again(orchestrator: Arc<Orchestrator>, tx: Sender<Delta>) -> u64 {
    let ticket = orchestrator.begin();
    let generation = ticket.generation();
    thread::spawn(move || {
        orchestrator.roast_again(&ticket, &tx);
    });
    generation
}

pub fn spawn_pro_directory_fetch(orchestrator: Arc<Orchestrator>, tx: Sender<Delta>) {
    thread::spawn(move || match orchestrator.backend().pro_players() {
        Ok(directory) => {
            let targets = flatten_pro_directory(&directory);
            let _ = tx.send(Delta::Log(format!(
                "[INFO] Loaded {} pro players",
                targets.len()
            )));
            let _ = tx.send(Delta::SetProTargets(targets));
        }
        Err(err) => {
            let _ = tx.send(Delta::Log(format!("[WARN] Pro players fetch error: {err:#}")));
        }
    });
}
