//! # Run Orchestration
//!
//! The orchestrator turns a [`RunConfig`] into one probing task per target
//! and decides the overall outcome:
//!
//! 1. every target is parsed and its probe bootstrapped before any network
//!    I/O, so a bad descriptor fails the run immediately;
//! 2. each task pings its target at once, then retries every `interval`;
//! 3. the run succeeds when every task reports its target up, and fails on
//!    the first task failure, the deadline or the external interrupt,
//!    whichever comes first.
//!
//! Tasks share a child of the interrupt token. Returning from
//! [`Orchestrator::run`] for any reason cancels it, so leftover tasks stop on
//! their next suspension point instead of being aborted. Tasks stopped by
//! the deadline or the interrupt end with their own error; tasks stopped
//! because another target failed end with nothing.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Error, ProbeError};
use crate::probe::Probe;
use crate::registry;
use crate::report::{Observer, ProbeEvent, StdoutObserver};
use crate::retry::{Attempt, Retry, RetryError};
use crate::target::Target;
use crate::{DEFAULT_INTERVAL, DEFAULT_TIMEOUT, Result};

/// Parameters of a single run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub targets: Vec<String>,
    pub timeout: Duration,
    pub interval: Duration,
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            verbose: false,
        }
    }
}

impl RunConfig {
    pub fn new<I, S>(targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { targets: targets.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    /// Set the overall deadline
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the pause between two attempts against the same target
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Report up/down transitions while running
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.targets.is_empty() {
            return Err(Error::NoTargets);
        }
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be greater than zero"));
        }
        if self.interval.is_zero() {
            return Err(Error::InvalidConfig("interval must be greater than zero"));
        }
        Ok(())
    }
}

/// Final state of one probing task
#[derive(Debug)]
pub enum Outcome {
    /// Target became ready after the given time since the run started
    Up(Duration),
    Failed(Error),
}

/// Time each target took to become ready
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetReport {
    pub target: String,
    pub elapsed: Duration,
}

/// Summary of a successful run, targets in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub targets: Vec<TargetReport>,
    pub elapsed: Duration,
}

/// Drives one run over a set of targets
pub struct Orchestrator {
    config: RunConfig,
    interrupt: CancellationToken,
    observer: Option<Arc<dyn Observer>>,
}

impl Orchestrator {
    pub fn new(config: RunConfig) -> Self {
        Self { config, interrupt: CancellationToken::new(), observer: None }
    }

    /// Stop the run early once `token` is cancelled
    pub fn with_interrupt(mut self, token: CancellationToken) -> Self {
        self.interrupt = token;
        self
    }

    /// Receive progress events instead of the default stdout lines.
    /// Events are only emitted for verbose runs.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Wait until every target is up
    pub async fn run(&self) -> Result<Report> {
        self.config.validate()?;
        let probes = self.prepare()?;
        let count = probes.len();

        let observer = self.config.verbose.then(|| {
            self.observer.clone().unwrap_or_else(|| {
                Arc::new(StdoutObserver::new(probes.iter().map(|(t, _)| t.to_string())))
                    as Arc<dyn Observer>
            })
        });

        info!(
            targets = count,
            timeout = ?self.config.timeout,
            interval = ?self.config.interval,
            "waiting for targets"
        );

        let run = self.interrupt.child_token();
        let _stop_tasks = run.clone().drop_guard();
        let deadline_hit = CancellationToken::new();
        let started = Instant::now();
        let (tx, mut rx) = mpsc::channel(count);

        for (index, (target, probe)) in probes.into_iter().enumerate() {
            let task = ProbeTask {
                target,
                probe,
                retry: Retry::new(self.config.interval, run.clone()),
                token: run.clone(),
                interrupt: self.interrupt.clone(),
                deadline: deadline_hit.clone(),
                observer: observer.clone(),
                started,
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(outcome) = task.run().await {
                    let _ = tx.send((index, outcome)).await;
                }
            });
        }
        drop(tx);

        let deadline = tokio::time::sleep(self.config.timeout);
        tokio::pin!(deadline);

        let mut ready: Vec<Option<TargetReport>> = vec![None; count];
        let mut remaining = count;

        while remaining > 0 {
            tokio::select! {
                biased;
                _ = self.interrupt.cancelled() => {
                    warn!("interrupted before all targets were up");
                    return Err(Error::Interrupted);
                }
                Some((index, outcome)) = rx.recv() => match outcome {
                    Outcome::Up(elapsed) => {
                        ready[index] = Some(TargetReport {
                            target: self.config.targets[index].clone(),
                            elapsed,
                        });
                        remaining -= 1;
                    }
                    Outcome::Failed(err) => {
                        warn!(error = %err, "target failed");
                        return Err(err);
                    }
                },
                _ = &mut deadline => {
                    warn!(timeout = ?self.config.timeout, remaining, "deadline reached");
                    deadline_hit.cancel();
                    return Err(Error::DeadlineExceeded { timeout: self.config.timeout });
                }
            }
        }

        let elapsed = started.elapsed();
        info!(elapsed = ?elapsed, "all targets are up");
        Ok(Report { targets: ready.into_iter().flatten().collect(), elapsed })
    }

    /// Run on a fresh multi-threaded runtime, blocking the caller
    pub fn run_blocking(&self) -> Result<Report> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(Error::Runtime)?;
        runtime.block_on(self.run())
    }

    /// Parse every target, then bootstrap every probe
    fn prepare(&self) -> Result<Vec<(Target, Box<dyn Probe>)>> {
        let targets = self
            .config
            .targets
            .iter()
            .map(|raw| {
                Target::parse(raw).map_err(|source| Error::Parse { raw: raw.clone(), source })
            })
            .collect::<Result<Vec<_>>>()?;

        targets
            .into_iter()
            .map(|target| -> Result<(Target, Box<dyn Probe>)> {
                let probe = registry::instantiate(&target)?;
                debug!(endpoint = %target, scheme = %probe.scheme(), "probe bootstrapped");
                Ok((target, probe))
            })
            .collect()
    }
}

/// Everything one spawned task owns
struct ProbeTask {
    target: Target,
    probe: Box<dyn Probe>,
    retry: Retry,
    token: CancellationToken,
    interrupt: CancellationToken,
    deadline: CancellationToken,
    observer: Option<Arc<dyn Observer>>,
    started: Instant,
}

impl ProbeTask {
    /// `None` when stopped because the run already ended
    async fn run(self) -> Option<Outcome> {
        let name = self.target.to_string();
        let probe = self.probe.as_ref();
        let token = &self.token;
        let observer = self.observer.as_deref();
        let label = name.as_str();

        let result = self
            .retry
            .run(|| async move {
                match probe.ping(token).await {
                    Ok(()) => Ok(()),
                    Err(ProbeError::Cancelled) => Err(Attempt::Retry(ProbeError::Cancelled)),
                    Err(ProbeError::NotBootstrapped) => {
                        Err(Attempt::Fatal(ProbeError::NotBootstrapped))
                    }
                    Err(err) => {
                        debug!(endpoint = label, error = %err, "target not ready");
                        if let Some(observer) = observer {
                            observer.on_event(&ProbeEvent::Down {
                                target: label.to_string(),
                                reason: err.to_string(),
                            });
                        }
                        Err(Attempt::Retry(err))
                    }
                }
            })
            .await;

        match result {
            Ok(()) => {
                let elapsed = self.started.elapsed();
                info!(endpoint = label, elapsed = ?elapsed, "target is up");
                if let Some(observer) = observer {
                    observer.on_event(&ProbeEvent::Up { target: name.clone(), elapsed });
                }
                Some(Outcome::Up(elapsed))
            }
            Err(RetryError::Fatal(source)) => {
                Some(Outcome::Failed(Error::Probe { target: name, source }))
            }
            Err(RetryError::Cancelled { last }) => {
                let last = last.map(|err| err.to_string()).unwrap_or_default();
                if self.interrupt.is_cancelled() {
                    debug!(endpoint = label, last_error = %last, "stopped by interrupt");
                    Some(Outcome::Failed(Error::Interrupted))
                } else if self.deadline.is_cancelled() {
                    debug!(endpoint = label, last_error = %last, "stopped by deadline");
                    Some(Outcome::Failed(Error::TargetTimeout { target: name }))
                } else {
                    debug!(endpoint = label, last_error = %last, "stopped after run ended");
                    None
                }
            }
        }
    }
}
