// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};
use vetclinic_app::{ClinicDirectory, DirectoryOutcome, DirectoryRequest, execute};
use vetclinic_tui::{AppRuntime, InternalEvent, RequestTicket};

pub type SharedDirectory = Arc<Mutex<Box<dyn ClinicDirectory + Send>>>;

struct Job {
    ticket: RequestTicket,
    reply: Sender<InternalEvent>,
}

/// Runs directory calls on one background thread, so completions arrive in
/// the order the requests were issued and the UI loop never blocks on HTTP.
pub struct WorkerRuntime {
    directory: SharedDirectory,
    jobs: Option<Sender<Job>>,
    worker: Option<JoinHandle<()>>,
}

impl WorkerRuntime {
    pub fn start(directory: Box<dyn ClinicDirectory + Send>) -> Result<Self> {
        let directory: SharedDirectory = Arc::new(Mutex::new(directory));
        let (jobs, queue) = mpsc::channel::<Job>();
        let shared = Arc::clone(&directory);
        let worker = thread::Builder::new()
            .name("vetclinic-directory".to_owned())
            .spawn(move || {
                while let Ok(job) = queue.recv() {
                    let outcome = run_locked(&shared, &job.ticket.request);
                    let event = InternalEvent::Directory {
                        ticket: job.ticket,
                        outcome,
                    };
                    if job.reply.send(event).is_err() {
                        debug!("ui loop gone; dropping directory result");
                    }
                }
            })
            .context("spawn directory worker")?;

        Ok(Self {
            directory,
            jobs: Some(jobs),
            worker: Some(worker),
        })
    }
}

impl Drop for WorkerRuntime {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("directory worker panicked");
        }
    }
}

fn lock(directory: &SharedDirectory) -> MutexGuard<'_, Box<dyn ClinicDirectory + Send>> {
    match directory.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn run_locked(directory: &SharedDirectory, request: &DirectoryRequest) -> DirectoryOutcome {
    let mut guard = lock(directory);
    execute(&mut **guard, request)
}

impl AppRuntime for WorkerRuntime {
    fn execute_request(&mut self, request: &DirectoryRequest) -> DirectoryOutcome {
        run_locked(&self.directory, request)
    }

    fn spawn_request(&mut self, ticket: RequestTicket, tx: Sender<InternalEvent>) -> Result<()> {
        let jobs = self
            .jobs
            .as_ref()
            .ok_or_else(|| anyhow!("directory worker stopped"))?;
        jobs.send(Job { ticket, reply: tx })
            .map_err(|_| anyhow!("directory worker stopped"))
    }
}
