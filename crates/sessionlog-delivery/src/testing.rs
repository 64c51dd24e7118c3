use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use sessionlog_network::{network_error, SnapshotUploader};
use sessionlog_types::Result;

use crate::logger::ExitHandle;

/// Uploader answering from a queue of outcomes, then from a fallback.
pub struct ScriptedUploader {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
    bodies: Mutex<Vec<String>>,
}

impl ScriptedUploader {
    pub fn accepting() -> Self {
        Self::with_fallback(true)
    }

    pub fn rejecting() -> Self {
        Self::with_fallback(false)
    }

    fn with_fallback(fallback: bool) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback,
            bodies: Mutex::new(Vec::new()),
        }
    }

    pub fn push_ok(&self) {
        self.script.lock().unwrap().push_back(true);
    }

    pub fn calls(&self) -> usize {
        self.bodies.lock().unwrap().len()
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotUploader for ScriptedUploader {
    async fn upload(&self, body: String) -> Result<()> {
        self.bodies.lock().unwrap().push(body);
        let accept = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.fallback);
        if accept {
            Ok(())
        } else {
            Err(network_error("collector responded 500"))
        }
    }
}

/// Uploader whose request never completes.
pub struct HangingUploader;

#[async_trait]
impl SnapshotUploader for HangingUploader {
    async fn upload(&self, _body: String) -> Result<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingExit {
    quits: AtomicUsize,
}

impl CountingExit {
    pub fn quits(&self) -> usize {
        self.quits.load(Ordering::SeqCst)
    }
}

impl ExitHandle for CountingExit {
    fn quit(&self) {
        self.quits.fetch_add(1, Ordering::SeqCst);
    }
}
