//! Scripted in-memory media source.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use ytd_core::media::{MediaSource, ProgressFn, StreamDescriptor, StreamKind};

#[derive(Debug, Clone, Default)]
pub struct Script {
    pub streams: Vec<StreamDescriptor>,
    /// `(downloaded, total)` pairs reported during transfer, in order.
    pub progress: Vec<(u64, u64)>,
    /// Sleep before each progress step.
    pub step_delay: Duration,
    pub resolve_error: Option<String>,
    pub transfer_error: Option<String>,
    pub panic_on_resolve: bool,
}

impl Script {
    pub fn streams(streams: Vec<StreamDescriptor>) -> Self {
        Self {
            streams,
            ..Self::default()
        }
    }

    pub fn with_progress(mut self, progress: &[(u64, u64)]) -> Self {
        self.progress = progress.to_vec();
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn failing_transfer(mut self, msg: &str) -> Self {
        self.transfer_error = Some(msg.to_string());
        self
    }
}

pub fn stream(id: &str, kind: StreamKind, quality_rank: u32) -> StreamDescriptor {
    StreamDescriptor {
        id: id.to_string(),
        kind,
        total_size_bytes: 1000,
        quality_rank,
    }
}

/// Targets without a script fail to resolve.
#[derive(Default)]
pub struct FakeSource {
    scripts: HashMap<String, Script>,
    transferred: Mutex<Vec<(String, String)>>,
    proxies: Mutex<Vec<(&'static str, Option<String>)>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(mut self, target: &str, script: Script) -> Self {
        self.scripts.insert(target.to_string(), script);
        self
    }

    /// `(target, stream id)` for every transfer started so far.
    pub fn transferred(&self) -> Vec<(String, String)> {
        self.transferred.lock().unwrap().clone()
    }

    /// `(call, proxy)` for every resolve and transfer call, in order.
    pub fn proxies(&self) -> Vec<(&'static str, Option<String>)> {
        self.proxies.lock().unwrap().clone()
    }

    fn record_proxy(&self, call: &'static str, proxy: Option<&str>) {
        self.proxies
            .lock()
            .unwrap()
            .push((call, proxy.map(str::to_string)));
    }
}

impl MediaSource for FakeSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn resolve(&self, target: &str, proxy: Option<&str>) -> anyhow::Result<Vec<StreamDescriptor>> {
        self.record_proxy("resolve", proxy);
        let Some(script) = self.scripts.get(target) else {
            anyhow::bail!("unknown target {:?}", target);
        };
        if script.panic_on_resolve {
            panic!("resolver exploded");
        }
        if let Some(msg) = &script.resolve_error {
            anyhow::bail!("{}", msg);
        }
        Ok(script.streams.clone())
    }

    fn transfer(
        &self,
        target: &str,
        stream: &StreamDescriptor,
        destination_dir: &Path,
        proxy: Option<&str>,
        on_progress: &mut ProgressFn<'_>,
    ) -> anyhow::Result<PathBuf> {
        self.record_proxy("transfer", proxy);
        self.transferred
            .lock()
            .unwrap()
            .push((target.to_string(), stream.id.clone()));
        let script = self.scripts.get(target).cloned().unwrap_or_default();
        for &(done, total) in &script.progress {
            thread::sleep(script.step_delay);
            on_progress(done, total);
        }
        if let Some(msg) = script.transfer_error {
            anyhow::bail!("{}", msg);
        }
        Ok(destination_dir.join(&stream.id))
    }
}
