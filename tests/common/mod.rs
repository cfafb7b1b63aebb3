#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use scripture_bridge::models::TranslationData;
use scripture_bridge::source::parse_translation;
use scripture_bridge::{TranslationInfo, TranslationSource};

pub const KJV_JOHN: &str = include_str!("../fixtures/kjv_john.json");

pub const JOHN_3_16: &str = "For God so loved the world, that he gave his only begotten Son, \
that whosoever believeth in him should not perish, but have everlasting life.";

pub fn kjv() -> TranslationData {
    parse_translation("kjv", KJV_JOHN).expect("fixture parses")
}

/// Source that counts loads, optionally stalls each one, and can be told to
/// fail the next N loads or to panic mid-load.
pub struct CountingSource {
    pub data: Vec<TranslationData>,
    pub loads: Arc<AtomicUsize>,
    pub delay: Duration,
    pub failures_left: AtomicUsize,
    pub panics: bool,
}

impl CountingSource {
    pub fn new(data: Vec<TranslationData>) -> Self {
        Self {
            data,
            loads: Arc::new(AtomicUsize::new(0)),
            delay: Duration::ZERO,
            failures_left: AtomicUsize::new(0),
            panics: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(self, times: usize) -> Self {
        self.failures_left.store(times, Ordering::SeqCst);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }
}

impl TranslationSource for CountingSource {
    fn available(&self) -> anyhow::Result<Vec<TranslationInfo>> {
        Ok(self.data.iter().map(|d| d.info.clone()).collect())
    }

    fn load(&self, id: &str) -> anyhow::Result<Option<TranslationData>> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.panics {
            panic!("simulated loader crash");
        }
        let fail = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if fail {
            anyhow::bail!("simulated I/O failure");
        }
        Ok(self.data.iter().find(|d| d.info.id == id).cloned())
    }
}
