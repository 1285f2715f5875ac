use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Handle to a running per-frame loop.
///
/// The loop calls its callback once per `interval` until the callback returns
/// `false` or the handle is stopped. Dropping the handle stops and joins the
/// loop, so a mount that owns the handle can never leak it.
pub struct FrameLoop {
    stop: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl FrameLoop {
    pub fn start<F>(interval: Duration, mut on_frame: F) -> std::io::Result<Self>
    where
        F: FnMut(u64) -> bool + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_for_thread = stop.clone();
        let join = thread::Builder::new()
            .name("beatline-frames".into())
            .spawn(move || {
                let mut frame: u64 = 0;
                loop {
                    thread::park_timeout(interval);
                    if stop_for_thread.load(Ordering::Acquire) {
                        break;
                    }
                    if !on_frame(frame) {
                        break;
                    }
                    frame = frame.wrapping_add(1);
                }
            })?;

        Ok(Self {
            stop,
            join: Some(join),
        })
    }

    pub fn is_running(&self) -> bool {
        self.join.as_ref().is_some_and(|j| !j.is_finished())
    }

    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(j) = self.join.take() {
            j.thread().unpark();
            let _ = j.join();
        }
    }
}

impl Drop for FrameLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}
