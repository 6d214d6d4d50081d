use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Retention limits for pooled frame buffers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FramePoolOpts {
    /// Maximum bytes retained across all idle buffers.
    pub(crate) max_pool_bytes: usize,
    /// Maximum number of idle buffers kept for reuse.
    pub(crate) max_frames: usize,
}

impl Default for FramePoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 256 * 1024 * 1024,
            max_frames: 8,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub(crate) struct FramePoolStats {
    pub(crate) retained_frames: usize,
    pub(crate) retained_bytes: usize,
    pub(crate) alloc_frames: u64,
    pub(crate) alloc_bytes: u64,
    pub(crate) dropped_on_release: u64,
}

#[derive(Debug, Default)]
struct Idle {
    frames: Vec<Vec<u8>>,
    stats: FramePoolStats,
}

/// Bounded pool of fixed-size raw frame buffers shared by the pipeline stages.
///
/// Buffers leave the pool as [`PooledFrame`] guards and come back when the guard drops, on
/// every exit path.
#[derive(Debug)]
pub(crate) struct FramePool {
    frame_len: usize,
    opts: FramePoolOpts,
    idle: Mutex<Idle>,
}

impl FramePool {
    pub(crate) fn new(frame_len: usize, opts: FramePoolOpts) -> Self {
        Self {
            frame_len,
            opts,
            idle: Mutex::new(Idle::default()),
        }
    }

    pub(crate) fn frame_len(&self) -> usize {
        self.frame_len
    }

    pub(crate) fn stats(&self) -> FramePoolStats {
        self.lock().stats.clone()
    }

    // A panic while holding the lock cannot leave the free list inconsistent.
    fn lock(&self) -> MutexGuard<'_, Idle> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a buffer of `frame_len` bytes. Contents are unspecified.
    pub(crate) fn acquire(&self) -> PooledFrame<'_> {
        let reused = {
            let mut idle = self.lock();
            let buf = idle.frames.pop();
            if buf.is_some() {
                idle.stats.retained_frames = idle.stats.retained_frames.saturating_sub(1);
                idle.stats.retained_bytes =
                    idle.stats.retained_bytes.saturating_sub(self.frame_len);
            } else {
                idle.stats.alloc_frames = idle.stats.alloc_frames.saturating_add(1);
                idle.stats.alloc_bytes = idle.stats.alloc_bytes.saturating_add(self.frame_len as u64);
            }
            buf
        };
        PooledFrame {
            buf: reused.unwrap_or_else(|| vec![0u8; self.frame_len]),
            pool: self,
        }
    }

    fn release(&self, buf: Vec<u8>) {
        let mut idle = self.lock();
        let over_bytes =
            idle.stats.retained_bytes.saturating_add(self.frame_len) > self.opts.max_pool_bytes;
        if buf.len() != self.frame_len || over_bytes || idle.frames.len() >= self.opts.max_frames {
            idle.stats.dropped_on_release = idle.stats.dropped_on_release.saturating_add(1);
            return;
        }
        idle.frames.push(buf);
        idle.stats.retained_frames = idle.stats.retained_frames.saturating_add(1);
        idle.stats.retained_bytes = idle.stats.retained_bytes.saturating_add(self.frame_len);
    }
}

/// A frame buffer on loan from a [`FramePool`].
#[derive(Debug)]
pub(crate) struct PooledFrame<'a> {
    buf: Vec<u8>,
    pool: &'a FramePool,
}

impl Deref for PooledFrame<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledFrame<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PooledFrame<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.buf));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/pool.rs"]
mod tests;
