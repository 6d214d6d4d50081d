//! Three-stage raw frame pipeline: read, transform in parallel within each frame, write.

use std::io::{BufWriter, ErrorKind, Read, Write};
use std::ops::Range;
use std::sync::OnceLock;
use std::sync::mpsc;

use rayon::prelude::*;

use crate::foundation::error::{MontageError, MontageResult};
use crate::pixel::filters::PixelTransform;
use crate::pixel::pool::{FramePool, FramePoolOpts, PooledFrame};

/// Options for [`run_pixel_pipeline`].
#[derive(Clone, Debug)]
pub struct PixelPipelineOpts {
    /// Worker threads per frame. `None` uses the available parallelism.
    pub workers: Option<usize>,
    /// Capacity of each inter-stage queue.
    pub queue_depth: usize,
    /// Frames between progress log lines. `0` disables them.
    pub progress_every: u64,
    /// Idle frame buffers kept for reuse.
    pub pool_retain: usize,
    /// Expected frame count, used only for progress logs.
    pub expected_frames: Option<u64>,
}

impl Default for PixelPipelineOpts {
    fn default() -> Self {
        Self {
            workers: None,
            queue_depth: 3,
            progress_every: 100,
            pool_retain: 8,
            expected_frames: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames: u64,
    pub bytes: u64,
    /// Buffers allocated over the run; bounded by queue depth, not frame count.
    pub allocated_frames: u64,
}

/// Split `len` bytes into at most `workers` pixel-aligned ranges.
///
/// Every chunk but the last has the same length, rounded down to a whole number of
/// pixels. The last chunk takes the remainder. Empty chunks are omitted.
pub fn chunk_bounds(len: usize, workers: usize) -> Vec<Range<usize>> {
    let workers = workers.max(1);
    let chunk = (len / workers) & !3;
    let mut out = Vec::with_capacity(workers);
    for w in 0..workers {
        let start = w * chunk;
        let end = if w + 1 == workers { len } else { start + chunk };
        if end > start {
            out.push(start..end);
        }
    }
    out
}

fn split_chunks<'a>(mut buf: &'a mut [u8], bounds: &[Range<usize>]) -> Vec<&'a mut [u8]> {
    let mut parts = Vec::with_capacity(bounds.len());
    let mut consumed = 0;
    for r in bounds {
        let (head, tail) = std::mem::take(&mut buf).split_at_mut(r.end - consumed);
        parts.push(&mut head[r.start - consumed..]);
        consumed = r.end;
        buf = tail;
    }
    parts
}

fn build_thread_pool(threads: Option<usize>) -> MontageResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(MontageError::configuration(
            "pixel pipeline 'workers' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| MontageError::pipeline("process", format!("failed to build thread pool: {e}")))
}

/// Records the first error from any stage; later ones are logged and discarded.
#[derive(Default)]
struct FirstError(OnceLock<MontageError>);

impl FirstError {
    fn record(&self, err: MontageError) {
        if let Err(later) = self.0.set(err) {
            tracing::debug!(error = %later, "suppressed pipeline error after the first");
        }
    }
}

/// Stream fixed-size RGBA frames from `reader` through `transform` into `writer`.
///
/// Frames keep their input order. End of input, including a trailing partial frame, ends
/// the run cleanly. The first failure in any stage is returned once every stage has stopped.
/// `writer` is dropped before returning so a downstream process sees end of input.
#[tracing::instrument(skip(reader, writer, transform, opts))]
pub fn run_pixel_pipeline<R, W>(
    reader: R,
    writer: W,
    frame_len: usize,
    transform: &PixelTransform,
    opts: &PixelPipelineOpts,
) -> MontageResult<PipelineStats>
where
    R: Read + Send,
    W: Write,
{
    if frame_len == 0 || frame_len % 4 != 0 {
        return Err(MontageError::configuration(format!(
            "frame length must be a positive multiple of 4, got {frame_len}"
        )));
    }
    let workers = match opts.workers {
        Some(n) => n,
        None => std::thread::available_parallelism().map_or(1, |n| n.get()),
    };
    let threads = build_thread_pool(Some(workers))?;
    let bounds = chunk_bounds(frame_len, workers);
    let pool = FramePool::new(
        frame_len,
        FramePoolOpts {
            max_frames: opts.pool_retain,
            ..FramePoolOpts::default()
        },
    );
    let depth = opts.queue_depth.max(1);
    let failure = FirstError::default();
    let mut stats = PipelineStats::default();

    std::thread::scope(|scope| {
        let (read_tx, read_rx) = mpsc::sync_channel::<PooledFrame<'_>>(depth);
        let (done_tx, done_rx) = mpsc::sync_channel::<PooledFrame<'_>>(depth);
        let pool = &pool;
        let failure = &failure;

        let read_stage = scope.spawn(move || {
            let mut reader = reader;
            let mut index = 0u64;
            loop {
                let mut frame = pool.acquire();
                match reader.read_exact(&mut frame) {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                    Err(e) => {
                        failure.record(MontageError::pipeline(
                            "read",
                            format!("failed to read frame {index}: {e}"),
                        ));
                        break;
                    }
                }
                if read_tx.send(frame).is_err() {
                    break;
                }
                index += 1;
            }
        });

        let bounds = &bounds;
        let threads = &threads;
        let process_stage = scope.spawn(move || {
            for mut frame in read_rx {
                if !transform.is_identity() {
                    let parts = split_chunks(&mut frame, bounds);
                    threads.install(|| parts.into_par_iter().for_each(|c| transform.apply(c)));
                }
                if done_tx.send(frame).is_err() {
                    break;
                }
            }
        });

        // Writer runs here so `writer` need not be `Send`.
        let mut out = BufWriter::with_capacity(frame_len, writer);
        for frame in done_rx.iter() {
            if let Err(e) = out.write_all(&frame) {
                failure.record(MontageError::pipeline(
                    "write",
                    format!("failed to write frame {}: {e}", stats.frames),
                ));
                break;
            }
            stats.frames += 1;
            stats.bytes += frame_len as u64;
            drop(frame);
            if opts.progress_every > 0 && stats.frames % opts.progress_every == 0 {
                tracing::debug!(
                    frames = stats.frames,
                    expected = opts.expected_frames,
                    "pixel pipeline progress"
                );
            }
        }
        // Unblocks the processor (and through it the reader) after a write failure.
        drop(done_rx);
        if let Err(e) = out.flush() {
            failure.record(MontageError::pipeline(
                "write",
                format!("failed to flush output: {e}"),
            ));
        }
        drop(out);

        if process_stage.join().is_err() {
            failure.record(MontageError::pipeline("process", "pixel worker panicked"));
        }
        if read_stage.join().is_err() {
            failure.record(MontageError::pipeline("read", "reader thread panicked"));
        }
    });

    stats.allocated_frames = pool.stats().alloc_frames;
    if let Some(err) = failure.0.into_inner() {
        return Err(err);
    }
    tracing::debug!(frames = stats.frames, "pixel pipeline finished");
    Ok(stats)
}

#[cfg(test)]
#[path = "../../tests/unit/pixel/pipeline.rs"]
mod tests;
