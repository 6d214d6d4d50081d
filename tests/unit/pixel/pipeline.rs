use super::*;
use crate::timeline::model::ColorFilter;

fn opts(workers: usize) -> PixelPipelineOpts {
    PixelPipelineOpts {
        workers: Some(workers),
        ..PixelPipelineOpts::default()
    }
}

#[test]
fn chunks_never_split_pixels() {
    for len in (0..=256).step_by(4) {
        for workers in 1..=16 {
            let bounds = chunk_bounds(len, workers);
            let mut next = 0;
            for r in &bounds {
                assert_eq!(r.start, next, "len={len} workers={workers}");
                assert_eq!(r.start % 4, 0);
                assert_eq!(r.end % 4, 0);
                assert!(r.end > r.start);
                next = r.end;
            }
            assert_eq!(next, len);
            assert!(bounds.len() <= workers);
        }
    }
}

#[test]
fn remainder_goes_to_last_chunk() {
    assert_eq!(chunk_bounds(40, 3), vec![0..12, 12..24, 24..40]);
    assert_eq!(chunk_bounds(8, 4), vec![0..8]);
}

#[test]
fn inverts_frames_and_ignores_partial_tail() {
    let mut input = vec![10u8; 16 * 3];
    input.extend_from_slice(&[1, 2, 3, 4, 5]);
    let mut out = Vec::new();
    let t = PixelTransform::new().then(ColorFilter::Invert);
    let stats = run_pixel_pipeline(input.as_slice(), &mut out, 16, &t, &opts(2)).unwrap();
    assert_eq!(stats.frames, 3);
    assert_eq!(stats.bytes, 48);
    let expected: Vec<u8> = (0..12).flat_map(|_| [245, 245, 245, 10]).collect();
    assert_eq!(out, expected);
}

#[test]
fn frame_order_is_preserved() {
    let frame_len = 64;
    let frames = 200usize;
    let input: Vec<u8> = (0..frames)
        .flat_map(|i| std::iter::repeat_n(i as u8, frame_len))
        .collect();
    let mut out = Vec::new();
    let t = PixelTransform::new().then(ColorFilter::Invert);
    let stats = run_pixel_pipeline(input.as_slice(), &mut out, frame_len, &t, &opts(4)).unwrap();
    assert_eq!(stats.frames, frames as u64);
    for (i, frame) in out.chunks(frame_len).enumerate() {
        let v = 255 - i as u8;
        for (j, px) in frame.chunks(4).enumerate() {
            assert_eq!(&px[..3], &[v, v, v], "frame {i} pixel {j}");
            assert_eq!(px[3], i as u8);
        }
    }
    assert!(stats.allocated_frames <= 12, "{}", stats.allocated_frames);
}

#[test]
fn identity_transform_copies_bytes() {
    let input: Vec<u8> = (0..=255).collect();
    let mut out = Vec::new();
    run_pixel_pipeline(input.as_slice(), &mut out, 32, &PixelTransform::new(), &opts(3)).unwrap();
    assert_eq!(out, input);
}

struct FailingReader {
    good: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.good == 0 {
            return Err(std::io::Error::other("decoder crashed"));
        }
        let n = buf.len().min(self.good);
        buf[..n].fill(0);
        self.good -= n;
        Ok(n)
    }
}

#[test]
fn read_errors_surface_after_draining() {
    let mut out = Vec::new();
    let err = run_pixel_pipeline(
        FailingReader { good: 32 },
        &mut out,
        16,
        &PixelTransform::new(),
        &opts(1),
    )
    .unwrap_err();
    assert!(matches!(err, MontageError::Pipeline { stage: "read", .. }));
    assert!(err.to_string().contains("decoder crashed"));
    assert_eq!(out.len(), 32);
}

struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(ErrorKind::BrokenPipe, "encoder gone"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn write_errors_stop_every_stage() {
    let input = std::io::repeat(7).take(4096 * 1000);
    let err = run_pixel_pipeline(input, FailingWriter, 4096, &PixelTransform::new(), &opts(2))
        .unwrap_err();
    assert!(matches!(err, MontageError::Pipeline { stage: "write", .. }));
}

#[test]
fn rejects_bad_configuration() {
    let t = PixelTransform::new();
    let err = run_pixel_pipeline(&[0u8; 0][..], Vec::new(), 6, &t, &opts(1)).unwrap_err();
    assert!(matches!(err, MontageError::Configuration(_)));
    let err = run_pixel_pipeline(&[0u8; 0][..], Vec::new(), 8, &t, &opts(0)).unwrap_err();
    assert!(matches!(err, MontageError::Configuration(_)));
}

/// Records the size of every write that reaches it.
#[derive(Default)]
struct WriteLog(Vec<usize>);

impl std::io::Write for WriteLog {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.push(buf.len());
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn each_frame_reaches_the_writer_unbatched() {
    let input = vec![7u8; 16 * 3];
    let mut log = WriteLog::default();
    let t = PixelTransform::new().then(ColorFilter::Invert);
    run_pixel_pipeline(input.as_slice(), &mut log, 16, &t, &opts(1)).unwrap();
    assert_eq!(log.0, [16, 16, 16]);
}
