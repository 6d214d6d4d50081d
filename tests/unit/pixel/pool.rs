use super::*;

#[test]
fn released_frames_are_reused() {
    let pool = FramePool::new(64, FramePoolOpts::default());
    {
        let mut f = pool.acquire();
        assert_eq!(f.len(), 64);
        f[0] = 7;
    }
    let st = pool.stats();
    assert_eq!(st.alloc_frames, 1);
    assert_eq!(st.retained_frames, 1);
    assert_eq!(st.retained_bytes, 64);

    let _again = pool.acquire();
    let st = pool.stats();
    assert_eq!(st.alloc_frames, 1);
    assert_eq!(st.retained_frames, 0);
}

#[test]
fn pool_honors_frame_cap() {
    let pool = FramePool::new(16, FramePoolOpts {
        max_pool_bytes: 1 << 20,
        max_frames: 1,
    });
    let a = pool.acquire();
    let b = pool.acquire();
    drop(a);
    drop(b);
    let st = pool.stats();
    assert_eq!(st.retained_frames, 1);
    assert_eq!(st.dropped_on_release, 1);
}

#[test]
fn pool_honors_byte_cap() {
    let pool = FramePool::new(16, FramePoolOpts {
        max_pool_bytes: 16,
        max_frames: 8,
    });
    let a = pool.acquire();
    let b = pool.acquire();
    drop(a);
    drop(b);
    let st = pool.stats();
    assert_eq!(st.retained_bytes, 16);
    assert!(st.dropped_on_release >= 1);
}

#[test]
fn zero_retention_drops_everything() {
    let pool = FramePool::new(4, FramePoolOpts {
        max_pool_bytes: 0,
        max_frames: 0,
    });
    drop(pool.acquire());
    assert_eq!(pool.stats().retained_frames, 0);
    assert_eq!(pool.frame_len(), 4);
}

#[test]
fn frames_return_from_other_threads() {
    let pool = FramePool::new(8, FramePoolOpts::default());
    std::thread::scope(|s| {
        let f = pool.acquire();
        s.spawn(move || drop(f));
    });
    assert_eq!(pool.stats().retained_frames, 1);
}
