//! Checks that the dispatch core can be used concurrently.
//!
//! Eight threads hammer the registry with the launch-shaped workload
//! (allocate, fill, copy, verify, release, register sources) while the
//! coordinator synchronizes at the end. Exercises the registry locks,
//! the source registry and the host staging paths under contention.

use std::slice;
use std::thread;

use rand::Rng;

use crate::device::{DeviceId, PlatformTag};
use crate::registry::runtime;

const THREAD_COUNT: usize = 8;
const ITERATIONS: usize = 16;

#[test]
fn concurrent_registry_use() {
    super::init_logging();
    let dev = DeviceId::encode(PlatformTag::Host, 0);
    let mut threads = Vec::with_capacity(THREAD_COUNT);

    for thread_idx in 0..THREAD_COUNT {
        let thread_name = format!("[thread_{}]", thread_idx);
        let th = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let rt = runtime();
                let mut rng = rand::thread_rng();

                for iteration in 0..ITERATIONS {
                    let len: usize = rng.gen_range(1..2048);
                    let bytes = len as i64;

                    let src = rt.alloc(dev, bytes).unwrap();
                    let dst = rt.alloc(dev, bytes).unwrap();

                    let fill = (thread_idx * ITERATIONS + iteration) as u8;
                    unsafe {
                        slice::from_raw_parts_mut(src as *mut u8, len).fill(fill);
                    }

                    rt.copy(dev, src, 0, dev, dst, 0, bytes).unwrap();
                    rt.synchronize(dev).unwrap();

                    unsafe {
                        let copied = slice::from_raw_parts(dst as *const u8, len);
                        assert!(copied.iter().all(|&b| b == fill));
                    }

                    let path = format!("thread{}-{}.ll", thread_idx, iteration);
                    rt.register_file(dev, &path, &path);
                    assert_eq!(crate::source::load_file(&path).unwrap(), path);

                    rt.release(dev, src).unwrap();
                    rt.release(dev, dst).unwrap();
                }
            })
            .unwrap_or_else(|_| panic!("Error creating {}", &thread_name));
        threads.push(th);
    }

    for th in threads {
        th.join().unwrap();
    }

    // Host work is synchronous; the coordinator's synchronize completes
    // with nothing outstanding.
    runtime().synchronize(dev).unwrap();
}
