//! The two-level program/kernel cache shared by the accelerator backends.
//!
//! Level one maps a kernel file path to a loaded program handle (an HSA
//! executable, a CUDA module); level two maps (program, kernel name) to
//! the resolved kernel. Both levels sit behind one mutex per device. The
//! lock is never held across a load: lookups and publications are
//! separate calls, so two threads missing on the same file both compile
//! and the publication resolves the race first-writer-wins, handing the
//! loser's handle back for disposal.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Mutex;

use crate::error::Result;

#[derive(Debug)]
struct Maps<P, K> {
    programs: HashMap<String, P>,
    kernels: HashMap<(P, String), K>,
}

#[derive(Debug)]
pub struct ModuleCache<P, K> {
    maps: Mutex<Maps<P, K>>,
}

impl<P, K> ModuleCache<P, K>
where
    P: Copy + Eq + Hash,
    K: Clone,
{
    pub fn new() -> ModuleCache<P, K> {
        ModuleCache {
            maps: Mutex::new(Maps {
                programs: HashMap::new(),
                kernels: HashMap::new(),
            }),
        }
    }

    pub fn program(&self, file: &str) -> Option<P> {
        self.maps.lock().unwrap().programs.get(file).copied()
    }

    /// Publishes a freshly loaded program. The first writer wins; when a
    /// racing thread got there first the caller's handle comes back as
    /// the second tuple element and must be destroyed by the caller.
    pub fn publish_program(&self, file: &str, program: P) -> (P, Option<P>) {
        let mut maps = self.maps.lock().unwrap();
        match maps.programs.get(file) {
            Some(&existing) => (existing, Some(program)),
            None => {
                maps.programs.insert(file.to_string(), program);
                (program, None)
            }
        }
    }

    pub fn kernel(&self, program: P, name: &str) -> Option<K> {
        self.maps
            .lock()
            .unwrap()
            .kernels
            .get(&(program, name.to_string()))
            .cloned()
    }

    pub fn publish_kernel(&self, program: P, name: &str, kernel: K) -> K {
        let mut maps = self.maps.lock().unwrap();
        maps.kernels
            .entry((program, name.to_string()))
            .or_insert(kernel)
            .clone()
    }

    /// Looks up `file`, invoking `load` outside the lock on a miss.
    /// Returns the cached-or-published handle plus a loser handle to
    /// dispose of when another thread won the publication race.
    pub fn program_or_load<F>(&self, file: &str, load: F) -> Result<(P, Option<P>)>
    where
        F: FnOnce() -> Result<P>,
    {
        if let Some(program) = self.program(file) {
            return Ok((program, None));
        }
        let loaded = load()?;
        Ok(self.publish_program(file, loaded))
    }

    /// Looks up (`program`, `name`), invoking `load` outside the lock on
    /// a miss.
    pub fn kernel_or_load<F>(&self, program: P, name: &str, load: F) -> Result<K>
    where
        F: FnOnce() -> Result<K>,
    {
        if let Some(kernel) = self.kernel(program, name) {
            return Ok(kernel);
        }
        let loaded = load()?;
        Ok(self.publish_kernel(program, name, loaded))
    }

    /// Every cached program handle, for teardown.
    pub fn programs(&self) -> Vec<P> {
        self.maps.lock().unwrap().programs.values().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn loader_runs_once_per_file() {
        let cache: ModuleCache<u64, u32> = ModuleCache::new();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let (program, loser) = cache
                .program_or_load("k.gcn", || {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .unwrap();
            assert_eq!(program, 42);
            assert!(loser.is_none());
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn loader_runs_once_per_kernel() {
        let cache: ModuleCache<u64, (u64, u32)> = ModuleCache::new();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let info = cache
                .kernel_or_load(42, "main", || {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok((0x1000, 64))
                })
                .unwrap();
            assert_eq!(info, (0x1000, 64));
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        // A different kernel on the same program is a fresh miss.
        cache
            .kernel_or_load(42, "other", || {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok((0x2000, 32))
            })
            .unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn first_writer_wins() {
        let cache: ModuleCache<u64, u32> = ModuleCache::new();

        let (kept, loser) = cache.publish_program("k.gcn", 1);
        assert_eq!((kept, loser), (1, None));

        // A racing publication keeps the original and hands back the
        // duplicate for destruction.
        let (kept, loser) = cache.publish_program("k.gcn", 2);
        assert_eq!((kept, loser), (1, Some(2)));

        assert_eq!(cache.program("k.gcn"), Some(1));
        assert_eq!(cache.programs(), vec![1]);
    }

    #[test]
    fn load_failure_caches_nothing() {
        let cache: ModuleCache<u64, u32> = ModuleCache::new();
        assert!(cache
            .program_or_load("bad.gcn", || Err(crate::error::Error::UnsupportedExtension(
                "bad".into()
            )))
            .is_err());
        assert_eq!(cache.program("bad.gcn"), None);
    }
}
