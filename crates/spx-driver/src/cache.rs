//! Compile cache keyed by source modification times
//!
//! The check against the snapshot, the compile and the store all happen under
//! one lock, so concurrent callers never compile the same snapshot twice.

use spx_typeck::{Importer, PkgDataImporter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

use crate::compile::{compile, snapshot, CompileError, Snapshot};
use crate::config::EngineConfig;
use crate::program::Program;
use crate::workspace::Workspace;

enum CacheState {
    Empty,
    /// A compile started and has not stored its result; only seen after a
    /// panic during compilation
    Building,
    Ready { key: Snapshot, program: Arc<Program> },
}

pub struct CompileCache {
    importer: Arc<dyn Importer>,
    config: EngineConfig,
    state: Mutex<CacheState>,
    builds: AtomicUsize,
}

impl CompileCache {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_importer(Arc::new(PkgDataImporter::new()), config)
    }

    pub fn with_importer(importer: Arc<dyn Importer>, config: EngineConfig) -> Self {
        Self {
            importer,
            config,
            state: Mutex::new(CacheState::Empty),
            builds: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of compiles run so far
    pub fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    pub fn invalidate(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        *state = CacheState::Empty;
    }

    /// The program for the workspace's current sources. Reuses the last
    /// result while no source file was added, removed or modified.
    pub fn get(&self, workspace: &dyn Workspace) -> Result<Arc<Program>, CompileError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let key = snapshot(workspace)?;

        match &*state {
            CacheState::Ready { key: cached, program } if *cached == key => {
                debug!(files = key.len(), "compile cache hit");
                return Ok(Arc::clone(program));
            }
            CacheState::Building => warn!("previous compile did not finish"),
            _ => {}
        }

        debug!(files = key.len(), "compile cache miss");
        *state = CacheState::Building;
        self.builds.fetch_add(1, Ordering::SeqCst);

        match compile(workspace, self.importer.as_ref(), &self.config) {
            Ok(program) => {
                let program = Arc::new(program);
                info!(build = self.build_count(), "program cached");
                *state = CacheState::Ready {
                    key,
                    program: Arc::clone(&program),
                };
                Ok(program)
            }
            Err(err) => {
                *state = CacheState::Empty;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::MapFs;
    use std::thread;

    fn workspace() -> MapFs {
        MapFs::with_files([("main.spx", "var score int\n"), ("Hero.spx", "onStart => {\n}\n")])
    }

    #[test]
    fn test_unchanged_workspace_reuses_program() {
        let fs = workspace();
        let cache = CompileCache::new(EngineConfig::default());
        let first = cache.get(&fs).unwrap();
        let second = cache.get(&fs).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.build_count(), 1);
    }

    #[test]
    fn test_touch_add_and_remove_invalidate() {
        let fs = workspace();
        let cache = CompileCache::new(EngineConfig::default());
        let first = cache.get(&fs).unwrap();

        fs.touch("Hero.spx").unwrap();
        let second = cache.get(&fs).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));

        fs.write("Enemy.spx", "onStart => {\n}\n");
        cache.get(&fs).unwrap();
        assert!(fs.remove("Enemy.spx"));
        cache.get(&fs).unwrap();
        assert_eq!(cache.build_count(), 4);
    }

    #[test]
    fn test_failed_compile_is_not_cached() {
        let fs = MapFs::with_files([("main.spx", "var score int\n")]);
        let importer = Arc::new(PkgDataImporter::new().without_package(spx_typeck::SPX_PKG_PATH));
        let cache = CompileCache::with_importer(importer, EngineConfig::default());
        assert!(cache.get(&fs).is_err());
        assert!(cache.get(&fs).is_err());
        assert_eq!(cache.build_count(), 2);
    }

    #[test]
    fn test_concurrent_callers_share_one_build() {
        let fs = workspace();
        let cache = CompileCache::new(EngineConfig::default());
        let programs: Vec<Arc<Program>> = thread::scope(|s| {
            let handles: Vec<_> = (0..4).map(|_| s.spawn(|| cache.get(&fs).unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(cache.build_count(), 1);
        assert!(programs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_invalidate_forces_rebuild() {
        let fs = workspace();
        let cache = CompileCache::new(EngineConfig::default());
        cache.get(&fs).unwrap();
        cache.invalidate();
        cache.get(&fs).unwrap();
        assert_eq!(cache.build_count(), 2);
    }
}
