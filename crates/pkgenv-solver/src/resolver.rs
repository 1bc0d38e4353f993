//! Resolver front door: parse, consult the cache, solve, assemble.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn};
use pkgenv_version::Requirement;

use crate::cache::{canonical_requests, request_digest, CacheKey, ContextStore, RepositoryFingerprint};
use crate::commands::{CommandEvaluator, LineEvaluator};
use crate::config::Config;
use crate::context::{Context, SolveMetadata};
use crate::error::Result;
use crate::repository::Repository;
use crate::solver::Solver;

/// Resolves requests against one repository, optionally through a cache.
///
/// A resolver is cheap to clone and can be shared between threads; every
/// call to [`resolve`](Self::resolve) runs an independent solve attempt.
#[derive(Clone)]
pub struct Resolver {
    repository: Arc<dyn Repository>,
    evaluator: Arc<dyn CommandEvaluator>,
    cache: Option<Arc<dyn ContextStore>>,
    config: Config,
}

impl Resolver {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            repository,
            evaluator: Arc::new(LineEvaluator::new()),
            cache: None,
            config: Config::default(),
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn CommandEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ContextStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn repository(&self) -> &dyn Repository {
        self.repository.as_ref()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Parse every request, failing on the first malformed one
    pub fn parse_requests<S: AsRef<str>>(requests: &[S]) -> Result<Vec<Requirement>> {
        Ok(requests
            .iter()
            .map(|r| Requirement::parse(r.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?)
    }

    /// Resolve textual requests into a context
    pub fn resolve<S: AsRef<str>>(
        &self,
        requests: &[S],
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<Context> {
        let requests = Self::parse_requests(requests)?;
        self.resolve_requirements(&requests, cancel)
    }

    pub fn resolve_requirements(
        &self,
        requests: &[Requirement],
        cancel: Option<Arc<AtomicBool>>,
    ) -> Result<Context> {
        let cache = self.cache.as_deref().filter(|_| self.config.cache_enabled);

        if let Some(cache) = cache {
            if let Some(context) = self.lookup(cache, requests)? {
                return Ok(context);
            }
        }

        let mut solver = Solver::new(self.repository.as_ref())
            .with_max_steps(self.config.max_steps)
            .with_max_reported_conflicts(self.config.max_reported_conflicts);
        if let Some(flag) = cancel {
            solver = solver.with_cancel_flag(flag);
        }
        let solution = solver.solve(requests)?;

        let fingerprint = RepositoryFingerprint::capture(self.repository.as_ref(), &solution.families)?;
        let metadata = SolveMetadata {
            created: Utc::now(),
            steps: solution.steps,
            repository: self.repository.name().to_string(),
            fingerprint: fingerprint.clone(),
        };
        let context = Context::assemble(solution, requests, self.evaluator.as_ref(), metadata)?;

        if let Some(cache) = cache.filter(|_| !self.config.cache_read_only) {
            let key = CacheKey::new(requests, fingerprint);
            if cache.put(&key, &context)? {
                debug!("stored context for '{}'", key.requests);
            }
        }

        Ok(context)
    }

    /// Find a cached context whose fingerprint still matches the repository
    fn lookup(&self, cache: &dyn ContextStore, requests: &[Requirement]) -> Result<Option<Context>> {
        let canonical = canonical_requests(requests);
        let digest = request_digest(&canonical);

        let stored = match cache.fingerprints(&digest) {
            Ok(stored) => stored,
            Err(e) => {
                warn!("context cache unavailable: {}", e);
                return Ok(None);
            }
        };

        for fingerprint in stored {
            let current =
                RepositoryFingerprint::capture(self.repository.as_ref(), fingerprint.families.keys())?;
            if current != fingerprint {
                warn!("cached context for '{}' is stale", canonical);
                continue;
            }

            let key = CacheKey {
                requests: canonical.clone(),
                fingerprint,
            };
            match cache.get(&key) {
                Ok(Some(context)) => {
                    info!("context cache hit for '{}'", canonical);
                    return Ok(Some(context.reordered(requests, self.evaluator.as_ref())?));
                }
                Ok(None) => {}
                Err(e) => warn!("skipping cached context: {}", e),
            }
        }

        Ok(None)
    }
}
