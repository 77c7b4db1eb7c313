//! The compile -> bind orchestrator
//!
//! [`AgentCompiler`] is the public entry surface: it compiles each spec once,
//! and hands out bound agents cached per (agent, platform) pair. The caches
//! are populate-on-demand with no eviction; they die with the compiler.
//! Rebinding is a pure function of immutable inputs, so a lost race during
//! concurrent population simply rebuilds an equivalent value.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::agent::{AgentSpec, CompiledAgent};
use crate::backend::Platform;
use crate::binder::{BindOptions, Binder, BoundAgent};
use crate::error::AgentError;

pub struct AgentCompiler {
    binder: Binder,
    compiled: RwLock<HashMap<String, Arc<CompiledAgent>>>,
    bound: RwLock<HashMap<(String, Platform), Arc<BoundAgent>>>,
}

impl AgentCompiler {
    pub fn new(binder: Binder) -> Self {
        Self {
            binder,
            compiled: RwLock::new(HashMap::new()),
            bound: RwLock::new(HashMap::new()),
        }
    }

    pub fn binder(&self) -> &Binder {
        &self.binder
    }

    /// Compile a spec, or return the previously compiled agent of the same
    /// name. Compilation is deterministic, so a duplicate name with a
    /// different spec is a caller bug; it is logged and the original wins.
    pub fn compile(&self, spec: &AgentSpec) -> Result<Arc<CompiledAgent>, AgentError> {
        if let Some(existing) = self.compiled.read().unwrap().get(&spec.name) {
            let candidate = CompiledAgent::compile(spec)?;
            if existing.system_prompt != candidate.system_prompt {
                log::warn!(
                    "agent '{}' was already compiled with a different spec; keeping the original",
                    spec.name
                );
            }
            return Ok(Arc::clone(existing));
        }

        let compiled = Arc::new(CompiledAgent::compile(spec)?);
        let mut cache = self.compiled.write().unwrap();
        // A concurrent compile of the same name may have won the race.
        Ok(Arc::clone(
            cache.entry(spec.name.clone()).or_insert_with(|| compiled),
        ))
    }

    /// Bind a compiled agent to a platform with that platform's defaults,
    /// cached so repeated requests for the same pair are idempotent and cheap.
    pub fn bind(
        &self,
        compiled: &Arc<CompiledAgent>,
        platform: Platform,
    ) -> Result<Arc<BoundAgent>, AgentError> {
        let key = (compiled.name.clone(), platform);
        if let Some(existing) = self.bound.read().unwrap().get(&key) {
            return Ok(Arc::clone(existing));
        }

        let bound = Arc::new(self.binder.bind(compiled, platform, None)?);
        let mut cache = self.bound.write().unwrap();
        Ok(Arc::clone(cache.entry(key).or_insert_with(|| bound)))
    }

    /// Bind with explicit options, bypassing the cache (options vary per
    /// call site; caching them would silently alias different configurations).
    pub fn bind_with(
        &self,
        compiled: &Arc<CompiledAgent>,
        platform: Platform,
        options: BindOptions,
    ) -> Result<BoundAgent, AgentError> {
        self.binder.bind(compiled, platform, Some(options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentSpec;

    fn spec(name: &str) -> AgentSpec {
        AgentSpec::builder(name, "P").build().unwrap()
    }

    #[test]
    fn test_compile_is_cached_by_name() {
        let compiler = AgentCompiler::new(Binder::new());
        let a = compiler.compile(&spec("x")).unwrap();
        let b = compiler.compile(&spec("x")).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_bind_is_cached_per_platform() {
        let compiler = AgentCompiler::new(Binder::new().with_openai("key").with_gemini("key"));
        let compiled = compiler.compile(&spec("x")).unwrap();

        let a = compiler.bind(&compiled, Platform::OpenAi).unwrap();
        let b = compiler.bind(&compiled, Platform::OpenAi).unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let c = compiler.bind(&compiled, Platform::Gemini).unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_bind_failure_populates_nothing() {
        let compiler = AgentCompiler::new(Binder::new());
        let compiled = compiler.compile(&spec("x")).unwrap();
        assert!(compiler.bind(&compiled, Platform::OpenAi).is_err());
        assert!(compiler.bound.read().unwrap().is_empty());
    }
}
