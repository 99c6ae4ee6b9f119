//! Patch units and the collaborators they call into.

use crate::config::PatchConfig;
use crate::error::PatchError;
use crate::fingerprint::{Fingerprint, MatchResult};
use crate::literal::locate_literals;
use crate::patcher::patch_points;
use crate::registers::RegisterBinding;
use crate::smali_ops::Instruction;
use crate::types::{SmaliClass, SmaliMethod};
use log::{info, warn};
use std::collections::{HashMap, HashSet};

/// A single bytecode modification.
pub trait BytecodePatch {
    /// Unique name, also used to declare dependencies.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Names of patches that must have been applied first.
    fn dependencies(&self) -> &'static [&'static str] {
        &[]
    }

    /// Applies the patch. On error the patch is considered not applied.
    fn execute(&self, context: &mut PatchContext<'_>) -> Result<(), PatchError>;
}

/// The classes being patched.
#[derive(Debug, Clone, Default)]
pub struct BytecodeContext {
    pub classes: Vec<SmaliClass>,
    pub config: PatchConfig,
}

impl BytecodeContext {
    pub fn new(classes: Vec<SmaliClass>, config: PatchConfig) -> BytecodeContext {
        BytecodeContext { classes, config }
    }

    pub fn resolve(&self, fingerprint: &Fingerprint) -> Result<MatchResult, PatchError> {
        fingerprint
            .resolve_with_limit(&self.classes, self.config.scan_limit)
            .ok_or_else(|| PatchError::FingerprintNotFound { fingerprint: fingerprint.name().to_string() })
    }

    pub fn method(&self, result: &MatchResult) -> Result<&SmaliMethod, PatchError> {
        let class = self.classes.get(result.class_index).ok_or(PatchError::IndexOutOfBounds {
            index: result.class_index,
            len: self.classes.len(),
        })?;
        class.methods.get(result.method_index).ok_or(PatchError::IndexOutOfBounds {
            index: result.method_index,
            len: class.methods.len(),
        })
    }

    /// The matched method, for patching.
    pub fn method_mut(&mut self, result: &MatchResult) -> Result<&mut SmaliMethod, PatchError> {
        let len = self.classes.len();
        let class = self
            .classes
            .get_mut(result.class_index)
            .ok_or(PatchError::IndexOutOfBounds { index: result.class_index, len })?;
        let len = class.methods.len();
        class
            .methods
            .get_mut(result.method_index)
            .ok_or(PatchError::IndexOutOfBounds { index: result.method_index, len })
    }

    /// Locates each literal of `targets` inside the matched region and inserts the block
    /// `synthesize` returns in front of it. Returns the number of instructions inserted.
    pub fn patch_literals<T, F>(
        &mut self,
        result: &MatchResult,
        targets: &[(i64, T)],
        synthesize: F,
    ) -> Result<usize, PatchError>
    where
        T: Clone,
        F: FnMut(&RegisterBinding, &T) -> Result<Vec<Instruction>, PatchError>,
    {
        let occurrence = self.config.literal_occurrence;
        let validate = self.config.validate_registers;
        let method = self.method_mut(result)?;
        let points = locate_literals(method, Some(result.region()), targets, occurrence)?;
        patch_points(method, points, validate, synthesize)
    }
}

/// Resource ids of the app being patched, looked up by type and name.
pub trait ResourceIdProvider {
    fn resource_id(&self, kind: &str, name: &str) -> Option<i64>;

    fn require(&self, kind: &str, name: &str) -> Result<i64, PatchError> {
        self.resource_id(kind, name).ok_or_else(|| PatchError::ResourceNotFound {
            kind: kind.to_string(),
            name: name.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    ids: HashMap<(String, String), i64>,
}

impl ResourceTable {
    pub fn new() -> ResourceTable {
        ResourceTable::default()
    }

    pub fn insert(&mut self, kind: &str, name: &str, id: i64) {
        self.ids.insert((kind.to_string(), name.to_string()), id);
    }

    pub fn with(mut self, kind: &str, name: &str, id: i64) -> Self {
        self.insert(kind, name, id);
        self
    }
}

impl ResourceIdProvider for ResourceTable {
    fn resource_id(&self, kind: &str, name: &str) -> Option<i64> {
        self.ids.get(&(kind.to_string(), name.to_string())).copied()
    }
}

/// The host app's settings screen.
pub trait SettingsRegistrar {
    /// Adds preference entries, e.g. `["PREFERENCE: GENERAL_SETTINGS", "SETTINGS: HIDE_X"]`.
    fn add_preference(&mut self, entries: &[&str]);

    /// Marks a patch as applied so the settings screen can show it.
    fn update_patch_status(&mut self, patch: &str);
}

/// Records settings calls in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsRecorder {
    pub preferences: Vec<Vec<String>>,
    pub applied: Vec<String>,
}

impl SettingsRegistrar for SettingsRecorder {
    fn add_preference(&mut self, entries: &[&str]) {
        self.preferences.push(entries.iter().map(|e| e.to_string()).collect());
    }

    fn update_patch_status(&mut self, patch: &str) {
        self.applied.push(patch.to_string());
    }
}

/// Everything a patch can touch while it runs.
pub struct PatchContext<'a> {
    pub bytecode: &'a mut BytecodeContext,
    pub resources: &'a dyn ResourceIdProvider,
    pub settings: &'a mut dyn SettingsRegistrar,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatchOutcome {
    pub name: &'static str,
    pub result: Result<(), PatchError>,
}

/// Registered patches, applied in dependency order.
#[derive(Default)]
pub struct PatchSet {
    patches: Vec<Box<dyn BytecodePatch>>,
}

impl PatchSet {
    pub fn new() -> PatchSet {
        PatchSet::default()
    }

    /// Registers a patch. A later patch with the same name replaces the earlier one.
    pub fn register(&mut self, patch: Box<dyn BytecodePatch>) {
        match self.patches.iter().position(|p| p.name() == patch.name()) {
            Some(i) => self.patches[i] = patch,
            None => self.patches.push(patch),
        }
    }

    pub fn with(mut self, patch: impl BytecodePatch + 'static) -> Self {
        self.register(Box::new(patch));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.patches.iter().map(|p| p.name()).collect()
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.patches.iter().position(|p| p.name() == name)
    }

    /// Patch names sorted so every patch comes after its dependencies. Registration order is
    /// kept where the graph allows it.
    pub fn order(&self) -> Result<Vec<&'static str>, PatchError> {
        fn visit(
            set: &PatchSet,
            index: usize,
            sorted: &mut Vec<usize>,
            visited: &mut HashSet<usize>,
            temp_mark: &mut HashSet<usize>,
        ) -> Result<(), PatchError> {
            if visited.contains(&index) {
                return Ok(());
            }
            let patch = &set.patches[index];
            if !temp_mark.insert(index) {
                return Err(PatchError::DependencyCycle { patch: patch.name().to_string() });
            }
            for dependency in patch.dependencies() {
                let dep = set
                    .index_of(dependency)
                    .ok_or_else(|| PatchError::UnknownPatch { name: dependency.to_string() })
                    .map_err(|e| e.with_context(patch.name()))?;
                visit(set, dep, sorted, visited, temp_mark)?;
            }
            temp_mark.remove(&index);
            visited.insert(index);
            sorted.push(index);
            Ok(())
        }

        let mut sorted = Vec::with_capacity(self.patches.len());
        let mut visited = HashSet::new();
        let mut temp_mark = HashSet::new();
        for index in 0..self.patches.len() {
            visit(self, index, &mut sorted, &mut visited, &mut temp_mark)?;
        }
        Ok(sorted.into_iter().map(|i| self.patches[i].name()).collect())
    }

    /// Executes every patch once, dependencies first. A patch whose dependency failed is
    /// skipped. Errors in the dependency graph itself abort before anything runs.
    pub fn apply(
        &self,
        bytecode: &mut BytecodeContext,
        resources: &dyn ResourceIdProvider,
        settings: &mut dyn SettingsRegistrar,
    ) -> Result<Vec<PatchOutcome>, PatchError> {
        let order = self.order()?;
        let mut failed: HashSet<&'static str> = HashSet::new();
        let mut outcomes = Vec::with_capacity(order.len());

        for name in order {
            let Some(patch) = self.index_of(name).map(|i| &self.patches[i]) else {
                continue;
            };

            let result = match patch.dependencies().iter().find(|d| failed.contains(**d)) {
                Some(dependency) => Err(PatchError::DependencyFailed {
                    patch: name.to_string(),
                    dependency: dependency.to_string(),
                }),
                None => {
                    let mut context = PatchContext { bytecode: &mut *bytecode, resources, settings: &mut *settings };
                    patch.execute(&mut context).map_err(|e| e.with_context(name))
                }
            };

            match &result {
                Ok(()) => info!("[patch] {} applied", name),
                Err(e) => {
                    warn!("[patch] {} not applied: {}", name, e);
                    failed.insert(name);
                }
            }
            outcomes.push(PatchOutcome { name, result });
        }
        Ok(outcomes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named {
        name: &'static str,
        deps: &'static [&'static str],
        fail: bool,
    }

    impl BytecodePatch for Named {
        fn name(&self) -> &'static str {
            self.name
        }

        fn description(&self) -> &'static str {
            "test patch"
        }

        fn dependencies(&self) -> &'static [&'static str] {
            self.deps
        }

        fn execute(&self, context: &mut PatchContext<'_>) -> Result<(), PatchError> {
            if self.fail {
                return Err(PatchError::ResourceNotFound { kind: "id".into(), name: self.name.into() });
            }
            context.settings.update_patch_status(self.name);
            Ok(())
        }
    }

    fn named(name: &'static str, deps: &'static [&'static str]) -> Named {
        Named { name, deps, fail: false }
    }

    #[test]
    fn dependencies_run_first_and_once() {
        let set = PatchSet::new()
            .with(named("hide", &["settings", "ids"]))
            .with(named("ids", &[]))
            .with(named("settings", &["ids"]));
        assert_eq!(set.order().unwrap(), vec!["ids", "settings", "hide"]);

        let mut bytecode = BytecodeContext::default();
        let mut settings = SettingsRecorder::default();
        let outcomes = set.apply(&mut bytecode, &ResourceTable::new(), &mut settings).unwrap();
        assert!(outcomes.iter().all(|o| o.result.is_ok()));
        assert_eq!(settings.applied, vec!["ids", "settings", "hide"]);
    }

    #[test]
    fn graph_errors() {
        let set = PatchSet::new().with(named("hide", &["settings"]));
        assert_eq!(
            set.order().unwrap_err().root(),
            &PatchError::UnknownPatch { name: "settings".into() }
        );

        let set = PatchSet::new().with(named("a", &["b"])).with(named("b", &["a"]));
        assert!(matches!(set.order(), Err(PatchError::DependencyCycle { .. })));
    }

    #[test]
    fn failed_dependency_skips_dependents() {
        let set = PatchSet::new()
            .with(Named { name: "ids", deps: &[], fail: true })
            .with(named("hide", &["ids"]))
            .with(named("other", &[]));
        let mut bytecode = BytecodeContext::default();
        let mut settings = SettingsRecorder::default();
        let outcomes = set.apply(&mut bytecode, &ResourceTable::new(), &mut settings).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(
            outcomes[0].result.as_ref().unwrap_err().to_string(),
            "Resource id/ids has no id for ids"
        );
        assert_eq!(
            outcomes[1].result,
            Err(PatchError::DependencyFailed { patch: "hide".into(), dependency: "ids".into() })
        );
        assert!(outcomes[2].result.is_ok());
        assert_eq!(settings.applied, vec!["other"]);
    }

    #[test]
    fn resources_are_required() {
        let table = ResourceTable::new().with("drawable", "yt_outline_fire_black", 0x7f080456);
        assert_eq!(table.require("drawable", "yt_outline_fire_black"), Ok(0x7f080456));
        assert_eq!(
            table.require("drawable", "missing"),
            Err(PatchError::ResourceNotFound { kind: "drawable".into(), name: "missing".into() })
        );
    }
}
