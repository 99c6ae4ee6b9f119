use crate::config::{LiteralOccurrence, PatchConfig};
use crate::error::PatchError;
use crate::patch::{BytecodeContext, BytecodePatch, PatchContext, PatchSet, ResourceTable, SettingsRecorder};
use crate::patches::HideTrendingSearchesPatch;
use crate::smali_ops::Label;
use crate::types::SmaliClass;
use std::path::Path;

const BINDER: &str = "Lcom/google/android/apps/youtube/app/ui/search/SearchEntryBinder;";
const HOOK: &str = "Lapp/revanced/integrations/patches/general/GeneralPatch;->hideTrendingSearches(Landroid/widget/ImageView;Z)V";

/// Stands in for the patches the host tool provides.
struct Provided(&'static str);

impl BytecodePatch for Provided {
    fn name(&self) -> &'static str {
        self.0
    }

    fn description(&self) -> &'static str {
        "provided by the host"
    }

    fn execute(&self, _context: &mut PatchContext<'_>) -> Result<(), PatchError> {
        Ok(())
    }
}

fn patch_set() -> PatchSet {
    PatchSet::new()
        .with(HideTrendingSearchesPatch)
        .with(Provided("settings"))
        .with(Provided("shared-resource-id"))
}

fn resources() -> ResourceTable {
    ResourceTable::new()
        .with("drawable", "yt_outline_arrow_time_black", 0x7f080001)
        .with("drawable", "yt_outline_search_black", 0x7f080123)
        .with("drawable", "yt_outline_fire_black", 0x7f080321)
}

fn binder() -> SmaliClass {
    SmaliClass::read_from_file(Path::new("tests/SearchEntryBinder.smali")).unwrap()
}

fn run(classes: Vec<SmaliClass>, config: PatchConfig) -> (BytecodeContext, SettingsRecorder, Result<(), PatchError>) {
    let mut bytecode = BytecodeContext::new(classes, config);
    let mut settings = SettingsRecorder::default();
    let outcomes = patch_set().apply(&mut bytecode, &resources(), &mut settings).unwrap();
    let result = outcomes
        .into_iter()
        .find(|o| o.name == "hide-trending-searches")
        .map(|o| o.result)
        .unwrap();
    (bytecode, settings, result)
}

#[test]
fn patches_every_search_entry() {
    let (bytecode, settings, result) = run(vec![binder()], PatchConfig::default());
    result.unwrap();

    let class = &bytecode.classes[0];
    assert_eq!(class.name.as_jni_type(), BINDER);
    // the decoy loads only one of the drawables
    assert_eq!(class.methods[1].len(), 4);

    let m = &class.methods[2];
    assert_eq!(m.len(), 18 + 6);
    let t: Vec<String> = m.instructions().iter().map(|i| i.to_string()).collect();
    assert_eq!(t[6], "const/4 v2, 0x1");
    assert_eq!(t[7], format!("invoke-static {{v1, v2}}, {HOOK}"));
    assert_eq!(t[8], "const v2, 0x7f080321");
    assert_eq!(t[12], "const/4 v2, 0x0");
    assert_eq!(t[13], format!("invoke-static {{v1, v2}}, {HOOK}"));
    assert_eq!(t[14], "const v2, 0x7f080123");
    assert_eq!(t[18], "const/4 v4, 0x0");
    assert_eq!(t[19], format!("invoke-static {{v3, v4}}, {HOOK}"));
    assert_eq!(t[20], "const v4, 0x7f080001");

    assert_eq!(m.label_index(&Label("cond_0".into())), Some(11));
    assert_eq!(m.label_index(&Label("cond_1".into())), Some(17));
    assert_eq!(m.label_index(&Label("goto_0".into())), Some(22));

    assert_eq!(
        settings.preferences,
        vec![vec!["PREFERENCE: GENERAL_SETTINGS".to_string(), "SETTINGS: HIDE_TRENDING_SEARCHES".to_string()]]
    );
    assert_eq!(settings.applied, vec!["hide-trending-searches"]);

    // the patched class is still valid smali
    let reparsed = SmaliClass::from_smali(&class.to_smali()).unwrap();
    assert_eq!(&reparsed.methods[2], m);
}

#[test]
fn missing_method_fails_the_patch() {
    let mut class = binder();
    class.methods.truncate(2);
    let (bytecode, settings, result) = run(vec![class], PatchConfig::default());
    assert_eq!(
        result.unwrap_err().root(),
        &PatchError::FingerprintNotFound { fingerprint: "SearchBarEntry".into() }
    );
    assert_eq!(bytecode.classes[0].methods[1].len(), 4);
    assert!(settings.applied.is_empty());
}

#[test]
fn missing_resource_fails_before_patching() {
    let mut bytecode = BytecodeContext::new(vec![binder()], PatchConfig::default());
    let mut settings = SettingsRecorder::default();
    let partial = ResourceTable::new().with("drawable", "yt_outline_fire_black", 0x7f080321);
    let outcomes = patch_set().apply(&mut bytecode, &partial, &mut settings).unwrap();
    let failed = outcomes.iter().find(|o| o.name == "hide-trending-searches").unwrap();
    assert_eq!(
        failed.result.as_ref().unwrap_err().to_string(),
        "Resource drawable/yt_outline_arrow_time_black has no id for hide-trending-searches"
    );
    assert_eq!(bytecode.classes[0].methods[2].len(), 18);
}

#[test]
fn unique_occurrence_rejects_repeated_ids() {
    let mut class = binder();
    let m = &mut class.methods[2];
    // load the search drawable a second time at the end of the method
    let end = m.len() - 1;
    m.add_smali(end, "const v2, 0x7f080123").unwrap();

    let (_, _, result) = run(vec![class.clone()], PatchConfig::default());
    assert!(result.is_ok());

    let config = PatchConfig { literal_occurrence: LiteralOccurrence::Unique, ..PatchConfig::default() };
    let (bytecode, _, result) = run(vec![class], config);
    match result.unwrap_err().root() {
        PatchError::DuplicateLiteral { literal, indices, .. } => {
            assert_eq!(*literal, 0x7f080123);
            assert_eq!(indices, &vec![10, 17]);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(bytecode.classes[0].methods[2].len(), 19);
}
