//! Hides the trending searches icon in the YouTube search bar.
//!
//! The search bar binds one of three drawables to its icon view. Before each drawable id is
//! loaded, the view and a flag are handed to the integrations hook, which decides whether
//! the entry stays visible.

use crate::error::PatchError;
use crate::fingerprint::Fingerprint;
use crate::literal::wide_literal_index;
use crate::patch::{BytecodePatch, PatchContext};
use crate::registers::{has_binding_layout, RegisterBinding};
use crate::smali_ops::{Instruction, MethodRef};
use crate::types::Modifier;

pub const GENERAL_PATCH: &str = "Lapp/revanced/integrations/patches/general/GeneralPatch;";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTerm {
    History,
    Search,
    Trending,
}

impl SearchTerm {
    pub const ALL: [SearchTerm; 3] = [SearchTerm::History, SearchTerm::Search, SearchTerm::Trending];

    /// Drawable shown for this kind of entry.
    pub fn drawable(&self) -> &'static str {
        match self {
            SearchTerm::History => "yt_outline_arrow_time_black",
            SearchTerm::Search => "yt_outline_search_black",
            SearchTerm::Trending => "yt_outline_fire_black",
        }
    }

    /// Flag passed to the hook; only trending entries are hideable.
    pub fn is_trending(&self) -> bool {
        matches!(self, SearchTerm::Trending)
    }
}

/// The search bar entry binder: a public final method returning a view that loads every
/// drawable id right after storing the icon view in a register.
pub fn search_bar_entry_fingerprint(drawable_ids: Vec<i64>) -> Fingerprint {
    Fingerprint::new("SearchBarEntry")
        .returns("Landroid/view/View;")
        .modifiers(vec![Modifier::Public, Modifier::Final])
        .custom(move |method, _| {
            drawable_ids.iter().all(|id| {
                wide_literal_index(method, *id).map_or(false, |i| has_binding_layout(method, i))
            })
        })
}

fn hook() -> MethodRef {
    MethodRef {
        class: GENERAL_PATCH.to_string(),
        name: "hideTrendingSearches".to_string(),
        descriptor: "(Landroid/widget/ImageView;Z)V".to_string(),
    }
}

fn hide_block(binding: &RegisterBinding, trending: &bool) -> Result<Vec<Instruction>, PatchError> {
    Ok(vec![
        Instruction::const4(binding.free, i8::from(*trending))?,
        Instruction::invoke_static(vec![binding.source, binding.free], hook())?,
    ])
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HideTrendingSearchesPatch;

impl BytecodePatch for HideTrendingSearchesPatch {
    fn name(&self) -> &'static str {
        "hide-trending-searches"
    }

    fn description(&self) -> &'static str {
        "Hide trending searches in the search bar."
    }

    fn dependencies(&self) -> &'static [&'static str] {
        &["settings", "shared-resource-id"]
    }

    fn execute(&self, context: &mut PatchContext<'_>) -> Result<(), PatchError> {
        let targets = SearchTerm::ALL
            .iter()
            .map(|term| Ok((context.resources.require("drawable", term.drawable())?, term.is_trending())))
            .collect::<Result<Vec<(i64, bool)>, PatchError>>()?;

        let fingerprint = search_bar_entry_fingerprint(targets.iter().map(|(id, _)| *id).collect());
        let result = context.bytecode.resolve(&fingerprint)?;
        context
            .bytecode
            .patch_literals(&result, &targets, hide_block)
            .map_err(|e| e.with_context(result.method_id()))?;

        context
            .settings
            .add_preference(&["PREFERENCE: GENERAL_SETTINGS", "SETTINGS: HIDE_TRENDING_SEARCHES"]);
        context.settings.update_patch_status(self.name());
        Ok(())
    }
}
