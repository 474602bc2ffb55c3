//! Turns stored customizations into what the browser draws.
//!
//! Each attribute is resolved on its own, nearest source first:
//!
//! 1. the folder's own record
//! 2. the nearest ancestor that sets the attribute, counting only ancestors
//!    that have `appliesToSubfolders` or sit below one that does
//! 3. the first matching folder-name preset
//! 4. the first matching path preset
//!
//! Anything still unset after that keeps the host's default look.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
};

use crate::{
    host::{to_invariant_path, BrowserAdapter, VisibleFolder},
    icons::IconCatalog,
    path_key::{normalize, PathKey},
    presets::PresetSet,
    record::{CustomizationRecord, FolderState, IconId, NameStyle, Rgba},
    store::CustomizationStore,
};

/// What one browser entry should look like.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Decoration {
    pub tint: Option<Rgba>,

    /// Brush name such as `Maps.ColumnOpen`. `None` keeps the host's icon.
    pub icon_brush: Option<String>,

    pub name_style: Option<NameStyle>,
}

impl Decoration {
    pub fn is_plain(&self) -> bool {
        self.tint.is_none() && self.icon_brush.is_none() && self.name_style.is_none()
    }
}

struct EffectiveCache {
    generation: u64,
    entries: HashMap<PathKey, CustomizationRecord>,
}

/// The last visible set the bridge decorated, sorted.
struct RefreshState {
    generation: u64,
    visible: Vec<VisibleFolder>,
}

pub struct OverlayBridge {
    presets: PresetSet,
    cache: RefCell<EffectiveCache>,
    warned_icons: RefCell<HashSet<IconId>>,
    last_refresh: Option<RefreshState>,
}

impl OverlayBridge {
    pub fn new(presets: PresetSet) -> Self {
        Self {
            presets,
            cache: RefCell::new(EffectiveCache {
                generation: 0,
                entries: HashMap::new(),
            }),
            warned_icons: RefCell::new(HashSet::new()),
            last_refresh: None,
        }
    }

    /// The customization `key` is displayed with. Only the visual attributes
    /// of the result are meaningful.
    ///
    /// Never writes to `store`. Results are cached until the store's
    /// generation moves.
    pub fn effective(&self, store: &CustomizationStore, key: &PathKey) -> CustomizationRecord {
        let mut cache = self.cache.borrow_mut();
        if cache.generation != store.generation() {
            cache.entries.clear();
            cache.generation = store.generation();
        }

        if let Some(record) = cache.entries.get(key) {
            return record.clone();
        }

        let record = self.resolve(store, key);
        cache.entries.insert(key.clone(), record.clone());
        record
    }

    fn resolve(&self, store: &CustomizationStore, key: &PathKey) -> CustomizationRecord {
        let mut effective = store
            .get(key)
            .cloned()
            .map(CustomizationRecord::pruned)
            .unwrap_or_default();
        effective.applies_to_subfolders = false;

        // Nearest first. Once an ancestor propagates, every record between it
        // and `key` takes part, so the nearest one wins inside that subtree.
        let ancestors: Vec<PathKey> = key.ancestors().collect();
        let mut below_propagating = vec![false; ancestors.len()];
        let mut propagating = false;
        for (index, ancestor) in ancestors.iter().enumerate().rev() {
            below_propagating[index] = propagating;
            if store
                .get(ancestor)
                .is_some_and(|record| record.applies_to_subfolders)
            {
                propagating = true;
            }
        }

        for (ancestor, below_propagating) in ancestors.iter().zip(below_propagating) {
            if is_complete(&effective) {
                break;
            }

            if let Some(record) = store.get(ancestor) {
                if record.applies_to_subfolders || below_propagating {
                    fill_missing(
                        &mut effective,
                        record.color,
                        record.icon.as_ref(),
                        record.name_style,
                    );
                }
            }
        }

        for preset in self.presets.matching(key) {
            if is_complete(&effective) {
                break;
            }
            fill_missing(
                &mut effective,
                preset.color,
                preset.icon.as_ref(),
                preset.name_style,
            );
        }

        effective.pruned()
    }

    /// The decoration for `key` drawn in `state`. Icons missing from
    /// `catalog` fall back to the host's icon.
    pub fn decoration(
        &self,
        store: &CustomizationStore,
        catalog: &IconCatalog,
        key: &PathKey,
        state: FolderState,
    ) -> Decoration {
        let effective = self.effective(store, key);

        let icon_brush = effective.icon.and_then(|icon| {
            if catalog.contains(&icon) {
                Some(icon.brush_name(state))
            } else {
                if self.warned_icons.borrow_mut().insert(icon.clone()) {
                    log::warn!(
                        "Icon '{}' is not installed; folders using it show the default icon",
                        icon
                    );
                }
                None
            }
        });

        Decoration {
            tint: effective.color,
            icon_brush,
            name_style: effective.name_style,
        }
    }

    /// Decorates every entry the browser currently shows. Does nothing when
    /// neither the visible entries nor the store changed since the last
    /// call. Returns how many entries were decorated.
    pub fn refresh(
        &mut self,
        adapter: &mut dyn BrowserAdapter,
        store: &CustomizationStore,
        catalog: &IconCatalog,
        virtual_prefix: &str,
    ) -> usize {
        let mut visible = adapter.visible_folders();
        visible.sort();
        visible.dedup();

        if let Some(last) = &self.last_refresh {
            if last.generation == store.generation() && last.visible == visible {
                return 0;
            }
        }

        for folder in &visible {
            let key = normalize(to_invariant_path(&folder.virtual_path, virtual_prefix));
            let decoration = self.decoration(store, catalog, &key, folder.state);
            adapter.apply_decoration(folder, &decoration);
        }

        log::trace!("Decorated {} visible folder(s)", visible.len());

        let count = visible.len();
        self.last_refresh = Some(RefreshState {
            generation: store.generation(),
            visible,
        });
        count
    }

    /// Forgets the last refresh and every cached result. Needed when
    /// something other than the store changes what is drawn, such as the
    /// icon catalog.
    pub fn invalidate(&mut self) {
        self.last_refresh = None;
        self.cache.get_mut().entries.clear();
        self.warned_icons.get_mut().clear();
    }
}

fn is_complete(record: &CustomizationRecord) -> bool {
    record.color.is_some() && record.icon.is_some() && record.name_style.is_some()
}

fn fill_missing(
    record: &mut CustomizationRecord,
    color: Option<Rgba>,
    icon: Option<&IconId>,
    name_style: Option<NameStyle>,
) {
    if record.color.is_none() {
        record.color = color;
    }
    if record.icon.is_none() {
        record.icon = icon.cloned();
    }
    if record.name_style.is_none() {
        record.name_style = name_style.filter(|style| !style.is_plain());
    }
}
