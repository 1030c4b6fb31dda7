//! Recipe library — named cook plans loaded from a declarative document.
//!
//! The document is TOML with an array of `[[recipes]]` tables. An array
//! (rather than a keyed table) is deliberate: the TOML parser would merge
//! duplicate table keys silently, and silently overwriting a cook program
//! is a safety concern — duplicate ids must fail the whole load. Unknown
//! fields are rejected strictly for the same reason.
//!
//! An absent document yields an empty library so discovery and listing stay
//! usable without a configured recipe file. Once loaded the library is
//! immutable and safe for unsynchronized concurrent reads.
//!
//! ```toml
//! [[recipes]]
//! id = "sous_vide_steak"
//! name = "Sous Vide Steak"
//! description = "Low and slow, then sear"
//! hardware_revision = "v2"
//!
//! [[recipes.stages]]
//! title = "Sous Vide"
//! temperature = { value = 131, unit = "F" }
//! mode = "WET"
//! timer = { initial_secs = 3600 }
//! steam = { steam_percentage = 100 }
//!
//! [[recipes.stages]]
//! title = "Sear"
//! temperature = { value = 250, unit = "C" }
//! timer = { initial_secs = 300, start = "WHEN_PREHEATED" }
//! heating_elements = { top = true, bottom = true, rear = false }
//! fan_speed = 0
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use ovenctl_domain::device::HardwareRevision;
use ovenctl_domain::error::{RecipeNotFoundError, ValidationError};
use ovenctl_domain::plan::CookPlan;
use ovenctl_domain::stage::{HeatMode, HeatingElements, SteamSettings, StageSpec, Timer};
use ovenctl_domain::temperature::{Temperature, Unit};

/// File name the library looks for when no path is configured.
pub const DEFAULT_FILE_NAME: &str = "recipes.toml";

/// A named, validated cook program.
#[derive(Debug, Clone)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub description: String,
    pub plan: CookPlan,
}

/// Listing entry for one recipe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub stage_count: usize,
    pub hardware_revision: Option<HardwareRevision>,
}

/// Immutable mapping from recipe id to cook plan, insertion order preserved.
#[derive(Debug, Default)]
pub struct RecipeLibrary {
    recipes: Vec<Recipe>,
    index: HashMap<String, usize>,
}

impl RecipeLibrary {
    /// An empty library.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a recipe document.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Document`] for malformed TOML or unknown
    /// fields, [`ValidationError::DuplicateRecipeId`] when two entries share
    /// an id, or any stage-level validation failure. A failed load loads
    /// zero recipes.
    pub fn load_str(document: &str) -> Result<Self, ValidationError> {
        let doc: RecipeDoc = toml::from_str(document)
            .map_err(|err| ValidationError::Document(err.to_string()))?;

        let mut library = Self::empty();
        for entry in doc.recipes {
            if entry.name.is_empty() {
                return Err(ValidationError::EmptyName);
            }
            if library.index.contains_key(&entry.id) {
                return Err(ValidationError::DuplicateRecipeId(entry.id));
            }
            let recipe = entry.into_recipe()?;
            library.index.insert(recipe.id.clone(), library.recipes.len());
            library.recipes.push(recipe);
        }
        Ok(library)
    }

    /// Load a recipe document from disk.
    ///
    /// An absent file yields an empty library rather than an error.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load_str`]; unreadable (but present) files surface
    /// as [`ValidationError::Document`].
    pub fn load_path(path: &Path) -> Result<Self, ValidationError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::load_str(&content),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no recipe document, starting empty");
                Ok(Self::empty())
            }
            Err(err) => Err(ValidationError::Document(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    /// Find the conventional recipe document location: `recipes.toml` in the
    /// working directory, then `~/.ovenctl/recipes.toml`.
    #[must_use]
    pub fn locate() -> Option<PathBuf> {
        let cwd = PathBuf::from(DEFAULT_FILE_NAME);
        if cwd.exists() {
            return Some(cwd);
        }
        let home = std::env::var_os("HOME").map(PathBuf::from)?;
        let in_home = home.join(".ovenctl").join(DEFAULT_FILE_NAME);
        in_home.exists().then_some(in_home)
    }

    /// Look up a recipe by id.
    ///
    /// # Errors
    ///
    /// Returns [`RecipeNotFoundError`] when the id is absent.
    pub fn get(&self, id: &str) -> Result<&Recipe, RecipeNotFoundError> {
        self.index
            .get(id)
            .map(|&i| &self.recipes[i])
            .ok_or_else(|| RecipeNotFoundError { id: id.to_string() })
    }

    /// Summaries of all recipes, in document order. Lazy and restartable.
    pub fn list(&self) -> impl Iterator<Item = RecipeSummary> + '_ {
        self.recipes.iter().map(|recipe| RecipeSummary {
            id: recipe.id.clone(),
            name: recipe.name.clone(),
            description: recipe.description.clone(),
            stage_count: recipe.plan.stages().len(),
            hardware_revision: recipe.plan.revision(),
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipeDoc {
    #[serde(default)]
    recipes: Vec<RecipeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RecipeEntry {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    hardware_revision: Option<HardwareRevision>,
    stages: Vec<StageEntry>,
}

impl RecipeEntry {
    fn into_recipe(self) -> Result<Recipe, ValidationError> {
        let stages = self
            .stages
            .into_iter()
            .map(StageEntry::into_stage)
            .collect::<Result<Vec<_>, _>>()?;
        let mut plan = CookPlan::new(stages)?;
        if let Some(revision) = self.hardware_revision {
            plan = plan.with_revision(revision);
        }
        Ok(Recipe {
            id: self.id,
            name: self.name,
            description: self.description,
            plan,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StageEntry {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    temperature: TemperatureEntry,
    #[serde(default)]
    mode: HeatMode,
    timer: Option<Timer>,
    heating_elements: Option<HeatingElements>,
    fan_speed: Option<u8>,
    steam: Option<SteamSettings>,
    rack_position: Option<u8>,
}

impl StageEntry {
    fn into_stage(self) -> Result<StageSpec, ValidationError> {
        let temperature = Temperature::from_value(self.temperature.value, self.temperature.unit)?;
        let mut builder = StageSpec::builder(temperature)
            .mode(self.mode)
            .title(self.title)
            .description(self.description);
        if let Some(timer) = self.timer {
            builder = builder.timer(timer);
        }
        if let Some(elements) = self.heating_elements {
            builder = builder.heating_elements(elements);
        }
        if let Some(fan_speed) = self.fan_speed {
            builder = builder.fan_speed(fan_speed);
        }
        if let Some(steam) = self.steam {
            builder = builder.steam(steam);
        }
        if let Some(rack_position) = self.rack_position {
            builder = builder.rack_position(rack_position);
        }
        builder.build()
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemperatureEntry {
    value: f64,
    #[serde(default = "default_unit")]
    unit: Unit,
}

fn default_unit() -> Unit {
    Unit::Celsius
}
