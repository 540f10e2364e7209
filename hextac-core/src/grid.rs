//! Playable grid: which coordinates exist, and a version counter that moves
//! whenever that set changes.

use crate::board::{HexCoord, Layout};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Source of the valid-coordinate set
pub trait GridSnapshotProvider {
    /// Monotonically increasing; bumps whenever the valid set changes
    fn version(&self) -> u32;

    fn contains(&self, c: HexCoord) -> bool;

    /// Every valid coordinate. Unbounded grids return nothing here.
    fn coords(&self) -> Vec<HexCoord>;
}

/// Largest mask a recipe may build; taller recipes lose rows past it
pub const MAX_GRID_CELLS: usize = 1 << 20;

/// Random hole punching for prototype maps
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HoleConfig {
    /// Probability in [0, 0.9] that a cell is removed
    pub chance: f32,
    pub seed: u64,
}

/// Grid layout recipe
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridRecipe {
    pub width: i32,
    pub height: i32,
    #[serde(default = "default_outer_radius")]
    pub outer_radius: f32,
    #[serde(default = "default_true")]
    pub use_odd_r_offset: bool,
    /// Whole columns to leave empty
    #[serde(default)]
    pub empty_columns: Vec<i32>,
    #[serde(default)]
    pub holes: Option<HoleConfig>,
}

fn default_outer_radius() -> f32 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for GridRecipe {
    fn default() -> Self {
        Self {
            width: 6,
            height: 6,
            outer_radius: 1.0,
            use_odd_r_offset: true,
            empty_columns: Vec::new(),
            holes: None,
        }
    }
}

impl GridRecipe {
    pub fn layout(&self) -> Layout {
        Layout::new(self.outer_radius, self.use_odd_r_offset)
    }
}

/// Existence mask over 0..width x 0..height, or unbounded
#[derive(Clone, Debug)]
pub struct HexGrid {
    width: i32,
    height: i32,
    /// Row-major, `None` when every coordinate is valid
    mask: Option<Vec<bool>>,
    layout: Layout,
    version: u32,
}

impl HexGrid {
    /// Build a grid from a recipe
    pub fn from_recipe(recipe: &GridRecipe) -> Self {
        let mut grid = Self {
            width: 0,
            height: 0,
            mask: Some(Vec::new()),
            layout: recipe.layout(),
            version: 0,
        };
        grid.rebuild(recipe);
        grid
    }

    /// Every integer coordinate is playable
    pub fn unbounded() -> Self {
        Self {
            width: 0,
            height: 0,
            mask: None,
            layout: Layout::default(),
            version: 1,
        }
    }

    /// Re-apply a recipe and bump the version
    pub fn rebuild(&mut self, recipe: &GridRecipe) {
        let width = recipe.width.max(0);
        let mut height = recipe.height.max(0);
        if width > 0 {
            let max_rows = i32::try_from(MAX_GRID_CELLS / width as usize).unwrap_or(i32::MAX);
            if height > max_rows {
                tracing::warn!(
                    "Grid {}x{} exceeds {} cells, clamped to {} rows",
                    width,
                    height,
                    MAX_GRID_CELLS,
                    max_rows
                );
                height = max_rows;
            }
        }
        let mut mask = vec![true; width as usize * height as usize];

        for &col in &recipe.empty_columns {
            if col < 0 || col >= width {
                continue;
            }
            for r in 0..height {
                mask[cell_index(width, col, r)] = false;
            }
        }

        if let Some(holes) = &recipe.holes {
            let chance = holes.chance.clamp(0.0, 0.9);
            if chance != holes.chance {
                tracing::warn!("Hole chance {} clamped to {}", holes.chance, chance);
            }
            if chance > 0.0 {
                let mut rng = ChaCha8Rng::seed_from_u64(holes.seed);
                for cell in mask.iter_mut() {
                    if rng.gen::<f32>() < chance {
                        *cell = false;
                    }
                }
            }
        }

        self.width = width;
        self.height = height;
        self.mask = Some(mask);
        self.layout = recipe.layout();
        self.version = self.version.wrapping_add(1);

        tracing::debug!(
            "Grid rebuilt: {}x{}, {} cells, version {}",
            width,
            height,
            self.cell_count(),
            self.version
        );
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    /// Number of playable cells (0 for unbounded grids)
    pub fn cell_count(&self) -> usize {
        self.mask
            .as_ref()
            .map_or(0, |m| m.iter().filter(|&&b| b).count())
    }

    fn in_bounds(&self, c: HexCoord) -> bool {
        c.q >= 0 && c.q < self.width && c.r >= 0 && c.r < self.height
    }
}

/// Row-major mask index for an in-bounds cell
fn cell_index(width: i32, q: i32, r: i32) -> usize {
    r as usize * width as usize + q as usize
}

impl GridSnapshotProvider for HexGrid {
    fn version(&self) -> u32 {
        self.version
    }

    fn contains(&self, c: HexCoord) -> bool {
        match &self.mask {
            None => true,
            Some(mask) => self.in_bounds(c) && mask[cell_index(self.width, c.q, c.r)],
        }
    }

    fn coords(&self) -> Vec<HexCoord> {
        let Some(mask) = &self.mask else {
            return Vec::new();
        };
        (0..self.height)
            .flat_map(|r| (0..self.width).map(move |q| HexCoord::new(q, r)))
            .filter(|c| mask[cell_index(self.width, c.q, c.r)])
            .collect()
    }
}
