//! Hex grid geometry with odd-row offset coordinates
//!
//! Rows increase northward; odd rows sit half a cell east of even rows.
//! Distance and shape enumeration convert to cube coordinates internally.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// sqrt(3), used by the world projection
pub const SQRT3: f32 = 1.732_050_8;

/// Offset hex coordinates (column q, row r)
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct HexCoord {
    pub q: i32,
    pub r: i32,
}

/// Neighbor offsets (dq, dr) for even rows
/// Index: 0=E, 1=NE, 2=NW, 3=W, 4=SW, 5=SE
pub const NEIGHBORS_EVEN_ROW: [(i32, i32); 6] = [
    (1, 0),   // E
    (0, 1),   // NE
    (-1, 1),  // NW
    (-1, 0),  // W
    (-1, -1), // SW
    (0, -1),  // SE
];

/// Neighbor offsets (dq, dr) for odd rows, same index order as even rows
pub const NEIGHBORS_ODD_ROW: [(i32, i32); 6] = [
    (1, 0),  // E
    (1, 1),  // NE
    (0, 1),  // NW
    (-1, 0), // W
    (0, -1), // SW
    (1, -1), // SE
];

/// Named neighbor directions
pub const EAST: usize = 0;
pub const NORTH_EAST: usize = 1;
pub const NORTH_WEST: usize = 2;
pub const WEST: usize = 3;
pub const SOUTH_WEST: usize = 4;
pub const SOUTH_EAST: usize = 5;

impl HexCoord {
    pub const fn new(q: i32, r: i32) -> Self {
        Self { q, r }
    }

    fn is_odd_row(&self) -> bool {
        (self.r & 1) == 1
    }

    /// Get neighbor in direction (0-5)
    pub fn neighbor(&self, direction: usize) -> HexCoord {
        let table = if self.is_odd_row() {
            &NEIGHBORS_ODD_ROW
        } else {
            &NEIGHBORS_EVEN_ROW
        };
        let (dq, dr) = table[direction % 6];
        HexCoord::new(self.q + dq, self.r + dr)
    }

    /// All six neighbors in direction order
    pub fn neighbors(&self) -> [HexCoord; 6] {
        std::array::from_fn(|dir| self.neighbor(dir))
    }

    pub fn to_cube(&self) -> CubeCoord {
        let x = self.q - ((self.r - (self.r & 1)) >> 1);
        let z = self.r;
        CubeCoord::new(x, -x - z, z)
    }

    /// Cube x and z, widened so any i32 pair converts without overflow
    fn wide_cube(&self) -> (i64, i64) {
        let r = i64::from(self.r);
        (i64::from(self.q) - ((r - (r & 1)) >> 1), r)
    }

    /// Distance between two hexes, saturating at `u32::MAX`
    pub fn distance_to(&self, other: HexCoord) -> u32 {
        let (ax, az) = self.wide_cube();
        let (bx, bz) = other.wide_cube();
        wide_distance(ax - bx, az - bz)
    }

    pub fn is_adjacent(&self, other: HexCoord) -> bool {
        self.distance_to(other) == 1
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{})", self.q, self.r)
    }
}

fn wide_distance(dx: i64, dz: i64) -> u32 {
    let dy = -dx - dz;
    let d = dx.abs().max(dy.abs()).max(dz.abs());
    u32::try_from(d).unwrap_or(u32::MAX)
}

// ============================================================================
// CUBE COORDINATES
// ============================================================================

/// Cube coordinates with x + y + z = 0
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CubeCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Cube directions in the order a ring walk turns through them
const CUBE_RING_DIRECTIONS: [CubeCoord; 6] = [
    CubeCoord::new(1, -1, 0),
    CubeCoord::new(1, 0, -1),
    CubeCoord::new(0, 1, -1),
    CubeCoord::new(-1, 1, 0),
    CubeCoord::new(-1, 0, 1),
    CubeCoord::new(0, -1, 1),
];

/// Ring walks start at center + RING_START_CORNER * radius
const RING_START_CORNER: usize = 4;

impl CubeCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn to_hex(&self) -> HexCoord {
        let r = self.z;
        let q = self.x + ((r - (r & 1)) >> 1);
        HexCoord::new(q, r)
    }

    pub fn distance_to(&self, other: CubeCoord) -> u32 {
        wide_distance(
            i64::from(self.x) - i64::from(other.x),
            i64::from(self.z) - i64::from(other.z),
        )
    }

    fn add(self, other: CubeCoord) -> CubeCoord {
        CubeCoord::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    fn scale(self, k: i32) -> CubeCoord {
        CubeCoord::new(self.x * k, self.y * k, self.z * k)
    }

    /// Round fractional cube coordinates to the nearest cell.
    /// The component with the largest rounding error is recomputed from the
    /// other two so the sum stays zero.
    pub fn round(xf: f64, yf: f64, zf: f64) -> CubeCoord {
        let mut rx = xf.round();
        let mut ry = yf.round();
        let mut rz = zf.round();

        let dx = (rx - xf).abs();
        let dy = (ry - yf).abs();
        let dz = (rz - zf).abs();

        if dx > dy && dx > dz {
            rx = -ry - rz;
        } else if dy > dz {
            ry = -rx - rz;
        } else {
            rz = -rx - ry;
        }

        CubeCoord::new(rx as i32, ry as i32, rz as i32)
    }
}

// ============================================================================
// SHAPES
// ============================================================================

/// Breadth-first disk enumeration, nearest cells first
pub struct Disk {
    radius: i32,
    visited: FxHashSet<HexCoord>,
    frontier: VecDeque<(HexCoord, i32)>,
}

impl Iterator for Disk {
    type Item = HexCoord;

    fn next(&mut self) -> Option<HexCoord> {
        let (cell, depth) = self.frontier.pop_front()?;
        if depth < self.radius {
            for n in cell.neighbors() {
                if self.visited.insert(n) {
                    self.frontier.push_back((n, depth + 1));
                }
            }
        }
        Some(cell)
    }
}

/// All cells within `radius` of `center`, center included.
/// Yields 3r² + 3r + 1 cells; nothing for a negative radius.
pub fn disk(center: HexCoord, radius: i32) -> Disk {
    let mut visited = FxHashSet::default();
    let mut frontier = VecDeque::new();
    if radius >= 0 {
        visited.insert(center);
        frontier.push_back((center, 0));
    }
    Disk {
        radius,
        visited,
        frontier,
    }
}

/// Edge walk around a ring
pub struct Ring {
    radius: i32,
    current: CubeCoord,
    edge: usize,
    step: i32,
}

impl Iterator for Ring {
    type Item = HexCoord;

    fn next(&mut self) -> Option<HexCoord> {
        if self.radius <= 0 || self.edge >= 6 {
            return None;
        }
        let cell = self.current.to_hex();
        self.current = self.current.add(CUBE_RING_DIRECTIONS[self.edge]);
        self.step += 1;
        if self.step == self.radius {
            self.step = 0;
            self.edge += 1;
        }
        Some(cell)
    }
}

/// All cells at exactly `radius` from `center`: 6r cells, none for r <= 0
pub fn ring(center: HexCoord, radius: i32) -> Ring {
    let start = center
        .to_cube()
        .add(CUBE_RING_DIRECTIONS[RING_START_CORNER].scale(radius.max(0)));
    Ring {
        radius,
        current: start,
        edge: 0,
        step: 0,
    }
}

/// Cells on the straight line from `a` to `b`, both ends included
pub fn line(a: HexCoord, b: HexCoord) -> Vec<HexCoord> {
    let n = a.distance_to(b);
    if n == 0 {
        return vec![a];
    }

    let ca = a.to_cube();
    let cb = b.to_cube();
    // Nudge off exact cell edges so ties round consistently
    let (ex, ey, ez) = (1e-6, 2e-6, -3e-6);

    (0..=n)
        .map(|i| {
            let t = i as f64 / n as f64;
            let x = ca.x as f64 + (cb.x - ca.x) as f64 * t + ex;
            let y = ca.y as f64 + (cb.y - ca.y) as f64 * t + ey;
            let z = ca.z as f64 + (cb.z - ca.z) as f64 * t + ez;
            CubeCoord::round(x, y, z).to_hex()
        })
        .collect()
}

// ============================================================================
// WORLD PROJECTION
// ============================================================================

/// Position on the world ground plane
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: f32,
    pub z: f32,
}

impl WorldPos {
    pub fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    /// Linear interpolation, used to place a unit during transit
    pub fn lerp(self, to: WorldPos, t: f32) -> WorldPos {
        let t = t.clamp(0.0, 1.0);
        WorldPos::new(self.x + (to.x - self.x) * t, self.z + (to.z - self.z) * t)
    }
}

/// Pointy-top layout parameters
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    /// Center-to-corner radius of a cell
    pub outer_radius: f32,
    /// Shift odd rows half a cell east
    pub use_odd_r_offset: bool,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            outer_radius: 1.0,
            use_odd_r_offset: true,
        }
    }
}

impl Layout {
    pub fn new(outer_radius: f32, use_odd_r_offset: bool) -> Self {
        Self {
            outer_radius,
            use_odd_r_offset,
        }
    }

    /// Center-to-edge radius of a cell
    pub fn inner_radius(&self) -> f32 {
        self.outer_radius * 0.5 * SQRT3
    }

    /// Cell center in world space
    pub fn grid_to_world(&self, c: HexCoord) -> WorldPos {
        let inner = self.inner_radius();
        let mut x = c.q as f32 * 2.0 * inner;
        if self.use_odd_r_offset && (c.r & 1) == 1 {
            x += inner;
        }
        let z = c.r as f32 * 1.5 * self.outer_radius;
        WorldPos::new(x, z)
    }

    /// Cell containing a world position
    pub fn world_to_grid(&self, pos: WorldPos) -> HexCoord {
        let radius = self.outer_radius as f64;
        let (x, z) = (pos.x as f64, pos.z as f64);

        if !self.use_odd_r_offset {
            // Unshifted rows: round the row, then the column within it
            let inner = radius * 0.5 * 3f64.sqrt();
            let r = (z / (1.5 * radius)).round() as i32;
            let q = (x / (2.0 * inner)).round() as i32;
            return HexCoord::new(q, r);
        }

        // world -> fractional axial
        let qf = (3f64.sqrt() / 3.0 * x - z / 3.0) / radius;
        let rf = (2.0 / 3.0 * z) / radius;

        // axial -> cube, round, back to odd-row offset
        CubeCoord::round(qf, -qf - rf, rf).to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_distance() {
        let origin = HexCoord::new(0, 0);
        assert_eq!(origin.distance_to(origin), 0);
        assert_eq!(origin.distance_to(HexCoord::new(1, 0)), 1);
        assert_eq!(origin.distance_to(HexCoord::new(2, 0)), 2);
        assert_eq!(HexCoord::new(2, 2).distance_to(HexCoord::new(3, 2)), 1);
    }

    #[test]
    fn test_distance_extreme_coords() {
        let far_east = HexCoord::new(i32::MAX, 0);
        let far_west = HexCoord::new(i32::MIN, i32::MIN);
        let near = HexCoord::new(-1, 0);
        assert_eq!(far_east.distance_to(near), 1 << 31);
        assert_eq!(near.distance_to(far_east), 1 << 31);
        assert_eq!(far_east.distance_to(far_west), u32::MAX);
        assert_eq!(far_west.distance_to(far_east), u32::MAX);
        assert_eq!(far_west.distance_to(far_west), 0);
    }

    #[test]
    fn test_neighbors_are_adjacent() {
        for c in [HexCoord::new(0, 0), HexCoord::new(3, 1), HexCoord::new(-2, -3)] {
            let ns = c.neighbors();
            let unique: HashSet<_> = ns.iter().copied().collect();
            assert_eq!(unique.len(), 6);
            for n in ns {
                assert_eq!(c.distance_to(n), 1, "{} -> {}", c, n);
            }
        }
    }

    #[test]
    fn test_neighbor_row_parity() {
        // NE of an even row keeps the column, NE of an odd row moves east
        assert_eq!(HexCoord::new(2, 2).neighbor(NORTH_EAST), HexCoord::new(2, 3));
        assert_eq!(HexCoord::new(2, 3).neighbor(NORTH_EAST), HexCoord::new(3, 4));
        assert_eq!(HexCoord::new(2, 2).neighbor(SOUTH_WEST), HexCoord::new(1, 1));
        assert_eq!(HexCoord::new(2, 3).neighbor(SOUTH_WEST), HexCoord::new(2, 2));
    }

    #[test]
    fn test_neighbor_directions_invert() {
        let c = HexCoord::new(4, 7);
        for dir in 0..6 {
            assert_eq!(c.neighbor(dir).neighbor((dir + 3) % 6), c);
        }
    }

    #[test]
    fn test_cube_roundtrip() {
        for q in -5..5 {
            for r in -5..5 {
                let c = HexCoord::new(q, r);
                let cube = c.to_cube();
                assert_eq!(cube.x + cube.y + cube.z, 0);
                assert_eq!(cube.to_hex(), c);
            }
        }
    }

    #[test]
    fn test_ring_radius_two() {
        let center = HexCoord::new(0, 0);
        let cells: Vec<_> = ring(center, 2).collect();
        let unique: HashSet<_> = cells.iter().copied().collect();
        assert_eq!(cells.len(), 12);
        assert_eq!(unique.len(), 12);
        assert!(!unique.contains(&center));
        assert!(cells.iter().all(|c| center.distance_to(*c) == 2));
    }

    #[test]
    fn test_ring_degenerate() {
        assert_eq!(ring(HexCoord::new(1, 1), 0).count(), 0);
        assert_eq!(ring(HexCoord::new(1, 1), -3).count(), 0);
    }

    #[test]
    fn test_disk_sizes() {
        let center = HexCoord::new(2, 2);
        assert_eq!(disk(center, 0).collect::<Vec<_>>(), vec![center]);
        assert_eq!(disk(center, 1).count(), 7);
        assert_eq!(disk(center, 3).count(), 37);
        assert_eq!(disk(center, -1).count(), 0);
    }

    #[test]
    fn test_line() {
        let a = HexCoord::new(0, 0);
        let b = HexCoord::new(3, 0);
        let cells = line(a, b);
        assert_eq!(cells.len(), 4);
        assert_eq!(cells.first(), Some(&a));
        assert_eq!(cells.last(), Some(&b));
        for pair in cells.windows(2) {
            assert_eq!(pair[0].distance_to(pair[1]), 1);
        }
        assert_eq!(line(a, a), vec![a]);
    }

    #[test]
    fn test_world_projection() {
        let layout = Layout::default();
        let p = layout.grid_to_world(HexCoord::new(0, 1));
        assert!((p.x - layout.inner_radius()).abs() < 1e-5);
        assert!((p.z - 1.5).abs() < 1e-5);
        assert_eq!(layout.world_to_grid(p), HexCoord::new(0, 1));
        // A point slightly off-center still lands in the same cell
        let nudged = WorldPos::new(p.x + 0.2, p.z - 0.2);
        assert_eq!(layout.world_to_grid(nudged), HexCoord::new(0, 1));
    }

    proptest! {
        #[test]
        fn distance_is_metric(
            aq in any::<i32>(), ar in any::<i32>(),
            bq in any::<i32>(), br in any::<i32>(),
            cq in any::<i32>(), cr in any::<i32>(),
        ) {
            let a = HexCoord::new(aq, ar);
            let b = HexCoord::new(bq, br);
            let c = HexCoord::new(cq, cr);
            prop_assert_eq!(a.distance_to(a), 0);
            prop_assert_eq!(a.distance_to(b), b.distance_to(a));
            let via_b = u64::from(a.distance_to(b)) + u64::from(b.distance_to(c));
            prop_assert!(u64::from(a.distance_to(c)) <= via_b);
        }

        #[test]
        fn neighbors_adjacent_anywhere(q in -1_000_000i32..1_000_000, r in -1_000_000i32..1_000_000) {
            let c = HexCoord::new(q, r);
            for n in c.neighbors() {
                prop_assert_eq!(c.distance_to(n), 1);
            }
        }

        #[test]
        fn disk_is_union_of_rings(q in -20i32..20, r in -20i32..20, radius in 0i32..7) {
            let center = HexCoord::new(q, r);
            let disk_cells: Vec<_> = disk(center, radius).collect();
            let n = radius as usize;
            prop_assert_eq!(disk_cells.len(), 3 * n * n + 3 * n + 1);

            let disk_set: HashSet<_> = disk_cells.iter().copied().collect();
            prop_assert_eq!(disk_set.len(), disk_cells.len());

            let mut union = HashSet::new();
            union.insert(center);
            for k in 1..=radius {
                let ring_cells: Vec<_> = ring(center, k).collect();
                prop_assert_eq!(ring_cells.len(), 6 * k as usize);
                for c in ring_cells {
                    prop_assert_eq!(center.distance_to(c), k as u32);
                    prop_assert!(union.insert(c), "rings overlap at {}", c);
                }
            }
            prop_assert_eq!(union, disk_set);
        }

        #[test]
        fn world_roundtrip(
            q in -200i32..200,
            r in -200i32..200,
            outer_radius in 0.25f32..8.0,
            use_odd_r_offset in any::<bool>(),
        ) {
            let layout = Layout::new(outer_radius, use_odd_r_offset);
            let c = HexCoord::new(q, r);
            prop_assert_eq!(layout.world_to_grid(layout.grid_to_world(c)), c);
        }
    }
}
