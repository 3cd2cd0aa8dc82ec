use glam::Vec2;
use serde::{Deserialize, Serialize};

const DIAGONAL: f32 = 0.7;

/// Eight-way movement direction. `N` points towards positive y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    E,
    W,
    N,
    S,
    NE,
    SE,
    NW,
    SW,
}

impl Direction {
    /// All directions in index order.
    pub const ALL: [Direction; 8] = [
        Direction::E,
        Direction::W,
        Direction::N,
        Direction::S,
        Direction::NE,
        Direction::SE,
        Direction::NW,
        Direction::SW,
    ];

    pub const CARDINAL: [Direction; 4] = [Direction::N, Direction::E, Direction::S, Direction::W];

    /// Per-axis factors applied to a travelled distance.
    pub const fn factors(self) -> Vec2 {
        match self {
            Direction::E => Vec2::new(1.0, 0.0),
            Direction::W => Vec2::new(-1.0, 0.0),
            Direction::N => Vec2::new(0.0, 1.0),
            Direction::S => Vec2::new(0.0, -1.0),
            Direction::NE => Vec2::new(DIAGONAL, DIAGONAL),
            Direction::SE => Vec2::new(DIAGONAL, -DIAGONAL),
            Direction::NW => Vec2::new(-DIAGONAL, DIAGONAL),
            Direction::SW => Vec2::new(-DIAGONAL, -DIAGONAL),
        }
    }

    /// Displacement for travelling `distance` pixels in this direction.
    pub fn scaled(self, distance: f32) -> Vec2 {
        self.factors() * distance
    }

    pub const fn index(self) -> usize {
        match self {
            Direction::E => 0,
            Direction::W => 1,
            Direction::N => 2,
            Direction::S => 3,
            Direction::NE => 4,
            Direction::SE => 5,
            Direction::NW => 6,
            Direction::SW => 7,
        }
    }

    /// Animation row for a sprite sheet supporting `max_directions`
    /// (8, 4, 2 or 1 rows).
    pub const fn index_for(self, max_directions: u32) -> usize {
        if max_directions >= 8 {
            self.index()
        } else if max_directions >= 4 {
            self.index() % 4
        } else if max_directions >= 2 {
            self.index() % 2
        } else {
            0
        }
    }

    /// Classifies a movement vector into the nearest of the eight directions.
    /// A zero vector yields `E`.
    pub fn from_movement(x: f32, y: f32) -> Self {
        let octant = (y.atan2(x) / std::f32::consts::FRAC_PI_4).round() as i32;
        match octant.rem_euclid(8) {
            0 => Direction::E,
            1 => Direction::NE,
            2 => Direction::N,
            3 => Direction::NW,
            4 => Direction::W,
            5 => Direction::SW,
            6 => Direction::S,
            _ => Direction::SE,
        }
    }

    /// Like [`Direction::from_movement`] but restricted to the directions a
    /// sprite sheet with `max_directions` rows can show.
    pub fn from_movement_limited(x: f32, y: f32, max_directions: u32) -> Self {
        if max_directions >= 8 {
            Self::from_movement(x, y)
        } else if max_directions >= 4 {
            if y.abs() > x.abs() {
                if y < 0.0 { Direction::S } else { Direction::N }
            } else if x < 0.0 {
                Direction::W
            } else {
                Direction::E
            }
        } else if max_directions >= 2 && x < 0.0 {
            Direction::W
        } else {
            Direction::E
        }
    }
}
