//! Cardinal Facing Directions
//!
//! Sprites face one of four directions; movement picks the dominant
//! axis of the last step.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Facing direction for sprites.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
#[derive(Default)]
pub enum Direction {
    /// Facing +X
    Right = 0,
    /// Facing +Y
    Up = 1,
    /// Facing -X
    Left = 2,
    /// Facing -Y
    #[default]
    Down = 3,
}

impl Direction {
    /// Number of facing directions.
    pub const COUNT: usize = 4;

    /// Pick the direction matching the dominant axis of `v`.
    ///
    /// Ties between axes go to the vertical; a zero vector faces Down.
    pub fn from_vec(v: Vec2) -> Direction {
        if v.x.abs() > v.y.abs() {
            if v.x > 0.0 {
                Direction::Right
            } else {
                Direction::Left
            }
        } else if v.y > 0.0 {
            Direction::Up
        } else {
            Direction::Down
        }
    }

    /// Unit vector for this direction.
    pub fn to_vec(self) -> Vec2 {
        match self {
            Direction::Right => Vec2::new(1.0, 0.0),
            Direction::Up => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Down => Vec2::new(0.0, -1.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_dominant_axis() {
        assert_eq!(Direction::from_vec(Vec2::new(2.0, 1.0)), Direction::Right);
        assert_eq!(Direction::from_vec(Vec2::new(-2.0, 1.0)), Direction::Left);
        assert_eq!(Direction::from_vec(Vec2::new(1.0, 2.0)), Direction::Up);
        assert_eq!(Direction::from_vec(Vec2::new(1.0, -2.0)), Direction::Down);
    }

    #[test]
    fn test_from_vec_zero_faces_down() {
        assert_eq!(Direction::from_vec(Vec2::ZERO), Direction::Down);
    }

    #[test]
    fn test_round_trip() {
        for dir in [
            Direction::Right,
            Direction::Up,
            Direction::Left,
            Direction::Down,
        ] {
            assert_eq!(Direction::from_vec(dir.to_vec()), dir);
        }
    }
}
