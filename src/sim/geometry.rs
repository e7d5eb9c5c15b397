use std::ops::{Add, AddAssign, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A point in world coordinates, in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub z: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Location) -> f64 {
        (*self - *other).length()
    }

    /// Distance in the ground plane, ignoring z.
    pub fn distance_2d(&self, other: &Location) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn dot(&self, other: &Location) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }
}

impl Add for Location {
    type Output = Location;

    fn add(self, rhs: Location) -> Location {
        Location::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Location {
    fn add_assign(&mut self, rhs: Location) {
        *self = *self + rhs;
    }
}

impl Sub for Location {
    type Output = Location;

    fn sub(self, rhs: Location) -> Location {
        Location::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Location {
    type Output = Location;

    fn mul(self, rhs: f64) -> Location {
        Location::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Orientation in degrees. Yaw is measured counter-clockwise from the +x axis
/// in the ground plane, with y pointing to the left of a vehicle facing +x.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotation {
    #[serde(default)]
    pub pitch: f64,
    pub yaw: f64,
    #[serde(default)]
    pub roll: f64,
}

impl Rotation {
    pub const fn from_yaw(yaw: f64) -> Self {
        Self {
            pitch: 0.0,
            yaw,
            roll: 0.0,
        }
    }

    pub fn yaw_radians(&self) -> f64 {
        self.yaw.to_radians()
    }

    /// Unit vector pointing in the direction of travel.
    pub fn forward_vector(&self) -> Location {
        let yaw = self.yaw_radians();
        let pitch = self.pitch.to_radians();
        Location::new(
            pitch.cos() * yaw.cos(),
            pitch.cos() * yaw.sin(),
            pitch.sin(),
        )
    }

    /// Unit vector pointing to the right of the direction of travel.
    pub fn right_vector(&self) -> Location {
        let yaw = self.yaw_radians();
        Location::new(yaw.sin(), -yaw.cos(), 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    pub location: Location,
    pub rotation: Rotation,
}

impl Transform {
    pub const fn new(location: Location, rotation: Rotation) -> Self {
        Self { location, rotation }
    }

    pub fn distance(&self, other: &Transform) -> f64 {
        self.location.distance(&other.location)
    }
}

/// Wrap an angle in radians into (-pi, pi].
pub fn normalize_angle(angle: f64) -> f64 {
    let mut angle = angle % std::f64::consts::TAU;
    if angle > std::f64::consts::PI {
        angle -= std::f64::consts::TAU;
    } else if angle <= -std::f64::consts::PI {
        angle += std::f64::consts::TAU;
    }
    angle
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn test_forward_and_right_vectors() {
        let rotation = Rotation::from_yaw(0.0);
        let forward = rotation.forward_vector();
        let right = rotation.right_vector();
        assert!((forward.x - 1.0).abs() < EPS && forward.y.abs() < EPS);
        assert!(right.x.abs() < EPS && (right.y + 1.0).abs() < EPS);

        let rotation = Rotation::from_yaw(90.0);
        let forward = rotation.forward_vector();
        let right = rotation.right_vector();
        assert!(forward.x.abs() < EPS && (forward.y - 1.0).abs() < EPS);
        assert!((right.x - 1.0).abs() < EPS && right.y.abs() < EPS);
        assert!(forward.dot(&right).abs() < EPS);
    }

    #[test]
    fn test_normalize_angle() {
        let pi = std::f64::consts::PI;
        assert!((normalize_angle(2.5 * pi) - 0.5 * pi).abs() < EPS);
        assert!((normalize_angle(-1.5 * pi) - 0.5 * pi).abs() < EPS);
        assert!((normalize_angle(0.25) - 0.25).abs() < EPS);
    }

    #[test]
    fn test_distance() {
        let a = Location::new(0.0, 0.0, 0.0);
        let b = Location::new(3.0, 4.0, 12.0);
        assert!((a.distance(&b) - 13.0).abs() < EPS);
        assert!((a.distance_2d(&b) - 5.0).abs() < EPS);
    }
}
