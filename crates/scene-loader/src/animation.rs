use std::{
    fmt::{self, Display, Formatter},
    ops::{Add, Mul},
};

use glam::Quat;

use crate::{index::AssetIndex, node::UserData};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationPath {
    Translation,
    Rotation,
    Scale,
    Weights,
    /// A property path defined by a plugin.
    Custom(String),
}

impl AnimationPath {
    pub fn from_name(name: &str) -> Self {
        match name {
            "translation" => AnimationPath::Translation,
            "rotation" => AnimationPath::Rotation,
            "scale" => AnimationPath::Scale,
            "weights" => AnimationPath::Weights,
            other => AnimationPath::Custom(other.to_string()),
        }
    }
}

impl Display for AnimationPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AnimationPath::Translation => write!(f, "position"),
            AnimationPath::Rotation => write!(f, "quaternion"),
            AnimationPath::Scale => write!(f, "scale"),
            AnimationPath::Weights => write!(f, "morphTargetInfluences"),
            AnimationPath::Custom(path) => Display::fmt(path, f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackValueType {
    Number,
    Vector,
    Quaternion,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Interpolation {
    #[default]
    Linear,
    Step,
    // in, val, out
    CubicSpline,
}

impl Interpolation {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "LINEAR" => Some(Interpolation::Linear),
            "STEP" => Some(Interpolation::Step),
            "CUBICSPLINE" => Some(Interpolation::CubicSpline),
            _ => None,
        }
    }

    /// Number of values stored per keyframe.
    pub fn values_per_key(self) -> usize {
        match self {
            Interpolation::CubicSpline => 3,
            _ => 1,
        }
    }
}

/// Keyframes of one animated property. Values are stored flat; with
/// cubic spline interpolation every keyframe holds three values: in-tangent,
/// value and out-tangent.
#[derive(Debug, Clone)]
pub struct KeyframeTrack {
    pub target: AssetIndex,
    pub target_name: Option<String>,
    pub path: AnimationPath,
    pub value_type: TrackValueType,
    pub interpolation: Interpolation,
    /// Number of components in one keyframe value.
    pub value_size: usize,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

impl KeyframeTrack {
    pub fn value_size(&self) -> usize {
        self.value_size
    }

    /// Whether `values` holds a full value for every keyframe.
    pub fn is_complete(&self) -> bool {
        self.value_size > 0
            && self.values.len()
                >= self.times.len() * self.interpolation.values_per_key() * self.value_size
            && (self.value_type != TrackValueType::Quaternion || self.value_size == 4)
    }

    pub fn duration(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    fn slot(&self, key: usize, slot: usize) -> &[f32] {
        let size = self.value_size;
        let start = match self.interpolation {
            Interpolation::CubicSpline => (key * 3 + slot) * size,
            _ => key * size,
        };
        &self.values[start..start + size]
    }

    /// Value of keyframe `key`.
    pub fn value(&self, key: usize) -> &[f32] {
        self.slot(key, 1)
    }

    /// Samples the track. Times outside the keyframe range clamp to the
    /// first or last value. An incomplete track samples to nothing.
    pub fn sample(&self, time: f32) -> Vec<f32> {
        if self.times.is_empty() || !self.is_complete() {
            return Vec::new();
        }
        let next = self.times.partition_point(|key_time| *key_time <= time);
        let result = if next == 0 {
            self.value(0).to_vec()
        } else if next >= self.times.len() {
            self.value(self.times.len() - 1).to_vec()
        } else {
            let key = next - 1;
            let (start, end) = (self.times[key], self.times[next]);
            let td = end - start;
            let t = if td > 0.0 { (time - start) / td } else { 0.0 };
            match self.interpolation {
                Interpolation::Step => self.value(key).to_vec(),
                Interpolation::Linear => {
                    if self.value_type == TrackValueType::Quaternion {
                        let a = quat_from_slice(self.value(key));
                        let b = quat_from_slice(self.value(next));
                        return a.slerp(b, t).normalize().to_array().to_vec();
                    }
                    self.value(key)
                        .iter()
                        .zip(self.value(next))
                        .map(|(a, b)| f32::linear(*a, *b, t))
                        .collect()
                }
                Interpolation::CubicSpline => {
                    let vk = self.slot(key, 1);
                    let bk = self.slot(key, 2);
                    let vk_1 = self.slot(next, 1);
                    let ak_1 = self.slot(next, 0);
                    (0..vk.len())
                        .map(|index| {
                            f32::cubic_spline(vk[index], bk[index], vk_1[index], ak_1[index], t, td)
                        })
                        .collect()
                }
            }
        };
        if self.value_type == TrackValueType::Quaternion {
            quat_from_slice(&result).normalize().to_array().to_vec()
        } else {
            result
        }
    }
}

fn quat_from_slice(slice: &[f32]) -> Quat {
    Quat::from_xyzw(slice[0], slice[1], slice[2], slice[3])
}

#[derive(Debug, Clone)]
pub struct AnimationAsset {
    pub id: AssetIndex,
    pub name: String,
    pub tracks: Vec<KeyframeTrack>,
    pub user_data: UserData,
}

impl AnimationAsset {
    pub fn duration(&self) -> f32 {
        self.tracks
            .iter()
            .map(KeyframeTrack::duration)
            .fold(0.0, f32::max)
    }
}

pub trait Interpolate {
    fn linear(a: Self, b: Self, t: f32) -> Self;
    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self;
}

impl<T> Interpolate for T
where
    T: Mul<f32, Output = T> + Add<T, Output = T>,
{
    fn linear(a: Self, b: Self, t: f32) -> Self {
        a * (1.0 - t) + b * t
    }

    fn cubic_spline(vk: Self, bk: Self, vk_1: Self, ak_1: Self, t: f32, td: f32) -> Self {
        let t3 = t.powi(3);
        let t2 = t.powi(2);
        let first = vk * (2.0 * t3 - 3.0 * t2 + 1.0);
        let second = bk * (td * (t3 - 2.0 * t2 + t));
        let third = vk_1 * (-2.0 * t3 + 3.0 * t2);
        let forth = ak_1 * (td * (t3 - t2));
        first + second + third + forth
    }
}

#[cfg(test)]
mod test {
    use glam::Quat;

    use crate::index::{AssetIndex, AssetKind};

    use super::*;

    fn track(
        value_type: TrackValueType,
        interpolation: Interpolation,
        times: Vec<f32>,
        values: Vec<f32>,
    ) -> KeyframeTrack {
        let value_size = values.len() / (times.len() * interpolation.values_per_key());
        KeyframeTrack {
            target: AssetIndex::new(AssetKind::Node, 0),
            target_name: None,
            path: AnimationPath::Translation,
            value_type,
            interpolation,
            value_size,
            times,
            values,
        }
    }

    #[test]
    fn test_step_holds_previous_value() {
        let track = track(
            TrackValueType::Vector,
            Interpolation::Step,
            vec![0.0, 1.0],
            vec![0.0, 0.0, 0.0, 5.0, 5.0, 5.0],
        );
        assert_eq!(track.value_size(), 3);
        assert_eq!(track.sample(0.5), vec![0.0, 0.0, 0.0]);
        assert_eq!(track.sample(1.0), vec![5.0, 5.0, 5.0]);
        assert_eq!(track.sample(-1.0), vec![0.0, 0.0, 0.0]);
        assert_eq!(track.sample(3.0), vec![5.0, 5.0, 5.0]);
    }

    #[test]
    fn test_linear_and_slerp() {
        let track = track(
            TrackValueType::Number,
            Interpolation::Linear,
            vec![0.0, 2.0],
            vec![0.0, 4.0],
        );
        assert_eq!(track.sample(0.5), vec![1.0]);

        let end = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let rotation = super::KeyframeTrack {
            path: AnimationPath::Rotation,
            ..track_quat(Interpolation::Linear, end)
        };
        let halfway = quat_from_slice(&rotation.sample(0.5));
        let expected = Quat::from_rotation_z(std::f32::consts::FRAC_PI_4);
        assert!(halfway.abs_diff_eq(expected, 1e-5));
    }

    fn track_quat(interpolation: Interpolation, end: Quat) -> KeyframeTrack {
        let mut values = Vec::new();
        values.extend_from_slice(&Quat::IDENTITY.to_array());
        values.extend_from_slice(&end.to_array());
        track(TrackValueType::Quaternion, interpolation, vec![0.0, 1.0], values)
    }

    #[test]
    fn test_cubic_spline_rotation_endpoints() {
        // Unnormalized spline vertices with nonzero tangents.
        let first = [0.0, 0.0, 0.0, 2.0];
        let last = [0.0, 0.0, 3.0, 3.0];
        let tangent = [0.1, 0.2, 0.3, 0.4];
        let mut values = Vec::new();
        for vertex in [first, last] {
            values.extend_from_slice(&tangent);
            values.extend_from_slice(&vertex);
            values.extend_from_slice(&tangent);
        }
        let track = track(
            TrackValueType::Quaternion,
            Interpolation::CubicSpline,
            vec![0.0, 1.0],
            values,
        );
        assert_eq!(track.value_size(), 4);

        let start = quat_from_slice(&track.sample(0.0));
        assert!(start.abs_diff_eq(quat_from_slice(&first).normalize(), 1e-6));
        let end = quat_from_slice(&track.sample(1.0));
        assert!(end.abs_diff_eq(quat_from_slice(&last).normalize(), 1e-6));
        let middle = quat_from_slice(&track.sample(0.5));
        assert!((middle.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_incomplete_track_samples_nothing() {
        let mut rotation = track(
            TrackValueType::Quaternion,
            Interpolation::Linear,
            vec![0.0, 1.0],
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0],
        );
        rotation.value_size = 3;
        assert!(!rotation.is_complete());
        assert!(rotation.sample(0.5).is_empty());

        let mut short = track(
            TrackValueType::Vector,
            Interpolation::Linear,
            vec![0.0, 1.0],
            vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0],
        );
        short.values.truncate(4);
        assert!(short.sample(1.0).is_empty());
    }

    #[test]
    fn test_cubic_spline_hermite() {
        // p(t) = 3t^2 - 2t^3 between 0 and 1 with flat tangents.
        let value = f32::cubic_spline(0.0, 0.0, 1.0, 0.0, 0.5, 1.0);
        assert!((value - 0.5).abs() < 1e-6);
        let value = f32::cubic_spline(0.0, 0.0, 1.0, 0.0, 0.25, 1.0);
        assert!((value - 0.15625).abs() < 1e-6);
    }
}
