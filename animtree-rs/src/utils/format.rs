//! Formatting utilities

use glam::{Quat, Vec3};

/// Format a vector with three decimals per component
pub fn format_vec3(v: Vec3) -> String {
    format!("({:.3}, {:.3}, {:.3})", v.x, v.y, v.z)
}

/// Format a rotation as axis and angle in degrees
pub fn format_rotation(q: Quat) -> String {
    if q.length_squared() < f32::EPSILON {
        return "none".to_string();
    }
    let (axis, angle) = q.normalize().to_axis_angle();
    if angle.abs() < 1e-4 {
        "identity".to_string()
    } else {
        format!("{:.1}° about {}", angle.to_degrees(), format_vec3(axis))
    }
}

/// Format a weight in [0, 1] as a percentage
pub fn format_weight(value: f32) -> String {
    format!("{:.1}%", value * 100.0)
}

/// Format a duration in seconds
pub fn format_seconds(seconds: f32) -> String {
    format!("{seconds:.3}s")
}
