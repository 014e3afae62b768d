//! Temperature to fan speed mapping

/// Quadratic fan curve bounded by a temperature window and a duty window.
///
/// Below `temp_min` the fan sits at `fan_min`, above `temp_max` it runs at
/// `fan_max`. In between the duty follows the square of the normalized
/// temperature, so it stays close to `fan_min` through the lower half of the
/// window and ramps hard near `temp_max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanCurve {
    pub temp_min: i32,
    pub temp_max: i32,
    pub fan_min: u8,
    pub fan_max: u8,
}

impl FanCurve {
    pub fn new(temp_min: i32, temp_max: i32, fan_min: u8, fan_max: u8) -> Self {
        Self {
            temp_min,
            temp_max,
            fan_min,
            fan_max,
        }
    }

    /// Calculate fan duty percentage for a given temperature
    pub fn calculate_duty_for_temperature(&self, temperature: i32) -> u8 {
        compute_target(
            temperature,
            self.temp_min,
            self.temp_max,
            self.fan_min,
            self.fan_max,
        )
    }

    /// Sample the curve every `step` degrees, padded by one step on each side
    pub fn points(&self, step: u32) -> Vec<(i32, u8)> {
        let step = step.max(1) as i64;
        let first = self.temp_min as i64 - step;
        let last = self.temp_max as i64 + step;

        let mut points = Vec::new();
        let mut temp = first;
        while temp <= last {
            let t = temp as i32;
            points.push((t, self.calculate_duty_for_temperature(t)));
            temp += step;
        }
        points
    }
}

/// Map a temperature reading onto a fan percentage.
///
/// Integer arithmetic gives the floor of
/// `fan_min + (fan_max - fan_min) * ((t - temp_min) / (temp_max - temp_min))^2`
/// exactly; every term is non-negative inside the window. The squares of an
/// `i32` span need 64 bits, the product with the duty range a few more.
pub fn compute_target(t: i32, temp_min: i32, temp_max: i32, fan_min: u8, fan_max: u8) -> u8 {
    if t <= temp_min {
        return fan_min;
    }
    if t >= temp_max {
        return fan_max;
    }

    let span = (temp_max as i128 - temp_min as i128).pow(2);
    let offset = (t as i128 - temp_min as i128).pow(2);
    let range = fan_max as i128 - fan_min as i128;

    (fan_min as i128 + range * offset / span) as u8
}
