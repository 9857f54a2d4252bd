use super::{Node, NodeData};
use crate::errors::Result;
use crate::reduction::nan_min_max;
use serde::{Deserialize, Serialize};

/// Which units a [`ScaleUnits`] node rescales
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleMode {
    Never,
    /// Only units that take an SI prefix
    SimpleUnits,
    /// All units; unknown ones get a power-of-ten label
    #[default]
    Always,
}

const PREFIXES: [(i32, &str); 17] = [
    (-24, "y"),
    (-21, "z"),
    (-18, "a"),
    (-15, "f"),
    (-12, "p"),
    (-9, "n"),
    (-6, "µ"),
    (-3, "m"),
    (0, ""),
    (3, "k"),
    (6, "M"),
    (9, "G"),
    (12, "T"),
    (15, "P"),
    (18, "E"),
    (21, "Z"),
    (24, "Y"),
];

const SI_UNITS: [&str; 19] = [
    "m", "s", "g", "A", "K", "mol", "cd", "Hz", "N", "Pa", "J", "W", "C", "V", "F", "Ohm", "Ω", "S", "T",
];

fn si_prefix(exponent: i32) -> Option<&'static str> {
    PREFIXES.iter().find(|(e, _)| *e == exponent).map(|(_, p)| *p)
}

/// Engineering exponent (a multiple of 3) of the largest absolute value
fn engineering_exponent(max_abs: f64) -> i32 {
    if max_abs == 0.0 || !max_abs.is_finite() {
        return 0;
    }
    let mut exponent = ((max_abs.log10() / 3.0).floor() * 3.0) as i32;
    // log10 may land just off an exact power of ten
    let scaled = max_abs * 10f64.powi(-exponent);
    if scaled >= 1000.0 {
        exponent += 3;
    } else if scaled < 1.0 {
        exponent -= 3;
    }
    exponent
}

/// Scale factor and prefixed unit for values with the given largest magnitude.
///
/// Multiplying the values by the returned factor brings them into `[1, 1000)`.
/// Returns `None` when the unit should be left untouched.
pub fn scale_and_prefix(max_abs: f64, unit: &str, mode: ScaleMode) -> Option<(f64, String)> {
    if unit.is_empty() || mode == ScaleMode::Never {
        return None;
    }
    let exponent = engineering_exponent(max_abs);
    if exponent == 0 {
        return None;
    }
    let factor = 10f64.powi(-exponent);

    if SI_UNITS.contains(&unit) {
        if let Some(prefix) = si_prefix(exponent) {
            return Some((factor, format!("{prefix}{unit}")));
        }
    }
    match mode {
        ScaleMode::Always => Some((factor, format!("$10^{{{exponent}}}$ {unit}"))),
        _ => None,
    }
}

/// Rescales every field with a unit to an engineering exponent
#[derive(Debug, Clone, Default)]
pub struct ScaleUnits {
    mode: ScaleMode,
}

impl ScaleUnits {
    pub fn new(mode: ScaleMode) -> Self {
        Self { mode }
    }
}

impl Node for ScaleUnits {
    fn name(&self) -> &str {
        "ScaleUnits"
    }

    fn process(&self, mut data: NodeData) -> Result<Option<NodeData>> {
        for (name, field) in data.base_mut().data_items_mut() {
            let Some((min, max)) = nan_min_max(&field.values) else {
                continue;
            };
            let max_abs = min.abs().max(max.abs());
            if let Some((factor, unit)) = scale_and_prefix(max_abs, &field.unit, self.mode) {
                log::debug!("Scaling '{name}' by {factor:e}: {} -> {unit}", field.unit);
                field.values.mapv_inplace(|v| v * factor);
                field.unit = unit;
            }
        }
        Ok(Some(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefixes() {
        let (f, u) = scale_and_prefix(4e-9, "V", ScaleMode::Always).unwrap();
        assert_eq!(u, "nV");
        assert!((f - 1e9).abs() < 1.0);
        assert_eq!(scale_and_prefix(1e9, "A", ScaleMode::SimpleUnits).unwrap().1, "GA");
        assert_eq!(
            scale_and_prefix(5e6, "Foobar", ScaleMode::Always).unwrap().1,
            "$10^{6}$ Foobar"
        );
        assert_eq!(scale_and_prefix(5e6, "Foobar", ScaleMode::SimpleUnits), None);
        assert_eq!(scale_and_prefix(5e6, "", ScaleMode::Always), None);
        assert_eq!(scale_and_prefix(12.0, "V", ScaleMode::Always), None);
        assert_eq!(scale_and_prefix(1e-9, "V", ScaleMode::Never), None);
    }

    #[test]
    fn prefix_boundaries() {
        assert_eq!(scale_and_prefix(999.999995, "V", ScaleMode::Always), None);
        assert_eq!(scale_and_prefix(1000.0, "V", ScaleMode::Always).unwrap().1, "kV");
        assert_eq!(scale_and_prefix(1e-3, "V", ScaleMode::Always).unwrap().1, "mV");
        assert_eq!(scale_and_prefix(0.000999, "V", ScaleMode::Always).unwrap().1, "µV");
        for max_abs in [1e-6, 999.9e-6, 1e3, 999_999.0, 1e6, 2.5e12] {
            let exponent = engineering_exponent(max_abs);
            let scaled = max_abs * 10f64.powi(-exponent);
            assert!((1.0..1000.0).contains(&scaled), "{max_abs} scaled to {scaled}");
        }
    }
}
