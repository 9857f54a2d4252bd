//! Structure listings and field summaries for the command line
//!
//! These work on any container through its [`DataDictBase`].

use crate::base::DataDictBase;
use crate::errors::Result;
use crate::reduction::{nan_mean, nan_min_max, nan_std};

/// Quick statistics of a field's valid values
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSummary {
    pub name: String,
    pub total: usize,
    pub valid: usize,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub std_dev: Option<f64>,
}

fn shape_string(shape: &[usize]) -> String {
    shape
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" × ")
}

/// Axes and dependents of a container, one per line
pub fn format_structure(data: &DataDictBase) -> String {
    let mut out = String::new();

    out.push_str("\n Axes\n========\n");
    let axes: Vec<String> = data
        .data_items()
        .filter(|(_, f)| !f.is_dependent())
        .map(|(n, _)| n.clone())
        .collect();
    if axes.is_empty() {
        out.push_str("   (No axes found)\n");
    }
    for name in &axes {
        if let Ok(field) = data.field(name) {
            out.push_str(&format!(
                "    {}: ({})\n",
                data.label(name).unwrap_or_else(|_| name.clone()),
                shape_string(field.values.shape())
            ));
        }
    }

    out.push_str("\n Dependents\n==============\n");
    let dependents = data.dependents();
    if dependents.is_empty() {
        out.push_str("   (No dependents found)\n");
    }
    for name in &dependents {
        if let Ok(field) = data.field(name) {
            out.push_str(&format!(
                "    {}: [{}] = ({})\n",
                data.label(name).unwrap_or_else(|_| name.clone()),
                field.axes.join(", "),
                shape_string(field.values.shape())
            ));
        }
    }
    out
}

/// Prints the structure of a container.
pub fn print_structure(data: &DataDictBase) {
    print!("{}", format_structure(data));
    if !data.meta().is_empty() {
        println!("\n Meta data");
        println!("=============");
        for (key, value) in data.meta_items() {
            println!("    {key}: {value}");
        }
    }
}

/// Prints unit, axes, shape and metadata of one field.
pub fn describe_field(data: &DataDictBase, name: &str) -> Result<()> {
    let field = data.field(name)?;

    println!("\n Field Information: {name}");
    println!("===============================");
    println!(" Unit: {}", if field.unit.is_empty() { "(none)" } else { &field.unit });
    if field.is_dependent() {
        println!(" Axes: [{}]", field.axes.join(", "));
    } else {
        println!(" Independent (axis)");
    }
    println!(" Shape: ({})", shape_string(field.values.shape()));
    println!(" Elements: {}", field.values.len());

    if !field.meta.is_empty() {
        println!("\n Meta data:");
        for (key, value) in &field.meta {
            println!("    {key}: {value}");
        }
    }
    Ok(())
}

/// Computes quick statistics (min/mean/max/std) on a field.
pub fn field_summary(data: &DataDictBase, name: &str) -> Result<FieldSummary> {
    let values = data.data_vals(name)?;
    let (min, max) = match nan_min_max(values) {
        Some((lo, hi)) => (Some(lo), Some(hi)),
        None => (None, None),
    };
    Ok(FieldSummary {
        name: name.to_string(),
        total: values.len(),
        valid: values.iter().filter(|v| v.is_finite()).count(),
        min,
        max,
        mean: nan_mean(values),
        std_dev: nan_std(values),
    })
}

fn opt(v: Option<f64>) -> String {
    v.map_or_else(|| "n/a".to_string(), |v| format!("{v:.4}"))
}

impl FieldSummary {
    pub fn print(&self) {
        println!("\n Summary for Field: {}", self.name);
        println!("================================");
        println!("   Valid: {} of {}", self.valid, self.total);
        println!("   Min: {}", opt(self.min));
        println!("   Max: {}", opt(self.max));
        println!("   Mean: {}", opt(self.mean));
        println!("   Std Dev: {}", opt(self.std_dev));
    }
}
