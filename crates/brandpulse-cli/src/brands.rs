//! `brands` command handler.

use std::io::Write;
use std::path::Path;

use brandpulse_core::{load_brands, BrandsFile};

/// Load, validate and list the tracked brands.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed, or fails validation.
pub(crate) fn run_brands(path: &Path) -> anyhow::Result<()> {
    let brands = load_brands(path)?;
    write_brands(&mut std::io::stdout().lock(), &brands)?;
    println!("{} brands tracked in {}", brands.brands.len(), path.display());
    Ok(())
}

pub(crate) fn write_brands(out: &mut dyn Write, brands: &BrandsFile) -> std::io::Result<()> {
    writeln!(out, "{:<20}{:<15}ALIASES", "BRAND", "CATEGORY")?;
    for brand in &brands.brands {
        let aliases = if brand.aliases.is_empty() {
            "-".to_string()
        } else {
            brand.aliases.join(", ")
        };
        writeln!(
            out,
            "{:<20}{:<15}{}",
            brand.name,
            brand.category.to_string(),
            aliases
        )?;
    }
    Ok(())
}
