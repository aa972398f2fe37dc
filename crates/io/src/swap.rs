use lvmap_recon::naming::normalize_position;
use lvmap_recon::swap::SwapTable;

use crate::error::IoError;
use crate::table::Table;

/// Planned connector moves: `Positronic` → `Swap to`, each a position number
/// or `P<n>`. An old position may appear once.
pub fn parse_swap_table(table: &Table) -> Result<SwapTable, IoError> {
    let [old_col, new_col] = table.columns(["Positronic", "Swap to"])?;
    let mut swaps = SwapTable::new();
    for r in table.records() {
        let position = |col: usize| {
            normalize_position(r.get(col)).ok_or_else(|| {
                IoError::malformed(
                    &table.source,
                    r.line,
                    format!("invalid position '{}'", r.get(col)),
                )
            })
        };
        let old = position(old_col)?;
        let new = position(new_col)?;
        if let Some(previous) = swaps.insert(old.clone(), new) {
            return Err(IoError::malformed(
                &table.source,
                r.line,
                format!("{old} already moves to {previous}"),
            ));
        }
    }
    log::info!("{}: {} planned moves", table.source, swaps.len());
    Ok(swaps)
}
