use lvmap_recon::trace::{LayoutRow, SenseLayout};

use crate::error::IoError;
use crate::table::Table;

pub const LAYOUT_COLUMNS: [&str; 10] = [
    "LVR Port",
    "Crate Number (of LVR)",
    "Crate Slot Number",
    "Splitter/Cable Label",
    "Splitter/Cable Output",
    "Splitter/Cable Input",
    "Sense Line Label",
    "True PPP RJ45 Coupler",
    "Mirror PPP RJ45 Coupler",
    "tBB Port",
];

/// The underground sense layout table.
pub fn parse_layout(table: &Table) -> Result<SenseLayout, IoError> {
    let [port, crate_no, slot, label, output, input, sense, ppp_true, ppp_mirror, tbb] =
        table.columns(LAYOUT_COLUMNS)?;
    let rows: Vec<LayoutRow> = table
        .records()
        .map(|r| LayoutRow {
            lvr_port: r.get(port).to_string(),
            crate_no: r.get(crate_no).to_string(),
            slot: r.get(slot).to_string(),
            label: r.get(label).to_string(),
            output: r.get(output).to_string(),
            input: r.get(input).to_string(),
            sense_label: r.get(sense).to_string(),
            ppp_true: r.get(ppp_true).to_string(),
            ppp_mirror: r.get(ppp_mirror).to_string(),
            tbb_port: r.get(tbb).to_string(),
        })
        .collect();
    log::info!("{}: {} layout rows", table.source, rows.len());
    Ok(SenseLayout::new(rows))
}

#[cfg(test)]
mod tests {
    use lvmap_recon::topology::SenseConnector;

    use super::*;
    use crate::csv::table_from_str;

    #[test]
    fn rows_index_by_lvr_port() {
        let text = format!(
            "{}\n14_J16,2,5,S2a,a,,,,,\n,,,C7,,S2a_2,alpha_X0M_P1,P1,P21,J4\n",
            LAYOUT_COLUMNS.join(",")
        );
        let layout = parse_layout(&table_from_str("layout.csv", &text).unwrap()).unwrap();
        assert_eq!(layout.len(), 2);
        let start = layout.lvr_row(14, SenseConnector::J16).unwrap();
        assert_eq!(start.label, "S2a");
        assert_eq!(start.crate_no, "2");
        assert!(layout.lvr_row(14, SenseConnector::J10).is_none());
    }

    #[test]
    fn missing_column_rejected() {
        let t = table_from_str("layout.csv", "LVR Port,tBB Port\n1_J10,J1\n").unwrap();
        assert!(matches!(parse_layout(&t), Err(IoError::MissingColumn { .. })));
    }
}
