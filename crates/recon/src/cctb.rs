//! Cable-test-board (CCTB) worksheets: one power and one sense table per
//! side, layer and region, laid out for filling in at the test bench.

use crate::model::{CableLine, Layer, Orientation, Region, SenseLine, Side};
use crate::naming::{layer_for, lvr_pins, orientation_of, position_number, return_pin};
use crate::report::ReportTable;

pub const POWER_HEADER: [&str; 16] = [
    "PPP Label",
    "Pos. Src",
    "Pos. Ret",
    "Backplane",
    "BP Con.",
    "Flex Name",
    "4ASIC-group/DCB power",
    "SBC Label",
    "LVR Logical ID",
    "LVR ch.",
    "M/S/A",
    "Connector on CCTB",
    "Measured Voltage",
    "Measured Current",
    "Result",
    "Comments",
];

pub const SENSE_HEADER: [&str; 12] = [
    "PPP Label",
    "PPP Twisted Pair",
    "Splitter Input",
    "Splitter Output",
    "LVR Con.",
    "LVR Number",
    "LVR ch.",
    "M/S/A",
    "Connector on CCTB",
    "Measured Voltage",
    "Result",
    "Comments",
];

/// Blank cells left for the bench operator.
const BENCH_COLUMNS: usize = 5;

/// Every (side, layer, region) in worksheet order.
fn worksheets() -> impl Iterator<Item = (Side, Layer, Region)> {
    Side::ALL.into_iter().flat_map(|side| {
        Layer::ALL
            .into_iter()
            .flat_map(move |layer| Region::ALL.into_iter().map(move |region| (side, layer, region)))
    })
}

fn table_name(side: Side, layer: Layer, region: Region, kind: &str) -> String {
    let orientation = orientation_of(side, layer, region);
    format!("{side}_{layer}_{region}_{orientation}_{kind}_cctb")
}

fn blanks(row: &mut Vec<String>) {
    row.extend(std::iter::repeat(String::new()).take(BENCH_COLUMNS));
}

fn position_rank(cell: &str) -> (bool, u32) {
    match position_number(cell) {
        Some(n) => (false, n),
        None => (true, 0),
    }
}

// ---------------------------------------------------------------------------
// Power
// ---------------------------------------------------------------------------

fn power_row(line: &CableLine) -> Vec<String> {
    let (pins, lvr, channels) = match &line.wiring {
        Some(w) => (lvr_pins(w.lvr, &w.channels), w.lvr.to_string(), w.channel_text()),
        None => ("-1".to_string(), "-1".to_string(), "-1".to_string()),
    };
    let mut row = vec![
        line.ppp.clone(),
        line.pin.to_string(),
        return_pin(line.pin).to_string(),
        line.backplane.clone(),
        line.bp_connector.clone(),
        line.flex.clone(),
        line.load_group.clone(),
        pins,
        lvr,
        channels,
        line.role.to_string(),
    ];
    blanks(&mut row);
    row
}

/// Power worksheet for the module orientation serving (side, layer, region).
///
/// Worksheets are built from C-side layouts: a record belongs if its layer is
/// the C-side layer holding `region` modules of this orientation.
pub fn power_table(side: Side, layer: Layer, region: Region, lines: &[&CableLine]) -> ReportTable {
    let orientation: Orientation = orientation_of(side, layer, region);
    let c_layer = layer_for(region, orientation);
    let mut rows: Vec<Vec<String>> = lines
        .iter()
        .filter(|l| l.layer == c_layer && l.region == region)
        .map(|l| power_row(l))
        .collect();

    rows.sort_by_key(|r| r[1].parse::<u8>().unwrap_or(u8::MAX));
    rows.sort_by_key(|r| position_rank(&r[0]));
    rows.sort_by_key(|r| r[5].chars().next().map(|c| c.to_ascii_lowercase()));
    rows.sort_by(|a, b| b[3].cmp(&a[3]));

    ReportTable::with_data(table_name(side, layer, region, "LVpower"), &POWER_HEADER, rows)
}

/// All eight power worksheets over the matched nominal records.
pub fn power_tables(matched: &[&CableLine]) -> Vec<ReportTable> {
    worksheets()
        .map(|(side, layer, region)| power_table(side, layer, region, matched))
        .collect()
}

// ---------------------------------------------------------------------------
// Sense
// ---------------------------------------------------------------------------

fn sense_row(line: &SenseLine, orientation: Orientation) -> Vec<String> {
    let mut row = vec![
        line.coupler(orientation).to_string(),
        format!(" {}", line.ingress_pair),
        line.input_label(),
        line.output_label(),
        line.connector.to_string(),
        line.lvr.to_string(),
        line.channel().to_string(),
    ];
    blanks(&mut row);
    row
}

/// Sense worksheet for (side, layer, region). LVRs up to `mag_lvr_max` feed
/// magnet-side modules, the rest the interaction-point side.
pub fn sense_table(
    side: Side,
    layer: Layer,
    region: Region,
    lines: &[SenseLine],
    mag_lvr_max: u32,
) -> ReportTable {
    let orientation = orientation_of(side, layer, region);
    let mut rows: Vec<Vec<String>> = lines
        .iter()
        .filter(|l| (l.lvr <= mag_lvr_max) == (region == Region::Mag))
        .map(|l| sense_row(l, orientation))
        .collect();

    rows.sort_by(|a, b| a[1].cmp(&b[1]));
    rows.sort_by_key(|r| position_rank(&r[0]));
    rows.sort_by_key(|r| r[0].chars().next());

    ReportTable::with_data(table_name(side, layer, region, "LVsense"), &SENSE_HEADER, rows)
}

pub fn sense_tables(lines: &[SenseLine], mag_lvr_max: u32) -> Vec<ReportTable> {
    worksheets()
        .map(|(side, layer, region)| sense_table(side, layer, region, lines, mag_lvr_max))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Length, Role, Wiring};
    use crate::topology::{SenseConnector, SplitterKind, TwistedPair};

    fn line(layer: Layer, region: Region, bp: &str, flex: &str, ppp: &str, pin: u8) -> CableLine {
        CableLine {
            side: Side::C,
            layer,
            region,
            backplane: bp.into(),
            bp_connector: "JP0".into(),
            secondary_connector: "J1".into(),
            flex: flex.into(),
            load_group: "P1".into(),
            role: Role::Alone,
            ppp: ppp.into(),
            pin,
            wiring: Some(Wiring {
                lvr: 9,
                channels: vec![7, 3],
                length_c: Length::parse("5"),
                length_a: Length::parse("1"),
                ppp_label: String::new(),
                lvr_labels: Vec::new(),
            }),
        }
    }

    fn sense(lvr: u32, coupler: &str, pair: TwistedPair) -> SenseLine {
        SenseLine {
            crate_no: "1".into(),
            slot: "1".into(),
            lvr,
            connector: SenseConnector::J16,
            pair: TwistedPair::P45,
            splitter: "S2a".into(),
            kind: SplitterKind::Type2,
            egress_port: "b".into(),
            ingress_port: Some(3),
            ingress_pair: pair,
            hops: 1,
            sense_label: "alpha_X0M_P1".into(),
            ppp_true: coupler.into(),
            ppp_mirror: format!("m{coupler}"),
            tbb_port: "J1".into(),
        }
    }

    #[test]
    fn eight_worksheets_with_orientation_names() {
        let tables = power_tables(&[]);
        assert_eq!(tables.len(), 8);
        assert_eq!(tables[0].name, "C_top_ip_Mirror_LVpower_cctb");
        assert_eq!(tables[1].name, "C_top_mag_True_LVpower_cctb");
        assert_eq!(tables[7].name, "A_bot_mag_True_LVpower_cctb");
    }

    #[test]
    fn power_rows_filter_and_order() {
        let a = line(Layer::Top, Region::Mag, "alpha", "X0M", "P3", 2);
        let b = line(Layer::Top, Region::Mag, "gamma", "S0S", "P1", 1);
        let c = line(Layer::Top, Region::Mag, "alpha", "s1M", "P2", 1);
        let other = line(Layer::Bot, Region::Mag, "gamma", "X0M", "P1", 1);
        let table = power_table(Side::C, Layer::Top, Region::Mag, &[&a, &b, &c, &other]);

        let rows: Vec<&[String]> = table.data_rows().collect();
        assert_eq!(rows.len(), 3);
        // backplane descending first, then flex initial ignoring case
        assert_eq!(rows[0][3], "gamma");
        assert_eq!(rows[1][0], "P2");
        assert_eq!(rows[2][0], "P3");
        assert_eq!(rows[2][7], "9 - J13 - 4/3  Y  9 - J12 - 4/3");
        assert_eq!(rows[2][9], "7 Y 3");
        assert_eq!(rows[0].len(), POWER_HEADER.len());
    }

    #[test]
    fn a_side_worksheet_reads_c_side_layer() {
        // A top mag is Mirror; Mirror magnet modules sit on the C bottom layer
        let bot = line(Layer::Bot, Region::Mag, "beta", "X0M", "P4", 1);
        let table = power_table(Side::A, Layer::Top, Region::Mag, &[&bot]);
        assert_eq!(table.data_len(), 1);
    }

    #[test]
    fn sense_rows_split_on_lvr_and_sort_by_coupler() {
        let lines = vec![
            sense(40, "P3", TwistedPair::P12),
            sense(12, "P10", TwistedPair::P12),
            sense(12, "P2", TwistedPair::P78),
            sense(12, "P2", TwistedPair::P12),
        ];
        let mag = sense_table(Side::C, Layer::Top, Region::Mag, &lines, 36);
        let rows: Vec<&[String]> = mag.data_rows().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][0], "P2");
        assert_eq!(rows[0][1], " 1-2");
        assert_eq!(rows[1][1], " 7-8");
        assert_eq!(rows[2][0], "P10");
        assert_eq!(rows[0][2], "S2a_3");
        assert_eq!(rows[0][3], "Type 2 - OUT b");
        assert_eq!(rows[0][6], "6");

        let ip = sense_table(Side::C, Layer::Top, Region::Ip, &lines, 36);
        let rows: Vec<&[String]> = ip.data_rows().collect();
        assert_eq!(rows.len(), 1);
        // C top ip is Mirror
        assert_eq!(rows[0][0], "mP3");
    }
}
