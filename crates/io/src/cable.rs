//! Cable mapping tables: the nominal (surface) mapping, the as-installed
//! (cavern) mapping and cable-test records.

use lvmap_recon::model::{CableLine, Length, Wiring};
use lvmap_recon::naming::normalize_position;
use lvmap_recon::FieldError;

use crate::error::IoError;
use crate::table::{parse_int, Record, Table};

pub const IDENTITY_COLUMNS: [&str; 11] = [
    "Side",
    "Top/Bot",
    "Mag/IP",
    "BP",
    "BP Connector",
    "iBB/P2B2 Connector",
    "SBC FLEX NAME",
    "4ASIC-group (hybrid)/DCB power",
    "M/S/A",
    "PPP Positronic",
    "Positronic Src",
];

pub const WIRING_COLUMNS: [&str; 8] = [
    "C L (m)",
    "A L (m)",
    "LVR ID",
    "LVR Channel",
    "PPP Connector - Pin",
    "LVR ID - Connector - Pin",
    "SBC section",
    "LVR Name",
];

/// Suffixes stripped from `LVR Name` before it goes on a label.
const NAME_SUFFIXES: [&str; 3] = ["_LV_SRC/RET", "_P/N_S", "_P/N"];

/// Records without LVR wiring (surface mapping, cable test).
pub fn parse_identity_table(table: &Table) -> Result<Vec<CableLine>, IoError> {
    let cols = table.columns(IDENTITY_COLUMNS)?;
    let lines = table
        .records()
        .map(|r| identity(table, &r, &cols))
        .collect::<Result<Vec<_>, _>>()?;
    log::info!("{}: {} cable records", table.source, lines.len());
    Ok(lines)
}

/// Records carrying LVR wiring, lengths and printed labels. Rows with an
/// empty `LVR ID` are unwired.
pub fn parse_cavern_table(table: &Table) -> Result<Vec<CableLine>, IoError> {
    let cols = table.columns(IDENTITY_COLUMNS)?;
    let wiring_cols = table.columns(WIRING_COLUMNS)?;
    let mut lines = Vec::with_capacity(table.rows.len());
    for r in table.records() {
        let mut line = identity(table, &r, &cols)?;
        line.wiring = wiring(table, &r, &wiring_cols)?;
        lines.push(line);
    }
    let splices = lines.iter().filter(|l| l.is_splice()).count();
    log::info!(
        "{}: {} cavern records ({splices} splice stubs)",
        table.source,
        lines.len()
    );
    Ok(lines)
}

fn field<T>(table: &Table, r: &Record<'_>, parsed: Result<T, FieldError>) -> Result<T, IoError> {
    parsed.map_err(|e| IoError::malformed(&table.source, r.line, e.to_string()))
}

fn identity(table: &Table, r: &Record<'_>, cols: &[usize; 11]) -> Result<CableLine, IoError> {
    let [side, layer, region, bp, bp_con, secondary, flex, load, role, ppp, src] = *cols;

    let position = r.get(ppp);
    let ppp = normalize_position(position).ok_or_else(|| {
        IoError::malformed(&table.source, r.line, format!("invalid PPP position '{position}'"))
    })?;
    let pin = r
        .get(src)
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .ok_or_else(|| {
            IoError::malformed(
                &table.source,
                r.line,
                format!("invalid source pin '{}'", r.get(src)),
            )
        })?;
    let flex = match r.get(flex) {
        "" => "n/a".to_string(),
        f => f.to_string(),
    };

    Ok(CableLine {
        side: field(table, r, r.get(side).parse())?,
        layer: field(table, r, r.get(layer).parse())?,
        region: field(table, r, r.get(region).parse())?,
        backplane: r.get(bp).to_string(),
        bp_connector: r.get(bp_con).to_string(),
        secondary_connector: r.get(secondary).to_string(),
        flex,
        load_group: r.get(load).to_string(),
        role: field(table, r, r.get(role).parse())?,
        ppp,
        pin: pin as u8,
        wiring: None,
    })
}

fn wiring(table: &Table, r: &Record<'_>, cols: &[usize; 8]) -> Result<Option<Wiring>, IoError> {
    let [len_c, len_a, lvr, channel, ppp_pin, lvr_pin, sbc, name] = *cols;
    if r.get(lvr).is_empty() {
        return Ok(None);
    }
    let bad = |what: &str, value: &str| {
        IoError::malformed(&table.source, r.line, format!("invalid {what} '{value}'"))
    };
    let lvr_id: u32 = parse_int(r.get(lvr)).ok_or_else(|| bad("LVR ID", r.get(lvr)))?;
    let ch: u8 = parse_int(r.get(channel)).ok_or_else(|| bad("LVR channel", r.get(channel)))?;

    let name = label_name(r.get(name));
    Ok(Some(Wiring {
        lvr: lvr_id,
        channels: vec![ch],
        length_c: Length::parse(r.get(len_c)),
        length_a: Length::parse(r.get(len_a)),
        ppp_label: format!("{} | {name}", r.get(ppp_pin)),
        lvr_labels: vec![format!(
            "{} {} | {name}",
            lvr_connector_pin(r.get(lvr_pin)),
            r.get(sbc)
        )],
    }))
}

fn label_name(raw: &str) -> String {
    NAME_SUFFIXES
        .iter()
        .fold(raw.trim().to_string(), |name, suffix| name.replace(suffix, ""))
}

/// `12-J12-8/7` or `2.5V: 12 - J12 - 8/7` to `12 - J12 - 8/7`.
fn lvr_connector_pin(raw: &str) -> String {
    raw.replace(' ', "").replace("2.5V:", "").replace('-', " - ")
}
