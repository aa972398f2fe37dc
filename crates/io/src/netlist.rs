//! Schematic netlists: LVR output connectors in the power schematics and
//! sense connectors on the telemetry board.

use std::collections::BTreeMap;
use std::path::Path;

use lvmap_recon::loads::{LoadMap, TelemetryMap};
use lvmap_recon::naming::{jp_to_alt, twisted_return};

use crate::csv::{file_name, read_file_as_utf8};
use crate::error::IoError;

// ---------------------------------------------------------------------------
// Power schematics
// ---------------------------------------------------------------------------

/// `pat` occurs in `line`, but not at its first column.
fn found_after_start(line: &str, pat: &str) -> bool {
    line.find(pat).is_some_and(|at| at > 0)
}

/// Net names per connector, in pin order. `None` marks a placeholder pin.
fn connector_nets(file: &str, text: &str) -> Result<BTreeMap<String, Vec<Option<String>>>, IoError> {
    let lines: Vec<&str> = text.lines().collect();
    let mut nets = BTreeMap::new();
    let mut i = 0;
    while i < lines.len() {
        if found_after_start(lines[i], "PCBComponent") {
            let connector = lines[i].split_whitespace().nth(3).ok_or_else(|| IoError::Netlist {
                file: file.to_string(),
                message: format!("line {}: component without a connector name", i + 1),
            })?;
            let mut pins = Vec::new();
            i += 1;
            while i < lines.len() && found_after_start(lines[i], "(") {
                if lines[i].contains("J1") {
                    pins.push(None);
                } else {
                    let tokens: Vec<&str> = lines[i].split_whitespace().collect();
                    match (tokens.get(1), tokens.get(2)) {
                        (Some(pin), Some(net)) => pins.push(Some(format!("LVPin{pin}|{net}"))),
                        _ => {
                            return Err(IoError::Netlist {
                                file: file.to_string(),
                                message: format!("line {}: pin row needs a pin and a net", i + 1),
                            })
                        }
                    }
                }
                i += 1;
            }
            nets.insert(connector.to_string(), pins);
        }
        // The row closing a component block is skipped along with it.
        i += 1;
    }
    Ok(nets)
}

/// Load name as printed on the LVR labels.
fn normalize_load(net: &str) -> String {
    net.replace("_LV_SRC", "")
        .replace("_25_P", "_25")
        .replace("_b_P", "_b")
        .replace("_a_P", "_a")
}

/// LVR channel pin → powered load, for every source net of a pixel tracker
/// or DCB load.
pub fn parse_power(file: &str, text: &str) -> Result<LoadMap, IoError> {
    let mut map = LoadMap::default();
    for (connector, pins) in connector_nets(file, text)? {
        let parts: Vec<&str> = connector.split('_').collect();
        let (Some(out_con), Some(lvr)) = (parts.first(), parts.last()) else {
            continue;
        };
        for net in pins.iter().flatten() {
            let is_source = net.contains("_SRC") || net.ends_with("_P");
            let is_load = net.contains("PT_") || net.contains("DCB_");
            if !(is_source && is_load) {
                continue;
            }
            let Some((pin_part, load)) = net.split_once('|') else {
                continue;
            };
            let Some(pin) = pin_part.chars().last() else {
                continue;
            };
            map.insert(format!("{lvr}_{out_con}_{pin}"), normalize_load(load));
        }
    }
    log::info!("{file}: {} powered channel pins", map.len());
    Ok(map)
}

/// Read and merge several power netlists. Later files win on repeated keys.
pub fn read_power(paths: &[impl AsRef<Path>]) -> Result<LoadMap, IoError> {
    let mut merged = LoadMap::default();
    for path in paths {
        let path = path.as_ref();
        let text = read_file_as_utf8(path)?;
        merged.merge(&parse_power(&file_name(path), &text)?);
    }
    Ok(merged)
}

// ---------------------------------------------------------------------------
// Telemetry board
// ---------------------------------------------------------------------------

/// Row offsets of the source pins below a connector row.
const SOURCE_OFFSETS: [usize; 4] = [1, 4, 3, 7];

fn is_tbb_connector(token: &str) -> bool {
    token
        .strip_prefix('J')
        .and_then(|n| n.parse::<u8>().ok())
        .is_some_and(|n| (1..=21).contains(&n))
}

/// `<flex>_<load>` sensed on one pin row.
fn sensed_load(file: &str, row: &str, line: usize) -> Result<String, IoError> {
    let malformed = || IoError::Netlist {
        file: file.to_string(),
        message: format!("line {line}: unreadable sense net '{}'", row.trim()),
    };
    let net = row.split_whitespace().nth(2).ok_or_else(malformed)?;
    let parts: Vec<&str> = net.split('_').collect();
    let head = parts.first().copied().ok_or_else(malformed)?;

    if head.contains("JP") {
        let flex = jp_to_alt(head, true).ok_or_else(malformed)?;
        let mut load = parts.get(2).ok_or_else(malformed)?.to_string();
        if row.contains("WEST") {
            load.push('W');
        }
        if row.contains("EAST") {
            load.push('E');
        }
        return Ok(format!("{flex}_{load}"));
    }

    let voltage = head.get(2..).ok_or_else(malformed)?;
    if row.contains("2V5") {
        let pair = parts.get(1).ok_or_else(malformed)?;
        let flex = parts.get(3).ok_or_else(malformed)?;
        Ok(format!("{flex}_{voltage}-{pair}"))
    } else {
        let flex = parts.get(2).ok_or_else(malformed)?;
        Ok(format!("{flex}_{voltage}"))
    }
}

/// tBB port and twisted pair → sensed load.
pub fn parse_telemetry(file: &str, text: &str) -> Result<TelemetryMap, IoError> {
    let rows: Vec<&str> = text.lines().collect();
    let mut map = TelemetryMap::default();
    for (ind, row) in rows.iter().enumerate() {
        let tokens: Vec<&str> = row.split_whitespace().collect();
        let con = match tokens.len().checked_sub(2).map(|i| tokens[i]) {
            Some(con) if is_tbb_connector(con) => con,
            _ => continue,
        };
        for src in SOURCE_OFFSETS {
            let pin_row = rows.get(ind + src).ok_or_else(|| IoError::Netlist {
                file: file.to_string(),
                message: format!("connector {con} at line {} is truncated", ind + 1),
            })?;
            if pin_row.contains(&format!("Net{con}")) {
                continue;
            }
            let Some(ret) = twisted_return(src as u8) else {
                continue;
            };
            let load = sensed_load(file, pin_row, ind + src + 1)?;
            map.insert(format!("{con}_{src}-{ret}"), load);
        }
    }
    log::info!("{file}: {} sensed twisted pairs", map.len());
    Ok(map)
}

pub fn read_telemetry(path: &Path) -> Result<TelemetryMap, IoError> {
    let text = read_file_as_utf8(path)?;
    parse_telemetry(&file_name(path), &text)
}
