//! Label-check text files: the printed LVR labels for one side, layer and
//! region, grouped under `LVR <id>` headings.

use std::path::Path;

use lvmap_recon::compare::{LabelRecord, LabelSheet};
use lvmap_recon::config::CompareConfig;
use lvmap_recon::model::Length;
use lvmap_recon::naming::normalize_position;

use crate::csv::{file_name, read_file_as_utf8};
use crate::error::IoError;

pub fn parse_label_records(file: &str, text: &str) -> Result<Vec<LabelRecord>, IoError> {
    let mut lvr: Option<u32> = None;
    let mut records = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let row = i + 1;
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if line.contains("LVR ") {
            let id = tokens.get(1).and_then(|t| t.parse().ok()).ok_or_else(|| {
                IoError::malformed(file, row, format!("unreadable LVR heading '{}'", line.trim()))
            })?;
            lvr = Some(id);
        }
        if !(line.contains("J12") || line.contains("J13")) {
            continue;
        }
        let lvr = lvr.ok_or_else(|| IoError::malformed(file, row, "label line before any LVR heading"))?;
        if tokens.len() < 7 {
            return Err(IoError::malformed(
                file,
                row,
                format!("expected 7 fields, found {}", tokens.len()),
            ));
        }
        let bad = |what: &str, value: &str| IoError::malformed(file, row, format!("invalid {what} '{value}'"));
        let channel = tokens[0].parse().map_err(|_| bad("channel", tokens[0]))?;
        let ppp = normalize_position(tokens[2]).ok_or_else(|| bad("PPP position", tokens[2]))?;
        let pin = tokens[3]
            .chars()
            .next()
            .and_then(|c| c.to_digit(10))
            .ok_or_else(|| bad("PPP pin", tokens[3]))?;
        records.push(LabelRecord {
            lvr,
            channel,
            lvr_pin: tokens[1].to_string(),
            ppp,
            pin: pin as u8,
            colour: tokens[4].to_string(),
            sbc: tokens[5].to_string(),
            length_c: Length::parse(tokens[6]),
        });
    }
    log::info!("{file}: {} label lines", records.len());
    Ok(records)
}

pub fn read_label_records(path: &Path) -> Result<Vec<LabelRecord>, IoError> {
    let text = read_file_as_utf8(path)?;
    parse_label_records(&file_name(path), &text)
}

/// Place records read for a `label_check` compare entry at its location.
pub fn label_sheet(entry: &CompareConfig, records: Vec<LabelRecord>) -> Result<LabelSheet, IoError> {
    let (side, layer, region) = entry.location().ok_or_else(|| IoError::Unlocated {
        file: entry.file.clone(),
    })?;
    Ok(LabelSheet {
        side,
        layer,
        region,
        records,
    })
}
