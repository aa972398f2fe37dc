use crate::model::CableLine;
use crate::naming::{alt_to_jp, flip_mirrors};

/// Re-express one record under the straight/stereo flip hypothesis.
///
/// DCB records are unchanged. Hybrids swap the flex initial (X↔S) and take
/// the backplane connector the flipped flex would plug into. A flex outside
/// the connector table keeps its original connector.
pub fn flip_line(line: &CableLine) -> CableLine {
    let mut out = line.clone();
    if line.is_dcb() {
        return out;
    }
    let flex = match line.flex.chars().next() {
        Some('X') => format!("S{}", &line.flex[1..]),
        Some('S') => format!("X{}", &line.flex[1..]),
        _ => return out,
    };
    match alt_to_jp(&flex, flip_mirrors(line.side, line.layer, line.region)) {
        Some(jp) => out.bp_connector = jp,
        None => log::debug!("flip: no connector for flex {flex} ({})", line.describe()),
    }
    out.flex = flex;
    out
}

pub fn flip_all(lines: &[CableLine]) -> Vec<CableLine> {
    lines.iter().map(flip_line).collect()
}
