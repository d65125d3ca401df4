//! Parses the broker's pipe-delimited realtime quote frame into a
//! `RealtimeTick`. Real-world frames also carry an encrypted header byte
//! and a non-tick heartbeat variant; both are filtered out before this
//! function is reached by the websocket loop.

use crate::domain::ticker_state::RealtimeTick;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Field layout (zero-indexed, pipe-delimited): 0=tr_id, 1=symbol,
/// 2=current_price, 3=change_rate, 4=open, 5=high, 6=low, 7=cumulative_volume.
pub fn parse_tick_frame(frame: &str) -> Option<RealtimeTick> {
    let fields: Vec<&str> = frame.split('|').collect();
    if fields.len() < 8 {
        return None;
    }

    let symbol = fields[1].to_string();
    let price = Decimal::from_str(fields[2]).ok()?;
    let change_rate = fields[3].parse::<f64>().unwrap_or(0.0);
    let open = Decimal::from_str(fields[4]).unwrap_or(Decimal::ZERO);
    let high = Decimal::from_str(fields[5]).unwrap_or(Decimal::ZERO);
    let low = Decimal::from_str(fields[6]).unwrap_or(Decimal::ZERO);
    let cumulative_volume = fields[7].parse::<i64>().unwrap_or(0);

    Some(RealtimeTick {
        symbol,
        price,
        open,
        high,
        low,
        change_rate,
        cumulative_volume,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_well_formed_tick_frame() {
        let frame = "H0STCNT0|005930|71000|-1.2|71200|71500|70800|1234567";
        let tick = parse_tick_frame(frame).unwrap();
        assert_eq!(tick.symbol, "005930");
        assert_eq!(tick.price, Decimal::from(71000));
        assert_eq!(tick.cumulative_volume, 1234567);
    }

    #[test]
    fn rejects_short_frames() {
        assert!(parse_tick_frame("H0STCNT0|005930").is_none());
    }
}
