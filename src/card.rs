// Parser for the FC-card comment text that carries KDE tally options, e.g.
//
//   dagmc type=kde_track hx=0.1 hy=0.1 hz=0.2 kernel=biweight -dagmc
use tracing::warn;

use crate::config::TallyOptions;
use crate::error::{KdeError, Result};

const START_TOKEN: &str = "dagmc";
const STOP_TOKEN: &str = "-dagmc";

/// Parse the key/value pairs of an FC card.
///
/// `=` is treated as whitespace. Tokens before `dagmc` are skipped and
/// parsing stops at `-dagmc`. A key without a value is dropped with a warning.
pub fn parse_fc_card(content: &str, tally_id: u32) -> Result<TallyOptions> {
    let normalized = content.replace('=', " ");
    let mut tokens = normalized.split_whitespace();

    if !tokens.by_ref().any(|token| token == START_TOKEN) {
        return Err(KdeError::Card {
            tally_id,
            message: format!("missing '{}' keyword", START_TOKEN),
        });
    }

    let mut options = TallyOptions::new();
    let mut pending_key: Option<&str> = None;

    for token in tokens {
        if token == STOP_TOKEN {
            break;
        }
        match pending_key.take() {
            None => pending_key = Some(token),
            Some(key) => options.insert(key, token),
        }
    }

    if let Some(key) = pending_key {
        warn!(tally_id, key, "FC card has unused key");
    }

    Ok(options)
}

/// Parse an FC card and split off its `type` keyword.
///
/// With several `type` keys the first one is used and a warning is issued.
pub fn parse_tally_card(content: &str, tally_id: u32) -> Result<(Option<String>, TallyOptions)> {
    let mut options = parse_fc_card(content, tally_id)?;
    let types = options.remove_all("type");
    if types.len() > 1 {
        warn!(tally_id, using = %types[0], "FC card has multiple 'type' keywords");
    }
    Ok((types.into_iter().next(), options))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic_card() {
        let options = parse_fc_card("flux dagmc hx=0.5 hy = 0.25 kernel biweight", 4).unwrap();
        let pairs: Vec<(&str, &str)> = options.iter().collect();
        assert_eq!(pairs, vec![("hx", "0.5"), ("hy", "0.25"), ("kernel", "biweight")]);
    }

    #[test]
    fn test_stops_at_end_token() {
        let options = parse_fc_card("dagmc hx=1 -dagmc hy=2", 4).unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options.get("hy"), None);
    }

    #[test]
    fn test_missing_start_token_is_error() {
        let err = parse_fc_card("hx=1 hy=2", 12).unwrap_err();
        assert!(matches!(err, KdeError::Card { tally_id: 12, .. }));
    }

    #[test]
    fn test_dangling_key_dropped() {
        let options = parse_fc_card("dagmc hx=1 hy", 4).unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options.get("hx"), Some("1"));
    }

    #[test]
    fn test_type_split_off() {
        let (kind, options) =
            parse_tally_card("dagmc type=kde_subtrack subtracks=4 type=kde_coll seed=9", 2).unwrap();
        assert_eq!(kind.as_deref(), Some("kde_subtrack"));
        assert_eq!(options.count("type"), 0);
        assert_eq!(options.get("subtracks"), Some("4"));
        assert_eq!(options.get("seed"), Some("9"));
    }

    #[test]
    fn test_no_type() {
        let (kind, options) = parse_tally_card("dagmc", 2).unwrap();
        assert!(kind.is_none());
        assert!(options.is_empty());
    }
}
