use std::fs;
use std::path::PathBuf;

use league_roasted::api::{error_detail, parse_pro_directory_json, parse_regenerate_json};
use league_roasted::frames::{FrameDecoder, StreamEvent, parse_frame};
use league_roasted::model::{CardStyle, flatten_pro_directory};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn decodes_analyze_stream_fixture() {
    let raw = read_fixture("analyze_stream.txt");
    let mut decoder = FrameDecoder::new();
    let mut payloads = decoder.push(raw.as_bytes());
    payloads.extend(decoder.finish());
    assert_eq!(payloads.len(), 8);

    let events: Vec<StreamEvent> = payloads
        .iter()
        .map(|p| parse_frame(p).expect("fixture frame should parse"))
        .collect();
    assert!(events[..7].iter().all(|e| !e.is_terminal()));
    assert_eq!(
        events[4],
        StreamEvent::Progress {
            message: Some("Analyzing matches (1/2)...".to_string()),
            rate_limit: Some("Rate limited. Waiting 2s...".to_string()),
        }
    );

    let StreamEvent::Finished(result) = &events[7] else {
        panic!("last frame should carry the result");
    };
    assert_eq!(result.your_rank, "GOLD IV");
    assert_eq!(result.postcards.len(), 2);
    assert_eq!(result.postcards[1].style(), CardStyle::Other("stat".to_string()));
    assert_eq!(result.used_topics, vec!["main_champ_winrate", "games_played"]);
    assert!(!result.is_pro_comparison());
}

#[test]
fn parses_regenerate_fixture() {
    let raw = read_fixture("regenerate_response.json");
    let resp = parse_regenerate_json(&raw).expect("fixture should parse");
    assert_eq!(resp.postcards.len(), 1);
    assert_eq!(resp.postcards[0].title, "KDA REPORT");
    assert_eq!(resp.used_topics, vec!["kda"]);
    assert!(resp.error.is_none());
}

#[test]
fn regenerate_error_body_is_kept() {
    let resp = parse_regenerate_json(r#"{"error": "Roast generation failed"}"#).unwrap();
    assert!(resp.postcards.is_empty());
    assert_eq!(resp.error.as_deref(), Some("Roast generation failed"));
}

#[test]
fn parses_pro_players_fixture() {
    let raw = read_fixture("pro_players.json");
    let directory = parse_pro_directory_json(&raw).expect("fixture should parse");
    let targets = flatten_pro_directory(&directory);
    let ids: Vec<&str> = targets.iter().map(|t| t.player.id.as_str()).collect();
    assert_eq!(ids, vec!["faker", "oner", "caps"]);
    assert_eq!(targets[2].player.riot_id.as_deref(), Some("G2 Caps#EUW"));
    assert_eq!(targets[0].label(), "Faker (LCK T1, Mid)");
}

#[test]
fn null_bodies_are_empty() {
    assert!(parse_pro_directory_json("null").unwrap().is_empty());
    assert_eq!(parse_regenerate_json("").unwrap(), Default::default());
}

#[test]
fn http_error_detail_is_extracted() {
    assert_eq!(
        error_detail(r#"{"detail": "Player has no ranked games this season"}"#).as_deref(),
        Some("Player has no ranked games this season")
    );
    assert!(error_detail("<html>502</html>").is_none());
}

#[test]
fn result_frame_with_numeric_stats_is_terminal() {
    let payload = r#"{"result": {"your_rank": "GOLD IV", "postcards": [
        {"title": "KDA", "content": "c", "stat": 2.31, "type": "stat"},
        {"title": null, "content": "vs", "your_stat": 42, "pro_stat": 7.5, "type": "comparison"}
    ], "used_topics": ["kda"]}}"#;
    let StreamEvent::Finished(result) = parse_frame(payload).expect("valid json frame") else {
        panic!("result frame should be terminal");
    };
    assert_eq!(result.postcards[0].stat.as_deref(), Some("2.31"));
    assert_eq!(result.postcards[1].title, "");
    assert_eq!(result.postcards[1].your_stat.as_deref(), Some("42"));
    assert_eq!(result.postcards[1].pro_stat.as_deref(), Some("7.5"));
}

#[test]
fn regenerate_body_with_numeric_stat_parses() {
    let resp = parse_regenerate_json(
        r#"{"postcards": [{"title": "THE GRIND", "content": "c", "stat": 42}], "used_topics": ["games_played"]}"#,
    )
    .expect("numeric stat should parse");
    assert_eq!(resp.postcards[0].stat.as_deref(), Some("42"));
    assert_eq!(resp.used_topics, vec!["games_played"]);
}
