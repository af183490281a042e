use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    #[default]
    Na1,
    Euw1,
    Eun1,
    Kr,
    Br1,
    La1,
    La2,
    Oc1,
    Sg2,
    Th2,
    Tw2,
    Vn2,
    Ph2,
    Tr1,
    Ru,
    Jp1,
}

impl Region {
    pub const ALL: [Region; 16] = [
        Region::Na1,
        Region::Euw1,
        Region::Eun1,
        Region::Kr,
        Region::Br1,
        Region::La1,
        Region::La2,
        Region::Oc1,
        Region::Sg2,
        Region::Th2,
        Region::Tw2,
        Region::Vn2,
        Region::Ph2,
        Region::Tr1,
        Region::Ru,
        Region::Jp1,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Region::Na1 => "na1",
            Region::Euw1 => "euw1",
            Region::Eun1 => "eun1",
            Region::Kr => "kr",
            Region::Br1 => "br1",
            Region::La1 => "la1",
            Region::La2 => "la2",
            Region::Oc1 => "oc1",
            Region::Sg2 => "sg2",
            Region::Th2 => "th2",
            Region::Tw2 => "tw2",
            Region::Vn2 => "vn2",
            Region::Ph2 => "ph2",
            Region::Tr1 => "tr1",
            Region::Ru => "ru",
            Region::Jp1 => "jp1",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Region::Na1 => "NA",
            Region::Euw1 => "EUW",
            Region::Eun1 => "EUNE",
            Region::Kr => "KR",
            Region::Br1 => "BR",
            Region::La1 => "LAN",
            Region::La2 => "LAS",
            Region::Oc1 => "OCE",
            Region::Sg2 => "SG",
            Region::Th2 => "TH",
            Region::Tw2 => "TW",
            Region::Vn2 => "VN",
            Region::Ph2 => "PH",
            Region::Tr1 => "TR",
            Region::Ru => "RU",
            Region::Jp1 => "JP",
        }
    }

    /// Accepts either the routing code (`euw1`) or the display label (`EUW`).
    pub fn parse(raw: &str) -> Option<Region> {
        let needle = raw.trim();
        Region::ALL.into_iter().find(|region| {
            region.code().eq_ignore_ascii_case(needle) || region.label().eq_ignore_ascii_case(needle)
        })
    }

    pub fn next(self) -> Region {
        let idx = self.index();
        Region::ALL[(idx + 1) % Region::ALL.len()]
    }

    pub fn prev(self) -> Region {
        let idx = self.index();
        Region::ALL[(idx + Region::ALL.len() - 1) % Region::ALL.len()]
    }

    fn index(self) -> usize {
        Region::ALL
            .iter()
            .position(|r| *r == self)
            .unwrap_or_default()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One user submission. Built fresh per submit and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub player_identity: String,
    pub region: Region,
    pub comparison_target: Option<String>,
    pub force_refresh: bool,
}

impl AnalysisRequest {
    pub fn new(player_identity: impl Into<String>, region: Region) -> Self {
        Self {
            player_identity: player_identity.into(),
            region,
            comparison_target: None,
            force_refresh: false,
        }
    }

    pub fn with_comparison(mut self, target: Option<String>) -> Self {
        self.comparison_target = target.filter(|id| !id.trim().is_empty());
        self
    }

    pub fn forced(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardStyle {
    Default,
    Comparison,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatLine {
    Single(String),
    Pair { yours: String, pro: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Postcard {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub content: String,
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub stat: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub your_stat: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub pro_stat: Option<String>,
}

impl Postcard {
    pub fn style(&self) -> CardStyle {
        match self.kind.as_deref().map(str::trim) {
            None | Some("") | Some("default") => CardStyle::Default,
            Some("comparison") => CardStyle::Comparison,
            Some(other) => CardStyle::Other(other.to_string()),
        }
    }

    pub fn stat_line(&self) -> Option<StatLine> {
        if self.style() == CardStyle::Comparison {
            return Some(StatLine::Pair {
                yours: non_empty_or_dash(self.your_stat.as_deref()),
                pro: non_empty_or_dash(self.pro_stat.as_deref()),
            });
        }
        self.stat
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|s| StatLine::Single(s.to_string()))
    }
}

/// Model-written card fields may hold any JSON scalar. Scalars keep their JSON
/// text; `null` reads as absent.
fn scalar_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    scalar_text(deserializer).map(Option::unwrap_or_default)
}

fn non_empty_or_dash(value: Option<&str>) -> String {
    value
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("-")
        .to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProInfo {
    #[serde(default, deserialize_with = "text_or_empty")]
    pub name: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub team: String,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub role: String,
    #[serde(default, deserialize_with = "scalar_text")]
    pub rank: Option<String>,
}

pub const MODE_PRO_COMPARISON: &str = "pro_comparison";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, deserialize_with = "text_or_empty")]
    pub your_rank: String,
    #[serde(default)]
    pub your_stats: Value,
    #[serde(default)]
    pub achievements: Vec<Value>,
    #[serde(default)]
    pub postcards: Vec<Postcard>,
    #[serde(default)]
    pub used_topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pro_info: Option<ProInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pro_stats: Option<Value>,
}

impl ResultPayload {
    /// Result shown after a regenerate round trip: cached facts, fresh postcards.
    pub fn from_cache(entry: &CacheEntry, postcards: Vec<Postcard>) -> Self {
        Self {
            status: None,
            mode: entry.mode.clone(),
            your_rank: entry.your_rank.clone(),
            your_stats: entry.your_stats.clone(),
            achievements: entry.achievements.clone(),
            postcards,
            used_topics: entry.used_topics.clone(),
            pro_info: None,
            pro_stats: None,
        }
    }

    pub fn is_pro_comparison(&self) -> bool {
        self.mode.as_deref() == Some(MODE_PRO_COMPARISON)
    }

    pub fn headline(&self) -> String {
        match (&self.pro_info, self.is_pro_comparison()) {
            (Some(pro), true) => format!("You vs {}", pro.name),
            (None, true) => "You vs a pro".to_string(),
            _ => "Your 2025 Recap".to_string(),
        }
    }
}

/// The minimal facts kept per player so roasts can be regenerated without
/// recomputing stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(default)]
    pub your_stats: Value,
    #[serde(default)]
    pub your_rank: String,
    #[serde(default)]
    pub achievements: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default)]
    pub used_topics: Vec<String>,
}

impl CacheEntry {
    pub fn from_result(result: &ResultPayload) -> Self {
        Self {
            your_stats: result.your_stats.clone(),
            your_rank: result.your_rank.clone(),
            achievements: result.achievements.clone(),
            mode: result.mode.clone(),
            used_topics: result.used_topics.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastSearch {
    #[serde(rename = "summonerName")]
    pub summoner_name: String,
    pub region: Region,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeRequestBody<'a> {
    pub summoner_name: &'a str,
    pub region: Region,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pro_player_id: Option<&'a str>,
}

impl<'a> AnalyzeRequestBody<'a> {
    pub fn from_request(request: &'a AnalysisRequest) -> Self {
        Self {
            summoner_name: &request.player_identity,
            region: request.region,
            pro_player_id: request.comparison_target.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RegenerateRequest<'a> {
    pub your_stats: &'a Value,
    pub your_rank: &'a str,
    pub achievements: &'a [Value],
    pub used_topics: &'a [String],
}

impl<'a> RegenerateRequest<'a> {
    pub fn from_entry(entry: &'a CacheEntry) -> Self {
        Self {
            your_stats: &entry.your_stats,
            your_rank: &entry.your_rank,
            achievements: &entry.achievements,
            used_topics: &entry.used_topics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RegenerateResponse {
    #[serde(default)]
    pub postcards: Vec<Postcard>,
    #[serde(default)]
    pub used_topics: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProPlayer {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub riot_id: Option<String>,
}

/// league -> team -> players, as served by `GET /pro-players`.
pub type ProDirectory = BTreeMap<String, BTreeMap<String, Vec<ProPlayer>>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProTarget {
    pub league: String,
    pub team: String,
    pub player: ProPlayer,
}

impl ProTarget {
    pub fn label(&self) -> String {
        format!(
            "{} ({} {}, {})",
            self.player.name, self.league, self.team, self.player.role
        )
    }
}

pub fn flatten_pro_directory(directory: &ProDirectory) -> Vec<ProTarget> {
    let mut out = Vec::new();
    for (league, teams) in directory {
        for (team, players) in teams {
            for player in players {
                out.push(ProTarget {
                    league: league.clone(),
                    team: team.clone(),
                    player: player.clone(),
                });
            }
        }
    }
    out
}
