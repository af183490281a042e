use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde_json::{Value, json};

use crate::api::{RoastBackend, StreamBody};
use crate::model::{
    AnalyzeRequestBody, Postcard, ProDirectory, ProPlayer, RegenerateRequest, RegenerateResponse,
};

const FAKE_MATCHES: usize = 20;
const ROASTS_PER_CALL: usize = 5;

struct Roast {
    topic: &'static str,
    title: &'static str,
    content: &'static str,
}

const ROAST_POOL: &[Roast] = &[
    Roast {
        topic: "main_champ_winrate",
        title: "ONE TRICK, NO TREAT",
        content: "{wr}% winrate on your main. They said you couldn't do it. They were right.",
    },
    Roast {
        topic: "loss_streak",
        title: "COMMITMENT ISSUES",
        content: "Lost {loss} games in a row and queued up again. That's not tilt, that's dedication.",
    },
    Roast {
        topic: "games_played",
        title: "THE GRIND",
        content: "{games} games in {rank}. Rome wasn't built in a day, but it didn't take this long either.",
    },
    Roast {
        topic: "deaths",
        title: "CHARITY BUFFET",
        content: "{deaths} deaths per game. You're not feeding, you're catering.",
    },
    Roast {
        topic: "kda",
        title: "KDA REPORT",
        content: "A {kda} KDA. At least you're consistently inconsistent.",
    },
    Roast {
        topic: "win_streak",
        title: "PEAK PERFORMANCE",
        content: "Best win streak: {win}. Enjoy it, it's in the museum now.",
    },
    Roast {
        topic: "champion_pool",
        title: "ROLE PLAYER",
        content: "Played a dozen champions this year. Turns out the problem follows you around.",
    },
    Roast {
        topic: "rank",
        title: "RANKED RECAP",
        content: "{rank}. Not a rank, a lifestyle.",
    },
];

/// Offline stand-in for the analysis service. Replays the service's progress
/// sequence and serves roasts from a canned pool, honouring the topics the
/// caller asks it to avoid.
pub struct FakeBackend {
    frame_delay: Duration,
    rng: Mutex<StdRng>,
}

impl FakeBackend {
    pub fn new(frame_delay: Duration) -> Self {
        Self {
            frame_delay,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            frame_delay: Duration::ZERO,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn pick_roasts(&self, stats: &Value, rank: &str, avoid: &[String]) -> (Vec<Postcard>, Vec<String>) {
        let mut rng = self.rng.lock().expect("fake backend rng lock poisoned");
        let mut fresh: Vec<&Roast> = ROAST_POOL
            .iter()
            .filter(|r| !avoid.iter().any(|t| t == r.topic))
            .collect();
        if fresh.len() < ROASTS_PER_CALL {
            // Pool exhausted, start repeating.
            fresh = ROAST_POOL.iter().collect();
        }
        fresh.shuffle(&mut *rng);
        fresh.truncate(ROASTS_PER_CALL);

        let postcards = fresh
            .iter()
            .map(|r| Postcard {
                kind: Some("roast".to_string()),
                title: r.title.to_string(),
                content: fill_template(r.content, stats, rank),
                stat: None,
                your_stat: None,
                pro_stat: None,
            })
            .collect();
        let topics = fresh.iter().map(|r| r.topic.to_string()).collect();
        (postcards, topics)
    }

    fn fake_stats(&self) -> Value {
        let mut rng = self.rng.lock().expect("fake backend rng lock poisoned");
        let win_rate: f64 = rng.gen_range(38.0..56.0);
        json!({
            "total_games": FAKE_MATCHES,
            "win_rate": (win_rate * 10.0).round() / 10.0,
            "kda": (rng.gen_range(1.2..3.8_f64) * 100.0).round() / 100.0,
            "avg_deaths": (rng.gen_range(3.0..8.0_f64) * 10.0).round() / 10.0,
            "max_loss_streak": rng.gen_range(2..9),
            "max_win_streak": rng.gen_range(1..6),
            "top_champions": [
                {"name": "Yasuo", "games": 9, "win_rate": 33.3},
                {"name": "Lux", "games": 5, "win_rate": 60.0}
            ]
        })
    }
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new(Duration::from_millis(150))
    }
}

impl RoastBackend for FakeBackend {
    fn regenerate(&self, request: &RegenerateRequest<'_>) -> Result<RegenerateResponse> {
        thread::sleep(self.frame_delay * 4);
        let (postcards, used_topics) =
            self.pick_roasts(request.your_stats, request.your_rank, request.used_topics);
        Ok(RegenerateResponse {
            postcards,
            used_topics,
            error: None,
        })
    }

    fn open_analyze_stream(&self, body: &AnalyzeRequestBody<'_>) -> Result<StreamBody> {
        let mut frames = vec![progress_frame("Looking up summoner...", None)];
        if !body.summoner_name.contains('#') {
            frames.push(frame(&json!({"error": "Summoner not found. Use format: Name#TAG"})));
            return Ok(self.paced(frames));
        }
        frames.push(progress_frame("Getting current rank...", None));
        frames.push(progress_frame("Fetching match history...", None));
        for idx in 1..=FAKE_MATCHES {
            let current = format!("Analyzing matches ({idx}/{FAKE_MATCHES})...");
            frames.push(progress_frame(&current, None));
            if idx == FAKE_MATCHES / 2 {
                for remaining in (1..=3).rev() {
                    let advisory = format!("Rate limited. Waiting {remaining}s...");
                    frames.push(progress_frame(&current, Some(&advisory)));
                }
            }
        }
        frames.push(progress_frame("Generating roasts...", None));

        let stats = self.fake_stats();
        let rank = "SILVER II";
        let (postcards, used_topics) = self.pick_roasts(&stats, rank, &[]);
        frames.push(frame(&json!({
            "result": {
                "status": "success",
                "mode": "year_review",
                "your_rank": rank,
                "your_stats": stats,
                "achievements": [],
                "postcards": postcards,
                "used_topics": used_topics,
            }
        })));
        Ok(self.paced(frames))
    }

    fn pro_players(&self) -> Result<ProDirectory> {
        let mut directory = ProDirectory::new();
        let pro = |id: &str, name: &str, role: &str| ProPlayer {
            id: id.to_string(),
            name: name.to_string(),
            role: role.to_string(),
            riot_id: None,
        };
        directory
            .entry("LCK".to_string())
            .or_default()
            .insert("T1".to_string(), vec![pro("faker", "Faker", "Mid")]);
        directory
            .entry("LEC".to_string())
            .or_default()
            .insert("G2 Esports".to_string(), vec![pro("caps", "Caps", "Mid")]);
        Ok(directory)
    }
}

impl FakeBackend {
    fn paced(&self, frames: Vec<String>) -> StreamBody {
        let bytes = frames.concat().into_bytes();
        let mut rng = self.rng.lock().expect("fake backend rng lock poisoned");
        let chunks = split_randomly(&bytes, &mut *rng);
        Box::new(PacedReader {
            chunks: chunks.into(),
            delay: self.frame_delay,
        })
    }
}

fn frame(value: &Value) -> String {
    format!("data: {value}\n\n")
}

fn progress_frame(message: &str, rate_limit: Option<&str>) -> String {
    match rate_limit {
        Some(advisory) => frame(&json!({
            "progress": message,
            "rate_limit": advisory,
            "status": "running",
        })),
        None => frame(&json!({"progress": message, "status": "running"})),
    }
}

/// Cuts the stream at arbitrary byte offsets so frames straddle reads the way
/// they do on a real network.
fn split_randomly(bytes: &[u8], rng: &mut impl Rng) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut start = 0usize;
    while start < bytes.len() {
        let len = rng.gen_range(16..160).min(bytes.len() - start);
        chunks.push(bytes[start..start + len].to_vec());
        start += len;
    }
    chunks
}

fn fill_template(template: &str, stats: &Value, rank: &str) -> String {
    let num = |field: &str| {
        stats
            .get(field)
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string())
    };
    let main_wr = stats
        .get("top_champions")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("win_rate"))
        .map(|v| v.to_string())
        .unwrap_or_else(|| "?".to_string());
    template
        .replace("{wr}", &main_wr)
        .replace("{loss}", &num("max_loss_streak"))
        .replace("{win}", &num("max_win_streak"))
        .replace("{games}", &num("total_games"))
        .replace("{deaths}", &num("avg_deaths"))
        .replace("{kda}", &num("kda"))
        .replace("{rank}", rank)
}

struct PacedReader {
    chunks: VecDeque<Vec<u8>>,
    delay: Duration,
}

impl Read for PacedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(mut chunk) = self.chunks.pop_front() else {
            return Ok(0);
        };
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            let rest = chunk.split_off(n);
            self.chunks.push_front(rest);
        }
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut body: StreamBody) -> String {
        let mut out = String::new();
        body.read_to_string(&mut out).expect("readable");
        out
    }

    #[test]
    fn stream_ends_with_result_frame() {
        let backend = FakeBackend::seeded(7);
        let body = AnalyzeRequestBody {
            summoner_name: "Faker#KR1",
            region: crate::model::Region::Kr,
            pro_player_id: None,
        };
        let raw = drain(backend.open_analyze_stream(&body).expect("stream"));
        assert!(raw.starts_with("data: "));
        assert!(raw.contains("Rate limited. Waiting 3s..."));
        assert!(raw.trim_end().lines().last().is_some_and(|l| l.contains("\"result\"")));
    }

    #[test]
    fn untagged_name_is_rejected_in_stream() {
        let backend = FakeBackend::seeded(7);
        let body = AnalyzeRequestBody {
            summoner_name: "Faker",
            region: crate::model::Region::Kr,
            pro_player_id: None,
        };
        let raw = drain(backend.open_analyze_stream(&body).expect("stream"));
        assert!(raw.contains("Summoner not found"));
    }

    #[test]
    fn regenerate_avoids_used_topics() {
        let backend = FakeBackend::seeded(11);
        let stats = json!({"total_games": 20});
        let used = vec!["kda".to_string(), "rank".to_string(), "deaths".to_string()];
        let request = RegenerateRequest {
            your_stats: &stats,
            your_rank: "GOLD IV",
            achievements: &[],
            used_topics: &used,
        };
        let resp = backend.regenerate(&request).expect("regenerate");
        assert_eq!(resp.postcards.len(), ROASTS_PER_CALL);
        assert!(resp.used_topics.iter().all(|t| !used.contains(t)));
    }
}
