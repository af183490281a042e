use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::Utc;

use crate::model::{ResultPayload, StatLine};

const CARD_WIDTH: usize = 48;

/// Renders one postcard as a boxed plain-text card.
pub fn render_card_text(result: &ResultPayload, index: usize) -> Option<String> {
    let card = result.postcards.get(index)?;
    let inner = CARD_WIDTH - 4;
    let mut lines: Vec<String> = Vec::new();

    lines.push(card.title.to_uppercase());
    if index == 0
        && result.is_pro_comparison()
        && let Some(pro) = &result.pro_info
    {
        lines.push(format!("{} - {}", pro.name, pro.team));
    }
    lines.push(String::new());
    lines.extend(wrap(&card.content, inner));
    match card.stat_line() {
        Some(StatLine::Single(stat)) => {
            lines.push(String::new());
            lines.push(format!(">> {stat} <<"));
        }
        Some(StatLine::Pair { yours, pro }) => {
            let pro_label = result
                .pro_info
                .as_ref()
                .map(|p| p.name.as_str())
                .unwrap_or("Pro");
            lines.push(String::new());
            lines.push(format!("You {yours}  VS  {pro_label} {pro}"));
        }
        None => {}
    }
    lines.push(String::new());
    lines.push(format!(
        "{} / {}   {}",
        index + 1,
        result.postcards.len(),
        result.your_rank
    ));

    let border = format!("+{}+", "-".repeat(CARD_WIDTH - 2));
    let mut out = String::new();
    out.push_str(&border);
    out.push('\n');
    for line in lines {
        let pad = inner.saturating_sub(line.chars().count());
        out.push_str(&format!("| {line}{} |\n", " ".repeat(pad)));
    }
    out.push_str(&border);
    out.push('\n');
    out.push_str("LEAGUE ROASTED - 2025 SEASON RECAP\n");
    Some(out)
}

pub fn export_card(dir: &Path, key: &str, result: &ResultPayload, index: usize) -> Result<PathBuf> {
    let text = render_card_text(result, index).ok_or_else(|| anyhow!("no card at {index}"))?;
    fs::create_dir_all(dir).context("create export dir")?;
    let stamp = Utc::now().format("%Y%m%d-%H%M%S");
    let path = dir.join(format!(
        "roast-{}-{}-{stamp}.txt",
        file_safe(key),
        index + 1
    ));
    fs::write(&path, text).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

fn file_safe(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect()
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Postcard, ProInfo};

    fn result_with(cards: Vec<Postcard>) -> ResultPayload {
        ResultPayload {
            status: None,
            mode: Some("pro_comparison".to_string()),
            your_rank: "GOLD IV".to_string(),
            your_stats: serde_json::Value::Null,
            achievements: Vec::new(),
            postcards: cards,
            used_topics: Vec::new(),
            pro_info: Some(ProInfo {
                name: "Faker".to_string(),
                team: "T1".to_string(),
                role: "Mid".to_string(),
                rank: None,
            }),
            pro_stats: None,
        }
    }

    fn card(kind: &str) -> Postcard {
        Postcard {
            kind: Some(kind.to_string()),
            title: "Vision".to_string(),
            content: "You ward like the map is a suggestion and the river is a rumour.".to_string(),
            stat: None,
            your_stat: Some("12".to_string()),
            pro_stat: Some("48".to_string()),
        }
    }

    #[test]
    fn renders_badge_and_versus_line() {
        let result = result_with(vec![card("comparison"), card("roast")]);
        let text = render_card_text(&result, 0).expect("card");
        assert!(text.contains("VISION"));
        assert!(text.contains("Faker - T1"));
        assert!(text.contains("You 12  VS  Faker 48"));
        assert!(text.contains("1 / 2"));
        assert!(text.lines().all(|l| l.chars().count() <= CARD_WIDTH || l.starts_with("LEAGUE")));
    }

    #[test]
    fn badge_only_on_first_card() {
        let result = result_with(vec![card("comparison"), card("roast")]);
        let text = render_card_text(&result, 1).expect("card");
        assert!(!text.contains("Faker - T1"));
        assert!(render_card_text(&result, 2).is_none());
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap("a bb ccc dddd eeeee", 6);
        assert_eq!(lines, vec!["a bb", "ccc", "dddd", "eeeee"]);
    }
}
