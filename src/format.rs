//! Reply formatting: renders store, resolver and weather results into the
//! user-facing text blocks the bot sends back. Pure functions, zh-TW texts.

use crate::commands::Usage;
use crate::traits::{PlaceRecord, COMMENT_SEPARATOR};
use crate::weather::PlaceWeather;

/// Per-line outcome buckets of one batch add.
#[derive(Debug, Default, Clone)]
pub struct BatchAddReport {
    pub added: Vec<String>,
    pub duplicates: Vec<String>,
    /// Original input lines that could not be resolved.
    pub failed: Vec<String>,
}

pub fn render_help() -> String {
    concat!(
        "📘 指令集說明：\n",
        "➕ 新增地點 [地名/地圖網址]（可換行批次新增）\n",
        "📋 清單：顯示排序後地點\n",
        "🗑️ 刪除 [編號]\n",
        "📝 註解 [編號] [說明]\n",
        "🔧 修改註解 [編號] [原內容] [新內容]\n",
        "🌦️ 天氣：查詢已存地點天氣\n",
        "❌ 清空：刪除所有地點（需再次確認）",
    )
    .to_string()
}

pub fn render_list(records: &[PlaceRecord]) -> String {
    if records.is_empty() {
        return "📭 尚未新增任何地點".to_string();
    }
    let mut lines = vec!["📍 地點清單：".to_string()];
    for (i, record) in records.iter().enumerate() {
        let mut line = format!("{}. {}", i + 1, record.name);
        if !record.comments.is_empty() {
            let joined = record
                .comments
                .join(&COMMENT_SEPARATOR.to_string());
            line.push_str(&format!("（{}）", joined));
        }
        lines.push(line);
    }
    lines.join("\n")
}

pub fn render_batch_add(report: &BatchAddReport) -> String {
    let mut parts = Vec::new();
    if !report.added.is_empty() {
        parts.push(format!("✅ 已新增地點：\n- {}", report.added.join("\n- ")));
    }
    if !report.duplicates.is_empty() {
        parts.push(format!(
            "⛔️ 重複地點（已略過）：\n- {}",
            report.duplicates.join("\n- ")
        ));
    }
    if !report.failed.is_empty() {
        parts.push(format!("⚠️ 無法解析：\n- {}", report.failed.join("\n- ")));
    }
    if parts.is_empty() {
        return "⚠️ 沒有成功加入任何地點".to_string();
    }
    parts.join("\n\n")
}

pub fn deleted(name: &str) -> String {
    format!("🗑️ 已刪除地點：{}", name)
}

pub fn invalid_index() -> String {
    "⚠️ 指定編號無效。".to_string()
}

pub fn comment_added(index: usize, text: &str) -> String {
    format!("📝 已為第 {} 筆地點新增註解：{}", index, text)
}

pub fn comment_duplicate(index: usize) -> String {
    format!("⚠️ 此註解已存在於第 {} 筆地點中", index)
}

pub fn comment_edited(index: usize, old: &str, new: &str) -> String {
    format!("🔧 已修改第 {} 筆地點的註解：{} → {}", index, old, new)
}

pub fn comment_not_found(old: &str) -> String {
    format!("⚠️ 找不到註解「{}」", old)
}

pub fn clear_warning() -> String {
    "⚠️ 是否確認清空所有地點？請輸入 `確認清空`".to_string()
}

pub fn cleared(count: u64) -> String {
    if count == 0 {
        "📭 目前沒有任何地點可清空".to_string()
    } else {
        format!("✅ 已清空 {} 筆地點。", count)
    }
}

pub fn usage(usage: Usage) -> String {
    match usage {
        Usage::Add => "⚠️ 請使用格式：新增 [地名/地圖網址]".to_string(),
        Usage::Delete => "⚠️ 請使用格式：刪除 [編號]".to_string(),
        Usage::Comment => "⚠️ 請使用格式：註解 [編號] [內容]".to_string(),
        Usage::EditComment => "⚠️ 請使用格式：修改註解 [編號] [原內容] [新內容]".to_string(),
    }
}

pub fn generic_failure() -> String {
    "⚠️ 動作執行失敗，請稍後再試".to_string()
}

pub fn render_weather(reports: &[PlaceWeather]) -> String {
    if reports.is_empty() {
        return "📭 尚未新增任何地點".to_string();
    }
    let mut blocks = vec!["🌦️ 天氣報告：".to_string()];
    for report in reports {
        blocks.push(render_place_weather(report));
    }
    blocks.join("\n\n")
}

fn render_place_weather(report: &PlaceWeather) -> String {
    let Some(district) = &report.district else {
        return format!("📍 {}：⚠️ 查無行政區", report.name);
    };

    let district_label = match &district.township {
        Some(township) => format!("{}{}", district.county, township),
        None => district.county.clone(),
    };
    let mut lines = vec![format!("📍 {}（{}）", report.name, district_label)];

    match &report.forecast {
        Some(periods) => {
            for period in periods {
                let mut line = format!("{}：{}", period.label, period.description);
                if let (Some(min), Some(max)) = (period.min_temp, period.max_temp) {
                    line.push_str(&format!("，{:.0}–{:.0}°C", min, max));
                }
                if let Some(pop) = period.rain_chance {
                    line.push_str(&format!("，降雨機率 {}%", pop));
                }
                lines.push(line);
            }
        }
        None => lines.push("⚠️ 查無預報資料".to_string()),
    }

    if let Some(nowcast) = &report.nowcast {
        let mut line = "目前".to_string();
        if let Some(temp) = nowcast.temperature {
            line.push_str(&format!("：{:.1}°C", temp));
        }
        if let Some(pop) = nowcast.rain_chance {
            line.push_str(&format!("，降雨機率 {}%", pop));
        }
        if line != "目前" {
            lines.push(line);
        }
    }

    lines.join("\n")
}
